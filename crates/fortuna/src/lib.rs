pub mod config;
pub mod events;
pub mod macros;
pub mod sys;
pub mod wheel;
