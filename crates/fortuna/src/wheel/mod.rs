use std::time::Duration;
use thiserror::Error;

pub mod animator;
pub mod geometry;
pub mod outcome;
pub mod prize;
pub mod resolver;
pub mod session;
pub mod stats;

pub use animator::{AnimationProfile, AnimationRun, CancelToken, Phase, RotationAnimator, Step};
pub use geometry::{Sector, WheelLayout, normalize};
pub use outcome::{
    GenerateOptions, OutcomeGenerator, RepeatGranularity, SpinId, SpinOutcome, validate_weights,
};
pub use prize::{IconRef, Prize, PrizeKey, PrizeLabel, PrizeTable, SlotColor};
pub use resolver::{assert_consistent, resolve};
pub use session::{ChannelObserver, Completion, SpinHandle, SpinObserver, Wheel};
pub use stats::{ResetScope, RunningStatistics, StatisticsSnapshot};

pub const FULL_TURN: f64 = 360.0;
pub const DEFAULT_POINTER_ANGLE: f64 = 270.0; // bottom
pub const DEFAULT_SLOT_COUNT: usize = 12;
pub const DEFAULT_MAX_REPEATS: usize = 3;

// decorative whole turns, upper bound exclusive
pub const MIN_FULL_TURNS: u32 = 5;
pub const MAX_FULL_TURNS: u32 = 8;

pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667); // 60 Hz reference frame
pub const ARRIVAL_EPSILON: f64 = 0.5; // degrees

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpinError {
    #[error("Wheel is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("Slot {slot} is outside of 0..{slot_count}")]
    InvalidSlot { slot: usize, slot_count: usize },
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
    #[error("Outcome mismatch: generated slot {expected}, wheel landed on {actual} at {angle:.2} deg")]
    OutcomeMismatch {
        expected: usize,
        actual: usize,
        angle: f64,
    },
    #[error("A spin is already running, cancel it first")]
    Busy,
    #[error("Generator layout ({generator} slots) does not match the wheel ({wheel} slots)")]
    LayoutMismatch { generator: usize, wheel: usize },
}
