use crate::wheel::{Completion, ResetScope, SpinError, SpinOutcome};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::oneshot;

/// Wheel callbacks as values, for hosts that consume a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SpinEvent {
    Generated(SpinOutcome),
    Progress(f64),
    Completed(Completion),
    Cancelled(f64),
}

/// Requests handled by the frame loop, which owns the wheel.
#[derive(Debug)]
pub enum AppEvent {
    Spin {
        forced_slot: Option<usize>,
        reply: oneshot::Sender<Result<SpinOutcome, SpinError>>,
    },
    Cancel,
    Shutdown,
}

/// One line of the control socket protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Spin(Option<usize>),
    Cancel,
    Stats,
    Reset(ResetScope),
    Shutdown,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}'")]
    Unknown(String),
    #[error("Invalid argument '{0}'")]
    InvalidArgument(String),
}

impl FromStr for ControlCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();
        let arg = parts.next();
        if let Some(extra) = parts.next() {
            return Err(CommandError::InvalidArgument(extra.to_string()));
        }

        match (name.as_str(), arg) {
            ("spin", None) => Ok(Self::Spin(None)),
            ("spin", Some(slot)) => slot
                .parse()
                .map(|slot| Self::Spin(Some(slot)))
                .map_err(|_| CommandError::InvalidArgument(slot.to_string())),
            ("cancel", None) => Ok(Self::Cancel),
            ("stats", None) => Ok(Self::Stats),
            ("reset", None) => Ok(Self::Reset(ResetScope::Counters)),
            ("reset", Some(scope)) => scope
                .parse()
                .map(Self::Reset)
                .map_err(|_| CommandError::InvalidArgument(scope.to_string())),
            ("shutdown", None) => Ok(Self::Shutdown),
            (_, Some(arg)) if matches!(name.as_str(), "cancel" | "stats" | "shutdown") => {
                Err(CommandError::InvalidArgument(arg.to_string()))
            }
            _ => Err(CommandError::Unknown(name.clone())),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spin(None) => write!(f, "spin"),
            Self::Spin(Some(slot)) => write!(f, "spin {slot}"),
            Self::Cancel => write!(f, "cancel"),
            Self::Stats => write!(f, "stats"),
            Self::Reset(scope) => write!(f, "reset {scope}"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        let cases = vec![
            ("spin", ControlCommand::Spin(None)),
            ("SPIN 5", ControlCommand::Spin(Some(5))),
            ("  cancel ", ControlCommand::Cancel),
            ("stats", ControlCommand::Stats),
            ("reset", ControlCommand::Reset(ResetScope::Counters)),
            ("reset all", ControlCommand::Reset(ResetScope::All)),
            ("shutdown", ControlCommand::Shutdown),
        ];

        for (line, expected) in cases {
            assert_eq!(line.parse::<ControlCommand>().unwrap(), expected);
        }
    }

    #[test]
    fn test_command_errors() {
        assert_eq!("".parse::<ControlCommand>(), Err(CommandError::Empty));
        assert_eq!(
            "launch".parse::<ControlCommand>(),
            Err(CommandError::Unknown("launch".to_string()))
        );
        assert_eq!(
            "spin five".parse::<ControlCommand>(),
            Err(CommandError::InvalidArgument("five".to_string()))
        );
        assert_eq!(
            "stats now".parse::<ControlCommand>(),
            Err(CommandError::InvalidArgument("now".to_string()))
        );
        assert_eq!(
            "reset everything".parse::<ControlCommand>(),
            Err(CommandError::InvalidArgument("everything".to_string()))
        );
    }

    #[test]
    fn test_command_display_round_trips() {
        for command in [
            ControlCommand::Spin(Some(7)),
            ControlCommand::Reset(ResetScope::All),
            ControlCommand::Cancel,
        ] {
            assert_eq!(command.to_string().parse::<ControlCommand>().unwrap(), command);
        }
    }
}
