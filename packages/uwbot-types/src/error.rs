//! Error taxonomy for the command/state contract.
//!
//! Command problems are [`Rejection`]s and never reach actuation. Binary decode
//! problems are [`WireError`]s; a state record only fails to decode when its
//! length is wrong. Counter decreases on the state side are not
//! errors at all; see [`crate::check::Anomaly`].

use serde::Serialize;
use thiserror::Error;

/// Why a command record was refused at the validation boundary.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("{field} = {value}% is outside 0..=100")]
    PercentageOutOfRange { field: &'static str, value: u8 },
    #[error("speed_level = {value} is outside 0..=5")]
    InvalidSpeedLevel { value: u8 },
    #[error("{field} = {value} is not a known selector")]
    InvalidSelector { field: &'static str, value: u8 },
    #[error("{field} is not a finite number")]
    NonFiniteSetpoint { field: &'static str },
    #[error("mode_floating and mode_wheel are both set")]
    ModeConflict,
}

/// Coarse category of a [`Rejection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    OutOfRange,
    InvalidSelector,
    ModeConflict,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::PercentageOutOfRange { .. }
            | Self::InvalidSpeedLevel { .. }
            | Self::NonFiniteSetpoint { .. } => RejectionKind::OutOfRange,
            Self::InvalidSelector { .. } => RejectionKind::InvalidSelector,
            Self::ModeConflict => RejectionKind::ModeConflict,
        }
    }

    /// Name of the offending field, as it appears in the record.
    pub fn field(&self) -> &'static str {
        match self {
            Self::PercentageOutOfRange { field, .. }
            | Self::InvalidSelector { field, .. }
            | Self::NonFiniteSetpoint { field } => *field,
            Self::InvalidSpeedLevel { .. } => "speed_level",
            Self::ModeConflict => "mode_floating",
        }
    }
}

/// Bounded text construction failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error("{len} bytes exceeds the {max}-byte limit")]
    TooLong { len: usize, max: usize },
    #[error("text contains a NUL byte")]
    InteriorNul,
    #[error("buffer has no NUL terminator")]
    Unterminated,
    #[error("text is not valid UTF-8")]
    InvalidUtf8,
}

/// Binary decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    /// Command flags only; state flags read any nonzero byte as set.
    #[error("flag {field} holds {value}, expected 0 or 1")]
    Flag { field: &'static str, value: u8 },
}
