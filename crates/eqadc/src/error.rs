//! Error types.
//!
//! The reference protocol has no error path: full queues and missing results
//! are waited out. Errors here come from a bounded [`PollBound`](crate::PollBound)
//! running out ([`QueueError`]), from reference samples that cannot produce
//! a gain constant ([`CalibrationError`]), and from the orchestrator stopping
//! part-way ([`InitError`]).

use crate::command::AdcUnit;
use crate::fifo::FifoId;
use crate::init::InitState;

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("value {value} is outside {min}..={max}")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

/// The hardware condition a busy-wait was polling for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wait {
    /// CFIFO entry count below the FIFO depth.
    #[error("a free command slot")]
    CommandSpace,
    /// RFIFO entry count at least `count`.
    #[error("{count} result words")]
    Results {
        /// Number of result words requested.
        count: u32,
    },
    /// CFIFO status field idle after the mode was set to disabled.
    #[error("the queue to go idle")]
    Idle,
    /// CFIFO entry count down to zero.
    #[error("the command queue to drain")]
    Drained,
}

/// A bounded busy-wait on a hardware queue gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("{fifo} timed out waiting for {wait}")]
pub struct QueueError {
    /// Queue being polled.
    pub fifo: FifoId,
    /// What it was waiting for.
    pub wait: Wait,
}

/// Calibration could not derive usable correction constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// `RES75 == RES25`: the gain formula would divide by zero.
    #[error("reference samples are equal ({res25}), gain is undefined")]
    DegenerateSamples {
        /// 25% reference conversion result.
        res25: u16,
        /// 75% reference conversion result.
        res75: u16,
    },
    /// The gain constant does not fit the 16-bit write payload.
    #[error("gain constant {gain:#x} does not fit a 16-bit register write")]
    GainOverflow {
        /// The computed gain constant.
        gain: u32,
    },
    /// Command or result traffic timed out under a bounded poll.
    #[error("calibration traffic failed: {0}")]
    Queue(QueueError),
}

impl From<QueueError> for CalibrationError {
    fn from(err: QueueError) -> Self {
        Self::Queue(err)
    }
}

/// Why [`Eqadc::init`](crate::Eqadc::init) stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitFailure {
    /// `init()` already ran (or failed and was not shut down).
    #[error("initialization already ran")]
    AlreadyInitialized,
    /// The configuration failed [`EqadcConfig::is_valid`](crate::EqadcConfig::is_valid).
    #[error("configuration failed validation")]
    InvalidConfig,
    /// A bounded busy-wait timed out.
    #[error("{0}")]
    Queue(QueueError),
    /// Calibration of one converter failed.
    #[error("{unit} calibration failed: {error}")]
    Calibration {
        /// The converter being calibrated.
        unit: AdcUnit,
        /// What went wrong.
        error: CalibrationError,
    },
}

impl From<QueueError> for InitFailure {
    fn from(err: QueueError) -> Self {
        Self::Queue(err)
    }
}

/// Initialization failure, tagged with the last state the orchestrator
/// completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("initialization stopped in state {state}: {failure}")]
pub struct InitError {
    /// Last state reached before the failure.
    pub state: InitState,
    /// The failure itself.
    pub failure: InitFailure,
}
