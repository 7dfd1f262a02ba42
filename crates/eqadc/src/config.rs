//! Static configuration.
//!
//! Which converters exist and which logical queues get a driver object is a
//! build-time choice (cargo features `adc0` / `adc1`). Absent units are not
//! in [`CONFIGURED_UNITS`], so nothing ever addresses them: no calibration
//! commands, no driver objects.
//!
//! [`EqadcConfig::DEFAULT`] is checked at compile time, so enabling neither
//! converter is a build error rather than a runtime one.

use crate::command::AdcUnit;
use crate::error::OutOfRangeError;
use crate::fifo::FifoId;
use crate::poll::PollBound;
use crate::regs::ADC_CR_CLK_PS_MASK;

/// Converters calibrated by [`Eqadc::init`](crate::Eqadc::init).
pub const CONFIGURED_UNITS: &[AdcUnit] = &[
    #[cfg(feature = "adc0")]
    AdcUnit::Adc0,
    #[cfg(feature = "adc1")]
    AdcUnit::Adc1,
];

/// Logical queues that receive a driver object after init.
pub const CONFIGURED_QUEUES: &[QueueAssignment] = &[
    #[cfg(feature = "adc0")]
    QueueAssignment::new(FifoId::CFIFO0),
    #[cfg(feature = "adc1")]
    QueueAssignment::new(FifoId::CFIFO3),
];

// ── QueueAssignment ──────────────────────────────────────────────────────────

/// A logical queue and the converter it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueAssignment {
    /// CFIFO/RFIFO pair.
    pub fifo: FifoId,
    /// Converter the queue's conversions run on.
    pub unit: AdcUnit,
}

impl QueueAssignment {
    /// Assign `fifo` to the converter that owns it: CFIFO0..=2 feed ADC0,
    /// CFIFO3..=5 feed ADC1.
    pub const fn new(fifo: FifoId) -> Self {
        Self {
            fifo,
            unit: Self::owner(fifo),
        }
    }

    /// The converter that owns `fifo`.
    pub const fn owner(fifo: FifoId) -> AdcUnit {
        if fifo.index() < 3 {
            AdcUnit::Adc0
        } else {
            AdcUnit::Adc1
        }
    }
}

// ── ClockPrescaler ───────────────────────────────────────────────────────────

/// Converter clock prescaler (CR.CLK_PS): the system clock is divided by an
/// even factor between 2 and 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ClockPrescaler(u8);

impl ClockPrescaler {
    /// Divide by 8: 10 MHz ADC clock from an 80 MHz system clock.
    pub const DIV_8: Self = Self(3);

    /// Create a prescaler from its divide factor.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `divide` is odd or outside 2..=64.
    #[allow(clippy::cast_lossless, clippy::manual_range_contains)] // const fn
    pub const fn new(divide: u8) -> Result<Self, OutOfRangeError> {
        if divide < 2 || divide > 64 || divide & 1 != 0 {
            return Err(OutOfRangeError {
                value: divide as u32,
                min: 2,
                max: 64,
            });
        }
        Ok(Self((divide >> 1).wrapping_sub(1)))
    }

    /// Divide factor applied to the system clock.
    pub const fn divide(self) -> u8 {
        (self.0.wrapping_add(1)) << 1
    }

    /// Value of the CR.CLK_PS field.
    #[allow(clippy::cast_lossless)] // widening in const fn
    pub const fn field(self) -> u16 {
        self.0 as u16 & ADC_CR_CLK_PS_MASK
    }
}

impl Default for ClockPrescaler {
    fn default() -> Self {
        Self::DIV_8
    }
}

// ── EqadcConfig ──────────────────────────────────────────────────────────────

/// Everything [`Eqadc`](crate::Eqadc) needs to know about the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EqadcConfig {
    /// Converters to calibrate, in calibration order.
    pub units: &'static [AdcUnit],
    /// Logical queues that get a driver object.
    pub queues: &'static [QueueAssignment],
    /// Queue used to carry the initialization traffic.
    pub scratch_fifo: FifoId,
    /// CR.CLK_PS written with every enable and disable.
    pub clock_prescaler: ClockPrescaler,
    /// Bound applied to every busy-wait.
    pub poll: PollBound,
}

impl EqadcConfig {
    /// The configuration selected by the crate features, with unbounded waits.
    pub const DEFAULT: Self = Self {
        units: CONFIGURED_UNITS,
        queues: CONFIGURED_QUEUES,
        scratch_fifo: FifoId::CFIFO0,
        clock_prescaler: ClockPrescaler::DIV_8,
        poll: PollBound::Forever,
    };

    /// Same configuration with a different poll bound.
    pub const fn with_poll(mut self, poll: PollBound) -> Self {
        self.poll = poll;
        self
    }

    /// Same configuration with a different set of converters.
    pub const fn with_units(mut self, units: &'static [AdcUnit]) -> Self {
        self.units = units;
        self
    }

    /// Same configuration with a different set of logical queues.
    pub const fn with_queues(mut self, queues: &'static [QueueAssignment]) -> Self {
        self.queues = queues;
        self
    }

    /// Same configuration with a different clock prescaler.
    pub const fn with_clock_prescaler(mut self, clock_prescaler: ClockPrescaler) -> Self {
        self.clock_prescaler = clock_prescaler;
        self
    }

    /// Check the configuration for contradictions.
    ///
    /// Rejects an empty or repeated unit set, units compiled out of
    /// [`CONFIGURED_UNITS`], repeated queues, and queues bound to a converter
    /// that is not configured or does not own them.
    ///
    /// [`Eqadc::init`](crate::Eqadc::init) refuses a configuration that fails
    /// this check before touching the bus.
    pub const fn is_valid(&self) -> bool {
        if self.units.is_empty() {
            return false;
        }

        let mut units = self.units;
        while let [unit, rest @ ..] = units {
            if contains_unit(rest, *unit) || !contains_unit(CONFIGURED_UNITS, *unit) {
                return false;
            }
            units = rest;
        }

        let mut queues = self.queues;
        while let [queue, rest @ ..] = queues {
            if !contains_unit(self.units, queue.unit)
                || QueueAssignment::owner(queue.fifo).index() != queue.unit.index()
                || contains_fifo(rest, queue.fifo)
            {
                return false;
            }
            queues = rest;
        }
        true
    }
}

impl Default for EqadcConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = assert!(
    EqadcConfig::DEFAULT.is_valid(),
    "enable at least one of the `adc0` / `adc1` features"
);

const fn contains_unit(mut units: &[AdcUnit], wanted: AdcUnit) -> bool {
    while let [unit, rest @ ..] = units {
        if unit.index() == wanted.index() {
            return true;
        }
        units = rest;
    }
    false
}

const fn contains_fifo(mut queues: &[QueueAssignment], wanted: FifoId) -> bool {
    while let [queue, rest @ ..] = queues {
        if queue.fifo.index() == wanted.index() {
            return true;
        }
        queues = rest;
    }
    false
}
