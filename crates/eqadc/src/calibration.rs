//! Two-point gain/offset calibration.
//!
//! The converter samples two internal references, 25% and 75% of
//! (VRH - VRL). From the raw results RES25 and RES75:
//!
//! ```text
//! GCC = 0x0800_0000 / (RES75 - RES25)          (1.14 fixed point)
//! OCC = 12286 - ((GCC * RES75) >> 14)          (low 16 bits)
//! ```
//!
//! The same pair is written into all three configurations (default 12 bit,
//! alternate 1 at 10 bit, alternate 2 at 8 bit); the alternates differ only
//! in the resolution their control register selects afterwards.

use crate::bus::EqadcBus;
use crate::command::{AdcRegister, AdcUnit, Command, Reference};
use crate::error::{CalibrationError, QueueError};
use crate::fifo::CommandQueue;
use crate::regs::{
    ADC_ACR_RESSEL_10BITS, ADC_ACR_RESSEL_12BITS, ADC_ACR_RESSEL_8BITS, GAIN_FRACTION_BITS,
    GAIN_NUMERATOR, IDEAL_RES75_MINUS_2,
};

// ── Resolution ───────────────────────────────────────────────────────────────

/// Result resolution of one converter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// Default configuration.
    Bits12,
    /// Alternate configuration 1.
    Bits10,
    /// Alternate configuration 2.
    Bits8,
}

impl Resolution {
    /// Every configuration, in the order calibration writes them.
    pub const ALL: [Resolution; 3] = [Self::Bits12, Self::Bits10, Self::Bits8];

    /// ACR.RESSEL encoding.
    pub const fn ressel(self) -> u16 {
        match self {
            Self::Bits12 => ADC_ACR_RESSEL_12BITS,
            Self::Bits10 => ADC_ACR_RESSEL_10BITS,
            Self::Bits8 => ADC_ACR_RESSEL_8BITS,
        }
    }

    /// Gain constant register of this configuration.
    pub const fn gain_register(self) -> AdcRegister {
        match self {
            Self::Bits12 => AdcRegister::GCCR,
            Self::Bits10 => AdcRegister::AC1GCCR,
            Self::Bits8 => AdcRegister::AC2GCCR,
        }
    }

    /// Offset constant register of this configuration.
    pub const fn offset_register(self) -> AdcRegister {
        match self {
            Self::Bits12 => AdcRegister::OCCR,
            Self::Bits10 => AdcRegister::AC1OCCR,
            Self::Bits8 => AdcRegister::AC2OCCR,
        }
    }

    /// Alternate control register selecting this resolution. The default
    /// configuration has none.
    pub const fn control_register(self) -> Option<AdcRegister> {
        match self {
            Self::Bits12 => None,
            Self::Bits10 => Some(AdcRegister::AC1CR),
            Self::Bits8 => Some(AdcRegister::AC2CR),
        }
    }
}

// ── CalibrationConstants ─────────────────────────────────────────────────────

/// Gain and offset correction for one converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConstants {
    /// GCC, 1.14 fixed point.
    pub gain: u16,
    /// OCC, two's complement.
    pub offset: u16,
}

impl CalibrationConstants {
    /// Derive the constants from raw 25% and 75% reference results.
    ///
    /// Arithmetic is unsigned 32 bit throughout; `res75 < res25` wraps.
    ///
    /// # Errors
    ///
    /// - [`CalibrationError::DegenerateSamples`] if the two results are equal.
    /// - [`CalibrationError::GainOverflow`] if the gain does not fit 16 bits
    ///   (a span under 2048 codes).
    pub fn from_samples(res25: u16, res75: u16) -> Result<Self, CalibrationError> {
        let span = u32::from(res75).wrapping_sub(u32::from(res25));
        let gain = GAIN_NUMERATOR
            .checked_div(span)
            .ok_or(CalibrationError::DegenerateSamples { res25, res75 })?;
        let gain16 = u16::try_from(gain).map_err(|_| CalibrationError::GainOverflow { gain })?;

        let corrected = gain.wrapping_mul(u32::from(res75)) >> GAIN_FRACTION_BITS;
        #[allow(clippy::cast_possible_truncation)] // OCC is stored as its low 16 bits
        let offset = IDEAL_RES75_MINUS_2.wrapping_sub(corrected) as u16;

        Ok(Self {
            gain: gain16,
            offset,
        })
    }
}

// ── Routines ─────────────────────────────────────────────────────────────────

/// Calibrate `unit` through `queue` and load the constants into every
/// configuration.
///
/// Both converters must already be enabled and `queue` active in
/// software-triggered single-scan mode. Results are routed back to the
/// RFIFO matching `queue`.
pub fn calibrate<B: EqadcBus>(
    queue: &mut CommandQueue<'_, B>,
    unit: AdcUnit,
) -> Result<CalibrationConstants, CalibrationError> {
    let tag = queue.fifo();
    queue.push(Command::sample_reference(unit, Reference::Quarter, tag))?;
    queue.push(Command::sample_reference(unit, Reference::ThreeQuarters, tag))?;
    queue.wait_for(2)?;
    let res25 = queue.read_one();
    let res75 = queue.read_one();

    let constants = match CalibrationConstants::from_samples(res25, res75) {
        Ok(constants) => constants,
        Err(err) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("{} calibration rejected: RES25={=u16} RES75={=u16}", unit, res25, res75);
            #[cfg(feature = "tracing")]
            tracing::warn!(%unit, res25, res75, "calibration rejected");
            return Err(err);
        }
    };

    for resolution in Resolution::ALL {
        queue.write_register(unit, resolution.gain_register(), constants.gain)?;
        queue.write_register(unit, resolution.offset_register(), constants.offset)?;
    }

    #[cfg(feature = "defmt")]
    defmt::debug!(
        "{} calibrated: RES25={=u16} RES75={=u16} GCC={=u16:#x} OCC={=u16:#x}",
        unit,
        res25,
        res75,
        constants.gain,
        constants.offset
    );
    #[cfg(feature = "tracing")]
    tracing::debug!(%unit, res25, res75, gain = constants.gain, offset = constants.offset, "calibrated");

    Ok(constants)
}

/// Point the alternate configurations of `unit` at their reduced
/// resolutions: alternate 1 at 10 bit, alternate 2 at 8 bit.
pub fn select_alternate_resolutions<B: EqadcBus>(
    queue: &mut CommandQueue<'_, B>,
    unit: AdcUnit,
) -> Result<(), QueueError> {
    for resolution in Resolution::ALL {
        if let Some(reg) = resolution.control_register() {
            queue.write_register(unit, reg, resolution.ressel())?;
        }
    }
    Ok(())
}
