//! Paired converter power control.
//!
//! Both converters of an eQADC pair must be enabled before either one is
//! calibrated or used. The pair is always switched together, ADC0 first.

use crate::bus::EqadcBus;
use crate::command::{AdcRegister, AdcUnit};
use crate::config::ClockPrescaler;
use crate::error::QueueError;
use crate::fifo::CommandQueue;
use crate::regs::ADC_CR_EN;

/// CR value for the pair: the prescaler, plus EN when `enabled`.
pub const fn control_word(enabled: bool, prescaler: ClockPrescaler) -> u16 {
    if enabled {
        prescaler.field() | ADC_CR_EN
    } else {
        prescaler.field()
    }
}

/// Enable or disable both converters with two CR writes, ADC0 then ADC1.
pub fn set_units_enabled<B: EqadcBus>(
    queue: &mut CommandQueue<'_, B>,
    enabled: bool,
    prescaler: ClockPrescaler,
) -> Result<(), QueueError> {
    let cr = control_word(enabled, prescaler);
    for unit in AdcUnit::PAIR {
        queue.write_register(unit, AdcRegister::CR, cr)?;
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("ADC pair enabled={=bool} (CR={=u16:#x})", enabled, cr);
    #[cfg(feature = "tracing")]
    tracing::debug!(enabled, cr, "ADC pair control written");
    Ok(())
}
