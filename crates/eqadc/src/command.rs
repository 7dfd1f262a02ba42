//! Command word encoder and decoder.
//!
//! Every converter access is a 32-bit command message:
//!
//! | Bits   | Register write | Register read | Conversion      |
//! |--------|----------------|---------------|-----------------|
//! | 31     | EOQ            | EOQ           | EOQ             |
//! | 30     | PAUSE          | PAUSE         | PAUSE           |
//! | 25     | BN (ADC1)      | BN (ADC1)     | BN (ADC1)       |
//! | 24     | R/W = 0        | R/W = 1       | CAL             |
//! | 23..20 | payload[15:12] | message tag   | message tag     |
//! | 19..8  | payload[11:0]  | unused        | channel (15..8) |
//! | 7..0   | register addr  | register addr | 0               |
//!
//! The converter tells conversions from register commands by the address
//! byte: address 0 is reserved, so a zero low byte is a conversion.

use core::fmt;

use crate::error::OutOfRangeError;
use crate::fifo::FifoId;
use crate::regs::{
    ADC_REG_AC1CR, ADC_REG_AC1GCCR, ADC_REG_AC1OCCR, ADC_REG_AC2CR, ADC_REG_AC2GCCR,
    ADC_REG_AC2OCCR, ADC_REG_CR, ADC_REG_GCCR, ADC_REG_OCCR, ADC_REG_TBCR, ADC_REG_TSCR,
    CHANNEL_VREF_25, CHANNEL_VREF_75, CMD_ADDR_MASK, CMD_BN, CMD_CHANNEL_MASK,
    CMD_CHANNEL_SHIFT, CMD_EOQ, CMD_RW_CAL, CMD_TAG_MASK, CMD_TAG_SHIFT, CMD_VALUE_SHIFT,
};

// ── AdcUnit ──────────────────────────────────────────────────────────────────

/// One of the two on-chip converters of an eQADC pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcUnit {
    /// ADC0 (buffer number 0).
    Adc0,
    /// ADC1 (buffer number 1).
    Adc1,
}

impl AdcUnit {
    /// Both converters, in the order the enable/disable writes go out.
    pub const PAIR: [AdcUnit; 2] = [AdcUnit::Adc0, AdcUnit::Adc1];

    /// BN bit for this converter.
    const fn buffer_bit(self) -> u32 {
        match self {
            Self::Adc0 => 0,
            Self::Adc1 => CMD_BN,
        }
    }

    /// Zero-based index (0 for ADC0, 1 for ADC1).
    pub const fn index(self) -> usize {
        match self {
            Self::Adc0 => 0,
            Self::Adc1 => 1,
        }
    }
}

impl fmt::Display for AdcUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adc0 => f.write_str("ADC0"),
            Self::Adc1 => f.write_str("ADC1"),
        }
    }
}

// ── AdcRegister ──────────────────────────────────────────────────────────────

/// Address of a converter-internal register.
///
/// Address 0 is reserved (it marks conversion commands), so it is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct AdcRegister(u8);

impl AdcRegister {
    /// Control register.
    pub const CR: Self = Self(ADC_REG_CR);
    /// Time stamp control register.
    pub const TSCR: Self = Self(ADC_REG_TSCR);
    /// Time base counter register.
    pub const TBCR: Self = Self(ADC_REG_TBCR);
    /// Gain constant, default configuration.
    pub const GCCR: Self = Self(ADC_REG_GCCR);
    /// Offset constant, default configuration.
    pub const OCCR: Self = Self(ADC_REG_OCCR);
    /// Alternate configuration 1 control.
    pub const AC1CR: Self = Self(ADC_REG_AC1CR);
    /// Alternate configuration 1 gain constant.
    pub const AC1GCCR: Self = Self(ADC_REG_AC1GCCR);
    /// Alternate configuration 1 offset constant.
    pub const AC1OCCR: Self = Self(ADC_REG_AC1OCCR);
    /// Alternate configuration 2 control.
    pub const AC2CR: Self = Self(ADC_REG_AC2CR);
    /// Alternate configuration 2 gain constant.
    pub const AC2GCCR: Self = Self(ADC_REG_AC2GCCR);
    /// Alternate configuration 2 offset constant.
    pub const AC2OCCR: Self = Self(ADC_REG_AC2OCCR);

    /// Create a register address, rejecting the reserved address 0.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `addr == 0`.
    pub const fn new(addr: u8) -> Result<Self, OutOfRangeError> {
        if addr == 0 {
            Err(OutOfRangeError {
                value: 0,
                min: 1,
                max: 0xFF,
            })
        } else {
            Ok(Self(addr))
        }
    }

    /// Raw 8-bit address.
    pub const fn addr(self) -> u8 {
        self.0
    }
}

// ── Channel / Reference ──────────────────────────────────────────────────────

/// Conversion channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Channel(pub u8);

/// Internal reference voltages sampled during calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// 25% of (VRH - VRL), channel 44.
    Quarter,
    /// 75% of (VRH - VRL), channel 43.
    ThreeQuarters,
}

impl Reference {
    /// Channel the converter samples for this reference.
    pub const fn channel(self) -> Channel {
        match self {
            Self::Quarter => Channel(CHANNEL_VREF_25),
            Self::ThreeQuarters => Channel(CHANNEL_VREF_75),
        }
    }
}

// ── Command ──────────────────────────────────────────────────────────────────

/// An encoded 32-bit command message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Command(u32);

/// Decoded view of a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    /// Write `value` into `reg` of `unit`.
    WriteRegister {
        /// Target converter.
        unit: AdcUnit,
        /// Target register.
        reg: AdcRegister,
        /// 16-bit payload.
        value: u16,
    },
    /// Read `reg` of `unit`; the value is returned to RFIFO `tag`.
    ReadRegister {
        /// Target converter.
        unit: AdcUnit,
        /// Source register.
        reg: AdcRegister,
        /// Destination message tag.
        tag: u8,
    },
    /// Convert `channel` on `unit`; the result is returned to RFIFO `tag`.
    Convert {
        /// Converter doing the conversion.
        unit: AdcUnit,
        /// Channel to sample.
        channel: Channel,
        /// Destination message tag.
        tag: u8,
        /// Whether the result goes through the gain/offset correction.
        calibrated: bool,
    },
}

#[allow(clippy::cast_lossless)] // `as u32` widening is the only option in const fn
impl Command {
    /// Register write command.
    pub const fn write_register(unit: AdcUnit, reg: AdcRegister, value: u16) -> Self {
        Self(unit.buffer_bit() | ((value as u32) << CMD_VALUE_SHIFT) | reg.0 as u32)
    }

    /// Register read command; the value comes back through RFIFO `tag`.
    pub const fn read_register(unit: AdcUnit, reg: AdcRegister, tag: FifoId) -> Self {
        Self(
            unit.buffer_bit()
                | CMD_RW_CAL
                | ((tag.index() as u32) << CMD_TAG_SHIFT)
                | reg.0 as u32,
        )
    }

    /// Uncalibrated conversion of `channel`, result to RFIFO `tag`.
    pub const fn convert(unit: AdcUnit, channel: Channel, tag: FifoId) -> Self {
        Self(
            unit.buffer_bit()
                | ((tag.index() as u32) << CMD_TAG_SHIFT)
                | ((channel.0 as u32) << CMD_CHANNEL_SHIFT),
        )
    }

    /// Raw sample of an internal reference voltage.
    pub const fn sample_reference(unit: AdcUnit, reference: Reference, tag: FifoId) -> Self {
        Self::convert(unit, reference.channel(), tag)
    }

    /// Same command with the end-of-queue bit set.
    pub const fn with_end_of_queue(self) -> Self {
        Self(self.0 | CMD_EOQ)
    }

    /// Wrap a raw word (e.g. one captured by a test double).
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw word written into CFPR.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether the end-of-queue bit is set.
    pub const fn is_end_of_queue(self) -> bool {
        self.0 & CMD_EOQ != 0
    }

    /// Converter selected by the BN bit.
    pub const fn unit(self) -> AdcUnit {
        if self.0 & CMD_BN == 0 {
            AdcUnit::Adc0
        } else {
            AdcUnit::Adc1
        }
    }

    /// Decode the operation carried by this word.
    #[allow(clippy::cast_possible_truncation)] // every field is masked to its width first
    pub const fn kind(self) -> CommandKind {
        let unit = self.unit();
        let addr = (self.0 & CMD_ADDR_MASK) as u8;
        let tag = ((self.0 >> CMD_TAG_SHIFT) & CMD_TAG_MASK) as u8;
        let rw_cal = self.0 & CMD_RW_CAL != 0;
        if addr == 0 {
            CommandKind::Convert {
                unit,
                channel: Channel(((self.0 >> CMD_CHANNEL_SHIFT) & CMD_CHANNEL_MASK) as u8),
                tag,
                calibrated: rw_cal,
            }
        } else if rw_cal {
            CommandKind::ReadRegister {
                unit,
                reg: AdcRegister(addr),
                tag,
            }
        } else {
            CommandKind::WriteRegister {
                unit,
                reg: AdcRegister(addr),
                value: ((self.0 >> CMD_VALUE_SHIFT) & 0xFFFF) as u16,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_samples_match_legacy_opcodes() {
        // 0x2C00 / 0x2B00 are the 25% / 75% sample words for ADC0 on RFIFO0.
        let q = Command::sample_reference(AdcUnit::Adc0, Reference::Quarter, FifoId::CFIFO0);
        let t = Command::sample_reference(AdcUnit::Adc0, Reference::ThreeQuarters, FifoId::CFIFO0);
        assert_eq!(q.raw(), 0x0000_2C00);
        assert_eq!(t.raw(), 0x0000_2B00);

        let q1 = Command::sample_reference(AdcUnit::Adc1, Reference::Quarter, FifoId::CFIFO0);
        assert_eq!(q1.raw(), 0x0200_2C00);
    }

    #[test]
    fn write_register_places_payload_above_address() {
        let cmd = Command::write_register(AdcUnit::Adc1, AdcRegister::CR, 0x8003);
        assert_eq!(cmd.raw(), 0x0280_0301);
    }

    #[test]
    fn write_register_never_sets_read_bit() {
        let cmd = Command::write_register(AdcUnit::Adc0, AdcRegister::OCCR, 0xFFFF);
        assert_eq!(cmd.raw() & CMD_RW_CAL, 0);
        assert_eq!(cmd.raw(), 0x00FF_FF05);
    }

    #[test]
    fn read_register_tags_destination_fifo() {
        let cmd = Command::read_register(AdcUnit::Adc0, AdcRegister::GCCR, FifoId::CFIFO3);
        assert_eq!(cmd.raw(), 0x0130_0004);
        assert_eq!(
            cmd.kind(),
            CommandKind::ReadRegister {
                unit: AdcUnit::Adc0,
                reg: AdcRegister::GCCR,
                tag: 3
            }
        );
    }

    #[test]
    fn conversion_decodes_as_convert() {
        let cmd = Command::sample_reference(AdcUnit::Adc1, Reference::ThreeQuarters, FifoId::CFIFO0);
        assert_eq!(
            cmd.kind(),
            CommandKind::Convert {
                unit: AdcUnit::Adc1,
                channel: Channel(43),
                tag: 0,
                calibrated: false
            }
        );
    }

    #[test]
    fn end_of_queue_is_orthogonal_to_kind() {
        let cmd = Command::write_register(AdcUnit::Adc0, AdcRegister::CR, 0x8000);
        let eoq = cmd.with_end_of_queue();
        assert!(eoq.is_end_of_queue());
        assert!(!cmd.is_end_of_queue());
        assert_eq!(cmd.kind(), eoq.kind());
    }

    #[test]
    fn register_address_zero_is_rejected() {
        assert!(AdcRegister::new(0).is_err());
        assert_eq!(AdcRegister::new(0x31), Ok(AdcRegister::AC1GCCR));
    }

    #[test]
    fn unit_display_matches_reference_manual_names() {
        assert_eq!(AdcUnit::Adc0.to_string(), "ADC0");
        assert_eq!(AdcUnit::Adc1.to_string(), "ADC1");
    }
}
