//! eQADC register map and bit-field constants.
//!
//! Reference: Freescale/ST SPC563M (MPC5634M) reference manual, chapter
//! "Enhanced Queued Analog-to-Digital Converter (eQADC)", and the MPC5554
//! eQADC chapter for the command message formats.
//!
//! Bit numbers below are little-endian (bit 0 = LSB), translated from the
//! manual's big-endian numbering.
//!
//! # Two register spaces
//!
//! - **Module registers** (CFCR, IDCR, FISR, CFPR, RFPR, CFTCR, CFSR) are
//!   memory mapped and reached through [`EqadcBus`](crate::EqadcBus).
//! - **Converter registers** (CR, GCCR, OCCR, AC1CR, …) live inside ADC0 and
//!   ADC1 and are only reachable with command words pushed through a CFIFO.

// ---------------------------------------------------------------------------
// Module memory map (offsets from the eQADC base)
// ---------------------------------------------------------------------------

/// eQADC module base address on SPC563M.
pub const EQADC_BASE: usize = 0xFFF8_0000;

/// Number of CFIFO/RFIFO pairs.
pub const FIFO_COUNT: u8 = 6;

/// CFIFO depth in command words. A push while this many entries are queued
/// must wait for the peripheral to consume one.
pub const CFIFO_DEPTH: u32 = 4;

/// RFIFO depth in result words.
pub const RFIFO_DEPTH: u32 = 4;

/// CFIFO push registers, 32 bit, stride 4.
pub const CFPR_OFFSET: usize = 0x010;
/// RFIFO pop registers, 32 bit (result in the low half), stride 4.
pub const RFPR_OFFSET: usize = 0x030;
/// CFIFO control registers, 16 bit, stride 2.
pub const CFCR_OFFSET: usize = 0x050;
/// Interrupt and eDMA control registers, 16 bit, stride 2.
pub const IDCR_OFFSET: usize = 0x060;
/// FIFO and interrupt status registers, 32 bit, stride 4.
pub const FISR_OFFSET: usize = 0x070;
/// CFIFO transfer counter registers, 16 bit, stride 2.
pub const CFTCR_OFFSET: usize = 0x090;
/// CFIFO status register (all FIFOs), 32 bit.
pub const CFSR_OFFSET: usize = 0x0AC;

// ---------------------------------------------------------------------------
// CFCR: CFIFO control register (16 bit)
// ---------------------------------------------------------------------------

/// Single-scan enable: arms a single-scan mode queue.
pub const CFCR_SSE: u16 = 1 << 10;
/// CFIFO invalidate (write-only pulse): flushes every queued entry.
pub const CFCR_CFINV: u16 = 1 << 9;
/// Operation mode field, bits 7..4.
pub const CFCR_MODE_MASK: u16 = 0xF << 4;
/// Mode: CFIFO disabled.
pub const CFCR_MODE_DISABLED: u16 = 0 << 4;
/// Mode: software-triggered single scan.
pub const CFCR_MODE_SWSS: u16 = 1 << 4;
/// Mode: software-triggered continuous scan.
pub const CFCR_MODE_SWCS: u16 = 9 << 4;

// ---------------------------------------------------------------------------
// IDCR: interrupt and eDMA control register (16 bit)
// ---------------------------------------------------------------------------

/// Non-coherency interrupt enable.
pub const IDCR_NCIE: u16 = 1 << 15;
/// Trigger overrun interrupt enable.
pub const IDCR_TORIE: u16 = 1 << 14;
/// Pause interrupt enable.
pub const IDCR_PIE: u16 = 1 << 13;
/// End-of-queue interrupt enable.
pub const IDCR_EOQIE: u16 = 1 << 12;
/// CFIFO underflow interrupt enable.
pub const IDCR_CFUIE: u16 = 1 << 11;
/// CFIFO fill enable.
pub const IDCR_CFFE: u16 = 1 << 9;
/// CFIFO fill select (eDMA instead of interrupt).
pub const IDCR_CFFS: u16 = 1 << 8;
/// RFIFO overflow interrupt enable.
pub const IDCR_RFOIE: u16 = 1 << 3;
/// RFIFO drain enable.
pub const IDCR_RFDE: u16 = 1 << 1;
/// RFIFO drain select (eDMA instead of interrupt).
pub const IDCR_RFDS: u16 = 1 << 0;

// ---------------------------------------------------------------------------
// FISR: FIFO and interrupt status register (32 bit)
// ---------------------------------------------------------------------------

/// Non-coherency flag.
pub const FISR_NCF: u32 = 1 << 31;
/// Trigger overrun flag.
pub const FISR_TORF: u32 = 1 << 30;
/// Pause flag.
pub const FISR_PF: u32 = 1 << 29;
/// End-of-queue flag.
pub const FISR_EOQF: u32 = 1 << 28;
/// CFIFO underflow flag.
pub const FISR_CFUF: u32 = 1 << 27;
/// CFIFO single-scan status (read only).
pub const FISR_SSS: u32 = 1 << 26;
/// CFIFO fill flag.
pub const FISR_CFFF: u32 = 1 << 25;
/// RFIFO overflow flag.
pub const FISR_RFOF: u32 = 1 << 19;
/// RFIFO drain flag.
pub const FISR_RFDF: u32 = 1 << 17;
/// CFIFO entry counter field, bits 15..12.
pub const FISR_CFCTR_SHIFT: u32 = 12;
/// RFIFO entry counter field, bits 7..4.
pub const FISR_RFCTR_SHIFT: u32 = 4;
/// Width mask of the 4-bit counter fields.
pub const FISR_COUNTER_MASK: u32 = 0xF;

/// Every write-1-to-clear flag of a FISR register.
pub const FISR_CLEAR_MASK: u32 = FISR_NCF
    | FISR_TORF
    | FISR_PF
    | FISR_EOQF
    | FISR_CFUF
    | FISR_CFFF
    | FISR_RFOF
    | FISR_RFDF;

// ---------------------------------------------------------------------------
// CFSR: CFIFO status register (32 bit, two bits per FIFO)
// ---------------------------------------------------------------------------

/// CFIFO 0 status field; FIFO `n` is this mask shifted right by `2 * n`.
/// A zero field means the FIFO is idle.
pub const CFSR_CFS0_MASK: u32 = 0xC000_0000;

// ---------------------------------------------------------------------------
// Command word fields
// ---------------------------------------------------------------------------

/// End of queue.
pub const CMD_EOQ: u32 = 1 << 31;
/// Pause.
pub const CMD_PAUSE: u32 = 1 << 30;
/// External buffer select (always 0: both converters are on chip).
pub const CMD_EB: u32 = 1 << 26;
/// Buffer number: set for ADC1, clear for ADC0.
pub const CMD_BN: u32 = 1 << 25;
/// Register read (configuration commands) / calibrated result (conversions).
pub const CMD_RW_CAL: u32 = 1 << 24;
/// Message tag field (destination RFIFO), bits 23..20.
pub const CMD_TAG_SHIFT: u32 = 20;
/// Message tag width mask.
pub const CMD_TAG_MASK: u32 = 0xF;
/// Write payload field, bits 23..8.
pub const CMD_VALUE_SHIFT: u32 = 8;
/// Channel number field of conversion commands, bits 15..8.
pub const CMD_CHANNEL_SHIFT: u32 = 8;
/// Channel number width mask.
pub const CMD_CHANNEL_MASK: u32 = 0xFF;
/// Register address field, bits 7..0. Zero marks a conversion command.
pub const CMD_ADDR_MASK: u32 = 0xFF;

// ---------------------------------------------------------------------------
// Converter registers (reached through commands only)
// ---------------------------------------------------------------------------

/// ADC control register.
pub const ADC_REG_CR: u8 = 0x01;
/// Time stamp control register.
pub const ADC_REG_TSCR: u8 = 0x02;
/// Time base counter register.
pub const ADC_REG_TBCR: u8 = 0x03;
/// Gain calibration constant, default configuration (12 bit).
pub const ADC_REG_GCCR: u8 = 0x04;
/// Offset calibration constant, default configuration (12 bit).
pub const ADC_REG_OCCR: u8 = 0x05;
/// Alternate configuration 1 control register.
pub const ADC_REG_AC1CR: u8 = 0x30;
/// Alternate configuration 1 gain calibration constant.
pub const ADC_REG_AC1GCCR: u8 = 0x31;
/// Alternate configuration 1 offset calibration constant.
pub const ADC_REG_AC1OCCR: u8 = 0x32;
/// Alternate configuration 2 control register.
pub const ADC_REG_AC2CR: u8 = 0x34;
/// Alternate configuration 2 gain calibration constant.
pub const ADC_REG_AC2GCCR: u8 = 0x35;
/// Alternate configuration 2 offset calibration constant.
pub const ADC_REG_AC2OCCR: u8 = 0x36;

/// CR: converter enable.
pub const ADC_CR_EN: u16 = 1 << 15;
/// CR: external multiplexer enable.
pub const ADC_CR_EMUX: u16 = 1 << 11;
/// CR: clock prescaler field, bits 4..0 (divide by `2 * (field + 1)`).
pub const ADC_CR_CLK_PS_MASK: u16 = 0x1F;

/// ACR: resolution select field, bits 7..6.
pub const ADC_ACR_RESSEL_SHIFT: u16 = 6;
/// ACR: 12-bit resolution.
pub const ADC_ACR_RESSEL_12BITS: u16 = 0 << ADC_ACR_RESSEL_SHIFT;
/// ACR: 10-bit resolution.
pub const ADC_ACR_RESSEL_10BITS: u16 = 1 << ADC_ACR_RESSEL_SHIFT;
/// ACR: 8-bit resolution.
pub const ADC_ACR_RESSEL_8BITS: u16 = 2 << ADC_ACR_RESSEL_SHIFT;

// ---------------------------------------------------------------------------
// Internal reference channels
// ---------------------------------------------------------------------------

/// Channel 40: VRL.
pub const CHANNEL_VRL: u8 = 40;
/// Channel 41: VRH.
pub const CHANNEL_VRH: u8 = 41;
/// Channel 42: 50% of (VRH - VRL).
pub const CHANNEL_VREF_50: u8 = 42;
/// Channel 43: 75% of (VRH - VRL).
pub const CHANNEL_VREF_75: u8 = 43;
/// Channel 44: 25% of (VRH - VRL).
pub const CHANNEL_VREF_25: u8 = 44;

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Numerator of the gain formula: `GCC = 0x0800_0000 / (RES75 - RES25)`.
pub const GAIN_NUMERATOR: u32 = 0x0800_0000;

/// Ideal 14-bit conversion result for 75% of (VRH - VRL), minus 2.
pub const IDEAL_RES75_MINUS_2: u32 = 12286;

/// Right shift applied to `GCC * RES75` (GCC is a 1.14 fixed-point gain).
pub const GAIN_FRACTION_BITS: u32 = 14;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fisr_clear_mask_matches_reference_manual() {
        assert_eq!(FISR_CLEAR_MASK, 0xFA0A_0000);
    }

    #[test]
    fn fisr_clear_mask_leaves_counters_and_sss_alone() {
        assert_eq!(FISR_CLEAR_MASK & FISR_SSS, 0);
        assert_eq!(FISR_CLEAR_MASK & 0xFFFF, 0);
    }

    #[test]
    fn calibration_register_sets_are_distinct() {
        let regs = [
            ADC_REG_GCCR,
            ADC_REG_OCCR,
            ADC_REG_AC1GCCR,
            ADC_REG_AC1OCCR,
            ADC_REG_AC2GCCR,
            ADC_REG_AC2OCCR,
        ];
        for (i, a) in regs.iter().enumerate() {
            for b in regs.iter().skip(i.saturating_add(1)) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn converter_register_addresses_are_never_zero() {
        // Address 0 is how the converter tells conversions from register commands.
        for reg in [ADC_REG_CR, ADC_REG_GCCR, ADC_REG_AC1CR, ADC_REG_AC2OCCR] {
            assert_ne!(reg, 0);
        }
    }

    #[test]
    fn reference_channels_match_datasheet() {
        assert_eq!(CHANNEL_VREF_25, 44);
        assert_eq!(CHANNEL_VREF_75, 43);
    }

    #[test]
    fn ressel_values_fit_the_field() {
        assert_eq!(ADC_ACR_RESSEL_10BITS, 0x40);
        assert_eq!(ADC_ACR_RESSEL_8BITS, 0x80);
        assert_eq!(ADC_ACR_RESSEL_12BITS, 0);
    }
}
