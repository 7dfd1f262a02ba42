//! Command and result queue interfaces.
//!
//! A [`CommandQueue`] binds one CFIFO/RFIFO pair of a bus to a poll bound and
//! provides the primitives the rest of the crate is written in:
//!
//! - [`push`](CommandQueue::push): wait for a free slot, write CFPR
//! - [`wait_for`](CommandQueue::wait_for) then [`read_one`](CommandQueue::read_one):
//!   collect results in push order
//! - [`enable`](CommandQueue::enable) / [`disable`](CommandQueue::disable):
//!   bring the queue in and out of service
//!
//! Results are routed by the message tag of each command. Commands built here
//! always tag the RFIFO with the same index as the CFIFO they are pushed to.

use core::fmt;

use crate::bus::EqadcBus;
use crate::command::{AdcRegister, AdcUnit, Command};
use crate::error::{OutOfRangeError, QueueError, Wait};
use crate::poll::{poll_until, PollBound};
use crate::regs::{
    CFCR_CFINV, CFCR_MODE_DISABLED, CFIFO_DEPTH, CFSR_CFS0_MASK, FIFO_COUNT, FISR_CFCTR_SHIFT,
    FISR_CLEAR_MASK, FISR_COUNTER_MASK, FISR_RFCTR_SHIFT,
};

// ── FifoId ───────────────────────────────────────────────────────────────────

/// Index of a CFIFO/RFIFO pair, 0..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct FifoId(u8);

#[allow(clippy::cast_lossless)] // `as u32` widening is the only option in const fn
impl FifoId {
    /// FIFO pair 0 (the initialization scratch queue).
    pub const CFIFO0: Self = Self(0);
    /// FIFO pair 1.
    pub const CFIFO1: Self = Self(1);
    /// FIFO pair 2.
    pub const CFIFO2: Self = Self(2);
    /// FIFO pair 3.
    pub const CFIFO3: Self = Self(3);
    /// FIFO pair 4.
    pub const CFIFO4: Self = Self(4);
    /// FIFO pair 5.
    pub const CFIFO5: Self = Self(5);

    /// Every FIFO pair, in index order.
    pub const ALL: [Self; FIFO_COUNT as usize] = [
        Self::CFIFO0,
        Self::CFIFO1,
        Self::CFIFO2,
        Self::CFIFO3,
        Self::CFIFO4,
        Self::CFIFO5,
    ];

    /// Create a FIFO index, rejecting values above 5.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `index >= 6`.
    pub const fn new(index: u8) -> Result<Self, OutOfRangeError> {
        if index >= FIFO_COUNT {
            Err(OutOfRangeError {
                value: index as u32,
                min: 0,
                max: FIFO_COUNT.saturating_sub(1) as u32,
            })
        } else {
            Ok(Self(index))
        }
    }

    /// Zero-based index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// This FIFO's two-bit field in CFSR.
    pub const fn cfsr_mask(self) -> u32 {
        CFSR_CFS0_MASK >> ((self.0 as u32) << 1)
    }
}

impl fmt::Display for FifoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CFIFO{}", self.0)
    }
}

// ── FifoStatus ───────────────────────────────────────────────────────────────

/// Snapshot of a FISR register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct FifoStatus(pub u32);

impl FifoStatus {
    /// Commands currently queued in the CFIFO.
    pub const fn cfctr(self) -> u32 {
        (self.0 >> FISR_CFCTR_SHIFT) & FISR_COUNTER_MASK
    }

    /// Result words currently counted in the RFIFO.
    pub const fn rfctr(self) -> u32 {
        (self.0 >> FISR_RFCTR_SHIFT) & FISR_COUNTER_MASK
    }

    /// Whether another command can be pushed without overflowing.
    pub const fn has_command_space(self) -> bool {
        self.cfctr() < CFIFO_DEPTH
    }
}

// ── CommandQueue ─────────────────────────────────────────────────────────────

/// One CFIFO/RFIFO pair on a bus.
pub struct CommandQueue<'a, B: EqadcBus> {
    bus: &'a mut B,
    fifo: FifoId,
    bound: PollBound,
}

impl<'a, B: EqadcBus> CommandQueue<'a, B> {
    /// Bind `fifo` of `bus`; every wait made through this handle uses `bound`.
    pub fn new(bus: &'a mut B, fifo: FifoId, bound: PollBound) -> Self {
        Self { bus, fifo, bound }
    }

    /// The FIFO pair this handle drives.
    pub fn fifo(&self) -> FifoId {
        self.fifo
    }

    /// Current FISR contents.
    pub fn status(&mut self) -> FifoStatus {
        FifoStatus(self.bus.read_fisr(self.fifo))
    }

    /// Put the queue into service: CFCR first, then IDCR.
    pub fn enable(&mut self, cfcr: u16, idcr: u16) {
        self.bus.write_cfcr(self.fifo, cfcr);
        self.bus.write_idcr(self.fifo, idcr);
    }

    /// Take the queue out of service and reset it.
    ///
    /// Strict order:
    /// 1. CFCR = disabled
    /// 2. IDCR = 0
    /// 3. wait for the CFSR field of this FIFO to read idle
    /// 4. CFCR = CFINV | disabled
    /// 5. FISR = clear mask
    /// 6. CFTCR = 0
    pub fn disable(&mut self) -> Result<(), QueueError> {
        let fifo = self.fifo;
        self.bus.write_cfcr(fifo, CFCR_MODE_DISABLED);
        self.bus.write_idcr(fifo, 0);

        let bus = &mut *self.bus;
        poll_until(self.bound, || bus.read_cfsr(), |cfsr| cfsr & fifo.cfsr_mask() == 0)
            .map_err(|_| QueueError {
                fifo,
                wait: Wait::Idle,
            })?;

        self.bus.write_cfcr(fifo, CFCR_CFINV | CFCR_MODE_DISABLED);
        self.bus.write_fisr(fifo, FISR_CLEAR_MASK);
        self.bus.write_cftcr(fifo, 0);
        Ok(())
    }

    /// Push one command, waiting while the CFIFO holds its full depth.
    pub fn push(&mut self, command: Command) -> Result<(), QueueError> {
        self.wait_status(Wait::CommandSpace, FifoStatus::has_command_space)?;
        self.bus.push_command(self.fifo, command.raw());
        Ok(())
    }

    /// Wait until at least `count` result words are in the RFIFO, then clear
    /// the FIFO's flags.
    ///
    /// The clear also resets the result counter just observed. Exactly
    /// `count` [`read_one`](Self::read_one) calls may follow.
    pub fn wait_for(&mut self, count: u32) -> Result<(), QueueError> {
        self.wait_status(Wait::Results { count }, |s| s.rfctr() >= count)?;
        self.bus.write_fisr(self.fifo, FISR_CLEAR_MASK);
        Ok(())
    }

    /// Pop the oldest result word. Only valid after a covering
    /// [`wait_for`](Self::wait_for).
    pub fn read_one(&mut self) -> u16 {
        self.bus.pop_result(self.fifo)
    }

    /// Wait until every queued command has been transferred to the converters.
    pub fn drain(&mut self) -> Result<(), QueueError> {
        self.wait_status(Wait::Drained, |s| s.cfctr() == 0)?;
        Ok(())
    }

    /// Write a converter register.
    pub fn write_register(
        &mut self,
        unit: AdcUnit,
        reg: AdcRegister,
        value: u16,
    ) -> Result<(), QueueError> {
        self.push(Command::write_register(unit, reg, value))
    }

    /// Read a converter register back through this queue's RFIFO.
    pub fn read_register(&mut self, unit: AdcUnit, reg: AdcRegister) -> Result<u16, QueueError> {
        self.push(Command::read_register(unit, reg, self.fifo))?;
        self.wait_for(1)?;
        Ok(self.read_one())
    }

    fn wait_status(
        &mut self,
        wait: Wait,
        mut ready: impl FnMut(FifoStatus) -> bool,
    ) -> Result<FifoStatus, QueueError> {
        let fifo = self.fifo;
        let bus = &mut *self.bus;
        poll_until(self.bound, || FifoStatus(bus.read_fisr(fifo)), |s| ready(*s))
            .map_err(|_| QueueError { fifo, wait })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use crate::mocks::{BusOp, SimulatedEqadc};
    use crate::regs::{CFCR_MODE_SWSS, CFCR_SSE};

    fn active(sim: &mut SimulatedEqadc) {
        CommandQueue::new(sim, FifoId::CFIFO0, PollBound::Forever)
            .enable(CFCR_SSE | CFCR_MODE_SWSS, 0);
    }

    #[test]
    fn fifo_id_rejects_index_six() {
        assert!(FifoId::new(5).is_ok());
        assert_eq!(
            FifoId::new(6),
            Err(OutOfRangeError {
                value: 6,
                min: 0,
                max: 5
            })
        );
    }

    #[test]
    fn cfsr_mask_walks_two_bits_per_fifo() {
        assert_eq!(FifoId::CFIFO0.cfsr_mask(), 0xC000_0000);
        assert_eq!(FifoId::CFIFO1.cfsr_mask(), 0x3000_0000);
        assert_eq!(FifoId::CFIFO5.cfsr_mask(), 0x0030_0000);
    }

    #[test]
    fn fifo_status_extracts_counters() {
        let s = FifoStatus(0xFA0A_4030);
        assert_eq!(s.cfctr(), 4);
        assert_eq!(s.rfctr(), 3);
        assert!(!s.has_command_space());
    }

    #[test]
    fn push_blocks_until_the_cfifo_has_room() {
        let mut sim = SimulatedEqadc::new();
        active(&mut sim);
        sim.hold_commands(true);
        let mut q = CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Attempts(8));
        for _ in 0..4 {
            q.push(Command::write_register(AdcUnit::Adc0, AdcRegister::TSCR, 0))
                .unwrap();
        }
        let err = q
            .push(Command::write_register(AdcUnit::Adc0, AdcRegister::TSCR, 0))
            .unwrap_err();
        assert_eq!(err.wait, Wait::CommandSpace);
        assert!(sim.violations().is_empty(), "{:?}", sim.violations());
        assert_eq!(sim.queued_commands(FifoId::CFIFO0), 4);
    }

    #[test]
    fn push_resumes_once_the_peripheral_consumes_a_command() {
        let mut sim = SimulatedEqadc::new();
        active(&mut sim);
        let mut q = CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Forever);
        for value in 0..10u16 {
            q.push(Command::write_register(AdcUnit::Adc1, AdcRegister::TSCR, value))
                .unwrap();
        }
        q.drain().unwrap();
        assert!(sim.violations().is_empty(), "{:?}", sim.violations());
        assert_eq!(sim.register(AdcUnit::Adc1, AdcRegister::TSCR), 9);
    }

    #[test]
    fn wait_for_clears_flags_after_the_count_is_reached() {
        let mut sim = SimulatedEqadc::new();
        active(&mut sim);
        let mut q = CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Forever);
        q.push(Command::read_register(AdcUnit::Adc0, AdcRegister::CR, FifoId::CFIFO0))
            .unwrap();
        q.wait_for(1).unwrap();
        assert_eq!(q.status().rfctr(), 0);
        let ops = sim.ops();
        let clear = ops
            .iter()
            .rposition(|op| matches!(op, BusOp::WriteFisr { value, .. } if *value == FISR_CLEAR_MASK))
            .unwrap();
        assert!(matches!(ops[clear - 1], BusOp::ReadFisr { .. }));
    }

    #[test]
    fn read_register_round_trips_through_the_rfifo() {
        let mut sim = SimulatedEqadc::new();
        active(&mut sim);
        let mut q = CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Forever);
        q.write_register(AdcUnit::Adc0, AdcRegister::AC1CR, 0x0040).unwrap();
        assert_eq!(q.read_register(AdcUnit::Adc0, AdcRegister::AC1CR).unwrap(), 0x0040);
        assert!(sim.violations().is_empty());
    }

    #[test]
    fn wait_for_times_out_on_a_stalled_peripheral() {
        let mut sim = SimulatedEqadc::new();
        active(&mut sim);
        sim.hold_commands(true);
        let mut q = CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Attempts(16));
        q.push(Command::read_register(AdcUnit::Adc0, AdcRegister::CR, FifoId::CFIFO0))
            .unwrap();
        assert_eq!(
            q.wait_for(1),
            Err(QueueError {
                fifo: FifoId::CFIFO0,
                wait: Wait::Results { count: 1 }
            })
        );
    }

    #[test]
    fn disable_runs_six_steps_in_order() {
        let mut sim = SimulatedEqadc::new();
        active(&mut sim);
        sim.set_busy_polls(FifoId::CFIFO0, 3);
        sim.clear_ops();
        CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Forever)
            .disable()
            .unwrap();
        assert_eq!(
            sim.disable_steps(FifoId::CFIFO0),
            SimulatedEqadc::DISABLE_SEQUENCE.to_vec()
        );
        assert!(!sim.is_fifo_enabled(FifoId::CFIFO0));
    }

    #[test]
    fn disable_reports_a_queue_that_never_goes_idle() {
        let mut sim = SimulatedEqadc::new();
        active(&mut sim);
        sim.set_busy_polls(FifoId::CFIFO0, u32::MAX);
        let err = CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Attempts(10))
            .disable()
            .unwrap_err();
        assert_eq!(err.wait, Wait::Idle);
    }
}
