//! Simulated eQADC for host tests.
//!
//! [`SimulatedEqadc`] implements [`EqadcBus`] with a small behavioural model
//! of the module and its two converters:
//!
//! - CFIFOs hold at most [`CFIFO_DEPTH`] commands. A push into a full CFIFO is
//!   dropped and recorded as a [`Violation`].
//! - The peripheral advances one command per FISR read of an active queue, so
//!   code that never polls never makes progress.
//! - RFCTR counts results since the last FISR clear. A clear credits the
//!   count last observed by a FISR read; each pop spends one credit. A pop
//!   without credit is poisoned: it returns [`SimulatedEqadc::POISON`] and
//!   records a violation.
//! - A conversion while the converter pair is not fully enabled returns
//!   [`SimulatedEqadc::UNPAIRED_RESULT`] and records a violation.
//! - Every bus access is logged as a [`BusOp`].

#![cfg(any(test, feature = "std"))]

use std::vec::Vec;

use crate::bus::EqadcBus;
use crate::command::{AdcRegister, AdcUnit, Command, CommandKind};
use crate::fifo::FifoId;
use crate::regs::{
    ADC_CR_EN, CFCR_CFINV, CFCR_MODE_DISABLED, CFCR_MODE_MASK, CFCR_MODE_SWCS, CFCR_SSE,
    CFIFO_DEPTH, CHANNEL_VREF_25, CHANNEL_VREF_75, FIFO_COUNT, FISR_CFCTR_SHIFT, FISR_CLEAR_MASK,
    FISR_COUNTER_MASK, FISR_RFCTR_SHIFT, FISR_RFOF, RFIFO_DEPTH,
};

const FIFOS: usize = FIFO_COUNT as usize;
const CFIFO_SLOTS: usize = CFIFO_DEPTH as usize;
const RFIFO_SLOTS: usize = RFIFO_DEPTH as usize;

// ── Recording types ──────────────────────────────────────────────────────────

/// One bus access, as seen by the simulated peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    /// CFCRn write.
    WriteCfcr {
        /// Target queue.
        fifo: FifoId,
        /// Written value.
        value: u16,
    },
    /// IDCRn write.
    WriteIdcr {
        /// Target queue.
        fifo: FifoId,
        /// Written value.
        value: u16,
    },
    /// FISRn read.
    ReadFisr {
        /// Target queue.
        fifo: FifoId,
        /// Value returned.
        value: u32,
    },
    /// FISRn write.
    WriteFisr {
        /// Target queue.
        fifo: FifoId,
        /// Written value.
        value: u32,
    },
    /// CFSR read.
    ReadCfsr {
        /// Value returned.
        value: u32,
    },
    /// CFPRn write.
    PushCommand {
        /// Target queue.
        fifo: FifoId,
        /// Pushed command.
        command: Command,
    },
    /// RFPRn read.
    PopResult {
        /// Target queue.
        fifo: FifoId,
        /// Value returned.
        value: u16,
    },
    /// CFTCRn write.
    WriteCftcr {
        /// Target queue.
        fifo: FifoId,
        /// Written value.
        value: u16,
    },
}

/// Protocol misuse detected by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A command was pushed into a full CFIFO and lost.
    CommandOverflow(FifoId),
    /// A result arrived at a full RFIFO and was lost.
    ResultOverflow(FifoId),
    /// A result was popped without a covering wait.
    UnwaitedRead(FifoId),
    /// A result was popped from an empty RFIFO.
    EmptyRead(FifoId),
    /// A conversion ran while the converter pair was not fully enabled.
    UnpairedConversion(AdcUnit),
    /// A command was tagged for a result queue that does not exist.
    BadTag(u8),
}

/// The six observable steps of a queue disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableStep {
    /// CFCR = disabled.
    ModeDisable,
    /// IDCR = 0.
    InterruptClear,
    /// CFSR polled (consecutive reads collapse into one step).
    IdleWait,
    /// CFCR = CFINV | disabled.
    Invalidate,
    /// FISR = clear mask.
    FlagClear,
    /// CFTCR = 0.
    TransferCountClear,
}

// ── Simulated peripheral ─────────────────────────────────────────────────────

#[derive(Default)]
struct Fifo {
    cfcr: u16,
    idcr: u16,
    cftcr: u16,
    triggered: bool,
    commands: heapless::Deque<u32, CFIFO_SLOTS>,
    results: heapless::Deque<u16, RFIFO_SLOTS>,
    /// Results arrived since the last flag clear.
    rfctr: u32,
    /// RFCTR as returned by the most recent FISR read.
    observed_rfctr: u32,
    /// Pops allowed by flag clears so far.
    credit: u32,
    overflowed: bool,
    busy_polls: u32,
}

impl Fifo {
    fn active(&self) -> bool {
        match self.cfcr & CFCR_MODE_MASK {
            CFCR_MODE_DISABLED => false,
            CFCR_MODE_SWCS => true,
            _ => self.triggered,
        }
    }
}

/// Behavioural model of an eQADC module with ADC0 and ADC1.
pub struct SimulatedEqadc {
    fifos: [Fifo; FIFOS],
    registers: [[u16; 256]; 2],
    samples: [(u16, u16); 2],
    hold: bool,
    ops: Vec<BusOp>,
    violations: Vec<Violation>,
}

impl SimulatedEqadc {
    /// Returned by a pop without a covering wait.
    pub const POISON: u16 = 0xDEAD;

    /// Returned by a conversion while the pair is not fully enabled.
    pub const UNPAIRED_RESULT: u16 = 0x0BAD;

    /// Ideal 14-bit results for the 25% and 75% references.
    pub const IDEAL_SAMPLES: (u16, u16) = (4096, 12288);

    /// The order a correct disable must follow.
    pub const DISABLE_SEQUENCE: [DisableStep; 6] = [
        DisableStep::ModeDisable,
        DisableStep::InterruptClear,
        DisableStep::IdleWait,
        DisableStep::Invalidate,
        DisableStep::FlagClear,
        DisableStep::TransferCountClear,
    ];

    /// Powered-on module: every queue disabled, converters off, ideal references.
    pub fn new() -> Self {
        Self {
            fifos: Default::default(),
            registers: [[0; 256]; 2],
            samples: [Self::IDEAL_SAMPLES; 2],
            hold: false,
            ops: Vec::new(),
            violations: Vec::new(),
        }
    }

    // ── Scripting ──

    /// Results returned for `unit`'s 25% and 75% reference conversions.
    pub fn set_reference_samples(&mut self, unit: AdcUnit, res25: u16, res75: u16) {
        if let Some(slot) = self.samples.get_mut(unit.index()) {
            *slot = (res25, res75);
        }
    }

    /// Stop (or resume) executing queued commands.
    pub fn hold_commands(&mut self, hold: bool) {
        self.hold = hold;
    }

    /// Report `fifo` busy in CFSR for the next `polls` reads.
    pub fn set_busy_polls(&mut self, fifo: FifoId, polls: u32) {
        if let Some(f) = self.fifos.get_mut(fifo.index()) {
            f.busy_polls = polls;
        }
    }

    /// Forget the bus log.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    // ── Inspection ──

    /// Every bus access since creation or the last [`clear_ops`](Self::clear_ops).
    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    /// Protocol misuse seen so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Commands pushed into `fifo`, in push order.
    pub fn pushed_commands(&self, fifo: FifoId) -> Vec<Command> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                BusOp::PushCommand { fifo: f, command } if f == fifo => Some(command),
                _ => None,
            })
            .collect()
    }

    /// The steps of the most recent disable of `fifo`, starting at its last
    /// mode-disable write.
    pub fn disable_steps(&self, fifo: FifoId) -> Vec<DisableStep> {
        let start = self
            .ops
            .iter()
            .rposition(|op| {
                matches!(*op, BusOp::WriteCfcr { fifo: f, value } if f == fifo && value == CFCR_MODE_DISABLED)
            })
            .unwrap_or(self.ops.len());

        let mut steps: Vec<DisableStep> = Vec::new();
        for op in self.ops.iter().skip(start) {
            let step = match *op {
                BusOp::WriteCfcr { fifo: f, value } if f == fifo => {
                    if value & CFCR_CFINV != 0 {
                        DisableStep::Invalidate
                    } else {
                        DisableStep::ModeDisable
                    }
                }
                BusOp::WriteIdcr { fifo: f, value: 0 } if f == fifo => DisableStep::InterruptClear,
                BusOp::ReadCfsr { .. } => DisableStep::IdleWait,
                BusOp::WriteFisr { fifo: f, value } if f == fifo && value == FISR_CLEAR_MASK => {
                    DisableStep::FlagClear
                }
                BusOp::WriteCftcr { fifo: f, value: 0 } if f == fifo => {
                    DisableStep::TransferCountClear
                }
                _ => continue,
            };
            if step == DisableStep::IdleWait && steps.last() == Some(&DisableStep::IdleWait) {
                continue;
            }
            steps.push(step);
        }
        steps
    }

    /// Current value of a converter register.
    pub fn register(&self, unit: AdcUnit, reg: AdcRegister) -> u16 {
        self.registers
            .get(unit.index())
            .and_then(|regs| regs.get(usize::from(reg.addr())))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `unit`'s CR has EN set.
    pub fn is_unit_enabled(&self, unit: AdcUnit) -> bool {
        self.register(unit, AdcRegister::CR) & ADC_CR_EN != 0
    }

    /// Whether `fifo` is in a mode other than disabled.
    pub fn is_fifo_enabled(&self, fifo: FifoId) -> bool {
        self.fifo(fifo)
            .is_some_and(|f| f.cfcr & CFCR_MODE_MASK != CFCR_MODE_DISABLED)
    }

    /// Commands waiting in `fifo`'s CFIFO.
    pub fn queued_commands(&self, fifo: FifoId) -> usize {
        self.fifo(fifo).map_or(0, |f| f.commands.len())
    }

    /// Results waiting in `fifo`'s RFIFO.
    pub fn queued_results(&self, fifo: FifoId) -> usize {
        self.fifo(fifo).map_or(0, |f| f.results.len())
    }

    /// Last IDCR value written to `fifo`.
    pub fn idcr(&self, fifo: FifoId) -> u16 {
        self.fifo(fifo).map_or(0, |f| f.idcr)
    }

    /// Last CFTCR value written to `fifo`.
    pub fn cftcr(&self, fifo: FifoId) -> u16 {
        self.fifo(fifo).map_or(0, |f| f.cftcr)
    }

    // ── Model ──

    fn fifo(&self, fifo: FifoId) -> Option<&Fifo> {
        self.fifos.get(fifo.index())
    }

    fn fifo_mut(&mut self, fifo: FifoId) -> Option<&mut Fifo> {
        self.fifos.get_mut(fifo.index())
    }

    /// Execute the head command of `fifo` if the queue is running.
    fn step(&mut self, fifo: FifoId) {
        if self.hold {
            return;
        }
        let Some(raw) = self
            .fifo_mut(fifo)
            .filter(|f| f.active())
            .and_then(|f| f.commands.pop_front())
        else {
            return;
        };
        self.execute(Command::from_raw(raw));
    }

    fn execute(&mut self, command: Command) {
        match command.kind() {
            CommandKind::WriteRegister { unit, reg, value } => {
                if let Some(slot) = self
                    .registers
                    .get_mut(unit.index())
                    .and_then(|regs| regs.get_mut(usize::from(reg.addr())))
                {
                    *slot = value;
                }
            }
            CommandKind::ReadRegister { unit, reg, tag } => {
                let value = self.register(unit, reg);
                self.deliver(tag, value);
            }
            CommandKind::Convert {
                unit, channel, tag, ..
            } => {
                let value = if AdcUnit::PAIR.iter().all(|&u| self.is_unit_enabled(u)) {
                    let (res25, res75) = self
                        .samples
                        .get(unit.index())
                        .copied()
                        .unwrap_or(Self::IDEAL_SAMPLES);
                    match channel.0 {
                        CHANNEL_VREF_25 => res25,
                        CHANNEL_VREF_75 => res75,
                        _ => 0,
                    }
                } else {
                    self.violations.push(Violation::UnpairedConversion(unit));
                    Self::UNPAIRED_RESULT
                };
                self.deliver(tag, value);
            }
        }
    }

    fn deliver(&mut self, tag: u8, value: u16) {
        let Some(fifo) = FifoId::new(tag).ok() else {
            self.violations.push(Violation::BadTag(tag));
            return;
        };
        let Some(f) = self.fifos.get_mut(fifo.index()) else {
            return;
        };
        if f.results.push_back(value).is_err() {
            f.overflowed = true;
            self.violations.push(Violation::ResultOverflow(fifo));
            return;
        }
        f.rfctr = f.rfctr.saturating_add(1);
    }
}

impl Default for SimulatedEqadc {
    fn default() -> Self {
        Self::new()
    }
}

impl EqadcBus for SimulatedEqadc {
    fn write_cfcr(&mut self, fifo: FifoId, value: u16) {
        self.ops.push(BusOp::WriteCfcr { fifo, value });
        if let Some(f) = self.fifo_mut(fifo) {
            if value & CFCR_CFINV != 0 {
                f.commands.clear();
            }
            f.cfcr = value & !(CFCR_CFINV | CFCR_SSE);
            if f.cfcr & CFCR_MODE_MASK == CFCR_MODE_DISABLED {
                f.triggered = false;
            } else if value & CFCR_SSE != 0 {
                f.triggered = true;
            }
        }
    }

    fn write_idcr(&mut self, fifo: FifoId, value: u16) {
        self.ops.push(BusOp::WriteIdcr { fifo, value });
        if let Some(f) = self.fifo_mut(fifo) {
            f.idcr = value;
        }
    }

    fn read_fisr(&mut self, fifo: FifoId) -> u32 {
        self.step(fifo);
        let value = self.fifo_mut(fifo).map_or(0, |f| {
            f.observed_rfctr = f.rfctr;
            #[allow(clippy::cast_possible_truncation)] // bounded by the FIFO depth
            let cfctr = f.commands.len() as u32;
            let flags = if f.overflowed { FISR_RFOF } else { 0 };
            flags
                | ((cfctr & FISR_COUNTER_MASK) << FISR_CFCTR_SHIFT)
                | ((f.rfctr.min(FISR_COUNTER_MASK)) << FISR_RFCTR_SHIFT)
        });
        self.ops.push(BusOp::ReadFisr { fifo, value });
        value
    }

    fn write_fisr(&mut self, fifo: FifoId, value: u32) {
        self.ops.push(BusOp::WriteFisr { fifo, value });
        if let Some(f) = self.fifo_mut(fifo) {
            if value & FISR_CLEAR_MASK == FISR_CLEAR_MASK {
                f.credit = f.credit.saturating_add(f.observed_rfctr);
                f.rfctr = 0;
                f.observed_rfctr = 0;
            }
            if value & FISR_RFOF != 0 {
                f.overflowed = false;
            }
        }
    }

    fn read_cfsr(&mut self) -> u32 {
        let mut value = 0;
        for (id, f) in FifoId::ALL.iter().zip(self.fifos.iter_mut()) {
            if f.active() || f.busy_polls > 0 {
                value |= id.cfsr_mask();
            }
            f.busy_polls = f.busy_polls.saturating_sub(1);
        }
        self.ops.push(BusOp::ReadCfsr { value });
        value
    }

    fn push_command(&mut self, fifo: FifoId, command: u32) {
        self.ops.push(BusOp::PushCommand {
            fifo,
            command: Command::from_raw(command),
        });
        let overflow = self
            .fifo_mut(fifo)
            .is_some_and(|f| f.commands.push_back(command).is_err());
        if overflow {
            self.violations.push(Violation::CommandOverflow(fifo));
        }
    }

    fn pop_result(&mut self, fifo: FifoId) -> u16 {
        let outcome = self.fifo_mut(fifo).map(|f| {
            if f.credit == 0 {
                Err(Violation::UnwaitedRead(fifo))
            } else {
                f.credit = f.credit.saturating_sub(1);
                f.results.pop_front().ok_or(Violation::EmptyRead(fifo))
            }
        });
        let value = match outcome {
            Some(Ok(value)) => value,
            Some(Err(violation)) => {
                self.violations.push(violation);
                Self::POISON
            }
            None => Self::POISON,
        };
        self.ops.push(BusOp::PopResult { fifo, value });
        value
    }

    fn write_cftcr(&mut self, fifo: FifoId, value: u16) {
        self.ops.push(BusOp::WriteCftcr { fifo, value });
        if let Some(f) = self.fifo_mut(fifo) {
            f.cftcr = value;
        }
    }
}
