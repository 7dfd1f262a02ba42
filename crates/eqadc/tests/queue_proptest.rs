//! Property-based tests for the command protocol.
//! Verifies invariants hold for ALL valid inputs, not just fixed examples.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]

use eqadc::calibration::Resolution;
use eqadc::fifo::CommandQueue;
use eqadc::mocks::{DisableStep, SimulatedEqadc};
use eqadc::regs::{CFCR_MODE_SWCS, CFCR_MODE_SWSS, CFCR_SSE, RFIFO_DEPTH};
use eqadc::unit::set_units_enabled;
use eqadc::{
    AdcRegister, AdcUnit, CalibrationConstants, Channel, ClockPrescaler, Command, CommandKind,
    Eqadc, EqadcConfig, FifoId, PollBound,
};
use proptest::prelude::*;

static BOUNDED: EqadcConfig = EqadcConfig::DEFAULT.with_poll(PollBound::Attempts(1024));

fn unit() -> impl Strategy<Value = AdcUnit> {
    prop_oneof![Just(AdcUnit::Adc0), Just(AdcUnit::Adc1)]
}

fn register() -> impl Strategy<Value = AdcRegister> {
    (1u8..=255).prop_map(|addr| AdcRegister::new(addr).unwrap())
}

fn fifo() -> impl Strategy<Value = FifoId> {
    (0u8..6).prop_map(|i| FifoId::new(i).unwrap())
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Write(AdcUnit, AdcRegister, u16),
    Read(AdcUnit, AdcRegister),
}

fn op() -> impl Strategy<Value = Op> {
    // A small register set so reads often hit earlier writes.
    let reg = proptest::sample::select(vec![
        AdcRegister::TSCR,
        AdcRegister::GCCR,
        AdcRegister::OCCR,
        AdcRegister::AC1GCCR,
        AdcRegister::AC2OCCR,
    ]);
    prop_oneof![
        (unit(), reg.clone(), any::<u16>()).prop_map(|(u, r, v)| Op::Write(u, r, v)),
        (unit(), reg).prop_map(|(u, r)| Op::Read(u, r)),
    ]
}

fn active_sim() -> SimulatedEqadc {
    let mut sim = SimulatedEqadc::new();
    CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Forever)
        .enable(CFCR_SSE | CFCR_MODE_SWSS, 0);
    sim
}

proptest! {
    /// Register writes decode back to the same unit, address and payload.
    #[test]
    fn write_register_round_trips(unit in unit(), reg in register(), value in any::<u16>()) {
        let cmd = Command::write_register(unit, reg, value);
        prop_assert_eq!(cmd.kind(), CommandKind::WriteRegister { unit, reg, value });
        prop_assert_eq!(cmd.unit(), unit);
        prop_assert!(!cmd.is_end_of_queue());
    }

    /// Register reads decode back with their destination tag.
    #[test]
    fn read_register_round_trips(unit in unit(), reg in register(), tag in fifo()) {
        let cmd = Command::read_register(unit, reg, tag);
        prop_assert_eq!(
            cmd.kind(),
            CommandKind::ReadRegister { unit, reg, tag: tag.index() as u8 }
        );
    }

    /// Conversions are never mistaken for register commands.
    #[test]
    fn conversions_decode_as_conversions(unit in unit(), channel in any::<u8>(), tag in fifo()) {
        let cmd = Command::convert(unit, Channel(channel), tag);
        prop_assert_eq!(
            cmd.kind(),
            CommandKind::Convert {
                unit,
                channel: Channel(channel),
                tag: tag.index() as u8,
                calibrated: false
            }
        );
    }

    /// End-of-queue never changes what a command means.
    #[test]
    fn end_of_queue_preserves_kind(unit in unit(), reg in register(), value in any::<u16>()) {
        let cmd = Command::write_register(unit, reg, value);
        prop_assert_eq!(cmd.with_end_of_queue().kind(), cmd.kind());
    }

    /// Results come back in push order for any interleaving of reads and writes.
    #[test]
    fn results_arrive_in_push_order(ops in proptest::collection::vec(op(), 1..40)) {
        let mut sim = active_sim();
        let mut model = [[0u16; 256]; 2];
        let mut expected: Vec<u16> = Vec::new();
        let mut got: Vec<u16> = Vec::new();
        {
            let mut q = CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Attempts(256));
            let mut outstanding = 0u32;
            for op in ops {
                match op {
                    Op::Write(unit, reg, value) => {
                        q.write_register(unit, reg, value).unwrap();
                        model[unit.index()][usize::from(reg.addr())] = value;
                    }
                    Op::Read(unit, reg) => {
                        q.push(Command::read_register(unit, reg, FifoId::CFIFO0)).unwrap();
                        expected.push(model[unit.index()][usize::from(reg.addr())]);
                        outstanding += 1;
                    }
                }
                if outstanding == RFIFO_DEPTH {
                    q.wait_for(outstanding).unwrap();
                    got.extend((0..outstanding).map(|_| q.read_one()));
                    outstanding = 0;
                }
            }
            q.wait_for(outstanding).unwrap();
            got.extend((0..outstanding).map(|_| q.read_one()));
        }
        prop_assert_eq!(got, expected);
        prop_assert!(sim.violations().is_empty(), "{:?}", sim.violations());
    }

    /// Every enable or disable is exactly one CR write per unit, ADC0 first.
    #[test]
    fn units_switch_as_a_pair(enabled in any::<bool>(), divide in (1u8..=32).prop_map(|d| d * 2)) {
        let prescaler = ClockPrescaler::new(divide).unwrap();
        let mut sim = active_sim();
        {
            let mut q = CommandQueue::new(&mut sim, FifoId::CFIFO0, PollBound::Forever);
            set_units_enabled(&mut q, enabled, prescaler).unwrap();
            q.drain().unwrap();
        }
        let writes: Vec<_> = sim
            .pushed_commands(FifoId::CFIFO0)
            .into_iter()
            .map(|c| c.kind())
            .collect();
        prop_assert_eq!(writes.len(), 2);
        let cr = eqadc::unit::control_word(enabled, prescaler);
        prop_assert_eq!(
            writes[0],
            CommandKind::WriteRegister { unit: AdcUnit::Adc0, reg: AdcRegister::CR, value: cr }
        );
        prop_assert_eq!(
            writes[1],
            CommandKind::WriteRegister { unit: AdcUnit::Adc1, reg: AdcRegister::CR, value: cr }
        );
        prop_assert_eq!(sim.is_unit_enabled(AdcUnit::Adc0), enabled);
        prop_assert_eq!(sim.is_unit_enabled(AdcUnit::Adc1), enabled);
    }

    /// The disable order holds whatever state the queue was left in.
    #[test]
    fn disable_order_is_independent_of_prior_state(
        fifo in fifo(),
        mode in prop_oneof![
            Just(0u16),
            Just(CFCR_SSE | CFCR_MODE_SWSS),
            Just(CFCR_MODE_SWSS),
            Just(CFCR_MODE_SWCS),
        ],
        idcr in any::<u16>(),
        pending in 0usize..=4,
        busy in 0u32..50,
        hold in any::<bool>(),
    ) {
        let mut sim = SimulatedEqadc::new();
        sim.hold_commands(hold);
        {
            let mut q = CommandQueue::new(&mut sim, fifo, PollBound::Forever);
            q.enable(mode, idcr);
        }
        for _ in 0..pending {
            eqadc::EqadcBus::push_command(
                &mut sim,
                fifo,
                Command::write_register(AdcUnit::Adc0, AdcRegister::TSCR, 1).raw(),
            );
        }
        sim.set_busy_polls(fifo, busy);

        CommandQueue::new(&mut sim, fifo, PollBound::Forever).disable().unwrap();

        let steps = sim.disable_steps(fifo);
        prop_assert_eq!(steps.first(), Some(&DisableStep::ModeDisable));
        prop_assert_eq!(steps, SimulatedEqadc::DISABLE_SEQUENCE.to_vec());
        prop_assert!(!sim.is_fifo_enabled(fifo));
        prop_assert_eq!(sim.queued_commands(fifo), 0);
        prop_assert_eq!(sim.idcr(fifo), 0);
        prop_assert_eq!(sim.cftcr(fifo), 0);
    }

    /// Init never pops an unwaited result, and loads the derived constants
    /// into all three configurations.
    #[test]
    fn init_loads_derived_constants(
        res25_0 in 0u16..8000, span_0 in 2049u16..8000,
        res25_1 in 0u16..8000, span_1 in 2049u16..8000,
    ) {
        let samples = [(res25_0, res25_0 + span_0), (res25_1, res25_1 + span_1)];
        let mut sim = SimulatedEqadc::new();
        for (unit, (res25, res75)) in AdcUnit::PAIR.into_iter().zip(samples) {
            sim.set_reference_samples(unit, res25, res75);
        }
        {
            let mut adc = Eqadc::new(&mut sim, &BOUNDED);
            adc.init().unwrap();
        }
        prop_assert!(sim.violations().is_empty(), "{:?}", sim.violations());
        for (unit, (res25, res75)) in AdcUnit::PAIR.into_iter().zip(samples) {
            let c = CalibrationConstants::from_samples(res25, res75).unwrap();
            for resolution in Resolution::ALL {
                prop_assert_eq!(sim.register(unit, resolution.gain_register()), c.gain);
                prop_assert_eq!(sim.register(unit, resolution.offset_register()), c.offset);
            }
        }
    }

    /// Gain follows the reference formula wherever it fits 16 bits.
    #[test]
    fn gain_matches_formula(res25 in 0u16..16000, span in 1u16..16000) {
        let res75 = res25.saturating_add(span);
        prop_assume!(res75 > res25);
        let gain = 0x0800_0000u32 / u32::from(res75 - res25);
        match CalibrationConstants::from_samples(res25, res75) {
            Ok(c) => {
                prop_assert_eq!(u32::from(c.gain), gain);
                let offset = 12286u32.wrapping_sub((gain * u32::from(res75)) >> 14);
                prop_assert_eq!(c.offset, offset as u16);
            }
            Err(_) => prop_assert!(gain > 0xFFFF),
        }
    }
}
