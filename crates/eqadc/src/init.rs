//! Initialization orchestrator.
//!
//! [`Eqadc::init`] runs the power-on sequence once, on the scratch queue:
//!
//! ```text
//! Uninitialized
//!   → ScratchQueueActive   CFIFO0: SSE | software single scan, IDCR = 0
//!   → UnitsEnabled         CR = EN | CLK_PS on ADC0, then ADC1
//!   → Calibrated           per configured unit: calibrate, AC1CR = 10 bit, AC2CR = 8 bit
//!   → UnitsDisabled        CR = CLK_PS on ADC0, then ADC1
//!   → Initialized          drain CFIFO0, then the six-step queue disable
//! ```
//!
//! On success both converters and the scratch queue are off, and the
//! surrounding driver re-enables what the application asks for. On failure
//! [`InitError::state`] names the last state reached; [`Eqadc::shutdown`]
//! returns the hardware to the off state from there.

use core::fmt;

use crate::bus::EqadcBus;
use crate::calibration::{calibrate, select_alternate_resolutions, CalibrationConstants};
use crate::command::AdcUnit;
use crate::config::EqadcConfig;
use crate::error::{InitError, InitFailure, QueueError};
use crate::fifo::{CommandQueue, FifoId};
use crate::poll::PollBound;
use crate::regs::{CFCR_MODE_SWSS, CFCR_SSE, FIFO_COUNT};
use crate::unit::set_units_enabled;

/// Status reads allowed per wait during [`Eqadc::shutdown`] when the
/// configuration itself does not bound its waits.
pub const SHUTDOWN_POLL: PollBound = PollBound::Attempts(100_000);

// ── InitState ────────────────────────────────────────────────────────────────

/// Progress of the initialization sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitState {
    /// Nothing touched yet.
    Uninitialized,
    /// Scratch queue enabled in software single-scan mode.
    ScratchQueueActive,
    /// Both converters enabled.
    UnitsEnabled,
    /// Every configured converter calibrated, alternate resolutions set.
    Calibrated,
    /// Both converters disabled again.
    UnitsDisabled,
    /// Scratch queue disabled; the sequence is complete.
    Initialized,
}

impl InitState {
    /// Whether the scratch queue is (or may be) in service.
    pub const fn scratch_queue_active(self) -> bool {
        matches!(
            self,
            Self::ScratchQueueActive | Self::UnitsEnabled | Self::Calibrated | Self::UnitsDisabled
        )
    }

    /// Whether the converters may have been left enabled.
    pub const fn units_may_be_enabled(self) -> bool {
        matches!(
            self,
            Self::ScratchQueueActive | Self::UnitsEnabled | Self::Calibrated
        )
    }
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::ScratchQueueActive => "ScratchQueueActive",
            Self::UnitsEnabled => "UnitsEnabled",
            Self::Calibrated => "Calibrated",
            Self::UnitsDisabled => "UnitsDisabled",
            Self::Initialized => "Initialized",
        };
        f.write_str(name)
    }
}

// ── AdcDriver ────────────────────────────────────────────────────────────────

/// Lifecycle state of a logical queue driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// Created, hardware not yet initialized.
    Uninit,
    /// Hardware initialized; the queue is stopped until the application starts it.
    Stop,
}

/// Driver object for one configured logical queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcDriver {
    fifo: FifoId,
    unit: AdcUnit,
    state: DriverState,
}

impl AdcDriver {
    /// The queue this driver owns.
    pub fn fifo(&self) -> FifoId {
        self.fifo
    }

    /// The converter its conversions run on.
    pub fn unit(&self) -> AdcUnit {
        self.unit
    }

    /// Lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }
}

// ── Eqadc ────────────────────────────────────────────────────────────────────

/// An eQADC module and the driver objects of its configured queues.
pub struct Eqadc<B: EqadcBus> {
    bus: B,
    config: &'static EqadcConfig,
    state: InitState,
    drivers: heapless::Vec<AdcDriver, { FIFO_COUNT as usize }>,
    constants: [Option<CalibrationConstants>; 2],
}

impl<B: EqadcBus> Eqadc<B> {
    /// Wrap a bus. Nothing is written until [`init`](Self::init).
    pub fn new(bus: B, config: &'static EqadcConfig) -> Self {
        Self {
            bus,
            config,
            state: InitState::Uninitialized,
            drivers: heapless::Vec::new(),
            constants: [None; 2],
        }
    }

    /// Run the initialization sequence.
    ///
    /// A configuration that fails [`EqadcConfig::is_valid`] is refused with
    /// [`InitFailure::InvalidConfig`] before any register is written.
    ///
    /// Runs once: a second call (including after a failure) returns
    /// [`InitFailure::AlreadyInitialized`] until [`shutdown`](Self::shutdown)
    /// resets the state.
    pub fn init(&mut self) -> Result<(), InitError> {
        if self.state != InitState::Uninitialized {
            return Err(InitError {
                state: self.state,
                failure: InitFailure::AlreadyInitialized,
            });
        }
        if !self.config.is_valid() {
            #[cfg(feature = "defmt")]
            defmt::error!("eQADC init refused: invalid configuration {}", self.config);
            #[cfg(feature = "tracing")]
            tracing::error!(config = ?self.config, "eQADC init refused: invalid configuration");
            return Err(InitError {
                state: self.state,
                failure: InitFailure::InvalidConfig,
            });
        }

        self.drivers.clear();
        for queue in self.config.queues {
            let driver = AdcDriver {
                fifo: queue.fifo,
                unit: queue.unit,
                state: DriverState::Uninit,
            };
            if self.drivers.push(driver).is_err() {
                break;
            }
        }

        match self.run_sequence() {
            Ok(()) => {
                for driver in &mut self.drivers {
                    driver.state = DriverState::Stop;
                }
                Ok(())
            }
            Err(failure) => {
                #[cfg(feature = "defmt")]
                defmt::error!("eQADC init failed in {}: {}", self.state, failure);
                #[cfg(feature = "tracing")]
                tracing::error!(state = %self.state, %failure, "eQADC init failed");
                Err(InitError {
                    state: self.state,
                    failure,
                })
            }
        }
    }

    fn run_sequence(&mut self) -> Result<(), InitFailure> {
        let config = self.config;
        let state = &mut self.state;
        let constants = &mut self.constants;
        let mut queue = CommandQueue::new(&mut self.bus, config.scratch_fifo, config.poll);

        queue.enable(CFCR_SSE | CFCR_MODE_SWSS, 0);
        advance(state, InitState::ScratchQueueActive);

        set_units_enabled(&mut queue, true, config.clock_prescaler)?;
        advance(state, InitState::UnitsEnabled);

        for &unit in config.units {
            let calibrated = calibrate(&mut queue, unit)
                .map_err(|error| InitFailure::Calibration { unit, error })?;
            if let Some(slot) = constants.get_mut(unit.index()) {
                *slot = Some(calibrated);
            }
            select_alternate_resolutions(&mut queue, unit)?;
        }
        advance(state, InitState::Calibrated);

        set_units_enabled(&mut queue, false, config.clock_prescaler)?;
        advance(state, InitState::UnitsDisabled);

        // The disable invalidates the CFIFO: the CR writes above must be
        // transferred first.
        queue.drain()?;
        queue.disable()?;
        advance(state, InitState::Initialized);
        Ok(())
    }

    /// Return the hardware to the off state from wherever `init` stopped.
    ///
    /// Disables both converters if they may be on, then drains and disables
    /// the scratch queue if it may be active. Every wait is bounded: by the
    /// configured bound, or [`SHUTDOWN_POLL`] when that is
    /// [`PollBound::Forever`]. Every step is attempted; the first error is
    /// returned and the state is left unchanged. On success the state returns
    /// to [`InitState::Uninitialized`] and the driver objects are dropped.
    pub fn shutdown(&mut self) -> Result<(), QueueError> {
        let config = self.config;
        let bound = match config.poll {
            PollBound::Forever => SHUTDOWN_POLL,
            bound => bound,
        };
        let mut queue = CommandQueue::new(&mut self.bus, config.scratch_fifo, bound);

        let mut result = Ok(());
        if self.state.units_may_be_enabled() {
            result = set_units_enabled(&mut queue, false, config.clock_prescaler);
        }
        if self.state.scratch_queue_active() {
            let drained = queue.drain();
            let disabled = queue.disable();
            result = result.and(drained).and(disabled);
        }

        match result {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("eQADC shut down from {}", self.state);
                #[cfg(feature = "tracing")]
                tracing::info!(from = %self.state, "eQADC shut down");
                self.state = InitState::Uninitialized;
                self.drivers.clear();
                self.constants = [None; 2];
                Ok(())
            }
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("eQADC shutdown from {} incomplete: {}", self.state, err);
                #[cfg(feature = "tracing")]
                tracing::warn!(from = %self.state, %err, "eQADC shutdown incomplete");
                Err(err)
            }
        }
    }

    /// Last state the sequence reached.
    pub fn state(&self) -> InitState {
        self.state
    }

    /// The configuration this module was created with.
    pub fn config(&self) -> &'static EqadcConfig {
        self.config
    }

    /// Driver objects of the configured queues.
    pub fn drivers(&self) -> &[AdcDriver] {
        &self.drivers
    }

    /// Driver object owning `fifo`, if that queue is configured.
    pub fn driver(&self, fifo: FifoId) -> Option<&AdcDriver> {
        self.drivers.iter().find(|d| d.fifo == fifo)
    }

    /// Constants loaded into `unit` by the last calibration.
    pub fn calibration(&self, unit: AdcUnit) -> Option<CalibrationConstants> {
        self.constants.get(unit.index()).copied().flatten()
    }

    /// The underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The underlying bus, mutably.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the bus back.
    pub fn release(self) -> B {
        self.bus
    }
}

fn advance(state: &mut InitState, next: InitState) {
    #[cfg(feature = "defmt")]
    defmt::info!("eQADC init: {} -> {}", *state, next);
    #[cfg(feature = "tracing")]
    tracing::info!(from = %state, to = %next, "eQADC init");
    *state = next;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::{CalibrationError, Wait};
    use crate::mocks::SimulatedEqadc;

    static BOUNDED: EqadcConfig = EqadcConfig::DEFAULT.with_poll(PollBound::Attempts(64));

    #[test]
    fn state_names_display_as_variants() {
        assert_eq!(InitState::UnitsEnabled.to_string(), "UnitsEnabled");
        assert_eq!(InitState::Initialized.to_string(), "Initialized");
    }

    #[test]
    fn states_are_ordered_along_the_sequence() {
        assert!(InitState::Uninitialized < InitState::ScratchQueueActive);
        assert!(InitState::Calibrated < InitState::UnitsDisabled);
        assert!(InitState::UnitsDisabled < InitState::Initialized);
    }

    #[test]
    fn init_reaches_initialized_and_stops_drivers() {
        let mut sim = SimulatedEqadc::new();
        let mut adc = Eqadc::new(&mut sim, &BOUNDED);
        adc.init().unwrap();

        assert_eq!(adc.state(), InitState::Initialized);
        assert_eq!(adc.drivers().len(), BOUNDED.queues.len());
        assert!(adc.drivers().iter().all(|d| d.state() == DriverState::Stop));
        assert_eq!(
            adc.calibration(AdcUnit::Adc0),
            Some(CalibrationConstants {
                gain: 0x4000,
                offset: 0xFFFE
            })
        );
        drop(adc);
        assert!(sim.violations().is_empty(), "{:?}", sim.violations());
    }

    #[test]
    fn second_init_is_rejected() {
        let mut adc = Eqadc::new(SimulatedEqadc::new(), &BOUNDED);
        adc.init().unwrap();
        let err = adc.init().unwrap_err();
        assert_eq!(err.state, InitState::Initialized);
        assert_eq!(err.failure, InitFailure::AlreadyInitialized);
    }

    #[test]
    fn degenerate_calibration_reports_units_enabled() {
        let mut sim = SimulatedEqadc::new();
        sim.set_reference_samples(AdcUnit::Adc0, 6000, 6000);
        let mut adc = Eqadc::new(&mut sim, &BOUNDED);

        let err = adc.init().unwrap_err();
        assert_eq!(err.state, InitState::UnitsEnabled);
        assert_eq!(
            err.failure,
            InitFailure::Calibration {
                unit: AdcUnit::Adc0,
                error: CalibrationError::DegenerateSamples {
                    res25: 6000,
                    res75: 6000
                }
            }
        );
        assert!(adc.drivers().iter().all(|d| d.state() == DriverState::Uninit));
    }

    #[test]
    fn shutdown_after_failure_leaves_everything_off() {
        let mut sim = SimulatedEqadc::new();
        sim.set_reference_samples(AdcUnit::Adc1, 6000, 6000);
        let mut adc = Eqadc::new(&mut sim, &BOUNDED);
        assert!(adc.init().is_err());

        adc.shutdown().unwrap();
        assert_eq!(adc.state(), InitState::Uninitialized);
        assert!(adc.drivers().is_empty());
        drop(adc);

        assert!(!sim.is_unit_enabled(AdcUnit::Adc0));
        assert!(!sim.is_unit_enabled(AdcUnit::Adc1));
        assert!(!sim.is_fifo_enabled(FifoId::CFIFO0));
    }

    #[test]
    fn init_runs_again_after_shutdown() {
        let mut sim = SimulatedEqadc::new();
        sim.set_reference_samples(AdcUnit::Adc0, 6000, 6000);
        let mut adc = Eqadc::new(&mut sim, &BOUNDED);
        assert!(adc.init().is_err());
        adc.shutdown().unwrap();

        adc.bus_mut().set_reference_samples(AdcUnit::Adc0, 4000, 12100);
        adc.init().unwrap();
        assert_eq!(adc.state(), InitState::Initialized);
        assert_eq!(
            adc.calibration(AdcUnit::Adc0),
            Some(CalibrationConstants {
                gain: 0x40BA,
                offset: 49
            })
        );
    }

    #[test]
    fn stalled_queue_times_out_with_state() {
        let mut sim = SimulatedEqadc::new();
        sim.hold_commands(true);
        let mut adc = Eqadc::new(&mut sim, &BOUNDED);

        let err = adc.init().unwrap_err();
        // Two CR writes fit; calibration then waits for results that never come.
        assert_eq!(err.state, InitState::UnitsEnabled);
        assert!(matches!(
            err.failure,
            InitFailure::Calibration {
                error: CalibrationError::Queue(QueueError {
                    wait: Wait::Results { count: 2 },
                    ..
                }),
                ..
            }
        ));
    }

    #[test]
    fn shutdown_gives_up_on_a_wedged_queue() {
        let mut sim = SimulatedEqadc::new();
        sim.hold_commands(true);
        let mut adc = Eqadc::new(&mut sim, &BOUNDED);
        assert!(adc.init().is_err());

        let err = adc.shutdown().unwrap_err();
        assert_eq!(err.wait, Wait::CommandSpace);
        assert_eq!(adc.state(), InitState::UnitsEnabled);
    }

    #[test]
    fn invalid_configurations_are_refused_before_any_bus_access() {
        static NO_UNITS: EqadcConfig = EqadcConfig::DEFAULT.with_units(&[]);
        static REPEATED_UNIT: EqadcConfig =
            EqadcConfig::DEFAULT.with_units(&[AdcUnit::Adc0, AdcUnit::Adc0]);

        for config in [&NO_UNITS, &REPEATED_UNIT] {
            let mut sim = SimulatedEqadc::new();
            let mut adc = Eqadc::new(&mut sim, config);
            let err = adc.init().unwrap_err();
            assert_eq!(err.failure, InitFailure::InvalidConfig);
            assert_eq!(err.state, InitState::Uninitialized);
            assert_eq!(adc.state(), InitState::Uninitialized);
            assert!(adc.drivers().is_empty());
            drop(adc);
            assert!(sim.ops().is_empty(), "{:?}", sim.ops());
        }
    }

    #[test]
    fn shutdown_when_idle_touches_nothing() {
        let mut sim = SimulatedEqadc::new();
        let mut adc = Eqadc::new(&mut sim, &EqadcConfig::DEFAULT);
        adc.shutdown().unwrap();
        drop(adc);
        assert!(sim.ops().is_empty());
    }
}
