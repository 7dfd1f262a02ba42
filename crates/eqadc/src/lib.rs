//! Initialization engine for the SPC5xx eQADC (enhanced queued ADC).
//!
//! The eQADC has no host-visible register bus for its two converters
//! (ADC0 and ADC1). Every internal register access is a 32-bit command word
//! pushed into a command FIFO (CFIFO); anything that produces data answers
//! through the matching result FIFO (RFIFO). This crate implements that
//! command protocol and the calibration routine built on top of it.
//!
//! # Layers
//!
//! ```text
//! Eqadc::init()                     (init: orchestrator state machine)
//!         ↓
//! calibrate / set_units_enabled     (calibration, unit)
//!         ↓
//! push / wait_for / read_one / disable   (fifo)
//!         ↓
//! Command encoder                   (command)
//!         ↓
//! EqadcBus: Mmio | SimulatedEqadc   (bus, mocks)
//! ```
//!
//! Every busy-wait goes through [`poll::poll_until`], bounded by the
//! [`PollBound`] of the active [`EqadcConfig`]. The default bound is
//! [`PollBound::Forever`]: a peripheral that never drains hangs the caller.
//!
//! # Features
//!
//! - `adc0`, `adc1`: converters present in the static configuration (default: both)
//! - `std`: expose [`mocks`] outside this crate's own tests
//! - `defmt`: defmt logging and `defmt::Format` derives (hardware builds)
//! - `tracing`: host-side logging
//!
//! # Example
//!
//! ```no_run
//! use core::ptr::NonNull;
//! use eqadc::{Eqadc, EqadcConfig, Mmio};
//!
//! let base = NonNull::new(eqadc::regs::EQADC_BASE as *mut u8).unwrap();
//! // SAFETY: EQADC_BASE is the eQADC register block on SPC563M.
//! let bus = unsafe { Mmio::new(base) };
//! let mut adc = Eqadc::new(bus, &EqadcConfig::DEFAULT);
//! adc.init().unwrap();
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this register-level driver crate:
#![allow(clippy::doc_markdown)] // register and bit-field names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unreadable_literal)] // register masks read as in the reference manual

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod bus;
pub mod calibration;
pub mod command;
pub mod config;
pub mod error;
pub mod fifo;
pub mod init;
pub mod mocks;
pub mod poll;
pub mod regs;
pub mod unit;

pub use bus::{EqadcBus, Mmio};
pub use calibration::{CalibrationConstants, Resolution};
pub use command::{AdcRegister, AdcUnit, Channel, Command, CommandKind, Reference};
pub use config::{ClockPrescaler, EqadcConfig, QueueAssignment};
pub use error::{CalibrationError, InitError, InitFailure, OutOfRangeError, QueueError, Wait};
pub use fifo::{FifoId, FifoStatus};
pub use init::{AdcDriver, DriverState, Eqadc, InitState};
pub use poll::{PollBound, PollTimeout};
