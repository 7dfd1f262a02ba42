//! Register bus abstraction.
//!
//! [`EqadcBus`] is the only way this crate touches the peripheral. Firmware
//! uses [`Mmio`]; host tests use [`SimulatedEqadc`](crate::mocks::SimulatedEqadc).
//!
//! Every method takes `&mut self`, reads included: popping RFPR consumes a
//! result word, and a simulated peripheral advances on every status read.

use core::ptr::NonNull;

use crate::fifo::FifoId;
use crate::regs::{
    CFCR_OFFSET, CFPR_OFFSET, CFSR_OFFSET, CFTCR_OFFSET, FISR_OFFSET, IDCR_OFFSET, RFPR_OFFSET,
};

/// Access to the eQADC module registers.
pub trait EqadcBus {
    /// Write CFCRn (CFIFO control).
    fn write_cfcr(&mut self, fifo: FifoId, value: u16);

    /// Write IDCRn (interrupt and eDMA enables).
    fn write_idcr(&mut self, fifo: FifoId, value: u16);

    /// Read FISRn (flags, CFIFO and RFIFO entry counters).
    fn read_fisr(&mut self, fifo: FifoId) -> u32;

    /// Write FISRn; set bits clear the matching flags.
    fn write_fisr(&mut self, fifo: FifoId, value: u32);

    /// Read CFSR (status of every CFIFO, two bits each).
    fn read_cfsr(&mut self) -> u32;

    /// Write a command word into CFPRn.
    fn push_command(&mut self, fifo: FifoId, command: u32);

    /// Pop the head of RFIFOn through RFPRn.
    fn pop_result(&mut self, fifo: FifoId) -> u16;

    /// Write CFTCRn (transfer counter).
    fn write_cftcr(&mut self, fifo: FifoId, value: u16);
}

impl<B: EqadcBus + ?Sized> EqadcBus for &mut B {
    fn write_cfcr(&mut self, fifo: FifoId, value: u16) {
        (**self).write_cfcr(fifo, value);
    }

    fn write_idcr(&mut self, fifo: FifoId, value: u16) {
        (**self).write_idcr(fifo, value);
    }

    fn read_fisr(&mut self, fifo: FifoId) -> u32 {
        (**self).read_fisr(fifo)
    }

    fn write_fisr(&mut self, fifo: FifoId, value: u32) {
        (**self).write_fisr(fifo, value);
    }

    fn read_cfsr(&mut self) -> u32 {
        (**self).read_cfsr()
    }

    fn push_command(&mut self, fifo: FifoId, command: u32) {
        (**self).push_command(fifo, command);
    }

    fn pop_result(&mut self, fifo: FifoId) -> u16 {
        (**self).pop_result(fifo)
    }

    fn write_cftcr(&mut self, fifo: FifoId, value: u16) {
        (**self).write_cftcr(fifo, value);
    }
}

/// Volatile memory-mapped access to a real eQADC register block.
pub struct Mmio {
    base: NonNull<u8>,
}

// SAFETY: the register block is not tied to the thread that mapped it.
unsafe impl Send for Mmio {}

impl Mmio {
    /// Create a bus over the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the mapped eQADC register block (e.g.
    /// [`EQADC_BASE`](crate::regs::EQADC_BASE)), valid for the lifetime of the
    /// returned value, and no other code may drive the same block concurrently.
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    /// Pointer to a register at `offset` plus `index` strides of `T`.
    fn reg<T>(&self, offset: usize, index: usize) -> *mut T {
        let byte_offset = offset.wrapping_add(index.wrapping_mul(core::mem::size_of::<T>()));
        self.base.as_ptr().wrapping_add(byte_offset).cast::<T>()
    }

    fn write16(&mut self, offset: usize, fifo: FifoId, value: u16) {
        // SAFETY: offsets come from the reference manual memory map and `fifo`
        // is < 6, so the pointer stays inside the block promised by `new`.
        unsafe { self.reg::<u16>(offset, fifo.index()).write_volatile(value) }
    }

    fn read32(&mut self, offset: usize, index: usize) -> u32 {
        // SAFETY: see `write16`.
        unsafe { self.reg::<u32>(offset, index).read_volatile() }
    }

    fn write32(&mut self, offset: usize, fifo: FifoId, value: u32) {
        // SAFETY: see `write16`.
        unsafe { self.reg::<u32>(offset, fifo.index()).write_volatile(value) }
    }
}

impl EqadcBus for Mmio {
    fn write_cfcr(&mut self, fifo: FifoId, value: u16) {
        self.write16(CFCR_OFFSET, fifo, value);
    }

    fn write_idcr(&mut self, fifo: FifoId, value: u16) {
        self.write16(IDCR_OFFSET, fifo, value);
    }

    fn read_fisr(&mut self, fifo: FifoId) -> u32 {
        self.read32(FISR_OFFSET, fifo.index())
    }

    fn write_fisr(&mut self, fifo: FifoId, value: u32) {
        self.write32(FISR_OFFSET, fifo, value);
    }

    fn read_cfsr(&mut self) -> u32 {
        self.read32(CFSR_OFFSET, 0)
    }

    fn push_command(&mut self, fifo: FifoId, command: u32) {
        self.write32(CFPR_OFFSET, fifo, command);
    }

    #[allow(clippy::cast_possible_truncation)] // the result occupies the low half of RFPR
    fn pop_result(&mut self, fifo: FifoId) -> u16 {
        self.read32(RFPR_OFFSET, fifo.index()) as u16
    }

    fn write_cftcr(&mut self, fifo: FifoId, value: u16) {
        self.write16(CFTCR_OFFSET, fifo, value);
    }
}
