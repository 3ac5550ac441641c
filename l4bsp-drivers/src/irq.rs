//! Interrupt-to-task completion flags
//!
//! Interrupt handlers only record that an event happened; the driver
//! consumes the flag from thread context.

use core::sync::atomic::{AtomicBool, Ordering};

/// One-shot event flag shared between an interrupt handler and a driver
#[derive(Debug)]
pub struct IrqFlag(AtomicBool);

impl IrqFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Record the event (interrupt context)
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check without consuming
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consume the event, returning whether it had occurred
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Forget any pending event
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for IrqFlag {
    fn default() -> Self {
        Self::new()
    }
}
