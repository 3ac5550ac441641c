//! Capacitive touch controller and the touchscreen layer above it

pub mod ft3x67;
pub mod screen;

pub use ft3x67::{Ft3x67, TouchError};
pub use screen::{TouchScreen, TouchState, MAX_TOUCHES};
