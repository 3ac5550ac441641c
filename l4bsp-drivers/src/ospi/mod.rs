//! OctoSPI memories
//!
//! Both devices sit on the same OctoSPI peripheral behind separate chip
//! selects (OCTOSPIM ports 1 and 2 on the evaluation board).

pub mod aps6408;
pub mod mx25lm51245g;

pub use aps6408::{Aps6408, PsramError};
pub use mx25lm51245g::{Interface, Mx25lm51245g, NorError};
