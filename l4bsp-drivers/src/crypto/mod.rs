//! Crypto peripheral glue
//!
//! Thin layers over the CRC, RNG and PKA traits that add argument checks and
//! map peripheral errors to [`l4bsp_core::BspError`]. [`bignum::SoftwarePka`]
//! runs modular exponentiation and P-256 ECDSA on the CPU so host tests and
//! boards without a PKA can use the same code path.

pub mod bignum;
pub mod crc;
pub mod ecc;
pub mod pka;
pub mod rng;

pub use bignum::SoftwarePka;
pub use pka::Pka;
pub use rng::RandomGenerator;
