//! Public key accelerator
//!
//! All operands are big-endian byte strings, as the PKA RAM loaders expect.

/// Largest modular exponentiation operand (bits)
pub const MAX_MODEXP_BITS: usize = 4160;

/// Largest elliptic curve operand (bits)
pub const MAX_ECC_BITS: usize = 640;

/// Errors reported by the PKA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PkaError {
    /// Operand size or value rejected
    InvalidOperand,
    /// Another operation is in progress
    Busy,
    /// PKA RAM access error (RAMERRF)
    RamError,
    /// Address error (ADDRERRF)
    AddressError,
    /// The engine does not implement this operation
    Unsupported,
    /// Signature computation produced r = 0 or s = 0
    SignatureFailed,
}

/// Modular exponentiation: `result = base ^ exponent mod modulus`
#[derive(Debug, Clone, Copy)]
pub struct ModExpParams<'a> {
    pub base: &'a [u8],
    pub exponent: &'a [u8],
    pub modulus: &'a [u8],
}

/// Short Weierstrass curve `y^2 = x^3 + a*x + b mod p` with base point G of order n
#[derive(Debug, Clone, Copy)]
pub struct EcCurve<'a> {
    /// Prime modulus p
    pub prime: &'a [u8],
    /// Absolute value of coefficient a
    pub a_abs: &'a [u8],
    /// Coefficient a is negative
    pub a_negative: bool,
    /// Coefficient b
    pub b: &'a [u8],
    /// Curve order n
    pub order: &'a [u8],
    /// Base point x
    pub gx: &'a [u8],
    /// Base point y
    pub gy: &'a [u8],
}

/// ECDSA signature generation parameters
#[derive(Debug, Clone, Copy)]
pub struct EcdsaSignParams<'a> {
    pub curve: EcCurve<'a>,
    /// Per-signature secret k (1 < k < n)
    pub integer_k: &'a [u8],
    /// Hash of the message, truncated to the order size
    pub hash: &'a [u8],
    /// Private key d
    pub private_key: &'a [u8],
}

/// ECDSA signature verification parameters
#[derive(Debug, Clone, Copy)]
pub struct EcdsaVerifyParams<'a> {
    pub curve: EcCurve<'a>,
    /// Public key x
    pub public_x: &'a [u8],
    /// Public key y
    pub public_y: &'a [u8],
    /// Signature r
    pub r: &'a [u8],
    /// Signature s
    pub s: &'a [u8],
    /// Hash of the message
    pub hash: &'a [u8],
}

/// Public key accelerator
pub trait PkaEngine {
    /// Compute `base ^ exponent mod modulus` into `out` (modulus-sized)
    fn modular_exponentiation(
        &mut self,
        params: &ModExpParams<'_>,
        out: &mut [u8],
    ) -> Result<(), PkaError>;

    /// Produce an ECDSA signature into `r` and `s` (order-sized)
    fn ecdsa_sign(
        &mut self,
        params: &EcdsaSignParams<'_>,
        r: &mut [u8],
        s: &mut [u8],
    ) -> Result<(), PkaError>;

    /// Verify an ECDSA signature
    fn ecdsa_verify(&mut self, params: &EcdsaVerifyParams<'_>) -> Result<bool, PkaError>;
}

/// NIST P-256 (secp256r1)
pub mod p256 {
    use super::EcCurve;

    pub const PRIME: [u8; 32] = [
        0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF,
    ];

    /// a = -3
    pub const A_ABS: [u8; 1] = [0x03];

    pub const B: [u8; 32] = [
        0x5A, 0xC6, 0x35, 0xD8, 0xAA, 0x3A, 0x93, 0xE7, 0xB3, 0xEB, 0xBD, 0x55, 0x76, 0x98, 0x86,
        0xBC, 0x65, 0x1D, 0x06, 0xB0, 0xCC, 0x53, 0xB0, 0xF6, 0x3B, 0xCE, 0x3C, 0x3E, 0x27, 0xD2,
        0x60, 0x4B,
    ];

    pub const ORDER: [u8; 32] = [
        0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xBC, 0xE6, 0xFA, 0xAD, 0xA7, 0x17, 0x9E, 0x84, 0xF3, 0xB9, 0xCA, 0xC2, 0xFC, 0x63,
        0x25, 0x51,
    ];

    pub const GX: [u8; 32] = [
        0x6B, 0x17, 0xD1, 0xF2, 0xE1, 0x2C, 0x42, 0x47, 0xF8, 0xBC, 0xE6, 0xE5, 0x63, 0xA4, 0x40,
        0xF2, 0x77, 0x03, 0x7D, 0x81, 0x2D, 0xEB, 0x33, 0xA0, 0xF4, 0xA1, 0x39, 0x45, 0xD8, 0x98,
        0xC2, 0x96,
    ];

    pub const GY: [u8; 32] = [
        0x4F, 0xE3, 0x42, 0xE2, 0xFE, 0x1A, 0x7F, 0x9B, 0x8E, 0xE7, 0xEB, 0x4A, 0x7C, 0x0F, 0x9E,
        0x16, 0x2B, 0xCE, 0x33, 0x57, 0x6B, 0x31, 0x5E, 0xCE, 0xCB, 0xB6, 0x40, 0x68, 0x37, 0xBF,
        0x51, 0xF5,
    ];

    /// Curve parameter block
    pub const CURVE: EcCurve<'static> = EcCurve {
        prime: &PRIME,
        a_abs: &A_ABS,
        a_negative: true,
        b: &B,
        order: &ORDER,
        gx: &GX,
        gy: &GY,
    };
}

/// Number of significant bits in a big-endian byte string
pub fn bit_length(value: &[u8]) -> usize {
    match value.iter().position(|&b| b != 0) {
        Some(i) => (value.len() - i) * 8 - value[i].leading_zeros() as usize,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_length() {
        assert_eq!(bit_length(&[]), 0);
        assert_eq!(bit_length(&[0, 0]), 0);
        assert_eq!(bit_length(&[0, 1]), 1);
        assert_eq!(bit_length(&[0x80, 0]), 16);
        assert_eq!(bit_length(&p256::ORDER), 256);
    }
}
