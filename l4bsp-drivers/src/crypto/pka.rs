//! RSA and ECDSA over a [`PkaEngine`]
//!
//! Operands are checked before they reach the engine: the hardware accepts
//! some invalid inputs silently and returns garbage.

use core::cmp::Ordering;

use l4bsp_core::{BspError, BspResult};
use l4bsp_hal::pka::{
    bit_length, EcCurve, EcdsaSignParams, EcdsaVerifyParams, ModExpParams, PkaEngine,
};

/// Largest RSA modulus
pub const MAX_RSA_BITS: usize = 4096;

/// Compare big-endian unsigned integers of any length
pub fn cmp_be(a: &[u8], b: &[u8]) -> Ordering {
    let a = &a[a.iter().position(|&x| x != 0).unwrap_or(a.len())..];
    let b = &b[b.iter().position(|&x| x != 0).unwrap_or(b.len())..];
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn is_zero(value: &[u8]) -> bool {
    value.iter().all(|&b| b == 0)
}

/// `0 < value < order`
fn in_scalar_range(value: &[u8], order: &[u8]) -> bool {
    !is_zero(value) && cmp_be(value, order) == Ordering::Less
}

/// PKA front end
pub struct Pka<E> {
    engine: E,
}

impl<E: PkaEngine> Pka<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn release(self) -> E {
        self.engine
    }

    fn mod_exp(&mut self, base: &[u8], exponent: &[u8], modulus: &[u8], out: &mut [u8]) -> BspResult<()> {
        let bits = bit_length(modulus);
        if bits == 0 || bits > MAX_RSA_BITS {
            return Err(BspError::InvalidParameter);
        }
        if modulus.last().map_or(true, |b| b & 1 == 0) {
            return Err(BspError::InvalidParameter);
        }
        if cmp_be(base, modulus) != Ordering::Less || is_zero(exponent) {
            return Err(BspError::InvalidParameter);
        }
        if bit_length(exponent) > MAX_RSA_BITS || out.len() < bits.div_ceil(8) {
            return Err(BspError::InvalidParameter);
        }

        let params = ModExpParams {
            base,
            exponent,
            modulus,
        };
        Ok(self.engine.modular_exponentiation(&params, out)?)
    }

    /// `message ^ public_exponent mod modulus` (encrypt or verify)
    pub fn rsa_public(
        &mut self,
        message: &[u8],
        public_exponent: &[u8],
        modulus: &[u8],
        out: &mut [u8],
    ) -> BspResult<()> {
        self.mod_exp(message, public_exponent, modulus, out)
    }

    /// `ciphertext ^ private_exponent mod modulus` (decrypt or sign)
    pub fn rsa_private(
        &mut self,
        ciphertext: &[u8],
        private_exponent: &[u8],
        modulus: &[u8],
        out: &mut [u8],
    ) -> BspResult<()> {
        self.mod_exp(ciphertext, private_exponent, modulus, out)
    }

    fn check_curve(curve: &EcCurve<'_>, hash: &[u8]) -> BspResult<usize> {
        let order_len = curve.order.len();
        if is_zero(curve.order) || hash.len() > order_len {
            return Err(BspError::InvalidParameter);
        }
        Ok(order_len)
    }

    /// Sign `hash` with `private_key` and the per-signature secret `k`
    pub fn ecdsa_sign(
        &mut self,
        curve: &EcCurve<'_>,
        integer_k: &[u8],
        private_key: &[u8],
        hash: &[u8],
        r: &mut [u8],
        s: &mut [u8],
    ) -> BspResult<()> {
        let order_len = Self::check_curve(curve, hash)?;
        if !in_scalar_range(integer_k, curve.order) || !in_scalar_range(private_key, curve.order) {
            return Err(BspError::InvalidParameter);
        }
        if r.len() != order_len || s.len() != order_len {
            return Err(BspError::InvalidParameter);
        }

        let params = EcdsaSignParams {
            curve: *curve,
            integer_k,
            hash,
            private_key,
        };
        Ok(self.engine.ecdsa_sign(&params, r, s)?)
    }

    /// Check the signature `(r, s)` of `hash` against a public key
    ///
    /// A signature component outside `1..n` is rejected without running the
    /// engine.
    pub fn ecdsa_verify(
        &mut self,
        curve: &EcCurve<'_>,
        public_x: &[u8],
        public_y: &[u8],
        r: &[u8],
        s: &[u8],
        hash: &[u8],
    ) -> BspResult<bool> {
        let order_len = Self::check_curve(curve, hash)?;
        let prime_len = curve.prime.len();
        if public_x.len() > prime_len || public_y.len() > prime_len {
            return Err(BspError::InvalidParameter);
        }
        if r.len() > order_len || s.len() > order_len {
            return Err(BspError::InvalidParameter);
        }
        if !in_scalar_range(r, curve.order) || !in_scalar_range(s, curve.order) {
            return Ok(false);
        }

        let params = EcdsaVerifyParams {
            curve: *curve,
            public_x,
            public_y,
            r,
            s,
            hash,
        };
        Ok(self.engine.ecdsa_verify(&params)?)
    }
}
