//! Software modular exponentiation
//!
//! Fixed-capacity little-endian 32-bit limbs and Montgomery multiplication
//! (CIOS). Operands are big-endian byte strings like the PKA RAM loaders.
//! Only odd moduli are supported, which covers RSA. [`SoftwarePka`] hands
//! ECDSA to [`super::ecc`].

use core::cmp::Ordering;

use l4bsp_hal::pka::{
    EcdsaSignParams, EcdsaVerifyParams, ModExpParams, PkaEngine, PkaError, MAX_MODEXP_BITS,
};

/// Limbs needed for the largest operand
pub const LIMBS: usize = MAX_MODEXP_BITS / 32;

type Limbs = [u32; LIMBS];

/// Load a big-endian byte string
fn from_be_bytes(bytes: &[u8]) -> Result<Limbs, PkaError> {
    let mut out = [0u32; LIMBS];
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let bytes = &bytes[start..];
    if bytes.len() > LIMBS * 4 {
        return Err(PkaError::InvalidOperand);
    }
    for (i, &b) in bytes.iter().rev().enumerate() {
        out[i / 4] |= (b as u32) << (8 * (i % 4));
    }
    Ok(out)
}

/// Store as big-endian into `out`, failing if the value does not fit
fn to_be_bytes(value: &[u32], out: &mut [u8]) -> Result<(), PkaError> {
    out.fill(0);
    for (i, limb) in value.iter().enumerate() {
        for (k, byte) in limb.to_le_bytes().into_iter().enumerate() {
            let pos = i * 4 + k;
            if pos < out.len() {
                let idx = out.len() - 1 - pos;
                out[idx] = byte;
            } else if byte != 0 {
                return Err(PkaError::InvalidOperand);
            }
        }
    }
    Ok(())
}

/// Limbs up to and including the most significant non-zero one
fn used_limbs(value: &[u32]) -> usize {
    value.iter().rposition(|&l| l != 0).map_or(0, |i| i + 1)
}

fn cmp(a: &[u32], b: &[u32]) -> Ordering {
    for (x, y) in a.iter().rev().zip(b.iter().rev()) {
        match x.cmp(y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// `a -= b`, returning the borrow
fn sub_assign(a: &mut [u32], b: &[u32]) -> bool {
    let mut borrow = 0u64;
    for (x, &y) in a.iter_mut().zip(b) {
        let diff = (*x as u64).wrapping_sub(y as u64).wrapping_sub(borrow);
        *x = diff as u32;
        borrow = (diff >> 63) & 1;
    }
    borrow != 0
}

/// `r = 2r + bit mod m` for `r < m`
fn double_add_mod(r: &mut [u32], bit: u32, m: &[u32]) {
    let mut carry = bit;
    for limb in r.iter_mut() {
        let next = *limb >> 31;
        *limb = (*limb << 1) | carry;
        carry = next;
    }
    if carry != 0 || cmp(r, m) != Ordering::Less {
        sub_assign(r, m);
    }
}

/// `-m^-1 mod 2^32` for odd `m0`
fn mont_inverse(m0: u32) -> u32 {
    // Newton iteration doubles the correct low bits each step
    let mut inv = 1u32;
    for _ in 0..5 {
        inv = inv.wrapping_mul(2u32.wrapping_sub(m0.wrapping_mul(inv)));
    }
    inv.wrapping_neg()
}

/// Montgomery context for one modulus
struct Montgomery {
    m: Limbs,
    n: usize,
    m_inv: u32,
    r2: Limbs,
}

impl Montgomery {
    fn new(m: Limbs) -> Self {
        let n = used_limbs(&m);
        let m_inv = mont_inverse(m[0]);

        // R^2 mod m by doubling 1 (2 * 32 * n) times
        let mut r2 = [0u32; LIMBS];
        r2[0] = 1;
        if cmp(&r2[..n], &m[..n]) != Ordering::Less {
            // m == 1
            r2[0] = 0;
        }
        for _ in 0..2 * 32 * n {
            double_add_mod(&mut r2[..n], 0, &m[..n]);
        }

        Self { m, n, m_inv, r2 }
    }

    /// `a * b * R^-1 mod m`
    fn mul(&self, a: &[u32], b: &[u32]) -> Limbs {
        let n = self.n;
        let m = &self.m;
        let mut t = [0u32; LIMBS + 2];

        for i in 0..n {
            let mut carry = 0u64;
            for j in 0..n {
                let s = t[j] as u64 + a[j] as u64 * b[i] as u64 + carry;
                t[j] = s as u32;
                carry = s >> 32;
            }
            let s = t[n] as u64 + carry;
            t[n] = s as u32;
            t[n + 1] = (s >> 32) as u32;

            let q = t[0].wrapping_mul(self.m_inv);
            let s = t[0] as u64 + q as u64 * m[0] as u64;
            let mut carry = s >> 32;
            for j in 1..n {
                let s = t[j] as u64 + q as u64 * m[j] as u64 + carry;
                t[j - 1] = s as u32;
                carry = s >> 32;
            }
            let s = t[n] as u64 + carry;
            t[n - 1] = s as u32;
            t[n] = t[n + 1] + (s >> 32) as u32;
        }

        let mut out = [0u32; LIMBS];
        out[..n].copy_from_slice(&t[..n]);
        if t[n] != 0 || cmp(&out[..n], &m[..n]) != Ordering::Less {
            sub_assign(&mut out[..n], &m[..n]);
        }
        out
    }

    /// `value mod m` for a value of any size
    fn reduce(&self, value: &Limbs) -> Limbs {
        let n = self.n;
        let mut r = [0u32; LIMBS];
        let bits = used_limbs(value) * 32;
        for i in (0..bits).rev() {
            let bit = (value[i / 32] >> (i % 32)) & 1;
            double_add_mod(&mut r[..n], bit, &self.m[..n]);
        }
        r
    }

    /// `base ^ exponent mod m`
    fn pow(&self, base: &Limbs, exponent: &Limbs) -> Limbs {
        let mut one = [0u32; LIMBS];
        one[0] = 1;

        let base = self.mul(&self.reduce(base), &self.r2);
        let mut acc = self.mul(&one, &self.r2);

        let bits = used_limbs(exponent) * 32;
        for i in (0..bits).rev() {
            acc = self.mul(&acc, &acc);
            if (exponent[i / 32] >> (i % 32)) & 1 == 1 {
                acc = self.mul(&acc, &base);
            }
        }
        self.mul(&acc, &one)
    }
}

/// PKA operations on the CPU
///
/// Modular exponentiation with odd moduli up to [`MAX_MODEXP_BITS`], and
/// ECDSA on P-256.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwarePka;

impl SoftwarePka {
    pub const fn new() -> Self {
        Self
    }
}

impl PkaEngine for SoftwarePka {
    fn modular_exponentiation(
        &mut self,
        params: &ModExpParams<'_>,
        out: &mut [u8],
    ) -> Result<(), PkaError> {
        let m = from_be_bytes(params.modulus)?;
        if m[0] & 1 == 0 {
            return Err(PkaError::InvalidOperand);
        }
        let base = from_be_bytes(params.base)?;
        let exponent = from_be_bytes(params.exponent)?;

        let ctx = Montgomery::new(m);
        let result = ctx.pow(&base, &exponent);
        to_be_bytes(&result, out)
    }

    fn ecdsa_sign(
        &mut self,
        params: &EcdsaSignParams<'_>,
        r: &mut [u8],
        s: &mut [u8],
    ) -> Result<(), PkaError> {
        super::ecc::sign(params, r, s)
    }

    fn ecdsa_verify(&mut self, params: &EcdsaVerifyParams<'_>) -> Result<bool, PkaError> {
        super::ecc::verify(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l4bsp_hal::pka::{p256, EcCurve};

    fn modexp(base: &[u8], exponent: &[u8], modulus: &[u8], out: &mut [u8]) -> Result<(), PkaError> {
        SoftwarePka.modular_exponentiation(
            &ModExpParams {
                base,
                exponent,
                modulus,
            },
            out,
        )
    }

    fn reference(base: u64, exponent: u64, modulus: u64) -> u64 {
        let m = modulus as u128;
        let mut acc = 1u128 % m;
        let mut b = base as u128 % m;
        let mut e = exponent;
        while e > 0 {
            if e & 1 == 1 {
                acc = acc * b % m;
            }
            b = b * b % m;
            e >>= 1;
        }
        acc as u64
    }

    #[test]
    fn test_mont_inverse() {
        for m0 in [1u32, 3, 0xFFFF_FFFF, 0x1234_5677] {
            assert_eq!(m0.wrapping_mul(mont_inverse(m0)), u32::MAX);
        }
    }

    #[test]
    fn test_textbook_rsa() {
        // n = 61 * 53, e = 17, d = 2753
        let n = 3233u16.to_be_bytes();
        let mut c = [0u8; 2];
        modexp(&[65], &[17], &n, &mut c).unwrap();
        assert_eq!(u16::from_be_bytes(c), 2790);

        let mut m = [0u8; 2];
        modexp(&c, &2753u16.to_be_bytes(), &n, &mut m).unwrap();
        assert_eq!(u16::from_be_bytes(m), 65);
    }

    #[test]
    fn test_mersenne_wraps() {
        // 2^127 = 1 mod (2^127 - 1), so 2^1024 = 2^8
        let m = (u128::MAX >> 1).to_be_bytes();
        let mut out = [0u8; 16];
        modexp(&[2], &[0x04, 0x00], &m, &mut out).unwrap();
        assert_eq!(u128::from_be_bytes(out), 256);
    }

    #[test]
    fn test_fermat_p256() {
        let mut p_minus_1 = p256::PRIME;
        p_minus_1[31] -= 1;
        let mut out = [0u8; 32];
        modexp(&[3], &p_minus_1, &p256::PRIME, &mut out).unwrap();
        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(out, one);
    }

    #[test]
    fn test_edge_operands() {
        let mut out = [0u8; 1];
        modexp(&[5], &[], &[7], &mut out).unwrap();
        assert_eq!(out, [1]);
        modexp(&[5], &[3], &[1], &mut out).unwrap();
        assert_eq!(out, [0]);
        assert_eq!(modexp(&[5], &[3], &[8], &mut out), Err(PkaError::InvalidOperand));
        // Result does not fit
        assert_eq!(
            modexp(&[2], &[9], &[0x03, 0x01], &mut out),
            Err(PkaError::InvalidOperand)
        );
    }

    #[test]
    fn test_ecdsa_needs_p256() {
        let params = EcdsaVerifyParams {
            curve: EcCurve {
                prime: &[0xFB],
                ..p256::CURVE
            },
            public_x: &p256::GX,
            public_y: &p256::GY,
            r: &[1],
            s: &[1],
            hash: &[0; 32],
        };
        assert_eq!(SoftwarePka.ecdsa_verify(&params), Err(PkaError::Unsupported));
    }

    proptest::proptest! {
        #[test]
        fn prop_matches_u128_reference(
            base in proptest::prelude::any::<u64>(),
            exponent in proptest::prelude::any::<u64>(),
            modulus in proptest::prelude::any::<u64>(),
        ) {
            let modulus = modulus | 1;
            let mut out = [0u8; 8];
            modexp(&base.to_be_bytes(), &exponent.to_be_bytes(), &modulus.to_be_bytes(), &mut out).unwrap();
            proptest::prop_assert_eq!(u64::from_be_bytes(out), reference(base, exponent, modulus));
        }
    }
}
