//! ECDSA over NIST P-256 on the CPU
//!
//! Field and group arithmetic come from the `p256` crate. Only the curve in
//! [`l4bsp_hal::pka::p256::CURVE`] is accepted; other parameter blocks get
//! `Unsupported`, as they would from a PKA without that curve loaded.

use p256::elliptic_curve::ff::{Field, PrimeField};
use p256::elliptic_curve::ops::Reduce;
use p256::elliptic_curve::point::AffineCoordinates;
use p256::elliptic_curve::subtle::ConstantTimeEq;
use p256::{FieldBytes, ProjectivePoint, PublicKey, Scalar, U256};

use l4bsp_hal::pka::{p256 as curve, EcCurve, EcdsaSignParams, EcdsaVerifyParams, PkaError};

use super::pka::cmp_be;

/// Coordinate and scalar size
pub const P256_BYTES: usize = 32;

fn same(a: &[u8], b: &[u8]) -> bool {
    cmp_be(a, b).is_eq()
}

/// Whether `c` describes P-256, ignoring leading zero bytes
pub fn is_p256(c: &EcCurve<'_>) -> bool {
    c.a_negative
        && same(c.a_abs, &curve::A_ABS)
        && same(c.prime, &curve::PRIME)
        && same(c.b, &curve::B)
        && same(c.order, &curve::ORDER)
        && same(c.gx, &curve::GX)
        && same(c.gy, &curve::GY)
}

/// Right-align a big-endian value in 32 bytes
fn field_bytes(value: &[u8]) -> Result<FieldBytes, PkaError> {
    let start = value.iter().position(|&b| b != 0).unwrap_or(value.len());
    let value = &value[start..];
    if value.len() > P256_BYTES {
        return Err(PkaError::InvalidOperand);
    }
    let mut out = FieldBytes::default();
    out[P256_BYTES - value.len()..].copy_from_slice(value);
    Ok(out)
}

/// Scalar in `1..n`
fn scalar(value: &[u8]) -> Result<Scalar, PkaError> {
    let s: Option<Scalar> = Scalar::from_repr(field_bytes(value)?).into();
    match s {
        Some(s) if !bool::from(s.is_zero()) => Ok(s),
        _ => Err(PkaError::InvalidOperand),
    }
}

/// Hash as an integer mod n
fn digest(hash: &[u8]) -> Result<Scalar, PkaError> {
    Ok(<Scalar as Reduce<U256>>::reduce_bytes(&field_bytes(hash)?))
}

fn store(value: &Scalar, out: &mut [u8]) -> Result<(), PkaError> {
    if out.len() != P256_BYTES {
        return Err(PkaError::InvalidOperand);
    }
    out.copy_from_slice(&value.to_repr());
    Ok(())
}

fn public_key(x: &[u8], y: &[u8]) -> Result<ProjectivePoint, PkaError> {
    let mut sec1 = [0u8; 1 + 2 * P256_BYTES];
    sec1[0] = 0x04;
    sec1[1..1 + P256_BYTES].copy_from_slice(&field_bytes(x)?);
    sec1[1 + P256_BYTES..].copy_from_slice(&field_bytes(y)?);
    PublicKey::from_sec1_bytes(&sec1)
        .map(|key| key.to_projective())
        .map_err(|_| PkaError::InvalidOperand)
}

/// `r = x(kG) mod n`, `s = k^-1 (z + r d) mod n`
pub fn sign(
    params: &EcdsaSignParams<'_>,
    r_out: &mut [u8],
    s_out: &mut [u8],
) -> Result<(), PkaError> {
    if !is_p256(&params.curve) {
        return Err(PkaError::Unsupported);
    }
    let k = scalar(params.integer_k)?;
    let d = scalar(params.private_key)?;
    let z = digest(params.hash)?;

    let point = (ProjectivePoint::GENERATOR * k).to_affine();
    let r = <Scalar as Reduce<U256>>::reduce_bytes(&point.x());
    let k_inv: Option<Scalar> = k.invert().into();
    let s = k_inv.ok_or(PkaError::InvalidOperand)? * (z + r * d);
    if bool::from(r.is_zero()) || bool::from(s.is_zero()) {
        return Err(PkaError::SignatureFailed);
    }

    store(&r, r_out)?;
    store(&s, s_out)
}

/// Check `x(u1 G + u2 Q) mod n == r` with `w = s^-1`, `u1 = z w`, `u2 = r w`
///
/// A public key that is not on the curve is an operand error; a signature
/// component outside `1..n` just fails verification.
pub fn verify(params: &EcdsaVerifyParams<'_>) -> Result<bool, PkaError> {
    if !is_p256(&params.curve) {
        return Err(PkaError::Unsupported);
    }
    let q = public_key(params.public_x, params.public_y)?;
    let z = digest(params.hash)?;
    let (r, s) = match (scalar(params.r), scalar(params.s)) {
        (Ok(r), Ok(s)) => (r, s),
        _ => return Ok(false),
    };

    let w: Option<Scalar> = s.invert().into();
    let w = w.ok_or(PkaError::InvalidOperand)?;
    let point = (ProjectivePoint::GENERATOR * (z * w) + q * (r * w)).to_affine();
    let v = <Scalar as Reduce<U256>>::reduce_bytes(&point.x());
    Ok(bool::from(v.ct_eq(&r)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Pka, SoftwarePka};
    use l4bsp_core::BspError;

    // RFC 6979 A.2.5, P-256 with SHA-256, message "sample"
    const KEY: [u8; 32] = [
        0xC9, 0xAF, 0xA9, 0xD8, 0x45, 0xBA, 0x75, 0x16, 0x6B, 0x5C, 0x21, 0x57, 0x67, 0xB1, 0xD6,
        0x93, 0x4E, 0x50, 0xC3, 0xDB, 0x36, 0xE8, 0x9B, 0x12, 0x7B, 0x8A, 0x62, 0x2B, 0x12, 0x0F,
        0x67, 0x21,
    ];
    const PUB_X: [u8; 32] = [
        0x60, 0xFE, 0xD4, 0xBA, 0x25, 0x5A, 0x9D, 0x31, 0xC9, 0x61, 0xEB, 0x74, 0xC6, 0x35, 0x6D,
        0x68, 0xC0, 0x49, 0xB8, 0x92, 0x3B, 0x61, 0xFA, 0x6C, 0xE6, 0x69, 0x62, 0x2E, 0x60, 0xF2,
        0x9F, 0xB6,
    ];
    const PUB_Y: [u8; 32] = [
        0x79, 0x03, 0xFE, 0x10, 0x08, 0xB8, 0xBC, 0x99, 0xA4, 0x1A, 0xE9, 0xE9, 0x56, 0x28, 0xBC,
        0x64, 0xF2, 0xF1, 0xB2, 0x0C, 0x2D, 0x7E, 0x9F, 0x51, 0x77, 0xA3, 0xC2, 0x94, 0xD4, 0x46,
        0x22, 0x99,
    ];
    const K: [u8; 32] = [
        0xA6, 0xE3, 0xC5, 0x7D, 0xD0, 0x1A, 0xBE, 0x90, 0x08, 0x65, 0x38, 0x39, 0x83, 0x55, 0xDD,
        0x4C, 0x3B, 0x17, 0xAA, 0x87, 0x33, 0x82, 0xB0, 0xF2, 0x4D, 0x61, 0x29, 0x49, 0x3D, 0x8A,
        0xAD, 0x60,
    ];
    /// SHA-256 of "sample"
    const HASH: [u8; 32] = [
        0xAF, 0x2B, 0xDB, 0xE1, 0xAA, 0x9B, 0x6E, 0xC1, 0xE2, 0xAD, 0xE1, 0xD6, 0x94, 0xF4, 0x1F,
        0xC7, 0x1A, 0x83, 0x1D, 0x02, 0x68, 0xE9, 0x89, 0x15, 0x62, 0x11, 0x3D, 0x8A, 0x62, 0xAD,
        0xD1, 0xBF,
    ];
    const R: [u8; 32] = [
        0xEF, 0xD4, 0x8B, 0x2A, 0xAC, 0xB6, 0xA8, 0xFD, 0x11, 0x40, 0xDD, 0x9C, 0xD4, 0x5E, 0x81,
        0xD6, 0x9D, 0x2C, 0x87, 0x7B, 0x56, 0xAA, 0xF9, 0x91, 0xC3, 0x4D, 0x0E, 0xA8, 0x4E, 0xAF,
        0x37, 0x16,
    ];
    const S: [u8; 32] = [
        0xF7, 0xCB, 0x1C, 0x94, 0x2D, 0x65, 0x7C, 0x41, 0xD4, 0x36, 0xC7, 0xA1, 0xB6, 0xE2, 0x9F,
        0x65, 0xF3, 0xE9, 0x00, 0xDB, 0xB9, 0xAF, 0xF4, 0x06, 0x4D, 0xC4, 0xAB, 0x2F, 0x84, 0x3A,
        0xCD, 0xA8,
    ];
    #[test]
    fn test_rfc6979_signature() {
        let mut pka = Pka::new(SoftwarePka::new());
        let (mut r, mut s) = ([0u8; 32], [0u8; 32]);
        pka.ecdsa_sign(&curve::CURVE, &K, &KEY, &HASH, &mut r, &mut s).unwrap();
        assert_eq!(r, R);
        assert_eq!(s, S);
    }

    #[test]
    fn test_rfc6979_verifies() {
        let mut pka = Pka::new(SoftwarePka::new());
        assert_eq!(pka.ecdsa_verify(&curve::CURVE, &PUB_X, &PUB_Y, &R, &S, &HASH), Ok(true));

        let mut hash = HASH;
        hash[31] ^= 1;
        assert_eq!(pka.ecdsa_verify(&curve::CURVE, &PUB_X, &PUB_Y, &R, &S, &hash), Ok(false));
        assert_eq!(pka.ecdsa_verify(&curve::CURVE, &PUB_X, &PUB_Y, &S, &R, &HASH), Ok(false));
    }

    #[test]
    fn test_sign_then_verify_with_generator_key() {
        // d = 1 makes the public key G
        let mut pka = Pka::new(SoftwarePka::new());
        let (mut r, mut s) = ([0u8; 32], [0u8; 32]);
        pka.ecdsa_sign(&curve::CURVE, &[0x55; 16], &[1], &[0x42; 20], &mut r, &mut s).unwrap();
        assert_eq!(
            pka.ecdsa_verify(&curve::CURVE, &curve::GX, &curve::GY, &r, &s, &[0x42; 20]),
            Ok(true)
        );
    }

    #[test]
    fn test_point_off_curve_rejected() {
        let mut pka = Pka::new(SoftwarePka::new());
        let mut y = PUB_Y;
        y[31] ^= 1;
        assert_eq!(
            pka.ecdsa_verify(&curve::CURVE, &PUB_X, &y, &R, &S, &HASH),
            Err(BspError::InvalidParameter)
        );
    }

    #[test]
    fn test_other_curves_unsupported() {
        let other = EcCurve {
            b: &[0x07],
            ..curve::CURVE
        };
        assert!(is_p256(&curve::CURVE));
        assert!(!is_p256(&other));
        let params = EcdsaVerifyParams {
            curve: other,
            public_x: &PUB_X,
            public_y: &PUB_Y,
            r: &R,
            s: &S,
            hash: &HASH,
        };
        assert_eq!(verify(&params), Err(PkaError::Unsupported));
    }
}
