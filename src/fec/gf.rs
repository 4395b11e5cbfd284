//! Finite-field arithmetic over GF(2^m).
//!
//! A `GaloisField` is built once per codec; afterwards multiplication,
//! division, powers and inverses are table lookups and addition is XOR.
//! The exponential table is stored at doubled length (2q-2) so that
//! `exp[log a + log b]` never needs a conditional subtract.

use crate::error::{FsoError, Result};
use log::{debug, error};

/// Default primitive polynomials for common symbol sizes.
const PRIMITIVE_POLYS: &[(u32, u32)] = &[
    (3, 0x0b),    // x^3 + x + 1
    (4, 0x13),    // x^4 + x + 1
    (5, 0x25),    // x^5 + x^2 + 1
    (6, 0x43),    // x^6 + x + 1
    (7, 0x89),    // x^7 + x^3 + 1
    (8, 0x11d),   // x^8 + x^4 + x^3 + x^2 + 1
    (9, 0x211),   // x^9 + x^4 + 1
    (10, 0x409),  // x^10 + x^3 + 1
    (11, 0x805),  // x^11 + x^2 + 1
    (12, 0x1053), // x^12 + x^6 + x^4 + x + 1
];

/// Returns the default primitive polynomial for GF(2^m), if one is known.
pub fn default_primitive_poly(symbol_size: u32) -> Option<u32> {
    PRIMITIVE_POLYS
        .iter()
        .find(|&&(m, _)| m == symbol_size)
        .map(|&(_, p)| p)
}

pub struct GaloisField {
    symbol_size: u32,
    field_size: usize,
    primitive_poly: u32,
    exp: Vec<u16>,
    log: Vec<u16>,
    inv: Vec<u16>,
}

impl GaloisField {
    /// Builds GF(2^m) for m in [3, 16] from a primitive polynomial of
    /// degree exactly m.
    pub fn new(symbol_size: u32, primitive_poly: u32) -> Result<Self> {
        if !(3..=16).contains(&symbol_size) {
            error!("invalid symbol size {} (valid range 3-16)", symbol_size);
            return Err(FsoError::InvalidParam(format!(
                "symbol size {} outside [3, 16]",
                symbol_size
            )));
        }
        // A degree-m polynomial occupies exactly m+1 bits.
        if primitive_poly == 0 || 32 - primitive_poly.leading_zeros() != symbol_size + 1 {
            error!(
                "primitive polynomial {:#x} does not have degree {}",
                primitive_poly, symbol_size
            );
            return Err(FsoError::InvalidParam(format!(
                "primitive polynomial {:#x} must have degree {}",
                primitive_poly, symbol_size
            )));
        }

        let field_size = 1usize << symbol_size;
        let mut gf = GaloisField {
            symbol_size,
            field_size,
            primitive_poly,
            exp: vec![0; 2 * field_size - 2],
            log: vec![0; field_size],
            inv: vec![0; field_size],
        };
        gf.build_tables();

        debug!(
            "GF(2^{}) initialized with primitive poly {:#x}",
            symbol_size, primitive_poly
        );
        Ok(gf)
    }

    fn build_tables(&mut self) {
        let q = self.field_size;

        self.exp[0] = 1;
        self.log[1] = 0;
        let mut x: u32 = 1;
        for i in 1..q - 1 {
            x = mul_no_table(x, 2, self.primitive_poly, q as u32);
            self.exp[i] = x as u16;
            self.log[x as usize] = i as u16;
        }
        // Extended copy for branch-free exp[log a + log b].
        for i in q - 1..2 * q - 2 {
            self.exp[i] = self.exp[i - (q - 1)];
        }
        // inv[0] stays 0 as a reserved sentinel.
        for i in 1..q {
            self.inv[i] = self.exp[q - 1 - self.log[i] as usize];
        }
    }

    pub fn symbol_size(&self) -> u32 {
        self.symbol_size
    }

    pub fn field_size(&self) -> usize {
        self.field_size
    }

    pub fn primitive_poly(&self) -> u32 {
        self.primitive_poly
    }

    /// Field addition (and subtraction) is XOR.
    #[inline]
    pub fn add(&self, a: u16, b: u16) -> u16 {
        a ^ b
    }

    #[inline]
    pub fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        let idx = self.log[a as usize] as usize + self.log[b as usize] as usize;
        self.exp[idx]
    }

    #[inline]
    pub fn div(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        let order = self.field_size - 1;
        let mut idx = self.log[a as usize] as isize - self.log[b as usize] as isize;
        if idx < 0 {
            idx += order as isize;
        }
        self.exp[idx as usize]
    }

    #[inline]
    pub fn pow(&self, base: u16, exponent: u64) -> u16 {
        if exponent == 0 {
            return 1;
        }
        if base == 0 {
            return 0;
        }
        let order = (self.field_size - 1) as u64;
        let idx = (self.log[base as usize] as u64 * exponent) % order;
        self.exp[idx as usize]
    }

    /// Multiplicative inverse; `inv(0)` returns the reserved 0 sentinel.
    #[inline]
    pub fn inv(&self, a: u16) -> u16 {
        self.inv[a as usize]
    }

    /// α^e for a possibly negative exponent.
    #[inline]
    pub fn alpha_pow(&self, e: i64) -> u16 {
        let order = (self.field_size - 1) as i64;
        let idx = e.rem_euclid(order);
        self.exp[idx as usize]
    }

    /// Evaluates a polynomial (coefficient of x^0 first) at x via Horner.
    pub fn poly_eval(&self, poly: &[u16], x: u16) -> u16 {
        let mut result = 0u16;
        for &c in poly.iter().rev() {
            result = self.mul(result, x) ^ c;
        }
        result
    }
}

/// Shift-and-reduce multiplication used only while building the tables.
fn mul_no_table(mut a: u32, mut b: u32, primitive_poly: u32, field_size: u32) -> u32 {
    let mut result = 0;
    while b > 0 {
        if b & 1 != 0 {
            result ^= a;
        }
        a <<= 1;
        if a >= field_size {
            a ^= primitive_poly;
        }
        b >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_inverse_identity_across_fields() {
        for m in 3..=12u32 {
            let poly = default_primitive_poly(m).unwrap();
            let gf = GaloisField::new(m, poly).unwrap();
            for x in 1..gf.field_size() as u16 {
                assert_eq!(gf.mul(x, gf.inv(x)), 1, "GF(2^{}) x={}", m, x);
                assert_eq!(gf.div(x, x), 1, "GF(2^{}) x={}", m, x);
            }
        }
    }

    #[test]
    fn gf16_field_builds() {
        // The same degree-16 polynomial the extreme-window coder uses.
        let gf = GaloisField::new(16, 0x1100b).unwrap();
        assert_eq!(gf.field_size(), 65536);
        for x in [1u16, 2, 255, 256, 40000, 65535] {
            assert_eq!(gf.mul(x, gf.inv(x)), 1);
        }
    }

    #[test]
    fn exp_log_round_trip() {
        let gf = GaloisField::new(8, 0x11d).unwrap();
        for x in 1..256u16 {
            assert_eq!(gf.exp[gf.log[x as usize] as usize], x);
        }
    }

    #[test]
    fn mul_matches_shift_reduce() {
        let gf = GaloisField::new(8, 0x11d).unwrap();
        for a in [0u16, 1, 2, 3, 0x53, 0xca, 255] {
            for b in [0u16, 1, 2, 0x8e, 170, 255] {
                let expected = mul_no_table(a as u32, b as u32, 0x11d, 256) as u16;
                assert_eq!(gf.mul(a, b), expected, "a={} b={}", a, b);
            }
        }
    }

    #[test]
    fn pow_and_alpha_pow() {
        let gf = GaloisField::new(8, 0x11d).unwrap();
        assert_eq!(gf.pow(2, 0), 1);
        assert_eq!(gf.pow(2, 1), 2);
        assert_eq!(gf.pow(2, 8), gf.mul(gf.pow(2, 4), gf.pow(2, 4)));
        // α^(-i) is the inverse of α^i.
        for i in 0..300i64 {
            let a = gf.alpha_pow(i);
            let b = gf.alpha_pow(-i);
            assert_eq!(gf.mul(a, b), 1);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(GaloisField::new(2, 0x7).is_err());
        assert!(GaloisField::new(17, 0x3_0000).is_err());
        // Degree mismatch: 0x1d has degree 4, not 8.
        assert!(GaloisField::new(8, 0x1d).is_err());
    }

    #[test]
    fn default_poly_table() {
        assert_eq!(default_primitive_poly(8), Some(0x11d));
        assert_eq!(default_primitive_poly(12), Some(0x1053));
        assert_eq!(default_primitive_poly(13), None);
    }
}
