//! Systematic Reed-Solomon codec over GF(2^m).
//!
//! Encoding is polynomial long division by the generator polynomial;
//! decoding runs syndromes, Berlekamp-Massey, a Chien search and the
//! Forney algorithm. All workspace buffers are owned by the codec and
//! reused across frames.

use super::gf::GaloisField;
use crate::error::{FsoError, Result};
use crate::telemetry;
use log::{debug, error, warn};
use rayon::prelude::*;

/// Construction parameters beyond the (n, k) geometry.
#[derive(Debug, Clone, Copy)]
pub struct RsConfig {
    /// First consecutive root exponent of the generator polynomial.
    pub fcr: u32,
    /// Symbol size m; the byte-oriented codec supports m in [3, 8].
    pub symbol_size: u32,
    /// Primitive polynomial of degree m.
    pub primitive_poly: u32,
}

impl Default for RsConfig {
    fn default() -> Self {
        RsConfig {
            fcr: 1,
            symbol_size: 8,
            primitive_poly: 0x11d,
        }
    }
}

/// Per-frame decode outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RsStats {
    /// Symbol errors detected by the decoder.
    pub detected: usize,
    /// Symbol errors corrected.
    pub corrected: usize,
    /// True when the error pattern exceeded the correction capacity.
    pub uncorrectable: bool,
}

pub struct RsCodec {
    n: usize,
    k: usize,
    num_roots: usize,
    t: usize,
    fcr: u32,
    gf: GaloisField,
    generator: Vec<u16>,
    // Workspace, reused across frames.
    work: Vec<u16>,
    syndrome: Vec<u16>,
    locator: Vec<u16>,
    prev_locator: Vec<u16>,
    scratch: Vec<u16>,
    evaluator: Vec<u16>,
}

impl RsCodec {
    pub fn new(n: usize, k: usize, config: RsConfig) -> Result<Self> {
        if !(3..=8).contains(&config.symbol_size) {
            error!(
                "RS symbol size {} outside byte range [3, 8]",
                config.symbol_size
            );
            return Err(FsoError::InvalidParam(format!(
                "RS symbol size {} outside [3, 8]",
                config.symbol_size
            )));
        }
        let field_limit = (1usize << config.symbol_size) - 1;
        if k == 0 || k >= n || n > field_limit {
            error!("invalid RS geometry n={} k={} (limit {})", n, k, field_limit);
            return Err(FsoError::InvalidParam(format!(
                "invalid RS geometry ({}, {})",
                n, k
            )));
        }

        let gf = GaloisField::new(config.symbol_size, config.primitive_poly)?;
        let num_roots = n - k;
        let t = num_roots / 2;

        let mut codec = RsCodec {
            n,
            k,
            num_roots,
            t,
            fcr: config.fcr,
            gf,
            generator: vec![0; num_roots + 1],
            work: vec![0; n],
            syndrome: vec![0; num_roots],
            locator: vec![0; num_roots + 1],
            prev_locator: vec![0; num_roots + 1],
            scratch: vec![0; num_roots + 1],
            evaluator: vec![0; num_roots],
        };
        codec.build_generator();

        debug!("RS({}, {}) codec initialized, t={}", n, k, t);
        Ok(codec)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Correction capacity in symbols.
    pub fn t(&self) -> usize {
        self.t
    }

    pub fn code_rate(&self) -> f64 {
        self.k as f64 / self.n as f64
    }

    pub fn galois_field(&self) -> &GaloisField {
        &self.gf
    }

    /// g(x) = prod_{i=0..r-1} (x - alpha^(fcr+i)), degree r. Stored
    /// leading-first (generator[0] = 1), the same order the encoder's
    /// division buffer uses.
    fn build_generator(&mut self) {
        let gf = &self.gf;
        self.generator[0] = 1;
        let mut degree = 0usize;

        for i in 0..self.num_roots {
            let root = gf.pow(2, (self.fcr as u64) + i as u64);
            self.scratch[..=degree].copy_from_slice(&self.generator[..=degree]);
            degree += 1;

            // Multiply by (x + root): new[j] = old[j] + root * old[j-1].
            self.generator[degree] = gf.mul(root, self.scratch[degree - 1]);
            for j in 1..degree {
                self.generator[j] = self.scratch[j] ^ gf.mul(root, self.scratch[j - 1]);
            }
        }
    }

    /// Systematic encode: the first k output symbols are the data, the
    /// last r are the remainder of data(x)*x^r divided by g(x).
    pub fn encode(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() != self.k {
            error!("RS encode length {} != k={}", data.len(), self.k);
            return Err(FsoError::InvalidParam(format!(
                "RS encode expects {} symbols, got {}",
                self.k,
                data.len()
            )));
        }

        for (w, &d) in self.work.iter_mut().zip(data.iter()) {
            *w = d as u16;
        }
        self.work[self.k..].fill(0);

        for i in 0..self.k {
            let feedback = self.work[i];
            if feedback != 0 {
                for j in 0..=self.num_roots {
                    self.work[i + j] ^= self.gf.mul(feedback, self.generator[j]);
                }
            }
        }

        let mut encoded = Vec::with_capacity(self.n);
        encoded.extend_from_slice(data);
        encoded.extend(self.work[self.k..].iter().map(|&s| s as u8));

        telemetry::FEC_FRAMES_ENCODED.inc();
        Ok(encoded)
    }

    /// S_i = r(alpha^(fcr+i)), with received[0] as the x^(n-1)
    /// coefficient like the encoder; returns true when any syndrome is
    /// non-zero.
    fn calculate_syndromes(&mut self, received: &[u8]) -> bool {
        let gf = &self.gf;
        let mut has_errors = false;
        for i in 0..self.num_roots {
            let root = gf.alpha_pow(self.fcr as i64 + i as i64);
            let mut acc = 0u16;
            for &r in received.iter() {
                acc = gf.mul(acc, root) ^ r as u16;
            }
            self.syndrome[i] = acc;
            has_errors |= acc != 0;
        }
        has_errors
    }

    /// Berlekamp-Massey: minimal-degree error locator for the syndrome
    /// sequence. Returns the locator degree nu.
    fn berlekamp_massey(&mut self) -> usize {
        let gf = &self.gf;
        let r = self.num_roots;

        self.locator.fill(0);
        self.locator[0] = 1;
        self.prev_locator.fill(0);
        self.prev_locator[0] = 1;

        let mut l = 0usize;
        let mut shift = 1usize;
        let mut prev_delta: u16 = 1;

        for i in 0..r {
            let mut delta = self.syndrome[i];
            for j in 1..=l.min(i) {
                delta ^= gf.mul(self.locator[j], self.syndrome[i - j]);
            }

            if delta == 0 {
                shift += 1;
            } else if 2 * l <= i {
                self.scratch.copy_from_slice(&self.locator);
                let coef = gf.mul(delta, gf.inv(prev_delta));
                if shift <= r {
                    for j in 0..=r - shift {
                        self.locator[j + shift] ^= gf.mul(coef, self.prev_locator[j]);
                    }
                }
                l = i + 1 - l;
                self.prev_locator.copy_from_slice(&self.scratch);
                prev_delta = delta;
                shift = 1;
            } else {
                let coef = gf.mul(delta, gf.inv(prev_delta));
                if shift <= r {
                    for j in 0..=r - shift {
                        self.locator[j + shift] ^= gf.mul(coef, self.prev_locator[j]);
                    }
                }
                shift += 1;
            }
        }
        l
    }

    /// Chien search: position p holds the x^(n-1-p) term, so it is in
    /// error exactly when Lambda(alpha^-(n-1-p)) = 0.
    fn chien_search(&self, nu: usize) -> Vec<usize> {
        let gf = &self.gf;
        let locator = &self.locator[..=nu];
        let high = self.n as i64 - 1;
        (0..self.n)
            .into_par_iter()
            .filter(|&p| gf.poly_eval(locator, gf.alpha_pow(p as i64 - high)) == 0)
            .collect()
    }

    /// Forney: with X_p = alpha^(n-1-p), the error magnitude at
    /// position p is X_p^(1-fcr) * Omega(X_p^-1) / Lambda'(X_p^-1).
    fn forney(&mut self, nu: usize, positions: &[usize]) -> Option<Vec<u16>> {
        let gf = &self.gf;

        // Omega(x) = S(x) * Lambda(x) mod x^r.
        self.evaluator.fill(0);
        for i in 0..self.num_roots {
            let mut acc = 0u16;
            for j in 0..=i.min(nu) {
                acc ^= gf.mul(self.locator[j], self.syndrome[i - j]);
            }
            self.evaluator[i] = acc;
        }

        let mut magnitudes = Vec::with_capacity(positions.len());
        for &p in positions {
            let exponent = (self.n - 1 - p) as i64;
            let x_inv = gf.alpha_pow(-exponent);
            let omega = gf.poly_eval(&self.evaluator, x_inv);

            // Formal derivative keeps only odd-degree terms in char 2.
            let mut derivative = 0u16;
            for i in (1..=nu).step_by(2) {
                derivative ^= gf.mul(self.locator[i], gf.pow(x_inv, (i - 1) as u64));
            }
            if derivative == 0 {
                return None;
            }

            let mut magnitude = gf.mul(omega, gf.inv(derivative));
            let factor = gf.alpha_pow(exponent * (1 - self.fcr as i64));
            magnitude = gf.mul(magnitude, factor);
            magnitudes.push(magnitude);
        }
        Some(magnitudes)
    }

    fn uncorrectable(&self, received: &[u8], detected: usize) -> (Vec<u8>, RsStats) {
        warn!(
            "RS({}, {}) block uncorrectable ({} errors suspected)",
            self.n, self.k, detected
        );
        telemetry::RS_UNCORRECTABLE.inc();
        (
            received[..self.k].to_vec(),
            RsStats {
                detected,
                corrected: 0,
                uncorrectable: true,
            },
        )
    }

    /// Decodes one received block. Uncorrectable blocks are an `Ok`
    /// return with the first k received symbols passed through and the
    /// stats flag raised.
    pub fn decode(&mut self, received: &[u8]) -> Result<(Vec<u8>, RsStats)> {
        if received.len() != self.n {
            error!("RS decode length {} != n={}", received.len(), self.n);
            return Err(FsoError::InvalidParam(format!(
                "RS decode expects {} symbols, got {}",
                self.n,
                received.len()
            )));
        }
        telemetry::FEC_FRAMES_DECODED.inc();

        if !self.calculate_syndromes(received) {
            return Ok((received[..self.k].to_vec(), RsStats::default()));
        }

        let nu = self.berlekamp_massey();
        if nu == 0 || nu > self.t {
            return Ok(self.uncorrectable(received, nu));
        }

        let positions = self.chien_search(nu);
        if positions.len() != nu {
            return Ok(self.uncorrectable(received, nu));
        }

        let magnitudes = match self.forney(nu, &positions) {
            Some(m) => m,
            None => return Ok(self.uncorrectable(received, nu)),
        };

        let mut corrected = received.to_vec();
        for (&p, &m) in positions.iter().zip(magnitudes.iter()) {
            corrected[p] ^= m as u8;
        }

        telemetry::RS_SYMBOLS_CORRECTED.inc_by(nu as u64);
        debug!("RS({}, {}) corrected {} symbols", self.n, self.k, nu);
        corrected.truncate(self.k);
        Ok((
            corrected,
            RsStats {
                detected: nu,
                corrected: nu,
                uncorrectable: false,
            },
        ))
    }
}
