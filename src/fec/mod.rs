//! # Forward Error Correction
//!
//! Two codec families protect the optical frame stream: a systematic
//! Reed-Solomon code over GF(2^m) with algebraic decoding, and a
//! regular LDPC code with sum-product belief propagation. Both expose
//! the same block-oriented encode/decode surface through [`FecCodec`];
//! the variant set is closed, so dispatch is a plain match.

use crate::error::{FsoError, Result};
use log::error;
use serde::Deserialize;

pub mod gf;
pub mod ldpc;
pub mod reed_solomon;

pub use gf::{default_primitive_poly, GaloisField};
pub use ldpc::{LdpcCodec, LdpcConfig, LdpcReport};
pub use reed_solomon::{RsCodec, RsConfig, RsStats};

/// Decode outcome shared by both codec families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FecStats {
    /// Errors detected in the received block (symbols for RS, bits for LDPC).
    pub detected: usize,
    /// Errors corrected.
    pub corrected: usize,
    /// RS: error pattern beyond capacity. LDPC: iteration budget exhausted.
    pub uncorrectable: bool,
}

/// Closed codec sum type; see the module docs.
pub enum FecCodec {
    ReedSolomon(RsCodec),
    Ldpc(LdpcCodec),
}

impl FecCodec {
    pub fn reed_solomon(n: usize, k: usize, config: RsConfig) -> Result<Self> {
        Ok(FecCodec::ReedSolomon(RsCodec::new(n, k, config)?))
    }

    pub fn ldpc(n: usize, k: usize, config: LdpcConfig) -> Result<Self> {
        Ok(FecCodec::Ldpc(LdpcCodec::new(n, k, config)?))
    }

    pub fn n(&self) -> usize {
        match self {
            FecCodec::ReedSolomon(rs) => rs.n(),
            FecCodec::Ldpc(ldpc) => ldpc.n(),
        }
    }

    pub fn k(&self) -> usize {
        match self {
            FecCodec::ReedSolomon(rs) => rs.k(),
            FecCodec::Ldpc(ldpc) => ldpc.k(),
        }
    }

    pub fn code_rate(&self) -> f64 {
        match self {
            FecCodec::ReedSolomon(rs) => rs.code_rate(),
            FecCodec::Ldpc(ldpc) => ldpc.code_rate(),
        }
    }

    /// Encodes k symbols (RS) or k bits (LDPC) into an n-length block.
    pub fn encode(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            FecCodec::ReedSolomon(rs) => rs.encode(data),
            FecCodec::Ldpc(ldpc) => ldpc.encode(data),
        }
    }

    /// Decodes one received block into the information part plus stats.
    pub fn decode(&mut self, received: &[u8]) -> Result<(Vec<u8>, FecStats)> {
        match self {
            FecCodec::ReedSolomon(rs) => {
                let (data, stats) = rs.decode(received)?;
                Ok((
                    data,
                    FecStats {
                        detected: stats.detected,
                        corrected: stats.corrected,
                        uncorrectable: stats.uncorrectable,
                    },
                ))
            }
            FecCodec::Ldpc(ldpc) => {
                let (data, report) = ldpc.decode(received)?;
                Ok((
                    data,
                    FecStats {
                        detected: report.corrected,
                        corrected: report.corrected,
                        uncorrectable: !report.converged,
                    },
                ))
            }
        }
    }
}

/// FEC section of the TOML configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FecConfig {
    /// "reed-solomon" or "ldpc".
    pub scheme: String,
    pub n: usize,
    pub k: usize,
    pub fcr: u32,
    pub symbol_size: u32,
    pub primitive_poly: u32,
    pub max_iterations: usize,
    pub convergence_threshold: f64,
}

impl Default for FecConfig {
    fn default() -> Self {
        FecConfig {
            scheme: "reed-solomon".to_string(),
            n: 255,
            k: 223,
            fcr: 1,
            symbol_size: 8,
            primitive_poly: 0x11d,
            max_iterations: 50,
            convergence_threshold: 1e-6,
        }
    }
}

impl FecConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 || self.k >= self.n {
            error!("fec config: invalid geometry n={} k={}", self.n, self.k);
            return Err(FsoError::InvalidParam(format!(
                "fec geometry ({}, {})",
                self.n, self.k
            )));
        }
        match self.scheme.as_str() {
            "reed-solomon" | "ldpc" => Ok(()),
            other => {
                error!("fec config: unknown scheme '{}'", other);
                Err(FsoError::Unsupported(format!("fec scheme '{}'", other)))
            }
        }
    }

    /// Builds the configured codec.
    pub fn build(&self) -> Result<FecCodec> {
        self.validate()?;
        match self.scheme.as_str() {
            "reed-solomon" => FecCodec::reed_solomon(
                self.n,
                self.k,
                RsConfig {
                    fcr: self.fcr,
                    symbol_size: self.symbol_size,
                    primitive_poly: self.primitive_poly,
                },
            ),
            "ldpc" => FecCodec::ldpc(
                self.n,
                self.k,
                LdpcConfig {
                    max_iterations: self.max_iterations,
                    convergence_threshold: self.convergence_threshold,
                },
            ),
            other => Err(FsoError::Unsupported(format!("fec scheme '{}'", other))),
        }
    }
}
