//! On-off keying: the simplest intensity modulation. A '1' bit drives
//! the laser on (slot value 1.0), a '0' bit leaves it dark.

use crate::error::{FsoError, Result};
use crate::util::db_to_linear;
use log::error;

/// One slot per bit, MSB first.
pub(super) fn modulate(data: &[u8]) -> Vec<f64> {
    let mut symbols = Vec::with_capacity(data.len() * 8);
    for &byte in data {
        for bit_idx in (0..8).rev() {
            symbols.push(if byte >> bit_idx & 1 == 1 { 1.0 } else { 0.0 });
        }
    }
    symbols
}

/// Decision threshold as a function of SNR. At high SNR the midpoint
/// is optimal; at low SNR the threshold is biased upward by the noise
/// variance (signal power 0.5 with equiprobable bits) and clamped into
/// [0.3, 0.7].
pub(super) fn calculate_threshold(snr_db: f64) -> f64 {
    if snr_db >= 10.0 {
        return 0.5;
    }
    let snr_linear = db_to_linear(snr_db);
    let noise_variance = 0.5 / snr_linear;
    (0.5 + 0.1 * noise_variance).clamp(0.3, 0.7)
}

pub(super) fn demodulate(symbols: &[f64], snr_db: f64) -> Result<Vec<u8>> {
    if symbols.is_empty() || symbols.len() % 8 != 0 {
        error!("OOK slot count {} is not a multiple of 8", symbols.len());
        return Err(FsoError::InvalidParam(format!(
            "OOK slot count {} is not a positive multiple of 8",
            symbols.len()
        )));
    }

    let threshold = calculate_threshold(snr_db);
    let mut data = Vec::with_capacity(symbols.len() / 8);
    for chunk in symbols.chunks_exact(8) {
        let mut byte = 0u8;
        for (bit_idx, &slot) in chunk.iter().enumerate() {
            if slot >= threshold {
                byte |= 1 << (7 - bit_idx);
            }
        }
        data.push(byte);
    }
    Ok(data)
}
