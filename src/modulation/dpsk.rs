//! Differential phase shift keying. A '1' bit advances the carrier
//! phase by pi, a '0' bit leaves it unchanged; the receiver multiplies
//! each sample by the conjugate of its predecessor and decides on the
//! sign of the real part. The last phase survives in [`DpskState`] so
//! consecutive frames stay differentially referenced.

use crate::error::{FsoError, Result};
use log::error;
use num_complex::Complex;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, Default)]
pub struct DpskState {
    last_phase: f64,
    initialized: bool,
}

impl DpskState {
    pub fn last_phase(&self) -> f64 {
        self.last_phase
    }
}

pub(super) fn modulate(data: &[u8], state: &mut DpskState) -> Vec<Complex<f64>> {
    let mut phase = if state.initialized {
        state.last_phase
    } else {
        state.initialized = true;
        0.0
    };

    let mut symbols = Vec::with_capacity(data.len() * 8);
    for &byte in data {
        for bit_idx in (0..8).rev() {
            if byte >> bit_idx & 1 == 1 {
                phase += PI;
            }
            // Wrap into [-pi, pi].
            while phase > PI {
                phase -= 2.0 * PI;
            }
            while phase < -PI {
                phase += 2.0 * PI;
            }
            symbols.push(Complex::from_polar(1.0, phase));
        }
    }

    state.last_phase = phase;
    symbols
}

pub(super) fn demodulate(symbols: &[Complex<f64>], state: &mut DpskState) -> Result<Vec<u8>> {
    if symbols.is_empty() || symbols.len() % 8 != 0 {
        error!("DPSK sample count {} is not a multiple of 8", symbols.len());
        return Err(FsoError::InvalidParam(format!(
            "DPSK sample count {} is not a positive multiple of 8",
            symbols.len()
        )));
    }

    let mut prev = if state.initialized {
        Complex::from_polar(1.0, state.last_phase)
    } else {
        state.initialized = true;
        Complex::from_polar(1.0, 0.0)
    };

    let mut data = Vec::with_capacity(symbols.len() / 8);
    let mut sample_idx = 0;
    for _ in 0..symbols.len() / 8 {
        let mut byte = 0u8;
        for bit_idx in (0..8).rev() {
            let current = symbols[sample_idx];
            let diff = current * prev.conj();
            if diff.re < 0.0 {
                byte |= 1 << bit_idx;
            }
            prev = current;
            sample_idx += 1;
        }
        data.push(byte);
    }

    state.last_phase = prev.arg();
    Ok(data)
}
