//! # Optical modulation schemes
//!
//! OOK and M-PPM drive the transmit intensity directly and travel as
//! real-valued slot streams; DPSK encodes data in phase differences
//! and travels as complex field samples. The modulator is a closed sum
//! type dispatched by match; DPSK carries its differential phase
//! across calls so successive frames stay referenced.

use crate::error::{FsoError, Result};
use log::{error, info};
use num_complex::Complex;
use serde::Deserialize;

pub mod dpsk;
pub mod ook;
pub mod ppm;

pub use dpsk::DpskState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModulationScheme {
    Ook,
    Ppm,
    Dpsk,
}

impl std::str::FromStr for ModulationScheme {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ook" => Ok(ModulationScheme::Ook),
            "ppm" => Ok(ModulationScheme::Ppm),
            "dpsk" => Ok(ModulationScheme::Dpsk),
            _ => Err(()),
        }
    }
}

/// Symbol stream produced by a modulator: intensity slots for OOK/PPM,
/// complex field samples for DPSK.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbols {
    Intensity(Vec<f64>),
    Field(Vec<Complex<f64>>),
}

impl Symbols {
    pub fn len(&self) -> usize {
        match self {
            Symbols::Intensity(v) => v.len(),
            Symbols::Field(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Variant {
    Ook,
    Ppm { order: usize },
    Dpsk(DpskState),
}

pub struct Modulator {
    variant: Variant,
    symbol_rate: f64,
    bits_per_symbol: usize,
}

impl Modulator {
    /// Creates a modulator for the given scheme. PPM defaults to order 4.
    pub fn new(scheme: ModulationScheme, symbol_rate: f64) -> Result<Self> {
        if symbol_rate <= 0.0 {
            error!("invalid symbol rate {}", symbol_rate);
            return Err(FsoError::InvalidParam(format!(
                "symbol rate {} must be positive",
                symbol_rate
            )));
        }
        let modulator = match scheme {
            ModulationScheme::Ook => Modulator {
                variant: Variant::Ook,
                symbol_rate,
                bits_per_symbol: 1,
            },
            ModulationScheme::Ppm => return Self::ppm(symbol_rate, 4),
            ModulationScheme::Dpsk => Modulator {
                variant: Variant::Dpsk(DpskState::default()),
                symbol_rate,
                bits_per_symbol: 1,
            },
        };
        info!(
            "initialized {:?} modulator at {:.2e} symbols/s",
            scheme, symbol_rate
        );
        Ok(modulator)
    }

    /// Creates an M-PPM modulator, M in {2, 4, 8, 16}.
    pub fn ppm(symbol_rate: f64, order: usize) -> Result<Self> {
        if symbol_rate <= 0.0 {
            error!("invalid symbol rate {}", symbol_rate);
            return Err(FsoError::InvalidParam(format!(
                "symbol rate {} must be positive",
                symbol_rate
            )));
        }
        let bits = ppm::bits_per_symbol(order).ok_or_else(|| {
            error!("unsupported PPM order {}", order);
            FsoError::InvalidParam(format!("PPM order {} not in {{2, 4, 8, 16}}", order))
        })?;
        info!(
            "initialized {}-PPM modulator at {:.2e} symbols/s",
            order, symbol_rate
        );
        Ok(Modulator {
            variant: Variant::Ppm { order },
            symbol_rate,
            bits_per_symbol: bits,
        })
    }

    pub fn scheme(&self) -> ModulationScheme {
        match self.variant {
            Variant::Ook => ModulationScheme::Ook,
            Variant::Ppm { .. } => ModulationScheme::Ppm,
            Variant::Dpsk(_) => ModulationScheme::Dpsk,
        }
    }

    pub fn symbol_rate(&self) -> f64 {
        self.symbol_rate
    }

    pub fn bits_per_symbol(&self) -> usize {
        self.bits_per_symbol
    }

    /// Clears any per-stream state (the DPSK phase reference).
    pub fn reset(&mut self) {
        if let Variant::Dpsk(state) = &mut self.variant {
            *state = DpskState::default();
        }
    }

    pub fn modulate(&mut self, data: &[u8]) -> Result<Symbols> {
        if data.is_empty() {
            error!("modulate called with empty input");
            return Err(FsoError::InvalidParam("empty modulation input".into()));
        }
        match &mut self.variant {
            Variant::Ook => Ok(Symbols::Intensity(ook::modulate(data))),
            Variant::Ppm { order } => Ok(Symbols::Intensity(ppm::modulate(data, *order))),
            Variant::Dpsk(state) => Ok(Symbols::Field(dpsk::modulate(data, state))),
        }
    }

    /// Recovers bytes from a received symbol stream. `snr_db` feeds the
    /// OOK decision threshold and is ignored by the other schemes.
    pub fn demodulate(&mut self, symbols: &Symbols, snr_db: f64) -> Result<Vec<u8>> {
        match (&mut self.variant, symbols) {
            (Variant::Ook, Symbols::Intensity(slots)) => ook::demodulate(slots, snr_db),
            (Variant::Ppm { order }, Symbols::Intensity(slots)) => {
                ppm::demodulate(slots, *order)
            }
            (Variant::Dpsk(state), Symbols::Field(samples)) => dpsk::demodulate(samples, state),
            _ => {
                error!("symbol stream kind does not match modulator scheme");
                Err(FsoError::InvalidParam(
                    "symbol stream kind does not match modulator scheme".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ook_symbol_pattern_and_round_trip() {
        let mut m = Modulator::new(ModulationScheme::Ook, 1e6).unwrap();
        let data = [0xa5u8, 0x5a];
        let symbols = m.modulate(&data).unwrap();
        let expected = [
            1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0,
        ];
        match &symbols {
            Symbols::Intensity(slots) => assert_eq!(slots.as_slice(), expected.as_slice()),
            _ => panic!("OOK must produce intensity slots"),
        }
        assert_eq!(m.demodulate(&symbols, 20.0).unwrap(), data);
    }

    #[test]
    fn ppm4_pulse_placement() {
        let mut m = Modulator::ppm(1e6, 4).unwrap();
        // 0x9c = 0b10_01_11_00, MSB-first pairs select slots 2, 1, 3, 0.
        let symbols = m.modulate(&[0x9c]).unwrap();
        let slots = match &symbols {
            Symbols::Intensity(s) => s,
            _ => panic!("PPM must produce intensity slots"),
        };
        assert_eq!(slots.len(), 16);
        for (sym, pulse) in [2usize, 1, 3, 0].into_iter().enumerate() {
            for slot in 0..4 {
                let expected = if slot == pulse { 1.0 } else { 0.0 };
                assert_eq!(slots[sym * 4 + slot], expected, "symbol {} slot {}", sym, slot);
            }
        }
        assert_eq!(m.demodulate(&symbols, 20.0).unwrap(), vec![0x9c]);
    }

    #[test]
    fn ppm_orders_round_trip() {
        for order in [2usize, 4, 8, 16] {
            let mut m = Modulator::ppm(1e6, order).unwrap();
            // Three bytes = 24 bits, a multiple of every supported
            // bits-per-symbol, so no padding asymmetry.
            let data = [0x12u8, 0xf0, 0x77];
            let symbols = m.modulate(&data).unwrap();
            assert_eq!(m.demodulate(&symbols, 30.0).unwrap(), data);
        }
    }

    #[test]
    fn ppm_pads_final_partial_symbol() {
        let mut m = Modulator::ppm(1e6, 8).unwrap();
        // 8 bits over 3-bit symbols: third symbol carries 2 data bits
        // plus a padding zero; demodulation returns the padded width.
        let symbols = m.modulate(&[0xffu8]).unwrap();
        assert_eq!(symbols.len(), 3 * 8);
        let decoded = m.demodulate(&symbols, 30.0).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], 0xff);
    }

    #[test]
    fn dpsk_round_trip_across_frames() {
        let mut tx = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
        let mut rx = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
        let frame1 = [0xdeu8, 0xad, 0xbe, 0xef];
        let frame2 = [0x01u8, 0x80, 0xff, 0x00];
        let s1 = tx.modulate(&frame1).unwrap();
        let s2 = tx.modulate(&frame2).unwrap();
        // The receiver carries the phase reference across the frame gap.
        assert_eq!(rx.demodulate(&s1, 20.0).unwrap(), frame1);
        assert_eq!(rx.demodulate(&s2, 20.0).unwrap(), frame2);
    }

    #[test]
    fn dpsk_input_bit_flip_is_localized() {
        // Flipping one input bit shifts every later phase by pi but
        // leaves their differences intact, so exactly one decoded bit
        // changes.
        let clean = [0x33u8, 0xc1];
        let mut flipped = clean;
        flipped[1] ^= 0x10;

        let mut tx_a = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
        let mut tx_b = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
        let mut rx_a = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
        let mut rx_b = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();

        let sa = tx_a.modulate(&clean).unwrap();
        let sb = tx_b.modulate(&flipped).unwrap();
        let da = rx_a.demodulate(&sa, 20.0).unwrap();
        let db = rx_b.demodulate(&sb, 20.0).unwrap();
        assert_eq!(da, clean);
        assert_eq!(db, flipped);
        let differing: u32 = da
            .iter()
            .zip(db.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        assert_eq!(differing, 1);
    }

    #[test]
    fn dpsk_channel_flip_disturbs_two_decisions_at_most() {
        let mut tx = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
        let mut rx = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
        let data = [0x00u8, 0x00];
        let symbols = tx.modulate(&data).unwrap();
        let mut samples = match symbols {
            Symbols::Field(s) => s,
            _ => unreachable!(),
        };
        // Negating one sample flips its phase relation to both
        // neighbours; differential detection localizes the damage.
        samples[5] = -samples[5];
        let decoded = rx.demodulate(&Symbols::Field(samples), 20.0).unwrap();
        let errors: u32 = decoded
            .iter()
            .zip(data.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        assert!(errors >= 1 && errors <= 2, "errors = {}", errors);
    }

    #[test]
    fn ook_threshold_tracks_snr() {
        assert_eq!(ook::calculate_threshold(15.0), 0.5);
        assert_eq!(ook::calculate_threshold(10.0), 0.5);
        let low = ook::calculate_threshold(0.0);
        assert!(low > 0.5 && low <= 0.7, "threshold {}", low);
        assert_eq!(ook::calculate_threshold(-30.0), 0.7);
    }

    #[test]
    fn alignment_preconditions_are_enforced() {
        let mut ook_mod = Modulator::new(ModulationScheme::Ook, 1e6).unwrap();
        let bad = Symbols::Intensity(vec![1.0; 12]);
        assert!(ook_mod.demodulate(&bad, 20.0).is_err());

        let mut ppm_mod = Modulator::ppm(1e6, 4).unwrap();
        let bad = Symbols::Intensity(vec![0.0; 10]);
        assert!(ppm_mod.demodulate(&bad, 20.0).is_err());

        // Stream kind mismatch.
        let mut dpsk_mod = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
        let bad = Symbols::Intensity(vec![1.0; 16]);
        assert!(dpsk_mod.demodulate(&bad, 20.0).is_err());
    }

    #[test]
    fn rejects_bad_construction() {
        assert!(Modulator::new(ModulationScheme::Ook, 0.0).is_err());
        assert!(Modulator::ppm(1e6, 3).is_err());
        assert!(Modulator::ppm(1e6, 32).is_err());
    }
}
