//! 2-D signal-strength map over (azimuth, elevation).
//!
//! The field is a flattened row-major grid (elevation-major, azimuth
//! within a row). Writes round to the nearest cell; reads interpolate
//! bilinearly across the four enclosing cells.

use crate::error::{FsoError, Result};
use log::{debug, error, warn};

pub struct SignalMap {
    data: Vec<f64>,
    az_samples: usize,
    el_samples: usize,
    az_min: f64,
    az_max: f64,
    el_min: f64,
    el_max: f64,
    az_resolution: f64,
    el_resolution: f64,
}

impl SignalMap {
    /// Builds a grid of `az_samples` x `el_samples` cells spanning
    /// `center +/- range/2` on each axis. Each axis needs at least two
    /// samples for interpolation.
    pub fn new(
        az_samples: usize,
        el_samples: usize,
        az_range: f64,
        el_range: f64,
        center_az: f64,
        center_el: f64,
    ) -> Result<Self> {
        if az_samples < 2 || el_samples < 2 {
            error!("map dimensions too small: {}x{}", az_samples, el_samples);
            return Err(FsoError::InvalidParam(format!(
                "signal map needs >= 2 samples per axis, got {}x{}",
                az_samples, el_samples
            )));
        }
        if az_range <= 0.0 || el_range <= 0.0 {
            error!("invalid map range: az={}, el={}", az_range, el_range);
            return Err(FsoError::InvalidParam(format!(
                "signal map range ({}, {}) must be positive",
                az_range, el_range
            )));
        }

        let map = SignalMap {
            data: vec![0.0; az_samples * el_samples],
            az_samples,
            el_samples,
            az_min: center_az - az_range / 2.0,
            az_max: center_az + az_range / 2.0,
            el_min: center_el - el_range / 2.0,
            el_max: center_el + el_range / 2.0,
            az_resolution: az_range / (az_samples - 1) as f64,
            el_resolution: el_range / (el_samples - 1) as f64,
        };
        debug!(
            "created signal map: {}x{} samples, az=[{:.3}, {:.3}], el=[{:.3}, {:.3}]",
            az_samples, el_samples, map.az_min, map.az_max, map.el_min, map.el_max
        );
        Ok(map)
    }

    pub fn az_resolution(&self) -> f64 {
        self.az_resolution
    }

    pub fn el_resolution(&self) -> f64 {
        self.el_resolution
    }

    fn in_bounds(&self, azimuth: f64, elevation: f64) -> bool {
        (self.az_min..=self.az_max).contains(&azimuth)
            && (self.el_min..=self.el_max).contains(&elevation)
    }

    /// Stores a strength sample at the nearest grid cell.
    pub fn set(&mut self, azimuth: f64, elevation: f64, strength: f64) -> Result<()> {
        if !self.in_bounds(azimuth, elevation) {
            warn!(
                "angle out of map bounds: az={:.3}, el={:.3}",
                azimuth, elevation
            );
            return Err(FsoError::InvalidParam(format!(
                "angle ({:.3}, {:.3}) outside map bounds",
                azimuth, elevation
            )));
        }

        let az_idx = (((azimuth - self.az_min) / self.az_resolution).round() as usize)
            .min(self.az_samples - 1);
        let el_idx = (((elevation - self.el_min) / self.el_resolution).round() as usize)
            .min(self.el_samples - 1);
        self.data[el_idx * self.az_samples + az_idx] = strength;
        Ok(())
    }

    /// Bilinearly interpolated strength at an arbitrary in-bounds angle.
    pub fn get(&self, azimuth: f64, elevation: f64) -> Result<f64> {
        if !self.in_bounds(azimuth, elevation) {
            return Err(FsoError::InvalidParam(format!(
                "angle ({:.3}, {:.3}) outside map bounds",
                azimuth, elevation
            )));
        }

        let az_f = (azimuth - self.az_min) / self.az_resolution;
        let el_f = (elevation - self.el_min) / self.el_resolution;
        let az0 = (az_f.floor() as usize).min(self.az_samples - 1);
        let el0 = (el_f.floor() as usize).min(self.el_samples - 1);
        let az1 = (az0 + 1).min(self.az_samples - 1);
        let el1 = (el0 + 1).min(self.el_samples - 1);
        let az_frac = az_f - az0 as f64;
        let el_frac = el_f - el0 as f64;

        let v00 = self.data[el0 * self.az_samples + az0];
        let v10 = self.data[el0 * self.az_samples + az1];
        let v01 = self.data[el1 * self.az_samples + az0];
        let v11 = self.data[el1 * self.az_samples + az1];

        let v0 = v00 * (1.0 - az_frac) + v10 * az_frac;
        let v1 = v01 * (1.0 - az_frac) + v11 * az_frac;
        Ok(v0 * (1.0 - el_frac) + v1 * el_frac)
    }

    /// Zeroes the whole field.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Linear scan for the strongest cell; returns its center and value.
    pub fn peak(&self) -> (f64, f64, f64) {
        let mut peak_strength = self.data[0];
        let mut peak_az = self.az_min;
        let mut peak_el = self.el_min;

        for el_idx in 0..self.el_samples {
            for az_idx in 0..self.az_samples {
                let strength = self.data[el_idx * self.az_samples + az_idx];
                if strength > peak_strength {
                    peak_strength = strength;
                    peak_az = self.az_min + az_idx as f64 * self.az_resolution;
                    peak_el = self.el_min + el_idx as f64 * self.el_resolution;
                }
            }
        }
        (peak_az, peak_el, peak_strength)
    }
}
