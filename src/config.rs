//! TOML configuration layer for the link core.
//!
//! A single document carries one section per subsystem; every field
//! has a default, so partial documents are fine. `validate()` applies
//! the same ranges the constructors enforce, which lets a front end
//! reject a bad file before any component is built.

use crate::channel::{ChannelModel, Weather};
use crate::error::{FsoError, Result};
use crate::fec::FecConfig;
use crate::modulation::{ModulationScheme, Modulator};
use crate::rng::SimRng;
use crate::tracking::BeamTracker;
use log::error;
use serde::Deserialize;
use std::path::Path;

/// Unified configuration parsed from a TOML document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FsoConfig {
    pub fec: FecConfig,
    pub modulation: ModulationConfig,
    pub channel: ChannelConfig,
    pub tracking: TrackingConfig,
}

impl FsoConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| {
            error!("failed to parse configuration: {}", e);
            FsoError::InvalidParam(format!("configuration parse error: {}", e))
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.fec.validate()?;
        self.modulation.validate()?;
        self.channel.validate()?;
        self.tracking.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModulationConfig {
    pub scheme: ModulationScheme,
    pub symbol_rate: f64,
    pub ppm_order: usize,
}

impl Default for ModulationConfig {
    fn default() -> Self {
        ModulationConfig {
            scheme: ModulationScheme::Ook,
            symbol_rate: 1e6,
            ppm_order: 4,
        }
    }
}

impl ModulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.symbol_rate <= 0.0 {
            error!("modulation config: symbol rate {} invalid", self.symbol_rate);
            return Err(FsoError::InvalidParam("symbol rate".into()));
        }
        if self.scheme == ModulationScheme::Ppm
            && !matches!(self.ppm_order, 2 | 4 | 8 | 16)
        {
            error!("modulation config: ppm order {} invalid", self.ppm_order);
            return Err(FsoError::InvalidParam(format!(
                "PPM order {} not in {{2, 4, 8, 16}}",
                self.ppm_order
            )));
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Modulator> {
        self.validate()?;
        match self.scheme {
            ModulationScheme::Ppm => Modulator::ppm(self.symbol_rate, self.ppm_order),
            scheme => Modulator::new(scheme, self.symbol_rate),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Link distance in meters.
    pub distance: f64,
    /// Wavelength in nanometers.
    pub wavelength_nm: f64,
    pub weather: Weather,
    /// Refractive-index structure parameter; 0 selects the weather default.
    pub cn2: f64,
    /// Fading correlation time in seconds.
    pub correlation_time: f64,
    pub temperature: f64,
    pub humidity: f64,
    /// RNG seed; 0 derives one from entropy.
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            distance: 1000.0,
            wavelength_nm: 1550.0,
            weather: Weather::Clear,
            cn2: 0.0,
            correlation_time: 1e-3,
            temperature: 20.0,
            humidity: 0.5,
            seed: 0,
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<()> {
        if !(100.0..=10_000.0).contains(&self.distance) {
            error!("channel config: distance {} m out of range", self.distance);
            return Err(FsoError::InvalidParam("channel distance".into()));
        }
        if !(500.0..=2000.0).contains(&self.wavelength_nm) {
            error!(
                "channel config: wavelength {} nm out of range",
                self.wavelength_nm
            );
            return Err(FsoError::InvalidParam("channel wavelength".into()));
        }
        if self.cn2 != 0.0 && !(1e-17..=1e-12).contains(&self.cn2) {
            error!("channel config: cn2 {:e} out of range", self.cn2);
            return Err(FsoError::InvalidParam("channel cn2".into()));
        }
        if !(self.correlation_time > 0.0 && self.correlation_time < 1.0) {
            error!(
                "channel config: correlation time {} out of range",
                self.correlation_time
            );
            return Err(FsoError::InvalidParam("channel correlation time".into()));
        }
        if !(-50.0..=50.0).contains(&self.temperature) || !(0.0..=1.0).contains(&self.humidity) {
            error!(
                "channel config: temperature {} / humidity {} out of range",
                self.temperature, self.humidity
            );
            return Err(FsoError::InvalidParam("channel atmosphere".into()));
        }
        Ok(())
    }

    pub fn build(&self) -> Result<ChannelModel> {
        self.validate()?;
        let wavelength = self.wavelength_nm * 1e-9;
        let cn2 = if self.cn2 == 0.0 {
            self.weather.default_cn2()
        } else {
            self.cn2
        };
        let mut channel = ChannelModel::with_params(
            self.distance,
            wavelength,
            self.weather,
            cn2,
            self.correlation_time,
            SimRng::new(self.seed),
        )?;
        channel.set_atmospheric_params(self.temperature, self.humidity)?;
        Ok(channel)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub initial_azimuth: f64,
    pub initial_elevation: f64,
    pub map_samples: usize,
    /// Angular extent of the signal map on each axis, radians.
    pub map_range: f64,
    pub signal_threshold: f64,
    pub pid_kp: f64,
    pub pid_ki: f64,
    pub pid_kd: f64,
    pub pid_update_rate: f64,
    pub pid_integral_limit: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            initial_azimuth: 0.0,
            initial_elevation: 0.0,
            map_samples: 41,
            map_range: 0.4,
            signal_threshold: 0.1,
            pid_kp: 1.0,
            pid_ki: 0.1,
            pid_kd: 0.05,
            pid_update_rate: 100.0,
            pid_integral_limit: 1.0,
        }
    }
}

impl TrackingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.map_samples < 2 || self.map_range <= 0.0 {
            error!(
                "tracking config: map {}x{} over {} rad invalid",
                self.map_samples, self.map_samples, self.map_range
            );
            return Err(FsoError::InvalidParam("tracking map geometry".into()));
        }
        if !(0.0..=1.0).contains(&self.signal_threshold) {
            error!(
                "tracking config: threshold {} out of range",
                self.signal_threshold
            );
            return Err(FsoError::InvalidParam("tracking threshold".into()));
        }
        if self.pid_update_rate <= 0.0 {
            error!(
                "tracking config: update rate {} invalid",
                self.pid_update_rate
            );
            return Err(FsoError::InvalidParam("tracking update rate".into()));
        }
        Ok(())
    }

    pub fn build(&self) -> Result<BeamTracker> {
        self.validate()?;
        let mut tracker = BeamTracker::new(
            self.initial_azimuth,
            self.initial_elevation,
            self.map_samples,
            self.map_samples,
            self.map_range,
            self.map_range,
        )?;
        tracker.set_threshold(self.signal_threshold)?;
        tracker.configure_pid(
            self.pid_kp,
            self.pid_ki,
            self.pid_kd,
            self.pid_update_rate,
            self.pid_integral_limit,
        )?;
        Ok(tracker)
    }
}
