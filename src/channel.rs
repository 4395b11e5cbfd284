//! Atmospheric channel model for the optical link.
//!
//! Combines free-space path loss, weather-dependent attenuation (Kim
//! fog, Carbonneau rain, empirical snow), molecular absorption,
//! log-normal turbulence fading with AR(1) temporal correlation, and
//! AWGN. Derived scalars (Rytov variance, scintillation index, path
//! loss, attenuation) are cached and recomputed whenever an input
//! parameter changes.

use crate::error::{FsoError, Result};
use crate::rng::SimRng;
use crate::util::db_to_linear;
use log::{debug, error, info};
use serde::Deserialize;
use std::f64::consts::PI;

// Default refractive-index structure parameters per weather condition.
const DEFAULT_CN2_CLEAR: f64 = 1e-15;
const DEFAULT_CN2_FOG: f64 = 5e-15;
const DEFAULT_CN2_RAIN: f64 = 1e-14;
const DEFAULT_CN2_SNOW: f64 = 2e-14;
const DEFAULT_CN2_HIGH_TURB: f64 = 1e-13;

const DEFAULT_CORRELATION_TIME: f64 = 1e-3;
const DEFAULT_BEAM_DIVERGENCE: f64 = 1e-3;
const FADE_HISTORY_LEN: usize = 100;

// Parameter validation ranges.
const MIN_DISTANCE: f64 = 100.0;
const MAX_DISTANCE: f64 = 10_000.0;
const MIN_WAVELENGTH: f64 = 500e-9;
const MAX_WAVELENGTH: f64 = 2000e-9;
const MIN_CN2: f64 = 1e-17;
const MAX_CN2: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Weather {
    Clear,
    Fog,
    Rain,
    Snow,
    HighTurbulence,
}

impl Weather {
    /// Default C_n^2 for this condition, m^(-2/3).
    pub fn default_cn2(self) -> f64 {
        match self {
            Weather::Clear => DEFAULT_CN2_CLEAR,
            Weather::Fog => DEFAULT_CN2_FOG,
            Weather::Rain => DEFAULT_CN2_RAIN,
            Weather::Snow => DEFAULT_CN2_SNOW,
            Weather::HighTurbulence => DEFAULT_CN2_HIGH_TURB,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Weather::Clear => "Clear",
            Weather::Fog => "Fog",
            Weather::Rain => "Rain",
            Weather::Snow => "Snow",
            Weather::HighTurbulence => "High Turbulence",
        }
    }
}

impl std::str::FromStr for Weather {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clear" => Ok(Weather::Clear),
            "fog" => Ok(Weather::Fog),
            "rain" => Ok(Weather::Rain),
            "snow" => Ok(Weather::Snow),
            "high-turbulence" | "high_turbulence" | "turbulent" => Ok(Weather::HighTurbulence),
            _ => Err(()),
        }
    }
}

pub struct ChannelModel {
    // Link geometry.
    link_distance: f64,
    wavelength: f64,
    beam_divergence: f64,
    // Atmospheric state.
    weather: Weather,
    cn2: f64,
    temperature: f64,
    humidity: f64,
    visibility: f64,
    rainfall_rate: f64,
    snowfall_rate: f64,
    // Fading state.
    correlation_time: f64,
    fade_history: Vec<f64>,
    history_index: usize,
    last_fade: f64,
    rng: SimRng,
    // Cached derived scalars.
    rytov_variance: f64,
    scintillation_index: f64,
    path_loss_db: f64,
    attenuation_db_per_km: f64,
}

impl ChannelModel {
    /// Builds a channel with the weather's default C_n^2 and the
    /// nominal 1 ms correlation time.
    pub fn new(distance: f64, wavelength: f64, weather: Weather, rng: SimRng) -> Result<Self> {
        let cn2 = weather.default_cn2();
        Self::with_params(distance, wavelength, weather, cn2, DEFAULT_CORRELATION_TIME, rng)
    }

    /// Builds a channel with explicit turbulence strength and
    /// correlation time.
    pub fn with_params(
        distance: f64,
        wavelength: f64,
        weather: Weather,
        cn2: f64,
        correlation_time: f64,
        rng: SimRng,
    ) -> Result<Self> {
        validate_params(distance, wavelength, cn2)?;
        if !(correlation_time > 0.0 && correlation_time < 1.0) {
            error!("invalid correlation time {} s", correlation_time);
            return Err(FsoError::InvalidParam(format!(
                "correlation time {} outside (0, 1) s",
                correlation_time
            )));
        }

        let mut channel = ChannelModel {
            link_distance: distance,
            wavelength,
            beam_divergence: DEFAULT_BEAM_DIVERGENCE,
            weather,
            cn2,
            temperature: 20.0,
            humidity: 0.5,
            visibility: 1000.0,
            rainfall_rate: 0.0,
            snowfall_rate: 0.0,
            correlation_time,
            fade_history: vec![1.0; FADE_HISTORY_LEN],
            history_index: 0,
            last_fade: 1.0,
            rng,
            rytov_variance: 0.0,
            scintillation_index: 0.0,
            path_loss_db: 0.0,
            attenuation_db_per_km: 0.0,
        };

        // Weather-specific defaults.
        match weather {
            Weather::Fog => channel.visibility = 200.0,
            Weather::Rain => channel.rainfall_rate = 10.0,
            Weather::Snow => channel.snowfall_rate = 5.0,
            Weather::HighTurbulence => channel.cn2 = DEFAULT_CN2_HIGH_TURB,
            Weather::Clear => {}
        }

        channel.update_calculations();
        info!(
            "channel initialized: distance={:.1} m, wavelength={:.0} nm, weather={}",
            distance,
            wavelength * 1e9,
            weather.name()
        );
        debug!(
            "cn2={:.2e}, rytov={:.4}, scintillation={:.4}",
            channel.cn2, channel.rytov_variance, channel.scintillation_index
        );
        Ok(channel)
    }

    /// Recomputes every cached derived scalar from the current inputs.
    pub fn update_calculations(&mut self) {
        self.rytov_variance =
            calculate_rytov_variance(self.cn2, self.wavelength, self.link_distance);
        self.scintillation_index = calculate_scintillation_index(self.rytov_variance);
        self.path_loss_db = calculate_path_loss(self.link_distance, self.wavelength);
        self.attenuation_db_per_km = self.calculate_attenuation();
        debug!(
            "updated calculations: rytov={:.4}, scint={:.4}, path_loss={:.2} dB, atten={:.2} dB/km",
            self.rytov_variance,
            self.scintillation_index,
            self.path_loss_db,
            self.attenuation_db_per_km
        );
    }

    pub fn set_weather_params(
        &mut self,
        visibility: f64,
        rainfall_rate: f64,
        snowfall_rate: f64,
    ) -> Result<()> {
        if visibility <= 0.0 || rainfall_rate < 0.0 || snowfall_rate < 0.0 {
            error!(
                "invalid weather params: visibility={}, rain={}, snow={}",
                visibility, rainfall_rate, snowfall_rate
            );
            return Err(FsoError::InvalidParam("weather parameters".into()));
        }
        self.visibility = visibility;
        self.rainfall_rate = rainfall_rate;
        self.snowfall_rate = snowfall_rate;
        self.update_calculations();
        Ok(())
    }

    pub fn set_atmospheric_params(&mut self, temperature: f64, humidity: f64) -> Result<()> {
        if !(-50.0..=50.0).contains(&temperature) || !(0.0..=1.0).contains(&humidity) {
            error!(
                "invalid atmospheric params: temperature={}, humidity={}",
                temperature, humidity
            );
            return Err(FsoError::InvalidParam("atmospheric parameters".into()));
        }
        self.temperature = temperature;
        self.humidity = humidity;
        self.update_calculations();
        Ok(())
    }

    pub fn set_beam_divergence(&mut self, divergence: f64) -> Result<()> {
        if !(divergence > 0.0 && divergence < 0.1) {
            error!("invalid beam divergence {} rad", divergence);
            return Err(FsoError::InvalidParam(format!(
                "beam divergence {} outside (0, 0.1) rad",
                divergence
            )));
        }
        self.beam_divergence = divergence;
        Ok(())
    }

    pub fn set_cn2(&mut self, cn2: f64) -> Result<()> {
        validate_params(self.link_distance, self.wavelength, cn2)?;
        self.cn2 = cn2;
        self.update_calculations();
        Ok(())
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn cn2(&self) -> f64 {
        self.cn2
    }

    pub fn rytov_variance(&self) -> f64 {
        self.rytov_variance
    }

    pub fn scintillation_index(&self) -> f64 {
        self.scintillation_index
    }

    pub fn path_loss_db(&self) -> f64 {
        self.path_loss_db
    }

    pub fn attenuation_db_per_km(&self) -> f64 {
        self.attenuation_db_per_km
    }

    pub fn last_fade(&self) -> f64 {
        self.last_fade
    }

    pub fn fade_history(&self) -> &[f64] {
        &self.fade_history
    }

    /// Uncorrelated log-normal fading sample: I = exp(2X - 2 sigma^2)
    /// with X ~ N(0, sigma^2), normalized so E[I] = 1.
    pub fn generate_fading(&mut self) -> f64 {
        if self.rytov_variance < 1e-6 {
            return 1.0;
        }
        let sigma_chi = self.rytov_variance.sqrt();
        let x = self.rng.gaussian(0.0, sigma_chi);
        let fade = (2.0 * x - 2.0 * self.rytov_variance).exp();
        fade.clamp(0.01, 100.0)
    }

    /// AR(1)-correlated fading sample for a step of `time_step`
    /// seconds: X(t) = rho X(t-1) + sqrt(1 - rho^2) W(t) with
    /// rho = exp(-dt / tau_c). The sample is appended to the history
    /// ring.
    pub fn generate_correlated_fading(&mut self, time_step: f64) -> f64 {
        if self.rytov_variance < 1e-6 {
            return 1.0;
        }

        let rho = (-time_step / self.correlation_time).exp();
        let sigma_chi = self.rytov_variance.sqrt();
        let white = self.rng.gaussian(0.0, sigma_chi);

        // Recover the previous log-amplitude from the stored fade.
        let last_log_amplitude = if self.last_fade > 0.0 {
            self.last_fade.ln() / 2.0 + self.rytov_variance
        } else {
            0.0
        };

        let current = rho * last_log_amplitude + (1.0 - rho * rho).sqrt() * white;
        let fade = (2.0 * current - 2.0 * self.rytov_variance)
            .exp()
            .clamp(0.01, 100.0);

        self.fade_history[self.history_index] = fade;
        self.history_index = (self.history_index + 1) % self.fade_history.len();
        self.last_fade = fade;
        fade
    }

    /// Molecular absorption over the whole path, in dB. Wavelength
    /// band selects the humidity coefficient.
    pub fn atmospheric_absorption_db(&self) -> f64 {
        let lambda_nm = self.wavelength * 1e9;
        let alpha = if (1400.0..=1600.0).contains(&lambda_nm) {
            0.05 + 0.1 * self.humidity
        } else if (700.0..=1000.0).contains(&lambda_nm) {
            0.03 + 0.05 * self.humidity
        } else {
            0.02 + 0.03 * self.humidity
        };
        alpha * self.link_distance / 1000.0
    }

    /// Geometric loss from beam spread past the receiver aperture
    /// (diameter in meters); zero when the beam is narrower.
    pub fn geometric_loss_db(&self, receiver_aperture: f64) -> f64 {
        let beam_radius = self.beam_divergence * self.link_distance;
        let receiver_radius = receiver_aperture / 2.0;
        if beam_radius <= receiver_radius {
            return 0.0;
        }
        20.0 * (beam_radius / receiver_radius).log10()
    }

    /// Applies path loss, attenuation, absorption, fading and AWGN to
    /// one power sample. A positive `time_step` selects temporally
    /// correlated fading.
    pub fn apply_effects(
        &mut self,
        input_power: f64,
        noise_power: f64,
        time_step: f64,
    ) -> Result<f64> {
        if input_power < 0.0 {
            error!("invalid input power {:.2e} W", input_power);
            return Err(FsoError::InvalidParam(format!(
                "input power {} must be non-negative",
                input_power
            )));
        }

        let fade = if time_step > 0.0 {
            self.generate_correlated_fading(time_step)
        } else {
            self.generate_fading()
        };

        let mut total_loss_db = self.path_loss_db;
        total_loss_db += self.attenuation_db_per_km * self.link_distance / 1000.0;
        total_loss_db += self.atmospheric_absorption_db();

        let mut received = input_power * fade / db_to_linear(total_loss_db);

        if noise_power > 0.0 {
            received += self.rng.gaussian(0.0, noise_power.sqrt());
            received = received.max(0.0);
        }

        Ok(received)
    }

    /// Weather attenuation in dB/km for the current parameters.
    fn calculate_attenuation(&self) -> f64 {
        match self.weather {
            Weather::Clear | Weather::HighTurbulence => clear_air_attenuation(),
            Weather::Fog => fog_attenuation(self.visibility, self.wavelength),
            Weather::Rain => rain_attenuation(self.rainfall_rate) + clear_air_attenuation(),
            Weather::Snow => snow_attenuation(self.snowfall_rate) + clear_air_attenuation(),
        }
    }
}

impl std::fmt::Display for ChannelModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Channel model:\n  distance: {:.1} m\n  wavelength: {:.0} nm\n  weather: {}\n  \
             Cn2: {:.2e} m^(-2/3)\n  Rytov variance: {:.4}\n  scintillation index: {:.4}\n  \
             path loss: {:.2} dB\n  attenuation: {:.2} dB/km\n  temperature: {:.1} C\n  \
             humidity: {:.0}%",
            self.link_distance,
            self.wavelength * 1e9,
            self.weather.name(),
            self.cn2,
            self.rytov_variance,
            self.scintillation_index,
            self.path_loss_db,
            self.attenuation_db_per_km,
            self.temperature,
            self.humidity * 100.0
        )
    }
}

fn validate_params(distance: f64, wavelength: f64, cn2: f64) -> Result<()> {
    if !(MIN_DISTANCE..=MAX_DISTANCE).contains(&distance) {
        error!(
            "invalid distance {:.2} m (valid range {:.0} - {:.0} m)",
            distance, MIN_DISTANCE, MAX_DISTANCE
        );
        return Err(FsoError::InvalidParam(format!(
            "distance {} outside [{}, {}] m",
            distance, MIN_DISTANCE, MAX_DISTANCE
        )));
    }
    if !(MIN_WAVELENGTH..=MAX_WAVELENGTH).contains(&wavelength) {
        error!(
            "invalid wavelength {:.2e} m (valid range {:.2e} - {:.2e} m)",
            wavelength, MIN_WAVELENGTH, MAX_WAVELENGTH
        );
        return Err(FsoError::InvalidParam(format!(
            "wavelength {} outside [{:e}, {:e}] m",
            wavelength, MIN_WAVELENGTH, MAX_WAVELENGTH
        )));
    }
    if !(MIN_CN2..=MAX_CN2).contains(&cn2) {
        error!(
            "invalid cn2 {:.2e} (valid range {:.2e} - {:.2e})",
            cn2, MIN_CN2, MAX_CN2
        );
        return Err(FsoError::InvalidParam(format!(
            "cn2 {} outside [{:e}, {:e}]",
            cn2, MIN_CN2, MAX_CN2
        )));
    }
    Ok(())
}

/// Rytov variance sigma_chi^2 = 0.5 C_n^2 k^(7/6) L^(11/6), k = 2 pi / lambda.
pub fn calculate_rytov_variance(cn2: f64, wavelength: f64, distance: f64) -> f64 {
    let k = 2.0 * PI / wavelength;
    0.5 * cn2 * k.powf(7.0 / 6.0) * distance.powf(11.0 / 6.0)
}

/// Scintillation index: 4 sigma^2 in the weak regime, exp(4 sigma^2) - 1
/// above it, saturating at 10.
pub fn calculate_scintillation_index(rytov_variance: f64) -> f64 {
    if rytov_variance < 0.3 {
        return 4.0 * rytov_variance;
    }
    ((4.0 * rytov_variance).exp() - 1.0).min(10.0)
}

/// Free-space path loss in dB: 20 log10(4 pi d / lambda).
pub fn calculate_path_loss(distance: f64, wavelength: f64) -> f64 {
    20.0 * (4.0 * PI * distance / wavelength).log10()
}

/// Kim model: alpha = 3.91/V_km * (lambda_nm / 550)^(-1.3), dB/km.
fn fog_attenuation(visibility: f64, wavelength: f64) -> f64 {
    let v_km = (visibility / 1000.0).max(0.01);
    let lambda_nm = wavelength * 1e9;
    (3.91 / v_km) * (lambda_nm / 550.0).powf(-1.3)
}

/// Carbonneau model: alpha = 1.076 R^0.67, dB/km.
fn rain_attenuation(rainfall_rate: f64) -> f64 {
    if rainfall_rate <= 0.0 {
        return 0.0;
    }
    1.076 * rainfall_rate.powf(0.67)
}

/// Empirical snow model: alpha = 1.023 S^0.72, dB/km.
fn snow_attenuation(snowfall_rate: f64) -> f64 {
    if snowfall_rate <= 0.0 {
        return 0.0;
    }
    1.023 * snowfall_rate.powf(0.72)
}

fn clear_air_attenuation() -> f64 {
    0.1
}
