//! Two-axis PID feedback controller for beam pointing.

use crate::error::{FsoError, Result};
use log::{debug, error};

pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    integral_az: f64,
    integral_el: f64,
    prev_error_az: f64,
    prev_error_el: f64,
    integral_limit: f64,
    update_rate: f64,
    dt: f64,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64, update_rate: f64, integral_limit: f64) -> Result<Self> {
        if update_rate <= 0.0 {
            error!("invalid PID update rate {} Hz", update_rate);
            return Err(FsoError::InvalidParam(format!(
                "PID update rate {} must be positive",
                update_rate
            )));
        }
        debug!(
            "created PID controller: Kp={:.3}, Ki={:.3}, Kd={:.3}, rate={:.1} Hz",
            kp, ki, kd, update_rate
        );
        Ok(PidController {
            kp,
            ki,
            kd,
            integral_az: 0.0,
            integral_el: 0.0,
            prev_error_az: 0.0,
            prev_error_el: 0.0,
            integral_limit,
            update_rate,
            dt: 1.0 / update_rate,
        })
    }

    pub fn update_rate(&self) -> f64 {
        self.update_rate
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn gains(&self) -> (f64, f64, f64) {
        (self.kp, self.ki, self.kd)
    }

    pub fn integral(&self) -> (f64, f64) {
        (self.integral_az, self.integral_el)
    }

    /// Clears the integral and derivative state.
    pub fn reset(&mut self) {
        self.integral_az = 0.0;
        self.integral_el = 0.0;
        self.prev_error_az = 0.0;
        self.prev_error_el = 0.0;
    }

    /// One control step; returns the (azimuth, elevation) outputs.
    pub fn update(&mut self, error_az: f64, error_el: f64) -> (f64, f64) {
        self.integral_az = (self.integral_az + error_az * self.dt)
            .clamp(-self.integral_limit, self.integral_limit);
        self.integral_el = (self.integral_el + error_el * self.dt)
            .clamp(-self.integral_limit, self.integral_limit);

        let derivative_az = (error_az - self.prev_error_az) / self.dt;
        let derivative_el = (error_el - self.prev_error_el) / self.dt;

        let output_az =
            self.kp * error_az + self.ki * self.integral_az + self.kd * derivative_az;
        let output_el =
            self.kp * error_el + self.ki * self.integral_el + self.kd * derivative_el;

        self.prev_error_az = error_az;
        self.prev_error_el = error_el;
        (output_az, output_el)
    }
}
