//! Telemetry metrics used throughout FsoLink.
//!
//! Currently exported metrics:
//! - `fec_frames_encoded_total`: Number of frames run through a FEC encoder.
//! - `fec_frames_decoded_total`: Number of frames run through a FEC decoder.
//! - `rs_symbols_corrected_total`: Reed-Solomon symbols corrected.
//! - `rs_uncorrectable_total`: Reed-Solomon blocks flagged uncorrectable.
//! - `ldpc_iterations_total`: Belief-propagation iterations executed.
//! - `ldpc_nonconverged_total`: LDPC decodes that exhausted the iteration budget.
//! - `tracker_scans_total`: Full angular scans performed by the beam tracker.
//! - `tracker_reacquisitions_total`: Reacquisition procedures started.
//! - `tracker_misalignment_total`: Misalignment transitions detected.
//! - `tracker_converged`: 1 while the beam tracker reports convergence.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_gauge, Encoder, IntCounter, IntGauge, TextEncoder};

lazy_static! {
    pub static ref FEC_FRAMES_ENCODED: IntCounter = register_int_counter!(
        "fec_frames_encoded_total",
        "Frames run through a FEC encoder"
    )
    .unwrap();
    pub static ref FEC_FRAMES_DECODED: IntCounter = register_int_counter!(
        "fec_frames_decoded_total",
        "Frames run through a FEC decoder"
    )
    .unwrap();
    pub static ref RS_SYMBOLS_CORRECTED: IntCounter = register_int_counter!(
        "rs_symbols_corrected_total",
        "Reed-Solomon symbols corrected"
    )
    .unwrap();
    pub static ref RS_UNCORRECTABLE: IntCounter = register_int_counter!(
        "rs_uncorrectable_total",
        "Reed-Solomon blocks flagged uncorrectable"
    )
    .unwrap();
    pub static ref LDPC_ITERATIONS: IntCounter = register_int_counter!(
        "ldpc_iterations_total",
        "Belief-propagation iterations executed"
    )
    .unwrap();
    pub static ref LDPC_NONCONVERGED: IntCounter = register_int_counter!(
        "ldpc_nonconverged_total",
        "LDPC decodes that exhausted the iteration budget"
    )
    .unwrap();
    pub static ref TRACKER_SCANS: IntCounter =
        register_int_counter!("tracker_scans_total", "Full angular scans performed").unwrap();
    pub static ref TRACKER_REACQUISITIONS: IntCounter = register_int_counter!(
        "tracker_reacquisitions_total",
        "Reacquisition procedures started"
    )
    .unwrap();
    pub static ref TRACKER_MISALIGNMENT: IntCounter = register_int_counter!(
        "tracker_misalignment_total",
        "Misalignment transitions detected"
    )
    .unwrap();
    pub static ref TRACKER_CONVERGED: IntGauge =
        register_int_gauge!("tracker_converged", "Beam tracker convergence state").unwrap();
}

/// Renders the metric registry into the log at info level.
pub fn flush() {
    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = Vec::new();
    if encoder.encode(&metrics, &mut buf).is_ok() {
        log::info!("\n{}", String::from_utf8_lossy(&buf));
    }
}
