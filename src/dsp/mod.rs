//! Low-level DSP primitives used by the graph node kernels.
//!
//! These components are allocation-free on the render path and realtime-safe.
//! They stay focused on the signal-processing math so the graph layer can
//! handle wiring, scheduling and parameter changes.

/// Lookup tables mapping [-1, 1] to arbitrary values.
pub mod curve;
/// One-pole TPT filter with a per-sample cutoff.
pub mod filter;

pub use curve::{CurveSampling, CurveTable, CURVE_LENGTH};
pub use filter::{time_to_cutoff, FilterType, OnePole};
