use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
One-Pole Filter (TPT)
=====================

A single integrator with one feedback path. It is the smallest filter that
still "remembers" the past, which is what makes it useful as a smoother:
every sample the output moves a fixed fraction of the way towards the input.

  y[n] = y[n-1] + G · (x[n] - y[n-1])     (roughly; see below)

Cutoff and Time Constant
------------------------

A one-pole low-pass with cutoff fc settles with time constant

    τ = 1 / (2π · fc)      ⇔      fc = 1 / (2π · τ)

After τ seconds a step input has covered ~63% of the way, after 3τ ~95%.
That relation is how envelope followers turn "attack in seconds" into a
filter cutoff.

  fc = 0 Hz      frozen: the output holds its current value
  fc = 15.9 Hz   τ = 10 ms
  fc = 1.59 Hz   τ = 100 ms

Why TPT?
--------

The topology-preserving transform (trapezoidal integration with prewarped
cutoff) keeps the filter stable and accurate even when the cutoff is swept
every sample, which is exactly how the graph drives it: the cutoff is an
input port, not a constant.

    g = tan(π · fc / fs)
    G = g / (1 + g)
    v = (x - s) · G
    lp = v + s
    s  = lp + v
    hp = x - lp
*/

/// Ceiling for the cutoff, as a fraction of the sample rate.
/// `tan(π · fc / fs)` diverges at Nyquist.
pub const MAX_CUTOFF_RATIO: f32 = 0.49;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
}

/// Convert a time constant in seconds to the matching one-pole cutoff in Hz.
#[inline]
pub fn time_to_cutoff(seconds: f32) -> f32 {
    1.0 / (2.0 * PI * seconds)
}

#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32, // integrator memory
    filter_type: FilterType,

    // Coefficient cache, recomputed only when the cutoff moves
    cached_cutoff: f32,
    cached_rate: f32,
    gain: f32,
}

impl OnePole {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            state: 0.0,
            filter_type,
            cached_cutoff: 0.0,
            cached_rate: 0.0,
            gain: 0.0,
        }
    }

    pub fn lowpass() -> Self {
        Self::new(FilterType::LowPass)
    }

    pub fn highpass() -> Self {
        Self::new(FilterType::HighPass)
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    #[inline]
    fn update_gain(&mut self, cutoff_hz: f32, sample_rate: f32) {
        if cutoff_hz == self.cached_cutoff && sample_rate == self.cached_rate {
            return;
        }

        let fc = if cutoff_hz.is_nan() {
            0.0
        } else {
            cutoff_hz.clamp(0.0, sample_rate * MAX_CUTOFF_RATIO)
        };
        let g = (PI * fc / sample_rate).tan();

        self.gain = g / (1.0 + g);
        self.cached_cutoff = cutoff_hz;
        self.cached_rate = sample_rate;
    }

    /// Process one sample with the cutoff in effect for that sample.
    ///
    /// The cutoff is clamped to `[0, MAX_CUTOFF_RATIO · sample_rate]`; NaN is
    /// treated as 0 (frozen).
    #[inline]
    pub fn next_sample(&mut self, sample: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        self.update_gain(cutoff_hz, sample_rate);

        let v = (sample - self.state) * self.gain;
        let lowpass = v + self.state;
        self.state = lowpass + v;

        match self.filter_type {
            FilterType::LowPass => lowpass,
            FilterType::HighPass => sample - lowpass,
        }
    }

    /// Process a block in place with a fixed cutoff.
    pub fn render(&mut self, buffer: &mut [f32], cutoff_hz: f32, sample_rate: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, cutoff_hz, sample_rate);
        }
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}
