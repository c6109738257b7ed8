use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Curve Tables
============

A curve table is a static function stored as samples. The input signal is
read as a position on the table's domain and the stored value at that
position comes out.

    domain   [-1.0 ........ 0.0 ........ +1.0]
    index    [ 0   ........ N/2 ........ N-1 ]

    position = (x + 1) / 2 · (N - 1)

Inputs outside [-1, 1] are clamped to the ends of the table.

Sampling
--------

  Nearest   Use the entry closest to `position`. Exact halfway points go to
            the LOWER index, so x = 0 on a 1024 table reads entry 511.
            Step-shaped tables (like a two-valued switch) stay crisp.

  Linear    Blend the two neighbouring entries. Smooth for continuous
            shapes, but a two-valued table turns into a ramp around its
            split.

Tables are immutable. Changing a curve means building a new table and
swapping the whole thing in, so a reader never sees half of an update.
*/

/// Length of tables built by the composite units.
pub const CURVE_LENGTH: usize = 1024;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveSampling {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveTable {
    values: Arc<[f32]>,
}

impl CurveTable {
    /// Build a table by evaluating `f` at `len` evenly spaced points of [-1, 1].
    ///
    /// `len` is raised to 2 so both ends of the domain exist.
    pub fn from_fn(len: usize, mut f: impl FnMut(f32) -> f32) -> Self {
        let len = len.max(2);
        let last = (len - 1) as f32;
        let values: Vec<f32> = (0..len)
            .map(|i| f((i as f32 / last) * 2.0 - 1.0))
            .collect();

        Self {
            values: values.into(),
        }
    }

    /// Two-valued table: `below` where the normalized domain is negative,
    /// `above` from zero upwards.
    pub fn split(len: usize, below: f32, above: f32) -> Self {
        Self::from_fn(len, |x| if x < 0.0 { below } else { above })
    }

    /// Identity mapping, handy as a neutral curve.
    pub fn linear(len: usize) -> Self {
        Self::from_fn(len, |x| x)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    fn position(&self, x: f32) -> f32 {
        let x = if x.is_nan() { 0.0 } else { x.clamp(-1.0, 1.0) };
        (x + 1.0) * 0.5 * (self.values.len() - 1) as f32
    }

    #[inline]
    pub fn sample(&self, x: f32, sampling: CurveSampling) -> f32 {
        let pos = self.position(x);
        let last = self.values.len() - 1;

        match sampling {
            CurveSampling::Nearest => {
                // Round half down
                let index = ((pos - 0.5).ceil().max(0.0) as usize).min(last);
                self.values[index]
            }
            CurveSampling::Linear => {
                let lower = (pos.floor() as usize).min(last);
                let upper = (lower + 1).min(last);
                let frac = pos - lower as f32;
                self.values[lower] + (self.values[upper] - self.values[lower]) * frac
            }
        }
    }
}

impl From<Vec<f32>> for CurveTable {
    fn from(mut values: Vec<f32>) -> Self {
        // A single entry behaves like a constant
        if values.len() < 2 {
            let v = values.first().copied().unwrap_or(0.0);
            values = vec![v, v];
        }
        Self {
            values: values.into(),
        }
    }
}
