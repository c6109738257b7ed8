use std::fmt;

use crate::{
    dsp::{CurveSampling, CurveTable, OnePole},
    graph::message::ControlMessage,
    MAX_BLOCK_SIZE,
};

/// Most candidate inputs a single selector may switch between.
pub const MAX_SELECTOR_INPUTS: usize = 16;

/// Most input ports any node kernel exposes (a full selector plus its gate).
pub const MAX_PORTS: usize = MAX_SELECTOR_INPUTS + 1;

/// Generational handle to a node in a [`Graph`](crate::graph::Graph) arena.
///
/// Removing a node bumps the slot's generation, so an old id can never reach
/// whatever node later reuses the slot. `context` names the graph that issued
/// the id; no other graph accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    pub(crate) context: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}v{}", self.index, self.generation)
    }
}

/// An input attachment point: port `index` of `node`.
///
/// Port 0 is always the main input. Sub-ports (a filter's cutoff, a
/// selector's gate) are reached through accessors on the owning unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port {
    pub(crate) node: NodeId,
    pub(crate) index: usize,
}

impl Port {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Context passed to node kernels during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Render time in seconds at the start of the current block
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            time: 0.0,
        }
    }
}

/// Per-sample behavior of a primitive.
///
/// Every input port holds the sum of everything connected to it for the
/// current sample (0.0 when nothing is connected).
#[derive(Debug, Clone)]
pub(crate) enum Kernel {
    /// Scaled sum of the main input. Composites use unity gains as their
    /// input/output nodes and as summing points.
    Gain { gain: f32 },
    Signal { value: f32 },
    Abs,
    Negate,
    Threshold { level: f32 },
    GreaterThan { level: f32 },
    /// Ports `0..inputs` are candidates, port `inputs` is the gate.
    Selector { inputs: usize, gate: f32 },
    CurveMap { table: CurveTable, sampling: CurveSampling },
    /// Port 0 is audio, port 1 is added onto `cutoff` (Hz).
    Filter { filter: OnePole, cutoff: f32 },
    /// Host-provided block of samples, no inputs.
    External { buffer: Vec<f32> },
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Gain { .. } => "Gain",
            Kernel::Signal { .. } => "Signal",
            Kernel::Abs => "Abs",
            Kernel::Negate => "Negate",
            Kernel::Threshold { .. } => "Threshold",
            Kernel::GreaterThan { .. } => "GreaterThan",
            Kernel::Selector { .. } => "Selector",
            Kernel::CurveMap { .. } => "CurveMap",
            Kernel::Filter { .. } => "Filter",
            Kernel::External { .. } => "ExternalInput",
        }
    }

    pub fn port_count(&self) -> usize {
        match self {
            Kernel::Selector { inputs, .. } => inputs + 1,
            Kernel::Filter { .. } => 2,
            Kernel::External { .. } => 0,
            _ => 1,
        }
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, Kernel::Filter { .. })
    }

    #[inline]
    pub fn tick(&mut self, inputs: &[f32], frame: usize, ctx: &RenderCtx) -> f32 {
        let x = inputs.first().copied().unwrap_or(0.0);

        match self {
            Kernel::Gain { gain } => x * *gain,
            Kernel::Signal { value } => *value,
            Kernel::Abs => x.abs(),
            Kernel::Negate => -x,
            Kernel::Threshold { level } => {
                if x >= *level {
                    1.0
                } else {
                    0.0
                }
            }
            Kernel::GreaterThan { level } => {
                if x > *level {
                    1.0
                } else {
                    0.0
                }
            }
            Kernel::Selector { inputs: count, gate } => {
                let selection = *gate + inputs.get(*count).copied().unwrap_or(0.0);
                inputs
                    .get(selected_index(selection, *count))
                    .copied()
                    .unwrap_or(0.0)
            }
            Kernel::CurveMap { table, sampling } => table.sample(x, *sampling),
            Kernel::Filter { filter, cutoff } => {
                let modulation = inputs.get(1).copied().unwrap_or(0.0);
                filter.next_sample(x, *cutoff + modulation, ctx.sample_rate)
            }
            Kernel::External { buffer } => buffer.get(frame).copied().unwrap_or(0.0),
        }
    }

    /// Apply a queued control change. Returns false when the message does not
    /// address this kind of kernel.
    pub fn apply(&mut self, message: ControlMessage) -> bool {
        match (self, message) {
            (Kernel::Signal { value }, ControlMessage::SetValue { value: v, .. }) => {
                *value = v;
            }
            (Kernel::Gain { gain }, ControlMessage::SetGain { gain: g, .. }) => {
                *gain = g;
            }
            (
                Kernel::Threshold { level } | Kernel::GreaterThan { level },
                ControlMessage::SetLevel { level: l, .. },
            ) => {
                *level = l;
            }
            (Kernel::Selector { gate, .. }, ControlMessage::SetGate { gate: g, .. }) => {
                *gate = g;
            }
            (Kernel::CurveMap { table, .. }, ControlMessage::SetCurve { table: t, .. }) => {
                // The previous table is dropped here; it is shared, so the
                // control side usually still holds it.
                *table = t;
            }
            (Kernel::Filter { cutoff, .. }, ControlMessage::SetCutoff { cutoff: c, .. }) => {
                *cutoff = c;
            }
            _ => return false,
        }
        true
    }
}

/// Map a gate value to a candidate index.
///
/// Rounds to the nearest integer and clamps into `0..count`; NaN selects 0.
#[inline]
pub(crate) fn selected_index(gate: f32, count: usize) -> usize {
    if gate.is_nan() || gate <= 0.0 {
        return 0;
    }
    (gate.round() as usize).min(count.saturating_sub(1))
}

/// A kernel plus its rendered output for the current block.
#[derive(Debug)]
pub(crate) struct Node {
    pub kernel: Kernel,
    pub output: Vec<f32>,
    /// Last sample of the previous block, read by feedback edges at frame 0.
    pub last: f32,
}

impl Node {
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            output: vec![0.0; MAX_BLOCK_SIZE],
            last: 0.0,
        }
    }
}
