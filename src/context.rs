//! Processing context: the rendering session every unit lives in.

use rtrb::Consumer;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    error::UnitError,
    graph::{
        message::{control_channel, ControlMessage, ControlSink, Controller, MessageReceiver},
        node::RenderCtx,
        Graph,
    },
    units::Unit,
    MAX_BLOCK_SIZE,
};

/// Settings for a [`Context`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextConfig {
    pub sample_rate: f32,
    /// Parameter changes that may be queued between two blocks.
    pub control_capacity: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            control_capacity: 1024,
        }
    }
}

/// The active rendering session.
///
/// Owns the node arena that every unit points into, the sample rate and the
/// running render time. The host driver calls [`render`](Self::render) once
/// per block; everything else (building units, connecting, changing
/// parameters, disposing) happens between blocks.
///
/// Parameter changes never land mid-block: they are queued and applied just
/// before the first sample of the next block.
///
/// A new context holds both ends of its control queue, so setters can be
/// handed `&mut ctx` directly. When changes should come from another thread,
/// [`detach_controller`](Self::detach_controller) gives the producer end away
/// and the context keeps only the consumer it drains:
///
/// ```ignore
/// let mut controller = ctx.detach_controller().unwrap();
/// std::thread::spawn(move || max.set_max(&mut controller, 0.5));
/// ```
pub struct Context {
    config: ContextConfig,
    render_ctx: RenderCtx,
    graph: Graph,
    controller: Option<Controller>,
    rx: Consumer<ControlMessage>,
}

impl Context {
    pub fn new(config: ContextConfig) -> Result<Self, UnitError> {
        if !config.sample_rate.is_finite() || config.sample_rate <= 0.0 {
            return Err(UnitError::InvalidSampleRate(config.sample_rate));
        }

        debug!(
            sample_rate = config.sample_rate,
            control_capacity = config.control_capacity,
            "created processing context"
        );

        let (controller, rx) = control_channel(config.control_capacity);

        Ok(Self {
            config,
            render_ctx: RenderCtx::new(config.sample_rate),
            graph: Graph::new(),
            controller: Some(controller),
            rx,
        })
    }

    /// Context at `sample_rate` with default settings otherwise.
    pub fn with_sample_rate(sample_rate: f32) -> Result<Self, UnitError> {
        Self::new(ContextConfig {
            sample_rate,
            ..ContextConfig::default()
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f32 {
        self.render_ctx.sample_rate
    }

    /// Seconds rendered so far (start of the next block).
    pub fn current_time(&self) -> f64 {
        self.render_ctx.time
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Live nodes across every unit in this context.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Parameter changes waiting for the next block.
    pub fn pending_changes(&self) -> usize {
        self.rx.slots()
    }

    /// Hand the producer end of the control queue to the caller, typically to
    /// move it to a control thread. Returns `None` if it was already taken;
    /// from then on setters given this context fail with
    /// [`UnitError::ControlDetached`].
    pub fn detach_controller(&mut self) -> Option<Controller> {
        let controller = self.controller.take();
        if controller.is_some() {
            debug!("detached control queue producer");
        }
        controller
    }

    /// Whether `unit` was built in some other context.
    pub(crate) fn is_foreign(&self, unit: &dyn Unit) -> bool {
        unit.output(0)
            .map(|node| !self.graph.owns(node))
            .unwrap_or(false)
    }

    /// Rebuild the evaluation schedule now instead of at the next block.
    pub fn compile(&mut self) -> Result<(), UnitError> {
        self.graph.compile()
    }

    fn apply_pending(&mut self) {
        while let Some(message) = MessageReceiver::pop(&mut self.rx) {
            let node = message.node();
            if self.graph.apply(message) {
                trace!(%node, "applied control change");
            } else if self.graph.contains(node) {
                warn!(%node, "control change does not match node kind, discarded");
            } else {
                trace!(%node, "control change for removed node discarded");
            }
        }
    }

    /// Render one block of `frames` samples.
    ///
    /// Queued parameter changes are applied first, then the schedule is
    /// recompiled if the topology changed, then every node runs once per
    /// sample in topological order.
    pub fn render(&mut self, frames: usize) -> Result<(), UnitError> {
        if frames > MAX_BLOCK_SIZE {
            return Err(UnitError::BlockTooLarge {
                frames,
                max: MAX_BLOCK_SIZE,
            });
        }

        self.apply_pending();
        if self.graph.is_dirty() {
            self.graph.compile()?;
        }

        self.graph.process(frames, &self.render_ctx);
        self.render_ctx.time += frames as f64 / self.render_ctx.sample_rate as f64;
        Ok(())
    }

    /// The block most recently rendered at `unit`'s main output.
    pub fn read(&self, unit: &dyn Unit) -> Result<&[f32], UnitError> {
        let node = unit.output(0)?;
        self.graph.output(node)
    }
}

impl ControlSink for Context {
    fn push(&mut self, message: ControlMessage) -> Result<(), UnitError> {
        self.controller
            .as_mut()
            .ok_or(UnitError::ControlDetached)?
            .push(message)
    }

    fn check_capacity(&self, count: usize) -> Result<(), UnitError> {
        self.controller
            .as_ref()
            .ok_or(UnitError::ControlDetached)?
            .check_capacity(count)
    }
}
