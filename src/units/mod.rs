//! The unit abstraction and the primitive library.
//!
//! A unit is a handle to one or more nodes in a [`Context`]'s graph. Every
//! primitive and every composite implements [`Unit`], so they connect to each
//! other the same way:
//!
//! ```ignore
//! let mut ctx = Context::new(ContextConfig::default())?;
//! let input = ExternalInput::new(&mut ctx);
//! let abs = Abs::new(&mut ctx);
//! let lp = Filter::lowpass(&mut ctx, 20.0)?;
//!
//! chain(&mut ctx, &[&input, &abs, &lp])?;
//! ```
//!
//! Units do not borrow the context; every operation that touches the graph
//! takes it explicitly.

use tracing::{debug, warn};

use crate::{
    context::Context,
    error::UnitError,
    graph::{
        message::{ControlMessage, ControlSink},
        node::{Kernel, NodeId, Port},
    },
};

/// Implement [`Unit`] for primitives that keep their node in a `handle` field.
macro_rules! primitive_unit {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::units::Unit for $ty {
            fn name(&self) -> &'static str {
                self.handle.name()
            }

            fn input(
                &self,
                index: usize,
            ) -> Result<$crate::graph::Port, $crate::error::UnitError> {
                self.handle.port(index)
            }

            fn output(
                &self,
                index: usize,
            ) -> Result<$crate::graph::NodeId, $crate::error::UnitError> {
                self.handle.output(index)
            }

            fn is_disposed(&self) -> bool {
                self.handle.is_released()
            }

            fn dispose(&mut self, ctx: &mut $crate::context::Context) {
                self.handle.release(ctx)
            }
        }
    )+};
}

pub(crate) use primitive_unit;

/// Absolute value.
pub mod abs;
/// Boundary source fed by the host driver.
pub mod external;
/// Static lookup-table mapping.
pub mod curve_map;
/// One-pole filter with a cutoff input.
pub mod filter;
/// Scaled summing node.
pub mod gain;
/// Sign inversion.
pub mod negate;
/// N-way gated switch.
pub mod selector;
/// Constant, settable source.
pub mod signal;
/// Binary comparators.
pub mod threshold;

pub use abs::Abs;
pub use curve_map::CurveMap;
pub use external::ExternalInput;
pub use filter::Filter;
pub use gain::Gain;
pub use negate::Negate;
pub use selector::Selector;
pub use signal::Signal;
pub use threshold::{GreaterThan, Threshold};

/// Core trait for every node in a unit graph, primitive or composite.
pub trait Unit {
    fn name(&self) -> &'static str;

    /// Input port `index`. Fails once the unit is disposed.
    fn input(&self, index: usize) -> Result<Port, UnitError>;

    /// Node behind output `index`. Fails once the unit is disposed.
    fn output(&self, index: usize) -> Result<NodeId, UnitError>;

    fn is_disposed(&self) -> bool;

    /// Sever every connection and release every node this unit owns.
    ///
    /// Safe to call more than once; later calls do nothing.
    fn dispose(&mut self, ctx: &mut Context);

    /// Connect output 0 to `target`'s input 0.
    fn connect(&self, ctx: &mut Context, target: &dyn Unit) -> Result<(), UnitError> {
        self.connect_at(ctx, target, 0, 0)
    }

    /// Connect output `output` to input `input` of `target`.
    fn connect_at(
        &self,
        ctx: &mut Context,
        target: &dyn Unit,
        output: usize,
        input: usize,
    ) -> Result<(), UnitError> {
        let from = self.output(output)?;
        let to = target.input(input)?;
        ctx.graph_mut().connect(from, to)
    }

    /// Connect output 0 to a sub-port such as [`Filter::cutoff`] or
    /// [`Selector::gate`].
    fn connect_port(&self, ctx: &mut Context, port: Port) -> Result<(), UnitError> {
        let from = self.output(0)?;
        ctx.graph_mut().connect(from, port)
    }

    /// Remove every connection leaving this unit's output.
    ///
    /// Composites expose a dedicated output node that carries only outside
    /// connections, so this never cuts their internal wiring.
    fn disconnect(&self, ctx: &mut Context) -> Result<(), UnitError> {
        let from = self.output(0)?;
        ctx.graph_mut().disconnect(from);
        Ok(())
    }
}

/// Connect each unit to the next one, in order.
pub fn chain(ctx: &mut Context, units: &[&dyn Unit]) -> Result<(), UnitError> {
    for pair in units.windows(2) {
        pair[0].connect(ctx, pair[1])?;
    }
    Ok(())
}

/// A single arena node owned by a primitive unit.
///
/// Taking the id out on release is what makes disposal idempotent and turns
/// every later use into a [`UnitError::Disposed`].
#[derive(Debug)]
pub(crate) struct Handle {
    name: &'static str,
    node: Option<NodeId>,
}

impl Handle {
    pub fn new(ctx: &mut Context, kernel: Kernel) -> Self {
        let name = kernel.name();
        let node = ctx.graph_mut().add(kernel);
        debug!(unit = name, %node, "created unit");

        Self {
            name,
            node: Some(node),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> Result<NodeId, UnitError> {
        self.node.ok_or(UnitError::Disposed(self.name))
    }

    pub fn port(&self, index: usize) -> Result<Port, UnitError> {
        Ok(Port {
            node: self.id()?,
            index,
        })
    }

    pub fn output(&self, index: usize) -> Result<NodeId, UnitError> {
        if index != 0 {
            return Err(UnitError::NoSuchOutput {
                unit: self.name,
                index,
            });
        }
        self.id()
    }

    /// Queue a change for this node, applied at the next block.
    pub fn send(
        &self,
        control: &mut impl ControlSink,
        message: impl FnOnce(NodeId) -> ControlMessage,
    ) -> Result<(), UnitError> {
        let node = self.id()?;
        control.push(message(node))
    }

    pub fn is_released(&self) -> bool {
        self.node.is_none()
    }

    pub fn release(&mut self, ctx: &mut Context) {
        let Some(node) = self.node else {
            return;
        };
        if !ctx.graph().owns(node) {
            warn!(unit = self.name, %node, "dispose called with another context, ignored");
            return;
        }

        self.node = None;
        ctx.graph_mut().remove(node);
        debug!(unit = self.name, %node, "disposed unit");
    }
}
