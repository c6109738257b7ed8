use tracing::{debug, warn};

use crate::{
    context::Context,
    error::{finite, UnitError},
    graph::{
        message::ControlSink,
        node::{NodeId, Port},
    },
    units::{Gain, GreaterThan, Selector, Signal, Unit},
};

/*
Max / Min
=========

Clamp a signal against a held constant, one sample at a time. The constant is
not a running maximum; it stays put until `set_max` / `set_min` changes it.

    Max(c):  output = x  if x > c  else c
    Min(c):  output = c  if x > c  else x

Both are a comparator driving a 2-way selector:

                  ┌──────────────────┐
    input ──┬────→│ GreaterThan(c)   │──→ gate
            │     └──────────────────┘      │
            │                               ↓
            ├────→ candidate A ──→ ┌──────────┐
    Signal(c) ──→ candidate B ──→ │ Selector │──→ output
                                   └──────────┘

    Max: port 0 = Signal(c), port 1 = input
    Min: port 0 = input,     port 1 = Signal(c)

Gate 1 (x > c) selects port 1. At x == c both sides are equal anyway.

Changing the constant updates the held signal and the comparator level
together; both land at the next block. The two changes are queued only when
the control channel has room for both, so a full channel leaves the clamp
exactly as it was.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Upper,
    Lower,
}

#[derive(Debug)]
struct ClampNodes {
    input: Gain,
    output: Gain,
    held: Signal,
    selector: Selector,
    comparator: GreaterThan,
}

impl ClampNodes {
    fn build(ctx: &mut Context, value: f32, bound: Bound) -> Result<Self, UnitError> {
        let value = finite("clamp value", value)?;

        // Everything is validated above; nothing below can fail half way.
        let input = Gain::unity(ctx);
        let output = Gain::unity(ctx);
        let held = Signal::unchecked(ctx, value);
        let selector = Selector::unchecked(ctx, 2);
        let comparator = GreaterThan::unchecked(ctx, value);

        let mut nodes = ClampNodes {
            input,
            output,
            held,
            selector,
            comparator,
        };

        if let Err(err) = nodes.wire(ctx, bound) {
            nodes.dispose(ctx);
            return Err(err);
        }
        Ok(nodes)
    }

    fn wire(&self, ctx: &mut Context, bound: Bound) -> Result<(), UnitError> {
        let (when_low, when_high): (&dyn Unit, &dyn Unit) = match bound {
            Bound::Upper => (&self.held, &self.input),
            Bound::Lower => (&self.input, &self.held),
        };
        when_low.connect_at(ctx, &self.selector, 0, 0)?;
        when_high.connect_at(ctx, &self.selector, 0, 1)?;

        self.input.connect(ctx, &self.comparator)?;
        self.comparator.connect_port(ctx, self.selector.gate()?)?;
        self.selector.connect(ctx, &self.output)
    }

    fn set(&mut self, control: &mut impl ControlSink, value: f32) -> Result<(), UnitError> {
        let value = finite("clamp value", value)?;
        control.check_capacity(2)?;
        self.held.set_value(control, value)?;
        self.comparator.set_level(control, value)
    }

    fn dispose(&mut self, ctx: &mut Context) {
        let _ = self.output.disconnect(ctx);
        self.input.dispose(ctx);
        self.output.dispose(ctx);
        self.held.dispose(ctx);
        self.selector.dispose(ctx);
        self.comparator.dispose(ctx);
    }
}

/// Shared body of [`Max`] and [`Min`].
#[derive(Debug)]
struct Clamp {
    name: &'static str,
    nodes: Option<ClampNodes>,
}

impl Clamp {
    fn new(
        ctx: &mut Context,
        name: &'static str,
        value: f32,
        bound: Bound,
    ) -> Result<Self, UnitError> {
        let nodes = ClampNodes::build(ctx, value, bound)?;
        debug!(unit = name, value, "created clamp");

        Ok(Self {
            name,
            nodes: Some(nodes),
        })
    }

    fn nodes(&self) -> Result<&ClampNodes, UnitError> {
        self.nodes.as_ref().ok_or(UnitError::Disposed(self.name))
    }

    fn value(&self) -> Option<f32> {
        self.nodes.as_ref().map(|nodes| nodes.held.value())
    }

    fn set(&mut self, control: &mut impl ControlSink, value: f32) -> Result<(), UnitError> {
        let name = self.name;
        self.nodes
            .as_mut()
            .ok_or(UnitError::Disposed(name))?
            .set(control, value)
    }

    fn input(&self, index: usize) -> Result<Port, UnitError> {
        let nodes = self.nodes()?;
        if index != 0 {
            return Err(UnitError::NoSuchInput {
                unit: self.name,
                index,
            });
        }
        nodes.input.input(0)
    }

    fn output(&self, index: usize) -> Result<NodeId, UnitError> {
        let nodes = self.nodes()?;
        if index != 0 {
            return Err(UnitError::NoSuchOutput {
                unit: self.name,
                index,
            });
        }
        nodes.output.output(0)
    }

    fn dispose(&mut self, ctx: &mut Context) {
        let Some(nodes) = self.nodes.as_ref() else {
            return;
        };
        if ctx.is_foreign(&nodes.output) {
            warn!(unit = self.name, "dispose called with a different context");
            return;
        }
        if let Some(mut nodes) = self.nodes.take() {
            nodes.dispose(ctx);
            debug!(unit = self.name, "disposed clamp");
        }
    }
}

/// Greater of the input and a held constant.
#[derive(Debug)]
pub struct Max {
    inner: Clamp,
}

impl Max {
    pub fn new(ctx: &mut Context, max: f32) -> Result<Self, UnitError> {
        Ok(Self {
            inner: Clamp::new(ctx, "Max", max, Bound::Upper)?,
        })
    }

    /// The held constant; `None` once disposed.
    pub fn value(&self) -> Option<f32> {
        self.inner.value()
    }

    /// Takes effect at the next block; topology is untouched.
    /// Either both internal changes are queued or neither is.
    pub fn set_max(&mut self, control: &mut impl ControlSink, max: f32) -> Result<(), UnitError> {
        self.inner.set(control, max)
    }
}

/// Lesser of the input and a held constant.
#[derive(Debug)]
pub struct Min {
    inner: Clamp,
}

impl Min {
    pub fn new(ctx: &mut Context, min: f32) -> Result<Self, UnitError> {
        Ok(Self {
            inner: Clamp::new(ctx, "Min", min, Bound::Lower)?,
        })
    }

    /// The held constant; `None` once disposed.
    pub fn value(&self) -> Option<f32> {
        self.inner.value()
    }

    /// Takes effect at the next block; topology is untouched.
    /// Either both internal changes are queued or neither is.
    pub fn set_min(&mut self, control: &mut impl ControlSink, min: f32) -> Result<(), UnitError> {
        self.inner.set(control, min)
    }
}

macro_rules! clamp_unit {
    ($($ty:ty),+) => {$(
        impl Unit for $ty {
            fn name(&self) -> &'static str {
                self.inner.name
            }

            fn input(&self, index: usize) -> Result<Port, UnitError> {
                self.inner.input(index)
            }

            fn output(&self, index: usize) -> Result<NodeId, UnitError> {
                self.inner.output(index)
            }

            fn is_disposed(&self) -> bool {
                self.inner.nodes.is_none()
            }

            fn dispose(&mut self, ctx: &mut Context) {
                self.inner.dispose(ctx)
            }
        }
    )+};
}

clamp_unit!(Max, Min);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::ContextConfig,
        units::{testing::*, ExternalInput},
    };

    fn patch<U: Unit>(ctx: &mut Context, unit: U) -> (ExternalInput, U) {
        let input = ExternalInput::new(ctx);
        input.connect(ctx, &unit).unwrap();
        (input, unit)
    }

    #[test]
    fn test_max_clamps_from_below() {
        let mut ctx = ctx();
        let max = Max::new(&mut ctx, 5.0).unwrap();
        let (input, max) = patch(&mut ctx, max);

        let out = run(&mut ctx, &input, &max, &[3.0, 7.0, 5.0, -2.0]);
        assert_eq!(out, vec![5.0, 7.0, 5.0, 5.0]);
    }

    #[test]
    fn test_set_max_next_block() {
        let mut ctx = ctx();
        let max = Max::new(&mut ctx, 5.0).unwrap();
        let (input, mut max) = patch(&mut ctx, max);

        max.set_max(&mut ctx, 10.0).unwrap();
        assert_eq!(max.value(), Some(10.0));

        assert_eq!(run(&mut ctx, &input, &max, &[8.0]), vec![10.0]);
        assert_eq!(run(&mut ctx, &input, &max, &[12.0]), vec![12.0]);
    }

    #[test]
    fn test_set_max_is_not_retroactive() {
        let mut ctx = ctx();
        let max = Max::new(&mut ctx, 5.0).unwrap();
        let (input, mut max) = patch(&mut ctx, max);

        assert_eq!(run(&mut ctx, &input, &max, &[1.0, 1.0]), vec![5.0, 5.0]);
        max.set_max(&mut ctx, 0.0).unwrap();
        assert_eq!(ctx.read(&max).unwrap(), &[5.0, 5.0]);
        assert_eq!(run(&mut ctx, &input, &max, &[1.0, -1.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn test_min_clamps_from_above() {
        let mut ctx = ctx();
        let min = Min::new(&mut ctx, 5.0).unwrap();
        let (input, mut min) = patch(&mut ctx, min);

        let out = run(&mut ctx, &input, &min, &[3.0, 7.0, 5.0, -2.0]);
        assert_eq!(out, vec![3.0, 5.0, 5.0, -2.0]);

        min.set_min(&mut ctx, 0.0).unwrap();
        let out = run(&mut ctx, &input, &min, &[3.0, -2.0]);
        assert_eq!(out, vec![0.0, -2.0]);
    }

    #[test]
    fn test_clamps_compose() {
        // Max then Min: a hard clip to [-1, 1]
        let mut ctx = ctx();
        let input = ExternalInput::new(&mut ctx);
        let floor = Max::new(&mut ctx, -1.0).unwrap();
        let ceiling = Min::new(&mut ctx, 1.0).unwrap();
        crate::units::chain(&mut ctx, &[&input, &floor, &ceiling]).unwrap();

        let out = run(&mut ctx, &input, &ceiling, &[-3.0, -0.5, 0.5, 3.0]);
        assert_eq!(out, vec![-1.0, -0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_rejects_non_finite_constant() {
        let mut ctx = ctx();
        assert!(Max::new(&mut ctx, f32::NAN).is_err());
        assert_eq!(ctx.graph().node_count(), 0);

        let mut max = Max::new(&mut ctx, 1.0).unwrap();
        assert!(max.set_max(&mut ctx, f32::INFINITY).is_err());
        assert_eq!(max.value(), Some(1.0));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut ctx = ctx();
        let max = Max::new(&mut ctx, 5.0).unwrap();
        let (input, mut max) = patch(&mut ctx, max);

        max.dispose(&mut ctx);
        max.dispose(&mut ctx);
        assert!(max.is_disposed());
        assert_eq!(max.value(), None);
        assert_eq!(ctx.graph().node_count(), 1);
        assert_eq!(ctx.graph().edge_count(), 0);

        assert_eq!(
            input.connect(&mut ctx, &max).unwrap_err(),
            UnitError::Disposed("Max")
        );
        assert_eq!(
            max.set_max(&mut ctx, 1.0).unwrap_err(),
            UnitError::Disposed("Max")
        );
    }

    #[test]
    fn test_full_queue_leaves_clamp_untouched() {
        let mut ctx = Context::new(ContextConfig {
            sample_rate: SAMPLE_RATE,
            control_capacity: 1,
        })
        .unwrap();
        let max = Max::new(&mut ctx, 5.0).unwrap();
        let (input, mut max) = patch(&mut ctx, max);

        // Room for one change only; the clamp needs two.
        assert_eq!(max.set_max(&mut ctx, 2.0), Err(UnitError::QueueFull));
        assert_eq!(max.value(), Some(5.0));
        assert_eq!(ctx.pending_changes(), 0);

        // Held signal and comparator still agree on 5.
        assert_eq!(run(&mut ctx, &input, &max, &[4.0, 6.0]), vec![5.0, 6.0]);
    }

    #[test]
    fn test_set_min_through_detached_controller() {
        let mut ctx = ctx();
        let min = Min::new(&mut ctx, 5.0).unwrap();
        let (input, mut min) = patch(&mut ctx, min);
        let mut controller = ctx.detach_controller().unwrap();

        assert_eq!(
            min.set_min(&mut ctx, 1.0).unwrap_err(),
            UnitError::ControlDetached
        );
        assert_eq!(min.value(), Some(5.0));

        min.set_min(&mut controller, 1.0).unwrap();
        assert_eq!(run(&mut ctx, &input, &min, &[3.0, 0.5]), vec![1.0, 0.5]);
    }

    #[test]
    fn test_dispose_ignores_other_context() {
        let mut other = ctx();
        let mut ctx = ctx();
        let mut max = Max::new(&mut ctx, 5.0).unwrap();
        let before = ctx.graph().node_count();

        max.dispose(&mut other);
        assert!(!max.is_disposed());
        assert_eq!(ctx.graph().node_count(), before);

        max.dispose(&mut ctx);
        assert!(max.is_disposed());
        assert_eq!(ctx.graph().node_count(), 0);
    }
}
