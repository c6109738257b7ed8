use crate::{
    context::Context,
    error::UnitError,
    graph::{
        message::{ControlMessage, ControlSink},
        node::{Kernel, Port, MAX_SELECTOR_INPUTS},
    },
    units::{primitive_unit, Handle},
};

/*
Selector
========

An N-way switch. Inputs 0..N are candidates; one extra port, the gate,
decides which candidate reaches the output.

    candidate 0 ──┐
    candidate 1 ──┤
        ...       ├──→ output
    candidate N-1─┘
                  ↑
    gate ─────────┘   index = round(base + gate input)

The base gate value is 0, so before anything drives the gate the selector
passes candidate 0. At render time the index is clamped into 0..N (a gate of
7 on a 2-way selector picks candidate 1, a negative gate picks candidate 0).
Choosing an index explicitly with `select` is validated instead.
*/

#[derive(Debug)]
pub struct Selector {
    handle: Handle,
    inputs: usize,
    selected: usize,
}

impl Selector {
    pub fn new(ctx: &mut Context, inputs: usize) -> Result<Self, UnitError> {
        if inputs == 0 || inputs > MAX_SELECTOR_INPUTS {
            return Err(UnitError::SelectorSize {
                got: inputs,
                max: MAX_SELECTOR_INPUTS,
            });
        }

        Ok(Self::unchecked(ctx, inputs))
    }

    /// `inputs` must already be within `1..=MAX_SELECTOR_INPUTS`.
    pub(crate) fn unchecked(ctx: &mut Context, inputs: usize) -> Self {
        Self {
            handle: Handle::new(ctx, Kernel::Selector { inputs, gate: 0.0 }),
            inputs,
            selected: 0,
        }
    }

    /// Number of candidate inputs.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Candidate picked by the base gate value (before gate modulation).
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// The gate port; connected signals are added to the base selection.
    pub fn gate(&self) -> Result<Port, UnitError> {
        self.handle.port(self.inputs)
    }

    /// Set the base selection. Takes effect at the next block.
    pub fn select(
        &mut self,
        control: &mut impl ControlSink,
        index: usize,
    ) -> Result<(), UnitError> {
        if index >= self.inputs {
            return Err(UnitError::invalid(
                "selector index",
                index as f32,
                "must be below the number of inputs",
            ));
        }

        let gate = index as f32;
        self.handle
            .send(control, |node| ControlMessage::SetGate { node, gate })?;
        self.selected = index;
        Ok(())
    }
}

primitive_unit!(Selector);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{testing::*, ExternalInput, Signal, Unit};

    fn three_way(ctx: &mut Context) -> (Selector, [Signal; 3]) {
        let selector = Selector::new(ctx, 3).unwrap();
        let sources = [
            Signal::new(ctx, 10.0).unwrap(),
            Signal::new(ctx, 20.0).unwrap(),
            Signal::new(ctx, 30.0).unwrap(),
        ];
        for (i, source) in sources.iter().enumerate() {
            source.connect_at(ctx, &selector, 0, i).unwrap();
        }
        (selector, sources)
    }

    #[test]
    fn test_defaults_to_first_input() {
        let mut ctx = ctx();
        let (selector, _sources) = three_way(&mut ctx);

        ctx.render(4).unwrap();
        assert_eq!(ctx.read(&selector).unwrap(), &[10.0; 4]);
        assert_eq!(selector.selected(), 0);
    }

    #[test]
    fn test_select_routes_input() {
        let mut ctx = ctx();
        let (mut selector, _sources) = three_way(&mut ctx);

        selector.select(&mut ctx, 2).unwrap();
        ctx.render(2).unwrap();
        assert_eq!(ctx.read(&selector).unwrap(), &[30.0; 2]);
    }

    #[test]
    fn test_gate_input_drives_selection() {
        let mut ctx = ctx();
        let (selector, _sources) = three_way(&mut ctx);
        let gate = ExternalInput::new(&mut ctx);
        gate.connect_port(&mut ctx, selector.gate().unwrap()).unwrap();

        let out = run(&mut ctx, &gate, &selector, &[0.0, 1.0, 2.0, 1.4, 8.0, -3.0]);
        assert_eq!(out, vec![10.0, 20.0, 30.0, 20.0, 30.0, 10.0]);
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let mut ctx = ctx();
        let (mut selector, _sources) = three_way(&mut ctx);

        assert!(matches!(
            selector.select(&mut ctx, 3),
            Err(UnitError::InvalidParameter { .. })
        ));
        assert_eq!(selector.selected(), 0);
        assert_eq!(ctx.pending_changes(), 0);
    }

    #[test]
    fn test_rejects_bad_sizes() {
        let mut ctx = ctx();
        assert!(matches!(
            Selector::new(&mut ctx, 0),
            Err(UnitError::SelectorSize { got: 0, .. })
        ));
        assert!(Selector::new(&mut ctx, MAX_SELECTOR_INPUTS + 1).is_err());
        assert!(Selector::new(&mut ctx, MAX_SELECTOR_INPUTS).is_ok());
    }

    #[test]
    fn test_rejects_port_past_gate() {
        let mut ctx = ctx();
        let selector = Selector::new(&mut ctx, 2).unwrap();
        let source = Signal::new(&mut ctx, 1.0).unwrap();

        assert_eq!(
            source.connect_at(&mut ctx, &selector, 0, 3).unwrap_err(),
            UnitError::NoSuchInput {
                unit: "Selector",
                index: 3
            }
        );
    }
}
