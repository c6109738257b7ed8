use crate::{
    context::Context,
    dsp::{FilterType, OnePole},
    error::UnitError,
    graph::{
        message::{ControlMessage, ControlSink},
        node::{Kernel, Port},
    },
    units::{primitive_unit, Handle},
};

/*
Filter Unit
===========

A one-pole filter whose cutoff is an input, not just a setting.

    audio  ──→ [port 0] ┐
                        ├──→ output
    cutoff ──→ [port 1] ┘    fc = base cutoff + Σ(cutoff port)

Anything connected to the cutoff port is added to the base cutoff every
sample, so another unit can sweep or switch it. Start from a base of 0 Hz
when the cutoff should come entirely from the graph (that is how the
envelope follower drives it).

The effective cutoff is clamped at render time to [0, 0.49 · sample rate];
the base cutoff itself is validated when set.

Example:
  let lp = Filter::lowpass(&mut ctx, 0.0)?;
  curve.connect_port(&mut ctx, lp.cutoff()?)?;
*/

#[derive(Debug)]
pub struct Filter {
    handle: Handle,
    filter_type: FilterType,
    cutoff_hz: f32,
}

fn validate_cutoff(cutoff_hz: f32) -> Result<f32, UnitError> {
    if !cutoff_hz.is_finite() || cutoff_hz < 0.0 {
        return Err(UnitError::invalid(
            "cutoff",
            cutoff_hz,
            "must be finite and non-negative",
        ));
    }
    Ok(cutoff_hz)
}

impl Filter {
    pub fn new(
        ctx: &mut Context,
        filter_type: FilterType,
        cutoff_hz: f32,
    ) -> Result<Self, UnitError> {
        let cutoff = validate_cutoff(cutoff_hz)?;
        Ok(Self::unchecked(ctx, filter_type, cutoff))
    }

    /// `cutoff` must already have passed `validate_cutoff`.
    pub(crate) fn unchecked(ctx: &mut Context, filter_type: FilterType, cutoff: f32) -> Self {
        let kernel = Kernel::Filter {
            filter: OnePole::new(filter_type),
            cutoff,
        };

        Self {
            handle: Handle::new(ctx, kernel),
            filter_type,
            cutoff_hz: cutoff,
        }
    }

    pub fn lowpass(ctx: &mut Context, cutoff_hz: f32) -> Result<Self, UnitError> {
        Self::new(ctx, FilterType::LowPass, cutoff_hz)
    }

    pub fn highpass(ctx: &mut Context, cutoff_hz: f32) -> Result<Self, UnitError> {
        Self::new(ctx, FilterType::HighPass, cutoff_hz)
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Base cutoff in Hz, before anything connected to the cutoff port.
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// The cutoff port; connected signals are added to the base cutoff.
    pub fn cutoff(&self) -> Result<Port, UnitError> {
        self.handle.port(1)
    }

    /// Takes effect at the next block.
    pub fn set_cutoff(
        &mut self,
        control: &mut impl ControlSink,
        cutoff_hz: f32,
    ) -> Result<(), UnitError> {
        let cutoff = validate_cutoff(cutoff_hz)?;
        self.handle
            .send(control, |node| ControlMessage::SetCutoff { node, cutoff })?;
        self.cutoff_hz = cutoff;
        Ok(())
    }
}

primitive_unit!(Filter);
