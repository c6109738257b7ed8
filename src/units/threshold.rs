use crate::{
    context::Context,
    error::{finite, UnitError},
    graph::{
        message::{ControlMessage, ControlSink},
        node::Kernel,
    },
    units::{primitive_unit, Handle},
};

/*
Comparators
===========

Both comparators collapse a signal into a binary decision, sample by sample:

  Threshold(t)     1.0 if x >= t else 0.0
  GreaterThan(t)   1.0 if x >  t else 0.0

They differ only at x == t. There is no hysteresis; a signal sitting on the
level can chatter between 0 and 1. Feed the result into a selector gate or a
curve to turn the decision into a value.
*/

/// `1.0` when the input is at or above `level`, else `0.0`.
#[derive(Debug)]
pub struct Threshold {
    handle: Handle,
    level: f32,
}

impl Threshold {
    pub fn new(ctx: &mut Context, level: f32) -> Result<Self, UnitError> {
        let level = finite("threshold level", level)?;
        Ok(Self::unchecked(ctx, level))
    }

    pub(crate) fn unchecked(ctx: &mut Context, level: f32) -> Self {
        Self {
            handle: Handle::new(ctx, Kernel::Threshold { level }),
            level,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Takes effect at the next block.
    pub fn set_level(
        &mut self,
        control: &mut impl ControlSink,
        level: f32,
    ) -> Result<(), UnitError> {
        let level = finite("threshold level", level)?;
        self.handle
            .send(control, |node| ControlMessage::SetLevel { node, level })?;
        self.level = level;
        Ok(())
    }
}

/// `1.0` when the input is strictly above `level`, else `0.0`.
#[derive(Debug)]
pub struct GreaterThan {
    handle: Handle,
    level: f32,
}

impl GreaterThan {
    pub fn new(ctx: &mut Context, level: f32) -> Result<Self, UnitError> {
        let level = finite("comparison level", level)?;
        Ok(Self::unchecked(ctx, level))
    }

    pub(crate) fn unchecked(ctx: &mut Context, level: f32) -> Self {
        Self {
            handle: Handle::new(ctx, Kernel::GreaterThan { level }),
            level,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Takes effect at the next block.
    pub fn set_level(
        &mut self,
        control: &mut impl ControlSink,
        level: f32,
    ) -> Result<(), UnitError> {
        let level = finite("comparison level", level)?;
        self.handle
            .send(control, |node| ControlMessage::SetLevel { node, level })?;
        self.level = level;
        Ok(())
    }
}

primitive_unit!(Threshold, GreaterThan);
