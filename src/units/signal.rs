use crate::{
    context::Context,
    error::{finite, UnitError},
    graph::{
        message::{ControlMessage, ControlSink},
        node::Kernel,
    },
    units::{primitive_unit, Handle},
};

/// Constant, settable source. Whatever is connected to its input is ignored.
#[derive(Debug)]
pub struct Signal {
    handle: Handle,
    value: f32,
}

impl Signal {
    pub fn new(ctx: &mut Context, value: f32) -> Result<Self, UnitError> {
        let value = finite("signal value", value)?;
        Ok(Self::unchecked(ctx, value))
    }

    /// `value` must already be finite.
    pub(crate) fn unchecked(ctx: &mut Context, value: f32) -> Self {
        Self {
            handle: Handle::new(ctx, Kernel::Signal { value }),
            value,
        }
    }

    /// The value the signal holds (or will hold from the next block on).
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Takes effect at the next block.
    pub fn set_value(
        &mut self,
        control: &mut impl ControlSink,
        value: f32,
    ) -> Result<(), UnitError> {
        let value = finite("signal value", value)?;
        self.handle
            .send(control, |node| ControlMessage::SetValue { node, value })?;
        self.value = value;
        Ok(())
    }
}

primitive_unit!(Signal);
