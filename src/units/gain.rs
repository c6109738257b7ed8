use crate::{
    context::Context,
    error::{finite, UnitError},
    graph::{
        message::{ControlMessage, ControlSink},
        node::Kernel,
    },
    units::{primitive_unit, Handle},
};

/// Sums everything connected to its input and scales the result.
///
/// Composites use unity gains as their input/output attachment points and as
/// summing junctions.
#[derive(Debug)]
pub struct Gain {
    handle: Handle,
    gain: f32,
}

impl Gain {
    pub fn new(ctx: &mut Context, gain: f32) -> Result<Self, UnitError> {
        let gain = finite("gain", gain)?;
        Ok(Self {
            handle: Handle::new(ctx, Kernel::Gain { gain }),
            gain,
        })
    }

    /// Plain summing junction.
    pub fn unity(ctx: &mut Context) -> Self {
        Self {
            handle: Handle::new(ctx, Kernel::Gain { gain: 1.0 }),
            gain: 1.0,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Takes effect at the next block.
    pub fn set_gain(&mut self, control: &mut impl ControlSink, gain: f32) -> Result<(), UnitError> {
        let gain = finite("gain", gain)?;
        self.handle
            .send(control, |node| ControlMessage::SetGain { node, gain })?;
        self.gain = gain;
        Ok(())
    }
}

primitive_unit!(Gain);
