use std::fmt;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::{dsp::CurveTable, error::UnitError, graph::node::NodeId};

/// A parameter change queued from the control side and applied at the start
/// of the next rendered block.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    SetValue { node: NodeId, value: f32 },
    SetGain { node: NodeId, gain: f32 },
    SetLevel { node: NodeId, level: f32 },
    SetGate { node: NodeId, gate: f32 },
    SetCutoff { node: NodeId, cutoff: f32 },
    SetCurve { node: NodeId, table: CurveTable },
}

impl ControlMessage {
    pub fn node(&self) -> NodeId {
        match self {
            ControlMessage::SetValue { node, .. }
            | ControlMessage::SetGain { node, .. }
            | ControlMessage::SetLevel { node, .. }
            | ControlMessage::SetGate { node, .. }
            | ControlMessage::SetCutoff { node, .. }
            | ControlMessage::SetCurve { node, .. } => *node,
        }
    }
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

/// Anything parameter setters can queue changes through.
///
/// Implemented by [`Controller`] (the producer end, free to move to another
/// thread) and by [`Context`](crate::context::Context) while it still holds
/// its controller.
pub trait ControlSink {
    fn push(&mut self, message: ControlMessage) -> Result<(), UnitError>;

    /// Fail unless `count` more messages fit right now.
    ///
    /// Setters that touch several nodes call this first so they queue all of
    /// their changes or none of them.
    fn check_capacity(&self, count: usize) -> Result<(), UnitError>;
}

/// Producer end of the control ring buffer.
///
/// The render side only ever holds the consumer, so a `Controller` can be
/// moved to a UI or network thread and used there while blocks render.
pub struct Controller {
    tx: Producer<ControlMessage>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("free_slots", &self.tx.slots())
            .finish()
    }
}

impl Controller {
    /// Changes that can still be queued before the next block drains them.
    pub fn free_slots(&self) -> usize {
        self.tx.slots()
    }
}

impl ControlSink for Controller {
    fn push(&mut self, message: ControlMessage) -> Result<(), UnitError> {
        self.tx.push(message).map_err(|_| UnitError::QueueFull)
    }

    fn check_capacity(&self, count: usize) -> Result<(), UnitError> {
        if self.tx.slots() < count {
            return Err(UnitError::QueueFull);
        }
        Ok(())
    }
}

/// Create the control ring buffer: the controller for the control side and
/// the consumer the render pass drains.
pub fn control_channel(capacity: usize) -> (Controller, Consumer<ControlMessage>) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    (Controller { tx }, rx)
}
