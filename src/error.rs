//! Unit graph error types

use thiserror::Error;

use crate::graph::node::NodeId;

/// Errors raised while building, mutating or rendering a unit graph.
///
/// Configuration and topology errors are returned synchronously from the
/// constructor or mutator that caused them. A graph that failed mid-build is
/// not repaired; dispose the affected units and construct them again.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("invalid {name}: {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),

    #[error("selector needs between 1 and {max} inputs, got {got}")]
    SelectorSize { got: usize, max: usize },

    #[error("{0} has been disposed")]
    Disposed(&'static str),

    #[error("{0} no longer exists in this context")]
    StaleNode(NodeId),

    #[error("{0} belongs to a different context")]
    ForeignNode(NodeId),

    #[error("{unit} has no input {index}")]
    NoSuchInput { unit: &'static str, index: usize },

    #[error("{unit} has no output {index}")]
    NoSuchOutput { unit: &'static str, index: usize },

    #[error("{from} is already connected to input {port} of {to}")]
    DuplicateEdge { from: NodeId, to: NodeId, port: usize },

    #[error("connection graph contains a cycle that is not broken by a feedback edge")]
    CycleDetected,

    #[error("feedback from {from} to {to} does not pass through a filter")]
    UnfilteredFeedback { from: NodeId, to: NodeId },

    #[error("block of {frames} frames exceeds the maximum of {max}")]
    BlockTooLarge { frames: usize, max: usize },

    #[error("control queue is full; render a block before queueing more changes")]
    QueueFull,

    #[error("the controller was detached from this context; queue changes through it")]
    ControlDetached,
}

impl UnitError {
    pub(crate) fn invalid(name: &'static str, value: f32, reason: &'static str) -> Self {
        UnitError::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// True for errors caused by using a unit or node that was disposed.
    pub fn is_disposed(&self) -> bool {
        matches!(self, UnitError::Disposed(_) | UnitError::StaleNode(_))
    }
}

/// Validate a time constant in seconds.
pub(crate) fn positive_time(name: &'static str, seconds: f32) -> Result<f32, UnitError> {
    if !seconds.is_finite() {
        return Err(UnitError::invalid(name, seconds, "must be finite"));
    }
    if seconds <= 0.0 {
        return Err(UnitError::invalid(name, seconds, "must be greater than zero"));
    }
    Ok(seconds)
}

/// Validate a value that only needs to be a real number.
pub(crate) fn finite(name: &'static str, value: f32) -> Result<f32, UnitError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(UnitError::invalid(name, value, "must be finite"))
    }
}
