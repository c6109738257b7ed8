use std::collections::VecDeque;

use crate::{error::UnitError, graph::arena::Edge};

/// One summed contribution to a node's input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScheduledInput {
    pub port: usize,
    pub source: usize,
    /// Read the source's previous sample instead of the current one.
    pub feedback: bool,
}

/// Evaluation order plus per-node input lists, both indexed by arena slot.
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    pub order: Vec<usize>,
    pub inputs: Vec<Vec<ScheduledInput>>,
}

impl Schedule {
    /// Order the live slots so every forward edge runs source before target
    /// (Kahn's algorithm). Feedback edges are left out of the ordering; they
    /// read last sample's value and so cannot form a cycle.
    pub fn compile(live: &[bool], edges: &[Edge]) -> Result<Self, UnitError> {
        let n = live.len();
        let mut in_degree = vec![0usize; n];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut inputs: Vec<Vec<ScheduledInput>> = vec![Vec::new(); n];

        for edge in edges {
            let from = edge.from.index as usize;
            let to = edge.to.node.index as usize;

            inputs[to].push(ScheduledInput {
                port: edge.to.index,
                source: from,
                feedback: edge.feedback,
            });

            if !edge.feedback {
                in_degree[to] += 1;
                outgoing[from].push(to);
            }
        }

        let active = live.iter().filter(|&&alive| alive).count();
        let mut queue: VecDeque<usize> = (0..n)
            .filter(|&i| live[i] && in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(active);

        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &to in &outgoing[idx] {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push_back(to);
                }
            }
        }

        if order.len() != active {
            return Err(UnitError::CycleDetected);
        }

        Ok(Self { order, inputs })
    }
}
