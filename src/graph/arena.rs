use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU32, Ordering},
};

use tracing::debug;

use crate::{
    error::UnitError,
    graph::{
        message::ControlMessage,
        node::{Kernel, Node, NodeId, Port, RenderCtx, MAX_PORTS},
        schedule::Schedule,
    },
    MAX_BLOCK_SIZE,
};

/// A directed connection from a node's output to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
    pub from: NodeId,
    pub to: Port,
    pub feedback: bool,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Source of per-graph ids, so ids from one context are refused by another.
static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

/// Arena of primitive nodes and the edges between them.
///
/// Units never own nodes directly; they hold [`NodeId`]s into this arena.
/// Topology edits mark the schedule dirty and it is rebuilt at the next block
/// boundary, never inside a block.
#[derive(Debug)]
pub struct Graph {
    id: u32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    edges: Vec<Edge>,
    schedule: Schedule,
    dirty: bool,
    frames: usize,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            edges: Vec::new(),
            schedule: Schedule::default(),
            dirty: false,
            frames: 0,
        }
    }

    /// Whether `id` was issued by this graph (live or not).
    pub fn owns(&self, id: NodeId) -> bool {
        id.context == self.id
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Edges that start or end at `id`.
    pub fn edges_touching(&self, id: NodeId) -> usize {
        self.edges
            .iter()
            .filter(|e| e.from == id || e.to.node == id)
            .count()
    }

    /// Frames produced by the most recent block.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn add(&mut self, kernel: Kernel) -> NodeId {
        self.dirty = true;
        let node = Node::new(kernel);

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
                context: self.id,
            };
        }

        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
            context: self.id,
        }
    }

    /// Remove a node and every edge touching it. Returns false for ids that
    /// were already removed.
    pub(crate) fn remove(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }

        let slot = &mut self.slots[id.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        self.edges.retain(|e| e.from != id && e.to.node != id);
        self.dirty = true;
        true
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, UnitError> {
        if !self.owns(id) {
            return Err(UnitError::ForeignNode(id));
        }
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(UnitError::StaleNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, UnitError> {
        if !self.owns(id) {
            return Err(UnitError::ForeignNode(id));
        }
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(UnitError::StaleNode(id))
    }

    fn check_port(&self, port: Port) -> Result<(), UnitError> {
        let kernel = &self.node(port.node)?.kernel;
        if port.index >= kernel.port_count() {
            return Err(UnitError::NoSuchInput {
                unit: kernel.name(),
                index: port.index,
            });
        }
        Ok(())
    }

    fn check_new_edge(&self, from: NodeId, to: Port) -> Result<(), UnitError> {
        self.node(from)?;
        self.check_port(to)?;

        if self.edges.iter().any(|e| e.from == from && e.to == to) {
            return Err(UnitError::DuplicateEdge {
                from,
                to: to.node,
                port: to.index,
            });
        }
        Ok(())
    }

    /// Connect `from` to `to` as a forward edge. Fails if the edge would close
    /// a loop; loops need [`connect_feedback`](Self::connect_feedback).
    pub(crate) fn connect(&mut self, from: NodeId, to: Port) -> Result<(), UnitError> {
        self.check_new_edge(from, to)?;

        if from == to.node || self.reaches(to.node, from) {
            return Err(UnitError::CycleDetected);
        }

        self.edges.push(Edge {
            from,
            to,
            feedback: false,
        });
        self.dirty = true;
        Ok(())
    }

    /// Connect `from` to `to` as a one-sample-delayed feedback edge.
    ///
    /// The loop it closes must already exist as forward edges from `to` back
    /// to `from` and must pass through a filter node.
    pub(crate) fn connect_feedback(&mut self, from: NodeId, to: Port) -> Result<(), UnitError> {
        self.check_new_edge(from, to)?;

        if !self.filtered_path(to.node, from) {
            return Err(UnitError::UnfilteredFeedback { from, to: to.node });
        }

        self.edges.push(Edge {
            from,
            to,
            feedback: true,
        });
        self.dirty = true;
        Ok(())
    }

    /// Remove every edge leaving `from`.
    pub(crate) fn disconnect(&mut self, from: NodeId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| e.from != from);
        let removed = before - self.edges.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    fn forward_targets(&self, from: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |e| !e.feedback && e.from == from)
            .map(|e| e.to.node)
    }

    /// Whether `target` can be reached from `start` along forward edges.
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut seen = vec![false; self.slots.len()];
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            let visited = &mut seen[id.index as usize];
            if *visited {
                continue;
            }
            *visited = true;
            stack.extend(self.forward_targets(id));
        }
        false
    }

    /// Whether some forward path from `start` to `target` passes through a
    /// filter (either end included).
    fn filtered_path(&self, start: NodeId, target: NodeId) -> bool {
        let is_filter = |id: NodeId| self.node(id).map(|n| n.kernel.is_filter()).unwrap_or(false);

        // State is (node, filter seen so far)
        let mut seen = vec![[false; 2]; self.slots.len()];
        let mut queue = VecDeque::from([(start, is_filter(start))]);

        while let Some((id, filtered)) = queue.pop_front() {
            if id == target && filtered {
                return true;
            }
            let visited = &mut seen[id.index as usize][filtered as usize];
            if *visited {
                continue;
            }
            *visited = true;
            for next in self.forward_targets(id) {
                queue.push_back((next, filtered || is_filter(next)));
            }
        }
        false
    }

    /// Rebuild the evaluation order from the current topology.
    pub(crate) fn compile(&mut self) -> Result<(), UnitError> {
        let live: Vec<bool> = self.slots.iter().map(|s| s.node.is_some()).collect();
        self.schedule = Schedule::compile(&live, &self.edges)?;
        self.dirty = false;

        debug!(
            nodes = self.schedule.order.len(),
            edges = self.edges.len(),
            "compiled unit graph schedule"
        );
        Ok(())
    }

    /// Apply a control change. Returns false when the target node is gone or
    /// does not accept that kind of change.
    pub(crate) fn apply(&mut self, message: ControlMessage) -> bool {
        match self.node_mut(message.node()) {
            Ok(node) => node.kernel.apply(message),
            Err(_) => false,
        }
    }

    /// Render `frames` samples for every node using the compiled schedule.
    ///
    /// # Real-time Safety
    /// No allocations, locks or logging. The schedule must be up to date
    /// (see [`compile`](Self::compile)).
    pub(crate) fn process(&mut self, frames: usize, ctx: &RenderCtx) {
        debug_assert!(frames <= MAX_BLOCK_SIZE);
        debug_assert!(!self.dirty, "schedule must be compiled before rendering");

        for frame in 0..frames {
            for &idx in &self.schedule.order {
                let mut ports = [0.0f32; MAX_PORTS];

                for input in &self.schedule.inputs[idx] {
                    if let Some(source) = self.slots[input.source].node.as_ref() {
                        let value = match (input.feedback, frame) {
                            (false, _) => source.output[frame],
                            (true, 0) => source.last,
                            (true, _) => source.output[frame - 1],
                        };
                        ports[input.port] += value;
                    }
                }

                if let Some(node) = self.slots[idx].node.as_mut() {
                    let count = node.kernel.port_count();
                    node.output[frame] = node.kernel.tick(&ports[..count], frame, ctx);
                }
            }
        }

        if frames > 0 {
            for node in self.slots.iter_mut().filter_map(|s| s.node.as_mut()) {
                node.last = node.output[frames - 1];
            }
        }
        self.frames = frames;
    }

    /// The block most recently rendered by `id`.
    pub(crate) fn output(&self, id: NodeId) -> Result<&[f32], UnitError> {
        Ok(&self.node(id)?.output[..self.frames])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::OnePole;

    fn port(node: NodeId, index: usize) -> Port {
        Port { node, index }
    }

    fn ctx() -> RenderCtx {
        RenderCtx::new(48_000.0)
    }

    #[test]
    fn test_add_and_remove_recycles_slots() {
        let mut graph = Graph::new();
        let a = graph.add(Kernel::Abs);
        assert!(graph.contains(a));

        assert!(graph.remove(a));
        assert!(!graph.contains(a));
        assert!(!graph.remove(a), "second removal is a no-op");

        let b = graph.add(Kernel::Negate);
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(graph.node(a).is_err(), "stale id must not reach the new node");
    }

    #[test]
    fn test_ids_are_bound_to_their_graph() {
        let mut first = Graph::new();
        let mut second = Graph::new();
        let a = first.add(Kernel::Abs);
        let b = second.add(Kernel::Abs);

        // Same slot and generation, different graphs
        assert_eq!((a.index, a.generation), (b.index, b.generation));
        assert_ne!(a, b);
        assert!(first.owns(a) && !first.owns(b));

        assert_eq!(first.node(b).unwrap_err(), UnitError::ForeignNode(b));
        assert_eq!(
            first.connect(a, port(b, 0)).unwrap_err(),
            UnitError::ForeignNode(b)
        );
        assert!(!first.remove(b));
        assert!(second.contains(b));
    }

    #[test]
    fn test_fan_in_is_summed() {
        let mut graph = Graph::new();
        let one = graph.add(Kernel::Signal { value: 1.0 });
        let two = graph.add(Kernel::Signal { value: 2.0 });
        let sum = graph.add(Kernel::Gain { gain: 1.0 });

        graph.connect(one, port(sum, 0)).unwrap();
        graph.connect(two, port(sum, 0)).unwrap();
        graph.compile().unwrap();
        graph.process(4, &ctx());

        assert_eq!(graph.output(sum).unwrap(), &[3.0; 4]);
    }

    #[test]
    fn test_rejects_bad_ports_and_duplicates() {
        let mut graph = Graph::new();
        let a = graph.add(Kernel::Signal { value: 1.0 });
        let b = graph.add(Kernel::Abs);

        assert_eq!(
            graph.connect(a, port(b, 1)).unwrap_err(),
            UnitError::NoSuchInput {
                unit: "Abs",
                index: 1
            }
        );

        graph.connect(a, port(b, 0)).unwrap();
        assert!(matches!(
            graph.connect(a, port(b, 0)),
            Err(UnitError::DuplicateEdge { .. })
        ));
    }

    #[test]
    fn test_forward_cycle_rejected() {
        let mut graph = Graph::new();
        let a = graph.add(Kernel::Gain { gain: 1.0 });
        let b = graph.add(Kernel::Gain { gain: 1.0 });

        graph.connect(a, port(b, 0)).unwrap();
        assert_eq!(
            graph.connect(b, port(a, 0)).unwrap_err(),
            UnitError::CycleDetected
        );
        assert_eq!(
            graph.connect(a, port(a, 0)).unwrap_err(),
            UnitError::CycleDetected
        );
    }

    #[test]
    fn test_feedback_requires_filter() {
        let mut graph = Graph::new();
        let a = graph.add(Kernel::Gain { gain: 1.0 });
        let b = graph.add(Kernel::Gain { gain: 0.5 });
        graph.connect(a, port(b, 0)).unwrap();

        assert!(matches!(
            graph.connect_feedback(b, port(a, 0)),
            Err(UnitError::UnfilteredFeedback { .. })
        ));

        let lp = graph.add(Kernel::Filter {
            filter: OnePole::lowpass(),
            cutoff: 100.0,
        });
        graph.connect(b, port(lp, 0)).unwrap();
        graph.connect_feedback(lp, port(a, 0)).unwrap();
        graph.compile().unwrap();
    }

    #[test]
    fn test_feedback_reads_previous_sample() {
        let mut graph = Graph::new();
        let one = graph.add(Kernel::Signal { value: 1.0 });
        let sum = graph.add(Kernel::Gain { gain: 1.0 });
        let lp = graph.add(Kernel::Filter {
            filter: OnePole::lowpass(),
            cutoff: 20_000.0,
        });

        graph.connect(one, port(sum, 0)).unwrap();
        graph.connect(sum, port(lp, 0)).unwrap();
        graph.connect_feedback(lp, port(sum, 0)).unwrap();
        graph.compile().unwrap();
        graph.process(8, &ctx());

        let sum_out = graph.output(sum).unwrap().to_vec();
        let lp_out = graph.output(lp).unwrap().to_vec();
        assert_eq!(sum_out[0], 1.0, "no feedback history on the first sample");
        for frame in 1..8 {
            assert!((sum_out[frame] - (1.0 + lp_out[frame - 1])).abs() < 1e-6);
        }

        // Next block picks up where the last one ended
        let last = lp_out[7];
        graph.process(1, &ctx());
        assert!((graph.output(sum).unwrap()[0] - (1.0 + last)).abs() < 1e-6);
    }

    #[test]
    fn test_remove_drops_edges() {
        let mut graph = Graph::new();
        let a = graph.add(Kernel::Signal { value: 1.0 });
        let b = graph.add(Kernel::Abs);
        let c = graph.add(Kernel::Negate);
        graph.connect(a, port(b, 0)).unwrap();
        graph.connect(b, port(c, 0)).unwrap();
        assert_eq!(graph.edge_count(), 2);

        graph.remove(b);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.edges_touching(b), 0);
    }

    #[test]
    fn test_disconnect_only_outgoing() {
        let mut graph = Graph::new();
        let a = graph.add(Kernel::Signal { value: 1.0 });
        let b = graph.add(Kernel::Abs);
        let c = graph.add(Kernel::Negate);
        graph.connect(a, port(b, 0)).unwrap();
        graph.connect(b, port(c, 0)).unwrap();

        assert_eq!(graph.disconnect(b), 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.disconnect(b), 0);
    }
}
