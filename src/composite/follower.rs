#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    context::Context,
    dsp::{time_to_cutoff, CurveTable, FilterType, CURVE_LENGTH},
    error::{positive_time, UnitError},
    graph::{
        message::ControlSink,
        node::{NodeId, Port},
    },
    units::{chain, Abs, CurveMap, Filter, Gain, Negate, Threshold, Unit},
};

/*
Envelope Follower
=================

Tracks the loudness of a signal: the output rises towards |input| at the
attack rate and falls back at the release rate.

A single low-pass filter has one time constant, so it cannot rise fast and
fall slowly at the same time. The follower gets around that by switching the
filter's cutoff between two values, and the switching is done by the graph
itself, not by code:

    input ──→ Abs ──┬──────────────→ Filter ──┬──→ output
                    │                  ↑      │
                    └→ Negate ─→ (+) ←─┼──────┘  (feedback, 1 sample)
                                  │    │
                                  ↓    │
                            Threshold(0)
                                  │    │
                                  ↓    │
                              CurveMap ┘  → Filter cutoff

    difference = envelope[n-1] − |input[n]|

    envelope below the signal  → difference < 0 → threshold 0 → attack
    envelope at/above signal   → difference ≥ 0 → threshold 1 → release

The curve is a two-valued table over [-1, 1]:

    index      0 ........ 511 | 512 ........ 1023
    value      attack cutoff  | release cutoff

Threshold output 0 reads index 511 (ties round down) and output 1 reads index
1023, so the decision lands on the attack or release half. Times convert to
cutoffs with fc = 1 / (2π · t).

The feedback edge from the filter back into the difference is the only loop.
It leaves the filter, not the output node, so the output node only ever
carries the connections made from outside and `disconnect` cannot cut the
loop.

Example:
  let follower = Follower::with_times(&mut ctx, 0.005, 0.25)?;
  chain(&mut ctx, &[&input, &follower])?;
*/

/// Attack and release times in seconds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowerConfig {
    pub attack: f32,
    pub release: f32,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            attack: 0.01,
            release: 0.1,
        }
    }
}

impl FollowerConfig {
    fn validate(self) -> Result<Self, UnitError> {
        Ok(Self {
            attack: positive_time("attack time", self.attack)?,
            release: positive_time("release time", self.release)?,
        })
    }
}

/// Cutoff table switching between attack (lower half) and release (upper
/// half) frequencies.
pub fn attack_release_table(attack: f32, release: f32) -> CurveTable {
    CurveTable::split(CURVE_LENGTH, time_to_cutoff(attack), time_to_cutoff(release))
}

#[derive(Debug)]
struct FollowerNodes {
    input: Gain,
    output: Gain,
    abs: Abs,
    filter: Filter,
    negate: Negate,
    difference: Gain,
    threshold: Threshold,
    curve: CurveMap,
}

impl FollowerNodes {
    fn wire(&self, ctx: &mut Context) -> Result<(), UnitError> {
        // smoothed envelope
        chain(ctx, &[&self.input, &self.abs, &self.filter, &self.output])?;

        // error path into the cutoff
        chain(ctx, &[&self.abs, &self.negate, &self.difference])?;
        chain(ctx, &[&self.difference, &self.threshold, &self.curve])?;
        self.curve.connect_port(ctx, self.filter.cutoff()?)?;

        // Feedback: previous envelope sample into the difference.
        // Loop is difference → threshold → curve → filter.
        let envelope = self.filter.output(0)?;
        let junction = self.difference.input(0)?;
        ctx.graph_mut().connect_feedback(envelope, junction)
    }

    fn dispose(&mut self, ctx: &mut Context) {
        let _ = self.output.disconnect(ctx);
        self.input.dispose(ctx);
        self.output.dispose(ctx);
        self.abs.dispose(ctx);
        self.filter.dispose(ctx);
        self.negate.dispose(ctx);
        self.difference.dispose(ctx);
        self.threshold.dispose(ctx);
        self.curve.dispose(ctx);
    }
}

/// Asymmetric envelope follower built from primitives.
#[derive(Debug)]
pub struct Follower {
    nodes: Option<FollowerNodes>,
    config: FollowerConfig,
}

impl Follower {
    /// Follower with the default 10 ms attack and 100 ms release.
    pub fn new(ctx: &mut Context) -> Result<Self, UnitError> {
        Self::with_config(ctx, FollowerConfig::default())
    }

    pub fn with_times(ctx: &mut Context, attack: f32, release: f32) -> Result<Self, UnitError> {
        Self::with_config(ctx, FollowerConfig { attack, release })
    }

    pub fn with_config(ctx: &mut Context, config: FollowerConfig) -> Result<Self, UnitError> {
        let config = config.validate()?;
        let table = attack_release_table(config.attack, config.release);

        // Nothing below can fail, so no node is left behind half built.
        let input = Gain::unity(ctx);
        let output = Gain::unity(ctx);
        let abs = Abs::new(ctx);
        let filter = Filter::unchecked(ctx, FilterType::LowPass, 0.0);
        let negate = Negate::new(ctx);
        let difference = Gain::unity(ctx);
        let threshold = Threshold::unchecked(ctx, 0.0);
        let curve = CurveMap::nearest(ctx, table);

        let mut nodes = FollowerNodes {
            input,
            output,
            abs,
            filter,
            negate,
            difference,
            threshold,
            curve,
        };

        if let Err(err) = nodes.wire(ctx) {
            nodes.dispose(ctx);
            return Err(err);
        }

        debug!(
            attack = config.attack,
            release = config.release,
            "created follower"
        );

        Ok(Self {
            nodes: Some(nodes),
            config,
        })
    }

    fn nodes_mut(&mut self) -> Result<&mut FollowerNodes, UnitError> {
        self.nodes.as_mut().ok_or(UnitError::Disposed("Follower"))
    }

    pub fn config(&self) -> FollowerConfig {
        self.config
    }

    pub fn attack(&self) -> f32 {
        self.config.attack
    }

    pub fn release(&self) -> f32 {
        self.config.release
    }

    /// The cutoff table currently in use (or queued for the next block).
    pub fn curve(&self) -> Result<&CurveTable, UnitError> {
        self.nodes
            .as_ref()
            .map(|nodes| nodes.curve.curve())
            .ok_or(UnitError::Disposed("Follower"))
    }

    /// Rebuild the cutoff table for new times. The table is built here, off
    /// the render path, and swapped in whole at the next block.
    pub fn set_attack_release(
        &mut self,
        control: &mut impl ControlSink,
        attack: f32,
        release: f32,
    ) -> Result<(), UnitError> {
        let config = FollowerConfig { attack, release }.validate()?;
        let table = attack_release_table(config.attack, config.release);

        self.nodes_mut()?.curve.set_curve(control, table)?;
        self.config = config;
        Ok(())
    }

    pub fn set_attack(
        &mut self,
        control: &mut impl ControlSink,
        attack: f32,
    ) -> Result<(), UnitError> {
        self.set_attack_release(control, attack, self.config.release)
    }

    pub fn set_release(
        &mut self,
        control: &mut impl ControlSink,
        release: f32,
    ) -> Result<(), UnitError> {
        self.set_attack_release(control, self.config.attack, release)
    }
}

impl Unit for Follower {
    fn name(&self) -> &'static str {
        "Follower"
    }

    fn input(&self, index: usize) -> Result<Port, UnitError> {
        let nodes = self.nodes.as_ref().ok_or(UnitError::Disposed("Follower"))?;
        if index != 0 {
            return Err(UnitError::NoSuchInput {
                unit: "Follower",
                index,
            });
        }
        nodes.input.input(0)
    }

    fn output(&self, index: usize) -> Result<NodeId, UnitError> {
        let nodes = self.nodes.as_ref().ok_or(UnitError::Disposed("Follower"))?;
        if index != 0 {
            return Err(UnitError::NoSuchOutput {
                unit: "Follower",
                index,
            });
        }
        nodes.output.output(0)
    }

    fn is_disposed(&self) -> bool {
        self.nodes.is_none()
    }

    fn dispose(&mut self, ctx: &mut Context) {
        if ctx.is_foreign(&*self) {
            warn!("follower dispose called with a different context");
            return;
        }
        if let Some(mut nodes) = self.nodes.take() {
            nodes.dispose(ctx);
            debug!("disposed follower");
        }
    }
}
