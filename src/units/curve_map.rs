use crate::{
    context::Context,
    dsp::{CurveSampling, CurveTable},
    error::UnitError,
    graph::{
        message::{ControlMessage, ControlSink},
        node::Kernel,
    },
    units::{primitive_unit, Handle},
};

/// Static nonlinear mapping through a lookup table.
///
/// The input is read as a position on [-1, 1] (clamped) and the table entry
/// at that position comes out. See [`crate::dsp::curve`] for the sampling
/// rules.
#[derive(Debug)]
pub struct CurveMap {
    handle: Handle,
    table: CurveTable,
    sampling: CurveSampling,
}

impl CurveMap {
    pub fn new(ctx: &mut Context, table: CurveTable, sampling: CurveSampling) -> Self {
        Self {
            handle: Handle::new(
                ctx,
                Kernel::CurveMap {
                    table: table.clone(),
                    sampling,
                },
            ),
            table,
            sampling,
        }
    }

    /// Nearest-entry mapping.
    pub fn nearest(ctx: &mut Context, table: CurveTable) -> Self {
        Self::new(ctx, table, CurveSampling::Nearest)
    }

    /// The current table (or the one queued for the next block).
    pub fn curve(&self) -> &CurveTable {
        &self.table
    }

    pub fn sampling(&self) -> CurveSampling {
        self.sampling
    }

    /// Replace the whole table. The render pass swaps it in at the next block
    /// boundary, never halfway through one.
    pub fn set_curve(
        &mut self,
        control: &mut impl ControlSink,
        table: CurveTable,
    ) -> Result<(), UnitError> {
        let queued = table.clone();
        self.handle.send(control, |node| ControlMessage::SetCurve {
            node,
            table: queued,
        })?;
        self.table = table;
        Ok(())
    }
}

primitive_unit!(CurveMap);
