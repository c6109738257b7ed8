use crate::{
    context::Context,
    error::UnitError,
    graph::node::Kernel,
    units::{primitive_unit, Handle},
    MAX_BLOCK_SIZE,
};

/// Entry point for audio produced outside the graph.
///
/// Players, oscillators and capture devices live outside this crate; the host
/// writes each block they produce here before calling
/// [`Context::render`]. The samples stay in place until the next write, so a
/// block that is not rewritten repeats.
#[derive(Debug)]
pub struct ExternalInput {
    handle: Handle,
}

impl ExternalInput {
    pub fn new(ctx: &mut Context) -> Self {
        Self {
            handle: Handle::new(
                ctx,
                Kernel::External {
                    buffer: vec![0.0; MAX_BLOCK_SIZE],
                },
            ),
        }
    }

    /// Copy the next block in. Frames past `samples.len()` read as silence.
    pub fn write(&self, ctx: &mut Context, samples: &[f32]) -> Result<(), UnitError> {
        if samples.len() > MAX_BLOCK_SIZE {
            return Err(UnitError::BlockTooLarge {
                frames: samples.len(),
                max: MAX_BLOCK_SIZE,
            });
        }

        let node = ctx.graph_mut().node_mut(self.handle.id()?)?;
        if let Kernel::External { buffer } = &mut node.kernel {
            let (head, tail) = buffer.split_at_mut(samples.len());
            head.copy_from_slice(samples);
            tail.fill(0.0);
        }
        Ok(())
    }
}

primitive_unit!(ExternalInput);
