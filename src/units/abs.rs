use crate::{
    context::Context,
    graph::node::Kernel,
    units::{primitive_unit, Handle},
};

/// Full-wave rectifier: `|x|` every sample.
#[derive(Debug)]
pub struct Abs {
    handle: Handle,
}

impl Abs {
    pub fn new(ctx: &mut Context) -> Self {
        Self {
            handle: Handle::new(ctx, Kernel::Abs),
        }
    }
}

primitive_unit!(Abs);
