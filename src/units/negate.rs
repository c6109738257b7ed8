use crate::{
    context::Context,
    graph::node::Kernel,
    units::{primitive_unit, Handle},
};

/// Sign inversion: `-x` every sample.
#[derive(Debug)]
pub struct Negate {
    handle: Handle,
}

impl Negate {
    pub fn new(ctx: &mut Context) -> Self {
        Self {
            handle: Handle::new(ctx, Kernel::Negate),
        }
    }
}

primitive_unit!(Negate);
