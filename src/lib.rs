pub mod composite; // Units built from primitives
pub mod context;
pub mod dsp;
pub mod error;
pub mod graph; // Node arena and sample-major evaluator
pub mod units; // Unit trait and primitive library

pub use composite::{Follower, FollowerConfig, Max, Min};
pub use context::{Context, ContextConfig};
pub use error::UnitError;
pub use graph::{ControlSink, Controller};
pub use units::{chain, Unit};

pub const MAX_BLOCK_SIZE: usize = 2048;
