//! Units assembled from primitives.
//!
//! A composite owns the primitives it is built from and wires them together
//! on construction. From the outside it is a single [`Unit`](crate::units::Unit)
//! with one input and one output; disposing it disposes everything inside.

/// Asymmetric attack/release envelope follower.
pub mod follower;
/// Clamping against a held constant.
pub mod max;

pub use follower::{attack_release_table, Follower, FollowerConfig};
pub use max::{Max, Min};
