//! Constraint sets: reusable snapshots of per-node constraints
//!
//! A [`ConstraintSnapshot`] can be captured from a live graph, applied back
//! onto one, and partially overridden with [`Delta`]s targeted by identifier
//! or by tag pattern.

pub mod delta;
pub mod snapshot;
pub mod store;

pub use delta::{Delta, DeltaField, DeltaTarget};
pub use snapshot::{apply, capture, AnchorTarget, ApplyReport, ConstraintBundle, ConstraintSnapshot};
pub use store::ConstraintSetStore;
