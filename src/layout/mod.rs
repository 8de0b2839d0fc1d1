//! Constraint resolution and dimension negotiation
//!
//! A pass runs in fixed order: writing-direction resolution, dimension
//! classification, helper registration, then measurement negotiation, in
//! which the coordinator and the solver alternate until every measured size
//! agrees with its solved frame.

pub mod config;
pub mod container;
pub mod context;
pub mod dimension;
pub mod direction;
pub mod error;
pub mod helpers;
pub mod measure;
pub mod solver;
pub mod types;

pub use config::{ConfigError, LayoutConfig};
pub use container::{ConstraintLayout, LayoutParticipant};
pub use context::{LayoutContext, SharedValues};
pub use error::{ConfigurationError, LayoutError, ResolutionWarning};
pub use helpers::HelperRegistry;
pub use measure::{MeasureHost, MeasureRecord, MeasureState, MeasureStats, MeasurementCoordinator};
pub use solver::{CassowarySolver, ContainerSpec, Solver, SolverError};
pub use types::*;
