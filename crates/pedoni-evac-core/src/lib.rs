//! Floor-field cellular-automaton pedestrian evacuation engine.
//!
//! The modules below mirror the layered structure of the algorithm itself:
//! grid primitives and PRNG first, then the three field types, then the
//! per-pedestrian transition model, conflict resolution, and finally the
//! driver that ties a parsed environment to one or more simulation runs.

pub mod config;
pub mod conflict;
pub mod diagnostic;
pub mod driver;
pub mod dynamic_field;
pub mod environment;
pub mod error;
pub mod exit;
pub mod fire;
pub mod grid;
pub mod location;
pub mod pedestrian;
pub mod random;
pub mod static_field;
pub mod transition;

pub use config::Configuration;
pub use driver::{SimulationRunOutcome, SimulationSetOutcome, Simulator};
pub use environment::{Environment, SimulationSetExits};
pub use error::{EngineError, EngineResult};
pub use location::Location;
