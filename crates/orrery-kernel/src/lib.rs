//! Discrete-time simulation kernel for orrery.
//!
//! The kernel advances a population of independent entities through
//! fixed time increments. Each tick has two phases: an interaction phase
//! in which every pairwise behavior reads a frozen pre-tick snapshot of
//! all other active entities (so interaction is computed as if
//! simultaneous, independent of processing order), followed by an update
//! phase in which each entity evolves its own live state. Behaviors are
//! attached to entities as ordered lists of trait objects, so
//! composition is additive rather than inherited.
//!
//! The [`environment::Environment`] owns the entity registry and the
//! [`clock::Clock`]; [`track::Track`] and [`motion::Mover`] provide the
//! canonical waypoint-following motion behavior built on
//! [`orrery_vec`].

/// Fixed-step simulation clock with optional wall-clock pacing.
pub mod clock;
/// Configuration overrides for simulation runs.
pub mod config;
/// Entity identity, bookkeeping core, and behavior dispatch.
pub mod entity;
/// Entity registry and the two-phase tick protocol.
pub mod environment;
/// Error types for the kernel.
pub mod error;
/// Kernel event types and the event log.
pub mod event;
/// Behavior traits attached to entities and environments.
pub mod handler;
/// The waypoint-following motion entity.
pub mod motion;
/// Waypoint polyline routes.
pub mod track;

/// Re-exports of [`clock::Clock`] and [`clock::TimeInfo`].
pub use clock::{Clock, TimeInfo};
/// Re-export of [`config::RunConfig`].
pub use config::RunConfig;
/// Re-exports of the entity types.
pub use entity::{Entity, EntityCore, EntityId, Kinematics};
/// Re-exports of [`environment::Environment`] and [`environment::Tag`].
pub use environment::{Environment, Tag};
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of the event log types.
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-exports of the behavior traits.
pub use handler::{EntityObserver, EnvObserver, InteractHandler, UpdateHandler};
/// Re-export of [`motion::Mover`].
pub use motion::Mover;
/// Re-export of [`track::Track`].
pub use track::Track;
