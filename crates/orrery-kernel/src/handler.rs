//! Behavior traits attached to entities and environments.
//!
//! Each behavior kind is an explicit trait stored as boxed trait objects
//! in an ordered list, so composition is additive: a body can carry a
//! gravity rule and a drag rule without any inheritance. Blanket impls
//! make plain functions and closures of the matching shape usable as
//! behaviors directly.

use crate::clock::TimeInfo;
use crate::entity::Entity;
use crate::environment::Environment;

/// Per-tick state-evolution behavior.
///
/// Runs against the live entity during the update phase. Update
/// behaviors read and write only their own entity, so they need no
/// isolation.
pub trait UpdateHandler: 'static {
    /// Called once per tick with the owning entity and the current time
    /// information.
    fn update(&mut self, entity: &mut dyn Entity, time: TimeInfo);
}

impl<F> UpdateHandler for F
where
    F: FnMut(&mut dyn Entity, TimeInfo) + 'static,
{
    fn update(&mut self, entity: &mut dyn Entity, time: TimeInfo) {
        self(entity, time);
    }
}

/// Pairwise interaction behavior.
///
/// Runs once per other active entity each tick. `other` is frozen at its
/// pre-tick state, so the outcome does not depend on the order in which
/// entities are processed.
pub trait InteractHandler: 'static {
    /// Called once per (entity, other) pair per tick; mutate `entity`,
    /// read `other`.
    fn interact(&mut self, entity: &mut dyn Entity, other: &dyn Entity);
}

impl<F> InteractHandler for F
where
    F: FnMut(&mut dyn Entity, &dyn Entity) + 'static,
{
    fn interact(&mut self, entity: &mut dyn Entity, other: &dyn Entity) {
        self(entity, other);
    }
}

/// Post-tick observer of a single entity.
pub trait EntityObserver: 'static {
    /// Called after the entity's update phase each tick.
    fn on_step(&mut self, entity: &dyn Entity);
}

impl<F> EntityObserver for F
where
    F: FnMut(&dyn Entity) + 'static,
{
    fn on_step(&mut self, entity: &dyn Entity) {
        self(entity);
    }
}

/// Post-tick observer of the whole environment.
pub trait EnvObserver: 'static {
    /// Called at the end of every tick, before the clock advances.
    fn on_step(&mut self, env: &Environment);
}

impl<F> EnvObserver for F
where
    F: FnMut(&Environment) + 'static,
{
    fn on_step(&mut self, env: &Environment) {
        self(env);
    }
}
