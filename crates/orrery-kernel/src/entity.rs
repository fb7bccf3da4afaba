use std::any::Any;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use orrery_vec::DVec3;
use serde::{Deserialize, Serialize};

use crate::clock::TimeInfo;
use crate::handler::{EntityObserver, InteractHandler, UpdateHandler};

/// Process-wide identity counter. Starts at 1 and only ever increases;
/// there is no way to rewind it, so ids are never reused.
static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of an entity.
///
/// Issued exactly once at construction, monotonically increasing across
/// the process lifetime, and never reused even after removal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(u64);

impl EntityId {
    fn issue() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric id.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable kinematic state an entity exposes to sensors and other
/// entities. Two-dimensional entities report z = 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kinematics {
    /// Position in 3-space.
    pub position: DVec3,
    /// Instantaneous velocity in 3-space.
    pub velocity: DVec3,
}

/// Bookkeeping embedded in every entity: identity, activity and
/// attachment flags, the current tick's time, and the registered
/// behavior lists.
pub struct EntityCore {
    id: EntityId,
    name: String,
    active: bool,
    attached: bool,
    time: TimeInfo,
    update_handlers: Vec<Box<dyn UpdateHandler>>,
    interact_handlers: Vec<Box<dyn InteractHandler>>,
    observers: Vec<Box<dyn EntityObserver>>,
}

impl EntityCore {
    /// Create a core with a fresh identity. Entities start active and
    /// unattached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::issue(),
            name: name.into(),
            active: true,
            attached: false,
            time: TimeInfo::default(),
            update_handlers: Vec::new(),
            interact_handlers: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// This entity's identity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Human-readable name; not required to be unique, may be empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the entity takes part in the tick phases.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Include or exclude the entity from subsequent ticks. Inactive
    /// entities stay registered.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the entity is currently attached to an environment.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    /// Time information of the current tick, stamped by the environment
    /// before the phases run.
    pub fn time(&self) -> TimeInfo {
        self.time
    }

    pub(crate) fn set_time(&mut self, time: TimeInfo) {
        self.time = time;
    }

    /// Register a per-tick update behavior. Behaviors run in
    /// registration order.
    pub fn add_update_handler(&mut self, handler: impl UpdateHandler) {
        self.update_handlers.push(Box::new(handler));
    }

    /// Register a pairwise interaction behavior. Behaviors run in
    /// registration order for every other active entity.
    pub fn add_interact_handler(&mut self, handler: impl InteractHandler) {
        self.interact_handlers.push(Box::new(handler));
    }

    /// Register a post-tick observer of this entity.
    pub fn add_observer(&mut self, observer: impl EntityObserver) {
        self.observers.push(Box::new(observer));
    }

    /// Whether any pairwise interaction behavior is registered.
    pub fn has_interact_handlers(&self) -> bool {
        !self.interact_handlers.is_empty()
    }
}

impl Clone for EntityCore {
    /// Copies observable state only. Behavior lists are not carried:
    /// snapshots are read by other entities during the interaction
    /// phase, never run.
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            active: self.active,
            attached: self.attached,
            time: self.time,
            update_handlers: Vec::new(),
            interact_handlers: Vec::new(),
            observers: Vec::new(),
        }
    }
}

impl fmt::Debug for EntityCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.active)
            .field("attached", &self.attached)
            .finish()
    }
}

/// A simulated object hosted by an
/// [`Environment`](crate::environment::Environment).
///
/// Entities carry a fixed identity and compose behavior from the ordered
/// handler lists in their [`EntityCore`] rather than through overrides;
/// see [`update`], [`interact`], and [`notify_observers`] for the
/// dispatch rules.
pub trait Entity: 'static {
    /// Shared bookkeeping.
    fn core(&self) -> &EntityCore;

    /// Shared bookkeeping, mutably.
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Restore entity-specific state to its initial configuration.
    fn reset(&mut self) {}

    /// An independent copy of this entity's observable state, used as
    /// frozen input to the interaction phase.
    fn snapshot(&self) -> Box<dyn Entity>;

    /// Observable kinematic state, when the entity occupies space.
    fn kinematics(&self) -> Option<Kinematics> {
        None
    }

    /// Downcasting support for typed access to concrete entities.
    fn as_any(&self) -> &dyn Any;

    /// Downcasting support for typed access to concrete entities.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// This entity's identity.
    fn id(&self) -> EntityId {
        self.core().id()
    }

    /// This entity's name.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Whether the entity takes part in the tick phases.
    fn is_active(&self) -> bool {
        self.core().is_active()
    }
}

/// Run every update behavior registered on `entity`, in registration
/// order.
///
/// The handler list is taken out of the entity while it runs, so a
/// behavior holds the only mutable borrow of its entity. Behaviors
/// registered during dispatch run from the next dispatch on.
pub fn update(entity: &mut dyn Entity, time: TimeInfo) {
    let mut handlers = mem::take(&mut entity.core_mut().update_handlers);
    for handler in &mut handlers {
        handler.update(entity, time);
    }
    handlers.append(&mut entity.core_mut().update_handlers);
    entity.core_mut().update_handlers = handlers;
}

/// Run every interaction behavior registered on `entity` against each
/// entity in `others`, in caller order.
///
/// `entity` itself is skipped by identity, so the caller may pass the
/// full interaction snapshot. For each other, every behavior runs in
/// registration order with (live entity, frozen other).
pub fn interact(entity: &mut dyn Entity, others: &[Box<dyn Entity>]) {
    let mut handlers = mem::take(&mut entity.core_mut().interact_handlers);
    for other in others {
        if other.id() == entity.id() {
            continue;
        }
        for handler in &mut handlers {
            handler.interact(entity, other.as_ref());
        }
    }
    handlers.append(&mut entity.core_mut().interact_handlers);
    entity.core_mut().interact_handlers = handlers;
}

/// Run every post-tick observer registered on `entity`, in registration
/// order.
pub fn notify_observers(entity: &mut dyn Entity) {
    let mut observers = mem::take(&mut entity.core_mut().observers);
    for observer in &mut observers {
        observer.on_step(&*entity);
    }
    observers.append(&mut entity.core_mut().observers);
    entity.core_mut().observers = observers;
}
