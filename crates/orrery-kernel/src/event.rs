use crate::entity::EntityId;

/// What kind of kernel event occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEventKind {
    /// An entity joined the registry.
    Added {
        /// The entity that was attached.
        entity: EntityId,
    },
    /// An entity left the registry.
    Removed {
        /// The entity that was detached.
        entity: EntityId,
    },
    /// A registration was rejected because the identity was already
    /// attached.
    Rejected {
        /// The entity already holding the offered identity.
        entity: EntityId,
    },
    /// A run started after a reset.
    RunStarted,
    /// A run reached its horizon.
    RunCompleted,
    /// A user-defined event.
    Custom {
        /// Label identifying the custom event type.
        label: String,
        /// The entities involved in this custom event.
        entities: Vec<EntityId>,
    },
}

impl SimEventKind {
    /// Whether the given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Added { entity } | Self::Removed { entity } | Self::Rejected { entity } => {
                *entity == id
            }
            Self::RunStarted | Self::RunCompleted => false,
            Self::Custom { entities, .. } => entities.contains(&id),
        }
    }
}

/// A record of something that happened in the environment.
#[derive(Debug, Clone)]
pub struct SimEvent {
    /// Simulated time when the event occurred.
    pub time: f64,
    /// The specific kind of event that occurred.
    pub kind: SimEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl SimEvent {
    /// Create a new event with the given time, kind, and description.
    pub fn new(time: f64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            time,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events during a run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create an event log with the given capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest ones beyond the capacity.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// All events involving the given entity.
    pub fn events_for(&self, id: EntityId) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
