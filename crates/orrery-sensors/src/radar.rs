use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use orrery_kernel::clock::TimeInfo;
use orrery_kernel::entity::{Entity, EntityCore, EntityId, Kinematics};
use orrery_vec::{AngleUnit, DVec3, Polar, to_polar};

/// Default minimum simulated seconds between refreshes of a held track.
const DEFAULT_REFRESH_INTERVAL: f64 = 1.0;
/// Default age in simulated seconds after which a held track is dropped.
const DEFAULT_DROP_AFTER: f64 = 3.0;

/// One held track of a detected target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Simulated time the measurement was last refreshed.
    pub time: f64,
    /// Batch number assigned when the target was first picked up; stable
    /// across refreshes.
    pub batch: u32,
    /// The measured azimuth/elevation/range.
    pub measurement: Polar,
}

/// Held detections per target, with refresh throttling and aging.
///
/// A target already held is refreshed no more often than the refresh
/// interval and keeps its batch number; a target not refreshed within
/// the drop-after window ages out. Either window can be set to zero to
/// disable it.
#[derive(Debug, Clone)]
pub struct DetectionTable {
    entries: HashMap<EntityId, Detection>,
    next_batch: u32,
    refresh_interval: f64,
    drop_after: f64,
}

impl Default for DetectionTable {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_batch: 0,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            drop_after: DEFAULT_DROP_AFTER,
        }
    }
}

impl DetectionTable {
    /// A table with the default refresh and drop windows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum simulated seconds between refreshes (0 disables
    /// throttling).
    pub fn with_refresh_interval(mut self, refresh_interval: f64) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    /// Set the age after which an unrefreshed track is dropped (0
    /// disables aging).
    pub fn with_drop_after(mut self, drop_after: f64) -> Self {
        self.drop_after = drop_after;
        self
    }

    /// Accept a measurement of `target` taken at `now`.
    ///
    /// Ignored when the held entry was refreshed more recently than the
    /// refresh interval. A refresh keeps the original batch number; a
    /// new target takes the next one.
    pub fn accept(&mut self, target: EntityId, measurement: Polar, now: f64) {
        if let Some(held) = self.entries.get_mut(&target) {
            if self.refresh_interval > 0.0 && now - held.time < self.refresh_interval {
                return;
            }
            held.time = now;
            held.measurement = measurement;
        } else {
            self.next_batch += 1;
            self.entries.insert(
                target,
                Detection {
                    time: now,
                    batch: self.next_batch,
                    measurement,
                },
            );
        }
    }

    /// Drop every track not refreshed within the drop-after window.
    pub fn age(&mut self, now: f64) {
        if self.drop_after > 0.0 {
            let drop_after = self.drop_after;
            self.entries.retain(|_, held| now - held.time <= drop_after);
        }
    }

    /// Clear all held tracks and restart batch numbering.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_batch = 0;
    }

    /// The held track for `target`, if any.
    pub fn get(&self, target: EntityId) -> Option<&Detection> {
        self.entries.get(&target)
    }

    /// All held tracks.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Detection)> {
        self.entries.iter().map(|(id, held)| (*id, held))
    }

    /// Number of held tracks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tracks are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Predicate stage deciding whether a target is detectable.
///
/// Gates run in registration order; any gate may reject, so detection
/// conditions compose additively.
pub trait DetectGate: 'static {
    /// Whether the target passes this gate, as seen from `origin`.
    fn admits(&self, origin: DVec3, target: &dyn Entity) -> bool;
}

impl<F> DetectGate for F
where
    F: Fn(DVec3, &dyn Entity) -> bool + 'static,
{
    fn admits(&self, origin: DVec3, target: &dyn Entity) -> bool {
        self(origin, target)
    }
}

/// Measures targets relative to a sensor position: an ordered gate chain
/// followed by an azimuth/elevation/range measurement.
pub struct Detector {
    gates: Vec<Box<dyn DetectGate>>,
    angle_unit: AngleUnit,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("gates", &self.gates.len())
            .field("angle_unit", &self.angle_unit)
            .finish()
    }
}

impl Detector {
    /// A detector that admits any target exposing kinematics and
    /// measures in degrees.
    pub fn new() -> Self {
        let mut detector = Self {
            gates: Vec::new(),
            angle_unit: AngleUnit::Degrees,
        };
        detector.add_gate(positional);
        detector
    }

    /// Report angles in `angle_unit`.
    pub fn with_angle_unit(mut self, angle_unit: AngleUnit) -> Self {
        self.angle_unit = angle_unit;
        self
    }

    /// Append a gate to the chain.
    pub fn add_gate(&mut self, gate: impl DetectGate) {
        self.gates.push(Box::new(gate));
    }

    /// Measure `target` from `origin`, or `None` when any gate rejects
    /// or the target exposes no kinematics.
    pub fn measure(&self, origin: DVec3, target: &dyn Entity) -> Option<Polar> {
        if self.gates.iter().any(|gate| !gate.admits(origin, target)) {
            return None;
        }
        let kinematics = target.kinematics()?;
        Some(to_polar(kinematics.position, origin, self.angle_unit))
    }
}

impl Clone for Detector {
    /// Keeps the angle configuration but restarts from the default gate
    /// chain; cloned detectors live in snapshots, which are read and
    /// never run.
    fn clone(&self) -> Self {
        Self::new().with_angle_unit(self.angle_unit)
    }
}

/// Default gate: the target must expose kinematic state.
fn positional(_origin: DVec3, target: &dyn Entity) -> bool {
    target.kinematics().is_some()
}

/// A radar entity: measures every other active entity each tick and
/// holds aged detection tracks.
///
/// Scanning runs as an interaction behavior, so every measurement of a
/// tick observes the same pre-tick snapshot of its targets; table aging
/// runs as an update behavior.
#[derive(Debug, Clone)]
pub struct Radar {
    core: EntityCore,
    position: DVec3,
    detector: Detector,
    detections: DetectionTable,
}

impl Radar {
    /// Create a radar at the origin with a default detector and table.
    pub fn new(name: impl Into<String>) -> Self {
        let mut core = EntityCore::new(name);
        core.add_interact_handler(scan);
        core.add_update_handler(age);
        Self {
            core,
            position: DVec3::ZERO,
            detector: Detector::new(),
            detections: DetectionTable::new(),
        }
    }

    /// Place the radar.
    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    /// Replace the detector.
    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the detection table (refresh and drop windows).
    pub fn with_table(mut self, detections: DetectionTable) -> Self {
        self.detections = detections;
        self
    }

    /// The radar position.
    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// Currently held detections.
    pub fn detections(&self) -> &DetectionTable {
        &self.detections
    }

    fn scan_target(&mut self, target: &dyn Entity) {
        if let Some(measurement) = self.detector.measure(self.position, target) {
            self.detections
                .accept(target.id(), measurement, self.core.time().now);
        }
    }
}

/// Interaction behavior: measure the (frozen) other entity.
fn scan(entity: &mut dyn Entity, other: &dyn Entity) {
    if let Some(radar) = entity.as_any_mut().downcast_mut::<Radar>() {
        radar.scan_target(other);
    }
}

/// Update behavior: age out stale tracks.
fn age(entity: &mut dyn Entity, time: TimeInfo) {
    if let Some(radar) = entity.as_any_mut().downcast_mut::<Radar>() {
        radar.detections.age(time.now);
    }
}

impl Entity for Radar {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn reset(&mut self) {
        self.detections.reset();
    }

    fn snapshot(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn kinematics(&self) -> Option<Kinematics> {
        Some(Kinematics {
            position: self.position,
            velocity: DVec3::ZERO,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
