use std::any::Any;
use std::marker::PhantomData;

use orrery_vec::Coord;

use crate::clock::TimeInfo;
use crate::entity::{Entity, EntityCore, Kinematics};
use crate::handler::UpdateHandler;
use crate::track::Track;

/// Tolerance used when comparing the position against the track end.
const ARRIVAL_EPS: f64 = 1e-8;

/// An entity that follows a [`Track`] at constant speed.
///
/// The motion itself is a registered update behavior, the kernel's
/// worked example of a stateful multi-tick behavior: each tick it
/// consumes `speed * elapsed` of path length, derives the instantaneous
/// velocity from the position delta, and deactivates the entity once the
/// end of the track is reached (unless auto-deactivation is disabled).
#[derive(Debug, Clone)]
pub struct Mover<V: Coord> {
    core: EntityCore,
    track: Track<V>,
    position: V,
    velocity: V,
    speed: f64,
    auto_deactivate: bool,
}

impl<V: Coord> Mover<V> {
    /// Create a mover with no route, unit speed, and auto-deactivation.
    pub fn new(name: impl Into<String>) -> Self {
        let mut core = EntityCore::new(name);
        core.add_update_handler(FollowTrack::<V>(PhantomData));
        Self {
            core,
            track: Track::default(),
            position: V::ZERO,
            velocity: V::ZERO,
            speed: 1.0,
            auto_deactivate: true,
        }
    }

    /// Travel speed in units of distance per simulated second.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Route to follow; the position is placed on the track start.
    pub fn with_waypoints(mut self, waypoints: impl IntoIterator<Item = V>) -> Self {
        self.track = Track::new(waypoints);
        self.position = self.track.start();
        self
    }

    /// Keep the entity active after the track is exhausted.
    pub fn with_auto_deactivate(mut self, auto_deactivate: bool) -> Self {
        self.auto_deactivate = auto_deactivate;
        self
    }

    /// Current position.
    pub fn position(&self) -> V {
        self.position
    }

    /// Instantaneous velocity, derived from the last position delta.
    pub fn velocity(&self) -> V {
        self.velocity
    }

    /// Travel speed.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The route being followed.
    pub fn track(&self) -> &Track<V> {
        &self.track
    }

    fn follow(&mut self, time: TimeInfo) {
        let previous = self.position;
        self.position = self.track.advance(self.position, self.speed * time.elapsed);
        self.velocity = if time.elapsed > 0.0 {
            (self.position - previous) / time.elapsed
        } else {
            V::ZERO
        };
        if self.auto_deactivate && self.position.abs_diff_eq(self.track.end(), ARRIVAL_EPS) {
            self.core.set_active(false);
        }
    }
}

/// Update behavior advancing a [`Mover`] along its track.
struct FollowTrack<V: Coord>(PhantomData<V>);

impl<V: Coord> UpdateHandler for FollowTrack<V> {
    fn update(&mut self, entity: &mut dyn Entity, time: TimeInfo) {
        if let Some(mover) = entity.as_any_mut().downcast_mut::<Mover<V>>() {
            mover.follow(time);
        }
    }
}

impl<V: Coord> Entity for Mover<V> {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn reset(&mut self) {
        self.position = self.track.start();
        self.velocity = V::ZERO;
        self.track.reset();
        self.core.set_active(true);
    }

    fn snapshot(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn kinematics(&self) -> Option<Kinematics> {
        Some(Kinematics {
            position: self.position.to_vec3(),
            velocity: self.velocity.to_vec3(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
