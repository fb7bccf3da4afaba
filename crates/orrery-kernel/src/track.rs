use orrery_vec::Coord;

/// Tolerance used when comparing a position against a waypoint.
const WAYPOINT_EPS: f64 = 1e-8;

/// A polyline route through space.
///
/// The track remembers which leg (segment between consecutive
/// waypoints) is currently being traversed; [`Track::advance`] consumes
/// travel distance across legs until the budget is spent or the final
/// waypoint is reached. An empty track starts and ends at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Track<V: Coord> {
    waypoints: Vec<V>,
    leg: usize,
}

impl<V: Coord> Default for Track<V> {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            leg: 0,
        }
    }
}

impl<V: Coord> Track<V> {
    /// Create a track through the given waypoints, starting on the first
    /// leg.
    pub fn new(waypoints: impl IntoIterator<Item = V>) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
            leg: 0,
        }
    }

    /// The waypoints, in travel order.
    pub fn waypoints(&self) -> &[V] {
        &self.waypoints
    }

    /// Index of the leg currently being traversed.
    pub fn leg(&self) -> usize {
        self.leg
    }

    /// First waypoint, or the origin when the track is empty.
    pub fn start(&self) -> V {
        self.waypoints.first().copied().unwrap_or(V::ZERO)
    }

    /// Last waypoint, or the origin when the track is empty.
    pub fn end(&self) -> V {
        self.waypoints.last().copied().unwrap_or(V::ZERO)
    }

    /// Rewind to the first leg. Waypoints are untouched.
    pub fn reset(&mut self) {
        self.leg = 0;
    }

    /// Whether no further legs remain.
    pub fn is_over(&self) -> bool {
        self.leg + 1 >= self.waypoints.len()
    }

    /// Move `position` along the polyline, consuming up to `travel` of
    /// path length, and return the new position.
    ///
    /// Legs crossed along the way are snapped onto exactly, so a
    /// traveler lands on the final waypoint rather than overshooting it.
    pub fn advance(&mut self, position: V, travel: f64) -> V {
        let mut current = position;
        let mut remaining = travel;
        while remaining > 0.0 {
            let target = self.target();
            if current.abs_diff_eq(target, WAYPOINT_EPS) {
                break;
            }
            let distance = current.distance(target);
            if remaining <= distance {
                current = current + (target - current) * (remaining / distance);
                break;
            }
            current = target;
            remaining -= distance;
            self.leg += 1;
        }
        current
    }

    /// The waypoint the current leg is headed for; the track end once
    /// the leg index runs off the sequence.
    fn target(&self) -> V {
        self.waypoints
            .get(self.leg + 1)
            .copied()
            .unwrap_or_else(|| self.end())
    }
}
