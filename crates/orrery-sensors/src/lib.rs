//! Radar-style sensing for orrery.
//!
//! An example of building on the kernel without touching it: the
//! [`radar::Radar`] entity only consumes other entities' kinematics and
//! the kernel's time information. Scanning runs in the interaction
//! phase, so every measurement of a tick observes the same pre-tick
//! snapshot of its targets; held tracks are throttled on refresh and
//! aged out once stale.

/// Radar entity, detector gate chain, and the detection table.
pub mod radar;

/// Re-exports of the radar types.
pub use radar::{DetectGate, Detection, DetectionTable, Detector, Radar};
