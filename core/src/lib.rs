//! Landmark-based Monte Carlo localization toolbox
//!
//! This crate provides a particle filter that estimates the 2D pose (x, y,
//! heading) of a ground vehicle by fusing noisy relative landmark sightings
//! against a known map. The filter is implemented as a struct that owns its
//! particle set and random number generator and is driven one cycle at a time
//! by an external caller: initialize from a GPS-like prior, then per timestep
//! predict with the commanded controls, update importance weights against the
//! current observations, resample, and report a best-estimate pose.
//!
//! This crate is primarily built off of three additional dependencies:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): Provides the linear algebra tools for frame transforms.
//! - [`rand`](https://crates.io/crates/rand) and [`rand_distr`](https://crates.io/crates/rand_distr): Provides random number generation for initialization, process noise, and resampling.
//!
//! All other functionality is built on top of these crates or is auxiliary
//! functionality (e.g. I/O). The filter itself is single-threaded and never
//! blocks; callers that need bounded cycle latency bound the particle count,
//! since the cost of a cycle is linear in particles, observations, and
//! in-range landmarks.
//!
//! ## Crate overview
//!
//! This crate is organized into several modules:
//! - [filter]: The localization engine itself (initialization, motion prediction, weighting, resampling, estimate extraction).
//! - [map]: The known landmark map and its plain-text loader.
//! - [measurements]: Landmark observations, frame transforms, data association, and the observation likelihood model.
//! - [messages]: Message shapes for the telemetry transport boundary.
//! - [particle]: The particle state type and resampling index sampler.
//! - [sim]: Replay utilities for running recorded telemetry through the filter.
//!
//! ## Coordinate and state definitions
//!
//! The state vector is the planar pose
//!
//! $$ x = [p_x, p_y, \theta] $$
//!
//! where $p_x$ and $p_y$ are map-frame positions in meters and $\theta$ is
//! the heading in radians, stored wrapped to [0, 2π). Observations arrive in
//! the vehicle's body frame (x forward, y left) and are rotated/translated
//! into the map frame by each particle's pose hypothesis before association.
//! Heading is wrapped after every additive update; the trigonometry would
//! tolerate an unwrapped angle, but the stored state would drift without
//! bound and become uninterpretable.

pub mod filter;
pub mod map;
pub mod measurements;
pub mod messages;
pub mod particle;
pub mod sim;

use serde::{Deserialize, Serialize};

/// A planar vehicle pose: map-frame position in meters and heading in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Map-frame x position (m)
    pub x: f64,
    /// Map-frame y position (m)
    pub y: f64,
    /// Heading (rad), wrapped to [0, 2π) wherever the filter writes it
    pub theta: f64,
}

impl Pose {
    /// Create a new pose. The heading is stored as given; the filter wraps
    /// headings whenever it updates them.
    pub fn new(x: f64, y: f64, theta: f64) -> Pose {
        Pose { x, y, theta }
    }
}

/// Per-axis standard deviations for a pose: (x, y, theta).
///
/// Used both for the GPS-like initialization prior and for the motion model
/// process noise. A named record rather than a positional triple so the axis
/// order cannot be confused at a call site.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseStdDev {
    /// Standard deviation of x (m)
    pub x: f64,
    /// Standard deviation of y (m)
    pub y: f64,
    /// Standard deviation of heading (rad)
    pub theta: f64,
}

impl PoseStdDev {
    pub fn new(x: f64, y: f64, theta: f64) -> PoseStdDev {
        PoseStdDev { x, y, theta }
    }
}

/// Per-axis standard deviations for a landmark measurement: (x, y).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementStdDev {
    /// Standard deviation of the measured x offset (m)
    pub x: f64,
    /// Standard deviation of the measured y offset (m)
    pub y: f64,
}

impl MeasurementStdDev {
    pub fn new(x: f64, y: f64) -> MeasurementStdDev {
        MeasurementStdDev { x, y }
    }
}

/// Wrap an angle to the range [0, 2π).
///
/// # Arguments
/// * `angle` - The angle to be wrapped, in radians.
///
/// # Returns
/// * The equivalent angle in [0, 2π).
///
/// # Example
/// ```rust
/// use mcl::wrap_to_2pi;
/// use std::f64::consts::PI;
///
/// let wrapped = wrap_to_2pi(-PI);
/// assert!((wrapped - PI).abs() < 1e-12);
/// ```
pub fn wrap_to_2pi(angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut wrapped = angle;
    while wrapped >= two_pi {
        wrapped -= two_pi;
    }
    while wrapped < 0.0 {
        wrapped += two_pi;
    }
    wrapped
}

/// Absolute separation between two headings, folded to [0, π].
///
/// Headings 0.1 and 2π − 0.1 are 0.2 rad apart, not 2π − 0.2; this helper
/// always reports the short way around the circle.
///
/// # Example
/// ```rust
/// use mcl::heading_error;
/// use std::f64::consts::PI;
///
/// let err = heading_error(0.1, 2.0 * PI - 0.1);
/// assert!((err - 0.2).abs() < 1e-12);
/// ```
pub fn heading_error(a: f64, b: f64) -> f64 {
    let mut error = (a - b).abs() % (2.0 * std::f64::consts::PI);
    if error > std::f64::consts::PI {
        error = 2.0 * std::f64::consts::PI - error;
    }
    error
}

/// Euclidean distance between two planar points.
///
/// # Example
/// ```rust
/// use mcl::distance;
///
/// assert_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0);
/// ```
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}
