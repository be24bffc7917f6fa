//! Particle state for the Monte Carlo localization filter.

use std::fmt::{self, Display};

use rand::rngs::StdRng;
use rand::Rng;

/// Diagnostic record of what a particle matched during its last weight
/// update: the associated landmark ids and the corresponding map-frame sensed
/// positions. This exists purely for external introspection/visualization and
/// never feeds back into the algorithm. Sightings that failed to associate
/// are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssociationTrace {
    /// Matched landmark ids, one per resolved observation
    pub landmark_ids: Vec<i32>,
    /// Map-frame x of each resolved observation
    pub sense_x: Vec<f64>,
    /// Map-frame y of each resolved observation
    pub sense_y: Vec<f64>,
}

impl AssociationTrace {
    /// Record one resolved association.
    pub fn push(&mut self, landmark_id: i32, sense_x: f64, sense_y: f64) {
        self.landmark_ids.push(landmark_id);
        self.sense_x.push(sense_x);
        self.sense_y.push(sense_y);
    }
}

/// A single pose hypothesis with an importance weight.
///
/// Ids are sequential within a generation and are reassigned by position when
/// a new generation is drawn; no identity is carried across a resample.
#[derive(Clone, Debug)]
pub struct Particle {
    pub id: usize,
    /// Map-frame x position (m)
    pub x: f64,
    /// Map-frame y position (m)
    pub y: f64,
    /// Heading (rad), wrapped to [0, 2π)
    pub theta: f64,
    /// Non-negative importance weight (unnormalized)
    pub weight: f64,
    /// Diagnostics from the most recent weight update
    pub trace: AssociationTrace,
}

impl Particle {
    pub fn new(id: usize, x: f64, y: f64, theta: f64, weight: f64) -> Particle {
        Particle {
            id,
            x,
            y,
            theta,
            weight,
            trace: AssociationTrace::default(),
        }
    }
}

impl Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("id", &self.id)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("theta", &self.theta)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Draw `num_samples` particle indices with the resampling wheel.
///
/// Starting from a uniformly random index, each step advances a running
/// threshold by a uniform draw in [0, 2·max_weight) and walks forward over
/// the weights (wrapping modulo the particle count) until the threshold falls
/// inside a particle's weight span; that particle's index is emitted. The
/// walk only ever advances, so the whole draw is amortized O(n) rather than
/// the O(n log n) of repeated cumulative-sum searches, and multiplicities
/// come out approximately proportional to relative weight.
///
/// At least one weight must be strictly positive; the caller checks for the
/// degenerate all-zero case before spinning the wheel.
pub fn wheel_resample(weights: &[f64], num_samples: usize, rng: &mut StdRng) -> Vec<usize> {
    let n = weights.len();
    let max_weight = weights.iter().cloned().fold(0.0, f64::max);

    let mut indices = Vec::with_capacity(num_samples);
    let mut index = rng.random_range(0..n);
    let mut beta = 0.0;
    for _ in 0..num_samples {
        beta += rng.random_range(0.0..2.0 * max_weight);
        while beta > weights[index] {
            beta -= weights[index];
            index = (index + 1) % n;
        }
        indices.push(index);
    }
    indices
}
