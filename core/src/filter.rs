//! The Monte Carlo localization engine.
//!
//! [`ParticleFilter`] owns a fixed-size particle set and a seeded random
//! number generator and exposes one method per filter stage: `initialize`
//! from a GPS-like prior, `predict` through the motion model,
//! `update_weights` against the current observations and map, `resample`, and
//! `best_estimate`. The external driver calls exactly one full cycle per
//! telemetry timestep and serializes those calls; nothing in here suspends,
//! retries, or shares state.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::map::Map;
use crate::measurements::{data_association, gaussian_2d, transform_to_map_frame, Observation};
use crate::particle::{wheel_resample, AssociationTrace, Particle};
use crate::{heading_error, wrap_to_2pi, MeasurementStdDev, Pose, PoseStdDev};

/// Weight factor contributed by a sighting with no candidate landmark in
/// range. Punishes the particle hard while keeping the product representable,
/// so a cycle where every particle is blind degrades to a uniform
/// distribution rather than an all-zero one.
const UNMATCHED_LIKELIHOOD: f64 = 1e-30;

/// Errors surfaced by the localization engine.
///
/// Nothing is retried internally; every failure is reported upward for the
/// external driver to decide (skip the cycle, rebuild the filter, abort).
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("particle count must be positive")]
    InvalidParticleCount,
    #[error("time step must be positive, got {0}")]
    InvalidTimeStep(f64),
    #[error("filter is already initialized")]
    AlreadyInitialized,
    #[error("filter has not been initialized")]
    Uninitialized,
    #[error("every particle weight is zero; the weight distribution is degenerate")]
    DegenerateWeights,
}

/// Construction-time filter parameters.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    /// Number of particles, fixed for the lifetime of the filter
    pub num_particles: usize,
    /// Seed for the filter-owned random number generator; a fixed seed
    /// reproduces an entire trajectory draw-for-draw
    pub seed: u64,
    /// Yaw rates at or below this magnitude (rad/s) are treated as
    /// straight-line motion. The same constant guards the `v/ω` division in
    /// the turning branch.
    pub yaw_rate_threshold: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            num_particles: 100,
            seed: 42,
            yaw_rate_threshold: 1e-3,
        }
    }
}

/// Particle filter for landmark-based 2D pose estimation.
///
/// # Example
/// ```rust
/// use mcl::filter::{FilterConfig, ParticleFilter};
/// use mcl::{Pose, PoseStdDev};
///
/// let mut filter = ParticleFilter::new(FilterConfig::default()).unwrap();
/// filter
///     .initialize(&Pose::new(10.0, -4.0, 0.5), &PoseStdDev::new(0.3, 0.3, 0.01))
///     .unwrap();
/// assert!(filter.initialized());
/// assert_eq!(filter.particles().len(), 100);
/// ```
pub struct ParticleFilter {
    config: FilterConfig,
    particles: Vec<Particle>,
    rng: StdRng,
    initialized: bool,
}

impl ParticleFilter {
    /// Create an uninitialized filter.
    ///
    /// # Errors
    /// * `InvalidParticleCount` if the configured particle count is zero.
    pub fn new(config: FilterConfig) -> Result<ParticleFilter, FilterError> {
        if config.num_particles == 0 {
            return Err(FilterError::InvalidParticleCount);
        }
        let rng = StdRng::seed_from_u64(config.seed);
        let particles = Vec::with_capacity(config.num_particles);
        Ok(ParticleFilter {
            config,
            particles,
            rng,
            initialized: false,
        })
    }

    /// Whether `initialize` has been called.
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// The configured particle count.
    pub fn num_particles(&self) -> usize {
        self.config.num_particles
    }

    /// Read-only access to the current particle generation.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Overwrite every particle's weight. Primarily for tests and external
    /// diagnostics; a normal cycle lets `update_weights` set them.
    pub fn set_weights(&mut self, weights: &[f64]) {
        assert_eq!(weights.len(), self.particles.len());
        for (particle, &weight) in self.particles.iter_mut().zip(weights.iter()) {
            particle.weight = weight;
        }
    }

    /// Spread the initial particle generation around a measured prior pose.
    ///
    /// Each particle's x, y, and heading are drawn independently from normal
    /// distributions centered on the prior with the given standard
    /// deviations; every particle starts with weight 1.0 and a sequential id.
    ///
    /// # Errors
    /// * `AlreadyInitialized` if called a second time. Re-running a scenario
    ///   means constructing a fresh filter; silently overwriting an existing
    ///   generation is not supported.
    pub fn initialize(&mut self, prior: &Pose, std: &PoseStdDev) -> Result<(), FilterError> {
        if self.initialized {
            return Err(FilterError::AlreadyInitialized);
        }

        let dist_x = Normal::new(prior.x, std.x).unwrap();
        let dist_y = Normal::new(prior.y, std.y).unwrap();
        let dist_theta = Normal::new(prior.theta, std.theta).unwrap();

        self.particles.clear();
        for id in 0..self.config.num_particles {
            self.particles.push(Particle::new(
                id,
                dist_x.sample(&mut self.rng),
                dist_y.sample(&mut self.rng),
                wrap_to_2pi(dist_theta.sample(&mut self.rng)),
                1.0,
            ));
        }
        self.initialized = true;
        Ok(())
    }

    /// Propagate every particle through the motion model.
    ///
    /// Applies the unicycle model over `delta_t` seconds of the commanded
    /// `velocity` (m/s) and `yaw_rate` (rad/s): a constant-turn-rate arc when
    /// the yaw rate is above the configured threshold, a straight line
    /// otherwise. Each particle then receives its own independent zero-mean
    /// Gaussian perturbation on x, y, and heading, and the heading is wrapped
    /// back to [0, 2π). Particle diversity depends on the noise draws being
    /// per-particle, never shared.
    ///
    /// # Errors
    /// * `Uninitialized` if called before `initialize`.
    /// * `InvalidTimeStep` if `delta_t` is not positive.
    pub fn predict(
        &mut self,
        delta_t: f64,
        velocity: f64,
        yaw_rate: f64,
        std: &PoseStdDev,
    ) -> Result<(), FilterError> {
        if !self.initialized {
            return Err(FilterError::Uninitialized);
        }
        if delta_t <= 0.0 {
            return Err(FilterError::InvalidTimeStep(delta_t));
        }

        let noise_x = Normal::new(0.0, std.x).unwrap();
        let noise_y = Normal::new(0.0, std.y).unwrap();
        let noise_theta = Normal::new(0.0, std.theta).unwrap();

        let turning = yaw_rate.abs() > self.config.yaw_rate_threshold;
        for particle in &mut self.particles {
            if turning {
                let theta_next = particle.theta + yaw_rate * delta_t;
                particle.x += velocity / yaw_rate * (theta_next.sin() - particle.theta.sin());
                particle.y += velocity / yaw_rate * (particle.theta.cos() - theta_next.cos());
                particle.theta = theta_next;
            } else {
                particle.x += velocity * delta_t * particle.theta.cos();
                particle.y += velocity * delta_t * particle.theta.sin();
            }
            particle.x += noise_x.sample(&mut self.rng);
            particle.y += noise_y.sample(&mut self.rng);
            particle.theta = wrap_to_2pi(particle.theta + noise_theta.sample(&mut self.rng));
        }
        Ok(())
    }

    /// Re-weight every particle against the current observation set.
    ///
    /// For each particle: gather the map landmarks within `sensor_range` of
    /// its position, transform the body-frame observations into the map frame
    /// through its pose, associate each to the nearest candidate, and set the
    /// particle's weight to the product over observations of the bivariate
    /// Gaussian density of the mapped sighting about its associated landmark.
    /// A sighting with no candidate in range contributes the fixed
    /// [`UNMATCHED_LIKELIHOOD`] floor instead of silently dropping out of the
    /// product. Each particle's association trace is refreshed as a side
    /// product for external reporting.
    ///
    /// Cost is O(particles × observations × in-range landmarks).
    ///
    /// # Errors
    /// * `Uninitialized` if called before `initialize`.
    /// * `DegenerateWeights` if every particle's weight underflowed to
    ///   exactly zero; resampling over that distribution would be undefined,
    ///   so the condition is surfaced instead of ignored. Weights are left as
    ///   computed so the caller can inspect them.
    pub fn update_weights(
        &mut self,
        sensor_range: f64,
        std: &MeasurementStdDev,
        observations: &[Observation],
        map: &Map,
    ) -> Result<(), FilterError> {
        if !self.initialized {
            return Err(FilterError::Uninitialized);
        }

        let mut total = 0.0;
        for particle in &mut self.particles {
            let candidates = map.within_range(particle.x, particle.y, sensor_range);
            let pose = Pose::new(particle.x, particle.y, particle.theta);
            let mut mapped: Vec<Observation> = observations
                .iter()
                .map(|observation| transform_to_map_frame(&pose, observation))
                .collect();
            data_association(&candidates, &mut mapped);

            let mut weight = 1.0;
            let mut trace = AssociationTrace::default();
            for observation in &mapped {
                match observation.landmark_id {
                    Some(id) => {
                        let landmark = candidates
                            .iter()
                            .find(|candidate| candidate.id == id)
                            .expect("associated id always names a candidate");
                        weight *= gaussian_2d(
                            observation.x,
                            observation.y,
                            landmark.x,
                            landmark.y,
                            std.x,
                            std.y,
                        );
                        trace.push(id, observation.x, observation.y);
                    }
                    None => weight *= UNMATCHED_LIKELIHOOD,
                }
            }
            particle.weight = weight;
            particle.trace = trace;
            total += weight;
        }

        if total == 0.0 {
            return Err(FilterError::DegenerateWeights);
        }
        Ok(())
    }

    /// Replace the particle generation by drawing with the resampling wheel.
    ///
    /// Produces exactly the configured number of particles with multiplicity
    /// approximately proportional to weight. The new generation inherits the
    /// copied particles' weights (the next `update_weights` overwrites them;
    /// no renormalization happens in between) and ids are reassigned by
    /// position.
    ///
    /// # Errors
    /// * `Uninitialized` if called before `initialize`.
    /// * `DegenerateWeights` if no particle has a strictly positive weight.
    pub fn resample(&mut self) -> Result<(), FilterError> {
        if !self.initialized {
            return Err(FilterError::Uninitialized);
        }
        let weights: Vec<f64> = self.particles.iter().map(|p| p.weight).collect();
        if !weights.iter().any(|&w| w > 0.0) {
            return Err(FilterError::DegenerateWeights);
        }

        let indices = wheel_resample(&weights, self.config.num_particles, &mut self.rng);
        let mut next = Vec::with_capacity(self.config.num_particles);
        for (id, &index) in indices.iter().enumerate() {
            let mut particle = self.particles[index].clone();
            particle.id = id;
            next.push(particle);
        }
        self.particles = next;
        Ok(())
    }

    /// The highest-weight particle's pose, with its association trace for
    /// visualization. Weight ties go to the first particle encountered.
    ///
    /// # Errors
    /// * `Uninitialized` if called before `initialize`.
    pub fn best_estimate(&self) -> Result<(Pose, &AssociationTrace), FilterError> {
        if !self.initialized {
            return Err(FilterError::Uninitialized);
        }
        let mut best = &self.particles[0];
        for particle in &self.particles[1..] {
            if particle.weight > best.weight {
                best = particle;
            }
        }
        Ok((Pose::new(best.x, best.y, best.theta), &best.trace))
    }

    /// Weight-averaged pose error against a known ground truth.
    ///
    /// Each particle's error is the root-sum-square of its absolute position
    /// offsets and its heading separation folded to [0, π]. This is an
    /// evaluation helper for tests and scoring runs, not part of the
    /// production estimate.
    ///
    /// # Errors
    /// * `Uninitialized` if called before `initialize`.
    /// * `DegenerateWeights` if the weight total is zero.
    pub fn weighted_error(&self, ground_truth: &Pose) -> Result<f64, FilterError> {
        if !self.initialized {
            return Err(FilterError::Uninitialized);
        }

        let mut total_weight = 0.0;
        let mut accumulated = 0.0;
        for particle in &self.particles {
            let dx = particle.x - ground_truth.x;
            let dy = particle.y - ground_truth.y;
            let dtheta = heading_error(particle.theta, ground_truth.theta);
            let error = (dx.powi(2) + dy.powi(2) + dtheta.powi(2)).sqrt();
            accumulated += particle.weight * error;
            total_weight += particle.weight;
        }

        if total_weight == 0.0 {
            return Err(FilterError::DegenerateWeights);
        }
        Ok(accumulated / total_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Landmark;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    const TWO_PI: f64 = 2.0 * PI;

    fn exact_filter_at(pose: Pose, num_particles: usize) -> ParticleFilter {
        // Zero-std draws collapse every particle onto the prior.
        let mut filter = ParticleFilter::new(FilterConfig {
            num_particles,
            ..FilterConfig::default()
        })
        .unwrap();
        filter
            .initialize(&pose, &PoseStdDev::new(0.0, 0.0, 0.0))
            .unwrap();
        filter
    }

    #[test]
    fn test_zero_particle_count_is_rejected() {
        let result = ParticleFilter::new(FilterConfig {
            num_particles: 0,
            ..FilterConfig::default()
        });
        assert!(matches!(result, Err(FilterError::InvalidParticleCount)));
    }

    #[test]
    fn test_initialize_creates_full_generation() {
        let mut filter = ParticleFilter::new(FilterConfig::default()).unwrap();
        filter
            .initialize(&Pose::new(4.0, -2.0, 1.0), &PoseStdDev::new(0.3, 0.3, 0.01))
            .unwrap();

        assert!(filter.initialized());
        assert_eq!(filter.particles().len(), 100);
        for (index, particle) in filter.particles().iter().enumerate() {
            assert_eq!(particle.id, index);
            assert_eq!(particle.weight, 1.0);
            assert!(particle.theta >= 0.0 && particle.theta < TWO_PI);
        }
    }

    #[test]
    fn test_initialize_sample_mean_tracks_prior() {
        let mut filter = ParticleFilter::new(FilterConfig {
            num_particles: 5000,
            ..FilterConfig::default()
        })
        .unwrap();
        filter
            .initialize(&Pose::new(10.0, -20.0, 1.5), &PoseStdDev::new(0.5, 0.5, 0.05))
            .unwrap();

        let n = filter.particles().len() as f64;
        let mean_x: f64 = filter.particles().iter().map(|p| p.x).sum::<f64>() / n;
        let mean_y: f64 = filter.particles().iter().map(|p| p.y).sum::<f64>() / n;
        // Statistical property; standard error is ~0.007 at this size.
        assert_approx_eq!(mean_x, 10.0, 0.1);
        assert_approx_eq!(mean_y, -20.0, 0.1);
    }

    #[test]
    fn test_reinitialization_is_rejected() {
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 10);
        let result = filter.initialize(&Pose::new(1.0, 1.0, 0.0), &PoseStdDev::new(0.3, 0.3, 0.01));
        assert_eq!(result, Err(FilterError::AlreadyInitialized));
    }

    #[test]
    fn test_predict_before_initialize_fails() {
        let mut filter = ParticleFilter::new(FilterConfig::default()).unwrap();
        let result = filter.predict(0.1, 1.0, 0.0, &PoseStdDev::new(0.0, 0.0, 0.0));
        assert_eq!(result, Err(FilterError::Uninitialized));
    }

    #[test]
    fn test_predict_rejects_nonpositive_time_step() {
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 5);
        let result = filter.predict(0.0, 1.0, 0.0, &PoseStdDev::new(0.0, 0.0, 0.0));
        assert_eq!(result, Err(FilterError::InvalidTimeStep(0.0)));
        let result = filter.predict(-0.1, 1.0, 0.0, &PoseStdDev::new(0.0, 0.0, 0.0));
        assert_eq!(result, Err(FilterError::InvalidTimeStep(-0.1)));
    }

    #[test]
    fn test_predict_straight_line_follows_heading() {
        let mut filter = exact_filter_at(Pose::new(2.0, 3.0, PI / 6.0), 1);
        filter
            .predict(2.0, 3.0, 0.0, &PoseStdDev::new(0.0, 0.0, 0.0))
            .unwrap();

        let particle = &filter.particles()[0];
        assert_approx_eq!(particle.x, 2.0 + 6.0 * (PI / 6.0).cos(), 1e-9);
        assert_approx_eq!(particle.y, 3.0 + 6.0 * (PI / 6.0).sin(), 1e-9);
        assert_approx_eq!(particle.theta, PI / 6.0, 1e-12);
    }

    #[test]
    fn test_predict_turning_follows_arc() {
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 1);
        filter
            .predict(1.0, 1.0, PI / 2.0, &PoseStdDev::new(0.0, 0.0, 0.0))
            .unwrap();

        // v/ω = 2/π; quarter turn from heading 0 ends at (2/π, 2/π, π/2).
        let particle = &filter.particles()[0];
        assert_approx_eq!(particle.x, 2.0 / PI, 1e-9);
        assert_approx_eq!(particle.y, 2.0 / PI, 1e-9);
        assert_approx_eq!(particle.theta, PI / 2.0, 1e-12);
    }

    #[test]
    fn test_predict_is_continuous_at_yaw_rate_threshold() {
        let threshold = FilterConfig::default().yaw_rate_threshold;
        let no_noise = PoseStdDev::new(0.0, 0.0, 0.0);

        let mut straight = exact_filter_at(Pose::new(0.0, 0.0, 0.4), 1);
        straight.predict(0.1, 5.0, 0.0, &no_noise).unwrap();

        let mut near = exact_filter_at(Pose::new(0.0, 0.0, 0.4), 1);
        near.predict(0.1, 5.0, threshold * 1.001, &no_noise).unwrap();

        // At or below the threshold the straight-line branch applies exactly.
        let mut below = exact_filter_at(Pose::new(0.0, 0.0, 0.4), 1);
        below.predict(0.1, 5.0, threshold * 0.9, &no_noise).unwrap();
        let b = &below.particles()[0];
        assert_eq!(b.x, straight.particles()[0].x);
        assert_eq!(b.y, straight.particles()[0].y);
        assert_eq!(b.theta, straight.particles()[0].theta);

        // The arc and straight-line forms differ only by second-order terms
        // in ω·Δt at the threshold boundary.
        let s = &straight.particles()[0];
        let n = &near.particles()[0];
        assert_approx_eq!(s.x, n.x, 1e-4);
        assert_approx_eq!(s.y, n.y, 1e-4);
        assert_approx_eq!(s.theta, n.theta, 1e-3);
    }

    #[test]
    fn test_predict_wraps_heading() {
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 6.0), 1);
        filter
            .predict(1.0, 0.0, 1.0, &PoseStdDev::new(0.0, 0.0, 0.0))
            .unwrap();
        let particle = &filter.particles()[0];
        assert!(particle.theta >= 0.0 && particle.theta < TWO_PI);
        assert_approx_eq!(particle.theta, 7.0 - TWO_PI, 1e-12);
    }

    #[test]
    fn test_predict_noise_is_per_particle() {
        let mut filter = ParticleFilter::new(FilterConfig {
            num_particles: 50,
            ..FilterConfig::default()
        })
        .unwrap();
        filter
            .initialize(&Pose::new(0.0, 0.0, 0.0), &PoseStdDev::new(0.0, 0.0, 0.0))
            .unwrap();
        filter
            .predict(0.1, 0.0, 0.0, &PoseStdDev::new(1.0, 1.0, 0.1))
            .unwrap();

        // Independent draws: particles must not all land on the same point.
        let first = filter.particles()[0].x;
        assert!(filter.particles().iter().any(|p| (p.x - first).abs() > 1e-9));
    }

    #[test]
    fn test_update_weights_peak_density_at_landmark() {
        let mut filter = exact_filter_at(Pose::new(5.0, 3.0, 0.0), 1);
        let map = Map::new(vec![Landmark { id: 1, x: 5.0, y: 3.0 }]);
        let observations = vec![Observation::new(0.0, 0.0)];

        filter
            .update_weights(50.0, &MeasurementStdDev::new(0.3, 0.3), &observations, &map)
            .unwrap();

        let particle = &filter.particles()[0];
        assert_approx_eq!(particle.weight, 1.0 / (TWO_PI * 0.3 * 0.3), 1e-9);
        assert_eq!(particle.trace.landmark_ids, vec![1]);
        assert_approx_eq!(particle.trace.sense_x[0], 5.0, 1e-12);
        assert_approx_eq!(particle.trace.sense_y[0], 3.0, 1e-12);
    }

    #[test]
    fn test_update_weights_before_initialize_fails() {
        let mut filter = ParticleFilter::new(FilterConfig::default()).unwrap();
        let map = Map::new(vec![Landmark { id: 1, x: 0.0, y: 0.0 }]);
        let result =
            filter.update_weights(50.0, &MeasurementStdDev::new(0.3, 0.3), &[], &map);
        assert_eq!(result, Err(FilterError::Uninitialized));
    }

    #[test]
    fn test_update_weights_unmatched_observation_uses_floor() {
        // Landmark well outside sensor range: no candidates, association
        // stays unresolved, and the weight drops to the floor factor.
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 1);
        let map = Map::new(vec![Landmark { id: 1, x: 500.0, y: 500.0 }]);
        let observations = vec![Observation::new(1.0, 0.0)];

        filter
            .update_weights(50.0, &MeasurementStdDev::new(0.3, 0.3), &observations, &map)
            .unwrap();

        let particle = &filter.particles()[0];
        assert_eq!(particle.weight, UNMATCHED_LIKELIHOOD);
        assert!(particle.trace.landmark_ids.is_empty());
    }

    #[test]
    fn test_update_weights_detects_degenerate_distribution() {
        // An in-range candidate paired with an absurdly distant sighting
        // underflows the density to exactly zero for every particle.
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 3);
        let map = Map::new(vec![Landmark { id: 1, x: 0.0, y: 0.0 }]);
        let observations = vec![Observation::new(40.0, 40.0)];

        let result =
            filter.update_weights(50.0, &MeasurementStdDev::new(0.3, 0.3), &observations, &map);
        assert_eq!(result, Err(FilterError::DegenerateWeights));
    }

    #[test]
    fn test_resample_preserves_particle_count() {
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 30);
        let weights: Vec<f64> = (0..30).map(|i| (i + 1) as f64).collect();
        filter.set_weights(&weights);

        filter.resample().unwrap();
        assert_eq!(filter.particles().len(), 30);
        for (index, particle) in filter.particles().iter().enumerate() {
            assert_eq!(particle.id, index);
        }
    }

    #[test]
    fn test_resample_is_deterministic_for_fixed_seed() {
        let build = || {
            let mut filter = ParticleFilter::new(FilterConfig {
                num_particles: 40,
                seed: 7,
                ..FilterConfig::default()
            })
            .unwrap();
            filter
                .initialize(&Pose::new(0.0, 0.0, 0.0), &PoseStdDev::new(1.0, 1.0, 0.1))
                .unwrap();
            let weights: Vec<f64> = (0..40).map(|i| ((i % 5) + 1) as f64).collect();
            filter.set_weights(&weights);
            filter.resample().unwrap();
            filter
                .particles()
                .iter()
                .map(|p| (p.x, p.y))
                .collect::<Vec<_>>()
        };

        assert_eq!(build(), build());
    }

    #[test]
    fn test_resample_rejects_all_zero_weights() {
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 10);
        filter.set_weights(&[0.0; 10]);
        assert_eq!(filter.resample(), Err(FilterError::DegenerateWeights));
    }

    #[test]
    fn test_best_estimate_picks_highest_weight() {
        let mut filter = ParticleFilter::new(FilterConfig {
            num_particles: 3,
            ..FilterConfig::default()
        })
        .unwrap();
        filter
            .initialize(&Pose::new(0.0, 0.0, 0.0), &PoseStdDev::new(2.0, 2.0, 0.1))
            .unwrap();
        filter.set_weights(&[0.1, 0.9, 0.4]);

        let (pose, _) = filter.best_estimate().unwrap();
        let heaviest = &filter.particles()[1];
        assert_eq!(pose, Pose::new(heaviest.x, heaviest.y, heaviest.theta));
    }

    #[test]
    fn test_best_estimate_tie_goes_to_first_particle() {
        let mut filter = ParticleFilter::new(FilterConfig {
            num_particles: 3,
            ..FilterConfig::default()
        })
        .unwrap();
        filter
            .initialize(&Pose::new(0.0, 0.0, 0.0), &PoseStdDev::new(2.0, 2.0, 0.1))
            .unwrap();
        filter.set_weights(&[0.5, 0.5, 0.5]);

        let (pose, _) = filter.best_estimate().unwrap();
        let first = &filter.particles()[0];
        assert_eq!(pose, Pose::new(first.x, first.y, first.theta));
    }

    #[test]
    fn test_best_estimate_before_initialize_fails() {
        let filter = ParticleFilter::new(FilterConfig::default()).unwrap();
        assert_eq!(filter.best_estimate().err(), Some(FilterError::Uninitialized));
    }

    #[test]
    fn test_weighted_error_is_zero_at_exact_truth() {
        let pose = Pose::new(7.0, -1.0, 2.0);
        let filter = exact_filter_at(pose, 25);
        assert_approx_eq!(filter.weighted_error(&pose).unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn test_weighted_error_folds_heading() {
        // Particle heading 0, truth heading 2π − 0.2: error is 0.2, not 2π − 0.2.
        let filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 4);
        let truth = Pose::new(0.0, 0.0, TWO_PI - 0.2);
        assert_approx_eq!(filter.weighted_error(&truth).unwrap(), 0.2, 1e-9);
    }

    #[test]
    fn test_weighted_error_rejects_zero_total_weight() {
        let mut filter = exact_filter_at(Pose::new(0.0, 0.0, 0.0), 4);
        filter.set_weights(&[0.0; 4]);
        assert_eq!(
            filter.weighted_error(&Pose::new(0.0, 0.0, 0.0)),
            Err(FilterError::DegenerateWeights)
        );
    }
}
