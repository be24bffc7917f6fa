//! Landmark observations and the observation likelihood model.
//!
//! An observation is a single landmark sighting expressed in the vehicle's
//! body frame. Before it can be scored it is transformed into the map frame
//! using a particle's pose hypothesis, then associated to the nearest
//! in-range map landmark. The likelihood of the (observation, landmark) pair
//! is an axis-independent bivariate Gaussian density.

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use crate::distance;
use crate::map::Landmark;
use crate::Pose;

/// A landmark sighting.
///
/// `x`/`y` are in whichever frame the observation currently lives in: the
/// vehicle body frame as produced by the sensor, or the map frame after
/// [`transform_to_map_frame`]. `landmark_id` starts unset and is written by
/// [`data_association`]; it stays `None` when no candidate landmark was in
/// range, and downstream weighting must handle that case explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    /// Id of the associated map landmark, once association has run
    pub landmark_id: Option<i32>,
}

impl Observation {
    /// A fresh, unassociated sighting.
    pub fn new(x: f64, y: f64) -> Observation {
        Observation {
            x,
            y,
            landmark_id: None,
        }
    }
}

/// Transform a body-frame observation into the map frame using a pose
/// hypothesis (standard 2D rigid transform: rotate by theta, translate by the
/// pose position). The association id is preserved.
pub fn transform_to_map_frame(pose: &Pose, observation: &Observation) -> Observation {
    let rotated = Rotation2::new(pose.theta) * Vector2::new(observation.x, observation.y);
    Observation {
        x: pose.x + rotated.x,
        y: pose.y + rotated.y,
        landmark_id: observation.landmark_id,
    }
}

/// Associate each map-frame observation with the nearest candidate landmark.
///
/// Candidates must already be filtered to sensor range and must be in a
/// stable order (the map keeps file order); distance ties go to the first
/// candidate encountered, which makes the assignment deterministic. An empty
/// candidate set leaves the observation's `landmark_id` as `None` rather than
/// matching an arbitrary landmark.
///
/// Runs in O(observations × candidates) per call, and the engine calls it
/// once per particle.
pub fn data_association(candidates: &[Landmark], observations: &mut [Observation]) {
    for observation in observations.iter_mut() {
        let mut nearest: Option<(i32, f64)> = None;
        for candidate in candidates {
            let separation = distance(observation.x, observation.y, candidate.x, candidate.y);
            match nearest {
                Some((_, best)) if separation >= best => {}
                _ => nearest = Some((candidate.id, separation)),
            }
        }
        observation.landmark_id = nearest.map(|(id, _)| id);
    }
}

/// Axis-independent bivariate Gaussian density of the point (`x`, `y`) about
/// the mean (`mean_x`, `mean_y`).
///
/// The peak value, attained when the point sits exactly on the mean, is
/// 1 / (2π·σx·σy).
pub fn gaussian_2d(x: f64, y: f64, mean_x: f64, mean_y: f64, std_x: f64, std_y: f64) -> f64 {
    let exponent = (x - mean_x).powi(2) / (2.0 * std_x.powi(2))
        + (y - mean_y).powi(2) / (2.0 * std_y.powi(2));
    (-exponent).exp() / (2.0 * std::f64::consts::PI * std_x * std_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_transform_identity_pose_translates_only() {
        let pose = Pose::new(4.0, 5.0, 0.0);
        let observation = Observation::new(2.0, 2.0);

        let mapped = transform_to_map_frame(&pose, &observation);
        assert_approx_eq!(mapped.x, 6.0, 1e-12);
        assert_approx_eq!(mapped.y, 7.0, 1e-12);
    }

    #[test]
    fn test_transform_quarter_turn() {
        // Heading π/2: body-frame forward points along map +y.
        let pose = Pose::new(1.0, 1.0, FRAC_PI_2);
        let observation = Observation::new(2.0, 0.0);

        let mapped = transform_to_map_frame(&pose, &observation);
        assert_approx_eq!(mapped.x, 1.0, 1e-12);
        assert_approx_eq!(mapped.y, 3.0, 1e-12);
    }

    #[test]
    fn test_transform_half_turn() {
        let pose = Pose::new(0.0, 0.0, PI);
        let observation = Observation::new(1.0, -2.0);

        let mapped = transform_to_map_frame(&pose, &observation);
        assert_approx_eq!(mapped.x, -1.0, 1e-12);
        assert_approx_eq!(mapped.y, 2.0, 1e-12);
    }

    #[test]
    fn test_association_picks_nearest() {
        let candidates = vec![
            Landmark { id: 1, x: 0.0, y: 0.0 },
            Landmark { id: 2, x: 10.0, y: 10.0 },
        ];
        let mut observations = vec![Observation::new(1.0, 1.0)];

        data_association(&candidates, &mut observations);
        assert_eq!(observations[0].landmark_id, Some(1));
    }

    #[test]
    fn test_association_tie_goes_to_first_candidate() {
        let candidates = vec![
            Landmark { id: 5, x: -1.0, y: 0.0 },
            Landmark { id: 6, x: 1.0, y: 0.0 },
        ];
        let mut observations = vec![Observation::new(0.0, 0.0)];

        data_association(&candidates, &mut observations);
        assert_eq!(observations[0].landmark_id, Some(5));
    }

    #[test]
    fn test_association_empty_candidates_leaves_unresolved() {
        let mut observations = vec![Observation::new(3.0, 3.0)];
        data_association(&[], &mut observations);
        assert_eq!(observations[0].landmark_id, None);
    }

    #[test]
    fn test_association_is_per_observation() {
        let candidates = vec![
            Landmark { id: 1, x: 0.0, y: 0.0 },
            Landmark { id: 2, x: 10.0, y: 0.0 },
        ];
        let mut observations = vec![Observation::new(2.0, 0.0), Observation::new(9.0, 1.0)];

        data_association(&candidates, &mut observations);
        assert_eq!(observations[0].landmark_id, Some(1));
        assert_eq!(observations[1].landmark_id, Some(2));
    }

    #[test]
    fn test_gaussian_2d_peak() {
        let peak = gaussian_2d(5.0, 3.0, 5.0, 3.0, 0.3, 0.3);
        assert_approx_eq!(peak, 1.0 / (2.0 * PI * 0.3 * 0.3), 1e-12);
    }

    #[test]
    fn test_gaussian_2d_decays_off_mean() {
        let peak = gaussian_2d(0.0, 0.0, 0.0, 0.0, 0.5, 0.5);
        let off = gaussian_2d(0.5, 0.0, 0.0, 0.0, 0.5, 0.5);
        assert!(off < peak);
        assert_approx_eq!(off, peak * (-0.5f64).exp(), 1e-12);
    }
}
