//! Message shapes at the telemetry transport boundary.
//!
//! The request/response pump that talks to a driving simulator lives outside
//! this crate; these are the decoded shapes it hands across the boundary. An
//! inbound [`Telemetry`] carries the measured pose estimate, the previously
//! commanded controls, and the observation set; the outbound [`Estimate`]
//! carries the best pose plus the association diagnostics. Field names match
//! the wire protocol, and observation lists travel as space-joined text
//! fields as the wire format requires.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::measurements::Observation;
use crate::particle::AssociationTrace;
use crate::Pose;

/// Errors decoding the space-joined list fields of a message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("malformed value '{text}' in float list: {source}")]
    MalformedFloatList {
        text: String,
        source: std::num::ParseFloatError,
    },
    #[error("observation coordinate lists differ in length ({x_len} x values, {y_len} y values)")]
    LengthMismatch { x_len: usize, y_len: usize },
}

/// One inbound telemetry message: GPS-like pose estimate, the controls
/// commanded over the previous interval, and the current landmark sightings
/// in the vehicle frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Telemetry {
    /// Measured x position estimate (m)
    pub sense_x: f64,
    /// Measured y position estimate (m)
    pub sense_y: f64,
    /// Measured heading estimate (rad)
    pub sense_theta: f64,
    /// Linear velocity commanded over the previous interval (m/s)
    pub previous_velocity: f64,
    /// Yaw rate commanded over the previous interval (rad/s)
    pub previous_yawrate: f64,
    /// Space-joined vehicle-frame x coordinates of the sightings
    pub sense_observations_x: String,
    /// Space-joined vehicle-frame y coordinates of the sightings
    pub sense_observations_y: String,
}

impl Telemetry {
    /// The measured pose carried by this message.
    pub fn pose_estimate(&self) -> Pose {
        Pose::new(self.sense_x, self.sense_y, self.sense_theta)
    }

    /// Decode the observation list fields.
    pub fn observations(&self) -> Result<Vec<Observation>, MessageError> {
        observations_from_lists(&self.sense_observations_x, &self.sense_observations_y)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Telemetry> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One outbound estimate message: the best particle's pose and its
/// association diagnostics as space-joined text fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Estimate {
    pub best_particle_x: f64,
    pub best_particle_y: f64,
    pub best_particle_theta: f64,
    /// Space-joined matched landmark ids
    pub best_particle_associations: String,
    /// Space-joined map-frame x of the matched sightings
    pub best_particle_sense_x: String,
    /// Space-joined map-frame y of the matched sightings
    pub best_particle_sense_y: String,
}

impl Estimate {
    /// Package a best-estimate pose and its trace for the wire.
    pub fn new(pose: &Pose, trace: &AssociationTrace) -> Estimate {
        Estimate {
            best_particle_x: pose.x,
            best_particle_y: pose.y,
            best_particle_theta: pose.theta,
            best_particle_associations: join_values(&trace.landmark_ids),
            best_particle_sense_x: join_values(&trace.sense_x),
            best_particle_sense_y: join_values(&trace.sense_y),
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Estimate> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Join values into a space-separated text field.
pub fn join_values<T: Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(" ")
}

/// Parse a space-separated list of floats. Whitespace runs are tolerated; any
/// non-numeric token fails the whole field.
pub fn parse_float_list(text: &str) -> Result<Vec<f64>, MessageError> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|source| MessageError::MalformedFloatList {
                    text: token.to_string(),
                    source,
                })
        })
        .collect()
}

/// Build vehicle-frame observations from paired space-joined coordinate
/// fields. The lists must be the same length.
pub fn observations_from_lists(
    x_list: &str,
    y_list: &str,
) -> Result<Vec<Observation>, MessageError> {
    let xs = parse_float_list(x_list)?;
    let ys = parse_float_list(y_list)?;
    if xs.len() != ys.len() {
        return Err(MessageError::LengthMismatch {
            x_len: xs.len(),
            y_len: ys.len(),
        });
    }
    Ok(xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Observation::new(x, y))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_parse_float_list() {
        let values = parse_float_list("1.5 -2.25  3").unwrap();
        assert_eq!(values, vec![1.5, -2.25, 3.0]);
        assert!(parse_float_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_float_list_rejects_garbage() {
        let result = parse_float_list("1.0 two 3.0");
        assert!(matches!(
            result,
            Err(MessageError::MalformedFloatList { ref text, .. }) if text == "two"
        ));
    }

    #[test]
    fn test_join_values_round_trips() {
        let joined = join_values(&[1.5, -2.25, 3.0]);
        assert_eq!(joined, "1.5 -2.25 3");
        assert_eq!(parse_float_list(&joined).unwrap(), vec![1.5, -2.25, 3.0]);
    }

    #[test]
    fn test_observations_from_lists() {
        let observations = observations_from_lists("1.0 2.0", "-1.0 0.5").unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0], Observation::new(1.0, -1.0));
        assert_eq!(observations[1], Observation::new(2.0, 0.5));
    }

    #[test]
    fn test_observations_length_mismatch() {
        let result = observations_from_lists("1.0 2.0", "-1.0");
        assert!(matches!(
            result,
            Err(MessageError::LengthMismatch { x_len: 2, y_len: 1 })
        ));
    }

    #[test]
    fn test_telemetry_decodes_from_wire_json() {
        let text = r#"{
            "sense_x": 6.2785,
            "sense_y": 1.9598,
            "sense_theta": 0.0,
            "previous_velocity": 4.8,
            "previous_yawrate": 0.01,
            "sense_observations_x": "2.0 9.5",
            "sense_observations_y": "1.1 -0.4"
        }"#;
        let telemetry = Telemetry::from_json(text).unwrap();

        assert_approx_eq!(telemetry.pose_estimate().x, 6.2785, 1e-12);
        let observations = telemetry.observations().unwrap();
        assert_eq!(observations.len(), 2);
        assert_approx_eq!(observations[1].y, -0.4, 1e-12);
    }

    #[test]
    fn test_estimate_packs_trace() {
        let mut trace = AssociationTrace::default();
        trace.push(1, 5.0, 3.0);
        trace.push(4, 2.5, -1.0);
        let estimate = Estimate::new(&Pose::new(6.0, 2.0, 0.1), &trace);

        assert_eq!(estimate.best_particle_associations, "1 4");
        assert_eq!(estimate.best_particle_sense_x, "5 2.5");
        assert_eq!(estimate.best_particle_sense_y, "3 -1");

        let decoded = Estimate::from_json(&estimate.to_json().unwrap()).unwrap();
        assert_approx_eq!(decoded.best_particle_x, 6.0, 1e-12);
        assert_eq!(decoded.best_particle_associations, "1 4");
    }
}
