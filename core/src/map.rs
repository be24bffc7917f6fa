//! The known landmark map.
//!
//! The map is loaded once at startup, is immutable afterwards, and is shared
//! read-only by every particle during a filter cycle. Landmark order is the
//! file order and is kept stable because data association breaks distance
//! ties in favor of the first candidate encountered.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::distance;

/// A single surveyed landmark in the map frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    /// Landmark id, unique within the map
    pub id: i32,
    /// Map-frame x position (m)
    pub x: f64,
    /// Map-frame y position (m)
    pub y: f64,
}

/// Errors raised while loading a map file.
///
/// Map input is trusted survey data; any malformed content is fatal for the
/// load, never recovered per line.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed landmark on line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("map file contains no landmarks")]
    Empty,
}

/// An ordered, read-only collection of landmarks.
#[derive(Clone, Debug, Default)]
pub struct Map {
    landmarks: Vec<Landmark>,
}

impl Map {
    /// Build a map from landmarks already in hand (tests, synthetic scenarios).
    pub fn new(landmarks: Vec<Landmark>) -> Map {
        Map { landmarks }
    }

    /// Load a map from a plain-text file.
    ///
    /// One landmark per line, three whitespace-separated fields in the
    /// historical field order `x y id` (positions as floating point, id as an
    /// integer). Blank lines are not permitted; a file that yields no
    /// landmarks is an error.
    ///
    /// # Example
    /// ```no_run
    /// use mcl::map::Map;
    ///
    /// let map = Map::from_file("data/map_data.txt").expect("map failed to load");
    /// println!("loaded {} landmarks", map.len());
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Map, MapError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut landmarks = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let number = index + 1;
            let mut fields = line.split_whitespace();

            let x = Self::parse_field(fields.next(), number, "missing x field")?;
            let y = Self::parse_field(fields.next(), number, "missing y field")?;
            let id = match fields.next() {
                Some(field) => field.parse::<i32>().map_err(|e| MapError::Parse {
                    line: number,
                    reason: format!("bad id field '{field}': {e}"),
                })?,
                None => {
                    return Err(MapError::Parse {
                        line: number,
                        reason: "missing id field".to_string(),
                    });
                }
            };
            if fields.next().is_some() {
                return Err(MapError::Parse {
                    line: number,
                    reason: "trailing fields after id".to_string(),
                });
            }
            landmarks.push(Landmark { id, x, y });
        }

        if landmarks.is_empty() {
            return Err(MapError::Empty);
        }
        Ok(Map { landmarks })
    }

    fn parse_field(field: Option<&str>, line: usize, missing: &str) -> Result<f64, MapError> {
        match field {
            Some(text) => text.parse::<f64>().map_err(|e| MapError::Parse {
                line,
                reason: format!("bad coordinate '{text}': {e}"),
            }),
            None => Err(MapError::Parse {
                line,
                reason: missing.to_string(),
            }),
        }
    }

    /// All landmarks in file order.
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Number of landmarks in the map.
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// Whether the map holds no landmarks.
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Landmarks within `range` meters of (`x`, `y`), in file order.
    ///
    /// This is the candidate set for data association; filtering by sensor
    /// range is what keeps the per-cycle association cost tractable.
    pub fn within_range(&self, x: f64, y: f64, range: f64) -> Vec<Landmark> {
        self.landmarks
            .iter()
            .filter(|landmark| distance(x, y, landmark.x, landmark.y) <= range)
            .copied()
            .collect()
    }
}
