//! Stimulus descriptions
//!
//! A condition is presented as exactly one kind of stimulus. The database
//! stores each kind in its own table; [`Stimulus`] is the single typed view
//! over the three of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default grating contrast (Michelson, 0-100)
pub const DEFAULT_CONTRAST: i32 = 100;

/// Default grating phase in radians
pub const DEFAULT_PHASE: f64 = 0.0;

/// Default reward probe
pub const DEFAULT_REWARD_PROBE: i32 = 0;

/// The stimulus presented for one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stimulus {
    /// A clip cut from a movie in the lookup table
    MovieClip { movie_name: String, clip_number: i32 },
    /// A drifting orientation grating
    Grating(Grating),
    /// Liquid reward on a probe with no visual stimulus
    Reward { probe: i32 },
}

impl Stimulus {
    pub fn movie_clip(movie_name: impl Into<String>, clip_number: i32) -> Self {
        Stimulus::MovieClip {
            movie_name: movie_name.into(),
            clip_number,
        }
    }

    pub fn reward(probe: i32) -> Self {
        Stimulus::Reward { probe }
    }

    /// Reward on the default probe
    pub fn default_reward() -> Self {
        Stimulus::reward(DEFAULT_REWARD_PROBE)
    }

    /// Name of the table the stimulus row lives in
    pub fn table_name(&self) -> &'static str {
        match self {
            Stimulus::MovieClip { .. } => "movie_clip_cond",
            Stimulus::Grating(_) => "grating_cond",
            Stimulus::Reward { .. } => "reward_cond",
        }
    }
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stimulus::MovieClip { movie_name, clip_number } => {
                write!(f, "movie {} clip {}", movie_name, clip_number)
            }
            Stimulus::Grating(g) => write!(
                f,
                "grating {}° {}px/cycle {:.2}Hz contrast {}",
                g.direction, g.spatial_period, g.temporal_freq, g.contrast
            ),
            Stimulus::Reward { probe } => write!(f, "reward probe {}", probe),
        }
    }
}

/// Orientation grating parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grating {
    /// Drift direction in degrees (0-360)
    pub direction: i32,
    /// Pixels per cycle
    pub spatial_period: i32,
    /// Cycles per second
    pub temporal_freq: f64,
    /// Michelson contrast (0-100)
    pub contrast: i32,
    /// Initial phase in radians
    pub phase: f64,
}

impl Grating {
    pub fn new(direction: i32, spatial_period: i32, temporal_freq: f64) -> Self {
        Self {
            direction,
            spatial_period,
            temporal_freq,
            contrast: DEFAULT_CONTRAST,
            phase: DEFAULT_PHASE,
        }
    }

    pub fn with_contrast(mut self, contrast: i32) -> Self {
        self.contrast = contrast;
        self
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }
}

/// Source category of a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovieClass {
    Mousecam,
    Object3d,
    Madmax,
}

impl MovieClass {
    pub const ALL: [MovieClass; 3] = [MovieClass::Mousecam, MovieClass::Object3d, MovieClass::Madmax];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovieClass::Mousecam => "mousecam",
            MovieClass::Object3d => "object3d",
            MovieClass::Madmax => "madmax",
        }
    }
}

impl fmt::Display for MovieClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovieClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovieClass::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown movie class '{}'", s))
    }
}

/// One entry of a task's `conditions` field: which probes, clips and
/// movies to combine when building a session's conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCondition {
    pub probe: Vec<i32>,
    pub clip_number: Vec<i32>,
    pub movie_name: Vec<String>,
}

impl TaskCondition {
    /// Parse a serialized `conditions` field
    pub fn parse_list(text: &str) -> serde_json::Result<Vec<TaskCondition>> {
        serde_json::from_str(text)
    }

    /// Serialize a list of task conditions for storage
    pub fn to_json(conditions: &[TaskCondition]) -> serde_json::Result<String> {
        serde_json::to_string(conditions)
    }
}
