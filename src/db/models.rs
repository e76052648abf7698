//! Diesel models
//!
//! Every table has a natural key, so one struct serves for both insertion
//! and loading. Key structs ([`SessionKey`], [`ConditionKey`]) identify rows
//! further down the ownership hierarchy.

use crate::schema::*;
use crate::stimulus::{Grating, MovieClass, Stimulus, TaskCondition};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;

// ============================================================================
// Keys
// ============================================================================

/// Primary key of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionKey {
    pub animal_id: i32,
    pub session_id: i16,
}

impl SessionKey {
    pub fn new(animal_id: i32, session_id: i16) -> Self {
        Self { animal_id, session_id }
    }

    pub fn condition(self, cond_idx: i16) -> ConditionKey {
        ConditionKey {
            animal_id: self.animal_id,
            session_id: self.session_id,
            cond_idx,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "animal {} session {}", self.animal_id, self.session_id)
    }
}

/// Primary key of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConditionKey {
    pub animal_id: i32,
    pub session_id: i16,
    pub cond_idx: i16,
}

impl ConditionKey {
    pub fn session(&self) -> SessionKey {
        SessionKey::new(self.animal_id, self.session_id)
    }

    pub(crate) fn as_tuple(&self) -> (i32, i16, i16) {
        (self.animal_id, self.session_id, self.cond_idx)
    }
}

impl std::fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} condition {}", self.session(), self.cond_idx)
    }
}

// ============================================================================
// Calibration
// ============================================================================

/// Liquid delivery calibration for one probe, at most one per day
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = liquid_calibration)]
pub struct LiquidCalibration {
    pub setup: String,
    pub probe: i32,
    pub date: NaiveDate,
}

/// One point of a calibration curve
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = liquid_calibration_pulse_weight)]
pub struct PulseWeight {
    pub setup: String,
    pub probe: i32,
    pub date: NaiveDate,
    /// Pulse duration in ms
    pub pulse_dur: i32,
    /// Number of pulses delivered
    pub pulse_num: i32,
    /// Total liquid released, in grams
    pub weight: f64,
}

/// Calibration measurement before it is attached to a calibration session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseSample {
    pub pulse_dur: i32,
    pub pulse_num: i32,
    pub weight: f64,
}

impl PulseSample {
    pub(crate) fn for_calibration(&self, cal: &LiquidCalibration) -> PulseWeight {
        PulseWeight {
            setup: cal.setup.clone(),
            probe: cal.probe,
            date: cal.date,
            pulse_dur: self.pulse_dur,
            pulse_num: self.pulse_num,
            weight: self.weight,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = mouse_weight)]
pub struct MouseWeight {
    pub animal_id: i32,
    pub timestamp: NaiveDateTime,
    /// Grams
    pub weight: f64,
}

// ============================================================================
// Lookups
// ============================================================================

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = experiment_type)]
pub struct ExperimentType {
    pub exp_type: String,
    pub description: String,
}

/// A named bundle of behavioral parameters
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = task)]
pub struct Task {
    pub task_idx: i32,
    pub exp_type: String,
    /// Seconds between trials
    pub intertrial_duration: i32,
    /// Seconds
    pub trial_duration: i32,
    /// Timeout punishment delay in seconds
    pub timeout_duration: i32,
    /// Milliseconds
    pub airpuff_duration: i32,
    /// Time before a new lick counts as a response, in ms
    pub response_interval: i32,
    /// Microliters
    pub reward_amount: i32,
    /// Lickless minutes after which the stimulus pauses
    pub silence_thr: i32,
    /// Serialized list of [`TaskCondition`]
    pub conditions: String,
    pub description: String,
}

impl Task {
    /// A task with the default timing and reward parameters
    pub fn new(task_idx: i32, exp_type: &str, conditions: &[TaskCondition]) -> serde_json::Result<Self> {
        Ok(Self {
            task_idx,
            exp_type: exp_type.to_string(),
            intertrial_duration: 30,
            trial_duration: 30,
            timeout_duration: 180,
            airpuff_duration: 400,
            response_interval: 1000,
            reward_amount: 8,
            silence_thr: 30,
            conditions: TaskCondition::to_json(conditions)?,
            description: String::new(),
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Decode the `conditions` field
    pub fn stimulus_conditions(&self) -> serde_json::Result<Vec<TaskCondition>> {
        TaskCondition::parse_list(&self.conditions)
    }
}

/// Default ffmpeg arguments for cutting clips
pub const DEFAULT_CODEC: &str = "-c:v libx264 -preset slow -crf 5";

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = movie)]
pub struct Movie {
    /// Short title, at most 8 characters
    pub movie_name: String,
    pub path: String,
    /// One of [`MovieClass`]; stored as text
    pub movie_class: String,
    pub original_file: String,
    /// Filename template with full path
    pub file_template: String,
    /// Duration of each file in seconds (all files equal)
    pub file_duration: f64,
    pub codec: String,
    /// Full movie title
    pub movie_description: String,
}

impl Movie {
    pub fn class(&self) -> Option<MovieClass> {
        self.movie_class.parse().ok()
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = movie_still)]
pub struct MovieStill {
    pub movie_name: String,
    pub still_id: i32,
    /// uint8 grayscale frame
    #[serde(skip)]
    pub still_frame: Vec<u8>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = movie_clip)]
pub struct MovieClip {
    pub movie_name: String,
    pub clip_number: i32,
    pub file_name: String,
    #[serde(skip)]
    pub clip: Vec<u8>,
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = session)]
pub struct Session {
    pub animal_id: i32,
    pub session_id: i16,
    pub intertrial_duration: i32,
    pub trial_duration: i32,
    pub timeout_duration: i32,
    pub airpuff_duration: i32,
    pub response_interval: i32,
    pub reward_amount: i32,
    /// Computer id
    pub setup: String,
    pub session_tmst: NaiveDateTime,
    pub notes: String,
}

impl Session {
    /// Start a session with the parameters of a task
    pub fn from_task(key: SessionKey, task: &Task, setup: &str, session_tmst: NaiveDateTime) -> Self {
        Self {
            animal_id: key.animal_id,
            session_id: key.session_id,
            intertrial_duration: task.intertrial_duration,
            trial_duration: task.trial_duration,
            timeout_duration: task.timeout_duration,
            airpuff_duration: task.airpuff_duration,
            response_interval: task.response_interval,
            reward_amount: task.reward_amount,
            setup: setup.to_string(),
            session_tmst,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.animal_id, self.session_id)
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[diesel(table_name = condition)]
pub struct Condition {
    pub animal_id: i32,
    pub session_id: i16,
    pub cond_idx: i16,
}

impl Condition {
    pub fn key(&self) -> ConditionKey {
        ConditionKey {
            animal_id: self.animal_id,
            session_id: self.session_id,
            cond_idx: self.cond_idx,
        }
    }
}

impl From<ConditionKey> for Condition {
    fn from(key: ConditionKey) -> Self {
        Self {
            animal_id: key.animal_id,
            session_id: key.session_id,
            cond_idx: key.cond_idx,
        }
    }
}

/// One presentation of a condition
#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[diesel(table_name = trial)]
pub struct Trial {
    pub animal_id: i32,
    pub session_id: i16,
    pub cond_idx: i16,
    pub trial_idx: i16,
    /// ms from session start
    pub start_time: i32,
    /// ms from session start
    pub end_time: i32,
    /// Last flip number in this trial
    pub last_flip_count: i32,
}

impl Trial {
    pub fn new(cond: ConditionKey, trial_idx: i16, start_time: i32, end_time: i32, last_flip_count: i32) -> Self {
        Self {
            animal_id: cond.animal_id,
            session_id: cond.session_id,
            cond_idx: cond.cond_idx,
            trial_idx,
            start_time,
            end_time,
            last_flip_count,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[diesel(table_name = lick)]
pub struct Lick {
    pub animal_id: i32,
    pub session_id: i16,
    /// ms from session start
    pub time: i32,
    pub probe: i32,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[diesel(table_name = liquid_delivery)]
pub struct LiquidDelivery {
    pub animal_id: i32,
    pub session_id: i16,
    pub time: i32,
    pub probe: i32,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[diesel(table_name = airpuff_delivery)]
pub struct AirpuffDelivery {
    pub animal_id: i32,
    pub session_id: i16,
    pub time: i32,
}

// ============================================================================
// Condition subtypes
// ============================================================================

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = movie_clip_cond)]
pub struct MovieClipCond {
    pub animal_id: i32,
    pub session_id: i16,
    pub cond_idx: i16,
    pub movie_name: String,
    pub clip_number: i32,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = grating_cond)]
pub struct GratingCond {
    pub animal_id: i32,
    pub session_id: i16,
    pub cond_idx: i16,
    pub direction: i32,
    pub spatial_period: i32,
    pub temporal_freq: f64,
    pub contrast: i32,
    pub phase: f64,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq)]
#[diesel(table_name = reward_cond)]
pub struct RewardCond {
    pub animal_id: i32,
    pub session_id: i16,
    pub cond_idx: i16,
    pub probe: i32,
}

impl From<MovieClipCond> for Stimulus {
    fn from(row: MovieClipCond) -> Self {
        Stimulus::MovieClip {
            movie_name: row.movie_name,
            clip_number: row.clip_number,
        }
    }
}

impl From<GratingCond> for Stimulus {
    fn from(row: GratingCond) -> Self {
        Stimulus::Grating(Grating {
            direction: row.direction,
            spatial_period: row.spatial_period,
            temporal_freq: row.temporal_freq,
            contrast: row.contrast,
            phase: row.phase,
        })
    }
}

impl From<RewardCond> for Stimulus {
    fn from(row: RewardCond) -> Self {
        Stimulus::Reward { probe: row.probe }
    }
}
