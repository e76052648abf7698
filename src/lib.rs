//! behavior-pipeline - schema for behavioral neuroscience experiments
//!
//! Defines the tables a behavior rig writes into: sessions and their stimulus
//! conditions, trials, lick / liquid reward / airpuff events, the movies
//! that stimuli are cut from, animal weights, and calibration curves for the
//! reward valves. The schema lives in an embedded SQLite database managed
//! through Diesel.
//!
//! # Overview
//!
//! Tables form a strict ownership hierarchy: a row's primary key starts with
//! its parent's key. Deleting a session removes its conditions, trials and
//! events with it; deleting a movie removes its clips and stills.
//!
//! Each condition shows exactly one stimulus. The database keeps one table
//! per stimulus kind, and refuses a second stimulus for the same condition.
//! In Rust the stimulus is a single enum, [`Stimulus`].
//!
//! # Quick Start
//!
//! ```no_run
//! use behavior_pipeline::{Database, SessionKey, Session, Stimulus, Trial};
//!
//! let db = Database::open_at("behavior.db")?;
//! let task = db.task(1)?.expect("seeded task");
//!
//! let key = SessionKey::new(42, db.next_session_id(42)?);
//! let now = chrono::Local::now().naive_local();
//! db.insert_session(&Session::from_task(key, &task, "rig-3", now))?;
//!
//! db.insert_condition(key.condition(1), &Stimulus::default_reward())?;
//! db.insert_trial(&Trial::new(key.condition(1), 1, 0, 30_000, 1800))?;
//! db.log_lick(key, 1_250, 0)?;
//! # Ok::<(), behavior_pipeline::DbError>(())
//! ```
//!
//! # Lookup Tables
//!
//! | Table | Seeded rows |
//! |-------|-------------|
//! | experiment_type | Movies, RPMovies, PassiveMovies, Gratings, NoStimulus |
//! | task | 1: 3d object experiment |
//! | movie | none; registered at deployment |
//!
//! # Modules
//!
//! - [`db`]: connection pool, schema creation and per-entity operations
//! - [`schema`]: Diesel table definitions
//! - [`catalog`]: table tiers and the relationship diagram
//! - [`stimulus`]: typed stimulus and task-condition values

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod stimulus;

pub use db::{
    Condition, ConditionKey, Database, ExperimentType, LiquidCalibration, Movie, MovieClip, MouseWeight,
    PulseSample, PulseWeight, Session, SessionDeletion, SessionKey, SessionSummary, Task, Trial,
};
pub use error::{DbError, Result};
pub use stimulus::{Grating, MovieClass, Stimulus, TaskCondition};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is reachable from the crate
    // root.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let key = SessionKey::new(1, 1);
        let _: ConditionKey = key.condition(1);
        let _: Stimulus = Stimulus::reward(0);
        let _: MovieClass = MovieClass::Mousecam;
    }

    #[test]
    fn test_database_accessible() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.experiment_types().unwrap().len(), 5);
    }

    #[test]
    fn test_end_to_end_session() {
        let db = Database::open_in_memory().unwrap();
        let task = db.task(1).unwrap().unwrap();
        let key = SessionKey::new(42, db.next_session_id(42).unwrap());
        let tmst = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        db.insert_session(&Session::from_task(key, &task, "rig-3", tmst)).unwrap();
        db.insert_condition(key.condition(1), &Stimulus::default_reward()).unwrap();
        db.insert_trial(&Trial::new(key.condition(1), 1, 0, 30_000, 1800)).unwrap();
        db.log_lick(key, 1_250, 0).unwrap();

        let summary = db.session_summary(key).unwrap();
        assert_eq!((summary.conditions, summary.trials, summary.licks), (1, 1, 1));
    }
}
