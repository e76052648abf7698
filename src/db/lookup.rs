//! Lookup tables: experiment types, tasks and movies
//!
//! Experiment types and the default task are seeded whenever the schema is
//! loaded. Seeding never overwrites rows that are already present.

use super::models::*;
use super::{Database, DbError, Result};
use crate::schema::*;
use crate::stimulus::TaskCondition;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Seeded experiment types as (exp_type, description)
pub const EXPERIMENT_TYPES: &[(&str, &str)] = &[
    ("Movies", "Typical movies stimulus"),
    ("RPMovies", "Same as Movies but for Raspberry pi"),
    ("PassiveMovies", "Movie presentation uncoupled with the licking behavior"),
    ("Gratings", "Orientation Gratings"),
    ("NoStimulus", "Free water condition with no stimulus"),
];

/// Seeded tasks
pub fn default_tasks() -> serde_json::Result<Vec<Task>> {
    let object_experiment = Task::new(
        1,
        "Movies",
        &[
            TaskCondition {
                probe: vec![0],
                clip_number: (1..3).collect(),
                movie_name: vec!["obj1v4".to_string()],
            },
            TaskCondition {
                probe: vec![1],
                clip_number: (1..3).collect(),
                movie_name: vec!["obj2v4".to_string()],
            },
        ],
    )?
    .with_description("3d object experiment");

    Ok(vec![object_experiment])
}

pub(super) fn seed(conn: &mut SqliteConnection) -> Result<()> {
    let tasks = default_tasks()?;

    conn.transaction::<_, DbError, _>(|conn| {
        let mut inserted = 0;

        for (exp_type, description) in EXPERIMENT_TYPES {
            let row = ExperimentType {
                exp_type: exp_type.to_string(),
                description: description.to_string(),
            };
            inserted += diesel::insert_or_ignore_into(experiment_type::table)
                .values(&row)
                .execute(conn)?;
        }

        for t in &tasks {
            inserted += diesel::insert_or_ignore_into(task::table)
                .values(t)
                .execute(conn)?;
        }

        if inserted > 0 {
            tracing::info!("seeded {} lookup rows", inserted);
        }
        Ok(())
    })
}

impl Database {
    // ========================================================================
    // Experiment types and tasks
    // ========================================================================

    pub fn experiment_types(&self) -> Result<Vec<ExperimentType>> {
        let mut conn = self.get_conn()?;
        let rows = experiment_type::table
            .order(experiment_type::exp_type.asc())
            .load::<ExperimentType>(&mut conn)?;
        Ok(rows)
    }

    /// Register an additional experiment type at deployment
    pub fn insert_experiment_type(&self, row: &ExperimentType) -> Result<()> {
        let mut conn = self.get_conn()?;
        diesel::insert_into(experiment_type::table)
            .values(row)
            .execute(&mut conn)?;
        tracing::debug!("added experiment type {}", row.exp_type);
        Ok(())
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        let mut conn = self.get_conn()?;
        let rows = task::table
            .order(task::task_idx.asc())
            .load::<Task>(&mut conn)?;
        Ok(rows)
    }

    pub fn task(&self, task_idx: i32) -> Result<Option<Task>> {
        let mut conn = self.get_conn()?;
        let row = task::table
            .find(task_idx)
            .first::<Task>(&mut conn)
            .optional()?;
        Ok(row)
    }

    /// Register a task. Its `conditions` must decode as task conditions.
    pub fn insert_task(&self, row: &Task) -> Result<()> {
        row.stimulus_conditions()?;

        let mut conn = self.get_conn()?;
        diesel::insert_into(task::table)
            .values(row)
            .execute(&mut conn)?;
        tracing::debug!("added task {} ({})", row.task_idx, row.exp_type);
        Ok(())
    }

    /// Tasks together with their experiment type's description
    pub fn tasks_with_types(&self) -> Result<Vec<(Task, ExperimentType)>> {
        let mut conn = self.get_conn()?;
        let rows = task::table
            .inner_join(experiment_type::table)
            .order(task::task_idx.asc())
            .select((Task::as_select(), ExperimentType::as_select()))
            .load::<(Task, ExperimentType)>(&mut conn)?;
        Ok(rows)
    }

    // ========================================================================
    // Movies
    // ========================================================================

    pub fn movies(&self) -> Result<Vec<Movie>> {
        let mut conn = self.get_conn()?;
        let rows = movie::table
            .order(movie::movie_name.asc())
            .load::<Movie>(&mut conn)?;
        Ok(rows)
    }

    pub fn movie(&self, movie_name: &str) -> Result<Option<Movie>> {
        let mut conn = self.get_conn()?;
        let row = movie::table
            .find(movie_name)
            .first::<Movie>(&mut conn)
            .optional()?;
        Ok(row)
    }

    pub fn insert_movie(&self, row: &Movie) -> Result<()> {
        let mut conn = self.get_conn()?;
        diesel::insert_into(movie::table)
            .values(row)
            .execute(&mut conn)?;
        tracing::debug!("added movie {}", row.movie_name);
        Ok(())
    }

    pub fn insert_clip(&self, row: &MovieClip) -> Result<()> {
        let mut conn = self.get_conn()?;
        diesel::insert_into(movie_clip::table)
            .values(row)
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn insert_still(&self, row: &MovieStill) -> Result<()> {
        let mut conn = self.get_conn()?;
        diesel::insert_into(movie_still::table)
            .values(row)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Clips of a movie ordered by clip number
    pub fn clips(&self, movie_name: &str) -> Result<Vec<MovieClip>> {
        let mut conn = self.get_conn()?;
        let rows = movie_clip::table
            .filter(movie_clip::movie_name.eq(movie_name))
            .order(movie_clip::clip_number.asc())
            .load::<MovieClip>(&mut conn)?;
        Ok(rows)
    }

    pub fn clip(&self, movie_name: &str, clip_number: i32) -> Result<Option<MovieClip>> {
        let mut conn = self.get_conn()?;
        let row = movie_clip::table
            .find((movie_name, clip_number))
            .first::<MovieClip>(&mut conn)
            .optional()?;
        Ok(row)
    }

    /// Still frames of a movie ordered by id
    pub fn stills(&self, movie_name: &str) -> Result<Vec<MovieStill>> {
        let mut conn = self.get_conn()?;
        let rows = movie_still::table
            .filter(movie_still::movie_name.eq(movie_name))
            .order(movie_still::still_id.asc())
            .load::<MovieStill>(&mut conn)?;
        Ok(rows)
    }

    /// Delete a movie with its clips and stills.
    ///
    /// Fails with a referential-integrity error while any condition still
    /// shows one of its clips.
    pub fn delete_movie(&self, movie_name: &str) -> Result<()> {
        let mut conn = self.get_conn()?;
        let deleted = diesel::delete(movie::table.find(movie_name)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(DbError::NotFound(format!("movie {}", movie_name)));
        }
        tracing::info!("deleted movie {}", movie_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    // ==========================================================================
    // SEED CONTENTS
    // ==========================================================================
    //
    // Lookup rows are reference data: after loading the schema the tables hold
    // exactly the literal rows, no more and no less.
    // ==========================================================================

    #[test]
    fn test_experiment_types_seeded_exactly() {
        let db = db();
        let mut got: Vec<(String, String)> = db
            .experiment_types()
            .unwrap()
            .into_iter()
            .map(|r| (r.exp_type, r.description))
            .collect();
        got.sort();

        let mut expected: Vec<(String, String)> = EXPERIMENT_TYPES
            .iter()
            .map(|(t, d)| (t.to_string(), d.to_string()))
            .collect();
        expected.sort();

        assert_eq!(got, expected);
    }

    #[test]
    fn test_default_task_seeded() {
        let db = db();
        let tasks = db.tasks().unwrap();
        assert_eq!(tasks.len(), 1);

        let task = &tasks[0];
        assert_eq!(task.task_idx, 1);
        assert_eq!(task.exp_type, "Movies");
        assert_eq!(
            (task.intertrial_duration, task.trial_duration, task.timeout_duration),
            (30, 30, 180)
        );
        assert_eq!((task.airpuff_duration, task.response_interval), (400, 1000));
        assert_eq!((task.reward_amount, task.silence_thr), (8, 30));
        assert_eq!(task.description, "3d object experiment");

        let conditions = task.stimulus_conditions().unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].probe, vec![0]);
        assert_eq!(conditions[0].clip_number, vec![1, 2]);
        assert_eq!(conditions[0].movie_name, vec!["obj1v4"]);
        assert_eq!(conditions[1].probe, vec![1]);
        assert_eq!(conditions[1].movie_name, vec!["obj2v4"]);
    }

    #[test]
    fn test_seeding_twice_adds_nothing() {
        let db = db();
        let mut conn = db.get_conn().unwrap();
        seed(&mut conn).unwrap();
        drop(conn);

        assert_eq!(db.experiment_types().unwrap().len(), EXPERIMENT_TYPES.len());
        assert_eq!(db.tasks().unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_rows_reject_updates() {
        let db = db();
        movie(&db, "obj1v4", 0);
        let mut conn = db.get_conn().unwrap();

        let err: DbError = diesel::update(experiment_type::table.find("Movies"))
            .set(experiment_type::description.eq("changed"))
            .execute(&mut conn)
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::AppendOnly(_)), "got {:?}", err);

        let err: DbError = diesel::update(movie::table.find("obj1v4"))
            .set(movie::path.eq("/elsewhere"))
            .execute(&mut conn)
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::AppendOnly(_)), "got {:?}", err);
    }

    // ==========================================================================
    // TASKS
    // ==========================================================================

    #[test]
    fn test_task_requires_experiment_type() {
        let db = db();
        let task = Task::new(2, "Olfaction", &[]).unwrap();
        let err = db.insert_task(&task).unwrap_err();
        assert!(err.is_referential_integrity(), "got {:?}", err);
    }

    #[test]
    fn test_task_rejects_malformed_conditions() {
        let db = db();
        let mut task = Task::new(2, "Gratings", &[]).unwrap();
        task.conditions = "[{'probe': [0]}]".to_string();
        assert!(matches!(db.insert_task(&task), Err(DbError::Serialization(_))));
        assert!(db.task(2).unwrap().is_none());
    }

    #[test]
    fn test_tasks_join_experiment_type() {
        let db = db();
        db.insert_task(&Task::new(2, "Gratings", &[]).unwrap()).unwrap();

        let rows = db.tasks_with_types().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1.description, "Typical movies stimulus");
        assert_eq!(rows[1].0.task_idx, 2);
        assert_eq!(rows[1].1.exp_type, "Gratings");
    }

    #[test]
    fn test_duplicate_experiment_type() {
        let db = db();
        let row = ExperimentType {
            exp_type: "Gratings".to_string(),
            description: String::new(),
        };
        assert!(matches!(db.insert_experiment_type(&row), Err(DbError::Duplicate(_))));
    }

    // ==========================================================================
    // MOVIES
    // ==========================================================================

    #[test]
    fn test_movie_with_clips_and_stills() {
        let db = db();
        movie(&db, "obj1v4", 3);
        db.insert_still(&MovieStill {
            movie_name: "obj1v4".to_string(),
            still_id: 10,
            still_frame: vec![255; 16],
        })
        .unwrap();

        assert_eq!(db.movies().unwrap().len(), 1);
        let clips = db.clips("obj1v4").unwrap();
        assert_eq!(clips.iter().map(|c| c.clip_number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(db.clip("obj1v4", 2).unwrap().unwrap().clip, vec![0, 1, 2, 2]);
        assert_eq!(db.stills("obj1v4").unwrap()[0].still_frame.len(), 16);
    }

    #[test]
    fn test_clip_requires_movie() {
        let db = db();
        let err = db
            .insert_clip(&MovieClip {
                movie_name: "ghost".to_string(),
                clip_number: 1,
                file_name: "ghost_001.mp4".to_string(),
                clip: vec![],
            })
            .unwrap_err();
        assert!(err.is_referential_integrity(), "got {:?}", err);

        let err = db
            .insert_still(&MovieStill {
                movie_name: "ghost".to_string(),
                still_id: 1,
                still_frame: vec![],
            })
            .unwrap_err();
        assert!(err.is_referential_integrity(), "got {:?}", err);
    }

    #[test]
    fn test_movie_checks() {
        let db = db();
        movie(&db, "obj1v4", 0);
        let mut bad = db.movie("obj1v4").unwrap().unwrap();

        bad.movie_name = "toolongname".to_string();
        assert!(matches!(db.insert_movie(&bad), Err(DbError::Constraint(_))));

        bad.movie_name = "cartoon".to_string();
        bad.movie_class = "cartoon".to_string();
        assert!(matches!(db.insert_movie(&bad), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_delete_movie_cascades_to_parts() {
        let db = db();
        movie(&db, "obj2v4", 2);
        db.delete_movie("obj2v4").unwrap();

        assert!(db.movie("obj2v4").unwrap().is_none());
        assert!(db.clips("obj2v4").unwrap().is_empty());
        assert!(matches!(db.delete_movie("obj2v4"), Err(DbError::NotFound(_))));
    }
}
