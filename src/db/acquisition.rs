//! Sessions, conditions, trials and behavioral events
//!
//! Everything here hangs off a session. Rows are appended while the
//! experiment runs and only ever leave through [`Database::delete_session`].

use super::models::*;
use super::{Database, DbError, Result};
use crate::schema::*;
use crate::stimulus::Stimulus;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

/// Row counts for everything a session owns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub conditions: i64,
    pub trials: i64,
    pub licks: i64,
    pub liquid_deliveries: i64,
    pub airpuffs: i64,
}

/// What a session deletion removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionDeletion {
    pub key: SessionKey,
    pub removed: SessionSummary,
}

fn summarize(conn: &mut SqliteConnection, key: SessionKey) -> QueryResult<SessionSummary> {
    let (a, s) = (key.animal_id, key.session_id);

    Ok(SessionSummary {
        conditions: condition::table
            .filter(condition::animal_id.eq(a).and(condition::session_id.eq(s)))
            .count()
            .get_result(conn)?,
        trials: trial::table
            .filter(trial::animal_id.eq(a).and(trial::session_id.eq(s)))
            .count()
            .get_result(conn)?,
        licks: lick::table
            .filter(lick::animal_id.eq(a).and(lick::session_id.eq(s)))
            .count()
            .get_result(conn)?,
        liquid_deliveries: liquid_delivery::table
            .filter(liquid_delivery::animal_id.eq(a).and(liquid_delivery::session_id.eq(s)))
            .count()
            .get_result(conn)?,
        airpuffs: airpuff_delivery::table
            .filter(airpuff_delivery::animal_id.eq(a).and(airpuff_delivery::session_id.eq(s)))
            .count()
            .get_result(conn)?,
    })
}

/// Write the subtype row for a condition's stimulus.
///
/// A conflict raised by the exclusivity triggers names the condition and the
/// table that refused it.
fn insert_stimulus(conn: &mut SqliteConnection, key: ConditionKey, stimulus: &Stimulus) -> Result<()> {
    let table = stimulus.table_name();
    tracing::debug!("{}: writing {}", key, table);

    write_stimulus_row(conn, key, stimulus).map_err(|e| match DbError::from(e) {
        DbError::StimulusConflict(msg) => DbError::StimulusConflict(format!("{} into {}: {}", key, table, msg)),
        other => other,
    })
}

fn write_stimulus_row(conn: &mut SqliteConnection, key: ConditionKey, stimulus: &Stimulus) -> QueryResult<()> {
    match stimulus {
        Stimulus::MovieClip { movie_name, clip_number } => {
            let row = MovieClipCond {
                animal_id: key.animal_id,
                session_id: key.session_id,
                cond_idx: key.cond_idx,
                movie_name: movie_name.clone(),
                clip_number: *clip_number,
            };
            diesel::insert_into(movie_clip_cond::table).values(&row).execute(conn)?;
        }
        Stimulus::Grating(g) => {
            let row = GratingCond {
                animal_id: key.animal_id,
                session_id: key.session_id,
                cond_idx: key.cond_idx,
                direction: g.direction,
                spatial_period: g.spatial_period,
                temporal_freq: g.temporal_freq,
                contrast: g.contrast,
                phase: g.phase,
            };
            diesel::insert_into(grating_cond::table).values(&row).execute(conn)?;
        }
        Stimulus::Reward { probe } => {
            let row = RewardCond {
                animal_id: key.animal_id,
                session_id: key.session_id,
                cond_idx: key.cond_idx,
                probe: *probe,
            };
            diesel::insert_into(reward_cond::table).values(&row).execute(conn)?;
        }
    }
    Ok(())
}

impl Database {
    // ========================================================================
    // Sessions
    // ========================================================================

    pub fn insert_session(&self, row: &Session) -> Result<()> {
        let mut conn = self.get_conn()?;
        diesel::insert_into(session::table)
            .values(row)
            .execute(&mut conn)?;
        tracing::info!("started {} on {}", row.key(), row.setup);
        Ok(())
    }

    pub fn session(&self, key: SessionKey) -> Result<Option<Session>> {
        let mut conn = self.get_conn()?;
        let row = session::table
            .find((key.animal_id, key.session_id))
            .first::<Session>(&mut conn)
            .optional()?;
        Ok(row)
    }

    /// Sessions of one animal ordered by session id
    pub fn sessions(&self, animal_id: i32) -> Result<Vec<Session>> {
        let mut conn = self.get_conn()?;
        let rows = session::table
            .filter(session::animal_id.eq(animal_id))
            .order(session::session_id.asc())
            .load::<Session>(&mut conn)?;
        Ok(rows)
    }

    /// The session id the next session of this animal should use
    pub fn next_session_id(&self, animal_id: i32) -> Result<i16> {
        let mut conn = self.get_conn()?;
        let last: Option<i16> = session::table
            .filter(session::animal_id.eq(animal_id))
            .select(diesel::dsl::max(session::session_id))
            .first(&mut conn)?;

        match last {
            None => Ok(1),
            Some(id) => id
                .checked_add(1)
                .ok_or_else(|| DbError::Constraint(format!("animal {} has no session ids left", animal_id))),
        }
    }

    pub fn session_summary(&self, key: SessionKey) -> Result<SessionSummary> {
        let mut conn = self.get_conn()?;
        Ok(summarize(&mut conn, key)?)
    }

    /// Delete a session and, through the cascade, everything it owns
    pub fn delete_session(&self, key: SessionKey) -> Result<SessionDeletion> {
        let mut conn = self.get_conn()?;

        let removed = conn.transaction::<_, DbError, _>(|conn| {
            let removed = summarize(conn, key)?;
            let deleted = diesel::delete(session::table.find((key.animal_id, key.session_id))).execute(conn)?;
            if deleted == 0 {
                return Err(DbError::NotFound(key.to_string()));
            }
            Ok(removed)
        })?;

        tracing::info!(
            "deleted {}: {} conditions, {} trials, {} licks, {} liquid deliveries, {} airpuffs",
            key,
            removed.conditions,
            removed.trials,
            removed.licks,
            removed.liquid_deliveries,
            removed.airpuffs
        );
        Ok(SessionDeletion { key, removed })
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    /// Insert a condition together with its stimulus
    pub fn insert_condition(&self, key: ConditionKey, stimulus: &Stimulus) -> Result<()> {
        let mut conn = self.get_conn()?;

        conn.transaction::<_, DbError, _>(|conn| {
            diesel::insert_into(condition::table)
                .values(&Condition::from(key))
                .execute(conn)?;
            insert_stimulus(conn, key, stimulus)
        })?;

        tracing::debug!("{}: {}", key, stimulus);
        Ok(())
    }

    /// Give an existing condition its stimulus.
    ///
    /// Fails with [`DbError::StimulusConflict`] if the condition already has a
    /// stimulus of another kind, and [`DbError::Duplicate`] for the same kind.
    pub fn attach_stimulus(&self, key: ConditionKey, stimulus: &Stimulus) -> Result<()> {
        let mut conn = self.get_conn()?;
        insert_stimulus(&mut conn, key, stimulus)
    }

    /// Conditions of a session ordered by index
    pub fn conditions(&self, key: SessionKey) -> Result<Vec<Condition>> {
        let mut conn = self.get_conn()?;
        let rows = condition::table
            .filter(condition::animal_id.eq(key.animal_id))
            .filter(condition::session_id.eq(key.session_id))
            .order(condition::cond_idx.asc())
            .load::<Condition>(&mut conn)?;
        Ok(rows)
    }

    /// The stimulus of a condition, if one has been attached
    pub fn stimulus(&self, key: ConditionKey) -> Result<Option<Stimulus>> {
        let mut conn = self.get_conn()?;
        let pk = key.as_tuple();

        if let Some(row) = movie_clip_cond::table.find(pk).first::<MovieClipCond>(&mut conn).optional()? {
            return Ok(Some(row.into()));
        }
        if let Some(row) = grating_cond::table.find(pk).first::<GratingCond>(&mut conn).optional()? {
            return Ok(Some(row.into()));
        }
        let row = reward_cond::table.find(pk).first::<RewardCond>(&mut conn).optional()?;
        Ok(row.map(Stimulus::from))
    }

    // ========================================================================
    // Trials
    // ========================================================================

    pub fn insert_trial(&self, row: &Trial) -> Result<()> {
        let mut conn = self.get_conn()?;
        diesel::insert_into(trial::table)
            .values(row)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Trials of a session ordered by trial index
    pub fn trials(&self, key: SessionKey) -> Result<Vec<Trial>> {
        let mut conn = self.get_conn()?;
        let rows = trial::table
            .filter(trial::animal_id.eq(key.animal_id))
            .filter(trial::session_id.eq(key.session_id))
            .order((trial::trial_idx.asc(), trial::cond_idx.asc()))
            .load::<Trial>(&mut conn)?;
        Ok(rows)
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn log_lick(&self, key: SessionKey, time: i32, probe: i32) -> Result<()> {
        let mut conn = self.get_conn()?;
        let row = Lick {
            animal_id: key.animal_id,
            session_id: key.session_id,
            time,
            probe,
        };
        diesel::insert_into(lick::table).values(&row).execute(&mut conn)?;
        Ok(())
    }

    pub fn log_liquid_delivery(&self, key: SessionKey, time: i32, probe: i32) -> Result<()> {
        let mut conn = self.get_conn()?;
        let row = LiquidDelivery {
            animal_id: key.animal_id,
            session_id: key.session_id,
            time,
            probe,
        };
        diesel::insert_into(liquid_delivery::table).values(&row).execute(&mut conn)?;
        Ok(())
    }

    pub fn log_airpuff(&self, key: SessionKey, time: i32) -> Result<()> {
        let mut conn = self.get_conn()?;
        let row = AirpuffDelivery {
            animal_id: key.animal_id,
            session_id: key.session_id,
            time,
        };
        diesel::insert_into(airpuff_delivery::table).values(&row).execute(&mut conn)?;
        Ok(())
    }

    pub fn licks(&self, key: SessionKey) -> Result<Vec<Lick>> {
        let mut conn = self.get_conn()?;
        let rows = lick::table
            .filter(lick::animal_id.eq(key.animal_id))
            .filter(lick::session_id.eq(key.session_id))
            .order(lick::time.asc())
            .load::<Lick>(&mut conn)?;
        Ok(rows)
    }

    pub fn liquid_deliveries(&self, key: SessionKey) -> Result<Vec<LiquidDelivery>> {
        let mut conn = self.get_conn()?;
        let rows = liquid_delivery::table
            .filter(liquid_delivery::animal_id.eq(key.animal_id))
            .filter(liquid_delivery::session_id.eq(key.session_id))
            .order(liquid_delivery::time.asc())
            .load::<LiquidDelivery>(&mut conn)?;
        Ok(rows)
    }

    pub fn airpuffs(&self, key: SessionKey) -> Result<Vec<AirpuffDelivery>> {
        let mut conn = self.get_conn()?;
        let rows = airpuff_delivery::table
            .filter(airpuff_delivery::animal_id.eq(key.animal_id))
            .filter(airpuff_delivery::session_id.eq(key.session_id))
            .order(airpuff_delivery::time.asc())
            .load::<AirpuffDelivery>(&mut conn)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::stimulus::Grating;

    /// A session with one condition of each kind, two trials, and events
    fn populated(db: &Database) -> SessionKey {
        movie(db, "obj1v4", 2);
        let key = session(db, 11, 1);

        db.insert_condition(key.condition(1), &Stimulus::movie_clip("obj1v4", 1)).unwrap();
        db.insert_condition(key.condition(2), &Stimulus::Grating(Grating::new(90, 40, 2.0))).unwrap();
        db.insert_condition(key.condition(3), &Stimulus::reward(1)).unwrap();

        db.insert_trial(&Trial::new(key.condition(1), 1, 0, 30_000, 1800)).unwrap();
        db.insert_trial(&Trial::new(key.condition(2), 2, 60_000, 90_000, 3600)).unwrap();

        db.log_lick(key, 1200, 0).unwrap();
        db.log_lick(key, 800, 1).unwrap();
        db.log_liquid_delivery(key, 1250, 0).unwrap();
        db.log_airpuff(key, 45_000).unwrap();
        key
    }

    // ==========================================================================
    // REFERENTIAL INTEGRITY
    // ==========================================================================
    //
    // Every dependent row needs its parent. Inserting against a missing key
    // must be refused by the database, not silently stored.
    // ==========================================================================

    #[test]
    fn test_dependents_require_session() {
        let db = db();
        let missing = SessionKey::new(99, 1);

        let results = vec![
            db.insert_condition(missing.condition(1), &Stimulus::reward(0)),
            db.insert_trial(&Trial::new(missing.condition(1), 1, 0, 10, 1)),
            db.log_lick(missing, 10, 0),
            db.log_liquid_delivery(missing, 10, 0),
            db.log_airpuff(missing, 10),
        ];

        for result in results {
            let err = result.unwrap_err();
            assert!(err.is_referential_integrity(), "got {:?}", err);
        }
    }

    #[test]
    fn test_trial_requires_condition() {
        let db = db();
        let key = session(&db, 1, 1);
        let err = db.insert_trial(&Trial::new(key.condition(4), 1, 0, 10, 1)).unwrap_err();
        assert!(err.is_referential_integrity(), "got {:?}", err);
    }

    #[test]
    fn test_stimulus_rows_require_condition() {
        let db = db();
        movie(&db, "obj1v4", 1);
        let key = session(&db, 1, 1).condition(1);

        for stimulus in [
            Stimulus::movie_clip("obj1v4", 1),
            Stimulus::Grating(Grating::new(0, 20, 1.0)),
            Stimulus::reward(0),
        ] {
            let err = db.attach_stimulus(key, &stimulus).unwrap_err();
            assert!(err.is_referential_integrity(), "{}: got {:?}", stimulus, err);
        }
    }

    #[test]
    fn test_movie_clip_condition_requires_clip() {
        let db = db();
        movie(&db, "obj1v4", 1);
        let key = session(&db, 1, 1);

        let err = db.insert_condition(key.condition(1), &Stimulus::movie_clip("obj1v4", 5)).unwrap_err();
        assert!(err.is_referential_integrity(), "got {:?}", err);
        // the condition row rolled back with its stimulus
        assert!(db.conditions(key).unwrap().is_empty());
    }

    #[test]
    fn test_referenced_clip_blocks_movie_deletion() {
        let db = db();
        populated(&db);
        let err = db.delete_movie("obj1v4").unwrap_err();
        assert!(err.is_referential_integrity(), "got {:?}", err);
        assert_eq!(db.clips("obj1v4").unwrap().len(), 2);
    }

    // ==========================================================================
    // STIMULUS EXCLUSIVITY
    // ==========================================================================

    #[test]
    fn test_stimulus_round_trip() {
        let db = db();
        let key = populated(&db);

        assert_eq!(db.stimulus(key.condition(1)).unwrap(), Some(Stimulus::movie_clip("obj1v4", 1)));
        assert_eq!(
            db.stimulus(key.condition(2)).unwrap(),
            Some(Stimulus::Grating(Grating::new(90, 40, 2.0)))
        );
        assert_eq!(db.stimulus(key.condition(3)).unwrap(), Some(Stimulus::reward(1)));
        assert_eq!(db.stimulus(key.condition(4)).unwrap(), None);
    }

    #[test]
    fn test_condition_cannot_take_second_kind() {
        let db = db();
        let key = populated(&db);

        let err = db.attach_stimulus(key.condition(3), &Stimulus::Grating(Grating::new(0, 20, 1.0))).unwrap_err();
        assert!(matches!(err, DbError::StimulusConflict(_)), "got {:?}", err);

        let err = db.attach_stimulus(key.condition(2), &Stimulus::movie_clip("obj1v4", 2)).unwrap_err();
        assert!(matches!(err, DbError::StimulusConflict(_)), "got {:?}", err);

        let err = db.attach_stimulus(key.condition(1), &Stimulus::reward(0)).unwrap_err();
        assert!(matches!(err, DbError::StimulusConflict(_)), "got {:?}", err);

        assert_eq!(db.stimulus(key.condition(3)).unwrap(), Some(Stimulus::reward(1)));
    }

    #[test]
    fn test_stimulus_conflict_names_refusing_table() {
        let db = db();
        let key = populated(&db);

        match db.attach_stimulus(key.condition(3), &Stimulus::Grating(Grating::new(0, 20, 1.0))) {
            Err(DbError::StimulusConflict(msg)) => {
                assert!(msg.contains("grating_cond"), "got {}", msg);
                assert!(msg.contains(&key.condition(3).to_string()), "got {}", msg);
            }
            other => panic!("expected stimulus conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_condition_cannot_take_same_kind_twice() {
        let db = db();
        let key = populated(&db);
        let err = db.attach_stimulus(key.condition(3), &Stimulus::reward(0)).unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)), "got {:?}", err);
    }

    #[test]
    fn test_grating_contrast_range() {
        let db = db();
        let key = session(&db, 1, 1);
        let grating = Grating::new(0, 20, 1.0).with_contrast(140);
        let err = db.insert_condition(key.condition(1), &Stimulus::Grating(grating)).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)), "got {:?}", err);
    }

    // ==========================================================================
    // SESSIONS AND EVENTS
    // ==========================================================================

    #[test]
    fn test_session_lookup_and_next_id() {
        let db = db();
        assert_eq!(db.next_session_id(4).unwrap(), 1);

        session(&db, 4, 1);
        session(&db, 4, 2);
        session(&db, 5, 1);

        assert_eq!(db.next_session_id(4).unwrap(), 3);
        assert_eq!(db.sessions(4).unwrap().len(), 2);
        let s = db.session(SessionKey::new(4, 2)).unwrap().unwrap();
        assert_eq!(s.reward_amount, 8);
        assert_eq!(s.session_tmst, tmst());
        assert!(db.session(SessionKey::new(4, 9)).unwrap().is_none());
    }

    #[test]
    fn test_events_ordered_by_time() {
        let db = db();
        let key = populated(&db);

        let licks = db.licks(key).unwrap();
        assert_eq!(licks.iter().map(|l| l.time).collect::<Vec<_>>(), vec![800, 1200]);
        assert_eq!(licks[0].probe, 1);
        assert_eq!(db.liquid_deliveries(key).unwrap()[0].time, 1250);
        assert_eq!(db.airpuffs(key).unwrap().len(), 1);

        let trials = db.trials(key).unwrap();
        assert_eq!(trials.len(), 2);
        assert_eq!(trials[1].cond_idx, 2);
        assert_eq!(trials[1].last_flip_count, 3600);
    }

    #[test]
    fn test_duplicate_event_time_rejected() {
        let db = db();
        let key = populated(&db);
        assert!(matches!(db.log_lick(key, 800, 0), Err(DbError::Duplicate(_))));
    }

    #[test]
    fn test_events_are_append_only() {
        let db = db();
        let key = populated(&db);
        let mut conn = db.get_conn().unwrap();

        let err: DbError = diesel::update(lick::table.filter(lick::animal_id.eq(key.animal_id)))
            .set(lick::probe.eq(3))
            .execute(&mut conn)
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::AppendOnly(_)), "got {:?}", err);

        let err: DbError = diesel::update(trial::table)
            .set(trial::end_time.eq(0))
            .execute(&mut conn)
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::AppendOnly(_)), "got {:?}", err);
    }

    #[test]
    fn test_session_parameters_are_immutable() {
        let db = db();
        let key = populated(&db);
        let original = db.session(key).unwrap().unwrap();

        let err: DbError = {
            let mut conn = db.get_conn().unwrap();
            diesel::update(session::table.find((key.animal_id, key.session_id)))
                .set(session::reward_amount.eq(original.reward_amount + 90))
                .execute(&mut conn)
                .unwrap_err()
                .into()
        };
        assert!(matches!(err, DbError::AppendOnly(_)), "got {:?}", err);
        assert_eq!(db.session(key).unwrap(), Some(original));
    }

    // ==========================================================================
    // COLUMN LIMITS
    // ==========================================================================

    #[test]
    fn test_session_text_limits() {
        let db = db();
        let task = db.task(1).unwrap().unwrap();

        let long_setup = Session::from_task(SessionKey::new(5, 1), &task, &"x".repeat(300), tmst());
        assert!(matches!(db.insert_session(&long_setup), Err(DbError::Constraint(_))));

        let long_notes =
            Session::from_task(SessionKey::new(5, 1), &task, "rig-1", tmst()).with_notes(&"n".repeat(2100));
        assert!(matches!(db.insert_session(&long_notes), Err(DbError::Constraint(_))));

        assert!(db.sessions(5).unwrap().is_empty());
    }

    #[test]
    fn test_session_summary() {
        let db = db();
        let key = populated(&db);
        assert_eq!(
            db.session_summary(key).unwrap(),
            SessionSummary {
                conditions: 3,
                trials: 2,
                licks: 2,
                liquid_deliveries: 1,
                airpuffs: 1,
            }
        );
    }

    // ==========================================================================
    // CASCADING DELETE
    // ==========================================================================

    #[test]
    fn test_delete_session_cascades() {
        let db = db();
        let key = populated(&db);
        let other = session(&db, 11, 2);
        db.insert_condition(other.condition(1), &Stimulus::reward(0)).unwrap();
        db.log_lick(other, 5, 0).unwrap();

        let deletion = db.delete_session(key).unwrap();
        assert_eq!(deletion.removed.conditions, 3);
        assert_eq!(deletion.removed.trials, 2);

        assert!(db.session(key).unwrap().is_none());
        assert_eq!(db.session_summary(key).unwrap(), SessionSummary::default());
        for idx in 1..=3 {
            assert_eq!(db.stimulus(key.condition(idx)).unwrap(), None);
        }

        // the sibling session and the lookup rows are untouched
        assert_eq!(db.session_summary(other).unwrap().licks, 1);
        assert_eq!(db.stimulus(other.condition(1)).unwrap(), Some(Stimulus::reward(0)));
        assert_eq!(db.clips("obj1v4").unwrap().len(), 2);

        // with no condition left referencing it, the movie can go
        db.delete_movie("obj1v4").unwrap();
    }

    #[test]
    fn test_delete_missing_session() {
        let db = db();
        assert!(matches!(db.delete_session(SessionKey::new(1, 1)), Err(DbError::NotFound(_))));
    }
}
