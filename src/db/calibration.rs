//! Reward-delivery calibration and animal weights

use super::models::*;
use super::{Database, DbError, Result};
use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;

impl Database {
    /// Store a calibration session with its pulse measurements atomically
    pub fn insert_calibration(&self, calibration: &LiquidCalibration, pulses: &[PulseSample]) -> Result<()> {
        let mut conn = self.get_conn()?;
        let rows: Vec<PulseWeight> = pulses.iter().map(|p| p.for_calibration(calibration)).collect();

        conn.transaction::<_, DbError, _>(|conn| {
            diesel::insert_into(liquid_calibration::table)
                .values(calibration)
                .execute(conn)?;
            for row in &rows {
                diesel::insert_into(liquid_calibration_pulse_weight::table)
                    .values(row)
                    .execute(conn)?;
            }
            Ok(())
        })?;

        tracing::info!(
            "stored calibration for {} probe {} on {} ({} points)",
            calibration.setup,
            calibration.probe,
            calibration.date,
            rows.len()
        );
        Ok(())
    }

    /// Calibrations of one probe, newest first
    pub fn calibrations(&self, setup: &str, probe: i32) -> Result<Vec<LiquidCalibration>> {
        let mut conn = self.get_conn()?;
        let rows = liquid_calibration::table
            .filter(liquid_calibration::setup.eq(setup))
            .filter(liquid_calibration::probe.eq(probe))
            .order(liquid_calibration::date.desc())
            .load::<LiquidCalibration>(&mut conn)?;
        Ok(rows)
    }

    pub fn latest_calibration(&self, setup: &str, probe: i32) -> Result<Option<LiquidCalibration>> {
        let mut conn = self.get_conn()?;
        let row = liquid_calibration::table
            .filter(liquid_calibration::setup.eq(setup))
            .filter(liquid_calibration::probe.eq(probe))
            .order(liquid_calibration::date.desc())
            .first::<LiquidCalibration>(&mut conn)
            .optional()?;
        Ok(row)
    }

    /// Calibration curve ordered by pulse duration
    pub fn pulse_weights(&self, calibration: &LiquidCalibration) -> Result<Vec<PulseWeight>> {
        let mut conn = self.get_conn()?;
        let rows = liquid_calibration_pulse_weight::table
            .filter(liquid_calibration_pulse_weight::setup.eq(&calibration.setup))
            .filter(liquid_calibration_pulse_weight::probe.eq(calibration.probe))
            .filter(liquid_calibration_pulse_weight::date.eq(calibration.date))
            .order(liquid_calibration_pulse_weight::pulse_dur.asc())
            .load::<PulseWeight>(&mut conn)?;
        Ok(rows)
    }

    // ========================================================================
    // Animal weights
    // ========================================================================

    /// Record an animal's weight; the timestamp defaults to now (UTC)
    pub fn record_weight(&self, animal_id: i32, weight: f64, timestamp: Option<NaiveDateTime>) -> Result<MouseWeight> {
        let mut conn = self.get_conn()?;
        let row = MouseWeight {
            animal_id,
            timestamp: timestamp.unwrap_or_else(|| chrono::Utc::now().naive_utc()),
            weight,
        };

        diesel::insert_into(mouse_weight::table)
            .values(&row)
            .execute(&mut conn)?;
        tracing::debug!("animal {} weighs {}g", animal_id, weight);
        Ok(row)
    }

    /// Weight history of an animal, oldest first
    pub fn weights(&self, animal_id: i32) -> Result<Vec<MouseWeight>> {
        let mut conn = self.get_conn()?;
        let rows = mouse_weight::table
            .filter(mouse_weight::animal_id.eq(animal_id))
            .order(mouse_weight::timestamp.asc())
            .load::<MouseWeight>(&mut conn)?;
        Ok(rows)
    }
}
