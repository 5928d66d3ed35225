//! CSV snapshot logging, the hand-off point to durable storage.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use model::{ShiftAdvice, TelemetrySnapshot};
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

/// One flat row per published snapshot; wheel arrays are spread into
/// FL/FR/RL/RR columns.
#[derive(Serialize)]
struct SnapshotRow<'a> {
    logged_at: String,
    car: &'a str,
    driver: &'a str,
    speed_kmh: f32,
    speed_mph: f32,
    rpm: f32,
    max_rpm: f32,
    gear: i32,
    lap_time_s: f32,
    last_lap_s: f32,
    best_lap_s: f32,
    lap_count: i32,
    fuel_l: f32,
    g_force_total: f32,
    shift_advice: ShiftAdvice,
    abs_active: bool,
    tire_pressure_fl: f32,
    tire_pressure_fr: f32,
    tire_pressure_rl: f32,
    tire_pressure_rr: f32,
    tire_temp_fl: f32,
    tire_temp_fr: f32,
    tire_temp_rl: f32,
    tire_temp_rr: f32,
}

/// Append-only CSV log named after its creation time, one file per run.
pub struct SnapshotLog {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl SnapshotLog {
    /// Creates `telemetry_YYYYMMDD_HHMMSS.csv` under `dir`, creating the
    /// directory if needed.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;

        let stamp_format = format_description!("[year][month][day]_[hour][minute][second]");
        let stamp = OffsetDateTime::now_utc()
            .format(&stamp_format)
            .context("format log timestamp")?;
        let path = dir.join(format!("telemetry_{stamp}.csv"));

        let writer =
            csv::Writer::from_path(&path).with_context(|| format!("open {}", path.display()))?;
        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row and flushes it.
    pub fn append(&mut self, snapshot: &TelemetrySnapshot) -> Result<()> {
        let stamp_format = format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        );
        let row = SnapshotRow {
            logged_at: OffsetDateTime::now_utc()
                .format(&stamp_format)
                .context("format row timestamp")?,
            car: &snapshot.car_name,
            driver: &snapshot.driver_name,
            speed_kmh: snapshot.speed_kmh,
            speed_mph: snapshot.speed_mph,
            rpm: snapshot.rpm,
            max_rpm: snapshot.max_rpm,
            gear: snapshot.gear,
            lap_time_s: snapshot.lap_time_s,
            last_lap_s: snapshot.last_lap_s,
            best_lap_s: snapshot.best_lap_s,
            lap_count: snapshot.lap_count,
            fuel_l: snapshot.fuel_l,
            g_force_total: snapshot.g_force_total,
            shift_advice: snapshot.shift_advice,
            abs_active: snapshot.abs_active,
            tire_pressure_fl: snapshot.tire_pressure[0],
            tire_pressure_fr: snapshot.tire_pressure[1],
            tire_pressure_rl: snapshot.tire_pressure[2],
            tire_pressure_rr: snapshot.tire_pressure[3],
            tire_temp_fl: snapshot.tire_temperature_core[0],
            tire_temp_fr: snapshot.tire_temperature_core[1],
            tire_temp_rl: snapshot.tire_temperature_core[2],
            tire_temp_rr: snapshot.tire_temperature_core[3],
        };
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }
}
