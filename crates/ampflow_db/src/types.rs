//! Row types for the measurement store.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One validated measurement, matching the store schema minus the surrogate id.
///
/// Column names follow the measurement-station export headers (`Name_` is the
/// station's own spelling for the measurement location label).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct MeasurementRecord {
    #[sqlx(rename = "Time")]
    pub time: String,
    #[sqlx(rename = "BarCode")]
    pub bar_code: String,
    #[sqlx(rename = "ModelName")]
    pub model_name: String,
    #[sqlx(rename = "Name_")]
    pub name: String,
    #[sqlx(rename = "Status_V")]
    pub status_v: String,
    #[sqlx(rename = "V_Current")]
    pub v_current: f64,
    #[sqlx(rename = "V_Min")]
    pub v_min: f64,
    #[sqlx(rename = "V_Max")]
    pub v_max: f64,
    #[sqlx(rename = "Status_A")]
    pub status_a: String,
    #[sqlx(rename = "A_Current")]
    pub a_current: f64,
    #[sqlx(rename = "A_Min")]
    pub a_min: f64,
    #[sqlx(rename = "A_Max")]
    pub a_max: f64,
    #[sqlx(rename = "Status_O")]
    pub status_o: String,
    #[sqlx(rename = "Offset")]
    pub offset: f64,
    #[sqlx(rename = "Offset_Min")]
    pub offset_min: f64,
    #[sqlx(rename = "Offset_Max")]
    pub offset_max: f64,
    #[sqlx(rename = "Status_VAO")]
    pub status_vao: String,
    #[sqlx(rename = "RResult")]
    pub r_result: String,
    #[sqlx(rename = "Result")]
    pub result: String,
}

impl MeasurementRecord {
    /// The composite identity used for deduplication.
    pub fn dedup_key(&self) -> (&str, &str, f64, f64, f64) {
        (
            &self.model_name,
            &self.bar_code,
            self.v_current,
            self.a_current,
            self.offset,
        )
    }
}

/// One (V_Current, A_Current, Offset) sample for chart consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MeasurementTriple {
    #[sqlx(rename = "V_Current")]
    pub v_current: f64,
    #[sqlx(rename = "A_Current")]
    pub a_current: f64,
    #[sqlx(rename = "Offset")]
    pub offset: f64,
}

/// Min/max/avg for one measured quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Per-model summary over the three measured quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub rows: u64,
    pub v_current: SummaryStats,
    pub a_current: SummaryStats,
    pub offset: SummaryStats,
}
