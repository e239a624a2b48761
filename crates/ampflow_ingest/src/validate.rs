//! Row validation and normalization.
//!
//! Converts one [`RawRow`] into a typed [`MeasurementRecord`] or rejects it.
//! String columns degrade to the empty string; numeric columns default to
//! 0.0 only when the column is absent - a value that is present but does
//! not parse as a real number (the empty string included) rejects the whole
//! row, so a half-converted measurement can never reach the store.

use crate::error::ValidationError;
use crate::reader::RawRow;
use ampflow_db::MeasurementRecord;

/// Validate one raw row against the measurement schema.
pub fn validate_row(row: &RawRow) -> Result<MeasurementRecord, ValidationError> {
    Ok(MeasurementRecord {
        time: text(row, "Time"),
        bar_code: text(row, "BarCode"),
        model_name: text(row, "ModelName"),
        name: text(row, "Name_"),
        status_v: text(row, "Status_V"),
        v_current: real(row, "V_Current")?,
        v_min: real(row, "V_Min")?,
        v_max: real(row, "V_Max")?,
        status_a: text(row, "Status_A"),
        a_current: real(row, "A_Current")?,
        a_min: real(row, "A_Min")?,
        a_max: real(row, "A_Max")?,
        status_o: text(row, "Status_O"),
        offset: real(row, "Offset")?,
        offset_min: real(row, "Offset_Min")?,
        offset_max: real(row, "Offset_Max")?,
        status_vao: text(row, "Status_VAO"),
        r_result: text(row, "RResult"),
        result: text(row, "Result"),
    })
}

fn text(row: &RawRow, column: &str) -> String {
    row.get(column).unwrap_or("").to_string()
}

fn real(row: &RawRow, column: &'static str) -> Result<f64, ValidationError> {
    match row.get(column) {
        None => Ok(0.0),
        Some(raw) => raw.trim().parse::<f64>().map_err(|_| ValidationError {
            field: column,
            raw_value: raw.to_string(),
        }),
    }
}
