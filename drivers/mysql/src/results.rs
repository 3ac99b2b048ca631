use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlhandle_driver::Error::UnsupportedColumnType;
use sqlhandle_driver::{Result, Row, Value};
use sqlx::mysql::{MySqlColumn, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo};

pub(crate) fn column_names(columns: &[MySqlColumn]) -> Vec<String> {
    columns
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

/// Convert every row to driver values up front, so that an unsupported column type is
/// reported as an error instead of silently ending the result.
pub(crate) fn convert_rows(rows: &[MySqlRow]) -> Result<Vec<Row>> {
    let mut converted = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(row.columns().len());
        for column in row.columns() {
            values.push(convert_to_value(row, column)?);
        }
        converted.push(values);
    }
    Ok(converted)
}

fn convert_to_value(row: &MySqlRow, column: &MySqlColumn) -> Result<Value> {
    let index = column.ordinal();

    if let Ok(value) = row.try_get::<Option<String>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::String))
    } else if let Ok(value) = row.try_get::<Option<Vec<u8>>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::Bytes))
    } else if let Ok(value) = row.try_get::<Option<i16>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::I16))
    } else if let Ok(value) = row.try_get::<Option<i32>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::I32))
    } else if let Ok(value) = row.try_get::<Option<i64>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::I64))
    } else if let Ok(value) = row.try_get::<Option<u64>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::U64))
    } else if let Ok(value) = row.try_get::<Option<f32>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::F32))
    } else if let Ok(value) = row.try_get::<Option<f64>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::F64))
    } else if let Ok(value) = row.try_get::<Option<rust_decimal::Decimal>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::Decimal))
    } else if let Ok(value) = row.try_get::<Option<bool>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::Bool))
    } else if let Ok(value) = row.try_get::<Option<NaiveDate>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::Date))
    } else if let Ok(value) = row.try_get::<Option<NaiveTime>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::Time))
    } else if let Ok(value) = row.try_get::<Option<NaiveDateTime>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::DateTime))
    } else if let Ok(value) = row.try_get::<Option<DateTime<Utc>>, usize>(index) {
        Ok(value.map_or(Value::Null, |timestamp| {
            Value::DateTime(timestamp.naive_utc())
        }))
    } else if let Ok(value) = row.try_get::<Option<serde_json::Value>, usize>(index) {
        Ok(value.map_or(Value::Null, Value::Json))
    } else {
        Err(UnsupportedColumnType {
            column_name: column.name().to_string(),
            column_type: column.type_info().name().to_string(),
        })
    }
}
