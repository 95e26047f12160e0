// DataFusion ResultConverter
//
// Converts Arrow record batches produced by the engine into JSON rows.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate};
use datafusion::arrow::array::*;
use datafusion::arrow::datatypes::{DataType, Schema, SchemaRef, TimeUnit};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::display::array_value_to_string;
use serde_json::{json, Value as JsonValue};

use crate::models::{Column, ResultSet, Row};

/// Converts DataFusion query results to a `ResultSet`
///
/// Nulls become JSON null, binary values become lower-case hex strings and
/// temporal values become ISO-8601 strings.
pub struct DataFusionResultConverter;

impl DataFusionResultConverter {
    /// Describe the columns of an Arrow schema
    pub fn columns(schema: &Schema) -> Vec<Column> {
        schema
            .fields()
            .iter()
            .map(|field| Column::new(field.name().clone(), field.data_type().to_string()))
            .collect()
    }

    /// Convert query execution results to a `ResultSet`
    pub fn convert(schema: SchemaRef, batches: &[RecordBatch]) -> Result<ResultSet> {
        let mut rows = Vec::new();
        for batch in batches {
            rows.extend(Self::batch_to_json_rows(&schema, batch)?);
        }

        Ok(ResultSet::new(Self::columns(&schema), rows))
    }

    fn batch_to_json_rows(schema: &Schema, batch: &RecordBatch) -> Result<Vec<Row>> {
        let num_cols = batch.num_columns();
        let mut rows = Vec::with_capacity(batch.num_rows());

        for row_idx in 0..batch.num_rows() {
            let mut row = Vec::with_capacity(num_cols);
            for col_idx in 0..num_cols {
                let value = Self::array_value_to_json(
                    batch.column(col_idx),
                    row_idx,
                    schema.field(col_idx).data_type(),
                )?;
                row.push(value);
            }
            rows.push(row);
        }

        Ok(rows)
    }

    /// Convert a single array value to JSON
    fn array_value_to_json(array: &ArrayRef, row_idx: usize, data_type: &DataType) -> Result<JsonValue> {
        if array.is_null(row_idx) {
            return Ok(JsonValue::Null);
        }

        let value = match data_type {
            DataType::Boolean => json!(downcast::<BooleanArray>(array)?.value(row_idx)),

            DataType::Int8 => json!(downcast::<Int8Array>(array)?.value(row_idx)),
            DataType::Int16 => json!(downcast::<Int16Array>(array)?.value(row_idx)),
            DataType::Int32 => json!(downcast::<Int32Array>(array)?.value(row_idx)),
            DataType::Int64 => json!(downcast::<Int64Array>(array)?.value(row_idx)),
            DataType::UInt8 => json!(downcast::<UInt8Array>(array)?.value(row_idx)),
            DataType::UInt16 => json!(downcast::<UInt16Array>(array)?.value(row_idx)),
            DataType::UInt32 => json!(downcast::<UInt32Array>(array)?.value(row_idx)),
            DataType::UInt64 => json!(downcast::<UInt64Array>(array)?.value(row_idx)),

            DataType::Float32 => json!(downcast::<Float32Array>(array)?.value(row_idx)),
            DataType::Float64 => json!(downcast::<Float64Array>(array)?.value(row_idx)),

            DataType::Decimal128(_, scale) => {
                let value = downcast::<Decimal128Array>(array)?.value(row_idx);
                let divisor = 10_f64.powi(i32::from(*scale));
                json!(value as f64 / divisor)
            }

            DataType::Utf8 => json!(downcast::<StringArray>(array)?.value(row_idx)),
            DataType::LargeUtf8 => json!(downcast::<LargeStringArray>(array)?.value(row_idx)),
            DataType::Utf8View => json!(downcast::<StringViewArray>(array)?.value(row_idx)),

            DataType::Binary => json!(hex(downcast::<BinaryArray>(array)?.value(row_idx))),
            DataType::LargeBinary => json!(hex(downcast::<LargeBinaryArray>(array)?.value(row_idx))),

            // Date32 counts days since the Unix epoch
            DataType::Date32 => {
                let days = downcast::<Date32Array>(array)?.value(row_idx);
                let date = days
                    .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .ok_or_else(|| anyhow!("Invalid date value {}", days))?;
                json!(date.format("%Y-%m-%d").to_string())
            }
            DataType::Date64 => {
                let millis = downcast::<Date64Array>(array)?.value(row_idx);
                let datetime = DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| anyhow!("Invalid date value {}", millis))?;
                json!(datetime.format("%Y-%m-%d").to_string())
            }

            DataType::Timestamp(unit, _) => {
                let timestamp = match unit {
                    TimeUnit::Second => {
                        DateTime::from_timestamp(downcast::<TimestampSecondArray>(array)?.value(row_idx), 0)
                    }
                    TimeUnit::Millisecond => DateTime::from_timestamp_millis(
                        downcast::<TimestampMillisecondArray>(array)?.value(row_idx),
                    ),
                    TimeUnit::Microsecond => DateTime::from_timestamp_micros(
                        downcast::<TimestampMicrosecondArray>(array)?.value(row_idx),
                    ),
                    TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(
                        downcast::<TimestampNanosecondArray>(array)?.value(row_idx),
                    )),
                };
                let datetime = timestamp.ok_or_else(|| anyhow!("Invalid timestamp value"))?;
                json!(datetime.to_rfc3339())
            }

            // Time, interval and nested types use Arrow's display form
            _ => {
                tracing::debug!("Rendering {:?} value as text", data_type);
                json!(array_value_to_string(array, row_idx)?)
            }
        };

        Ok(value)
    }
}

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn downcast<T: 'static>(array: &ArrayRef) -> Result<&T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("Failed to downcast to {}", std::any::type_name::<T>()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
