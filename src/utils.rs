//! Typed column access for benchmark record batches

use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray, TimestampMillisecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};

use crate::error::{Error, Result};

fn column_by_name<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .fields()
        .iter()
        .position(|f| f.name() == name)
        .ok_or_else(|| Error::MissingColumn(name.to_string()))?;

    Ok(batch.column(idx))
}

/// Cast a column with the Arrow cast kernel unless it already has the wanted type
fn cast_column(batch: &RecordBatch, name: &str, to: &DataType) -> Result<ArrayRef> {
    let col = column_by_name(batch, name)?;
    if col.data_type() == to {
        return Ok(col.clone());
    }
    Ok(cast(col, to)?)
}

fn downcast<T: Array + Clone + 'static>(array: &ArrayRef, name: &str) -> Result<T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| Error::ColumnType {
            column: name.to_string(),
        })
}

/// Column as Float64 (durations may be stored as decimals or integers)
pub fn get_f64_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let array = cast_column(batch, name, &DataType::Float64)?;
    downcast(&array, name)
}

/// Column as Int64 (reads and row counts).
///
/// Float and decimal sources must hold whole numbers; the cast kernel would
/// truncate `10.9` to `10` otherwise.
pub fn get_i64_column(batch: &RecordBatch, name: &str) -> Result<Int64Array> {
    let data_type = column_by_name(batch, name)?.data_type();
    let fractional = data_type.is_floating()
        || matches!(data_type, DataType::Decimal128(..) | DataType::Decimal256(..));
    if fractional {
        let values = get_f64_column(batch, name)?;
        return integral_values(&values, name);
    }
    let array = cast_column(batch, name, &DataType::Int64)?;
    downcast(&array, name)
}

fn integral_values(values: &Float64Array, name: &str) -> Result<Int64Array> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    let in_range = |v: f64| v >= i64::MIN as f64 && v < i64::MAX as f64;
    values
        .iter()
        .enumerate()
        .map(|(row, value)| match value {
            None => Ok(None),
            Some(v) if v.fract() == 0.0 && in_range(v) => Ok(Some(v as i64)),
            Some(value) => Err(Error::NonIntegral {
                column: name.to_string(),
                row,
                value,
            }),
        })
        .collect()
}

/// Column as Utf8
pub fn get_string_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let array = cast_column(batch, name, &DataType::Utf8)?;
    downcast(&array, name)
}

/// Column as a millisecond timestamp without time zone.
///
/// Dates, other timestamp units and ISO-8601 strings all cast cleanly.
pub fn get_timestamp_column(batch: &RecordBatch, name: &str) -> Result<TimestampMillisecondArray> {
    let array = cast_column(batch, name, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
    downcast(&array, name)
}

/// Fail with [`Error::NullValue`] if `row` is null in `array`
pub fn require_value(array: &dyn Array, column: &str, row: usize) -> Result<()> {
    if array.is_null(row) {
        return Err(Error::NullValue {
            column: column.to_string(),
            row,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};
    use arrow_array::{Date32Array, Int32Array};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("reads", DataType::Int32, true),
            Field::new("day", DataType::Date32, true),
            Field::new("label", DataType::Utf8, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int32Array::from(vec![Some(7), None])),
                Arc::new(Date32Array::from(vec![Some(1), None])),
                Arc::new(StringArray::from(vec![Some("a"), Some("b")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_casts() {
        let batch = batch();
        assert_eq!(get_i64_column(&batch, "reads").unwrap().value(0), 7);
        assert_eq!(get_f64_column(&batch, "reads").unwrap().value(0), 7.0);
        assert_eq!(get_string_column(&batch, "label").unwrap().value(1), "b");

        let day = get_timestamp_column(&batch, "day").unwrap();
        assert_eq!(day.value(0), 86_400_000);
        assert_eq!(
            day.value_as_datetime(0).unwrap().to_string(),
            "1970-01-02 00:00:00"
        );
    }

    #[test]
    fn test_float_reads_must_be_whole() {
        let schema = Schema::new(vec![Field::new("reads", DataType::Float64, true)]);
        let whole = RecordBatch::try_new(
            Arc::new(schema.clone()),
            vec![Arc::new(Float64Array::from(vec![Some(10.0), None]))],
        )
        .unwrap();
        let reads = get_i64_column(&whole, "reads").unwrap();
        assert_eq!(reads.value(0), 10);
        assert!(reads.is_null(1));

        let fractional = RecordBatch::try_new(
            Arc::new(schema.clone()),
            vec![Arc::new(Float64Array::from(vec![10.0, 10.9]))],
        )
        .unwrap();
        match get_i64_column(&fractional, "reads") {
            Err(Error::NonIntegral { column, row, value }) => {
                assert_eq!(column, "reads");
                assert_eq!(row, 1);
                assert_eq!(value, 10.9);
            }
            other => panic!("expected a non-integral error, got {other:?}"),
        }

        let huge = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Float64Array::from(vec![1e19, f64::NAN]))],
        )
        .unwrap();
        assert!(matches!(
            get_i64_column(&huge, "reads"),
            Err(Error::NonIntegral { row: 0, .. })
        ));
    }

    #[test]
    fn test_missing_column_and_nulls() {
        let batch = batch();
        assert!(matches!(
            get_i64_column(&batch, "nope"),
            Err(Error::MissingColumn(name)) if name == "nope"
        ));

        let reads = get_i64_column(&batch, "reads").unwrap();
        assert!(require_value(&reads, "reads", 0).is_ok());
        assert!(matches!(
            require_value(&reads, "reads", 1),
            Err(Error::NullValue { row: 1, .. })
        ));
    }
}
