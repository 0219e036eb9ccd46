//! Vectorized test-name filtering using Arrow compute kernels

use arrow::array::{BooleanArray, RecordBatch, Scalar, StringArray};
use arrow::compute::kernels::comparison::ilike;
use arrow_select::filter::filter_record_batch;

use crate::error::Result;
use crate::reader::TEST_NAME;
use crate::utils::get_string_column;

/// `%needle%` with LIKE wildcards in the needle escaped, so the match is a
/// plain substring test
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Mask of rows whose `TestName` contains `needle`, ignoring case.
/// Null names never match.
pub fn create_test_name_mask(batch: &RecordBatch, needle: &str) -> Result<BooleanArray> {
    let names = get_string_column(batch, TEST_NAME)?;
    let pattern = Scalar::new(StringArray::from(vec![contains_pattern(needle)]));
    Ok(ilike(&names, &pattern)?)
}

/// Keep only rows whose `TestName` contains `needle`, ignoring case
pub fn apply_test_name_filter(batch: &RecordBatch, needle: &str) -> Result<RecordBatch> {
    let mask = create_test_name_mask(batch, needle)?;
    if mask.true_count() == batch.num_rows() {
        return Ok(batch.clone());
    }
    Ok(filter_record_batch(batch, &mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn names(values: Vec<Option<&str>>) -> RecordBatch {
        let schema = Schema::new(vec![Field::new(TEST_NAME, DataType::Utf8, true)]);
        RecordBatch::try_new(Arc::new(schema), vec![Arc::new(StringArray::from(values))]).unwrap()
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Join"), "%Join%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_mask_is_case_insensitive() {
        let batch = names(vec![Some("JoinFix"), Some("IndexScan"), Some("HASHJOIN"), None]);
        let mask = create_test_name_mask(&batch, "join").unwrap();
        assert!(mask.value(0));
        assert!(!mask.value(1));
        assert!(mask.value(2));
        assert!(mask.is_null(3) || !mask.value(3));
    }

    #[test]
    fn test_wildcards_match_literally() {
        let batch = names(vec![Some("Scan_1"), Some("ScanX1")]);
        let filtered = apply_test_name_filter(&batch, "scan_").unwrap();
        assert_eq!(filtered.num_rows(), 1);
    }

    #[test]
    fn test_filter_keeps_matching_rows() {
        let batch = names(vec![Some("Module A - scan"), Some("Module B"), Some("module a - seek")]);
        let filtered = apply_test_name_filter(&batch, "Module A").unwrap();
        assert_eq!(filtered.num_rows(), 2);

        let all = apply_test_name_filter(&batch, "").unwrap();
        assert_eq!(all.num_rows(), 3);
    }
}
