//! The two statistical primitives every higher-level aggregator is built on.

use crate::report::CellValue;
use indexmap::IndexMap;

/// Weighted mean of `values` with the pairwise `weights`. A row missing
/// either its value or its weight contributes to neither numerator nor
/// denominator. A group with zero total weight yields NaN, which is a valid
/// result and propagates silently. Multiplicity matters: duplicate
/// (value, weight) pairs contribute additively.
pub fn weighted_mean(values: &[Option<f64>], weights: &[Option<f64>]) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (value, weight) in values.iter().zip(weights) {
        if let (Some(value), Some(weight)) = (value, weight) {
            if value.is_nan() || weight.is_nan() {
                continue;
            }
            numerator += value * weight;
            denominator += weight;
        }
    }
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Returns the value carried by the row of maximum weight. Ties are broken by
/// the lowest row ordinal, so the first of two equally weighted rows wins.
/// This is the designated reduction for categorical attributes (schedule
/// names, equation coefficients) that cannot be averaged.
pub fn top<T: Clone>(values: &[Option<T>], weights: &[Option<f64>]) -> Option<T> {
    let mut best: Option<(f64, &T)> = None;
    for (value, weight) in values.iter().zip(weights) {
        if let (Some(value), Some(weight)) = (value, weight) {
            if weight.is_nan() {
                continue;
            }
            // strictly greater keeps the earliest row on ties
            if best.map(|(max, _)| *weight > max).unwrap_or(true) {
                best = Some((*weight, value));
            }
        }
    }
    best.map(|(_, value)| value.clone())
}

/// Product of the named weight columns of one row, e.g. floor area times zone
/// multiplier. Any factor missing or non-numeric makes the whole weight
/// missing.
pub fn combined_weight(row: &IndexMap<String, CellValue>, weight_columns: &[&str]) -> Option<f64> {
    weight_columns
        .iter()
        .map(|column| row.get(*column).and_then(CellValue::as_f64))
        .try_fold(1.0, |product, factor| factor.map(|factor| product * factor))
}
