use rusqlite::types::ValueRef;

use super::{ExtensionError, Samples};

/// Step function shared by the statistics aggregates: only numeric values are
/// kept, NULL and text rows are skipped.
pub fn collect_numeric(samples: &mut Samples, value: ValueRef<'_>) {
    match value {
        ValueRef::Integer(i) => samples.push(i as f64),
        ValueRef::Real(r) => samples.push(r),
        _ => {}
    }
}

fn mean(values: &[f64]) -> f64 { values.iter().sum::<f64>() / values.len() as f64 }

fn sum_sq_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum()
}

/// Sample standard deviation (n - 1 denominator). Needs two values.
pub fn sample_stdev(values: &[f64]) -> Result<f64, ExtensionError> {
    if values.len() < 2 {
        return Err(ExtensionError::InsufficientData { function: "STDEV", required: 2, actual: values.len() });
    }
    Ok((sum_sq_dev(values) / (values.len() - 1) as f64).sqrt())
}

/// Population standard deviation (n denominator). Needs one value.
pub fn population_stdev(values: &[f64]) -> Result<f64, ExtensionError> {
    if values.is_empty() {
        return Err(ExtensionError::InsufficientData { function: "STDEV_POP", required: 1, actual: 0 });
    }
    Ok((sum_sq_dev(values) / values.len() as f64).sqrt())
}
