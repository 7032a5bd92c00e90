use chrono::NaiveTime;
use rusqlite::types::{Value, ValueRef};

use super::ExtensionError;

const SECONDS_PER_DAY: i64 = 86_400;

enum Number {
    Int(i64),
    Real(f64),
}

impl Number {
    fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Real(r) => r,
        }
    }
}

// NULL passes through as None; text and blobs are rejected.
fn numeric(function: &'static str, args: &[ValueRef<'_>], index: usize) -> Result<Option<Number>, ExtensionError> {
    match args.get(index) {
        Some(ValueRef::Integer(i)) => Ok(Some(Number::Int(*i))),
        Some(ValueRef::Real(r)) => Ok(Some(Number::Real(*r))),
        Some(ValueRef::Null) => Ok(None),
        _ => Err(ExtensionError::NotNumeric { function, index }),
    }
}

/// `POWER(base, exponent)`. Integer inputs with a small non-negative exponent
/// stay integral; everything else is computed in floating point.
pub fn power(args: &[ValueRef<'_>]) -> Result<Value, ExtensionError> {
    let (Some(base), Some(exponent)) = (numeric("POWER", args, 0)?, numeric("POWER", args, 1)?) else {
        return Ok(Value::Null);
    };
    if let (Number::Int(b), Number::Int(e)) = (&base, &exponent) {
        if let Some(exact) = u32::try_from(*e).ok().and_then(|e| b.checked_pow(e)) {
            return Ok(Value::Integer(exact));
        }
    }
    Ok(Value::Real(base.as_f64().powf(exponent.as_f64())))
}

/// `SQRT(x)`; negative input is a domain error rather than NaN.
pub fn sqrt(args: &[ValueRef<'_>]) -> Result<Value, ExtensionError> {
    let Some(x) = numeric("SQRT", args, 0)? else { return Ok(Value::Null) };
    let x = x.as_f64();
    if x < 0.0 {
        return Err(ExtensionError::Domain { function: "SQRT", message: format!("cannot take the square root of {x}") });
    }
    Ok(Value::Real(x.sqrt()))
}

/// `MS_TO_HHMMSS(ms)`: whole seconds (fraction truncated) rendered as a wall
/// clock time, so durations past a day wrap around.
pub fn ms_to_hhmmss(args: &[ValueRef<'_>]) -> Result<Value, ExtensionError> {
    let Some(ms) = numeric("MS_TO_HHMMSS", args, 0)? else { return Ok(Value::Null) };
    let ms = match ms {
        Number::Int(i) => i,
        Number::Real(r) => r.trunc() as i64,
    };
    let secs = ms.div_euclid(1000).rem_euclid(SECONDS_PER_DAY);
    let time = u32::try_from(secs)
        .ok()
        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, 0))
        .ok_or_else(|| ExtensionError::Domain { function: "MS_TO_HHMMSS", message: format!("{ms} is out of range") })?;
    Ok(Value::Text(time.format("%H:%M:%S").to_string()))
}
