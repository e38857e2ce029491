use chrono::NaiveDate;
use serde_json::Value;

use crate::error::ValidationError;
use crate::models::{Category, NewLogEntry, IMPACT_MAX, IMPACT_MIN};

/// Checks a submitted entry and returns it in storable form.
///
/// `impact` is taken as raw JSON so that fractional numbers and strings are
/// rejected as out of range rather than silently coerced.
pub fn validate(
    content: Option<&str>,
    category: Option<&str>,
    impact: Option<&Value>,
    date: NaiveDate,
) -> Result<NewLogEntry, ValidationError> {
    let content = content
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField)?;
    let category = category
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField)?;
    let impact = match impact {
        None | Some(Value::Null) => return Err(ValidationError::MissingField),
        Some(Value::String(raw)) if raw.trim().is_empty() => {
            return Err(ValidationError::MissingField)
        }
        Some(value) => parse_impact(value)?,
    };
    let category = category
        .parse::<Category>()
        .map_err(|_| ValidationError::UnknownCategory)?;

    Ok(NewLogEntry {
        content: content.to_string(),
        category,
        impact,
        date,
    })
}

fn parse_impact(value: &Value) -> Result<i32, ValidationError> {
    let number = match value {
        Value::Number(number) => number,
        _ => return Err(ValidationError::ImpactOutOfRange),
    };

    let integer = match (number.as_i64(), number.as_f64()) {
        (Some(integer), _) => integer,
        (None, Some(float)) if float.fract() == 0.0 && float.abs() < 1e9 => float as i64,
        _ => return Err(ValidationError::ImpactOutOfRange),
    };

    if (IMPACT_MIN..=IMPACT_MAX).contains(&integer) {
        Ok(integer as i32)
    } else {
        Err(ValidationError::ImpactOutOfRange)
    }
}
