//! Evaluation of SQL constraint results.
//!
//! A constraint carries a `check` (what to look at) and an `expect` (how to
//! judge it), plus an optional `value`:
//!
//! | check   | looks at                          |
//! |---------|-----------------------------------|
//! | `value` | first column of the first row     |
//! | `rows`  | number of returned rows           |
//!
//! `expect` is one of `empty`, `non-empty` (rows only), `exact`, `range`,
//! `minimum`, `maximum`. Ranges use interval notation, e.g. `[0, 10)`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// What a query returned, reduced to what the checks need.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub row_count: usize,
    /// First column of the first row, `None` when no rows came back
    pub first_value: Option<Value>,
}

/// Outcome of a check: validity plus the reason when invalid.
pub type Validity = (bool, Option<String>);

/// Judges `outcome` against the constraint's check and expectation.
pub fn evaluate_validity(
    outcome: &QueryOutcome,
    check: &str,
    expect: &str,
    value: Option<&Value>,
) -> Validity {
    match check {
        "value" => {
            let Some(result) = outcome.first_value.as_ref() else {
                return invalid("Query returned no rows.");
            };
            match expect {
                "exact" => evaluate_exact(result, value),
                "range" => evaluate_range(result, value),
                "minimum" => evaluate_min(result, value),
                "maximum" => evaluate_max(result, value),
                _ => invalid("Invalid expectation."),
            }
        }
        "rows" => {
            let result = Value::from(outcome.row_count);
            match expect {
                "empty" => evaluate_empty(outcome.row_count, true),
                "non-empty" => evaluate_empty(outcome.row_count, false),
                "exact" => evaluate_exact(&result, value),
                "range" => evaluate_range(&result, value),
                "minimum" => evaluate_min(&result, value),
                "maximum" => evaluate_max(&result, value),
                _ => invalid("Invalid expectation."),
            }
        }
        _ => invalid("Invalid check typology."),
    }
}

fn valid() -> Validity {
    (true, None)
}

fn invalid(message: impl Into<String>) -> Validity {
    (false, Some(message.into()))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn evaluate_empty(rows: usize, empty: bool) -> Validity {
    match (empty, rows) {
        (true, 0) => valid(),
        (true, _) => invalid("Table is not empty."),
        (false, 0) => invalid("Table is empty."),
        (false, _) => valid(),
    }
}

fn evaluate_exact(result: &Value, expected: Option<&Value>) -> Validity {
    let expected = expected.unwrap_or(&Value::Null);
    let equal = match (as_number(result), as_number(expected)) {
        (Some(a), Some(b)) if result.is_number() || expected.is_number() => a == b,
        _ => result == expected,
    };
    if equal {
        valid()
    } else {
        invalid(format!(
            "Expected value {}, instead got {}.",
            display(expected),
            display(result)
        ))
    }
}

fn numeric_pair(result: &Value, expected: Option<&Value>) -> Result<(f64, f64), Validity> {
    let Some(bound) = expected.and_then(as_number) else {
        return Err(invalid("Expected a numeric value to compare against."));
    };
    let Some(actual) = as_number(result) else {
        return Err(invalid(format!(
            "Cannot compare non-numeric value {}.",
            display(result)
        )));
    };
    Ok((actual, bound))
}

fn evaluate_min(result: &Value, expected: Option<&Value>) -> Validity {
    match numeric_pair(result, expected) {
        Ok((actual, bound)) if actual >= bound => valid(),
        Ok((_, bound)) => invalid(format!(
            "Minimum value {bound}, instead got {}.",
            display(result)
        )),
        Err(validity) => validity,
    }
}

fn evaluate_max(result: &Value, expected: Option<&Value>) -> Validity {
    match numeric_pair(result, expected) {
        Ok((actual, bound)) if actual <= bound => valid(),
        Ok((_, bound)) => invalid(format!(
            "Maximum value {bound}, instead got {}.",
            display(result)
        )),
        Err(validity) => validity,
    }
}

static RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Hard-coded pattern, known to compile
    #[allow(clippy::expect_used)]
    Regex::new(r"^(\[|\()([+-]?[0-9]+[.]?[0-9]*),\s?([+-]?[0-9]+[.]?[0-9]*)(\]|\))$")
        .expect("Hard-coded regex pattern should be valid")
});

/// `[` and `]` are inclusive bounds, `(` and `)` exclusive.
fn evaluate_range(result: &Value, range: Option<&Value>) -> Validity {
    let Some(captures) = range
        .and_then(Value::as_str)
        .and_then(|range| RANGE_REGEX.captures(range.trim()))
    else {
        return invalid("Invalid range format.");
    };

    let lower_open = &captures[1] == "(";
    let upper_open = &captures[4] == ")";
    let (Ok(min), Ok(max)) = (captures[2].parse::<f64>(), captures[3].parse::<f64>()) else {
        return invalid("Invalid range format.");
    };
    let Some(actual) = as_number(result) else {
        return invalid(format!(
            "Cannot compare non-numeric value {}.",
            display(result)
        ));
    };

    let above_min = if lower_open { min < actual } else { min <= actual };
    let below_max = if upper_open { actual < max } else { actual <= max };

    if above_min && below_max {
        valid()
    } else {
        invalid(format!(
            "Expected value between {}{}, {}{}.",
            &captures[1], &captures[2], &captures[3], &captures[4]
        ))
    }
}
