//! Request values: a single keyword in a `list`/`retrieve` request may carry
//! more than one value, written as a `/`-separated list or a `from/to/by`
//! range. [`expand_values`] turns either spelling into the concrete list of
//! canonical tokens a [`crate::schema::Schema`] match walks over.

use std::collections::HashMap;

use crate::error::SchemaError;
use crate::types::{Canonicalizer, TypeRegistry};

/// A user request: each keyword may carry several already-split candidate
/// values (the result of [`expand_values`] applied to its raw spelling).
pub type Request = HashMap<String, Vec<String>>;

/// Splits a raw request value into its constituent tokens and canonicalizes
/// each one. A `from/to/by/step` range is only recognised for keywords
/// whose type is [`Canonicalizer::Step`]; every other keyword is treated as
/// a plain `/`-separated list.
pub fn expand_values(registry: &TypeRegistry, keyword: &str, raw: &str) -> Result<Vec<String>, SchemaError> {
    let parts: Vec<&str> = raw.split('/').collect();

    if registry.kind_of(keyword) == Canonicalizer::Step {
        if let Some(range) = try_parse_step_range(&parts) {
            return expand_step_range(range);
        }
    }

    parts.iter().map(|p| registry.canonicalize(keyword, p)).collect()
}

struct StepRange<'a> {
    from: &'a str,
    to: &'a str,
    by: &'a str,
}

/// Recognises the `a/to/b/by/c` shape (case-insensitive `to`/`by`
/// separators); returns `None` for anything else, leaving it to be parsed
/// as a plain list.
fn try_parse_step_range<'a>(parts: &[&'a str]) -> Option<StepRange<'a>> {
    if parts.len() != 5 {
        return None;
    }
    if !parts[1].eq_ignore_ascii_case("to") || !parts[3].eq_ignore_ascii_case("by") {
        return None;
    }
    Some(StepRange { from: parts[0], to: parts[2], by: parts[4] })
}

fn expand_step_range(range: StepRange<'_>) -> Result<Vec<String>, SchemaError> {
    let from_minutes = step_value_in_minutes(range.from)?;
    let to_minutes = step_value_in_minutes(range.to)?;
    let by_minutes = step_value_in_minutes(range.by)?;

    if by_minutes <= 0 {
        return Err(SchemaError::InvalidValue { keyword: "step".into(), value: range.by.into() });
    }

    let mut out = Vec::new();
    let mut current = from_minutes;
    while current <= to_minutes {
        out.push(minutes_to_token(current));
        current += by_minutes;
    }
    Ok(out)
}

fn step_value_in_minutes(token: &str) -> Result<i64, SchemaError> {
    let split_at = token.find(|c: char| c.is_alphabetic());
    let (value, unit) = match split_at {
        Some(idx) => (&token[..idx], &token[idx..]),
        None => (token, ""),
    };
    let n: i64 = value.parse().map_err(|_| SchemaError::InvalidValue { keyword: "step".into(), value: token.into() })?;
    let factor = match unit {
        "" | "h" | "H" => 60,
        "m" | "M" => 1,
        _ => return Err(SchemaError::InvalidValue { keyword: "step".into(), value: token.into() }),
    };
    Ok(n * factor)
}

fn minutes_to_token(minutes: i64) -> String {
    if minutes % 60 == 0 {
        format!("{}", minutes / 60)
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(NaiveDate::from_ymd_opt(2012, 9, 11).unwrap())
    }

    #[test]
    fn plain_list_splits_on_slash() {
        let reg = registry();
        let values = expand_values(&reg, "param", "129/130/131").unwrap();
        assert_eq!(values, vec!["129", "130", "131"]);
    }

    #[test]
    fn step_range_expands_with_minute_precision() {
        let reg = registry();
        let values = expand_values(&reg, "step", "0/to/2/by/30m").unwrap();
        assert_eq!(values, vec!["0", "30m", "1", "90m", "2"]);
    }

    #[test]
    fn step_plain_list_still_canonicalizes_each_token() {
        let reg = registry();
        let values = expand_values(&reg, "step", "2/30m").unwrap();
        assert_eq!(values, vec!["2", "30m"]);
    }
}
