//! Type registry: per-keyword canonicalization rules. A schema binds a
//! keyword (e.g. `date`, `step`, `param`) to one of these canonicalizers so
//! that distinct user-facing spellings of the same value collapse onto one
//! on-disk token.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Canonicalizer {
    Date,
    Time,
    Step,
    Param,
    Any,
}

impl<'de> Deserialize<'de> for Canonicalizer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "date" | "Date" => Ok(Canonicalizer::Date),
            "time" | "Time" => Ok(Canonicalizer::Time),
            "step" | "Step" | "stepRange" => Ok(Canonicalizer::Step),
            "param" | "Param" => Ok(Canonicalizer::Param),
            "any" | "Any" | "" => Ok(Canonicalizer::Any),
            other => Err(serde::de::Error::custom(format!("unknown type name '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepUnit {
    Hour,
    Minute,
}

impl StepUnit {
    fn parse(raw: &str) -> Result<Self, SchemaError> {
        match raw {
            "h" | "H" | "" => Ok(StepUnit::Hour),
            "m" | "M" => Ok(StepUnit::Minute),
            other => Err(SchemaError::InvalidValue {
                keyword: "stepunits".into(),
                value: other.into(),
            }),
        }
    }

    fn minutes_per_unit(self) -> i64 {
        match self {
            StepUnit::Hour => 60,
            StepUnit::Minute => 1,
        }
    }
}

/// Maps keywords to the [`Canonicalizer`] used to normalize their values.
/// Keywords with no explicit entry fall back to [`Canonicalizer::Any`].
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Canonicalizer>,
    param_aliases: HashMap<String, String>,
    today: NaiveDate,
}

impl TypeRegistry {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            types: Self::builtin_types(),
            param_aliases: HashMap::new(),
            today,
        }
    }

    pub fn with_clock() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    fn builtin_types() -> HashMap<String, Canonicalizer> {
        let mut m = HashMap::new();
        m.insert("date".to_string(), Canonicalizer::Date);
        m.insert("time".to_string(), Canonicalizer::Time);
        m.insert("step".to_string(), Canonicalizer::Step);
        m.insert("param".to_string(), Canonicalizer::Param);
        m
    }

    pub fn register(&mut self, keyword: impl Into<String>, kind: Canonicalizer) {
        self.types.insert(keyword.into(), kind);
    }

    pub fn register_param_alias(&mut self, alias: impl Into<String>, paramid: impl Into<String>) {
        self.param_aliases.insert(alias.into(), paramid.into());
    }

    pub fn kind_of(&self, keyword: &str) -> Canonicalizer {
        self.types.get(keyword).copied().unwrap_or(Canonicalizer::Any)
    }

    pub fn canonicalize(&self, keyword: &str, value: &str) -> Result<String, SchemaError> {
        match self.kind_of(keyword) {
            Canonicalizer::Date => self.canonicalize_date(value),
            Canonicalizer::Time => Self::canonicalize_time(value),
            Canonicalizer::Step => Self::canonicalize_step_token(value, None),
            Canonicalizer::Param => Ok(self.canonicalize_param(value)),
            Canonicalizer::Any => Ok(value.trim().to_string()),
        }
    }

    /// Step canonicalization is special: it may need a sibling `stepunits`
    /// value. After this call the caller unsets `stepunits` from the key,
    /// since the unit is now folded into the canonical step token.
    pub fn canonicalize_step(&self, step: &str, stepunits: Option<&str>) -> Result<String, SchemaError> {
        Self::canonicalize_step_token(step, stepunits)
    }

    fn canonicalize_step_token(step: &str, stepunits: Option<&str>) -> Result<String, SchemaError> {
        let (value, inline_unit) = split_trailing_unit(step);
        let unit = match (inline_unit, stepunits) {
            (Some(u), _) => StepUnit::parse(u)?,
            (None, Some(u)) => StepUnit::parse(u)?,
            (None, None) => StepUnit::Hour,
        };
        let n: i64 = value.trim().parse().map_err(|_| SchemaError::InvalidValue {
            keyword: "step".into(),
            value: step.into(),
        })?;
        Ok(step_token_from_minutes(n * unit.minutes_per_unit()))
    }

    fn canonicalize_time(value: &str) -> Result<String, SchemaError> {
        let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
        let padded = match digits.len() {
            0 => return Err(SchemaError::InvalidValue { keyword: "time".into(), value: value.into() }),
            1 | 2 => format!("{digits:0>2}00"),
            3 => format!("0{digits}"),
            _ => digits,
        };
        if padded.len() != 4 {
            return Err(SchemaError::InvalidValue { keyword: "time".into(), value: value.into() });
        }
        Ok(padded)
    }

    fn canonicalize_date(&self, value: &str) -> Result<String, SchemaError> {
        let trimmed = value.trim();
        if let Ok(offset) = trimmed.parse::<i64>() {
            if trimmed.len() <= 4 {
                let date = self.today + Duration::days(offset);
                return Ok(date.format("%Y%m%d").to_string());
            }
        }
        if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            NaiveDate::parse_from_str(trimmed, "%Y%m%d")
                .map_err(|_| SchemaError::InvalidValue { keyword: "date".into(), value: value.into() })?;
            return Ok(trimmed.to_string());
        }
        Err(SchemaError::InvalidValue { keyword: "date".into(), value: value.into() })
    }

    fn canonicalize_param(&self, value: &str) -> String {
        self.param_aliases.get(value).cloned().unwrap_or_else(|| value.trim().to_string())
    }
}

/// Splits a trailing alphabetic unit suffix off a numeric token, e.g.
/// `"30m"` -> `("30", Some("m"))`, `"2"` -> `("2", None)`.
fn split_trailing_unit(raw: &str) -> (&str, Option<&str>) {
    let split_at = raw.find(|c: char| c.is_alphabetic());
    match split_at {
        Some(idx) => (&raw[..idx], Some(&raw[idx..])),
        None => (raw, None),
    }
}

fn step_token_from_minutes(minutes: i64) -> String {
    if minutes % 60 == 0 {
        format!("{}", minutes / 60)
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(NaiveDate::from_ymd_opt(2012, 9, 11).unwrap())
    }

    #[test]
    fn date_canonicalizes_relative_offsets() {
        let reg = registry();
        assert_eq!(reg.canonicalize("date", "0").unwrap(), "20120911");
        assert_eq!(reg.canonicalize("date", "-1").unwrap(), "20120910");
    }

    #[test]
    fn date_accepts_absolute_form() {
        let reg = registry();
        assert_eq!(reg.canonicalize("date", "20120911").unwrap(), "20120911");
    }

    #[test]
    fn time_pads_to_four_digits() {
        assert_eq!(TypeRegistry::canonicalize_time("0").unwrap(), "0000");
        assert_eq!(TypeRegistry::canonicalize_time("12").unwrap(), "1200");
        assert_eq!(TypeRegistry::canonicalize_time("1230").unwrap(), "1230");
    }

    #[test]
    fn step_hours_and_minutes_fold_into_comparable_tokens() {
        assert_eq!(TypeRegistry::canonicalize_step_token("2", Some("h")).unwrap(), "2");
        assert_eq!(TypeRegistry::canonicalize_step_token("30", Some("m")).unwrap(), "30m");
        assert_eq!(TypeRegistry::canonicalize_step_token("60m", None).unwrap(), "1");
        assert_eq!(TypeRegistry::canonicalize_step_token("2", None).unwrap(), "2");
    }

    #[test]
    fn param_alias_resolves_through_table() {
        let mut reg = registry();
        reg.register_param_alias("2t", "167");
        assert_eq!(reg.canonicalize_param("2t"), "167");
        assert_eq!(reg.canonicalize_param("167"), "167");
    }
}
