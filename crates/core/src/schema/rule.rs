//! A schema [`Level`] declares the keywords consumed at one of the three
//! fixed depths (database, index, datum) and nests the levels below it.

use crate::error::SchemaError;
use crate::key::Key;
use crate::request::Request;
use crate::types::TypeRegistry;

/// One keyword as declared in a schema bracket: `name`, `name:Type`,
/// `name?`, `name?default` or `name:Type?default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordDecl {
    pub name: String,
    pub type_name: Option<String>,
    pub optional: bool,
    pub default: Option<String>,
}

impl KeywordDecl {
    /// The concrete canonical values this keyword takes against `request`:
    /// the request's own values if present, else the default, else (if
    /// optional) no values at all -- meaning the keyword is omitted from
    /// every key built under this level. `None` is returned in that case;
    /// a non-optional keyword with nothing to bind is a hard error.
    fn candidates(&self, request: &Request, registry: &TypeRegistry) -> Result<Option<Vec<String>>, SchemaError> {
        if let Some(raw_values) = request.get(&self.name) {
            let mut out = Vec::with_capacity(raw_values.len());
            for raw in raw_values {
                out.push(registry.canonicalize(&self.name, raw)?);
            }
            return Ok(Some(out));
        }
        if let Some(default) = &self.default {
            return Ok(Some(vec![registry.canonicalize(&self.name, default)?]));
        }
        if self.optional {
            return Ok(None);
        }
        Err(SchemaError::MissingKeyword(self.name.clone()))
    }
}

/// One bracket of a schema: a set of sibling keyword declarations plus the
/// levels nested directly beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Level {
    pub keywords: Vec<KeywordDecl>,
    pub children: Vec<Level>,
}

impl Level {
    /// `depth` is 1 for a db-level root, 2 for index, 3 for datum. Datum
    /// levels must be leaves; db and index levels must have at least one
    /// child.
    pub(super) fn validate_depth(&self, depth: usize) -> Result<(), SchemaError> {
        if depth == 3 {
            if !self.children.is_empty() {
                return Err(SchemaError::WrongNesting(4));
            }
            return Ok(());
        }
        if self.children.is_empty() {
            return Err(SchemaError::WrongNesting(depth));
        }
        for child in &self.children {
            child.validate_depth(depth + 1)?;
        }
        Ok(())
    }

    pub(super) fn collect_type_names<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        for decl in &self.keywords {
            if let Some(type_name) = &decl.type_name {
                out.push((decl.name.as_str(), type_name.as_str()));
            }
        }
        for child in &self.children {
            child.collect_type_names(out);
        }
    }
}

/// The cartesian product of every keyword declared in `level`, each bound
/// to its candidate values against `request`. Keywords with no candidates
/// (optional and absent) are simply left out of the resulting keys.
pub(super) fn level_combinations(level: &Level, request: &Request, registry: &TypeRegistry) -> Result<Vec<Key>, SchemaError> {
    let mut combos = vec![Key::new()];
    for decl in &level.keywords {
        let Some(values) = decl.candidates(request, registry)? else {
            continue;
        };
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for base in &combos {
            for value in &values {
                let mut key = base.clone();
                key.set_raw(decl.name.clone(), value.clone());
                next.push(key);
            }
        }
        combos = next;
    }
    Ok(combos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(NaiveDate::from_ymd_opt(2012, 9, 11).unwrap())
    }

    #[test]
    fn missing_mandatory_keyword_errors() {
        let level = Level {
            keywords: vec![KeywordDecl { name: "class".into(), type_name: None, optional: false, default: None }],
            children: vec![],
        };
        let err = level_combinations(&level, &Request::new(), &registry()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingKeyword(_)));
    }

    #[test]
    fn optional_without_value_is_omitted() {
        let level = Level {
            keywords: vec![KeywordDecl { name: "number".into(), type_name: None, optional: true, default: None }],
            children: vec![],
        };
        let combos = level_combinations(&level, &Request::new(), &registry()).unwrap();
        assert_eq!(combos.len(), 1);
        assert!(!combos[0].contains("number"));
    }

    #[test]
    fn multi_valued_request_produces_cartesian_product() {
        let level = Level {
            keywords: vec![
                KeywordDecl { name: "param".into(), type_name: None, optional: false, default: None },
                KeywordDecl { name: "levelist".into(), type_name: None, optional: false, default: None },
            ],
            children: vec![],
        };
        let mut request: HashMap<String, Vec<String>> = HashMap::new();
        request.insert("param".into(), vec!["129".into(), "130".into()]);
        request.insert("levelist".into(), vec!["500".into()]);
        let combos = level_combinations(&level, &request, &registry()).unwrap();
        assert_eq!(combos.len(), 2);
    }
}
