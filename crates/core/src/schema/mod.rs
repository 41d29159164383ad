//! The schema: a set of three-level rules (database, index, datum) mapping
//! a request onto the [`KeyChain`]s it matches.

mod parser;
mod rule;

use chrono::NaiveDate;
use itertools::Itertools;

pub use rule::{KeywordDecl, Level};

use crate::error::SchemaError;
use crate::key::{Key, KeyChain};
use crate::request::Request;
use crate::types::{Canonicalizer, TypeRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    rules: Vec<Level>,
    type_decls: Vec<(String, String)>,
}

impl Schema {
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let rules = parser::parse_schema(text)?;
        for root in &rules {
            root.validate_depth(1)?;
        }

        let mut type_decls = Vec::new();
        for root in &rules {
            let mut borrowed = Vec::new();
            root.collect_type_names(&mut borrowed);
            for (name, type_name) in borrowed {
                type_decls.push((name.to_string(), type_name.to_string()));
            }
        }

        Ok(Self { rules, type_decls })
    }

    /// Builds a fresh [`TypeRegistry`] seeded with this schema's type
    /// annotations and `today` as the reference date for relative
    /// canonicalization. Callers own the clock; the schema never reads it.
    pub fn build_registry(&self, today: NaiveDate) -> TypeRegistry {
        let mut registry = TypeRegistry::new(today);
        for (keyword, type_name) in &self.type_decls {
            if let Ok(kind) = parse_canonicalizer_name(type_name) {
                registry.register(keyword.clone(), kind);
            }
        }
        registry
    }

    /// Every [`KeyChain`] this schema's rules produce against `request`.
    pub fn expand(&self, request: &Request, registry: &TypeRegistry) -> Result<Vec<KeyChain>, SchemaError> {
        let mut out = Vec::new();
        for root in &self.rules {
            self.expand_rule(root, request, registry, &mut out)?;
        }
        Ok(out)
    }

    fn expand_rule(&self, db_level: &Level, request: &Request, registry: &TypeRegistry, out: &mut Vec<KeyChain>) -> Result<(), SchemaError> {
        let db_keys = rule::level_combinations(db_level, request, registry)?;
        for db_key in db_keys {
            for index_level in &db_level.children {
                let index_keys = rule::level_combinations(index_level, request, registry)?;
                for index_key in index_keys {
                    for datum_level in &index_level.children {
                        let datum_keys = rule::level_combinations(datum_level, request, registry)?;
                        for datum_key in datum_keys {
                            out.push(KeyChain::new(db_key.clone(), index_key.clone(), datum_key)?);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Only the database-level keys a request matches, without descending
    /// into index or datum levels -- used to enumerate candidate databases
    /// before any index file is opened.
    pub fn expand_first_level(&self, request: &Request, registry: &TypeRegistry) -> Result<Vec<Key>, SchemaError> {
        let mut out = Vec::new();
        for root in &self.rules {
            out.extend(rule::level_combinations(root, request, registry)?);
        }
        // Distinct rules may independently match the same db key; collapse
        // duplicates by fingerprint before handing the list back.
        Ok(out.into_iter().unique_by(Key::fingerprint).collect())
    }

    /// The full three-level tree of matches, grouped by db key then index
    /// key, used when building axes and hypercubes across an entire schema
    /// match rather than one field at a time.
    #[allow(clippy::type_complexity)]
    pub fn fully_expanded_levels(&self, request: &Request, registry: &TypeRegistry) -> Result<Vec<(Key, Vec<(Key, Vec<Key>)>)>, SchemaError> {
        let mut out = Vec::new();
        for root in &self.rules {
            let db_keys = rule::level_combinations(root, request, registry)?;
            for db_key in db_keys {
                let mut index_entries = Vec::new();
                for index_level in &root.children {
                    let index_keys = rule::level_combinations(index_level, request, registry)?;
                    for index_key in index_keys {
                        let mut datum_keys = Vec::new();
                        for datum_level in &index_level.children {
                            datum_keys.extend(rule::level_combinations(datum_level, request, registry)?);
                        }
                        index_entries.push((index_key, datum_keys));
                    }
                }
                out.push((db_key, index_entries));
            }
        }
        Ok(out)
    }

    pub fn rules(&self) -> &[Level] {
        &self.rules
    }

    /// Renders this schema back to the bracketed grammar `parse` accepts.
    /// `Schema::parse(schema.dump())` reproduces an equal `Schema` (§8's
    /// `Schema.parse(Schema.dump(s)) == s` round-trip law) -- whitespace
    /// and comments are not preserved, only the rule structure itself.
    pub fn dump(&self) -> String {
        self.rules.iter().map(Level::dump).collect::<Vec<_>>().join("\n")
    }
}

impl Level {
    /// Keywords are comma-separated per the grammar; nested levels follow
    /// as their own `[ ... ]` brackets with no separating comma, matching
    /// `parser::Parser::parse_level`'s keyword-list-then-children shape.
    fn dump(&self) -> String {
        let keywords = self.keywords.iter().map(KeywordDecl::dump).collect::<Vec<_>>().join(", ");
        let children = self.children.iter().map(Level::dump).collect::<Vec<_>>().join(" ");
        match (keywords.is_empty(), children.is_empty()) {
            (true, true) => "[ ]".to_string(),
            (false, true) => format!("[ {keywords} ]"),
            (true, false) => format!("[ {children} ]"),
            (false, false) => format!("[ {keywords} {children} ]"),
        }
    }
}

impl KeywordDecl {
    fn dump(&self) -> String {
        let mut out = self.name.clone();
        if let Some(type_name) = &self.type_name {
            out.push(':');
            out.push_str(type_name);
        }
        if self.optional {
            out.push('?');
            if let Some(default) = &self.default {
                out.push_str(default);
            }
        }
        out
    }
}

fn parse_canonicalizer_name(name: &str) -> Result<Canonicalizer, SchemaError> {
    match name {
        "Date" | "date" => Ok(Canonicalizer::Date),
        "Time" | "time" => Ok(Canonicalizer::Time),
        "Step" | "step" | "StepRange" => Ok(Canonicalizer::Step),
        "Param" | "param" => Ok(Canonicalizer::Param),
        _ => Ok(Canonicalizer::Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_schema() -> Schema {
        Schema::parse(
            "
            [ class, expver, stream
              [ date:Date, time:Time
                [ param:Param, levelist, step:Step, number? ]
              ]
            ]
        ",
        )
        .unwrap()
    }

    #[test]
    fn expand_builds_full_key_chains() {
        let schema = sample_schema();
        let registry = schema.build_registry(NaiveDate::from_ymd_opt(2012, 9, 11).unwrap());

        let mut request: Request = HashMap::new();
        request.insert("class".into(), vec!["od".into()]);
        request.insert("expver".into(), vec!["0001".into()]);
        request.insert("stream".into(), vec!["oper".into()]);
        request.insert("date".into(), vec!["0".into()]);
        request.insert("time".into(), vec!["12".into()]);
        request.insert("param".into(), vec!["130".into()]);
        request.insert("levelist".into(), vec!["500".into()]);
        request.insert("step".into(), vec!["0".into()]);

        let chains = schema.expand(&request, &registry).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].index.get("date"), Some("20120911"));
        assert!(!chains[0].datum.contains("number"));
    }

    #[test]
    fn expand_first_level_does_not_require_lower_level_keywords() {
        let schema = sample_schema();
        let registry = schema.build_registry(NaiveDate::from_ymd_opt(2012, 9, 11).unwrap());

        let mut request: Request = HashMap::new();
        request.insert("class".into(), vec!["od".into()]);
        request.insert("expver".into(), vec!["0001".into()]);
        request.insert("stream".into(), vec!["oper".into()]);

        let keys = schema.expand_first_level(&request, &registry).unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn expand_missing_mandatory_keyword_errors() {
        let schema = sample_schema();
        let registry = schema.build_registry(NaiveDate::from_ymd_opt(2012, 9, 11).unwrap());
        let request: Request = HashMap::new();
        assert!(schema.expand(&request, &registry).is_err());
    }

    #[test]
    fn dump_then_parse_round_trips() {
        let schema = sample_schema();
        let dumped = schema.dump();
        let reparsed = Schema::parse(&dumped).unwrap();
        assert_eq!(schema, reparsed);
    }

    #[test]
    fn dump_then_parse_round_trips_for_multi_rule_schema() {
        let schema = Schema::parse(
            "
            [ class, expver [ stream [ param ] ] ]
            [ class, expver [ time?0000 [ param:Param, number? ] ] ]
            ",
        )
        .unwrap();
        let reparsed = Schema::parse(&schema.dump()).unwrap();
        assert_eq!(schema, reparsed);
    }
}
