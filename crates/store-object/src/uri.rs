//! Parsing for the three object-store URI schemes named in the on-disk
//! layout (`fam://`, `rados://`, `s3://`). All three share one
//! `pool/object-key` shape; only the scheme tag differs, matching how real
//! FDB object stores are just different backends behind the same handle.

use fdb_core::config::ObjectScheme;

use crate::error::StoreError;

fn scheme_str(scheme: ObjectScheme) -> &'static str {
    match scheme {
        ObjectScheme::Fam => "fam",
        ObjectScheme::Rados => "rados",
        ObjectScheme::S3 => "s3",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    pub scheme: ObjectScheme,
    pub pool: String,
    pub key: String,
}

impl ObjectUri {
    pub fn new(scheme: ObjectScheme, pool: impl Into<String>, key: impl Into<String>) -> Self {
        Self { scheme, pool: pool.into(), key: key.into() }
    }

    pub fn parse(uri: &str) -> Result<Self, StoreError> {
        let (scheme_raw, rest) = uri.split_once("://").ok_or_else(|| StoreError::UnsupportedScheme(uri.to_string()))?;
        let scheme = match scheme_raw {
            "fam" => ObjectScheme::Fam,
            "rados" => ObjectScheme::Rados,
            "s3" => ObjectScheme::S3,
            _ => return Err(StoreError::UnsupportedScheme(uri.to_string())),
        };
        let (pool, key) = rest.split_once('/').ok_or_else(|| StoreError::UnsupportedScheme(uri.to_string()))?;
        Ok(Self { scheme, pool: pool.to_string(), key: key.to_string() })
    }
}

impl std::fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}/{}", scheme_str(self.scheme), self.pool, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_each_scheme() {
        for raw in ["fam://pool-a/obj-1", "rados://pool-b/obj-2", "s3://bucket/obj-3"] {
            let parsed = ObjectUri::parse(raw).unwrap();
            assert_eq!(parsed.to_string(), raw);
        }
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(ObjectUri::parse("ftp://pool/obj").is_err());
    }
}
