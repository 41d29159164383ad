//! Shared `--key keyword=value` parsing for every subcommand, mirroring
//! `dolos`'s per-subcommand `Args` structs in spirit but factored into one
//! helper since every tool here takes the same request shape.

use std::collections::HashMap;

use fdb_core::Request;
use miette::{miette, Result};

/// Parses repeated `keyword=value` flags into a [`Request`]. A value may
/// itself be a `/`-separated list (`param=129/130`); repeating the same
/// keyword across multiple flags extends its value list rather than
/// overwriting it. Canonicalization (including relative dates and step
/// units) happens downstream inside schema expansion, so values are kept
/// as the caller wrote them.
pub fn parse_request(pairs: &[String]) -> Result<Request> {
    let mut request: Request = HashMap::new();
    for pair in pairs {
        let (keyword, value) = pair
            .split_once('=')
            .ok_or_else(|| miette!("malformed --key '{pair}', expected keyword=value"))?;
        let values: Vec<String> = value.split('/').map(str::to_string).collect();
        request.entry(keyword.to_string()).or_default().extend(values);
    }
    Ok(request)
}
