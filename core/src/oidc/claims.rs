//! Typed access to unverified token claims
//!
//! Claims arrive as a JSON object. Readers here classify each value once so
//! matchers work on tagged results instead of probing `serde_json::Value`.

use serde_json::{Map, Value};

pub const ISSUER_CLAIM: &str = "iss";
pub const AUDIENCE_CLAIM: &str = "aud";
pub const SUBJECT_CLAIM: &str = "sub";

/// A claim expected to hold a single string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringClaim<'a> {
    Present(&'a str),
    Absent,
    /// Present with a non-string JSON type (name of that type)
    WrongType(&'static str),
}

/// A claim that may hold a string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringListClaim<'a> {
    Present(Vec<&'a str>),
    Absent,
    WrongType(&'static str),
}

/// Read a string-valued claim
pub fn string_claim<'a>(claims: &'a Map<String, Value>, name: &str) -> StringClaim<'a> {
    match claims.get(name) {
        None | Some(Value::Null) => StringClaim::Absent,
        Some(Value::String(s)) => StringClaim::Present(s),
        Some(other) => StringClaim::WrongType(json_type_name(other)),
    }
}

/// Read a claim that is either a string or an array of strings.
///
/// A scalar string is returned as a one-element list. An array with any
/// non-string element is `WrongType`.
pub fn string_list_claim<'a>(claims: &'a Map<String, Value>, name: &str) -> StringListClaim<'a> {
    match claims.get(name) {
        None | Some(Value::Null) => StringListClaim::Absent,
        Some(Value::String(s)) => StringListClaim::Present(vec![s.as_str()]),
        Some(Value::Array(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => values.push(s.as_str()),
                    other => return StringListClaim::WrongType(json_type_name(other)),
                }
            }
            StringListClaim::Present(values)
        }
        Some(other) => StringListClaim::WrongType(json_type_name(other)),
    }
}

pub fn issuer(claims: &Map<String, Value>) -> StringClaim<'_> {
    string_claim(claims, ISSUER_CLAIM)
}

pub fn audiences(claims: &Map<String, Value>) -> StringListClaim<'_> {
    string_list_claim(claims, AUDIENCE_CLAIM)
}

pub fn subject(claims: &Map<String, Value>) -> StringClaim<'_> {
    string_claim(claims, SUBJECT_CLAIM)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
