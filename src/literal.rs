//! Parser for the container literals stored in text columns such as `genres`
//! and `spoken_languages`, e.g. `[{'id': 18, 'name': 'Drama'}]`.
//!
//! Nothing is evaluated: the text either matches the grammar in
//! `literal.pest` and becomes a `serde_json::Value`, or it is rejected.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use serde_json::{Map, Number, Value};
use std::str::Chars;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "literal.pest"]
struct LiteralParser;

#[derive(Error, Debug)]
pub enum LiteralError {
    #[error("invalid literal: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("empty literal")]
    Empty,

    #[error("invalid escape sequence '{0}'")]
    Escape(String),

    #[error("number out of range: {0}")]
    Number(String),
}

/// Parse a literal into a JSON value
pub fn parse(text: &str) -> Result<Value, LiteralError> {
    let literal = LiteralParser::parse(Rule::literal, text)
        .map_err(Box::new)?
        .next()
        .ok_or(LiteralError::Empty)?;
    let value = literal.into_inner().next().ok_or(LiteralError::Empty)?;
    to_value(value)
}

/// Parse a literal and re-encode it as compact JSON text
pub fn canonicalize(text: &str) -> Result<String, LiteralError> {
    Ok(parse(text)?.to_string())
}

fn to_value(pair: Pair<'_, Rule>) -> Result<Value, LiteralError> {
    match pair.as_rule() {
        Rule::list | Rule::tuple => pair
            .into_inner()
            .map(to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Rule::dict => {
            let mut map = Map::new();
            for entry in pair.into_inner() {
                let mut kv = entry.into_inner();
                let (Some(key), Some(value)) = (kv.next(), kv.next()) else {
                    continue;
                };
                // JSON objects only have string keys
                let key = match to_value(key)? {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                map.insert(key, to_value(value)?);
            }
            Ok(Value::Object(map))
        }
        Rule::string => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            unescape(raw).map(Value::String)
        }
        Rule::number => number(pair.as_str()),
        Rule::true_lit => Ok(Value::Bool(true)),
        Rule::false_lit => Ok(Value::Bool(false)),
        _ => Ok(Value::Null),
    }
}

fn number(text: &str) -> Result<Value, LiteralError> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::from(n));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| LiteralError::Number(text.to_string()))
}

fn unescape(raw: &str) -> Result<String, LiteralError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err(LiteralError::Escape("\\".to_string()));
        };
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' | '\'' | '"' => out.push(esc),
            '\n' => {}
            'x' => out.push(hex_char(&mut chars, 2)?),
            'u' => out.push(hex_char(&mut chars, 4)?),
            'U' => out.push(hex_char(&mut chars, 8)?),
            // Unknown escapes are kept verbatim
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    Ok(out)
}

fn hex_char(chars: &mut Chars<'_>, digits: usize) -> Result<char, LiteralError> {
    let code: String = chars.by_ref().take(digits).collect();
    if code.len() != digits || !code.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LiteralError::Escape(code));
    }
    u32::from_str_radix(&code, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or(LiteralError::Escape(code))
}
