use crate::types::errors::VelocityParseError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;
use std::str::FromStr;

/// Short-window aggregate counters describing a customer's recent activity.
///
/// Every counter is optional so that a window which could not be parsed is
/// stored and served as an empty document (`{}`) rather than a row of zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityWindow {
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub num_transactions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub unique_merchants: Option<u64>,
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub unique_countries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_single_amount: Option<f64>
}

impl FromStr for VelocityWindow {
    type Err = VelocityParseError;

    /// Accepts either a JSON object or a Python dictionary literal such as
    /// `{'num_transactions': 12, 'total_amount': 530.5}`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let json = dictionary_literal_to_json(value.trim())?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Counters written as integral floats (`5.0`) are accepted. A negative or
/// fractional counter is dropped on its own, the rest of the window is kept.
fn counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let number = Option::<Number>::deserialize(deserializer)?;

    Ok(number.and_then(|number| {
        number.as_u64().or_else(|| {
            number.as_f64()
                .filter(|value| *value >= 0.0 && value.fract() == 0.0)
                .map(|value| value as u64)
        })
    }))
}

fn dictionary_literal_to_json(literal: &str) -> Result<String, VelocityParseError> {
    if !literal.starts_with('{') {
        return Err(VelocityParseError::NotADictionary(literal.to_string()));
    }

    let mut json = String::with_capacity(literal.len());
    let mut quote: Option<char> = None;
    let mut chars = literal.chars().peekable();

    while let Some(current) = chars.next() {
        if let Some(open) = quote {
            match current {
                '\\' => match chars.next() {
                    Some('\'') => json.push('\''),
                    Some(escaped) => {
                        json.push('\\');
                        json.push(escaped);
                    }
                    None => return Err(VelocityParseError::UnterminatedString)
                },
                '"' if open == '\'' => json.push_str("\\\""),
                _ if current == open => {
                    json.push('"');
                    quote = None;
                }
                _ => json.push(current)
            }

            continue;
        }

        match current {
            '\'' | '"' => {
                json.push('"');
                quote = Some(current);
            }
            //NOTE: Exponents such as `1e5` are part of a number, not a bare word
            _ if current.is_ascii_alphabetic() && !json.ends_with(|c: char| c.is_ascii_digit() || c == '.') => {
                let mut word = String::from(current);

                while let Some(&next) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }

                match word.as_str() {
                    "True" | "true" => json.push_str("true"),
                    "False" | "false" => json.push_str("false"),
                    "None" | "null" => json.push_str("null"),
                    _ => return Err(VelocityParseError::UnexpectedToken(word))
                }
            }
            _ => json.push(current)
        }
    }

    if quote.is_some() {
        return Err(VelocityParseError::UnterminatedString);
    }

    Ok(json)
}
