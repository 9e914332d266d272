//! Utility functions for AlbertoX3
//!
//! Small argument helpers shared by extensions, plus async helpers in
//! [`aio`].

pub mod aio;

use serde_json::Value;

use crate::error::{AlbertoError, Result};

/// Coerce a loosely typed value into a boolean.
///
/// Accepts booleans, the integers `1`, `0` and `-1`, and the strings
/// `true`/`t`/`yes`/`y`/`1` and `false`/`f`/`no`/`n`/`0`/`-1` in any case.
///
/// # Errors
/// `AlbertoError::UnrecognisedBoolean` for anything else.
pub fn get_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) | Some(-1) => Ok(false),
            _ => Err(AlbertoError::UnrecognisedBoolean(n.to_string())),
        },
        Value::String(s) => parse_bool(s),
        other => Err(AlbertoError::UnrecognisedBoolean(other.to_string())),
    }
}

/// String form of [`get_bool`].
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "-1" => Ok(false),
        _ => Err(AlbertoError::UnrecognisedBoolean(s.to_string())),
    }
}

/// Integer argument converter with optional bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl IntRange {
    /// Unbounded converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter accepting `min..=max`.
    ///
    /// # Errors
    /// `AlbertoError::DeveloperArgument` if `min > max`.
    pub fn with_range(min: i64, max: i64) -> Result<Self> {
        if min > max {
            return Err(AlbertoError::DeveloperArgument(format!(
                "min is higher than max! {} > {}",
                min, max
            )));
        }
        Ok(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    /// Parse `argument` and check it against the bounds.
    pub fn convert(&self, argument: &str) -> Result<i64> {
        let value: i64 = argument
            .trim()
            .parse()
            .map_err(|_| AlbertoError::BadArgument(format!("'{}' is not a number", argument)))?;

        if let Some(min) = self.min {
            if value < min {
                return Err(AlbertoError::BadArgument(format!(
                    "argument smaller than {}!",
                    min
                )));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(AlbertoError::BadArgument(format!(
                    "argument bigger than {}!",
                    max
                )));
            }
        }
        Ok(value)
    }
}

/// Which of two mutually exclusive arguments was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOf<A, B> {
    First(A),
    Second(B),
}

/// Require exactly one of two named optional arguments.
///
/// # Errors
/// `AlbertoError::DeveloperArgument` naming both arguments when neither or
/// both are given.
pub fn exactly_one<A, B>(
    (first_name, first): (&str, Option<A>),
    (second_name, second): (&str, Option<B>),
) -> Result<OneOf<A, B>> {
    match (first, second) {
        (Some(a), None) => Ok(OneOf::First(a)),
        (None, Some(b)) => Ok(OneOf::Second(b)),
        (Some(_), Some(_)) => Err(AlbertoError::DeveloperArgument(format!(
            "Only one of {} and {} can be given",
            first_name, second_name
        ))),
        (None, None) => Err(AlbertoError::DeveloperArgument(format!(
            "Either {} or {} has to be given",
            first_name, second_name
        ))),
    }
}
