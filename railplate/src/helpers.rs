//! The closed set of helper transforms callable from placeholders.
//!
//! Templates cannot call arbitrary functions.  The engine recognizes
//! exactly the call shapes below; any other call resolves to the empty
//! string.  All helpers are pure functions over already-resolved
//! values.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::value::Value;

/// Reporting marks with the suffix word their display label carries.
/// Marks missing from this table pass through unchanged.
const ROAD_SUFFIXES: &[(&str, &str)] = &[
    ("BNSF", "Railway"),
    ("CN", "Railway"),
    ("CP", "Railway"),
    ("CSX", "Transportation"),
    ("KCS", "Railway"),
    ("NS", "Railway"),
    ("UP", "Railroad"),
];

/// Model prefixes by builder family, tested in order.  The GE entries
/// come first so `ES44DC` lands on `ES` and never on the EMD `E`.
const MODEL_FAMILIES: &[(&str, &str)] = &[
    ("ES", "GE"),
    ("ET", "GE"),
    ("AC", "GE"),
    ("C4", "GE"),
    ("Dash", "GE"),
    ("U", "GE"),
    ("B", "GE"),
    ("SD", "EMD"),
    ("GP", "EMD"),
    ("SW", "EMD"),
    ("MP", "EMD"),
    ("DD", "EMD"),
    ("F", "EMD"),
    ("E", "EMD"),
];

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A recognized helper transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    /// `formatRailroadName(mark)`
    RailroadName,
    /// `formatModelName(model)`
    ModelName,
    /// `encodeURIComponent(field)`
    UrlEncode,
}

impl Helper {
    /// Resolves a call name against the closed helper set.
    pub fn from_name(name: &str) -> Option<Helper> {
        match name {
            "formatRailroadName" => Some(Helper::RailroadName),
            "formatModelName" => Some(Helper::ModelName),
            "encodeURIComponent" => Some(Helper::UrlEncode),
            _ => None,
        }
    }

    /// Invokes the helper on its resolved arguments.
    pub fn invoke(self, args: &[Value]) -> Value {
        let arg = args.first().cloned().unwrap_or(Value::UNDEFINED);
        match self {
            Helper::RailroadName => format_railroad_name(&arg),
            Helper::ModelName => format_model_name(&arg),
            Helper::UrlEncode => url_encode(&arg),
        }
    }
}

/// Expands a reporting mark into its display label.
///
/// `BNSF` becomes `BNSF Railway`; a mark outside the table passes
/// through unchanged; an absent mark renders as the empty string.
pub fn format_railroad_name(mark: &Value) -> Value {
    if mark.is_undefined() || mark.is_none() {
        return Value::UNDEFINED;
    }
    let mark = mark.to_string();
    match ROAD_SUFFIXES.iter().find(|(code, _)| *code == mark) {
        Some((code, suffix)) => Value::from(format!("{code} {suffix}")),
        None => Value::from(mark),
    }
}

/// Prefixes a locomotive model code with its builder family.
///
/// `ES44DC` becomes `GE ES44DC`, `SD70ACe` becomes `EMD SD70ACe`; an
/// unrecognized code passes through unchanged; an absent code renders
/// as the literal `Unknown`.
pub fn format_model_name(model: &Value) -> Value {
    if model.is_undefined() || model.is_none() {
        return Value::from("Unknown");
    }
    let model = model.to_string();
    match MODEL_FAMILIES
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
    {
        Some((_, family)) => Value::from(format!("{family} {model}")),
        None => Value::from(model),
    }
}

/// Percent-encodes a value with `encodeURIComponent` semantics.
pub fn url_encode(value: &Value) -> Value {
    if value.is_undefined() || value.is_none() {
        return Value::UNDEFINED;
    }
    Value::from(utf8_percent_encode(&value.to_string(), URI_COMPONENT).to_string())
}

/// One of the recognized `new Date()` call shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// `new Date().toLocaleDateString()`, rendered as `M/D/YYYY`
    LocaleDate,
    /// `new Date().toLocaleTimeString()`, rendered as `H:MM:SS AM`
    LocaleTime,
    /// `new Date().getFullYear()`, the bare year
    Year,
}

impl Clock {
    /// Resolves a `Date` method name against the recognized shapes.
    pub fn from_method(name: &str) -> Option<Clock> {
        match name {
            "toLocaleDateString" => Some(Clock::LocaleDate),
            "toLocaleTimeString" => Some(Clock::LocaleTime),
            "getFullYear" => Some(Clock::Year),
            _ => None,
        }
    }

    /// Produces the current date/time in the fixed en-US shape.
    pub fn invoke(self) -> Value {
        let now = OffsetDateTime::now_utc();
        match self {
            Clock::LocaleDate => {
                let format = format_description!("[month padding:none]/[day padding:none]/[year]");
                match now.format(format) {
                    Ok(formatted) => Value::from(formatted),
                    Err(_) => Value::UNDEFINED,
                }
            }
            Clock::LocaleTime => {
                let format = format_description!(
                    "[hour repr:12 padding:none]:[minute]:[second] [period case:upper]"
                );
                match now.format(format) {
                    Ok(formatted) => Value::from(formatted),
                    Err(_) => Value::UNDEFINED,
                }
            }
            Clock::Year => Value::from(i64::from(now.year())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_railroad_name() {
        assert_eq!(
            format_railroad_name(&Value::from("BNSF")),
            Value::from("BNSF Railway")
        );
        assert_eq!(
            format_railroad_name(&Value::from("UP")),
            Value::from("UP Railroad")
        );
        // unknown marks pass through unchanged
        assert_eq!(format_railroad_name(&Value::from("ZZ")), Value::from("ZZ"));
        assert_eq!(format_railroad_name(&Value::UNDEFINED).to_string(), "");
        assert_eq!(format_railroad_name(&Value::from(())).to_string(), "");
    }

    #[test]
    fn test_model_name() {
        assert_eq!(
            format_model_name(&Value::from("ES44DC")),
            Value::from("GE ES44DC")
        );
        assert_eq!(
            format_model_name(&Value::from("SD70ACe")),
            Value::from("EMD SD70ACe")
        );
        assert_eq!(
            format_model_name(&Value::from("Dash 9-44CW")),
            Value::from("GE Dash 9-44CW")
        );
        assert_eq!(format_model_name(&Value::from("Krauss")), Value::from("Krauss"));
        assert_eq!(format_model_name(&Value::UNDEFINED), Value::from("Unknown"));
        assert_eq!(format_model_name(&Value::from(())), Value::from("Unknown"));
    }

    #[test]
    fn test_url_encode() {
        assert_eq!(
            url_encode(&Value::from("Cajon Pass & Hill 582")),
            Value::from("Cajon%20Pass%20%26%20Hill%20582")
        );
        assert_eq!(url_encode(&Value::from("a-b_c.d!e~f")), Value::from("a-b_c.d!e~f"));
        assert_eq!(url_encode(&Value::UNDEFINED).to_string(), "");
    }

    #[test]
    fn test_clock_shapes() {
        assert_eq!(Clock::from_method("getFullYear"), Some(Clock::Year));
        assert_eq!(Clock::from_method("toISOString"), None);
        let year = Clock::Year.invoke().to_string();
        assert_eq!(year.len(), 4);
        let date = Clock::LocaleDate.invoke().to_string();
        assert_eq!(date.matches('/').count(), 2);
        let time = Clock::LocaleTime.invoke().to_string();
        assert!(time.ends_with("AM") || time.ends_with("PM"));
    }
}
