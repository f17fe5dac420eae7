//! The static fallback page served when a template cannot be parsed.
//!
//! The fallback contract: a minimal valid HTML document carrying the
//! primary record's identifying fields and a link back to the site
//! root.  It contains no markers and therefore cannot itself fail.

use std::fmt::Write;

use serde::Serialize;

use crate::value::Value;

/// Fields of the primary record that identify it on the fallback page.
const IDENTIFYING_FIELDS: &[&str] = &["id", "railroad", "road_number", "number", "model", "name"];

/// Builds the minimal fallback document for a primary record.
pub fn fallback_page(record: &Value) -> String {
    let mut heading = String::new();
    for key in ["railroad", "road_number", "model"] {
        let value = record.get_attr(key);
        if value.is_undefined() || value.is_none() {
            continue;
        }
        if !heading.is_empty() {
            heading.push(' ');
        }
        write!(heading, "{value}").ok();
    }
    if heading.is_empty() {
        heading.push_str("Locomotive");
    }

    let mut rv = String::new();
    rv.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    writeln!(rv, "<title>{heading} - RailHub Pictures</title>").ok();
    rv.push_str("</head>\n<body>\n");
    writeln!(rv, "<h1>{heading}</h1>").ok();
    rv.push_str("<ul>\n");
    for key in IDENTIFYING_FIELDS {
        let value = record.get_attr(key);
        if value.is_undefined() || value.is_none() {
            continue;
        }
        writeln!(rv, "<li>{key}: {value}</li>").ok();
    }
    rv.push_str("</ul>\n");
    rv.push_str("<p><a href=\"/\">Back to RailHub Pictures</a></p>\n");
    rv.push_str("</body>\n</html>\n");
    rv
}

/// Renders a template, substituting the fallback page when the
/// template has a structural defect.
///
/// This is the whole recovery contract: structural errors are logged
/// and swallowed, and the response degrades to a static page that
/// still identifies the record.
pub fn render_or_fallback<S: Serialize>(source: &str, ctx: S, primary: &Value) -> String {
    match crate::render(source, ctx) {
        Ok(rv) => rv,
        Err(err) => {
            tracing::error!("template render failed, serving fallback page: {err}");
            fallback_page(primary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;

    #[test]
    fn test_fallback_carries_identifying_fields() {
        let record = context! {
            id => 3941,
            railroad => "BNSF",
            road_number => 3941,
            model => "ES44C4",
        };
        let page = fallback_page(&record);
        assert!(page.contains("3941"));
        assert!(page.contains("BNSF"));
        assert!(page.contains("ES44C4"));
        assert!(page.contains("<a href=\"/\">"));
        assert!(page.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_fallback_without_fields_still_valid() {
        let page = fallback_page(&Value::UNDEFINED);
        assert!(page.contains("<h1>Locomotive</h1>"));
    }
}
