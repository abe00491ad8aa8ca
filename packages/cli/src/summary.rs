//! Plain-text rendering of lookup results for the terminal.

use std::fmt::Write as _;

use vagdata_road_models::{AggregateResult, AttributeResult};
use vagdata_trafikverket::registry;

/// Renders `result` as a few indented lines.
#[must_use]
pub fn format_result(result: &AggregateResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Point: E {:.3}, N {:.3} (SWEREF 99 TM)",
        result.query_point.easting, result.query_point.northing
    );

    let Some(element_id) = &result.resolve.element_id else {
        match &result.resolve.error_message {
            Some(error) => {
                let _ = writeln!(out, "Lookup failed: {error}");
            }
            None => {
                let _ = writeln!(out, "No road found near this point");
            }
        }
        return out;
    };

    match result.resolve.offset {
        Some(offset) => {
            let _ = writeln!(out, "Element: {element_id} (offset {offset:.2} m)");
        }
        None => {
            let _ = writeln!(out, "Element: {element_id}");
        }
    }

    for attribute in result.attributes.values() {
        let _ = writeln!(out, "  {}: {}", attribute.label(), describe(attribute));
    }

    out
}

fn describe(attribute: &AttributeResult) -> String {
    if !attribute.success {
        return match &attribute.error_message {
            Some(error) => format!("{} ({error})", attribute.message),
            None => attribute.message.clone(),
        };
    }

    let values = registry::try_attribute(attribute.kind)
        .map(|definition| attribute.values_of(&definition.primary_field))
        .unwrap_or_default();

    if values.is_empty() {
        attribute.message.clone()
    } else {
        values.join(", ")
    }
}
