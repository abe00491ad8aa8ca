//! Attribute registry loaded from TOML files embedded at compile time.
//!
//! Each file in `attributes/` maps one [`AttributeKind`] to the upstream
//! object type, the fields to request, and the messages shown for its
//! results. `snap.toml` describes the snap-to-network query.
//!
//! The registry is static configuration. A malformed table is a build
//! defect, so loading it panics instead of returning an error.

use std::sync::LazyLock;

use serde::Deserialize;
use vagdata_road_models::AttributeKind;

/// Upstream query definition for one attribute kind.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDefinition {
    /// Which kind this definition serves.
    pub kind: AttributeKind,
    /// Upstream object type (e.g. `"Hastighetsgräns"`).
    pub object_type: String,
    /// Upstream namespace.
    pub namespace: String,
    /// Upstream schema version.
    pub schema_version: String,
    /// Field holding the network element id.
    #[serde(default = "default_element_id_field")]
    pub element_id_field: String,
    /// Field shown as the headline value of each record.
    pub primary_field: String,
    /// Fields to request (`INCLUDE`).
    pub fields: Vec<String>,
    /// Result summaries.
    pub messages: MessageTemplates,
}

/// Singular/plural/empty summaries for an attribute kind.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageTemplates {
    /// Used for exactly one record.
    pub singular: String,
    /// Used for two or more records; `{count}` is replaced.
    pub plural: String,
    /// Used when there are no records.
    pub empty: String,
}

impl MessageTemplates {
    /// Picks and fills the template for `count` records.
    #[must_use]
    pub fn render(&self, count: usize) -> String {
        match count {
            0 => self.empty.clone(),
            1 => self.singular.replace("{count}", "1"),
            n => self.plural.replace("{count}", &n.to_string()),
        }
    }
}

/// Upstream query definition for the snap-to-network lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapDefinition {
    /// Object type the evaluation function runs against.
    pub object_type: String,
    /// Upstream namespace.
    pub namespace: String,
    /// Upstream schema version.
    pub schema_version: String,
    /// Alias under which the evaluation result is returned.
    pub alias: String,
    /// Function template with `{easting}`, `{northing}`, `{max_distance}`.
    pub function: String,
    /// Field holding the matched element id.
    pub element_id_field: String,
    /// Field holding the offset along the element.
    pub offset_field: String,
    /// Field holding the snapped point as WKT. Dots denote nesting.
    pub geometry_field: String,
}

impl SnapDefinition {
    /// Fills the function template for one query.
    #[must_use]
    pub fn render_function(&self, easting: f64, northing: f64, max_distance: f64) -> String {
        self.function
            .replace("{easting}", &format!("{easting:.3}"))
            .replace("{northing}", &format!("{northing:.3}"))
            .replace("{max_distance}", &format!("{max_distance}"))
    }
}

fn default_element_id_field() -> String {
    "Element_Id".to_string()
}

// ── Compile-time embedded TOML files ────────────────────────────────

const ATTRIBUTE_TOMLS: &[(&str, &str)] = &[
    ("road_number", include_str!("../attributes/road_number.toml")),
    ("street_name", include_str!("../attributes/street_name.toml")),
    (
        "functional_road_class",
        include_str!("../attributes/functional_road_class.toml"),
    ),
    ("speed_limit", include_str!("../attributes/speed_limit.toml")),
    (
        "road_authority",
        include_str!("../attributes/road_authority.toml"),
    ),
    ("road_width", include_str!("../attributes/road_width.toml")),
];

const SNAP_TOML: &str = include_str!("../snap.toml");

static ATTRIBUTES: LazyLock<Vec<AttributeDefinition>> = LazyLock::new(|| {
    ATTRIBUTE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse attribute definition '{name}': {e}"))
        })
        .collect()
});

static SNAP: LazyLock<SnapDefinition> = LazyLock::new(|| {
    toml::de::from_str(SNAP_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse snap definition: {e}"))
});

/// Returns every attribute definition.
#[must_use]
pub fn all_attributes() -> &'static [AttributeDefinition] {
    &ATTRIBUTES
}

/// Returns the definition for `kind`.
///
/// # Panics
///
/// Panics if no embedded definition exists for `kind`.
#[must_use]
pub fn attribute(kind: AttributeKind) -> &'static AttributeDefinition {
    try_attribute(kind).unwrap_or_else(|| panic!("No attribute definition for '{kind}'"))
}

/// Returns the definition for `kind`, if one is registered.
#[must_use]
pub fn try_attribute(kind: AttributeKind) -> Option<&'static AttributeDefinition> {
    ATTRIBUTES.iter().find(|def| def.kind == kind)
}

/// Returns the snap-to-network definition.
#[must_use]
pub fn snap_definition() -> &'static SnapDefinition {
    &SNAP
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn every_kind_has_exactly_one_definition() {
        let defs = all_attributes();
        assert_eq!(defs.len(), AttributeKind::all().len());
        let kinds: BTreeSet<_> = defs.iter().map(|d| d.kind).collect();
        for kind in AttributeKind::all() {
            assert!(kinds.contains(kind), "Missing definition for {kind}");
        }
    }

    #[test]
    fn file_names_match_kinds() {
        for ((name, _), def) in ATTRIBUTE_TOMLS.iter().zip(all_attributes()) {
            assert_eq!(*name, def.kind.as_ref());
        }
    }

    #[test]
    fn definitions_request_their_primary_field() {
        for def in all_attributes() {
            assert!(!def.object_type.is_empty(), "{} has no object type", def.kind);
            assert!(
                def.fields.contains(&def.primary_field),
                "{} does not request its primary field {}",
                def.kind,
                def.primary_field
            );
            assert!(
                def.fields.contains(&def.element_id_field),
                "{} does not request its element id field",
                def.kind
            );
        }
    }

    #[test]
    fn object_types_are_unique() {
        let mut seen = BTreeSet::new();
        for def in all_attributes() {
            assert!(
                seen.insert(&def.object_type),
                "Duplicate object type: {}",
                def.object_type
            );
        }
    }

    #[test]
    fn renders_messages_by_count() {
        let messages = &attribute(AttributeKind::SpeedLimit).messages;
        assert_eq!(messages.render(0), "No speed limit found at this location");
        assert_eq!(messages.render(1), "Found 1 speed limit");
        assert_eq!(messages.render(3), "Found 3 speed limits");
    }

    #[test]
    fn snap_function_is_filled() {
        let f = snap_definition().render_function(500_000.0, 6_580_000.0, 500.0);
        assert!(f.contains("500000.000, 6580000.000"));
        assert!(f.contains("MaxDistance=500"));
        assert!(!f.contains('{'));
    }
}
