//! XML query documents for the Trafikverket API.
//!
//! Every request is a `<REQUEST>` with a `<LOGIN>` carrying the API key and
//! one `<QUERY>` naming the object type. See
//! <https://api.trafikinfo.trafikverket.se/API/TheRequest>

use std::fmt::Write as _;

use vagdata_road_models::ElementId;

/// A filter on the queried objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `<EQ name=".." value=".."/>`
    Equals {
        /// Field name.
        field: String,
        /// Required value.
        value: String,
    },
}

impl Filter {
    /// Matches objects whose `field` equals `element_id`.
    #[must_use]
    pub fn element(field: &str, element_id: &ElementId) -> Self {
        Self::Equals {
            field: field.to_string(),
            value: element_id.as_str().to_string(),
        }
    }
}

/// An evaluation function whose result comes back under `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eval {
    /// Key of the result in `INFO.EVALRESULT`.
    pub alias: String,
    /// Function expression.
    pub function: String,
}

/// One `<QUERY>` against the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Object type, e.g. `"Hastighetsgräns"`.
    pub object_type: String,
    /// Namespace, e.g. `"vägdata.nvdb_dk_o"`.
    pub namespace: String,
    /// Schema version.
    pub schema_version: String,
    /// Maximum number of objects to return.
    pub limit: Option<u32>,
    /// Object filter.
    pub filter: Option<Filter>,
    /// Fields to return; empty returns all.
    pub include: Vec<String>,
    /// Evaluation function.
    pub eval: Option<Eval>,
}

impl QueryRequest {
    /// Renders the full request document.
    #[must_use]
    pub fn to_xml(&self, api_key: &str) -> String {
        let mut xml = String::from("<REQUEST>");
        let _ = write!(xml, "<LOGIN authenticationkey=\"{}\"/>", escape(api_key));
        let _ = write!(
            xml,
            "<QUERY objecttype=\"{}\" namespace=\"{}\" schemaversion=\"{}\"",
            escape(&self.object_type),
            escape(&self.namespace),
            escape(&self.schema_version),
        );
        if let Some(limit) = self.limit {
            let _ = write!(xml, " limit=\"{limit}\"");
        }
        xml.push('>');

        if let Some(filter) = &self.filter {
            xml.push_str("<FILTER>");
            match filter {
                Filter::Equals { field, value } => {
                    let _ = write!(
                        xml,
                        "<EQ name=\"{}\" value=\"{}\"/>",
                        escape(field),
                        escape(value)
                    );
                }
            }
            xml.push_str("</FILTER>");
        }

        for field in &self.include {
            let _ = write!(xml, "<INCLUDE>{}</INCLUDE>", escape(field));
        }

        if let Some(eval) = &self.eval {
            let _ = write!(
                xml,
                "<EVAL alias=\"{}\" function=\"{}\"/>",
                escape(&eval.alias),
                escape(&eval.function)
            );
        }

        xml.push_str("</QUERY></REQUEST>");
        xml
    }

    /// The request with the key masked, for logging.
    #[must_use]
    pub fn to_redacted_xml(&self) -> String {
        self.to_xml("***")
    }
}

/// Escapes the five XML special characters.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
