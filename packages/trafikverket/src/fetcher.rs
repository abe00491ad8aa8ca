//! Per-attribute queries keyed by a resolved element id.
//!
//! One parameterized fetch serves every [`AttributeKind`]: the registry
//! supplies the object type and fields, and [`response::collection`]
//! flattens whatever cardinality upstream returns into an ordered list.

use serde_json::Value;
use vagdata_road_models::{AttributeKind, AttributeResult, ElementId};

use crate::registry::{self, AttributeDefinition};
use crate::request::{Filter, QueryRequest};
use crate::response;
use crate::transport::RoadDataTransport;

/// Fetches one attribute kind for `element_id`.
///
/// Never fails: errors come back as [`AttributeResult::failed`].
///
/// # Panics
///
/// Panics if `kind` has no registry definition.
pub async fn fetch_attribute<T>(
    transport: &T,
    kind: AttributeKind,
    element_id: &ElementId,
) -> AttributeResult
where
    T: RoadDataTransport + ?Sized,
{
    fetch_attribute_raw(transport, kind, element_id).await.0
}

/// Like [`fetch_attribute`], but also returns the raw response body when
/// one was received.
///
/// # Panics
///
/// Panics if `kind` has no registry definition.
pub async fn fetch_attribute_raw<T>(
    transport: &T,
    kind: AttributeKind,
    element_id: &ElementId,
) -> (AttributeResult, Option<Value>)
where
    T: RoadDataTransport + ?Sized,
{
    let definition = registry::attribute(kind);
    let request = attribute_request(definition, element_id);

    let body = match transport.query(&request).await {
        Ok(body) => body,
        Err(e) => {
            log::warn!("{kind} query for element {element_id} failed: {e}");
            return (AttributeResult::failed(kind, e.to_string()), None);
        }
    };

    let items = response::first_result(&body)
        .and_then(|result| response::collection(result, &definition.object_type));

    let result = match items {
        Ok(items) => {
            log::debug!(
                "{kind} for element {element_id}: {} record(s)",
                items.len()
            );
            let message = definition.messages.render(items.len());
            AttributeResult::found(kind, items, message)
        }
        Err(e) => {
            log::warn!("Could not interpret {kind} response for element {element_id}: {e}");
            AttributeResult::failed(kind, e.to_string())
        }
    };

    (result, Some(body))
}

fn attribute_request(definition: &AttributeDefinition, element_id: &ElementId) -> QueryRequest {
    QueryRequest {
        object_type: definition.object_type.clone(),
        namespace: definition.namespace.clone(),
        schema_version: definition.schema_version.clone(),
        limit: None,
        filter: Some(Filter::element(&definition.element_id_field, element_id)),
        include: definition.fields.clone(),
        eval: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{self, FakeResponse, FakeTransport};
    use serde_json::json;

    fn element() -> ElementId {
        ElementId::new("E123")
    }

    #[tokio::test]
    async fn single_record_becomes_one_item() {
        let transport = FakeTransport::new().with_kind(
            AttributeKind::StreetName,
            FakeResponse::Json(fake::objects_body("Gatunamn", json!({"Namn": "Sveavägen"}))),
        );

        let result = fetch_attribute(&transport, AttributeKind::StreetName, &element()).await;

        assert!(result.success);
        assert_eq!(result.values_of("Namn"), vec!["Sveavägen"]);
        assert_eq!(result.message, "Found 1 street name");
    }

    #[tokio::test]
    async fn record_array_is_kept_in_order() {
        let transport = FakeTransport::new().with_kind(
            AttributeKind::SpeedLimit,
            FakeResponse::Json(fake::objects_body(
                "Hastighetsgräns",
                json!([
                    {"Högsta_tillåtna_hastighet": 70},
                    {"Högsta_tillåtna_hastighet": 50},
                ]),
            )),
        );

        let result = fetch_attribute(&transport, AttributeKind::SpeedLimit, &element()).await;

        assert_eq!(
            result.values_of("Högsta_tillåtna_hastighet"),
            vec!["70", "50"]
        );
        assert_eq!(result.message, "Found 2 speed limits");
    }

    #[tokio::test]
    async fn absent_collection_is_empty_success() {
        let transport = FakeTransport::new().with_kind(
            AttributeKind::RoadWidth,
            FakeResponse::Json(json!({"RESPONSE": {"RESULT": [{}]}})),
        );

        let result = fetch_attribute(&transport, AttributeKind::RoadWidth, &element()).await;

        assert!(result.success);
        assert!(result.items.is_empty());
        assert!(result.error_message.is_none());
        assert_eq!(result.message, "No road width found at this location");
    }

    #[tokio::test]
    async fn server_error_is_failure() {
        let transport = FakeTransport::new()
            .with_kind(AttributeKind::RoadAuthority, FakeResponse::Status(500));

        let result = fetch_attribute(&transport, AttributeKind::RoadAuthority, &element()).await;

        assert!(!result.success);
        assert!(result.items.is_empty());
        assert!(result.error_message.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn missing_envelope_is_failure() {
        let transport = FakeTransport::new().with_kind(
            AttributeKind::RoadNumber,
            FakeResponse::Json(json!({"result": []})),
        );

        let result = fetch_attribute(&transport, AttributeKind::RoadNumber, &element()).await;

        assert!(!result.success);
        assert!(result.items.is_empty());
    }

    #[tokio::test]
    async fn scalar_result_entry_is_failure() {
        let transport = FakeTransport::new().with_kind(
            AttributeKind::RoadNumber,
            FakeResponse::Json(json!({"RESPONSE": {"RESULT": ["E4"]}})),
        );

        let result = fetch_attribute(&transport, AttributeKind::RoadNumber, &element()).await;

        assert!(!result.success);
        assert!(result.items.is_empty());
    }

    #[tokio::test]
    async fn repeated_fetches_are_identical() {
        let transport = FakeTransport::new().with_kind(
            AttributeKind::FunctionalRoadClass,
            FakeResponse::Json(fake::objects_body(
                "FunktionellVägklass",
                json!([{"Klass": 2}, {"Klass": 3}]),
            )),
        );

        let first =
            fetch_attribute(&transport, AttributeKind::FunctionalRoadClass, &element()).await;
        let second =
            fetch_attribute(&transport, AttributeKind::FunctionalRoadClass, &element()).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn filters_on_element_and_includes_fields() {
        let transport = FakeTransport::new();

        fetch_attribute(&transport, AttributeKind::SpeedLimit, &element()).await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].object_type, "Hastighetsgräns");
        assert_eq!(
            requests[0].filter,
            Some(Filter::Equals {
                field: "Element_Id".to_string(),
                value: "E123".to_string(),
            })
        );
        assert!(
            requests[0]
                .include
                .contains(&"Högsta_tillåtna_hastighet".to_string())
        );
    }
}
