//! In-memory [`RoadDataTransport`] for tests.
//!
//! Responses are routed by query: the snap query (the one carrying an
//! `EVAL`) gets the snap response, every other query is routed by its
//! object type. All requests are recorded.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use vagdata_road_models::AttributeKind;

use crate::UpstreamError;
use crate::registry;
use crate::request::QueryRequest;
use crate::transport::RoadDataTransport;

/// A canned reply.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    /// Reply with this JSON body.
    Json(Value),
    /// Reply with a non-success HTTP status.
    Status(u16),
    /// Wait, then reply.
    Delayed(Duration, Box<Self>),
}

/// Scripted transport. Unrouted queries fail as malformed.
#[derive(Debug, Default)]
pub struct FakeTransport {
    snap: Option<FakeResponse>,
    objects: BTreeMap<String, FakeResponse>,
    requests: Mutex<Vec<QueryRequest>>,
}

impl FakeTransport {
    /// A transport with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reply to the snap query.
    #[must_use]
    pub fn with_snap(mut self, response: FakeResponse) -> Self {
        self.snap = Some(response);
        self
    }

    /// Sets the reply for the object type registered for `kind`.
    #[must_use]
    pub fn with_kind(mut self, kind: AttributeKind, response: FakeResponse) -> Self {
        self.objects
            .insert(registry::attribute(kind).object_type.clone(), response);
        self
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of non-snap queries received.
    #[must_use]
    pub fn attribute_request_count(&self) -> usize {
        self.requests().iter().filter(|r| r.eval.is_none()).count()
    }

    fn route(&self, request: &QueryRequest) -> Option<FakeResponse> {
        if request.eval.is_some() {
            self.snap.clone()
        } else {
            self.objects.get(&request.object_type).cloned()
        }
    }
}

#[async_trait]
impl RoadDataTransport for FakeTransport {
    async fn query(&self, request: &QueryRequest) -> Result<Value, UpstreamError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let mut response = self.route(request);
        loop {
            match response {
                None => {
                    return Err(UpstreamError::Malformed {
                        message: format!("no fake response for {}", request.object_type),
                    });
                }
                Some(FakeResponse::Json(body)) => return Ok(body),
                Some(FakeResponse::Status(status)) => {
                    return Err(UpstreamError::Status {
                        status,
                        body_preview: String::new(),
                    });
                }
                Some(FakeResponse::Delayed(delay, inner)) => {
                    tokio::time::sleep(delay).await;
                    response = Some(*inner);
                }
            }
        }
    }
}

/// A snap response matching `element_id`.
#[must_use]
pub fn snap_body(element_id: &str, offset: f64, wkt: &str) -> Value {
    let snap = registry::snap_definition();
    let mut matched = serde_json::Map::new();
    matched.insert(snap.element_id_field.clone(), json!(element_id));
    matched.insert(snap.offset_field.clone(), json!(offset));
    matched.insert(snap.geometry_field.clone(), json!(wkt));

    let mut eval = serde_json::Map::new();
    eval.insert(snap.alias.clone(), Value::Object(matched));

    json!({"RESPONSE": {"RESULT": [{"INFO": {"EVALRESULT": [eval]}}]}})
}

/// A snap response with nothing in range.
#[must_use]
pub fn no_match_body() -> Value {
    let mut eval = serde_json::Map::new();
    eval.insert(registry::snap_definition().alias.clone(), Value::Null);
    json!({"RESPONSE": {"RESULT": [{"INFO": {"EVALRESULT": [eval]}}]}})
}

/// An attribute response holding `items` under `object_type`.
#[must_use]
pub fn objects_body(object_type: &str, items: Value) -> Value {
    let mut result = serde_json::Map::new();
    result.insert(object_type.to_string(), items);
    json!({"RESPONSE": {"RESULT": [result]}})
}

/// An attribute response for `kind` whose records carry `values` in the
/// kind's primary field.
#[must_use]
pub fn primary_values_body(kind: AttributeKind, values: &[&str]) -> Value {
    let definition = registry::attribute(kind);
    let items: Vec<Value> = values
        .iter()
        .map(|v| {
            let mut record = serde_json::Map::new();
            record.insert(definition.primary_field.clone(), json!(v));
            Value::Object(record)
        })
        .collect();
    objects_body(&definition.object_type, Value::Array(items))
}
