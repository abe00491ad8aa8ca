//! Latest-click-wins state for interactive callers.
//!
//! Each new click takes a [`QueryToken`] from [`LookupSession::begin`].
//! When its lookup finishes, [`LookupSession::complete`] stores the result
//! only if no newer click has begun in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use vagdata_road_models::{AggregateResult, ProjectedPoint};
use vagdata_trafikverket::transport::RoadDataTransport;

use crate::service::RoadDataService;

/// Identifies one in-flight lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryToken(u64);

impl QueryToken {
    /// The generation this token was issued for.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

/// Holds the most recent accepted result.
#[derive(Debug, Default)]
pub struct LookupSession {
    generation: AtomicU64,
    latest: Mutex<Option<AggregateResult>>,
}

impl LookupSession {
    /// An empty session at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new query, superseding every earlier token.
    pub fn begin(&self) -> QueryToken {
        QueryToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `token` still belongs to the newest query.
    #[must_use]
    pub fn is_current(&self, token: QueryToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }

    /// Stores `result` if `token` is still current. Returns whether it was
    /// accepted.
    pub fn complete(&self, token: QueryToken, result: AggregateResult) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        // Checked under the lock so a newer completion can't be overwritten.
        if !self.is_current(token) {
            log::debug!(
                "Dropping result of superseded query {} (current is {})",
                token.0,
                self.generation.load(Ordering::SeqCst)
            );
            return false;
        }
        *latest = Some(result);
        true
    }

    /// The most recent accepted result.
    #[must_use]
    pub fn latest(&self) -> Option<AggregateResult> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forgets the stored result and invalidates in-flight queries.
    pub fn clear(&self) {
        self.begin();
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Runs a lookup as the newest query. Returns the result if it was
    /// still current on completion, `None` if a newer query superseded it.
    pub async fn lookup<T: RoadDataTransport>(
        &self,
        service: &RoadDataService<T>,
        point: ProjectedPoint,
    ) -> Option<AggregateResult> {
        let token = self.begin();
        let result = service.get_road_data_for_point(point).await;
        self.complete(token, result.clone()).then_some(result)
    }
}
