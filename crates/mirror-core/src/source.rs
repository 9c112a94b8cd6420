use crate::{
    error::SourceError,
    rate::RateBudget,
    retry::{RetryError, RetryPolicy},
};
use async_trait::async_trait;
use model::{entity::EntityKind, page::CatalogPage, window::TimeWindow};
use std::sync::Arc;

/// A paginated, time-filtered catalog endpoint.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches one page of records modified within `window`, starting at
    /// `start_index`, at most `results_per_page` records.
    async fn fetch_page(
        &self,
        entity: EntityKind,
        window: &TimeWindow,
        start_index: u64,
        results_per_page: usize,
    ) -> Result<CatalogPage, SourceError>;
}

#[async_trait]
impl<T: CatalogSource + ?Sized> CatalogSource for Arc<T> {
    async fn fetch_page(
        &self,
        entity: EntityKind,
        window: &TimeWindow,
        start_index: u64,
        results_per_page: usize,
    ) -> Result<CatalogPage, SourceError> {
        (**self).fetch_page(entity, window, start_index, results_per_page).await
    }
}

/// Wraps any source with the shared rate budget and bounded retries.
///
/// The budget is acquired before every attempt, retries included, so no
/// amount of retry pressure can push the process past the configured
/// ceiling. `Stop`-class errors bubble up untouched.
pub struct ResilientSource<S> {
    inner: S,
    budget: Arc<RateBudget>,
    retry: RetryPolicy,
}

impl<S: CatalogSource> ResilientSource<S> {
    pub fn new(inner: S, budget: Arc<RateBudget>, retry: RetryPolicy) -> Self {
        Self { inner, budget, retry }
    }

    pub async fn fetch_page(
        &self,
        entity: EntityKind,
        window: &TimeWindow,
        start_index: u64,
        results_per_page: usize,
    ) -> Result<CatalogPage, RetryError<SourceError>> {
        self.retry
            .run(
                || async {
                    self.budget.acquire().await;
                    self.inner
                        .fetch_page(entity, window, start_index, results_per_page)
                        .await
                },
                SourceError::retry_class,
            )
            .await
    }
}
