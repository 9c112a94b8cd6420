#![allow(dead_code)]

use crate::fakes::FakeCatalog;
use chrono::Duration as ChronoDuration;
use mirror_core::{rate::RateBudget, retry::RetryPolicy, source::ResilientSource};
use mirror_runtime::orchestrator::{SyncOptions, SyncOrchestrator};
use model::{entity::EntityKind, sync::SyncMode};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

pub mod fakes;

/// Default page size for scenarios; small enough that a handful of records
/// spans several pages.
pub const TEST_PAGE_SIZE: usize = 2;

/// Wires an orchestrator over fakes with a budget and retry policy sized so
/// tests never stall on the rate limiter.
pub fn orchestrator(
    source: Arc<FakeCatalog>,
    store: Arc<fakes::MemoryStore>,
    archive: Arc<dyn mirror_core::archive::PageArchive>,
    mode: SyncMode,
    entities: Vec<EntityKind>,
) -> SyncOrchestrator<Arc<FakeCatalog>> {
    let resilient = ResilientSource::new(
        source,
        Arc::new(RateBudget::new(10_000, Duration::from_secs(1))),
        RetryPolicy::new(5, Duration::from_millis(10), Duration::from_millis(200)),
    );
    let opts = SyncOptions {
        mode,
        entities,
        results_per_page: TEST_PAGE_SIZE,
        safety_delay: ChronoDuration::minutes(5),
    };
    SyncOrchestrator::new(resilient, store, archive, opts, CancellationToken::new())
}
