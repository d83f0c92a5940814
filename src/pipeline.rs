use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

use crate::errors::{AppError, AppResult, RecordError, StoreError};
use crate::geocode::Geocoder;
use crate::lease::{owner_token, LeaseGrant, RunLock};
use crate::model::{Page, PageRequest, RawRecord};
use crate::store::{RawRecordStore, RestaurantStore};
use crate::transform::{normalize_record, TransformOptions};

pub use crate::transform::LocationPolicy;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pages: usize,
    pub fetched: usize,
    pub persisted: usize,
    pub skipped_location: usize,
    pub failed: usize,
    /// Records written whose raw row disappeared before the flag was cleared.
    pub vanished: usize,
}

enum RecordOutcome {
    Persisted,
    Vanished,
    Skipped(RecordError),
}

pub struct Pipeline {
    raw: Arc<dyn RawRecordStore>,
    restaurants: Arc<dyn RestaurantStore>,
    geocoder: Arc<dyn Geocoder>,
    lock: Arc<dyn RunLock>,
    options: TransformOptions,
    guard: AsyncMutex<()>,
}

impl Pipeline {
    pub fn new(
        raw: Arc<dyn RawRecordStore>,
        restaurants: Arc<dyn RestaurantStore>,
        geocoder: Arc<dyn Geocoder>,
        lock: Arc<dyn RunLock>,
        options: TransformOptions,
    ) -> Self {
        Self {
            raw,
            restaurants,
            geocoder,
            lock,
            options,
            guard: AsyncMutex::new(()),
        }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Normalizes every dirty raw record, one page at a time, while holding
    /// the run lease. Store failures abort the run; record failures do not.
    pub async fn run(&self, page_size: usize) -> AppResult<RunSummary> {
        if page_size == 0 {
            return Err(AppError::Config("page size must be positive".into()));
        }
        if i64::try_from(page_size).is_err() {
            return Err(AppError::Config(format!("page size {page_size} is too large")));
        }
        let Ok(_local) = self.guard.try_lock() else {
            return Err(AppError::AlreadyRunning {
                owner: "this process".into(),
            });
        };

        let owner = owner_token();
        let Some(grant) = self.lock.acquire(&owner).await? else {
            let holder = self
                .lock
                .holder()
                .await?
                .unwrap_or_else(|| "unknown owner".into());
            return Err(AppError::AlreadyRunning { owner: holder });
        };

        info!(
            target: "pipeline",
            page_size,
            policy = self.options.location_policy.as_str(),
            strict = self.options.strict_fields,
            "normalization run started"
        );
        let outcome = self.drive(&grant, page_size).await;
        let released = self.lock.release(grant).await;

        match outcome {
            Ok(summary) => {
                released?;
                info!(target: "pipeline", ?summary, "normalization run finished");
                Ok(summary)
            }
            Err(err) => {
                if let Err(release_err) = released {
                    warn!(target: "pipeline", error = %release_err, "failed to release run lease");
                }
                error!(target: "pipeline", error = %err, "normalization run aborted");
                Err(err)
            }
        }
    }

    async fn drive(&self, grant: &LeaseGrant, page_size: usize) -> AppResult<RunSummary> {
        let mut summary = RunSummary::default();
        let mut request = PageRequest::first(page_size);

        loop {
            let page = self.raw.fetch_dirty_page(&request).await?;
            summary.pages += 1;
            if page.is_empty() {
                break;
            }
            info!(
                target: "pipeline",
                page = page.index,
                records = page.items.len(),
                "processing dirty page"
            );
            self.process_page(&page, &mut summary).await?;

            if !self.lock.renew(grant).await? {
                return Err(AppError::LeaseLost(grant.name.clone()));
            }
            request = request.next(&page);
        }

        Ok(summary)
    }

    async fn process_page(
        &self,
        page: &Page<RawRecord>,
        summary: &mut RunSummary,
    ) -> AppResult<()> {
        for record in page.items.iter().filter(|record| record.dirty) {
            summary.fetched += 1;
            match self.process_record(record).await? {
                RecordOutcome::Persisted => summary.persisted += 1,
                RecordOutcome::Vanished => {
                    summary.persisted += 1;
                    summary.vanished += 1;
                }
                RecordOutcome::Skipped(RecordError::InvalidLocation(reason)) => {
                    warn!(
                        target: "pipeline",
                        record_id = %record.id,
                        %reason,
                        "skipping record without a valid location"
                    );
                    summary.skipped_location += 1;
                }
                RecordOutcome::Skipped(err) => {
                    warn!(
                        target: "pipeline",
                        record_id = %record.id,
                        error = %err,
                        "failed to normalize raw record"
                    );
                    summary.failed += 1;
                }
            }
        }
        Ok(())
    }

    async fn process_record(&self, record: &RawRecord) -> AppResult<RecordOutcome> {
        let restaurant = match normalize_record(record, &self.options, self.geocoder.as_ref()) {
            Ok(restaurant) => restaurant,
            Err(err) => return Ok(RecordOutcome::Skipped(err)),
        };

        self.restaurants.upsert(&restaurant).await?;
        match self.raw.clear_dirty(&record.id).await {
            Ok(()) => Ok(RecordOutcome::Persisted),
            Err(StoreError::NotFound(id)) => {
                warn!(
                    target: "pipeline",
                    record_id = %id,
                    "raw record vanished before its dirty flag was cleared"
                );
                Ok(RecordOutcome::Vanished)
            }
            Err(err) => Err(err.into()),
        }
    }
}
