mod address;
mod category;
mod config;
mod db;
mod errors;
mod extract;
mod geocode;
mod lease;
mod model;
mod pipeline;
mod store;
mod transform;

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rusqlite::Connection as SqlConnection;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use address::{split_address, AddressParts};
pub use category::Category;
pub use config::AppConfig;
pub use db::{bootstrap, DatabaseContext};
pub use errors::{AppError, AppResult, RecordError, StoreError, StoreResult};
pub use extract::{extract, Coordinates, Field, FieldSet};
pub use geocode::{Geocoder, PlanarGeocoder};
pub use lease::{LeaseGrant, RunLock, SqliteRunLock};
pub use model::{NormalizedRestaurant, Page, PageRequest, RawRecord};
pub use pipeline::{LocationPolicy, Pipeline, RunSummary};
pub use store::{RawRecordStore, RestaurantStore, SqliteRawStore, SqliteRestaurantStore};
pub use transform::{normalize_record, TransformOptions};

/// Everything a scheduler needs to trigger normalization runs against one
/// catalog database.
pub struct CatalogApp {
    db: Arc<Mutex<SqlConnection>>,
    db_path: PathBuf,
    config: AppConfig,
    raw: SqliteRawStore,
    restaurants: SqliteRestaurantStore,
    pipeline: Pipeline,
}

impl CatalogApp {
    pub fn initialize(config: AppConfig) -> AppResult<Self> {
        init_tracing();
        let DatabaseContext { connection, path } = bootstrap(&config.database_path)?;
        let db = Arc::new(Mutex::new(connection));

        let raw = SqliteRawStore::new(Arc::clone(&db));
        let restaurants = SqliteRestaurantStore::new(Arc::clone(&db));
        let lock = SqliteRunLock::new(
            Arc::clone(&db),
            config.lease_name.clone(),
            config.lease_ttl_secs,
        );
        let pipeline = Pipeline::new(
            Arc::new(raw.clone()),
            Arc::new(restaurants.clone()),
            Arc::new(PlanarGeocoder),
            Arc::new(lock),
            TransformOptions {
                location_policy: config.location_policy,
                strict_fields: config.strict_fields,
            },
        );

        Ok(Self {
            db,
            db_path: path,
            config,
            raw,
            restaurants,
            pipeline,
        })
    }

    /// One run with the configured page size.
    pub async fn run_once(&self) -> AppResult<RunSummary> {
        self.pipeline.run(self.config.page_size).await
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn raw_store(&self) -> &SqliteRawStore {
        &self.raw
    }

    pub fn restaurant_store(&self) -> &SqliteRestaurantStore {
        &self.restaurants
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    pub fn connection(&self) -> Arc<Mutex<SqlConnection>> {
        Arc::clone(&self.db)
    }
}

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,catalog_pipeline=debug"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    });
}
