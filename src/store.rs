use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::trace;

use crate::category::Category;
use crate::db::now_timestamp;
use crate::errors::{StoreError, StoreResult};
use crate::model::{NormalizedRestaurant, Page, PageRequest, RawRecord};

#[async_trait]
pub trait RawRecordStore: Send + Sync {
    /// Dirty records ordered by id, strictly after `request.after` when set.
    async fn fetch_dirty_page(&self, request: &PageRequest) -> StoreResult<Page<RawRecord>>;
    async fn clear_dirty(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait RestaurantStore: Send + Sync {
    async fn upsert(&self, restaurant: &NormalizedRestaurant) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct SqliteRawStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteRawStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Inserts or replaces a payload. The record turns dirty only when the
    /// payload differs from what is stored; returns whether it did.
    pub fn put_raw(&self, id: &str, payload: &str) -> StoreResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "INSERT INTO raw_records (id, payload, dirty, updated_at)
            VALUES (?1, ?2, 1, DATETIME('now'))
            ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                dirty = 1,
                updated_at = excluded.updated_at
            WHERE raw_records.payload <> excluded.payload",
            (id, payload),
        )?;
        Ok(changed > 0)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<RawRecord>> {
        let conn = self.db.lock();
        conn.query_row(
            "SELECT id, payload, dirty FROM raw_records WHERE id = ?1",
            [id],
            parse_raw_record,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn dirty_count(&self) -> StoreResult<usize> {
        let conn = self.db.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM raw_records WHERE dirty = 1", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

#[async_trait]
impl RawRecordStore for SqliteRawStore {
    async fn fetch_dirty_page(&self, request: &PageRequest) -> StoreResult<Page<RawRecord>> {
        // SQLite reads a negative LIMIT as unbounded.
        let limit = i64::try_from(request.size).map_err(|_| {
            StoreError::Unavailable(format!("page size {} exceeds LIMIT range", request.size))
        })?;
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, payload, dirty FROM raw_records
            WHERE dirty = 1 AND (?1 IS NULL OR id > ?1)
            ORDER BY id ASC
            LIMIT ?2",
        )?;
        let items = stmt
            .query_map(
                params![request.after.as_deref(), limit],
                parse_raw_record,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            index: request.index,
            items,
        })
    }

    async fn clear_dirty(&self, id: &str) -> StoreResult<()> {
        let conn = self.db.lock();
        let updated = conn.execute("UPDATE raw_records SET dirty = 0 WHERE id = ?1", [id])?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn parse_raw_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        payload: row.get(1)?,
        dirty: row.get::<_, i64>(2)? != 0,
    })
}

#[derive(Clone)]
pub struct SqliteRestaurantStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteRestaurantStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<NormalizedRestaurant>> {
        let conn = self.db.lock();
        conn.query_row(
            "SELECT id, name, category, phone, province, district, jibun_detail, doro_detail, longitude, latitude
            FROM restaurants
            WHERE id = ?1",
            [id],
            parse_restaurant,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.db.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM restaurants", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl RestaurantStore for SqliteRestaurantStore {
    async fn upsert(&self, restaurant: &NormalizedRestaurant) -> StoreResult<()> {
        {
            let conn = self.db.lock();
            conn.execute(
                "INSERT INTO restaurants (id, name, category, phone, province, district, jibun_detail, doro_detail, longitude, latitude, normalized_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    category = excluded.category,
                    phone = excluded.phone,
                    province = excluded.province,
                    district = excluded.district,
                    jibun_detail = excluded.jibun_detail,
                    doro_detail = excluded.doro_detail,
                    longitude = excluded.longitude,
                    latitude = excluded.latitude,
                    normalized_at = excluded.normalized_at",
                params![
                    restaurant.id,
                    restaurant.name,
                    restaurant.category.as_tag(),
                    restaurant.phone,
                    restaurant.province,
                    restaurant.district,
                    restaurant.jibun_detail,
                    restaurant.doro_detail,
                    restaurant.longitude(),
                    restaurant.latitude(),
                    now_timestamp(),
                ],
            )?;
        }

        trace!(restaurant_id = %restaurant.id, "normalized restaurant upserted");
        Ok(())
    }
}

fn parse_restaurant(row: &rusqlite::Row<'_>) -> rusqlite::Result<NormalizedRestaurant> {
    let category: String = row.get(2)?;
    let longitude: Option<f64> = row.get(8)?;
    let latitude: Option<f64> = row.get(9)?;
    Ok(NormalizedRestaurant {
        id: row.get(0)?,
        name: row.get(1)?,
        category: Category::from_tag(&category),
        phone: row.get(3)?,
        province: row.get(4)?,
        district: row.get(5)?,
        jibun_detail: row.get(6)?,
        doro_detail: row.get(7)?,
        location: longitude
            .zip(latitude)
            .map(|(lng, lat)| geo::Point::new(lng, lat)),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::db::bootstrap;

    fn stores() -> (tempfile::TempDir, SqliteRawStore, SqliteRestaurantStore) {
        let dir = tempdir().unwrap();
        let ctx = bootstrap(dir.path().join("store.db")).unwrap();
        let db = Arc::new(Mutex::new(ctx.connection));
        (
            dir,
            SqliteRawStore::new(db.clone()),
            SqliteRestaurantStore::new(db),
        )
    }

    #[tokio::test]
    async fn pages_dirty_records_after_cursor() {
        let (_dir, raw, _) = stores();
        for id in ["a", "b", "c", "d"] {
            raw.put_raw(id, "{}").unwrap();
        }
        raw.clear_dirty("b").await.unwrap();

        let first = raw.fetch_dirty_page(&PageRequest::first(2)).await.unwrap();
        let ids: Vec<_> = first.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let second = raw
            .fetch_dirty_page(&PageRequest::first(2).next(&first))
            .await
            .unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, "d");
    }

    #[tokio::test]
    async fn refuses_page_size_beyond_limit_range() {
        let (_dir, raw, _) = stores();
        for id in ["a", "b"] {
            raw.put_raw(id, "{}").unwrap();
        }
        let err = raw
            .fetch_dirty_page(&PageRequest::first(usize::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn put_raw_only_dirties_changed_payloads() {
        let (_dir, raw, _) = stores();
        assert!(raw.put_raw("r1", r#"{"BPLCNM":"a"}"#).unwrap());
        raw.clear_dirty("r1").await.unwrap();

        assert!(!raw.put_raw("r1", r#"{"BPLCNM":"a"}"#).unwrap());
        assert!(!raw.get("r1").unwrap().unwrap().dirty);

        assert!(raw.put_raw("r1", r#"{"BPLCNM":"b"}"#).unwrap());
        assert!(raw.get("r1").unwrap().unwrap().dirty);
    }

    #[tokio::test]
    async fn clearing_unknown_record_is_not_found() {
        let (_dir, raw, _) = stores();
        let err = raw.clear_dirty("ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let (_dir, _, restaurants) = stores();
        let mut restaurant = NormalizedRestaurant {
            id: "r1".into(),
            name: "첫 이름".into(),
            category: Category::Korean,
            phone: "021234567".into(),
            province: "서울특별시".into(),
            district: "중구".into(),
            jibun_detail: "명동 1".into(),
            doro_detail: "명동길 1".into(),
            location: Some(geo::Point::new(126.98, 37.56)),
        };
        restaurants.upsert(&restaurant).await.unwrap();

        restaurant.name = "바뀐 이름".into();
        restaurant.location = None;
        restaurants.upsert(&restaurant).await.unwrap();

        assert_eq!(restaurants.count().unwrap(), 1);
        let stored = restaurants.get("r1").unwrap().unwrap();
        assert_eq!(stored, restaurant);
    }
}
