// In-memory ListingStore seeded from the sample fixture, for tests

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::anyhow;
use axum::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ListingStore, StoreQuery};
use crate::error::StoreError;
use crate::models::{StoredListing, StoredListingChanges};

const SAMPLE_LISTINGS: &str = include_str!("../../fixtures/sample_listings.json");

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<StoredListing>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    queries: AtomicU64,
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<StoredListing>) -> Self {
        MemoryStore {
            next_id: AtomicU64::new(rows.len() as u64 + 1000),
            rows: RwLock::new(rows),
            ..Default::default()
        }
    }

    pub fn sample() -> Self {
        let rows: Vec<StoredListing> =
            serde_json::from_str(SAMPLE_LISTINGS).expect("sample fixture is valid");
        Self::with_rows(rows)
    }

    // Makes every subsequent call fail as if the store were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Failure(anyhow!("store unreachable")))
        } else {
            Ok(())
        }
    }

    fn admits(query: &StoreQuery, row: &StoredListing) -> bool {
        let listing = row.normalize();
        query.make.as_ref().map_or(true, |p| p.mode.matches(&listing.make, &p.value))
            && query.model.as_ref().map_or(true, |p| p.mode.matches(&listing.model, &p.value))
            && query.zip.as_ref().map_or(true, |z| listing.zip == *z)
            && query.category.as_ref().map_or(true, |c| listing.category.as_str() == c.as_str())
            && query.year_min.map_or(true, |y| listing.year >= y)
            && query.year_max.map_or(true, |y| listing.year <= y)
            && query.min_price.map_or(true, |p| listing.price >= p)
            && query.max_price.map_or(true, |p| listing.price <= p)
            && query.max_miles.map_or(true, |m| listing.miles <= m)
    }
}

// Applies a write to a row column by column, as the store would.
fn apply(row: &mut StoredListing, changes: &StoredListingChanges) {
    macro_rules! set {
        ($($field:ident),*) => {
            $(if let Some(v) = &changes.$field { row.$field = Some(v.clone()); })*
        };
    }
    set!(
        source, seller_type, listing_url, make, model, zip, category, drivetrain,
        fuel_type, transmission, options, truck_options, images, description,
        price, mmr_value, retail_value
    );
    if let Some(v) = changes.year {
        row.year = Some(v as i64);
    }
    if let Some(v) = changes.miles {
        row.miles = Some(v as i64);
    }
    if let Some(v) = changes.doors {
        row.doors = Some(v as i64);
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn query(&self, query: &StoreQuery) -> Result<Vec<StoredListing>, StoreError> {
        self.check()?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read().await;
        let mut matched: Vec<StoredListing> =
            rows.iter().filter(|row| Self::admits(query, row)).cloned().collect();
        // newest first, undated rows last
        matched.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
        Ok(matched)
    }

    async fn get(&self, id: &str) -> Result<StoredListing, StoreError> {
        self.check()?;
        self.rows
            .read()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, changes: &StoredListingChanges) -> Result<StoredListing, StoreError> {
        self.check()?;
        let mut row = StoredListing {
            id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
            scraped_at: Some(Utc::now()),
            ..Default::default()
        };
        apply(&mut row, changes);
        self.rows.write().await.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &str, changes: &StoredListingChanges) -> Result<StoredListing, StoreError> {
        self.check()?;
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        apply(row, changes);
        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.check()?;
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
