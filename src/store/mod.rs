// The narrow persistence interface the gateway depends on

use axum::async_trait;

use crate::error::StoreError;
use crate::filter::{PredicateField, TextMatch};
use crate::models::{StoredListing, StoredListingChanges};

mod supabase;
#[cfg(test)]
pub mod memory;

pub use supabase::SupabaseStore;

/// A make/model pattern pushed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPattern {
    pub value: String,
    pub mode: TextMatch,
}

/// Constraints the store evaluates itself: equality on zip and category,
/// case-insensitive patterns on make and model, inclusive ranges on year,
/// price and miles. Results come back newest-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub make: Option<TextPattern>,
    pub model: Option<TextPattern>,
    pub zip: Option<String>,
    pub category: Option<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub max_miles: Option<u32>,
}

impl StoreQuery {
    pub fn pushed_fields(&self) -> Vec<PredicateField> {
        use PredicateField as F;
        [
            (F::Zip, self.zip.is_some()),
            (F::YearMin, self.year_min.is_some()),
            (F::YearMax, self.year_max.is_some()),
            (F::Make, self.make.is_some()),
            (F::Model, self.model.is_some()),
            (F::MinPrice, self.min_price.is_some()),
            (F::MaxPrice, self.max_price.is_some()),
            (F::MaxMiles, self.max_miles.is_some()),
            (F::Category, self.category.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, set)| set.then_some(field))
        .collect()
    }
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn query(&self, query: &StoreQuery) -> Result<Vec<StoredListing>, StoreError>;

    async fn get(&self, id: &str) -> Result<StoredListing, StoreError>;

    async fn insert(&self, changes: &StoredListingChanges) -> Result<StoredListing, StoreError>;

    async fn update(
        &self,
        id: &str,
        changes: &StoredListingChanges,
    ) -> Result<StoredListing, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
