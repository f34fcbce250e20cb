// Splits predicates between the listing store and local evaluation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::StoreError;
use crate::filter::{self, FilterPredicate, PredicateField};
use crate::models::{Listing, ListingPayload, StoredListing};
use crate::quick_filter::QuickFilter;
use crate::store::{ListingStore, StoreQuery, TextPattern};

pub struct ListingQueryGateway {
    store: Arc<dyn ListingStore>,
}

impl ListingQueryGateway {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        ListingQueryGateway { store }
    }

    /// Splits `predicate` into the store-side query and the residual
    /// predicate left for local evaluation. Each field lands in exactly one half.
    pub fn split(predicate: &FilterPredicate) -> (StoreQuery, FilterPredicate) {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let pattern = |value: &Option<String>| {
            text(value).map(|value| TextPattern { value, mode: predicate.text_match })
        };

        let query = StoreQuery {
            make: pattern(&predicate.make),
            model: pattern(&predicate.model),
            zip: text(&predicate.zip),
            category: text(&predicate.category).map(|c| c.to_lowercase()),
            year_min: predicate.year_min,
            year_max: predicate.year_max,
            min_price: predicate.min_price,
            max_price: predicate.max_price,
            max_miles: predicate.max_miles,
        };

        let mut residual = predicate.clone();
        for field in query.pushed_fields() {
            residual.clear(field);
        }
        (query, residual)
    }

    pub fn route(predicate: &FilterPredicate) -> (Vec<PredicateField>, Vec<PredicateField>) {
        let (query, residual) = Self::split(predicate);
        (query.pushed_fields(), residual.active_fields())
    }

    pub async fn search(
        &self,
        predicate: &FilterPredicate,
        quick: QuickFilter,
    ) -> Result<Vec<Listing>, StoreError> {
        let (query, residual) = Self::split(predicate);
        let rows = self.store.query(&query).await?;
        let candidates: Vec<Listing> = rows.iter().map(StoredListing::normalize).collect();
        let matched = filter::evaluate(&residual, &candidates);
        let results = quick.apply(matched);
        tracing::info!(
            fetched = candidates.len(),
            returned = results.len(),
            ?quick,
            "Listing search complete"
        );
        Ok(results)
    }

    /// Runs a search for `ticket` and drops the result if a newer request
    /// was issued on `tracker` while it was in flight.
    pub async fn search_latest(
        &self,
        tracker: &LatestRequest,
        ticket: RequestTicket,
        predicate: &FilterPredicate,
        quick: QuickFilter,
    ) -> Result<SearchOutcome, StoreError> {
        let results = self.search(predicate, quick).await?;
        if tracker.is_current(ticket) {
            Ok(SearchOutcome::Fresh(results))
        } else {
            tracing::debug!(?ticket, "Discarding superseded search result");
            Ok(SearchOutcome::Superseded)
        }
    }

    // Every listing, newest first. Chat evaluates against this set.
    pub async fn working_set(&self) -> Result<Vec<Listing>, StoreError> {
        self.search(&FilterPredicate::default(), QuickFilter::All).await
    }

    pub async fn get(&self, id: &str) -> Result<Listing, StoreError> {
        Ok(self.store.get(id).await?.normalize())
    }

    pub async fn create(&self, payload: ListingPayload) -> Result<Listing, StoreError> {
        let row = self.store.insert(&payload.into_insert()).await?;
        tracing::info!(id = %row.id, "Listing created");
        Ok(row.normalize())
    }

    pub async fn update(&self, id: &str, payload: ListingPayload) -> Result<Listing, StoreError> {
        let row = self.store.update(id, &payload.into_update()).await?;
        tracing::info!(id, "Listing updated");
        Ok(row.normalize())
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id).await?;
        tracing::info!(id, "Listing deleted");
        Ok(())
    }
}

// "Latest request wins": a caller issues a ticket per filter change and only
// applies results whose ticket is still the newest.
#[derive(Debug, Default)]
pub struct LatestRequest {
    issued: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

#[derive(Debug, PartialEq)]
pub enum SearchOutcome {
    Fresh(Vec<Listing>),
    Superseded,
}

impl LatestRequest {
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }
}
