// ListingStore backed by a Supabase / PostgREST table over HTTPS

use anyhow::{anyhow, Context, Result};
use axum::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};

use super::{ListingStore, StoreQuery, TextPattern};
use crate::config::Settings;
use crate::error::StoreError;
use crate::filter::TextMatch;
use crate::models::{storage_column, StoredListing, StoredListingChanges};

const RECENCY_ORDER: &str = "scraped_at.desc.nullslast";

pub struct SupabaseStore {
    client: Client,
    table_url: String,
}

impl SupabaseStore {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .store_url
            .as_deref()
            .ok_or_else(|| anyhow!("store_url not configured (set APP_STORE_URL)"))?;
        let api_key = settings
            .store_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("store_api_key not configured (set APP_STORE_API_KEY)"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).context("Invalid store API key header value")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Failed to create Authorization header")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build store reqwest client")?;

        Ok(SupabaseStore {
            client,
            table_url: format!(
                "{}/rest/v1/{}",
                base_url.trim_end_matches('/'),
                settings.store_table
            ),
        })
    }

    /// PostgREST query-string filters for a [`StoreQuery`].
    pub fn query_params(query: &StoreQuery) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        let mut push = |wire: &'static str, filter: String| {
            params.push((column(wire).to_string(), filter));
        };

        if let Some(pattern) = &query.make {
            push("make", ilike(pattern));
        }
        if let Some(pattern) = &query.model {
            push("model", ilike(pattern));
        }
        if let Some(zip) = &query.zip {
            push("zip", format!("eq.{}", zip));
        }
        if let Some(category) = &query.category {
            push("category", format!("eq.{}", category));
        }
        if let Some(min) = query.year_min {
            push("year", format!("gte.{}", min));
        }
        if let Some(max) = query.year_max {
            push("year", format!("lte.{}", max));
        }
        if let Some(min) = query.min_price {
            push("price", format!("gte.{}", min));
        }
        if let Some(max) = query.max_price {
            push("price", format!("lte.{}", max));
        }
        if let Some(max) = query.max_miles {
            push("miles", format!("lte.{}", max));
        }

        params.push(("order".to_string(), RECENCY_ORDER.to_string()));
        params
    }

    fn by_id(&self, request: RequestBuilder, id: &str) -> RequestBuilder {
        request.query(&[("id", format!("eq.{}", id))])
    }

    async fn fetch_rows(&self, request: RequestBuilder, what: &str) -> Result<Vec<StoredListing>, StoreError> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Network error during {}", what))?
            .error_for_status()
            .with_context(|| format!("Store rejected {}", what))?;

        let rows: Vec<StoredListing> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse store response for {}", what))?;
        tracing::debug!(rows = rows.len(), "Store {} returned", what);
        Ok(rows)
    }

    fn first_or_not_found(rows: Vec<StoredListing>, id: &str) -> Result<StoredListing, StoreError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

fn column(wire: &'static str) -> &'static str {
    storage_column(wire).unwrap_or(wire)
}

// PostgREST uses `*` as the LIKE wildcard; literal % and _ are escaped.
fn ilike(pattern: &TextPattern) -> String {
    let escaped = pattern
        .value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('*', "");
    match pattern.mode {
        TextMatch::Contains => format!("ilike.*{}*", escaped),
        TextMatch::Exact => format!("ilike.{}", escaped),
    }
}

#[async_trait]
impl ListingStore for SupabaseStore {
    async fn query(&self, query: &StoreQuery) -> Result<Vec<StoredListing>, StoreError> {
        tracing::debug!(?query, "Querying listings store");
        let request = self.client.get(&self.table_url).query(&Self::query_params(query));
        self.fetch_rows(request, "listing query").await
    }

    async fn get(&self, id: &str) -> Result<StoredListing, StoreError> {
        let request = self.by_id(self.client.get(&self.table_url), id).query(&[("select", "*")]);
        let rows = self.fetch_rows(request, "listing fetch").await?;
        Self::first_or_not_found(rows, id)
    }

    async fn insert(&self, changes: &StoredListingChanges) -> Result<StoredListing, StoreError> {
        let request = self
            .client
            .post(&self.table_url)
            .header("Prefer", "return=representation")
            .json(&[changes]);
        let rows = self.fetch_rows(request, "listing insert").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Failure(anyhow!("Store returned no row for inserted listing")))
    }

    async fn update(&self, id: &str, changes: &StoredListingChanges) -> Result<StoredListing, StoreError> {
        let request = self
            .by_id(self.client.patch(&self.table_url), id)
            .header("Prefer", "return=representation")
            .json(changes);
        let rows = self.fetch_rows(request, "listing update").await?;
        Self::first_or_not_found(rows, id)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let request = self
            .by_id(self.client.delete(&self.table_url), id)
            .header("Prefer", "return=representation");
        let rows = self.fetch_rows(request, "listing delete").await?;
        Self::first_or_not_found(rows, id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn pushes_patterns_equalities_and_ranges() {
        let query = StoreQuery {
            make: Some(TextPattern { value: "bmw".into(), mode: TextMatch::Contains }),
            model: Some(TextPattern { value: "M3".into(), mode: TextMatch::Exact }),
            zip: Some("75201".into()),
            category: Some("sports car".into()),
            year_min: Some(2019),
            year_max: Some(2023),
            min_price: Some(20000.0),
            max_price: Some(60000.0),
            max_miles: Some(50000),
        };
        let params = SupabaseStore::query_params(&query);

        assert_eq!(param(&params, "make"), vec!["ilike.*bmw*"]);
        assert_eq!(param(&params, "model"), vec!["ilike.M3"]);
        assert_eq!(param(&params, "zip"), vec!["eq.75201"]);
        assert_eq!(param(&params, "category"), vec!["eq.sports car"]);
        assert_eq!(param(&params, "year"), vec!["gte.2019", "lte.2023"]);
        assert_eq!(param(&params, "price"), vec!["gte.20000", "lte.60000"]);
        assert_eq!(param(&params, "miles"), vec!["lte.50000"]);
        assert_eq!(param(&params, "order"), vec![RECENCY_ORDER]);
    }

    #[test]
    fn empty_query_only_selects_and_orders() {
        let params = SupabaseStore::query_params(&StoreQuery::default());
        assert_eq!(params.len(), 2);
        assert_eq!(param(&params, "select"), vec!["*"]);
    }

    #[test]
    fn like_wildcards_in_values_are_escaped() {
        let pattern = TextPattern { value: "50%_off*".into(), mode: TextMatch::Contains };
        assert_eq!(ilike(&pattern), "ilike.*50\\%\\_off*");
    }

    #[test]
    fn missing_store_url_is_a_config_error() {
        let settings = Settings::for_tests();
        assert!(SupabaseStore::from_settings(&settings).is_err());
    }
}
