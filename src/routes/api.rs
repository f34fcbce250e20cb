// Handlers for the listing resource API

use std::{fmt, str::FromStr};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{
    de::{self, value::StrDeserializer, DeserializeOwned, IntoDeserializer},
    Deserialize, Deserializer,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    filter::{Feature, FilterPredicate, TextMatch},
    models::{Listing, ListingPayload},
    quick_filter::QuickFilter,
    AppState,
};

// --- Request Structs ---

// Query string values arrive as text; an empty value ("yearMin=") means the
// parameter was left blank.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

// Same as `empty_as_none`, for tag enums such as `quick=hot-deals`.
fn empty_tag_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let tag: StrDeserializer<'_, de::value::Error> = value.into_deserializer();
            T::deserialize(tag).map(Some).map_err(de::Error::custom)
        }
    }
}

// Query string accepted by GET /api/listings. Empty values impose no constraint.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListingsQuery {
    make: Option<String>,
    model: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    year_min: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    year_max: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    min_price: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    max_price: Option<f64>,
    zip: Option<String>,
    category: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    max_miles: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    doors: Option<u8>,
    drivetrain: Option<String>,
    fuel_type: Option<String>,
    transmission: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    lifted: Option<bool>,
    #[serde(default, deserialize_with = "empty_as_none")]
    drw: Option<bool>,
    #[serde(default, deserialize_with = "empty_as_none")]
    sunroof: Option<bool>,
    #[serde(default, deserialize_with = "empty_as_none")]
    bucket_seats: Option<bool>,
    #[serde(default, deserialize_with = "empty_as_none")]
    carbon_brakes: Option<bool>,
    #[serde(default, deserialize_with = "empty_as_none")]
    performance_trim: Option<bool>,
    #[serde(rename = "maxPctOfMMRAsking", default, deserialize_with = "empty_as_none")]
    max_pct_of_mmr_asking: Option<f64>,
    #[serde(rename = "maxPctOfMMRRetail", default, deserialize_with = "empty_as_none")]
    max_pct_of_mmr_retail: Option<f64>,
    #[serde(default, deserialize_with = "empty_tag_as_none")]
    text_match: Option<TextMatch>,
    #[serde(default, deserialize_with = "empty_tag_as_none")]
    quick: Option<QuickFilter>,
}

impl ListingsQuery {
    fn into_predicate(self) -> (FilterPredicate, QuickFilter) {
        let features = [
            (self.sunroof, Feature::Sunroof),
            (self.bucket_seats, Feature::BucketSeats),
            (self.carbon_brakes, Feature::CarbonCeramicBrakes),
            (self.performance_trim, Feature::PerformanceTrim),
        ]
        .into_iter()
        .filter_map(|(on, feature)| on.unwrap_or(false).then_some(feature))
        .collect();

        let predicate = FilterPredicate {
            zip: self.zip,
            year_min: self.year_min,
            year_max: self.year_max,
            make: self.make,
            model: self.model,
            // the API matches make/model as substrings unless told otherwise
            text_match: self.text_match.unwrap_or(TextMatch::Contains),
            min_price: self.min_price,
            max_price: self.max_price,
            max_miles: self.max_miles,
            category: self.category,
            doors: self.doors,
            drivetrain: self.drivetrain,
            fuel_type: self.fuel_type,
            transmission: self.transmission,
            lifted: self.lifted.unwrap_or(false),
            drw: self.drw.unwrap_or(false),
            features,
            max_pct_of_mmr_asking: self.max_pct_of_mmr_asking,
            max_pct_of_mmr_retail: self.max_pct_of_mmr_retail,
        };
        (predicate, self.quick.unwrap_or_default())
    }
}

// Malformed bodies are rejected here, before anything reaches the store.
fn parse_payload(body: Result<Json<Value>, JsonRejection>, creating: bool) -> AppResult<ListingPayload> {
    let Json(value) = body.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;
    let payload: ListingPayload = serde_json::from_value(value)
        .map_err(|e| AppError::BadRequest(format!("Invalid listing payload: {}", e)))?;
    payload.validate(creating).map_err(AppError::BadRequest)?;
    Ok(payload)
}

// --- API Handlers ---

pub async fn list_listings(
    State(app_state): State<AppState>,
    query: Result<Query<ListingsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Listing>>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(format!("Invalid query string: {}", e.body_text())))?;
    tracing::info!("[HANDLER] GET /api/listings - {:?}", query);
    let (predicate, quick) = query.into_predicate();
    let listings = app_state.gateway.search(&predicate, quick).await?;
    Ok(Json(listings))
}

pub async fn get_listing(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Listing>> {
    tracing::info!("[HANDLER] GET /api/listings/{}", id);
    Ok(Json(app_state.gateway.get(&id).await?))
}

pub async fn create_listing(
    State(app_state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("[HANDLER] POST /api/listings");
    let payload = parse_payload(body, true)?;
    let listing = app_state.gateway.create(payload).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn update_listing(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Listing>> {
    tracing::info!("[HANDLER] PUT /api/listings/{}", id);
    let payload = parse_payload(body, false)?;
    Ok(Json(app_state.gateway.update(&id, payload).await?))
}

pub async fn delete_listing(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    tracing::info!("[HANDLER] DELETE /api/listings/{}", id);
    app_state.gateway.delete(&id).await?;
    Ok(Json(json!({ "message": "Listing deleted successfully" })))
}
