// Listing records: storage shape, normalized shape, and write payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// Wire (frontend) field name <-> storage column. Kept one-to-one; the
// serde attributes on Listing / StoredListing must agree with this table.
pub const FIELD_MAP: &[(&str, &str)] = &[
    ("id", "id"),
    ("make", "make"),
    ("model", "model"),
    ("year", "year"),
    ("category", "category"),
    ("price", "price"),
    ("mmrValue", "mmr_value"),
    ("retailValue", "retail_value"),
    ("miles", "miles"),
    ("zip", "zip"),
    ("doors", "doors"),
    ("drivetrain", "drivetrain"),
    ("fuelType", "fuel_type"),
    ("transmission", "transmission"),
    ("truckOptions", "truck_options"),
    ("options", "options"),
    ("imageUrl", "images"), // first element of the stored list
];

pub fn storage_column(wire_field: &str) -> Option<&'static str> {
    FIELD_MAP
        .iter()
        .find(|(wire, _)| *wire == wire_field)
        .map(|(_, column)| *column)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    MuscleCar,
    SportsCar,
    Convertible,
    Luxury,
    Sedan,
    Crossover,
    Suv,
    Truck,
    Exotic,
    Unknown,
}

impl Category {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "muscle car" => Category::MuscleCar,
            "sports car" => Category::SportsCar,
            "convertible" => Category::Convertible,
            "luxury" => Category::Luxury,
            "sedan" => Category::Sedan,
            "crossover" => Category::Crossover,
            "suv" => Category::Suv,
            "truck" => Category::Truck,
            "exotic" => Category::Exotic,
            _ => Category::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::MuscleCar => "muscle car",
            Category::SportsCar => "sports car",
            Category::Convertible => "convertible",
            Category::Luxury => "luxury",
            Category::Sedan => "sedan",
            Category::Crossover => "crossover",
            Category::Suv => "suv",
            Category::Truck => "truck",
            Category::Exotic => "exotic",
            Category::Unknown => "",
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    #[default]
    Automatic,
    Manual,
}

impl Transmission {
    // Only the literal stored value "manual" counts as manual.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("manual") => Transmission::Manual,
            _ => Transmission::Automatic,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transmission::Automatic => "automatic",
            Transmission::Manual => "manual",
        }
    }
}

/// A normalized vehicle listing as served to clients.
///
/// Every field is populated; absent storage values have already been
/// replaced by their defaults (see [`StoredListing::normalize`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub category: Category,
    pub price: f64,
    pub mmr_value: f64,    // 0 when unknown
    pub retail_value: f64, // 0 when unknown
    pub miles: u32,
    pub zip: String,
    pub doors: u8,
    pub drivetrain: String,
    pub fuel_type: String,
    pub transmission: Transmission,
    pub truck_options: Vec<String>,
    pub options: Vec<String>,
    pub image_url: String,
}

impl Listing {
    /// Price as a percentage of MMR, or `None` when MMR is unknown (0).
    pub fn pct_of_mmr(&self) -> Option<f64> {
        pct_of(self.price, self.mmr_value)
    }

    /// Price as a percentage of retail value, or `None` when unknown (0).
    pub fn pct_of_retail(&self) -> Option<f64> {
        pct_of(self.price, self.retail_value)
    }

    pub fn has_option(&self, tag: &str) -> bool {
        self.options.iter().any(|o| o == tag)
    }

    pub fn has_truck_option(&self, tag: &str) -> bool {
        self.truck_options.iter().any(|o| o == tag)
    }

    // Badge shown in chat results
    pub fn within_mmr(&self, tolerance: f64) -> bool {
        self.mmr_value > 0.0 && (self.price - self.mmr_value).abs() <= tolerance
    }
}

fn pct_of(price: f64, reference: f64) -> Option<f64> {
    if reference > 0.0 {
        Some(price / reference * 100.0)
    } else {
        None
    }
}

// Row shape of the `listings` table. Everything but the key is nullable and
// numeric columns are read leniently: unparseable values become None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StoredListing {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub seller_type: Option<String>,
    #[serde(default)]
    pub listing_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub scraped_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mmr_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub retail_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub miles: Option<i64>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub doors: Option<i64>,
    #[serde(default)]
    pub drivetrain: Option<String>,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub options: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub truck_options: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

impl StoredListing {
    /// Coerces every nullable column to its documented default. Never fails.
    pub fn normalize(&self) -> Listing {
        let non_negative = |v: Option<f64>| v.filter(|n| n.is_finite() && *n > 0.0).unwrap_or(0.0);

        Listing {
            id: self.id.clone(),
            make: self.make.clone().unwrap_or_default(),
            model: self.model.clone().unwrap_or_default(),
            year: self.year.and_then(|y| i32::try_from(y).ok()).unwrap_or(0),
            category: self
                .category
                .as_deref()
                .map(Category::from_label)
                .unwrap_or(Category::Unknown),
            price: non_negative(self.price),
            mmr_value: non_negative(self.mmr_value),
            retail_value: non_negative(self.retail_value),
            miles: self
                .miles
                .map(|m| m.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or(0),
            zip: self.zip.clone().unwrap_or_default(),
            doors: self
                .doors
                .filter(|d| (1..=u8::MAX as i64).contains(d))
                .map(|d| d as u8)
                .unwrap_or(4),
            drivetrain: self.drivetrain.clone().unwrap_or_default(),
            fuel_type: self.fuel_type.clone().unwrap_or_default(),
            transmission: Transmission::from_stored(self.transmission.as_deref()),
            truck_options: self.truck_options.clone().unwrap_or_default(),
            options: self.options.clone().unwrap_or_default(),
            image_url: self
                .images
                .as_ref()
                .and_then(|images| images.first().cloned())
                .unwrap_or_default(),
        }
    }
}

// Column values sent to the store on insert or update. Absent fields are
// left out of the request body entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StoredListingChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmr_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retail_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miles: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doors: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drivetrain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truck_options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Listing body received on POST / PUT, in frontend field names.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListingPayload {
    pub source: Option<String>,
    pub seller_type: Option<String>,
    pub listing_url: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub mmr_value: Option<f64>,
    pub retail_value: Option<f64>,
    pub miles: Option<u32>,
    pub zip: Option<String>,
    pub category: Option<String>,
    pub doors: Option<u8>,
    pub drivetrain: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub options: Option<Vec<String>>,
    pub truck_options: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1886..=2100;

impl ListingPayload {
    /// Checks field values; `require_identity` is set for creates, where
    /// make, model, year and price must be present. An update must carry at
    /// least one listing field.
    pub fn validate(&self, require_identity: bool) -> Result<(), String> {
        if !require_identity && self.to_changes() == StoredListingChanges::default() {
            return Err("Update body contains no listing fields".to_string());
        }
        if require_identity {
            for (name, value) in [("make", &self.make), ("model", &self.model)] {
                if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                    return Err(format!("'{}' is required", name));
                }
            }
            if self.year.is_none() {
                return Err("'year' is required".to_string());
            }
            if self.price.is_none() {
                return Err("'price' is required".to_string());
            }
        }
        if let Some(year) = self.year {
            if !YEAR_RANGE.contains(&year) {
                return Err(format!("'year' {} is out of range", year));
            }
        }
        for (name, value) in [
            ("price", self.price),
            ("mmrValue", self.mmr_value),
            ("retailValue", self.retail_value),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!("'{}' must be a non-negative number", name));
                }
            }
        }
        if let Some(zip) = &self.zip {
            if !zip.is_empty() && !is_zip(zip) {
                return Err(format!("'zip' must be 5 digits, got '{}'", zip));
            }
        }
        if self.doors == Some(0) {
            return Err("'doors' must be positive".to_string());
        }
        if let Some(t) = &self.transmission {
            let t = t.to_lowercase();
            if t != "automatic" && t != "manual" {
                return Err(format!("'transmission' must be automatic or manual, got '{}'", t));
            }
        }
        Ok(())
    }

    // Shared column mapping for inserts and updates. The image list is only
    // written when an imageUrl was sent.
    fn to_changes(&self) -> StoredListingChanges {
        StoredListingChanges {
            source: self.source.clone(),
            seller_type: self.seller_type.clone(),
            listing_url: self.listing_url.clone(),
            make: self.make.clone(),
            model: self.model.clone(),
            year: self.year,
            price: self.price,
            mmr_value: self.mmr_value,
            retail_value: self.retail_value,
            miles: self.miles,
            zip: self.zip.clone(),
            category: self.category.clone(),
            doors: self.doors,
            drivetrain: self.drivetrain.clone(),
            fuel_type: self.fuel_type.clone(),
            transmission: self.transmission.as_ref().map(|t| t.to_lowercase()),
            options: self.options.clone(),
            truck_options: self.truck_options.clone(),
            images: self
                .image_url
                .as_ref()
                .map(|url| if url.is_empty() { Vec::new() } else { vec![url.clone()] }),
            description: self.description.clone(),
        }
    }

    pub fn into_insert(self) -> StoredListingChanges {
        let mut changes = self.to_changes();
        changes.source.get_or_insert_with(|| "manual".to_string());
        changes.seller_type.get_or_insert_with(|| "dealer".to_string());
        changes.listing_url.get_or_insert_with(String::new);
        changes.images.get_or_insert_with(Vec::new);
        changes
    }

    pub fn into_update(self) -> StoredListingChanges {
        self.to_changes()
    }
}

pub fn is_zip(value: &str) -> bool {
    value.len() == 5 && value.bytes().all(|b| b.is_ascii_digit())
}

// --- Lenient column deserializers ---

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid listing id: {}", other))),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}

// JSONB lists arrive either as arrays or as JSON-encoded strings.
fn lenient_string_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    fn strings(values: Vec<Value>) -> Vec<String> {
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(values)) => Some(strings(values)),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Array(values)) => Some(strings(values)),
            _ => None,
        },
        _ => None,
    })
}
