// Structured listing predicates and the evaluator shared by the panel, API and chat

use serde::{Deserialize, Serialize};

use crate::models::Listing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "sunroof")]
    Sunroof,
    #[serde(rename = "bucket seats")]
    BucketSeats,
    #[serde(rename = "carbon ceramic brakes")]
    CarbonCeramicBrakes,
    #[serde(rename = "performance trim")]
    PerformanceTrim,
    #[serde(rename = "lifted")]
    Lifted,
}

impl Feature {
    pub fn tag(self) -> &'static str {
        match self {
            Feature::Sunroof => "sunroof",
            Feature::BucketSeats => "bucket seats",
            Feature::CarbonCeramicBrakes => "carbon ceramic brakes",
            Feature::PerformanceTrim => "performance trim",
            Feature::Lifted => "lifted",
        }
    }

    // "lifted" may be recorded as an option or as a truck option.
    pub fn is_present(self, listing: &Listing) -> bool {
        listing.has_option(self.tag())
            || (self == Feature::Lifted && listing.has_truck_option("lifted"))
    }
}

/// How make/model constraints compare against a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMatch {
    // case-insensitive equality
    #[default]
    Exact,
    // case-insensitive substring
    Contains,
}

impl TextMatch {
    pub fn matches(self, haystack: &str, needle: &str) -> bool {
        let haystack = haystack.to_lowercase();
        let needle = needle.to_lowercase();
        match self {
            TextMatch::Exact => haystack == needle,
            TextMatch::Contains => haystack.contains(&needle),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PredicateField {
    Zip,
    YearMin,
    YearMax,
    Make,
    Model,
    MinPrice,
    MaxPrice,
    MaxMiles,
    Category,
    Doors,
    Drivetrain,
    FuelType,
    Transmission,
    Lifted,
    Drw,
    Features,
    MaxPctOfMmrAsking,
    MaxPctOfMmrRetail,
}

impl PredicateField {
    pub const ALL: [PredicateField; 18] = [
        PredicateField::Zip,
        PredicateField::YearMin,
        PredicateField::YearMax,
        PredicateField::Make,
        PredicateField::Model,
        PredicateField::MinPrice,
        PredicateField::MaxPrice,
        PredicateField::MaxMiles,
        PredicateField::Category,
        PredicateField::Doors,
        PredicateField::Drivetrain,
        PredicateField::FuelType,
        PredicateField::Transmission,
        PredicateField::Lifted,
        PredicateField::Drw,
        PredicateField::Features,
        PredicateField::MaxPctOfMmrAsking,
        PredicateField::MaxPctOfMmrRetail,
    ];
}

/// Optional constraints over listings, all of which must hold. A `None`,
/// empty string, `false` flag or empty feature list means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPredicate {
    pub zip: Option<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub text_match: TextMatch,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub max_miles: Option<u32>,
    pub category: Option<String>,
    pub doors: Option<u8>,
    pub drivetrain: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub lifted: bool,
    pub drw: bool,
    pub features: Vec<Feature>,
    pub max_pct_of_mmr_asking: Option<f64>,
    pub max_pct_of_mmr_retail: Option<f64>,
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl FilterPredicate {
    pub fn is_active(&self, field: PredicateField) -> bool {
        use PredicateField as F;
        match field {
            F::Zip => text(&self.zip).is_some(),
            F::YearMin => self.year_min.is_some(),
            F::YearMax => self.year_max.is_some(),
            F::Make => text(&self.make).is_some(),
            F::Model => text(&self.model).is_some(),
            F::MinPrice => self.min_price.is_some(),
            F::MaxPrice => self.max_price.is_some(),
            F::MaxMiles => self.max_miles.is_some(),
            F::Category => text(&self.category).is_some(),
            F::Doors => self.doors.is_some(),
            F::Drivetrain => text(&self.drivetrain).is_some(),
            F::FuelType => text(&self.fuel_type).is_some(),
            F::Transmission => text(&self.transmission).is_some(),
            F::Lifted => self.lifted,
            F::Drw => self.drw,
            F::Features => !self.features.is_empty(),
            F::MaxPctOfMmrAsking => self.max_pct_of_mmr_asking.is_some(),
            F::MaxPctOfMmrRetail => self.max_pct_of_mmr_retail.is_some(),
        }
    }

    pub fn active_fields(&self) -> Vec<PredicateField> {
        PredicateField::ALL
            .into_iter()
            .filter(|f| self.is_active(*f))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active_fields().is_empty()
    }

    pub fn clear(&mut self, field: PredicateField) {
        use PredicateField as F;
        match field {
            F::Zip => self.zip = None,
            F::YearMin => self.year_min = None,
            F::YearMax => self.year_max = None,
            F::Make => self.make = None,
            F::Model => self.model = None,
            F::MinPrice => self.min_price = None,
            F::MaxPrice => self.max_price = None,
            F::MaxMiles => self.max_miles = None,
            F::Category => self.category = None,
            F::Doors => self.doors = None,
            F::Drivetrain => self.drivetrain = None,
            F::FuelType => self.fuel_type = None,
            F::Transmission => self.transmission = None,
            F::Lifted => self.lifted = false,
            F::Drw => self.drw = false,
            F::Features => self.features.clear(),
            F::MaxPctOfMmrAsking => self.max_pct_of_mmr_asking = None,
            F::MaxPctOfMmrRetail => self.max_pct_of_mmr_retail = None,
        }
    }

    // Inactive fields hold trivially.
    pub fn holds(&self, field: PredicateField, listing: &Listing) -> bool {
        use PredicateField as F;
        if !self.is_active(field) {
            return true;
        }
        match field {
            F::Zip => text(&self.zip) == Some(listing.zip.as_str()),
            F::YearMin => self.year_min.map_or(true, |min| listing.year >= min),
            F::YearMax => self.year_max.map_or(true, |max| listing.year <= max),
            F::Make => text(&self.make).map_or(true, |m| self.text_match.matches(&listing.make, m)),
            F::Model => text(&self.model).map_or(true, |m| self.text_match.matches(&listing.model, m)),
            F::MinPrice => self.min_price.map_or(true, |min| listing.price >= min),
            F::MaxPrice => self.max_price.map_or(true, |max| listing.price <= max),
            F::MaxMiles => self.max_miles.map_or(true, |max| listing.miles <= max),
            F::Category => text(&self.category)
                .map_or(true, |c| listing.category.as_str() == c.to_lowercase()),
            F::Doors => self.doors.map_or(true, |d| listing.doors == d),
            F::Drivetrain => text(&self.drivetrain)
                .map_or(true, |d| listing.drivetrain.eq_ignore_ascii_case(d)),
            F::FuelType => text(&self.fuel_type)
                .map_or(true, |f| listing.fuel_type.eq_ignore_ascii_case(f)),
            F::Transmission => text(&self.transmission)
                .map_or(true, |t| listing.transmission.as_str() == t.to_lowercase()),
            F::Lifted => listing.has_truck_option("lifted"),
            F::Drw => listing.has_truck_option("drw") || listing.has_truck_option("DRW"),
            F::Features => self.features.iter().all(|f| f.is_present(listing)),
            // An unknown reference value never satisfies a percentage bound.
            F::MaxPctOfMmrAsking => match (self.max_pct_of_mmr_asking, listing.pct_of_mmr()) {
                (Some(bound), Some(pct)) => pct <= bound,
                _ => false,
            },
            F::MaxPctOfMmrRetail => match (self.max_pct_of_mmr_retail, listing.pct_of_retail()) {
                (Some(bound), Some(pct)) => pct <= bound,
                _ => false,
            },
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        PredicateField::ALL.iter().all(|f| self.holds(*f, listing))
    }
}

/// Returns the listings matching `predicate`, in their original order.
pub fn evaluate(predicate: &FilterPredicate, listings: &[Listing]) -> Vec<Listing> {
    let matched: Vec<Listing> = listings
        .iter()
        .filter(|listing| predicate.matches(listing))
        .cloned()
        .collect();
    tracing::debug!(
        candidates = listings.len(),
        matched = matched.len(),
        fields = ?predicate.active_fields(),
        "Evaluated filter predicate"
    );
    matched
}
