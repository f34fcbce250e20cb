// Best-effort extraction of listing constraints from free text. Never fails.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::filter::{Feature, FilterPredicate, TextMatch};
use crate::models::Category;

// (pattern, canonical value) pairs, scanned in order. Patterns are plain
// substrings, so a more specific pattern must precede any of its prefixes.
pub const MAKES: &[(&str, &str)] = &[
    ("ford", "ford"),
    ("chevrolet", "chevrolet"),
    ("bmw", "bmw"),
    ("audi", "audi"),
    ("mercedes", "mercedes"),
    ("toyota", "toyota"),
    ("dodge", "dodge"),
    ("cadillac", "cadillac"),
    ("tesla", "tesla"),
    ("lexus", "lexus"),
    ("ram", "ram"),
    ("gmc", "gmc"),
    ("nissan", "nissan"),
    ("alfa romeo", "alfa romeo"),
    ("ferrari", "ferrari"),
    ("rolls-royce", "rolls-royce"),
];

pub const MODELS: &[(&str, &str)] = &[
    ("m3", "M3"),
    ("m4", "M4"),
    ("m5", "M5"),
    ("mustang", "Mustang"),
    ("camaro", "Camaro"),
    ("corvette", "Corvette"),
    ("f-150", "F-150"),
    ("f150", "F-150"),
    ("tundra", "Tundra"),
    ("tacoma", "Tacoma"),
    ("hellcat", "Hellcat"),
    ("demon", "Demon"),
    ("raptor", "Raptor"),
    ("trx", "TRX"),
];

pub const CATEGORIES: &[(&str, Category)] = &[
    ("muscle car", Category::MuscleCar),
    ("sports car", Category::SportsCar),
    ("truck", Category::Truck),
    ("suv", Category::Suv),
    ("sedan", Category::Sedan),
    ("luxury", Category::Luxury),
    ("exotic", Category::Exotic),
];

// Not exclusive: every keyword present contributes its feature once.
pub const FEATURE_KEYWORDS: &[(&str, Feature)] = &[
    ("sunroof", Feature::Sunroof),
    ("bucket seat", Feature::BucketSeats),
    ("carbon", Feature::CarbonCeramicBrakes),
    ("ceramic", Feature::CarbonCeramicBrakes),
    ("performance", Feature::PerformanceTrim),
    ("lifted", Feature::Lifted),
];

// Year shapes, in priority order: "2020+", "2018-2022" (or "2018 - 2022"), "2021".
static YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b((?:19|20)\d{2})\+|\b((?:19|20)\d{2})\s*-\s*((?:19|20)\d{2})\b|\b((?:19|20)\d{2})\b",
    )
    .expect("year pattern is valid")
});

// "under $60k" / "below 45000" / "less than 30k" / "max 20k"
const PRICE_BOUND: &str = r"(?:under|below|less than|max)\s*\$?(\d+)k?";

static PRICE_BOUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PRICE_BOUND).expect("price bound pattern is valid"));

// A price bound, or a range such as "20k-40k".
static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{}|\$?(\d+)k?\s*-\s*\$?(\d+)k?", PRICE_BOUND))
        .expect("price pattern is valid")
});

static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{5})\b").expect("zip pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        *self == ParsedQuery::default()
    }

    // Chat matches make and model as case-insensitive substrings.
    pub fn to_predicate(&self) -> FilterPredicate {
        FilterPredicate {
            make: self.make.clone(),
            model: self.model.clone(),
            text_match: TextMatch::Contains,
            year_min: self.year_min,
            year_max: self.year_max,
            min_price: self.min_price,
            max_price: self.max_price,
            zip: self.location.clone(),
            category: self.category.map(|c| c.as_str().to_string()),
            features: self.features.clone(),
            ..Default::default()
        }
    }
}

pub fn parse_query(input: &str) -> ParsedQuery {
    let text = input.to_lowercase();
    let mut parsed = ParsedQuery {
        make: first_match(MAKES, &text).map(str::to_string),
        model: first_match(MODELS, &text).map(str::to_string),
        category: first_match(CATEGORIES, &text),
        ..Default::default()
    };

    // "under 2020" is a price, so its digits are not also read as a year.
    let bound_span = PRICE_BOUND_RE.find(&text).map(|m| m.range());
    let year_span = extract_years(&text, bound_span.as_ref(), &mut parsed);
    let price_span = extract_price(&text, year_span.as_ref(), &mut parsed);
    parsed.location = extract_zip(&text, price_span.as_ref());

    for (keyword, feature) in FEATURE_KEYWORDS {
        if text.contains(keyword) && !parsed.features.contains(feature) {
            parsed.features.push(*feature);
        }
    }

    tracing::debug!(input, ?parsed, "Parsed chat query");
    parsed
}

fn first_match<T: Copy>(vocabulary: &[(&str, T)], text: &str) -> Option<T> {
    vocabulary
        .iter()
        .find(|(pattern, _)| text.contains(pattern))
        .map(|(_, value)| *value)
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn extract_years(
    text: &str,
    bound_span: Option<&Range<usize>>,
    parsed: &mut ParsedQuery,
) -> Option<Range<usize>> {
    let caps = YEAR_RE.captures_iter(text).find(|caps| {
        caps.get(0)
            .is_some_and(|m| !bound_span.is_some_and(|span| overlaps(span, &m.range())))
    })?;
    let year = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i32>().ok());

    if let Some(min) = year(1) {
        parsed.year_min = Some(min);
    } else if let (Some(a), Some(b)) = (year(2), year(3)) {
        parsed.year_min = Some(a.min(b));
        parsed.year_max = Some(a.max(b));
    } else if let Some(exact) = year(4) {
        parsed.year_min = Some(exact);
        parsed.year_max = Some(exact);
    }
    caps.get(0).map(|m| m.range())
}

// Three digits or fewer are read as thousands ("60" and "60k" both mean 60000).
fn scale_price(digits: &str) -> Option<f64> {
    let value = digits.parse::<u64>().ok()? as f64;
    Some(if digits.len() <= 3 { value * 1000.0 } else { value })
}

fn extract_price(
    text: &str,
    year_span: Option<&Range<usize>>,
    parsed: &mut ParsedQuery,
) -> Option<Range<usize>> {
    for caps in PRICE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(bound) = caps.get(1) {
            parsed.max_price = scale_price(bound.as_str());
            return Some(whole.range());
        }
        // A year range like "2018-2022" is not also a price range.
        if year_span.is_some_and(|span| overlaps(span, &whole.range())) {
            continue;
        }
        if let (Some(lo), Some(hi)) = (caps.get(2), caps.get(3)) {
            parsed.min_price = scale_price(lo.as_str());
            parsed.max_price = scale_price(hi.as_str());
            return Some(whole.range());
        }
    }
    None
}

// Five-digit tokens that belong to a price ("under 60000", "$45000") are not zips.
fn extract_zip(text: &str, price_span: Option<&Range<usize>>) -> Option<String> {
    ZIP_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find(|m| {
            let after_dollar = text[..m.start()].ends_with('$');
            let in_price = price_span.is_some_and(|span| overlaps(span, &m.range()));
            !after_dollar && !in_price
        })
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn make_model_and_k_price() {
        let parsed = parse_query("Show me BMW M3 under $60k");
        assert_eq!(
            parsed,
            ParsedQuery {
                make: Some("bmw".into()),
                model: Some("M3".into()),
                max_price: Some(60000.0),
                ..Default::default()
            }
        );
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({ "make": "bmw", "model": "M3", "maxPrice": 60000.0 })
        );
    }

    #[test]
    fn open_year_category_and_feature() {
        let parsed = parse_query("2020+ trucks with sunroof");
        assert_eq!(parsed.year_min, Some(2020));
        assert_eq!(parsed.year_max, None);
        assert_eq!(parsed.category, Some(Category::Truck));
        assert_eq!(parsed.features, vec![Feature::Sunroof]);
        assert_eq!(parsed.make, None);
        assert_eq!(parsed.max_price, None);
    }

    #[test]
    fn bare_zip_is_only_a_location() {
        let parsed = parse_query("75201");
        assert_eq!(parsed, ParsedQuery { location: Some("75201".into()), ..Default::default() });
    }

    #[test]
    fn year_range_and_single_year() {
        let range = parse_query("mustang 2018-2022");
        assert_eq!((range.year_min, range.year_max), (Some(2018), Some(2022)));
        assert_eq!(range.min_price, None);
        assert_eq!(range.max_price, None);

        let single = parse_query("2021 camaro");
        assert_eq!((single.year_min, single.year_max), (Some(2021), Some(2021)));
        assert_eq!(single.model.as_deref(), Some("Camaro"));
    }

    #[test]
    fn price_shapes() {
        assert_eq!(parse_query("below 45000").max_price, Some(45000.0));
        assert_eq!(parse_query("less than 30k").max_price, Some(30000.0));
        assert_eq!(parse_query("max $25k").max_price, Some(25000.0));

        let range = parse_query("tacoma 20k-35k");
        assert_eq!((range.min_price, range.max_price), (Some(20000.0), Some(35000.0)));
    }

    #[test]
    fn year_range_then_price_phrase() {
        let parsed = parse_query("2018-2022 f150 under 50k");
        assert_eq!((parsed.year_min, parsed.year_max), (Some(2018), Some(2022)));
        assert_eq!(parsed.min_price, None);
        assert_eq!(parsed.max_price, Some(50000.0));
        assert_eq!(parsed.model.as_deref(), Some("F-150"));
        assert_eq!(parsed.make, None);
    }

    #[test]
    fn spaced_year_range_is_a_year_range() {
        let parsed = parse_query("dodge 2018 - 2022");
        assert_eq!((parsed.year_min, parsed.year_max), (Some(2018), Some(2022)));
        assert_eq!((parsed.min_price, parsed.max_price), (None, None));
    }

    #[test]
    fn price_bound_digits_are_not_a_year() {
        let parsed = parse_query("trucks under 2020");
        assert_eq!(parsed.max_price, Some(2020.0));
        assert_eq!((parsed.year_min, parsed.year_max), (None, None));

        // a real year elsewhere in the text still counts
        let both = parse_query("2019 tacoma under 2020");
        assert_eq!((both.year_min, both.year_max), (Some(2019), Some(2019)));
        assert_eq!(both.max_price, Some(2020.0));
    }

    #[test]
    fn price_digits_are_not_a_zip() {
        let parsed = parse_query("corvette under $65000 near 90210");
        assert_eq!(parsed.max_price, Some(65000.0));
        assert_eq!(parsed.location.as_deref(), Some("90210"));
    }

    #[test]
    fn features_collect_independently() {
        let parsed = parse_query("lifted truck with carbon ceramic brakes, bucket seats and performance pack");
        assert_eq!(
            parsed.features,
            vec![
                Feature::BucketSeats,
                Feature::CarbonCeramicBrakes,
                Feature::PerformanceTrim,
                Feature::Lifted
            ]
        );
    }

    #[test]
    fn first_match_wins_in_vocabulary_order() {
        // "ford" is listed before "ram"
        assert_eq!(parse_query("ford or ram?").make.as_deref(), Some("ford"));
        // substring matching: "m3" inside another token still counts
        assert_eq!(parse_query("xm3 trim").model.as_deref(), Some("M3"));
    }

    #[test]
    fn unmatched_text_yields_empty_query() {
        let parsed = parse_query("anything fun?");
        assert!(parsed.is_empty());
        assert!(parsed.to_predicate().is_empty());
    }

    #[test]
    fn converts_to_substring_predicate() {
        let predicate = parse_query("dodge hellcat 75201").to_predicate();
        assert_eq!(predicate.text_match, TextMatch::Contains);
        assert_eq!(predicate.make.as_deref(), Some("dodge"));
        assert_eq!(predicate.model.as_deref(), Some("Hellcat"));
        assert_eq!(predicate.zip.as_deref(), Some("75201"));
    }
}
