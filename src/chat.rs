// Chat assistant: free text in, matching listings and a short reply out

use serde::Serialize;

use crate::filter;
use crate::models::Listing;
use crate::query_parser::{parse_query, ParsedQuery};

// Listings within this many dollars of MMR get a badge in chat results.
pub const MMR_BADGE_TOLERANCE: f64 = 1000.0;

pub const NO_MATCHES_REPLY: &str = "I couldn't find any cars matching your criteria. \
Try adjusting your search or ask me to show you what's available.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub within_mmr: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    pub parsed: ParsedQuery,
    pub listings: Vec<ChatListing>,
    pub total: usize,
    pub show_more: bool,
}

/// Answers one chat turn against `working_set`. Only the first
/// `preview_limit` matches are returned unless `show_all` is set.
pub fn answer(message: &str, working_set: &[Listing], preview_limit: usize, show_all: bool) -> ChatReply {
    let parsed = parse_query(message);
    let matches = filter::evaluate(&parsed.to_predicate(), working_set);
    let total = matches.len();
    let reply = describe(total, &parsed);

    let shown = if show_all { total } else { total.min(preview_limit) };
    let listings = matches
        .into_iter()
        .take(shown)
        .map(|listing| ChatListing {
            within_mmr: listing.within_mmr(MMR_BADGE_TOLERANCE),
            listing,
        })
        .collect();

    ChatReply {
        reply,
        parsed,
        listings,
        total,
        show_more: shown < total,
    }
}

/// Summary sentence, e.g. "I found 2 cars matching: Bmw M3 under $60,000:".
pub fn describe(count: usize, parsed: &ParsedQuery) -> String {
    if count == 0 {
        return NO_MATCHES_REPLY.to_string();
    }

    let mut reply = format!("I found {} {}", count, if count == 1 { "car" } else { "cars" });

    let mut conditions = Vec::new();
    if let Some(make) = &parsed.make {
        conditions.push(capitalize(make));
    }
    if let Some(model) = &parsed.model {
        conditions.push(model.clone());
    }
    match (parsed.year_min, parsed.year_max) {
        (Some(min), Some(max)) if min != max => conditions.push(format!("{}-{}", min, max)),
        (Some(min), Some(_)) => conditions.push(min.to_string()),
        (Some(min), None) => conditions.push(format!("{}+", min)),
        _ => {}
    }
    if let Some(max) = parsed.max_price {
        conditions.push(format!("under ${}", thousands(max)));
    }

    if !conditions.is_empty() {
        reply.push_str(" matching: ");
        reply.push_str(&conditions.join(" "));
    }
    reply.push(':');
    reply
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn thousands(amount: f64) -> String {
    let digits = (amount.round() as u64).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoredListing;

    fn sample() -> Vec<Listing> {
        let rows: Vec<StoredListing> =
            serde_json::from_str(include_str!("../fixtures/sample_listings.json")).unwrap();
        rows.iter().map(StoredListing::normalize).collect()
    }

    fn ids(reply: &ChatReply) -> Vec<&str> {
        reply.listings.iter().map(|l| l.listing.id.as_str()).collect()
    }

    #[test]
    fn bmw_m3_under_60k() {
        let reply = answer("Show me BMW M3s under $60k", &sample(), 5, false);
        assert_eq!(ids(&reply), vec!["1"]); // the $61k M3 is excluded
        assert_eq!(reply.reply, "I found 1 car matching: Bmw M3 under $60,000:");
        assert!(!reply.show_more);
    }

    #[test]
    fn trucks_2020_plus_with_sunroof() {
        let reply = answer("Find 2020+ trucks with sunroof", &sample(), 5, false);
        // the 2019 F-150 also has a sunroof but is too old
        assert_eq!(ids(&reply), vec!["3"]);
        assert_eq!(reply.reply, "I found 1 car matching: 2020+:");
    }

    #[test]
    fn zip_only_query_returns_exact_zip_subset() {
        let listings = sample();
        let reply = answer("75201", &listings, 100, false);
        let expected: Vec<&str> = listings
            .iter()
            .filter(|l| l.zip == "75201")
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(ids(&reply), expected);
        assert_eq!(reply.reply, "I found 5 cars:");
    }

    #[test]
    fn preview_is_limited_unless_show_all() {
        let listings = sample();
        let preview = answer("what do you have?", &listings, 5, false);
        assert_eq!(preview.listings.len(), 5);
        assert_eq!(preview.total, listings.len());
        assert!(preview.show_more);

        let all = answer("what do you have?", &listings, 5, true);
        assert_eq!(all.listings.len(), listings.len());
        assert!(!all.show_more);
    }

    #[test]
    fn no_matches_reply() {
        let reply = answer("ferrari under 10k", &sample(), 5, false);
        assert_eq!(reply.total, 0);
        assert_eq!(reply.reply, NO_MATCHES_REPLY);
    }

    #[test]
    fn mmr_badge_and_lifted_truck_option() {
        let reply = answer("lifted tacoma", &sample(), 5, false);
        assert_eq!(ids(&reply), vec!["12"]);
        assert!(!reply.listings[0].within_mmr); // 31000 vs 33500

        let hellcat = answer("dodge hellcat", &sample(), 5, false);
        assert!(hellcat.listings[0].within_mmr); // 52000 vs 51000
    }

    #[test]
    fn formats_thousands() {
        assert_eq!(thousands(60000.0), "60,000");
        assert_eq!(thousands(1250000.0), "1,250,000");
        assert_eq!(thousands(999.0), "999");
    }
}
