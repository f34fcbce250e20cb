// Named post-filters applied after the structured predicate

use serde::{Deserialize, Serialize};

use crate::models::{Category, Listing};

pub const HOT_DEAL_MARGIN: f64 = 5000.0;
pub const GREAT_DEAL_MARGIN: f64 = 2000.0;
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuickFilter {
    #[default]
    All,
    HotDeals,
    GreatDeals,
    UnderMmr,
    Performance,
    Luxury,
    Trucks,
    // Keeps the first few results in arrival order; the store already
    // returns newest-first.
    Recent,
}

impl QuickFilter {
    fn keeps(self, listing: &Listing) -> bool {
        let (price, mmr) = (listing.price, listing.mmr_value);
        match self {
            QuickFilter::All | QuickFilter::Recent => true,
            QuickFilter::HotDeals => price <= mmr - HOT_DEAL_MARGIN,
            QuickFilter::GreatDeals => {
                price > mmr - HOT_DEAL_MARGIN && price <= mmr - GREAT_DEAL_MARGIN
            }
            QuickFilter::UnderMmr => price < mmr,
            QuickFilter::Performance => matches!(
                listing.category,
                Category::MuscleCar | Category::SportsCar | Category::Exotic
            ),
            QuickFilter::Luxury => matches!(listing.category, Category::Luxury | Category::Exotic),
            QuickFilter::Trucks => matches!(listing.category, Category::Truck | Category::Suv),
        }
    }

    pub fn apply(self, mut listings: Vec<Listing>) -> Vec<Listing> {
        match self {
            QuickFilter::All => listings,
            QuickFilter::Recent => {
                listings.truncate(RECENT_LIMIT);
                listings
            }
            _ => {
                listings.retain(|l| self.keeps(l));
                listings
            }
        }
    }
}
