//! Listings: the for-sale records, their category set and their price type.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;
use utoipa::ToSchema;

/// Location recorded when the seller leaves it blank.
pub const DEFAULT_LOCATION: &str = "Not specified";

/// Filter value that selects every category.
pub const ALL_CATEGORIES: &str = "all";

/// The fixed category set, in display order.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
pub enum Category {
    Vehicles,
    #[serde(rename = "Property Rentals")]
    PropertyRentals,
    Apparel,
    Classifieds,
    Electronics,
    Entertainment,
    Family,
    #[serde(rename = "Free Stuff")]
    FreeStuff,
    #[serde(rename = "Garden & Outdoor")]
    GardenOutdoor,
    Hobbies,
    #[serde(rename = "Home Goods")]
    HomeGoods,
    #[serde(rename = "Home Improvement")]
    HomeImprovement,
    #[serde(rename = "Home Sales")]
    HomeSales,
    #[serde(rename = "Musical Instruments")]
    MusicalInstruments,
    #[serde(rename = "Office Supplies")]
    OfficeSupplies,
    #[serde(rename = "Pet Supplies")]
    PetSupplies,
    #[serde(rename = "Sporting Goods")]
    SportingGoods,
    #[serde(rename = "Toys & Games")]
    ToysGames,
    #[serde(rename = "Buy and sell groups")]
    BuyAndSellGroups,
}

impl Category {
    pub const ALL: [Category; 19] = [
        Category::Vehicles,
        Category::PropertyRentals,
        Category::Apparel,
        Category::Classifieds,
        Category::Electronics,
        Category::Entertainment,
        Category::Family,
        Category::FreeStuff,
        Category::GardenOutdoor,
        Category::Hobbies,
        Category::HomeGoods,
        Category::HomeImprovement,
        Category::HomeSales,
        Category::MusicalInstruments,
        Category::OfficeSupplies,
        Category::PetSupplies,
        Category::SportingGoods,
        Category::ToysGames,
        Category::BuyAndSellGroups,
    ];

    /// Display name, which is also the stored value.
    pub fn name(self) -> &'static str {
        match self {
            Category::Vehicles => "Vehicles",
            Category::PropertyRentals => "Property Rentals",
            Category::Apparel => "Apparel",
            Category::Classifieds => "Classifieds",
            Category::Electronics => "Electronics",
            Category::Entertainment => "Entertainment",
            Category::Family => "Family",
            Category::FreeStuff => "Free Stuff",
            Category::GardenOutdoor => "Garden & Outdoor",
            Category::Hobbies => "Hobbies",
            Category::HomeGoods => "Home Goods",
            Category::HomeImprovement => "Home Improvement",
            Category::HomeSales => "Home Sales",
            Category::MusicalInstruments => "Musical Instruments",
            Category::OfficeSupplies => "Office Supplies",
            Category::PetSupplies => "Pet Supplies",
            Category::SportingGoods => "Sporting Goods",
            Category::ToysGames => "Toys & Games",
            Category::BuyAndSellGroups => "Buy and sell groups",
        }
    }

    /// URL slug: lower-cased name with runs of whitespace replaced by `-`.
    pub fn slug(self) -> String {
        self.name()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Accepts either the display name or the slug, case-insensitively.
    pub fn parse(input: &str) -> Option<Category> {
        let needle = input.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.name().to_lowercase() == needle || c.slug() == needle)
    }

    pub fn names() -> Vec<&'static str> {
        Category::ALL.iter().map(|c| c.name()).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Category::parse(&raw).ok_or_else(|| de::Error::custom(format!("unknown category '{}'", raw)))
    }
}

/// A category filter as received from a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl CategoryFilter {
    /// `None`, blank, and the `all` sentinel select everything. Unknown names yield `None`.
    pub fn parse(input: Option<&str>) -> Option<CategoryFilter> {
        match input.map(str::trim) {
            None | Some("") => Some(CategoryFilter::All),
            Some(v) if v.eq_ignore_ascii_case(ALL_CATEGORIES) => Some(CategoryFilter::All),
            Some(v) => Category::parse(v).map(CategoryFilter::Only),
        }
    }

    pub fn category(self) -> Option<Category> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Only(c) => Some(c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("Price must be in format $XX.XX")]
    MissingCurrency,
    #[error("Price must not be negative")]
    Negative,
    #[error("Price must be in format $XX.XX")]
    Malformed,
    #[error("Price must not exceed $99999999999.99")]
    TooLarge,
}

/// Largest accepted price. Amounts up to this survive a trip through an `f64`.
pub const MAX_PRICE_CENTS: u64 = 9_999_999_999_999;

/// A non-negative amount held as whole cents.
///
/// Stored as a decimal number and rendered as `"$12.50"` at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(self) -> u64 {
        self.cents
    }

    /// Parses `"$<digits>[.<one or two digits>]"`. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let rest = input
            .trim()
            .strip_prefix('$')
            .ok_or(PriceError::MissingCurrency)?;
        Self::parse_decimal(rest)
    }

    /// Parses a bare decimal amount such as `"12.5"`.
    pub fn parse_decimal(input: &str) -> Result<Self, PriceError> {
        let rest = input.trim();
        if rest.starts_with('-') {
            return Err(PriceError::Negative);
        }

        let (whole, frac) = match rest.split_once('.') {
            Some((w, f)) => (w, f),
            None => (rest, ""),
        };
        let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(frac) || frac.len() > 2 {
            return Err(PriceError::Malformed);
        }
        if rest.contains('.') && frac.is_empty() {
            return Err(PriceError::Malformed);
        }

        let whole: u64 = whole.parse().map_err(|_| PriceError::TooLarge)?;
        let frac: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| PriceError::Malformed)? * 10,
            _ => frac.parse().map_err(|_| PriceError::Malformed)?,
        };
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .filter(|&c| c <= MAX_PRICE_CENTS)
            .map(Price::from_cents)
            .ok_or(PriceError::TooLarge)
    }

    /// Converts a stored decimal amount. Negative and non-finite amounts are rejected.
    pub fn from_amount(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents > u64::MAX as f64 {
            return None;
        }
        Some(Price::from_cents(cents as u64))
    }

    pub fn as_amount(self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Exact decimal form without the currency sign, e.g. `"12.50"`.
    pub fn decimal(self) -> String {
        format!("{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.decimal())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match JsonValue::deserialize(deserializer)? {
            JsonValue::String(s) => Price::parse(&s).map_err(de::Error::custom),
            JsonValue::Number(n) => n
                .as_f64()
                .and_then(Price::from_amount)
                .ok_or_else(|| de::Error::custom("price must be a non-negative number")),
            other => Err(de::Error::custom(format!("expected price, got {}", other))),
        }
    }
}

/// A persisted listing as returned to callers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[schema(value_type = String, example = "$12.50")]
    pub price: Price,
    pub seller_email: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub location: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Wildcard that the REST backend's `ilike` cannot escape; dropped from search terms.
const SEARCH_WILDCARD: char = '*';

/// Trims a raw search term and drops `*`. `None` when nothing is left to match.
pub fn normalize_search(raw: &str) -> Option<String> {
    let term: String = raw.chars().filter(|&c| c != SEARCH_WILDCARD).collect();
    let term = term.trim();
    (!term.is_empty()).then(|| term.to_string())
}

impl Listing {
    /// Case-insensitive substring match on title or description.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term) || self.description.to_lowercase().contains(&term)
    }
}

/// Listing creation input, before validation. Every field is optional so that
/// missing fields can be reported together.
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct ListingDraft {
    pub title: Option<String>,
    #[schema(example = "$12.50")]
    pub price: Option<String>,
    pub seller_email: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    /// Superseded by `seller_email`; rejected when present.
    #[serde(default, rename = "email", skip_serializing)]
    #[schema(value_type = Option<String>)]
    pub legacy_email: Option<JsonValue>,
}

/// A validated listing ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub price: Price,
    pub seller_email: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Update body. Only these fields can change; anything else in the body is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct ListingChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// `null` clears the image.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A validated update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub location: Option<String>,
    pub image_url: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ListingPatch {
    pub fn apply(&self, listing: &mut Listing) {
        if let Some(title) = &self.title {
            listing.title = title.clone();
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(description) = &self.description {
            listing.description = description.clone();
        }
        if let Some(category) = self.category {
            listing.category = category;
        }
        if let Some(location) = &self.location {
            listing.location = location.clone();
        }
        if let Some(image_url) = &self.image_url {
            listing.image_url = image_url.clone();
        }
        if self.updated_at.is_some() {
            listing.updated_at = self.updated_at;
        }
    }
}
