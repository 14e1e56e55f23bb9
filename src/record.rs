use serde::{Serialize, Serializer};

/// Output column order. Must match the field order of [`ListingRecord`].
pub const COLUMNS: [&str; 11] = [
    "price",
    "project_name",
    "size_sqm",
    "floor_range",
    "floor_num",
    "bedroom",
    "bathroom",
    "title_text",
    "is_corner",
    "is_river_view",
    "near_bts",
];

/// Placeholder project name for cards without a location.
pub const UNKNOWN_PROJECT: &str = "Unknown";

/// One harvested listing, already normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub price: Option<u64>,
    pub project_name: String,
    pub size_sqm: Option<f64>,
    pub floor_range: Option<String>,
    pub floor_num: Option<f64>,
    pub bedroom: u32,
    pub bathroom: u32,
    pub title_text: String,
    #[serde(serialize_with = "flag")]
    pub is_corner: bool,
    #[serde(serialize_with = "flag")]
    pub is_river_view: bool,
    #[serde(serialize_with = "flag")]
    pub near_bts: bool,
}

impl Default for ListingRecord {
    fn default() -> Self {
        Self {
            price: None,
            project_name: UNKNOWN_PROJECT.to_string(),
            size_sqm: None,
            floor_range: None,
            floor_num: None,
            bedroom: 0,
            bathroom: 0,
            title_text: String::new(),
            is_corner: false,
            is_river_view: false,
            near_bts: false,
        }
    }
}

/// Flags are written as `1`/`0` so the table reads as numeric features.
fn flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// Minimum price and size a listing needs to be kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    pub min_price: u64,
    pub min_size_sqm: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_price: 500_000,
            min_size_sqm: 10.0,
        }
    }
}

impl QualityGate {
    /// Both bounds are exclusive, a missing price or size never passes.
    pub fn accepts(&self, record: &ListingRecord) -> bool {
        let price_ok = record.price.is_some_and(|p| p > self.min_price);
        let size_ok = record.size_sqm.is_some_and(|s| s > self.min_size_sqm);
        price_ok && size_ok
    }
}
