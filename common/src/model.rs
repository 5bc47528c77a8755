use serde::{Deserialize, Serialize};

/// Property category derived from the input's numeric type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Apartment,
    House,
    Commercial,
}

impl PropertyType {
    /// Unknown, missing or unparsable codes fall back to `Apartment`.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(2) => PropertyType::House,
            Some(3) => PropertyType::Commercial,
            _ => PropertyType::Apartment,
        }
    }

    /// Label persisted in the store and returned by listing queries.
    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "Квартира",
            PropertyType::House => "Дом",
            PropertyType::Commercial => "Коммерческая",
        }
    }
}

/// One validated real-estate listing, immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub price: f64,
    pub name: String,
    pub rooms: Option<i64>,
    pub area: Option<f64>,
    pub property_type: PropertyType,
}

impl Listing {
    /// Display name, or a placeholder built from the id when the name is empty.
    pub fn title(&self) -> String {
        if self.name.is_empty() {
            format!("Объект недвижимости #{}", self.id)
        } else {
            self.name.clone()
        }
    }

    /// Rows that are not geocoded yet or carry no price never reach the store.
    pub fn is_persistable(&self) -> bool {
        self.latitude != 0.0
            && self.longitude != 0.0
            && self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.price > 0.0
            && self.price.is_finite()
    }
}

/// Listing as it comes back out of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredListing {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub property_type: String,
    pub rooms: Option<i64>,
    pub area: Option<f64>,
}

/// Minimal point shape the clustering engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricedPoint {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub price: f64,
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl GeoBounds {
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lng
            && longitude <= self.max_lng
    }
}
