use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::BigDecimal, FromRow};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Country {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub phone_code: String,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Region {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub country_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    pub region_id: Uuid,
    pub is_major_city: bool,
    pub latitude: Option<BigDecimal>,
    pub longitude: Option<BigDecimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub city_id: Uuid,
    pub local_name: Option<String>,
    pub description: Option<String>,
    pub is_residential: bool,
    pub is_commercial: bool,
    pub is_industrial: bool,
    pub has_tarred_roads: bool,
    pub has_electricity: bool,
    pub has_water_supply: bool,
    pub postal_code: Option<String>,
    pub latitude: Option<BigDecimal>,
    pub longitude: Option<BigDecimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// An area joined with the names of its ancestors.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AreaLocation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub area: Area,
    pub city_name: String,
    pub region_name: String,
    pub country_name: String,
}

impl AreaLocation {
    pub fn full_location(&self) -> String {
        format!("{}, {}, {}", self.area.name, self.city_name, self.region_name)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PopularLocation {
    pub id: Uuid,
    pub area_id: Uuid,
    pub area_name: String,
    pub city_name: String,
    pub property_count: i64,
    pub search_count: i64,
    pub view_count: i64,
    pub is_trending: bool,
    pub updated_at: DateTime<Utc>,
}
