use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::BigDecimal, FromRow};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "property_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyCategory {
    ChambreModern,
    Studio,
    Apartment,
    Bungalow,
    VillaDuplex,
    Commercial,
    Land,
    Warehouse,
    GuestHouse,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "listing_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Rent,
    Sale,
    GuestHouse,
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rent" => Ok(ListingType::Rent),
            "sale" => Ok(ListingType::Sale),
            "guest_house" => Ok(ListingType::GuestHouse),
            other => Err(format!("\"{}\" is not a valid listing type", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_access", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleAccess {
    Bike,
    LowCar,
    Suv,
}

impl FromStr for VehicleAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bike" => Ok(VehicleAccess::Bike),
            "low_car" => Ok(VehicleAccess::LowCar),
            "suv" => Ok(VehicleAccess::Suv),
            other => Err(format!("\"{}\" is not a valid vehicle access", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "kitchen_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KitchenType {
    FullSize,
    Partial,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "electricity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ElectricityType {
    PrivateMeter,
    SharedMeter,
}

impl FromStr for ElectricityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private_meter" => Ok(ElectricityType::PrivateMeter),
            "shared_meter" => Ok(ElectricityType::SharedMeter),
            other => Err(format!("\"{}\" is not a valid electricity type", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "electricity_payment", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ElectricityPayment {
    Prepaid,
    Postpaid,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "water_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WaterType {
    Camwater,
    Forage,
}

impl FromStr for WaterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camwater" => Ok(WaterType::Camwater),
            "forage" => Ok(WaterType::Forage),
            other => Err(format!("\"{}\" is not a valid water type", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "land_title_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LandTitleType {
    Global,
    Extract,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "land_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LandType {
    Family,
    Private,
    Community,
    ReclaimedLand,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "area_characteristics", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AreaCharacteristics {
    Swampy,
    Dry,
    ForestArea,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "viewing_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ViewingStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PropertyType {
    pub id: Uuid,
    pub name: String,
    pub category: PropertyCategory,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PropertyStatus {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub property_type_id: Uuid,
    pub listing_type: ListingType,
    pub status_id: Uuid,
    pub area_id: Uuid,
    pub agent_id: Uuid,
    pub slug: String,

    // Location
    pub google_pin_location: Option<String>,
    pub distance_from_main_road: Option<i32>,
    pub road_is_tarred: bool,
    pub vehicle_access: VehicleAccess,

    // Rooms
    pub bedrooms: i32,
    pub living_rooms: i32,
    pub bathrooms: i32,
    pub kitchens: i32,
    pub kitchen_type: KitchenType,
    pub balconies: i32,
    pub floors: i32,
    pub floor_number: Option<i32>,
    pub room_size: Option<BigDecimal>,
    pub has_dressing_cupboard: bool,

    // Utilities
    pub electricity_type: ElectricityType,
    pub electricity_payment: ElectricityPayment,
    pub water_type: WaterType,
    pub has_ac_preinstalled: bool,
    pub has_hot_water: bool,
    pub has_generator: bool,

    // Amenities
    pub has_parking: bool,
    pub has_security: bool,
    pub has_pool: bool,
    pub has_gym: bool,
    pub has_elevator: bool,

    // Pricing, whole XAF
    pub price: i64,
    pub currency: String,

    // Rent
    pub initial_months_payable: Option<i32>,
    pub caution_months: Option<i32>,
    pub visit_fee: Option<i64>,
    pub requires_contract_registration: bool,

    // Sale
    pub land_size_sqm: Option<BigDecimal>,
    pub has_land_title: bool,
    pub land_title_type: Option<LandTitleType>,
    pub other_documentation: Option<String>,

    // Land
    pub land_type: Option<LandType>,
    pub area_characteristics: Option<AreaCharacteristics>,

    // Warehouse
    pub warehouse_height: Option<BigDecimal>,
    pub has_forklift: bool,
    pub allows_truck_entry: bool,
    pub has_inventory_manager: bool,
    pub requires_goods_documentation: bool,

    // Guest house
    pub price_per_day: Option<i64>,
    pub price_negotiable: bool,
    pub has_refundable_caution: bool,

    pub agent_commission_percentage: Option<BigDecimal>,
    pub agent_commission_months: Option<i32>,

    pub featured: bool,
    pub is_active: bool,
    pub views_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A listing joined with the display names the list and detail shapes need.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PropertyRecord {
    #[sqlx(flatten)]
    pub property: Property,
    pub property_type_name: String,
    pub status_name: String,
    pub area_name: String,
    pub city_name: String,
    pub region_name: String,
    pub agent_user_id: Uuid,
    pub agent_username: String,
    pub agency_name: Option<String>,
    pub primary_image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PropertyFeature {
    pub id: Uuid,
    pub property_id: Uuid,
    pub feature_name: String,
    pub feature_value: String,
    pub is_highlighted: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PropertyViewing {
    pub id: Uuid,
    pub property_id: Uuid,
    pub viewer_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub status: ViewingStatus,
    pub notes: Option<String>,
    pub visit_fee_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Listing-type specific requirements, checked on create and again on the
/// merged record for partial updates.
pub fn validate_listing_requirements(
    listing_type: ListingType,
    land_size_sqm: Option<&BigDecimal>,
    price_per_day: Option<i64>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if listing_type == ListingType::Sale && land_size_sqm.is_none() {
        let mut err = ValidationError::new("required");
        err.message = Some("Land size is required for properties listed for sale".into());
        errors.add("land_size_sqm", err);
    }

    if listing_type == ListingType::GuestHouse && price_per_day.is_none() {
        let mut err = ValidationError::new("required");
        err.message = Some("Daily price is required for guest houses".into());
        errors.add("price_per_day", err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_requires_land_size() {
        let err = validate_listing_requirements(ListingType::Sale, None, None).unwrap_err();
        assert!(err.field_errors().contains_key("land_size_sqm"));

        let size = BigDecimal::from(450);
        assert!(validate_listing_requirements(ListingType::Sale, Some(&size), None).is_ok());
    }

    #[test]
    fn guest_house_requires_daily_price() {
        let err = validate_listing_requirements(ListingType::GuestHouse, None, None).unwrap_err();
        assert!(err.field_errors().contains_key("price_per_day"));
        assert!(!err.field_errors().contains_key("land_size_sqm"));

        assert!(validate_listing_requirements(ListingType::GuestHouse, None, Some(15_000)).is_ok());
    }

    #[test]
    fn rent_has_no_extra_requirements() {
        assert!(validate_listing_requirements(ListingType::Rent, None, None).is_ok());
    }

    #[test]
    fn choices_parse_from_query_values() {
        assert_eq!("guest_house".parse::<ListingType>(), Ok(ListingType::GuestHouse));
        assert_eq!("low_car".parse::<VehicleAccess>(), Ok(VehicleAccess::LowCar));
        assert_eq!("forage".parse::<WaterType>(), Ok(WaterType::Forage));
        assert_eq!("shared_meter".parse::<ElectricityType>(), Ok(ElectricityType::SharedMeter));
        assert!("villa".parse::<ListingType>().is_err());
    }
}
