use chrono::{DateTime, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{
    mediamodel::PropertyImage,
    propertymodel::{
        validate_listing_requirements, AreaCharacteristics, ElectricityPayment, ElectricityType,
        KitchenType, LandTitleType, LandType, ListingType, Property, PropertyFeature,
        PropertyRecord, VehicleAccess, WaterType,
    },
};

fn default_one() -> i32 {
    1
}

fn default_currency() -> String {
    "XAF".to_string()
}

fn default_vehicle_access() -> VehicleAccess {
    VehicleAccess::LowCar
}

fn default_kitchen_type() -> KitchenType {
    KitchenType::FullSize
}

fn default_electricity_type() -> ElectricityType {
    ElectricityType::PrivateMeter
}

fn default_electricity_payment() -> ElectricityPayment {
    ElectricityPayment::Prepaid
}

fn default_water_type() -> WaterType {
    WaterType::Camwater
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureDto {
    #[validate(length(min = 1, max = 100))]
    pub feature_name: String,
    #[validate(length(min = 1, max = 200))]
    pub feature_value: String,
    #[serde(default)]
    pub is_highlighted: bool,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreatePropertyDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub property_type_id: Uuid,
    pub listing_type: ListingType,
    pub status_id: Uuid,
    pub area_id: Uuid,

    pub google_pin_location: Option<String>,
    #[validate(range(min = 0))]
    pub distance_from_main_road: Option<i32>,
    #[serde(default)]
    pub road_is_tarred: bool,
    #[serde(default = "default_vehicle_access")]
    pub vehicle_access: VehicleAccess,

    #[serde(default)]
    #[validate(range(min = 0, max = 50))]
    pub bedrooms: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 20))]
    pub living_rooms: i32,
    #[serde(default = "default_one")]
    #[validate(range(min = 0, max = 50))]
    pub bathrooms: i32,
    #[serde(default = "default_one")]
    #[validate(range(min = 0, max = 20))]
    pub kitchens: i32,
    #[serde(default = "default_kitchen_type")]
    pub kitchen_type: KitchenType,
    #[serde(default)]
    #[validate(range(min = 0, max = 20))]
    pub balconies: i32,
    #[serde(default = "default_one")]
    #[validate(range(min = 1, max = 200))]
    pub floors: i32,
    pub floor_number: Option<i32>,
    pub room_size: Option<BigDecimal>,
    #[serde(default)]
    pub has_dressing_cupboard: bool,

    #[serde(default = "default_electricity_type")]
    pub electricity_type: ElectricityType,
    #[serde(default = "default_electricity_payment")]
    pub electricity_payment: ElectricityPayment,
    #[serde(default = "default_water_type")]
    pub water_type: WaterType,
    #[serde(default)]
    pub has_ac_preinstalled: bool,
    #[serde(default)]
    pub has_hot_water: bool,
    #[serde(default)]
    pub has_generator: bool,

    #[serde(default)]
    pub has_parking: bool,
    #[serde(default)]
    pub has_security: bool,
    #[serde(default)]
    pub has_pool: bool,
    #[serde(default)]
    pub has_gym: bool,
    #[serde(default)]
    pub has_elevator: bool,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be a 3 letter code"))]
    pub currency: String,

    #[validate(range(min = 0, max = 24))]
    pub initial_months_payable: Option<i32>,
    #[validate(range(min = 0, max = 24))]
    pub caution_months: Option<i32>,
    #[validate(range(min = 0))]
    pub visit_fee: Option<i64>,
    #[serde(default)]
    pub requires_contract_registration: bool,

    pub land_size_sqm: Option<BigDecimal>,
    #[serde(default)]
    pub has_land_title: bool,
    pub land_title_type: Option<LandTitleType>,
    pub other_documentation: Option<String>,

    pub land_type: Option<LandType>,
    pub area_characteristics: Option<AreaCharacteristics>,

    pub warehouse_height: Option<BigDecimal>,
    #[serde(default)]
    pub has_forklift: bool,
    #[serde(default)]
    pub allows_truck_entry: bool,
    #[serde(default)]
    pub has_inventory_manager: bool,
    #[serde(default)]
    pub requires_goods_documentation: bool,

    #[validate(range(min = 0))]
    pub price_per_day: Option<i64>,
    #[serde(default)]
    pub price_negotiable: bool,
    #[serde(default)]
    pub has_refundable_caution: bool,

    pub agent_commission_percentage: Option<BigDecimal>,
    #[validate(range(min = 0, max = 24))]
    pub agent_commission_months: Option<i32>,

    #[serde(default)]
    pub features: Vec<CreateFeatureDto>,
}

impl CreatePropertyDto {
    /// Field rules plus the listing-type and numeric checks the derive
    /// cannot express, reported together.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);

        if let Err(extra) =
            validate_listing_requirements(self.listing_type, self.land_size_sqm.as_ref(), self.price_per_day)
        {
            merge(&mut errors, extra);
        }
        if let Err(extra) = validate_features(&self.features) {
            merge(&mut errors, extra);
        }
        if let Err(extra) = check_decimals(
            self.land_size_sqm.as_ref(),
            self.room_size.as_ref(),
            self.warehouse_height.as_ref(),
            self.agent_commission_percentage.as_ref(),
        ) {
            merge(&mut errors, extra);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Partial update. Absent fields keep their stored value and the slug is
/// never touched.
#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePropertyDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub property_type_id: Option<Uuid>,
    pub listing_type: Option<ListingType>,
    pub status_id: Option<Uuid>,
    pub area_id: Option<Uuid>,

    pub google_pin_location: Option<String>,
    #[validate(range(min = 0))]
    pub distance_from_main_road: Option<i32>,
    pub road_is_tarred: Option<bool>,
    pub vehicle_access: Option<VehicleAccess>,

    #[validate(range(min = 0, max = 50))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0, max = 20))]
    pub living_rooms: Option<i32>,
    #[validate(range(min = 0, max = 50))]
    pub bathrooms: Option<i32>,
    #[validate(range(min = 0, max = 20))]
    pub kitchens: Option<i32>,
    pub kitchen_type: Option<KitchenType>,
    #[validate(range(min = 0, max = 20))]
    pub balconies: Option<i32>,
    #[validate(range(min = 1, max = 200))]
    pub floors: Option<i32>,
    pub floor_number: Option<i32>,
    pub room_size: Option<BigDecimal>,
    pub has_dressing_cupboard: Option<bool>,

    pub electricity_type: Option<ElectricityType>,
    pub electricity_payment: Option<ElectricityPayment>,
    pub water_type: Option<WaterType>,
    pub has_ac_preinstalled: Option<bool>,
    pub has_hot_water: Option<bool>,
    pub has_generator: Option<bool>,

    pub has_parking: Option<bool>,
    pub has_security: Option<bool>,
    pub has_pool: Option<bool>,
    pub has_gym: Option<bool>,
    pub has_elevator: Option<bool>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,

    #[validate(range(min = 0, max = 24))]
    pub initial_months_payable: Option<i32>,
    #[validate(range(min = 0, max = 24))]
    pub caution_months: Option<i32>,
    #[validate(range(min = 0))]
    pub visit_fee: Option<i64>,
    pub requires_contract_registration: Option<bool>,

    pub land_size_sqm: Option<BigDecimal>,
    pub has_land_title: Option<bool>,
    pub land_title_type: Option<LandTitleType>,
    pub other_documentation: Option<String>,

    pub land_type: Option<LandType>,
    pub area_characteristics: Option<AreaCharacteristics>,

    pub warehouse_height: Option<BigDecimal>,
    pub has_forklift: Option<bool>,
    pub allows_truck_entry: Option<bool>,
    pub has_inventory_manager: Option<bool>,
    pub requires_goods_documentation: Option<bool>,

    #[validate(range(min = 0))]
    pub price_per_day: Option<i64>,
    pub price_negotiable: Option<bool>,
    pub has_refundable_caution: Option<bool>,

    pub agent_commission_percentage: Option<BigDecimal>,
    #[validate(range(min = 0, max = 24))]
    pub agent_commission_months: Option<i32>,

    /// Replaces every feature when present.
    pub features: Option<Vec<CreateFeatureDto>>,
}

macro_rules! set_if_some {
    ($target:ident, $source:ident, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $source.$field {
                $target.$field = value;
            }
        )*
    };
}

macro_rules! set_nullable_if_some {
    ($target:ident, $source:ident, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $source.$field {
                $target.$field = Some(value);
            }
        )*
    };
}

impl UpdatePropertyDto {
    /// Writes the present fields onto `property` and re-checks the merged
    /// record. Returns the feature replacement, if one was sent.
    pub fn apply(self, property: &mut Property) -> Result<Option<Vec<CreateFeatureDto>>, ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        let update = self;
        set_if_some!(property, update, [
            title,
            description,
            property_type_id,
            listing_type,
            status_id,
            area_id,
            road_is_tarred,
            vehicle_access,
            bedrooms,
            living_rooms,
            bathrooms,
            kitchens,
            kitchen_type,
            balconies,
            floors,
            has_dressing_cupboard,
            electricity_type,
            electricity_payment,
            water_type,
            has_ac_preinstalled,
            has_hot_water,
            has_generator,
            has_parking,
            has_security,
            has_pool,
            has_gym,
            has_elevator,
            price,
            currency,
            requires_contract_registration,
            has_land_title,
            has_forklift,
            allows_truck_entry,
            has_inventory_manager,
            requires_goods_documentation,
            price_negotiable,
            has_refundable_caution,
        ]);
        set_nullable_if_some!(property, update, [
            google_pin_location,
            distance_from_main_road,
            floor_number,
            room_size,
            initial_months_payable,
            caution_months,
            visit_fee,
            land_size_sqm,
            land_title_type,
            other_documentation,
            land_type,
            area_characteristics,
            warehouse_height,
            price_per_day,
            agent_commission_percentage,
            agent_commission_months,
        ]);

        if let Some(features) = &update.features {
            if let Err(extra) = validate_features(features) {
                merge(&mut errors, extra);
            }
        }
        if let Err(extra) = validate_listing_requirements(
            property.listing_type,
            property.land_size_sqm.as_ref(),
            property.price_per_day,
        ) {
            merge(&mut errors, extra);
        }
        if let Err(extra) = check_decimals(
            property.land_size_sqm.as_ref(),
            property.room_size.as_ref(),
            property.warehouse_height.as_ref(),
            property.agent_commission_percentage.as_ref(),
        ) {
            merge(&mut errors, extra);
        }

        if errors.is_empty() {
            Ok(update.features)
        } else {
            Err(errors)
        }
    }
}

fn merge(into: &mut ValidationErrors, from: ValidationErrors) {
    for (field, errs) in from.field_errors() {
        for err in errs {
            into.add(field, err.clone());
        }
    }
}

fn validate_features(features: &[CreateFeatureDto]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for (i, feature) in features.iter().enumerate() {
        if feature.validate().is_err() {
            let mut err = ValidationError::new("features");
            err.message = Some(format!("Feature {} needs a name and a value", i + 1).into());
            errors.add("features", err);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_decimals(
    land_size_sqm: Option<&BigDecimal>,
    room_size: Option<&BigDecimal>,
    warehouse_height: Option<&BigDecimal>,
    commission: Option<&BigDecimal>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    // Upper bounds follow the NUMERIC precision of each column.
    for (field, value, max) in [
        ("land_size_sqm", land_size_sqm, 10_000_000_000i64),
        ("room_size", room_size, 1_000_000),
        ("warehouse_height", warehouse_height, 10_000),
    ] {
        if let Some(v) = value {
            if v <= &BigDecimal::zero() {
                let mut err = ValidationError::new("range");
                err.message = Some("Must be greater than zero".into());
                errors.add(field, err);
            } else if v >= &BigDecimal::from(max) {
                let mut err = ValidationError::new("range");
                err.message = Some(format!("Must be less than {}", max).into());
                errors.add(field, err);
            }
        }
    }

    if let Some(pct) = commission {
        if pct < &BigDecimal::zero() || pct > &BigDecimal::from(100) {
            let mut err = ValidationError::new("range");
            err.message = Some("Commission must be between 0 and 100 percent".into());
            errors.add("agent_commission_percentage", err);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_future(date: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *date <= Utc::now() {
        let mut err = ValidationError::new("scheduled_date");
        err.message = Some("Viewing must be scheduled in the future".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateViewingDto {
    #[validate(custom = "validate_future")]
    pub scheduled_date: DateTime<Utc>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PropertyListDto {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub listing_type: ListingType,
    pub property_type: String,
    pub status: String,
    pub price: i64,
    pub currency: String,
    pub price_per_day: Option<i64>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub land_size_sqm: Option<BigDecimal>,
    pub area_name: String,
    pub city_name: String,
    pub agent_username: String,
    pub primary_image: Option<String>,
    pub featured: bool,
    pub views_count: i64,
    pub created_at: DateTime<Utc>,
}

impl PropertyListDto {
    pub fn from_record(record: &PropertyRecord) -> Self {
        let p = &record.property;
        PropertyListDto {
            id: p.id,
            title: p.title.clone(),
            slug: p.slug.clone(),
            listing_type: p.listing_type,
            property_type: record.property_type_name.clone(),
            status: record.status_name.clone(),
            price: p.price,
            currency: p.currency.clone(),
            price_per_day: p.price_per_day,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            land_size_sqm: p.land_size_sqm.clone(),
            area_name: record.area_name.clone(),
            city_name: record.city_name.clone(),
            agent_username: record.agent_username.clone(),
            primary_image: record.primary_image_url.clone(),
            featured: p.featured,
            views_count: p.views_count,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PropertyAgentDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub agency_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PropertyDetailDto {
    #[serde(flatten)]
    pub property: Property,
    pub property_type: String,
    pub status: String,
    pub area_name: String,
    pub city_name: String,
    pub region_name: String,
    pub full_location: String,
    pub agent: PropertyAgentDto,
    pub primary_image: Option<String>,
    pub features: Vec<PropertyFeature>,
    pub images: Vec<PropertyImage>,
}

impl PropertyDetailDto {
    pub fn from_record(
        record: PropertyRecord,
        features: Vec<PropertyFeature>,
        images: Vec<PropertyImage>,
    ) -> Self {
        let full_location = format!(
            "{}, {}, {}",
            record.area_name, record.city_name, record.region_name
        );
        PropertyDetailDto {
            agent: PropertyAgentDto {
                id: record.property.agent_id,
                user_id: record.agent_user_id,
                username: record.agent_username,
                agency_name: record.agency_name,
            },
            property: record.property,
            property_type: record.property_type_name,
            status: record.status_name,
            area_name: record.area_name,
            city_name: record.city_name,
            region_name: record.region_name,
            full_location,
            primary_image: record.primary_image_url,
            features,
            images,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PropertyResponseDto<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> PropertyResponseDto<T> {
    pub fn success(data: T) -> Self {
        PropertyResponseDto { status: "success", data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(listing_type: &str) -> serde_json::Value {
        json!({
            "title": "Modern studio in Akwa",
            "description": "Bright studio close to the market",
            "property_type_id": Uuid::new_v4(),
            "listing_type": listing_type,
            "status_id": Uuid::new_v4(),
            "area_id": Uuid::new_v4(),
            "price": 150000
        })
    }

    #[test]
    fn create_fills_defaults_like_the_table() {
        let dto: CreatePropertyDto = serde_json::from_value(payload("rent")).unwrap();
        assert_eq!(dto.bathrooms, 1);
        assert_eq!(dto.floors, 1);
        assert_eq!(dto.currency, "XAF");
        assert_eq!(dto.vehicle_access, VehicleAccess::LowCar);
        assert!(dto.features.is_empty());
        assert!(dto.validate_all().is_ok());
    }

    #[test]
    fn sale_without_land_size_is_rejected_on_create() {
        let dto: CreatePropertyDto = serde_json::from_value(payload("sale")).unwrap();
        let err = dto.validate_all().unwrap_err();
        assert!(err.field_errors().contains_key("land_size_sqm"));

        let mut body = payload("sale");
        body["land_size_sqm"] = json!("500.00");
        let dto: CreatePropertyDto = serde_json::from_value(body).unwrap();
        assert!(dto.validate_all().is_ok());
        assert_eq!(dto.land_size_sqm, Some(BigDecimal::from(500)));
    }

    #[test]
    fn negative_price_and_bad_commission_are_field_errors() {
        let mut body = payload("rent");
        body["price"] = json!(-1);
        body["agent_commission_percentage"] = json!("140");
        let dto: CreatePropertyDto = serde_json::from_value(body).unwrap();
        let err = dto.validate_all().unwrap_err();
        let fields = err.field_errors();
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("agent_commission_percentage"));
    }

    fn stored(listing_type: &str) -> Property {
        let now = Utc::now();
        let mut body = payload(listing_type);
        for (key, value) in [
            ("id", json!(Uuid::new_v4())),
            ("slug", json!("modern-studio-in-akwa")),
            ("agent_id", json!(Uuid::new_v4())),
            ("is_active", json!(true)),
            ("featured", json!(false)),
            ("views_count", json!(0)),
            ("created_at", json!(now)),
            ("updated_at", json!(now)),
        ] {
            body[key] = value;
        }
        let dto: CreatePropertyDto = serde_json::from_value(payload(listing_type)).unwrap();
        for (key, value) in serde_json::to_value(&dto).unwrap().as_object().unwrap() {
            if key != "features" && body.get(key).is_none() {
                body[key.as_str()] = value.clone();
            }
        }
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn partial_update_rechecks_field_rules() {
        let mut property = stored("rent");
        let update: UpdatePropertyDto = serde_json::from_value(json!({
            "title": "",
            "bedrooms": -5,
            "caution_months": 999,
            "currency": "EURO"
        }))
        .unwrap();

        let err = update.apply(&mut property).unwrap_err();
        let fields = err.field_errors();
        for field in ["title", "bedrooms", "caution_months", "currency"] {
            assert!(fields.contains_key(field), "{} should be rejected", field);
        }
    }

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let mut property = stored("rent");
        let update: UpdatePropertyDto =
            serde_json::from_value(json!({ "price": 180000, "bedrooms": 2 })).unwrap();

        assert!(update.apply(&mut property).unwrap().is_none());
        assert_eq!(property.price, 180000);
        assert_eq!(property.bedrooms, 2);
        assert_eq!(property.title, "Modern studio in Akwa");
        assert_eq!(property.slug, "modern-studio-in-akwa");
    }

    #[test]
    fn partial_update_switching_to_sale_needs_land_size() {
        let mut property = stored("rent");
        let update: UpdatePropertyDto =
            serde_json::from_value(json!({ "listing_type": "sale" })).unwrap();
        let err = update.apply(&mut property).unwrap_err();
        assert!(err.field_errors().contains_key("land_size_sqm"));
    }

    #[test]
    fn decimals_must_fit_their_columns() {
        let mut body = payload("rent");
        body["warehouse_height"] = json!("10000");
        body["room_size"] = json!("25.5");
        let dto: CreatePropertyDto = serde_json::from_value(body).unwrap();
        let err = dto.validate_all().unwrap_err();
        let fields = err.field_errors();
        assert!(fields.contains_key("warehouse_height"));
        assert!(!fields.contains_key("room_size"));
    }

    #[test]
    fn viewing_must_be_in_the_future() {
        let past = CreateViewingDto {
            scheduled_date: Utc::now() - chrono::Duration::hours(1),
            notes: None,
        };
        assert!(past.validate().unwrap_err().field_errors().contains_key("scheduled_date"));

        let future = CreateViewingDto {
            scheduled_date: Utc::now() + chrono::Duration::days(2),
            notes: Some("Morning please".to_string()),
        };
        assert!(future.validate().is_ok());
    }
}
