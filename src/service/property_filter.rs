use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, Days, NaiveDate, Utc};
use sqlx::{types::BigDecimal, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::models::propertymodel::{ElectricityType, ListingType, VehicleAccess, WaterType};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Boolean query parameters and the listing column each one compares.
const FLAG_PARAMS: [(&str, &str); 11] = [
    ("has_parking", "p.has_parking"),
    ("has_pool", "p.has_pool"),
    ("has_gym", "p.has_gym"),
    ("has_security", "p.has_security"),
    ("has_elevator", "p.has_elevator"),
    ("has_generator", "p.has_generator"),
    ("has_hot_water", "p.has_hot_water"),
    ("has_ac_preinstalled", "p.has_ac_preinstalled"),
    ("road_is_tarred", "p.road_is_tarred"),
    ("has_land_title", "p.has_land_title"),
    ("featured", "p.featured"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Price,
    CreatedAt,
    ViewsCount,
}

impl OrderField {
    fn column(&self) -> &'static str {
        match self {
            OrderField::Price => "p.price",
            OrderField::CreatedAt => "p.created_at",
            OrderField::ViewsCount => "p.views_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for Ordering {
    fn default() -> Self {
        Ordering {
            field: OrderField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for Ordering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let field = match name {
            "price" => OrderField::Price,
            "created_at" => OrderField::CreatedAt,
            "views_count" => OrderField::ViewsCount,
            other => {
                return Err(format!(
                    "\"{}\" is not a valid ordering. Use price, created_at or views_count",
                    other
                ))
            }
        };

        Ok(Ordering { field, descending })
    }
}

/// Parsed listing search. Every field maps to exactly one SQL clause.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub bedrooms_min: Option<i32>,
    pub bedrooms_max: Option<i32>,
    pub bathrooms_min: Option<i32>,
    pub bathrooms_max: Option<i32>,
    pub floors_min: Option<i32>,
    pub floors_max: Option<i32>,
    pub land_size_min: Option<BigDecimal>,
    pub land_size_max: Option<BigDecimal>,

    pub city: Option<String>,
    pub region: Option<String>,
    pub area: Option<String>,
    pub agent: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub search: Option<String>,

    pub listing_type: Option<ListingType>,
    pub water_type: Option<WaterType>,
    pub electricity_type: Option<ElectricityType>,
    pub vehicle_access: Option<VehicleAccess>,
    pub currency: Option<String>,

    pub property_type: Option<Uuid>,
    pub status: Option<Uuid>,

    pub flags: Vec<(&'static str, bool)>,
    pub is_active: Option<bool>,

    pub created_after: Option<NaiveDate>,
    pub created_before: Option<NaiveDate>,

    pub ordering: Ordering,
    pub page: u32,
    pub limit: u32,
}

struct ParamReader<'a> {
    params: &'a HashMap<String, String>,
    errors: ValidationErrors,
}

impl<'a> ParamReader<'a> {
    fn raw(&self, name: &str) -> Option<&'a str> {
        let params: &'a HashMap<String, String> = self.params;
        params
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn reject(&mut self, name: &'static str, message: String) {
        let mut err = ValidationError::new("invalid");
        err.message = Some(message.into());
        self.errors.add(name, err);
    }

    fn parsed<T>(&mut self, name: &'static str, expected: &str) -> Option<T>
    where
        T: FromStr,
    {
        let raw = self.raw(name)?;
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.reject(name, format!("\"{}\" is not a valid {}", raw, expected));
                None
            }
        }
    }

    fn choice<T>(&mut self, name: &'static str) -> Option<T>
    where
        T: FromStr<Err = String>,
    {
        let raw = self.raw(name)?;
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(message) => {
                self.reject(name, message);
                None
            }
        }
    }

    /// Reads the `<column>`, `<column>__gte` and `<column>__lte` lookups.
    /// An exact value pins both ends of the range.
    fn lookups<T>(
        &mut self,
        [exact, gte, lte]: [&'static str; 3],
    ) -> (Option<T>, Option<T>)
    where
        T: FromStr + PartialOrd + Clone,
    {
        let pinned = self.parsed::<T>(exact, "number");
        let low = tighter_min(pinned.clone(), self.parsed(gte, "number"));
        let high = tighter_max(pinned, self.parsed(lte, "number"));
        (low, high)
    }

    fn text(&self, name: &str) -> Option<String> {
        self.raw(name).map(|v| v.to_string())
    }

    fn flag(&mut self, name: &'static str) -> Option<bool> {
        let raw = self.raw(name)?;
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => {
                self.reject(name, format!("\"{}\" is not a valid boolean", raw));
                None
            }
        }
    }

    fn date(&mut self, name: &'static str) -> Option<NaiveDate> {
        let raw = self.raw(name)?;
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                self.reject(
                    name,
                    format!("\"{}\" is not a valid date. Use YYYY-MM-DD", raw),
                );
                None
            }
        }
    }
}

/// Escapes LIKE wildcards so user text matches literally.
pub fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn tighter_min<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b > a { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn tighter_max<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b < a { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

impl PropertyFilter {
    /// Builds a filter from raw query parameters. Unknown parameters are
    /// ignored; any malformed known parameter fails the whole request.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ValidationErrors> {
        let mut r = ParamReader {
            params,
            errors: ValidationErrors::new(),
        };

        let mut filter = PropertyFilter {
            price_min: r.parsed("price_min", "number"),
            price_max: r.parsed("price_max", "number"),
            bedrooms_min: r.parsed("bedrooms_min", "number"),
            bedrooms_max: r.parsed("bedrooms_max", "number"),
            bathrooms_min: r.parsed("bathrooms_min", "number"),
            bathrooms_max: None,
            floors_min: r.parsed("floors_min", "number"),
            floors_max: r.parsed("floors_max", "number"),
            land_size_min: r.parsed("land_size_min", "number"),
            land_size_max: r.parsed("land_size_max", "number"),

            city: r.text("city"),
            region: r.text("region"),
            area: r.text("area"),
            agent: r.text("agent"),
            title: r.text("title"),
            description: r.text("description"),
            search: r.text("search"),

            listing_type: r.choice("listing_type"),
            water_type: r.choice("water_type"),
            electricity_type: r.choice("electricity_type"),
            vehicle_access: r.choice("vehicle_access"),
            currency: r.text("currency").map(|c| c.to_uppercase()),

            property_type: r.parsed("property_type", "id"),
            status: r.parsed("status", "id"),

            flags: Vec::new(),
            is_active: r.flag("is_active"),

            created_after: r.date("created_after"),
            created_before: r.date("created_before"),

            ordering: Ordering::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        };

        filter.price_min = tighter_min(filter.price_min, r.parsed("price_range_min", "number"));
        filter.price_max = tighter_max(filter.price_max, r.parsed("price_range_max", "number"));

        let (low, high) = r.lookups::<i64>(["price", "price__gte", "price__lte"]);
        filter.price_min = tighter_min(filter.price_min, low);
        filter.price_max = tighter_max(filter.price_max, high);

        let (low, high) =
            r.lookups::<i32>(["no_of_bedrooms", "no_of_bedrooms__gte", "no_of_bedrooms__lte"]);
        filter.bedrooms_min = tighter_min(filter.bedrooms_min, low);
        filter.bedrooms_max = tighter_max(filter.bedrooms_max, high);

        let (low, high) =
            r.lookups::<i32>(["no_of_bathrooms", "no_of_bathrooms__gte", "no_of_bathrooms__lte"]);
        filter.bathrooms_min = tighter_min(filter.bathrooms_min, low);
        filter.bathrooms_max = high;

        let (low, high) =
            r.lookups::<i32>(["no_of_floors", "no_of_floors__gte", "no_of_floors__lte"]);
        filter.floors_min = tighter_min(filter.floors_min, low);
        filter.floors_max = tighter_max(filter.floors_max, high);

        let (low, high) =
            r.lookups::<BigDecimal>(["land_size_sqm", "land_size_sqm__gte", "land_size_sqm__lte"]);
        filter.land_size_min = tighter_min(filter.land_size_min.take(), low);
        filter.land_size_max = tighter_max(filter.land_size_max.take(), high);

        for (param, column) in FLAG_PARAMS {
            if let Some(value) = r.flag(param) {
                filter.flags.push((column, value));
            }
        }

        if let Some(ordering) = r.choice::<Ordering>("ordering") {
            filter.ordering = ordering;
        }

        if let Some(page) = r.parsed::<u32>("page", "page number") {
            if page == 0 {
                r.reject("page", "Page numbers start at 1".to_string());
            } else {
                filter.page = page;
            }
        }

        if let Some(limit) = r.parsed::<u32>("limit", "page size") {
            if limit == 0 || limit > MAX_PAGE_SIZE {
                r.reject(
                    "limit",
                    format!("Page size must be between 1 and {}", MAX_PAGE_SIZE),
                );
            } else {
                filter.limit = limit;
            }
        }

        if r.errors.is_empty() {
            Ok(filter)
        } else {
            Err(r.errors)
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }

    /// Appends `AND ...` clauses. The builder must already be inside a WHERE.
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(v) = self.price_min {
            qb.push(" AND p.price >= ").push_bind(v);
        }
        if let Some(v) = self.price_max {
            qb.push(" AND p.price <= ").push_bind(v);
        }
        if let Some(v) = self.bedrooms_min {
            qb.push(" AND p.bedrooms >= ").push_bind(v);
        }
        if let Some(v) = self.bedrooms_max {
            qb.push(" AND p.bedrooms <= ").push_bind(v);
        }
        if let Some(v) = self.bathrooms_min {
            qb.push(" AND p.bathrooms >= ").push_bind(v);
        }
        if let Some(v) = self.bathrooms_max {
            qb.push(" AND p.bathrooms <= ").push_bind(v);
        }
        if let Some(v) = self.floors_min {
            qb.push(" AND p.floors >= ").push_bind(v);
        }
        if let Some(v) = self.floors_max {
            qb.push(" AND p.floors <= ").push_bind(v);
        }
        if let Some(v) = &self.land_size_min {
            qb.push(" AND p.land_size_sqm >= ").push_bind(v.clone());
        }
        if let Some(v) = &self.land_size_max {
            qb.push(" AND p.land_size_sqm <= ").push_bind(v.clone());
        }

        let substrings = [
            ("c.name", &self.city),
            ("r.name", &self.region),
            ("a.name", &self.area),
            ("u.username", &self.agent),
            ("p.title", &self.title),
            ("p.description", &self.description),
        ];
        for (column, value) in substrings {
            if let Some(text) = value {
                qb.push(" AND ")
                    .push(column)
                    .push(" ILIKE ")
                    .push_bind(like_pattern(text));
            }
        }

        if let Some(text) = &self.search {
            let pattern = like_pattern(text);
            qb.push(" AND (p.title ILIKE ").push_bind(pattern.clone());
            qb.push(" OR p.description ILIKE ").push_bind(pattern.clone());
            qb.push(" OR a.name ILIKE ").push_bind(pattern.clone());
            qb.push(" OR c.name ILIKE ").push_bind(pattern);
            qb.push(")");
        }

        if let Some(v) = self.listing_type {
            qb.push(" AND p.listing_type = ").push_bind(v);
        }
        if let Some(v) = self.water_type {
            qb.push(" AND p.water_type = ").push_bind(v);
        }
        if let Some(v) = self.electricity_type {
            qb.push(" AND p.electricity_type = ").push_bind(v);
        }
        if let Some(v) = self.vehicle_access {
            qb.push(" AND p.vehicle_access = ").push_bind(v);
        }
        if let Some(v) = &self.currency {
            qb.push(" AND p.currency = ").push_bind(v.clone());
        }
        if let Some(v) = self.property_type {
            qb.push(" AND p.property_type_id = ").push_bind(v);
        }
        if let Some(v) = self.status {
            qb.push(" AND p.status_id = ").push_bind(v);
        }

        for (column, value) in &self.flags {
            qb.push(" AND ").push(*column).push(" = ").push_bind(*value);
        }

        qb.push(" AND p.is_active = ")
            .push_bind(self.is_active.unwrap_or(true));

        if let Some(date) = self.created_after {
            qb.push(" AND p.created_at >= ").push_bind(start_of_day(date));
        }
        if let Some(date) = self.created_before {
            let next_day = date.checked_add_days(Days::new(1)).unwrap_or(date);
            qb.push(" AND p.created_at < ").push_bind(start_of_day(next_day));
        }
    }

    pub fn push_order_and_page(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let direction = if self.ordering.descending { "DESC" } else { "ASC" };
        qb.push(" ORDER BY ")
            .push(self.ordering.field.column())
            .push(" ")
            .push(direction)
            .push(", p.id");
        qb.push(" LIMIT ").push_bind(self.limit as i64);
        qb.push(" OFFSET ").push_bind(self.offset());
    }
}
