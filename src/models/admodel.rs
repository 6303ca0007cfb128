use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::BigDecimal, FromRow};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ad_placement", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdPlacement {
    Homepage,
    SearchResults,
    PropertyDetail,
    Sidebar,
    Footer,
    Newsletter,
    SocialMedia,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ad_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    Draft,
    Pending,
    Active,
    Paused,
    Expired,
    Rejected,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ad_payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdPaymentStatus {
    Pending,
    Paid,
    Partial,
    Refunded,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "banner_size", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BannerSize {
    Leaderboard,
    Rectangle,
    Skyscraper,
    MobileBanner,
    Billboard,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "promotion_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PromotionType {
    Featured,
    Premium,
    Spotlight,
    Urgent,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AdPackage {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub placement: AdPlacement,
    pub duration_days: i32,
    pub price: BigDecimal,
    pub max_impressions: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Advertisement {
    pub id: Uuid,
    pub property_id: Option<Uuid>,
    pub advertiser_id: Uuid,
    pub package_id: Uuid,
    pub title: String,
    pub description: String,
    pub placement: AdPlacement,
    pub status: AdStatus,
    pub payment_status: AdPaymentStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_cost: BigDecimal,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Percentage with two decimals, zero when nothing was counted.
pub fn ratio_percent(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    let pct = numerator as f64 / denominator as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

impl Advertisement {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == AdStatus::Active
            && self.payment_status == AdPaymentStatus::Paid
            && self.start_date <= now
            && now <= self.end_date
    }

    pub fn click_through_rate(&self) -> f64 {
        ratio_percent(self.clicks, self.impressions)
    }

    pub fn conversion_rate(&self) -> f64 {
        ratio_percent(self.conversions, self.clicks)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AdBanner {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub target_url: String,
    pub size: BannerSize,
    pub placement: AdPlacement,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub cost_per_impression: BigDecimal,
    pub cost_per_click: BigDecimal,
    pub max_budget: BigDecimal,
    pub spent_budget: BigDecimal,
    pub impressions: i64,
    pub clicks: i64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AdBanner {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_date <= now
            && now <= self.end_date
            && self.spent_budget < self.max_budget
    }

    pub fn click_through_rate(&self) -> f64 {
        ratio_percent(self.clicks, self.impressions)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PromotedProperty {
    pub id: Uuid,
    pub property_id: Uuid,
    pub promotion_type: PromotionType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub priority_score: i16,
    pub badge_text: Option<String>,
    pub badge_color: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PromotedProperty {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }
}
