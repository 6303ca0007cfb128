use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::admodel::{
    AdBanner, AdPlacement, AdStatus, Advertisement, BannerSize, PromotedProperty, PromotionType,
};

fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        let mut err = ValidationError::new("badge_color");
        err.message = Some("Badge color must look like #1A2B3C".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateAdvertisementDto {
    pub property_id: Option<Uuid>,
    pub package_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    /// Defaults to the package duration from `start_date`.
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AdQueryDto {
    pub placement: Option<AdPlacement>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAdDto {
    pub decision: ReviewDecision,
    #[validate(length(max = 1000))]
    pub rejection_reason: Option<String>,
}

impl ReviewAdDto {
    pub fn resulting_status(&self) -> AdStatus {
        match self.decision {
            ReviewDecision::Approve => AdStatus::Active,
            ReviewDecision::Reject => AdStatus::Rejected,
        }
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateBannerDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(url)]
    pub image_url: String,
    #[validate(url)]
    pub target_url: String,
    pub size: BannerSize,
    pub placement: AdPlacement,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub cost_per_impression: Option<BigDecimal>,
    pub cost_per_click: Option<BigDecimal>,
    pub max_budget: BigDecimal,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreatePromotionDto {
    pub property_id: Uuid,
    pub promotion_type: PromotionType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_priority")]
    #[validate(range(min = 1, max = 10, message = "Priority must be between 1 and 10"))]
    pub priority_score: i16,
    #[validate(length(max = 50))]
    pub badge_text: Option<String>,
    #[validate(custom = "validate_hex_color")]
    pub badge_color: Option<String>,
}

fn default_priority() -> i16 {
    1
}

/// End strictly after start, shared by ads, banners and promotions.
pub fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ValidationError> {
    if end <= start {
        let mut err = ValidationError::new("end_date");
        err.message = Some("End date must be after start date".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct AdvertisementDto {
    #[serde(flatten)]
    pub ad: Advertisement,
    pub is_active: bool,
    pub click_through_rate: f64,
    pub conversion_rate: f64,
}

impl AdvertisementDto {
    pub fn at(ad: Advertisement, now: DateTime<Utc>) -> Self {
        AdvertisementDto {
            is_active: ad.is_active_at(now),
            click_through_rate: ad.click_through_rate(),
            conversion_rate: ad.conversion_rate(),
            ad,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BannerDto {
    #[serde(flatten)]
    pub banner: AdBanner,
    pub is_live: bool,
    pub click_through_rate: f64,
}

impl BannerDto {
    pub fn at(banner: AdBanner, now: DateTime<Utc>) -> Self {
        BannerDto {
            is_live: banner.is_live_at(now),
            click_through_rate: banner.click_through_rate(),
            banner,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PromotionDto {
    #[serde(flatten)]
    pub promotion: PromotedProperty,
    pub is_live: bool,
}

impl PromotionDto {
    pub fn at(promotion: PromotedProperty, now: DateTime<Utc>) -> Self {
        PromotionDto {
            is_live: promotion.is_live_at(now),
            promotion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn window_must_move_forward() {
        let now = Utc::now();
        assert!(check_window(now, now + Duration::days(7)).is_ok());
        assert!(check_window(now, now).is_err());
        assert!(check_window(now, now - Duration::hours(1)).is_err());
    }

    #[test]
    fn promotion_priority_and_badge_color() {
        let now = Utc::now();
        let mut dto = CreatePromotionDto {
            property_id: Uuid::new_v4(),
            promotion_type: PromotionType::Spotlight,
            start_date: now,
            end_date: now + Duration::days(3),
            priority_score: 11,
            badge_text: Some("Hot".to_string()),
            badge_color: Some("red".to_string()),
        };
        let err = dto.validate().unwrap_err();
        assert!(err.field_errors().contains_key("priority_score"));
        assert!(err.field_errors().contains_key("badge_color"));

        dto.priority_score = 10;
        dto.badge_color = Some("#FF5733".to_string());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn review_decision_maps_to_status() {
        let approve: ReviewAdDto =
            serde_json::from_str(r#"{"decision":"approve"}"#).unwrap();
        assert_eq!(approve.resulting_status(), AdStatus::Active);
        let reject: ReviewAdDto =
            serde_json::from_str(r#"{"decision":"reject","rejection_reason":"Blurry photos"}"#).unwrap();
        assert_eq!(reject.resulting_status(), AdStatus::Rejected);
    }

    #[test]
    fn advertisement_dto_carries_computed_metrics() {
        let now = Utc::now();
        let ad = Advertisement {
            id: Uuid::new_v4(),
            property_id: None,
            advertiser_id: Uuid::new_v4(),
            package_id: Uuid::new_v4(),
            title: "Bonapriso flat".to_string(),
            description: String::new(),
            placement: AdPlacement::Sidebar,
            status: AdStatus::Active,
            payment_status: crate::models::admodel::AdPaymentStatus::Pending,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            total_cost: BigDecimal::from(2500),
            impressions: 400,
            clicks: 10,
            conversions: 1,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        let dto = AdvertisementDto::at(ad, now);
        assert!(!dto.is_active);
        assert_eq!(dto.click_through_rate, 2.5);
        assert_eq!(dto.conversion_rate, 10.0);

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["is_active"], false);
        assert_eq!(json["title"], "Bonapriso flat");
    }
}
