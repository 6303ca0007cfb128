use chrono::{DateTime, Months, Utc};
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use sqlx::{types::BigDecimal, FromRow};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "plan_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Free,
    Basic,
    Professional,
    Premium,
    Enterprise,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "billing_cycle", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
    Lifetime,
}

impl BillingCycle {
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::SemiAnnual => 6,
            BillingCycle::Annual => 12,
            BillingCycle::Lifetime => 120,
        }
    }

    pub fn end_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start
            .checked_add_months(Months::new(self.months()))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Expired,
    Cancelled,
    Suspended,
    Pending,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "usage_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    Property,
    Photo,
    Video,
    ApiCall,
}

impl UsageKind {
    pub fn counter_column(&self) -> &'static str {
        match self {
            UsageKind::Property => "properties_used",
            UsageKind::Photo => "photos_used",
            UsageKind::Video => "videos_used",
            UsageKind::ApiCall => "api_calls_used",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct TariffCategory {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub display_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct TariffPlan {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub plan_type: PlanType,
    pub price: BigDecimal,
    pub original_price: Option<BigDecimal>,
    pub billing_cycle: BillingCycle,
    pub trial_days: i32,
    pub max_properties: i32,
    pub max_photos_per_property: i32,
    pub max_videos_per_property: i32,
    pub max_featured_listings: i32,
    pub api_calls_limit: i32,
    pub has_priority_support: bool,
    pub has_analytics: bool,
    pub is_popular: bool,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

impl TariffPlan {
    pub fn discount_percentage(&self) -> i64 {
        match &self.original_price {
            Some(original) if original > &self.price && !original.is_zero() => {
                let discount = (original - &self.price) / original * BigDecimal::from(100);
                discount.round(0).to_i64().unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn monthly_equivalent_price(&self) -> BigDecimal {
        (&self.price / BigDecimal::from(self.billing_cycle.months())).round(2)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub auto_renew: bool,
    pub properties_used: i32,
    pub photos_used: i32,
    pub videos_used: i32,
    pub api_calls_used: i32,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSubscription {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        ) && self.end_date > now
    }

    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_active_at(now) {
            return 0;
        }
        (self.end_date - now).num_days().max(0)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct SubscriptionUsage {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub usage_type: UsageKind,
    pub quantity: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn plan(price: i64, original: Option<i64>, cycle: BillingCycle) -> TariffPlan {
        TariffPlan {
            id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            name: "Pro".to_string(),
            slug: "pro".to_string(),
            description: String::new(),
            plan_type: PlanType::Professional,
            price: BigDecimal::from(price),
            original_price: original.map(BigDecimal::from),
            billing_cycle: cycle,
            trial_days: 0,
            max_properties: 10,
            max_photos_per_property: 20,
            max_videos_per_property: 2,
            max_featured_listings: 1,
            api_calls_limit: 0,
            has_priority_support: false,
            has_analytics: true,
            is_popular: false,
            is_active: true,
            display_order: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn discount_is_relative_to_original_price() {
        assert_eq!(plan(7500, Some(10000), BillingCycle::Monthly).discount_percentage(), 25);
        assert_eq!(plan(7500, None, BillingCycle::Monthly).discount_percentage(), 0);
        assert_eq!(plan(7500, Some(5000), BillingCycle::Monthly).discount_percentage(), 0);
    }

    #[test]
    fn monthly_equivalent_divides_by_cycle_length() {
        assert_eq!(
            plan(30000, None, BillingCycle::Quarterly).monthly_equivalent_price(),
            BigDecimal::from(10000)
        );
    }

    #[test]
    fn cycle_end_dates() {
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            BillingCycle::Monthly.end_from(start),
            Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap()
        );
        assert_eq!(
            BillingCycle::Annual.end_from(start),
            Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn subscription_activity_and_days_remaining() {
        let now = Utc::now();
        let mut sub = UserSubscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status: SubscriptionStatus::Trial,
            start_date: now - Duration::days(2),
            end_date: now + Duration::days(5) + Duration::hours(1),
            auto_renew: true,
            properties_used: 0,
            photos_used: 0,
            videos_used: 0,
            api_calls_used: 0,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };
        assert!(sub.is_active_at(now));
        assert_eq!(sub.days_remaining_at(now), 5);

        sub.status = SubscriptionStatus::Cancelled;
        assert!(!sub.is_active_at(now));
        assert_eq!(sub.days_remaining_at(now), 0);

        sub.status = SubscriptionStatus::Active;
        sub.end_date = now;
        assert!(!sub.is_active_at(now));
    }
}
