use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use crate::models::tariffmodel::{
    BillingCycle, SubscriptionStatus, TariffPlan, UserSubscription,
};

#[derive(Debug, Serialize)]
pub struct PlanDto {
    #[serde(flatten)]
    pub plan: TariffPlan,
    pub discount_percentage: i64,
    pub monthly_equivalent_price: BigDecimal,
}

impl From<TariffPlan> for PlanDto {
    fn from(plan: TariffPlan) -> Self {
        PlanDto {
            discount_percentage: plan.discount_percentage(),
            monthly_equivalent_price: plan.monthly_equivalent_price(),
            plan,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PlanQueryDto {
    pub category: Option<Uuid>,
    pub billing_cycle: Option<BillingCycle>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeDto {
    pub plan_id: Uuid,
    #[serde(default = "default_auto_renew")]
    pub auto_renew: bool,
}

fn default_auto_renew() -> bool {
    true
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelSubscriptionDto {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// Status and end date for a new subscription starting at `start`.
pub fn initial_terms(plan: &TariffPlan, start: DateTime<Utc>) -> (SubscriptionStatus, DateTime<Utc>) {
    let status = if plan.trial_days > 0 {
        SubscriptionStatus::Trial
    } else {
        SubscriptionStatus::Pending
    };
    (status, plan.billing_cycle.end_from(start))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionDto {
    #[serde(flatten)]
    pub subscription: UserSubscription,
    pub plan_name: String,
    pub is_active: bool,
    pub days_remaining: i64,
}

impl SubscriptionDto {
    pub fn at(subscription: UserSubscription, plan_name: String, now: DateTime<Utc>) -> Self {
        SubscriptionDto {
            is_active: subscription.is_active_at(now),
            days_remaining: subscription.days_remaining_at(now),
            plan_name,
            subscription,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tariffmodel::PlanType;

    fn plan(trial_days: i32, cycle: BillingCycle) -> TariffPlan {
        TariffPlan {
            id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            name: "Agent Basic".to_string(),
            slug: "agent-basic".to_string(),
            description: String::new(),
            plan_type: PlanType::Basic,
            price: BigDecimal::from(12000),
            original_price: Some(BigDecimal::from(15000)),
            billing_cycle: cycle,
            trial_days,
            max_properties: 5,
            max_photos_per_property: 10,
            max_videos_per_property: 1,
            max_featured_listings: 0,
            api_calls_limit: 0,
            has_priority_support: false,
            has_analytics: false,
            is_popular: true,
            is_active: true,
            display_order: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn trial_plans_start_in_trial() {
        let start = Utc::now();
        let (status, end) = initial_terms(&plan(14, BillingCycle::Quarterly), start);
        assert_eq!(status, SubscriptionStatus::Trial);
        assert_eq!(end, BillingCycle::Quarterly.end_from(start));

        let (status, _) = initial_terms(&plan(0, BillingCycle::Monthly), start);
        assert_eq!(status, SubscriptionStatus::Pending);
    }

    #[test]
    fn plan_dto_exposes_computed_prices() {
        let dto = PlanDto::from(plan(0, BillingCycle::Quarterly));
        assert_eq!(dto.discount_percentage, 20);
        assert_eq!(dto.monthly_equivalent_price, BigDecimal::from(4000));
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["slug"], "agent-basic");
    }
}
