use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::db::DBClient;

use crate::{
    dtos::tariffdtos::PlanQueryDto,
    models::tariffmodel::{
        SubscriptionStatus, SubscriptionUsage, TariffCategory, TariffPlan, UsageKind,
        UserSubscription,
    },
};

#[derive(Debug, FromRow)]
pub struct SubscriptionRow {
    #[sqlx(flatten)]
    pub subscription: UserSubscription,
    pub plan_name: String,
}

#[async_trait]
pub trait TariffExt {
    async fn get_tariff_categories(&self) -> Result<Vec<TariffCategory>, sqlx::Error>;

    async fn get_plans(&self, query: &PlanQueryDto) -> Result<Vec<TariffPlan>, sqlx::Error>;

    async fn get_plan(
        &self,
        plan_id: Option<Uuid>,
        slug: Option<&str>,
    ) -> Result<Option<TariffPlan>, sqlx::Error>;

    async fn create_subscription(
        &self,
        user_id: Uuid,
        plan: &TariffPlan,
        status: SubscriptionStatus,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        auto_renew: bool,
    ) -> Result<UserSubscription, sqlx::Error>;

    async fn get_user_subscriptions(&self, user_id: Uuid) -> Result<Vec<SubscriptionRow>, sqlx::Error>;

    async fn get_subscription(&self, subscription_id: Uuid) -> Result<Option<SubscriptionRow>, sqlx::Error>;

    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        reason: Option<String>,
    ) -> Result<UserSubscription, sqlx::Error>;

    async fn get_subscription_usage(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionUsage>, sqlx::Error>;

    async fn record_usage(
        &self,
        user_id: Uuid,
        kind: UsageKind,
        quantity: i32,
        description: &str,
    ) -> Result<Option<Uuid>, sqlx::Error>;
}

const SUBSCRIPTION_SELECT: &str = r#"
    SELECT s.*, tp.name AS plan_name
    FROM user_subscriptions s
    JOIN tariff_plans tp ON tp.id = s.plan_id
"#;

#[async_trait]
impl TariffExt for DBClient {
    async fn get_tariff_categories(&self) -> Result<Vec<TariffCategory>, sqlx::Error> {
        sqlx::query_as::<_, TariffCategory>(
            "SELECT * FROM tariff_categories WHERE is_active ORDER BY display_order, name",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_plans(&self, query: &PlanQueryDto) -> Result<Vec<TariffPlan>, sqlx::Error> {
        sqlx::query_as::<_, TariffPlan>(
            r#"
            SELECT * FROM tariff_plans
            WHERE is_active
              AND ($1::uuid IS NULL OR category_id = $1)
              AND ($2::billing_cycle IS NULL OR billing_cycle = $2)
            ORDER BY display_order, price
            "#,
        )
        .bind(query.category)
        .bind(query.billing_cycle)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_plan(
        &self,
        plan_id: Option<Uuid>,
        slug: Option<&str>,
    ) -> Result<Option<TariffPlan>, sqlx::Error> {
        let mut plan: Option<TariffPlan> = None;

        if let Some(plan_id) = plan_id {
            plan = sqlx::query_as::<_, TariffPlan>(
                "SELECT * FROM tariff_plans WHERE id = $1 AND is_active",
            )
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(slug) = slug {
            plan = sqlx::query_as::<_, TariffPlan>(
                "SELECT * FROM tariff_plans WHERE slug = $1 AND is_active",
            )
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(plan)
    }

    async fn create_subscription(
        &self,
        user_id: Uuid,
        plan: &TariffPlan,
        status: SubscriptionStatus,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        auto_renew: bool,
    ) -> Result<UserSubscription, sqlx::Error> {
        sqlx::query_as::<_, UserSubscription>(
            r#"
            INSERT INTO user_subscriptions (user_id, plan_id, status, start_date, end_date, auto_renew)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(plan.id)
        .bind(status)
        .bind(start_date)
        .bind(end_date)
        .bind(auto_renew)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_subscriptions(&self, user_id: Uuid) -> Result<Vec<SubscriptionRow>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{} WHERE s.user_id = $1 ORDER BY s.created_at DESC",
            SUBSCRIPTION_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_subscription(&self, subscription_id: Uuid) -> Result<Option<SubscriptionRow>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRow>(&format!("{} WHERE s.id = $1", SUBSCRIPTION_SELECT))
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        reason: Option<String>,
    ) -> Result<UserSubscription, sqlx::Error> {
        sqlx::query_as::<_, UserSubscription>(
            r#"
            UPDATE user_subscriptions SET
                status = 'cancelled',
                cancelled_at = NOW(),
                cancellation_reason = $2,
                auto_renew = FALSE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(subscription_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_subscription_usage(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionUsage>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionUsage>(
            "SELECT * FROM subscription_usage WHERE subscription_id = $1 ORDER BY created_at DESC",
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn record_usage(
        &self,
        user_id: Uuid,
        kind: UsageKind,
        quantity: i32,
        description: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let subscription_id: Option<Uuid> = sqlx::query_scalar(&format!(
            r#"
            UPDATE user_subscriptions SET {col} = {col} + $2, updated_at = NOW()
            WHERE id = (
                SELECT id FROM user_subscriptions
                WHERE user_id = $1 AND status IN ('active', 'trial') AND end_date > NOW()
                ORDER BY end_date DESC
                LIMIT 1
            )
            RETURNING id
            "#,
            col = kind.counter_column()
        ))
        .bind(user_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(subscription_id) = subscription_id else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO subscription_usage (subscription_id, usage_type, quantity, description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(subscription_id)
        .bind(kind)
        .bind(quantity)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(subscription_id))
    }
}
