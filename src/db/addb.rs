use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use super::db::DBClient;

use crate::{
    dtos::addtos::{CreateBannerDto, CreatePromotionDto},
    models::admodel::{
        AdBanner, AdPackage, AdPlacement, AdStatus, Advertisement, PromotedProperty,
    },
};

/// Who saw or clicked an ad. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct AdVisitor {
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub struct NewAdvertisement {
    pub property_id: Option<Uuid>,
    pub advertiser_id: Uuid,
    pub package: AdPackage,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdEvent {
    Impression,
    Click,
    Conversion,
}

impl AdEvent {
    fn counter_column(&self) -> &'static str {
        match self {
            AdEvent::Impression => "impressions",
            AdEvent::Click => "clicks",
            AdEvent::Conversion => "conversions",
        }
    }

    fn log_table(&self) -> Option<&'static str> {
        match self {
            AdEvent::Impression => Some("ad_impressions"),
            AdEvent::Click => Some("ad_clicks"),
            AdEvent::Conversion => None,
        }
    }
}

#[async_trait]
pub trait AdExt {
    async fn get_ad_packages(&self) -> Result<Vec<AdPackage>, sqlx::Error>;

    async fn get_ad_package(&self, package_id: Uuid) -> Result<Option<AdPackage>, sqlx::Error>;

    async fn create_advertisement(&self, ad: NewAdvertisement) -> Result<Advertisement, sqlx::Error>;

    async fn get_advertisement(&self, ad_id: Uuid) -> Result<Option<Advertisement>, sqlx::Error>;

    async fn get_user_advertisements(&self, advertiser_id: Uuid) -> Result<Vec<Advertisement>, sqlx::Error>;

    async fn get_running_advertisements(
        &self,
        placement: Option<AdPlacement>,
    ) -> Result<Vec<Advertisement>, sqlx::Error>;

    async fn record_ad_event(
        &self,
        ad_id: Uuid,
        event: AdEvent,
        visitor: AdVisitor,
    ) -> Result<bool, sqlx::Error>;

    async fn review_advertisement(
        &self,
        ad_id: Uuid,
        reviewer_id: Uuid,
        status: AdStatus,
        rejection_reason: Option<String>,
    ) -> Result<Option<Advertisement>, sqlx::Error>;

    async fn get_live_banners(
        &self,
        placement: Option<AdPlacement>,
    ) -> Result<Vec<AdBanner>, sqlx::Error>;

    async fn create_banner(
        &self,
        created_by: Uuid,
        banner: CreateBannerDto,
    ) -> Result<AdBanner, sqlx::Error>;

    async fn get_live_promotions(&self) -> Result<Vec<PromotedProperty>, sqlx::Error>;

    async fn create_promotion(
        &self,
        created_by: Uuid,
        promotion: CreatePromotionDto,
    ) -> Result<PromotedProperty, sqlx::Error>;
}

#[async_trait]
impl AdExt for DBClient {
    async fn get_ad_packages(&self) -> Result<Vec<AdPackage>, sqlx::Error> {
        sqlx::query_as::<_, AdPackage>(
            "SELECT * FROM ad_packages WHERE is_active ORDER BY placement, price",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_ad_package(&self, package_id: Uuid) -> Result<Option<AdPackage>, sqlx::Error> {
        sqlx::query_as::<_, AdPackage>("SELECT * FROM ad_packages WHERE id = $1 AND is_active")
            .bind(package_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_advertisement(&self, ad: NewAdvertisement) -> Result<Advertisement, sqlx::Error> {
        sqlx::query_as::<_, Advertisement>(
            r#"
            INSERT INTO advertisements (
                property_id, advertiser_id, package_id, title, description, placement,
                status, start_date, end_date, total_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(ad.property_id)
        .bind(ad.advertiser_id)
        .bind(ad.package.id)
        .bind(ad.title)
        .bind(ad.description)
        .bind(ad.package.placement)
        .bind(AdStatus::Pending)
        .bind(ad.start_date)
        .bind(ad.end_date)
        .bind(ad.package.price)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_advertisement(&self, ad_id: Uuid) -> Result<Option<Advertisement>, sqlx::Error> {
        sqlx::query_as::<_, Advertisement>("SELECT * FROM advertisements WHERE id = $1")
            .bind(ad_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_advertisements(&self, advertiser_id: Uuid) -> Result<Vec<Advertisement>, sqlx::Error> {
        sqlx::query_as::<_, Advertisement>(
            "SELECT * FROM advertisements WHERE advertiser_id = $1 ORDER BY created_at DESC",
        )
        .bind(advertiser_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_running_advertisements(
        &self,
        placement: Option<AdPlacement>,
    ) -> Result<Vec<Advertisement>, sqlx::Error> {
        sqlx::query_as::<_, Advertisement>(
            r#"
            SELECT * FROM advertisements
            WHERE status = 'active' AND payment_status = 'paid'
              AND start_date <= NOW() AND end_date >= NOW()
              AND ($1::ad_placement IS NULL OR placement = $1)
            ORDER BY start_date DESC
            "#,
        )
        .bind(placement)
        .fetch_all(&self.pool)
        .await
    }

    async fn record_ad_event(
        &self,
        ad_id: Uuid,
        event: AdEvent,
        visitor: AdVisitor,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(&format!(
            "UPDATE advertisements SET {col} = {col} + 1 WHERE id = $1",
            col = event.counter_column()
        ))
        .bind(ad_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(table) = event.log_table() {
            sqlx::query(&format!(
                "INSERT INTO {} (ad_id, user_id, ip_address, user_agent) VALUES ($1, $2, $3, $4)",
                table
            ))
            .bind(ad_id)
            .bind(visitor.user_id)
            .bind(visitor.ip_address)
            .bind(visitor.user_agent)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(true)
    }

    async fn review_advertisement(
        &self,
        ad_id: Uuid,
        reviewer_id: Uuid,
        status: AdStatus,
        rejection_reason: Option<String>,
    ) -> Result<Option<Advertisement>, sqlx::Error> {
        sqlx::query_as::<_, Advertisement>(
            r#"
            UPDATE advertisements SET
                status = $3,
                approved_by = CASE WHEN $3 = 'active'::ad_status THEN $2 ELSE approved_by END,
                approved_at = CASE WHEN $3 = 'active'::ad_status THEN NOW() ELSE approved_at END,
                rejection_reason = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ad_id)
        .bind(reviewer_id)
        .bind(status)
        .bind(rejection_reason)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_live_banners(
        &self,
        placement: Option<AdPlacement>,
    ) -> Result<Vec<AdBanner>, sqlx::Error> {
        sqlx::query_as::<_, AdBanner>(
            r#"
            SELECT * FROM ad_banners
            WHERE is_active AND start_date <= NOW() AND end_date >= NOW()
              AND spent_budget < max_budget
              AND ($1::ad_placement IS NULL OR placement = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(placement)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_banner(
        &self,
        created_by: Uuid,
        banner: CreateBannerDto,
    ) -> Result<AdBanner, sqlx::Error> {
        sqlx::query_as::<_, AdBanner>(
            r#"
            INSERT INTO ad_banners (
                title, image_url, target_url, size, placement, start_date, end_date,
                cost_per_impression, cost_per_click, max_budget, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(banner.title)
        .bind(banner.image_url)
        .bind(banner.target_url)
        .bind(banner.size)
        .bind(banner.placement)
        .bind(banner.start_date)
        .bind(banner.end_date)
        .bind(banner.cost_per_impression.unwrap_or_else(|| BigDecimal::from(0)))
        .bind(banner.cost_per_click.unwrap_or_else(|| BigDecimal::from(0)))
        .bind(banner.max_budget)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_live_promotions(&self) -> Result<Vec<PromotedProperty>, sqlx::Error> {
        sqlx::query_as::<_, PromotedProperty>(
            r#"
            SELECT pp.* FROM promoted_properties pp
            JOIN properties p ON p.id = pp.property_id
            WHERE pp.is_active AND p.is_active
              AND pp.start_date <= NOW() AND pp.end_date >= NOW()
            ORDER BY pp.priority_score DESC, pp.start_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn create_promotion(
        &self,
        created_by: Uuid,
        promotion: CreatePromotionDto,
    ) -> Result<PromotedProperty, sqlx::Error> {
        sqlx::query_as::<_, PromotedProperty>(
            r#"
            INSERT INTO promoted_properties (
                property_id, promotion_type, start_date, end_date, priority_score,
                badge_text, badge_color, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(promotion.property_id)
        .bind(promotion.promotion_type)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .bind(promotion.priority_score)
        .bind(promotion.badge_text)
        .bind(promotion.badge_color)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_only_bump_the_counter() {
        assert_eq!(AdEvent::Impression.log_table(), Some("ad_impressions"));
        assert_eq!(AdEvent::Click.log_table(), Some("ad_clicks"));
        assert_eq!(AdEvent::Conversion.log_table(), None);
        assert_eq!(AdEvent::Conversion.counter_column(), "conversions");
    }
}
