use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;

use crate::models::locationmodel::{AreaLocation, City, Country, PopularLocation, Region};

#[async_trait]
pub trait LocationExt {
    async fn get_countries(&self) -> Result<Vec<Country>, sqlx::Error>;

    async fn get_regions(&self, country_id: Option<Uuid>) -> Result<Vec<Region>, sqlx::Error>;

    async fn get_cities(&self, region_id: Option<Uuid>) -> Result<Vec<City>, sqlx::Error>;

    async fn get_areas(&self, city_id: Option<Uuid>) -> Result<Vec<AreaLocation>, sqlx::Error>;

    async fn get_area(&self, area_id: Uuid) -> Result<Option<AreaLocation>, sqlx::Error>;

    async fn get_popular_locations(&self, limit: i64) -> Result<Vec<PopularLocation>, sqlx::Error>;

    async fn record_area_view(&self, area_id: Uuid) -> Result<(), sqlx::Error>;
}

const AREA_SELECT: &str = r#"
    SELECT a.*, c.name AS city_name, r.name AS region_name, co.name AS country_name
    FROM areas a
    JOIN cities c ON c.id = a.city_id
    JOIN regions r ON r.id = c.region_id
    JOIN countries co ON co.id = r.country_id
"#;

#[async_trait]
impl LocationExt for DBClient {
    async fn get_countries(&self) -> Result<Vec<Country>, sqlx::Error> {
        sqlx::query_as::<_, Country>("SELECT * FROM countries WHERE is_active ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_regions(&self, country_id: Option<Uuid>) -> Result<Vec<Region>, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            r#"
            SELECT * FROM regions
            WHERE is_active AND ($1::uuid IS NULL OR country_id = $1)
            ORDER BY name
            "#,
        )
        .bind(country_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_cities(&self, region_id: Option<Uuid>) -> Result<Vec<City>, sqlx::Error> {
        sqlx::query_as::<_, City>(
            r#"
            SELECT * FROM cities
            WHERE is_active AND ($1::uuid IS NULL OR region_id = $1)
            ORDER BY is_major_city DESC, name
            "#,
        )
        .bind(region_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_areas(&self, city_id: Option<Uuid>) -> Result<Vec<AreaLocation>, sqlx::Error> {
        sqlx::query_as::<_, AreaLocation>(&format!(
            "{} WHERE a.is_active AND ($1::uuid IS NULL OR a.city_id = $1) ORDER BY c.name, a.name",
            AREA_SELECT
        ))
        .bind(city_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_area(&self, area_id: Uuid) -> Result<Option<AreaLocation>, sqlx::Error> {
        sqlx::query_as::<_, AreaLocation>(&format!("{} WHERE a.id = $1", AREA_SELECT))
            .bind(area_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_popular_locations(&self, limit: i64) -> Result<Vec<PopularLocation>, sqlx::Error> {
        sqlx::query_as::<_, PopularLocation>(
            r#"
            SELECT
                pl.id, pl.area_id, a.name AS area_name, c.name AS city_name,
                (SELECT COUNT(*) FROM properties p WHERE p.area_id = pl.area_id AND p.is_active) AS property_count,
                pl.search_count, pl.view_count, pl.is_trending, pl.updated_at
            FROM popular_locations pl
            JOIN areas a ON a.id = pl.area_id
            JOIN cities c ON c.id = a.city_id
            ORDER BY property_count DESC, pl.search_count DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn record_area_view(&self, area_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO popular_locations (area_id, view_count) VALUES ($1, 1)
            ON CONFLICT (area_id) DO UPDATE
            SET view_count = popular_locations.view_count + 1, updated_at = NOW()
            "#,
        )
        .bind(area_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
