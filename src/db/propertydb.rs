use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::db::DBClient;

use crate::{
    dtos::propertydtos::{CreateFeatureDto, CreatePropertyDto, CreateViewingDto},
    models::propertymodel::{
        Property, PropertyFeature, PropertyRecord, PropertyStatus, PropertyType, PropertyViewing,
    },
    service::{property_filter::PropertyFilter, slug::SlugStore},
};

/// Calls `$m!` with the caller's arguments followed by every column a listing
/// owner may write. `CreatePropertyDto` and `Property` share these names.
macro_rules! with_listing_columns {
    ($m:ident!($($args:tt)*)) => {
        $m!($($args)*;
            title, description, property_type_id, listing_type, status_id, area_id,
            google_pin_location, distance_from_main_road, road_is_tarred, vehicle_access,
            bedrooms, living_rooms, bathrooms, kitchens, kitchen_type, balconies, floors,
            floor_number, room_size, has_dressing_cupboard,
            electricity_type, electricity_payment, water_type, has_ac_preinstalled,
            has_hot_water, has_generator,
            has_parking, has_security, has_pool, has_gym, has_elevator,
            price, currency,
            initial_months_payable, caution_months, visit_fee, requires_contract_registration,
            land_size_sqm, has_land_title, land_title_type, other_documentation,
            land_type, area_characteristics,
            warehouse_height, has_forklift, allows_truck_entry, has_inventory_manager,
            requires_goods_documentation,
            price_per_day, price_negotiable, has_refundable_caution,
            agent_commission_percentage, agent_commission_months
        )
    };
}

macro_rules! push_insert {
    ($qb:ident, $src:ident, $agent:ident, $slug:ident; $($col:ident),+ $(,)?) => {{
        $qb.push(concat!("INSERT INTO properties (agent_id, slug" $(, ", ", stringify!($col))+, ") VALUES ("));
        let mut values = $qb.separated(", ");
        values.push_bind($agent);
        values.push_bind($slug);
        $( values.push_bind($src.$col.clone()); )+
        $qb.push(") RETURNING *");
    }};
}

macro_rules! push_assignments {
    ($qb:ident, $src:ident; $($col:ident),+ $(,)?) => {{
        let mut sets = $qb.separated(", ");
        $( sets.push(concat!(stringify!($col), " = ")).push_bind_unseparated($src.$col.clone()); )+
        sets.push("updated_at = NOW()");
    }};
}

const RECORD_SELECT: &str = r#"
    SELECT
        p.*,
        pt.name AS property_type_name,
        ps.name AS status_name,
        a.name AS area_name,
        c.name AS city_name,
        r.name AS region_name,
        ap.user_id AS agent_user_id,
        u.username AS agent_username,
        ap.agency_name,
        (SELECT pi.file_url FROM property_images pi
            WHERE pi.property_id = p.id
            ORDER BY pi.is_primary DESC, pi.display_order, pi.created_at
            LIMIT 1) AS primary_image_url
    FROM properties p
"#;

const RECORD_JOINS: &str = r#"
    JOIN property_types pt ON pt.id = p.property_type_id
    JOIN property_statuses ps ON ps.id = p.status_id
    JOIN areas a ON a.id = p.area_id
    JOIN cities c ON c.id = a.city_id
    JOIN regions r ON r.id = c.region_id
    JOIN agent_profiles ap ON ap.id = p.agent_id
    JOIN users u ON u.id = ap.user_id
"#;

#[async_trait]
pub trait PropertyExt {
    async fn search_properties(
        &self,
        filter: &PropertyFilter,
    ) -> Result<(Vec<PropertyRecord>, i64), sqlx::Error>;

    async fn get_property_record(&self, slug: &str) -> Result<Option<PropertyRecord>, sqlx::Error>;

    async fn get_property(&self, property_id: Uuid) -> Result<Option<Property>, sqlx::Error>;

    async fn get_agent_properties(&self, agent_id: Uuid) -> Result<Vec<PropertyRecord>, sqlx::Error>;

    async fn get_features(&self, property_id: Uuid) -> Result<Vec<PropertyFeature>, sqlx::Error>;

    async fn create_property(
        &self,
        agent_id: Uuid,
        slug: String,
        property: &CreatePropertyDto,
    ) -> Result<Property, sqlx::Error>;

    async fn update_property(
        &self,
        property: &Property,
        features: Option<Vec<CreateFeatureDto>>,
    ) -> Result<Property, sqlx::Error>;

    async fn deactivate_property(&self, property_id: Uuid) -> Result<(), sqlx::Error>;

    async fn increment_views(&self, property_id: Uuid) -> Result<(), sqlx::Error>;

    async fn get_property_types(&self) -> Result<Vec<PropertyType>, sqlx::Error>;

    async fn get_property_statuses(&self) -> Result<Vec<PropertyStatus>, sqlx::Error>;

    async fn schedule_viewing(
        &self,
        property_id: Uuid,
        viewer_id: Uuid,
        viewing: CreateViewingDto,
    ) -> Result<PropertyViewing, sqlx::Error>;
}

async fn insert_features(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    property_id: Uuid,
    features: &[CreateFeatureDto],
) -> Result<(), sqlx::Error> {
    if features.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO property_features (property_id, feature_name, feature_value, is_highlighted) ",
    );
    qb.push_values(features, |mut row, feature| {
        row.push_bind(property_id)
            .push_bind(feature.feature_name.trim().to_string())
            .push_bind(feature.feature_value.trim().to_string())
            .push_bind(feature.is_highlighted);
    });
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

fn search_query(filter: &PropertyFilter) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(RECORD_SELECT);
    qb.push(RECORD_JOINS);
    qb.push(" WHERE TRUE");
    filter.push_conditions(&mut qb);
    filter.push_order_and_page(&mut qb);
    qb
}

fn count_query(filter: &PropertyFilter) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties p");
    qb.push(RECORD_JOINS);
    qb.push(" WHERE TRUE");
    filter.push_conditions(&mut qb);
    qb
}

#[async_trait]
impl SlugStore for DBClient {
    async fn slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM properties WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
    }
}

#[async_trait]
impl PropertyExt for DBClient {
    async fn search_properties(
        &self,
        filter: &PropertyFilter,
    ) -> Result<(Vec<PropertyRecord>, i64), sqlx::Error> {
        let mut list = search_query(filter);
        let mut count = count_query(filter);

        let (records, total) = futures::try_join!(
            list.build_query_as::<PropertyRecord>().fetch_all(&self.pool),
            count.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        Ok((records, total))
    }

    async fn get_property_record(&self, slug: &str) -> Result<Option<PropertyRecord>, sqlx::Error> {
        sqlx::query_as::<_, PropertyRecord>(&format!(
            "{} {} WHERE p.slug = $1 AND p.is_active",
            RECORD_SELECT, RECORD_JOINS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_property(&self, property_id: Uuid) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1 AND is_active")
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_agent_properties(&self, agent_id: Uuid) -> Result<Vec<PropertyRecord>, sqlx::Error> {
        sqlx::query_as::<_, PropertyRecord>(&format!(
            "{} {} WHERE p.agent_id = $1 AND p.is_active ORDER BY p.created_at DESC",
            RECORD_SELECT, RECORD_JOINS
        ))
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_features(&self, property_id: Uuid) -> Result<Vec<PropertyFeature>, sqlx::Error> {
        sqlx::query_as::<_, PropertyFeature>(
            r#"
            SELECT * FROM property_features
            WHERE property_id = $1
            ORDER BY is_highlighted DESC, feature_name
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_property(
        &self,
        agent_id: Uuid,
        slug: String,
        property: &CreatePropertyDto,
    ) -> Result<Property, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Postgres>::new("");
        with_listing_columns!(push_insert!(qb, property, agent_id, slug));

        let created = qb
            .build_query_as::<Property>()
            .fetch_one(&mut *tx)
            .await?;

        insert_features(&mut tx, created.id, &property.features).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_property(
        &self,
        property: &Property,
        features: Option<Vec<CreateFeatureDto>>,
    ) -> Result<Property, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE properties SET ");
        with_listing_columns!(push_assignments!(qb, property));
        qb.push(" WHERE id = ").push_bind(property.id);
        qb.push(" RETURNING *");

        let updated = qb
            .build_query_as::<Property>()
            .fetch_one(&mut *tx)
            .await?;

        if let Some(features) = features {
            sqlx::query("DELETE FROM property_features WHERE property_id = $1")
                .bind(property.id)
                .execute(&mut *tx)
                .await?;
            insert_features(&mut tx, property.id, &features).await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    async fn deactivate_property(&self, property_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE properties SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_views(&self, property_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE properties SET views_count = views_count + 1 WHERE id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_property_types(&self) -> Result<Vec<PropertyType>, sqlx::Error> {
        sqlx::query_as::<_, PropertyType>(
            "SELECT * FROM property_types WHERE is_active ORDER BY category, name",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_property_statuses(&self) -> Result<Vec<PropertyStatus>, sqlx::Error> {
        sqlx::query_as::<_, PropertyStatus>(
            "SELECT * FROM property_statuses WHERE is_active ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn schedule_viewing(
        &self,
        property_id: Uuid,
        viewer_id: Uuid,
        viewing: CreateViewingDto,
    ) -> Result<PropertyViewing, sqlx::Error> {
        sqlx::query_as::<_, PropertyViewing>(
            r#"
            INSERT INTO property_viewings (property_id, viewer_id, scheduled_date, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(property_id)
        .bind(viewer_id)
        .bind(viewing.scheduled_date)
        .bind(viewing.notes)
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn filter(query: &str) -> PropertyFilter {
        let params: HashMap<String, String> = serde_urlencoded::from_str(query).unwrap();
        PropertyFilter::from_params(&params).unwrap()
    }

    #[test]
    fn search_joins_every_alias_the_filter_uses() {
        let f = filter("city=douala&region=littoral&area=akwa&agent=ngono");
        let sql = search_query(&f).sql().to_string();

        for join in [
            "JOIN areas a ON",
            "JOIN cities c ON",
            "JOIN regions r ON",
            "JOIN users u ON",
        ] {
            assert!(sql.contains(join), "missing {}", join);
        }
        assert!(sql.contains("LIMIT"));
    }

    #[test]
    fn count_has_the_same_predicate_without_paging() {
        let f = filter("price_min=100000&price_max=200000&page=2");
        let count = count_query(&f).sql().to_string();
        let list = search_query(&f).sql().to_string();

        assert!(count.starts_with("SELECT COUNT(*) FROM properties p"));
        assert!(count.contains("p.price >= $1 AND p.price <= $2"));
        assert!(list.contains("p.price >= $1 AND p.price <= $2"));
        assert!(!count.contains("LIMIT"));
    }

    #[test]
    fn insert_and_update_cover_the_same_columns() {
        macro_rules! names {
            (; $($col:ident),+ $(,)?) => {
                vec![$(stringify!($col)),+]
            };
        }
        let columns: Vec<&str> = with_listing_columns!(names!());
        assert!(columns.contains(&"land_size_sqm"));
        assert!(columns.contains(&"price_per_day"));
        assert!(!columns.contains(&"slug"));
        assert!(!columns.contains(&"views_count"));
    }

    mod store {
        use super::*;
        use crate::db::fixtures::{
            create_test_agent, create_test_listing, reference, setup_test_database,
        };
        use crate::models::propertymodel::ListingType;
        use sqlx::types::BigDecimal;

        #[tokio::test]
        #[ignore = "needs Postgres at TEST_DATABASE_URL"]
        async fn price_range_returns_only_listings_inside_it() {
            let db = setup_test_database().await;
            let refs = reference(&db).await;
            let (user, agent) = create_test_agent(&db).await;

            let inside = create_test_listing(&db, &agent, &refs, "rent", 100_000).await;
            create_test_listing(&db, &agent, &refs, "rent", 250_000).await;

            let (records, count) = db
                .search_properties(&filter(&format!(
                    "price_min=100000&price_max=200000&agent={}",
                    user.username
                )))
                .await
                .unwrap();

            assert_eq!(count, 1);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].property.id, inside.id);
        }

        #[tokio::test]
        #[ignore = "needs Postgres at TEST_DATABASE_URL"]
        async fn sale_listing_keeps_its_land_size() {
            let db = setup_test_database().await;
            let refs = reference(&db).await;
            let (_, agent) = create_test_agent(&db).await;

            let created = create_test_listing(&db, &agent, &refs, "sale", 30_000_000).await;
            let stored = db.get_property(created.id).await.unwrap().unwrap();

            assert_eq!(stored.listing_type, ListingType::Sale);
            assert_eq!(stored.land_size_sqm, Some(BigDecimal::from(500)));
            assert_eq!(stored.slug, created.slug);
        }

        #[tokio::test]
        #[ignore = "needs Postgres at TEST_DATABASE_URL"]
        async fn deactivated_listing_leaves_default_search() {
            let db = setup_test_database().await;
            let refs = reference(&db).await;
            let (user, agent) = create_test_agent(&db).await;

            let listing = create_test_listing(&db, &agent, &refs, "rent", 120_000).await;
            db.deactivate_property(listing.id).await.unwrap();

            let (_, count) = db
                .search_properties(&filter(&format!("agent={}", user.username)))
                .await
                .unwrap();
            assert_eq!(count, 0);
            assert!(db.get_property(listing.id).await.unwrap().is_none());
        }
    }
}
