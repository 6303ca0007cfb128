//! Postgres-backed fixtures for store tests.
//!
//! Tests using these are `#[ignore]`d: run them with
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
#![allow(dead_code)]

use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{
    db::DBClient,
    propertydb::PropertyExt,
    userdb::{NewUser, UserExt},
};
use crate::{
    dtos::propertydtos::CreatePropertyDto,
    models::{
        agentmodel::AgentProfile,
        propertymodel::Property,
        usermodel::{User, UserRole},
    },
    service::seed::seed_reference_data,
};

pub const NEEDS_DATABASE: &str = "needs Postgres at TEST_DATABASE_URL";

/// Connects to the test database, applies migrations and reference data.
pub async fn setup_test_database() -> DBClient {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL must point at a disposable Postgres database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to the test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    seed_reference_data(&pool)
        .await
        .expect("failed to seed reference data");

    DBClient::new(pool)
}

pub struct Reference {
    pub area_id: Uuid,
    pub area_name: String,
    pub property_type_id: Uuid,
    pub status_id: Uuid,
}

pub async fn reference(db: &DBClient) -> Reference {
    let (area_id, area_name): (Uuid, String) =
        sqlx::query_as("SELECT id, name FROM areas ORDER BY name LIMIT 1")
            .fetch_one(&db.pool)
            .await
            .expect("seeded areas");
    let property_type_id: Uuid = sqlx::query_scalar("SELECT id FROM property_types ORDER BY name LIMIT 1")
        .fetch_one(&db.pool)
        .await
        .expect("seeded property types");
    let status_id: Uuid = sqlx::query_scalar("SELECT id FROM property_statuses ORDER BY name LIMIT 1")
        .fetch_one(&db.pool)
        .await
        .expect("seeded statuses");

    Reference {
        area_id,
        area_name,
        property_type_id,
        status_id,
    }
}

/// A fresh agent with a unique username, so searches can be scoped to it.
pub async fn create_test_agent(db: &DBClient) -> (User, AgentProfile) {
    let tag = Uuid::new_v4().simple().to_string();
    let user = db
        .save_user(NewUser {
            username: format!("agent_{}", &tag[..12]),
            email: format!("agent_{}@test.cm", &tag[..12]),
            password: "not-a-real-hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "Agent".to_string(),
            phone: None,
            role: UserRole::Agent,
        })
        .await
        .expect("failed to create user");

    let profile = sqlx::query_as::<_, AgentProfile>(
        "INSERT INTO agent_profiles (user_id, license_number) VALUES ($1, $2) RETURNING *",
    )
    .bind(user.id)
    .bind(format!("LIC-{}", &tag[..12]))
    .fetch_one(&db.pool)
    .await
    .expect("failed to create agent profile");

    (user, profile)
}

pub fn listing(reference: &Reference, title: &str, listing_type: &str, price: i64) -> CreatePropertyDto {
    let mut body = json!({
        "title": title,
        "description": "Test listing",
        "property_type_id": reference.property_type_id,
        "listing_type": listing_type,
        "status_id": reference.status_id,
        "area_id": reference.area_id,
        "price": price
    });
    if listing_type == "sale" {
        body["land_size_sqm"] = json!("500.00");
    }
    serde_json::from_value(body).expect("valid listing payload")
}

pub async fn create_test_listing(
    db: &DBClient,
    agent: &AgentProfile,
    reference: &Reference,
    listing_type: &str,
    price: i64,
) -> Property {
    let slug = format!("test-{}", Uuid::new_v4().simple());
    db.create_property(agent.id, slug, &listing(reference, "Test listing", listing_type, price))
        .await
        .expect("failed to create listing")
}

/// Inserts a non-primary image row directly, bypassing the file store.
pub async fn create_test_image(db: &DBClient, property: &Property, uploaded_by: Uuid) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO property_images (property_id, file_path, file_url, uploaded_by)
        VALUES ($1, '/tmp/test.jpg', '/media/test.jpg', $2)
        RETURNING id
        "#,
    )
    .bind(property.id)
    .bind(uploaded_by)
    .fetch_one(&db.pool)
    .await
    .expect("failed to create image")
}
