use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::BigDecimal, FromRow};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "experience_band")]
pub enum ExperienceBand {
    #[sqlx(rename = "0-1")]
    #[serde(rename = "0-1")]
    UnderOne,
    #[sqlx(rename = "1-3")]
    #[serde(rename = "1-3")]
    OneToThree,
    #[sqlx(rename = "3-5")]
    #[serde(rename = "3-5")]
    ThreeToFive,
    #[sqlx(rename = "5-10")]
    #[serde(rename = "5-10")]
    FiveToTen,
    #[sqlx(rename = "10+")]
    #[serde(rename = "10+")]
    OverTen,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "agent_specialization", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Residential,
    Commercial,
    Luxury,
    Rental,
    Investment,
    Land,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AgentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub license_number: String,
    pub license_expiry: Option<NaiveDate>,
    pub agency_name: Option<String>,
    pub agency_address: Option<String>,
    pub years_experience: ExperienceBand,
    pub specialization: Specialization,
    pub office_phone: Option<String>,
    pub website: Option<String>,
    pub facebook_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub bio: Option<String>,
    pub languages_spoken: String,
    pub is_verified: bool,
    pub is_featured: bool,
    pub is_active: bool,
    pub total_sales: i32,
    pub total_rentals: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile plus owner names and review aggregates, computed per query.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AgentSummary {
    #[sqlx(flatten)]
    pub profile: AgentProfile,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub client_rating: Option<BigDecimal>,
    pub total_reviews: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AgentCertification {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub name: String,
    pub issuing_organization: String,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub certificate_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AgentReview {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewer_username: String,
    pub rating: i16,
    pub comment: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}
