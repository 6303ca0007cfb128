use chrono::{DateTime, NaiveDate, Utc};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::agentmodel::{AgentCertification, AgentReview, AgentSummary, ExperienceBand, Specialization},
    utils::text::validate_phone,
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAgentDto {
    #[validate(length(min = 1, max = 50, message = "License number is required"))]
    pub license_number: String,
    pub license_expiry: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub agency_name: Option<String>,
    pub agency_address: Option<String>,
    pub years_experience: Option<ExperienceBand>,
    pub specialization: Option<Specialization>,
    #[validate(custom = "validate_phone")]
    pub office_phone: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    #[validate(url)]
    pub facebook_url: Option<String>,
    #[validate(url)]
    pub linkedin_url: Option<String>,
    pub bio: Option<String>,
    #[validate(length(max = 200))]
    pub languages_spoken: Option<String>,
    #[serde(default)]
    pub service_area_ids: Vec<Uuid>,
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAgentDto {
    pub license_expiry: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub agency_name: Option<String>,
    pub agency_address: Option<String>,
    pub years_experience: Option<ExperienceBand>,
    pub specialization: Option<Specialization>,
    #[validate(custom = "validate_phone")]
    pub office_phone: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    #[validate(url)]
    pub facebook_url: Option<String>,
    #[validate(url)]
    pub linkedin_url: Option<String>,
    pub bio: Option<String>,
    #[validate(length(max = 200))]
    pub languages_spoken: Option<String>,
    pub service_area_ids: Option<Vec<Uuid>>,
}

#[derive(Validate, Debug, Default, Deserialize)]
pub struct AgentQueryDto {
    pub specialization: Option<String>,
    pub area: Option<Uuid>,
    pub featured: Option<bool>,
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateCertificationDto {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub issuing_organization: String,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub certificate_number: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct AgentDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
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
    pub total_sales: i32,
    pub total_rentals: i32,
    pub client_rating: f64,
    pub total_reviews: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service_area_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl AgentDto {
    pub fn from_summary(agent: &AgentSummary, service_area_ids: Vec<Uuid>) -> Self {
        let p = &agent.profile;
        let client_rating = agent
            .client_rating
            .as_ref()
            .and_then(|r| r.round(2).to_f64())
            .unwrap_or(0.0);

        AgentDto {
            id: p.id,
            user_id: p.user_id,
            username: agent.username.clone(),
            full_name: format!("{} {}", agent.first_name, agent.last_name).trim().to_string(),
            email: agent.email.clone(),
            license_number: p.license_number.clone(),
            license_expiry: p.license_expiry,
            agency_name: p.agency_name.clone(),
            agency_address: p.agency_address.clone(),
            years_experience: p.years_experience,
            specialization: p.specialization,
            office_phone: p.office_phone.clone(),
            website: p.website.clone(),
            facebook_url: p.facebook_url.clone(),
            linkedin_url: p.linkedin_url.clone(),
            bio: p.bio.clone(),
            languages_spoken: p.languages_spoken.clone(),
            is_verified: p.is_verified,
            is_featured: p.is_featured,
            total_sales: p.total_sales,
            total_rentals: p.total_rentals,
            client_rating,
            total_reviews: agent.total_reviews,
            service_area_ids,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CertificationListDto {
    pub status: &'static str,
    pub results: Vec<AgentCertification>,
}

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub status: &'static str,
    pub data: AgentReview,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_must_be_one_to_five() {
        let ok = CreateReviewDto { rating: 5, comment: "Great agent".to_string() };
        assert!(ok.validate().is_ok());

        let too_high = CreateReviewDto { rating: 6, comment: String::new() };
        assert!(too_high.validate().unwrap_err().field_errors().contains_key("rating"));

        let zero = CreateReviewDto { rating: 0, comment: String::new() };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn agent_links_must_be_urls() {
        let dto = UpdateAgentDto {
            website: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(dto.validate().unwrap_err().field_errors().contains_key("website"));
    }

    #[test]
    fn experience_band_uses_range_labels() {
        let band: ExperienceBand = serde_json::from_str("\"5-10\"").unwrap();
        assert_eq!(band, ExperienceBand::FiveToTen);
        assert_eq!(serde_json::to_string(&ExperienceBand::OverTen).unwrap(), "\"10+\"");
    }
}
