use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::db::DBClient;

use crate::{
    dtos::agentdtos::{
        AgentQueryDto, CreateCertificationDto, CreateReviewDto, RegisterAgentDto, UpdateAgentDto,
    },
    models::{
        agentmodel::{AgentCertification, AgentProfile, AgentReview, AgentSummary},
        usermodel::UserRole,
    },
    service::property_filter::like_pattern,
};

#[async_trait]
pub trait AgentExt {
    async fn get_agent_by_user(&self, user_id: Uuid) -> Result<Option<AgentProfile>, sqlx::Error>;

    async fn get_agent_summary(
        &self,
        agent_id: Option<Uuid>,
        user_id: Option<Uuid>,
        verified_only: bool,
    ) -> Result<Option<AgentSummary>, sqlx::Error>;

    async fn list_agents(
        &self,
        query: &AgentQueryDto,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<AgentSummary>, i64), sqlx::Error>;

    async fn get_service_area_ids(&self, agent_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>;

    async fn register_agent(
        &self,
        user_id: Uuid,
        profile: RegisterAgentDto,
    ) -> Result<AgentProfile, sqlx::Error>;

    async fn update_agent(
        &self,
        agent_id: Uuid,
        profile: UpdateAgentDto,
    ) -> Result<AgentProfile, sqlx::Error>;

    async fn get_certifications(&self, agent_id: Uuid) -> Result<Vec<AgentCertification>, sqlx::Error>;

    async fn add_certification(
        &self,
        agent_id: Uuid,
        certification: CreateCertificationDto,
    ) -> Result<AgentCertification, sqlx::Error>;

    async fn get_reviews(&self, agent_id: Uuid) -> Result<Vec<AgentReview>, sqlx::Error>;

    async fn create_review(
        &self,
        agent_id: Uuid,
        reviewer_id: Uuid,
        review: CreateReviewDto,
    ) -> Result<AgentReview, sqlx::Error>;
}

const SUMMARY_SELECT: &str = r#"
    SELECT
        ap.*,
        u.username, u.first_name, u.last_name, u.email,
        (SELECT AVG(rv.rating) FROM agent_reviews rv
            WHERE rv.agent_id = ap.id AND rv.is_published) AS client_rating,
        (SELECT COUNT(*) FROM agent_reviews rv
            WHERE rv.agent_id = ap.id AND rv.is_published) AS total_reviews
    FROM agent_profiles ap
    JOIN users u ON u.id = ap.user_id
"#;

const REVIEW_SELECT: &str = r#"
    SELECT rv.id, rv.agent_id, rv.reviewer_id, u.username AS reviewer_username,
           rv.rating, rv.comment, rv.is_published, rv.created_at
    FROM agent_reviews rv
    JOIN users u ON u.id = rv.reviewer_id
"#;

fn push_agent_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AgentQueryDto) {
    qb.push(" WHERE ap.is_verified AND ap.is_active");
    if let Some(spec) = query.specialization.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND ap.specialization::text ILIKE ")
            .push_bind(like_pattern(spec));
    }
    if let Some(area_id) = query.area {
        qb.push(
            " AND EXISTS (SELECT 1 FROM agent_service_areas sa WHERE sa.agent_id = ap.id AND sa.area_id = ",
        )
        .push_bind(area_id)
        .push(")");
    }
    if query.featured == Some(true) {
        qb.push(" AND ap.is_featured");
    }
}

async fn replace_service_areas(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    agent_id: Uuid,
    area_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM agent_service_areas WHERE agent_id = $1")
        .bind(agent_id)
        .execute(&mut **tx)
        .await?;

    if !area_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO agent_service_areas (agent_id, area_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(agent_id)
        .bind(area_ids)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl AgentExt for DBClient {
    async fn get_agent_by_user(&self, user_id: Uuid) -> Result<Option<AgentProfile>, sqlx::Error> {
        sqlx::query_as::<_, AgentProfile>(
            "SELECT * FROM agent_profiles WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_agent_summary(
        &self,
        agent_id: Option<Uuid>,
        user_id: Option<Uuid>,
        verified_only: bool,
    ) -> Result<Option<AgentSummary>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        qb.push(" WHERE ap.is_active");
        if let Some(agent_id) = agent_id {
            qb.push(" AND ap.id = ").push_bind(agent_id);
        } else if let Some(user_id) = user_id {
            qb.push(" AND ap.user_id = ").push_bind(user_id);
        } else {
            return Ok(None);
        }
        if verified_only {
            qb.push(" AND ap.is_verified");
        }

        qb.build_query_as::<AgentSummary>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_agents(
        &self,
        query: &AgentQueryDto,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<AgentSummary>, i64), sqlx::Error> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        let mut list = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        push_agent_filters(&mut list, query);
        list.push(" ORDER BY ap.is_featured DESC, client_rating DESC NULLS LAST, ap.total_sales DESC, ap.id");
        list.push(" LIMIT ").push_bind(limit as i64);
        list.push(" OFFSET ").push_bind(offset);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM agent_profiles ap");
        push_agent_filters(&mut count, query);

        let (agents, total) = futures::try_join!(
            list.build_query_as::<AgentSummary>().fetch_all(&self.pool),
            count.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        Ok((agents, total))
    }

    async fn get_service_area_ids(&self, agent_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT area_id FROM agent_service_areas WHERE agent_id = $1",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn register_agent(
        &self,
        user_id: Uuid,
        profile: RegisterAgentDto,
    ) -> Result<AgentProfile, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let agent = sqlx::query_as::<_, AgentProfile>(
            r#"
            INSERT INTO agent_profiles (
                user_id, license_number, license_expiry, agency_name, agency_address,
                years_experience, specialization, office_phone, website, facebook_url,
                linkedin_url, bio, languages_spoken
            )
            VALUES ($1, $2, $3, $4, $5,
                    COALESCE($6, '0-1'::experience_band),
                    COALESCE($7, 'residential'::agent_specialization),
                    $8, $9, $10, $11, $12,
                    COALESCE($13, 'English, French'))
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(profile.license_number)
        .bind(profile.license_expiry)
        .bind(profile.agency_name)
        .bind(profile.agency_address)
        .bind(profile.years_experience)
        .bind(profile.specialization)
        .bind(profile.office_phone)
        .bind(profile.website)
        .bind(profile.facebook_url)
        .bind(profile.linkedin_url)
        .bind(profile.bio)
        .bind(profile.languages_spoken)
        .fetch_one(&mut *tx)
        .await?;

        replace_service_areas(&mut tx, agent.id, &profile.service_area_ids).await?;

        sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 AND role <> 'admin'")
            .bind(user_id)
            .bind(UserRole::Agent)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(agent)
    }

    async fn update_agent(
        &self,
        agent_id: Uuid,
        profile: UpdateAgentDto,
    ) -> Result<AgentProfile, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let agent = sqlx::query_as::<_, AgentProfile>(
            r#"
            UPDATE agent_profiles SET
                license_expiry = COALESCE($2, license_expiry),
                agency_name = COALESCE($3, agency_name),
                agency_address = COALESCE($4, agency_address),
                years_experience = COALESCE($5, years_experience),
                specialization = COALESCE($6, specialization),
                office_phone = COALESCE($7, office_phone),
                website = COALESCE($8, website),
                facebook_url = COALESCE($9, facebook_url),
                linkedin_url = COALESCE($10, linkedin_url),
                bio = COALESCE($11, bio),
                languages_spoken = COALESCE($12, languages_spoken),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(agent_id)
        .bind(profile.license_expiry)
        .bind(profile.agency_name)
        .bind(profile.agency_address)
        .bind(profile.years_experience)
        .bind(profile.specialization)
        .bind(profile.office_phone)
        .bind(profile.website)
        .bind(profile.facebook_url)
        .bind(profile.linkedin_url)
        .bind(profile.bio)
        .bind(profile.languages_spoken)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(area_ids) = &profile.service_area_ids {
            replace_service_areas(&mut tx, agent_id, area_ids).await?;
        }

        tx.commit().await?;

        Ok(agent)
    }

    async fn get_certifications(&self, agent_id: Uuid) -> Result<Vec<AgentCertification>, sqlx::Error> {
        sqlx::query_as::<_, AgentCertification>(
            "SELECT * FROM agent_certifications WHERE agent_id = $1 ORDER BY issue_date DESC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn add_certification(
        &self,
        agent_id: Uuid,
        certification: CreateCertificationDto,
    ) -> Result<AgentCertification, sqlx::Error> {
        sqlx::query_as::<_, AgentCertification>(
            r#"
            INSERT INTO agent_certifications (
                agent_id, name, issuing_organization, issue_date, expiry_date, certificate_number
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(agent_id)
        .bind(certification.name)
        .bind(certification.issuing_organization)
        .bind(certification.issue_date)
        .bind(certification.expiry_date)
        .bind(certification.certificate_number)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_reviews(&self, agent_id: Uuid) -> Result<Vec<AgentReview>, sqlx::Error> {
        sqlx::query_as::<_, AgentReview>(&format!(
            "{} WHERE rv.agent_id = $1 AND rv.is_published ORDER BY rv.created_at DESC",
            REVIEW_SELECT
        ))
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_review(
        &self,
        agent_id: Uuid,
        reviewer_id: Uuid,
        review: CreateReviewDto,
    ) -> Result<AgentReview, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Serialises reviews of the same agent so the aggregate reads stay consistent.
        sqlx::query("SELECT id FROM agent_profiles WHERE id = $1 FOR UPDATE")
            .bind(agent_id)
            .fetch_one(&mut *tx)
            .await?;

        let review_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO agent_reviews (agent_id, reviewer_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(agent_id)
        .bind(reviewer_id)
        .bind(review.rating)
        .bind(review.comment)
        .fetch_one(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, AgentReview>(&format!("{} WHERE rv.id = $1", REVIEW_SELECT))
            .bind(review_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_filters_compose_in_order() {
        let query = AgentQueryDto {
            specialization: Some("lux".to_string()),
            area: Some(Uuid::new_v4()),
            featured: Some(true),
            page: None,
            limit: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM agent_profiles ap");
        push_agent_filters(&mut qb, &query);
        let sql = qb.sql();
        assert!(sql.contains("WHERE ap.is_verified AND ap.is_active"));
        assert!(sql.contains("ap.specialization::text ILIKE $1"));
        assert!(sql.contains("sa.area_id = $2"));
        assert!(sql.ends_with("AND ap.is_featured"));
    }

    #[test]
    fn featured_false_is_not_a_filter() {
        let query = AgentQueryDto {
            featured: Some(false),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM agent_profiles ap");
        push_agent_filters(&mut qb, &query);
        assert!(!qb.sql().contains("is_featured"));
    }
}
