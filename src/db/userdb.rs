use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;

use crate::{
    dtos::userdtos::{UpdatePreferencesDto, UpdateProfileDto},
    models::usermodel::{User, UserPreferences, UserRole},
};

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, sqlx::Error>;

    async fn save_user(&self, user: NewUser) -> Result<User, sqlx::Error>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        profile: UpdateProfileDto,
    ) -> Result<User, sqlx::Error>;

    async fn get_preferences(&self, user_id: Uuid) -> Result<UserPreferences, sqlx::Error>;

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: UpdatePreferencesDto,
    ) -> Result<UserPreferences, sqlx::Error>;
}

const USER_COLUMNS: &str = r#"
    id, username, email, password, first_name, last_name, phone, role,
    profile_picture, date_of_birth, address, is_verified, is_active,
    created_at, updated_at
"#;

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE id = $1 AND is_active",
                USER_COLUMNS
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(username) = username {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE username = $1 AND is_active",
                USER_COLUMNS
            ))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE LOWER(email) = LOWER($1) AND is_active",
                USER_COLUMNS
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE (LOWER(email) = LOWER($1) OR username = $1) AND is_active LIMIT 1",
            USER_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
    }

    async fn save_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password, first_name, last_name, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.password)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.phone)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        profile: UpdateProfileDto,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                profile_picture = COALESCE($5, profile_picture),
                date_of_birth = COALESCE($6, date_of_birth),
                address = COALESCE($7, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(profile.first_name)
        .bind(profile.last_name)
        .bind(profile.phone)
        .bind(profile.profile_picture)
        .bind(profile.date_of_birth)
        .bind(profile.address)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<UserPreferences, sqlx::Error> {
        // First read creates the row with table defaults.
        sqlx::query_as::<_, UserPreferences>(
            r#"
            INSERT INTO user_preferences (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: UpdatePreferencesDto,
    ) -> Result<UserPreferences, sqlx::Error> {
        sqlx::query_as::<_, UserPreferences>(
            r#"
            INSERT INTO user_preferences (
                user_id, email_notifications, sms_notifications, push_notifications,
                preferred_language, preferred_currency
            )
            VALUES ($1, COALESCE($2, TRUE), COALESCE($3, FALSE), COALESCE($4, TRUE),
                    COALESCE($5, 'en'), COALESCE($6, 'XAF'))
            ON CONFLICT (user_id) DO UPDATE SET
                email_notifications = COALESCE($2, user_preferences.email_notifications),
                sms_notifications = COALESCE($3, user_preferences.sms_notifications),
                push_notifications = COALESCE($4, user_preferences.push_notifications),
                preferred_language = COALESCE($5, user_preferences.preferred_language),
                preferred_currency = COALESCE($6, user_preferences.preferred_currency),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(preferences.email_notifications)
        .bind(preferences.sms_notifications)
        .bind(preferences.push_notifications)
        .bind(preferences.preferred_language)
        .bind(preferences.preferred_currency.map(|c| c.to_uppercase()))
        .fetch_one(&self.pool)
        .await
    }
}
