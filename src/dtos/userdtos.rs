use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    models::usermodel::{User, UserPreferences, UserRole},
    utils::text::validate_phone,
};

fn validate_registration_role(role: &UserRole) -> Result<(), ValidationError> {
    if *role == UserRole::Admin {
        let mut err = ValidationError::new("role");
        err.message = Some("Admin accounts cannot be self-registered".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 3, max = 150, message = "Username must be between 3 and 150 characters"))]
    pub username: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 8, max = 64, message = "Password must be between 8 and 64 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "passwordConfirm", alias = "password_confirm")]
    pub password_confirm: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(custom = "validate_registration_role")]
    pub role: Option<UserRole>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    /// Email address or username.
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[validate(url(message = "Profile picture must be a URL"))]
    pub profile_picture: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdatePreferencesDto {
    pub email_notifications: Option<bool>,
    pub sms_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    #[validate(length(min = 2, max = 10))]
    pub preferred_language: Option<String>,
    #[validate(length(equal = 3, message = "Currency must be a 3 letter code"))]
    pub preferred_currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: String,
    pub profile_picture: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub is_verified: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            full_name: user.full_name(),
            phone: user.phone.clone(),
            role: user.role.to_str().to_string(),
            profile_picture: user.profile_picture.clone(),
            date_of_birth: user.date_of_birth,
            address: user.address.clone(),
            is_verified: user.is_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreferencesResponseDto {
    pub status: String,
    pub data: UserPreferences,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

/// Envelope shared by every list endpoint.
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub status: &'static str,
    pub count: i64,
    pub results: Vec<T>,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(count: i64, results: Vec<T>) -> Self {
        ListResponse {
            status: "success",
            count,
            results,
        }
    }

    pub fn all(results: Vec<T>) -> Self {
        ListResponse::new(results.len() as i64, results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterUserDto {
        RegisterUserDto {
            username: "ngono".to_string(),
            email: "ngono@example.cm".to_string(),
            password: "longenough".to_string(),
            password_confirm: "longenough".to_string(),
            first_name: "Marie".to_string(),
            last_name: "Ngono".to_string(),
            phone: Some("+237677889900".to_string()),
            role: Some(UserRole::Agent),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn mismatched_confirmation_fails() {
        let mut dto = registration();
        dto.password_confirm = "different1".to_string();
        let err = dto.validate().unwrap_err();
        assert!(err.field_errors().contains_key("password_confirm"));
    }

    #[test]
    fn admin_role_cannot_be_requested() {
        let mut dto = registration();
        dto.role = Some(UserRole::Admin);
        let err = dto.validate().unwrap_err();
        assert!(err.field_errors().contains_key("role"));
    }

    #[test]
    fn short_password_and_bad_phone_fail() {
        let mut dto = registration();
        dto.password = "short".to_string();
        dto.password_confirm = "short".to_string();
        dto.phone = Some("12".to_string());
        let err = dto.validate().unwrap_err();
        assert!(err.field_errors().contains_key("password"));
        assert!(err.field_errors().contains_key("phone"));
    }
}
