use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::ValidationErrors;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(&self).unwrap_or_default())
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,
    InvalidToken,
    ServerError,
    WrongCredentials,
    EmailExist,
    UsernameExist,
    UserNoLongerExist,
    TokenNotProvided,
    PermissionDenied,
    UserNotAuthenticated,
    ValidationFailed,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessage::ServerError => "Server Error. Please try again later".to_string(),
            ErrorMessage::WrongCredentials => "Email or password is wrong".to_string(),
            ErrorMessage::EmailExist => "A user with this email already exists".to_string(),
            ErrorMessage::UsernameExist => "A user with this username already exists".to_string(),
            ErrorMessage::UserNoLongerExist => {
                "User belonging to this token no longer exists".to_string()
            }
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => {
                format!("Password must not be more than {} characters", max_length)
            }
            ErrorMessage::InvalidToken => "Authentication token is invalid or expired".to_string(),
            ErrorMessage::TokenNotProvided => {
                "You are not logged in, please provide a token".to_string()
            }
            ErrorMessage::PermissionDenied => {
                "You are not allowed to perform this action".to_string()
            }
            ErrorMessage::UserNotAuthenticated => {
                "Authentication required. Please log in.".to_string()
            }
            ErrorMessage::ValidationFailed => "Validation failed".to_string(),
        };
        write!(f, "{}", message)
    }
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
    pub errors: Option<Value>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
            errors: None,
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::NOT_FOUND)
    }

    /// A 400 carrying a single field error.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = Map::new();
        errors.insert(field.to_string(), Value::Array(vec![Value::String(message.clone())]));

        HttpError {
            message: ErrorMessage::ValidationFailed.to_string(),
            status: StatusCode::BAD_REQUEST,
            errors: Some(Value::Object(errors)),
        }
    }

    /// Translates storage failures. Constraint violations and rejected
    /// values become 400s, anything else is logged and hidden behind a 500.
    pub fn from_db(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return HttpError::not_found("Resource not found");
        }

        if let sqlx::Error::Database(db_err) = &err {
            if let Some(mapped) = db_code_error(db_err.code().as_deref(), db_err.constraint()) {
                return mapped;
            }
        }

        tracing::error!("database error: {}", err);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            status: "fail".to_string(),
            message: self.message.clone(),
            errors: self.errors,
        });

        (self.status, json_response).into_response()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

impl From<ValidationErrors> for HttpError {
    fn from(errors: ValidationErrors) -> Self {
        HttpError {
            message: ErrorMessage::ValidationFailed.to_string(),
            status: StatusCode::BAD_REQUEST,
            errors: Some(validation_errors_json(&errors)),
        }
    }
}

pub fn validation_errors_json(errors: &ValidationErrors) -> Value {
    let mut map = Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors
            .iter()
            .map(|e| {
                let text = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                Value::String(text)
            })
            .collect();
        map.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(map)
}

/// Maps a SQLSTATE the client can cause to a field error. Integrity
/// violations (class 23) name the field through the constraint, data
/// exceptions (class 22) carry no constraint and land on
/// `non_field_errors`.
fn db_code_error(code: Option<&str>, constraint: Option<&str>) -> Option<HttpError> {
    let field = constraint.map(constraint_field).unwrap_or("non_field_errors");

    let message = match code? {
        "23505" => "This value is already in use",
        "23503" => "Referenced record does not exist",
        "23514" => "Value violates a constraint",
        "22001" => "Value is too long",
        "22003" => "Number is out of range",
        class_22 if class_22.starts_with("22") => "Invalid value",
        _ => return None,
    };

    Some(HttpError::field(field, message))
}

// Constraint names are fixed in migrations/.
fn constraint_field(constraint: &str) -> &'static str {
    match constraint {
        "properties_slug_key" => "slug",
        "properties_area_id_fkey" => "area_id",
        "properties_property_type_id_fkey" => "property_type_id",
        "properties_status_id_fkey" => "status_id",
        "properties_price_check" => "price",
        "users_email_key" => "email",
        "users_username_key" => "username",
        "agent_profiles_user_id_key" => "user",
        "agent_profiles_license_number_key" => "license_number",
        "agent_reviews_agent_id_reviewer_id_key" => "agent",
        "agent_reviews_rating_check" => "rating",
        "property_images_one_primary" => "is_primary",
        "payment_accounts_one_primary" => "is_primary",
        "tariff_plans_slug_key" => "slug",
        "transactions_transaction_id_key" => "transaction_id",
        "invoices_invoice_number_key" => "invoice_number",
        "promoted_properties_priority_score_check" => "priority_score",
        "advertisements_package_id_fkey" => "package_id",
        "advertisements_property_id_fkey" => "property_id",
        "media_files_property_id_fkey" | "property_images_property_id_fkey" => "property_id",
        "regions_name_country_id_key" | "cities_name_region_id_key" | "areas_name_city_id_key" => {
            "name"
        }
        _ => "non_field_errors",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn client_caused_sqlstates_are_bad_requests() {
        let taken = db_code_error(Some("23505"), Some("properties_slug_key")).unwrap();
        assert_eq!(taken.status, StatusCode::BAD_REQUEST);
        assert_eq!(taken.errors.unwrap()["slug"][0], "This value is already in use");

        let too_long = db_code_error(Some("22001"), None).unwrap();
        assert_eq!(too_long.status, StatusCode::BAD_REQUEST);
        assert_eq!(too_long.errors.unwrap()["non_field_errors"][0], "Value is too long");

        let overflow = db_code_error(Some("22003"), None).unwrap();
        assert_eq!(overflow.status, StatusCode::BAD_REQUEST);

        assert!(db_code_error(Some("22P02"), None).is_some());
        assert!(db_code_error(Some("40001"), None).is_none());
        assert!(db_code_error(None, Some("properties_slug_key")).is_none());
    }

    #[test]
    fn field_error_is_keyed_by_field() {
        let err = HttpError::field("slug", "taken");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.errors.unwrap()["slug"][0], "taken");
    }

    #[test]
    fn validation_errors_use_message_or_code() {
        let mut errors = ValidationErrors::new();
        let mut with_message = ValidationError::new("required");
        with_message.message = Some("Land size is required for sale listings".into());
        errors.add("land_size_sqm", with_message);
        errors.add("price_per_day", ValidationError::new("required"));

        let json = validation_errors_json(&errors);
        assert_eq!(
            json["land_size_sqm"][0],
            "Land size is required for sale listings"
        );
        assert_eq!(json["price_per_day"][0], "required");
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err = HttpError::from_db(sqlx::Error::RowNotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn known_constraints_name_their_field() {
        assert_eq!(constraint_field("properties_slug_key"), "slug");
        assert_eq!(constraint_field("areas_name_city_id_key"), "name");
        assert_eq!(constraint_field("something_else"), "non_field_errors");
    }
}
