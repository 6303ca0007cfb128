use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    secret: &[u8],
    expires_in_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::minutes(expires_in_minutes)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<String, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_to_subject() {
        let token = create_token("b1d3", b"secret", 30).unwrap();
        assert_eq!(decode_token(token, b"secret").unwrap(), "b1d3");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("b1d3", b"secret", 30).unwrap();
        assert!(decode_token(token, b"other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token("b1d3", b"secret", -120).unwrap();
        assert!(decode_token(token, b"secret").is_err());
    }

    #[test]
    fn empty_subject_is_refused() {
        assert!(create_token("", b"secret", 30).is_err());
    }
}
