// roster-service/src/utils/mod.rs
use crate::models::{Claims, Principal, ServiceError};
use actix_web::http::header;
use actix_web::HttpRequest;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::env;

pub mod store;

// JWT utility functions
pub mod jwt {
    use super::*;

    // Get JWT secret from environment or use default
    fn get_jwt_secret() -> String {
        env::var("JWT_SECRET").unwrap_or_else(|_| "roster_service_dev_secret".to_string())
    }

    // Issue a token for a principal. Identity federation is external; this
    // exists for local runs and tests.
    pub fn issue_token(user_id: &str, email: Option<&str>) -> Result<String, ServiceError> {
        let secret = get_jwt_secret();
        let expiration = Utc::now()
            .checked_add_signed(Duration::days(7))
            .expect("Valid timestamp")
            .timestamp() as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(|e| e.to_string()),
            exp: expiration,
            iat: Utc::now().timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .map_err(|_| ServiceError::InternalServerError)
    }

    // Validate and decode a JWT token
    pub fn decode_token(token: &str) -> Result<Claims, ServiceError> {
        let secret = get_jwt_secret();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthorized)
    }

    // Extract JWT from Authorization header
    pub fn extract_token_from_header(auth_header: &str) -> Result<String, ServiceError> {
        if !auth_header.starts_with("Bearer ") {
            return Err(ServiceError::Unauthorized);
        }

        Ok(auth_header.trim_start_matches("Bearer ").to_string())
    }
}

// Roster password utilities. Join passwords are a lightweight gate, hashed
// with a salted digest so the plain text is never stored.
pub mod password {
    use sha2::{Digest, Sha256};
    use std::env;

    fn roster_salt() -> String {
        env::var("ROSTER_SALT").unwrap_or_else(|_| "roster_service_salt".to_string())
    }

    // Hash a roster join password
    pub fn hash_roster_password(password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", roster_salt(), password).as_bytes());
        format!("{:x}", hasher.finalize())
    }

    // Compare a supplied password against the stored hash. No stored hash
    // means the roster is open.
    pub fn verify_roster_password(stored: Option<&str>, supplied: Option<&str>) -> bool {
        match stored {
            None => true,
            Some(hash) => match supplied {
                Some(password) => hash_roster_password(password) == *hash,
                None => false,
            },
        }
    }
}

// Timestamp helpers. Everything persisted uses fixed-width RFC 3339 UTC
// millisecond strings so lexicographic order equals chronological order.
pub mod time {
    use chrono::{SecondsFormat, Utc};

    pub fn now_iso() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }
}

// Resolve the authenticated principal from the Authorization header.
// The claims are consumed as already verified upstream.
pub fn get_principal(req: &HttpRequest) -> Result<Principal, ServiceError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ServiceError::Unauthorized)?;

    let token = jwt::extract_token_from_header(auth_header)?;
    let claims = jwt::decode_token(&token)?;

    Ok(Principal::User(claims.sub))
}

// Same as get_principal but for routes that also want the email claim
pub fn get_principal_with_email(
    req: &HttpRequest,
) -> Result<(Principal, Option<String>), ServiceError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ServiceError::Unauthorized)?;

    let token = jwt::extract_token_from_header(auth_header)?;
    let claims = jwt::decode_token(&token)?;

    Ok((Principal::User(claims.sub), claims.email))
}
