use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::config::Config;
use crate::error::AppError;
use crate::models::{AuthSession, Claims};
use crate::AppState;

/// Validate a session token minted by the identity provider. Tries the
/// current secret first, then previous ones so rotation does not sign
/// everyone out.
pub fn validate_session_token(token: &str, config: &Config) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let secrets = std::iter::once(&config.auth.session_secret).chain(config.auth.previous_secrets.iter());
    for secret in secrets {
        if let Ok(data) = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        ) {
            return Ok(data.claims);
        }
    }

    Err(AppError::Unauthorized("Invalid or expired session".to_string()))
}

/// Pull the session identity out of a request's Authorization header.
pub fn session_from_request(request: &Request, config: &Config) -> Result<AuthSession, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return Err(AppError::Unauthorized(
                "Missing or invalid Authorization header".to_string(),
            ));
        }
    };

    let claims = validate_session_token(token, config)?;

    Ok(AuthSession {
        external_id: claims.sub,
        name: claims.name,
    })
}

/// Session middleware for routes that work before the event opens
/// (profile sync, upload target issuance).
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = session_from_request(&request, &state.config)?;

    // Insert session identity into request extensions
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
