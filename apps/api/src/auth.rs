use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::errors::AppError;
use crate::models::Actor;
use crate::state::AppState;

/// Roles allowed to run assessments.
pub const ASSESSMENT_ROLES: &[&str] = &["recruiter", "admin"];

/// Caller resolved from `Authorization: Bearer <token>`.
/// Missing, malformed or unknown tokens reject with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedActor(pub Actor);

impl AuthenticatedActor {
    /// 403 unless the actor holds one of `allowed`.
    pub fn require_role(&self, allowed: &[&str]) -> Result<&Actor, AppError> {
        let role = self.0.role.trim();
        if allowed.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            Ok(&self.0)
        } else {
            Err(AppError::Forbidden)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let actor = state
            .store
            .resolve_actor(token)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(AuthenticatedActor(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use uuid::Uuid;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc123"))), Some("abc123"));
        assert_eq!(bearer_token(&parts(Some("bearer  abc123 "))), Some("abc123"));
        assert_eq!(bearer_token(&parts(Some("Basic abc123"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_require_role() {
        let actor = |role: &str| {
            AuthenticatedActor(Actor {
                id: Uuid::new_v4(),
                role: role.to_string(),
            })
        };
        assert!(actor("recruiter").require_role(ASSESSMENT_ROLES).is_ok());
        assert!(actor("Admin").require_role(ASSESSMENT_ROLES).is_ok());
        assert!(matches!(
            actor("candidate").require_role(ASSESSMENT_ROLES),
            Err(AppError::Forbidden)
        ));
    }
}
