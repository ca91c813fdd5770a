use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::models::ServiceError;

/// Header an upstream authentication layer sets to the acting user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// The acting user, as established by the authentication layer in front of this service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match user_id {
            Some(user_id) => Ok(AuthenticatedUser {
                user_id: user_id.to_string(),
            }),
            None => {
                warn!("Missing or invalid X-User-ID header");
                Err(ServiceError::Unauthorized {
                    message: "Not authorized, no user identity".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<AuthenticatedUser, ServiceError> {
        let (mut parts, _) = request.into_parts();
        AuthenticatedUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_user_from_header() {
        let request = Request::builder()
            .header("X-User-ID", " user123 ")
            .body(())
            .unwrap();

        let user = extract(request).await.unwrap();
        assert_eq!(user.user_id, "user123");
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_rejected() {
        let missing = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(missing).await,
            Err(ServiceError::Unauthorized { .. })
        ));

        let blank = Request::builder().header("X-User-ID", "  ").body(()).unwrap();
        assert!(matches!(
            extract(blank).await,
            Err(ServiceError::Unauthorized { .. })
        ));
    }
}
