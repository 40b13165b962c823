use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Client address and agent recorded on audit events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestProvenance {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestProvenance {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        // First hop of x-forwarded-for is the original client
        let ip_address = header("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
            .or_else(|| header("x-real-ip"));

        Ok(Self {
            ip_address,
            user_agent: header("user-agent"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn prefers_first_forwarded_hop() {
        let (mut parts, _) = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.1")
            .header("user-agent", "panel-cli/0.1")
            .body(())
            .unwrap()
            .into_parts();

        let provenance = RequestProvenance::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(provenance.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(provenance.user_agent.as_deref(), Some("panel-cli/0.1"));
    }

    #[tokio::test]
    async fn missing_headers_are_none() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let provenance = RequestProvenance::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(provenance, RequestProvenance::default());
    }
}
