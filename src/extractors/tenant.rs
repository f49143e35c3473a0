//! Extract tenant id from request (e.g. X-Tenant-ID header).

use crate::runtime::{Resources, Runtime};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use std::sync::Arc;

/// Header name for tenant id. Default: `X-Tenant-ID`.
pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

fn header_tenant(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(TENANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extractor for optional tenant id from `X-Tenant-ID` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantId(pub Option<String>);

impl TenantId {
    /// Header value, or the runtime's default tenant when absent.
    pub fn resolve<R: Resources>(&self, runtime: &Runtime<R>) -> String {
        match &self.0 {
            Some(t) => t.clone(),
            None => runtime.default_tenant(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(TenantId(header_tenant(parts)))
    }
}

/// Tenant for the request with the default-tenant fallback already applied.
/// Needs `Arc<Runtime<R>>` as router state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentTenant(pub String);

#[async_trait]
impl<R: Resources> FromRequestParts<Arc<Runtime<R>>> for CurrentTenant {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, runtime: &Arc<Runtime<R>>) -> Result<Self, Self::Rejection> {
        Ok(CurrentTenant(TenantId(header_tenant(parts)).resolve(runtime)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::PgResources;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    async fn body_text(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn header_is_trimmed_and_blank_is_none() {
        let app = Router::new().route("/", get(|TenantId(t): TenantId| async move { format!("{:?}", t) }));
        let res = app
            .clone()
            .oneshot(Request::builder().uri("/").header(TENANT_ID_HEADER, " acme ").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(res).await, "Some(\"acme\")");

        let res = app
            .oneshot(Request::builder().uri("/").header(TENANT_ID_HEADER, "  ").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(res).await, "None");
    }

    #[tokio::test]
    async fn current_tenant_falls_back_to_default() {
        let runtime: Arc<Runtime<PgResources>> = Arc::new(Runtime::new());
        runtime.set_default_tenant("main").unwrap();
        let app = Router::new()
            .route("/", get(|CurrentTenant(t): CurrentTenant| async move { t }))
            .with_state(runtime);

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(res).await, "main");

        let res = app
            .oneshot(Request::builder().uri("/").header(TENANT_ID_HEADER, "acme").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(res).await, "acme");
    }
}
