//! Example consumer: a small multi-tenant server wired through the runtime registry.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Settings come from `ADMIN_*` env vars (or `.env`), e.g. `ADMIN_APPLICATION_PORT=3000`.
//! Send `X-Tenant-ID: <tenant>` to pick a tenant; without it the default tenant is used.

use admin_runtime_sdk::{
    init_default_logger, init_tracing,
    storage::{MemoryCache, MemoryLocker},
    CacheAdapter, CurrentTenant, EnvSource, PgResources, Runtime, RuntimeError, Settings,
};
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

type AppRuntime = Arc<Runtime<PgResources>>;

async fn visits(
    State(runtime): State<AppRuntime>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<serde_json::Value>, RuntimeError> {
    let cache = runtime
        .tenant_cache(&tenant)
        .ok_or_else(|| RuntimeError::BindingMissing {
            kind: admin_runtime_sdk::ResourceKind::Cache,
            tenant: tenant.clone(),
        })?;
    let count = cache.increase("visits").await?;
    Ok(Json(serde_json::json!({ "tenant": tenant, "visits": count })))
}

async fn whoami(State(runtime): State<AppRuntime>, CurrentTenant(tenant): CurrentTenant) -> String {
    let name = runtime
        .config_value_by_tenant(&tenant, "name")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    format!("{} ({})", tenant, name)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load(None, &EnvSource::new().with_stripped_prefix("ADMIN").with_dotenv())?;
    init_tracing(settings.logger.level()?)?;
    let logger = settings.logger.build()?;
    init_default_logger(logger.clone())?;

    let runtime: AppRuntime = Arc::new(Runtime::new());
    runtime.set_logger(logger);

    let shared: Arc<dyn CacheAdapter> = Arc::new(MemoryCache::new());
    for tenant in ["default", "acme", "globex"] {
        runtime.set_cache_adapter_by_tenant(tenant, shared.clone())?;
        runtime.set_config_value_by_tenant(tenant, "name", serde_json::json!(format!("{} admin", tenant)))?;
    }
    runtime.set_locker_adapter(Arc::new(MemoryLocker::new()));

    let state = runtime.clone();
    runtime.set_handler(move |router: Router| {
        router.merge(
            Router::new()
                .route("/visits", get(visits))
                .route("/whoami", get(whoami))
                .with_state(state.clone()),
        )
    });
    runtime.set_before(|| tracing::info!("routes registered"));

    let mut app = Router::new();
    for registrar in runtime.handlers() {
        app = registrar(app);
    }
    for callback in runtime.before() {
        callback();
    }
    runtime.set_engine(app.clone());

    let listener = TcpListener::bind(settings.application.addr()).await?;
    let port = listener.local_addr()?.port();
    runtime.log().infof(format_args!("listening on http://{}:{}", settings.application.host, port));
    axum::serve(listener, app).await?;
    Ok(())
}
