//! Admin runtime SDK: a tenant-keyed registry of the shared resources a
//! multi-tenant admin server wires together at startup and reads per request.

pub mod config;
pub mod error;
pub mod extractors;
pub mod logger;
pub mod runtime;
pub mod storage;
pub mod store;
pub mod tenant;

pub use config::{ApplicationConfig, EnvSource, LoggerConfig, Settings, TenantMode};
pub use error::{ConfigError, LoggerError, RuntimeError, StorageError};
pub use extractors::tenant::{CurrentTenant, TenantId, TENANT_ID_HEADER};
pub use logger::{default_logger, init_default_logger, init_tracing, Fields, Helper, Level, Logger, Options};
pub use runtime::{ExcludeRule, PgResources, ResourceKind, Resources, Runtime};
pub use storage::{CacheAdapter, LockerAdapter, Message, QueueAdapter};
pub use store::{Bindings, TenantStore};
pub use tenant::{TenantKey, DEFAULT_TENANT, WILDCARD_TENANT};
