//! Resource kinds the runtime binds per tenant, and the handle types for each.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Handle types for the collaborator-defined slots of a [`crate::Runtime`].
///
/// Handles are cloned out of the registry on every read, so they should be cheap
/// reference types (pools, `Arc`s).
pub trait Resources: Send + Sync + 'static {
    type Db: Clone + Send + Sync + 'static;
    type Authorizer: Clone + Send + Sync + 'static;
    type Scheduler: Clone + Send + Sync + 'static;
    type Middleware: Clone + Send + Sync + 'static;
    type App: Clone + Send + Sync + 'static;
}

/// Policy check consumed by request handlers.
pub trait Authorizer: Send + Sync {
    fn enforce(&self, subject: &str, object: &str, action: &str) -> bool;
}

/// Background job scheduler lifecycle.
pub trait Scheduler: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Stock handle set: PostgreSQL pools and trait-object collaborators.
pub struct PgResources;

impl Resources for PgResources {
    type Db = sqlx::PgPool;
    type Authorizer = Arc<dyn Authorizer>;
    type Scheduler = Arc<dyn Scheduler>;
    type Middleware = Arc<dyn Any + Send + Sync>;
    type App = Arc<dyn Any + Send + Sync>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Database,
    Authorizer,
    AuthorizerExclude,
    Scheduler,
    Cache,
    Queue,
    Locker,
    Middleware,
    App,
    Config,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Database => "database",
            ResourceKind::Authorizer => "authorizer",
            ResourceKind::AuthorizerExclude => "authorizer exclusions",
            ResourceKind::Scheduler => "scheduler",
            ResourceKind::Cache => "cache adapter",
            ResourceKind::Queue => "queue adapter",
            ResourceKind::Locker => "locker adapter",
            ResourceKind::Middleware => "middleware",
            ResourceKind::App => "app",
            ResourceKind::Config => "config",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request that bypasses authorization. `path` ending in `*` matches by prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeRule {
    pub method: String,
    pub path: String,
}

impl ExcludeRule {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        ExcludeRule {
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn matches(&self, method: &str, path: &str) -> bool {
        if !self.method.eq_ignore_ascii_case(method) {
            return false;
        }
        match self.path.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => self.path == path,
        }
    }
}
