//! Process-wide registry of per-tenant resources.
//!
//! Every slot follows the same rule: a binding made under
//! [`WILDCARD_TENANT`](crate::tenant::WILDCARD_TENANT) wins
//! for every tenant, otherwise the tenant's own binding is used. Unscoped accessors
//! (`db()`, `set_db(..)`, ...) act on the current default tenant.
//!
//! One `RwLock` guards all slots, the default tenant, the logger and the callback
//! lists. Reads take it shared, writes exclusive; nothing blocks on I/O while it is held.

pub mod resources;

pub use resources::{Authorizer, ExcludeRule, PgResources, ResourceKind, Resources, Scheduler};

use crate::error::RuntimeError;
use crate::logger::{default_logger, Helper, Level, Logger};
use crate::storage::{
    CacheAdapter, LockerAdapter, MemoryQueue, Message, PrefixCache, PrefixQueue, QueueAdapter,
    DEFAULT_MEMORY_QUEUE_CAPACITY,
};
use crate::store::{Bindings, TenantStore};
use crate::tenant::{TenantKey, DEFAULT_TENANT};
use axum::Router;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Free-form configuration values of one tenant.
pub type ConfigBag = Map<String, Value>;

/// Startup hook or app-route hook. Executed by the caller, never by the runtime.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Adds a tenant's routes to a router.
pub type RouteRegistrar = Arc<dyn Fn(Router) -> Router + Send + Sync>;

struct Inner<R: Resources> {
    default_tenant: String,
    logger: Arc<dyn Logger>,
    dbs: TenantStore<R::Db>,
    authorizers: TenantStore<R::Authorizer>,
    authorizer_excludes: TenantStore<Vec<ExcludeRule>>,
    schedulers: TenantStore<R::Scheduler>,
    middlewares: TenantStore<R::Middleware>,
    apps: TenantStore<R::App>,
    configs: TenantStore<ConfigBag>,
    caches: TenantStore<Arc<dyn CacheAdapter>>,
    queues: TenantStore<Arc<dyn QueueAdapter>>,
    lockers: TenantStore<Arc<dyn LockerAdapter>>,
    handlers: HashMap<String, Vec<RouteRegistrar>>,
    engine: Option<Router>,
    before: Vec<Callback>,
    app_routers: Vec<Callback>,
}

pub struct Runtime<R: Resources = PgResources> {
    inner: RwLock<Inner<R>>,
    memory_queue: Arc<dyn QueueAdapter>,
}

/// Generates the accessor family of one tenant-keyed slot.
macro_rules! tenant_slot {
    (
        $kind:expr, $field:ident, $ty:ty,
        set_by_tenant: $set_by:ident,
        set: $set:ident,
        get_by_tenant: $get_by:ident,
        get: $get:ident,
        require: $require:ident,
        all: $all:ident,
        remove: $remove:ident $(,)?
    ) => {
        /// Bind for `tenant`; `"*"` binds for every tenant.
        pub fn $set_by(&self, tenant: &str, value: $ty) -> Result<(), RuntimeError> {
            let key = TenantKey::parse(tenant)?;
            self.bind($kind, key, value, |inner| &mut inner.$field);
            Ok(())
        }

        /// Bind for the current default tenant.
        pub fn $set(&self, value: $ty) {
            self.bind_default($kind, value, |inner| &mut inner.$field);
        }

        pub fn $get_by(&self, tenant: &str) -> Option<$ty> {
            self.lookup(tenant, |inner| &inner.$field)
        }

        pub fn $get(&self) -> Option<$ty> {
            self.lookup_default(|inner| &inner.$field)
        }

        pub fn $require(&self, tenant: &str) -> Result<$ty, RuntimeError> {
            self.$get_by(tenant).ok_or_else(|| RuntimeError::BindingMissing {
                kind: $kind,
                tenant: tenant.to_string(),
            })
        }

        pub fn $all(&self) -> Bindings<$ty> {
            self.read().$field.snapshot()
        }

        pub fn $remove(&self, tenant: &str) -> Result<Option<$ty>, RuntimeError> {
            let key = TenantKey::parse(tenant)?;
            Ok(self.unbind($kind, &key, |inner| &mut inner.$field))
        }
    };
}

impl<R: Resources> Runtime<R> {
    /// Empty registry, default tenant `"default"`, the process default logger and a
    /// memory queue sized to [`DEFAULT_MEMORY_QUEUE_CAPACITY`] per stream.
    pub fn new() -> Self {
        Runtime {
            inner: RwLock::new(Inner {
                default_tenant: DEFAULT_TENANT.to_string(),
                logger: default_logger(),
                dbs: TenantStore::new(),
                authorizers: TenantStore::new(),
                authorizer_excludes: TenantStore::new(),
                schedulers: TenantStore::new(),
                middlewares: TenantStore::new(),
                apps: TenantStore::new(),
                configs: TenantStore::new(),
                caches: TenantStore::new(),
                queues: TenantStore::new(),
                lockers: TenantStore::new(),
                handlers: HashMap::new(),
                engine: None,
                before: Vec::new(),
                app_routers: Vec::new(),
            }),
            memory_queue: Arc::new(MemoryQueue::new(DEFAULT_MEMORY_QUEUE_CAPACITY)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<R>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<R>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bind<T>(
        &self,
        kind: ResourceKind,
        key: TenantKey,
        value: T,
        slot: impl FnOnce(&mut Inner<R>) -> &mut TenantStore<T>,
    ) {
        let (logger, replaced) = {
            let mut inner = self.write();
            let replaced = slot(&mut *inner).set(key.clone(), value).is_some();
            (inner.logger.clone(), replaced)
        };
        log_binding(&*logger, kind, &key, replaced);
    }

    fn bind_default<T>(
        &self,
        kind: ResourceKind,
        value: T,
        slot: impl FnOnce(&mut Inner<R>) -> &mut TenantStore<T>,
    ) {
        let (logger, key, replaced) = {
            let mut inner = self.write();
            let key = default_key(&inner.default_tenant);
            let replaced = slot(&mut *inner).set(key.clone(), value).is_some();
            (inner.logger.clone(), key, replaced)
        };
        log_binding(&*logger, kind, &key, replaced);
    }

    fn unbind<T>(
        &self,
        kind: ResourceKind,
        key: &TenantKey,
        slot: impl FnOnce(&mut Inner<R>) -> &mut TenantStore<T>,
    ) -> Option<T> {
        let (logger, removed) = {
            let mut inner = self.write();
            let removed = slot(&mut *inner).remove(key);
            (inner.logger.clone(), removed)
        };
        if removed.is_some() {
            logger.logf(Level::Debug, format_args!("unbound {} for tenant {}", kind, key));
        }
        removed
    }

    fn lookup<T: Clone>(&self, tenant: &str, slot: impl FnOnce(&Inner<R>) -> &TenantStore<T>) -> Option<T> {
        if tenant.is_empty() {
            return None;
        }
        let inner = self.read();
        slot(&*inner).get(tenant).cloned()
    }

    fn lookup_default<T: Clone>(&self, slot: impl FnOnce(&Inner<R>) -> &TenantStore<T>) -> Option<T> {
        let inner = self.read();
        slot(&*inner).get(&inner.default_tenant).cloned()
    }

    tenant_slot!(
        ResourceKind::Database, dbs, R::Db,
        set_by_tenant: set_db_by_tenant,
        set: set_db,
        get_by_tenant: db_by_tenant,
        get: db,
        require: require_db,
        all: all_db,
        remove: remove_db_by_tenant,
    );

    tenant_slot!(
        ResourceKind::Authorizer, authorizers, R::Authorizer,
        set_by_tenant: set_authorizer_by_tenant,
        set: set_authorizer,
        get_by_tenant: authorizer_by_tenant,
        get: authorizer,
        require: require_authorizer,
        all: all_authorizer,
        remove: remove_authorizer_by_tenant,
    );

    tenant_slot!(
        ResourceKind::AuthorizerExclude, authorizer_excludes, Vec<ExcludeRule>,
        set_by_tenant: set_authorizer_exclude_by_tenant,
        set: set_authorizer_exclude,
        get_by_tenant: authorizer_exclude_by_tenant,
        get: authorizer_exclude,
        require: require_authorizer_exclude,
        all: all_authorizer_exclude,
        remove: remove_authorizer_exclude_by_tenant,
    );

    tenant_slot!(
        ResourceKind::Scheduler, schedulers, R::Scheduler,
        set_by_tenant: set_scheduler_by_tenant,
        set: set_scheduler,
        get_by_tenant: scheduler_by_tenant,
        get: scheduler,
        require: require_scheduler,
        all: all_scheduler,
        remove: remove_scheduler_by_tenant,
    );

    tenant_slot!(
        ResourceKind::Middleware, middlewares, R::Middleware,
        set_by_tenant: set_middleware_by_tenant,
        set: set_middleware,
        get_by_tenant: middleware_by_tenant,
        get: middleware,
        require: require_middleware,
        all: all_middleware,
        remove: remove_middleware_by_tenant,
    );

    tenant_slot!(
        ResourceKind::App, apps, R::App,
        set_by_tenant: set_app_by_tenant,
        set: set_app,
        get_by_tenant: app_by_tenant,
        get: app,
        require: require_app,
        all: all_app,
        remove: remove_app_by_tenant,
    );

    tenant_slot!(
        ResourceKind::Config, configs, ConfigBag,
        set_by_tenant: set_config_by_tenant,
        set: set_config,
        get_by_tenant: config_by_tenant,
        get: config,
        require: require_config,
        all: all_config,
        remove: remove_config_by_tenant,
    );

    tenant_slot!(
        ResourceKind::Cache, caches, Arc<dyn CacheAdapter>,
        set_by_tenant: set_cache_adapter_by_tenant,
        set: set_cache_adapter,
        get_by_tenant: cache_adapter_by_tenant,
        get: cache_adapter,
        require: require_cache_adapter,
        all: all_cache_adapter,
        remove: remove_cache_adapter_by_tenant,
    );

    tenant_slot!(
        ResourceKind::Queue, queues, Arc<dyn QueueAdapter>,
        set_by_tenant: set_queue_adapter_by_tenant,
        set: set_queue_adapter,
        get_by_tenant: queue_adapter_by_tenant,
        get: queue_adapter,
        require: require_queue_adapter,
        all: all_queue_adapter,
        remove: remove_queue_adapter_by_tenant,
    );

    tenant_slot!(
        ResourceKind::Locker, lockers, Arc<dyn LockerAdapter>,
        set_by_tenant: set_locker_adapter_by_tenant,
        set: set_locker_adapter,
        get_by_tenant: locker_adapter_by_tenant,
        get: locker_adapter,
        require: require_locker_adapter,
        all: all_locker_adapter,
        remove: remove_locker_adapter_by_tenant,
    );

    /// Changes the tenant every unscoped accessor resolves to. No binding moves.
    /// `"*"` is rejected: unscoped setters would otherwise install global overrides.
    pub fn set_default_tenant(&self, tenant: &str) -> Result<(), RuntimeError> {
        if TenantKey::parse(tenant)?.is_all() {
            return Err(RuntimeError::WildcardDefaultTenant);
        }
        let logger = {
            let mut inner = self.write();
            inner.default_tenant = tenant.to_string();
            inner.logger.clone()
        };
        logger.logf(Level::Debug, format_args!("default tenant set to {}", tenant));
        Ok(())
    }

    pub fn default_tenant(&self) -> String {
        self.read().default_tenant.clone()
    }

    /// Set one config value, creating the tenant's bag on first write.
    pub fn set_config_value_by_tenant(
        &self,
        tenant: &str,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let tenant = TenantKey::parse(tenant)?;
        self.write()
            .configs
            .get_or_insert_with(tenant, ConfigBag::new)
            .insert(key.into(), value);
        Ok(())
    }

    pub fn set_config_value(&self, key: impl Into<String>, value: Value) {
        let mut inner = self.write();
        let tenant = default_key(&inner.default_tenant);
        inner
            .configs
            .get_or_insert_with(tenant, ConfigBag::new)
            .insert(key.into(), value);
    }

    pub fn config_value_by_tenant(&self, tenant: &str, key: &str) -> Option<Value> {
        if tenant.is_empty() {
            return None;
        }
        self.read().configs.get(tenant)?.get(key).cloned()
    }

    pub fn config_value(&self, key: &str) -> Option<Value> {
        let inner = self.read();
        inner.configs.get(&inner.default_tenant)?.get(key).cloned()
    }

    /// Default tenant's cache, keys rewritten to `prefix:key`. The backend is shared.
    pub fn cache_adapter_prefix(&self, prefix: &str) -> Option<Arc<dyn CacheAdapter>> {
        let raw = self.cache_adapter()?;
        Some(Arc::new(PrefixCache::new(prefix, raw)))
    }

    /// `tenant`'s cache, keys rewritten to `tenant:key`.
    pub fn tenant_cache(&self, tenant: &str) -> Option<Arc<dyn CacheAdapter>> {
        let raw = self.cache_adapter_by_tenant(tenant)?;
        Some(Arc::new(PrefixCache::new(tenant, raw)))
    }

    /// Default tenant's queue, streams rewritten to `key:stream`. The backend is shared.
    pub fn queue_prefix(&self, key: &str) -> Option<Arc<dyn QueueAdapter>> {
        let raw = self.queue_adapter()?;
        Some(Arc::new(PrefixQueue::new(key, raw)))
    }

    /// [`Runtime::queue_prefix`] with the default tenant as prefix.
    pub fn queue(&self) -> Option<Arc<dyn QueueAdapter>> {
        let (raw, tenant) = {
            let inner = self.read();
            let raw = inner.queues.get(&inner.default_tenant).cloned();
            (raw, inner.default_tenant.clone())
        };
        Some(Arc::new(PrefixQueue::new(tenant, raw?)))
    }

    pub fn tenant_queue(&self, tenant: &str) -> Option<Arc<dyn QueueAdapter>> {
        let raw = self.queue_adapter_by_tenant(tenant)?;
        Some(Arc::new(PrefixQueue::new(tenant, raw)))
    }

    /// Built-in in-process queue, streams rewritten to `prefix:stream`.
    pub fn memory_queue(&self, prefix: &str) -> Arc<dyn QueueAdapter> {
        Arc::new(PrefixQueue::new(prefix, self.memory_queue.clone()))
    }

    /// Message for handoff to a queue adapter. No I/O.
    pub fn stream_message(&self, id: impl Into<String>, stream: impl Into<String>, values: Map<String, Value>) -> Message {
        Message::new(id, stream, values)
    }

    /// True when `tenant`'s exclusion rules let `method path` skip authorization.
    pub fn is_authorization_excluded(&self, tenant: &str, method: &str, path: &str) -> bool {
        if tenant.is_empty() {
            return false;
        }
        self.read()
            .authorizer_excludes
            .get(tenant)
            .is_some_and(|rules| rules.iter().any(|r| r.matches(method, path)))
    }

    pub fn set_handler<F>(&self, registrar: F)
    where
        F: Fn(Router) -> Router + Send + Sync + 'static,
    {
        let mut inner = self.write();
        let tenant = inner.default_tenant.clone();
        inner.handlers.entry(tenant).or_default().push(Arc::new(registrar));
    }

    /// Append a route registrar for `tenant`. Registrars are never removed.
    pub fn set_handler_by_tenant<F>(&self, tenant: &str, registrar: F) -> Result<(), RuntimeError>
    where
        F: Fn(Router) -> Router + Send + Sync + 'static,
    {
        if tenant.is_empty() {
            return Err(RuntimeError::EmptyTenant);
        }
        self.write()
            .handlers
            .entry(tenant.to_string())
            .or_default()
            .push(Arc::new(registrar));
        Ok(())
    }

    pub fn handlers(&self) -> Vec<RouteRegistrar> {
        let inner = self.read();
        inner
            .handlers
            .get(&inner.default_tenant)
            .cloned()
            .unwrap_or_default()
    }

    pub fn handlers_by_tenant(&self, tenant: &str) -> Vec<RouteRegistrar> {
        self.read().handlers.get(tenant).cloned().unwrap_or_default()
    }

    pub fn all_handlers(&self) -> HashMap<String, Vec<RouteRegistrar>> {
        self.read().handlers.clone()
    }

    /// Router built by applying `tenant`'s registrars in registration order.
    pub fn tenant_router(&self, tenant: &str) -> Router {
        self.handlers_by_tenant(tenant)
            .iter()
            .fold(Router::new(), |router, registrar| registrar(router))
    }

    pub fn set_engine(&self, engine: Router) {
        self.write().engine = Some(engine);
    }

    pub fn engine(&self) -> Option<Router> {
        self.read().engine.clone()
    }

    pub fn set_logger(&self, logger: Arc<dyn Logger>) {
        self.write().logger = logger;
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        self.read().logger.clone()
    }

    pub fn log(&self) -> Helper {
        Helper::new(self.logger())
    }

    pub fn set_before<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.write().before.push(Arc::new(f));
    }

    /// Startup hooks in registration order.
    pub fn before(&self) -> Vec<Callback> {
        self.read().before.clone()
    }

    pub fn set_app_routers<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.write().app_routers.push(Arc::new(f));
    }

    pub fn app_routers(&self) -> Vec<Callback> {
        self.read().app_routers.clone()
    }
}

impl<R: Resources> Default for Runtime<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn default_key(default_tenant: &str) -> TenantKey {
    TenantKey::parse(default_tenant).unwrap_or_else(|_| TenantKey::Tenant(DEFAULT_TENANT.to_string()))
}

fn log_binding(logger: &dyn Logger, kind: ResourceKind, key: &TenantKey, replaced: bool) {
    let verb = if replaced { "rebound" } else { "bound" };
    logger.logf(Level::Debug, format_args!("{} {} for tenant {}", verb, kind, key));
}
