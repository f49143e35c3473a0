//! Tenant-keyed binding store: one optional global binding plus one binding per tenant.
//!
//! Lookup order is global first, then the tenant's own binding. A global binding shadows
//! tenant bindings without deleting them, so removing it makes them visible again.
//! The store holds no lock of its own; [`crate::Runtime`] guards every instance.

use crate::tenant::TenantKey;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct TenantStore<R> {
    global: Option<R>,
    tenants: HashMap<String, R>,
}

impl<R> Default for TenantStore<R> {
    fn default() -> Self {
        TenantStore {
            global: None,
            tenants: HashMap::new(),
        }
    }
}

impl<R> TenantStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the binding previously held under the same key.
    pub fn set(&mut self, key: TenantKey, value: R) -> Option<R> {
        match key {
            TenantKey::All => self.global.replace(value),
            TenantKey::Tenant(id) => self.tenants.insert(id, value),
        }
    }

    pub fn remove(&mut self, key: &TenantKey) -> Option<R> {
        match key {
            TenantKey::All => self.global.take(),
            TenantKey::Tenant(id) => self.tenants.remove(id),
        }
    }

    /// Effective binding for `tenant`: the global one if present, else the tenant's own.
    pub fn get(&self, tenant: &str) -> Option<&R> {
        self.global.as_ref().or_else(|| self.tenants.get(tenant))
    }

    /// Binding stored exactly under `key`, ignoring global precedence.
    pub fn get_exact(&self, key: &TenantKey) -> Option<&R> {
        match key {
            TenantKey::All => self.global.as_ref(),
            TenantKey::Tenant(id) => self.tenants.get(id),
        }
    }

    /// Mutable access to the binding stored exactly under `key`, creating it on first use.
    pub fn get_or_insert_with(&mut self, key: TenantKey, init: impl FnOnce() -> R) -> &mut R {
        match key {
            TenantKey::All => self.global.get_or_insert_with(init),
            TenantKey::Tenant(id) => self.tenants.entry(id).or_insert_with(init),
        }
    }

    pub fn len(&self) -> usize {
        self.tenants.len() + usize::from(self.global.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Clone> TenantStore<R> {
    pub fn snapshot(&self) -> Bindings<R> {
        Bindings {
            global: self.global.clone(),
            tenants: self.tenants.clone(),
        }
    }
}

/// Point-in-time copy of a store. Global precedence is not expanded into `tenants`.
#[derive(Clone, Debug)]
pub struct Bindings<R> {
    pub global: Option<R>,
    pub tenants: HashMap<String, R>,
}

impl<R> Bindings<R> {
    /// Same lookup rule as [`TenantStore::get`].
    pub fn resolve(&self, tenant: &str) -> Option<&R> {
        self.global.as_ref().or_else(|| self.tenants.get(tenant))
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_none() && self.tenants.is_empty()
    }
}
