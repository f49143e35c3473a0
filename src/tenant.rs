//! Tenant identifiers: the default tenant name and the wildcard selector.

use crate::error::RuntimeError;
use std::fmt;

/// Tenant used by unscoped accessors until [`crate::Runtime::set_default_tenant`] changes it.
pub const DEFAULT_TENANT: &str = "default";

/// Reserved tenant argument meaning "every tenant". Never stored as a map key.
pub const WILDCARD_TENANT: &str = "*";

/// Parsed tenant argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TenantKey {
    /// Binding shadows every tenant-specific binding of the same kind.
    All,
    Tenant(String),
}

impl TenantKey {
    /// `"*"` selects [`TenantKey::All`]; the empty string is rejected.
    pub fn parse(tenant: &str) -> Result<Self, RuntimeError> {
        match tenant {
            "" => Err(RuntimeError::EmptyTenant),
            WILDCARD_TENANT => Ok(TenantKey::All),
            id => Ok(TenantKey::Tenant(id.to_string())),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, TenantKey::All)
    }
}

impl std::str::FromStr for TenantKey {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TenantKey::parse(s)
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantKey::All => f.write_str(WILDCARD_TENANT),
            TenantKey::Tenant(id) => f.write_str(id),
        }
    }
}
