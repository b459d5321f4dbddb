//! Creator identity resolution.
//!
//! The identity stamped on a new issue is resolved once per request by the
//! caller and passed explicitly into intake. Resolution priority:
//! 1. `--user` CLI flag or `X-Tracklet-User` header (explicit override)
//! 2. `TRACKLET_USER` environment variable
//! 3. `[identity] user` in `.tracklet/config.toml`
//! 4. [`ANONYMOUS`]

use crate::config::IdentityConfig;
use crate::domain::ANONYMOUS;
use std::env;
use std::fmt;

/// Environment variable consulted by [`EnvIdentity::default`].
pub const USER_ENV_VAR: &str = "TRACKLET_USER";

/// Source of the currently authenticated user, if any.
pub trait IdentityProvider {
    fn current_user(&self) -> Option<String>;
}

/// A fixed identity, e.g. from a CLI flag or request header.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<String>);

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Identity read from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvIdentity {
    var: String,
}

impl EnvIdentity {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvIdentity {
    fn default() -> Self {
        Self::new(USER_ENV_VAR)
    }
}

impl IdentityProvider for EnvIdentity {
    fn current_user(&self) -> Option<String> {
        env::var(&self.var).ok()
    }
}

impl IdentityProvider for IdentityConfig {
    fn current_user(&self) -> Option<String> {
        self.user.clone()
    }
}

/// Tries each provider in order and takes the first non-blank answer.
pub struct IdentityChain<'a> {
    providers: Vec<&'a dyn IdentityProvider>,
}

impl<'a> IdentityChain<'a> {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn with(mut self, provider: &'a dyn IdentityProvider) -> Self {
        self.providers.push(provider);
        self
    }
}

impl Default for IdentityChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for IdentityChain<'_> {
    fn current_user(&self) -> Option<String> {
        self.providers.iter().find_map(|p| {
            p.current_user()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
        })
    }
}

/// The identity resolved for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(Option<String>);

impl Identity {
    pub fn resolve(provider: &dyn IdentityProvider) -> Self {
        Self(
            provider
                .current_user()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
        )
    }

    pub fn user(user: impl Into<String>) -> Self {
        Self(Some(user.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }

    /// Value for the `createdBy` field.
    pub fn created_by(&self) -> &str {
        self.0.as_deref().unwrap_or(ANONYMOUS)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.created_by())
    }
}

/// Resolve the identity for a request using the standard priority order.
pub fn resolve_identity(explicit: Option<String>, config: &IdentityConfig) -> Identity {
    let flag = StaticIdentity(explicit);
    let env = EnvIdentity::default();
    let chain = IdentityChain::new().with(&flag).with(&env).with(config);
    Identity::resolve(&chain)
}
