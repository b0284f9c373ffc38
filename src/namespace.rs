//! Namespace Module
//!
//! Namespaces partition the shared table into independent logical caches.
//! A namespace is never created or destroyed explicitly: it exists while at
//! least one entry carries its name.
//!
//! ## Identifier Rules
//! - Non-empty
//! - First character: ASCII letter or `_`
//! - Remaining characters: ASCII alphanumerics, `_` or `.`
//!
//! The length limit is configurable and enforced by the store.
//!
//! ## Accepted Argument Kinds
//! Rust has no separate symbol type, so `&str` and `String` arguments play
//! the role of identifier tokens: they are accepted when they follow the
//! identifier rules and rejected otherwise. A dynamic [`Value`] must be a
//! `Value::Symbol`; a `Value::Str` is free-form text and is always rejected,
//! even when its contents would be a valid identifier.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::value::Value;

/// A validated namespace identifier
///
/// Cloning is a reference-count bump, so namespaces are cheap to embed in
/// every stored entry key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(Arc<str>);

impl Namespace {
    /// Validate `name` and build a namespace from it
    pub fn new(name: &str) -> Result<Self> {
        if !Self::is_valid(name) {
            return Err(CacheError::InvalidNamespace(format!(
                "{:?} is not a valid identifier",
                name
            )));
        }
        Ok(Self(Arc::from(name)))
    }

    /// Check `name` against the identifier rules
    pub fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the identifier in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", &self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = CacheError;

    fn try_from(name: String) -> Result<Self> {
        Namespace::new(&name)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0.to_string()
    }
}

// =============================================================================
// Input Validation
// =============================================================================

/// Anything an operation accepts as its namespace argument
///
/// Conversion is where the argument is validated: strings must be valid
/// identifiers, and dynamic values must be symbols. Any other kind of value
/// is rejected with [`CacheError::InvalidNamespace`].
pub trait IntoNamespace {
    fn into_namespace(self) -> Result<Namespace>;
}

impl IntoNamespace for Namespace {
    fn into_namespace(self) -> Result<Namespace> {
        Ok(self)
    }
}

impl IntoNamespace for &Namespace {
    fn into_namespace(self) -> Result<Namespace> {
        Ok(self.clone())
    }
}

impl IntoNamespace for &str {
    fn into_namespace(self) -> Result<Namespace> {
        Namespace::new(self)
    }
}

impl IntoNamespace for String {
    fn into_namespace(self) -> Result<Namespace> {
        Namespace::new(&self)
    }
}

impl IntoNamespace for &String {
    fn into_namespace(self) -> Result<Namespace> {
        Namespace::new(self)
    }
}

impl IntoNamespace for &Value {
    fn into_namespace(self) -> Result<Namespace> {
        match self {
            Value::Symbol(name) => Namespace::new(name),
            other => Err(CacheError::InvalidNamespace(format!(
                "expected a symbol, got {} {}",
                other.kind(),
                other
            ))),
        }
    }
}

impl IntoNamespace for Value {
    fn into_namespace(self) -> Result<Namespace> {
        (&self).into_namespace()
    }
}
