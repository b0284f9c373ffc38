//! Command definitions
//!
//! A command is one store operation described as data, so front ends (the
//! CLI) can build it and route it through [`CacheStore::execute`].
//!
//! [`CacheStore::execute`]: crate::store::CacheStore::execute

use std::fmt;

use crate::value::Value;

/// A parsed command
#[derive(Debug, Clone)]
pub enum Command {
    /// Get a value by key
    Get { namespace: String, key: Value },

    /// Insert or replace a value
    Set {
        namespace: String,
        key: Value,
        value: Value,
    },

    /// Delete a key
    Delete { namespace: String, key: Value },

    /// Delete a key and return its value
    Take { namespace: String, key: Value },

    /// Check whether a key is present
    Exists { namespace: String, key: Value },

    /// List the keys of a namespace
    Keys { namespace: String },

    /// Count the entries of a namespace
    Size { namespace: String },

    /// Delete every entry of a namespace
    Clear { namespace: String },

    /// Add to a counter, seeding it if absent
    Increment {
        namespace: String,
        key: Value,
        count: Value,
        initial: Value,
    },
}

impl Command {
    /// Whether running this command may change table contents
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Set { .. }
                | Command::Delete { .. }
                | Command::Take { .. }
                | Command::Clear { .. }
                | Command::Increment { .. }
        )
    }
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Success with nothing to report
    Ok,

    /// A looked-up value (None = absent)
    Value(Option<Value>),

    Bool(bool),

    Keys(Vec<Value>),

    Count(usize),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => write!(f, "OK"),
            Reply::Value(Some(value)) => write!(f, "{}", value),
            Reply::Value(None) => write!(f, "(absent)"),
            Reply::Bool(b) => write!(f, "{}", b),
            Reply::Keys(keys) => {
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", key)?;
                }
                Ok(())
            }
            Reply::Count(n) => write!(f, "{}", n),
        }
    }
}
