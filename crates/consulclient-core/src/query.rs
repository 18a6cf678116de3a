//! Request options and query-string assembly.
//!
//! [`QueryOptions`] and [`WriteOptions`] carry the datacenter and ACL token a
//! call is scoped to, plus the read-consistency knobs Consul understands.
//! [`QueryParams`] is the small builder used to turn them into URL pairs.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: &'static str, value: Option<T>)
    where
        T: ToString,
    {
        if let Some(value) = value {
            self.pairs.push((key, value.to_string()));
        }
    }

    /// Append using a mapping function when the value is present.
    pub fn push_opt_with<T, F>(&mut self, key: &'static str, value: Option<T>, mut map: F)
    where
        F: FnMut(T) -> String,
    {
        if let Some(value) = value {
            self.pairs.push((key, map(value)));
        }
    }

    /// Append a valueless flag such as `stale` when `enabled` is set.
    pub fn push_flag(&mut self, key: &'static str, enabled: bool) {
        if enabled {
            self.pairs.push((key, String::new()));
        }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Options for read requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Datacenter to query; the client default applies when unset
    pub datacenter: Option<String>,

    /// ACL token overriding the client default
    pub token: Option<String>,

    /// Allow any server, not just the leader, to answer
    pub allow_stale: bool,

    /// Force a consistent read through the leader
    pub require_consistent: bool,

    /// Sort results by round-trip time from this node (`_agent` for the local agent)
    pub near: Option<String>,

    /// Filter nodes by metadata key/value pairs
    pub node_meta: BTreeMap<String, String>,

    /// Blocking query index
    pub wait_index: Option<u64>,

    /// Maximum blocking time
    pub wait_time: Option<Duration>,
}

impl QueryOptions {
    /// Create options scoped to `datacenter` and `token`; empty strings mean unset.
    #[must_use]
    pub fn new(datacenter: &str, token: &str) -> Self {
        Self {
            datacenter: non_empty(datacenter),
            token: non_empty(token),
            ..Self::default()
        }
    }

    /// Token to send, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Render the options as URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_opt("dc", self.datacenter.as_deref());
        params.push_flag("stale", self.allow_stale);
        params.push_flag("consistent", self.require_consistent);
        params.push_opt("near", self.near.as_deref());
        for (key, value) in &self.node_meta {
            params.push("node-meta", format!("{key}:{value}"));
        }
        params.push_opt("index", self.wait_index.filter(|index| *index > 0));
        params.push_opt_with("wait", self.wait_time, |wait| {
            format!("{}ms", wait.as_millis())
        });
        params.into_pairs()
    }
}

/// Options for write requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Datacenter to write to; the client default applies when unset
    pub datacenter: Option<String>,

    /// ACL token overriding the client default
    pub token: Option<String>,
}

impl WriteOptions {
    /// Create options scoped to `datacenter` and `token`; empty strings mean unset.
    #[must_use]
    pub fn new(datacenter: &str, token: &str) -> Self {
        Self {
            datacenter: non_empty(datacenter),
            token: non_empty(token),
        }
    }

    /// Token to send, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Render the options as URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_opt("dc", self.datacenter.as_deref());
        params.into_pairs()
    }
}
