//! Static route table: `(verb, path template) -> RouteDescriptor`.
//!
//! Built once at startup and shared read-only across requests. Path matching
//! itself belongs to the HTTP router; this table is keyed by the template the
//! router reports (e.g. `/offers/:id`).

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use core::str::FromStr;
use thiserror::Error;

use crate::RoleTag;

/// HTTP verbs the marketplace routes use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for Verb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = RouteTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            "DELETE" => Ok(Verb::Delete),
            other => Err(RouteTableError::UnsupportedVerb(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("route {verb} {path} is registered twice")]
    Duplicate { verb: Verb, path: String },

    #[error("unsupported HTTP verb '{0}'")]
    UnsupportedVerb(String),
}

/// Access policy for one endpoint.
///
/// Defaults to "authentication required, any role". `roles` is an ordered set
/// matched with OR semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    operation: &'static str,
    public: bool,
    roles: Vec<RoleTag>,
}

impl RouteDescriptor {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            public: false,
            roles: Vec::new(),
        }
    }

    /// Allow anonymous access.
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Restrict to principals holding at least one of `roles`.
    pub fn roles(mut self, roles: impl IntoIterator<Item = RoleTag>) -> Self {
        for role in roles {
            if !self.roles.contains(&role) {
                self.roles.push(role);
            }
        }
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Empty means "any authenticated principal".
    pub fn required_roles(&self) -> &[RoleTag] {
        &self.roles
    }
}

impl Default for RouteDescriptor {
    fn default() -> Self {
        Self::new("unmapped")
    }
}

#[derive(Debug, Default)]
pub struct RouteTable {
    by_verb: HashMap<Verb, HashMap<String, RouteDescriptor>>,
    fallback: RouteDescriptor,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<P>(
        entries: impl IntoIterator<Item = (Verb, P, RouteDescriptor)>,
    ) -> Result<Self, RouteTableError>
    where
        P: Into<String>,
    {
        let mut table = Self::new();
        for (verb, path, descriptor) in entries {
            table.insert(verb, path, descriptor)?;
        }
        Ok(table)
    }

    pub fn insert(
        &mut self,
        verb: Verb,
        path: impl Into<String>,
        descriptor: RouteDescriptor,
    ) -> Result<(), RouteTableError> {
        match self.by_verb.entry(verb).or_default().entry(path.into()) {
            Entry::Occupied(e) => Err(RouteTableError::Duplicate {
                verb,
                path: e.key().clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(descriptor);
                Ok(())
            }
        }
    }

    pub fn get(&self, verb: Verb, path: &str) -> Option<&RouteDescriptor> {
        self.by_verb.get(&verb)?.get(path)
    }

    /// Descriptor for a matched route, or the authenticated-only fallback.
    pub fn resolve(&self, verb: Verb, path: &str) -> &RouteDescriptor {
        match self.get(verb, path) {
            Some(d) => d,
            None => {
                tracing::warn!(%verb, path, "route has no descriptor; requiring authentication");
                &self.fallback
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_verb.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_verb.values().all(HashMap::is_empty)
    }

    /// Entries sorted by path then verb.
    pub fn entries(&self) -> Vec<(Verb, &str, &RouteDescriptor)> {
        let mut out: Vec<_> = self
            .by_verb
            .iter()
            .flat_map(|(verb, paths)| paths.iter().map(|(path, d)| (*verb, path.as_str(), d)))
            .collect();
        out.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(&b.0)));
        out
    }
}
