// SPDX-License-Identifier: MIT OR Apache-2.0
//! Qualified endpoint identifiers.
//!
//! Endpoint ids arrive on the wire as `namespace1.namespace2.Name.instance`
//! or `namespace.Name`. Parsing never fails: when no structure can be found
//! the whole id becomes the name.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Lowercase dotted namespace, capitalized name, optional instance suffix.
static STRICT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[a-z][a-z0-9_]*\.)*)([A-Z][A-Za-z0-9_]*)(?:\.([^.]+))?$")
        .expect("strict identifier pattern is valid")
});

/// Any dotted prefix, final segment is the name.
static LOOSE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[^.]+\.)*)([^.]+)$").expect("loose identifier pattern is valid")
});

/// Opaque key of an endpoint in the topology
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Wrap a raw identifier string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the identifier into namespace, name and instance
    pub fn parts(&self) -> IdentifierParts {
        parse(&self.0)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EndpointId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for EndpointId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Structural decomposition of an endpoint identifier, used for labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierParts {
    /// Dotted namespace prefix, including its trailing dot (may be empty)
    pub namespace: String,
    /// Terminal name component
    pub name: String,
    /// Trailing disambiguator (may be empty)
    pub instance: String,
}

impl IdentifierParts {
    /// Label lines in display order: namespace, name, instance
    pub fn label_lines(&self) -> [&str; 3] {
        [&self.namespace, &self.name, &self.instance]
    }
}

/// Parse an identifier string. Total and deterministic.
pub fn parse(id: &str) -> IdentifierParts {
    if let Some(caps) = STRICT_PATTERN.captures(id) {
        return IdentifierParts {
            namespace: caps[1].to_string(),
            name: caps[2].to_string(),
            instance: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
        };
    }

    if let Some(caps) = LOOSE_PATTERN.captures(id) {
        return IdentifierParts {
            namespace: caps[1].to_string(),
            name: caps[2].to_string(),
            instance: String::new(),
        };
    }

    IdentifierParts {
        namespace: String::new(),
        name: id.to_string(),
        instance: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_identifier() {
        let parts = parse("a.b.Name.inst");
        assert_eq!(parts.namespace, "a.b.");
        assert_eq!(parts.name, "Name");
        assert_eq!(parts.instance, "inst");
    }

    #[test]
    fn test_realistic_identifier() {
        let parts = parse("org.flexiblepower.simulation.pvpanel.PVPanelSimulation.1");
        assert_eq!(parts.namespace, "org.flexiblepower.simulation.pvpanel.");
        assert_eq!(parts.name, "PVPanelSimulation");
        assert_eq!(parts.instance, "1");
    }

    #[test]
    fn test_namespace_and_name_without_instance() {
        let parts = parse("namespace.Name");
        assert_eq!(parts.namespace, "namespace.");
        assert_eq!(parts.name, "Name");
        assert_eq!(parts.instance, "");
    }

    #[test]
    fn test_bare_name() {
        let parts = parse("Foo");
        assert_eq!(parts, IdentifierParts {
            namespace: String::new(),
            name: "Foo".to_string(),
            instance: String::new(),
        });
    }

    #[test]
    fn test_loose_fallback() {
        // Mixed-case namespace segments defeat the strict pattern
        let parts = parse("Org.Example.thing");
        assert_eq!(parts.namespace, "Org.Example.");
        assert_eq!(parts.name, "thing");
        assert_eq!(parts.instance, "");

        let parts = parse("pm");
        assert_eq!(parts.namespace, "");
        assert_eq!(parts.name, "pm");
    }

    #[test]
    fn test_degenerate_identifiers() {
        for id in ["", ".", "a..b", "trailing."] {
            let parts = parse(id);
            assert_eq!(parts.name, id);
            assert!(parts.namespace.is_empty());
            assert!(parts.instance.is_empty());
        }
    }

    #[test]
    fn test_endpoint_id_parts() {
        let id = EndpointId::new("org.example.Controller.main");
        assert_eq!(id.parts().label_lines(), ["org.example.", "Controller", "main"]);
        assert_eq!(id.to_string(), "org.example.Controller.main");
    }
}
