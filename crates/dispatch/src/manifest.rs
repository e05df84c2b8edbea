//! Exposure manifests: which capabilities a module exposes, under which verb,
//! behind which middleware.

use core::str::FromStr;
use std::collections::HashSet;

use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Verb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ManifestError;

    /// Case-insensitive, so HTTP method names parse directly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ManifestError::UnknownVerb(s.to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("unknown verb '{0}'")]
    UnknownVerb(String),

    #[error("malformed manifest entry '{0}' (expected '<verb>=<capability>')")]
    Malformed(String),

    #[error("capability '{0}' exposed more than once")]
    DuplicateCapability(String),
}

/// One exposed capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exposure {
    pub verb: Verb,
    pub capability: String,
    /// Middleware run after the global pre-stack, in order.
    pub stack: Vec<String>,
}

/// Immutable list of a module's exposed capabilities. Capability names are
/// unique within a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposureManifest {
    entries: Vec<Exposure>,
}

impl ExposureManifest {
    pub fn builder() -> ManifestBuilder {
        ManifestBuilder::default()
    }

    /// A manifest exposing nothing (internal-only modules).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the compact `"<verb>=<capability>"` form. Entries parsed this
    /// way carry no capability-specific middleware.
    pub fn parse<I, S>(entries: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = Self::builder();
        for entry in entries {
            let entry = entry.as_ref();
            let (verb, capability) = entry
                .split_once('=')
                .filter(|(v, c)| !v.trim().is_empty() && !c.trim().is_empty())
                .ok_or_else(|| ManifestError::Malformed(entry.to_string()))?;
            builder = builder.expose(verb.trim().parse()?, capability.trim());
        }
        builder.build()
    }

    pub fn entries(&self) -> &[Exposure] {
        &self.entries
    }

    pub fn lookup(&self, verb: Verb, capability: &str) -> Option<&Exposure> {
        self.entries
            .iter()
            .find(|e| e.verb == verb && e.capability == capability)
    }

    pub fn exposes(&self, verb: Verb, capability: &str) -> bool {
        self.lookup(verb, capability).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    entries: Vec<Exposure>,
}

impl ManifestBuilder {
    pub fn expose(self, verb: Verb, capability: impl Into<String>) -> Self {
        self.expose_with(verb, capability, &[])
    }

    pub fn expose_with(mut self, verb: Verb, capability: impl Into<String>, stack: &[&str]) -> Self {
        self.entries.push(Exposure {
            verb,
            capability: capability.into(),
            stack: stack.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn build(self) -> Result<ExposureManifest, ManifestError> {
        let mut seen = HashSet::new();
        for e in &self.entries {
            if !seen.insert(e.capability.as_str()) {
                return Err(ManifestError::DuplicateCapability(e.capability.clone()));
            }
        }
        Ok(ExposureManifest {
            entries: self.entries,
        })
    }
}
