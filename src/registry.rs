//! Named resource registry loaded from configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ResolveError, ResolveResult};

/// One or more precomputed SRI tokens attached to a remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RemoteHash {
  /// A single token, returned verbatim.
  One(String),
  /// Several tokens, returned space-separated in the listed order.
  Many(Vec<String>),
}

impl RemoteHash {
  /// Integrity attribute value for this hash.
  pub fn joined(&self) -> String {
    match self {
      Self::One(hash) => hash.clone(),
      Self::Many(hashes) => hashes.join(" "),
    }
  }
}

/// A registry entry, classified once by shape when the registry is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ResourceDescriptor {
  /// Resource hosted elsewhere, served with its configured URL and hash.
  Remote {
    /// Absolute URL of the resource.
    url: String,
    /// Caller-supplied SRI hash(es), never recomputed.
    hash: RemoteHash,
  },
  /// File relative to the local path prefix.
  Local(String),
}

impl ResourceDescriptor {
  /// Convenience constructor for a remote entry with a single hash.
  pub fn remote(url: impl Into<String>, hash: impl Into<String>) -> Self {
    Self::Remote {
      url: url.into(),
      hash: RemoteHash::One(hash.into()),
    }
  }

  /// Convenience constructor for a local entry.
  pub fn local(path: impl Into<String>) -> Self {
    Self::Local(path.into())
  }
}

/// Mapping from resource names to their descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Registry {
  entries: BTreeMap<String, ResourceDescriptor>,
}

impl Registry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `descriptor` under `name`, replacing any previous entry.
  pub fn insert(&mut self, name: impl Into<String>, descriptor: ResourceDescriptor) {
    self.entries.insert(name.into(), descriptor);
  }

  /// Builder-style variant of [`Registry::insert`].
  pub fn with(mut self, name: impl Into<String>, descriptor: ResourceDescriptor) -> Self {
    self.insert(name, descriptor);
    self
  }

  /// Look up a resource by name.
  pub fn get(&self, name: &str) -> ResolveResult<&ResourceDescriptor> {
    self
      .entries
      .get(name)
      .ok_or_else(|| ResolveError::ResourceNotFound(name.to_string()))
  }

  /// Local path of the named resource, failing for unknown or remote entries.
  pub fn local_path(&self, name: &str) -> ResolveResult<&str> {
    match self.get(name)? {
      ResourceDescriptor::Local(path) => Ok(path),
      ResourceDescriptor::Remote { .. } => Err(ResolveError::NotLocal(name.to_string())),
    }
  }

  /// Number of registered resources.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when nothing is registered.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl FromIterator<(String, ResourceDescriptor)> for Registry {
  fn from_iter<I: IntoIterator<Item = (String, ResourceDescriptor)>>(iter: I) -> Self {
    Self {
      entries: iter.into_iter().collect(),
    }
  }
}
