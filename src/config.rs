//! Resolver configuration and its on-disk JSON/YAML representation.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::error::ResolveError;
use crate::hashing::HashAlgorithm;
use crate::registry::Registry;

const CONFIG_FILE_CANDIDATES: [&str; 3] = ["sri.config.json", "sri.config.yaml", "sri.config.yml"];

/// How local resources are served.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq)]
pub enum LocalMode {
  /// Serve the source file from its own path.
  #[default]
  Direct,
  /// Copy or concatenate sources into a digest-named file under the build prefix.
  Build,
}

impl LocalMode {
  /// Configuration name of the mode.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Direct => "direct",
      Self::Build => "build",
    }
  }
}

impl fmt::Display for LocalMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for LocalMode {
  type Err = ResolveError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim() {
      "direct" => Ok(Self::Direct),
      "build" => Ok(Self::Build),
      _ => Err(ResolveError::UnknownMode(value.to_string())),
    }
  }
}

impl From<LocalMode> for String {
  fn from(mode: LocalMode) -> Self {
    mode.as_str().to_string()
  }
}

/// URL and filesystem prefixes for local resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocalPrefix {
  /// Prefix prepended to local and built resource URLs.
  pub url: String,
  /// Directory, relative to the working root, holding local source files.
  pub path: String,
  /// Folder under `path` receiving build artifacts, also used as URL segment.
  pub build: String,
}

impl LocalPrefix {
  /// Create a prefix set.
  pub fn new(url: impl Into<String>, path: impl Into<String>, build: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      path: path.into(),
      build: build.into(),
    }
  }
}

/// Single algorithm name or list of names, as accepted in configuration files.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AlgorithmList {
  One(String),
  Many(Vec<String>),
}

impl Default for AlgorithmList {
  fn default() -> Self {
    Self::One(HashAlgorithm::default().name().to_string())
  }
}

/// Raw configuration file layout before algorithm names are validated.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ResolverConfigFile {
  resources: Registry,
  local_prefix: LocalPrefix,
  local_mode: Option<String>,
  hashing_algos: AlgorithmList,
  root: Option<PathBuf>,
}

/// Immutable resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
  /// Named resources.
  pub resources: Registry,
  /// Prefixes applied to local resources.
  pub local_prefix: LocalPrefix,
  /// Name of the mode used for local resources, see [`ResolverConfig::mode`].
  pub local_mode: String,
  /// Algorithms used for locally computed hashes, in output order.
  pub hashing_algos: Vec<HashAlgorithm>,
  /// Working root for local paths; the process working directory when unset.
  pub root: Option<PathBuf>,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self::new(Registry::default())
  }
}

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Failed to read the configuration file from disk.
  #[error("failed to read {}: {source}", .path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    #[source]
    source: std::io::Error,
  },
  /// Failed to parse a JSON configuration file.
  #[error("failed to parse {}: {source}", .path.display())]
  Json {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    #[source]
    source: serde_json::Error,
  },
  /// Failed to parse a YAML configuration file.
  #[error("failed to parse {}: {source}", .path.display())]
  Yaml {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    #[source]
    source: serde_yaml::Error,
  },
  /// The file parsed but names an unknown algorithm.
  #[error(transparent)]
  Invalid(#[from] ResolveError),
}

impl ResolverConfig {
  /// Configuration with default prefixes, direct mode and SHA-256.
  pub fn new(resources: Registry) -> Self {
    Self {
      resources,
      local_prefix: LocalPrefix::default(),
      local_mode: LocalMode::default().into(),
      hashing_algos: vec![HashAlgorithm::default()],
      root: None,
    }
  }

  /// Replace the local prefixes.
  pub fn with_local_prefix(mut self, prefix: LocalPrefix) -> Self {
    self.local_prefix = prefix;
    self
  }

  /// Replace the local mode, either a [`LocalMode`] or a raw name.
  pub fn with_local_mode(mut self, mode: impl Into<String>) -> Self {
    self.local_mode = mode.into();
    self
  }

  /// Parsed local mode.
  ///
  /// Unknown names are kept as configured and only rejected here, so remote resources keep
  /// resolving under a misconfigured mode.
  pub fn mode(&self) -> Result<LocalMode, ResolveError> {
    self.local_mode.parse()
  }

  /// Replace the hashing algorithms.
  pub fn with_hashing_algos(mut self, algos: impl IntoIterator<Item = HashAlgorithm>) -> Self {
    self.hashing_algos = algos.into_iter().collect();
    self
  }

  /// Pin the working root instead of using the process working directory.
  pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.root = Some(root.into());
    self
  }

  /// Load configuration from the first known config file in `dir`.
  ///
  /// Returns the default configuration when no candidate exists.
  pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
    CONFIG_FILE_CANDIDATES
      .iter()
      .map(|name| dir.join(name))
      .find(|candidate| candidate.is_file())
      .map_or_else(|| Ok(Self::default()), |path| Self::from_path(&path))
  }

  /// Read configuration from a JSON file, or YAML when the extension is `.yaml`/`.yml`.
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    let is_yaml = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let file: ResolverConfigFile = if is_yaml {
      serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
      })?
    } else {
      serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
      })?
    };

    let mut config = Self::try_from(file)?;
    if let Some(root) = config.root.take() {
      let base = path.parent().unwrap_or(Path::new(""));
      config.root = Some(base.join(root));
    }
    Ok(config)
  }

  /// Parse configuration from a JSON string.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let file: ResolverConfigFile =
      serde_json::from_str(content).map_err(|source| ConfigError::Json {
        path: PathBuf::new(),
        source,
      })?;
    Ok(Self::try_from(file)?)
  }
}

impl TryFrom<ResolverConfigFile> for ResolverConfig {
  type Error = ResolveError;

  fn try_from(file: ResolverConfigFile) -> Result<Self, Self::Error> {
    let names = match file.hashing_algos {
      AlgorithmList::One(name) => vec![name],
      AlgorithmList::Many(names) => names,
    };
    let hashing_algos = names
      .iter()
      .map(|name| name.parse())
      .collect::<Result<Vec<HashAlgorithm>, _>>()?;

    Ok(Self {
      resources: file.resources,
      local_prefix: file.local_prefix,
      local_mode: file
        .local_mode
        .unwrap_or_else(|| LocalMode::default().into()),
      hashing_algos,
      root: file.root,
    })
  }
}
