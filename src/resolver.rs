//! Resolution of resource identifiers to public URLs and integrity hashes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::builder::FileBuilder;
use crate::config::{LocalMode, ResolverConfig};
use crate::error::{ResolveError, ResolveResult};
use crate::hashing;
use crate::markup::{self, Attribute};
use crate::paths;
use crate::registry::{RemoteHash, ResourceDescriptor};

/// Separator between resource names in a combo identifier such as `jquery+app`.
pub const COMBO_SEPARATOR: char = '+';

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
  mode: LocalMode,
  resource: String,
}

/// Location of a local resource, cached per mode and identifier.
#[derive(Debug)]
pub struct ResolvedResource {
  url: String,
  filename: PathBuf,
  integrity: OnceLock<String>,
}

impl ResolvedResource {
  fn new(url: String, filename: PathBuf) -> Self {
    Self {
      url,
      filename,
      integrity: OnceLock::new(),
    }
  }

  fn with_integrity(url: String, filename: PathBuf, integrity: String) -> Self {
    let resolved = Self::new(url, filename);
    let _ = resolved.integrity.set(integrity);
    resolved
  }

  /// Path relative to the local URL prefix.
  pub fn url(&self) -> &str {
    &self.url
  }

  /// Absolute path of the file that is served and hashed.
  pub fn filename(&self) -> &Path {
    &self.filename
  }
}

/// URL and integrity value of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  /// URL to reference from markup.
  pub url: String,
  /// Value of the `integrity` attribute.
  pub hash: String,
}

/// Resolves named resources against an immutable configuration.
///
/// Local resolutions are cached for the lifetime of the resolver. Concurrent misses on the
/// same identifier may both resolve; builds are deterministic, and the first result stored
/// is the one every caller sees afterwards.
#[derive(Debug)]
pub struct ResourceResolver {
  config: ResolverConfig,
  builder: FileBuilder,
  cache: RwLock<HashMap<CacheKey, Arc<ResolvedResource>>>,
}

impl ResourceResolver {
  /// Create a resolver, pinning the working root to the configured one or the process
  /// working directory.
  pub fn new(config: ResolverConfig) -> ResolveResult<Self> {
    let root = match &config.root {
      Some(root) => root.clone(),
      None => std::env::current_dir().map_err(|err| ResolveError::io(".", err))?,
    };

    Ok(Self {
      builder: FileBuilder::new(root),
      config,
      cache: RwLock::new(HashMap::new()),
    })
  }

  /// Configuration the resolver was created with.
  pub fn config(&self) -> &ResolverConfig {
    &self.config
  }

  /// Working root local paths are resolved against.
  pub fn root(&self) -> &Path {
    self.builder.root()
  }

  /// Public URL of `resource`.
  pub fn url(&self, resource: &str) -> ResolveResult<String> {
    if let Some((url, _)) = self.remote(resource)? {
      return Ok(url.to_string());
    }

    let local = self.local_file(resource)?;
    Ok(paths::public_url(&self.config.local_prefix.url, local.url()))
  }

  /// Integrity attribute value of `resource`.
  pub fn hash(&self, resource: &str) -> ResolveResult<String> {
    if let Some((_, hash)) = self.remote(resource)? {
      return Ok(hash.joined());
    }

    let local = self.local_file(resource)?;
    if let Some(hash) = local.integrity.get() {
      return Ok(hash.clone());
    }

    let content =
      fs::read(&local.filename).map_err(|err| ResolveError::io(&local.filename, err))?;
    let computed = hashing::integrity(&self.config.hashing_algos, &content);
    Ok(local.integrity.get_or_init(|| computed).clone())
  }

  /// URL and integrity value of `resource`.
  pub fn resolve(&self, resource: &str) -> ResolveResult<Resolution> {
    Ok(Resolution {
      url: self.url(resource)?,
      hash: self.hash(resource)?,
    })
  }

  /// `<script>` element for `resource`.
  pub fn script_tag(&self, resource: &str, attributes: &[Attribute]) -> ResolveResult<String> {
    let resolved = self.resolve(resource)?;
    Ok(markup::script(&resolved.url, &resolved.hash, attributes))
  }

  /// `<link rel="stylesheet">` element for `resource`.
  pub fn stylesheet_tag(&self, resource: &str, attributes: &[Attribute]) -> ResolveResult<String> {
    let resolved = self.resolve(resource)?;
    Ok(markup::stylesheet(&resolved.url, &resolved.hash, attributes))
  }

  /// `<link rel="preload">` element for `resource`.
  pub fn preload_tag(&self, resource: &str, attributes: &[Attribute]) -> ResolveResult<String> {
    let resolved = self.resolve(resource)?;
    Ok(markup::preload(&resolved.url, &resolved.hash, attributes))
  }

  /// Remote URL and hash when `resource` is a plain name registered as remote.
  fn remote(&self, resource: &str) -> ResolveResult<Option<(&str, &RemoteHash)>> {
    if is_combo(resource) {
      return Ok(None);
    }

    match self.config.resources.get(resource)? {
      ResourceDescriptor::Remote { url, hash } => Ok(Some((url.as_str(), hash))),
      ResourceDescriptor::Local(_) => Ok(None),
    }
  }

  fn local_file(&self, resource: &str) -> ResolveResult<Arc<ResolvedResource>> {
    let key = CacheKey {
      mode: self.config.mode()?,
      resource: resource.to_string(),
    };

    if let Some(hit) = self
      .cache
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key)
    {
      return Ok(Arc::clone(hit));
    }

    debug!(resource, mode = %key.mode, "resolving local resource");
    let prefix = &self.config.local_prefix;
    let resolved = match key.mode {
      LocalMode::Direct => {
        let url = self
          .config
          .resources
          .local_path(resource)?
          .trim_start_matches('/')
          .to_string();
        let filename = paths::local_file(self.root(), &prefix.path, &url);
        ResolvedResource::new(url, filename)
      }
      LocalMode::Build => {
        let sources = resource
          .split(COMBO_SEPARATOR)
          .map(|name| self.config.resources.local_path(name))
          .collect::<ResolveResult<Vec<&str>>>()?;
        let output = self.builder.build(sources.as_slice(), &prefix.path, &prefix.build)?;
        let integrity = hashing::integrity(&self.config.hashing_algos, &output.content);
        ResolvedResource::with_integrity(output.url, output.filename, integrity)
      }
    };

    let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
    let entry = cache.entry(key).or_insert_with(|| Arc::new(resolved));
    Ok(Arc::clone(entry))
  }

  #[cfg(test)]
  fn cached_len(&self) -> usize {
    self
      .cache
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }
}

/// Whether `resource` names several registry entries, e.g. `foo+bar`.
pub fn is_combo(resource: &str) -> bool {
  resource.contains(COMBO_SEPARATOR)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::LocalPrefix;
  use crate::hashing::HashAlgorithm;
  use crate::registry::Registry;
  use tempfile::{TempDir, tempdir};

  const A_JS: &[u8] = b"console.log('a');\n";
  const B_JS: &[u8] = b"console.log('b');\n";

  fn site() -> std::io::Result<TempDir> {
    let temp = tempdir()?;
    fs::create_dir_all(temp.path().join("public/js"))?;
    fs::create_dir_all(temp.path().join("public/build"))?;
    fs::write(temp.path().join("public/js/a.js"), A_JS)?;
    fs::write(temp.path().join("public/js/b.js"), B_JS)?;
    Ok(temp)
  }

  fn registry() -> Registry {
    Registry::new()
      .with("a", ResourceDescriptor::local("/js/a.js"))
      .with("b", ResourceDescriptor::local("js/b.js"))
      .with(
        "cdn",
        ResourceDescriptor::remote("https://cdn.example/x.js", "sha256-AAAA"),
      )
  }

  fn resolver(temp: &TempDir, mode: LocalMode) -> ResourceResolver {
    let config = ResolverConfig::new(registry())
      .with_local_prefix(LocalPrefix::new("https://static.example/", "public", "build"))
      .with_local_mode(mode)
      .with_root(temp.path());
    ResourceResolver::new(config).unwrap()
  }

  #[test]
  fn remote_resources_pass_through_without_filesystem_access() {
    let config = ResolverConfig::new(registry()).with_root("/nonexistent/root");
    let resolver = ResourceResolver::new(config).unwrap();

    assert_eq!(resolver.url("cdn").unwrap(), "https://cdn.example/x.js");
    assert_eq!(resolver.hash("cdn").unwrap(), "sha256-AAAA");
    assert_eq!(resolver.cached_len(), 0);
  }

  #[test]
  fn unknown_mode_only_fails_local_resources() -> std::io::Result<()> {
    let temp = site()?;
    let config = ResolverConfig::new(registry())
      .with_local_mode("inline")
      .with_root(temp.path());
    let resolver = ResourceResolver::new(config).unwrap();

    assert_eq!(resolver.url("cdn").unwrap(), "https://cdn.example/x.js");
    assert_eq!(resolver.hash("cdn").unwrap(), "sha256-AAAA");
    assert!(matches!(
      resolver.url("a"),
      Err(ResolveError::UnknownMode(mode)) if mode == "inline"
    ));
    assert!(matches!(
      resolver.hash("a+b"),
      Err(ResolveError::UnknownMode(_))
    ));
    assert_eq!(resolver.cached_len(), 0);
    Ok(())
  }

  #[test]
  fn remote_hash_lists_are_space_joined() {
    let registry = Registry::new().with(
      "fonts",
      ResourceDescriptor::Remote {
        url: "https://cdn.example/fonts.css".into(),
        hash: RemoteHash::Many(vec!["sha256-AAAA".into(), "sha512-BBBB".into()]),
      },
    );
    let resolver = ResourceResolver::new(ResolverConfig::new(registry).with_root("/")).unwrap();

    assert_eq!(resolver.hash("fonts").unwrap(), "sha256-AAAA sha512-BBBB");
  }

  #[test]
  fn direct_mode_serves_source_in_place() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Direct);

    assert_eq!(resolver.url("a").unwrap(), "https://static.example/js/a.js");
    assert_eq!(
      resolver.hash("a").unwrap(),
      HashAlgorithm::Sha256.sri_token(A_JS)
    );
    assert_eq!(fs::read_dir(temp.path().join("public/build"))?.count(), 0);
    Ok(())
  }

  #[test]
  fn build_mode_serves_digest_named_copy() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Build);

    let url = resolver.url("a").unwrap();
    let expected = format!(
      "https://static.example/build/{}.js",
      hashing::content_digest(A_JS)
    );
    assert_eq!(url, expected);
    assert_eq!(
      resolver.hash("a").unwrap(),
      HashAlgorithm::Sha256.sri_token(A_JS)
    );
    Ok(())
  }

  #[test]
  fn combo_resources_concatenate_in_order() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Build);

    let ab = resolver.url("a+b").unwrap();
    let ba = resolver.url("b+a").unwrap();
    assert_ne!(ab, ba);

    let combined = [A_JS, B_JS].concat();
    assert_eq!(
      resolver.hash("a+b").unwrap(),
      HashAlgorithm::Sha256.sri_token(&combined)
    );
    Ok(())
  }

  #[test]
  fn multiple_algorithms_are_joined_in_order() -> std::io::Result<()> {
    let temp = site()?;
    let config = ResolverConfig::new(registry())
      .with_local_prefix(LocalPrefix::new("", "public", "build"))
      .with_hashing_algos([HashAlgorithm::Sha256, HashAlgorithm::Sha384])
      .with_root(temp.path());
    let resolver = ResourceResolver::new(config).unwrap();

    assert_eq!(
      resolver.hash("b").unwrap(),
      format!(
        "{} {}",
        HashAlgorithm::Sha256.sri_token(B_JS),
        HashAlgorithm::Sha384.sri_token(B_JS)
      )
    );
    Ok(())
  }

  #[test]
  fn cached_resolutions_skip_the_filesystem() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Build);

    let first = resolver.resolve("a+b").unwrap();
    fs::remove_dir_all(temp.path().join("public"))?;
    let second = resolver.resolve("a+b").unwrap();

    assert_eq!(first, second);
    assert_eq!(resolver.cached_len(), 1);
    Ok(())
  }

  #[test]
  fn build_hash_comes_from_built_content() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Build);

    let url = resolver.url("a").unwrap();
    let artifact = temp
      .path()
      .join("public")
      .join(url.trim_start_matches("https://static.example/"));
    fs::write(&artifact, b"tampered();\n")?;

    assert_eq!(
      resolver.hash("a").unwrap(),
      HashAlgorithm::Sha256.sri_token(A_JS)
    );
    Ok(())
  }

  #[test]
  fn cache_is_keyed_by_identifier() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Direct);

    resolver.url("a").unwrap();
    resolver.hash("a").unwrap();
    resolver.url("b").unwrap();

    assert_eq!(resolver.cached_len(), 2);
    Ok(())
  }

  #[test]
  fn unknown_names_are_reported() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Build);

    assert!(matches!(
      resolver.url("missing"),
      Err(ResolveError::ResourceNotFound(name)) if name == "missing"
    ));
    assert!(matches!(
      resolver.url("a+missing"),
      Err(ResolveError::ResourceNotFound(name)) if name == "missing"
    ));
    assert!(matches!(
      resolver.hash("a+cdn"),
      Err(ResolveError::NotLocal(name)) if name == "cdn"
    ));
    Ok(())
  }

  #[test]
  fn combos_are_not_split_in_direct_mode() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Direct);

    assert!(matches!(
      resolver.url("a+b"),
      Err(ResolveError::ResourceNotFound(name)) if name == "a+b"
    ));
    Ok(())
  }

  #[test]
  fn unwritable_build_directory_fails_resolution() -> std::io::Result<()> {
    let temp = site()?;
    fs::remove_dir_all(temp.path().join("public/build"))?;
    let resolver = resolver(&temp, LocalMode::Build);

    assert!(matches!(
      resolver.url("a"),
      Err(ResolveError::DirectoryNotWritable { .. })
    ));
    assert_eq!(resolver.cached_len(), 0);
    Ok(())
  }

  #[test]
  fn concurrent_misses_agree_on_result() -> std::io::Result<()> {
    let temp = site()?;
    let resolver = resolver(&temp, LocalMode::Build);

    let results: Vec<Resolution> = std::thread::scope(|scope| {
      let handles: Vec<_> = (0..4)
        .map(|_| scope.spawn(|| resolver.resolve("b+a").unwrap()))
        .collect();
      handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
    });

    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(resolver.cached_len(), 1);
    Ok(())
  }

  #[test]
  fn renders_tags_from_resolved_values() {
    let config = ResolverConfig::new(registry()).with_root("/");
    let resolver = ResourceResolver::new(config).unwrap();

    let tag = resolver
      .script_tag("cdn", &[Attribute::flag("async")])
      .unwrap();
    assert_eq!(
      tag,
      r#"<script src="https://cdn.example/x.js" integrity="sha256-AAAA" crossorigin="anonymous" async></script>"#
    );
  }
}
