//! Content-addressed build artifacts for local resources.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::hashing::content_digest;
use crate::paths;

/// Location of a generated artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
  /// Path relative to the local URL prefix, e.g. `build/<digest>.js`.
  pub url: String,
  /// Absolute path of the written file.
  pub filename: PathBuf,
  /// Concatenated bytes the artifact was named after.
  pub content: Vec<u8>,
}

/// Concatenates source files into a single file named after its own SHA-256 digest.
///
/// The builder holds no state besides the working root, so calling it twice with the same
/// inputs produces the same file at the same path.
#[derive(Debug, Clone)]
pub struct FileBuilder {
  root: PathBuf,
}

impl FileBuilder {
  /// Create a builder resolving prefixes against `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Working root the prefixes are resolved against.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Build an artifact from `sources`, each relative to `path_prefix`.
  ///
  /// Sources are concatenated in the given order. The artifact lands in `build_prefix`
  /// under `path_prefix` and takes the extension of the first source that has one.
  pub fn build<S: AsRef<str>>(
    &self,
    sources: &[S],
    path_prefix: &str,
    build_prefix: &str,
  ) -> ResolveResult<BuildOutput> {
    if sources.is_empty() {
      return Err(ResolveError::EmptyBuild);
    }

    let mut content = Vec::new();
    let mut extension: Option<String> = None;
    for source in sources {
      let path = paths::local_file(&self.root, path_prefix, source.as_ref());
      let bytes = fs::read(&path).map_err(|err| ResolveError::io(&path, err))?;
      content.extend_from_slice(&bytes);
      if extension.is_none() {
        extension = path
          .extension()
          .and_then(|ext| ext.to_str())
          .map(str::to_string);
      }
    }

    let name = format!(
      "{}.{}",
      content_digest(&content),
      extension.unwrap_or_default()
    );
    let url = paths::build_relative(build_prefix, &name);
    let filename = paths::local_file(&self.root, path_prefix, &url);

    let dir = filename.parent().unwrap_or(&self.root);
    ensure_directory(dir)?;
    write_artifact(&filename, &content)?;

    Ok(BuildOutput {
      url,
      filename,
      content,
    })
  }
}

fn ensure_directory(dir: &Path) -> ResolveResult<()> {
  match fs::metadata(dir) {
    Ok(meta) if meta.is_dir() => Ok(()),
    _ => Err(ResolveError::DirectoryNotWritable {
      dir: dir.to_path_buf(),
    }),
  }
}

/// Map a failure to create a file inside `dir` to the error callers should see.
fn creation_error(dir: &Path, path: &Path, err: io::Error) -> ResolveError {
  match err.kind() {
    ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem | ErrorKind::NotFound => {
      ResolveError::DirectoryNotWritable {
        dir: dir.to_path_buf(),
      }
    }
    _ => ResolveError::io(path, err),
  }
}

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Write `content` to `destination` unless an identical file is already there.
fn write_artifact(destination: &Path, content: &[u8]) -> ResolveResult<()> {
  match fs::read(destination) {
    Ok(existing) if existing == content => {
      debug!(path = %destination.display(), "build artifact already present");
      return Ok(());
    }
    Ok(_) => debug!(path = %destination.display(), "replacing stale build artifact"),
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => return Err(ResolveError::io(destination, err)),
  }

  place_artifact(destination, |file| file.write_all(content))?;
  debug!(
    path = %destination.display(),
    bytes = content.len(),
    "wrote build artifact"
  );
  Ok(())
}

/// Fill a fresh sibling temp file through `fill`, then rename it onto `destination`.
///
/// The temp file is removed on every failure after it was created.
fn place_artifact(
  destination: &Path,
  fill: impl FnOnce(&mut File) -> io::Result<()>,
) -> ResolveResult<()> {
  let dir = destination.parent().unwrap_or(Path::new("."));
  let file_name = destination
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  let temp = destination.with_file_name(format!(
    ".{file_name}.{}-{}.tmp",
    std::process::id(),
    TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
  ));

  let mut file = OpenOptions::new()
    .write(true)
    .create_new(true)
    .open(&temp)
    .map_err(|err| creation_error(dir, &temp, err))?;

  let filled = fill(&mut file);
  drop(file);
  if let Err(err) = filled {
    let _ = fs::remove_file(&temp);
    return Err(ResolveError::io(&temp, err));
  }

  if let Err(err) = fs::rename(&temp, destination) {
    let _ = fs::remove_file(&temp);
    return Err(ResolveError::io(destination, err));
  }
  Ok(())
}
