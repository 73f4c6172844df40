//! Prefix and path joining shared by the resolver and the file builder.
//!
//! Configured prefixes arrive with arbitrary leading and trailing slashes. These helpers
//! trim them consistently so that `public/`, `/public` and `public` all name the same
//! directory, and so that generated URLs always use forward slashes.

use std::path::{Path, PathBuf};

/// Absolute filesystem path of `relative` inside `prefix` under `root`.
pub fn local_file(root: &Path, prefix: &str, relative: &str) -> PathBuf {
  let mut path = root.to_path_buf();
  for segment in [prefix.trim_matches('/'), relative.trim_start_matches('/')] {
    if !segment.is_empty() {
      path.push(segment);
    }
  }
  path
}

/// Forward-slash path of `name` under the build folder, e.g. `build/<digest>.js`.
pub fn build_relative(build_prefix: &str, name: &str) -> String {
  let build = build_prefix.trim_matches('/');
  if build.is_empty() {
    name.to_string()
  } else {
    format!("{build}/{name}").replace('\\', "/")
  }
}

/// Public URL of a local resource: the URL prefix without its trailing slash, then `/relative`.
pub fn public_url(url_prefix: &str, relative: &str) -> String {
  format!("{}/{}", url_prefix.trim_end_matches('/'), relative)
}
