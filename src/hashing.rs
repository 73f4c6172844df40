//! Digest helpers for SRI tokens and content-addressed filenames.

use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::ResolveError;

/// Digest algorithms understood by browsers for Subresource Integrity.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq)]
pub enum HashAlgorithm {
  /// SHA-256, the default.
  #[default]
  Sha256,
  /// SHA-384.
  Sha384,
  /// SHA-512.
  Sha512,
}

impl HashAlgorithm {
  /// Name used as the SRI token prefix.
  pub fn name(self) -> &'static str {
    match self {
      Self::Sha256 => "sha256",
      Self::Sha384 => "sha384",
      Self::Sha512 => "sha512",
    }
  }

  /// Raw digest of `data`.
  pub fn digest(self, data: &[u8]) -> Vec<u8> {
    match self {
      Self::Sha256 => Sha256::digest(data).to_vec(),
      Self::Sha384 => Sha384::digest(data).to_vec(),
      Self::Sha512 => Sha512::digest(data).to_vec(),
    }
  }

  /// SRI token for `data`, e.g. `sha256-<base64>`.
  ///
  /// SRI uses standard base64 with padding, not the URL-safe alphabet.
  pub fn sri_token(self, data: &[u8]) -> String {
    format!(
      "{}-{}",
      self.name(),
      general_purpose::STANDARD.encode(self.digest(data))
    )
  }
}

impl fmt::Display for HashAlgorithm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for HashAlgorithm {
  type Err = ResolveError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "sha256" => Ok(Self::Sha256),
      "sha384" => Ok(Self::Sha384),
      "sha512" => Ok(Self::Sha512),
      _ => Err(ResolveError::UnsupportedAlgorithm(value.to_string())),
    }
  }
}

/// Space-separated integrity string for `data`, one token per algorithm in order.
pub fn integrity(algos: &[HashAlgorithm], data: &[u8]) -> String {
  algos
    .iter()
    .map(|algo| algo.sri_token(data))
    .collect::<Vec<_>>()
    .join(" ")
}

/// SHA-256 of `data` encoded as unpadded base64url (RFC 4648 section 5).
///
/// Used as the stem of build artifact filenames, so it must be safe in both
/// URLs and file paths.
pub fn content_digest(data: &[u8]) -> String {
  general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(data))
}
