#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod error;
pub mod hashing;
pub mod markup;
pub mod paths;
pub mod registry;
pub mod resolver;

pub use builder::{BuildOutput, FileBuilder};
pub use config::{ConfigError, LocalMode, LocalPrefix, ResolverConfig};
pub use error::{ResolveError, ResolveResult};
pub use hashing::HashAlgorithm;
pub use markup::Attribute;
pub use registry::{Registry, RemoteHash, ResourceDescriptor};
pub use resolver::{Resolution, ResolvedResource, ResourceResolver};
