//! Command line front end printing resource URLs, hashes and tags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sri_assets::markup::parse_attributes;
use sri_assets::{LocalMode, ResolverConfig, ResourceResolver};

#[derive(Parser)]
#[command(name = "sri-assets")]
#[command(about = "Resolve named resources to URLs with Subresource Integrity hashes")]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Configuration file (default: sri.config.json or sri.config.yaml in the current directory)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Working root for local paths, overriding the configuration
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  /// Local mode, overriding the configuration
  #[arg(long, global = true, value_enum)]
  mode: Option<ModeArg>,

  /// Verbose output
  #[arg(short, long, global = true)]
  verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the URL of a resource
  Url {
    /// Resource name, or several joined with `+`
    resource: String,
  },

  /// Print the integrity value of a resource
  Hash {
    /// Resource name, or several joined with `+`
    resource: String,
  },

  /// Print an HTML element referencing a resource
  Tag {
    /// Element kind
    #[arg(value_enum)]
    kind: TagKind,
    /// Resource name, or several joined with `+`
    resource: String,
    /// Extra attributes, e.g. "async, nonce => abc"
    #[arg(default_value = "")]
    attributes: String,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
  Direct,
  Build,
}

impl From<ModeArg> for LocalMode {
  fn from(mode: ModeArg) -> Self {
    match mode {
      ModeArg::Direct => LocalMode::Direct,
      ModeArg::Build => LocalMode::Build,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum TagKind {
  Script,
  Stylesheet,
  Preload,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
    .with_writer(std::io::stderr)
    .init();

  let resolver = build_resolver(&cli)?;

  let output = match &cli.command {
    Commands::Url { resource } => resolver
      .url(resource)
      .with_context(|| format!("failed to resolve URL of {resource}"))?,
    Commands::Hash { resource } => resolver
      .hash(resource)
      .with_context(|| format!("failed to resolve hash of {resource}"))?,
    Commands::Tag {
      kind,
      resource,
      attributes,
    } => {
      let attributes = parse_attributes(attributes).context("failed to parse attributes")?;
      let tag = match kind {
        TagKind::Script => resolver.script_tag(resource, &attributes),
        TagKind::Stylesheet => resolver.stylesheet_tag(resource, &attributes),
        TagKind::Preload => resolver.preload_tag(resource, &attributes),
      };
      tag.with_context(|| format!("failed to render tag for {resource}"))?
    }
  };

  println!("{output}");
  Ok(())
}

fn build_resolver(cli: &Cli) -> Result<ResourceResolver> {
  let mut config = match &cli.config {
    Some(path) => ResolverConfig::from_path(path)?,
    None => {
      let cwd = std::env::current_dir().context("failed to read current directory")?;
      ResolverConfig::discover(&cwd)?
    }
  };

  if let Some(root) = &cli.root {
    config = config.with_root(root);
  }
  if let Some(mode) = cli.mode {
    config = config.with_local_mode(LocalMode::from(mode));
  }

  debug!(
    resources = config.resources.len(),
    mode = %config.local_mode,
    "loaded configuration"
  );
  ResourceResolver::new(config).context("failed to create resolver")
}
