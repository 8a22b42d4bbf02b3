use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the inkchain binary.
#[derive(Debug, Parser)]
#[command(name = "inkchain", version, about = "Enriched on-chain publishing catalog")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "INKCHAIN_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the enriched asset catalog as JSON.
    Catalog(CatalogArgs),
    /// Print the assets owned by an account as JSON.
    Library(LibraryArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub overrides: SyncOverrides,

    /// Print the chain-derived list without waiting for enrichment.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub raw: bool,
}

#[derive(Debug, Args, Clone)]
pub struct LibraryArgs {
    #[command(flatten)]
    pub overrides: SyncOverrides,

    /// Account whose owned assets are listed.
    #[arg(value_name = "ACCOUNT")]
    pub account: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SyncOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the metadata provider base URL.
    #[arg(long = "metadata-base-url", value_name = "URL")]
    pub metadata_base_url: Option<String>,

    /// Override the metadata provider JWT.
    #[arg(long = "metadata-jwt", env = "INKCHAIN_METADATA_JWT", value_name = "TOKEN")]
    pub metadata_jwt: Option<String>,

    /// Override the maximum number of metadata pages per listing.
    #[arg(long = "metadata-max-pages", value_name = "COUNT")]
    pub metadata_max_pages: Option<u32>,

    /// Override the chain snapshot file.
    #[arg(long = "chain-snapshot", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub chain_snapshot: Option<PathBuf>,

    /// Toggle the catalog cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,
}
