mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nameverify::config::{
    parse_data_sources, Config, ConfigBuilder, ConfigLayer, DEFAULT_CONFIG_FILE,
};
use nameverify::io::Input;
use nameverify::models::{SearchInput, YearFacet};

#[derive(Parser)]
#[command(
    name = "nameverify",
    version,
    about = "Verify scientific name-strings against the Global Names verifier",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// A name-string, a file with one name-string per line, or "-" for stdin
    /// (stdin is also used when nothing is given)
    input: Option<String>,

    #[command(flatten)]
    options: VerifyOptions,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

/// Overrides applied on top of the config file and environment.
///
/// Switches take an optional value, so `--all-matches=false` turns off a
/// setting enabled in the file or environment.
#[derive(Args, Debug, Default)]
struct VerifyOptions {
    /// Config file (default: ./nameverify.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (csv, tsv, compact, pretty)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Comma-separated IDs of preferred data sources, e.g. "1,11"
    #[arg(short, long, global = true)]
    sources: Option<String>,

    /// Number of parallel verification jobs
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Number of name-strings sent in one request
    #[arg(short, long, global = true)]
    batch_size: Option<usize>,

    /// Show only results from preferred data sources
    #[arg(short, long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    preferred_only: Option<bool>,

    /// Return all matches instead of the best one per data source
    #[arg(short = 'M', long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    all_matches: Option<bool>,

    /// Capitalize the first letter of name-strings
    #[arg(short = 'C', long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    capitalize: Option<bool>,

    /// Also match the species group of a name
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    species_group: Option<bool>,

    /// Relax fuzzy matching rules
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    relaxed_fuzzy: Option<bool>,

    /// Allow fuzzy matching of uninomials
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    uninomial_fuzzy: Option<bool>,

    /// URL of the verification service
    #[arg(long, global = true)]
    verifier_url: Option<String>,

    /// Overall timeout of one request in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

impl VerifyOptions {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            verifier_url: self.verifier_url.clone(),
            batch_size: self.batch_size,
            jobs: self.jobs,
            format: self.format.clone(),
            data_sources: self.sources.as_deref().and_then(parse_data_sources),
            preferred_only: self.preferred_only,
            with_all_matches: self.all_matches,
            with_capitalization: self.capitalize,
            with_species_group: self.species_group,
            with_relaxed_fuzzy_match: self.relaxed_fuzzy,
            with_uninomial_fuzzy_match: self.uninomial_fuzzy,
            request_timeout_secs: self.timeout,
        }
    }

    /// Defaults, then the config file, then `NAMEVERIFY_*`, then flags
    fn load_config(&self) -> Result<Config> {
        let builder = match &self.config {
            Some(path) => ConfigBuilder::new().file(path)?,
            None => ConfigBuilder::new().file_if_exists(Path::new(DEFAULT_CONFIG_FILE))?,
        };

        builder
            .env()
            .layer(self.layer())
            .build()
            .context("Invalid configuration")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List data sources known to the verifier
    Sources,

    /// Show metadata of one data source
    Source {
        /// Data-source ID
        id: u32,
    },

    /// Faceted search, e.g. --genus Bubo --species bubo --year 1750-1800
    Search {
        /// Full name-string
        #[arg(long)]
        name: Option<String>,

        /// Genus
        #[arg(short, long)]
        genus: Option<String>,

        /// Specific epithet
        #[arg(long)]
        species: Option<String>,

        /// Infraspecific epithet
        #[arg(long)]
        infraspecies: Option<String>,

        /// Epithet of any rank
        #[arg(long)]
        species_any: Option<String>,

        /// Author
        #[arg(short, long)]
        author: Option<String>,

        /// Year or year range (1758, 1750-1800, 1750-, -1800)
        #[arg(short, long)]
        year: Option<YearFacet>,

        /// Restrict to one data source
        #[arg(long)]
        data_source: Option<u32>,

        /// Restrict to descendants of a higher taxon
        #[arg(long)]
        parent_taxon: Option<String>,
    },

    /// Show a previously verified name-string by its ID
    NameString {
        /// Name-string UUID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = cli.options.load_config()?;
    tracing::debug!(config = ?config, "Configuration loaded");

    match cli.command {
        None => {
            let input = Input::detect(cli.input.as_deref());
            commands::verify(config, input).await?;
        }

        Some(Commands::Sources) => commands::sources(config).await?,

        Some(Commands::Source { id }) => commands::source(config, id).await?,

        Some(Commands::Search {
            name,
            genus,
            species,
            infraspecies,
            species_any,
            author,
            year,
            data_source,
            parent_taxon,
        }) => {
            let input = SearchInput {
                name,
                genus,
                species,
                infraspecies,
                species_any,
                author,
                year,
                data_source_id: data_source,
                parent_taxon,
                with_all_matches: config.with_all_matches,
            };
            commands::search(config, input).await?;
        }

        Some(Commands::NameString { id }) => commands::name_string(config, &id).await?,
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only results
fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("nameverify=debug,info")
        } else {
            tracing_subscriber::EnvFilter::new("nameverify=info,warn")
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_without_value_enables() {
        let cli = Cli::try_parse_from(["nameverify", "-p", "--all-matches", "Bubo bubo"]).unwrap();
        let layer = cli.options.layer();

        assert_eq!(layer.preferred_only, Some(true));
        assert_eq!(layer.with_all_matches, Some(true));
        assert_eq!(layer.with_capitalization, None);
        assert_eq!(cli.input.as_deref(), Some("Bubo bubo"));
    }

    #[test]
    fn test_switch_can_disable_file_setting() {
        let cli = Cli::try_parse_from(["nameverify", "--all-matches=false", "--capitalize=false"]).unwrap();
        let layer = cli.options.layer();
        assert_eq!(layer.with_all_matches, Some(false));
        assert_eq!(layer.with_capitalization, Some(false));

        let file_config = Config {
            with_all_matches: true,
            with_capitalization: true,
            ..Default::default()
        };
        let config = file_config.with_layer(layer);
        assert!(!config.with_all_matches);
        assert!(!config.with_capitalization);
    }

    #[test]
    fn test_switches_are_global() {
        let cli = Cli::try_parse_from(["nameverify", "search", "--genus", "Bubo", "-M"]).unwrap();
        assert_eq!(cli.options.layer().with_all_matches, Some(true));
    }
}
