use anyhow::{Context, Result};

use nameverify::config::Config;
use nameverify::models::{DataSource, SearchInput};
use nameverify::output::{delimited_row, Encoder, OutputFormat};
use nameverify::NameVerifier;

const DATA_SOURCE_COLUMNS: [&str; 6] = [
    "Id",
    "TitleShort",
    "Title",
    "Curation",
    "RecordCount",
    "UpdatedAt",
];

pub async fn sources(config: Config) -> Result<()> {
    let verifier = NameVerifier::new(config)?;
    let data_sources = verifier
        .data_sources()
        .await
        .context("Failed to fetch data sources")?;

    tracing::info!(count = data_sources.len(), "Fetched data sources");
    print_data_sources(&data_sources, verifier.config().format)
}

pub async fn source(config: Config, id: u32) -> Result<()> {
    let verifier = NameVerifier::new(config)?;
    let data_source = verifier
        .data_source(id)
        .await
        .with_context(|| format!("Failed to fetch data source {id}"))?;

    print_data_sources(std::slice::from_ref(&data_source), verifier.config().format)
}

pub async fn search(config: Config, input: SearchInput) -> Result<()> {
    if input.is_empty() {
        anyhow::bail!("Search needs at least one of --name, --genus, --species, --infraspecies, --species-any, --author or --year");
    }

    let verifier = NameVerifier::new(config)?;
    tracing::info!(query = %input.to_query(), "Searching");
    let names = verifier.search(&input).await.context("Search failed")?;

    if names.is_empty() {
        tracing::warn!(query = %input.to_query(), "Nothing found");
    }

    let encoder = Encoder::from_config(verifier.config());
    print_header(&encoder);
    for record in &names {
        println!("{}", encoder.encode(record));
    }
    Ok(())
}

pub async fn name_string(config: Config, id: &str) -> Result<()> {
    let verifier = NameVerifier::new(config)?;
    let record = verifier
        .name_string(id)
        .await
        .with_context(|| format!("Failed to fetch name-string {id}"))?;

    let Some(record) = record else {
        anyhow::bail!("Name-string {id} not found");
    };

    let encoder = Encoder::from_config(verifier.config());
    print_header(&encoder);
    println!("{}", encoder.encode(&record));
    Ok(())
}

fn print_header(encoder: &Encoder) {
    let header = encoder.header();
    if !header.is_empty() {
        println!("{header}");
    }
}

fn print_data_sources(data_sources: &[DataSource], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::CompactJson => println!("{}", serde_json::to_string(data_sources)?),
        OutputFormat::PrettyJson => println!("{}", serde_json::to_string_pretty(data_sources)?),
        OutputFormat::Csv | OutputFormat::Tsv => {
            if let Some(header) = delimited_row(&DATA_SOURCE_COLUMNS, format) {
                println!("{header}");
            }
            for ds in data_sources {
                let fields = [
                    ds.id.to_string(),
                    ds.title_short.clone(),
                    ds.title.clone(),
                    ds.curation.clone(),
                    ds.record_count.to_string(),
                    ds.updated_at.clone(),
                ];
                if let Some(row) = delimited_row(&fields, format) {
                    println!("{row}");
                }
            }
        }
    }
    Ok(())
}
