// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use catalog_index::utils::logging::{format_error, format_field, format_success, format_warning};
use catalog_index::{
    CatalogStore, Config, DocumentIndex, Indexer, JsonExporter, LanceDbIndex, RelationalStore,
    SchemaRegistry, SearchQuery, Validator, catalog_registry,
};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "catalog_index")]
#[command(version = "0.1.0")]
#[command(about = "Projects catalog records into search documents backed by LanceDB", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project every root entity and write the documents to the index
    Rebuild {
        /// Rewrite documents even when their fingerprint is unchanged
        #[arg(long)]
        force: bool,
    },

    /// Print the document projected for one entity
    Project {
        entity_type: String,
        id: String,
    },

    /// Full-text and filtered search over indexed documents
    Search {
        /// Search query text
        query: Option<String>,

        /// Structured filter, `path=value`; repeatable
        #[arg(short, long = "filter", value_name = "PATH=VALUE")]
        filters: Vec<String>,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    Stats,

    Export {
        #[arg(short, long, default_value = "./exports")]
        output: PathBuf,

        #[arg(short, long)]
        pretty: bool,
    },

    /// List registered schemas
    Schemas,

    Reset {
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    catalog_index::utils::logging::init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    info!("Catalog Index");
    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    let registry = Arc::new(catalog_registry().context("Invalid schema configuration")?);

    match cli.command {
        Commands::Rebuild { force } => {
            cmd_rebuild(&config, registry, force).await?;
        }
        Commands::Project { entity_type, id } => {
            cmd_project(&config, &registry, &entity_type, &id)?;
        }
        Commands::Search {
            query,
            filters,
            limit,
        } => {
            cmd_search(&config, query, &filters, limit).await?;
        }
        Commands::Stats => {
            cmd_stats(&config).await?;
        }
        Commands::Export { output, pretty } => {
            cmd_export(&config, &registry, output, pretty)?;
        }
        Commands::Schemas => {
            cmd_schemas(&registry);
        }
        Commands::Reset { confirm } => {
            cmd_reset(&config, confirm).await?;
        }
    }

    Ok(())
}

fn load_store(config: &Config) -> Result<CatalogStore> {
    let path = &config.store.catalog_path;
    Validator::validate_file_path(path)?;
    CatalogStore::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

async fn open_index(config: &Config) -> Result<LanceDbIndex> {
    let index = LanceDbIndex::new(config.index.clone())
        .await
        .context("Failed to create LanceDB client")?;

    if !index.ping().await? {
        error!("Cannot connect to LanceDB");
        return Err(anyhow::anyhow!("Database connection failed"));
    }

    Ok(index)
}

async fn cmd_rebuild(config: &Config, registry: Arc<SchemaRegistry>, force: bool) -> Result<()> {
    info!("Starting index rebuild");
    let start_time = Instant::now();

    let store = Arc::new(load_store(config)?);
    let index = open_index(config).await?;
    index
        .ensure_table()
        .await
        .context("Failed to prepare index table")?;
    let index = Arc::new(index);

    let indexer = Indexer::new(registry, store, index, config.pipeline.clone()).with_progress(true);
    let stats = indexer.rebuild(force).await.context("Rebuild failed")?;

    println!();
    println!("{}", format_success("Rebuild complete"));
    println!("{}", format_field("indexed", stats.documents_indexed));
    println!("{}", format_field("unchanged", stats.documents_unchanged));
    println!("{}", format_field("removed", stats.documents_removed));
    println!("{}", format_field("skipped", stats.entities_skipped));
    println!("{}", format_field("failed", stats.entities_failed));
    println!("{}", format_field("success rate", format!("{:.1}%", stats.success_rate())));
    println!("{}", format_field("throughput", format!("{:.1}/s", stats.entities_per_second())));

    if stats.entities_failed > 0 {
        println!(
            "{}",
            format_warning(&format!("{} entities failed, see log", stats.entities_failed))
        );
    }

    info!("Rebuild finished in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

fn cmd_project(config: &Config, registry: &SchemaRegistry, entity_type: &str, id: &str) -> Result<()> {
    let store = load_store(config)?;

    let Some(entity_type) = registry.entity_type(entity_type) else {
        println!("{}", format_error(&format!("Unknown entity type: {}", entity_type)));
        return Ok(());
    };

    let Some(entity) = store.get(entity_type, id)? else {
        println!("{}", format_error(&format!("{} {} not found", entity_type.name, id)));
        return Ok(());
    };

    match registry.project_entity(&store, entity.as_ref())? {
        Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
        None => println!(
            "{}",
            format_warning(&format!(
                "{} {} is not indexed (no root schema or excluded by filter)",
                entity_type.name, id
            ))
        ),
    }

    Ok(())
}

async fn cmd_search(config: &Config, text: Option<String>, filters: &[String], limit: usize) -> Result<()> {
    Validator::validate_limit(limit)?;

    let mut query = SearchQuery::new(limit);
    if let Some(text) = text {
        query = query.text(text);
    }
    for raw in filters {
        let (path, value) = Validator::parse_filter(raw)?;
        query = query.filter(path, value);
    }

    info!("Searching: {:?}", query);
    let index = open_index(config).await?;
    let results = index.search(&query).await.context("Search failed")?;

    if results.is_empty() {
        println!("\nNo results found\n");
        println!("Try:");
        println!("  - Using different search terms");
        println!("  - Removing filters");
        println!("  - Running `rebuild` to populate the index");
        return Ok(());
    }

    println!("\nFound {} result(s)\n", results.len());
    println!("{}", "=".repeat(80));

    for (idx, result) in results.iter().enumerate() {
        println!("\n{}. {}", idx + 1, result.format_summary(300).trim_end());
    }

    println!("\n{}", "=".repeat(80));
    info!("Search complete");

    Ok(())
}

async fn cmd_stats(config: &Config) -> Result<()> {
    info!("Gathering statistics");

    let index = open_index(config).await?;
    let doc_count = index.count().await?;

    println!("{}", format_field("table", index.table_name()));
    println!("{}", format_field("documents", doc_count));

    match load_store(config) {
        Ok(store) => {
            let data = store.snapshot()?;
            println!("{}", format_field("products", data.products.len()));
            println!("{}", format_field("vendors", data.vendors.len()));
            println!("{}", format_field("categories", data.categories.len()));
            println!("{}", format_field("tags", data.tags.len()));
        }
        Err(e) => println!("{}", format_warning(&format!("Catalog unavailable: {}", e))),
    }

    Ok(())
}

fn cmd_export(config: &Config, registry: &SchemaRegistry, output: PathBuf, pretty: bool) -> Result<()> {
    info!("Initializing JSON export");

    let store = load_store(config)?;
    let exporter = JsonExporter::new(output)?;
    let manifest = exporter.export_all(registry, &store, pretty)?;

    println!(
        "{}",
        format_success(&format!(
            "Exported {} documents to {}",
            manifest.total_documents,
            exporter.output_dir().display()
        ))
    );
    Ok(())
}

fn cmd_schemas(registry: &SchemaRegistry) {
    for schema in registry.schemas() {
        let kind = if schema.is_embedded() { "embedded" } else { "root" };
        println!(
            "\n{} ({}, {})",
            schema.name().bold(),
            schema.entity_type().name,
            kind
        );

        for field in schema.fields() {
            let mut flags = Vec::new();
            if field.synthesized {
                flags.push("synthesized");
            }
            if field.transform.is_some() && !field.synthesized {
                flags.push("prepared");
            }
            if field.searchable {
                flags.push("searchable");
            }
            println!("{}", format_field(&field.name, flags.join(", ")));
        }

        for relation in schema.relations() {
            println!(
                "{}",
                format_field(
                    &relation.name,
                    format!("-> {} ({})", relation.target_schema, relation.cardinality)
                )
            );
        }

        if !schema.is_embedded() {
            println!(
                "{}",
                format_field("full-text", registry.searchable_paths(schema).join(", "))
            );
        }
    }
}

async fn cmd_reset(config: &Config, confirm: bool) -> Result<()> {
    if !confirm {
        error!("This will delete all indexed documents. Use --confirm to proceed");
        return Ok(());
    }

    warn!("Resetting index - all documents will be lost");

    let index = open_index(config).await?;
    index.clear().await.context("Failed to drop index table")?;

    println!("{}", format_success("Index reset complete"));
    Ok(())
}
