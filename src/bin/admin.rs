//! CLI administration tool for url-redirector.
//!
//! Creates, inspects, edits and deletes short URLs and performs database
//! checks without an HTTP admin surface.
//!
//! # Usage
//!
//! ```bash
//! # Create a tracking short URL
//! cargo run --bin admin -- link create https://example.com/landing \
//!     --campaign Spring --medium Email --content Banner
//!
//! # Create a plain short URL with an alias
//! cargo run --bin admin -- link create https://example.com --alias docs --no-tracking
//!
//! # List, show, update, delete
//! cargo run --bin admin -- link list --page 1
//! cargo run --bin admin -- link show docs
//! cargo run --bin admin -- link update 16J --medium Social
//! cargo run --bin admin -- link delete 16J
//!
//! # Known campaign labels
//! cargo run --bin admin -- suggest campaign
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see `config`); `DATABASE_URL` is required, `BASE_URL`
//! and `ALIAS_PATH_PREFIX` control how short URLs are printed, and Redis is
//! used to drop cached copies of edited records.

use url_redirector::application::services::{ShortUrlService, ShortUrlSettings};
use url_redirector::config::{self, Config};
use url_redirector::domain::entities::{NewShortUrl, RecordField, ShortUrl, ShortUrlPatch};
use url_redirector::infrastructure::cache::{CacheService, NullCache, RedisCache};
use url_redirector::infrastructure::persistence::PgShortUrlRepository;
use url_redirector::utils::key_codec::KeyCodec;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dialoguer::{Confirm, Input};
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing url-redirector.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage short URLs
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// List known values of a label
    Suggest {
        #[arg(value_enum)]
        field: Field,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Short URL subcommands.
#[derive(Subcommand)]
enum LinkAction {
    /// Create a short URL
    Create {
        /// Destination URL (http or https)
        url: String,

        /// Human-readable alias, 1-16 characters of a-z, 0-9 and '-'
        #[arg(short, long)]
        alias: Option<String>,

        #[arg(long)]
        campaign: Option<String>,

        #[arg(long)]
        medium: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Who created the link
        #[arg(long)]
        creator: Option<String>,

        /// Do not inject utm parameters; redirect with 302
        #[arg(long)]
        no_tracking: bool,

        /// Skip prompts and confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List short URLs, most recently used first
    List {
        #[arg(short, long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 25)]
        page_size: i64,
    },

    /// Show one short URL
    Show {
        /// Key or alias
        key_or_alias: String,
    },

    /// Update a short URL; an empty label value clears it
    Update {
        /// Key or alias
        key_or_alias: String,

        #[arg(long)]
        url: Option<String>,

        #[arg(short, long, conflicts_with = "clear_alias")]
        alias: Option<String>,

        /// Remove the alias
        #[arg(long)]
        clear_alias: bool,

        #[arg(long)]
        campaign: Option<String>,

        #[arg(long)]
        medium: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Enable or disable utm injection
        #[arg(long)]
        tracking: Option<bool>,
    },

    /// Delete a short URL; its key and alias are never reissued
    Delete {
        /// Key or alias
        key_or_alias: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Label columns with suggestions.
#[derive(Clone, Copy, ValueEnum)]
enum Field {
    Campaign,
    Medium,
}

impl From<Field> for RecordField {
    fn from(field: Field) -> Self {
        match field {
            Field::Campaign => RecordField::Campaign,
            Field::Medium => RecordField::Medium,
        }
    }
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Link { action } => {
            let service = build_service(&config, &pool).await;
            handle_link_action(action, &service).await?
        }
        Commands::Suggest { field } => {
            let service = build_service(&config, &pool).await;
            print_suggestions(&service, field.into()).await?
        }
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

async fn build_service(config: &Config, pool: &PgPool) -> ShortUrlService {
    let cache: Arc<dyn CacheService> = match &config.redis_url {
        Some(redis_url) => match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                println!(
                    "{}",
                    format!("⚠️  Redis unavailable ({e}); cached copies expire by TTL").yellow()
                );
                Arc::new(NullCache::new())
            }
        },
        None => Arc::new(NullCache::new()),
    };

    ShortUrlService::new(
        Arc::new(PgShortUrlRepository::new(Arc::new(pool.clone()))),
        cache,
        ShortUrlSettings {
            base_url: config.base_url.clone(),
            alias_prefix: config.alias_path_prefix.clone(),
            codec: KeyCodec::new(config.key_checksum),
        },
    )
}

/// Dispatches short URL commands.
async fn handle_link_action(action: LinkAction, service: &ShortUrlService) -> Result<()> {
    match action {
        LinkAction::Create {
            url,
            alias,
            campaign,
            medium,
            content,
            description,
            creator,
            no_tracking,
            yes,
        } => {
            let mut input = NewShortUrl {
                long_url: url,
                alias,
                campaign,
                medium,
                content,
                description,
                creator,
                is_tracking: !no_tracking,
            };
            if input.is_tracking && !yes {
                prompt_labels(service, &mut input).await?;
            }
            create_link(service, input, yes).await?;
        }
        LinkAction::List { page, page_size } => list_links(service, page, page_size).await?,
        LinkAction::Show { key_or_alias } => {
            let record = find(service, &key_or_alias).await?;
            print_record(service, &record);
        }
        LinkAction::Update {
            key_or_alias,
            url,
            alias,
            clear_alias,
            campaign,
            medium,
            content,
            description,
            tracking,
        } => {
            let record = find(service, &key_or_alias).await?;
            let patch = ShortUrlPatch {
                long_url: url,
                alias: if clear_alias { Some(None) } else { alias.map(Some) },
                campaign: campaign.map(Some),
                medium: medium.map(Some),
                content: content.map(Some),
                description: description.map(Some),
                is_tracking: tracking,
            };

            let updated = service
                .update(record.id, patch)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to update short URL: {}", e))?;

            println!("{}", "✅ Short URL updated".green().bold());
            println!();
            print_record(service, &updated);
        }
        LinkAction::Delete { key_or_alias, yes } => {
            delete_link(service, &key_or_alias, yes).await?
        }
    }

    Ok(())
}

/// Asks for missing campaign labels, listing the values already in use.
async fn prompt_labels(service: &ShortUrlService, input: &mut NewShortUrl) -> Result<()> {
    if input.campaign.is_none() {
        input.campaign = prompt_label(service, RecordField::Campaign, "Campaign").await?;
    }
    if input.medium.is_none() {
        input.medium = prompt_label(service, RecordField::Medium, "Medium").await?;
    }
    Ok(())
}

async fn prompt_label(
    service: &ShortUrlService,
    field: RecordField,
    prompt: &str,
) -> Result<Option<String>> {
    let known = service
        .suggestions(field)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load suggestions: {}", e))?;

    if !known.is_empty() {
        let known: Vec<&str> = known.iter().map(String::as_str).collect();
        println!("  {} {}", "Known:".bright_black(), known.join(", ").cyan());
    }

    let value: String = Input::new()
        .with_prompt(format!("{prompt} (empty to skip)"))
        .allow_empty(true)
        .interact_text()?;

    Ok(Some(value).filter(|v| !v.trim().is_empty()))
}

/// Creates a short URL after confirmation.
async fn create_link(service: &ShortUrlService, input: NewShortUrl, skip_confirm: bool) -> Result<()> {
    println!("{}", "🔗 Create Short URL".bright_blue().bold());
    println!();
    println!("  Destination: {}", input.long_url.cyan());
    if let Some(alias) = &input.alias {
        println!("  Alias:       {}", alias.cyan());
    }
    println!(
        "  Tracking:    {}",
        if input.is_tracking { "yes".green() } else { "no".yellow() }
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this short URL?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let record = service
        .create(input)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create short URL: {}", e))?;

    println!("{}", "✅ Short URL created".green().bold());
    println!();
    print_record(service, &record);

    Ok(())
}

/// Lists one page of short URLs.
///
/// # Output Format
///
/// ```text
/// 📋 Short URLs (page 1, 2 total)
///
///   Key       Alias            Hits     Last used          Destination
///   ──────────────────────────────────────────────────────────────────────
///   16J       promo            42       2024-01-15 10:30   https://example.com/
/// ```
async fn list_links(service: &ShortUrlService, page: i64, page_size: i64) -> Result<()> {
    let (records, total) = service
        .list(page, page_size)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list short URLs: {}", e))?;

    println!(
        "{}",
        format!("📋 Short URLs (page {page}, {total} total)")
            .bright_blue()
            .bold()
    );
    println!();

    if records.is_empty() {
        println!("{}", "  No short URLs found".yellow());
        return Ok(());
    }

    println!(
        "  {:<9} {:<16} {:<8} {:<18} {}",
        "Key".bright_white().bold(),
        "Alias".bright_white().bold(),
        "Hits".bright_white().bold(),
        "Last used".bright_white().bold(),
        "Destination".bright_white().bold()
    );
    println!("  {}", "─".repeat(75).bright_black());

    for record in &records {
        let last_used = record
            .last_used
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "  {:<9} {:<16} {:<8} {:<18} {}",
            service.key_for(record).cyan(),
            record.alias.as_deref().unwrap_or("-"),
            record.hits.to_string().bright_green(),
            last_used.bright_black(),
            record.long_url
        );
    }
    println!();

    Ok(())
}

/// Soft-deletes a short URL with confirmation prompt (default: No).
async fn delete_link(service: &ShortUrlService, key_or_alias: &str, skip_confirm: bool) -> Result<()> {
    println!("{}", "🗑️  Delete Short URL".bright_blue().bold());
    println!();

    let record = find(service, key_or_alias).await?;
    print_record(service, &record);

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete this short URL?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    service
        .delete(record.id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete short URL: {}", e))?;

    println!("{}", "✅ Short URL deleted".green().bold());
    println!();

    Ok(())
}

async fn find(service: &ShortUrlService, key_or_alias: &str) -> Result<ShortUrl> {
    service
        .find(key_or_alias)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", key_or_alias, e))
}

fn print_record(service: &ShortUrlService, record: &ShortUrl) {
    let label = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("  Short URL:   {}", service.short_url(record, false).bright_yellow().bold());
    if record.alias.is_some() {
        println!("  Alias URL:   {}", service.short_url(record, true).bright_yellow());
    }
    println!("  Destination: {}", record.long_url.cyan());
    println!("  Tracking:    {}", if record.is_tracking { "yes (301)" } else { "no (302)" });
    println!("  Campaign:    {}", label(&record.campaign));
    println!("  Medium:      {}", label(&record.medium));
    println!("  Content:     {}", label(&record.content));
    if let Some(description) = &record.description {
        println!("  Description: {}", description);
    }
    if let Some(creator) = &record.creator {
        println!("  Creator:     {}", creator.bright_black());
    }
    println!("  Hits:        {}", record.hits.to_string().bright_green().bold());
    println!(
        "  Last used:   {}",
        record
            .last_used
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string())
            .bright_black()
    );
    println!(
        "  Created:     {}",
        record.created.format("%Y-%m-%d %H:%M:%S").to_string().bright_black()
    );
    println!();
}

/// Prints distinct values of a label column.
async fn print_suggestions(service: &ShortUrlService, field: RecordField) -> Result<()> {
    let values = service
        .suggestions(field)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load suggestions: {}", e))?;

    println!(
        "{}",
        format!("💡 Known {} values", field.column()).bright_blue().bold()
    );
    println!();

    if values.is_empty() {
        println!("{}", "  None yet".yellow());
    }
    for value in &values {
        println!("  {}", value.cyan());
    }
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let (live, deleted, hits): (i64, i64, i64) = sqlx::query_as(
                "SELECT COUNT(*) FILTER (WHERE deleted_at IS NULL), \
                        COUNT(*) FILTER (WHERE deleted_at IS NOT NULL), \
                        COALESCE(SUM(hits), 0)::BIGINT \
                 FROM short_urls",
            )
            .fetch_one(pool)
            .await?;

            println!("  PostgreSQL:  {}", version.bright_white());
            println!("  Short URLs:  {}", live.to_string().bright_green().bold());
            println!("  Deleted:     {}", deleted.to_string().bright_black());
            println!("  Total hits:  {}", hits.to_string().bright_green().bold());
            println!();
        }
    }

    Ok(())
}
