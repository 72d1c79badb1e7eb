//! Job scanner CLI
//!
//! Runs one-off scans and record deletions against the roster database, or
//! stays up and runs the periodic scan and digest jobs.

use std::sync::Arc;

use anyhow::{Context, Result};
use brightdata_client::BrightDataClient;
use clap::{Parser, Subcommand};
use job_scanner::clock::{SystemClock, TokioSleeper};
use job_scanner::schedule::{due_companies, start_scheduler};
use job_scanner::{
    CareersUrlResolver, Config, FileCache, HarvestConfig, Harvester, LinkedInSource,
    LlmRelevanceClassifier, LogNotifier, ModelConfig, OpenAI, PostgresStore, PostingExtractor,
    ScanType, Scanner, SerpApiSearch, SiteProfiles, StructureClassifier, WebsiteSource,
};
use job_scanner::browser::ChromeDriver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "job-scanner")]
#[command(about = "Scan monitored companies for new and removed job postings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one company, or every company of the account
    Scan {
        #[arg(long)]
        account: String,
        #[arg(long)]
        company: Option<String>,
        /// Comma-separated sources to scan
        #[arg(long, value_delimiter = ',', default_value = "website,linkedin")]
        types: Vec<ScanType>,
    },

    /// Delete stored job records
    DeleteRecords {
        #[arg(long)]
        account: String,
        #[arg(long)]
        company: Option<String>,
        /// Only delete jobs from this source
        #[arg(long)]
        source: Option<ScanType>,
    },

    /// List companies whose scan period has elapsed
    Due {
        #[arg(long)]
        account: String,
    },

    /// Run the periodic scan and digest jobs until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_scanner=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Scan {
            account,
            company,
            types,
        } => cmd_scan(&config, &account, company.as_deref(), &types).await,
        Commands::DeleteRecords {
            account,
            company,
            source,
        } => cmd_delete(&config, &account, company.as_deref(), source).await,
        Commands::Due { account } => cmd_due(&config, &account).await,
        Commands::Watch => cmd_watch(&config).await,
    }
}

async fn cmd_scan(
    config: &Config,
    account: &str,
    company: Option<&str>,
    types: &[ScanType],
) -> Result<()> {
    let scanner = build_scanner(config).await?;
    let report = scanner.scan_company(account, company, types).await?;
    let companies = report.into_companies();
    println!("{}", serde_json::to_string_pretty(&companies)?);
    Ok(())
}

async fn cmd_delete(
    config: &Config,
    account: &str,
    company: Option<&str>,
    source: Option<ScanType>,
) -> Result<()> {
    let store = PostgresStore::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let scanner = Scanner::new(Arc::new(store));
    scanner.delete_records(account, company, source).await?;
    tracing::info!(account, company = ?company, source = ?source, "Records deleted");
    Ok(())
}

async fn cmd_due(config: &Config, account: &str) -> Result<()> {
    let store = PostgresStore::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    for company in due_companies(&store, account, chrono::Utc::now()).await? {
        println!("{}\t{}", company.id, company.name);
    }
    Ok(())
}

async fn cmd_watch(config: &Config) -> Result<()> {
    let scanner = Arc::new(build_scanner(config).await?);
    let mut scheduler = start_scheduler(
        scanner,
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
        config,
    )
    .await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down scheduler");
    scheduler.shutdown().await?;
    Ok(())
}

/// Wire up every source the configuration has credentials for.
async fn build_scanner(config: &Config) -> Result<Scanner> {
    let store = PostgresStore::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let models = ModelConfig::default();
    let mut scanner = Scanner::new(Arc::new(store));

    let ai = config
        .openai_api_key
        .as_ref()
        .map(|key| Arc::new(OpenAI::new(key.clone())));

    match &ai {
        Some(ai) => {
            let harvest = HarvestConfig::default();
            let driver = ChromeDriver::launch(
                config.headless,
                config.chrome_path.clone(),
                harvest.user_agent.clone(),
            )
            .context("Failed to launch Chrome")?;

            let mut website = WebsiteSource::new(
                Harvester::new(Arc::new(driver), harvest),
                StructureClassifier::new(ai.clone(), models.structure.clone()),
                PostingExtractor::new(ai.clone(), models.extraction.clone()),
            );

            if let Some(path) = &config.site_profiles_path {
                website = website.with_profiles(SiteProfiles::from_file(path)?);
            }

            if let Some(key) = &config.serpapi_key {
                website = website.with_careers_resolver(CareersUrlResolver::new(
                    Arc::new(SerpApiSearch::new(key.clone())),
                    ai.clone(),
                    models.careers.clone(),
                    Arc::new(FileCache::new(config.careers_cache_path())),
                ));
            } else {
                tracing::info!("SERPAPI_KEY not set, careers pages are scanned as given");
            }

            scanner = scanner.with_website(Arc::new(website));

            if config.classify_postings {
                scanner = scanner.with_relevance(Arc::new(LlmRelevanceClassifier::new(
                    ai.clone(),
                    models.relevance.clone(),
                )));
            }
        }
        None => tracing::warn!("OPENAI_API_KEY not set, website scanning disabled"),
    }

    match &config.brightdata_api_key {
        Some(key) => {
            let linkedin = LinkedInSource::new(
                Arc::new(BrightDataClient::new(key.clone())),
                Arc::new(FileCache::new(config.linkedin_cache_path())),
                config.snapshot_poll,
                Arc::new(TokioSleeper),
            );
            scanner = scanner.with_linkedin(Arc::new(linkedin));
        }
        None => tracing::warn!("BRIGHTDATA_API_KEY not set, LinkedIn scanning disabled"),
    }

    Ok(scanner)
}
