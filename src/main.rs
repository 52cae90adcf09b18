use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use crawler_core::{AppConfig, FailureReport, TimeWindow};
use post_export::XlsxExporter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use weibo_client::{SearchQuery, TimelineQuery, WeiboApi, WeiboApiClient, WeiboCrawler};

const DEFAULT_LOG_FILTER: &str = "weibo_crawler=info,weibo_client=info,post_export=info";

/// Crawl public Weibo posts into spreadsheets
#[derive(Debug, Parser)]
#[command(name = "weibo-crawler", version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the exported .xlsx files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search each keyword and export `<keyword>.xlsx`
    Search {
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Stop a keyword once more than this many posts are collected
        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// First day to keep (YYYY-MM-DD, Shanghai time)
        #[arg(long)]
        start: Option<String>,

        /// Last day to keep (YYYY-MM-DD, Shanghai time)
        #[arg(long)]
        end: Option<String>,
    },
    /// Crawl one user's timeline and export `<uid>.xlsx`
    User {
        #[arg(long, required_unless_present = "nickname", conflicts_with = "nickname")]
        uid: Option<u64>,

        /// Exact nickname, resolved to a uid first
        #[arg(long)]
        nickname: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Keep only posts containing one of these (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        #[arg(long)]
        max_pages: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::resolve(cli.config.as_deref())?;
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }

    let client = WeiboApiClient::new(&config)?;
    let crawler = WeiboCrawler::new(client, &config);
    let mut exporter = XlsxExporter::new(config.output_dir.clone());

    tracing::info!(
        "Starting Weibo crawler, exporting to {}",
        exporter.output_dir().display()
    );

    let result = match cli.command {
        Command::Search {
            keywords,
            limit,
            start,
            end,
        } => {
            let window = TimeWindow::parse(start.as_deref(), end.as_deref())?;
            run_search(&crawler, &mut exporter, keywords, limit, window).await
        }
        Command::User {
            uid,
            nickname,
            start,
            end,
            keywords,
            max_pages,
        } => {
            let window = TimeWindow::parse(start.as_deref(), end.as_deref())?;
            let uid = match (uid, nickname) {
                (Some(uid), _) => uid,
                (None, Some(nickname)) => crawler.api().lookup_uid(&nickname).await?,
                (None, None) => bail!("either --uid or --nickname is required"),
            };

            let mut query = TimelineQuery::new(uid)
                .with_window(window)
                .with_keywords(keywords);
            if let Some(max_pages) = max_pages {
                query = query.with_max_pages(max_pages);
            }

            match crawler.crawl_user(query, &mut exporter).await {
                Ok(summary) => {
                    tracing::info!(
                        "User {}: {} posts over {} pages",
                        summary.uid,
                        summary.records,
                        summary.pages
                    );
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
    };

    let metrics = crawler.api().retry_executor().get_metrics();
    tracing::info!(
        "Retries: {} total, {} requests recovered, {} requests failed",
        metrics.total_retries,
        metrics.successful_retries,
        metrics.failed_operations
    );

    result
}

/// One search per keyword, in order. A failed keyword is reported and the
/// remaining keywords still run.
async fn run_search<A: WeiboApi>(
    crawler: &WeiboCrawler<A>,
    exporter: &mut XlsxExporter,
    keywords: Vec<String>,
    limit: usize,
    window: TimeWindow,
) -> Result<()> {
    let mut failures = FailureReport::new();

    for keyword in keywords {
        let query = SearchQuery::new(keyword.clone(), limit).with_window(window);
        match crawler.search(&query, exporter).await {
            Ok(summary) => tracing::info!(
                "'{}': {} posts over {} pages ({:?})",
                summary.keyword,
                summary.records,
                summary.pages,
                summary.stop_reason
            ),
            Err(e) => failures.record(&keyword, &e),
        }
    }

    if !failures.is_empty() {
        bail!("search failed for: {}", failures.summary());
    }
    Ok(())
}
