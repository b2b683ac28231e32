use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use recipe_client::auth::authenticate;
use recipe_client::drive::DriveClient;
use recipe_client::lazy_header;
use recipe_client::mealie::MealieClient;
use recipe_client::openai::OpenAiConverter;
use recipe_client::pipeline::run_import;
use recipe_client::walk::{get_all_recipe_docs, WalkOptions};
use recipe_common::config::{default_config_path, parse_import_config, ImportConfig, LogConfig};
use recipe_common::logging::LogIgnoreFilter;
use recipe_common::retry::RetryPolicy;

#[derive(Parser)]
#[command(name = "recipe-import", about = "Import recipes from a Google Drive folder into Mealie")]
struct Args {
    /// Path to config file (default: ~/.config/recipe-import/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Walk and extract only; print each record as a JSON line
    #[arg(long)]
    dry_run: bool,
}

// Current-thread runtime: the lazy file header keeps its state per thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());

    init_logging(&config.log)?;
    config.validate(!args.dry_run)?;

    let http = reqwest::Client::new();
    let credential = authenticate(&http, &config.drive).await?;
    let drive = DriveClient::new(http.clone(), &config.drive.api_base, &credential);

    tracing::info!("walking Drive folder {}", config.drive.folder_id);
    let options = WalkOptions {
        include_root_as_tag: config.drive.include_root_folder_as_tag,
    };
    let records = get_all_recipe_docs(&drive, &config.drive.folder_id, options).await?;
    tracing::info!("found {} recipe documents", records.len());

    if args.dry_run {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    let converter = OpenAiConverter::new(http.clone(), &config.openai);
    let publisher = MealieClient::new(http, &config.mealie.url, &config.mealie.token);
    let policy = RetryPolicy::from(&config.retry);
    let summary = run_import(&records, &converter, &publisher, &policy).await;

    let suppressed = recipe_common::logging::suppressed_count();
    if suppressed > 0 {
        tracing::info!("{suppressed} third-party log messages matched [log] ignore");
    }
    if summary.failed > 0 {
        tracing::warn!("{} of {} recipes failed to import", summary.failed, records.len());
    }
    Ok(())
}

/// An explicit `--config` must exist; the default path may be absent, in which
/// case everything comes from the environment.
fn load_config(explicit: Option<&str>) -> Result<ImportConfig> {
    let path = match explicit {
        Some(p) => p.to_string(),
        None => {
            let p = default_config_path();
            if !std::path::Path::new(&p).exists() {
                return Ok(ImportConfig::default());
            }
            p
        }
    };
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
    parse_import_config(&raw).with_context(|| format!("in {path}"))
}

fn init_logging(log: &LogConfig) -> Result<()> {
    let file_layers = log.dir.as_deref().map(log_file_layers).transpose()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn,recipe_import=info,recipe_client=info".into()))
        .with(lazy_header::FileHeaderLayer)
        .with(tracing_subscriber::fmt::layer().with_filter(LogIgnoreFilter))
        .with(file_layers)
        .init();

    if let Err(e) = recipe_common::logging::set_ignore_patterns(&log.ignore) {
        tracing::warn!("invalid log ignore pattern: {e}");
    }
    Ok(())
}

/// `combined.log` gets everything the console gets; `error.log` only errors.
fn log_file_layers<S>(dir: &str) -> Result<impl Layer<S>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(dir).with_context(|| format!("creating log dir {dir}"))?;
    let combined = tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::never(dir, "combined.log"))
        .with_ansi(false)
        .with_filter(LogIgnoreFilter);
    let errors = tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::never(dir, "error.log"))
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);
    Ok(combined.and_then(errors))
}
