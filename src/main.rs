//! In-Game Survey thumbnail binary

use clap::{Parser, ValueEnum};
use std::io;
use std::time::Duration;
use survey_thumbnail::{
    Config, InGameSurveyThumbnail, JsonRenderer, Result, TextRenderer, ThumbnailRenderer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Load the In-Game Survey thumbnail once and print it
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Base URL of the deployed survey service
    #[arg(long)]
    service_url: Option<String>,

    /// Cloud resource/stack identifier of the gem
    #[arg(long)]
    identifier: Option<String>,

    #[arg(long)]
    display_name: Option<String>,

    #[arg(long)]
    src_icon: Option<String>,

    /// Give up on each request after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long)]
    bearer_token: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(service_url) = self.service_url {
            config.service_url = service_url;
        }
        if let Some(identifier) = self.identifier {
            config.identifier = identifier;
        }
        if let Some(display_name) = self.display_name {
            config.display_name = display_name;
        }
        if let Some(src_icon) = self.src_icon {
            config.src_icon = src_icon;
        }
        if let Some(seconds) = self.timeout_secs {
            config.http_timeout = Some(Duration::from_secs(seconds));
        }
        if let Some(token) = self.bearer_token {
            config.bearer_token = Some(token);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let cli = Cli::parse();
    let format = cli.format;

    let mut config = Config::from_env();
    cli.apply(&mut config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Thumbnail configuration - Service: {}, Identifier: {}, Timeout: {:?}",
        config.service_url, config.identifier, config.http_timeout
    );

    let mut thumbnail = InGameSurveyThumbnail::new(config.inputs());
    thumbnail.init(config.handler_options())?;

    let interrupted = tokio::select! {
        _ = thumbnail.settle() => false,
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        warn!("Interrupted before the thumbnail finished loading");
        thumbnail.dispose();
    }

    let props = thumbnail.props();
    let stdout = io::stdout().lock();
    match format {
        Format::Text => TextRenderer::new(stdout).render(&props)?,
        Format::Json => JsonRenderer::new(stdout).render(&props)?,
    }

    Ok(())
}

/// Initialize structured logging on stderr
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
