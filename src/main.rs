use clap::Parser;
use kefu::core::config::{self, CliOverrides, KefuConfig};
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "kefu", about = "Terminal client for the AI customer-service backend")]
struct Args {
    /// Backend base URL (overrides config file and KEFU_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Skip the start-up GET /health
    #[arg(long)]
    no_health_check: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Logging isn't up yet; keep the error to report once it is
    let (file_config, config_error) = match config::load_config() {
        Ok(c) => (c, None),
        Err(e) => (KefuConfig::default(), Some(e)),
    };
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            base_url: args.base_url,
            no_health_check: args.no_health_check,
        },
    );

    // The terminal belongs to the TUI, so logs go to a file
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(resolved.log_level, log_config, log_file);
    }

    if let Some(e) = config_error {
        log::warn!("Ignoring config file: {}", e);
    }
    log::info!("Kefu starting up against {}", resolved.base_url);

    kefu::tui::run(resolved)
}
