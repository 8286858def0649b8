use anyhow::Result;
use clap::Parser;

mod app;
mod config;
mod device;
mod installer;
mod logging;
mod ui;
mod wizard;

use app::App;
use config::Config;

#[derive(Parser)]
#[command(name = "regenfass-installer")]
#[command(about = "Terminal setup wizard for regenfass LoRa water-level sensors")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let logging_handle = logging::init_logging(&config, cli.debug)?;
    if let Some(path) = &logging_handle.log_file_path {
        tracing::info!(log_file = %path.display(), "logging to file");
    }

    ui::terminal_guard::install_panic_hook();

    let mut app = App::new(config);
    app.run().await
}
