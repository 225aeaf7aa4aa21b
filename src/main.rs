use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;

mod app;
mod attachment;
mod client;
mod handler;
mod logging;
mod transcript;
mod tui;
mod ui;

use app::App;
use client::InferenceClient;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "vision-chat")]
#[command(about = "Chat with a local inference server, with optional image attachments")]
#[command(version)]
struct Cli {
    /// Where to write logs (verbosity via RUST_LOG)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Image to attach to the first message
    #[arg(long, value_name = "PATH")]
    attach: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.unwrap_or_else(logging::default_log_path);
    logging::init(&log_path);
    tracing::info!(endpoint = client::ENDPOINT, "starting vision-chat");

    tui::install_panic_hook();
    let mut terminal = match tui::init() {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = tui::restore();
            return Err(e);
        }
    };

    let result = run(&mut terminal, cli.attach).await;
    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!(error = ?e, "exiting with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, attach: Option<PathBuf>) -> Result<()> {
    let mut app = App::new(InferenceClient::new(client::ENDPOINT));
    let mut events = EventHandler::new();
    let tx = events.sender();

    if let Some(path) = attach {
        handler::select_image(&mut app, path, &tx);
    }

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event, &tx)?,
            None => break,
        }
    }

    tracing::info!("shutting down");
    Ok(())
}
