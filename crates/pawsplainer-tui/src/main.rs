use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use pawsplainer_core::{Config, ExplainEvent, FragmentSource, GeminiClient};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "pawsplainer")]
#[command(version, about = "Explains anything with a slideshow of tiny puppies")]
struct Cli {
    /// Ask this question right away
    question: Option<String>,

    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Directory where slide images are saved
    #[arg(long)]
    slides_dir: Option<PathBuf>,

    /// Don't write slides to disk
    #[arg(long)]
    no_save: bool,

    /// Store an API key in the config file and exit
    #[arg(long, value_name = "KEY")]
    save_api_key: Option<String>,
}

fn init_logging() -> Result<()> {
    let log_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?
        .join("pawsplainer");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("pawsplainer.log"))?;

    // The TUI owns stderr, so logs go to a file
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {:#}", e);
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("ignoring unreadable config: {:#}", e);
        Config::new()
    });

    if let Some(key) = cli.save_api_key {
        config.set_api_key(&key)?;
        config.save()?;
        println!("API key saved to {}", Config::get_config_path()?.display());
        return Ok(());
    }

    let model = cli
        .model
        .or_else(|| config.model.clone())
        .unwrap_or_else(|| pawsplainer_core::ai::gemini::DEFAULT_MODEL.to_string());

    let slides_root = if cli.no_save {
        None
    } else {
        match cli.slides_dir {
            Some(dir) => Some(dir),
            None => match config.slides_dir() {
                Ok(dir) => Some(dir),
                Err(e) => {
                    warn!("slide export disabled: {:#}", e);
                    None
                }
            },
        }
    };

    let (source, config_error) = match config.resolve_api_key() {
        Ok(key) => {
            let client: Arc<dyn FragmentSource> =
                Arc::new(GeminiClient::new(&key).with_model(&model));
            (Some(client), None)
        }
        Err(e) => {
            warn!("{}", e);
            (None, Some(e))
        }
    };

    info!(model = %model, configured = source.is_some(), "starting pawsplainer");

    let (explain_tx, explain_rx) = mpsc::unbounded_channel();
    let mut app = App::new(source, config_error, model, slides_root, explain_tx);

    if let Some(question) = cli.question {
        app.submit(&question);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app, explain_rx).await;
    tui::restore()?;

    result
}

async fn run(
    terminal: &mut Tui,
    app: &mut App,
    mut explain_rx: UnboundedReceiver<ExplainEvent>,
) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            event = events.next() => match event {
                Some(event) => handler::handle_event(app, event),
                None => break,
            },
            Some(event) = explain_rx.recv() => app.apply_explain_event(event),
        }
    }

    Ok(())
}
