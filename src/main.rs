use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::process;
use std::sync::Arc;
use taskdeck::api::SupabaseClient;
use taskdeck::app::App;
use taskdeck::cache::QueryCache;
use taskdeck::config::Config;
use taskdeck::store::Store;
use taskdeck::{logging, ui};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reads .env, config.toml and the environment
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            process::exit(2);
        }
    };

    let log_file = logging::init();
    info!(url = %config.url, log_file = ?log_file, "starting");

    let client = Arc::new(SupabaseClient::new(&config)?);
    let store = Store::new(client.clone(), client, Arc::new(QueryCache::new()));

    let app = App::new(store);
    app.refresh();

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = ui::run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "terminal loop failed");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
