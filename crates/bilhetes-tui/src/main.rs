use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use bilhetes_core::Zone;
use bilhetes_service::BlockingHttpService;
use bilhetes_tui::app::App;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bilhetes", about = "Ticket board in the terminal")]
struct Cli {
    /// Connect to a running bilhetes-server instead of starting one
    #[arg(long, env = "BILHETES_SERVER")]
    server: Option<String>,

    /// Port for the locally started server
    #[arg(long, env = "BILHETES_PORT", default_value_t = 3710)]
    port: u16,

    /// Where dashboard exports are written
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging()?;

    // A remote server may sit in another zone, so pin ours to the wire.
    let (server_url, zone, mut child) = match cli.server {
        Some(url) => (url, Zone::current_offset(), None),
        None => {
            let child = spawn_server(cli.port, &log_path)?;
            let url = format!("http://127.0.0.1:{}", cli.port);
            (url, Zone::Local, Some(child))
        }
    };
    tracing::info!(server = %server_url, "starting tui");

    let service = BlockingHttpService::new(&server_url)?;
    let result = wait_for_server(&service).and_then(|()| run_tui(service, zone, cli.export_dir));

    if let Some(ref mut child) = child {
        let _ = child.kill();
        let _ = child.wait();
    }

    result
}

/// Log to `<data dir>/bilhetes.log`; the terminal belongs to the UI.
fn init_logging() -> Result<PathBuf> {
    let dir = bilhetes_db::data_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join("bilhetes.log");
    let file = open_log(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(path)
}

fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log {}", path.display()))
}

fn spawn_server(port: u16, log_path: &Path) -> Result<Child> {
    // Prefer the server binary installed next to this one.
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.join("bilhetes-server")))
        .filter(|p| p.exists());
    let server_bin = sibling.unwrap_or_else(|| PathBuf::from("bilhetes-server"));

    Command::new(&server_bin)
        .env("BILHETES_BIND", "127.0.0.1")
        .env("BILHETES_PORT", port.to_string())
        .stdout(Stdio::null())
        .stderr(open_log(log_path)?)
        .spawn()
        .with_context(|| format!("failed to start {}", server_bin.display()))
}

fn wait_for_server(service: &BlockingHttpService) -> Result<()> {
    let start = Instant::now();
    let timeout = Duration::from_secs(10);

    loop {
        if service.health_check().is_ok() {
            return Ok(());
        }
        if start.elapsed() > timeout {
            bail!(
                "bilhetes-server at {} did not become ready within {}s",
                service.base_url(),
                timeout.as_secs()
            );
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn run_tui(service: BlockingHttpService, zone: Zone, export_dir: PathBuf) -> Result<()> {
    let app = App::new_in_zone(service, zone)?.with_export_dir(export_dir);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "tui exited with error");
        eprintln!("Error: {e}");
    }
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        if let Event::Key(key) = event::read()? {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }
            if key.code == KeyCode::Char('q') && !app.is_input_mode() {
                break;
            }
            app.handle_key(key);
        }
    }
    Ok(())
}
