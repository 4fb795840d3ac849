use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use wikiwatch::data::duration::parse_duration;
use wikiwatch::{
    events, ui, Annotation, App, Background, ChartSink, FeedConnector, FeedStatus, Monitor,
    RateSample, ReplayConnector, Settings, TextSink, Theme, UiQueue, UiUpdate, WebSocketConnector,
};

#[derive(Parser, Debug)]
#[command(name = "wikiwatch")]
#[command(about = "Live edit rate, latest edit and new accounts from the Wikipedia edit feed")]
struct Args {
    /// Websocket URL of the edit feed
    #[arg(short, long, conflicts_with = "replay")]
    url: Option<String>,

    /// Replay a recorded feed (one JSON record per line) instead of connecting
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Pause between replayed records (e.g., "200ms", "1s")
    #[arg(long, requires = "replay")]
    replay_interval: Option<String>,

    /// Settings file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rate window length in seconds
    #[arg(short, long)]
    window: Option<u64>,

    /// Maximum number of new-user markers kept on the chart
    #[arg(long)]
    annotation_limit: Option<usize>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print values to stdout instead of drawing the dashboard
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(url) = args.url.clone() {
        settings.url = url;
    }
    if let Some(window) = args.window {
        settings.window_secs = window;
    }
    if let Some(limit) = args.annotation_limit {
        settings.annotation_limit = Some(limit);
    }
    settings.validate()?;

    init_logging(&args)?;

    let rt = Runtime::new()?;
    let context = Background::new("wikiwatch-pipelines", rt.handle().clone());

    let connector = build_connector(&args, &settings, &rt)?;
    let (mut monitor, queue) = Monitor::new(settings.pipeline_config());
    monitor.start(connector, &context)?;

    let result = if args.headless {
        rt.block_on(run_headless(&monitor, queue, settings.window()))
    } else {
        run_tui(&monitor, queue, &settings)
    };

    monitor.teardown();
    rt.shutdown_timeout(Duration::from_secs(1));

    result
}

/// Install the log subscriber.
///
/// The dashboard owns the terminal, so it only logs when given a file.
fn init_logging(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wikiwatch=info"));

    if let Some(ref path) = args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

fn build_connector(
    args: &Args,
    settings: &Settings,
    rt: &Runtime,
) -> Result<Box<dyn FeedConnector>> {
    if let Some(ref path) = args.replay {
        let interval = args
            .replay_interval
            .as_deref()
            .map(parse_duration)
            .transpose()?;
        let _guard = rt.enter();
        let connector = ReplayConnector::open(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?
            .with_interval(interval);
        return Ok(Box::new(connector));
    }

    let connector = WebSocketConnector::new(&settings.url)?.with_reconnect(settings.backoff());
    Ok(Box::new(connector))
}

/// Run the dashboard on this thread while the pipelines run on the runtime.
fn run_tui(monitor: &Monitor, queue: UiQueue<UiUpdate>, settings: &Settings) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let mut app = App::new(settings.dashboard(), queue, monitor);
    app.theme = Theme::auto_detect();

    let result = run_app(&mut terminal, &mut app, settings.refresh_interval());

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    while app.running {
        app.pump();
        terminal.draw(|frame| ui::render(frame, app))?;

        if let Some(event) = events::poll_event(refresh_interval)? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Prints every value the pipelines deliver, one line each.
struct ConsoleSink;

impl ChartSink for ConsoleSink {
    fn append_value(&mut self, sample: RateSample) {
        println!(
            "{} rate {:.1} edits/s ({} events)",
            sample.closed_at.format("%H:%M:%S"),
            sample.rate,
            sample.events
        );
    }

    fn add_annotation(&mut self, annotation: Annotation) {
        println!("{} newuser", annotation.time.format("%H:%M:%S"));
    }

    fn redraw(&mut self) {}
}

impl TextSink for ConsoleSink {
    fn set_text(&mut self, content: &str) {
        println!("edit {}", content);
    }
}

/// Print values until Ctrl-C, or until a replay has finished and its last
/// window has closed.
async fn run_headless(monitor: &Monitor, mut queue: UiQueue<UiUpdate>, window: Duration) -> Result<()> {
    let mut status = monitor.status();
    let mut sink = ConsoleSink;
    let mut finish_at: Option<tokio::time::Instant> = None;

    loop {
        let finished = async move {
            match finish_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            update = queue.recv() => match update {
                Some(update) => update.apply(&mut sink),
                None => break,
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                eprintln!("feed {}", current);
                if current == FeedStatus::Finished {
                    finish_at = Some(tokio::time::Instant::now() + window);
                }
            }
            _ = finished => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
