mod commands;

use {
    crate::commands::{apply, parse_line},
    anyhow::Context as _,
    clap::Parser,
    ft8clicker::{Clicker, ConfigUpdate, SettingsStore},
    std::{
        io::{self, BufRead as _, Write as _},
        ops::ControlFlow,
        path::PathBuf,
        sync::mpsc::{self, Receiver, RecvTimeoutError},
        thread,
        time::{Duration, Instant},
    },
    tracing::{info, warn},
    tracing_subscriber::{filter::LevelFilter, EnvFilter},
    uiprobe::{EnigoPointer, PixelSampler},
};

#[derive(Parser)]
pub struct Args {
    /// Settings file.
    #[clap(long, default_value = "settings.json")]
    pub settings: PathBuf,
    /// Seconds between "Enable Tx" checks; saved to the settings file.
    #[clap(long)]
    pub interval: Option<f64>,
    /// Start clicking immediately.
    #[clap(long)]
    pub start: bool,
    /// Ignore stdin and only run the timers.
    #[clap(long)]
    pub no_stdin: bool,
    /// Print notifications to stdout as JSON lines.
    #[clap(long)]
    pub json: bool,
}

const IDLE_WAIT: Duration = Duration::from_secs(1);

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("failed to read stdin: {err:?}");
                    break;
                }
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_notifications(clicker: &mut Clicker, json: bool) -> anyhow::Result<()> {
    let notifications = clicker.take_notifications();
    if !json {
        // Log lines already went through tracing.
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    for notification in notifications {
        serde_json::to_writer(&mut stdout, &notification)?;
        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn handle_line(clicker: &mut Clicker, line: &str) -> anyhow::Result<ControlFlow<()>> {
    match parse_line(line) {
        Ok(Some(command)) => apply(clicker, command, Instant::now()),
        Ok(None) => Ok(ControlFlow::Continue(())),
        Err(err) => {
            err.print()?;
            Ok(ControlFlow::Continue(()))
        }
    }
}

pub fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .init();

    if let Err(issue) = uiprobe::preflight() {
        warn!("{issue}");
    }
    let pointer = EnigoPointer::new().context("failed to set up mouse control")?;
    let mut clicker = Clicker::open(
        SettingsStore::new(&args.settings),
        Box::new(PixelSampler::new()),
        Box::new(pointer),
    );
    info!(
        "loaded {} learned buttons from {:?}",
        clicker.settings().learned_buttons.len(),
        args.settings
    );
    if let Some(interval) = args.interval {
        let update = ConfigUpdate {
            click_interval: Some(interval),
            ..ConfigUpdate::default()
        };
        clicker.update_config(update, Instant::now());
    }
    if args.start {
        clicker.start(Instant::now());
    }

    let mut commands = (!args.no_stdin).then(spawn_stdin_reader);
    loop {
        print_notifications(&mut clicker, args.json)?;
        let timeout = clicker
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT);
        if let Some(rx) = &commands {
            match rx.recv_timeout(timeout) {
                Ok(line) => {
                    if handle_line(&mut clicker, &line)?.is_break() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("stdin closed, running on timers only");
                    commands = None;
                }
            }
        } else {
            thread::sleep(timeout);
        }
        clicker.run_due(Instant::now());
    }

    clicker.stop(Instant::now());
    print_notifications(&mut clicker, args.json)?;
    Ok(())
}
