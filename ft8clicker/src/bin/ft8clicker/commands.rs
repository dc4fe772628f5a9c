use {
    clap::Parser,
    ft8clicker::{Clicker, CommitTrigger, ConfigUpdate},
    std::{ops::ControlFlow, time::Instant},
};

/// Commands read from stdin, one per line.
#[derive(Debug, PartialEq, Parser)]
#[command(no_binary_name = true, name = "command")]
pub enum Command {
    /// Start clicking.
    Start,
    /// Stop clicking.
    Stop,
    /// Start if stopped, stop if running.
    Toggle,
    /// Pause or resume.
    Pause,
    /// Turn learn mode on or off.
    Learn,
    /// Turn locate mode on or off.
    Locate,
    /// Choose the button to learn or locate.
    Select { id: String },
    /// Press one of our buttons as if clicked in a window.
    Press { id: String },
    /// Learn the selected button at the cursor, or locate it.
    Commit {
        /// Also click the located button.
        #[arg(long)]
        click: bool,
    },
    /// Click a learned button now.
    Trigger { id: String },
    /// Report a click on something else, which cancels learn or locate mode.
    Outside { target: String },
    /// Change settings.
    Set {
        /// Seconds between "Enable Tx" checks.
        #[arg(long)]
        interval: Option<f64>,
        /// Seconds between CQ calls.
        #[arg(long)]
        cq_time: Option<u32>,
        /// CQs per band before changing band; 0 disables band changes.
        #[arg(long)]
        cqs: Option<u32>,
        /// Session length in minutes; 0 means unlimited.
        #[arg(long)]
        app_minutes: Option<u32>,
        /// Comma-separated bands shown and cycled through.
        #[arg(long, value_delimiter = ',')]
        bands: Option<Vec<String>>,
    },
    /// Forget every learned button.
    Unlearn,
    /// Print the current state as JSON.
    Status,
    /// Exit.
    Quit,
}

/// `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<Command>, clap::Error> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    Command::try_parse_from(line.split_whitespace()).map(Some)
}

pub fn apply(
    clicker: &mut Clicker,
    command: Command,
    now: Instant,
) -> anyhow::Result<ControlFlow<()>> {
    match command {
        Command::Start => clicker.start(now),
        Command::Stop => clicker.stop(now),
        Command::Toggle => clicker.toggle_running(now),
        Command::Pause => clicker.toggle_pause(now),
        Command::Learn => clicker.toggle_learn(),
        Command::Locate => clicker.toggle_locate(),
        Command::Select { id } => clicker.select_target(&id),
        Command::Press { id } => clicker.press(&id, now),
        Command::Commit { click } => clicker.commit(if click {
            CommitTrigger::Click
        } else {
            CommitTrigger::Key
        }),
        Command::Trigger { id } => clicker.trigger(&id, now),
        Command::Outside { target } => clicker.external_interaction(&target),
        Command::Set {
            interval,
            cq_time,
            cqs,
            app_minutes,
            bands,
        } => clicker.update_config(
            ConfigUpdate {
                click_interval: interval,
                visible_bands: bands,
                cq_time,
                cqs_per_band: cqs,
                app_minutes,
            },
            now,
        ),
        Command::Unlearn => clicker.unlearn_all(),
        Command::Status => println!("{}", serde_json::to_string_pretty(&clicker.status())?),
        Command::Quit => return Ok(ControlFlow::Break(())),
    }
    Ok(ControlFlow::Continue(()))
}
