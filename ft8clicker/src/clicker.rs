use {
    crate::{
        automation::{AutomationLoop, Env, Session},
        button::display_name,
        classify::{describe, summarize_samples},
        events::ClickEvent,
        mode::{CommitTrigger, Mode, ModeController, ModeOutcome},
        notification::{Notification, Outbox},
        settings::{Config, ConfigUpdate, Settings, SettingsStore},
    },
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::time::Instant,
    tracing::{error, warn},
    uiprobe::{PixelSource, Pointer},
};

/// Snapshot for `status` queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub session: Session,
    pub mode: Mode,
    pub pending: Option<String>,
    pub current_band: String,
    pub band_order: Vec<String>,
    pub learned: Vec<String>,
    pub in_cooldown: bool,
    pub config: Config,
}

/// The whole application behind a command interface.
///
/// Every command takes the current instant so tests can drive time explicitly.
pub struct Clicker {
    settings: Settings,
    store: Option<SettingsStore>,
    modes: ModeController,
    automation: AutomationLoop,
    source: Box<dyn PixelSource>,
    pointer: Box<dyn Pointer>,
    outbox: Outbox,
}

impl Clicker {
    /// Loads settings from `store` and saves them back after every change.
    pub fn open(
        store: SettingsStore,
        source: Box<dyn PixelSource>,
        pointer: Box<dyn Pointer>,
    ) -> Self {
        let settings = store.load();
        Self::new(
            settings,
            Some(store),
            source,
            pointer,
            Instant::now(),
            Utc::now(),
        )
    }

    pub fn new(
        settings: Settings,
        store: Option<SettingsStore>,
        source: Box<dyn PixelSource>,
        pointer: Box<dyn Pointer>,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Self {
        let mut automation = AutomationLoop::new(now, wall);
        automation.realign_bands(&settings.learned_buttons, &settings.config);
        Self {
            settings,
            store,
            modes: ModeController::new(),
            automation,
            source,
            pointer,
            outbox: Outbox::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn session(&self) -> &Session {
        self.automation.session()
    }

    pub fn history(&self) -> Vec<ClickEvent> {
        self.automation.events().history().cloned().collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.automation.next_deadline()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.outbox.take()
    }

    pub fn status(&self) -> Status {
        Status {
            session: self.automation.session().clone(),
            mode: self.modes.mode(),
            pending: self.modes.pending().map(String::from),
            current_band: self.automation.current_band().into(),
            band_order: self.automation.band_order().to_vec(),
            learned: self
                .settings
                .learned_buttons
                .ids()
                .map(String::from)
                .collect(),
            in_cooldown: self.automation.in_cooldown(),
            config: self.settings.config.clone(),
        }
    }

    fn with_env<R>(
        &mut self,
        f: impl FnOnce(&mut AutomationLoop, &mut ModeController, &mut Env<'_>) -> R,
    ) -> R {
        let Self {
            settings,
            store,
            modes,
            automation,
            source,
            pointer,
            outbox,
        } = self;
        let mut env = Env {
            registry: &mut settings.learned_buttons,
            config: &settings.config,
            source: source.as_mut(),
            pointer: pointer.as_mut(),
            outbox: &mut *outbox,
            dirty: false,
        };
        let result = f(automation, modes, &mut env);
        let dirty = env.dirty;
        for line in source.take_log_lines() {
            outbox.forward_log(line);
        }
        if dirty {
            persist(store.as_ref(), settings, outbox);
        }
        result
    }

    fn save(&mut self) {
        persist(self.store.as_ref(), &self.settings, &mut self.outbox);
    }

    pub fn run_due(&mut self, now: Instant) {
        self.with_env(|automation, _, env| automation.run_due(now, env));
    }

    pub fn start(&mut self, now: Instant) {
        self.with_env(|automation, _, env| automation.start(now, env));
    }

    pub fn stop(&mut self, now: Instant) {
        self.with_env(|automation, _, env| automation.stop(now, env));
    }

    pub fn toggle_running(&mut self, now: Instant) {
        self.with_env(|automation, _, env| automation.toggle_running(now, env));
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        self.with_env(|automation, _, env| automation.toggle_pause(now, env));
    }

    pub fn toggle_learn(&mut self) {
        let outcome = self.modes.enter_learn();
        self.report(outcome);
    }

    pub fn toggle_locate(&mut self) {
        let outcome = self.modes.enter_locate();
        self.report(outcome);
    }

    pub fn select_target(&mut self, id: &str) {
        let outcome = self.modes.select_target(id);
        self.report(outcome);
    }

    /// A press on one of our own buttons: selects it in learn mode, locates it in
    /// locate mode and clicks it otherwise.
    ///
    /// Locating from a press only moves the cursor onto the FT8 button; the user
    /// clicked our button, not the FT8 one.
    pub fn press(&mut self, id: &str, now: Instant) {
        match self.modes.mode() {
            Mode::Learning => self.select_target(id),
            Mode::Locating => {
                self.select_target(id);
                self.commit(CommitTrigger::Key);
            }
            Mode::Idle => self.trigger(id, now),
        }
    }

    pub fn commit(&mut self, trigger: CommitTrigger) {
        let mode = self.modes.mode();
        let result = self.with_env(|automation, modes, env| {
            let outcome = modes.commit(trigger, env.registry, env.source, env.pointer)?;
            if matches!(outcome, ModeOutcome::Learned { .. }) {
                env.dirty = true;
                automation.realign_bands(env.registry, env.config);
            }
            anyhow::Ok(outcome)
        });
        match result {
            Ok(outcome) => self.report(outcome),
            Err(err) => {
                error!("{mode} commit failed: {err:?}");
                let action = if mode == Mode::Locating {
                    "locating button"
                } else {
                    "learning position"
                };
                self.outbox.log(format!("Error {action}: {err:#}"));
                self.outbox.push(Notification::Mode {
                    mode: self.modes.mode(),
                });
            }
        }
    }

    /// The user clicked `target`, which may be outside the buttons the active mode cares about.
    pub fn external_interaction(&mut self, target: &str) {
        let outcome = self
            .modes
            .notify_external_interaction(target, &self.settings.learned_buttons);
        self.report(outcome);
    }

    pub fn trigger(&mut self, id: &str, now: Instant) {
        self.with_env(|automation, _, env| automation.trigger(id, now, env));
    }

    pub fn update_config(&mut self, update: ConfigUpdate, now: Instant) {
        self.settings.config.apply(update);
        self.save();
        self.with_env(|automation, _, env| automation.config_changed(now, env));
        self.outbox.log("Settings updated");
    }

    pub fn unlearn_all(&mut self) {
        self.settings.learned_buttons.unlearn_all();
        self.save();
        self.automation
            .realign_bands(&self.settings.learned_buttons, &self.settings.config);
        self.outbox.log("Unlearned all buttons");
    }

    fn report(&mut self, outcome: ModeOutcome) {
        let outbox = &mut self.outbox;
        match outcome {
            ModeOutcome::Ignored => return,
            ModeOutcome::Entered { mode, previous } => {
                if previous != Mode::Idle {
                    outbox.log(format!("{previous} mode OFF"));
                }
                match mode {
                    Mode::Learning => outbox.log(
                        "Select a button, then move the mouse cursor to the FT8 app button and \
                         press L",
                    ),
                    Mode::Locating => outbox.log("Select a button to locate."),
                    Mode::Idle => {}
                }
                outbox.log(format!("{mode} mode ON"));
            }
            ModeOutcome::Exited(mode) => outbox.log(format!("{mode} mode OFF")),
            ModeOutcome::Selected { mode, id } => {
                let purpose = if mode == Mode::Learning {
                    "learning"
                } else {
                    "locating"
                };
                outbox.log(format!("Button selected for {purpose}: {id}"));
                return;
            }
            ModeOutcome::Learned { id, learned } => {
                let position = learned.position;
                outbox.log(format!(
                    "Learned `{}` at location {position} with color {} ({}), sampled: {}",
                    display_name(&id),
                    describe(learned.sample.color),
                    learned.state.label(),
                    summarize_samples(&learned.sample.samples),
                ));
                if learned.sample.is_sentinel() {
                    warn!(id, "learned without a captured color");
                }
            }
            ModeOutcome::Located {
                id,
                position,
                state,
                clicked,
            } => {
                outbox.log(format!("Button {id} state: {state}"));
                if clicked {
                    outbox.log(format!("Moved mouse to {id} position at {position} and clicked"));
                } else {
                    outbox.log(format!("Moved mouse to {id} position at {position}"));
                }
            }
            ModeOutcome::NotLearned { id } => outbox.log(format!("{id} not learned")),
        }
        outbox.push(Notification::Mode {
            mode: self.modes.mode(),
        });
    }
}

fn persist(store: Option<&SettingsStore>, settings: &Settings, outbox: &mut Outbox) {
    let Some(store) = store else {
        return;
    };
    if let Err(err) = store.save(settings) {
        error!("failed to save settings: {err:?}");
        outbox.forward_log(format!("Failed to save settings: {err:#}"));
    }
}
