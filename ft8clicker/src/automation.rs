use {
    crate::{
        button::{display_name, is_band, ButtonState, ALL_BANDS, DEFAULT_BAND, ENABLE_TX, SEND_CQ},
        classify::{describe, summarize_samples},
        events::{EventKind, EventRecorder},
        notification::{Notification, Outbox},
        registry::ButtonRegistry,
        safety::{SafetyMonitor, Verdict},
        settings::Config,
        timer::{Due, Task, TimerId, Timers},
    },
    chrono::{DateTime, TimeDelta, Utc},
    serde::Serialize,
    std::{
        collections::HashMap,
        time::{Duration, Instant},
    },
    tracing::{debug, warn},
    uiprobe::{Color, PixelSource, Pointer},
};

/// Pause after clicking "Enable Tx" so the FT8 application can redraw the button.
pub const COOLDOWN: Duration = Duration::from_secs(2);
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const COLOR_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Everything a tick may touch besides the loop's own state.
pub struct Env<'a> {
    pub registry: &'a mut ButtonRegistry,
    pub config: &'a Config,
    pub source: &'a mut dyn PixelSource,
    pub pointer: &'a mut dyn Pointer,
    pub outbox: &'a mut Outbox,
    /// The registry changed and should be saved.
    pub dirty: bool,
}

/// Counters of the current run. Reset on every start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub running: bool,
    pub paused: bool,
    /// Seconds until the next CQ call.
    pub cq_remaining: u32,
    /// Seconds until the run stops by itself; unused when the limit is 0.
    pub app_remaining: u32,
    /// CQs left on the current band.
    pub cqs_remaining: u32,
    /// "Enable Tx" clicks since the last band change.
    pub band_cycle_counter: u32,
}

/// Decides when to click which button.
///
/// All work happens in [`run_due`](Self::run_due), one task at a time, on the caller's thread.
pub struct AutomationLoop {
    session: Session,
    timers: Timers,
    click_timer: Option<TimerId>,
    cq_timer: Option<TimerId>,
    app_timer: Option<TimerId>,
    cooldown: Option<TimerId>,
    safety: SafetyMonitor,
    events: EventRecorder,
    band_order: Vec<String>,
    band_index: usize,
    current_band: String,
    last_seen: HashMap<String, (ButtonState, Color)>,
    epoch: Instant,
    epoch_wall: DateTime<Utc>,
}

impl AutomationLoop {
    /// `wall` is the wall-clock time corresponding to `now`.
    pub fn new(now: Instant, wall: DateTime<Utc>) -> Self {
        let mut timers = Timers::new();
        // Colors are polled even while stopped so the display stays current.
        timers.add_interval(now, COLOR_POLL_INTERVAL, Task::ColorPoll);
        Self {
            session: Session::default(),
            timers,
            click_timer: None,
            cq_timer: None,
            app_timer: None,
            cooldown: None,
            safety: SafetyMonitor::new(),
            events: EventRecorder::new(),
            band_order: Vec::new(),
            band_index: 0,
            current_band: DEFAULT_BAND.into(),
            last_seen: HashMap::new(),
            epoch: now,
            epoch_wall: wall,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn events(&self) -> &EventRecorder {
        &self.events
    }

    pub fn current_band(&self) -> &str {
        &self.current_band
    }

    /// Bands visited by band cycling, in order.
    pub fn band_order(&self) -> &[String] {
        &self.band_order
    }

    pub fn in_cooldown(&self) -> bool {
        self.cooldown.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_instant()
    }

    fn wall_time(&self, now: Instant) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(now.saturating_duration_since(self.epoch))
            .unwrap_or(TimeDelta::zero());
        self.epoch_wall + elapsed
    }

    /// Runs every task due at `now`, each once however late it is.
    ///
    /// Tasks see the real `now`, so a cooldown started here lasts its full length
    /// even when the caller fell behind.
    pub fn run_due(&mut self, now: Instant, env: &mut Env<'_>) {
        while let Some(Due { task, deadline, .. }) = self.timers.pop(now) {
            let late = now.saturating_duration_since(deadline);
            if late > COUNTDOWN_TICK {
                debug!(?task, ?late, "running late task once");
            }
            match task {
                Task::ClickAttempt => self.click_attempt(now, env),
                Task::CqCountdown => self.cq_tick(now, env),
                Task::SessionCountdown => self.session_tick(now, env),
                Task::ColorPoll => self.color_poll(env),
                Task::CooldownEnd => {
                    debug!("cooldown over");
                    self.cooldown = None;
                }
            }
        }
    }

    /// Recomputes the band cycle after learned buttons or visible bands change.
    pub fn realign_bands(&mut self, registry: &ButtonRegistry, config: &Config) {
        self.band_order = ALL_BANDS
            .iter()
            .filter(|band| registry.contains(band) && config.is_visible(band))
            .map(|band| band.to_string())
            .collect();
        self.band_index = self
            .band_order
            .iter()
            .position(|band| *band == self.current_band)
            .unwrap_or(0);
        debug!(bands = ?self.band_order, index = self.band_index, "band order");
    }

    /// Applies a changed configuration to the running session.
    pub fn config_changed(&mut self, now: Instant, env: &mut Env<'_>) {
        self.realign_bands(env.registry, env.config);
        if let Some(id) = self.click_timer.take() {
            self.timers.remove(id);
            self.click_timer = Some(self.timers.add_interval(
                now,
                env.config.click_interval(),
                Task::ClickAttempt,
            ));
        }
        self.push_countdown(env);
    }

    pub fn start(&mut self, now: Instant, env: &mut Env<'_>) {
        if self.session.running {
            return;
        }
        let config = env.config;
        self.session = Session {
            running: true,
            paused: false,
            cq_remaining: config.cq_time,
            app_remaining: config.app_time,
            cqs_remaining: config.cqs_remaining,
            band_cycle_counter: 0,
        };
        self.safety.reset();
        self.cancel_cooldown();
        self.schedule_session(now, config);
        env.outbox.log("Started clicking");
        self.push_run_state(env);
        self.push_countdown(env);
    }

    /// Stops the run. Does nothing if it is not running.
    pub fn stop(&mut self, now: Instant, env: &mut Env<'_>) {
        if !self.session.running {
            return;
        }
        if let Some(event) = self.events.finalize(self.wall_time(now)) {
            env.outbox.push(Notification::ClickEvent { event });
        }
        self.session.running = false;
        self.session.paused = false;
        self.cancel_session();
        self.cancel_cooldown();
        env.outbox.log("Stopped clicking");
        self.push_run_state(env);
    }

    pub fn toggle_running(&mut self, now: Instant, env: &mut Env<'_>) {
        if self.session.running {
            self.stop(now, env);
        } else {
            self.start(now, env);
        }
    }

    /// Pausing freezes both countdowns; resuming restarts them at a full interval.
    pub fn toggle_pause(&mut self, now: Instant, env: &mut Env<'_>) {
        if !self.session.running {
            return;
        }
        if self.session.paused {
            self.session.paused = false;
            self.schedule_session(now, env.config);
            env.outbox.log("Resumed clicking");
        } else {
            self.session.paused = true;
            self.cancel_session();
            env.outbox.log("Paused clicking");
        }
        self.push_run_state(env);
    }

    /// Clicks a learned button on the user's behalf.
    pub fn trigger(&mut self, id: &str, now: Instant, env: &mut Env<'_>) {
        if is_band(id) {
            self.current_band = id.into();
            self.realign_bands(env.registry, env.config);
            env.outbox.log(format!("Selected band: {id}"));
        }
        if !env.registry.contains(id) {
            env.outbox.log(format!("{} not learned", display_name(id)));
            return;
        }
        let event = match id {
            ENABLE_TX => Some(EventKind::Enable),
            SEND_CQ => Some(EventKind::Cq),
            _ if is_band(id) => Some(EventKind::BandChange),
            _ => None,
        };
        self.click_button(id, &format!("Manual click on {id}"), event, now, env);
    }

    fn schedule_session(&mut self, now: Instant, config: &Config) {
        self.cancel_session();
        self.click_timer = Some(self.timers.add_interval(
            now,
            config.click_interval(),
            Task::ClickAttempt,
        ));
        self.cq_timer = Some(
            self.timers
                .add_interval(now, COUNTDOWN_TICK, Task::CqCountdown),
        );
        if config.app_time > 0 {
            self.app_timer = Some(self.timers.add_interval(
                now,
                COUNTDOWN_TICK,
                Task::SessionCountdown,
            ));
        }
    }

    fn cancel_session(&mut self) {
        for id in [
            self.click_timer.take(),
            self.cq_timer.take(),
            self.app_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.timers.remove(id);
        }
    }

    fn cancel_cooldown(&mut self) {
        if let Some(id) = self.cooldown.take() {
            self.timers.remove(id);
        }
    }

    fn is_active(&self) -> bool {
        self.session.running && !self.session.paused
    }

    fn click_attempt(&mut self, now: Instant, env: &mut Env<'_>) {
        if !self.is_active() || self.cooldown.is_some() {
            return;
        }
        let Some((state, _sample)) = env.registry.lookup_state(ENABLE_TX, env.source) else {
            return;
        };
        if state != ButtonState::Inactive {
            return;
        }
        self.click_button(
            ENABLE_TX,
            "Auto-clicked Enable Tx",
            Some(EventKind::Enable),
            now,
            env,
        );
        if !self.session.running {
            // Stopped as a runaway.
            return;
        }
        self.session.cq_remaining = env.config.cq_time;
        self.session.band_cycle_counter += 1;
        let budget = self.session.cqs_remaining;
        if budget > 0 && self.session.band_cycle_counter >= budget {
            self.change_band(now, env);
            self.session.band_cycle_counter = 0;
        }
        self.cooldown = Some(self.timers.add_timeout(now, COOLDOWN, Task::CooldownEnd));
        self.push_countdown(env);
    }

    fn cq_tick(&mut self, now: Instant, env: &mut Env<'_>) {
        if !self.is_active() {
            return;
        }
        self.session.cq_remaining = self.session.cq_remaining.saturating_sub(1);
        if self.session.cq_remaining == 0 {
            let state = env
                .registry
                .lookup_state(SEND_CQ, env.source)
                .map(|(state, _sample)| state);
            if state == Some(ButtonState::Inactive)
                && self.click_button(SEND_CQ, "Auto-clicked CQ", Some(EventKind::Cq), now, env)
            {
                self.session.cq_remaining = env.config.cq_time;
            }
        }
        self.push_countdown(env);
    }

    fn session_tick(&mut self, now: Instant, env: &mut Env<'_>) {
        if !self.session.running {
            return;
        }
        self.session.app_remaining = self.session.app_remaining.saturating_sub(1);
        self.push_countdown(env);
        if self.session.app_remaining == 0 {
            self.stop(now, env);
            env.outbox.log("App stopped due to time limit");
        }
    }

    fn color_poll(&mut self, env: &mut Env<'_>) {
        let ids: Vec<String> = env.registry.ids().map(String::from).collect();
        for id in ids {
            let Some(position) = env.registry.get(&id).map(|button| button.position) else {
                continue;
            };
            let sample = env.source.sample(position);
            if sample.samples.is_empty() {
                // Nothing was captured; the fallback color says nothing about the button.
                continue;
            }
            let color = sample.color;
            let Some(recorded) = env.registry.record_if_new(&id, color) else {
                continue;
            };
            if recorded.changed {
                env.dirty = true;
                env.outbox.log(format!(
                    "Learned new state for {id}: {} with color {}, sampled: {}",
                    recorded.state.label(),
                    describe(color),
                    summarize_samples(&sample.samples),
                ));
            }
            let previous = self.last_seen.insert(id.clone(), (recorded.state, color));
            if previous.map(|(state, _)| state) != Some(recorded.state) && recorded.state.is_known()
            {
                env.outbox.log(format!(
                    "Button {} detected {}",
                    display_name(&id),
                    recorded.state.label()
                ));
            }
            if previous != Some((recorded.state, color)) {
                env.outbox.push(Notification::ButtonState {
                    id,
                    state: recorded.state,
                    color,
                });
            }
        }
    }

    /// Moves to the next band in the cycle. Returns whether the band was clicked.
    fn change_band(&mut self, now: Instant, env: &mut Env<'_>) -> bool {
        if self.band_order.is_empty() {
            env.outbox.log("No learned bands available for cycling");
            return false;
        }
        self.band_index = (self.band_index + 1) % self.band_order.len();
        let band = self.band_order[self.band_index].clone();
        let Some((state, _sample)) = env.registry.lookup_state(&band, env.source) else {
            return false;
        };
        if state == ButtonState::Active {
            debug!(band, "band is already active");
            return false;
        }
        let clicked = self.click_button(
            &band,
            &format!("Changed to band {band}"),
            Some(EventKind::BandChange),
            now,
            env,
        );
        if clicked {
            self.current_band = band;
            self.session.cqs_remaining = env.config.cqs_remaining;
        }
        clicked
    }

    /// Clicks a learned button and restores the cursor. Returns whether the click happened.
    fn click_button(
        &mut self,
        id: &str,
        message: &str,
        event: Option<EventKind>,
        now: Instant,
        env: &mut Env<'_>,
    ) -> bool {
        let Some(position) = env.registry.get(id).map(|button| button.position) else {
            return false;
        };
        if let Err(err) = env.pointer.click_at(position) {
            warn!(id, "click failed: {err:?}");
            env.outbox
                .log(format!("Error clicking {}: {err:#}", display_name(id)));
            return false;
        }
        env.outbox.log(message);
        if id == SEND_CQ {
            self.session.cqs_remaining = self.session.cqs_remaining.saturating_sub(1);
        }
        if let Some(kind) = event {
            self.record_event(kind, now, env);
        }
        true
    }

    fn record_event(&mut self, kind: EventKind, now: Instant, env: &mut Env<'_>) {
        if let Some(event) = self.events.record(kind, self.wall_time(now)) {
            env.outbox.push(Notification::ClickEvent { event });
        }
        if kind != EventKind::Enable {
            return;
        }
        let verdict = self
            .safety
            .observe(now.saturating_duration_since(self.epoch));
        if verdict == Verdict::Runaway && self.session.running {
            env.outbox
                .log("Runaway detected: 3 short QSOs (<5s) in a row, stopping automation.");
            self.stop(now, env);
        }
    }

    fn push_run_state(&self, env: &mut Env<'_>) {
        env.outbox.push(Notification::RunState {
            running: self.session.running,
            paused: self.session.paused,
        });
    }

    fn push_countdown(&self, env: &mut Env<'_>) {
        env.outbox.push(Notification::Countdown {
            cq_remaining: self.session.cq_remaining,
            cq_time: env.config.cq_time,
            cqs_remaining: self.session.cqs_remaining,
            cqs_per_band: env.config.cqs_remaining,
            app_remaining: self.session.app_remaining,
            app_time: env.config.app_time,
        });
    }
}
