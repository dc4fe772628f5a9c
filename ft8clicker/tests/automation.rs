use {
    chrono::{DateTime, Utc},
    ft8clicker::{
        registry::ButtonRegistry, Clicker, ClickEvent, CommitTrigger, Config, EventKind, Mode,
        Notification, Settings, SettingsStore,
    },
    std::{
        cell::RefCell,
        collections::HashMap,
        rc::Rc,
        time::{Duration, Instant},
    },
    uiprobe::{CaptureMethod, Color, PixelSource, Pointer, Sample, ScreenPoint},
};

const WHITE: Color = Color::new(255, 255, 255);
const GREEN: Color = Color::new(0, 200, 0);

const ENABLE_AT: ScreenPoint = ScreenPoint::new(10, 10);
const CQ_AT: ScreenPoint = ScreenPoint::new(20, 10);
const BAND_40M_AT: ScreenPoint = ScreenPoint::new(100, 50);
const BAND_20M_AT: ScreenPoint = ScreenPoint::new(120, 50);
const BAND_15M_AT: ScreenPoint = ScreenPoint::new(140, 50);

#[derive(Clone, Default)]
struct FakeScreen(Rc<RefCell<HashMap<ScreenPoint, Color>>>);

impl FakeScreen {
    fn paint(&self, point: ScreenPoint, color: Color) {
        self.0.borrow_mut().insert(point, color);
    }
}

impl PixelSource for FakeScreen {
    fn sample(&mut self, point: ScreenPoint) -> Sample {
        match self.0.borrow().get(&point) {
            Some(color) => Sample::from_samples(vec![*color; 81], CaptureMethod::ScreenRegion),
            None => Sample::sentinel(),
        }
    }
}

#[derive(Default)]
struct PointerState {
    position: ScreenPoint,
    clicks: Vec<ScreenPoint>,
    broken: bool,
}

#[derive(Clone, Default)]
struct FakePointer(Rc<RefCell<PointerState>>);

impl FakePointer {
    fn clicks(&self) -> Vec<ScreenPoint> {
        self.0.borrow().clicks.clone()
    }

    fn place(&self, point: ScreenPoint) {
        self.0.borrow_mut().position = point;
    }
}

impl Pointer for FakePointer {
    fn position(&mut self) -> anyhow::Result<ScreenPoint> {
        Ok(self.0.borrow().position)
    }

    fn move_to(&mut self, point: ScreenPoint) -> anyhow::Result<()> {
        self.0.borrow_mut().position = point;
        Ok(())
    }

    fn click(&mut self) -> anyhow::Result<()> {
        let mut state = self.0.borrow_mut();
        anyhow::ensure!(!state.broken, "input synthesis is unavailable");
        let position = state.position;
        state.clicks.push(position);
        Ok(())
    }
}

struct Harness {
    clicker: Clicker,
    screen: FakeScreen,
    pointer: FakePointer,
    start: Instant,
}

impl Harness {
    fn new(config: Config, buttons: &[(&str, ScreenPoint, Color)]) -> Self {
        let screen = FakeScreen::default();
        let mut registry = ButtonRegistry::new();
        for (id, point, color) in buttons {
            screen.paint(*point, *color);
            registry.learn(id, *point, &mut screen.clone());
        }
        let settings = Settings {
            config,
            learned_buttons: registry,
            ..Settings::default()
        };
        Self::with_settings(settings, None, screen)
    }

    fn with_settings(settings: Settings, store: Option<SettingsStore>, screen: FakeScreen) -> Self {
        let pointer = FakePointer::default();
        let start = Instant::now();
        let clicker = Clicker::new(
            settings,
            store,
            Box::new(screen.clone()),
            Box::new(pointer.clone()),
            start,
            DateTime::<Utc>::UNIX_EPOCH,
        );
        Self {
            clicker,
            screen,
            pointer,
            start,
        }
    }

    fn at(&self, seconds: f64) -> Instant {
        self.start + Duration::from_secs_f64(seconds)
    }

    /// Wakes at every deadline up to `seconds`, like the binary's loop does.
    fn run_until(&mut self, seconds: f64) {
        let end = self.at(seconds);
        while let Some(deadline) = self.clicker.next_deadline().filter(|d| *d <= end) {
            self.clicker.run_due(deadline);
        }
        self.clicker.run_due(end);
    }

    fn logs(&mut self) -> Vec<String> {
        self.clicker
            .take_notifications()
            .into_iter()
            .filter_map(|notification| match notification {
                Notification::Log { message } => Some(message),
                _ => None,
            })
            .collect()
    }
}

fn quiet_config() -> Config {
    Config {
        cq_time: 3000,
        app_time: 0,
        ..Config::default()
    }
}

/// Paints the button green and lets two color polls after `from` learn that green means lit.
fn teach_active_color(harness: &mut Harness, id: &str, point: ScreenPoint, from: f64) {
    harness.screen.paint(point, GREEN);
    // First poll seeds the color, second reclassifies it once two are known.
    harness.run_until(from + 1.0);
    harness.run_until(from + 2.0);
    let button = harness.clicker.settings().learned_buttons.get(id).unwrap();
    assert_eq!(button.states.get(&GREEN), Some(&ft8clicker::ButtonState::Active));
}

#[test]
fn clicks_enable_tx_when_inactive_and_respects_cooldown() {
    let mut h = Harness::new(quiet_config(), &[("enable_tx", ENABLE_AT, WHITE)]);
    h.pointer.place(ScreenPoint::new(500, 500));
    h.clicker.start(h.at(0.0));

    h.run_until(2.4);
    assert_eq!(h.pointer.clicks(), vec![ENABLE_AT]);
    // Cursor goes back where the user left it.
    assert_eq!(h.pointer.0.borrow().position, ScreenPoint::new(500, 500));
    let status = h.clicker.status();
    assert!(status.in_cooldown);
    assert_eq!(status.session.band_cycle_counter, 1);
    assert!(h.logs().contains(&"Auto-clicked Enable Tx".to_string()));

    h.run_until(3.0);
    assert_eq!(h.pointer.clicks().len(), 2);
}

#[test]
fn stalled_loop_catches_up_with_a_single_click() {
    let mut h = Harness::new(quiet_config(), &[("enable_tx", ENABLE_AT, WHITE)]);
    h.clicker.start(h.at(0.0));

    // Nothing ran for ten seconds, then one wake-up.
    h.clicker.run_due(h.at(10.0));
    assert_eq!(h.pointer.clicks(), vec![ENABLE_AT]);
    assert!(h.clicker.status().in_cooldown);
    assert_eq!(h.clicker.session().cq_remaining, 2999);

    // The cooldown counts from the wake-up, not from the missed deadlines.
    h.run_until(12.4);
    assert_eq!(h.pointer.clicks().len(), 1);
    h.run_until(12.5);
    assert_eq!(h.pointer.clicks().len(), 2);
    assert!(h.clicker.session().running);
}

#[test]
fn runaway_stops_on_third_short_gap() {
    let mut h = Harness::new(quiet_config(), &[("enable_tx", ENABLE_AT, WHITE)]);
    h.clicker.start(h.at(0.0));

    // Clicks land at 0.5, 3.0 and 5.5 s: two short gaps so far.
    h.run_until(7.9);
    assert_eq!(h.pointer.clicks().len(), 3);
    assert!(h.clicker.session().running);

    h.run_until(8.0);
    assert_eq!(h.pointer.clicks().len(), 4);
    assert!(!h.clicker.session().running);
    let logs = h.logs();
    assert!(logs.contains(
        &"Runaway detected: 3 short QSOs (<5s) in a row, stopping automation.".to_string()
    ));
    assert!(logs.contains(&"Stopped clicking".to_string()));

    let kinds: Vec<EventKind> = h.clicker.history().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Enable,
            EventKind::Enable,
            EventKind::Enable,
            EventKind::Stop
        ]
    );

    h.run_until(30.0);
    assert_eq!(h.pointer.clicks().len(), 4);
}

#[test]
fn cq_countdown_clicks_at_zero_and_holds_when_busy() {
    let config = Config {
        cq_time: 3,
        app_time: 0,
        ..Config::default()
    };
    let mut h = Harness::new(config, &[("tx6", CQ_AT, WHITE)]);
    h.clicker.start(h.at(0.0));
    assert_eq!(h.clicker.session().cqs_remaining, 10);

    h.run_until(2.0);
    assert_eq!(h.clicker.session().cq_remaining, 1);
    h.run_until(3.0);
    assert_eq!(h.pointer.clicks(), vec![CQ_AT]);
    assert_eq!(h.clicker.session().cq_remaining, 3);
    assert_eq!(h.clicker.session().cqs_remaining, 9);

    // Transmitting: the countdown waits at zero.
    teach_active_color(&mut h, "tx6", CQ_AT, 3.0);
    h.run_until(20.0);
    assert_eq!(h.clicker.session().cq_remaining, 0);
    assert_eq!(h.pointer.clicks().len(), 1);

    h.screen.paint(CQ_AT, WHITE);
    h.run_until(21.0);
    assert_eq!(h.pointer.clicks().len(), 2);
    assert_eq!(h.clicker.session().cqs_remaining, 8);
}

#[test]
fn cycles_bands_after_budget() {
    let config = Config {
        cqs_remaining: 1,
        ..quiet_config()
    };
    let mut h = Harness::new(
        config,
        &[
            ("enable_tx", ENABLE_AT, WHITE),
            ("40m", BAND_40M_AT, WHITE),
            ("20m", BAND_20M_AT, WHITE),
            ("15m", BAND_15M_AT, WHITE),
        ],
    );
    teach_active_color(&mut h, "enable_tx", ENABLE_AT, 0.0);
    assert_eq!(h.clicker.status().band_order, vec!["40m", "20m", "15m"]);
    assert_eq!(h.clicker.status().current_band, "40m");

    h.clicker.start(h.at(2.0));
    let expected = ["20m", "15m", "40m", "20m"];
    for (n, band) in expected.iter().enumerate() {
        let t = 2.0 + 6.0 * (n + 1) as f64;
        h.run_until(t - 0.5);
        h.screen.paint(ENABLE_AT, WHITE);
        h.run_until(t);
        h.screen.paint(ENABLE_AT, GREEN);
        assert_eq!(h.clicker.status().current_band, *band, "after {} changes", n + 1);
    }
    assert!(h.clicker.session().running);
    assert_eq!(h.clicker.session().band_cycle_counter, 0);
    assert_eq!(h.clicker.session().cqs_remaining, 1);

    let clicks = h.pointer.clicks();
    assert_eq!(
        clicks,
        vec![
            ENABLE_AT,
            BAND_20M_AT,
            ENABLE_AT,
            BAND_15M_AT,
            ENABLE_AT,
            BAND_40M_AT,
            ENABLE_AT,
            BAND_20M_AT
        ]
    );
    assert!(h.logs().contains(&"Changed to band 15m".to_string()));
}

#[test]
fn band_already_active_is_not_clicked() {
    let config = Config {
        cqs_remaining: 1,
        ..quiet_config()
    };
    let mut h = Harness::new(
        config,
        &[
            ("enable_tx", ENABLE_AT, WHITE),
            ("40m", BAND_40M_AT, WHITE),
            ("20m", BAND_20M_AT, WHITE),
        ],
    );
    teach_active_color(&mut h, "20m", BAND_20M_AT, 0.0);
    h.clicker.start(h.at(2.0));
    h.run_until(2.5);

    assert_eq!(h.pointer.clicks(), vec![ENABLE_AT]);
    assert_eq!(h.clicker.status().current_band, "40m");
    assert_eq!(h.clicker.session().band_cycle_counter, 0);
}

#[test]
fn no_bands_learned_is_reported() {
    let config = Config {
        cqs_remaining: 1,
        ..quiet_config()
    };
    let mut h = Harness::new(config, &[("enable_tx", ENABLE_AT, WHITE)]);
    h.clicker.start(h.at(0.0));
    h.run_until(0.5);
    assert!(h
        .logs()
        .contains(&"No learned bands available for cycling".to_string()));
    assert_eq!(h.clicker.session().band_cycle_counter, 0);
}

#[test]
fn pause_freezes_countdowns() {
    let config = Config {
        cq_time: 100,
        app_time: 600,
        ..Config::default()
    };
    let mut h = Harness::new(config, &[("enable_tx", ENABLE_AT, WHITE)]);
    teach_active_color(&mut h, "enable_tx", ENABLE_AT, 0.0);
    h.clicker.start(h.at(2.0));
    h.run_until(5.0);
    assert_eq!(h.clicker.session().cq_remaining, 97);
    assert_eq!(h.clicker.session().app_remaining, 597);

    h.clicker.toggle_pause(h.at(5.2));
    assert!(h.clicker.session().paused);
    h.screen.paint(ENABLE_AT, WHITE);
    h.run_until(50.0);
    assert_eq!(h.clicker.session().cq_remaining, 97);
    assert_eq!(h.clicker.session().app_remaining, 597);
    assert!(h.pointer.clicks().is_empty());

    h.screen.paint(ENABLE_AT, GREEN);
    h.clicker.toggle_pause(h.at(50.0));
    // Ticks restart a full interval after resuming.
    h.run_until(50.9);
    assert_eq!(h.clicker.session().cq_remaining, 97);
    h.run_until(51.0);
    assert_eq!(h.clicker.session().cq_remaining, 96);
    assert_eq!(h.clicker.session().app_remaining, 596);
    assert!(h.pointer.clicks().is_empty());
}

#[test]
fn session_limit_stops_and_zero_means_unlimited() {
    let limited = Config {
        app_time: 3,
        ..quiet_config()
    };
    let mut h = Harness::new(limited, &[]);
    h.clicker.start(h.at(0.0));
    h.run_until(2.0);
    assert!(h.clicker.session().running);
    h.run_until(3.0);
    assert!(!h.clicker.session().running);
    let logs = h.logs();
    assert!(logs.contains(&"App stopped due to time limit".to_string()));

    let mut h = Harness::new(quiet_config(), &[]);
    h.clicker.start(h.at(0.0));
    h.run_until(4000.0);
    assert!(h.clicker.session().running);
}

#[test]
fn stop_finalizes_open_interval_and_is_idempotent() {
    let mut h = Harness::new(quiet_config(), &[("tx6", CQ_AT, WHITE)]);
    h.clicker.start(h.at(0.0));
    h.clicker.trigger("tx6", h.at(1.0));
    assert_eq!(h.clicker.session().cqs_remaining, 9);
    assert!(h.clicker.history().is_empty());

    h.clicker.stop(h.at(4.0));
    let history: Vec<ClickEvent> = h.clicker.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, EventKind::Stop);
    assert_eq!(history[0].duration, 3.0);

    h.logs();
    h.clicker.stop(h.at(5.0));
    assert!(h.logs().is_empty());
    assert_eq!(h.clicker.history().len(), 1);
}

#[test]
fn manual_trigger_of_unlearned_button_reports_it() {
    let mut h = Harness::new(quiet_config(), &[("40m", BAND_40M_AT, WHITE)]);
    h.clicker.trigger("20m", h.at(0.0));
    let logs = h.logs();
    assert!(logs.contains(&"20m not learned".to_string()));
    assert_eq!(h.clicker.status().current_band, "20m");
    assert!(h.pointer.clicks().is_empty());

    h.clicker.trigger("40m", h.at(1.0));
    assert_eq!(h.pointer.clicks(), vec![BAND_40M_AT]);
    assert_eq!(h.clicker.status().current_band, "40m");
}

#[test]
fn failed_click_is_logged_and_loop_continues() {
    let mut h = Harness::new(quiet_config(), &[("enable_tx", ENABLE_AT, WHITE)]);
    h.pointer.0.borrow_mut().broken = true;
    h.clicker.start(h.at(0.0));
    h.run_until(0.5);
    let logs = h.logs();
    assert!(logs.iter().any(|line| line.starts_with("Error clicking Enable Tx")));
    assert!(h.clicker.session().running);

    h.pointer.0.borrow_mut().broken = false;
    h.run_until(3.0);
    assert_eq!(h.pointer.clicks(), vec![ENABLE_AT]);
}

#[test]
fn color_poll_learns_and_reports_state_changes() {
    let mut h = Harness::new(quiet_config(), &[("enable_tx", ENABLE_AT, WHITE)]);
    h.run_until(1.0);
    let first = h.clicker.take_notifications();
    assert!(first.iter().any(|n| matches!(
        n,
        Notification::ButtonState { id, state: ft8clicker::ButtonState::Inactive, color }
            if id == "enable_tx" && *color == WHITE
    )));

    h.screen.paint(ENABLE_AT, GREEN);
    h.run_until(2.0);
    assert_eq!(
        h.logs(),
        vec!["Learned new state for enable_tx: OFF with color `lime` (0, 200, 0), sampled: lime \
              (0, 200, 0) x81"
            .to_string()]
    );
    h.run_until(3.0);
    let logs = h.logs();
    assert!(logs.contains(
        &"Learned new state for enable_tx: ON with color `lime` (0, 200, 0), sampled: lime \
          (0, 200, 0) x81"
            .to_string()
    ));
    assert!(logs.contains(&"Button Enable Tx detected ON".to_string()));

    // Nothing captured: the table is left alone.
    h.screen.0.borrow_mut().clear();
    h.run_until(6.0);
    assert!(h.logs().is_empty());
    assert_eq!(
        h.clicker
            .settings()
            .learned_buttons
            .get("enable_tx")
            .unwrap()
            .states
            .len(),
        2
    );
}

#[test]
fn learn_and_locate_through_modes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let screen = FakeScreen::default();
    screen.paint(ENABLE_AT, WHITE);
    let mut h = Harness::with_settings(
        Settings::default(),
        Some(SettingsStore::new(&path)),
        screen,
    );

    h.clicker.toggle_learn();
    assert_eq!(h.clicker.mode(), Mode::Learning);
    h.clicker.press("enable_tx", h.at(0.0));
    h.pointer.place(ENABLE_AT);
    h.clicker.commit(CommitTrigger::Key);
    assert_eq!(h.clicker.mode(), Mode::Idle);
    assert!(h.pointer.clicks().is_empty());
    assert!(h.logs().contains(
        &"Learned `Enable Tx` at location 10,10 with color `white` (255, 255, 255) (OFF), \
          sampled: white (255, 255, 255) x81"
            .to_string()
    ));

    let saved = SettingsStore::new(&path).load();
    assert_eq!(
        saved.learned_buttons.get("enable_tx").unwrap().position,
        ENABLE_AT
    );

    h.pointer.place(ScreenPoint::new(0, 0));
    h.clicker.toggle_locate();
    h.clicker.press("enable_tx", h.at(1.0));
    assert_eq!(h.clicker.mode(), Mode::Idle);
    assert_eq!(h.pointer.0.borrow().position, ENABLE_AT);
    assert!(h.pointer.clicks().is_empty());
    assert!(h
        .logs()
        .contains(&"Button enable_tx state: inactive".to_string()));

    h.clicker.toggle_locate();
    h.clicker.select_target("enable_tx");
    h.clicker.commit(CommitTrigger::Click);
    assert_eq!(h.pointer.clicks(), vec![ENABLE_AT]);

    h.clicker.toggle_locate();
    h.clicker.press("tx6", h.at(2.0));
    assert!(h.logs().contains(&"tx6 not learned".to_string()));
    assert_eq!(h.clicker.mode(), Mode::Idle);
}

#[test]
fn outside_click_cancels_learning() {
    let mut h = Harness::new(quiet_config(), &[]);
    h.clicker.toggle_learn();
    h.clicker.select_target("tx6");
    h.clicker.external_interaction("settings_button");
    assert_eq!(h.clicker.mode(), Mode::Idle);
    assert_eq!(h.clicker.status().pending, None);
    assert!(h.logs().contains(&"LEARN mode OFF".to_string()));

    // Committing afterwards does nothing.
    h.clicker.commit(CommitTrigger::Key);
    assert!(h.clicker.settings().learned_buttons.is_empty());
}

#[test]
fn unlearn_all_clears_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let screen = FakeScreen::default();
    screen.paint(BAND_40M_AT, WHITE);
    let mut registry = ButtonRegistry::new();
    registry.learn("40m", BAND_40M_AT, &mut screen.clone());
    let settings = Settings {
        learned_buttons: registry,
        ..Settings::default()
    };
    let store = SettingsStore::new(&path);
    store.save(&settings).unwrap();

    let mut h = Harness::with_settings(store.load(), Some(store), screen);
    assert_eq!(h.clicker.status().band_order, vec!["40m"]);
    h.clicker.unlearn_all();
    assert!(h.clicker.status().band_order.is_empty());
    assert!(SettingsStore::new(&path).load().learned_buttons.is_empty());
}
