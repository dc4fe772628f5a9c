use {
    crate::{imp, ScreenPoint},
    anyhow::Context as _,
    enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings},
    std::{thread::sleep, time::Duration},
    tracing::{trace, warn},
};

/// Mouse cursor control.
pub trait Pointer {
    fn position(&mut self) -> anyhow::Result<ScreenPoint>;
    fn move_to(&mut self, point: ScreenPoint) -> anyhow::Result<()>;
    fn click(&mut self) -> anyhow::Result<()>;

    /// Clicks at `point` and puts the cursor back where it was.
    fn click_at(&mut self, point: ScreenPoint) -> anyhow::Result<()> {
        let original = self.position()?;
        self.move_to(point)?;
        let result = self.click();
        self.move_to(original)?;
        result
    }
}

const DEFAULT_SETTLE: Duration = Duration::from_millis(50);

pub struct EnigoPointer {
    enigo: Enigo,
    settle: Duration,
}

impl EnigoPointer {
    pub fn new() -> anyhow::Result<Self> {
        if let Err(err) = imp::check_input_access() {
            warn!("synthesized clicks may be ignored: {err:#}");
        }
        let enigo = Enigo::new(&Settings::default()).context("failed to initialize enigo")?;
        Ok(Self {
            enigo,
            settle: DEFAULT_SETTLE,
        })
    }

    /// Delay after moving the cursor so the target application sees the hover.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

impl Pointer for EnigoPointer {
    fn position(&mut self) -> anyhow::Result<ScreenPoint> {
        let (x, y) = self
            .enigo
            .location()
            .context("failed to get cursor position")?;
        Ok(ScreenPoint::new(x, y))
    }

    fn move_to(&mut self, point: ScreenPoint) -> anyhow::Result<()> {
        trace!(%point, "move cursor");
        self.enigo
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .with_context(|| format!("failed to move cursor to {point}"))?;
        sleep(self.settle);
        Ok(())
    }

    fn click(&mut self) -> anyhow::Result<()> {
        self.enigo
            .button(Button::Left, Direction::Click)
            .context("failed to click")?;
        Ok(())
    }
}
