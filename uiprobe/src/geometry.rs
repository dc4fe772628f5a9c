use {
    anyhow::Context as _,
    derive_more::{Display, From},
    serde::{Deserialize, Serialize},
    std::cmp::{max, min},
    tracing::trace,
};

/// A point in absolute virtual-screen coordinates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, From, Serialize, Deserialize,
)]
#[display("{x},{y}")]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Saturates at the edges of the coordinate range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl From<[i32; 2]> for ScreenPoint {
    fn from([x, y]: [i32; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<ScreenPoint> for [i32; 2] {
    fn from(point: ScreenPoint) -> Self {
        [point.x, point.y]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `2 * radius + 1` centered on `point`.
    pub fn around(point: ScreenPoint, radius: i32) -> Self {
        let side = (2 * radius + 1) as u32;
        let corner = point.offset(-radius, -radius);
        Self::new(corner.x, corner.y, side, side)
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add_unsigned(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        self.x <= point.x && point.x < self.right() && self.y <= point.y && point.y < self.bottom()
    }

    pub fn intersect(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let left = max(self.x, other.x);
        let top = max(self.y, other.y);
        let right = min(self.right(), other.right());
        let bottom = min(self.bottom(), other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(ScreenRect::new(
            left,
            top,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }

    pub fn union(&self, other: &ScreenRect) -> ScreenRect {
        let left = min(self.x, other.x);
        let top = min(self.y, other.y);
        let right = max(self.right(), other.right());
        let bottom = max(self.bottom(), other.bottom());
        ScreenRect::new(left, top, (right - left) as u32, (bottom - top) as u32)
    }
}

/// Bounds of all attached displays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualScreen {
    monitors: Vec<ScreenRect>,
}

impl VirtualScreen {
    pub fn new(monitors: Vec<ScreenRect>) -> Self {
        Self { monitors }
    }

    pub fn query() -> anyhow::Result<Self> {
        let mut monitors = Vec::new();
        for monitor in xcap::Monitor::all().context("failed to list monitors")? {
            let rect = ScreenRect::new(
                monitor.x()?,
                monitor.y()?,
                monitor.width()?,
                monitor.height()?,
            );
            trace!(?rect, "found monitor");
            monitors.push(rect);
        }
        Ok(Self { monitors })
    }

    /// Bounding box of every monitor, or `None` if there are no monitors.
    pub fn bounds(&self) -> Option<ScreenRect> {
        self.monitors
            .iter()
            .copied()
            .reduce(|acc, rect| acc.union(&rect))
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        self.bounds().is_some_and(|bounds| bounds.contains(point))
    }

    pub fn monitor_at(&self, point: ScreenPoint) -> Option<ScreenRect> {
        self.monitors
            .iter()
            .copied()
            .find(|rect| rect.contains(point))
    }
}

/// Source of the current display arrangement.
pub trait DisplayLayout {
    fn query(&mut self) -> anyhow::Result<VirtualScreen>;
}

/// Queries attached monitors on every call so hot-plugged displays are picked up.
#[derive(Debug, Default)]
pub struct SystemLayout;

impl DisplayLayout for SystemLayout {
    fn query(&mut self) -> anyhow::Result<VirtualScreen> {
        VirtualScreen::query()
    }
}

impl DisplayLayout for VirtualScreen {
    fn query(&mut self) -> anyhow::Result<VirtualScreen> {
        Ok(self.clone())
    }
}
