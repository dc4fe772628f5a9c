//! Capture strategies tried in priority order by [`PixelSampler`](crate::PixelSampler).

use {
    crate::{
        imp, CaptureIssue, Color, ScreenPoint, ScreenRect, VirtualScreen, NEIGHBORHOOD_RADIUS,
    },
    anyhow::Context as _,
    strum::Display,
    tracing::{debug, trace, warn},
    xcap::image::RgbaImage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CaptureMethod {
    #[strum(to_string = "window image")]
    WindowImage,
    #[strum(to_string = "virtual screen region")]
    ScreenRegion,
    #[strum(to_string = "single pixel reads")]
    SinglePixel,
}

pub trait CaptureStrategy {
    fn method(&self) -> CaptureMethod;

    /// Returns the captured neighborhood of `point`.
    ///
    /// An empty vector means the strategy does not apply to this point;
    /// an error means it applies but failed.
    fn capture(
        &mut self,
        point: ScreenPoint,
        screen: Option<&VirtualScreen>,
    ) -> anyhow::Result<Vec<Color>>;
}

/// Strategies available on the current platform, highest priority first.
pub fn default_strategies() -> Vec<Box<dyn CaptureStrategy>> {
    let mut strategies: Vec<Box<dyn CaptureStrategy>> = Vec::new();
    if cfg!(target_os = "macos") {
        strategies.push(Box::new(WindowCapture));
    }
    strategies.push(Box::new(RegionCapture));
    match imp::PixelReader::new() {
        Ok(reader) => strategies.push(Box::new(PixelCapture::new(reader))),
        Err(err) => warn!("single pixel reads are unavailable: {err:?}"),
    }
    strategies
}

/// Renders the topmost window under the point and samples it.
#[derive(Debug, Default)]
pub struct WindowCapture;

fn window_rect(window: &xcap::Window) -> xcap::XCapResult<ScreenRect> {
    Ok(ScreenRect::new(
        window.x()?,
        window.y()?,
        window.width()?,
        window.height()?,
    ))
}

fn window_at(point: ScreenPoint) -> anyhow::Result<Option<(xcap::Window, ScreenRect)>> {
    // Front to back.
    for window in xcap::Window::all().context("failed to list windows")? {
        if window.is_minimized().unwrap_or(false) {
            continue;
        }
        let Ok(rect) = window_rect(&window) else {
            continue;
        };
        if rect.contains(point) {
            return Ok(Some((window, rect)));
        }
    }
    Ok(None)
}

impl CaptureStrategy for WindowCapture {
    fn method(&self) -> CaptureMethod {
        CaptureMethod::WindowImage
    }

    fn capture(
        &mut self,
        point: ScreenPoint,
        _screen: Option<&VirtualScreen>,
    ) -> anyhow::Result<Vec<Color>> {
        let Some((window, rect)) = window_at(point)? else {
            debug!(%point, "no window found at point");
            return Ok(Vec::new());
        };
        let image = window
            .capture_image()
            .context("could not create image of the window")?;
        // Retina windows render at a higher resolution than their logical bounds.
        let scale_x = image.width() as f64 / f64::from(rect.width.max(1));
        let scale_y = image.height() as f64 / f64::from(rect.height.max(1));
        let local = ScreenPoint::new(
            (f64::from(point.x - rect.x) * scale_x).floor() as i32,
            (f64::from(point.y - rect.y) * scale_y).floor() as i32,
        );
        let colors = sample_image(&image, local);
        if colors.is_empty() {
            debug!(%point, "point is outside the window image");
        }
        Ok(colors)
    }
}

/// Row-major samples of the neighborhood of `local`, skipping pixels outside `image`.
pub fn sample_image(image: &RgbaImage, local: ScreenPoint) -> Vec<Color> {
    let bounds = ScreenRect::new(0, 0, image.width(), image.height());
    if !bounds.contains(local) {
        return Vec::new();
    }
    let mut colors = Vec::new();
    for dy in -NEIGHBORHOOD_RADIUS..=NEIGHBORHOOD_RADIUS {
        for dx in -NEIGHBORHOOD_RADIUS..=NEIGHBORHOOD_RADIUS {
            let pixel = local.offset(dx, dy);
            if bounds.contains(pixel) {
                colors.push(Color::from(*image.get_pixel(pixel.x as u32, pixel.y as u32)));
            }
        }
    }
    colors
}

/// Grabs the neighborhood from the monitor containing the point.
#[derive(Debug, Default)]
pub struct RegionCapture;

impl CaptureStrategy for RegionCapture {
    fn method(&self) -> CaptureMethod {
        CaptureMethod::ScreenRegion
    }

    fn capture(
        &mut self,
        point: ScreenPoint,
        screen: Option<&VirtualScreen>,
    ) -> anyhow::Result<Vec<Color>> {
        let screen = screen.context("monitor layout is unavailable")?;
        let Some(monitor_rect) = screen.monitor_at(point) else {
            debug!(%point, "point is between monitors");
            return Ok(Vec::new());
        };
        let Some(region) =
            ScreenRect::around(point, NEIGHBORHOOD_RADIUS).intersect(&monitor_rect)
        else {
            return Ok(Vec::new());
        };
        let monitor = xcap::Monitor::from_point(point.x, point.y)
            .context("failed to resolve monitor at point")?;
        let image = monitor
            .capture_region(
                (region.x - monitor_rect.x) as u32,
                (region.y - monitor_rect.y) as u32,
                region.width,
                region.height,
            )
            .context("could not create image of the monitor region")?;
        trace!(?region, "captured region");
        Ok(image.pixels().map(|pixel| Color::from(*pixel)).collect())
    }
}

/// Reads every pixel of the neighborhood individually, ignoring pixels that fail.
pub struct PixelCapture {
    reader: imp::PixelReader,
}

impl PixelCapture {
    fn new(reader: imp::PixelReader) -> Self {
        Self { reader }
    }
}

impl CaptureStrategy for PixelCapture {
    fn method(&self) -> CaptureMethod {
        CaptureMethod::SinglePixel
    }

    fn capture(
        &mut self,
        point: ScreenPoint,
        _screen: Option<&VirtualScreen>,
    ) -> anyhow::Result<Vec<Color>> {
        let mut colors = Vec::new();
        // Column-major.
        for dx in -NEIGHBORHOOD_RADIUS..=NEIGHBORHOOD_RADIUS {
            for dy in -NEIGHBORHOOD_RADIUS..=NEIGHBORHOOD_RADIUS {
                let pixel = point.offset(dx, dy);
                match self.reader.read(pixel) {
                    Ok(color) => colors.push(color),
                    Err(err) => trace!(%pixel, "pixel read failed: {err:?}"),
                }
            }
        }
        Ok(colors)
    }
}

/// Performs one tiny capture to find out early whether the process may capture the screen.
pub fn preflight() -> Result<(), CaptureIssue> {
    let result = (|| -> anyhow::Result<()> {
        let monitors = xcap::Monitor::all().context("failed to list monitors")?;
        let monitor = monitors.first().context("no monitors found")?;
        monitor
            .capture_region(0, 0, 1, 1)
            .context("could not create image of the primary monitor")?;
        Ok(())
    })();
    result.map_err(|err| CaptureIssue::classify(&err))
}
