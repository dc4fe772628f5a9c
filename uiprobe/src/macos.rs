use {
    crate::{Color, ScreenPoint},
    anyhow::{bail, Context as _},
    objc2_application_services::{kAXTrustedCheckOptionPrompt, AXIsProcessTrustedWithOptions},
    objc2_core_foundation::{CFBoolean, CFDictionary},
};

/// Reads single pixels by capturing a 1×1 region of the containing monitor.
pub struct PixelReader {}

impl PixelReader {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {})
    }

    pub fn read(&self, point: ScreenPoint) -> anyhow::Result<Color> {
        let monitor = xcap::Monitor::from_point(point.x, point.y)
            .with_context(|| format!("no monitor at {point}"))?;
        let x = u32::try_from(point.x - monitor.x()?)?;
        let y = u32::try_from(point.y - monitor.y()?)?;
        let image = monitor
            .capture_region(x, y, 1, 1)
            .context("could not create image of a single pixel")?;
        let pixel = image
            .pixels()
            .next()
            .context("capture returned an empty image")?;
        Ok(Color::from(*pixel))
    }
}

/// Asks for Accessibility access, which macOS requires before accepting synthesized clicks.
pub fn check_input_access() -> anyhow::Result<()> {
    unsafe {
        let args =
            CFDictionary::from_slices(&[kAXTrustedCheckOptionPrompt], &[CFBoolean::new(true)]);
        let is_trusted = AXIsProcessTrustedWithOptions(Some(args.as_opaque()));
        if !is_trusted {
            bail!(
                "process is not trusted for Accessibility; grant access in System Settings → \
                 Privacy & Security → Accessibility"
            );
        }
    }
    Ok(())
}
