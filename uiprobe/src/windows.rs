use {
    crate::{Color, ScreenPoint},
    anyhow::ensure,
    std::ptr::null_mut,
    windows_sys::Win32::Graphics::Gdi::{GetDC, GetPixel, ReleaseDC},
};

const CLR_INVALID: u32 = 0xFFFF_FFFF;

/// Reads single pixels through the screen device context.
pub struct PixelReader {}

impl PixelReader {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {})
    }

    pub fn read(&self, point: ScreenPoint) -> anyhow::Result<Color> {
        let value = unsafe {
            let hdc = GetDC(null_mut());
            ensure!(!hdc.is_null(), "GetDC failed for the screen");
            let value = GetPixel(hdc, point.x, point.y);
            ReleaseDC(null_mut(), hdc);
            value
        };
        ensure!(value != CLR_INVALID, "GetPixel failed at {point}");
        // COLORREF is 0x00BBGGRR.
        let [r, g, b, _] = value.to_le_bytes();
        Ok(Color::new(r, g, b))
    }
}

/// Synthesized input needs no permission beyond matching the target's elevation level.
pub fn check_input_access() -> anyhow::Result<()> {
    Ok(())
}
