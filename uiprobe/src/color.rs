use {
    derive_more::Display,
    serde::{Deserialize, Serialize},
    std::str::FromStr,
    thiserror::Error,
    xcap::image::Rgba,
};

/// An opaque RGB color read from the screen.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("({r}, {g}, {b})")]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Neutral gray reported when nothing could be captured.
    pub const SENTINEL: Color = Color::new(128, 128, 128);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn squared_distance(self, other: Color) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Color> for [u8; 3] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b]
    }
}

impl From<Rgba<u8>> for Color {
    fn from(pixel: Rgba<u8>) -> Self {
        let [r, g, b, _a] = pixel.0;
        Self::new(r, g, b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color {input:?}: expected three comma-separated channels in 0..=255")]
pub struct ColorParseError {
    input: String,
}

/// Accepts `(r, g, b)`, `[r, g, b]` and bare `r,g,b`.
impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError { input: s.into() };
        let inner = s
            .trim()
            .trim_start_matches(['(', '['])
            .trim_end_matches([')', ']']);
        let mut channels = inner.split(',').map(|part| part.trim().parse::<u8>());
        let (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) = (
            channels.next(),
            channels.next(),
            channels.next(),
            channels.next(),
        ) else {
            return Err(err());
        };
        Ok(Self::new(r, g, b))
    }
}
