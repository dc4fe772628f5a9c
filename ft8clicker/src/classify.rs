//! Naming screen colors and judging button state from them.

use {
    crate::button::ButtonState,
    itertools::Itertools,
    uiprobe::{color_counts, Color},
};

/// Reference colors in lookup order. Earlier entries win ties.
pub const PALETTE: [(&str, Color); 30] = [
    ("red", Color::new(255, 0, 0)),
    ("green", Color::new(0, 128, 0)),
    ("blue", Color::new(0, 0, 255)),
    ("yellow", Color::new(255, 255, 0)),
    ("orange", Color::new(255, 165, 0)),
    ("purple", Color::new(128, 0, 128)),
    ("pink", Color::new(255, 192, 203)),
    ("brown", Color::new(165, 42, 42)),
    ("black", Color::new(0, 0, 0)),
    ("white", Color::new(255, 255, 255)),
    ("gray", Color::new(128, 128, 128)),
    ("cyan", Color::new(0, 255, 255)),
    ("magenta", Color::new(255, 0, 255)),
    ("lime", Color::new(0, 255, 0)),
    ("navy", Color::new(0, 0, 128)),
    ("maroon", Color::new(128, 0, 0)),
    ("olive", Color::new(128, 128, 0)),
    ("teal", Color::new(0, 128, 128)),
    ("silver", Color::new(192, 192, 192)),
    ("gold", Color::new(255, 215, 0)),
    ("crimson", Color::new(220, 20, 60)),
    ("indigo", Color::new(75, 0, 130)),
    ("violet", Color::new(238, 130, 238)),
    ("salmon", Color::new(250, 128, 114)),
    ("coral", Color::new(255, 127, 80)),
    ("khaki", Color::new(240, 230, 140)),
    ("tan", Color::new(210, 180, 140)),
    ("lavender", Color::new(230, 230, 250)),
    ("turquoise", Color::new(64, 224, 208)),
    ("beige", Color::new(245, 245, 220)),
];

const NEUTRAL_NAMES: &[&str] = &["white", "gray", "silver", "black"];

/// Name of the nearest palette color.
pub fn name_of(color: Color) -> &'static str {
    let mut best = PALETTE[0];
    let mut best_distance = color.squared_distance(best.1);
    for entry in &PALETTE[1..] {
        let distance = color.squared_distance(entry.1);
        if distance < best_distance {
            best = *entry;
            best_distance = distance;
        }
    }
    best.0
}

/// Neutral colors mean the button is off; anything colorful means it is lit.
pub fn coarse_state_of(color: Color) -> ButtonState {
    if NEUTRAL_NAMES.contains(&name_of(color)) {
        ButtonState::Inactive
    } else {
        ButtonState::Active
    }
}

/// "`name` (r, g, b)", as used in log lines.
pub fn describe(color: Color) -> String {
    format!("`{}` {color}", name_of(color))
}

/// The most common sampled colors, e.g. `red (255, 0, 0) x70, white (255, 255, 255) x11`.
pub fn summarize_samples(samples: &[Color]) -> String {
    if samples.is_empty() {
        return "[]".into();
    }
    color_counts(samples, 3)
        .into_iter()
        .map(|(color, count)| format!("{} {color} x{count}", name_of(color)))
        .join(", ")
}
