#[cfg(all(unix, not(target_os = "macos")))]
mod linux;

#[cfg(all(unix, not(target_os = "macos")))]
use crate::linux as imp;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use crate::windows as imp;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "macos")]
use crate::macos as imp;

pub mod capture;
mod color;
mod geometry;
mod issue;
mod pointer;
mod sampler;

pub use crate::{
    capture::{default_strategies, preflight, CaptureMethod, CaptureStrategy},
    color::{Color, ColorParseError},
    geometry::{DisplayLayout, ScreenPoint, ScreenRect, SystemLayout, VirtualScreen},
    issue::CaptureIssue,
    pointer::{EnigoPointer, Pointer},
    sampler::{
        color_counts, dominant_color, PixelSampler, PixelSource, Sample, DEFAULT_STRATEGY_BUDGET,
    },
};

/// Half the side of the sampled square; the neighborhood is `2 * RADIUS + 1` pixels wide.
pub const NEIGHBORHOOD_RADIUS: i32 = 4;
