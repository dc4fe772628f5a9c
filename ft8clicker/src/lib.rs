//! Keeps an FT8 station calling CQ by reading button colors off the screen
//! and clicking the buttons of the FT8 application.

pub mod automation;
pub mod button;
pub mod classify;
mod clicker;
pub mod events;
pub mod mode;
pub mod notification;
pub mod registry;
pub mod safety;
pub mod settings;
pub mod timer;

pub use crate::{
    automation::Session,
    button::ButtonState,
    clicker::{Clicker, Status},
    events::{ClickEvent, EventKind},
    mode::{CommitTrigger, Mode},
    notification::Notification,
    settings::{Config, ConfigUpdate, Settings, SettingsStore},
};
