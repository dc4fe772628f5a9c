use {
    crate::{button::ButtonState, classify::coarse_state_of},
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
    tracing::{debug, warn},
    uiprobe::{Color, PixelSource, Sample, ScreenPoint},
};

/// A button whose screen position and observed colors are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredButton", into = "StoredButton")]
pub struct LearnedButton {
    pub position: ScreenPoint,
    pub states: BTreeMap<Color, ButtonState>,
}

#[derive(Serialize, Deserialize)]
struct StoredButton {
    pos: ScreenPoint,
    #[serde(default)]
    states: BTreeMap<String, ButtonState>,
}

impl From<StoredButton> for LearnedButton {
    fn from(stored: StoredButton) -> Self {
        let mut states = BTreeMap::new();
        for (key, state) in stored.states {
            match key.parse::<Color>() {
                Ok(color) => {
                    states.insert(color, state);
                }
                Err(err) => warn!("skipping learned state: {err}"),
            }
        }
        Self {
            position: stored.pos,
            states,
        }
    }
}

impl From<LearnedButton> for StoredButton {
    fn from(button: LearnedButton) -> Self {
        Self {
            pos: button.position,
            states: button
                .states
                .into_iter()
                .map(|(color, state)| (color.to_string(), state))
                .collect(),
        }
    }
}

impl LearnedButton {
    fn state_of(&self, color: Color) -> ButtonState {
        self.states
            .get(&color)
            .copied()
            .unwrap_or(ButtonState::Unknown)
    }
}

/// Result of learning a button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Learned {
    pub position: ScreenPoint,
    pub sample: Sample,
    pub state: ButtonState,
}

/// Result of feeding a polled color to a learned button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub state: ButtonState,
    /// The color was new or its state was corrected.
    pub changed: bool,
}

/// Learned buttons by id. Callers persist the registry after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonRegistry {
    buttons: BTreeMap<String, LearnedButton>,
}

impl ButtonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&LearnedButton> {
        self.buttons.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.buttons.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.buttons.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// Binds `id` to `point`, seeding its table with the color found there as inactive.
    ///
    /// Learning an id again starts over with a fresh table.
    pub fn learn(&mut self, id: &str, point: ScreenPoint, source: &mut dyn PixelSource) -> Learned {
        let sample = source.sample(point);
        if sample.is_sentinel() {
            warn!(id, %point, "no pixels captured, learning the fallback color");
        }
        let state = ButtonState::Inactive;
        self.buttons.insert(
            id.into(),
            LearnedButton {
                position: point,
                states: BTreeMap::from([(sample.color, state)]),
            },
        );
        Learned {
            position: point,
            sample,
            state,
        }
    }

    /// Samples the button and looks its color up exactly. `None` if `id` was never learned.
    pub fn lookup_state(
        &self,
        id: &str,
        source: &mut dyn PixelSource,
    ) -> Option<(ButtonState, Sample)> {
        let button = self.buttons.get(id)?;
        let sample = source.sample(button.position);
        let state = button.state_of(sample.color);
        debug!(id, color = %sample.color, %state, "looked up state");
        Some((state, sample))
    }

    /// Folds a freshly observed color into the button's table.
    ///
    /// While at most one color is known every new color is assumed inactive.
    /// Once two or more are known colors are classified, and known colors are
    /// corrected when the classification disagrees.
    pub fn record_if_new(&mut self, id: &str, color: Color) -> Option<Recorded> {
        let button = self.buttons.get_mut(id)?;
        if button.states.len() <= 1 {
            let changed = !button.states.contains_key(&color);
            if changed {
                button.states.insert(color, ButtonState::Inactive);
            }
            return Some(Recorded {
                state: ButtonState::Inactive,
                changed,
            });
        }
        let state = coarse_state_of(color);
        let changed = button.states.insert(color, state) != Some(state);
        Some(Recorded { state, changed })
    }

    pub fn unlearn_all(&mut self) {
        self.buttons.clear();
    }
}
