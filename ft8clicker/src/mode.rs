use {
    crate::{
        button::{is_managed, ButtonState},
        registry::{ButtonRegistry, Learned},
    },
    serde::{Deserialize, Serialize},
    strum::Display,
    uiprobe::{PixelSource, Pointer, ScreenPoint},
};

/// Interaction mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    #[strum(to_string = "IDLE")]
    Idle,
    #[strum(to_string = "LEARN")]
    Learning,
    #[strum(to_string = "LOCATE")]
    Locating,
}

/// What completed a learn or locate.
///
/// Both learn at the cursor. When locating, only `Click` clicks the FT8 button;
/// `Key` moves the cursor onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    /// The commit key (L) or a press on our own button.
    Key,
    /// An explicit request to click the located FT8 button.
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeOutcome {
    Ignored,
    Entered { mode: Mode, previous: Mode },
    Exited(Mode),
    Selected { mode: Mode, id: String },
    Learned { id: String, learned: Learned },
    Located {
        id: String,
        position: ScreenPoint,
        state: ButtonState,
        clicked: bool,
    },
    NotLearned { id: String },
}

#[derive(Debug, Default)]
pub struct ModeController {
    mode: Mode,
    pending: Option<String>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    fn exit(&mut self) -> Mode {
        self.pending = None;
        std::mem::take(&mut self.mode)
    }

    fn toggle(&mut self, mode: Mode) -> ModeOutcome {
        if self.mode == mode {
            return ModeOutcome::Exited(self.exit());
        }
        let previous = self.exit();
        self.mode = mode;
        ModeOutcome::Entered { mode, previous }
    }

    pub fn enter_learn(&mut self) -> ModeOutcome {
        self.toggle(Mode::Learning)
    }

    pub fn enter_locate(&mut self) -> ModeOutcome {
        self.toggle(Mode::Locating)
    }

    pub fn select_target(&mut self, id: &str) -> ModeOutcome {
        if self.mode == Mode::Idle {
            return ModeOutcome::Ignored;
        }
        self.pending = Some(id.into());
        ModeOutcome::Selected {
            mode: self.mode,
            id: id.into(),
        }
    }

    /// Completes the active mode for the pending target and returns to idle.
    pub fn commit(
        &mut self,
        trigger: CommitTrigger,
        registry: &mut ButtonRegistry,
        source: &mut dyn PixelSource,
        pointer: &mut dyn Pointer,
    ) -> anyhow::Result<ModeOutcome> {
        let Some(id) = self.pending.take() else {
            return Ok(ModeOutcome::Ignored);
        };
        // Idle even if the pointer fails below.
        let mode = self.exit();
        match mode {
            Mode::Idle => Ok(ModeOutcome::Ignored),
            Mode::Learning => {
                let point = pointer.position()?;
                let learned = registry.learn(&id, point, source);
                Ok(ModeOutcome::Learned { id, learned })
            }
            Mode::Locating => {
                let Some((state, _sample)) = registry.lookup_state(&id, source) else {
                    return Ok(ModeOutcome::NotLearned { id });
                };
                let Some(position) = registry.get(&id).map(|button| button.position) else {
                    return Ok(ModeOutcome::NotLearned { id });
                };
                pointer.move_to(position)?;
                let clicked = trigger == CommitTrigger::Click;
                if clicked {
                    pointer.click()?;
                }
                Ok(ModeOutcome::Located {
                    id,
                    position,
                    state,
                    clicked,
                })
            }
        }
    }

    /// Leaves the active mode when the user interacts with something that cannot be its target.
    pub fn notify_external_interaction(
        &mut self,
        target: &str,
        registry: &ButtonRegistry,
    ) -> ModeOutcome {
        let is_target = match self.mode {
            Mode::Idle => return ModeOutcome::Ignored,
            Mode::Learning => is_managed(target),
            Mode::Locating => registry.contains(target),
        };
        if is_target {
            ModeOutcome::Ignored
        } else {
            ModeOutcome::Exited(self.exit())
        }
    }
}
