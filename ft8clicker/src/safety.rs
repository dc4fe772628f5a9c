use {std::time::Duration, tracing::debug};

/// Gaps between "Enable Tx" clicks shorter than this count as suspicious.
pub const SHORT_GAP: Duration = Duration::from_secs(5);
/// Consecutive short gaps that mean the automation is running away.
pub const RUNAWAY_STREAK: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Normal,
    Runaway,
}

/// Stops automation that keeps re-enabling transmit in quick succession,
/// which happens when QSOs end immediately or clicks land on the wrong button.
#[derive(Debug, Default)]
pub struct SafetyMonitor {
    last: Option<Duration>,
    short_gaps: u32,
}

impl SafetyMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds an enable event at `at`, measured from any fixed origin.
    pub fn observe(&mut self, at: Duration) -> Verdict {
        let mut verdict = Verdict::Normal;
        if let Some(last) = self.last {
            let gap = at.saturating_sub(last);
            if gap < SHORT_GAP {
                self.short_gaps += 1;
                debug!(?gap, streak = self.short_gaps, "short gap between enable clicks");
                if self.short_gaps >= RUNAWAY_STREAK {
                    verdict = Verdict::Runaway;
                }
            } else {
                self.short_gaps = 0;
            }
        }
        self.last = Some(at);
        verdict
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
