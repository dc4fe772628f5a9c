use {
    crate::{button::ButtonState, events::ClickEvent, mode::Mode},
    serde::Serialize,
    tracing::info,
    uiprobe::Color,
};

/// Something a front end may want to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Log {
        message: String,
    },
    ButtonState {
        id: String,
        state: ButtonState,
        color: Color,
    },
    Countdown {
        cq_remaining: u32,
        cq_time: u32,
        cqs_remaining: u32,
        cqs_per_band: u32,
        app_remaining: u32,
        app_time: u32,
    },
    ClickEvent {
        event: ClickEvent,
    },
    RunState {
        running: bool,
        paused: bool,
    },
    Mode {
        mode: Mode,
    },
}

/// Notifications produced since the front end last asked.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<Notification>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs an operator-facing message and queues it for display.
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.forward_log(message);
    }

    /// Queues a message that was already logged elsewhere.
    pub fn forward_log(&mut self, message: String) {
        self.pending.push(Notification::Log { message });
    }

    pub fn push(&mut self, notification: Notification) {
        self.pending.push(notification);
    }

    pub fn take(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn serializes_with_type_tag() {
        let mut outbox = Outbox::new();
        outbox.log("Started clicking");
        outbox.push(Notification::ButtonState {
            id: "tx6".into(),
            state: ButtonState::Active,
            color: Color::new(1, 2, 3),
        });
        let taken = outbox.take();
        assert!(outbox.is_empty());
        assert_eq!(
            serde_json::to_value(&taken).unwrap(),
            json!([
                { "type": "log", "message": "Started clicking" },
                { "type": "button_state", "id": "tx6", "state": "active", "color": [1, 2, 3] }
            ])
        );
    }
}
