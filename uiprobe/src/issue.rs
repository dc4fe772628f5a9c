use thiserror::Error;

#[cfg(target_os = "macos")]
const PERMISSION_INSTRUCTION: &str = "On macOS, grant Screen Recording permission to the terminal \
    or app running ft8clicker (System Settings → Privacy & Security → Screen Recording), \
    then restart it.";

#[cfg(target_os = "windows")]
const PERMISSION_INSTRUCTION: &str = "On Windows, run ft8clicker in the same interactive desktop \
    session and at the same elevation level as the FT8 application.";

#[cfg(all(unix, not(target_os = "macos")))]
const PERMISSION_INSTRUCTION: &str = "On Linux, run ft8clicker inside an X11 session (or XWayland) \
    with DISPLAY set; Wayland compositors must allow screen capture.";

// Lowercase fragments of platform error messages that mean "not allowed to capture".
const PERMISSION_MARKERS: &[&str] = &[
    "could not create image",
    "display",
    "permission",
    "not authorized",
    "access is denied",
    "access denied",
];

/// A classified screen capture failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureIssue {
    #[error("Screen capture failed. {instruction}")]
    PermissionDenied { instruction: &'static str },
    #[error("Screen capture failed: {0}")]
    Other(String),
}

impl CaptureIssue {
    /// Classifies by the innermost error; the message keeps the whole chain.
    pub fn classify(err: &anyhow::Error) -> Self {
        match Self::classify_message(&err.root_cause().to_string()) {
            CaptureIssue::Other(_) => CaptureIssue::Other(format!("{err:#}")),
            issue => issue,
        }
    }

    /// Best-effort: novel platform messages may be misclassified.
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if PERMISSION_MARKERS.iter().any(|marker| lower.contains(marker)) {
            CaptureIssue::PermissionDenied {
                instruction: PERMISSION_INSTRUCTION,
            }
        } else {
            CaptureIssue::Other(message.into())
        }
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, CaptureIssue::PermissionDenied { .. })
    }
}
