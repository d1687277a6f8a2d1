use std::sync::Mutex;

use ticketdesk_core::auth::Navigator;

/// Navigator for a terminal session.
///
/// There is no page to move to, so "navigating" to the login route tells the
/// user to sign in again and remembers where they were sent.
pub struct TerminalNavigator {
    location: String,
    target: Mutex<Option<String>>,
}

impl TerminalNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            target: Mutex::new(None),
        }
    }

    /// Route the last redirect pointed at, if any
    pub fn redirected_to(&self) -> Option<String> {
        self.target.lock().ok().and_then(|t| t.clone())
    }
}

impl Navigator for TerminalNavigator {
    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn navigate(&self, location: &str) {
        eprintln!("Session expired. Run `ticketdesk login` to sign in again ({}).", location);
        if let Ok(mut target) = self.target.lock() {
            *target = Some(location.to_string());
        }
    }
}
