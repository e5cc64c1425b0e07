use winit::event::ElementState;
use winit::keyboard::{Key, NamedKey};

/// Tracks whether the user asked the main loop to stop.
#[derive(Debug, Default)]
pub struct CloseRequest {
    requested: bool,
}

impl CloseRequest {
    /// Escape requests close on press.
    pub fn process_key(&mut self, key: &Key, state: ElementState) {
        if state.is_pressed() && *key == Key::Named(NamedKey::Escape) {
            log::debug!("escape pressed, closing");
            self.requested = true;
        }
    }

    /// The window manager asked the window to close.
    pub fn window_closed(&mut self) {
        self.requested = true;
    }

    /// Loop-continuation predicate: false once close was requested.
    pub fn keep_running(&self) -> bool {
        !self.requested
    }
}
