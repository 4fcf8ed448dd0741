//! The world mashup's capability handler.
//!
//! World has no element graph of its own. It only reacts to display
//! changes: the first hint creates its main window, later hints resize it.

use mashup_core::error::HandlerError;
use mashup_core::proto::{
    MashupDetailedElementBundle, MashupDisplayHint, MashupElementStateBundle, Motiv,
};
use mashup_core::{MashupApiHandler, MashupContext};

use std::sync::{Mutex, MutexGuard};

use log::info;

/// State of the main window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySurface {
    Uninitialized,
    Ready { width: i64, height: i64 },
}

pub struct WorldApiHandler {
    surface: Mutex<DisplaySurface>,
    context: Mutex<Option<MashupContext>>,
}

impl Default for WorldApiHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldApiHandler {
    pub fn new() -> Self {
        Self {
            surface: Mutex::new(DisplaySurface::Uninitialized),
            context: Mutex::new(None),
        }
    }

    pub fn surface(&self) -> DisplaySurface {
        *lock(&self.surface)
    }

    /// Whether a handshake has handed this handler a reverse channel.
    pub fn has_context(&self) -> bool {
        lock(&self.context).is_some()
    }
}

/// A poisoned lock only means another call panicked mid-update; the state
/// itself is a plain value and still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MashupApiHandler for WorldApiHandler {
    fn get_elements(&self) -> Result<MashupDetailedElementBundle, HandlerError> {
        Err(HandlerError::new("Could not get items."))
    }

    fn upsert_elements(
        &self,
        _bundle: MashupDetailedElementBundle,
    ) -> Result<MashupDetailedElementBundle, HandlerError> {
        Err(HandlerError::new("Could not capture items."))
    }

    fn tweak_states(
        &self,
        _bundle: MashupElementStateBundle,
    ) -> Result<MashupElementStateBundle, HandlerError> {
        Err(HandlerError::new("Could not capture items."))
    }

    fn tweak_states_by_motiv(&self, _motiv: Motiv) -> Result<(), HandlerError> {
        Err(HandlerError::new("Could not capture items."))
    }

    fn on_display_change(&self, hint: &MashupDisplayHint) {
        let mut surface = lock(&self.surface);

        match *surface {
            DisplaySurface::Uninitialized => {
                info!("Initializing main window at {}x{}", hint.width, hint.height);
            }
            DisplaySurface::Ready { width, height } => {
                info!(
                    "Resizing main window from {width}x{height} to {}x{}",
                    hint.width, hint.height
                );
            }
        }

        *surface = DisplaySurface::Ready {
            width: hint.width,
            height: hint.height,
        };
    }

    fn register_context(&self, context: &MashupContext) {
        info!("Reverse channel registered");
        *lock(&self.context) = Some(context.clone());
    }
}
