//! Capability interface implemented by the application hosting the mashup.

use crate::context::MashupContext;
use crate::error::handler::HandlerError;
use crate::proto::{
    MashupDetailedElementBundle, MashupDisplayHint, MashupElementStateBundle, Motiv,
};

/// The operations a host can delegate into the mashup process.
///
/// Methods are called synchronously from the task serving the request, and
/// requests are served concurrently, so implementations must tolerate being
/// called from several threads at once. Errors are returned to the host
/// verbatim.
pub trait MashupApiHandler: Send + Sync {
    /// Current element graph.
    fn get_elements(&self) -> Result<MashupDetailedElementBundle, HandlerError>;

    /// Insert or update elements, returning the resulting elements.
    fn upsert_elements(
        &self,
        bundle: MashupDetailedElementBundle,
    ) -> Result<MashupDetailedElementBundle, HandlerError>;

    /// Apply individual element state changes.
    fn tweak_states(
        &self,
        bundle: MashupElementStateBundle,
    ) -> Result<MashupElementStateBundle, HandlerError>;

    /// Apply a motive that changes many states at once.
    fn tweak_states_by_motiv(&self, motiv: Motiv) -> Result<(), HandlerError>;

    /// The host's display area moved or resized.
    ///
    /// Typically used to create the mashup's main window on first call and
    /// resize it afterwards.
    fn on_display_change(&self, hint: &MashupDisplayHint);

    /// Called after every successful handshake with access to the reverse
    /// channel.
    fn register_context(&self, _context: &MashupContext) {}
}
