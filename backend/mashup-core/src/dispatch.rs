//! Routing of authorized calls to the capability handler.

use crate::context::MashupContext;
use crate::error::session::SessionError;
use crate::handler::MashupApiHandler;
use crate::proto::{
    MashupDetailedElementBundle, MashupDisplayHint, MashupElementStateBundle, MashupEmpty, Motiv,
};

use std::sync::Arc;

use log::info;

/// Forwards calls to the bound [`MashupApiHandler`].
///
/// With no handler bound every operation succeeds with empty data, which lets
/// a mashup ship without implementing every capability.
#[derive(Clone, Default)]
pub struct DelegationDispatcher {
    handler: Option<Arc<dyn MashupApiHandler>>,
}

impl DelegationDispatcher {
    pub fn new(handler: Option<Arc<dyn MashupApiHandler>>) -> Self {
        Self { handler }
    }

    pub fn is_bound(&self) -> bool {
        self.handler.is_some()
    }

    pub fn get_elements(&self) -> Result<MashupDetailedElementBundle, SessionError> {
        match &self.handler {
            Some(handler) => {
                info!("GetElements: delegating to api handler");
                Ok(handler.get_elements()?)
            }
            None => {
                info!("GetElements: no api handler bound");
                Ok(MashupDetailedElementBundle::default())
            }
        }
    }

    pub fn upsert_elements(
        &self,
        bundle: MashupDetailedElementBundle,
    ) -> Result<MashupDetailedElementBundle, SessionError> {
        match &self.handler {
            Some(handler) => {
                info!(
                    "UpsertElements: delegating {} elements to api handler",
                    bundle.detailed_elements.len()
                );
                Ok(handler.upsert_elements(bundle)?)
            }
            None => {
                info!("UpsertElements: no api handler bound");
                Ok(MashupDetailedElementBundle::default())
            }
        }
    }

    pub fn tweak_states(
        &self,
        bundle: MashupElementStateBundle,
    ) -> Result<MashupElementStateBundle, SessionError> {
        match &self.handler {
            Some(handler) => {
                info!(
                    "TweakStates: delegating {} states to api handler",
                    bundle.element_states.len()
                );
                Ok(handler.tweak_states(bundle)?)
            }
            None => {
                info!("TweakStates: no api handler bound");
                Ok(MashupElementStateBundle::default())
            }
        }
    }

    pub fn tweak_states_by_motiv(&self, motiv: Motiv) -> Result<MashupEmpty, SessionError> {
        match &self.handler {
            Some(handler) => {
                info!("TweakStatesByMotiv: delegating motiv {} to api handler", motiv.code);
                handler.tweak_states_by_motiv(motiv)?;
            }
            None => info!("TweakStatesByMotiv: no api handler bound"),
        }

        Ok(MashupEmpty::default())
    }

    /// Let the handler react to the new display area, then echo the hint.
    pub fn on_display_change(&self, hint: MashupDisplayHint) -> MashupDisplayHint {
        info!(
            "OnDisplayChange: {} {} {} {}",
            hint.xpos, hint.ypos, hint.width, hint.height
        );

        match &self.handler {
            Some(handler) => handler.on_display_change(&hint),
            None => info!("OnDisplayChange: no api handler bound"),
        }

        hint
    }

    pub fn register_context(&self, context: &MashupContext) {
        if let Some(handler) = &self.handler {
            handler.register_context(context);
        }
    }
}
