// Test doubles shared by the unit tests.

use crate::error::HandlerError;
use crate::handler::MashupApiHandler;
use crate::lifecycle::ShutdownHook;
use crate::proto::{
    MashupDetailedElement, MashupDetailedElementBundle, MashupDisplayHint,
    MashupElementStateBundle, Motiv,
};

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Handler that counts every call and answers with a fixed element.
#[derive(Default)]
pub struct CountingHandler {
    calls: AtomicUsize,
    pub fail_with: Option<String>,
}

impl CountingHandler {
    pub fn failing(message: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(HandlerError::new(message.clone())),
            None => Ok(()),
        }
    }
}

pub fn sample_bundle() -> MashupDetailedElementBundle {
    MashupDetailedElementBundle {
        auth_token: String::new(),
        detailed_elements: vec![MashupDetailedElement {
            id: 7,
            name: "Inside".to_string(),
            alias: "It".to_string(),
            genre: "Space".to_string(),
            ..Default::default()
        }],
    }
}

impl MashupApiHandler for CountingHandler {
    fn get_elements(&self) -> Result<MashupDetailedElementBundle, HandlerError> {
        self.record()?;
        Ok(sample_bundle())
    }

    fn upsert_elements(
        &self,
        bundle: MashupDetailedElementBundle,
    ) -> Result<MashupDetailedElementBundle, HandlerError> {
        self.record()?;
        Ok(bundle)
    }

    fn tweak_states(
        &self,
        bundle: MashupElementStateBundle,
    ) -> Result<MashupElementStateBundle, HandlerError> {
        self.record()?;
        Ok(bundle)
    }

    fn tweak_states_by_motiv(&self, _motiv: Motiv) -> Result<(), HandlerError> {
        self.record()
    }

    fn on_display_change(&self, _hint: &MashupDisplayHint) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hook that records terminations instead of exiting.
#[derive(Default)]
pub struct RecordingHook {
    calls: Mutex<Vec<(i32, Instant)>>,
}

impl RecordingHook {
    pub fn calls(&self) -> Vec<(i32, Instant)> {
        self.calls.lock().expect("hook mutex poisoned").clone()
    }
}

impl ShutdownHook for RecordingHook {
    fn terminate(&self, exit_code: i32) {
        self.calls
            .lock()
            .expect("hook mutex poisoned")
            .push((exit_code, Instant::now()));
    }
}

/// Self-signed certificate and key for `localhost`, both PEM.
pub fn self_signed_pem() -> (String, String) {
    let certified = rcgen::generate_simple_self_signed(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])
    .expect("Failed to generate certificate");

    (certified.cert.pem(), certified.key_pair.serialize_pem())
}
