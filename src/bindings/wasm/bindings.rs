/*!
WebAssembly bindings for the QKD link.

Every mutating call returns the resulting transition as JSON so the page can
replay its visual commands. Pacing is left to the page.
*/

use std::time::Duration;

use js_sys::{Array, Error as JsError};
use wasm_bindgen::prelude::*;
use web_sys::console;

use crate::{
    config::SimulationConfig,
    constants::{PHOTON_COUNT, SECURITY_THRESHOLD_PERCENT, VERSION},
    narrative::build_prompt,
    serde::{serialize_to_json, SerdeSessionSnapshot, SerdeSessionState, SerdeTransition},
    session::{SessionController, Transition},
    signals::IntersectionGate,
};

fn to_js(err: crate::Error) -> JsValue {
    JsError::new(&err.to_string()).into()
}

/// WebAssembly wrapper for a QKD session
#[wasm_bindgen]
pub struct WasmQkdSession {
    controller: SessionController,
    gate: IntersectionGate,
}

#[wasm_bindgen]
impl WasmQkdSession {
    /// Create a new session, optionally with a fixed seed
    #[wasm_bindgen(constructor)]
    pub fn new(seed: Option<u64>, photon_count: Option<u32>) -> Result<WasmQkdSession, JsValue> {
        // Set up panic hook for better error messages
        console_error_panic_hook::set_once();

        let config = match photon_count {
            Some(count) => SimulationConfig::default().with_photon_count(count as usize),
            None => SimulationConfig::default(),
        };
        let gate = IntersectionGate::new(config.intersection_cooldown);
        let controller = match seed {
            Some(seed) => SessionController::with_seed(config, seed),
            None => SessionController::from_os(config),
        }
        .map_err(to_js)?;

        console::log_1(&"QKD session created".into());
        Ok(Self { controller, gate })
    }

    /// Establish a QKD-protected link
    #[wasm_bindgen]
    pub fn start_secure(&mut self, eavesdropper_active: bool) -> Result<String, JsValue> {
        let transition = self.controller.start_secure(eavesdropper_active);
        transition_json(&transition)
    }

    /// Establish an unprotected link
    #[wasm_bindgen]
    pub fn start_unsafe(&mut self, eavesdropper_active: bool) -> Result<String, JsValue> {
        let transition = self.controller.start_unsafe(eavesdropper_active);
        transition_json(&transition)
    }

    /// Renew the key of an established link
    #[wasm_bindgen]
    pub fn renew(&mut self, eavesdropper_active: bool) -> Result<String, JsValue> {
        let transition = self.controller.renew(eavesdropper_active);
        transition_json(&transition)
    }

    /// Beam-intersection callback; `now_ms` is the page's monotonic clock
    #[wasm_bindgen]
    pub fn on_intersection(&mut self, now_ms: f64) -> Result<String, JsValue> {
        let now = Duration::try_from_secs_f64(now_ms / 1000.0).unwrap_or_default();
        if !self.gate.admit(now) {
            return transition_json(&Transition::rejected());
        }
        let transition = self.controller.auto_renew();
        transition_json(&transition)
    }

    /// Reset to the neutral state
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<String, JsValue> {
        self.gate.reset();
        let transition = self.controller.reset();
        transition_json(&transition)
    }

    /// Whether a round is in flight
    #[wasm_bindgen]
    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Current state as JSON
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serialize_to_json(&SerdeSessionState::from(self.controller.state())).map_err(to_js)
    }

    /// State, log and counters as JSON
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serialize_to_json(&SerdeSessionSnapshot::capture(&self.controller)).map_err(to_js)
    }

    /// Event log lines
    #[wasm_bindgen]
    pub fn log(&self) -> Array {
        self.controller
            .log()
            .iter()
            .map(|line| JsValue::from_str(line))
            .collect()
    }

    /// Prompt for the narrative service, if there is an event to explain
    #[wasm_bindgen]
    pub fn analysis_prompt(&self) -> Option<String> {
        self.controller.state().last_event.as_ref().map(build_prompt)
    }
}

fn transition_json(transition: &Transition) -> Result<String, JsValue> {
    serialize_to_json(&SerdeTransition::from(transition)).map_err(to_js)
}

// Export constants to JavaScript
#[wasm_bindgen]
pub fn get_default_photon_count() -> u32 {
    PHOTON_COUNT as u32
}

#[wasm_bindgen]
pub fn get_security_threshold_percent() -> f64 {
    SECURITY_THRESHOLD_PERCENT
}

#[wasm_bindgen]
pub fn get_simulation_version() -> u8 {
    VERSION
}
