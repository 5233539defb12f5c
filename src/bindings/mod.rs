//! Foreign language bindings for the QKD link.
//!
//! This module exposes the session controller to JavaScript/TypeScript via
//! WebAssembly so a browser scene can drive it.

// WebAssembly bindings for browser
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub use wasm::bindings::*;
