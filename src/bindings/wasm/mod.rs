/*!
WebAssembly bindings for the QKD link.

This module provides WebAssembly bindings for driving a session from a browser.
*/

pub mod bindings;

pub use bindings::*;
