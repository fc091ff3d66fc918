//! Browser host for `spine2d-widget`.
//!
//! One transparent canvas overlays the page; every host element registered with the overlay gets
//! a skeleton widget laid out over it. Skeletons and animation states are spine-core JS objects,
//! read through [`PoseSnapshot`]. Drawing goes through `spine2d-widget-wgpu`.
//!
//! The browser bindings only exist on `wasm32`; elsewhere the crate exposes the
//! platform-independent pieces so they can be tested natively.

mod input;
mod snapshot;

pub use input::*;
pub use snapshot::*;

#[cfg(target_arch = "wasm32")]
mod spine_js;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(not(target_arch = "wasm32"))]
mod web {
    // The overlay host is built for `wasm32-unknown-unknown`. Keep a tiny native stub so
    // `cargo test` for the workspace stays green.
}


#[cfg(test)]
mod snapshot_tests;
