//! wgpu backend for `spine2d-widget`.
//!
//! [`StagedFrame`] implements the core's `HostRenderer` on the CPU side: every draw call is
//! copied (with the widget's vertex mutator applied) into one vertex/index stream and merged into
//! batches. [`WidgetRenderer`] uploads a staged frame and replays its batches into a render pass.

#![forbid(unsafe_code)]

mod renderer;
mod staging;

pub use renderer::*;
pub use staging::*;
