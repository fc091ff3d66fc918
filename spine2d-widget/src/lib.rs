//! Frame, geometry and viewport pipeline for embedding Spine skeletons in host scenes.
//!
//! The skeleton runtime is consumed through the [`SkeletonPose`] and [`AnimationState`]
//! traits. Per frame, widgets advance their skeleton, rebuild attachment geometry (with runtime
//! polygon clipping) and hand vertex/index batches to a [`HostRenderer`]. Host bindings live in
//! separate crates (e.g. `spine2d-widget-wgpu`, `spine2d-widget-web`).

#![forbid(unsafe_code)]

mod animations;
mod bounds;
mod clipping;
mod config;
mod error;
mod events;
mod fit;
mod geometry;
mod host;
mod overlay;
mod pool;
mod pose;
mod registry;
mod scheduler;
mod slot_objects;
mod viewport;
mod widget;

pub use animations::*;
pub use bounds::*;
pub use clipping::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use fit::*;
pub use geometry::*;
pub use hit_test::*;
pub use host::*;
pub use overlay::*;
pub use pool::*;
pub use pose::*;
pub use registry::*;
pub use scheduler::*;
pub use slot_objects::*;
pub use viewport::*;
pub use widget::*;

#[cfg(test)]
mod test_rig;




#[cfg(test)]
mod config_tests;


#[cfg(test)]
mod fit_tests;



#[cfg(test)]
mod overlay_tests;


#[cfg(test)]
mod registry_tests;

#[cfg(test)]
mod scheduler_tests;
