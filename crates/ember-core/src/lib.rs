//! Core types shared by the Ember radiance cascades pipeline: errors,
//! viewport/camera math, per-frame inputs, settings, and wgpu shorthands.

pub mod gpu;

mod camera;
mod error;
mod frame;
mod settings;
mod viewport;

pub use camera::Camera;
pub use error::{EmberError, Result};
pub use frame::FrameInputs;
pub use settings::{OutputMode, RadianceSettings, RenderType};
pub use viewport::Viewport;
