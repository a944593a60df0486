//! Dependency-ordered pass graph and the transient resource pool behind it.

mod graph;
mod pass;
mod resource;

pub use graph::RenderGraph;
pub use pass::{PassContext, PassResourceBuilder, RenderPass};
pub use resource::{PooledTexture, ResourceHandle, ResourcePool, TextureSpec};
