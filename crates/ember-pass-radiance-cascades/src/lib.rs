//! Radiance cascade passes: the coarse-to-fine build-and-merge over the
//! cascade arena, the bilateral combine/upsample with composite, and the
//! spherical-harmonics output path.

pub mod cpu;
pub mod layout;
pub mod uniforms;

mod build_merge;
mod combine;
mod sh;

pub use build_merge::{cascade_arena_handle, RadianceCascadesPass, CASCADE_FORMAT};
pub use combine::{irradiance_handle, CascadeCombinePass};
pub use layout::{CascadeLayout, CASCADE_LEVELS, PROBE_CELL};
pub use sh::{sh_output_handle, ShCombinePass};
