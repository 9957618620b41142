//! `radiant-core` is the rendering core of an offline global-illumination
//! renderer combining three coupled algorithms over a shared polygonal
//! scene: recursive distribution ray tracing with soft shadows, glossy
//! reflection and anti-aliasing; progressive radiosity via Monte-Carlo
//! form factors and Southwell shooting; and photon mapping with a kd-tree
//! spatial index for indirect-light gather.
//!
//! A host embeds this crate; scene-file parsing, camera projection math,
//! command-line handling, and interactive display are all out of scope and
//! left to that host (see [`scene::builder::SceneBuilder`] for the surface
//! a loader drives and [`renderer::Renderer`] for the command handlers a
//! host's input loop calls).

#![warn(clippy::cast_lossless)]

pub mod error;
pub mod ids;
pub mod kdtree;
pub mod math;
pub mod options;
pub mod photon_map;
pub mod radiosity;
pub mod raycaster;
pub mod raytrace;
pub mod renderer;
pub mod sampler;
pub mod scene;
