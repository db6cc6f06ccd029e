//! # scene-accel
//!
//! Two-level acceleration structure builder for GPU path tracing.
//!
//! Each mesh gets its own bottom-level BVH; instances of those meshes are
//! organized by a SAH top-level BVH over their world-space bounds. Both
//! levels are then flattened into a single node array, and the mesh
//! geometry is merged into global buffers whose indices are packed for
//! square-texture upload.
//!
//! ## Modules
//!
//! - [`util`] - Math types, bounds and errors
//! - [`bvh`] - Bottom-level, top-level and flattened BVHs
//! - [`scene`] - Scene registry and the build pipeline
//! - [`pack`] - Square texture layout and index packing
//! - [`gpu_data`] - Pod buffers and the binary dump
//! - [`config`] - Build options
//! - [`diagnostics`] - Build event reporting
//!
//! ## Example
//!
//! ```ignore
//! use scene_accel::prelude::*;
//!
//! let mut scene = Scene::new();
//! let cube = scene.add_mesh(Mesh::cube("cube", 1.0));
//! let mat = scene.add_material(Material::default());
//! scene.add_mesh_instance(MeshInstance::new(cube, Mat4::IDENTITY, mat));
//!
//! let build = scene.build(&BuildOptions::default(), &TracingDiagnostics)?;
//! let gpu = GpuSceneData::from_build(&build);
//! upload(gpu.nodes_bytes());
//! ```

pub mod util;
pub mod bvh;
pub mod config;
pub mod diagnostics;
pub mod gpu_data;
pub mod pack;
pub mod scene;

// Re-export commonly used types
pub use util::{Bounds, Error, Result};

/// Build date, set by build.rs.
pub const BUILD_DATE: &str = env!("SCENE_ACCEL_BUILD_DATE");

pub mod prelude {
    pub use crate::bvh::{
        BottomLevelBvh, BvhFlatten, BvhTranslator, FlatBvh, MeshBvh, TopLevelBvh,
        TopLevelBvhBuilder,
    };
    pub use crate::config::BuildOptions;
    pub use crate::diagnostics::{Diagnostics, NullDiagnostics, TracingDiagnostics};
    pub use crate::gpu_data::GpuSceneData;
    pub use crate::scene::{
        Light, LightKind, Material, MaterialType, Mesh, MeshInstance, Scene, SceneBuild,
        TextureSlot,
    };
    pub use crate::util::{Bounds, Error, Mat4, Result, Vec2, Vec3, Vec4};
}
