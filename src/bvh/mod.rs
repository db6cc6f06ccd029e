//! Acceleration structures.
//!
//! ## Architecture
//! ```text
//! mesh triangles → MeshBvh (per mesh, binned SAH)
//!                     │ local root bounds
//!                     ▼
//! instance transform → world_bounds → TopLevelBvhBuilder (SAH sweep)
//!                                            │
//!                         BvhTranslator ◄────┘ → FlatBvh (one node array)
//! ```

pub mod blas;
pub mod tlas;
pub mod translator;
pub mod world_bounds;

pub use blas::{BlasNode, BlasNodeKind, BlasParams, BottomLevelBvh, MeshBvh};
pub use tlas::{SahSplit, TlasNode, TlasNodeKind, TopLevelBvh, TopLevelBvhBuilder};
pub use translator::{BvhFlatten, BvhTranslator, FlatBvh, FlatNode, FlatNodeKind};
pub use world_bounds::{world_bounds, world_bounds_from_corners};
