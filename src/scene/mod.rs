//! Scene registry and the acceleration build pipeline.
//!
//! ```text
//! validate ─► per-mesh BLAS (parallel) ─► per-instance world bounds (parallel)
//!          ─► TLAS ─► translate ─► merge + pack geometry ─► SceneBuild
//! ```
//!
//! Each parallel phase collects into a `Vec` before the next starts, so no
//! stage ever reads a partially built result.

mod flatten;
mod instance;
mod mesh;

pub mod demo;

pub use flatten::{MergedGeometry, PackedGeometry, SceneFlattener};
pub use instance::{Light, LightKind, Material, MaterialType, MeshInstance, TextureSlot};
pub use mesh::Mesh;

use rayon::prelude::*;
use std::collections::HashMap;

use crate::bvh::{
    world_bounds, BlasParams, BottomLevelBvh, BvhFlatten, BvhTranslator, FlatBvh, MeshBvh,
    TopLevelBvh, TopLevelBvhBuilder,
};
use crate::config::BuildOptions;
use crate::diagnostics::Diagnostics;
use crate::util::{Bounds, Error, Mat4, Result};

/// Meshes, materials, lights and instances registered for one build.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    mesh_ids: HashMap<String, usize>,
    materials: Vec<Material>,
    lights: Vec<Light>,
    instances: Vec<MeshInstance>,
}

/// Everything a build produces. Immutable; rebuild to change it.
#[derive(Debug, Clone)]
pub struct SceneBuild {
    /// One bottom-level tree per mesh, in mesh order
    pub blases: Vec<MeshBvh>,
    /// World bounds per instance, in instance order
    pub instance_bounds: Vec<Bounds>,
    /// `None` when the scene has no instances
    pub tlas: Option<TopLevelBvh>,
    pub flat: FlatBvh,
    pub geometry: PackedGeometry,
    /// Instance transforms, in instance order
    pub transforms: Vec<Mat4>,
    pub materials: Vec<Material>,
    pub lights: Vec<Light>,
    /// Union of all instance bounds (empty without instances)
    pub scene_bounds: Bounds,
}

impl SceneBuild {
    #[inline]
    pub fn is_empty_scene(&self) -> bool {
        self.tlas.is_none()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh. A name seen before returns the existing id and the
    /// new geometry is dropped.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        if let Some(&id) = self.mesh_ids.get(&mesh.name) {
            return id;
        }
        let id = self.meshes.len();
        self.mesh_ids.insert(mesh.name.clone(), id);
        self.meshes.push(mesh);
        id
    }

    /// Id of a registered mesh by name.
    pub fn mesh_id(&self, name: &str) -> Option<usize> {
        self.mesh_ids.get(name).copied()
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Point a texture slot of a registered material at texture `texture`.
    pub fn set_texture(&mut self, material: usize, slot: TextureSlot, texture: u32) -> Result<()> {
        self.materials
            .get_mut(material)
            .ok_or(Error::NoSuchMaterial { material })?
            .set_texture(slot, texture);
        Ok(())
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Register an instance. References are checked when building.
    pub fn add_mesh_instance(&mut self, instance: MeshInstance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    #[inline]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    #[inline]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    #[inline]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    #[inline]
    pub fn instances(&self) -> &[MeshInstance] {
        &self.instances
    }

    /// Build with the default translator.
    pub fn build(&self, options: &BuildOptions, diag: &dyn Diagnostics) -> Result<SceneBuild> {
        self.build_with(options, &BvhTranslator, diag)
    }

    /// Build all acceleration data and GPU buffers.
    #[tracing::instrument(skip_all, fields(meshes = self.meshes.len(), instances = self.instances.len()))]
    pub fn build_with<F: BvhFlatten>(
        &self,
        options: &BuildOptions,
        flattener: &F,
        diag: &dyn Diagnostics,
    ) -> Result<SceneBuild> {
        options.validate()?;
        self.validate_instances()?;

        let params = BlasParams {
            max_leaf_size: options.blas_max_leaf_size,
            bins: options.blas_bins,
        };

        let blases: Vec<MeshBvh> = if options.parallel {
            self.meshes
                .par_iter()
                .map(|mesh| build_blas(mesh, params))
                .collect::<Result<_>>()?
        } else {
            self.meshes
                .iter()
                .map(|mesh| build_blas(mesh, params))
                .collect::<Result<_>>()?
        };
        diag.debug(&format!("built {} bottom-level trees", blases.len()));

        let instance_bounds: Vec<Bounds> = if options.parallel {
            self.instances
                .par_iter()
                .enumerate()
                .map(|(i, inst)| instance_world_bounds(i, inst, &blases))
                .collect::<Result<_>>()?
        } else {
            self.instances
                .iter()
                .enumerate()
                .map(|(i, inst)| instance_world_bounds(i, inst, &blases))
                .collect::<Result<_>>()?
        };

        let tlas = if instance_bounds.is_empty() {
            diag.warn("scene has no instances; skipping top-level build");
            None
        } else {
            let mut builder = TopLevelBvhBuilder::new(options.max_items_per_leaf);
            Some(builder.build(&instance_bounds, diag)?)
        };

        let flat = flattener.flatten(tlas.as_ref(), &blases, &self.instances)?;
        let geometry =
            SceneFlattener::flatten(&self.meshes, &blases, options.max_texture_width, diag)?;

        let scene_bounds = tlas.as_ref().map_or(Bounds::EMPTY, |t| t.root().bounds);
        let transforms = self.instances.iter().map(|i| i.transform).collect();

        diag.info(&format!(
            "scene build: {} meshes, {} instances, {} flat nodes, {} triangles",
            self.meshes.len(),
            self.instances.len(),
            flat.nodes.len(),
            geometry.triangle_layout.count
        ));

        Ok(SceneBuild {
            blases,
            instance_bounds,
            tlas,
            flat,
            geometry,
            transforms,
            materials: self.materials.clone(),
            lights: self.lights.clone(),
            scene_bounds,
        })
    }

    fn validate_instances(&self) -> Result<()> {
        for (i, inst) in self.instances.iter().enumerate() {
            let mesh = self.meshes.get(inst.mesh_id).ok_or(Error::UnknownMesh {
                instance: i,
                mesh: inst.mesh_id,
            })?;
            if inst.material_id >= self.materials.len() {
                return Err(Error::UnknownMaterial {
                    instance: i,
                    material: inst.material_id,
                });
            }
            if mesh.is_empty() {
                return Err(Error::malformed(
                    &mesh.name,
                    format!("instanced by instance {i} but has no triangles"),
                ));
            }
        }
        Ok(())
    }
}

fn build_blas(mesh: &Mesh, params: BlasParams) -> Result<MeshBvh> {
    mesh.validate()?;
    Ok(MeshBvh::build(&mesh.triangle_bounds(), params))
}

fn instance_world_bounds(index: usize, inst: &MeshInstance, blases: &[MeshBvh]) -> Result<Bounds> {
    let world = world_bounds(&blases[inst.mesh_id].bounds(), &inst.transform);
    if !world.is_finite() {
        return Err(Error::NonFiniteBounds {
            instance: index,
            mesh: inst.mesh_id,
        });
    }
    let determinant = inst.transform.determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return Err(Error::SingularTransform {
            instance: index,
            determinant,
        });
    }
    Ok(world)
}
