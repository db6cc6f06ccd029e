//! Serialize a scene build into GPU storage buffers.

use bytemuck::{Pod, Zeroable};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::bvh::{FlatNode, FlatNodeKind};
use crate::pack::SquareLayout;
use crate::scene::{Light, Material, SceneBuild};
use crate::util::{Mat4, Result, Vec2, Vec3};

/// Dump file magic.
pub const DUMP_MAGIC: &[u8; 4] = b"SBVH";
/// Dump format version.
pub const DUMP_VERSION: u32 = 2;

/// Node kind tags in [`GpuBvhNode::kind`].
pub const NODE_INTERIOR: i32 = 0;
pub const NODE_TRIANGLES: i32 = 1;
pub const NODE_INSTANCE: i32 = 2;

/// Flat BVH node, 40 bytes.
///
/// `left`/`right` hold the children for interior nodes, `first`/`count` for
/// triangle leaves and `blas_root`/`instance` for instance leaves. `material`
/// is the instance's material id on instance leaves and 0 elsewhere.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub bbmin: [f32; 3],
    pub bbmax: [f32; 3],
    pub left: i32,
    pub right: i32,
    pub kind: i32,
    pub material: i32,
}

impl From<&FlatNode> for GpuBvhNode {
    fn from(node: &FlatNode) -> Self {
        let (left, right, kind, material) = match node.kind {
            FlatNodeKind::Interior { left, right } => (left, right, NODE_INTERIOR, 0),
            FlatNodeKind::Triangles { first, count } => (first, count, NODE_TRIANGLES, 0),
            FlatNodeKind::Instance {
                blas_root,
                instance,
                material,
            } => (blas_root, instance, NODE_INSTANCE, material),
        };
        Self {
            bbmin: node.bounds.lower.to_array(),
            bbmax: node.bounds.upper.to_array(),
            left: left as i32,
            right: right as i32,
            kind,
            material: material as i32,
        }
    }
}

/// Material for GPU (64 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub albedo_type: [f32; 4], // rgb=albedo, a=material type
    pub emission: [f32; 4],
    pub params: [f32; 4],   // metallic, roughness, ior, transmittance
    pub textures: [f32; 4], // albedo, metallic-roughness, normal, height; -1 = none
}

impl From<&Material> for GpuMaterial {
    fn from(m: &Material) -> Self {
        let tex = |id: Option<u32>| id.map_or(-1.0, |i| i as f32);
        Self {
            albedo_type: m.albedo.extend(m.material_type as u32 as f32).to_array(),
            emission: m.emission.to_array(),
            params: [m.metallic, m.roughness, m.ior, m.transmittance],
            textures: [
                tex(m.albedo_texture),
                tex(m.metallic_roughness_texture),
                tex(m.normal_texture),
                tex(m.height_texture),
            ],
        }
    }
}

/// Light for GPU (60 bytes, 15 floats).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 3],
    pub emission: [f32; 3],
    pub u: [f32; 3],
    pub v: [f32; 3],
    pub radius: f32,
    pub area: f32,
    pub kind: f32,
}

impl From<&Light> for GpuLight {
    fn from(l: &Light) -> Self {
        Self {
            position: l.position.to_array(),
            emission: l.emission.to_array(),
            u: l.u.to_array(),
            v: l.v.to_array(),
            radius: l.radius,
            area: l.area,
            kind: l.kind as u32 as f32,
        }
    }
}

/// Complete scene data ready for GPU upload.
#[derive(Debug, Clone)]
pub struct GpuSceneData {
    /// Flat BVH, bottom-level trees first.
    pub nodes: Vec<GpuBvhNode>,
    /// First top-level node, or -1 for a scene without instances.
    pub top_level_index: i32,
    /// Packed index triples, in leaf order, padded square.
    pub vertex_indices: Vec<[u32; 3]>,
    pub normal_indices: Vec<[u32; 3]>,
    pub uv_indices: Vec<[u32; 3]>,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub triangle_layout: SquareLayout,
    pub vertex_layout: SquareLayout,
    pub normal_layout: SquareLayout,
    pub uv_layout: SquareLayout,
    /// One transform per instance.
    pub transforms: Vec<Mat4>,
    pub materials: Vec<GpuMaterial>,
    pub lights: Vec<GpuLight>,
}

impl GpuSceneData {
    /// Convert a finished build.
    pub fn from_build(build: &SceneBuild) -> Self {
        let geo = &build.geometry;
        Self {
            nodes: build.flat.nodes.iter().map(GpuBvhNode::from).collect(),
            top_level_index: build.flat.top_level_index.map_or(-1, |i| i as i32),
            vertex_indices: geo.vertex_indices.clone(),
            normal_indices: geo.normal_indices.clone(),
            uv_indices: geo.uv_indices.clone(),
            vertices: geo.vertices.clone(),
            normals: geo.normals.clone(),
            uvs: geo.uvs.clone(),
            triangle_layout: geo.triangle_layout,
            vertex_layout: geo.vertex_layout,
            normal_layout: geo.normal_layout,
            uv_layout: geo.uv_layout,
            transforms: build.transforms.clone(),
            materials: build.materials.iter().map(GpuMaterial::from).collect(),
            lights: build.lights.iter().map(GpuLight::from).collect(),
        }
    }

    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    pub fn vertex_indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertex_indices)
    }

    pub fn normal_indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normal_indices)
    }

    pub fn uv_indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uv_indices)
    }

    pub fn vertices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn normals_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn uvs_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }

    pub fn transforms_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }

    pub fn materials_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.materials)
    }

    pub fn lights_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lights)
    }

    /// Size of the dump header in bytes.
    pub const HEADER_LEN: usize = 4 + 6 * 4 + 4 * 8;

    /// Write the dump: header, then every buffer in upload order.
    ///
    /// Header (all little endian): magic, version, node count, top-level
    /// index, instance count, material count, light count, then
    /// `(count, width)` for the
    /// triangle, vertex, normal and uv buffers.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(DUMP_MAGIC)?;
        w.write_u32::<LittleEndian>(DUMP_VERSION)?;
        w.write_u32::<LittleEndian>(self.nodes.len() as u32)?;
        w.write_i32::<LittleEndian>(self.top_level_index)?;
        w.write_u32::<LittleEndian>(self.transforms.len() as u32)?;
        w.write_u32::<LittleEndian>(self.materials.len() as u32)?;
        w.write_u32::<LittleEndian>(self.lights.len() as u32)?;
        for layout in [
            &self.triangle_layout,
            &self.vertex_layout,
            &self.normal_layout,
            &self.uv_layout,
        ] {
            w.write_u32::<LittleEndian>(layout.count as u32)?;
            w.write_u32::<LittleEndian>(layout.width as u32)?;
        }

        write_words(&mut w, bytemuck::cast_slice(&self.nodes))?;
        write_words(&mut w, bytemuck::cast_slice(&self.vertex_indices))?;
        write_words(&mut w, bytemuck::cast_slice(&self.normal_indices))?;
        write_words(&mut w, bytemuck::cast_slice(&self.uv_indices))?;
        write_words(&mut w, bytemuck::cast_slice(&self.vertices))?;
        write_words(&mut w, bytemuck::cast_slice(&self.normals))?;
        write_words(&mut w, bytemuck::cast_slice(&self.uvs))?;
        write_words(&mut w, bytemuck::cast_slice(&self.transforms))?;
        write_words(&mut w, bytemuck::cast_slice(&self.materials))?;
        write_words(&mut w, bytemuck::cast_slice(&self.lights))?;
        w.flush()?;
        Ok(())
    }

    /// Total bytes [`write_to`](Self::write_to) produces.
    pub fn dump_len(&self) -> usize {
        Self::HEADER_LEN
            + self.nodes_bytes().len()
            + self.vertex_indices_bytes().len()
            + self.normal_indices_bytes().len()
            + self.uv_indices_bytes().len()
            + self.vertices_bytes().len()
            + self.normals_bytes().len()
            + self.uvs_bytes().len()
            + self.transforms_bytes().len()
            + self.materials_bytes().len()
            + self.lights_bytes().len()
    }
}

// every GPU buffer is made of 4-byte words
fn write_words<W: Write>(w: &mut W, words: &[u32]) -> Result<()> {
    for &word in words {
        w.write_u32::<LittleEndian>(word)?;
    }
    Ok(())
}
