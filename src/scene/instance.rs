//! Mesh instances, materials and lights.

use serde::{Deserialize, Serialize};

use crate::util::{Mat4, Vec3, Vec4};

/// One placement of a registered mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshInstance {
    pub mesh_id: usize,
    /// Object-to-world transform (columns: right, up, forward, translation)
    pub transform: Mat4,
    pub material_id: usize,
}

impl MeshInstance {
    pub fn new(mesh_id: usize, transform: Mat4, material_id: usize) -> Self {
        Self {
            mesh_id,
            transform,
            material_id,
        }
    }
}

/// Surface model selector, stored as a float on the GPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    #[default]
    Principled = 0,
    Glass = 1,
}

/// Texture slots a material can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    Albedo,
    MetallicRoughness,
    Normal,
    Height,
}

/// Surface parameters carried through to the GPU material buffer.
///
/// Texture ids index an externally managed texture array; `None` means
/// the slot is unused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub albedo: Vec3,
    pub material_type: MaterialType,
    pub emission: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub ior: f32,
    pub transmittance: f32,
    pub albedo_texture: Option<u32>,
    pub metallic_roughness_texture: Option<u32>,
    pub normal_texture: Option<u32>,
    pub height_texture: Option<u32>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vec3::ONE,
            material_type: MaterialType::Principled,
            emission: Vec4::ZERO,
            metallic: 0.0,
            roughness: 0.5,
            ior: 1.45,
            transmittance: 0.0,
            albedo_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            height_texture: None,
        }
    }
}

impl Material {
    /// Point `slot` at texture `id`.
    pub fn set_texture(&mut self, slot: TextureSlot, id: u32) {
        *self.texture_mut(slot) = Some(id);
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<u32> {
        match slot {
            TextureSlot::Albedo => self.albedo_texture,
            TextureSlot::MetallicRoughness => self.metallic_roughness_texture,
            TextureSlot::Normal => self.normal_texture,
            TextureSlot::Height => self.height_texture,
        }
    }

    fn texture_mut(&mut self, slot: TextureSlot) -> &mut Option<u32> {
        match slot {
            TextureSlot::Albedo => &mut self.albedo_texture,
            TextureSlot::MetallicRoughness => &mut self.metallic_roughness_texture,
            TextureSlot::Normal => &mut self.normal_texture,
            TextureSlot::Height => &mut self.height_texture,
        }
    }
}

/// Light shape, stored as a float on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Area = 0,
    Sphere = 1,
}

/// Analytic light.
///
/// An area light is the parallelogram spanned by `u` and `v` from
/// `position`; a sphere light is centered at `position` with `radius`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub emission: Vec3,
    pub u: Vec3,
    pub v: Vec3,
    pub radius: f32,
    pub area: f32,
    pub kind: LightKind,
}

impl Light {
    /// Parallelogram light; `area = |u x v|`.
    pub fn area(position: Vec3, u: Vec3, v: Vec3, emission: Vec3) -> Self {
        Self {
            position,
            emission,
            u,
            v,
            radius: 0.0,
            area: u.cross(v).length(),
            kind: LightKind::Area,
        }
    }

    /// Sphere light; `area = 4 pi r^2`.
    pub fn sphere(position: Vec3, radius: f32, emission: Vec3) -> Self {
        Self {
            position,
            emission,
            u: Vec3::ZERO,
            v: Vec3::ZERO,
            radius,
            area: 4.0 * std::f32::consts::PI * radius * radius,
            kind: LightKind::Sphere,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_defaults() {
        let m = Material::default();
        assert_eq!(m.albedo, Vec3::ONE);
        assert_eq!(m.emission, Vec4::ZERO);
        assert_eq!(m.ior, 1.45);
        assert_eq!(m.material_type, MaterialType::Principled);
        assert_eq!(m.texture(TextureSlot::Normal), None);
    }

    #[test]
    fn test_set_texture() {
        let mut m = Material::default();
        m.set_texture(TextureSlot::MetallicRoughness, 4);
        m.set_texture(TextureSlot::Height, 9);
        assert_eq!(m.metallic_roughness_texture, Some(4));
        assert_eq!(m.texture(TextureSlot::Height), Some(9));
        assert_eq!(m.texture(TextureSlot::Albedo), None);
    }

    #[test]
    fn test_material_json_fills_defaults() {
        let m: Material =
            serde_json::from_str(r#"{ "material_type": "glass", "albedo_texture": 2 }"#).unwrap();
        assert_eq!(m.material_type, MaterialType::Glass);
        assert_eq!(m.albedo_texture, Some(2));
        assert_eq!(m.roughness, 0.5);
    }

    #[test]
    fn test_light_areas() {
        let quad = Light::area(
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::ONE,
        );
        assert_eq!(quad.area, 6.0);
        assert_eq!(quad.kind, LightKind::Area);

        let ball = Light::sphere(Vec3::Y, 1.0, Vec3::splat(5.0));
        assert!((ball.area - 4.0 * std::f32::consts::PI).abs() < 1e-5);
        assert_eq!(ball.kind, LightKind::Sphere);
    }
}
