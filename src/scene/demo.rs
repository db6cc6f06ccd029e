//! Procedural scenes for the CLI and benchmarks.

use super::{Light, Material, Mesh, MeshInstance, Scene};
use crate::util::{Mat4, Vec3, Vec4};

/// Spacing between grid cells.
const CELL: f32 = 2.0;

/// `n x n` cubes of varying height on a floor quad.
///
/// Two meshes (cube, floor), four materials, one area light and
/// `n * n + 1` instances.
/// Deterministic for a given `n`.
pub fn grid_scene(n: usize) -> Scene {
    let mut scene = Scene::new();
    let cube = scene.add_mesh(Mesh::cube("cube", 1.0));
    let floor = scene.add_mesh(Mesh::quad("floor", 1.0));

    let floor_mat = scene.add_material(Material {
        albedo: Vec3::splat(0.5),
        roughness: 0.9,
        ..Default::default()
    });
    let palette = [
        scene.add_material(Material {
            albedo: Vec3::new(0.8, 0.2, 0.2),
            ..Default::default()
        }),
        scene.add_material(Material {
            albedo: Vec3::new(0.9, 0.9, 0.9),
            metallic: 1.0,
            roughness: 0.1,
            ..Default::default()
        }),
        scene.add_material(Material {
            emission: Vec4::new(4.0, 4.0, 4.0, 1.0),
            ..Default::default()
        }),
    ];

    let extent = n as f32 * CELL;
    scene.add_mesh_instance(MeshInstance::new(
        floor,
        Mat4::from_scale(Vec3::new(extent + CELL, 1.0, extent + CELL)),
        floor_mat,
    ));

    scene.add_light(Light::area(
        Vec3::new(-extent * 0.25, extent + 4.0, -extent * 0.25),
        Vec3::new(extent * 0.5 + 1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, extent * 0.5 + 1.0),
        Vec3::splat(10.0),
    ));

    let origin = -(n as f32 - 1.0) * CELL * 0.5;
    for row in 0..n {
        for col in 0..n {
            let height = 0.5 + ((row * 7 + col * 3) % 5) as f32 * 0.5;
            let pos = Vec3::new(
                origin + col as f32 * CELL,
                height * 0.5,
                origin + row as f32 * CELL,
            );
            let transform = Mat4::from_translation(pos)
                * Mat4::from_rotation_y((row + col) as f32 * 0.3)
                * Mat4::from_scale(Vec3::new(1.0, height, 1.0));
            let material = palette[(row + 2 * col) % palette.len()];
            scene.add_mesh_instance(MeshInstance::new(cube, transform, material));
        }
    }
    scene
}
