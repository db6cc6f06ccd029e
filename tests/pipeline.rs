//! End-to-end scene builds through the public API.

use scene_accel::bvh::FlatNodeKind;
use scene_accel::diagnostics::{Level, RecordingDiagnostics};
use scene_accel::pack::unpack_index;
use scene_accel::prelude::*;
use scene_accel::scene::demo;
use std::collections::BTreeMap;

fn cube_at(scene: &mut Scene, cube: usize, mat: usize, x: f32, y: f32) {
    scene.add_mesh_instance(MeshInstance::new(
        cube,
        Mat4::from_translation(Vec3::new(x, y, 0.0)),
        mat,
    ));
}

fn four_cubes() -> Scene {
    let mut scene = Scene::new();
    let cube = scene.add_mesh(Mesh::cube("cube", 1.0));
    let mat = scene.add_material(Material::default());
    cube_at(&mut scene, cube, mat, 0.0, 0.0);
    cube_at(&mut scene, cube, mat, 2.0, 0.0);
    cube_at(&mut scene, cube, mat, 0.0, 2.0);
    cube_at(&mut scene, cube, mat, 2.0, 2.0);
    scene
}

/// Strip of `n` separate triangles, three own vertices each.
fn strip(name: &str, n: usize) -> Mesh {
    let mut mesh = Mesh::new(name);
    mesh.normals.push(Vec3::Z);
    mesh.uvs.push(Vec2::ZERO);
    for i in 0..n {
        let x = i as f32 * 2.0;
        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend([
            Vec3::new(x, 0.0, 0.0),
            Vec3::new(x + 1.0, 0.0, 0.0),
            Vec3::new(x, 1.0, 0.0),
        ]);
        mesh.push_triangle([base, base + 1, base + 2], [0; 3], [0; 3]);
    }
    mesh
}

/// Walk the flat BVH from the top-level root. Returns, per instance, the
/// triangle indices reached through its bottom-level subtree.
fn reach(flat: &FlatBvh) -> BTreeMap<u32, Vec<u32>> {
    let mut out: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    let Some(top) = flat.top_level_index else {
        return out;
    };
    let mut stack = vec![(top, None::<u32>)];
    while let Some((idx, inst)) = stack.pop() {
        match flat.nodes[idx as usize].kind {
            FlatNodeKind::Interior { left, right } => {
                stack.push((left, inst));
                stack.push((right, inst));
            }
            FlatNodeKind::Instance {
                blas_root,
                instance,
                ..
            } => {
                assert!(inst.is_none(), "instance leaf below an instance");
                out.entry(instance).or_default();
                stack.push((blas_root, Some(instance)));
            }
            FlatNodeKind::Triangles { first, count } => {
                let inst = inst.expect("triangle leaf reached outside any instance");
                out.entry(inst).or_default().extend(first..first + count);
            }
        }
    }
    for tris in out.values_mut() {
        tris.sort_unstable();
    }
    out
}

#[test]
fn test_four_cubes_build() {
    let scene = four_cubes();
    let build = scene
        .build(&BuildOptions::default(), &NullDiagnostics)
        .unwrap();

    let tlas = build.tlas.as_ref().unwrap();
    assert_eq!(tlas.len(), 7);
    assert_eq!(build.scene_bounds.lower, Vec3::new(-0.5, -0.5, -0.5));
    assert_eq!(build.scene_bounds.upper, Vec3::new(2.5, 2.5, 0.5));

    let blas_len = build.blases[0].nodes().len();
    assert_eq!(build.flat.blas_roots, vec![0]);
    assert_eq!(build.flat.top_level_index, Some(blas_len as u32));
    assert_eq!(build.flat.nodes.len(), blas_len + 7);
    assert_eq!(
        build.flat.nodes[blas_len].bounds,
        build.scene_bounds,
        "top-level root carries the scene bounds"
    );
}

#[test]
fn test_every_instance_reaches_all_its_triangles() {
    let build = four_cubes()
        .build(&BuildOptions::default(), &NullDiagnostics)
        .unwrap();
    let reached = reach(&build.flat);
    assert_eq!(reached.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    let all: Vec<u32> = (0..12).collect();
    for tris in reached.values() {
        assert_eq!(*tris, all);
    }
}

#[test]
fn test_multi_item_leaves_still_reach_every_instance() {
    let scene = demo::grid_scene(5);
    let opts = BuildOptions {
        max_items_per_leaf: 3,
        ..Default::default()
    };
    let build = scene.build(&opts, &NullDiagnostics).unwrap();
    let reached = reach(&build.flat);
    assert_eq!(reached.len(), scene.instances().len());
    for (inst, tris) in &reached {
        let mesh = scene.instances()[*inst as usize].mesh_id;
        assert_eq!(tris.len(), scene.meshes()[mesh].num_triangles());
    }
}

#[test]
fn test_three_and_five_triangles_pack_into_width_three() {
    let mut scene = Scene::new();
    let a = scene.add_mesh(strip("a", 3));
    let b = scene.add_mesh(strip("b", 5));
    let mat = scene.add_material(Material::default());
    scene.add_mesh_instance(MeshInstance::new(a, Mat4::IDENTITY, mat));
    scene.add_mesh_instance(MeshInstance::new(
        b,
        Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)),
        mat,
    ));

    let build = scene
        .build(&BuildOptions::default(), &NullDiagnostics)
        .unwrap();
    let geo = &build.geometry;
    assert_eq!(geo.triangle_layout.width, 3);
    assert_eq!(geo.vertex_indices.len(), 9);
    assert_eq!(geo.vertex_indices[8], [0, 0, 0]);
    assert_eq!(geo.vertex_layout.width, 5);

    // triangles reached through mesh b's subtree use mesh b's vertices
    let reached = reach(&build.flat);
    for &t in &reached[&1] {
        for packed in geo.vertex_indices[t as usize] {
            let v = unpack_index(packed, geo.vertex_layout.width);
            assert!((9..24).contains(&v), "triangle {t} uses vertex {v}");
        }
    }
    for &t in &reached[&0] {
        for packed in geo.vertex_indices[t as usize] {
            assert!(unpack_index(packed, geo.vertex_layout.width) < 9);
        }
    }
}

#[test]
fn test_zero_instances_build_without_top_level() {
    let mut scene = Scene::new();
    scene.add_mesh(Mesh::cube("cube", 1.0));
    let diag = RecordingDiagnostics::new();
    let build = scene.build(&BuildOptions::default(), &diag).unwrap();

    assert!(build.tlas.is_none());
    assert_eq!(build.flat.top_level_index, None);
    assert_eq!(build.flat.nodes.len(), build.blases[0].nodes().len());
    assert!(build.transforms.is_empty());
    assert!(!diag.messages_at_least(Level::Warn).is_empty());

    let gpu = GpuSceneData::from_build(&build);
    assert_eq!(gpu.top_level_index, -1);
}

#[test]
fn test_nan_transform_fails_the_build() {
    let mut scene = four_cubes();
    scene.add_mesh_instance(MeshInstance::new(
        0,
        Mat4::from_scale(Vec3::new(f32::NAN, 1.0, 1.0)),
        0,
    ));
    let err = scene
        .build(&BuildOptions::default(), &NullDiagnostics)
        .unwrap_err();
    assert!(matches!(err, Error::NonFiniteBounds { instance: 4, .. }));
}

#[test]
fn test_texture_width_limit_is_enforced() {
    let scene = demo::grid_scene(2);
    let opts = BuildOptions {
        max_texture_width: 4,
        ..Default::default()
    };
    // 28 vertices need a 6-wide texture
    let err = scene.build(&opts, &NullDiagnostics).unwrap_err();
    assert!(matches!(
        err,
        Error::TextureWidthOverflow {
            buffer: "vertex",
            width: 6,
            max: 4
        }
    ));
}

#[test]
fn test_options_from_json_drive_the_build() {
    let opts = BuildOptions::from_json_str(r#"{ "max_items_per_leaf": 2, "parallel": false }"#)
        .unwrap();
    assert_eq!(opts.max_items_per_leaf, 2);
    assert_eq!(opts.blas_bins, BuildOptions::default().blas_bins);

    let build = four_cubes().build(&opts, &NullDiagnostics).unwrap();
    assert_eq!(reach(&build.flat).len(), 4);
}

#[test]
fn test_dump_size_matches_buffers() {
    let build = demo::grid_scene(3)
        .build(&BuildOptions::default(), &NullDiagnostics)
        .unwrap();
    let gpu = GpuSceneData::from_build(&build);
    let mut bytes = Vec::new();
    gpu.write_to(&mut bytes).unwrap();
    assert_eq!(bytes.len(), gpu.dump_len());
    assert_eq!(&bytes[..4], b"SBVH");
    assert_eq!(gpu.nodes_bytes().len(), gpu.nodes.len() * 40);
    assert_eq!(gpu.transforms.len(), 10);
    assert_eq!(gpu.lights.len(), 1);
}

#[test]
fn test_instance_leaves_match_instance_materials() {
    let scene = demo::grid_scene(4);
    let build = scene
        .build(&BuildOptions::default(), &NullDiagnostics)
        .unwrap();
    let gpu = GpuSceneData::from_build(&build);
    let mut seen = 0;
    for node in gpu.nodes.iter().filter(|n| n.kind == 2) {
        let inst = &scene.instances()[node.right as usize];
        assert_eq!(node.material, inst.material_id as i32);
        seen += 1;
    }
    assert_eq!(seen, scene.instances().len());
}
