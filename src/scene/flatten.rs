//! Merge per-mesh geometry into global buffers and pack their indices.
//!
//! Meshes are appended in registration order. Triangles of each mesh are
//! taken in its bottom-level leaf order, so triangle leaf ranges in the
//! flattened BVH line up with the merged index buffers.

use crate::bvh::BottomLevelBvh;
use crate::diagnostics::Diagnostics;
use crate::pack::SquareLayout;
use crate::util::{Result, Vec2, Vec3};

use super::Mesh;

/// Concatenated geometry with raw (unpacked) global indices.
#[derive(Debug, Clone, Default)]
pub struct MergedGeometry {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub vertex_indices: Vec<[u32; 3]>,
    pub normal_indices: Vec<[u32; 3]>,
    pub uv_indices: Vec<[u32; 3]>,
}

impl MergedGeometry {
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.vertex_indices.len()
    }
}

/// Square-padded buffers with 2D-packed indices, ready for texture upload.
#[derive(Debug, Clone)]
pub struct PackedGeometry {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub vertex_indices: Vec<[u32; 3]>,
    pub normal_indices: Vec<[u32; 3]>,
    pub uv_indices: Vec<[u32; 3]>,
    /// Layout shared by the three index buffers
    pub triangle_layout: SquareLayout,
    pub vertex_layout: SquareLayout,
    pub normal_layout: SquareLayout,
    pub uv_layout: SquareLayout,
}

/// Geometry merge and index packing.
pub struct SceneFlattener;

impl SceneFlattener {
    /// Concatenate every mesh's buffers and rebase its indices.
    pub fn merge<B: BottomLevelBvh>(meshes: &[Mesh], blases: &[B]) -> MergedGeometry {
        assert_eq!(meshes.len(), blases.len(), "one bottom-level tree per mesh");

        let total_tris: usize = blases.iter().map(|b| b.num_indices()).sum();
        let mut out = MergedGeometry {
            vertices: Vec::with_capacity(meshes.iter().map(|m| m.vertices.len()).sum()),
            normals: Vec::with_capacity(meshes.iter().map(|m| m.normals.len()).sum()),
            uvs: Vec::with_capacity(meshes.iter().map(|m| m.uvs.len()).sum()),
            vertex_indices: Vec::with_capacity(total_tris),
            normal_indices: Vec::with_capacity(total_tris),
            uv_indices: Vec::with_capacity(total_tris),
        };

        for (mesh, blas) in meshes.iter().zip(blases) {
            assert_eq!(
                blas.num_indices(),
                mesh.num_triangles(),
                "bottom-level tree of '{}' does not match its mesh",
                mesh.name
            );

            let v_off = out.vertices.len() as u32;
            let n_off = out.normals.len() as u32;
            let t_off = out.uvs.len() as u32;

            for &tri in blas.indices() {
                let tri = tri as usize;
                out.vertex_indices.push(mesh.vertex_indices[tri].map(|i| i + v_off));
                out.normal_indices.push(mesh.normal_indices[tri].map(|i| i + n_off));
                out.uv_indices.push(mesh.uv_indices[tri].map(|i| i + t_off));
            }

            out.vertices.extend_from_slice(&mesh.vertices);
            out.normals.extend_from_slice(&mesh.normals);
            out.uvs.extend_from_slice(&mesh.uvs);
        }

        out
    }

    /// Pad every buffer to its square texture and pack the indices.
    ///
    /// Fails if any buffer needs a texture wider than `max_width`.
    pub fn pack(merged: MergedGeometry, max_width: usize) -> Result<PackedGeometry> {
        let triangle_layout = SquareLayout::new("triangle index", merged.num_triangles(), max_width)?;
        let vertex_layout = SquareLayout::new("vertex", merged.vertices.len(), max_width)?;
        let normal_layout = SquareLayout::new("normal", merged.normals.len(), max_width)?;
        let uv_layout = SquareLayout::new("uv", merged.uvs.len(), max_width)?;

        let MergedGeometry {
            mut vertices,
            mut normals,
            mut uvs,
            vertex_indices,
            normal_indices,
            uv_indices,
        } = merged;

        let pack_all = |indices: Vec<[u32; 3]>, layout: &SquareLayout| -> Vec<[u32; 3]> {
            let mut packed: Vec<[u32; 3]> = indices
                .into_iter()
                .map(|tri| tri.map(|o| layout.pack(o)))
                .collect();
            triangle_layout.pad(&mut packed);
            packed
        };

        let vertex_indices = pack_all(vertex_indices, &vertex_layout);
        let normal_indices = pack_all(normal_indices, &normal_layout);
        let uv_indices = pack_all(uv_indices, &uv_layout);

        vertex_layout.pad(&mut vertices);
        normal_layout.pad(&mut normals);
        uv_layout.pad(&mut uvs);

        Ok(PackedGeometry {
            vertices,
            normals,
            uvs,
            vertex_indices,
            normal_indices,
            uv_indices,
            triangle_layout,
            vertex_layout,
            normal_layout,
            uv_layout,
        })
    }

    /// [`merge`](Self::merge) followed by [`pack`](Self::pack).
    #[tracing::instrument(skip_all, fields(meshes = meshes.len()))]
    pub fn flatten<B: BottomLevelBvh>(
        meshes: &[Mesh],
        blases: &[B],
        max_width: usize,
        diag: &dyn Diagnostics,
    ) -> Result<PackedGeometry> {
        let merged = Self::merge(meshes, blases);
        diag.debug(&format!(
            "merged geometry: {} triangles, {} vertices, {} normals, {} uvs",
            merged.num_triangles(),
            merged.vertices.len(),
            merged.normals.len(),
            merged.uvs.len()
        ));
        let packed = Self::pack(merged, max_width)?;
        diag.debug(&format!(
            "texture widths: triangles {}, vertices {}, normals {}, uvs {}",
            packed.triangle_layout.width,
            packed.vertex_layout.width,
            packed.normal_layout.width,
            packed.uv_layout.width
        ));
        Ok(packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{BlasParams, MeshBvh};
    use crate::pack::unpack_index;
    use crate::util::Error;

    /// Strip of `n` triangles along x with their own vertices.
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

    fn blases(meshes: &[Mesh]) -> Vec<MeshBvh> {
        meshes
            .iter()
            .map(|m| MeshBvh::build(&m.triangle_bounds(), BlasParams::default()))
            .collect()
    }

    #[test]
    fn test_merge_rebases_indices() {
        let meshes = vec![strip("a", 3), strip("b", 5)];
        let merged = SceneFlattener::merge(&meshes, &blases(&meshes));

        assert_eq!(merged.num_triangles(), 8);
        assert_eq!(merged.vertices.len(), 24);
        assert_eq!(merged.normals.len(), 2);

        // triangles of mesh b reference its own vertices, after mesh a's 9
        for tri in &merged.vertex_indices[3..] {
            assert!(tri.iter().all(|&i| (9..24).contains(&i)));
        }
        for tri in &merged.normal_indices[3..] {
            assert_eq!(*tri, [1, 1, 1]);
        }
    }

    #[test]
    fn test_merge_follows_blas_order() {
        let meshes = vec![strip("a", 4)];
        let mut bvh = MeshBvh::build(&meshes[0].triangle_bounds(), BlasParams::default());
        bvh.tri_indices = vec![2, 0, 3, 1];
        let merged = SceneFlattener::merge(&meshes, &[bvh]);
        assert_eq!(merged.vertex_indices[0], meshes[0].vertex_indices[2]);
        assert_eq!(merged.vertex_indices[1], meshes[0].vertex_indices[0]);
    }

    #[test]
    fn test_pack_three_and_five_triangles() {
        let meshes = vec![strip("a", 3), strip("b", 5)];
        let merged = SceneFlattener::merge(&meshes, &blases(&meshes));
        let raw = merged.vertex_indices.clone();
        let packed = SceneFlattener::pack(merged, 4096).unwrap();

        assert_eq!(packed.triangle_layout.width, 3);
        assert_eq!(packed.vertex_indices.len(), 9);
        assert_eq!(packed.normal_indices.len(), 9);
        assert_eq!(packed.vertex_indices[8], [0, 0, 0]);

        // 24 vertices → width 5, padded to 25
        assert_eq!(packed.vertex_layout.width, 5);
        assert_eq!(packed.vertices.len(), 25);

        for (tri, packed_tri) in raw.iter().zip(&packed.vertex_indices) {
            for k in 0..3 {
                assert_eq!(unpack_index(packed_tri[k], packed.vertex_layout.width), tri[k]);
            }
        }
    }

    #[test]
    fn test_pack_width_overflow() {
        let meshes = vec![strip("a", 30)];
        let merged = SceneFlattener::merge(&meshes, &blases(&meshes));
        let err = SceneFlattener::pack(merged, 8).unwrap_err();
        // 90 vertices need a 10-wide texture
        assert!(matches!(err, Error::TextureWidthOverflow { buffer: "vertex", width: 10, .. }));
    }

    #[test]
    #[should_panic(expected = "one bottom-level tree per mesh")]
    fn test_mismatched_inputs_panic() {
        let meshes = vec![strip("a", 1), strip("b", 1)];
        let trees = blases(&meshes[..1]);
        SceneFlattener::merge(&meshes, &trees);
    }
}
