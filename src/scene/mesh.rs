//! Triangle meshes with separately indexed attributes.

use crate::util::{Bounds, Error, Result, Vec2, Vec3};

/// Mesh geometry. Each triangle has one index triple per attribute, so
/// positions, normals and uvs can be shared or split independently.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub vertex_indices: Vec<[u32; 3]>,
    pub normal_indices: Vec<[u32; 3]>,
    pub uv_indices: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Mesh where all three attributes share one index list.
    pub fn from_shared_indices(
        name: impl Into<String>,
        vertices: Vec<Vec3>,
        normals: Vec<Vec3>,
        uvs: Vec<Vec2>,
        indices: Vec<[u32; 3]>,
    ) -> Self {
        Self {
            name: name.into(),
            vertices,
            normals,
            uvs,
            vertex_indices: indices.clone(),
            normal_indices: indices.clone(),
            uv_indices: indices,
        }
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.vertex_indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_indices.is_empty()
    }

    /// Append a triangle; attributes must already be present.
    pub fn push_triangle(&mut self, vertex: [u32; 3], normal: [u32; 3], uv: [u32; 3]) {
        self.vertex_indices.push(vertex);
        self.normal_indices.push(normal);
        self.uv_indices.push(uv);
    }

    /// Check index list lengths and that every index is in range.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertex_indices.len();
        if self.normal_indices.len() != n || self.uv_indices.len() != n {
            return Err(Error::malformed(
                &self.name,
                format!(
                    "triangle counts differ: {} vertex, {} normal, {} uv",
                    n,
                    self.normal_indices.len(),
                    self.uv_indices.len()
                ),
            ));
        }

        let lists: [(&str, &[[u32; 3]], usize); 3] = [
            ("vertex", &self.vertex_indices, self.vertices.len()),
            ("normal", &self.normal_indices, self.normals.len()),
            ("uv", &self.uv_indices, self.uvs.len()),
        ];
        for (what, list, len) in lists {
            if let Some((tri, bad)) = list
                .iter()
                .enumerate()
                .find_map(|(t, tri)| tri.iter().find(|&&i| i as usize >= len).map(|&i| (t, i)))
            {
                return Err(Error::malformed(
                    &self.name,
                    format!("triangle {tri}: {what} index {bad} out of range ({len} {what}s)"),
                ));
            }
        }
        Ok(())
    }

    /// Object-space bounds of every triangle, in triangle order.
    pub fn triangle_bounds(&self) -> Vec<Bounds> {
        self.vertex_indices
            .iter()
            .map(|tri| Bounds::from_points(tri.iter().map(|&i| self.vertices[i as usize])))
            .collect()
    }

    /// Object-space bounds of all referenced vertices.
    pub fn local_bounds(&self) -> Bounds {
        let mut b = Bounds::EMPTY;
        for tri in &self.vertex_indices {
            for &i in tri {
                b.grow_point(self.vertices[i as usize]);
            }
        }
        b
    }

    /// Axis-aligned cube of edge `size` centered at the origin, one normal per face.
    pub fn cube(name: impl Into<String>, size: f32) -> Self {
        let h = size * 0.5;
        let mut mesh = Mesh::new(name);
        mesh.uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];

        // (normal, tangent u, tangent v) per face
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        for (face, (n, u, v)) in faces.into_iter().enumerate() {
            let base = mesh.vertices.len() as u32;
            let c = n * h;
            mesh.vertices.extend([
                c - u * h - v * h,
                c + u * h - v * h,
                c + u * h + v * h,
                c - u * h + v * h,
            ]);
            mesh.normals.push(n);
            let ni = face as u32;
            mesh.push_triangle([base, base + 1, base + 2], [ni; 3], [0, 1, 2]);
            mesh.push_triangle([base, base + 2, base + 3], [ni; 3], [0, 2, 3]);
        }
        mesh
    }

    /// Unit-normal quad in the XZ plane, edge `size`, facing +Y.
    pub fn quad(name: impl Into<String>, size: f32) -> Self {
        let h = size * 0.5;
        Mesh::from_shared_indices(
            name,
            vec![
                Vec3::new(-h, 0.0, h),
                Vec3::new(h, 0.0, h),
                Vec3::new(h, 0.0, -h),
                Vec3::new(-h, 0.0, -h),
            ],
            vec![Vec3::Y; 4],
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube() {
        let cube = Mesh::cube("cube", 2.0);
        assert_eq!(cube.num_triangles(), 12);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.normals.len(), 6);
        assert!(cube.validate().is_ok());
        let b = cube.local_bounds();
        assert_eq!(b.lower, Vec3::splat(-1.0));
        assert_eq!(b.upper, Vec3::splat(1.0));
    }

    #[test]
    fn test_quad_is_flat() {
        let quad = Mesh::quad("floor", 4.0);
        assert!(quad.validate().is_ok());
        let b = quad.local_bounds();
        assert_eq!(b.lower.y, 0.0);
        assert_eq!(b.upper.y, 0.0);
        assert_eq!(b.upper.x, 2.0);
        assert_eq!(quad.triangle_bounds().len(), 2);
    }

    #[test]
    fn test_validate_out_of_range() {
        let mut mesh = Mesh::quad("bad", 1.0);
        mesh.normal_indices[1] = [0, 0, 9];
        let err = mesh.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad"));
        assert!(msg.contains("normal index 9"));
    }

    #[test]
    fn test_validate_count_mismatch() {
        let mut mesh = Mesh::quad("short", 1.0);
        mesh.uv_indices.pop();
        assert!(matches!(mesh.validate(), Err(Error::MalformedMesh { .. })));
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new("empty");
        assert!(mesh.is_empty());
        assert!(mesh.validate().is_ok());
        assert!(mesh.local_bounds().is_empty());
    }
}
