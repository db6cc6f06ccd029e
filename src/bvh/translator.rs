//! Merge the top-level tree and every bottom-level tree into one array.
//!
//! Layout: all bottom-level trees first, in mesh order, then the top-level
//! nodes. Traversal starts at `top_level_index`; an instance leaf jumps to
//! the root of its mesh's subtree, and triangle leaves index the global
//! triangle buffers the scene flattener produces (meshes appended in the
//! same order, each in its bottom-level leaf order).

use super::blas::{BlasNodeKind, BottomLevelBvh};
use super::tlas::{TlasNodeKind, TopLevelBvh};
use crate::scene::MeshInstance;
use crate::util::{Bounds, Error, Result};

/// What a flattened node points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatNodeKind {
    /// Child node indices into the flat array
    Interior { left: u32, right: u32 },
    /// Range of the global triangle-index buffers
    Triangles { first: u32, count: u32 },
    /// Instance leaf: continue at `blas_root` with the instance's transform,
    /// shading hits with `material`
    Instance {
        blas_root: u32,
        instance: u32,
        material: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatNode {
    pub bounds: Bounds,
    pub kind: FlatNodeKind,
}

/// Traversal-ready node array.
#[derive(Debug, Clone, Default)]
pub struct FlatBvh {
    pub nodes: Vec<FlatNode>,
    /// Root of the top-level part, `None` for a scene without instances
    pub top_level_index: Option<u32>,
    /// Flat index of each mesh's bottom-level root
    pub blas_roots: Vec<u32>,
}

/// The flattening contract the scene pipeline is written against.
pub trait BvhFlatten {
    fn flatten<B: BottomLevelBvh>(
        &self,
        tlas: Option<&TopLevelBvh>,
        blases: &[B],
        instances: &[MeshInstance],
    ) -> Result<FlatBvh>;
}

/// Default translator.
#[derive(Debug, Default, Clone, Copy)]
pub struct BvhTranslator;

impl BvhFlatten for BvhTranslator {
    #[tracing::instrument(skip_all, fields(meshes = blases.len(), instances = instances.len()))]
    fn flatten<B: BottomLevelBvh>(
        &self,
        tlas: Option<&TopLevelBvh>,
        blases: &[B],
        instances: &[MeshInstance],
    ) -> Result<FlatBvh> {
        let blas_total: usize = blases.iter().map(|b| b.nodes().len()).sum();
        let tlas_total = tlas.map_or(0, |t| t.len());
        let mut nodes = Vec::with_capacity(blas_total + tlas_total);
        let mut blas_roots = Vec::with_capacity(blases.len());

        let mut tri_offset = 0u32;
        for blas in blases {
            let base = nodes.len() as u32;
            blas_roots.push(base);
            for node in blas.nodes() {
                let kind = match node.kind {
                    BlasNodeKind::Leaf { first, count } => FlatNodeKind::Triangles {
                        first: first + tri_offset,
                        count,
                    },
                    BlasNodeKind::Interior { left, right } => FlatNodeKind::Interior {
                        left: left + base,
                        right: right + base,
                    },
                };
                nodes.push(FlatNode {
                    bounds: node.bounds,
                    kind,
                });
            }
            tri_offset += blas.num_indices() as u32;
        }

        let Some(tlas) = tlas else {
            return Ok(FlatBvh {
                nodes,
                top_level_index: None,
                blas_roots,
            });
        };

        let base = nodes.len() as u32;
        let instance_leaf = |item: u32| -> Result<FlatNodeKind> {
            let inst = instances.get(item as usize).ok_or_else(|| {
                Error::other(format!("top-level item {item} has no instance"))
            })?;
            let blas_root = *blas_roots.get(inst.mesh_id).ok_or(Error::UnknownMesh {
                instance: item as usize,
                mesh: inst.mesh_id,
            })?;
            Ok(FlatNodeKind::Instance {
                blas_root,
                instance: item,
                material: inst.material_id as u32,
            })
        };

        // multi-item leaves are expanded into extra nodes after the tree
        let mut extra: Vec<FlatNode> = Vec::new();
        let extra_base = base + tlas.len() as u32;

        for node in &tlas.nodes {
            let kind = match node.kind {
                TlasNodeKind::Internal { left, right } => FlatNodeKind::Interior {
                    left: left + base,
                    right: right + base,
                },
                TlasNodeKind::Leaf { item, count: 1, .. } => instance_leaf(item)?,
                TlasNodeKind::Leaf { .. } => {
                    let items = tlas.leaf_items(node);
                    let mid = items.len() / 2;
                    let left = expand_items(&items[..mid], tlas, &instance_leaf, &mut extra, extra_base)?;
                    let right = expand_items(&items[mid..], tlas, &instance_leaf, &mut extra, extra_base)?;
                    FlatNodeKind::Interior { left, right }
                }
            };
            nodes.push(FlatNode {
                bounds: node.bounds,
                kind,
            });
        }
        nodes.extend(extra);

        Ok(FlatBvh {
            nodes,
            top_level_index: Some(base),
            blas_roots,
        })
    }
}

/// Balanced subtree over the items of one top-level leaf. Returns its flat index.
fn expand_items(
    items: &[u32],
    tlas: &TopLevelBvh,
    instance_leaf: &dyn Fn(u32) -> Result<FlatNodeKind>,
    extra: &mut Vec<FlatNode>,
    extra_base: u32,
) -> Result<u32> {
    let idx = extra.len();
    let mut bounds = Bounds::EMPTY;
    for &i in items {
        bounds.grow(&tlas.item_bounds[i as usize]);
    }

    if let [item] = items {
        extra.push(FlatNode {
            bounds,
            kind: instance_leaf(*item)?,
        });
        return Ok(extra_base + idx as u32);
    }

    extra.push(FlatNode {
        bounds,
        kind: FlatNodeKind::Interior { left: 0, right: 0 },
    });
    let mid = items.len() / 2;
    let left = expand_items(&items[..mid], tlas, instance_leaf, extra, extra_base)?;
    let right = expand_items(&items[mid..], tlas, instance_leaf, extra, extra_base)?;
    extra[idx].kind = FlatNodeKind::Interior { left, right };
    Ok(extra_base + idx as u32)
}
