//! Per-mesh bottom-level BVH.
//!
//! Each mesh gets its own tree over its triangle bounds. Ranges are split by
//! binning centroids along every axis and scoring the bin boundaries with a
//! normalized SAH; a range stays a leaf when no boundary beats intersecting
//! all of its triangles. The result is a node array plus the triangle
//! permutation its leaves index into.

use crate::util::{Bounds, Vec3};

/// Relative cost of visiting one interior node.
const NODE_VISIT_COST: f32 = 1.0;
/// Relative cost of one triangle test.
const TRIANGLE_COST: f32 = 1.0;

/// What the scene pipeline needs from a per-object structure.
pub trait BottomLevelBvh {
    /// Root bounds in object space.
    fn bounds(&self) -> Bounds;
    /// Triangle indices in leaf order.
    fn indices(&self) -> &[u32];
    /// Node array, root at 0.
    fn nodes(&self) -> &[BlasNode];

    fn num_indices(&self) -> usize {
        self.indices().len()
    }
}

/// Node contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlasNodeKind {
    /// Triangles `indices[first..first + count]`
    Leaf { first: u32, count: u32 },
    /// Children; `right` is always `left + 1`
    Interior { left: u32, right: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlasNode {
    pub bounds: Bounds,
    pub kind: BlasNodeKind,
}

impl BlasNode {
    fn leaf(bounds: Bounds, first: usize, count: usize) -> Self {
        Self {
            bounds,
            kind: BlasNodeKind::Leaf {
                first: first as u32,
                count: count as u32,
            },
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, BlasNodeKind::Leaf { .. })
    }
}

/// Bottom-level build parameters.
#[derive(Debug, Clone, Copy)]
pub struct BlasParams {
    /// Ranges of at most this many triangles always become leaves. Larger
    /// ranges are split unless no binned split is cheaper than a leaf.
    pub max_leaf_size: usize,
    /// Centroid bins per axis
    pub bins: usize,
}

impl Default for BlasParams {
    fn default() -> Self {
        Self {
            max_leaf_size: 4,
            bins: 12,
        }
    }
}

/// Built bottom-level tree for one mesh.
#[derive(Debug, Clone)]
pub struct MeshBvh {
    /// Node array, root at 0
    pub nodes: Vec<BlasNode>,
    /// Triangle permutation in leaf order
    pub tri_indices: Vec<u32>,
}

impl BottomLevelBvh for MeshBvh {
    fn bounds(&self) -> Bounds {
        self.nodes[0].bounds
    }

    fn indices(&self) -> &[u32] {
        &self.tri_indices
    }

    fn nodes(&self) -> &[BlasNode] {
        &self.nodes
    }
}

impl MeshBvh {
    /// Build from per-triangle bounds.
    ///
    /// An empty input yields a single empty leaf with empty bounds.
    #[tracing::instrument(skip_all, fields(tri_count = triangles.len()))]
    pub fn build(triangles: &[Bounds], params: BlasParams) -> MeshBvh {
        if triangles.is_empty() {
            return MeshBvh {
                nodes: vec![BlasNode::leaf(Bounds::EMPTY, 0, 0)],
                tri_indices: Vec::new(),
            };
        }
        BlasBuilder::new(triangles, params).run()
    }
}

/// Best boundary found for one range.
#[derive(Debug, Clone, Copy)]
struct BinnedSplit {
    binning: AxisBinning,
    /// Items in bins `< boundary` go left
    boundary: usize,
    /// Normalized SAH cost
    cost: f32,
}

/// Centroid binning along one axis.
#[derive(Debug, Clone, Copy)]
struct AxisBinning {
    axis: usize,
    origin: f32,
    scale: f32,
    bins: usize,
}

impl AxisBinning {
    /// `None` when all centroids coincide on this axis.
    fn new(axis: usize, centroid_bounds: &Bounds, bins: usize) -> Option<Self> {
        let extent = centroid_bounds.upper[axis] - centroid_bounds.lower[axis];
        if !(extent > 1e-8) {
            return None;
        }
        Some(Self {
            axis,
            origin: centroid_bounds.lower[axis],
            scale: bins as f32 / extent,
            bins,
        })
    }

    #[inline]
    fn bin_of(&self, centroid: Vec3) -> usize {
        let t = (centroid[self.axis] - self.origin) * self.scale;
        (t.max(0.0) as usize).min(self.bins - 1)
    }
}

struct BlasBuilder<'a> {
    triangles: &'a [Bounds],
    centroids: Vec<Vec3>,
    order: Vec<u32>,
    nodes: Vec<BlasNode>,
    params: BlasParams,
    // per-split scratch
    bin_bounds: Vec<Bounds>,
    bin_counts: Vec<usize>,
    prefix_area: Vec<f32>,
    moved: Vec<u32>,
}

impl<'a> BlasBuilder<'a> {
    fn new(triangles: &'a [Bounds], params: BlasParams) -> Self {
        let bins = params.bins.max(2);
        let n = triangles.len();
        Self {
            triangles,
            centroids: triangles.iter().map(Bounds::center).collect(),
            order: (0..n as u32).collect(),
            nodes: Vec::with_capacity(2 * n - 1),
            params: BlasParams { bins, ..params },
            bin_bounds: vec![Bounds::EMPTY; bins],
            bin_counts: vec![0; bins],
            prefix_area: vec![0.0; bins],
            moved: Vec::new(),
        }
    }

    fn run(mut self) -> MeshBvh {
        let n = self.triangles.len();
        self.nodes.push(BlasNode::leaf(Bounds::EMPTY, 0, 0));

        // (node slot, start, end)
        let mut pending = vec![(0usize, 0usize, n)];
        while let Some((slot, start, end)) = pending.pop() {
            let bounds = self.range_bounds(start, end);
            let count = end - start;

            let split = if count > self.params.max_leaf_size {
                self.best_split(start, end, &bounds)
                    .filter(|s| s.cost < count as f32 * TRIANGLE_COST)
            } else {
                None
            };

            let Some(split) = split else {
                self.nodes[slot] = BlasNode::leaf(bounds, start, count);
                continue;
            };

            let mid = self.split_range(start, end, split);
            let left = self.nodes.len();
            self.nodes.push(BlasNode::leaf(Bounds::EMPTY, 0, 0));
            self.nodes.push(BlasNode::leaf(Bounds::EMPTY, 0, 0));
            self.nodes[slot] = BlasNode {
                bounds,
                kind: BlasNodeKind::Interior {
                    left: left as u32,
                    right: left as u32 + 1,
                },
            };
            pending.push((left + 1, mid, end));
            pending.push((left, start, mid));
        }

        MeshBvh {
            nodes: self.nodes,
            tri_indices: self.order,
        }
    }

    fn range_bounds(&self, start: usize, end: usize) -> Bounds {
        self.order[start..end]
            .iter()
            .fold(Bounds::EMPTY, |b, &t| b.union(&self.triangles[t as usize]))
    }

    fn best_split(&mut self, start: usize, end: usize, bounds: &Bounds) -> Option<BinnedSplit> {
        let centroid_bounds = Bounds::from_points(
            self.order[start..end]
                .iter()
                .map(|&t| self.centroids[t as usize]),
        );
        let area = bounds.area();
        let inv_area = if area > 0.0 { 1.0 / area } else { 0.0 };
        let count = end - start;

        let mut best: Option<BinnedSplit> = None;
        for axis in 0..3 {
            let Some(binning) = AxisBinning::new(axis, &centroid_bounds, self.params.bins) else {
                continue;
            };

            self.bin_bounds.fill(Bounds::EMPTY);
            self.bin_counts.fill(0);
            for &t in &self.order[start..end] {
                let b = binning.bin_of(self.centroids[t as usize]);
                self.bin_bounds[b].grow(&self.triangles[t as usize]);
                self.bin_counts[b] += 1;
            }

            // prefix_area[k] covers bins [0, k)
            let mut acc = Bounds::EMPTY;
            for k in 1..binning.bins {
                acc.grow(&self.bin_bounds[k - 1]);
                self.prefix_area[k] = acc.area();
            }

            let mut suffix = Bounds::EMPTY;
            let mut right_count = 0;
            for k in (1..binning.bins).rev() {
                suffix.grow(&self.bin_bounds[k]);
                right_count += self.bin_counts[k];
                let left_count = count - right_count;
                if left_count == 0 || right_count == 0 {
                    continue;
                }
                let cost = NODE_VISIT_COST
                    + TRIANGLE_COST
                        * inv_area
                        * (left_count as f32 * self.prefix_area[k]
                            + right_count as f32 * suffix.area());
                if best.map_or(true, |b| cost < b.cost) {
                    best = Some(BinnedSplit {
                        binning,
                        boundary: k,
                        cost,
                    });
                }
            }
        }
        best
    }

    /// Stable partition of `order[start..end]` around the split boundary.
    fn split_range(&mut self, start: usize, end: usize, split: BinnedSplit) -> usize {
        // same binning the split was scored with, so both sides are non-empty
        let binning = split.binning;
        self.moved.clear();
        let mut write = start;
        for read in start..end {
            let t = self.order[read];
            if binning.bin_of(self.centroids[t as usize]) < split.boundary {
                self.order[write] = t;
                write += 1;
            } else {
                self.moved.push(t);
            }
        }
        self.order[write..end].copy_from_slice(&self.moved);
        debug_assert!(write > start && write < end);
        write
    }
}
