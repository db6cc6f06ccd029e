//! SAH top-level BVH over instance bounds.
//!
//! Items are partitioned top-down: the range is sorted by centroid along the
//! longest axis of its bounds, a prefix/suffix sweep evaluates every split
//! position, and the cheapest one wins. Nodes are numbered in preorder with
//! the root at index 0.

use crate::diagnostics::Diagnostics;
use crate::util::{Bounds, Error, Result, Vec3};

/// What a top-level node points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlasNodeKind {
    /// Items `item_order[first..first + count]`; `item` is the first of them.
    Leaf { item: u32, first: u32, count: u32 },
    /// Indices of the two children in the node array.
    Internal { left: u32, right: u32 },
}

/// One node of the top-level tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TlasNode {
    pub bounds: Bounds,
    pub kind: TlasNodeKind,
}

impl TlasNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, TlasNodeKind::Leaf { .. })
    }

    /// Left child, or the item index for a leaf.
    #[inline]
    pub fn left_index(&self) -> u32 {
        match self.kind {
            TlasNodeKind::Leaf { item, .. } => item,
            TlasNodeKind::Internal { left, .. } => left,
        }
    }

    /// Right child, or the item index for a leaf.
    #[inline]
    pub fn right_index(&self) -> u32 {
        match self.kind {
            TlasNodeKind::Leaf { item, .. } => item,
            TlasNodeKind::Internal { right, .. } => right,
        }
    }
}

/// Built top-level tree.
#[derive(Debug, Clone)]
pub struct TopLevelBvh {
    /// Flat node array (index 0 = root)
    pub nodes: Vec<TlasNode>,
    /// Item indices in leaf order; leaves reference ranges of this
    pub item_order: Vec<u32>,
    /// Input bounds, indexed by item
    pub item_bounds: Vec<Bounds>,
}

impl TopLevelBvh {
    #[inline]
    pub fn root(&self) -> &TlasNode {
        &self.nodes[0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Items held by a leaf node (empty for internal nodes).
    pub fn leaf_items(&self, node: &TlasNode) -> &[u32] {
        match node.kind {
            TlasNodeKind::Leaf { first, count, .. } => {
                &self.item_order[first as usize..(first + count) as usize]
            }
            TlasNodeKind::Internal { .. } => &[],
        }
    }

    /// Longest root-to-leaf path, counted in nodes.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0u32, 1usize)];
        while let Some((idx, d)) = stack.pop() {
            max_depth = max_depth.max(d);
            if let TlasNodeKind::Internal { left, right } = self.nodes[idx as usize].kind {
                stack.push((left, d + 1));
                stack.push((right, d + 1));
            }
        }
        max_depth
    }
}

/// Chosen SAH split of a sorted range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SahSplit {
    /// Position `i` within the range: items `[0, i]` go left
    pub position: usize,
    /// Normalized cost at that position
    pub cost: f32,
}

/// SAH cost of splitting after position `i` of an `n`-item range.
#[inline]
pub fn sah_cost(left_area: f32, right_area: f32, inv_total_area: f32, i: usize, n: usize) -> f32 {
    let p_below = left_area * inv_total_area;
    let p_above = right_area * inv_total_area;
    p_below * i as f32 + p_above * (n - i) as f32
}

/// Prefix and suffix union areas of `sorted`.
///
/// `left[i]` covers `[0, i]`, `right[i]` covers `(i, n)`; the last suffix is
/// the empty box, area zero.
pub fn sweep_areas(sorted: &[Bounds], left: &mut Vec<f32>, right: &mut Vec<f32>) {
    let n = sorted.len();
    left.clear();
    left.resize(n, 0.0);
    right.clear();
    right.resize(n, 0.0);

    let mut l = Bounds::EMPTY;
    let mut r = Bounds::EMPTY;
    for i in 0..n {
        l.grow(&sorted[i]);
        left[i] = l.area();
    }
    for i in (0..n).rev() {
        right[i] = r.area();
        r.grow(&sorted[i]);
    }
}

/// Minimum-cost split position over precomputed sweep areas.
///
/// Ties keep the lowest position.
pub fn best_split(left: &[f32], right: &[f32], total_area: f32) -> SahSplit {
    let n = left.len();
    let inv_total_area = 1.0 / total_area;
    let mut best = SahSplit {
        position: 0,
        cost: f32::INFINITY,
    };
    for i in 0..n {
        let cost = sah_cost(left[i], right[i], inv_total_area, i, n);
        if cost < best.cost {
            best = SahSplit { position: i, cost };
        }
    }
    best
}

/// Top-level builder. Scratch buffers are reused between builds.
pub struct TopLevelBvhBuilder {
    max_items_per_leaf: usize,
    nodes: Vec<TlasNode>,
    indices: Vec<u32>,
    centers: Vec<Vec3>,
    sorted: Vec<Bounds>,
    left_areas: Vec<f32>,
    right_areas: Vec<f32>,
    median_fallbacks: usize,
}

impl Default for TopLevelBvhBuilder {
    fn default() -> Self {
        Self::new(1)
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

struct Task {
    start: usize,
    end: usize,
    parent: Option<(usize, Side)>,
}

impl TopLevelBvhBuilder {
    pub fn new(max_items_per_leaf: usize) -> Self {
        Self {
            max_items_per_leaf,
            nodes: Vec::new(),
            indices: Vec::new(),
            centers: Vec::new(),
            sorted: Vec::new(),
            left_areas: Vec::new(),
            right_areas: Vec::new(),
            median_fallbacks: 0,
        }
    }

    #[inline]
    pub fn max_items_per_leaf(&self) -> usize {
        self.max_items_per_leaf
    }

    /// Build over `items`. Fails on an empty slice or zero leaf capacity.
    #[tracing::instrument(skip_all, fields(item_count = items.len()))]
    pub fn build(&mut self, items: &[Bounds], diag: &dyn Diagnostics) -> Result<TopLevelBvh> {
        let n = items.len();
        if n == 0 {
            return Err(Error::EmptyBuild);
        }
        if self.max_items_per_leaf == 0 {
            return Err(Error::config("max_items_per_leaf must be at least 1"));
        }
        if n > u32::MAX as usize / 2 {
            return Err(Error::config(format!("too many top-level items: {n}")));
        }

        self.nodes.clear();
        self.nodes.reserve(2 * n);
        self.indices.clear();
        self.indices.extend(0..n as u32);
        self.centers.clear();
        self.centers.extend(items.iter().map(Bounds::center));
        self.median_fallbacks = 0;

        let mut stack = vec![Task {
            start: 0,
            end: n,
            parent: None,
        }];

        while let Some(task) = stack.pop() {
            let node_idx = self.nodes.len();
            debug_assert!(node_idx < 2 * n);

            if let Some((parent, side)) = task.parent {
                if let TlasNodeKind::Internal { left, right } = &mut self.nodes[parent].kind {
                    match side {
                        Side::Left => *left = node_idx as u32,
                        Side::Right => *right = node_idx as u32,
                    }
                }
            }

            let (start, end) = (task.start, task.end);
            assert!(start < end, "empty range [{start}, {end})");
            let bounds = self.range_bounds(items, start, end);

            if end - start <= self.max_items_per_leaf {
                self.nodes.push(TlasNode {
                    bounds,
                    kind: TlasNodeKind::Leaf {
                        item: self.indices[start],
                        first: start as u32,
                        count: (end - start) as u32,
                    },
                });
                continue;
            }

            let mut split = self.partition_sah(items, start, end, &bounds);
            if split == start || split == end {
                split = (start + end) / 2;
                self.median_fallbacks += 1;
            }

            self.nodes.push(TlasNode {
                bounds,
                kind: TlasNodeKind::Internal {
                    left: u32::MAX,
                    right: u32::MAX,
                },
            });

            // right first so the left subtree is numbered first
            stack.push(Task {
                start: split,
                end,
                parent: Some((node_idx, Side::Right)),
            });
            stack.push(Task {
                start,
                end: split,
                parent: Some((node_idx, Side::Left)),
            });
        }

        diag.debug(&format!(
            "top-level BVH: {} items, {} nodes, {} median fallbacks",
            n,
            self.nodes.len(),
            self.median_fallbacks
        ));

        Ok(TopLevelBvh {
            nodes: std::mem::take(&mut self.nodes),
            item_order: self.indices.clone(),
            item_bounds: items.to_vec(),
        })
    }

    /// Median fallbacks taken by the last build.
    #[inline]
    pub fn median_fallbacks(&self) -> usize {
        self.median_fallbacks
    }

    fn range_bounds(&self, items: &[Bounds], start: usize, end: usize) -> Bounds {
        let mut b = Bounds::EMPTY;
        for &idx in &self.indices[start..end] {
            b.grow(&items[idx as usize]);
        }
        b
    }

    /// Sort `[start, end)` along the longest axis and return the SAH split.
    fn partition_sah(&mut self, items: &[Bounds], start: usize, end: usize, range_bounds: &Bounds) -> usize {
        debug_assert!(end - start >= 2);

        let axis = range_bounds.longest_axis();
        let centers = &self.centers;
        self.indices[start..end].sort_by(|&a, &b| {
            centers[a as usize][axis].total_cmp(&centers[b as usize][axis])
        });

        let total_area = range_bounds.area();
        if !(total_area > 0.0) {
            // zero area only when every item is a point or a segment on one
            // line; the caller falls back to the median
            return start;
        }

        self.sorted.clear();
        self.sorted
            .extend(self.indices[start..end].iter().map(|&i| items[i as usize]));
        sweep_areas(&self.sorted, &mut self.left_areas, &mut self.right_areas);

        let best = best_split(&self.left_areas, &self.right_areas, total_area);
        start + best.position + 1
    }
}
