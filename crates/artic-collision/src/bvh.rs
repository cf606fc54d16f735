//! Bounding volume hierarchy over the triangles of a mesh.
//!
//! Nodes are stored in a flat array; each leaf owns a contiguous range of the
//! reordered triangle index list. Built top-down with a median split along
//! the longest axis of the node box.

use std::ops::ControlFlow;

use artic_math::{Pose, Vec3};

use crate::aabb::Aabb;
use crate::mesh::TriMesh;

/// Maximum number of triangles in a leaf.
pub const MAX_LEAF_TRIANGLES: usize = 4;

#[derive(Debug, Clone)]
enum BvhNode {
    Internal { aabb: Aabb, left: usize, right: usize },
    Leaf { aabb: Aabb, first: usize, count: usize },
}

impl BvhNode {
    fn aabb(&self) -> &Aabb {
        match self {
            BvhNode::Internal { aabb, .. } | BvhNode::Leaf { aabb, .. } => aabb,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    triangles: Vec<u32>,
}

struct Item {
    triangle: u32,
    aabb: Aabb,
    centroid: Vec3,
}

impl Bvh {
    pub fn build(mesh: &TriMesh) -> Self {
        let mut items: Vec<Item> = (0..mesh.triangle_count())
            .map(|t| {
                let corners = mesh.triangle(t);
                Item {
                    triangle: t as u32,
                    aabb: Aabb::from_points(&corners),
                    centroid: (corners[0] + corners[1] + corners[2]) / 3.0,
                }
            })
            .collect();
        let mut bvh = Bvh::default();
        if items.is_empty() {
            return bvh;
        }
        bvh.nodes.reserve(2 * items.len());
        let len = items.len();
        bvh.build_range(&mut items, 0, len);
        bvh.triangles = items.iter().map(|i| i.triangle).collect();
        bvh
    }

    fn build_range(&mut self, items: &mut [Item], start: usize, end: usize) -> usize {
        let aabb = items[start..end]
            .iter()
            .fold(Aabb::empty(), |acc, i| acc.merge(&i.aabb));
        let node = self.nodes.len();
        if end - start <= MAX_LEAF_TRIANGLES {
            self.nodes.push(BvhNode::Leaf {
                aabb,
                first: start,
                count: end - start,
            });
            return node;
        }

        let axis = aabb.longest_axis();
        items[start..end].sort_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
        let mid = start + (end - start) / 2;

        self.nodes.push(BvhNode::Internal {
            aabb,
            left: 0,
            right: 0,
        });
        let l = self.build_range(items, start, mid);
        let r = self.build_range(items, mid, end);
        if let BvhNode::Internal { left, right, .. } = &mut self.nodes[node] {
            *left = l;
            *right = r;
        }
        node
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_aabb(&self) -> Option<&Aabb> {
        self.nodes.first().map(BvhNode::aabb)
    }

    /// Node boxes after placing the mesh with `pose`, indexed like the nodes.
    pub fn world_boxes(&self, pose: &Pose) -> Vec<Aabb> {
        self.nodes.iter().map(|n| n.aabb().transformed(pose)).collect()
    }

    /// Lock-step traversal of two hierarchies.
    ///
    /// Calls `visit` for every triangle pair whose leaves survive box pruning,
    /// in a fixed order that depends only on the two trees and their boxes.
    /// Returns `true` if `visit` broke out early.
    pub fn visit_pairs<F>(
        &self,
        boxes: &[Aabb],
        other: &Bvh,
        other_boxes: &[Aabb],
        mut visit: F,
    ) -> bool
    where
        F: FnMut(usize, usize) -> ControlFlow<()>,
    {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let mut stack = vec![(0usize, 0usize)];
        while let Some((ia, ib)) = stack.pop() {
            if !boxes[ia].overlaps(&other_boxes[ib]) {
                continue;
            }
            match (&self.nodes[ia], &other.nodes[ib]) {
                (
                    BvhNode::Leaf { first: fa, count: ca, .. },
                    BvhNode::Leaf { first: fb, count: cb, .. },
                ) => {
                    for &ta in &self.triangles[*fa..fa + ca] {
                        for &tb in &other.triangles[*fb..fb + cb] {
                            if visit(ta as usize, tb as usize).is_break() {
                                return true;
                            }
                        }
                    }
                }
                (BvhNode::Internal { left, right, .. }, BvhNode::Leaf { .. }) => {
                    stack.push((*right, ib));
                    stack.push((*left, ib));
                }
                (BvhNode::Leaf { .. }, BvhNode::Internal { left, right, .. }) => {
                    stack.push((ia, *right));
                    stack.push((ia, *left));
                }
                (
                    BvhNode::Internal { left: la, right: ra, .. },
                    BvhNode::Internal { left: lb, right: rb, .. },
                ) => {
                    // Descend into the larger volume.
                    if boxes[ia].volume() >= other_boxes[ib].volume() {
                        stack.push((*ra, ib));
                        stack.push((*la, ib));
                    } else {
                        stack.push((ia, *rb));
                        stack.push((ia, *lb));
                    }
                }
            }
        }
        false
    }
}
