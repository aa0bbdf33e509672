pub mod bounds;
pub mod search;
pub mod selection;

pub use bounds::Aabb;

use glam::{Mat4, Quat, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle to a node in a [`SceneGraph`]. Handles are recycled after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Identity of a piece of uploaded geometry; clones share it with their original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(u64);

impl GeometryId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInfo {
    pub name: Option<String>,
    pub base_color: [f32; 4],
}

impl Default for MaterialInfo {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Indexed triangle list in the owning node's local space.
#[derive(Debug, Clone)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub material: MaterialInfo,
}

impl Primitive {
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = self.positions.get(tri[0] as usize)?;
            let b = self.positions.get(tri[1] as usize)?;
            let c = self.positions.get(tri[2] as usize)?;
            Some([Vec3::from(*a), Vec3::from(*b), Vec3::from(*c)])
        })
    }
}

#[derive(Debug)]
pub struct Geometry {
    id: GeometryId,
    primitives: Vec<Primitive>,
    bounds: Aabb,
}

impl Geometry {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        let bounds = Aabb::from_points(
            primitives
                .iter()
                .flat_map(|primitive| primitive.positions.iter().copied().map(Vec3::from)),
        );
        Self {
            id: GeometryId::next(),
            primitives,
            bounds,
        }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives
            .iter()
            .map(|primitive| primitive.positions.len())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Part of the loaded model: pickable and searchable.
    Model,
    /// Selection overlay, drawn translucent on top of the original.
    Highlight,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub geometry: Option<Arc<Geometry>>,
    /// Free-form `extras` from the authoring pipeline.
    pub metadata: Option<serde_json::Value>,
    pub role: NodeRole,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            geometry: None,
            metadata: None,
            role: NodeRole::Model,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_geometry(mut self, geometry: Arc<Geometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    pub fn is_part(&self) -> bool {
        self.role == NodeRole::Model && self.geometry.is_some()
    }
}

/// A node ready to draw, with its world matrix resolved.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub node: NodeId,
    pub world: Mat4,
    pub geometry: Arc<Geometry>,
    pub role: NodeRole,
}

/// Arena-backed scene graph. Traversal is depth-first pre-order over the
/// roots in insertion order, children in insertion order.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Option<SceneNode>>,
    free: Vec<usize>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Inserts `node` under `parent`, or as a new root when `parent` is `None`
    /// or no longer exists.
    pub fn add_node(&mut self, parent: Option<NodeId>, mut node: SceneNode) -> NodeId {
        let parent = parent.filter(|id| self.contains(*id));
        node.parent = parent;
        node.children.clear();

        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };

        match parent.and_then(|parent| self.node_mut(parent)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Removes `id` and its whole subtree. Returns the removed node itself.
    pub fn remove_node(&mut self, id: NodeId) -> Option<SceneNode> {
        let parent = self.node(id)?.parent;
        match parent.and_then(|parent| self.node_mut(parent)) {
            Some(parent_node) => parent_node.children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }

        let mut stack = vec![id];
        let mut removed = None;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children.iter().copied());
                self.free.push(current.0);
                if current == id {
                    removed = Some(node);
                }
            }
        }
        removed
    }

    pub fn traverse(&self) -> Traverse<'_> {
        Traverse {
            scene: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Traversal of the subtree rooted at `id`, `id` first.
    pub fn traverse_from(&self, id: NodeId) -> Traverse<'_> {
        let stack = if self.contains(id) { vec![id] } else { Vec::new() };
        Traverse { scene: self, stack }
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.node(id);
        while let Some(node) = current {
            matrix = node.transform.matrix() * matrix;
            current = node.parent.and_then(|parent| self.node(parent));
        }
        matrix
    }

    /// World-space bounds of the geometry in the subtree rooted at `id`.
    pub fn world_bounds(&self, id: NodeId) -> Aabb {
        self.traverse_from(id)
            .filter_map(|node_id| {
                let geometry = self.node(node_id)?.geometry.as_ref()?;
                Some(geometry.bounds().transformed(&self.world_matrix(node_id)))
            })
            .fold(Aabb::EMPTY, |acc, bounds| acc.union(&bounds))
    }

    /// World-space bounds of every model part; overlays are ignored.
    pub fn model_bounds(&self) -> Aabb {
        self.renderables()
            .into_iter()
            .filter(|item| item.role == NodeRole::Model)
            .fold(Aabb::EMPTY, |acc, item| {
                acc.union(&item.geometry.bounds().transformed(&item.world))
            })
    }

    #[cfg(test)]
    pub fn count_role(&self, role: NodeRole) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter(|node| node.role == role)
            .count()
    }

    /// Every node with geometry, in traversal order, with world matrices
    /// accumulated on the way down.
    pub fn renderables(&self) -> Vec<Renderable> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|root| (*root, Mat4::IDENTITY))
            .collect();
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let world = parent_world * node.transform.matrix();
            if let Some(geometry) = &node.geometry {
                out.push(Renderable {
                    node: id,
                    world,
                    geometry: Arc::clone(geometry),
                    role: node.role,
                });
            }
            stack.extend(node.children.iter().rev().map(|child| (*child, world)));
        }
        out
    }
}

pub struct Traverse<'a> {
    scene: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for Traverse<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            if let Some(node) = self.scene.node(id) {
                self.stack.extend(node.children.iter().rev().copied());
                return Some(id);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn unit_quad(material: Option<&str>) -> Arc<Geometry> {
        Arc::new(Geometry::new(vec![Primitive {
            positions: vec![
                [-0.5, -0.5, 0.0],
                [0.5, -0.5, 0.0],
                [0.5, 0.5, 0.0],
                [-0.5, 0.5, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
            material: MaterialInfo {
                name: material.map(str::to_string),
                base_color: [0.8, 0.8, 0.8, 1.0],
            },
        }]))
    }

    fn translated(x: f32, y: f32, z: f32) -> Transform {
        Transform {
            translation: Vec3::new(x, y, z),
            ..Transform::IDENTITY
        }
    }

    #[test]
    fn traversal_is_depth_first_pre_order() {
        let mut scene = SceneGraph::new();
        let house = scene.add_node(None, SceneNode::new("House"));
        let door = scene.add_node(Some(house), SceneNode::new("Door"));
        let _handle = scene.add_node(Some(door), SceneNode::new("Handle"));
        let _roof = scene.add_node(Some(house), SceneNode::new("Roof"));
        let _shed = scene.add_node(None, SceneNode::new("Shed"));

        let names: Vec<&str> = scene
            .traverse()
            .map(|id| scene.node(id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, ["House", "Door", "Handle", "Roof", "Shed"]);
    }

    #[test]
    fn world_matrix_composes_parent_transforms() {
        let mut scene = SceneGraph::new();
        let parent = scene.add_node(
            None,
            SceneNode::new("Parent").with_transform(Transform {
                scale: Vec3::splat(2.0),
                ..translated(1.0, 0.0, 0.0)
            }),
        );
        let child = scene.add_node(
            Some(parent),
            SceneNode::new("Child").with_transform(translated(0.0, 3.0, 0.0)),
        );

        let origin = scene.world_matrix(child).transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 6.0, 0.0)).length() < 1e-5);

        let from_renderables = scene
            .renderables()
            .into_iter()
            .find(|item| item.node == child);
        assert!(from_renderables.is_none(), "child has no geometry");
    }

    #[test]
    fn remove_node_drops_subtree_and_recycles_slots() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(None, SceneNode::new("Root"));
        let child = scene.add_node(Some(root), SceneNode::new("Child"));
        let other = scene.add_node(None, SceneNode::new("Other"));
        assert_eq!(scene.len(), 3);

        let removed = scene.remove_node(root).unwrap();
        assert_eq!(removed.name, "Root");
        assert!(!scene.contains(child));
        assert_eq!(scene.roots, [other]);
        assert_eq!(scene.len(), 1);

        let again = scene.add_node(None, SceneNode::new("Again"));
        assert!(again.0 < 3);
        assert_eq!(scene.len(), 2);
        assert!(scene.remove_node(root).is_none());
    }

    #[test]
    fn world_bounds_cover_subtree_geometry() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(
            None,
            SceneNode::new("Root").with_transform(translated(10.0, 0.0, 0.0)),
        );
        scene.add_node(
            Some(root),
            SceneNode::new("Left")
                .with_geometry(unit_quad(None))
                .with_transform(translated(-1.0, 0.0, 0.0)),
        );
        scene.add_node(
            Some(root),
            SceneNode::new("Right")
                .with_geometry(unit_quad(None))
                .with_transform(translated(1.0, 0.0, 0.0)),
        );

        let bounds = scene.world_bounds(root);
        assert!((bounds.min - Vec3::new(8.5, -0.5, 0.0)).length() < 1e-5);
        assert!((bounds.max - Vec3::new(11.5, 0.5, 0.0)).length() < 1e-5);
        let model = scene.model_bounds();
        assert!((model.min - bounds.min).length() < 1e-5);
        assert!((model.max - bounds.max).length() < 1e-5);
    }

    #[test]
    fn model_bounds_ignore_highlight_overlays() {
        let mut scene = SceneGraph::new();
        scene.add_node(None, SceneNode::new("Part").with_geometry(unit_quad(None)));
        scene.add_node(
            None,
            SceneNode::new("Overlay")
                .with_geometry(unit_quad(None))
                .with_role(NodeRole::Highlight)
                .with_transform(translated(100.0, 0.0, 0.0)),
        );
        assert!(scene.model_bounds().max.x < 1.0);
        assert_eq!(scene.count_role(NodeRole::Highlight), 1);
        assert_eq!(scene.renderables().len(), 2);
    }
}
