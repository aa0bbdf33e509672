//! Single-part selection: a translucent highlight clone in the scene plus the
//! attribute panel contents shown for the selected part.

use crate::scene::{NodeId, NodeRole, SceneGraph, SceneNode, Transform};
use glam::Vec3;
use serde_json::Value;
use std::sync::Arc;

const NO_VALUE: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
    pub key: String,
    pub value: String,
}

impl AttributeRow {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributePanel {
    pub visible: bool,
    pub title: String,
    pub rows: Vec<AttributeRow>,
}

#[derive(Debug, Default)]
pub struct Selection {
    selected: Option<NodeId>,
    highlight: Option<NodeId>,
    anchor: Option<Vec3>,
    panel: AttributePanel,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// World point the zoom action centres on.
    pub fn anchor(&self) -> Option<Vec3> {
        self.anchor
    }

    pub fn panel(&self) -> &AttributePanel {
        &self.panel
    }

    /// Selects `node`, replacing any previous selection. Returns `false` (and
    /// leaves the selection cleared) when `node` is not in the scene.
    pub fn show(&mut self, scene: &mut SceneGraph, node: NodeId, point: Option<Vec3>) -> bool {
        self.remove_highlight(scene);

        let Some(original) = scene.node(node) else {
            self.clear(scene);
            return false;
        };

        let title = panel_title(original);
        let rows = attribute_rows(original);
        let clone = original.geometry.as_ref().map(|geometry| {
            SceneNode::new(original.name.clone())
                .with_geometry(Arc::clone(geometry))
                .with_role(NodeRole::Highlight)
        });

        if let Some(clone) = clone {
            let transform = Transform::from_matrix(&scene.world_matrix(node));
            if transform.is_finite() {
                self.highlight = Some(scene.add_node(None, clone.with_transform(transform)));
            } else {
                log::warn!(
                    "Could not create highlight clone for '{}': degenerate world transform",
                    title
                );
            }
        }

        self.selected = Some(node);
        self.anchor = point;
        self.panel = AttributePanel {
            visible: true,
            title,
            rows,
        };
        true
    }

    pub fn clear(&mut self, scene: &mut SceneGraph) {
        self.remove_highlight(scene);
        self.selected = None;
        self.anchor = None;
        self.panel.visible = false;
        self.panel.title.clear();
        self.panel.rows.clear();
    }

    /// Drops selection state without touching the scene, for when the scene
    /// it referred to has been replaced wholesale.
    pub fn forget(&mut self) {
        *self = Self::default();
    }

    fn remove_highlight(&mut self, scene: &mut SceneGraph) {
        if let Some(highlight) = self.highlight.take() {
            scene.remove_node(highlight);
        }
    }
}

pub fn panel_title(node: &SceneNode) -> String {
    if !node.name.is_empty() {
        return node.name.clone();
    }
    match node.metadata.as_ref().and_then(|metadata| metadata.get("id")) {
        Some(id) if !id.is_null() => display_value(id),
        _ => "Object".to_string(),
    }
}

/// Metadata rows when the part carries a non-empty metadata object, otherwise
/// basic facts about its mesh.
pub fn attribute_rows(node: &SceneNode) -> Vec<AttributeRow> {
    if let Some(Value::Object(map)) = &node.metadata {
        if !map.is_empty() {
            return map
                .iter()
                .map(|(key, value)| AttributeRow::new(key.clone(), display_value(value)))
                .collect();
        }
    }

    let (material, vertices) = match &node.geometry {
        Some(geometry) => {
            let material = geometry
                .primitives()
                .first()
                .and_then(|primitive| primitive.material.name.clone())
                .unwrap_or_else(|| "Default".to_string());
            (material, geometry.vertex_count().to_string())
        }
        None => (NO_VALUE.to_string(), NO_VALUE.to_string()),
    };
    vec![
        AttributeRow::new("Mesh name", node.name.clone()),
        AttributeRow::new("Material", material),
        AttributeRow::new("Vertices", vertices),
    ]
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::unit_quad;
    use crate::scene::{NodeRole, SceneGraph, SceneNode};
    use glam::{Quat, Vec3};
    use serde_json::json;

    fn two_parts() -> (SceneGraph, NodeId, NodeId) {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(
            None,
            SceneNode::new("Root").with_transform(Transform {
                translation: Vec3::new(5.0, 0.0, 0.0),
                rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
                scale: Vec3::splat(2.0),
            }),
        );
        let a = scene.add_node(
            Some(root),
            SceneNode::new("Beam_A")
                .with_geometry(unit_quad(Some("Steel")))
                .with_metadata(json!({"Type": "Beam", "Length": 4.5, "LoadBearing": true}))
                .with_transform(Transform {
                    translation: Vec3::new(1.0, 0.0, 0.0),
                    ..Transform::IDENTITY
                }),
        );
        let b = scene.add_node(
            Some(root),
            SceneNode::new("Column_B").with_geometry(unit_quad(None)),
        );
        (scene, a, b)
    }

    #[test]
    fn selecting_a_then_b_leaves_one_highlight() {
        let (mut scene, a, b) = two_parts();
        let mut selection = Selection::new();

        assert!(selection.show(&mut scene, a, None));
        assert_eq!(scene.count_role(NodeRole::Highlight), 1);

        assert!(selection.show(&mut scene, b, Some(Vec3::ONE)));
        assert_eq!(scene.count_role(NodeRole::Highlight), 1);
        assert_eq!(selection.selected(), Some(b));
        assert_eq!(selection.anchor(), Some(Vec3::ONE));
        let highlight = selection.highlight.unwrap();
        assert_eq!(scene.node(highlight).unwrap().name, "Column_B");
    }

    #[test]
    fn highlight_clone_sits_at_world_transform() {
        let (mut scene, a, _) = two_parts();
        let mut selection = Selection::new();
        selection.show(&mut scene, a, None);

        let clone = selection.highlight.unwrap();
        let node = scene.node(clone).unwrap();
        assert_eq!(node.role, NodeRole::Highlight);
        assert!(node.parent.is_none());
        assert!(node.metadata.is_none());

        let original_origin = scene.world_matrix(a).transform_point3(Vec3::ZERO);
        let clone_origin = scene.world_matrix(clone).transform_point3(Vec3::ZERO);
        assert!((original_origin - clone_origin).length() < 1e-4);
        assert!((clone_origin - Vec3::new(5.0, 2.0, 0.0)).length() < 1e-4);
        assert!((node.transform.scale - Vec3::splat(2.0)).length() < 1e-4);

        let original_geometry = scene.node(a).unwrap().geometry.as_ref().unwrap().id();
        assert_eq!(node.geometry.as_ref().unwrap().id(), original_geometry);
    }

    #[test]
    fn metadata_rows_keep_authoring_order() {
        let (mut scene, a, _) = two_parts();
        let mut selection = Selection::new();
        selection.show(&mut scene, a, None);

        let panel = selection.panel();
        assert!(panel.visible);
        assert_eq!(panel.title, "Beam_A");
        let rows: Vec<(&str, &str)> = panel
            .rows
            .iter()
            .map(|row| (row.key.as_str(), row.value.as_str()))
            .collect();
        assert_eq!(
            rows,
            [("Type", "Beam"), ("Length", "4.5"), ("LoadBearing", "true")]
        );
    }

    #[test]
    fn parts_without_metadata_fall_back_to_mesh_facts() {
        let (mut scene, _, b) = two_parts();
        let mut selection = Selection::new();
        selection.show(&mut scene, b, None);

        let rows = &selection.panel().rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], AttributeRow::new("Mesh name", "Column_B"));
        assert_eq!(rows[1], AttributeRow::new("Material", "Default"));
        assert_eq!(rows[2], AttributeRow::new("Vertices", "4"));
    }

    #[test]
    fn empty_or_scalar_metadata_also_falls_back() {
        let node = SceneNode::new("Slab")
            .with_geometry(unit_quad(Some("Concrete")))
            .with_metadata(json!({}));
        assert_eq!(attribute_rows(&node)[1].value, "Concrete");

        let node = SceneNode::new("Slab").with_metadata(json!("just a note"));
        let rows = attribute_rows(&node);
        assert_eq!(rows[1].value, "—");
        assert_eq!(rows[2].value, "—");
    }

    #[test]
    fn clear_hides_and_empties_the_panel() {
        let (mut scene, a, _) = two_parts();
        let mut selection = Selection::new();
        selection.show(&mut scene, a, Some(Vec3::X));
        selection.clear(&mut scene);

        assert!(!selection.panel().visible);
        assert!(selection.panel().rows.is_empty());
        assert!(selection.panel().title.is_empty());
        assert!(selection.selected().is_none());
        assert!(selection.anchor().is_none());
        assert_eq!(scene.count_role(NodeRole::Highlight), 0);

        selection.clear(&mut scene);
        assert!(!selection.panel().visible);
    }

    #[test]
    fn showing_a_removed_node_clears() {
        let (mut scene, a, b) = two_parts();
        let mut selection = Selection::new();
        selection.show(&mut scene, a, None);
        scene.remove_node(b);

        assert!(!selection.show(&mut scene, b, None));
        assert!(!selection.panel().visible);
        assert_eq!(scene.count_role(NodeRole::Highlight), 0);
    }

    #[test]
    fn title_falls_back_to_metadata_id() {
        let node = SceneNode::new("").with_metadata(json!({"id": 42}));
        assert_eq!(panel_title(&node), "42");
        assert_eq!(panel_title(&SceneNode::new("")), "Object");
    }

    #[test]
    fn values_render_like_plain_text() {
        assert_eq!(display_value(&json!("Oak")), "Oak");
        assert_eq!(display_value(&json!(3)), "3");
        assert_eq!(display_value(&json!(null)), "null");
        assert_eq!(display_value(&json!(["a", 1, false])), "a,1,false");
        assert_eq!(display_value(&json!({"k": "v"})), r#"{"k":"v"}"#);
    }
}
