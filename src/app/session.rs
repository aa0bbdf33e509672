//! Interaction state behind the window: the loaded scene, the current
//! selection and the camera, with the operations the UI triggers on them.

use crate::assets::LoadedModel;
use crate::render::{select_under, OrbitCamera, PickHit, Ray};
use crate::scene::search::{find_part, SearchError};
use crate::scene::selection::Selection;
use crate::scene::{NodeId, SceneGraph};

pub struct Session {
    pub scene: SceneGraph,
    pub selection: Selection,
    pub camera: OrbitCamera,
}

impl Session {
    pub fn new(camera: OrbitCamera) -> Self {
        Self {
            scene: SceneGraph::new(),
            selection: Selection::new(),
            camera,
        }
    }

    /// Swaps in a freshly loaded model, drops the old selection and frames
    /// the new bounds.
    pub fn replace_model(&mut self, model: LoadedModel) {
        self.scene = model.scene;
        self.selection.forget();
        if model.bounds.is_empty() {
            log::warn!(
                "Model {} has no drawable geometry; view left as is",
                model.name
            );
        } else {
            self.camera.frame_bounds(&model.bounds);
        }
    }

    pub fn click(&mut self, x: f32, y: f32, width: u32, height: u32) -> Option<PickHit> {
        let ray = Ray::from_screen(&self.camera, x, y, width, height);
        select_under(&mut self.scene, &mut self.selection, &ray)
    }

    /// Focuses and selects the first part matching `query`. A blank query
    /// does nothing; a miss leaves view and selection untouched.
    pub fn search(&mut self, query: &str) -> Result<Option<NodeId>, SearchError> {
        let Some(node) = find_part(&self.scene, query)? else {
            return Ok(None);
        };
        let bounds = self.scene.world_bounds(node);
        let center = bounds.center();
        self.camera.focus_bounds(&bounds);
        self.selection.show(&mut self.scene, node, Some(center));
        Ok(Some(node))
    }

    /// Returns `false` when there is nothing to zoom to.
    pub fn zoom_to_selection(&mut self) -> bool {
        match self.selection.anchor() {
            Some(anchor) => {
                self.camera.zoom_to_point(anchor);
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        if let Some(node) = self.selection.selected() {
            log::debug!("Clearing selection of {:?}", node);
        }
        self.selection.clear(&mut self.scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::scene::tests::unit_quad;
    use crate::scene::{Aabb, NodeRole, SceneNode, Transform};
    use glam::Vec3;
    use std::path::PathBuf;

    const WIDTH: u32 = 800;
    const HEIGHT: u32 = 600;

    fn model() -> LoadedModel {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(None, SceneNode::new("Site"));
        scene.add_node(
            Some(root),
            SceneNode::new("Slab").with_geometry(unit_quad(Some("Concrete"))),
        );
        scene.add_node(
            Some(root),
            SceneNode::new("Roof_Panel")
                .with_geometry(unit_quad(None))
                .with_transform(Transform {
                    translation: Vec3::new(4.0, 0.0, 3.0),
                    ..Transform::IDENTITY
                }),
        );
        let bounds = scene.model_bounds();
        LoadedModel {
            name: "site".to_string(),
            path: PathBuf::from("site.gltf"),
            scene,
            bounds,
        }
    }

    fn session() -> Session {
        let mut session = Session::new(OrbitCamera::new(
            &CameraConfig::default(),
            WIDTH as f32 / HEIGHT as f32,
        ));
        session.replace_model(model());
        session
    }

    #[test]
    fn loading_frames_the_model_and_drops_selection() {
        let mut session = session();
        assert!(session.search("slab").unwrap().is_some());

        session.replace_model(model());
        assert!(session.selection.selected().is_none());
        assert!(!session.selection.panel().visible);
        assert_eq!(session.scene.count_role(NodeRole::Highlight), 0);
        let expected = session.scene.model_bounds().center();
        assert!((session.camera.target - expected).length() < 1e-5);
    }

    #[test]
    fn search_focuses_and_selects_first_match() {
        let mut session = session();
        let node = session.search("  ROOF ").unwrap().unwrap();
        assert_eq!(session.selection.selected(), Some(node));
        assert_eq!(session.scene.count_role(NodeRole::Highlight), 1);

        let center = Vec3::new(4.0, 0.0, 3.0);
        assert!((session.camera.target - center).length() < 1e-5);
        assert!((session.selection.anchor().unwrap() - center).length() < 1e-5);
        let expected_eye = center + Vec3::new(1.0, -1.0, 0.5);
        assert!((session.camera.eye - expected_eye).length() < 1e-4);
    }

    #[test]
    fn failed_search_leaves_view_alone() {
        let mut session = session();
        session.search("slab").unwrap();
        let eye = session.camera.eye;

        let err = session.search("chimney").unwrap_err();
        assert_eq!(err.to_string(), "No object matching: chimney");
        assert_eq!(session.camera.eye, eye);
        assert!(session.selection.panel().visible);
        assert_eq!(session.search(""), Ok(None));
    }

    #[test]
    fn click_on_part_selects_and_click_on_sky_clears() {
        let mut session = session();
        session.camera.focus_bounds(&Aabb::new(
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
        ));
        let hit = session
            .click(WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0, WIDTH, HEIGHT)
            .unwrap();
        assert_eq!(session.scene.node(hit.node).unwrap().name, "Slab");
        assert!(session.selection.panel().visible);

        assert!(session.click(2.0, 2.0, WIDTH, HEIGHT).is_none());
        assert!(!session.selection.panel().visible);
        assert_eq!(session.scene.count_role(NodeRole::Highlight), 0);
    }

    #[test]
    fn zoom_needs_an_anchor() {
        let mut session = session();
        assert!(!session.zoom_to_selection());

        session.search("slab").unwrap();
        assert!(session.zoom_to_selection());
        assert!(session.camera.target.length() < 1e-5);

        session.clear_selection();
        assert!(!session.zoom_to_selection());
    }
}
