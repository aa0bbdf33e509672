use crate::scene::{NodeId, SceneGraph};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("No object matching: {query}")]
    NoMatch { query: String },
}

pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// First model part, in traversal order, whose name contains `raw_query`
/// ignoring case. A blank query is not a search and yields `Ok(None)`.
pub fn find_part(scene: &SceneGraph, raw_query: &str) -> Result<Option<NodeId>, SearchError> {
    let query = normalize_query(raw_query);
    if query.is_empty() {
        return Ok(None);
    }

    scene
        .traverse()
        .find(|id| {
            scene.node(*id).is_some_and(|node| {
                node.is_part() && !node.name.is_empty() && node.name.to_lowercase().contains(&query)
            })
        })
        .map(Some)
        .ok_or(SearchError::NoMatch { query })
}

#[cfg(test)]
mod tests {
    use super::{find_part, SearchError};
    use crate::scene::tests::unit_quad;
    use crate::scene::{NodeRole, SceneGraph, SceneNode};

    fn building() -> SceneGraph {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(None, SceneNode::new("Building"));
        scene.add_node(Some(root), SceneNode::new("Wall_North").with_geometry(unit_quad(None)));
        scene.add_node(Some(root), SceneNode::new("Door_Left").with_geometry(unit_quad(None)));
        scene.add_node(Some(root), SceneNode::new("Door_Right").with_geometry(unit_quad(None)));
        scene
    }

    #[test]
    fn first_match_in_traversal_order_wins() {
        let scene = building();
        let found = find_part(&scene, "door").unwrap().unwrap();
        assert_eq!(scene.node(found).unwrap().name, "Door_Left");
    }

    #[test]
    fn query_is_trimmed_and_case_insensitive() {
        let scene = building();
        let found = find_part(&scene, "  DOOR_r ").unwrap().unwrap();
        assert_eq!(scene.node(found).unwrap().name, "Door_Right");
    }

    #[test]
    fn blank_query_is_ignored() {
        let scene = building();
        assert_eq!(find_part(&scene, "   "), Ok(None));
    }

    #[test]
    fn missing_part_reports_normalized_query() {
        let scene = building();
        let err = find_part(&scene, " Window ").unwrap_err();
        assert_eq!(
            err,
            SearchError::NoMatch {
                query: "window".to_string()
            }
        );
        assert_eq!(err.to_string(), "No object matching: window");
    }

    #[test]
    fn groups_and_overlays_are_not_parts() {
        let mut scene = building();
        scene.add_node(
            None,
            SceneNode::new("Door_Left")
                .with_geometry(unit_quad(None))
                .with_role(NodeRole::Highlight),
        );
        assert!(find_part(&scene, "building").is_err());
        let found = find_part(&scene, "door_left").unwrap().unwrap();
        assert_eq!(scene.node(found).unwrap().role, NodeRole::Model);
    }
}
