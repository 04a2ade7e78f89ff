//! Process-wide selection, camera lock and the guided hierarchy walk.
//!
//! `HoloController` is the only writer of [`SelectionState`]; wrappers and
//! containers read it and request changes through the controller.

use crate::render::CameraRig;
use crate::scene::container::set_active_depth_layer;
use crate::scene::hierarchy::{
    child_objects_of, is_container, is_outer_container, is_within, last_descendant, next_sibling,
    owning_wrapper, previous_sibling, root_container_of,
};
use crate::scene::{wrapper, NodeId, Scene};
use glam::Vec3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    /// Weak reference to the selected object or depth layer.
    pub selected: Option<NodeId>,
    /// Movement controls are locked.
    pub is_fixed: bool,
    pub is_visualizing: bool,
    /// Focus of the walk; only meaningful while visualizing.
    pub cursor: Option<NodeId>,
}

#[derive(Debug, Clone)]
struct Walk {
    root: NodeId,
    root_origin: Vec3,
    hidden: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct HoloController {
    state: SelectionState,
    walk: Option<Walk>,
}

impl HoloController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.state.selected
    }

    pub fn is_fixed(&self) -> bool {
        self.state.is_fixed
    }

    pub fn is_visualizing(&self) -> bool {
        self.state.is_visualizing
    }

    pub fn set_fixed(&mut self, fixed: bool) {
        self.state.is_fixed = fixed;
    }

    /// Subtree the walk is confined to.
    pub fn walk_root(&self) -> Option<NodeId> {
        self.walk.as_ref().map(|walk| walk.root)
    }

    /// Where `node` sits outside the walk. The walk root is shifted in front
    /// of the camera while visualizing; this is its position before that.
    pub fn resting_position(&self, node: NodeId) -> Option<Vec3> {
        self.walk
            .as_ref()
            .filter(|walk| walk.root == node)
            .map(|walk| walk.root_origin)
    }

    /// Change the selection. The previous selection's wrapper is deactivated
    /// unless the new selection belongs to the same wrapper (switching depth
    /// layers inside one container).
    pub fn select(&mut self, scene: &mut Scene, node: Option<NodeId>) {
        let node = node.filter(|node| scene.is_alive(*node));
        if node != self.state.selected {
            if let Some(previous) = self.state.selected.filter(|previous| scene.is_alive(*previous)) {
                let previous_owner = owning_wrapper(scene, previous);
                let next_owner = node.map(|node| owning_wrapper(scene, node));
                if next_owner != Some(previous_owner) {
                    wrapper::deactivate(scene, previous_owner);
                    if is_outer_container(scene, previous_owner) {
                        set_active_depth_layer(scene, previous_owner, None);
                    }
                }
            }
            log::debug!(
                "selection: {}",
                node.and_then(|node| scene.get(node))
                    .map(|object| object.id())
                    .unwrap_or("<none>")
            );
            self.state.selected = node;
        }
        self.state.is_fixed = node.is_some_and(|node| is_container(scene, node));
    }

    /// Clear selection, visualization and camera lock.
    pub fn cancel_selection(&mut self, scene: &mut Scene) {
        self.exit_visualization(scene);
        self.select(scene, None);
        self.state.is_fixed = false;
    }

    /// Start walking the hierarchy around the current selection.
    ///
    /// Other top-level containers are hidden and the whole walk root is
    /// shifted so the focus lands centered in front of the camera.
    pub fn enter_visualization(&mut self, scene: &mut Scene, camera: &CameraRig) -> bool {
        if self.state.is_visualizing {
            return true;
        }
        let Some(selected) = self.state.selected.filter(|node| scene.is_alive(*node)) else {
            return false;
        };
        let root = root_container_of(scene, selected);
        let Some(root_origin) = scene.get(root).map(|object| object.transform.position) else {
            return false;
        };

        let hidden: Vec<NodeId> = scene
            .roots()
            .iter()
            .copied()
            .filter(|other| *other != root && is_container(scene, *other))
            .collect();
        for other in &hidden {
            if let Some(object) = scene.get_mut(*other) {
                object.visible = false;
            }
        }

        self.state.is_fixed = true;
        self.state.is_visualizing = true;
        self.state.cursor = Some(selected);
        self.walk = Some(Walk {
            root,
            root_origin,
            hidden,
        });
        self.frame_focus(scene, camera);
        true
    }

    pub fn exit_visualization(&mut self, scene: &mut Scene) {
        let Some(walk) = self.walk.take() else {
            return;
        };
        if let Some(object) = scene.get_mut(walk.root) {
            object.transform.position = walk.root_origin;
        }
        for node in walk.hidden {
            if let Some(object) = scene.get_mut(node) {
                object.visible = true;
            }
        }
        self.state.is_visualizing = false;
        self.state.is_fixed = false;
        self.state.cursor = None;
    }

    /// Advance the walk in pre-order, wrapping to the walk root at the end.
    pub fn walk_forward(&mut self, scene: &mut Scene, camera: &CameraRig) -> Option<NodeId> {
        let (root, cursor) = self.walk_position(scene)?;
        let next = next_in_walk(scene, root, cursor);
        self.state.cursor = Some(next);
        self.frame_focus(scene, camera);
        Some(next)
    }

    /// Step the walk back in pre-order, wrapping from the walk root to its last node.
    pub fn walk_backward(&mut self, scene: &mut Scene, camera: &CameraRig) -> Option<NodeId> {
        let (root, cursor) = self.walk_position(scene)?;
        let previous = previous_in_walk(scene, root, cursor);
        self.state.cursor = Some(previous);
        self.frame_focus(scene, camera);
        Some(previous)
    }

    fn walk_position(&self, scene: &Scene) -> Option<(NodeId, NodeId)> {
        let root = self.walk.as_ref()?.root;
        if !scene.is_alive(root) {
            return None;
        }
        let cursor = self
            .state
            .cursor
            .filter(|cursor| scene.is_alive(*cursor) && is_within(scene, *cursor, root))
            .unwrap_or(root);
        Some((root, cursor))
    }

    /// Translate the walk root so the cursor's bounds fill the view.
    fn frame_focus(&self, scene: &mut Scene, camera: &CameraRig) {
        let (Some(walk), Some(cursor)) = (self.walk.as_ref(), self.state.cursor) else {
            return;
        };
        let (center, size) = match scene.world_bounds(cursor) {
            Some(bounds) => (bounds.center(), bounds.size()),
            None => (scene.world_position(cursor), Vec3::ZERO),
        };
        let distance = camera.fit_distance(size).max(0.1);
        let target = camera.position + camera.forward() * distance;
        scene.translate_world(walk.root, target - center);
    }
}

fn next_in_walk(scene: &Scene, root: NodeId, cursor: NodeId) -> NodeId {
    if let Some(first) = child_objects_of(scene, cursor).first() {
        return *first;
    }
    let mut current = cursor;
    while current != root {
        if let Some(sibling) = next_sibling(scene, current) {
            return sibling;
        }
        match scene.get(current).and_then(|object| object.parent()) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    root
}

fn previous_in_walk(scene: &Scene, root: NodeId, cursor: NodeId) -> NodeId {
    if cursor == root {
        return last_descendant(scene, root);
    }
    if let Some(sibling) = previous_sibling(scene, cursor) {
        return last_descendant(scene, sibling);
    }
    scene
        .get(cursor)
        .and_then(|object| object.parent())
        .filter(|parent| is_within(scene, *parent, root))
        .unwrap_or(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::scene::container::initialize;
    use crate::scene::hierarchy::{depth_layers_of, preorder};
    use crate::scene::wrapper::activate;
    use crate::scene::{Aabb, Payload, VisualStatus};

    fn camera() -> CameraRig {
        CameraRig::new(Vec3::new(0.0, 1.6, 0.0), &EditorConfig::default())
    }

    /// Two top-level containers; the first holds two layers with content.
    fn walk_scene() -> (Scene, NodeId, NodeId) {
        let mut scene = Scene::new();
        let root = scene.insert(None, "root".into(), Payload::Container).unwrap();
        scene.get_mut(root).unwrap().transform.position = Vec3::new(0.0, 1.5, -3.0);
        initialize(&mut scene, root);
        crate::scene::container::add_depth_layer(&mut scene, root).unwrap();
        let layers = depth_layers_of(&scene, root);
        for (index, layer) in layers.iter().enumerate() {
            for item in 0..2 {
                let node = scene
                    .insert(Some(*layer), format!("t{index}{item}"), Payload::Text("x".into()))
                    .unwrap();
                scene.set_visual(
                    node,
                    VisualStatus::Ready,
                    Some(Aabb::from_center_size(Vec3::ZERO, Vec3::new(0.4, 0.2, 0.0))),
                );
            }
        }
        let other = scene.insert(None, "other".into(), Payload::Container).unwrap();
        initialize(&mut scene, other);
        (scene, root, other)
    }

    #[test]
    fn selecting_a_container_locks_movement() {
        let (mut scene, root, _) = walk_scene();
        let mut holo = HoloController::new();
        holo.select(&mut scene, Some(root));
        assert!(holo.is_fixed());
        let text = scene.find("t00").unwrap();
        holo.select(&mut scene, Some(text));
        assert!(!holo.is_fixed());
    }

    #[test]
    fn switching_hierarchies_deactivates_previous_wrapper() {
        let (mut scene, root, other) = walk_scene();
        let mut holo = HoloController::new();
        activate(&mut scene, &mut holo, root);
        let layers = depth_layers_of(&scene, root);

        // Switching layers inside the same container keeps it active.
        crate::scene::container::on_click(&mut scene, &mut holo, layers[1]);
        assert!(scene.get(root).unwrap().is_active());
        assert_eq!(holo.selected(), Some(layers[1]));

        activate(&mut scene, &mut holo, other);
        assert!(!scene.get(root).unwrap().is_active());
        let state = scene.get(root).unwrap().container().unwrap();
        assert_eq!(state.active_depth_layer, None);
    }

    #[test]
    fn visualization_requires_selection() {
        let (mut scene, _, _) = walk_scene();
        let mut holo = HoloController::new();
        assert!(!holo.enter_visualization(&mut scene, &camera()));
        assert!(!holo.is_visualizing());
    }

    #[test]
    fn visualization_frames_focus_and_restores_on_exit() {
        let (mut scene, root, other) = walk_scene();
        let mut holo = HoloController::new();
        let camera = camera();
        let text = scene.find("t01").unwrap();
        holo.select(&mut scene, Some(text));
        assert!(holo.enter_visualization(&mut scene, &camera));
        assert!(holo.is_fixed());
        assert_eq!(holo.walk_root(), Some(root));
        assert!(!scene.get(other).unwrap().visible);

        let center = scene.world_bounds(text).unwrap().center();
        let along = (center - camera.position).dot(camera.forward());
        let off_axis = (center - camera.position) - camera.forward() * along;
        assert!(along > 0.0);
        assert!(off_axis.length() < 1e-3);

        holo.exit_visualization(&mut scene);
        assert!(!holo.is_visualizing());
        assert!(!holo.is_fixed());
        assert!(scene.get(other).unwrap().visible);
        assert_eq!(
            scene.get(root).unwrap().transform.position,
            Vec3::new(0.0, 1.5, -3.0)
        );
    }

    #[test]
    fn walk_root_reports_its_resting_position() {
        let (mut scene, root, other) = walk_scene();
        let mut holo = HoloController::new();
        let camera = camera();
        assert_eq!(holo.resting_position(root), None);
        holo.select(&mut scene, Some(root));
        holo.enter_visualization(&mut scene, &camera);
        holo.walk_forward(&mut scene, &camera);
        assert_ne!(scene.get(root).unwrap().transform.position, Vec3::new(0.0, 1.5, -3.0));
        assert_eq!(holo.resting_position(root), Some(Vec3::new(0.0, 1.5, -3.0)));
        assert_eq!(holo.resting_position(other), None);
    }

    #[test]
    fn walk_visits_preorder_and_wraps() {
        let (mut scene, root, _) = walk_scene();
        let mut holo = HoloController::new();
        let camera = camera();
        holo.select(&mut scene, Some(root));
        holo.enter_visualization(&mut scene, &camera);

        let order = preorder(&scene, root);
        let mut visited = Vec::new();
        for _ in 0..order.len() {
            visited.push(holo.walk_forward(&mut scene, &camera).unwrap());
        }
        let mut expected: Vec<NodeId> = order[1..].to_vec();
        expected.push(root);
        assert_eq!(visited, expected);

        // Backwards from the root lands on the last node in pre-order.
        assert_eq!(holo.walk_backward(&mut scene, &camera), order.last().copied());
        let mut reversed = Vec::new();
        for _ in 1..order.len() {
            reversed.push(holo.walk_backward(&mut scene, &camera).unwrap());
        }
        let mut expected_back: Vec<NodeId> = order[..order.len() - 1].to_vec();
        expected_back.reverse();
        assert_eq!(reversed, expected_back);
    }

    #[test]
    fn walk_never_leaves_the_walk_root() {
        let (mut scene, root, other) = walk_scene();
        let mut holo = HoloController::new();
        let camera = camera();
        let layer = depth_layers_of(&scene, root)[1];
        holo.select(&mut scene, Some(layer));
        holo.enter_visualization(&mut scene, &camera);
        for step in 0..50 {
            let focus = if step % 3 == 0 {
                holo.walk_backward(&mut scene, &camera)
            } else {
                holo.walk_forward(&mut scene, &camera)
            }
            .unwrap();
            assert!(is_within(&scene, focus, root));
            assert!(!is_within(&scene, focus, other));
        }
    }

    #[test]
    fn cancel_clears_everything() {
        let (mut scene, root, _) = walk_scene();
        let mut holo = HoloController::new();
        activate(&mut scene, &mut holo, root);
        holo.enter_visualization(&mut scene, &camera());
        holo.cancel_selection(&mut scene);
        assert_eq!(holo.state(), &SelectionState::default());
        assert!(!scene.get(root).unwrap().is_active());
    }
}
