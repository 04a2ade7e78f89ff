//! Interactive envelope around every placed object.
//!
//! A wrapper moves through `Idle -> Active -> {Resizing, Moving, Rotating} ->
//! Active -> Idle`. At most one wrapper in the scene is ever out of `Idle`.
//! Ending a move over a different container commits a re-parent that keeps
//! the object's world transform.

use super::container::{self, current_depth_layer};
use super::hierarchy::{
    is_container, is_depth_layer, is_outer_container, is_within, owning_wrapper,
    parent_container_of, zoom_level_of,
};
use super::{Aabb, Highlight, NodeId, Scene, Transform};
use crate::holo::HoloController;
use glam::{EulerRot, Quat, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Named handle slots attached to an active wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Resize,
    Move,
    Rotate,
    Close,
    /// Appends a depth layer. Only on outermost, un-parented containers.
    Add,
}

impl Handle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "resize" => Some(Self::Resize),
            "move" => Some(Self::Move),
            "rotate" => Some(Self::Rotate),
            "close" => Some(Self::Close),
            "add" => Some(Self::Add),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::Move => "move",
            Self::Rotate => "rotate",
            Self::Close => "close",
            Self::Add => "add",
        }
    }

    fn manipulation_phase(self) -> Option<Phase> {
        match self {
            Self::Resize => Some(Phase::Resizing),
            Self::Move => Some(Phase::Moving),
            Self::Rotate => Some(Phase::Rotating),
            Self::Close | Self::Add => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Active,
    Resizing,
    Moving,
    Rotating,
}

/// Where manipulation input comes from. A gesture keeps its source until it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Pointer,
    Controller,
}

#[derive(Debug, Clone)]
struct Manipulation {
    source: InputSource,
    current_parent: Option<NodeId>,
    candidate_parent: Option<NodeId>,
    camera_anchor: Option<Vec3>,
    accumulated: Vec2,
}

#[derive(Debug, Clone, Default)]
pub struct WrapperState {
    phase: Phase,
    handles: Vec<Handle>,
    pitch: f32,
    yaw: f32,
    roll: f32,
    changing_parent: bool,
    manipulation: Option<Manipulation>,
}

impl WrapperState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn is_manipulating(&self) -> bool {
        self.manipulation.is_some()
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn changing_parent(&self) -> bool {
        self.changing_parent
    }

    /// Container the object will land in if the gesture ends now.
    pub fn candidate_parent(&self) -> Option<NodeId> {
        self.manipulation
            .as_ref()
            .and_then(|manipulation| manipulation.candidate_parent)
    }

    /// Total pointer travel since the gesture began.
    pub fn accumulated_delta(&self) -> Vec2 {
        self.manipulation
            .as_ref()
            .map(|manipulation| manipulation.accumulated)
            .unwrap_or(Vec2::ZERO)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReparentError {
    #[error("target container no longer exists")]
    StaleCandidate,
    #[error("an object cannot be moved into its own subtree")]
    WouldCycle,
    #[error("object already belongs to that container")]
    Unchanged,
    #[error("object no longer exists")]
    MissingObject,
}

/// Every wrapper currently out of `Idle`.
pub fn active_wrappers(scene: &Scene) -> Vec<NodeId> {
    scene
        .iter()
        .filter(|(_, object)| object.is_active())
        .map(|(node, _)| node)
        .collect()
}

/// Make `node` the single active wrapper and select it.
pub fn activate(scene: &mut Scene, holo: &mut HoloController, node: NodeId) {
    if !scene.is_alive(node) || is_depth_layer(scene, node) {
        return;
    }
    for other in active_wrappers(scene) {
        if other != node {
            deactivate(scene, other);
        }
    }

    let topmost_container =
        is_outer_container(scene, node) && parent_container_of(scene, node).is_none();
    let mut handles = vec![Handle::Resize, Handle::Move, Handle::Rotate, Handle::Close];
    if topmost_container {
        handles.push(Handle::Add);
    }
    if let Some(object) = scene.get_mut(node) {
        if object.wrapper.phase == Phase::Idle {
            object.wrapper.phase = Phase::Active;
        }
        object.wrapper.handles = handles;
    }

    let selection = if topmost_container {
        let layer = current_depth_layer(scene, node);
        container::set_active_depth_layer(scene, node, layer);
        layer.unwrap_or(node)
    } else {
        node
    };
    holo.select(scene, Some(selection));
}

/// Local-space centers of the attached handles.
///
/// Resize, move and rotate line up under the bottom-right corner of the
/// object's bounds, close sits on the top-left corner and add on the top-right.
pub fn handle_anchors(scene: &Scene, node: NodeId) -> Vec<(Handle, Vec3)> {
    let Some(object) = scene.get(node) else {
        return Vec::new();
    };
    let size = scene.config().handle_size;
    let bounds = object
        .bounds()
        .unwrap_or_else(|| Aabb::from_center_size(Vec3::ZERO, Vec3::ZERO));
    let front = bounds.max.z;
    let below = bounds.min.y - size * 0.5;
    let right = bounds.max.x + size * 0.5;
    object
        .wrapper
        .handles
        .iter()
        .map(|handle| {
            let anchor = match handle {
                Handle::Resize => Vec3::new(right, below, front),
                Handle::Move => Vec3::new(right + size, below, front),
                Handle::Rotate => Vec3::new(right + size * 2.0, below, front),
                Handle::Close => Vec3::new(bounds.min.x, bounds.max.y, front),
                Handle::Add => Vec3::new(right, bounds.max.y + size * 0.5, front),
            };
            (*handle, anchor)
        })
        .collect()
}

/// Drop handles and any in-flight gesture.
pub fn deactivate(scene: &mut Scene, node: NodeId) {
    let candidate = scene
        .get(node)
        .and_then(|object| object.wrapper.manipulation.as_ref())
        .map(|manipulation| (manipulation.current_parent, manipulation.candidate_parent));
    if let Some((current, candidate)) = candidate {
        clear_highlight(scene, current);
        clear_highlight(scene, candidate);
    }
    if let Some(object) = scene.get_mut(node) {
        object.wrapper.phase = Phase::Idle;
        object.wrapper.handles.clear();
        object.wrapper.manipulation = None;
    }
}

/// Route a click on the object. Inactive objects become active; on an active
/// object the close and add handles fire.
pub fn click(scene: &mut Scene, holo: &mut HoloController, node: NodeId, hit: Option<Handle>) {
    if is_depth_layer(scene, node) {
        container::on_click(scene, holo, node);
        return;
    }
    let Some(active) = scene.get(node).map(|object| object.is_active()) else {
        return;
    };
    if !active {
        activate(scene, holo, node);
        return;
    }
    match hit {
        Some(Handle::Close) => on_close(scene, holo, node),
        Some(Handle::Add) if has_handle(scene, node, Handle::Add) => {
            if let Some(layer) = container::add_depth_layer(scene, node) {
                container::on_click(scene, holo, layer);
            }
        }
        _ => {}
    }
}

fn has_handle(scene: &Scene, node: NodeId, handle: Handle) -> bool {
    scene
        .get(node)
        .is_some_and(|object| object.wrapper.handles.contains(&handle))
}

/// Start a resize, move or rotate gesture on an active object.
pub fn begin_manipulation(
    scene: &mut Scene,
    holo: &mut HoloController,
    node: NodeId,
    handle: Handle,
    source: InputSource,
) -> bool {
    let Some(phase) = handle.manipulation_phase() else {
        return false;
    };
    let Some(object) = scene.get(node) else {
        return false;
    };
    if object.wrapper.phase != Phase::Active || !object.wrapper.handles.contains(&handle) {
        return false;
    }

    let current_parent = parent_container_of(scene, node);
    if let Some(object) = scene.get_mut(node) {
        // Rotation continues from the current orientation.
        let (yaw, pitch, roll) = object.transform.rotation.to_euler(EulerRot::YXZ);
        object.wrapper.yaw = -yaw;
        object.wrapper.pitch = -pitch;
        object.wrapper.roll = roll;
        object.wrapper.phase = phase;
        object.wrapper.manipulation = Some(Manipulation {
            source,
            current_parent,
            candidate_parent: current_parent,
            camera_anchor: None,
            accumulated: Vec2::ZERO,
        });
    }
    if phase == Phase::Moving {
        set_highlight(scene, current_parent, Highlight::CurrentParent);
    }
    holo.set_fixed(false);
    true
}

/// Apply one pointer delta (screen pixels) to the active gesture.
///
/// Input from a different source than the one that started the gesture is ignored.
pub fn update_manipulation(
    scene: &mut Scene,
    node: NodeId,
    source: InputSource,
    delta: Vec2,
    viewport: Vec2,
) {
    let config = *scene.config();
    let Some(object) = scene.get_mut(node) else {
        return;
    };
    let wrapper = &mut object.wrapper;
    let Some(manipulation) = wrapper.manipulation.as_mut() else {
        return;
    };
    if manipulation.source != source {
        return;
    }
    manipulation.accumulated += delta;

    match wrapper.phase {
        Phase::Resizing => {
            let amount = (delta.x - delta.y) * config.resize_factor;
            let scale = object.transform.scale + Vec3::splat(amount);
            object.transform.scale = scale.max(Vec3::splat(config.min_scale));
        }
        Phase::Moving => {
            object.transform.position.x += delta.x * config.move_factor;
            object.transform.position.y -= delta.y * config.move_factor;
        }
        Phase::Rotating => {
            let viewport = viewport.max(Vec2::ONE);
            wrapper.pitch = (wrapper.pitch - TAU * delta.y / viewport.y).clamp(-FRAC_PI_2, FRAC_PI_2);
            wrapper.yaw -= TAU * delta.x / viewport.x;
            object.transform.rotation =
                Quat::from_euler(EulerRot::YXZ, -wrapper.yaw, -wrapper.pitch, wrapper.roll);
        }
        Phase::Idle | Phase::Active => {}
    }

    if wrapper.phase == Phase::Moving {
        update_drop_candidate(scene, node);
    }
}

/// Keep a moving object anchored in view space while the camera travels.
///
/// `camera_anchor` is a point fixed in front of the camera; its per-frame
/// displacement is applied to the object.
pub fn follow_camera(scene: &mut Scene, node: NodeId, camera_anchor: Vec3, is_fixed: bool) {
    if is_fixed {
        return;
    }
    let Some(object) = scene.get_mut(node) else {
        return;
    };
    if object.wrapper.phase != Phase::Moving {
        return;
    }
    let Some(manipulation) = object.wrapper.manipulation.as_mut() else {
        return;
    };
    let previous = manipulation.camera_anchor.replace(camera_anchor);
    let Some(previous) = previous else {
        return;
    };
    let shift = camera_anchor - previous;
    if shift != Vec3::ZERO {
        scene.translate_world(node, shift);
        update_drop_candidate(scene, node);
    }
}

/// Containers `node` could be dropped into, most deeply nested first.
fn drop_candidates(scene: &Scene, node: NodeId) -> Vec<(NodeId, Aabb)> {
    let mut candidates: Vec<(usize, NodeId, Aabb)> = scene
        .iter()
        .filter(|(id, object)| object.is_container() && !is_within(scene, *id, node))
        .filter_map(|(id, _)| {
            scene
                .world_bounds(id)
                .map(|bounds| (zoom_level_of(scene, id), id, bounds))
        })
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates
        .into_iter()
        .map(|(_, id, bounds)| (id, bounds))
        .collect()
}

fn update_drop_candidate(scene: &mut Scene, node: NodeId) {
    let Some(current) = scene
        .get(node)
        .and_then(|object| object.wrapper.manipulation.as_ref())
        .map(|manipulation| (manipulation.current_parent, manipulation.candidate_parent))
    else {
        return;
    };
    let (current_parent, previous_candidate) = current;
    // Objects that do not live in a container stay where they are.
    if current_parent.is_none() {
        return;
    }

    let center = scene
        .world_bounds(node)
        .map(|bounds| bounds.center())
        .unwrap_or_else(|| scene.world_position(node));
    let found = super::spatial::find_containing(center, &drop_candidates(scene, node));
    // Content lands in depth layers, never directly in an outer container.
    let candidate = match found {
        Some(found) if is_outer_container(scene, found) => {
            current_depth_layer(scene, found).or(current_parent)
        }
        Some(found) => Some(found),
        None => current_parent,
    };

    if candidate != previous_candidate {
        if previous_candidate != current_parent {
            clear_highlight(scene, previous_candidate);
        }
        if candidate != current_parent {
            set_highlight(scene, candidate, Highlight::Candidate);
        }
        if let Some(manipulation) = scene
            .get_mut(node)
            .and_then(|object| object.wrapper.manipulation.as_mut())
        {
            manipulation.candidate_parent = candidate;
        }
    }
}

/// Finish the gesture. Returns `true` when the object changed container.
pub fn end_manipulation(scene: &mut Scene, holo: &mut HoloController, node: NodeId) -> bool {
    let Some(object) = scene.get_mut(node) else {
        return false;
    };
    let Some(manipulation) = object.wrapper.manipulation.take() else {
        return false;
    };
    object.wrapper.phase = Phase::Active;
    clear_highlight(scene, manipulation.current_parent);
    clear_highlight(scene, manipulation.candidate_parent);

    let mut moved = false;
    if let Some(target) = manipulation.candidate_parent {
        if manipulation.candidate_parent != manipulation.current_parent {
            match reparent(scene, node, target) {
                Ok(()) => moved = true,
                Err(err) => log::warn!("re-parent aborted: {err}"),
            }
        }
    }
    holo.set_fixed(is_container(scene, node));
    moved
}

/// Move `node` under `new_parent`, preserving its world-space transform.
///
/// The target is re-validated first; on any error the object stays put.
pub fn reparent(scene: &mut Scene, node: NodeId, new_parent: NodeId) -> Result<(), ReparentError> {
    let Some(object) = scene.get(node) else {
        return Err(ReparentError::MissingObject);
    };
    if object.parent() == Some(new_parent) {
        return Err(ReparentError::Unchanged);
    }
    if !scene.is_alive(new_parent) {
        return Err(ReparentError::StaleCandidate);
    }
    if is_within(scene, new_parent, node) {
        return Err(ReparentError::WouldCycle);
    }

    let world = scene.world_transform(node);
    set_changing_parent(scene, node, true);
    scene.relink(node, Some(new_parent));
    let local = scene.parent_inverse(Some(new_parent)) * world;
    if let Some(object) = scene.get_mut(node) {
        object.transform = Transform::from_affine(local);
    }
    container::refresh_subtree(scene, node);
    set_changing_parent(scene, node, false);

    log::info!(
        "moved {} into {}",
        scene.get(node).map(|object| object.id()).unwrap_or_default(),
        scene.get(new_parent).map(|object| object.id()).unwrap_or_default()
    );
    Ok(())
}

fn set_changing_parent(scene: &mut Scene, node: NodeId, value: bool) {
    if let Some(object) = scene.get_mut(node) {
        object.wrapper.changing_parent = value;
    }
}

/// Remove the object and its subtree, clearing the selection if it pointed inside.
pub fn on_close(scene: &mut Scene, holo: &mut HoloController, node: NodeId) {
    if !scene.is_alive(node) {
        return;
    }
    let selection_inside = holo
        .selected()
        .is_some_and(|selected| is_within(scene, selected, node));
    if selection_inside {
        holo.cancel_selection(scene);
    }
    let owner = owning_wrapper(scene, node);
    deactivate(scene, owner);
    let removed = scene.remove(node);
    log::info!("closed {} object(s)", removed.len());
}

fn set_highlight(scene: &mut Scene, node: Option<NodeId>, highlight: Highlight) {
    if let Some(object) = node.and_then(|node| scene.get_mut(node)) {
        object.highlight = Some(highlight);
    }
}

fn clear_highlight(scene: &mut Scene, node: Option<NodeId>) {
    if let Some(object) = node.and_then(|node| scene.get_mut(node)) {
        object.highlight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::container::initialize;
    use crate::scene::hierarchy::depth_layers_of;
    use crate::scene::{Payload, VisualStatus};

    const VIEWPORT: Vec2 = Vec2::new(1920.0, 1080.0);

    fn container_with_layer(scene: &mut Scene, id: &str, position: Vec3) -> (NodeId, NodeId) {
        let root = scene.insert(None, id.into(), Payload::Container).unwrap();
        scene.get_mut(root).unwrap().transform.position = position;
        initialize(scene, root);
        let layer = depth_layers_of(scene, root)[0];
        (root, layer)
    }

    fn text(scene: &mut Scene, parent: NodeId, id: &str) -> NodeId {
        let node = scene
            .insert(Some(parent), id.into(), Payload::Text(id.into()))
            .unwrap();
        scene.set_visual(
            node,
            VisualStatus::Ready,
            Some(Aabb::from_center_size(Vec3::ZERO, Vec3::new(0.2, 0.1, 0.01))),
        );
        node
    }

    #[test]
    fn at_most_one_wrapper_is_active() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let nodes: Vec<_> = (0..4).map(|i| text(&mut scene, layer, &format!("t{i}"))).collect();
        for node in nodes.iter().chain(nodes.iter().rev()) {
            activate(&mut scene, &mut holo, *node);
            assert_eq!(active_wrappers(&scene), vec![*node]);
        }
    }

    #[test]
    fn add_handle_only_on_topmost_container() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (root, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        activate(&mut scene, &mut holo, root);
        assert!(scene.get(root).unwrap().wrapper().handles().contains(&Handle::Add));
        assert_eq!(holo.selected(), Some(layer));
        assert!(holo.state().is_fixed);

        let nested = scene.insert(Some(layer), "n".into(), Payload::Container).unwrap();
        initialize(&mut scene, nested);
        activate(&mut scene, &mut holo, nested);
        assert!(!scene.get(nested).unwrap().wrapper().handles().contains(&Handle::Add));
        assert!(!scene.get(root).unwrap().is_active());
    }

    #[test]
    fn handles_sit_outside_the_object_bounds() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let node = text(&mut scene, layer, "t");
        assert!(handle_anchors(&scene, node).is_empty());

        activate(&mut scene, &mut holo, node);
        let anchors = handle_anchors(&scene, node);
        let names: Vec<_> = anchors.iter().map(|(handle, _)| handle.name()).collect();
        assert_eq!(names, ["resize", "move", "rotate", "close"]);
        let bounds = scene.get(node).unwrap().bounds().unwrap();
        for (handle, anchor) in anchors {
            assert_eq!(Handle::from_name(handle.name()), Some(handle));
            if handle != Handle::Close {
                assert!(!bounds.contains_point(anchor));
            }
        }
    }

    #[test]
    fn depth_layers_never_activate() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        activate(&mut scene, &mut holo, layer);
        assert!(active_wrappers(&scene).is_empty());
    }

    #[test]
    fn manipulation_requires_active_wrapper() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let node = text(&mut scene, layer, "t");
        assert!(!begin_manipulation(&mut scene, &mut holo, node, Handle::Move, InputSource::Pointer));
        activate(&mut scene, &mut holo, node);
        assert!(!begin_manipulation(&mut scene, &mut holo, node, Handle::Close, InputSource::Pointer));
        assert!(begin_manipulation(&mut scene, &mut holo, node, Handle::Move, InputSource::Pointer));
        assert_eq!(scene.get(node).unwrap().wrapper().phase(), Phase::Moving);
        assert!(scene.get(node).unwrap().wrapper().is_manipulating());
        assert!(!holo.state().is_fixed);
    }

    #[test]
    fn resize_scales_uniformly_and_clamps() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let node = text(&mut scene, layer, "t");
        activate(&mut scene, &mut holo, node);
        begin_manipulation(&mut scene, &mut holo, node, Handle::Resize, InputSource::Pointer);
        update_manipulation(&mut scene, node, InputSource::Pointer, Vec2::new(10.0, -10.0), VIEWPORT);
        let scale = scene.get(node).unwrap().transform.scale;
        assert!((scale - Vec3::splat(1.2)).length() < 1e-5);

        update_manipulation(&mut scene, node, InputSource::Pointer, Vec2::new(-1000.0, 0.0), VIEWPORT);
        let min = scene.config().min_scale;
        assert_eq!(scene.get(node).unwrap().transform.scale, Vec3::splat(min));
    }

    #[test]
    fn foreign_input_source_is_ignored() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let node = text(&mut scene, layer, "t");
        activate(&mut scene, &mut holo, node);
        begin_manipulation(&mut scene, &mut holo, node, Handle::Move, InputSource::Controller);
        update_manipulation(&mut scene, node, InputSource::Pointer, Vec2::new(100.0, 0.0), VIEWPORT);
        assert_eq!(scene.get(node).unwrap().transform.position.x, 0.0);
        assert_eq!(scene.get(node).unwrap().wrapper().accumulated_delta(), Vec2::ZERO);
    }

    #[test]
    fn rotate_continues_from_existing_orientation() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let node = text(&mut scene, layer, "t");
        let start = Quat::from_rotation_y(0.7);
        scene.get_mut(node).unwrap().transform.rotation = start;
        activate(&mut scene, &mut holo, node);
        begin_manipulation(&mut scene, &mut holo, node, Handle::Rotate, InputSource::Pointer);

        update_manipulation(&mut scene, node, InputSource::Pointer, Vec2::ZERO, VIEWPORT);
        let rotation = scene.get(node).unwrap().transform.rotation;
        assert!(rotation.angle_between(start) < 1e-4);

        update_manipulation(&mut scene, node, InputSource::Pointer, Vec2::new(96.0, 0.0), VIEWPORT);
        let (yaw, _, _) = scene
            .get(node)
            .unwrap()
            .transform
            .rotation
            .to_euler(EulerRot::YXZ);
        let expected = 0.7 + TAU * 96.0 / VIEWPORT.x;
        assert!((yaw - expected).abs() < 1e-4);
    }

    #[test]
    fn rotate_pitch_is_clamped() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let node = text(&mut scene, layer, "t");
        activate(&mut scene, &mut holo, node);
        begin_manipulation(&mut scene, &mut holo, node, Handle::Rotate, InputSource::Pointer);
        for _ in 0..10 {
            update_manipulation(&mut scene, node, InputSource::Pointer, Vec2::new(0.0, -500.0), VIEWPORT);
        }
        let (_, pitch, _) = scene
            .get(node)
            .unwrap()
            .transform
            .rotation
            .to_euler(EulerRot::YXZ);
        assert!((pitch.abs() - FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn moving_into_another_container_preserves_world_transform() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer_a) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let (root_b, layer_b) = container_with_layer(&mut scene, "b", Vec3::new(3.0, 0.0, 0.0));
        scene.get_mut(root_b).unwrap().transform.scale = Vec3::splat(0.5);
        scene.get_mut(root_b).unwrap().transform.rotation = Quat::from_rotation_y(0.4);

        let node = text(&mut scene, layer_a, "t");
        scene.get_mut(node).unwrap().transform.position = Vec3::new(1.8, 0.0, 0.0);
        activate(&mut scene, &mut holo, node);
        begin_manipulation(&mut scene, &mut holo, node, Handle::Move, InputSource::Pointer);
        // 250px * 0.004 = 1.0 to the right, into container b.
        update_manipulation(&mut scene, node, InputSource::Pointer, Vec2::new(250.0, 0.0), VIEWPORT);
        assert_eq!(scene.get(node).unwrap().wrapper().candidate_parent(), Some(layer_b));
        assert_eq!(scene.get(layer_b).unwrap().highlight, Some(Highlight::Candidate));
        assert_eq!(scene.get(layer_a).unwrap().highlight, Some(Highlight::CurrentParent));

        let before = scene.world_transform(node);
        assert!(end_manipulation(&mut scene, &mut holo, node));
        let after = scene.world_transform(node);

        assert_eq!(scene.get(node).unwrap().parent(), Some(layer_b));
        let (s0, r0, t0) = before.to_scale_rotation_translation();
        let (s1, r1, t1) = after.to_scale_rotation_translation();
        assert!((t0 - t1).length() < 1e-4);
        assert!((s0 - s1).length() < 1e-4);
        assert!(r0.angle_between(r1) < 1e-3);
        assert!(scene.get(layer_b).unwrap().highlight.is_none());
        assert!(scene.get(layer_a).unwrap().highlight.is_none());
        assert_eq!(scene.get(node).unwrap().wrapper().phase(), Phase::Active);
    }

    #[test]
    fn staying_inside_the_same_container_keeps_parent() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let node = text(&mut scene, layer, "t");
        activate(&mut scene, &mut holo, node);
        begin_manipulation(&mut scene, &mut holo, node, Handle::Move, InputSource::Pointer);
        update_manipulation(&mut scene, node, InputSource::Pointer, Vec2::new(20.0, 20.0), VIEWPORT);
        assert!(!end_manipulation(&mut scene, &mut holo, node));
        assert_eq!(scene.get(node).unwrap().parent(), Some(layer));
        assert!(!holo.state().is_fixed);
    }

    #[test]
    fn reparent_rejects_cycles_and_stale_targets() {
        let mut scene = Scene::new();
        let (root, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let (other, other_layer) = container_with_layer(&mut scene, "b", Vec3::ZERO);
        assert_eq!(reparent(&mut scene, root, layer), Err(ReparentError::WouldCycle));
        scene.remove(other);
        assert_eq!(reparent(&mut scene, root, other_layer), Err(ReparentError::StaleCandidate));
        assert_eq!(scene.get(root).unwrap().parent(), None);
    }

    #[test]
    fn reparenting_a_container_rescales_its_layers() {
        let mut scene = Scene::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let (moved, moved_layer) = container_with_layer(&mut scene, "b", Vec3::ZERO);
        let width_before = scene.get(moved_layer).unwrap().bounds().unwrap().size().x;
        reparent(&mut scene, moved, layer).unwrap();
        let width_after = scene.get(moved_layer).unwrap().bounds().unwrap().size().x;
        assert!(width_after < width_before);
        assert_eq!(zoom_level_of(&scene, moved_layer), 3);
    }

    #[test]
    fn camera_follow_shifts_moving_object() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (_, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        let node = text(&mut scene, layer, "t");
        activate(&mut scene, &mut holo, node);
        begin_manipulation(&mut scene, &mut holo, node, Handle::Move, InputSource::Controller);
        follow_camera(&mut scene, node, Vec3::new(0.0, 0.0, -1.0), false);
        follow_camera(&mut scene, node, Vec3::new(0.1, 0.0, -1.0), false);
        follow_camera(&mut scene, node, Vec3::new(0.5, 0.0, -1.0), true);
        let x = scene.world_position(node).x;
        assert!((x - 0.1).abs() < 1e-5);
    }

    #[test]
    fn close_removes_subtree_and_clears_selection() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (root, layer) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        text(&mut scene, layer, "t");
        click(&mut scene, &mut holo, root, None);
        assert!(holo.selected().is_some());
        click(&mut scene, &mut holo, root, Some(Handle::Close));
        assert!(scene.is_empty());
        assert_eq!(holo.selected(), None);
    }

    #[test]
    fn add_handle_appends_and_selects_new_layer() {
        let mut scene = Scene::new();
        let mut holo = HoloController::new();
        let (root, _) = container_with_layer(&mut scene, "a", Vec3::ZERO);
        click(&mut scene, &mut holo, root, None);
        click(&mut scene, &mut holo, root, Some(Handle::Add));
        let layers = depth_layers_of(&scene, root);
        assert_eq!(layers.len(), 2);
        assert_eq!(holo.selected(), Some(layers[1]));
        assert_eq!(current_depth_layer(&scene, root), Some(layers[1]));
        assert!(scene.get(root).unwrap().is_active());
    }
}
