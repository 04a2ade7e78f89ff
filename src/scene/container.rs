//! Containers: nestable frames holding an ordered stack of depth layers.

use super::hierarchy::{
    depth_layer_count, depth_layer_index, depth_layers_of, is_container, is_depth_layer,
    is_outer_container, preorder, zoom_level_of,
};
use super::{Aabb, NodeId, Payload, Scene, VisualStatus};
use crate::holo::HoloController;
use glam::Vec3;

/// Plane scale for a container visual at `zoom`. Deeper levels render smaller.
pub fn visual_scale(zoom: usize) -> f32 {
    1.0 / zoom.max(1) as f32
}

/// Bring a freshly attached container into a consistent state.
///
/// Depth layers get their scaled plane, click target and stacking offset.
/// Outer containers are guaranteed at least one depth layer and get a box
/// spanning the whole stack.
pub fn initialize(scene: &mut Scene, node: NodeId) {
    if !is_container(scene, node) {
        return;
    }
    if is_depth_layer(scene, node) {
        initialize_depth_layer(scene, node);
        return;
    }
    if depth_layer_count(scene, node) == 0 {
        if let Err(err) = spawn_depth_layer(scene, node) {
            log::warn!("could not synthesize a depth layer: {err}");
        }
    }
    refresh_bounds(scene, node);
}

fn initialize_depth_layer(scene: &mut Scene, layer: NodeId) {
    let config = *scene.config();
    let zoom = zoom_level_of(scene, layer);
    let scale = visual_scale(zoom);
    let size = Vec3::new(
        config.container_width * scale,
        config.container_height * scale,
        config.layer_spacing,
    );
    let index = depth_layer_index(scene, layer).unwrap_or(0);
    if let Some(object) = scene.get_mut(layer) {
        object.transform.position.z =
            stacking_offset(config.layer_spacing, config.depth_layer_offset, index);
        if let Some(state) = object.container.as_mut() {
            state.interactive = true;
        }
    }
    let bounds = Aabb::from_center_size(Vec3::ZERO, size);
    scene.set_visual(layer, VisualStatus::Ready, Some(bounds));
}

fn stacking_offset(spacing: f32, offset: f32, index: usize) -> f32 {
    -(index as f32) * spacing + offset
}

fn spawn_depth_layer(scene: &mut Scene, container: NodeId) -> Result<NodeId, super::SceneError> {
    let layer = scene.spawn(Some(container), Payload::Container)?;
    initialize_depth_layer(scene, layer);
    Ok(layer)
}

/// Recompute the box an outer container draws around its depth-layer stack.
pub fn refresh_bounds(scene: &mut Scene, container: NodeId) {
    if !is_outer_container(scene, container) {
        return;
    }
    let config = *scene.config();
    let scale = visual_scale(zoom_level_of(scene, container) + 1);
    let layers = depth_layer_count(scene, container).max(1);
    let depth = config.layer_spacing * layers as f32 - config.layer_spacing;
    let half_width = config.container_width * scale * 0.5;
    let half_height = config.container_height * scale * 0.5;
    let half_slab = config.layer_spacing * 0.5;
    let bounds = Aabb::new(
        Vec3::new(-half_width, -half_height, -depth - half_slab),
        Vec3::new(half_width, half_height, half_slab),
    );
    scene.set_visual(container, VisualStatus::Ready, Some(bounds));
}

/// Append a new empty depth layer and restack every layer behind the previous one.
pub fn add_depth_layer(scene: &mut Scene, container: NodeId) -> Option<NodeId> {
    if !is_outer_container(scene, container) {
        return None;
    }
    let layer = match spawn_depth_layer(scene, container) {
        Ok(layer) => layer,
        Err(err) => {
            log::warn!("could not add depth layer: {err}");
            return None;
        }
    };
    restack_depth_layers(scene, container);
    refresh_bounds(scene, container);
    log::debug!(
        "container {} now has {} depth layers",
        scene.get(container).map(|object| object.id()).unwrap_or_default(),
        depth_layer_count(scene, container)
    );
    Some(layer)
}

fn restack_depth_layers(scene: &mut Scene, container: NodeId) {
    let config = *scene.config();
    for (index, layer) in depth_layers_of(scene, container).into_iter().enumerate() {
        if let Some(object) = scene.get_mut(layer) {
            object.transform.position.z =
                stacking_offset(config.layer_spacing, config.depth_layer_offset, index);
        }
    }
}

/// Highlight `layer` and fade the previously active one. Presentation only.
pub fn set_active_depth_layer(scene: &mut Scene, container: NodeId, layer: Option<NodeId>) {
    let Some(previous) = scene
        .get(container)
        .and_then(|object| object.container())
        .map(|state| state.active_depth_layer)
    else {
        return;
    };
    if previous == layer {
        return;
    }
    for (node, emphasized) in [(previous, false), (layer, true)] {
        if let Some(state) = node
            .and_then(|node| scene.get_mut(node))
            .and_then(|object| object.container.as_mut())
        {
            state.emphasized = emphasized;
        }
    }
    if let Some(state) = scene.get_mut(container).and_then(|object| object.container.as_mut()) {
        state.active_depth_layer = layer;
    }
}

/// The active depth layer if it is still alive, else the first one.
pub fn current_depth_layer(scene: &Scene, container: NodeId) -> Option<NodeId> {
    let active = scene
        .get(container)
        .and_then(|object| object.container())
        .and_then(|state| state.active_depth_layer)
        .filter(|layer| {
            scene
                .get(*layer)
                .is_some_and(|object| object.parent() == Some(container))
        });
    active.or_else(|| depth_layers_of(scene, container).first().copied())
}

/// A click on a depth layer makes it the active layer of its container and
/// selects it.
pub fn on_click(scene: &mut Scene, holo: &mut HoloController, layer: NodeId) {
    if !is_depth_layer(scene, layer) {
        return;
    }
    let Some(parent) = scene.get(layer).and_then(|object| object.parent()) else {
        return;
    };
    set_active_depth_layer(scene, parent, Some(layer));
    holo.select(scene, Some(layer));
}

/// Re-derive the nesting-dependent presentation of every container under `node`.
pub fn refresh_subtree(scene: &mut Scene, node: NodeId) {
    for current in preorder(scene, node).into_iter().rev() {
        initialize(scene, current);
    }
}
