//! Traversal helpers over the scene arena.
//!
//! Absence is a normal answer here: every lookup that can miss returns `None`.

use super::{NodeId, Scene};

pub fn is_container(scene: &Scene, node: NodeId) -> bool {
    scene.get(node).is_some_and(|object| object.is_container())
}

/// Nearest ancestor that is a container.
pub fn parent_container_of(scene: &Scene, node: NodeId) -> Option<NodeId> {
    let mut current = scene.get(node)?.parent();
    while let Some(ancestor) = current {
        if is_container(scene, ancestor) {
            return Some(ancestor);
        }
        current = scene.get(ancestor)?.parent();
    }
    None
}

/// Topmost container above `node`, or `node` itself when it has none.
pub fn root_container_of(scene: &Scene, node: NodeId) -> NodeId {
    let mut root = node;
    while let Some(parent) = parent_container_of(scene, root) {
        root = parent;
    }
    root
}

/// Direct children in order.
pub fn child_objects_of(scene: &Scene, node: NodeId) -> &[NodeId] {
    scene.get(node).map(|object| object.children()).unwrap_or(&[])
}

/// A depth layer is a container directly beneath an outer (non-layer) container.
pub fn is_depth_layer(scene: &Scene, node: NodeId) -> bool {
    if !is_container(scene, node) {
        return false;
    }
    match scene.get(node).and_then(|object| object.parent()) {
        Some(parent) => is_container(scene, parent) && !is_depth_layer(scene, parent),
        None => false,
    }
}

pub fn is_outer_container(scene: &Scene, node: NodeId) -> bool {
    is_container(scene, node) && !is_depth_layer(scene, node)
}

pub fn depth_layers_of(scene: &Scene, container: NodeId) -> Vec<NodeId> {
    child_objects_of(scene, container)
        .iter()
        .copied()
        .filter(|child| is_container(scene, *child))
        .collect()
}

pub fn depth_layer_count(scene: &Scene, container: NodeId) -> usize {
    child_objects_of(scene, container)
        .iter()
        .filter(|child| is_container(scene, **child))
        .count()
}

/// Position of `layer` among its container siblings.
pub fn depth_layer_index(scene: &Scene, layer: NodeId) -> Option<usize> {
    let parent = scene.get(layer)?.parent()?;
    depth_layers_of(scene, parent)
        .iter()
        .position(|sibling| *sibling == layer)
}

/// Number of container ancestors. Outermost containers sit at level 0.
pub fn zoom_level_of(scene: &Scene, node: NodeId) -> usize {
    let mut level = 0;
    let mut current = parent_container_of(scene, node);
    while let Some(ancestor) = current {
        level += 1;
        current = parent_container_of(scene, ancestor);
    }
    level
}

/// The node whose wrapper owns interaction for `node`: depth layers defer to
/// their outer container.
pub fn owning_wrapper(scene: &Scene, node: NodeId) -> NodeId {
    if is_depth_layer(scene, node) {
        scene
            .get(node)
            .and_then(|object| object.parent())
            .unwrap_or(node)
    } else {
        node
    }
}

/// True when `node` is `ancestor` or lies somewhere beneath it.
pub fn is_within(scene: &Scene, node: NodeId, ancestor: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = scene.get(id).and_then(|object| object.parent());
    }
    false
}

fn siblings_of(scene: &Scene, node: NodeId) -> &[NodeId] {
    match scene.get(node).and_then(|object| object.parent()) {
        Some(parent) => child_objects_of(scene, parent),
        None => scene.roots(),
    }
}

pub fn next_sibling(scene: &Scene, node: NodeId) -> Option<NodeId> {
    let siblings = siblings_of(scene, node);
    let index = siblings.iter().position(|sibling| *sibling == node)?;
    siblings.get(index + 1).copied()
}

pub fn previous_sibling(scene: &Scene, node: NodeId) -> Option<NodeId> {
    let siblings = siblings_of(scene, node);
    let index = siblings.iter().position(|sibling| *sibling == node)?;
    index.checked_sub(1).map(|previous| siblings[previous])
}

/// Last node of `node`'s subtree in pre-order.
pub fn last_descendant(scene: &Scene, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(last) = child_objects_of(scene, current).last() {
        current = *last;
    }
    current
}

/// Depth-first pre-order listing of `node`'s subtree, `node` first.
pub fn preorder(scene: &Scene, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    if !scene.is_alive(node) {
        return out;
    }
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        stack.extend(child_objects_of(scene, current).iter().rev().copied());
    }
    out
}
