pub mod container;
pub mod hierarchy;
pub mod ids;
pub mod serialization;
pub mod spatial;
pub mod wrapper;

use crate::config::EditorConfig;
use glam::{Affine3A, EulerRot, Mat3, Quat, Vec3};
use std::collections::{BTreeMap, HashMap};

pub use spatial::Aabb;
pub use wrapper::{Handle, Phase, WrapperState};

/// Generational handle into the scene arena.
///
/// Handles stay valid as weak references: once the node is removed, lookups
/// through a stale handle return `None` even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn idx(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Container,
    Text,
    Emoji,
    Image,
    #[serde(alias = "gltf")]
    Model,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Text => "text",
            Self::Emoji => "emoji",
            Self::Image => "image",
            Self::Model => "model",
        }
    }
}

/// A dropped image: original file name plus its data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub name: String,
    pub data_url: String,
}

/// Files making up one model, keyed by bundle-relative path. The entry
/// point lives under [`FileBundle::MAIN`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileBundle {
    files: BTreeMap<String, String>,
}

impl FileBundle {
    pub const MAIN: &'static str = "main";

    pub fn new(files: BTreeMap<String, String>) -> Self {
        Self { files }
    }

    pub fn main(&self) -> Option<&str> {
        self.files.get(Self::MAIN).map(String::as_str)
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }
}

/// Variant-specific content of a scene object.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Container,
    Text(String),
    Emoji(String),
    Image(ImageRef),
    Model(FileBundle),
}

impl Payload {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Container => ObjectKind::Container,
            Self::Text(_) => ObjectKind::Text,
            Self::Emoji(_) => ObjectKind::Emoji,
            Self::Image(_) => ObjectKind::Image,
            Self::Model(_) => ObjectKind::Model,
        }
    }
}

/// Local transform relative to the parent node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
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
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Build from the persisted form: position, XYZ Euler radians, scale.
    pub fn from_arrays(position: [f32; 3], rotation: [f32; 3], scale: [f32; 3]) -> Self {
        Self {
            position: Vec3::from_array(position),
            rotation: Quat::from_euler(EulerRot::XYZ, rotation[0], rotation[1], rotation[2]),
            scale: Vec3::from_array(scale),
        }
    }

    pub fn euler_xyz(&self) -> [f32; 3] {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        [x, y, z]
    }

    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    pub fn from_affine(affine: Affine3A) -> Self {
        let (scale, rotation, position) = affine.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Rotation turning the local +Z axis towards `target`, keeping +Y up.
    pub fn facing(from: Vec3, target: Vec3) -> Quat {
        let z = (target - from).normalize_or_zero();
        if z == Vec3::ZERO {
            return Quat::IDENTITY;
        }
        let mut x = Vec3::Y.cross(z).normalize_or_zero();
        if x == Vec3::ZERO {
            x = Vec3::X;
        }
        let y = z.cross(x);
        Quat::from_mat3(&Mat3::from_cols(x, y, z))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualStatus {
    Pending,
    Ready,
    Failed(String),
}

/// Drop-target feedback shown while an object is being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    CurrentParent,
    Candidate,
}

/// Presentation state owned by container nodes.
#[derive(Debug, Clone, Default)]
pub struct ContainerState {
    /// Weak reference to the highlighted depth layer.
    pub active_depth_layer: Option<NodeId>,
    /// Depth layers accept clicks; outer containers are driven by their wrapper.
    pub interactive: bool,
    /// Emphasized layers render opaque, the rest translucent.
    pub emphasized: bool,
}

/// One placed object in the arena.
#[derive(Debug, Clone)]
pub struct SceneObject {
    id: String,
    payload: Payload,
    pub transform: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub(crate) wrapper: WrapperState,
    pub(crate) container: Option<ContainerState>,
    bounds: Option<Aabb>,
    visual: VisualStatus,
    pub visible: bool,
    pub highlight: Option<Highlight>,
}

impl SceneObject {
    fn new(id: String, payload: Payload) -> Self {
        let container = matches!(payload, Payload::Container).then(ContainerState::default);
        Self {
            id,
            payload,
            transform: Transform::IDENTITY,
            parent: None,
            children: Vec::new(),
            wrapper: WrapperState::default(),
            container,
            bounds: None,
            visual: VisualStatus::Pending,
            visible: true,
            highlight: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }

    pub fn container(&self) -> Option<&ContainerState> {
        self.container.as_ref()
    }

    pub fn wrapper(&self) -> &WrapperState {
        &self.wrapper
    }

    pub fn is_active(&self) -> bool {
        self.wrapper.is_active()
    }

    /// Local-space bounds of the object's visual, if one is attached.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn visual_status(&self) -> &VisualStatus {
        &self.visual
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("object id already in use: {0}")]
    DuplicateId(String),
    #[error("parent node no longer exists")]
    StaleParent,
}

/// Arena of scene objects with explicit parent/child edges.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Option<SceneObject>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    roots: Vec<NodeId>,
    by_id: HashMap<String, NodeId>,
    config: EditorConfig,
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            roots: Vec::new(),
            by_id: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    pub fn get(&self, node: NodeId) -> Option<&SceneObject> {
        match self.nodes.get(node.idx()) {
            Some(Some(object)) if self.generations[node.idx()] == node.generation => Some(object),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut SceneObject> {
        let generation = *self.generations.get(node.idx())?;
        if generation != node.generation {
            return None;
        }
        self.nodes.get_mut(node.idx())?.as_mut()
    }

    /// Look a node up by its stable string id.
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Top-level objects in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneObject)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|object| {
                (
                    NodeId {
                        index: index as u32,
                        generation: self.generations[index],
                    },
                    object,
                )
            })
        })
    }

    /// Insert an object with a fresh unique id.
    pub fn spawn(&mut self, parent: Option<NodeId>, payload: Payload) -> Result<NodeId, SceneError> {
        let id = ids::generate(|candidate| self.by_id.contains_key(candidate));
        self.insert(parent, id, payload)
    }

    /// Insert an object as the last child of `parent`, or at the scene root.
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        id: String,
        payload: Payload,
    ) -> Result<NodeId, SceneError> {
        if self.by_id.contains_key(&id) {
            return Err(SceneError::DuplicateId(id));
        }
        if let Some(parent) = parent {
            if !self.is_alive(parent) {
                return Err(SceneError::StaleParent);
            }
        }
        let object = SceneObject::new(id.clone(), payload);
        let node = if let Some(index) = self.free_list.pop() {
            let generation = self.generations[index].saturating_add(1);
            self.generations[index] = generation;
            self.nodes[index] = Some(object);
            NodeId {
                index: index as u32,
                generation,
            }
        } else {
            self.nodes.push(Some(object));
            self.generations.push(1);
            NodeId {
                index: (self.nodes.len() - 1) as u32,
                generation: 1,
            }
        };
        self.by_id.insert(id, node);
        self.link(node, parent);
        Ok(node)
    }

    /// Remove a node and its whole subtree. Returns the removed ids.
    pub fn remove(&mut self, node: NodeId) -> Vec<String> {
        if !self.is_alive(node) {
            return Vec::new();
        }
        self.unlink(node);
        let mut removed = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let Some(object) = self.nodes[current.idx()].take() else {
                continue;
            };
            stack.extend(object.children.iter().copied());
            self.by_id.remove(&object.id);
            self.free_list.push(current.idx());
            removed.push(object.id);
        }
        removed
    }

    /// Move `node` to the end of `new_parent`'s children (or the scene root)
    /// without touching its local transform.
    pub(crate) fn relink(&mut self, node: NodeId, new_parent: Option<NodeId>) {
        self.unlink(node);
        self.link(node, new_parent);
    }

    fn link(&mut self, node: NodeId, parent: Option<NodeId>) {
        match parent {
            Some(parent) => {
                if let Some(parent_object) = self.get_mut(parent) {
                    parent_object.children.push(node);
                }
            }
            None => self.roots.push(node),
        }
        if let Some(object) = self.get_mut(node) {
            object.parent = parent;
        }
    }

    fn unlink(&mut self, node: NodeId) {
        let parent = self.get(node).and_then(|object| object.parent);
        match parent {
            Some(parent) => {
                if let Some(parent_object) = self.get_mut(parent) {
                    parent_object.children.retain(|child| *child != node);
                }
            }
            None => self.roots.retain(|root| *root != node),
        }
        if let Some(object) = self.get_mut(node) {
            object.parent = None;
        }
    }

    pub(crate) fn set_bounds(&mut self, node: NodeId, bounds: Option<Aabb>) {
        if let Some(object) = self.get_mut(node) {
            object.bounds = bounds;
        }
    }

    /// Record the outcome of loading the object's visual payload.
    pub fn set_visual(&mut self, node: NodeId, status: VisualStatus, bounds: Option<Aabb>) {
        if let Some(object) = self.get_mut(node) {
            object.visual = status;
            object.bounds = bounds;
        }
    }

    /// Local-to-world transform: the product of every ancestor's local transform.
    pub fn world_transform(&self, node: NodeId) -> Affine3A {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(object) = self.get(id) else {
                break;
            };
            chain.push(object.transform.to_affine());
            current = object.parent;
        }
        chain
            .into_iter()
            .rev()
            .fold(Affine3A::IDENTITY, |world, local| world * local)
    }

    pub fn world_position(&self, node: NodeId) -> Vec3 {
        self.world_transform(node).translation.into()
    }

    /// Transform from world space into `parent`'s local space (identity for the scene root).
    pub fn parent_inverse(&self, parent: Option<NodeId>) -> Affine3A {
        parent
            .map(|parent| self.world_transform(parent).inverse())
            .unwrap_or(Affine3A::IDENTITY)
    }

    /// Shift a node by `delta` expressed in world space.
    pub fn translate_world(&mut self, node: NodeId, delta: Vec3) {
        let Some(parent) = self.get(node).map(|object| object.parent) else {
            return;
        };
        let local_delta = self.parent_inverse(parent).transform_vector3(delta);
        if let Some(object) = self.get_mut(node) {
            object.transform.position += local_delta;
        }
    }

    /// Axis-aligned world-space box around the node's visual.
    pub fn world_bounds(&self, node: NodeId) -> Option<Aabb> {
        let bounds = self.get(node)?.bounds?;
        Some(bounds.transformed(&self.world_transform(node)))
    }
}
