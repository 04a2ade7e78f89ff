use super::container::refresh_subtree;
use super::hierarchy::{child_objects_of, root_container_of};
use super::{
    FileBundle, ImageRef, NodeId, ObjectKind, Payload, Scene, SceneError, Transform, VisualStatus,
};
use crate::assets::AssetLoader;
use crate::store::{HoloStore, StoreError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Stored form of one object and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTree {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<BTreeMap<String, String>>,
    pub position: [f32; 3],
    /// XYZ Euler angles in radians. Older records append the order, `[x, y, z, "XYZ"]`.
    #[serde(deserialize_with = "euler_angles")]
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    #[serde(default)]
    pub children: Vec<PersistedTree>,
}

fn euler_angles<'de, D>(deserializer: D) -> std::result::Result<[f32; 3], D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Angles {
        Plain([f32; 3]),
        Ordered(f32, f32, f32, String),
    }
    match Angles::deserialize(deserializer)? {
        Angles::Plain(angles) => Ok(angles),
        Angles::Ordered(x, y, z, order) if order == "XYZ" => Ok([x, y, z]),
        Angles::Ordered(.., order) => {
            Err(D::Error::custom(format!("unsupported rotation order {order}")))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("{kind} object {id} has no usable asset payload")]
    MissingAsset { id: String, kind: &'static str },
    #[error("object id already in use: {0}")]
    DuplicateId(String),
    #[error("parent node no longer exists")]
    StaleParent,
    #[error("selected object no longer exists")]
    StaleSelection,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SceneError> for SerializationError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::DuplicateId(id) => Self::DuplicateId(id),
            SceneError::StaleParent => Self::StaleParent,
        }
    }
}

pub type Result<T> = std::result::Result<T, SerializationError>;

const NAME: &str = "name";

fn asset_of(payload: &Payload) -> Option<BTreeMap<String, String>> {
    let main = |value: &str| BTreeMap::from([(FileBundle::MAIN.to_string(), value.to_string())]);
    match payload {
        Payload::Container => None,
        Payload::Text(text) => Some(main(text)),
        Payload::Emoji(emoji) => Some(main(emoji)),
        Payload::Image(image) => {
            let mut asset = main(&image.data_url);
            asset.insert(NAME.to_string(), image.name.clone());
            Some(asset)
        }
        Payload::Model(bundle) => Some(bundle.files().clone()),
    }
}

fn payload_of(tree: &PersistedTree) -> Result<Payload> {
    let missing = || SerializationError::MissingAsset {
        id: tree.id.clone(),
        kind: tree.kind.as_str(),
    };
    let main = || {
        tree.asset
            .as_ref()
            .and_then(|asset| asset.get(FileBundle::MAIN))
            .cloned()
            .ok_or_else(missing)
    };
    Ok(match tree.kind {
        ObjectKind::Container => Payload::Container,
        ObjectKind::Text => Payload::Text(main()?),
        ObjectKind::Emoji => Payload::Emoji(main()?),
        ObjectKind::Image => {
            let main = main()?;
            let name = tree.asset.as_ref().and_then(|asset| asset.get(NAME)).cloned();
            let (name, data_url) = match name {
                Some(name) => (name, main),
                // Older records pack the file name in front: `name&data:...`.
                None => match main.find("&data:") {
                    Some(split) => (main[..split].to_string(), main[split + 1..].to_string()),
                    None => (String::new(), main),
                },
            };
            Payload::Image(ImageRef { name, data_url })
        }
        ObjectKind::Model => {
            main()?;
            Payload::Model(FileBundle::new(tree.asset.clone().unwrap_or_default()))
        }
    })
}

/// Capture `node` and its object children as a persisted tree.
pub fn serialize(scene: &Scene, node: NodeId) -> Option<PersistedTree> {
    let object = scene.get(node)?;
    let children = child_objects_of(scene, node)
        .iter()
        .filter_map(|child| serialize(scene, *child))
        .collect();
    Some(PersistedTree {
        id: object.id().to_string(),
        kind: object.kind(),
        asset: asset_of(object.payload()),
        position: object.transform.position.to_array(),
        rotation: object.transform.euler_xyz(),
        scale: object.transform.scale.to_array(),
        children,
    })
}

/// Rebuild a persisted tree under `parent` (or at the scene root).
///
/// Nodes are created top-down; malformed or duplicate descendants are
/// skipped with a warning. Visuals are then loaded through `loader`, a
/// failed load leaves the object in place with [`VisualStatus::Failed`].
/// Containers are initialized once their layers exist, and persisted
/// transforms are applied last so they are not re-derived.
pub async fn deserialize<L: AssetLoader>(
    scene: &mut Scene,
    parent: Option<NodeId>,
    tree: &PersistedTree,
    loader: &L,
) -> Result<NodeId> {
    let root = scene.insert(parent, tree.id.clone(), payload_of(tree)?)?;
    let mut created = vec![(root, tree)];
    let mut pending = vec![(root, tree)];
    while let Some((node, tree)) = pending.pop() {
        for child in &tree.children {
            let inserted = payload_of(child)
                .and_then(|payload| Ok(scene.insert(Some(node), child.id.clone(), payload)?));
            match inserted {
                Ok(child_node) => {
                    created.push((child_node, child));
                    pending.push((child_node, child));
                }
                Err(err) => log::warn!("skipping persisted object {}: {err}", child.id),
            }
        }
    }

    for (node, tree) in &created {
        let Some(payload) = scene.get(*node).map(|object| object.payload().clone()) else {
            continue;
        };
        if matches!(payload, Payload::Container) {
            continue;
        }
        match loader.load(&tree.id, &payload).await {
            Ok(visual) => scene.set_visual(*node, VisualStatus::Ready, Some(visual.bounds)),
            Err(err) => scene.set_visual(*node, VisualStatus::Failed(err.to_string()), None),
        }
    }

    refresh_subtree(scene, root);
    for (node, tree) in &created {
        if let Some(object) = scene.get_mut(*node) {
            object.transform = Transform::from_arrays(tree.position, tree.rotation, tree.scale);
        }
    }
    Ok(root)
}

/// Object that a save of `selected` persists: its outermost container.
pub fn persistence_root(scene: &Scene, selected: NodeId) -> NodeId {
    root_container_of(scene, selected)
}

/// Serialize the whole top-level hierarchy around `selected`.
pub fn capture_hierarchy(scene: &Scene, selected: NodeId) -> Result<PersistedTree> {
    let root = persistence_root(scene, selected);
    serialize(scene, root).ok_or(SerializationError::StaleSelection)
}

/// Persist the whole top-level hierarchy around `selected`.
pub fn save_hierarchy(scene: &Scene, store: &mut impl HoloStore, selected: NodeId) -> Result<String> {
    let tree = capture_hierarchy(scene, selected)?;
    store_tree(store, tree)
}

/// Write `tree` under its root id.
///
/// Objects that moved into `tree` from another stored hierarchy are pruned
/// from that hierarchy first, so every id lives in exactly one stored tree.
pub fn store_tree(store: &mut impl HoloStore, tree: PersistedTree) -> Result<String> {
    let mut ids = HashSet::new();
    collect_ids(&tree, &mut ids);
    for mut other in store.get_all()? {
        if other.id == tree.id {
            continue;
        }
        if ids.contains(other.id.as_str()) {
            log::info!("{} now lives inside {}, dropping its stored tree", other.id, tree.id);
            store.delete(&other.id)?;
        } else if prune(&mut other, &ids) {
            log::info!("pruned objects moved into {} from {}", tree.id, other.id);
            store.put(other)?;
        }
    }
    let id = tree.id.clone();
    store.put(tree)?;
    log::info!("saved {id}");
    Ok(id)
}

fn collect_ids<'a>(tree: &'a PersistedTree, ids: &mut HashSet<&'a str>) {
    ids.insert(&tree.id);
    for child in &tree.children {
        collect_ids(child, ids);
    }
}

/// Drop descendants whose id is in `ids`. Returns whether anything changed.
fn prune(tree: &mut PersistedTree, ids: &HashSet<&str>) -> bool {
    let before = tree.children.len();
    tree.children.retain(|child| !ids.contains(child.id.as_str()));
    let mut changed = tree.children.len() != before;
    for child in &mut tree.children {
        changed |= prune(child, ids);
    }
    changed
}

/// Rebuild every stored tree at the scene root.
///
/// Trees that fail to rebuild are logged and skipped.
pub async fn load_all<L: AssetLoader>(
    scene: &mut Scene,
    store: &impl HoloStore,
    loader: &L,
) -> Result<Vec<NodeId>> {
    let trees = store.get_all()?;
    let mut roots = Vec::with_capacity(trees.len());
    for tree in &trees {
        match deserialize(scene, None, tree, loader).await {
            Ok(node) => roots.push(node),
            Err(err) => log::warn!("could not restore {}: {err}", tree.id),
        }
    }
    log::info!("restored {} of {} stored tree(s)", roots.len(), trees.len());
    Ok(roots)
}
