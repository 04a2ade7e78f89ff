mod input;

pub use input::{map_controller, map_key, ControllerButton, InputAction, InputState, Key, KeyEvent};

use crate::assets::{classify_text, ingest, AssetLoader};
use crate::config::EditorConfig;
use crate::holo::HoloController;
use crate::render::CameraRig;
use crate::scene::container::{self, current_depth_layer};
use crate::scene::hierarchy::{is_container, is_outer_container, parent_container_of};
use crate::scene::serialization::{self, SerializationError};
use crate::scene::wrapper::{self, InputSource};
use crate::scene::{Handle, NodeId, Payload, Scene, SceneError, Transform, VisualStatus};
use crate::store::{sweep_orphans, HoloStore};
use glam::{Vec2, Vec3};

/// What a pointer or controller ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub node: NodeId,
    pub handle: Option<Handle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The hierarchy around the selection was written under this id.
    Saved(String),
    /// Nothing was selected; these orphaned trees were deleted.
    Swept(Vec<String>),
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    node: NodeId,
    source: InputSource,
    last: Vec2,
}

/// Owns the scene and every piece of editor state around it, and routes
/// input into the scene operations.
pub struct Editor<S, L> {
    scene: Scene,
    holo: HoloController,
    camera: CameraRig,
    store: S,
    loader: L,
    input: InputState,
    text_input_open: bool,
    viewport: Vec2,
    gesture: Option<Gesture>,
}

impl<S: HoloStore, L: AssetLoader> Editor<S, L> {
    pub fn new(config: EditorConfig, store: S, loader: L) -> Self {
        Self {
            scene: Scene::with_config(config),
            holo: HoloController::new(),
            camera: CameraRig::new(Vec3::new(0.0, 1.6, 0.0), &config),
            store,
            loader,
            input: InputState::default(),
            text_input_open: false,
            viewport: Vec2::new(1280.0, 720.0),
            gesture: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn holo(&self) -> &HoloController {
        &self.holo
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn text_input_open(&self) -> bool {
        self.text_input_open
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width, height);
        self.camera.set_viewport(width, height);
    }

    /// Rebuild every stored hierarchy at the scene root.
    pub async fn load_all(&mut self) -> Result<Vec<NodeId>, SerializationError> {
        serialization::load_all(&mut self.scene, &self.store, &self.loader).await
    }

    pub async fn handle_key(&mut self, event: KeyEvent) -> Option<InputAction> {
        let visualizing = self.holo.is_visualizing();
        if !self.text_input_open {
            self.input.handle_key(event, visualizing);
        }
        let action = map_key(event, self.text_input_open, visualizing)?;
        self.apply(action).await;
        Some(action)
    }

    pub async fn handle_controller(&mut self, button: ControllerButton) -> Option<InputAction> {
        let action = map_controller(button, self.text_input_open)?;
        self.apply(action).await;
        Some(action)
    }

    pub async fn apply(&mut self, action: InputAction) {
        match action {
            InputAction::ShowTextInput => self.show_text_input(),
            InputAction::ToggleTextInput => {
                if self.text_input_open {
                    self.hide_text_input();
                } else {
                    self.show_text_input();
                }
            }
            InputAction::SpawnContainer => {
                if let Err(err) = self.add_object(Payload::Container).await {
                    log::warn!("could not spawn container: {err}");
                }
            }
            InputAction::Save => {
                if let Err(err) = self.save() {
                    log::warn!("save failed: {err}");
                }
            }
            InputAction::ToggleVisualize => self.toggle_visualize(),
            InputAction::CancelSelection => self.cancel_selection(),
            InputAction::DeleteActive => self.delete_active(),
            InputAction::WalkForward => {
                self.holo.walk_forward(&mut self.scene, &self.camera);
            }
            InputAction::WalkBackward => {
                self.holo.walk_backward(&mut self.scene, &self.camera);
            }
        }
    }

    fn show_text_input(&mut self) {
        self.text_input_open = true;
        self.input.release_all();
    }

    fn hide_text_input(&mut self) {
        self.text_input_open = false;
    }

    /// Close the text input and turn what was typed into a text or emoji object.
    pub async fn submit_text(&mut self, text: &str) -> Option<NodeId> {
        self.hide_text_input();
        let payload = classify_text(text)?;
        match self.add_object(payload).await {
            Ok(node) => Some(node),
            Err(err) => {
                log::warn!("could not add text: {err}");
                None
            }
        }
    }

    /// Spawn one object per usable file in a dropped batch of `(path, data URL)` pairs.
    pub async fn drop_files(&mut self, files: &[(String, String)]) -> Vec<NodeId> {
        let mut spawned = Vec::new();
        for payload in ingest(files) {
            match self.add_object(payload).await {
                Ok(node) => spawned.push(node),
                Err(err) => log::warn!("could not add dropped file: {err}"),
            }
        }
        spawned
    }

    /// Container new content goes into, if anything is selected.
    fn placement_target(&self) -> Option<NodeId> {
        let selected = self.holo.selected()?;
        if is_outer_container(&self.scene, selected) {
            return current_depth_layer(&self.scene, selected);
        }
        if is_container(&self.scene, selected) {
            return Some(selected);
        }
        parent_container_of(&self.scene, selected)
    }

    /// Place a new object.
    ///
    /// With a selection it lands in the selected container; otherwise it is
    /// put at the scene root in front of the camera, facing it. A new
    /// container takes over the selection and activates.
    pub async fn add_object(&mut self, payload: Payload) -> Result<NodeId, SceneError> {
        let target = self.placement_target();
        let node = self.scene.spawn(target, payload.clone())?;
        if target.is_none() {
            let camera = self.camera.position;
            let position = camera + self.camera.forward() * self.scene.config().spawn_distance;
            if let Some(object) = self.scene.get_mut(node) {
                object.transform.position = position;
                object.transform.rotation = Transform::facing(position, camera);
            }
        }

        if matches!(payload, Payload::Container) {
            container::initialize(&mut self.scene, node);
            self.cancel_selection();
            wrapper::activate(&mut self.scene, &mut self.holo, node);
        } else {
            let id = self
                .scene
                .get(node)
                .map(|object| object.id().to_string())
                .unwrap_or_default();
            match self.loader.load(&id, &payload).await {
                Ok(visual) => self
                    .scene
                    .set_visual(node, VisualStatus::Ready, Some(visual.bounds)),
                Err(err) => self
                    .scene
                    .set_visual(node, VisualStatus::Failed(err.to_string()), None),
            }
        }
        log::debug!("added {} object", payload.kind().as_str());
        Ok(node)
    }

    /// Persist the hierarchy around the selection, or sweep orphans when
    /// nothing is selected. A hierarchy being walked is saved where it rests,
    /// not where the walk has framed it.
    pub fn save(&mut self) -> Result<SaveOutcome, SerializationError> {
        match self.holo.selected() {
            Some(selected) => {
                let mut tree = serialization::capture_hierarchy(&self.scene, selected)?;
                let root = serialization::persistence_root(&self.scene, selected);
                if let Some(origin) = self.holo.resting_position(root) {
                    tree.position = origin.to_array();
                }
                serialization::store_tree(&mut self.store, tree).map(SaveOutcome::Saved)
            }
            None => Ok(SaveOutcome::Swept(sweep_orphans(&mut self.store, &self.scene)?)),
        }
    }

    pub fn toggle_visualize(&mut self) {
        if self.holo.is_visualizing() {
            self.cancel_selection();
        } else {
            self.holo.enter_visualization(&mut self.scene, &self.camera);
        }
    }

    pub fn cancel_selection(&mut self) {
        self.hide_text_input();
        self.gesture = None;
        self.holo.cancel_selection(&mut self.scene);
    }

    /// Remove every active object with its subtree.
    pub fn delete_active(&mut self) {
        for node in wrapper::active_wrappers(&self.scene) {
            wrapper::on_close(&mut self.scene, &mut self.holo, node);
        }
        self.gesture = None;
    }

    /// Press on whatever the ray hit. Manipulation handles on the active
    /// object start a gesture; anything else is a click.
    pub fn press(&mut self, source: InputSource, hit: Option<Hit>, screen: Vec2) {
        let Some(hit) = hit else {
            return;
        };
        if let Some(handle) = hit.handle {
            let started = wrapper::begin_manipulation(
                &mut self.scene,
                &mut self.holo,
                hit.node,
                handle,
                source,
            );
            if started {
                self.gesture = Some(Gesture {
                    node: hit.node,
                    source,
                    last: screen,
                });
                return;
            }
        }
        wrapper::click(&mut self.scene, &mut self.holo, hit.node, hit.handle);
    }

    /// Feed the screen position of the pointer or controller ray.
    pub fn drag(&mut self, source: InputSource, screen: Vec2) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        if gesture.source != source {
            return;
        }
        let delta = screen - gesture.last;
        gesture.last = screen;
        let node = gesture.node;
        wrapper::update_manipulation(&mut self.scene, node, source, delta, self.viewport);
    }

    /// Returns `true` when the released object changed container.
    pub fn release(&mut self, source: InputSource) -> bool {
        match self.gesture {
            Some(gesture) if gesture.source == source => {
                self.gesture = None;
                wrapper::end_manipulation(&mut self.scene, &mut self.holo, gesture.node)
            }
            _ => false,
        }
    }

    /// Advance one frame: locomotion while unlocked, then keep a moving
    /// object anchored to the view.
    pub fn tick(&mut self, frame_dt: f32) {
        let locked = self.holo.is_fixed() || self.text_input_open;
        self.camera.set_controls_enabled(!locked);
        let movement = *self.input.movement();
        self.camera.update_movement(&movement, frame_dt);
        if let Some(gesture) = self.gesture {
            wrapper::follow_camera(
                &mut self.scene,
                gesture.node,
                self.camera.anchor(),
                self.holo.is_fixed(),
            );
        }
    }
}
