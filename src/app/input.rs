use crate::render::CameraMovement;

/// Keys the editor reacts to. Printable keys arrive as lowercase characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Backspace,
    Delete,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Space,
    Shift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
    pub meta: bool,
    pub repeat: bool,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        Self {
            key,
            pressed: true,
            meta: false,
            repeat: false,
        }
    }

    pub fn release(key: Key) -> Self {
        Self {
            pressed: false,
            ..Self::press(key)
        }
    }

    pub fn with_meta(self) -> Self {
        Self { meta: true, ..self }
    }
}

/// Face buttons on the XR controllers: `X`/`Y` on the left hand, `A`/`B` on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerButton {
    A,
    B,
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    ShowTextInput,
    ToggleTextInput,
    SpawnContainer,
    Save,
    ToggleVisualize,
    CancelSelection,
    DeleteActive,
    WalkForward,
    WalkBackward,
}

/// Map a discrete key press to an editor action.
///
/// While the text input is open only `Escape` gets through, so typing
/// never triggers shortcuts.
pub fn map_key(event: KeyEvent, text_input_open: bool, visualizing: bool) -> Option<InputAction> {
    if !event.pressed || event.repeat {
        return None;
    }
    let action = match event.key {
        Key::Escape => return Some(InputAction::CancelSelection),
        _ if text_input_open => return None,
        Key::Char('t') if !event.meta => InputAction::ShowTextInput,
        Key::Char('s') if event.meta => InputAction::Save,
        Key::Char('c') => InputAction::SpawnContainer,
        Key::Char('v') => InputAction::ToggleVisualize,
        Key::Backspace | Key::Delete => InputAction::DeleteActive,
        Key::ArrowRight | Key::ArrowDown if visualizing => InputAction::WalkForward,
        Key::ArrowLeft | Key::ArrowUp if visualizing => InputAction::WalkBackward,
        _ => return None,
    };
    Some(action)
}

pub fn map_controller(button: ControllerButton, text_input_open: bool) -> Option<InputAction> {
    match button {
        ControllerButton::Y => Some(InputAction::ToggleTextInput),
        _ if text_input_open => None,
        ControllerButton::X => Some(InputAction::SpawnContainer),
        ControllerButton::B => Some(InputAction::Save),
        ControllerButton::A => Some(InputAction::ToggleVisualize),
    }
}

/// Held locomotion keys.
#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    movement: CameraMovement,
}

impl InputState {
    /// Track WASD/space/shift movement and arrow aiming. Arrows are left
    /// alone while visualizing since they drive the walk instead.
    pub fn handle_key(&mut self, event: KeyEvent, visualizing: bool) {
        let pressed = event.pressed;
        let movement = &mut self.movement;
        match event.key {
            Key::Char('w') => movement.move_forward = pressed,
            Key::Char('s') if !event.meta => movement.move_backward = pressed,
            Key::Char('a') => movement.move_left = pressed,
            Key::Char('d') => movement.move_right = pressed,
            Key::Space => movement.move_up = pressed,
            Key::Shift => movement.move_down = pressed,
            Key::ArrowLeft if !visualizing => movement.aim_left = pressed,
            Key::ArrowRight if !visualizing => movement.aim_right = pressed,
            Key::ArrowUp if !visualizing => movement.aim_up = pressed,
            Key::ArrowDown if !visualizing => movement.aim_down = pressed,
            _ => {}
        }
    }

    pub fn movement(&self) -> &CameraMovement {
        &self.movement
    }

    pub fn release_all(&mut self) {
        self.movement = CameraMovement::default();
    }
}
