mod camera;

pub use camera::{CameraMovement, CameraRig};
