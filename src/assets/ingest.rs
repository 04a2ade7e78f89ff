use crate::scene::{FileBundle, ImageRef, Payload};
use image::ImageFormat;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DroppedKind {
    Image,
    /// glTF binary or JSON entry point.
    Model,
}

/// Classify a dropped file by extension, case-insensitively.
pub fn classify_extension(path: &str) -> Option<DroppedKind> {
    let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "glb" | "gltf" => Some(DroppedKind::Model),
        other => match ImageFormat::from_extension(other) {
            Some(ImageFormat::Png | ImageFormat::Jpeg) => Some(DroppedKind::Image),
            _ => None,
        },
    }
}

fn is_gltf_json(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gltf"))
}

/// Turn one dropped batch of `(path, data URL)` pairs into payloads to spawn.
///
/// Every model gets the whole batch as its file bundle so sibling buffers
/// and textures resolve. When the batch carries a `.gltf`, its images are
/// assumed to be textures and are not spawned on their own.
pub fn ingest(files: &[(String, String)]) -> Vec<Payload> {
    let bundle: BTreeMap<String, String> = files
        .iter()
        .map(|(path, data_url)| (path.trim_start_matches('/').to_string(), data_url.clone()))
        .collect();
    let has_gltf = files.iter().any(|(path, _)| is_gltf_json(path));

    let mut payloads = Vec::new();
    for (path, data_url) in files {
        match classify_extension(path) {
            Some(DroppedKind::Image) if !has_gltf => {
                let name = Path::new(path)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(path)
                    .to_string();
                payloads.push(Payload::Image(ImageRef {
                    name,
                    data_url: data_url.clone(),
                }));
            }
            Some(DroppedKind::Model) => {
                let mut files = bundle.clone();
                files.insert(FileBundle::MAIN.to_string(), data_url.clone());
                payloads.push(Payload::Model(FileBundle::new(files)));
            }
            Some(DroppedKind::Image) => {}
            None => log::debug!("ignoring dropped file {path}"),
        }
    }
    log::info!("drop produced {} object(s) from {} file(s)", payloads.len(), files.len());
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> (String, String) {
        (path.to_string(), format!("data:application/octet-stream;base64,{path}"))
    }

    #[test]
    fn extensions_are_classified() {
        assert_eq!(classify_extension("/a/photo.JPG"), Some(DroppedKind::Image));
        assert_eq!(classify_extension("b.jpeg"), Some(DroppedKind::Image));
        assert_eq!(classify_extension("c.png"), Some(DroppedKind::Image));
        assert_eq!(classify_extension("d.glb"), Some(DroppedKind::Model));
        assert_eq!(classify_extension("e.gltf"), Some(DroppedKind::Model));
        assert_eq!(classify_extension("f.gif"), None);
        assert_eq!(classify_extension("noext"), None);
    }

    #[test]
    fn loose_images_become_image_objects() {
        let payloads = ingest(&[file("/cat.png"), file("/notes.txt"), file("/dog.jpg")]);
        assert_eq!(payloads.len(), 2);
        match &payloads[0] {
            Payload::Image(image) => assert_eq!(image.name, "cat.png"),
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn gltf_batch_bundles_siblings_and_skips_textures() {
        let payloads = ingest(&[
            file("/scene/model.gltf"),
            file("/scene/model.bin"),
            file("/scene/albedo.png"),
        ]);
        assert_eq!(payloads.len(), 1);
        let Payload::Model(bundle) = &payloads[0] else {
            panic!("expected model");
        };
        assert_eq!(bundle.main(), Some(file("/scene/model.gltf").1.as_str()));
        assert!(bundle.files().contains_key("scene/model.bin"));
        assert!(bundle.files().contains_key("scene/albedo.png"));
    }

    #[test]
    fn glb_does_not_suppress_images() {
        let payloads = ingest(&[file("/a.glb"), file("/b.png")]);
        assert_eq!(payloads.len(), 2);
        assert!(matches!(payloads[0], Payload::Model(_)));
        assert!(matches!(payloads[1], Payload::Image(_)));
    }
}
