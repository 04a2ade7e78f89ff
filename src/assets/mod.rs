mod ingest;

pub use ingest::{classify_extension, ingest, DroppedKind};

use crate::scene::{Aabb, FileBundle, ImageRef, Payload};
use glam::Vec3;
use std::future::Future;
use unicode_segmentation::UnicodeSegmentation;

/// Result of building an object's visual payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedVisual {
    /// Local-space bounds of the produced visual.
    pub bounds: Aabb,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
    #[error("unsupported asset: {0}")]
    Unsupported(String),
}

/// Object-construction boundary. Implementations turn a payload into a
/// renderable visual; kinds that need decoding resolve later.
pub trait AssetLoader {
    fn load(
        &self,
        id: &str,
        payload: &Payload,
    ) -> impl Future<Output = Result<LoadedVisual, AssetError>>;
}

/// Loader that validates payloads and sizes visuals without a renderer.
///
/// Text is laid out on a one-unit-wide plane: the glyph size follows the
/// wrap width (length plus one, capped at 24 glyphs), so longer text gets
/// smaller glyphs. Emoji and images get a half-unit plane and models a unit cube.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderLoader;

const TEXT_WIDTH: f32 = 1.0;
const TEXT_MAX_WRAP: usize = 24;
const GLYPH_SIZE: f32 = 0.5;

impl AssetLoader for PlaceholderLoader {
    fn load(
        &self,
        id: &str,
        payload: &Payload,
    ) -> impl Future<Output = Result<LoadedVisual, AssetError>> {
        let result = measure(payload);
        if let Err(err) = &result {
            log::warn!("asset for {id} failed to load: {err}");
        }
        std::future::ready(result)
    }
}

fn measure(payload: &Payload) -> Result<LoadedVisual, AssetError> {
    let size = match payload {
        Payload::Container => {
            return Err(AssetError::Unsupported(
                "containers are built by the scene, not the loader".into(),
            ))
        }
        Payload::Text(text) => text_plane(text)?,
        Payload::Emoji(emoji) => {
            if !is_single_emoji(emoji) {
                return Err(AssetError::Unsupported(format!("not a single emoji: {emoji:?}")));
            }
            log::debug!("emoji glyph emojis/{}.svg", emoji_to_hex(emoji));
            Vec3::new(GLYPH_SIZE, GLYPH_SIZE, GLYPH_SIZE * 0.2)
        }
        Payload::Image(image) => {
            image_format(image)?;
            Vec3::new(GLYPH_SIZE, GLYPH_SIZE, 0.0)
        }
        Payload::Model(bundle) => {
            model_entry(bundle)?;
            Vec3::ONE
        }
    };
    Ok(LoadedVisual {
        bounds: Aabb::from_center_size(Vec3::ZERO, size),
    })
}

fn text_plane(text: &str) -> Result<Vec3, AssetError> {
    let chars = text.graphemes(true).count();
    if chars == 0 {
        return Err(AssetError::Decode {
            what: "text",
            reason: "empty string".into(),
        });
    }
    let wrap = (chars + 1).min(TEXT_MAX_WRAP);
    let lines = chars.div_ceil(wrap);
    let line_height = TEXT_WIDTH / wrap as f32 * 1.5;
    Ok(Vec3::new(TEXT_WIDTH, line_height * lines as f32, 0.0))
}

fn image_format(image: &ImageRef) -> Result<image::ImageFormat, AssetError> {
    let url = DataUrl::parse(&image.data_url).ok_or_else(|| AssetError::Decode {
        what: "image",
        reason: format!("{} is not a data URL", image.name),
    })?;
    match image::ImageFormat::from_mime_type(url.mime) {
        Some(format @ (image::ImageFormat::Png | image::ImageFormat::Jpeg)) => Ok(format),
        _ => Err(AssetError::Unsupported(format!(
            "{} has media type {}",
            image.name, url.mime
        ))),
    }
}

fn model_entry(bundle: &FileBundle) -> Result<DataUrl<'_>, AssetError> {
    let main = bundle.main().ok_or_else(|| AssetError::Decode {
        what: "model",
        reason: "bundle has no main entry".into(),
    })?;
    DataUrl::parse(main).ok_or_else(|| AssetError::Decode {
        what: "model",
        reason: "main entry is not a data URL".into(),
    })
}

/// `data:<mime>[;base64],<payload>` split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime: &'a str,
    pub base64: bool,
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    pub fn parse(url: &'a str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let (header, base64) = match header.strip_suffix(";base64") {
            Some(header) => (header, true),
            None => (header, false),
        };
        let mime = header.split(';').next().unwrap_or_default();
        Some(Self {
            mime: if mime.is_empty() { "text/plain" } else { mime },
            base64,
            payload,
        })
    }
}

/// True when `text` is exactly one grapheme and that grapheme is an emoji.
pub fn is_single_emoji(text: &str) -> bool {
    let mut graphemes = text.graphemes(true);
    match (graphemes.next(), graphemes.next()) {
        (Some(grapheme), None) => grapheme.chars().any(is_emoji_scalar),
        _ => false,
    }
}

fn is_emoji_scalar(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F000..=0x1FAFF
            | 0x2600..=0x27BF
            | 0x2300..=0x23FF
            | 0x2B00..=0x2BFF
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0x203C
            | 0x2049
    )
}

/// Glyph file key for an emoji: lowercase hex code points joined by `-`.
pub fn emoji_to_hex(emoji: &str) -> String {
    emoji
        .chars()
        .map(|c| format!("{:x}", u32::from(c)))
        .collect::<Vec<_>>()
        .join("-")
}

/// Turn submitted text into a payload. Blank input yields nothing.
pub fn classify_text(text: &str) -> Option<Payload> {
    if text.trim().is_empty() {
        return None;
    }
    if is_single_emoji(text) {
        Some(Payload::Emoji(text.to_string()))
    } else {
        Some(Payload::Text(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn single_emoji_detection() {
        assert!(is_single_emoji("😀"));
        assert!(is_single_emoji("👍🏽"));
        assert!(is_single_emoji("👨‍👩‍👧"));
        assert!(is_single_emoji("🇯🇵"));
        assert!(!is_single_emoji("😀😀"));
        assert!(!is_single_emoji("hi"));
        assert!(!is_single_emoji("a"));
        assert!(!is_single_emoji(""));
    }

    #[test]
    fn emoji_hex_matches_glyph_names() {
        assert_eq!(emoji_to_hex("😀"), "1f600");
        assert_eq!(emoji_to_hex("👍🏽"), "1f44d-1f3fd");
        assert_eq!(emoji_to_hex("❤️"), "2764-fe0f");
    }

    #[test]
    fn text_classification() {
        assert_eq!(classify_text("😀"), Some(Payload::Emoji("😀".into())));
        assert_eq!(classify_text("hello"), Some(Payload::Text("hello".into())));
        assert_eq!(classify_text("   "), None);
    }

    #[test]
    fn data_url_parts() {
        let url = DataUrl::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(url.mime, "image/png");
        assert!(url.base64);
        assert_eq!(url.payload, "iVBORw0KGgo=");
        let plain = DataUrl::parse("data:,hello").unwrap();
        assert_eq!(plain.mime, "text/plain");
        assert!(!plain.base64);
        assert!(DataUrl::parse("https://example.com/a.png").is_none());
    }

    #[test]
    fn placeholder_loader_sizes_visuals() {
        let loader = PlaceholderLoader;
        let text = pollster::block_on(loader.load("t", &Payload::Text("hi".into()))).unwrap();
        assert_eq!(text.bounds.size().x, TEXT_WIDTH);
        assert!(text.bounds.size().y > 0.0);

        // Short text gets large glyphs on one line.
        assert!((text.bounds.size().y - 0.5).abs() < 1e-6);

        // Long text wraps at 24 glyphs, so its glyphs shrink and the lines stack.
        let long = "a long line of text that has to wrap over several lines";
        let long = pollster::block_on(loader.load("l", &Payload::Text(long.into()))).unwrap();
        assert_eq!(long.bounds.size().x, TEXT_WIDTH);
        let line_height = TEXT_WIDTH / TEXT_MAX_WRAP as f32 * 1.5;
        assert!((long.bounds.size().y - 3.0 * line_height).abs() < 1e-6);

        let image = Payload::Image(ImageRef {
            name: "cat.png".into(),
            data_url: "data:image/png;base64,AAAA".into(),
        });
        assert!(pollster::block_on(loader.load("i", &image)).is_ok());
    }

    #[test]
    fn placeholder_loader_reports_failures() {
        let loader = PlaceholderLoader;
        let bad_image = Payload::Image(ImageRef {
            name: "anim.gif".into(),
            data_url: "data:image/gif;base64,AAAA".into(),
        });
        assert!(matches!(
            pollster::block_on(loader.load("i", &bad_image)),
            Err(AssetError::Unsupported(_))
        ));

        let empty_bundle = Payload::Model(FileBundle::new(BTreeMap::new()));
        assert!(matches!(
            pollster::block_on(loader.load("m", &empty_bundle)),
            Err(AssetError::Decode { what: "model", .. })
        ));
        assert!(pollster::block_on(loader.load("e", &Payload::Emoji("no".into()))).is_err());
    }
}
