//! Holos editor shell.
//!
//! Opens the JSON store named by the first argument (default `holos.json`),
//! restores every saved hierarchy and then reads editor commands from stdin:
//!
//! - `text <words>` adds text or an emoji to the selection
//! - `container` spawns a container
//! - `select <id>` clicks an object, `cancel` clears the selection
//! - `delete`, `save`, `visualize`, `next`, `prev`
//! - `tree` prints the scene, `quit` exits

use glam::Vec2;
use holos::app::{Editor, Hit, InputAction};
use holos::assets::PlaceholderLoader;
use holos::config::EditorConfig;
use holos::scene::hierarchy::preorder;
use holos::scene::wrapper::InputSource;
use holos::scene::Scene;
use holos::store::JsonFileStore;
use std::io::BufRead;
use std::path::Path;

fn load_config() -> EditorConfig {
    let Some(path) = std::env::var_os("HOLOS_CONFIG") else {
        return EditorConfig::default();
    };
    match EditorConfig::from_json_file(Path::new(&path)) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("ignoring config {}: {err}", Path::new(&path).display());
            EditorConfig::default()
        }
    }
}

fn print_tree(scene: &Scene) {
    for root in scene.roots() {
        for node in preorder(scene, *root) {
            let Some(object) = scene.get(node) else {
                continue;
            };
            let mut depth = 0;
            let mut parent = object.parent();
            while let Some(ancestor) = parent {
                depth += 1;
                parent = scene.get(ancestor).and_then(|object| object.parent());
            }
            let marker = if object.is_active() { "*" } else { " " };
            println!(
                "{marker}{:indent$}{} [{}] {:?}",
                "",
                object.id(),
                object.kind().as_str(),
                object.transform.position.to_array(),
                indent = depth * 2
            );
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = load_config();
    let store_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "holos.json".to_string());
    let store = match JsonFileStore::open(&store_path) {
        Ok(store) => store,
        Err(err) => {
            log::error!("cannot open store {store_path}: {err}");
            std::process::exit(1);
        }
    };

    let mut editor = Editor::new(config, store, PlaceholderLoader);
    match pollster::block_on(editor.load_all()) {
        Ok(roots) => log::info!(
            "{} hierarchies ready, {} objects",
            roots.len(),
            editor.scene().len()
        ),
        Err(err) => log::warn!("startup load failed: {err}"),
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("failed to read input: {err}");
                break;
            }
        };
        let (command, rest) = line.trim().split_once(' ').unwrap_or((line.trim(), ""));
        match command {
            "" => {}
            "quit" | "exit" => break,
            "text" => {
                pollster::block_on(editor.apply(InputAction::ShowTextInput));
                pollster::block_on(editor.submit_text(rest));
            }
            "container" => pollster::block_on(editor.apply(InputAction::SpawnContainer)),
            "select" => match editor.scene().find(rest.trim()) {
                Some(node) => {
                    let hit = Hit { node, handle: None };
                    editor.press(InputSource::Pointer, Some(hit), Vec2::ZERO);
                }
                None => log::warn!("no object {}", rest.trim()),
            },
            "cancel" => pollster::block_on(editor.apply(InputAction::CancelSelection)),
            "delete" => pollster::block_on(editor.apply(InputAction::DeleteActive)),
            "save" => match editor.save() {
                Ok(outcome) => log::info!("{outcome:?}"),
                Err(err) => log::warn!("save failed: {err}"),
            },
            "visualize" => pollster::block_on(editor.apply(InputAction::ToggleVisualize)),
            "next" => pollster::block_on(editor.apply(InputAction::WalkForward)),
            "prev" => pollster::block_on(editor.apply(InputAction::WalkBackward)),
            "tree" => print_tree(editor.scene()),
            other => log::warn!("unknown command {other:?}"),
        }
    }
}
