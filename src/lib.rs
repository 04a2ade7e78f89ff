//! Holos: a spatial editor core for arranging text, emoji, images and 3D
//! models inside nestable containers with stacked depth layers.

pub mod app;
pub mod assets;
pub mod config;
pub mod holo;
pub mod render;
pub mod scene;
pub mod store;
