//! Part Inspector - glTF model viewer for looking up part metadata
//!
//! - Loads a glTF/GLB model given on the command line, in the config file or
//!   through the "Open model…" dialog
//! - Click a part to highlight it and list its metadata
//! - Search part names to focus and select a part

mod app;
mod assets;
mod config;
mod render;
mod scene;
mod ui;

fn main() {
    app::run();
}
