//! Command handlers for the velo CLI.
//!
//! Each submodule implements one subcommand. Shared helpers like `read_file`
//! and the JSON data loader live in the module root.

use velo_plan::{Engine, Value};

mod check;
mod render;
mod tokens;

pub use check::check_file;
pub use render::render_file;
pub use tokens::tokens_file;

/// Read a file or exit with a readable message.
pub(crate) fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            let msg = match e.kind() {
                std::io::ErrorKind::NotFound => format!("cannot find file '{path}'"),
                std::io::ErrorKind::PermissionDenied => {
                    format!("permission denied reading '{path}'")
                }
                std::io::ErrorKind::InvalidData => format!("'{path}' is not valid UTF-8"),
                _ => format!("error reading '{path}': {e}"),
            };
            eprintln!("{msg}");
            std::process::exit(1);
        }
    }
}

/// Load the `--data` file, declare its variables on the engine, and return
/// the values to seed render states with. No data file means no variables.
pub(crate) fn load_inputs(engine: &Engine, data: Option<&str>) -> Vec<(String, Value)> {
    let Some(path) = data else {
        return Vec::new();
    };
    let text = read_file(path);
    let json: serde_json::Value = match serde_json::from_str(&text) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("'{path}' is not valid JSON: {e}");
            std::process::exit(1);
        }
    };
    match crate::input::declare_inputs(engine, &json) {
        Ok(values) => values,
        Err(e) => {
            eprintln!("error in '{path}': {e}");
            std::process::exit(1);
        }
    }
}
