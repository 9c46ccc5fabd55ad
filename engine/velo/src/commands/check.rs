//! The `check` command: compile a template without rendering it.

use velo_plan::{Engine, EngineOptions, FnRegistry};

use super::{load_inputs, read_file};

/// Compile a template and report success or the compile error.
///
/// Undeclared references only fail compilation when they feed an expression,
/// so checking with the same `--data` file used for rendering gives the most
/// faithful answer.
pub fn check_file(path: &str, data: Option<&str>) {
    let source = read_file(path);

    let engine = Engine::new(EngineOptions::default(), FnRegistry::with_builtins());
    let values = load_inputs(&engine, data);

    match engine.compile(&source) {
        Ok(_) => println!("OK: {path} ({} variables)", values.len()),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
