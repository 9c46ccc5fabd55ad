//! The `render` command: compile a template and print its output.

use velo_plan::{Engine, EngineOptions, FnRegistry};

use super::{load_inputs, read_file};

/// Compile a template, seed one render state from the JSON data, and write
/// the rendered output to stdout.
pub fn render_file(path: &str, data: Option<&str>, escape: bool) {
    let source = read_file(path);

    let options = EngineOptions {
        html_escape: escape,
        ..EngineOptions::default()
    };
    let engine = Engine::new(options, FnRegistry::with_builtins());
    let values = load_inputs(&engine, data);

    let plan = match engine.compile(&source) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let mut state = plan.new_state();
    for (name, value) in values {
        if let Err(e) = state.set_value(&name, value) {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
    plan.exec(&mut state);

    // Template output is byte-accurate, so no trailing newline is added.
    print!("{}", state.output());
}
