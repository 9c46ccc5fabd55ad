//! Velo template engine CLI.

mod commands;
mod input;

use commands::{check_file, render_file, tokens_file};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "render" => {
            let Some(opts) = RenderArgs::parse(&args[2..]) else {
                eprintln!("Usage: velo render <file.vtl> [--data <file.json>] [--escape]");
                std::process::exit(1);
            };
            render_file(&opts.path, opts.data.as_deref(), opts.escape);
        }
        "check" => {
            let Some(opts) = RenderArgs::parse(&args[2..]) else {
                eprintln!("Usage: velo check <file.vtl> [--data <file.json>]");
                std::process::exit(1);
            };
            check_file(&opts.path, opts.data.as_deref());
        }
        "tokens" => {
            if args.len() < 3 {
                eprintln!("Usage: velo tokens <file.vtl>");
                std::process::exit(1);
            }
            tokens_file(&args[2]);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("velo {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

/// Options shared by `render` and `check`.
struct RenderArgs {
    path: String,
    data: Option<String>,
    escape: bool,
}

impl RenderArgs {
    /// Hand-parsed flags; `None` means the usage line should be printed.
    fn parse(args: &[String]) -> Option<RenderArgs> {
        let mut path = None;
        let mut data = None;
        let mut escape = false;

        let mut i = 0;
        while i < args.len() {
            if args[i] == "--data" && i + 1 < args.len() {
                data = Some(args[i + 1].clone());
                i += 2;
            } else if args[i] == "--escape" {
                escape = true;
                i += 1;
            } else if !args[i].starts_with('-') && path.is_none() {
                path = Some(args[i].clone());
                i += 1;
            } else {
                eprintln!("error: unknown option '{}'", args[i]);
                return None;
            }
        }

        Some(RenderArgs {
            path: path?,
            data,
            escape,
        })
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if VELO_LOG is set
    if std::env::var("VELO_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(EnvFilter::from_env("VELO_LOG"))
            .init();
    }
}

fn print_usage() {
    println!("Velo template engine");
    println!();
    println!("Usage: velo <command> [options]");
    println!();
    println!("Commands:");
    println!("  render <file.vtl>    Render a template to stdout");
    println!("  check <file.vtl>     Compile a template without rendering it");
    println!("  tokens <file.vtl>    Tokenize and display tokens");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Render options:");
    println!("  --data <file.json>   Template variables as a JSON object");
    println!("  --escape             HTML-escape interpolated values");
    println!();
    println!("Set VELO_LOG (e.g. VELO_LOG=debug) to enable engine tracing.");
}
