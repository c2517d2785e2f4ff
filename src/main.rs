use erdconvert::input::Source;
use erdconvert::registry::Registry;
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_OUTPUT_FORMAT: &str = "sql";

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <input> [options]", program);
    eprintln!("       {} --list", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -f, --from <format>     Input format (default: input file extension)");
    eprintln!("  -t, --to <format>       Output format (default: {})", DEFAULT_OUTPUT_FORMAT);
    eprintln!("  -o, --output <file>     Output file (default: stdout)");
    eprintln!("  -d, --database <name>   Database name for DDL output");
    eprintln!("      --force             Overwrite an existing output file");
    process::exit(1);
}

fn list_formats(registry: &Registry) {
    println!("Input formats:");
    for parser in registry.parsers() {
        println!("  {:<6} {}", parser.file_extension(), parser.product_name());
    }
    println!("Output formats:");
    for builder in registry.builders() {
        let note = if builder.requires_database_name() {
            " (requires --database)"
        } else {
            ""
        };
        println!("  {:<6} {}{}", builder.file_extension(), builder.product_name(), note);
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();
    let registry = Registry::default();

    if args.len() < 2 {
        usage(&args[0]);
    }
    if args[1] == "--list" {
        list_formats(&registry);
        return;
    }

    let input_path = &args[1];
    let mut from: Option<String> = None;
    let mut to = DEFAULT_OUTPUT_FORMAT.to_string();
    let mut output_path: Option<String> = None;
    let mut database: Option<String> = None;
    let mut force = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-f" | "--from" => {
                i += 1;
                if i < args.len() {
                    from = Some(args[i].clone());
                }
            }
            "-t" | "--to" => {
                i += 1;
                if i < args.len() {
                    to = args[i].clone();
                }
            }
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-d" | "--database" => {
                i += 1;
                if i < args.len() {
                    database = Some(args[i].clone());
                }
            }
            "--force" => force = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let from = match from {
        Some(f) => f,
        None => match registry.parser_for_path(Path::new(input_path)) {
            Some(p) => p.file_extension().to_string(),
            None => {
                eprintln!("Cannot tell the input format of {}; use --from", input_path);
                process::exit(1);
            }
        },
    };

    if let Some(path) = &output_path {
        if Path::new(path).exists() && !force {
            eprintln!("{} already exists; use --force to overwrite it", path);
            process::exit(1);
        }
    }

    let output = match registry.convert(Source::file(input_path), &from, &to, database.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Conversion failed: {}", e);
            process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &output) {
                eprintln!("Failed to write {}: {}", path, e);
                process::exit(1);
            }
            tracing::info!(path = %path, "wrote output");
        }
        None => print!("{}", output),
    }
}
