//! Load a content set and dump every resolved template as JSON.
//!
//! Usage: dump_templates <rules_dir>... [--deltas <dir>] [--lenient]

use std::path::PathBuf;

use unitsmith::content::load_content;
use unitsmith::core::config::{ContentConfig, LoadPolicy};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut config = ContentConfig::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--deltas" => match args.next() {
                Some(dir) => config.map_delta_dir = Some(PathBuf::from(dir)),
                None => {
                    eprintln!("--deltas needs a directory argument");
                    std::process::exit(2);
                }
            },
            "--lenient" => config.policy = LoadPolicy::Lenient,
            dir => config.rule_dirs.push(PathBuf::from(dir)),
        }
    }

    if config.rule_dirs.is_empty() {
        eprintln!("Usage: dump_templates <rules_dir>... [--deltas <dir>] [--lenient]");
        std::process::exit(2);
    }

    for dir in &config.rule_dirs {
        if !dir.exists() {
            eprintln!("Rule directory not found: {:?}", dir);
            std::process::exit(1);
        }
    }

    let loaded = match load_content(&config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load content: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = loaded.registry.resolve_all() {
        eprintln!("Resolution failed: {}", e);
        std::process::exit(1);
    }

    for identity in loaded.registry.identities() {
        let resolved = match loaded.overrides.effective(&loaded.registry, &identity) {
            Ok(resolved) => resolved,
            Err(e) => {
                eprintln!("Failed to resolve {}: {}", identity, e);
                std::process::exit(1);
            }
        };
        match serde_json::to_string_pretty(&*resolved) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize {}: {}", identity, e);
                std::process::exit(1);
            }
        }
    }

    println!(
        "\nLoaded {} templates and {} reskins ({} skipped), {} map overrides",
        loaded.summary.templates,
        loaded.summary.reskins,
        loaded.summary.skipped,
        loaded.overrides.len()
    );
}
