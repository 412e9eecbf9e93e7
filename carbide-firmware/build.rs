//! Build script for carbide-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates controller.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use carbide_core::config::ControllerConfig;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate controller.toml against the configuration types
///
/// The firmware reads the same file at boot with a small no_std parser.
/// Catching mistakes here keeps a broken file from silently falling back
/// to defaults on the bench.
fn validate_config() {
    println!("cargo:rerun-if-changed=controller.toml");

    let config_path = Path::new("controller.toml");
    if !config_path.exists() {
        fail(
            "controller.toml not found",
            &["The firmware embeds controller.toml from the crate directory.".into()],
        );
    }

    let text = match fs::read_to_string(config_path) {
        Ok(text) => text,
        Err(e) => fail("Cannot read controller.toml", &[e.to_string()]),
    };

    let config: ControllerConfig = match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => fail(
            "Invalid controller.toml",
            &e.message().lines().map(String::from).collect::<Vec<_>>(),
        ),
    };

    if let Err(e) = config.validate() {
        fail(
            "Inconsistent controller.toml",
            &[format!("validation failed: {:?}", e)],
        );
    }

    let mut warnings = Vec::new();
    if !config.blower.enabled {
        warnings.push("blower interlock disabled");
    }
    if !config.protocol.rs485_enabled && !config.protocol.telemetry_enabled {
        warnings.push("both serial transports disabled");
    }
    for warning in warnings {
        println!("cargo:warning=controller.toml: {}", warning);
    }
}

fn fail(title: &str, details: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<57}║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        details
            .iter()
            .map(|d| format!("║  • {:<62} ║", d))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
