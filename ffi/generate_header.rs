use std::{env, fs, path::PathBuf};

use cbindgen::{Config, generate_with_config};

fn main() {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let header = crate_dir.join("include").join("zylix.h");
    println!("⌛️ Generating bindings...");
    let config =
        Config::from_file(crate_dir.join("cbindgen.toml")).expect("failed to load cbindgen.toml");
    if let Some(parent) = header.parent() {
        fs::create_dir_all(parent).expect("failed to create include directory");
    }
    generate_with_config(&crate_dir, config)
        .expect("Unable to generate bindings")
        .write_to_file(&header);
    println!("✅ Bindings generated at {}", header.display());
}
