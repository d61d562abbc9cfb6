//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "build"
//! cz_type: "source"
//! cz_scope: "build"
//! cz_description: "Resolved Rhai engine version for startup reporting."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let lockfile = manifest_dir
        .ancestors()
        .map(|dir| dir.join("Cargo.lock"))
        .find(|path| path.is_file());

    let version = lockfile
        .as_deref()
        .and_then(|path| {
            println!("cargo:rerun-if-changed={}", path.display());
            locked_version(path, "rhai")
        })
        .unwrap_or_else(|| "unknown".to_owned());

    println!("cargo:rustc-env=CZ_RHAI_VERSION={version}");
    println!("cargo:rerun-if-changed=build.rs");
}

fn locked_version(lockfile: &Path, package: &str) -> Option<String> {
    let text = fs::read_to_string(lockfile).ok()?;
    let lock: toml::Table = text.parse().ok()?;
    lock.get("package")?
        .as_array()?
        .iter()
        .find(|entry| entry.get("name").and_then(toml::Value::as_str) == Some(package))?
        .get("version")?
        .as_str()
        .map(str::to_owned)
}
