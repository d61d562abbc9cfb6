//! ---
//! cz_section: "01-core-functionality"
//! cz_subsection: "build"
//! cz_type: "source"
//! cz_scope: "build"
//! cz_description: "Build metadata emission for version reporting."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    EmitBuilder::builder().all_build().all_cargo().emit()?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
