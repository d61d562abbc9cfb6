//! ---
//! cz_section: "01-core-functionality"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Build and version metadata reporting."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::fmt;

/// Version metadata captured at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub semver: String,
    pub build_timestamp: String,
    pub target: String,
    pub profile: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        let profile = match option_env!("VERGEN_CARGO_DEBUG") {
            Some("true") => "debug",
            Some(_) => "release",
            None => "unknown",
        };
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP")
                .unwrap_or("unknown")
                .to_owned(),
            target: option_env!("VERGEN_CARGO_TARGET_TRIPLE")
                .unwrap_or("unknown")
                .to_owned(),
            profile: profile.to_owned(),
        }
    }

    /// Short form used in log records and `--help` output.
    pub fn cli_string(&self) -> String {
        format!("{} ({})", self.semver, self.profile)
    }

    /// Multi-line form printed by `--version`.
    pub fn extended(&self) -> String {
        format!(
            "cozmonaut {}\nbuilt:   {}\ntarget:  {}\nprofile: {}",
            self.semver, self.build_timestamp, self.target, self.profile
        )
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cli_string())
    }
}
