//! matchwatch: shared pieces of the binaries, JSON account registry and notification sinks.

pub mod registry_file;
pub mod sinks;

pub use registry_file::JsonFileRegistry;

/// Default on-disk registry, same file name the Discord bot used.
pub const DEFAULT_REGISTRY_PATH: &str = "registered_accounts.json";

pub fn registry_path_from_env() -> String {
    std::env::var("MATCHWATCH_REGISTRY_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REGISTRY_PATH.to_string())
}
