use std::ffi::OsString;
use std::path::PathBuf;

use tracing::info;

/// Name of the configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "slitscan.toml";

/// Configuration file to load: the first argument, else `slitscan.toml` when present.
pub fn config_path(arg: Option<OsString>) -> Option<PathBuf> {
    if let Some(arg) = arg {
        return Some(PathBuf::from(arg));
    }
    let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
    if fallback.is_file() {
        info!("Using {}", fallback.display());
        return Some(fallback);
    }
    None
}

/// File name of the `sequence`th output frame, zero padded so files sort in order
pub fn frame_file_name(prefix: &str, sequence: u64) -> String {
    format!("{prefix}_{sequence:06}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_argument_wins() {
        let path = config_path(Some(OsString::from("custom.toml")));
        assert_eq!(path, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn frame_names_sort_numerically() {
        assert_eq!(frame_file_name("output", 7), "output_000007.png");
        assert!(frame_file_name("output", 99) < frame_file_name("output", 100));
    }
}
