//! Default locations, taken from the environment.

use dirs::home_dir;
use std::path::PathBuf;

/// Name of the override table read from the working directory.
pub const PROPERTIES_FILE: &str = "fig.properties";

/// Returns the local repository root, or None if the user's home cannot be resolved.
pub fn try_fig_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("FIG_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".fighome"))
}

/// Default figrc location: `~/.figrc`
pub fn default_figrc_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".figrc"))
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_segment() {
        assert_eq!(filename_from_url("http://host/a/b.tar.gz"), "b.tar.gz");
        assert_eq!(filename_from_url("plain.jar"), "plain.jar");
        assert_eq!(filename_from_url("http://host/dir/"), "");
    }
}
