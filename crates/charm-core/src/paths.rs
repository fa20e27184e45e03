use std::path::PathBuf;

/// Public charm store API endpoint used when no URL is configured.
pub const DEFAULT_STORE_URL: &str = "https://api.jujucharms.com/charmstore";

/// Returns the default archive cache directory, or None if none can be resolved.
///
/// Lookup order: `CHARMREPO_CACHE_DIR`, `$CHARMREPO_HOME/cache`, then the
/// platform cache directory (`~/.cache/charmrepo` on Linux).
pub fn try_cache_path() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("CHARMREPO_CACHE_DIR") {
        return Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("CHARMREPO_HOME") {
        return Some(PathBuf::from(val).join("cache"));
    }
    dirs::cache_dir().map(|c| c.join("charmrepo"))
}

/// Default archive cache directory.
///
/// Falls back to a directory under the system temp dir when neither the
/// environment nor the platform provide one.
pub fn cache_path() -> PathBuf {
    try_cache_path().unwrap_or_else(|| std::env::temp_dir().join("charmrepo"))
}
