//! Static asset detection.

use crate::config::BypassConfig;

/// Decides which paths skip the gate.
#[derive(Debug, Clone)]
pub struct StaticAssetClassifier {
    prefixes: Vec<String>,
}

impl StaticAssetClassifier {
    pub fn new(config: &BypassConfig) -> Self {
        Self {
            prefixes: config.prefixes.clone(),
        }
    }

    /// True if `path` is a build asset or the favicon (plain prefix match).
    pub fn is_static(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

impl Default for StaticAssetClassifier {
    fn default() -> Self {
        Self::new(&BypassConfig::default())
    }
}
