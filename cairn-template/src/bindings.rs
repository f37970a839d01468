//! Template bindings
//!
//! A template sees exactly two maps: `env` (the build environment supplied by
//! the caller) and `sys` (a fixed set of system properties). Both are exposed
//! through [`VarProvider`] so callers can plug in their own sources.

use std::collections::HashMap;

/// Trait for providing template variables
///
/// Implement this trait to provide custom variable lookup behavior.
///
/// # Thread Safety
/// Implementations must be Send + Sync so a sandbox can be shared across
/// concurrent builds.
pub trait VarProvider: Send + Sync {
    /// Get a variable by name
    ///
    /// # Returns
    /// The variable value if it exists, otherwise None
    fn get(&self, name: &str) -> Option<String>;
}

impl VarProvider for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Read-only system properties available as `sys`
///
/// The snapshot is taken once, when the properties are captured, and only
/// contains the keys listed in [`SystemProperties::KEYS`].
#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    values: HashMap<String, String>,
}

impl SystemProperties {
    /// Property names exposed to templates
    pub const KEYS: [&'static str; 9] = [
        "os.name",
        "os.arch",
        "os.family",
        "file.separator",
        "path.separator",
        "line.separator",
        "user.name",
        "user.home",
        "user.dir",
    ];

    /// Captures the properties of the current process
    pub fn capture() -> Self {
        let mut values = HashMap::new();

        values.insert("os.name".to_string(), std::env::consts::OS.to_string());
        values.insert("os.arch".to_string(), std::env::consts::ARCH.to_string());
        values.insert("os.family".to_string(), std::env::consts::FAMILY.to_string());
        values.insert(
            "file.separator".to_string(),
            std::path::MAIN_SEPARATOR.to_string(),
        );
        values.insert(
            "path.separator".to_string(),
            if cfg!(windows) { ";" } else { ":" }.to_string(),
        );
        values.insert(
            "line.separator".to_string(),
            if cfg!(windows) { "\r\n" } else { "\n" }.to_string(),
        );

        if let Some(user) = std::env::var("USER")
            .ok()
            .or_else(|| std::env::var("USERNAME").ok())
        {
            values.insert("user.name".to_string(), user);
        }
        if let Some(home) = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())
        {
            values.insert("user.home".to_string(), home);
        }
        if let Ok(dir) = std::env::current_dir() {
            values.insert("user.dir".to_string(), dir.display().to_string());
        }

        Self { values }
    }

    /// Builds a fixed set of properties
    ///
    /// Keys outside [`SystemProperties::KEYS`] are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| Self::KEYS.contains(&k.as_str()))
            .collect();
        Self { values }
    }
}

impl VarProvider for SystemProperties {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_provider() {
        let mut vars = HashMap::new();
        vars.insert("JOB_NAME".to_string(), "nightly".to_string());

        assert_eq!(VarProvider::get(&vars, "JOB_NAME"), Some("nightly".to_string()));
        assert_eq!(VarProvider::get(&vars, "MISSING"), None);
    }

    #[test]
    fn test_capture_exposes_only_known_keys() {
        let sys = SystemProperties::capture();
        assert_eq!(sys.get("os.name"), Some(std::env::consts::OS.to_string()));
        for key in sys.values.keys() {
            assert!(SystemProperties::KEYS.contains(&key.as_str()), "{}", key);
        }
    }

    #[test]
    fn test_from_pairs_filters_unknown_keys() {
        let sys = SystemProperties::from_pairs([("os.name", "linux"), ("secret.token", "x")]);
        assert_eq!(sys.get("os.name"), Some("linux".to_string()));
        assert_eq!(sys.get("secret.token"), None);
    }
}
