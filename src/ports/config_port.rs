//! Configuration access port trait.

/// Read-only view over sectioned key/value settings.
pub trait ConfigPort {
    /// Raw value of `key` in `section`, if present.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Every key present in `section`, sorted.
    fn keys(&self, section: &str) -> Vec<String>;
}
