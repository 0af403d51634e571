//! Queue name resolution.

/// Maps a base queue name to the physical name of its active or poison queue.
pub trait QueueNameResolver: Send + Sync {
    /// Resolves the queue name for `base`, or for its dead-letter queue when
    /// `is_poison` is set.
    fn resolve(&self, base: &str, is_poison: bool) -> String;
}

/// Resolver appending a fixed suffix for dead-letter queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoisonSuffixResolver {
    suffix: String,
}

impl PoisonSuffixResolver {
    /// Suffix used unless configured otherwise.
    pub const DEFAULT_SUFFIX: &'static str = "-poison";

    /// Creates a resolver with the given suffix.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Returns the configured suffix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Default for PoisonSuffixResolver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SUFFIX)
    }
}

impl QueueNameResolver for PoisonSuffixResolver {
    fn resolve(&self, base: &str, is_poison: bool) -> String {
        if is_poison {
            format!("{}{}", base, self.suffix)
        } else {
            base.to_string()
        }
    }
}
