//! Limits applied when reading untrusted fields.

/// Default upper bound on the serialized size of a single field (64 MiB).
pub const DEFAULT_MAX_SIZE: usize = 64 * 1024 * 1024;

/// Default upper bound on container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Bounds on the resources a single field may consume while it is loaded and validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// The maximum serialized size of a field, in bytes.
    ///
    /// Loads fail before allocating if the measured size exceeds this value.
    pub max_size: usize,

    /// The maximum depth of nested arrays and objects.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Limits {
    /// Returns `true` if `size` bytes may be allocated for one field.
    pub fn allows(&self, size: usize) -> bool {
        size <= self.max_size
    }
}
