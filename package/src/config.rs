use compactbin_codec::Limits;

/// Configuration for loading a [Package](crate::Package).
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Bounds applied to every field read from the stream.
    pub limits: Limits,

    /// Whether to verify attachment hashes across the rayon thread pool.
    pub parallel_verify: bool,
}
