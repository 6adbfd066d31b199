/// in-memory key/value store with sliding expiration.
/// use cases:
/// * short-term application cache behind the default cache provider
/// * per-session state behind the default session provider
///
/// Values are JSON strings; typed access serializes at the provider boundary.
/// A supervisor owns a fixed pool of workers and routes each key to one of them,
/// so every worker handles its share of the keys without locking.
///
pub mod supervisor;
pub mod worker;
