/// typed errors for the conditions callers are expected to match on.
///
/// Everything else (store channels, serialization, database failures) travels
/// as `anyhow::Error`.
///
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// a provider was requested before `ApplicationLogic::initialize` ran
    #[error("application logic needs to be initialized before accessing the {0} provider")]
    NotInitialized(&'static str),

    /// a store supervisor was asked to run without workers
    #[error("a store supervisor needs at least one worker")]
    EmptyPool,
}
