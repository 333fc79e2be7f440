//! Error types for the cache engine.
//!
//! The engine error is `Clone` because a single flight's result is shared
//! verbatim with every caller that collapsed onto it.

/// Errors surfaced by group operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An empty key was passed to `get`.
    #[error("empty key")]
    EmptyKey,

    /// The named group does not exist in the registry.
    #[error("no such group: {0}")]
    NoSuchGroup(String),

    /// The caller's cancellation token fired.
    #[error("operation canceled")]
    Canceled,

    /// The user loader failed. Loader errors are returned verbatim and are
    /// never cached.
    #[error("loader: {0}")]
    Loader(String),

    /// A peer fetch failed. The engine recovers by loading locally; this
    /// variant reaches callers only from the transport layer itself.
    #[error("peer fetch: {0}")]
    PeerFetch(String),

    /// An incoming or outgoing wire message could not be decoded.
    #[error("decode: {0}")]
    Decode(String),

    /// A sink rejected the value it was given.
    #[error("sink: {0}")]
    Sink(String),
}

impl Error {
    /// Wrap a loader failure.
    pub fn loader(err: impl std::fmt::Display) -> Self {
        Self::Loader(err.to_string())
    }

    /// Wrap a peer transport failure.
    pub fn peer_fetch(err: impl std::fmt::Display) -> Self {
        Self::PeerFetch(err.to_string())
    }

    /// Wrap a wire decode failure.
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::EmptyKey.to_string(), "empty key");
        assert_eq!(
            Error::NoSuchGroup("colors".into()).to_string(),
            "no such group: colors"
        );
        assert_eq!(Error::loader("boom").to_string(), "loader: boom");
    }

    #[test]
    fn test_clone_shares_message() {
        let err = Error::peer_fetch("connection refused");
        assert_eq!(err.clone(), err);
    }
}
