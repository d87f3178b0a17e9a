//! Error types for the reconciliation tracker.

use thiserror::Error;

/// Why a peer registration was rejected.
///
/// All of these originate from untrusted remote input or caller ordering
/// mistakes; none of them corrupt tracker state, and none are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// The negotiated protocol version is zero. The caller should treat the
    /// peer as misbehaving and disconnect it.
    #[error("protocol violation: negotiated reconciliation version is zero")]
    ProtocolViolation,

    /// The peer is already registered. A duplicate handshake message can be
    /// ignored.
    #[error("peer is already registered for reconciliation")]
    AlreadyRegistered,

    /// No pre-registration exists for this peer id. Registration must be
    /// preceded by pre-registration on the same id.
    #[error("peer was not pre-registered")]
    NotFound,
}
