use crate::domain::revision::ProtocolRevision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Unnegotiated,
    Negotiated(ProtocolRevision),
}

/// Per-connection record of which protocol revision the peer asked for.
///
/// The first handshake fixes the revision for the life of the connection.
/// Reads before any handshake see [`ProtocolRevision::Modern`] without
/// changing the stored state.
#[derive(Debug, Clone, Default)]
pub struct ProtocolNegotiator {
    state: NegotiationState,
}

impl ProtocolNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the claimed revision and returns the one in effect. A second
    /// handshake does not renegotiate; the original revision is returned.
    pub fn negotiate(&mut self, claimed: &str) -> ProtocolRevision {
        match self.state {
            NegotiationState::Negotiated(existing) => existing,
            NegotiationState::Unnegotiated => {
                let revision = ProtocolRevision::from_claim(claimed);
                self.state = NegotiationState::Negotiated(revision);
                revision
            }
        }
    }

    pub fn revision(&self) -> ProtocolRevision {
        match self.state {
            NegotiationState::Negotiated(revision) => revision,
            NegotiationState::Unnegotiated => ProtocolRevision::Modern,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_negotiated(&self) -> bool {
        matches!(self.state, NegotiationState::Negotiated(_))
    }
}
