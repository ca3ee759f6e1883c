//! Stale-response suppression for reloads that may be overtaken by a newer action.

/// Ticket handed out when a request starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestTicket(u64);

/// Monotonic request counter. Only the most recently issued ticket is current.
#[derive(Clone, Debug, Default)]
pub struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier ticket.
    pub fn issue(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }
}
