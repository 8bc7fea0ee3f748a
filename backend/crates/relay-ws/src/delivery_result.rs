use crate::ConnectionId;

/// Outcome of sending one frame to a user or a team
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    /// Every targeted connection accepted the frame
    Delivered(usize),
    /// Nobody was connected
    NoRecipient,
    /// Some connections failed and were dropped from the registry
    PartialFailure {
        delivered: usize,
        failed: Vec<ConnectionId>,
    },
}

impl DeliveryResult {
    pub(crate) fn from_attempts(delivered: usize, failed: Vec<ConnectionId>) -> Self {
        match (delivered, failed.is_empty()) {
            (0, true) => Self::NoRecipient,
            (n, true) => Self::Delivered(n),
            (n, false) => Self::PartialFailure {
                delivered: n,
                failed,
            },
        }
    }

    pub fn delivered_count(&self) -> usize {
        match self {
            Self::Delivered(n) => *n,
            Self::NoRecipient => 0,
            Self::PartialFailure { delivered, .. } => *delivered,
        }
    }

    pub fn failed(&self) -> &[ConnectionId] {
        match self {
            Self::PartialFailure { failed, .. } => failed,
            _ => &[],
        }
    }

    /// Combine per-user results into one team result
    pub fn merge(self, other: Self) -> Self {
        let delivered = self.delivered_count() + other.delivered_count();
        let mut failed = self.failed().to_vec();
        failed.extend_from_slice(other.failed());
        Self::from_attempts(delivered, failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered(_) => "delivered",
            Self::NoRecipient => "no_recipient",
            Self::PartialFailure { .. } => "partial_failure",
        }
    }
}
