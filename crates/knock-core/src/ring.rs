use crate::constants::MAX_RECENT_TESTS;
use crate::types::Nonce;
use arrayvec::ArrayVec;

/// A FIFO of the nonces of recent locally-initiated tests.
///
/// Used to recognise packets that arrive after a local test has ended and to
/// stop spoofed traffic from reviving a completed nonce as a helper duty.
#[derive(Debug, Default)]
pub(crate) struct RecentNonces {
    nonces: ArrayVec<Nonce, MAX_RECENT_TESTS>,
}

impl RecentNonces {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a nonce, evicting the oldest entry when full.
    pub(crate) fn push(&mut self, nonce: Nonce) {
        if self.nonces.is_full() {
            self.nonces.remove(0);
        }
        self.nonces.push(nonce);
    }

    pub(crate) fn contains(&self, nonce: Nonce) -> bool {
        self.nonces.contains(&nonce)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nonces.len()
    }
}
