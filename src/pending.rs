//! Pending-operation tokens.
//!
//! A launch registers its request under a fresh [`Token`] and hands the
//! caller a [`PendingTransfer`]. When the host delivers the picker result the
//! entry is *removed* from the registry, so a second delivery for the same
//! token finds nothing. The removed [`Resolver`] can send exactly one
//! outcome; if it is dropped unsent it sends a failure instead, so the
//! caller never waits forever and never sees two outcomes.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, warn};

use crate::transfer::TransferOutcome;

/// Identifies one launched picker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for Token {
    fn from(v: u64) -> Self {
        Token(v)
    }
}

const ABANDONED: &str = "operation abandoned before a result was delivered";

/// Caller side of a launched operation.
#[derive(Debug)]
pub struct PendingTransfer {
    token: Token,
    rx: Receiver<TransferOutcome>,
}

impl PendingTransfer {
    pub fn token(&self) -> Token {
        self.token
    }

    /// Block until the outcome arrives.
    pub fn wait(self) -> TransferOutcome {
        self.rx.recv().unwrap_or_else(|_| TransferOutcome::failed(ABANDONED))
    }

    /// Block for at most `timeout`. On expiry nothing is resolved and the
    /// pending transfer is handed back so the caller may keep waiting.
    pub fn wait_timeout(self, timeout: Duration) -> Result<TransferOutcome, PendingTransfer> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Ok(outcome),
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => Ok(TransferOutcome::failed(ABANDONED)),
        }
    }

    /// Non-blocking poll.
    pub fn try_outcome(self) -> Result<TransferOutcome, PendingTransfer> {
        match self.rx.try_recv() {
            Ok(outcome) => Ok(outcome),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => Ok(TransferOutcome::failed(ABANDONED)),
        }
    }

    /// Await the outcome from async code without blocking the executor.
    /// Must be called from within a tokio runtime.
    pub async fn outcome(self) -> TransferOutcome {
        tokio::task::spawn_blocking(move || self.wait())
            .await
            .unwrap_or_else(|e| TransferOutcome::failed(format!("task execution failed: {}", e)))
    }
}

/// Delivers the single outcome for one token.
pub struct Resolver {
    token: Token,
    tx: Option<Sender<TransferOutcome>>,
}

impl Resolver {
    pub fn token(&self) -> Token {
        self.token
    }

    pub fn resolve(mut self, outcome: TransferOutcome) {
        if let Some(tx) = self.tx.take() {
            debug!(token = %self.token, outcome = outcome.kind(), "resolving transfer");
            // The caller may have dropped its PendingTransfer; that is fine.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!(token = %self.token, "resolver dropped without an outcome");
            let _ = tx.send(TransferOutcome::failed(ABANDONED));
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("token", &self.token)
            .field("resolved", &self.tx.is_none())
            .finish()
    }
}

/// Map of in-flight operations keyed by token.
#[derive(Debug)]
pub struct PendingRegistry<T> {
    next: AtomicU64,
    entries: Mutex<HashMap<Token, (T, Resolver)>>,
}

impl<T> Default for PendingRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingRegistry<T> {
    pub fn new() -> Self {
        PendingRegistry {
            next: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register `entry` and return its token with the caller's handle.
    pub fn register(&self, entry: T) -> PendingTransfer {
        let token = Token(self.next.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = bounded(1);
        let resolver = Resolver { token, tx: Some(tx) };
        self.lock().insert(token, (entry, resolver));
        PendingTransfer { token, rx }
    }

    /// Remove and return the entry for `token`, if it is still pending.
    pub fn take(&self, token: Token) -> Option<(T, Resolver)> {
        self.lock().remove(&token)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned map is still a consistent map: entries are only ever
    // inserted or removed whole.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Token, (T, Resolver)>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique() {
        let reg = PendingRegistry::new();
        let a = reg.register(());
        let b = reg.register(());
        assert_ne!(a.token(), b.token());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn take_is_single_shot() {
        let reg = PendingRegistry::new();
        let pending = reg.register("req");
        let (entry, resolver) = reg.take(pending.token()).unwrap();
        assert_eq!(entry, "req");
        assert!(reg.take(pending.token()).is_none());
        resolver.resolve(TransferOutcome::Cancelled);
        assert_eq!(pending.wait(), TransferOutcome::Cancelled);
    }

    #[test]
    fn dropped_resolver_fails_the_transfer() {
        let reg = PendingRegistry::new();
        let pending = reg.register(());
        drop(reg.take(pending.token()));
        match pending.wait() {
            TransferOutcome::Failed { reason } => assert_eq!(reason, ABANDONED),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn dropping_registry_fails_outstanding_transfers() {
        let reg = PendingRegistry::new();
        let pending = reg.register(());
        drop(reg);
        assert!(matches!(pending.wait(), TransferOutcome::Failed { .. }));
    }

    #[test]
    fn wait_timeout_hands_back_pending() {
        let reg = PendingRegistry::new();
        let pending = reg.register(());
        let pending = pending.wait_timeout(Duration::from_millis(10)).unwrap_err();
        let pending = pending.try_outcome().unwrap_err();
        let (_, resolver) = reg.take(pending.token()).unwrap();
        resolver.resolve(TransferOutcome::Cancelled);
        assert_eq!(pending.wait_timeout(Duration::from_secs(1)).unwrap(), TransferOutcome::Cancelled);
    }

    #[tokio::test]
    async fn outcome_awaits_from_async_code() {
        let reg = PendingRegistry::new();
        let pending = reg.register(());
        let (_, resolver) = reg.take(pending.token()).unwrap();
        std::thread::spawn(move || resolver.resolve(TransferOutcome::Cancelled));
        assert_eq!(pending.outcome().await, TransferOutcome::Cancelled);
    }
}
