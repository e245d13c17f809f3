//! Single-writer gate for ledger mutations.
//!
//! The ledger offers no mutual exclusion, so a submission's
//! read-match-append sequence races with every other writer. Routing every
//! mutation through one permit serializes them within this process: at most
//! one lock submission or admin action touches the ledger at a time.
//! Readers (today view, live preview) do not take the permit.
//!
//! Writers in other processes are not covered; concurrent claims from them
//! surface afterwards as `dup_today` flags in the today view.

use crate::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Configuration for the writer gate.
#[derive(Debug, Clone)]
pub struct WriterGateConfig {
    /// Timeout for acquiring the permit in milliseconds (0 = 60 second cap).
    ///
    /// Default: 5000ms.
    pub acquire_timeout_ms: u64,
}

impl Default for WriterGateConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 5000,
        }
    }
}

impl WriterGateConfig {
    /// Sets the acquire timeout in milliseconds.
    #[must_use]
    pub const fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }
}

/// Proof of exclusive write access. Released on drop.
#[derive(Debug)]
pub struct WritePermit {
    _permit: OwnedSemaphorePermit,
}

/// Process-wide single-writer gate.
#[derive(Debug, Clone)]
pub struct WriteGate {
    semaphore: Arc<Semaphore>,
    timeout: Duration,
}

impl WriteGate {
    /// Creates a gate with one permit.
    #[must_use]
    pub fn new(config: &WriterGateConfig) -> Self {
        let timeout_ms = if config.acquire_timeout_ms == 0 {
            60_000 // 60 second safety cap
        } else {
            config.acquire_timeout_ms
        };
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Returns true if no writer currently holds the gate.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.semaphore.available_permits() == 1
    }

    /// Waits for exclusive write access, up to the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if another writer holds the gate
    /// for longer than the timeout.
    pub fn acquire(&self, operation: &'static str) -> Result<WritePermit> {
        let start = Instant::now();

        loop {
            if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
                metrics::histogram!("lockout_writer_wait_ms", "operation" => operation)
                    .record(start.elapsed().as_secs_f64() * 1000.0);
                tracing::trace!(operation = operation, "Acquired writer gate");
                return Ok(WritePermit { _permit: permit });
            }

            if start.elapsed() >= self.timeout {
                metrics::counter!(
                    "lockout_writer_gate_timeouts_total",
                    "operation" => operation
                )
                .increment(1);
                return Err(Error::store(
                    operation,
                    format!(
                        "another write is in progress; gave up after {}ms",
                        self.timeout.as_millis()
                    ),
                ));
            }

            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_acquire_and_release() {
        let gate = WriteGate::new(&WriterGateConfig::default());
        assert!(gate.is_idle());
        let permit = gate.acquire("test").unwrap();
        assert!(!gate.is_idle());
        drop(permit);
        assert!(gate.is_idle());
    }

    #[test]
    fn test_times_out_while_held() {
        let gate = WriteGate::new(&WriterGateConfig::default().with_acquire_timeout_ms(20));
        let _held = gate.acquire("first").unwrap();
        let err = gate.acquire("second").unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
    }

    #[test]
    fn test_serializes_threads() {
        let gate = WriteGate::new(&WriterGateConfig::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                std::thread::spawn(move || {
                    let _permit = gate.acquire("test").unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
