//! Ledger resilience wrapper with call timeouts and circuit breaking.
//!
//! Every ledger call runs on a helper thread and the caller stops waiting
//! once the configured timeout passes, so a hung store surfaces as
//! [`Error::StoreUnavailable`] instead of blocking. All worksheets of a
//! workbook report to one [`StoreHealth`], which trips after repeated store
//! failures and fails calls fast until a cool-down has passed.
//!
//! # Circuit states
//!
//! ```text
//! +--------+   store failures >= trip_after   +---------+
//! | Closed | -------------------------------> | Tripped |
//! +--------+                                  +---------+
//!     ^                                            |
//!     |  trial succeeds                            | cool-down passed
//!     |                                            v
//!     +-------------------------------------  +---------+
//!                  trial fails: re-trip ----> | Probing |
//!                                             +---------+
//! ```
//!
//! # Abandoned calls
//!
//! A call the caller stopped waiting for keeps running on its helper thread
//! and holds its in-flight slot until the store answers. A read needs one
//! slot and a mutation needs all of them, so nothing touches the workbook
//! while an abandoned mutation is still landing. Row positions taken from a
//! fresh read always describe the sheet they are later applied to.

use super::traits::{Ledger, Row, Workbook};
use crate::{Error, Result};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Upper bound applied when the configured timeout is 0.
const MAX_CALL_TIMEOUT_MS: u64 = 60_000;

/// In-flight slots per workbook. A read takes one, a mutation takes all.
const IN_FLIGHT_SLOTS: u32 = 64;

/// Resilience configuration for ledger calls.
#[derive(Debug, Clone)]
pub struct StorageResilienceConfig {
    /// Per-call timeout in milliseconds (0 = 60 second cap).
    pub call_timeout_ms: u64,
    /// Consecutive failures before opening the circuit.
    pub breaker_failure_threshold: u32,
    /// How long to keep the circuit open before half-open.
    pub breaker_reset_timeout_ms: u64,
    /// Maximum trial calls while half-open.
    pub breaker_half_open_max_calls: u32,
}

impl Default for StorageResilienceConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 10_000,
            breaker_failure_threshold: 5,
            breaker_reset_timeout_ms: 30_000,
            breaker_half_open_max_calls: 1,
        }
    }
}

impl StorageResilienceConfig {
    /// Sets the per-call timeout in milliseconds.
    #[must_use]
    pub const fn with_call_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = timeout_ms;
        self
    }

    /// Sets the failure threshold.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.breaker_failure_threshold = threshold;
        self
    }

    /// Sets the reset timeout in milliseconds.
    #[must_use]
    pub const fn with_reset_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.breaker_reset_timeout_ms = timeout_ms;
        self
    }

    /// Sets the half-open max calls.
    #[must_use]
    pub const fn with_half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.breaker_half_open_max_calls = max_calls;
        self
    }

    fn call_timeout(&self) -> Duration {
        let ms = if self.call_timeout_ms == 0 {
            MAX_CALL_TIMEOUT_MS
        } else {
            self.call_timeout_ms.min(MAX_CALL_TIMEOUT_MS)
        };
        Duration::from_millis(ms)
    }
}

/// Whether a ledger call changes the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Mutate,
}

impl Access {
    const fn slots(self) -> u32 {
        match self {
            Self::Read => 1,
            Self::Mutate => IN_FLIGHT_SLOTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Circuit {
    /// Calls pass; counts consecutive store failures.
    Closed { failures: u32 },
    /// Calls fail fast until the cool-down has passed.
    Tripped { at: Instant },
    /// Cool-down over; a limited number of trial calls pass.
    Probing { trials: u32 },
}

impl Circuit {
    const fn state_value(self) -> u8 {
        match self {
            Self::Closed { .. } => 0,
            Self::Tripped { .. } => 1,
            Self::Probing { .. } => 2,
        }
    }
}

/// Health of one workbook, shared by all of its worksheets.
///
/// Owns the circuit, the call timeout and the in-flight tracker. Worksheet
/// handles come and go; the health record lives as long as the workbook.
#[derive(Debug)]
pub struct StoreHealth {
    label: String,
    circuit: Mutex<Circuit>,
    trip_after: u32,
    cool_down: Duration,
    max_trials: u32,
    timeout: Duration,
    in_flight: Arc<Semaphore>,
}

impl StoreHealth {
    /// Creates a healthy record for the workbook named `label`.
    #[must_use]
    pub fn new(label: impl Into<String>, config: &StorageResilienceConfig) -> Self {
        Self {
            label: label.into(),
            circuit: Mutex::new(Circuit::Closed { failures: 0 }),
            trip_after: config.breaker_failure_threshold.max(1),
            cool_down: Duration::from_millis(config.breaker_reset_timeout_ms),
            max_trials: config.breaker_half_open_max_calls.max(1),
            timeout: config.call_timeout(),
            in_flight: Arc::new(Semaphore::new(IN_FLIGHT_SLOTS as usize)),
        }
    }

    /// Returns the workbook label used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the circuit state for metrics: 0 closed, 1 tripped, 2 probing.
    #[must_use]
    pub fn state_value(&self) -> u8 {
        self.circuit().state_value()
    }

    /// Returns true if no ledger call is running, abandoned ones included.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.in_flight.available_permits() == IN_FLIGHT_SLOTS as usize
    }

    fn circuit(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> bool {
        let mut circuit = self.circuit();
        match *circuit {
            Circuit::Closed { .. } => true,
            Circuit::Tripped { at } if at.elapsed() >= self.cool_down => {
                tracing::info!(workbook = %self.label, "Ledger circuit probing after cool-down");
                *circuit = Circuit::Probing { trials: 1 };
                true
            },
            Circuit::Probing { trials } if trials < self.max_trials => {
                *circuit = Circuit::Probing { trials: trials + 1 };
                true
            },
            Circuit::Tripped { .. } | Circuit::Probing { .. } => false,
        }
    }

    /// Records an admitted call's outcome. Returns true if it tripped the circuit.
    fn settle(&self, store_failed: bool) -> bool {
        let mut circuit = self.circuit();
        let previous = *circuit;
        *circuit = match (previous, store_failed) {
            (Circuit::Closed { .. }, false) => Circuit::Closed { failures: 0 },
            (_, false) => {
                tracing::info!(workbook = %self.label, "Ledger circuit closed after success");
                Circuit::Closed { failures: 0 }
            },
            (Circuit::Closed { failures }, true) if failures + 1 < self.trip_after => {
                Circuit::Closed {
                    failures: failures + 1,
                }
            },
            (Circuit::Tripped { at }, true) => Circuit::Tripped { at },
            (_, true) => {
                tracing::warn!(
                    workbook = %self.label,
                    trip_after = self.trip_after,
                    probing = matches!(previous, Circuit::Probing { .. }),
                    "Ledger circuit tripped"
                );
                Circuit::Tripped { at: Instant::now() }
            },
        };
        !matches!(previous, Circuit::Tripped { .. }) && matches!(*circuit, Circuit::Tripped { .. })
    }

    /// Waits for the in-flight slots `access` needs, up to `deadline`.
    fn claim(
        &self,
        operation: &'static str,
        access: Access,
        deadline: Instant,
    ) -> Result<OwnedSemaphorePermit> {
        loop {
            if let Ok(slot) = Arc::clone(&self.in_flight).try_acquire_many_owned(access.slots()) {
                return Ok(slot);
            }
            if Instant::now() >= deadline {
                metrics::counter!(
                    "lockout_ledger_in_flight_waits_total",
                    "operation" => operation
                )
                .increment(1);
                return Err(Error::store(
                    operation,
                    format!(
                        "an earlier call on workbook '{}' is still running",
                        self.label
                    ),
                ));
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Runs one ledger call through the circuit, the in-flight tracker and
    /// the timeout. Only store failures count against the circuit.
    fn call<T, F>(&self, operation: &'static str, access: Access, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        if !self.admit() {
            record_metrics(operation, "circuit_open", self.state_value());
            return Err(Error::store(operation, "circuit breaker open"));
        }

        let deadline = Instant::now() + self.timeout;
        let result = self
            .claim(operation, access, deadline)
            .and_then(|slot| self.run_until(operation, deadline, slot, call));

        let store_failed = matches!(&result, Err(e) if e.is_retryable());
        let tripped = self.settle(store_failed);
        record_metrics(
            operation,
            if store_failed { "error" } else { "success" },
            self.state_value(),
        );
        if tripped {
            metrics::counter!(
                "lockout_ledger_breaker_trips_total",
                "operation" => operation
            )
            .increment(1);
        }
        result
    }

    /// Runs `call` on a helper thread holding `slot`, waiting until `deadline`.
    fn run_until<T, F>(
        &self,
        operation: &'static str,
        deadline: Instant,
        slot: OwnedSemaphorePermit,
        call: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name(format!("ledger-{operation}"))
            .spawn(move || {
                let result = call();
                drop(slot);
                // The receiver is gone if the caller already timed out.
                let _ = tx.send(result);
            })
            .map_err(|e| Error::store(operation, format!("failed to spawn ledger call: {e}")))?;

        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    workbook = %self.label,
                    operation = operation,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Ledger call timed out; it keeps its slot until the store answers"
                );
                Err(Error::store(
                    operation,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                ))
            },
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::store(operation, "ledger call aborted"))
            },
        }
    }
}

/// Ledger wrapper that routes every call through its workbook's [`StoreHealth`].
pub struct ResilientLedger {
    inner: Arc<dyn Ledger>,
    name: String,
    health: Arc<StoreHealth>,
}

impl ResilientLedger {
    /// Wraps a worksheet of the workbook `health` belongs to.
    #[must_use]
    pub fn new(inner: Arc<dyn Ledger>, health: Arc<StoreHealth>) -> Self {
        let name = inner.name().to_string();
        Self {
            inner,
            name,
            health,
        }
    }

    fn execute<T, F>(&self, operation: &'static str, access: Access, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Ledger) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.health
            .call(operation, access, move || call(inner.as_ref()))
    }
}

impl Ledger for ResilientLedger {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_all(&self) -> Result<Vec<Row>> {
        self.execute("read_all", Access::Read, |ledger| ledger.read_all())
    }

    fn append_row(&self, row: &[String]) -> Result<()> {
        let row = row.to_vec();
        self.execute("append_row", Access::Mutate, move |ledger| {
            ledger.append_row(&row)
        })
    }

    fn append_rows(&self, rows: &[Row]) -> Result<()> {
        let rows = rows.to_vec();
        self.execute("append_rows", Access::Mutate, move |ledger| {
            ledger.append_rows(&rows)
        })
    }

    fn delete_row(&self, index: usize) -> Result<()> {
        self.execute("delete_row", Access::Mutate, move |ledger| {
            ledger.delete_row(index)
        })
    }

    fn rewrite(&self, rows: &[Row]) -> Result<()> {
        let rows = rows.to_vec();
        self.execute("rewrite", Access::Mutate, move |ledger| ledger.rewrite(&rows))
    }
}

/// Workbook wrapper whose worksheets share one [`StoreHealth`].
pub struct ResilientWorkbook {
    inner: Arc<dyn Workbook>,
    health: Arc<StoreHealth>,
}

impl ResilientWorkbook {
    /// Wraps a workbook.
    #[must_use]
    pub fn new(inner: Arc<dyn Workbook>, config: &StorageResilienceConfig) -> Self {
        Self::labelled(inner, "workbook", config)
    }

    /// Wraps a workbook, naming it `label` in logs.
    #[must_use]
    pub fn labelled(
        inner: Arc<dyn Workbook>,
        label: impl Into<String>,
        config: &StorageResilienceConfig,
    ) -> Self {
        Self {
            inner,
            health: Arc::new(StoreHealth::new(label, config)),
        }
    }

    /// Returns the shared health record.
    #[must_use]
    pub const fn health(&self) -> &Arc<StoreHealth> {
        &self.health
    }

    fn wrap(&self, ledger: Arc<dyn Ledger>) -> Arc<dyn Ledger> {
        Arc::new(ResilientLedger::new(ledger, Arc::clone(&self.health)))
    }
}

impl Workbook for ResilientWorkbook {
    fn worksheet(&self, name: &str) -> Result<Option<Arc<dyn Ledger>>> {
        let owned = name.to_string();
        let inner = Arc::clone(&self.inner);
        let found = self
            .health
            .call("worksheet", Access::Read, move || inner.worksheet(&owned))?;
        Ok(found.map(|ledger| self.wrap(ledger)))
    }

    fn add_worksheet(&self, name: &str, header: &[String]) -> Result<Arc<dyn Ledger>> {
        let owned = name.to_string();
        let header = header.to_vec();
        let inner = Arc::clone(&self.inner);
        let created = self.health.call("add_worksheet", Access::Mutate, move || {
            inner.add_worksheet(&owned, &header)
        })?;
        Ok(self.wrap(created))
    }
}

fn record_metrics(operation: &'static str, status: &'static str, state: u8) {
    metrics::counter!(
        "lockout_ledger_requests_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::gauge!("lockout_ledger_breaker_state").set(f64::from(state));
}
