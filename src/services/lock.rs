//! Lock submission and the today view.

use super::admin::AdminOps;
use super::auth::AdminAuthorizer;
use super::confirmation::{GateDecision, Session, Signature};
use super::deduplication::{
    DuplicateHitSet, IndexedRecord, KeyDeriver, Matcher, normalize_email, normalize_phone,
    normalize_text, salted_hash,
};
use crate::config::{HashSalt, LockoutConfig};
use crate::models::{
    Brand, Clock, ContactPii, ContactRecord, LockRequest, StoreTimezone, StoredRecord, SystemClock,
    TodayEntry, TodayFilter, ValidationError,
};
use crate::storage::{
    LOCKS_SHEET, Ledger, MigrationOutcome, Row, SchemaVersion, WriteGate, Workbook,
    ensure_schema, open_workbook,
};
use crate::{Error, Result};
use chrono::{NaiveDate, Timelike};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Result of a lock submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The record was appended.
    Accepted(ContactRecord),
    /// Possible duplicates; resubmit unchanged to confirm.
    Blocked(DuplicateHitSet),
    /// The request was incomplete. Nothing was read or written.
    Rejected(ValidationError),
}

impl SubmitOutcome {
    /// Returns a short identifier for logs and metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "accepted",
            Self::Blocked(_) => "blocked",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// Orchestrates matching, confirmation, and ledger writes.
///
/// Every mutation goes through one [`WriteGate`], so the
/// read-match-append sequence of a submission never interleaves with
/// another submission or an admin action in this process. Reads run
/// without the gate and may be one write stale.
pub struct LockService {
    pub(super) workbook: Arc<dyn Workbook>,
    pub(super) deriver: KeyDeriver,
    pub(super) schema: SchemaVersion,
    pub(super) writer: WriteGate,
    pub(super) authorizer: AdminAuthorizer,
    pub(super) timezone: StoreTimezone,
    pub(super) clock: Arc<dyn Clock>,
    matcher: Matcher,
    salt: HashSalt,
}

impl LockService {
    /// Creates a service over an already-open workbook.
    #[must_use]
    pub fn new(workbook: Arc<dyn Workbook>, config: &LockoutConfig) -> Self {
        Self {
            workbook,
            deriver: KeyDeriver::new(config.pii_mode, config.hash_salt.clone()),
            schema: SchemaVersion::for_mode(config.pii_mode),
            writer: WriteGate::new(&config.writer_gate),
            authorizer: AdminAuthorizer::new(config.admin_pin.clone()),
            timezone: config.timezone,
            clock: Arc::new(SystemClock),
            matcher: Matcher::new(config.fuzzy_threshold, config.capabilities),
            salt: config.hash_salt.clone(),
        }
    }

    /// Opens the configured store and brings its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or its schema cannot
    /// be migrated.
    pub fn open(config: &LockoutConfig) -> Result<Self> {
        let service = Self::new(open_workbook(config)?, config);
        service.migrate()?;
        Ok(service)
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns an admin handle sharing this service's store and writer gate.
    #[must_use]
    pub const fn admin(&self) -> AdminOps<'_> {
        AdminOps::new(self)
    }

    /// Returns today's date in the store timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.timezone.date_of(self.clock.now())
    }

    /// Creates the live worksheet if needed and migrates its schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaDrift`] if the header cannot be reconciled, or
    /// [`Error::StoreUnavailable`] if the store cannot be reached.
    #[instrument(skip(self), fields(operation = "migrate"))]
    pub fn migrate(&self) -> Result<MigrationOutcome> {
        let _permit = self.writer.acquire("migrate")?;
        let ledger = self.locks()?;
        let (outcome, _) = ensure_schema(ledger.as_ref(), self.schema, &self.deriver)?;
        Ok(outcome)
    }

    pub(super) fn locks(&self) -> Result<Arc<dyn Ledger>> {
        self.workbook
            .worksheet_or_create(LOCKS_SHEET, &self.schema.header())
    }

    /// Runs the matcher without validating, gating, or writing.
    ///
    /// Backs the live duplicate warning shown while a request is typed.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    #[instrument(skip(self, request), fields(operation = "preview"))]
    pub fn preview(&self, request: &LockRequest) -> Result<DuplicateHitSet> {
        let keys = self.deriver.for_request(request);
        if keys.is_empty() {
            return Ok(DuplicateHitSet::empty());
        }
        let snapshot = self.index(self.read_snapshot()?);
        Ok(self.matcher.find_duplicates(&keys, &snapshot))
    }

    /// Submits a lock request.
    ///
    /// Validation runs first and touches nothing. A request matching
    /// existing records is blocked until it is resubmitted unchanged in the
    /// same session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the store cannot be read or
    /// written and [`Error::SchemaDrift`] if the ledger layout cannot be
    /// migrated. Neither is retried automatically.
    #[allow(clippy::cast_precision_loss)]
    #[instrument(
        skip(self, session, request),
        fields(operation = "submit_lock", session_id = %session.id())
    )]
    pub fn submit_lock(
        &self,
        session: &mut Session,
        request: &LockRequest,
    ) -> Result<SubmitOutcome> {
        let start = Instant::now();
        let result = self.submit_inner(session, request);

        let label = result.as_ref().map_or("error", SubmitOutcome::as_str);
        metrics::counter!("lockout_submissions_total", "outcome" => label).increment(1);
        metrics::histogram!("lockout_submit_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        result
    }

    fn submit_inner(&self, session: &mut Session, request: &LockRequest) -> Result<SubmitOutcome> {
        let brand = match request.validate() {
            Ok(brand) => brand,
            Err(reason) => {
                tracing::debug!(reason = %reason, "Lock request rejected");
                return Ok(SubmitOutcome::Rejected(reason));
            },
        };
        let keys = self.deriver.for_request(request);

        let _permit = self.writer.acquire("submit_lock")?;
        let ledger = self.locks()?;
        let (_, rows) = ensure_schema(ledger.as_ref(), self.schema, &self.deriver)?;
        let snapshot = self.index(self.decode_rows(self.schema, &rows));

        let hits = self.matcher.find_duplicates(&keys, &snapshot);
        let decision = session
            .gate
            .evaluate(Signature::from_keys(&keys), !hits.is_empty());
        if decision == GateDecision::NeedsConfirmation {
            tracing::info!(flagged = hits.len(), "Lock blocked pending confirmation");
            return Ok(SubmitOutcome::Blocked(hits));
        }

        let local = self.timezone.local(self.clock.now());
        let timestamp = local.with_nanosecond(0).unwrap_or(local);
        let record = ContactRecord {
            timestamp: Some(timestamp),
            date: Some(timestamp.date()),
            company: request.company.trim().to_string(),
            contact_name: request.contact_name.trim().to_string(),
            brand: Some(brand),
            locked_by: request.locked_by.trim().to_string(),
            notes: request.notes.trim().to_string(),
            pii: self.deriver.persisted_pii(request),
        };
        ledger.append_row(&self.schema.encode(&record)?)?;
        session.gate.on_write_succeeded();

        tracing::info!(
            brand = %brand,
            confirmed_override = decision == GateDecision::Confirmed,
            "Lock accepted"
        );
        Ok(SubmitOutcome::Accepted(record))
    }

    /// Lists today's records.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    pub fn list_today(&self, filter: &TodayFilter) -> Result<Vec<TodayEntry>> {
        self.list_on(self.today(), filter)
    }

    /// Lists the records dated `date` that pass `filter`, most recent first.
    ///
    /// An entry is flagged `dup_today` when an earlier row in the filtered
    /// set shares a non-empty email, phone, or company key with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read, or
    /// [`Error::SchemaDrift`] if its header is not a known layout.
    #[instrument(skip(self, filter), fields(operation = "list_on", date = %date))]
    pub fn list_on(&self, date: NaiveDate, filter: &TodayFilter) -> Result<Vec<TodayEntry>> {
        let matcher = FilterMatcher::new(filter, &self.salt);
        let selected: Vec<StoredRecord> = self
            .read_snapshot()?
            .into_iter()
            .filter(|s| s.record.date == Some(date) && matcher.matches(&s.record))
            .collect();

        let mut seen_email = HashSet::new();
        let mut seen_phone = HashSet::new();
        let mut seen_company = HashSet::new();
        let mut entries: Vec<TodayEntry> = selected
            .into_iter()
            .map(|stored| {
                let keys = self.deriver.for_record(&stored.record);
                let mut dup = false;
                for (key, seen) in [
                    (keys.email, &mut seen_email),
                    (keys.phone, &mut seen_phone),
                    (keys.company, &mut seen_company),
                ] {
                    if !key.is_empty() && !seen.insert(key) {
                        dup = true;
                    }
                }
                TodayEntry {
                    stored,
                    dup_today: dup,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.stored
                .record
                .timestamp
                .cmp(&a.stored.record.timestamp)
                .then_with(|| b.stored.row.cmp(&a.stored.row))
        });
        Ok(entries)
    }

    /// Reads and decodes the live worksheet without migrating it.
    fn read_snapshot(&self) -> Result<Vec<StoredRecord>> {
        let Some(ledger) = self.workbook.worksheet(LOCKS_SHEET)? else {
            return Ok(Vec::new());
        };
        let rows = ledger.read_all()?;
        let Some(header) = rows.first() else {
            return Ok(Vec::new());
        };
        let version = SchemaVersion::detect(header).ok_or_else(|| Error::SchemaDrift {
            worksheet: LOCKS_SHEET.to_string(),
            reason: "header is not a known layout; run `lockout migrate`".to_string(),
        })?;
        Ok(self.decode_rows(version, &rows))
    }

    /// Decodes data rows, numbering them from 2 (row 1 is the header).
    pub(super) fn decode_rows(&self, version: SchemaVersion, rows: &[Row]) -> Vec<StoredRecord> {
        rows.iter()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| row.iter().any(|c| !c.trim().is_empty()))
            .map(|(i, row)| StoredRecord {
                row: i + 1,
                record: version.decode(row),
            })
            .collect()
    }

    fn index(&self, records: Vec<StoredRecord>) -> Vec<IndexedRecord> {
        records
            .into_iter()
            .map(|stored| IndexedRecord {
                keys: self.deriver.for_record(&stored.record),
                stored,
            })
            .collect()
    }
}

/// Today-view filter with its needles normalized once.
struct FilterMatcher<'a> {
    company: String,
    email: String,
    email_hash: String,
    phone: String,
    phone_hash: String,
    brands: &'a [Brand],
}

impl<'a> FilterMatcher<'a> {
    fn new(filter: &'a TodayFilter, salt: &HashSalt) -> Self {
        let email = filter.email.as_deref().map(normalize_email).unwrap_or_default();
        let phone = filter.phone.as_deref().map(normalize_phone).unwrap_or_default();
        Self {
            company: filter.company.as_deref().map(normalize_text).unwrap_or_default(),
            email_hash: salted_hash(salt.expose(), &email),
            phone_hash: salted_hash(salt.expose(), &phone),
            email,
            phone,
            brands: &filter.brands,
        }
    }

    fn matches(&self, record: &ContactRecord) -> bool {
        if !self.company.is_empty() && !normalize_text(&record.company).contains(&self.company) {
            return false;
        }
        if !self.brands.is_empty() && !record.brand.is_some_and(|b| self.brands.contains(&b)) {
            return false;
        }
        let contact = record.contact_name.to_lowercase();
        match &record.pii {
            ContactPii::Raw { email, phone } => {
                if !self.email.is_empty()
                    && !email.to_lowercase().contains(&self.email)
                    && !contact.contains(&self.email)
                {
                    return false;
                }
                if !self.phone.is_empty() && !normalize_phone(phone).contains(&self.phone) {
                    return false;
                }
            },
            ContactPii::Hashed {
                email_hash,
                phone_hash,
            } => {
                if !self.email.is_empty()
                    && *email_hash != self.email_hash
                    && !contact.contains(&self.email)
                {
                    return false;
                }
                if !self.phone.is_empty() && *phone_hash != self.phone_hash {
                    return false;
                }
            },
        }
        true
    }
}
