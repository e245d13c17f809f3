//! Lock and check command handlers.

use super::render::{hit_report, record_line};
use clap::Args;
use lockout::config::LockoutConfig;
use lockout::{ContactRecord, LockRequest, LockService, Session, StoredRecord, SubmitOutcome};
use std::io::{self, BufRead, Write};

/// Contact fields shared by `lock` and `check`.
#[derive(Args, Debug, Clone)]
pub struct LockArgs {
    /// Company name.
    #[arg(long)]
    pub company: String,

    /// Contact name.
    #[arg(long, default_value = "")]
    pub contact: String,

    /// Contact email.
    #[arg(long, default_value = "")]
    pub email: String,

    /// Contact phone.
    #[arg(long, default_value = "")]
    pub phone: String,

    /// Brand: dartmouth-partners, catalyst-partners, pure-search, or other.
    #[arg(long, default_value = "")]
    pub brand: String,

    /// Your name.
    #[arg(long = "by", env = "LOCKOUT_USER", default_value = "")]
    pub locked_by: String,

    /// Free-text notes.
    #[arg(long, default_value = "")]
    pub notes: String,
}

impl LockArgs {
    fn to_request(&self) -> LockRequest {
        LockRequest::new(&self.company, &self.contact, &self.brand, &self.locked_by)
            .with_email(&self.email)
            .with_phone(&self.phone)
            .with_notes(&self.notes)
    }
}

/// Lock command.
///
/// A blocked submission is resubmitted unchanged once the user confirms,
/// either interactively or up front with `--yes`.
pub fn cmd_lock(
    config: &LockoutConfig,
    args: &LockArgs,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = LockService::open(config)?;
    let request = args.to_request();
    let mut session = Session::new();

    match service.submit_lock(&mut session, &request)? {
        SubmitOutcome::Accepted(record) => print_accepted(&record),
        SubmitOutcome::Rejected(reason) => return Err(reason.into()),
        SubmitOutcome::Blocked(hits) => {
            println!("Possible duplicates found:");
            print!("{}", hit_report(&hits));
            if !(yes || confirm("Lock anyway? [y/N] ")?) {
                println!("Not locked.");
                return Ok(());
            }
            let record = confirmed_record(service.submit_lock(&mut session, &request)?)?;
            print_accepted(&record);
        },
    }

    Ok(())
}

/// Check command: shows duplicates without writing anything.
pub fn cmd_check(config: &LockoutConfig, args: &LockArgs) -> Result<(), Box<dyn std::error::Error>> {
    let service = LockService::new(lockout::storage::open_workbook(config)?, config);
    let hits = service.preview(&args.to_request())?;
    if hits.is_empty() {
        println!("No possible duplicates.");
    } else {
        print!("{}", hit_report(&hits));
    }
    Ok(())
}

/// Unwraps the outcome of an unchanged resubmission, which the armed gate
/// always lets through.
fn confirmed_record(outcome: SubmitOutcome) -> Result<ContactRecord, Box<dyn std::error::Error>> {
    match outcome {
        SubmitOutcome::Accepted(record) => Ok(record),
        SubmitOutcome::Rejected(reason) => Err(reason.into()),
        SubmitOutcome::Blocked(_) => Err("confirmed resubmission was blocked again".into()),
    }
}

fn print_accepted(record: &ContactRecord) {
    let stored = StoredRecord {
        row: 0,
        record: record.clone(),
    };
    println!("Locked: {}", record_line(&stored));
}

fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_request_carries_every_field() {
        let args = LockArgs {
            company: "Acme".to_string(),
            contact: "Jane".to_string(),
            email: "jane@acme.com".to_string(),
            phone: String::new(),
            brand: "pure-search".to_string(),
            locked_by: "Sam".to_string(),
            notes: "call back Tuesday".to_string(),
        };
        let request = args.to_request();
        assert_eq!(request.company, "Acme");
        assert_eq!(request.email, "jane@acme.com");
        assert_eq!(request.notes, "call back Tuesday");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_blocked_resubmission_is_an_error() {
        use lockout::services::deduplication::DuplicateHitSet;

        let err = confirmed_record(SubmitOutcome::Blocked(DuplicateHitSet::empty())).unwrap_err();
        assert!(err.to_string().contains("blocked again"));
    }

    #[test]
    fn test_rejected_resubmission_is_an_error() {
        use lockout::models::ValidationError;

        let outcome = SubmitOutcome::Rejected(ValidationError::MissingField("company"));
        assert!(confirmed_record(outcome).is_err());
    }
}
