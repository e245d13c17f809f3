//! Admin and migrate command handlers.

use super::AdminAction;
use lockout::config::LockoutConfig;
use lockout::storage::MigrationOutcome;
use lockout::{ArchiveScope, LockService};

/// Admin command.
pub fn cmd_admin(
    config: &LockoutConfig,
    action: AdminAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = LockService::new(lockout::storage::open_workbook(config)?, config);
    let admin = service.admin();

    match action {
        AdminAction::ClearToday { pin } => {
            let removed = admin.clear_today(&pin, service.today())?;
            println!("Deleted {removed} row(s) dated {}.", service.today());
        },
        AdminAction::ClearAll { pin } => {
            let removed = admin.clear_all(&pin)?;
            println!("Deleted {removed} row(s).");
        },
        AdminAction::Archive { pin, scope } => {
            let scope = parse_scope(&scope, &service)?;
            let moved = admin.archive_and_clear(&pin, scope)?;
            println!("Archived and deleted {moved} row(s) ({scope}).");
        },
    }

    Ok(())
}

/// Migrate command.
pub fn cmd_migrate(config: &LockoutConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = LockService::new(lockout::storage::open_workbook(config)?, config);
    match service.migrate()? {
        MigrationOutcome::Current => println!("Schema is up to date."),
        MigrationOutcome::Initialized => println!("Created the Locks worksheet."),
        MigrationOutcome::Migrated { rows } => {
            println!("Migrated {rows} row(s) to the hashed schema.");
        },
    }
    Ok(())
}

fn parse_scope(scope: &str, service: &LockService) -> Result<ArchiveScope, String> {
    match scope.trim().to_lowercase().as_str() {
        "today" => Ok(ArchiveScope::Today(service.today())),
        "all" => Ok(ArchiveScope::All),
        other => Err(format!("unknown archive scope '{other}' (expected today or all)")),
    }
}
