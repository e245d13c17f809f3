//! Command handlers module.
//!
//! - `lock.rs`: lock submission and the live duplicate check
//! - `today.rs`: the today view
//! - `admin.rs`: PIN-gated clear and archive actions, schema migration
//! - `config.rs`: configuration display
//! - `render.rs`: shared text rendering for records and hit groups

mod admin;
mod config;
mod lock;
mod render;
mod today;

use clap::Subcommand;

pub use admin::{cmd_admin, cmd_migrate};
pub use config::cmd_config;
pub use lock::{LockArgs, cmd_check, cmd_lock};
pub use today::{TodayArgs, cmd_today};

/// Admin subcommands.
#[derive(Subcommand)]
pub enum AdminAction {
    /// Delete every row dated today.
    ClearToday {
        /// Admin PIN.
        #[arg(long, env = "LOCKOUT_PIN", hide_env_values = true)]
        pin: String,
    },

    /// Delete every data row, keeping the header.
    ClearAll {
        /// Admin PIN.
        #[arg(long, env = "LOCKOUT_PIN", hide_env_values = true)]
        pin: String,
    },

    /// Copy rows to the Archive worksheet, then delete them.
    Archive {
        /// Admin PIN.
        #[arg(long, env = "LOCKOUT_PIN", hide_env_values = true)]
        pin: String,

        /// Rows to archive: today or all.
        #[arg(long, default_value = "today")]
        scope: String,
    },
}
