//! Config command handler.

use lockout::config::LockoutConfig;

/// Config command.
pub fn cmd_config(config: &LockoutConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !show {
        println!("Use --show to display the current configuration.");
        return Ok(());
    }

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!(
        "Store: {}",
        config.store.location.as_deref().unwrap_or("(not set)")
    );
    println!(
        "Credentials: {}",
        config
            .store
            .credentials
            .as_ref()
            .map_or_else(|| "(not set)".to_string(), |p| p.display().to_string())
    );
    println!("Timezone: {}", config.timezone);
    println!("PII Mode: {}", config.pii_mode.as_str());
    println!(
        "Hash Salt: {}",
        if config.hash_salt.is_degraded() {
            "(fallback)"
        } else {
            "(configured)"
        }
    );
    println!(
        "Admin PIN: {}",
        if config.admin_pin.is_some() {
            "(configured)"
        } else {
            "(not set)"
        }
    );
    println!();

    println!("Matching:");
    println!("  Fuzzy Matching: {}", config.capabilities.fuzzy_matching);
    println!("  Fuzzy Threshold: {}", config.fuzzy_threshold);
    println!();

    println!("Ledger:");
    println!("  Call Timeout: {}ms", config.resilience.call_timeout_ms);
    println!(
        "  Breaker Threshold: {} failures",
        config.resilience.breaker_failure_threshold
    );
    println!(
        "  Breaker Reset: {}ms",
        config.resilience.breaker_reset_timeout_ms
    );
    println!(
        "  Writer Wait: {}ms",
        config.writer_gate.acquire_timeout_ms
    );
    println!();

    println!("Logging:");
    println!("  Format: {:?}", config.logging.format);
    println!(
        "  Filter: {}",
        config.logging.filter.as_deref().unwrap_or("(default)")
    );
    if let Some(file) = &config.logging.file {
        println!("  File: {}", file.display());
    }

    Ok(())
}
