use std::net::IpAddr;

use crate::core::config::PruneSettings;

/// The `SettingsValidator` checks resolved settings before any file is touched.
///
/// It returns a list of human-readable issues rather than failing on the first
/// one, so the operator sees everything wrong with a command line at once.
pub struct SettingsValidator;

impl SettingsValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, settings: &PruneSettings) -> Vec<String> {
        let mut issues = Vec::new();

        if settings.resolver.parse::<IpAddr>().is_err() {
            issues.push(format!("Resolver is not an IP address: {}", settings.resolver));
        }
        if settings.lock_timeout.is_zero() {
            issues.push("Lock timeout must be greater than zero".to_string());
        }

        issues
    }
}

impl Default for SettingsValidator {
    fn default() -> Self {
        Self::new()
    }
}
