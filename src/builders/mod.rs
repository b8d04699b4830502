// This file is the module declaration file for the `builders` module.
// These modules build the pieces the engine is configured with: which lines
// to remove, how to present progress, and whether the settings make sense.

// `reporter` module:
// The `Reporter` trait and its `ConsoleReporter` implementation, which print
// timestamped INFO/SUCCESS/WARN/ERROR lines, plus the `ScanReport` used by
// the `scan` command.
pub mod reporter;

// `rules` module:
// The `RemovalRule` trait, the suffix and CJK rules, and the `Profile` enum
// that bundles them into the `top` and `cn` configurations.
pub mod rules;

// `validator` module:
// `SettingsValidator`, which rejects a bad resolver address or top-level
// domain label before anything is written.
pub mod validator;
