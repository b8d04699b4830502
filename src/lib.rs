//! Remove entries from a dnsmasq forwarding list (`server=/<domain>/<ip>`
//! lines), recording each removal as its own git commit so that any single
//! removal can be reverted on its own.

pub mod builders;
pub mod core;
pub mod logging;
pub mod utils;
