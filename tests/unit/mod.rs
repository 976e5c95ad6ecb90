//! Unit tests for individual components

mod error_test;
mod audit_test;
mod config_test;
mod util_test;
mod builders_test;
mod registry_test;
mod runtime_test;
mod mailbox_test;
