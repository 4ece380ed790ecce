//! Integration tests for Course-Harvest
//!
//! Scheduler and job tests run against an in-process fetcher that records
//! every call; the HTTP fetcher is tested against wiremock servers.

mod common;
mod coordinator_tests;
mod fetch_tests;
mod scheduler_tests;
