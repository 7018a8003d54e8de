//! Test utilities for PrivacyPal integration tests
//!
//! - `chat`: a small chat application (users, group chats, direct messages)
//!   with handlers for both addressing conventions

#![allow(dead_code)]

pub mod chat;

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
