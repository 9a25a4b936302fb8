//! Shared test utilities

use courier::config::GeneratorConfig;
use courier::{DbPool, Generator, db};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// A generator pointed at a dead endpoint
///
/// Good enough for code paths that never reach the network (quota-limited
/// users, chat commands).
#[must_use]
pub fn offline_generator() -> Generator {
    Generator::new(GeneratorConfig {
        api_key: "test-key".to_string(),
        base_url: "http://127.0.0.1:1".to_string(),
        chat_model: "gpt-3.5-turbo-0125".to_string(),
        advanced_model: "gpt-4-0125-preview".to_string(),
    })
}
