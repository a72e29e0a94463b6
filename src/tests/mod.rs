mod cache_tests;
mod mutation_tests;

use crate::config::Config;
use crate::core::services::BalanceService;
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryStorage;

pub type TestService = BalanceService<InMemoryLogging, InMemoryStorage, InMemoryCache>;

pub fn create_test_service() -> TestService {
    create_test_service_with(&Config::default())
}

pub fn create_test_service_with(config: &Config) -> TestService {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let storage = InMemoryStorage::new();
    let cache = InMemoryCache::new();
    let logging = InMemoryLogging::new();
    BalanceService::new(storage, cache, logging, config)
}
