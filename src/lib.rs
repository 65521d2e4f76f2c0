// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod error;
pub mod health;
pub mod history_repo;
pub mod identity;
pub mod models;
pub mod normalizer;
pub mod sources;
pub mod sysinfo_repo;
pub mod usage_service;
pub mod worker;
