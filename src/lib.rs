// Library for tests to access modules

pub mod aggregation;
pub mod auth;
pub mod config;
pub mod export;
pub mod http;
pub mod models;
pub mod monitoring_repo;
pub mod report;
pub mod storage_repo;
pub mod version;
