//! # beacon-storage
//!
//! `ReportStore` 포트의 SQLite 구현과 스키마 마이그레이션.

pub mod migration;
pub mod sqlite;

pub use sqlite::SqliteReportStore;
