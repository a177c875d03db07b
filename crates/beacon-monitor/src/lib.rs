//! # beacon-monitor
//!
//! `HostMonitor` 포트의 sysinfo 구현.

pub mod system;
