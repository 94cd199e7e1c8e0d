//! Muestra - Statistical sampling profiler core
//!
//! This library provides the storage and sampling machinery behind a
//! low-overhead statistical profiler: a bounded backtrace-frequency store
//! with approximate-median eviction, allocation-free sample recording fit
//! for signal handlers, and CPU and memory samplers with start/stop/read
//! lifecycles.

pub mod cli;
pub mod config;
pub mod cpu;
pub mod demo;
pub mod error;
pub mod evict;
pub mod frames;
pub mod log;
pub mod memory;
pub mod platform;
pub mod profiler;
pub mod report;
pub mod store;
pub mod timer;
