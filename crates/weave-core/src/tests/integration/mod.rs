#![cfg(test)]

pub mod common;
pub mod live_reload_tests;
pub mod runtime_tests;
