#![allow(dead_code)]

pub mod builders;

pub use fileshipper_test_utils::init_tracing;
