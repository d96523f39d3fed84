//! Integration tests for strike-engine

mod common;
mod coordinator_test;
mod e2e_test;
mod engine_test;
