//! Integration tests

mod config_test;
mod execution_test;
mod pipeline_test;
