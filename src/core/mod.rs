//! Core模块 - 包含所有核心业务逻辑

pub mod models;
pub mod error;
pub mod dataset;
pub mod query_engine;
pub mod report;
pub mod presets;

#[cfg(test)]
mod sim_integration_tests;
