//! Use cases - application services orchestrating domain logic through ports

pub mod run_plan;
