//! trainprep: Prepare detection training runs
//!
//! Merges partial pipeline-configuration fragments into one strongly-typed
//! configuration file and converts labeled image directories into sharded
//! record datasets for training and evaluation.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod records;
