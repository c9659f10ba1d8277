//! Common functionality for dcsim, a simulator of UK digital communications infrastructure.
//!
//! Two engines are provided: a mobile supply-demand engine operating on postcode sectors and a
//! fixed-access engine operating on the exchange → cabinet → distribution point → premise tree.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod area;
pub mod asset;
pub mod cli;
pub mod demand;
pub mod error;
pub mod fixed;
pub mod id;
pub mod input;
pub mod intervention;
pub mod log;
pub mod lookup;
pub mod metrics;
pub mod model;
pub mod output;
pub mod planner;
pub mod settings;
pub mod simulation;
pub mod strategy;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config folder for dcsim
pub fn get_dcsim_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("dcsim");
    path
}
