pub mod cli;
pub mod config;
pub mod flock;
pub mod git;
pub mod install;
pub mod model;
pub mod modules;

mod api;
#[cfg(test)]
mod testing;

pub use api::{EasyModules, EasyModulesBuilder, InstallOptions};
