#![forbid(unsafe_code)]

pub mod domain;
pub mod infra;
mod run;

pub use run::{run, start};
