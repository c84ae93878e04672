pub mod artifacts;
pub mod blockchain;
pub mod cli;
pub mod config;
pub mod observe;

pub use {artifacts::Registry, blockchain::Ethereum, config::Config};
