pub mod config;
pub mod publish;
