pub mod config;
pub mod driver;
pub mod figures;
pub mod logs;
pub mod network;
pub mod stats;
