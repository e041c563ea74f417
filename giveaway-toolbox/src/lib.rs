pub mod audit;
pub mod config;
pub mod participants;
pub mod utils;
pub mod winners;
