pub mod config;
pub mod explicit_rk;
pub mod problem;
pub mod state;
pub mod tableau;
