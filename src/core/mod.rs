pub mod cache;
pub mod calculator;
pub mod errors;
pub mod ledger;
pub mod models;
pub mod optimizer;
pub mod services;
pub mod trigger;
