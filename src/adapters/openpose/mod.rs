pub mod model_catalog;
pub mod monitor;
pub mod runner;
