pub mod catalog;
pub mod classifier;
pub mod command;
pub mod control;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod network;
pub mod probe;
pub mod scoring;
pub mod vendors;

pub use controller::HomeController;
