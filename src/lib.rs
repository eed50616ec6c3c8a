pub mod backend;
pub mod cache;
pub mod cli;
pub mod driver;
pub mod error;
pub mod geo;
pub mod guest;
pub mod runtime;
pub mod scripts;
