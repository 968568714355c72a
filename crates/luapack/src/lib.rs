pub mod assembler;
pub mod ast_builder;
pub mod bundler;
pub mod combine;
pub mod config;
pub mod dirs;
pub mod error;
pub mod graph_builder;
pub mod manifest;
pub mod require_graph;
pub mod resolver;

pub use bundler::{Bundle, Bundler};
pub use config::Config;
pub use error::BundleError;
pub use manifest::BundleTarget;
