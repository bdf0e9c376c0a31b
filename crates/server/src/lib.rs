pub mod audit;
pub mod auth;
pub mod bootstrap;
pub mod health;
pub mod routes;

pub use bootstrap::{
    bootstrap, bootstrap_with_config, bootstrap_with_llm, Application, BootstrapError,
};
