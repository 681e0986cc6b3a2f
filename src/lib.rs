pub mod collection;
pub mod config;
pub mod escape;
pub mod links;
pub mod markdown;
pub mod model;
pub mod notion;
pub mod parser;
pub mod present;
pub mod route;
pub mod site;
pub mod sync;

/// Install the compact `tracing` subscriber shared by every binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
