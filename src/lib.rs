pub mod domain;
pub mod fetchers;
pub mod http;
pub mod models;
pub mod notifiers;
pub mod processing;
pub mod signer;
