//! Confirmation protocol core: token minting, storage, service logic,
//! replay redirects and the single-request flash transport.

pub mod error;
pub mod flash;
pub mod replay;
pub mod return_url;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod token;
pub mod types;
