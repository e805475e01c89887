pub mod client;
pub mod router;

pub use client::EvmExchangeClient;
