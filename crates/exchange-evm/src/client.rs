use std::str::FromStr;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

use volume_bot_core::config::{ExchangeConfig, WalletConfig};

/// Exchange collaborator backed by a JSON-RPC provider with a local signer.
///
/// Holds the parsed contract addresses for the configured pair so the rest
/// of the system never touches raw address strings.
#[derive(Clone)]
pub struct EvmExchangeClient {
    pub(crate) provider: DynProvider,
    pub(crate) wallet_address: Address,
    pub(crate) router: Address,
    pub(crate) explorer_url: String,
    token: Address,
    weth: Address,
    usdt: Address,
}

impl EvmExchangeClient {
    /// Builds the provider, signer and address book from configuration.
    ///
    /// # Errors
    /// Returns an error if the private key, RPC URL or any contract address
    /// fails to parse.
    pub fn connect(exchange: &ExchangeConfig, wallet: &WalletConfig) -> Result<Self> {
        let signer: PrivateKeySigner = wallet
            .private_key
            .trim()
            .parse()
            .context("invalid wallet private key")?;
        let wallet_address =
            Address::from_str(wallet.address.trim()).context("invalid wallet address")?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(exchange.rpc_url.parse().context("invalid RPC URL")?)
            .erased();

        Ok(Self {
            provider,
            wallet_address,
            router: parse_address("exchange.router", &exchange.router)?,
            explorer_url: exchange.explorer_url.clone(),
            token: parse_address("exchange.token", &exchange.token)?,
            weth: parse_address("exchange.weth", &exchange.weth)?,
            usdt: parse_address("exchange.usdt", &exchange.usdt)?,
        })
    }

    #[must_use]
    pub const fn token(&self) -> Address {
        self.token
    }

    #[must_use]
    pub const fn weth(&self) -> Address {
        self.weth
    }

    #[must_use]
    pub const fn usdt(&self) -> Address {
        self.usdt
    }

    /// Logs the connected wallet's native balance; used as a startup
    /// connectivity probe.
    ///
    /// # Errors
    /// Returns an error if the balance query fails.
    pub async fn probe(&self) -> Result<()> {
        let balance = self
            .provider
            .get_balance(self.wallet_address)
            .await
            .context("failed to read native balance on startup")?;
        tracing::info!(
            wallet = %self.wallet_address,
            balance = %volume_bot_core::format_wei(balance),
            "connected to RPC endpoint"
        );
        Ok(())
    }
}

fn parse_address(name: &str, raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).with_context(|| format!("invalid address in {name}: {raw}"))
}
