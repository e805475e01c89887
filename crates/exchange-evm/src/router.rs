use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use volume_bot_core::events::{SwapReceipt, TradeDirection};
use volume_bot_core::format_wei;
use volume_bot_core::traits::ExchangeClient;

use crate::client::EvmExchangeClient;

// Uniswap-V2-style router surface: one read-only quote, one swap per
// direction. The wallet must have granted the router ERC-20 approval for
// sells; `ensure_allowance` tops it up when it runs short.
sol! {
    #[sol(rpc)]
    contract IUniswapV2Router {
        function getAmountsOut(uint256 amountIn, address[] calldata path)
            external view returns (uint256[] memory amounts);
        function swapExactETHForTokens(
            uint256 amountOutMin, address[] calldata path, address to, uint256 deadline
        ) external payable returns (uint256[] memory amounts);
        function swapExactTokensForETH(
            uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline
        ) external returns (uint256[] memory amounts);
    }

    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

const SWAP_GAS_LIMIT: u64 = 300_000;

#[async_trait]
impl ExchangeClient for EvmExchangeClient {
    fn wallet_address(&self) -> Address {
        self.wallet_address
    }

    async fn native_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.wallet_address)
            .await
            .context("failed to read native balance")
    }

    async fn token_balance(&self, token: Address) -> Result<U256> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(self.wallet_address)
            .call()
            .await
            .context("failed to read token balance")
    }

    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>> {
        let amounts = IUniswapV2Router::new(self.router, self.provider.clone())
            .getAmountsOut(amount_in, path.to_vec())
            .call()
            .await
            .context("getAmountsOut quote failed")?;
        debug!(
            amount_in = %format_wei(amount_in),
            hops = path.len(),
            "quoted amounts along path"
        );
        Ok(amounts)
    }

    async fn ensure_allowance(&self, token: Address, amount: U256) -> Result<()> {
        let erc20 = IERC20::new(token, self.provider.clone());
        let allowance = erc20
            .allowance(self.wallet_address, self.router)
            .call()
            .await
            .context("failed to read router allowance")?;

        if allowance >= amount {
            return Ok(());
        }

        info!(
            token = %token,
            allowance = %format_wei(allowance),
            required = %format_wei(amount),
            "router allowance is short; approving"
        );
        let receipt = erc20
            .approve(self.router, U256::MAX)
            .send()
            .await
            .context("failed to submit approval")?
            .get_receipt()
            .await
            .context("approval confirmation failed")?;
        if !receipt.status() {
            anyhow::bail!("approval transaction {} reverted", receipt.transaction_hash);
        }
        Ok(())
    }

    async fn swap(
        &self,
        direction: TradeDirection,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        deadline: u64,
    ) -> Result<SwapReceipt> {
        let router = IUniswapV2Router::new(self.router, self.provider.clone());
        let deadline = U256::from(deadline);

        let pending = match direction {
            TradeDirection::Buy => router
                .swapExactETHForTokens(
                    amount_out_min,
                    path.to_vec(),
                    self.wallet_address,
                    deadline,
                )
                .value(amount_in)
                .gas(SWAP_GAS_LIMIT)
                .send()
                .await
                .context("failed to submit buy swap")?,
            TradeDirection::Sell => router
                .swapExactTokensForETH(
                    amount_in,
                    amount_out_min,
                    path.to_vec(),
                    self.wallet_address,
                    deadline,
                )
                .gas(SWAP_GAS_LIMIT)
                .send()
                .await
                .context("failed to submit sell swap")?,
        };

        let receipt = pending
            .get_receipt()
            .await
            .context("swap confirmation failed")?;

        Ok(SwapReceipt {
            tx_url: format!("{}{:#x}", self.explorer_url, receipt.transaction_hash),
            success: receipt.status(),
        })
    }
}
