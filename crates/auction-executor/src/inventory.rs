//! Inventory assembly.
//!
//! Totals come from the auction contract's `balanceOf`; locks come from the
//! exchange's trading wallet. Free = total - locked.

use crate::error::ExecutorResult;
use alloy::primitives::{Address, U256};
use auction_chain::AuctionContract;
use auction_core::{to_decimal, Asset, Balance, CoreError, Inventory, MarketRegistry};
use auction_exchange::{Exchange, LockedBalance};
use std::sync::Arc;
use tracing::debug;

pub struct InventoryReader {
    contract: AuctionContract,
    exchange: Arc<dyn Exchange>,
    registry: Arc<MarketRegistry>,
    owner: Address,
}

impl InventoryReader {
    pub fn new(
        contract: AuctionContract,
        exchange: Arc<dyn Exchange>,
        registry: Arc<MarketRegistry>,
        owner: Address,
    ) -> Self {
        Self {
            contract,
            exchange,
            registry,
            owner,
        }
    }

    /// Balances of every registered asset.
    pub async fn read_all(&self) -> ExecutorResult<Inventory> {
        let assets: Vec<&Asset> = self.registry.assets().collect();
        self.read_assets(&assets).await
    }

    /// Balances of the named assets only.
    ///
    /// # Errors
    /// Returns `CoreError::UnknownAsset` for a symbol missing from the registry.
    pub async fn read(&self, symbols: &[&str]) -> ExecutorResult<Inventory> {
        let assets = symbols
            .iter()
            .map(|symbol| {
                self.registry
                    .asset(symbol)
                    .ok_or_else(|| CoreError::UnknownAsset((*symbol).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.read_assets(&assets).await
    }

    async fn read_assets(&self, assets: &[&Asset]) -> ExecutorResult<Inventory> {
        let locks = self.exchange.locked_balances().await?;
        let mut inventory = Inventory::new();

        for asset in assets {
            let raw_total = self.contract.balance_of(asset.address, self.owner).await?;
            let total = to_decimal(raw_total, asset.decimals)?;
            let locked = to_decimal(locked_raw(&locks, &asset.symbol), asset.decimals)?;
            let balance = Balance::new(total, locked);

            debug!(
                asset = %asset.symbol,
                total = %balance.total,
                locked = %balance.locked,
                free = %balance.free,
                "Balance"
            );
            inventory.insert(asset.symbol.clone(), balance);
        }

        Ok(inventory)
    }
}

fn locked_raw(locked: &[LockedBalance], symbol: &str) -> U256 {
    locked
        .iter()
        .filter(|l| l.symbol == symbol)
        .fold(U256::ZERO, |sum, l| sum.saturating_add(l.raw_amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;
    use auction_chain::{abi, MockChainRpc};
    use auction_core::Market;
    use auction_exchange::MockExchange;
    use rust_decimal_macros::dec;

    fn word(value: U256) -> String {
        format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
    }

    fn registry() -> Arc<MarketRegistry> {
        let market = Market {
            id: "ETH-USDT".to_string(),
            base: Asset {
                symbol: "ETH".to_string(),
                address: Address::repeat_byte(0x0e),
                decimals: 18,
            },
            quote: Asset {
                symbol: "USDT".to_string(),
                address: Address::repeat_byte(0x06),
                decimals: 6,
            },
            price_precision: 5,
            price_decimals: 2,
            amount_decimals: 4,
            min_order_size: dec!(10),
        };
        Arc::new(MarketRegistry::from_markets([market]))
    }

    fn balance_call(asset: Address, owner: Address) -> Bytes {
        abi::balance_of_call(asset, owner)
    }

    #[tokio::test]
    async fn test_free_is_total_minus_trading_locks() {
        let owner = Address::repeat_byte(0xaa);
        let rpc = Arc::new(MockChainRpc::new());
        rpc.set_call_response(
            balance_call(Address::repeat_byte(0x06), owner),
            word(U256::from(150_000_000u64)),
        );

        let exchange = Arc::new(MockExchange::new());
        exchange.set_locked_balances(vec![
            LockedBalance {
                symbol: "USDT".to_string(),
                raw_amount: U256::from(40_000_000u64),
            },
            LockedBalance {
                symbol: "USDT".to_string(),
                raw_amount: U256::from(10_000_000u64),
            },
        ]);

        let contract = AuctionContract::new(rpc, Address::repeat_byte(0x24), 1);
        let reader = InventoryReader::new(contract, exchange, registry(), owner);
        let inventory = reader.read(&["USDT"]).await.unwrap();

        let usdt = inventory.get("USDT").unwrap();
        assert_eq!(usdt.total, dec!(150));
        assert_eq!(usdt.locked, dec!(50));
        assert_eq!(usdt.free, dec!(100));
        assert!(inventory.get("ETH").is_none());
    }

    #[tokio::test]
    async fn test_read_all_covers_registry() {
        let owner = Address::repeat_byte(0xaa);
        let rpc = Arc::new(MockChainRpc::new());
        rpc.set_call_response(
            balance_call(Address::repeat_byte(0x06), owner),
            word(U256::from(1_000_000u64)),
        );
        rpc.set_call_response(
            balance_call(Address::repeat_byte(0x0e), owner),
            word(U256::from(2_000_000_000_000_000_000u128)),
        );

        let contract = AuctionContract::new(rpc, Address::repeat_byte(0x24), 1);
        let reader =
            InventoryReader::new(contract, Arc::new(MockExchange::new()), registry(), owner);
        let inventory = reader.read_all().await.unwrap();

        assert_eq!(inventory.free("USDT"), dec!(1));
        assert_eq!(inventory.free("ETH"), dec!(2));
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let rpc = Arc::new(MockChainRpc::new());
        let contract = AuctionContract::new(rpc, Address::repeat_byte(0x24), 1);
        let reader = InventoryReader::new(
            contract,
            Arc::new(MockExchange::new()),
            registry(),
            Address::ZERO,
        );
        assert!(reader.read(&["DAI"]).await.is_err());
    }
}
