//! Fill execution.
//!
//! One accepted bid moves through `Pending -> Sent -> Confirmed` and ends in
//! `Filled` or `Reverted`. Every sent transaction produces a settlement
//! record: a reverted fill is recorded with zero amounts so its gas is
//! accounted for, and a fill whose outcome is unknown is recorded as pending
//! until [`FillExecutor::reconcile`] resolves it.

use crate::error::{ExecutorError, ExecutorResult};
use crate::events::FillEvent;
use alloy::primitives::{B256, U256};
use auction_chain::{
    wait_for_receipt, AuctionContract, ChainError, GasPriceSource, Receipt, SendParams,
};
use auction_core::{
    gas_cost, gwei_to_wei, to_decimal, to_raw, Asset, Auction, CoreError, MarketRegistry,
    SettlementRecord,
};
use auction_signer::KeyContext;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Gas limit of the fill call.
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

/// Fill lifecycle, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState {
    Pending,
    Sent,
    Confirmed,
    Filled,
    Reverted,
}

impl fmt::Display for FillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Confirmed => "confirmed",
            Self::Filled => "filled",
            Self::Reverted => "reverted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct FillConfig {
    pub gas_limit: u64,
    /// Added on top of the gas price hint.
    pub gas_price_tip_gwei: Decimal,
    pub receipt_poll_interval: Duration,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price_tip_gwei: Decimal::from(5),
            receipt_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Submits fills and reconciles them from their receipts.
pub struct FillExecutor {
    contract: AuctionContract,
    key: Arc<KeyContext>,
    gas_price: Arc<dyn GasPriceSource>,
    registry: Arc<MarketRegistry>,
    config: FillConfig,
}

impl FillExecutor {
    pub fn new(
        contract: AuctionContract,
        key: Arc<KeyContext>,
        gas_price: Arc<dyn GasPriceSource>,
        registry: Arc<MarketRegistry>,
        config: FillConfig,
    ) -> Self {
        Self {
            contract,
            key,
            gas_price,
            registry,
            config,
        }
    }

    /// Repay `debt` of `auction` and wait for the outcome.
    ///
    /// Blocks until the receipt is mined or `cancel` fires.
    ///
    /// # Errors
    /// - `ExecutorError::Unconfirmed` if the receipt wait ends without a receipt;
    ///   the error carries a pending record for the ledger
    /// - `ExecutorError::Unreconciled` if a successful receipt has no readable
    ///   fill event; the error carries a record charging the gas
    /// - chain or amount errors before the transaction is sent
    pub async fn fill(
        &self,
        auction: &Auction,
        debt: Decimal,
        cancel: &CancellationToken,
    ) -> ExecutorResult<SettlementRecord> {
        let debt_asset = self.asset(&auction.debt_symbol)?;
        self.asset(&auction.collateral_symbol)?;

        let gas_price_gwei = self.gas_price.gas_price_gwei().await + self.config.gas_price_tip_gwei;
        let gas_price_wei = gwei_to_wei(gas_price_gwei)?;
        let params = SendParams {
            from: self.key.address(),
            gas_limit: self.config.gas_limit,
            gas_price: u128::try_from(gas_price_wei)
                .map_err(|_| CoreError::AmountOutOfRange(gas_price_wei.to_string()))?,
            nonce: self.contract.next_nonce(self.key.address()).await?,
        };
        // Gas is charged whatever the receipt says, so its cost must be
        // representable before anything is sent.
        gas_cost(self.config.gas_limit, gas_price_wei)?;
        let repay = repay_amount(debt, debt_asset.decimals)?;

        debug!(
            auction_id = auction.id,
            state = %FillState::Pending,
            %debt,
            repay_raw = %repay,
            %gas_price_gwei,
            nonce = params.nonce,
            "Submitting fill"
        );

        let tx_hash = self
            .contract
            .fill_auction_with_amount(&self.key, &params, auction.id, repay)
            .await?;
        info!(auction_id = auction.id, state = %FillState::Sent, %tx_hash, "Fill sent");

        let pending = SettlementRecord::pending(format!("{tx_hash:#x}"), auction, debt);
        match wait_for_receipt(
            self.contract.rpc(),
            tx_hash,
            self.config.receipt_poll_interval,
            cancel,
        )
        .await
        {
            Ok(receipt) => self.settle_receipt(pending, tx_hash, &receipt, gas_price_wei),
            Err(e) => {
                warn!(
                    auction_id = auction.id,
                    %tx_hash,
                    error = %e,
                    "Receipt wait ended without a receipt, fill recorded as pending"
                );
                Err(ExecutorError::Unconfirmed {
                    record: Box::new(pending),
                })
            }
        }
    }

    /// Look up the receipt of a pending fill once.
    ///
    /// Returns `None` while the transaction is still unmined. Gas is charged at
    /// the receipt's effective price; receipts without one are charged zero.
    ///
    /// # Errors
    /// Returns chain errors from the lookup or an unparsable tx hash.
    pub async fn reconcile(
        &self,
        pending: &SettlementRecord,
    ) -> ExecutorResult<Option<SettlementRecord>> {
        let tx_hash = B256::from_str(&pending.tx_hash)
            .map_err(|e| ChainError::InvalidResponse(format!("tx hash {}: {e}", pending.tx_hash)))?;

        let receipt = match self.contract.rpc().transaction_receipt(tx_hash).await? {
            Some(receipt) if receipt.block_number != 0 => receipt,
            _ => {
                debug!(auction_id = pending.auction_id, %tx_hash, "Pending fill still unmined");
                return Ok(None);
            }
        };

        let gas_price_wei = match receipt.effective_gas_price {
            Some(price) => U256::from(price),
            None => {
                warn!(%tx_hash, "Receipt has no effective gas price, gas cost recorded as zero");
                U256::ZERO
            }
        };

        match self.settle_receipt(pending.clone(), tx_hash, &receipt, gas_price_wei) {
            Ok(record) => Ok(Some(record)),
            Err(ExecutorError::Unreconciled { record, .. }) => Ok(Some(*record)),
            Err(e) => Err(e),
        }
    }

    /// Turn a mined receipt into the final record for `pending`.
    fn settle_receipt(
        &self,
        pending: SettlementRecord,
        tx_hash: B256,
        receipt: &Receipt,
        gas_price_wei: U256,
    ) -> ExecutorResult<SettlementRecord> {
        let auction_id = pending.auction_id;
        debug!(
            auction_id,
            state = %FillState::Confirmed,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "Fill mined"
        );

        let gas = match gas_cost(receipt.gas_used, gas_price_wei) {
            Ok(gas) => gas,
            Err(e) => {
                return Err(self.unreconciled(pending, tx_hash, Decimal::ZERO, e.to_string()));
            }
        };

        if !receipt.success {
            warn!(
                auction_id,
                state = %FillState::Reverted,
                %tx_hash,
                debt = %pending.debt_symbol,
                collateral = %pending.collateral_symbol,
                gas_cost = %gas,
                "Fill reverted"
            );
            return Ok(pending.into_reverted(gas));
        }

        let amounts = FillEvent::from_receipt(receipt)
            .map_err(|e| e.to_string())
            .and_then(|event| event.ok_or_else(|| "no fill event in receipt".to_string()))
            .and_then(|event| {
                let debt = self.asset(&pending.debt_symbol).map_err(|e| e.to_string())?;
                let collateral = self
                    .asset(&pending.collateral_symbol)
                    .map_err(|e| e.to_string())?;
                let repaid = to_decimal(event.repaid_debt, debt.decimals).map_err(|e| e.to_string())?;
                let received = to_decimal(event.received_collateral, collateral.decimals)
                    .map_err(|e| e.to_string())?;
                Ok((repaid, received))
            });
        let (repaid, received) = match amounts {
            Ok(amounts) => amounts,
            Err(reason) => return Err(self.unreconciled(pending, tx_hash, gas, reason)),
        };

        info!(
            auction_id,
            state = %FillState::Filled,
            %tx_hash,
            repaid = %repaid,
            debt = %pending.debt_symbol,
            received = %received,
            collateral = %pending.collateral_symbol,
            gas_cost = %gas,
            "Fill settled"
        );
        Ok(pending.into_filled(repaid, received, gas))
    }

    fn unreconciled(
        &self,
        pending: SettlementRecord,
        tx_hash: B256,
        gas: Decimal,
        reason: String,
    ) -> ExecutorError {
        error!(
            auction_id = pending.auction_id,
            %tx_hash,
            contract = %self.contract.address(),
            %reason,
            "Fill mined but amounts unreadable, check the contract address and ABI"
        );
        ExecutorError::Unreconciled {
            auction_id: pending.auction_id,
            tx_hash,
            reason,
            record: Box::new(pending.into_unreconciled(gas)),
        }
    }

    fn asset(&self, symbol: &str) -> ExecutorResult<&Asset> {
        self.registry
            .asset(symbol)
            .ok_or_else(|| CoreError::UnknownAsset(symbol.to_string()).into())
    }
}

/// Raw repay amount for `debt` of an asset with `decimals`.
pub fn repay_amount(debt: Decimal, decimals: u32) -> ExecutorResult<U256> {
    Ok(to_raw(debt, decimals)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FILL_AUCTION_TOPIC;
    use alloy::primitives::{Address, Bytes, B256};
    use auction_chain::{FixedGasPrice, Log, MockChainRpc, Receipt};
    use auction_core::Market;
    use rust_decimal_macros::dec;

    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn registry() -> Arc<MarketRegistry> {
        let market = Market {
            id: "ETH-DAI".to_string(),
            base: Asset {
                symbol: "ETH".to_string(),
                address: Address::repeat_byte(0x0e),
                decimals: 18,
            },
            quote: Asset {
                symbol: "DAI".to_string(),
                address: Address::repeat_byte(0x0d),
                decimals: 18,
            },
            price_precision: 5,
            price_decimals: 2,
            amount_decimals: 4,
            min_order_size: dec!(10),
        };
        Arc::new(MarketRegistry::from_markets([market]))
    }

    fn auction() -> Auction {
        Auction::new(5, "DAI", "ETH", "ETH-DAI", dec!(100), dec!(40), dec!(1), false)
    }

    fn setup() -> (Arc<MockChainRpc>, FillExecutor) {
        let rpc = Arc::new(MockChainRpc::new());
        rpc.set_nonce(7);
        let contract = AuctionContract::new(rpc.clone(), Address::repeat_byte(0x24), 1);
        let key = Arc::new(KeyContext::from_hex(TEST_PRIVATE_KEY).unwrap());
        let config = FillConfig {
            receipt_poll_interval: Duration::from_millis(1),
            ..Default::default()
        };
        // 15 gwei hint + 5 gwei tip = 20 gwei.
        let executor = FillExecutor::new(
            contract,
            key,
            Arc::new(FixedGasPrice(dec!(15))),
            registry(),
            config,
        );
        (rpc, executor)
    }

    fn fill_log(repaid: U256, received: U256) -> Log {
        let data: Vec<u8> = [U256::ZERO, U256::ZERO, repaid, received]
            .iter()
            .flat_map(|w| w.to_be_bytes::<32>())
            .collect();
        Log {
            address: Address::repeat_byte(0x24),
            topics: vec![FILL_AUCTION_TOPIC],
            data: Bytes::from(data),
        }
    }

    fn receipt(success: bool, logs: Vec<Log>) -> Receipt {
        Receipt {
            tx_hash: B256::ZERO,
            block_number: 1_000,
            success,
            gas_used: 150_000,
            effective_gas_price: None,
            logs,
        }
    }

    #[tokio::test]
    async fn test_successful_fill_reads_amounts_from_event() {
        let (rpc, executor) = setup();
        rpc.set_next_receipt(receipt(
            true,
            vec![fill_log(
                U256::from(60_000_000_000_000_000_000u128),
                U256::from(24_000_000_000_000_000_000u128),
            )],
        ));

        let record = executor
            .fill(&auction(), dec!(60), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rpc.sent_transactions().len(), 1);
        assert_eq!(record.auction_id, 5);
        assert_eq!(record.repay_debt, dec!(60));
        assert_eq!(record.receive_collateral, dec!(24));
        // 150000 gas at 20 gwei.
        assert_eq!(record.gas_cost, dec!(0.003));
        assert!(!record.is_hedged());
        assert!(record.tx_hash.starts_with("0x"));
    }

    #[tokio::test]
    async fn test_reverted_fill_records_zero_amounts() {
        let (rpc, executor) = setup();
        rpc.set_next_receipt(receipt(false, vec![]));

        let record = executor
            .fill(&auction(), dec!(60), &CancellationToken::new())
            .await
            .unwrap();

        assert!(record.is_reverted());
        assert_eq!(record.repay_debt, Decimal::ZERO);
        assert_eq!(record.receive_collateral, Decimal::ZERO);
        assert_eq!(record.gas_cost, dec!(0.003));
    }

    #[tokio::test]
    async fn test_success_without_event_is_recorded_unreconciled() {
        let (rpc, executor) = setup();
        rpc.set_next_receipt(receipt(true, vec![]));

        let result = executor
            .fill(&auction(), dec!(60), &CancellationToken::new())
            .await;
        let Err(err @ ExecutorError::Unreconciled { auction_id: 5, .. }) = result else {
            panic!("expected unreconciled fill");
        };
        let record = err.settlement().unwrap();
        assert!(record.is_unreconciled());
        assert_eq!(record.gas_cost, dec!(0.003));
        assert!(record.repay_debt.is_zero());
    }

    #[tokio::test]
    async fn test_truncated_event_is_recorded_unreconciled() {
        let (rpc, executor) = setup();
        let mut log = fill_log(U256::from(1u64), U256::from(1u64));
        log.data = Bytes::from(vec![0u8; 64]);
        rpc.set_next_receipt(receipt(true, vec![log]));

        let result = executor
            .fill(&auction(), dec!(60), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ExecutorError::Unreconciled { .. })));
        assert_eq!(result.unwrap_err().settlement().unwrap().gas_cost, dec!(0.003));
    }

    #[tokio::test]
    async fn test_cancel_during_receipt_wait_leaves_pending_record() {
        let (rpc, executor) = setup();
        rpc.set_pending_polls(u64::MAX);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = executor.fill(&auction(), dec!(60), &cancel).await;
        let Err(err @ ExecutorError::Unconfirmed { .. }) = result else {
            panic!("expected unconfirmed fill");
        };
        assert!(err.is_cancelled());
        let record = err.settlement().unwrap();
        assert!(record.is_pending());
        assert_eq!(record.auction_id, 5);
        assert_eq!(record.repay_debt, dec!(60));
        assert_eq!(rpc.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_resolves_pending_fill_once_mined() {
        let (rpc, executor) = setup();
        let mut mined = receipt(
            true,
            vec![fill_log(
                U256::from(59_000_000_000_000_000_000u128),
                U256::from(24_000_000_000_000_000_000u128),
            )],
        );
        mined.effective_gas_price = Some(20_000_000_000);
        rpc.set_next_receipt(mined);
        rpc.set_pending_polls(u64::MAX);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = executor.fill(&auction(), dec!(60), &cancel).await.unwrap_err();
        let pending = err.settlement().unwrap().clone();

        assert_eq!(executor.reconcile(&pending).await.unwrap(), None);

        rpc.set_pending_polls(0);
        let record = executor.reconcile(&pending).await.unwrap().unwrap();
        assert_eq!(record.tx_hash, pending.tx_hash);
        assert!(!record.is_pending());
        assert_eq!(record.repay_debt, dec!(59));
        assert_eq!(record.receive_collateral, dec!(24));
        assert_eq!(record.gas_cost, dec!(0.003));
    }

    #[tokio::test]
    async fn test_reconcile_without_gas_price_charges_zero() {
        let (rpc, executor) = setup();
        rpc.set_next_receipt(receipt(false, vec![]));
        rpc.set_pending_polls(u64::MAX);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let pending = executor
            .fill(&auction(), dec!(60), &cancel)
            .await
            .unwrap_err()
            .settlement()
            .unwrap()
            .clone();

        rpc.set_pending_polls(0);
        let record = executor.reconcile(&pending).await.unwrap().unwrap();
        assert!(record.is_reverted());
        assert!(record.gas_cost.is_zero());
    }

    #[tokio::test]
    async fn test_unknown_debt_asset_fails_before_sending() {
        let (rpc, executor) = setup();
        let auction = Auction::new(5, "USDT", "ETH", "ETH-USDT", dec!(100), dec!(40), dec!(1), false);

        let result = executor.fill(&auction, dec!(60), &CancellationToken::new()).await;
        assert!(matches!(result, Err(ExecutorError::Core(CoreError::UnknownAsset(_)))));
        assert!(rpc.sent_transactions().is_empty());
    }

    #[test]
    fn test_repay_amount_truncates() {
        assert_eq!(
            repay_amount(dec!(60.1234567), 6).unwrap(),
            U256::from(60_123_456u64)
        );
    }
}
