//! Settlement record: one ledger row per fill attempt.

use crate::types::Auction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Placeholder id for a hedge that never happened.
pub const NULL_HASH: &str = "0x0";

/// Where a fill transaction stands as far as the ledger knows.
///
/// Records written before statuses existed carry no field and read back as
/// `Filled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Sent, receipt not seen yet. Amounts hold the intended repay only.
    Pending,
    /// Mined and the fill event was decoded.
    #[default]
    Filled,
    /// Mined and reverted; only gas was spent.
    Reverted,
    /// Mined successfully but the fill event could not be read.
    Unreconciled,
}

/// Accounting record of a fill attempt and its hedge.
///
/// Monetary fields serialize as decimal strings. A reverted fill is still
/// recorded with zero amounts so the gas it burned shows up in positions.
/// Records are append-only: a later record with the same `tx_hash`
/// supersedes an earlier one, which is how a `Pending` row gets resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub tx_hash: String,
    pub auction_id: u32,
    pub debt_symbol: String,
    pub collateral_symbol: String,
    pub repay_debt: Decimal,
    pub receive_collateral: Decimal,
    pub hedge_order_id: String,
    pub hedge_sell_collateral: Decimal,
    pub hedge_receive_debt: Decimal,
    pub gas_cost: Decimal,
    #[serde(default)]
    pub status: SettlementStatus,
}

impl SettlementRecord {
    /// Record for a fill that went through on chain, before hedging.
    pub fn filled(
        tx_hash: impl Into<String>,
        auction: &Auction,
        repay_debt: Decimal,
        receive_collateral: Decimal,
        gas_cost: Decimal,
    ) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            auction_id: auction.id,
            debt_symbol: auction.debt_symbol.clone(),
            collateral_symbol: auction.collateral_symbol.clone(),
            repay_debt,
            receive_collateral,
            hedge_order_id: NULL_HASH.to_string(),
            hedge_sell_collateral: Decimal::ZERO,
            hedge_receive_debt: Decimal::ZERO,
            gas_cost,
            status: SettlementStatus::Filled,
        }
    }

    /// Record for a sent fill whose receipt has not been seen.
    pub fn pending(tx_hash: impl Into<String>, auction: &Auction, repay_debt: Decimal) -> Self {
        Self {
            status: SettlementStatus::Pending,
            ..Self::filled(tx_hash, auction, repay_debt, Decimal::ZERO, Decimal::ZERO)
        }
    }

    /// Record for a reverted fill: nothing moved except gas.
    pub fn reverted(tx_hash: impl Into<String>, auction: &Auction, gas_cost: Decimal) -> Self {
        Self::filled(tx_hash, auction, Decimal::ZERO, Decimal::ZERO, gas_cost).into_reverted(gas_cost)
    }

    /// Record for a mined fill whose amounts are unknown.
    pub fn unreconciled(tx_hash: impl Into<String>, auction: &Auction, gas_cost: Decimal) -> Self {
        Self::filled(tx_hash, auction, Decimal::ZERO, Decimal::ZERO, gas_cost).into_unreconciled(gas_cost)
    }

    /// Resolve into a fill with the amounts read from the receipt.
    pub fn into_filled(
        mut self,
        repay_debt: Decimal,
        receive_collateral: Decimal,
        gas_cost: Decimal,
    ) -> Self {
        self.repay_debt = repay_debt;
        self.receive_collateral = receive_collateral;
        self.gas_cost = gas_cost;
        self.status = SettlementStatus::Filled;
        self
    }

    /// Resolve into a revert.
    pub fn into_reverted(mut self, gas_cost: Decimal) -> Self {
        self.repay_debt = Decimal::ZERO;
        self.receive_collateral = Decimal::ZERO;
        self.gas_cost = gas_cost;
        self.status = SettlementStatus::Reverted;
        self
    }

    /// Resolve into a mined fill with unknown amounts.
    pub fn into_unreconciled(mut self, gas_cost: Decimal) -> Self {
        self.repay_debt = Decimal::ZERO;
        self.receive_collateral = Decimal::ZERO;
        self.gas_cost = gas_cost;
        self.status = SettlementStatus::Unreconciled;
        self
    }

    /// Attach the hedge outcome.
    pub fn with_hedge(
        mut self,
        order_id: impl Into<String>,
        sell_collateral: Decimal,
        receive_debt: Decimal,
    ) -> Self {
        self.hedge_order_id = order_id.into();
        self.hedge_sell_collateral = sell_collateral;
        self.hedge_receive_debt = receive_debt;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == SettlementStatus::Pending
    }

    pub fn is_reverted(&self) -> bool {
        self.status == SettlementStatus::Reverted
    }

    pub fn is_unreconciled(&self) -> bool {
        self.status == SettlementStatus::Unreconciled
    }

    pub fn is_hedged(&self) -> bool {
        self.hedge_order_id != NULL_HASH
    }
}
