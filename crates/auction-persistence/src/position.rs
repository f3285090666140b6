//! Position aggregation over settlement records.

use auction_core::{SettlementRecord, SettlementStatus};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Symbol gas costs are charged to.
pub const NATIVE_SYMBOL: &str = "ETH";

/// Net asset changes caused by the bidder.
///
/// Per record: collateral += received - hedge sold, debt += hedge received -
/// repaid, native -= gas cost. A record whose tx hash was already applied
/// replaces the earlier one. Pending records are held until a later record
/// resolves them and contribute nothing meanwhile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionBook {
    records: HashMap<String, SettlementRecord>,
    order: Vec<String>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SettlementRecord>) -> Self {
        let mut book = Self::new();
        for record in records {
            book.apply(record);
        }
        book
    }

    pub fn apply(&mut self, record: SettlementRecord) {
        if !self.records.contains_key(&record.tx_hash) {
            self.order.push(record.tx_hash.clone());
        }
        self.records.insert(record.tx_hash.clone(), record);
    }

    /// Number of distinct fills.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.order.iter().filter_map(|hash| self.records.get(hash))
    }

    /// Filled records whose collateral was never sold.
    pub fn unhedged(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.iter()
            .filter(|r| r.status == SettlementStatus::Filled && !r.is_hedged())
    }

    /// Sent fills whose outcome is still unknown.
    pub fn pending(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.iter().filter(|r| r.is_pending())
    }

    /// Net change per asset symbol.
    pub fn positions(&self) -> BTreeMap<String, Decimal> {
        let mut positions: BTreeMap<String, Decimal> = BTreeMap::new();
        for record in self.records.values().filter(|r| !r.is_pending()) {
            *positions.entry(record.collateral_symbol.clone()).or_default() +=
                record.receive_collateral - record.hedge_sell_collateral;
            *positions.entry(record.debt_symbol.clone()).or_default() +=
                record.hedge_receive_debt - record.repay_debt;
            *positions.entry(NATIVE_SYMBOL.to_string()).or_default() -= record.gas_cost;
        }
        positions
    }

    /// Total USD value of all positions; symbols without a price are skipped.
    pub fn value_usd(&self, usd_prices: &HashMap<String, Decimal>) -> Decimal {
        self.positions()
            .iter()
            .filter_map(|(symbol, amount)| usd_prices.get(symbol).map(|price| amount * price))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::Auction;
    use rust_decimal_macros::dec;

    fn auction(debt: &str, collateral: &str) -> Auction {
        Auction::new(1, debt, collateral, "ETH-DAI", dec!(100), dec!(40), dec!(1), false)
    }

    #[test]
    fn test_hedged_fill() {
        let record = SettlementRecord::filled("0x01", &auction("DAI", "ETH"), dec!(60), dec!(24), dec!(0.003))
            .with_hedge("0xorder", dec!(24), dec!(70));
        let book = PositionBook::from_records([record]);

        let positions = book.positions();
        assert_eq!(positions["DAI"], dec!(10));
        // 24 received, 24 sold, 0.003 gas.
        assert_eq!(positions["ETH"], dec!(-0.003));
        assert_eq!(book.unhedged().count(), 0);
    }

    #[test]
    fn test_unhedged_and_reverted() {
        let open = SettlementRecord::filled("0x01", &auction("ETH", "DAI"), dec!(1), dec!(250), dec!(0.002));
        let reverted = SettlementRecord::reverted("0x02", &auction("ETH", "DAI"), dec!(0.001));
        let book = PositionBook::from_records([open, reverted]);

        let positions = book.positions();
        assert_eq!(positions["DAI"], dec!(250));
        assert_eq!(positions["ETH"], dec!(-1.003));
        assert_eq!(book.unhedged().map(|r| r.tx_hash.as_str()).collect::<Vec<_>>(), vec!["0x01"]);
    }

    #[test]
    fn test_later_record_replaces_earlier() {
        let a = auction("DAI", "ETH");
        let unhedged = SettlementRecord::filled("0x01", &a, dec!(60), dec!(24), dec!(0.003));
        let hedged = unhedged.clone().with_hedge("0xorder", dec!(24), dec!(70));

        let book = PositionBook::from_records([unhedged, hedged]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.positions()["DAI"], dec!(10));
    }

    #[test]
    fn test_pending_counts_only_once_resolved() {
        let a = auction("DAI", "ETH");
        let pending = SettlementRecord::pending("0x01", &a, dec!(60));
        let book = PositionBook::from_records([pending.clone()]);
        assert_eq!(book.pending().count(), 1);
        assert!(book.positions().is_empty());
        assert_eq!(book.unhedged().count(), 0);

        let resolved = pending.into_filled(dec!(60), dec!(24), dec!(0.003));
        let book = PositionBook::from_records([SettlementRecord::pending("0x01", &a, dec!(60)), resolved]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.pending().count(), 0);
        assert_eq!(book.positions()["ETH"], dec!(23.997));
        assert_eq!(book.unhedged().count(), 1);
    }

    #[test]
    fn test_unreconciled_charges_gas_only() {
        let record = SettlementRecord::unreconciled("0x01", &auction("DAI", "ETH"), dec!(0.003));
        let book = PositionBook::from_records([record]);
        assert_eq!(book.positions()["ETH"], dec!(-0.003));
        assert_eq!(book.positions()["DAI"], dec!(0));
        assert_eq!(book.unhedged().count(), 0);
    }

    #[test]
    fn test_value_usd() {
        let record = SettlementRecord::filled("0x01", &auction("DAI", "ETH"), dec!(60), dec!(24), dec!(0))
            .with_hedge("0xorder", dec!(24), dec!(70));
        let book = PositionBook::from_records([record]);

        let prices = HashMap::from([("DAI".to_string(), dec!(1))]);
        assert_eq!(book.value_usd(&prices), dec!(10));
    }
}
