//! Main application orchestration.
//!
//! Coordinates all components:
//! - Block scheduler (one scan per new block)
//! - Auction decoding and bid decisions
//! - Fill on chain, then hedge on the exchange
//! - Settlement ledger and metrics

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use auction_chain::{
    AuctionContract, BlockScheduler, ChainRpc, GasPriceSource, GasStationOracle, HttpRpc,
};
use auction_core::{Auction, MarketRegistry, SettlementRecord};
use auction_decoder::AuctionDecoder;
use auction_exchange::{BookLevel, Exchange, ExchangeClient};
use auction_executor::{
    ExecutorError, FillConfig, FillExecutor, HedgeConfig, HedgeExecutor, InventoryReader,
};
use auction_persistence::{PositionBook, SettlementLedger};
use auction_signer::{AuthTokenCache, KeyContext};
use auction_strategy::{BidEngine, Rejection};
use auction_telemetry::Metrics;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of one block scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Auctions decoded this block.
    pub scanned: usize,
    /// Fill transactions mined (filled, reverted or unreconciled).
    pub settled: usize,
    /// Shutdown interrupted the scan.
    pub interrupted: bool,
}

/// Components that need the exchange's market list.
struct Pipeline {
    registry: Arc<MarketRegistry>,
    decoder: AuctionDecoder,
    engine: BidEngine,
    inventory: InventoryReader,
    fill: FillExecutor,
    hedge: HedgeExecutor,
}

/// Why an auction was skipped before filling.
enum Skip {
    Rejected(Rejection),
    Unavailable(&'static str),
}

/// Main application.
pub struct Application {
    config: AppConfig,
    rpc: Arc<dyn ChainRpc>,
    contract: AuctionContract,
    exchange: Arc<dyn Exchange>,
    key: Arc<KeyContext>,
    gas_price: Arc<dyn GasPriceSource>,
    ledger: Mutex<SettlementLedger>,
    cancel: CancellationToken,
    // Built by `bootstrap()`
    pipeline: Option<Pipeline>,
}

impl Application {
    /// Create the application with live chain, exchange and gas sources.
    ///
    /// Loads the private key; nothing touches the network until `bootstrap()`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let key = Arc::new(KeyContext::load(
            &config.key_source(),
            config.expected_address()?,
        )?);
        info!(address = %key.address(), "Key loaded");

        let rpc: Arc<dyn ChainRpc> = Arc::new(HttpRpc::new(config.chain.rpc_url.clone())?);
        let auth = Arc::new(AuthTokenCache::new(key.clone()));
        let exchange: Arc<dyn Exchange> =
            Arc::new(ExchangeClient::new(config.exchange_url(), auth)?);
        let gas_price: Arc<dyn GasPriceSource> = Arc::new(GasStationOracle::new(
            config.gas.station_url.clone(),
            config.gas.fallback_gwei,
            config.gas.cap_gwei,
        ));

        Self::with_components(config, rpc, exchange, key, gas_price)
    }

    /// Create the application over caller-supplied chain, exchange and gas sources.
    pub fn with_components(
        config: AppConfig,
        rpc: Arc<dyn ChainRpc>,
        exchange: Arc<dyn Exchange>,
        key: Arc<KeyContext>,
        gas_price: Arc<dyn GasPriceSource>,
    ) -> AppResult<Self> {
        let contract = AuctionContract::new(rpc.clone(), config.contract_address()?, config.chain_id());
        let ledger = SettlementLedger::open(&config.persistence.data_dir)?;

        info!(
            network = ?config.network,
            chain_id = contract.chain_id(),
            contract = %contract.address(),
            exchange = %config.exchange_url(),
            ledger = %ledger.base_dir().display(),
            "Application created"
        );

        Ok(Self {
            config,
            rpc,
            contract,
            exchange,
            key,
            gas_price,
            ledger: Mutex::new(ledger),
            cancel: CancellationToken::new(),
            pipeline: None,
        })
    }

    /// Token that stops `run()` and interrupts in-flight fills and hedges.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Market registry loaded by `bootstrap()`.
    pub fn registry(&self) -> Option<&MarketRegistry> {
        self.pipeline.as_ref().map(|p| p.registry.as_ref())
    }

    /// Load markets, clear stale hedge orders, resolve fills left pending by
    /// an earlier shutdown and report the ledger's positions.
    pub async fn bootstrap(&mut self) -> AppResult<()> {
        let markets = self.exchange.markets().await?;
        let registry = Arc::new(MarketRegistry::from_markets(markets));
        if registry.is_empty() {
            return Err(AppError::Startup("exchange returned no markets".to_string()));
        }
        info!(
            markets = registry.markets().count(),
            assets = registry.assets().count(),
            "Market registry loaded"
        );

        for market_id in &self.config.strategy.markets {
            if registry.market(market_id).is_none() {
                warn!(market = %market_id, "Configured market not listed on exchange");
                continue;
            }
            self.exchange.cancel_all_orders(market_id).await?;
            info!(market = %market_id, "Cancelled open orders");
        }

        self.pipeline = Some(self.build_pipeline(registry));
        self.reconcile_pending().await?;
        self.report_positions().await?;
        Ok(())
    }

    /// Look up the receipt of every pending fill in the ledger once and
    /// append the resolved record, which supersedes the pending one.
    async fn reconcile_pending(&self) -> AppResult<()> {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Ok(());
        };
        let book = PositionBook::from_records(self.ledger.lock().read_all()?);
        let pending: Vec<SettlementRecord> = book.pending().cloned().collect();

        for record in &pending {
            match pipeline.fill.reconcile(record).await {
                Ok(Some(resolved)) => {
                    info!(
                        tx_hash = %resolved.tx_hash,
                        auction_id = resolved.auction_id,
                        status = ?resolved.status,
                        "Pending fill reconciled"
                    );
                    self.record(&resolved);
                }
                Ok(None) => warn!(
                    tx_hash = %record.tx_hash,
                    auction_id = record.auction_id,
                    "Pending fill still unmined"
                ),
                Err(e) => warn!(
                    tx_hash = %record.tx_hash,
                    auction_id = record.auction_id,
                    error = %e,
                    "Failed to reconcile pending fill"
                ),
            }
        }
        Ok(())
    }

    fn build_pipeline(&self, registry: Arc<MarketRegistry>) -> Pipeline {
        let fill_config = FillConfig {
            gas_limit: self.config.gas.gas_limit,
            gas_price_tip_gwei: self.config.gas.tip_gwei,
            receipt_poll_interval: self.config.receipt_poll_interval(),
        };
        let hedge_config = HedgeConfig {
            max_slippage: self.config.strategy.max_slippage,
            retry_interval: self.config.hedge_retry_interval(),
        };

        Pipeline {
            decoder: AuctionDecoder::new(registry.clone(), self.config.debt_growth_factor),
            engine: BidEngine::new(self.config.strategy.clone()),
            inventory: InventoryReader::new(
                self.contract.clone(),
                self.exchange.clone(),
                registry.clone(),
                self.key.address(),
            ),
            fill: FillExecutor::new(
                self.contract.clone(),
                self.key.clone(),
                self.gas_price.clone(),
                registry.clone(),
                fill_config,
            ),
            hedge: HedgeExecutor::new(self.exchange.clone(), hedge_config),
            registry,
        }
    }

    async fn report_positions(&self) -> AppResult<()> {
        let book = PositionBook::from_records(self.ledger.lock().read_all()?);
        if book.is_empty() {
            info!("Settlement ledger is empty");
            return Ok(());
        }

        info!(fills = book.len(), "Settlement ledger loaded");
        for (symbol, amount) in book.positions() {
            info!(%symbol, %amount, "Net position");
        }
        let value_usd = self.value_usd(&book).await;
        info!(%value_usd, "Net position value");

        for record in book.unhedged() {
            warn!(
                tx_hash = %record.tx_hash,
                auction_id = record.auction_id,
                collateral = %record.collateral_symbol,
                amount = %record.receive_collateral,
                "Unhedged collateral from earlier fill"
            );
        }
        for record in book.pending() {
            warn!(
                tx_hash = %record.tx_hash,
                auction_id = record.auction_id,
                "Fill outcome still unknown"
            );
        }
        Ok(())
    }

    /// USD value of the ledger's net positions at current exchange prices.
    pub async fn position_value_usd(&self) -> AppResult<Decimal> {
        let book = PositionBook::from_records(self.ledger.lock().read_all()?);
        Ok(self.value_usd(&book).await)
    }

    /// Symbols without a USD price are left out.
    async fn value_usd(&self, book: &PositionBook) -> Decimal {
        let mut usd_prices = HashMap::new();
        for symbol in book.positions().into_keys() {
            match self.exchange.asset_usd_price(&symbol).await {
                Ok(price) => {
                    usd_prices.insert(symbol, price);
                }
                Err(e) => debug!(%symbol, error = %e, "No USD price for position"),
            }
        }
        book.value_usd(&usd_prices)
    }

    /// Run until Ctrl-C or `cancel_token()` fires.
    pub async fn run(&mut self) -> AppResult<()> {
        if self.pipeline.is_none() {
            self.bootstrap().await?;
        }

        let scheduler = BlockScheduler::new(self.rpc.clone(), self.config.block_poll_interval());
        let (mut ticks, scheduler_handle) = scheduler.spawn(self.cancel.clone());

        let signal_cancel = self.cancel.clone();
        let signal_handle = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                signal_cancel.cancel();
            }
        });

        info!("Entering block loop");
        let cancel = self.cancel.clone();
        let mut blocks = 0u64;
        loop {
            let height = tokio::select! {
                height = ticks.next() => match height {
                    Some(height) => height,
                    None => break,
                },
                _ = cancel.cancelled() => break,
            };

            blocks += 1;
            let summary = self.scan_block(height).await;
            if summary.interrupted {
                break;
            }
        }

        info!(blocks, "Shutting down");
        self.cancel.cancel();
        signal_handle.abort();
        if let Err(e) = scheduler_handle.await {
            warn!(?e, "Block scheduler task failed");
        }
        self.ledger.lock().close();
        self.export_metrics();
        Ok(())
    }

    /// Decode every open auction at `height` and act on each in order.
    ///
    /// Nothing here is fatal: failures are logged and the auction is retried
    /// on the next block.
    pub async fn scan_block(&self, height: u64) -> ScanSummary {
        let mut summary = ScanSummary::default();
        let Some(pipeline) = self.pipeline.as_ref() else {
            warn!(height, "Scan before bootstrap, skipping");
            return summary;
        };

        Metrics::block_processed(height);
        let auctions = match pipeline.decoder.fetch_auctions(&self.contract).await {
            Ok(auctions) => auctions,
            Err(e) => {
                warn!(height, error = %e, "Failed to list auctions");
                return summary;
            }
        };
        summary.scanned = auctions.len();
        debug!(height, auctions = auctions.len(), "Scanning block");

        for auction in &auctions {
            Metrics::auction_scanned();
            if self.cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let debt = match self.decide(pipeline, auction).await {
                Ok(debt) => debt,
                Err(Skip::Rejected(rejection)) => {
                    debug!(
                        auction_id = auction.id,
                        debt = %auction.debt_symbol,
                        available_debt = %auction.available_debt,
                        collateral = %auction.collateral_symbol,
                        available_collateral = %auction.available_collateral,
                        reason = rejection.reason(),
                        %rejection,
                        "Auction skipped"
                    );
                    Metrics::rejected(rejection.reason());
                    continue;
                }
                Err(Skip::Unavailable(reason)) => {
                    debug!(
                        auction_id = auction.id,
                        debt = %auction.debt_symbol,
                        collateral = %auction.collateral_symbol,
                        reason,
                        "Auction skipped"
                    );
                    Metrics::rejected(reason);
                    continue;
                }
            };

            match self.settle(pipeline, auction, debt).await {
                Settled::Mined => summary.settled += 1,
                Settled::NotMined => {}
                Settled::Interrupted { mined } => {
                    if mined {
                        summary.settled += 1;
                    }
                    summary.interrupted = true;
                    break;
                }
            }
        }

        self.export_metrics();
        summary
    }

    /// Run the bid checks, fetching balances, price and depth only as needed.
    async fn decide(&self, pipeline: &Pipeline, auction: &Auction) -> Result<Decimal, Skip> {
        pipeline.engine.screen(auction).map_err(Skip::Rejected)?;

        let market = pipeline
            .registry
            .market(&auction.trading_pair)
            .ok_or_else(|| Skip::Rejected(Rejection::UnknownMarket(auction.trading_pair.clone())))?;

        let inventory = pipeline
            .inventory
            .read(&[auction.debt_symbol.as_str()])
            .await
            .map_err(|e| {
                warn!(auction_id = auction.id, error = %e, "Failed to read inventory");
                Skip::Unavailable("inventory_unavailable")
            })?;

        let usd_price = self
            .exchange
            .asset_usd_price(&auction.collateral_symbol)
            .await
            .map_err(|e| {
                warn!(auction_id = auction.id, symbol = %auction.collateral_symbol, error = %e, "No USD price");
                Skip::Unavailable("price_unavailable")
            })?;

        let sizing = pipeline
            .engine
            .size(auction, &inventory, usd_price)
            .map_err(Skip::Rejected)?;

        let book = self
            .exchange
            .order_book(&market.id, BookLevel::Aggregated)
            .await
            .map_err(|e| {
                warn!(auction_id = auction.id, market = %market.id, error = %e, "Failed to fetch order book");
                Skip::Unavailable("book_unavailable")
            })?;

        let decision = pipeline
            .engine
            .assess(auction, sizing, market, &book)
            .map_err(Skip::Rejected)?;

        info!(
            auction_id = auction.id,
            market = %market.id,
            debt = %decision.debt,
            collateral = %decision.collateral,
            expected_receive = %decision.expected_receive,
            "Bidding on auction"
        );
        Ok(decision.debt)
    }

    /// Fill, then hedge what the fill delivered; every sent fill is recorded.
    async fn settle(&self, pipeline: &Pipeline, auction: &Auction, debt: Decimal) -> Settled {
        let record = match pipeline.fill.fill(auction, debt, &self.cancel).await {
            Ok(record) => record,
            Err(e) => return self.fill_failed(auction, &e),
        };

        if record.is_reverted() {
            Metrics::fill("reverted");
            self.record(&record);
            return Settled::Mined;
        }
        Metrics::fill("filled");

        if record.receive_collateral <= Decimal::ZERO {
            self.record(&record);
            return Settled::Mined;
        }

        // The decoder only yields auctions whose pair is listed.
        let Some(market) = pipeline.registry.market(&auction.trading_pair) else {
            self.record(&record);
            return Settled::Mined;
        };

        match pipeline
            .hedge
            .hedge(market, &auction.collateral_symbol, record.receive_collateral, &self.cancel)
            .await
        {
            Ok(outcome) => {
                Metrics::hedge_attempts(outcome.attempts);
                let complete = outcome.complete;
                let record =
                    record.with_hedge(outcome.order_id, outcome.sell_collateral, outcome.receive_debt);
                self.record(&record);
                if complete {
                    return Settled::Mined;
                }
                Metrics::hedge_abandoned();
                warn!(
                    tx_hash = %record.tx_hash,
                    collateral = %auction.collateral_symbol,
                    sold = %record.hedge_sell_collateral,
                    amount = %record.receive_collateral,
                    "Hedge interrupted, collateral partly unhedged"
                );
                Settled::Interrupted { mined: true }
            }
            Err(e) => {
                let interrupted = e.is_cancelled();
                if interrupted {
                    Metrics::hedge_abandoned();
                }
                warn!(
                    tx_hash = %record.tx_hash,
                    collateral = %auction.collateral_symbol,
                    amount = %record.receive_collateral,
                    error = %e,
                    "Hedge abandoned, collateral left unhedged"
                );
                self.record(&record);
                if interrupted {
                    Settled::Interrupted { mined: true }
                } else {
                    Settled::Mined
                }
            }
        }
    }

    /// Record what a failed fill still owes the ledger.
    fn fill_failed(&self, auction: &Auction, e: &ExecutorError) -> Settled {
        let Some(owed) = e.settlement() else {
            if e.is_cancelled() {
                Metrics::fill("cancelled");
                return Settled::Interrupted { mined: false };
            }
            error!(auction_id = auction.id, error = %e, "Fill failed");
            Metrics::fill("error");
            return Settled::NotMined;
        };

        self.record(owed);
        if owed.is_pending() {
            Metrics::fill("unconfirmed");
            Settled::Interrupted { mined: false }
        } else {
            Metrics::fill("unreconciled");
            Settled::Mined
        }
    }

    fn record(&self, record: &SettlementRecord) {
        if let Err(e) = self.ledger.lock().append(record) {
            error!(tx_hash = %record.tx_hash, error = %e, "Failed to persist settlement");
        }
    }

    fn export_metrics(&self) {
        if let Some(path) = &self.config.telemetry.metrics_file {
            if let Err(e) = Metrics::write_textfile(path) {
                warn!(path = %path.display(), error = %e, "Failed to write metrics file");
            }
        }
    }
}

/// What a fill attempt left behind.
enum Settled {
    /// A transaction was mined and recorded.
    Mined,
    /// Nothing reached the chain.
    NotMined,
    /// Shutdown interrupted the fill or its hedge.
    Interrupted { mined: bool },
}
