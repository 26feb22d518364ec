//! Binance REST adapters.
//!
//! Market data comes from the public spot klines endpoint; orders go to the
//! USDT-margined futures endpoint with HMAC SHA256 request signing.
//!
//! # Authentication
//!
//! Signed requests require:
//! - `X-MBX-APIKEY` header
//! - `signature` query parameter (HMAC SHA256 of the query string)
//! - `timestamp` query parameter

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use ebb_domain::{Candle, OrderSide, Symbol};
use ebb_exec::{
    normalize_qty, ExecError, FeedError, LotSizeFilter, MarketDataFeed, OrderExecutionService,
};

// =============================================================================
// Constants
// =============================================================================

/// Binance spot REST base URL (public market data)
const SPOT_API_URL: &str = "https://api.binance.com";

/// Binance USDT-margined futures REST base URL (orders)
const FUTURES_API_URL: &str = "https://fapi.binance.com";

/// Market data request timeout in seconds
const MARKET_DATA_TIMEOUT_SECS: u64 = 5;

/// Order request timeout in seconds
const ORDER_TIMEOUT_SECS: u64 = 8;

/// Minimum usable kline page; shorter responses are treated as unavailable
const MIN_SERIES_LEN: usize = 25;

/// Binance error body for non-2xx responses.
#[derive(Debug, Deserialize)]
struct BinanceErrorResponse {
    code: i64,
    msg: String,
}

// =============================================================================
// Market Data Adapter
// =============================================================================

/// Binance spot klines adapter for the `MarketDataFeed` port.
pub struct BinanceMarketData {
    client: Client,
    base_url: String,
}

impl BinanceMarketData {
    /// Create an adapter against the production spot endpoint.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: SPOT_API_URL.to_string(),
        }
    }

    /// Create an adapter against an explicit base URL (testnets, mocks).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_klines(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>, FeedError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );

        let response = timeout(
            Duration::from_secs(MARKET_DATA_TIMEOUT_SECS),
            self.client.get(&url).send(),
        )
        .await
        .map_err(|_| FeedError::Timeout)?
        .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Parse(e.to_string()))?;

        if !status.is_success() {
            return Err(FeedError::Transport(format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str(&body).map_err(|e| FeedError::Parse(e.to_string()))
    }
}

impl Default for BinanceMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataFeed for BinanceMarketData {
    async fn candles(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        let rows = self.get_klines(symbol, timeframe, limit).await?;
        if rows.len() < MIN_SERIES_LEN {
            return Err(FeedError::Unavailable {
                got: rows.len(),
                need: MIN_SERIES_LEN,
            });
        }

        let candles = rows
            .iter()
            .map(parse_kline)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(symbol = %symbol, timeframe, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    async fn daily_open(&self, symbol: &Symbol) -> Result<Decimal, FeedError> {
        let rows = self.get_klines(symbol, "1d", 2).await?;
        let current_day = rows.last().ok_or(FeedError::Unavailable { got: 0, need: 1 })?;
        decimal_field(current_day, 1)
    }
}

/// Parse one kline row from the index-positional Binance array format.
///
/// Prices and volume arrive as strings, the close time as a number.
fn parse_kline(row: &serde_json::Value) -> Result<Candle, FeedError> {
    let close_time = row
        .get(6)
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| FeedError::Parse("kline row missing close time".to_string()))?;

    Ok(Candle {
        open: decimal_field(row, 1)?,
        high: decimal_field(row, 2)?,
        low: decimal_field(row, 3)?,
        close: decimal_field(row, 4)?,
        volume: decimal_field(row, 5)?,
        close_time,
    })
}

fn decimal_field(row: &serde_json::Value, idx: usize) -> Result<Decimal, FeedError> {
    row.get(idx)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| FeedError::Parse(format!("kline row missing field {}", idx)))?
        .parse::<Decimal>()
        .map_err(|e| FeedError::Parse(format!("kline field {}: {}", idx, e)))
}

// =============================================================================
// Futures Order Adapter
// =============================================================================

/// Binance USDT-margined futures adapter for the `OrderExecutionService`
/// port. Bound to one symbol; its lot filter is fetched once at connect time.
pub struct BinanceFutures {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    symbol: Symbol,
    lot: LotSizeFilter,
}

impl BinanceFutures {
    /// Connect to the production futures endpoint and load the symbol's
    /// lot-size filter from exchange info.
    pub async fn connect(
        api_key: String,
        api_secret: String,
        symbol: Symbol,
    ) -> Result<Self, ExecError> {
        Self::connect_to(FUTURES_API_URL, api_key, api_secret, symbol).await
    }

    /// Connect against an explicit base URL (testnets, mocks).
    pub async fn connect_to(
        base_url: impl Into<String>,
        api_key: String,
        api_secret: String,
        symbol: Symbol,
    ) -> Result<Self, ExecError> {
        let base_url = base_url.into();
        let client = Client::new();

        let url = format!("{}/fapi/v1/exchangeInfo?symbol={}", base_url, symbol);
        let response = timeout(
            Duration::from_secs(ORDER_TIMEOUT_SECS),
            client.get(&url).send(),
        )
        .await
        .map_err(|_| ExecError::Timeout)?
        .map_err(|e| ExecError::Transport(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ExecError::Parse(e.to_string()))?;
        let lot = lot_filter_from_exchange_info(&body, symbol.as_str())?;

        debug!(symbol = %symbol, step = %lot.step_size, min = %lot.min_qty, "lot filter loaded");
        Ok(Self {
            client,
            base_url,
            api_key,
            api_secret,
            symbol,
            lot,
        })
    }

    /// Lot filter currently in effect for the bound symbol.
    pub fn lot_filter(&self) -> LotSizeFilter {
        self.lot
    }
}

#[async_trait]
impl OrderExecutionService for BinanceFutures {
    async fn place_market_order(
        &self,
        side: OrderSide,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<Decimal, ExecError> {
        if quantity <= Decimal::ZERO {
            return Err(ExecError::InvalidQuantity(quantity));
        }
        let filled = normalize_qty(quantity, &self.lot)?;

        let client_order_id = Uuid::now_v7().to_string();
        let params = vec![
            ("symbol", self.symbol.as_str().to_string()),
            ("side", side.to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", filled.to_string()),
            ("reduceOnly", reduce_only.to_string()),
            ("newClientOrderId", client_order_id),
        ];
        let query = build_signed_query(&self.api_secret, params)?;
        let url = format!("{}/fapi/v1/order?{}", self.base_url, query);

        let response = timeout(
            Duration::from_secs(ORDER_TIMEOUT_SECS),
            self.client
                .post(&url)
                .header("X-MBX-APIKEY", &self.api_key)
                .send(),
        )
        .await
        .map_err(|_| ExecError::Timeout)?
        .map_err(|e| ExecError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecError::Parse(e.to_string()))?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<BinanceErrorResponse>(&body) {
                warn!(code = err.code, msg = %err.msg, "order rejected by venue");
                return Err(ExecError::Rejected {
                    code: err.code,
                    msg: err.msg,
                });
            }
            return Err(ExecError::Transport(format!("HTTP {}: {}", status, body)));
        }

        debug!(symbol = %self.symbol, %side, qty = %filled, reduce_only, "market order filled");
        Ok(filled)
    }
}

// =============================================================================
// Signing
// =============================================================================

/// Build a sorted, signed query string.
///
/// Binance requires all parameters in the query string plus a `timestamp`,
/// with an HMAC SHA256 signature of the whole string appended last.
fn build_signed_query(
    api_secret: &str,
    mut params: Vec<(&str, String)>,
) -> Result<String, ExecError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ExecError::Signature(e.to_string()))?
        .as_millis()
        .to_string();
    params.push(("timestamp", timestamp));
    params.sort_by(|a, b| a.0.cmp(b.0));

    let query_string: String = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let signature = sign(api_secret, &query_string)?;
    Ok(format!("{}&signature={}", query_string, signature))
}

/// HMAC SHA256 of the payload, hex encoded.
fn sign(api_secret: &str, payload: &str) -> Result<String, ExecError> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| ExecError::Signature(format!("HMAC error: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Extract the LOT_SIZE filter for a symbol from an exchange-info body.
fn lot_filter_from_exchange_info(body: &str, symbol: &str) -> Result<LotSizeFilter, ExecError> {
    #[derive(Debug, Deserialize)]
    struct ExchangeInfo {
        symbols: Vec<SymbolInfo>,
    }

    #[derive(Debug, Deserialize)]
    struct SymbolInfo {
        symbol: String,
        filters: Vec<SymbolFilter>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct SymbolFilter {
        filter_type: String,
        step_size: Option<String>,
        min_qty: Option<String>,
    }

    let info: ExchangeInfo =
        serde_json::from_str(body).map_err(|e| ExecError::Parse(e.to_string()))?;

    let sym = info
        .symbols
        .iter()
        .find(|s| s.symbol == symbol)
        .ok_or_else(|| ExecError::Parse(format!("symbol {} not in exchange info", symbol)))?;

    let lot = sym
        .filters
        .iter()
        .find(|f| f.filter_type == "LOT_SIZE")
        .ok_or_else(|| ExecError::Parse(format!("no LOT_SIZE filter for {}", symbol)))?;

    let step_size = lot
        .step_size
        .as_deref()
        .ok_or_else(|| ExecError::Parse("LOT_SIZE missing stepSize".to_string()))?
        .parse::<Decimal>()
        .map_err(|e| ExecError::Parse(format!("stepSize: {}", e)))?;
    let min_qty = lot
        .min_qty
        .as_deref()
        .ok_or_else(|| ExecError::Parse("LOT_SIZE missing minQty".to_string()))?
        .parse::<Decimal>()
        .map_err(|e| ExecError::Parse(format!("minQty: {}", e)))?;

    Ok(LotSizeFilter { step_size, min_qty })
}

// =============================================================================
// Tests
// =============================================================================
