//! `reqwest`-based `MarketplaceClient` against the Ozon Seller API.
//!
//! Retries follow the reference's reconnect/backoff wrapper in spirit
//! (`core::exchange::reconnecting`) but bounded rather than open-ended: an
//! HTTP request is not a long-lived connection, so there is no circuit
//! breaker, just a fixed attempt cap with linear backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::domain::{SupplyType, Timeslot};
use crate::error::{Error, Result};
use crate::ports::{
    CancelStatus, ClusterInfo, ClusterWarehouse, Credentials, DraftCreateRequest, DraftInfo,
    DraftStatus, DraftWarehouse, DropOffWarehouse, MarketplaceClient, SkuResolution,
    SupplyCancelResult, SupplyCreateRequest, SupplyState, SupplyStatus, TimeslotsRequest,
    TimeslotsResponse, WarehouseState,
};
use crate::time::{from_marketplace_iso, to_marketplace_iso};

/// HTTP 403 with this `code` means the credential has been deactivated on the
/// marketplace side; the engine treats it as fatal, not retryable.
const CODE_API_KEY_DEACTIVATED: i32 = 7;

/// HTTP 404 with this `code` on `draft/create/info` means the draft has
/// aged out; the engine treats it as a normal `DraftStatus::Expired`, not a
/// transport error.
const CODE_DRAFT_EXPIRED: i32 = 5;

pub struct OzonHttpClient {
    http: HttpClient,
    base_url: String,
    config: HttpConfig,
}

impl OzonHttpClient {
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` cannot be built.
    pub fn new(base_url: impl Into<String>, config: HttpConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(Error::Http)?;
        Ok(Self { http, base_url: base_url.into(), config })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_base_ms.saturating_mul(u64::from(attempt)))
    }

    /// POSTs `body` to `path` with auth headers, retrying on 429/5xx/timeout
    /// up to `HttpConfig::retry_attempts`. Returns the raw status and parsed
    /// JSON body for the final attempt; callers interpret non-2xx/403
    /// statuses according to the endpoint's own contract.
    async fn execute(&self, path: &str, credentials: &Credentials, body: &Value) -> Result<(StatusCode, Value)> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let sent = self
                .http
                .post(&url)
                .header("Client-Id", &credentials.client_id)
                .header("Api-Key", &credentials.api_key)
                .json(body)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(err) if attempt < self.config.retry_attempts && (err.is_timeout() || err.is_connect()) => {
                    warn!(path, attempt, "request failed, retrying: {err}");
                    tokio::time::sleep(self.backoff(attempt)).await;
                    continue;
                }
                Err(err) => return Err(Error::Http(err)),
            };

            let status = response.status();
            if (status.as_u16() == 429 || status.is_server_error()) && attempt < self.config.retry_attempts {
                debug!(path, attempt, %status, "retryable status, retrying");
                tokio::time::sleep(self.backoff(attempt)).await;
                continue;
            }

            let parsed: Value = response.json().await?;

            if status == StatusCode::FORBIDDEN
                && (extract_code(&parsed) == Some(CODE_API_KEY_DEACTIVATED) || body_mentions_deactivated(&parsed))
            {
                return Err(Error::CredentialRevoked(
                    extract_message(&parsed).unwrap_or_else(|| "api-key is deactivated".to_string()),
                ));
            }

            return Ok((status, parsed));
        }
    }

    fn require_success(status: StatusCode, body: &Value) -> Result<()> {
        if status.is_success() {
            return Ok(());
        }
        Err(Error::Marketplace(format!(
            "http {status}: {}",
            extract_message(body).unwrap_or_else(|| "no message".to_string())
        )))
    }
}

fn extract_code(body: &Value) -> Option<i32> {
    body.get("code").and_then(Value::as_i64).map(|code| code as i32)
}

fn extract_message(body: &Value) -> Option<String> {
    body.get("message").and_then(Value::as_str).map(str::to_string)
}

/// Some marketplace responses carry the deactivation notice in the message
/// body without the matching `code`, so the check falls back to a substring
/// match on the raw body rather than trusting `code` alone.
fn body_mentions_deactivated(body: &Value) -> bool {
    body.to_string().contains("api-key is deactivated")
}

#[derive(Serialize)]
struct WireDraftItem {
    sku: u64,
    quantity: u32,
}

#[derive(Serialize)]
struct WireDraftCreateRequest {
    cluster_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    drop_off_point_warehouse_id: Option<String>,
    items: Vec<WireDraftItem>,
    #[serde(rename = "type")]
    supply_type: &'static str,
}

fn supply_type_wire(supply_type: SupplyType) -> &'static str {
    match supply_type {
        SupplyType::Direct => "CREATE_TYPE_DIRECT",
        SupplyType::Crossdock => "CREATE_TYPE_CROSSDOCK",
    }
}

#[derive(Deserialize)]
struct WireDraftCreateResponse {
    operation_id: String,
}

#[derive(Deserialize)]
struct WireDraftWarehouse {
    #[serde(alias = "warehouse_id")]
    supply_warehouse_id: String,
    name: String,
    state: String,
    total_rank: Option<i32>,
    total_score: Option<f64>,
}

#[derive(Deserialize)]
struct WireDraftInfoResponse {
    status: String,
    #[serde(default)]
    draft_id: Option<String>,
    #[serde(default)]
    clusters: Vec<WireDraftCluster>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct WireDraftCluster {
    #[serde(default)]
    warehouses: Vec<WireDraftWarehouse>,
}

fn parse_warehouse_state(raw: &str) -> WarehouseState {
    match raw {
        "WAREHOUSE_STATE_FULL_AVAILABLE" => WarehouseState::FullAvailable,
        "WAREHOUSE_STATE_DISABLED" => WarehouseState::Disabled,
        _ => WarehouseState::Draft,
    }
}

fn parse_draft_status(raw: &str) -> DraftStatus {
    match raw {
        "CALCULATION_STATUS_SUCCESS" => DraftStatus::Success,
        "CALCULATION_STATUS_FAILED" => DraftStatus::Failed,
        "CALCULATION_STATUS_EXPIRED" => DraftStatus::Expired,
        _ => DraftStatus::Calculating,
    }
}

#[derive(Serialize)]
struct WireTimeslotsRequest {
    draft_id: String,
    warehouse_ids: Vec<String>,
    date_from: String,
    date_to: String,
}

#[derive(Deserialize)]
struct WireTimeslotDay {
    #[serde(default)]
    timeslots: Vec<WireTimeslot>,
}

#[derive(Deserialize)]
struct WireTimeslot {
    from_in_timezone: String,
    to_in_timezone: String,
}

#[derive(Deserialize)]
struct WireTimeslotWarehouse {
    #[serde(default)]
    days: Vec<WireTimeslotDay>,
    current_time_in_timezone: Option<String>,
    utc_offset_in_minutes: Option<i32>,
}

#[derive(Deserialize)]
struct WireTimeslotsResponse {
    #[serde(default)]
    drop_off_warehouse_timeslots: Vec<WireTimeslotWarehouse>,
}

#[derive(Serialize)]
struct WireSupplyCreateRequest {
    draft_id: String,
    warehouse_id: String,
    timeslot: WireTimeslot,
}

#[derive(Deserialize)]
struct WireSupplyCreateResponse {
    operation_id: String,
}

#[derive(Deserialize)]
struct WireSupplyStatusResponse {
    status: String,
    #[serde(default)]
    order_ids: Vec<u64>,
    #[serde(default)]
    errors: Vec<WireSupplyError>,
}

#[derive(Deserialize)]
struct WireSupplyError {
    #[serde(default)]
    message: Option<String>,
}

fn parse_supply_state(raw: &str) -> SupplyState {
    match raw {
        "ORDER_STATUS_SUCCESS" => SupplyState::Success,
        "ORDER_STATUS_ERROR" => SupplyState::Failed,
        _ => SupplyState::Pending,
    }
}

#[derive(Deserialize)]
struct WireCancelSupplyResponse {
    operation_id: String,
}

#[derive(Deserialize)]
struct WireCancelStatusResponse {
    is_order_cancelled: bool,
    #[serde(default)]
    supplies: Vec<WireSupplyCancelResult>,
}

#[derive(Deserialize)]
struct WireSupplyCancelResult {
    supply_id: String,
    is_supply_cancelled: bool,
    #[serde(default)]
    error_reasons: Vec<String>,
}

#[derive(Deserialize)]
struct WireClusterListResponse {
    #[serde(default)]
    clusters: Vec<WireCluster>,
}

#[derive(Deserialize)]
struct WireCluster {
    #[serde(alias = "cluster_id")]
    id: String,
    name: String,
    #[serde(default)]
    logistic_clusters: Vec<WireLogisticCluster>,
}

#[derive(Deserialize)]
struct WireLogisticCluster {
    #[serde(default)]
    warehouses: Vec<WireClusterWarehouse>,
}

#[derive(Deserialize)]
struct WireClusterWarehouse {
    #[serde(alias = "warehouse_id")]
    supply_warehouse_id: String,
    name: String,
}

#[derive(Deserialize)]
struct WireDropOffListResponse {
    #[serde(default)]
    search: Vec<WireDropOffWarehouse>,
}

#[derive(Deserialize)]
struct WireDropOffWarehouse {
    warehouse_id: String,
    name: String,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Deserialize)]
struct WireProductInfoResponse {
    #[serde(default)]
    items: Vec<WireProductInfoItem>,
}

#[derive(Deserialize)]
struct WireProductInfoItem {
    offer_id: String,
    sku: Option<u64>,
}

#[async_trait]
impl MarketplaceClient for OzonHttpClient {
    async fn create_draft(&self, credentials: &Credentials, request: DraftCreateRequest) -> Result<String> {
        let wire = WireDraftCreateRequest {
            cluster_ids: request.cluster_ids,
            drop_off_point_warehouse_id: request.drop_off_point_warehouse_id,
            items: request
                .items
                .into_iter()
                .map(|item| WireDraftItem { sku: item.sku, quantity: item.quantity })
                .collect(),
            supply_type: supply_type_wire(request.supply_type),
        };
        let (status, body) = self.execute("/v1/draft/create", credentials, &serde_json::to_value(wire)?).await?;
        Self::require_success(status, &body)?;
        let parsed: WireDraftCreateResponse = serde_json::from_value(body)?;
        Ok(parsed.operation_id)
    }

    async fn draft_info(&self, credentials: &Credentials, operation_id: &str) -> Result<DraftInfo> {
        let request = json!({ "operation_id": operation_id });
        let (status, body) = self.execute("/v1/draft/create/info", credentials, &request).await?;

        if status == StatusCode::NOT_FOUND {
            let code = extract_code(&body);
            if code == Some(CODE_DRAFT_EXPIRED) {
                return Ok(DraftInfo {
                    status: DraftStatus::Expired,
                    code,
                    draft_id: None,
                    warehouses: Vec::new(),
                    error_message: extract_message(&body),
                });
            }
            return Err(Error::Marketplace(format!(
                "http 404: {}",
                extract_message(&body).unwrap_or_else(|| "no message".to_string())
            )));
        }
        Self::require_success(status, &body)?;

        let parsed: WireDraftInfoResponse = serde_json::from_value(body)?;
        let warehouses = parsed
            .clusters
            .into_iter()
            .flat_map(|cluster| cluster.warehouses)
            .map(|warehouse| DraftWarehouse {
                warehouse_id: warehouse.supply_warehouse_id,
                name: warehouse.name,
                state: parse_warehouse_state(&warehouse.state),
                total_rank: warehouse.total_rank,
                total_score: warehouse.total_score,
            })
            .collect();

        Ok(DraftInfo {
            status: parse_draft_status(&parsed.status),
            code: None,
            draft_id: parsed.draft_id,
            warehouses,
            error_message: parsed.error_message,
        })
    }

    async fn draft_timeslots(&self, credentials: &Credentials, request: TimeslotsRequest) -> Result<TimeslotsResponse> {
        let wire = WireTimeslotsRequest {
            draft_id: request.draft_id,
            warehouse_ids: request.warehouse_ids,
            date_from: to_marketplace_iso(request.date_from),
            date_to: to_marketplace_iso(request.date_to),
        };
        let (status, body) = self.execute("/v1/draft/timeslot/info", credentials, &serde_json::to_value(wire)?).await?;
        Self::require_success(status, &body)?;

        let parsed: WireTimeslotsResponse = serde_json::from_value(body)?;
        let warehouse = parsed.drop_off_warehouse_timeslots.into_iter().next();
        let (offset_minutes, slots) = match warehouse {
            Some(warehouse) => {
                let offset = warehouse.utc_offset_in_minutes.unwrap_or(0);
                let mut slots = Vec::new();
                for day in warehouse.days {
                    for slot in day.timeslots {
                        slots.push(Timeslot {
                            from: from_marketplace_iso(&slot.from_in_timezone)
                                .map_err(|e| Error::Marketplace(format!("bad timeslot.from: {e}")))?,
                            to: from_marketplace_iso(&slot.to_in_timezone)
                                .map_err(|e| Error::Marketplace(format!("bad timeslot.to: {e}")))?,
                        });
                    }
                }
                let _ = warehouse.current_time_in_timezone;
                (offset, slots)
            }
            None => (0, Vec::new()),
        };

        Ok(TimeslotsResponse { warehouse_timezone_offset_minutes: offset_minutes, slots })
    }

    async fn create_supply(&self, credentials: &Credentials, request: SupplyCreateRequest) -> Result<String> {
        let wire = WireSupplyCreateRequest {
            draft_id: request.draft_id,
            warehouse_id: request.warehouse_id,
            timeslot: WireTimeslot {
                from_in_timezone: to_marketplace_iso(request.timeslot.from),
                to_in_timezone: to_marketplace_iso(request.timeslot.to),
            },
        };
        let (status, body) = self.execute("/v1/draft/supply/create", credentials, &serde_json::to_value(wire)?).await?;
        Self::require_success(status, &body)?;
        let parsed: WireSupplyCreateResponse = serde_json::from_value(body)?;
        Ok(parsed.operation_id)
    }

    async fn supply_status(&self, credentials: &Credentials, operation_id: &str) -> Result<SupplyStatus> {
        let request = json!({ "operation_id": operation_id });
        let (status, body) = self.execute("/v1/draft/supply/create/status", credentials, &request).await?;
        Self::require_success(status, &body)?;
        let parsed: WireSupplyStatusResponse = serde_json::from_value(body)?;
        Ok(SupplyStatus {
            state: parse_supply_state(&parsed.status),
            order_ids: parsed.order_ids,
            errors: parsed.errors.into_iter().filter_map(|e| e.message).collect(),
        })
    }

    async fn cancel_supply(&self, credentials: &Credentials, order_id: u64) -> Result<String> {
        let request = json!({ "order_id": order_id });
        let (status, body) = self.execute("/v2/supply-order/cancel", credentials, &request).await?;
        Self::require_success(status, &body)?;
        let parsed: WireCancelSupplyResponse = serde_json::from_value(body)?;
        Ok(parsed.operation_id)
    }

    async fn cancel_status(&self, credentials: &Credentials, operation_id: &str) -> Result<CancelStatus> {
        let request = json!({ "operation_id": operation_id });
        let (status, body) = self.execute("/v2/supply-order/cancel/status", credentials, &request).await?;
        Self::require_success(status, &body)?;
        let parsed: WireCancelStatusResponse = serde_json::from_value(body)?;
        Ok(CancelStatus {
            is_order_cancelled: parsed.is_order_cancelled,
            supplies: parsed
                .supplies
                .into_iter()
                .map(|s| SupplyCancelResult {
                    supply_id: s.supply_id,
                    is_supply_cancelled: s.is_supply_cancelled,
                    error_reasons: s.error_reasons,
                })
                .collect(),
        })
    }

    async fn list_clusters(&self, credentials: &Credentials, cluster_ids: &[String]) -> Result<Vec<ClusterInfo>> {
        let request = json!({ "cluster_ids": cluster_ids, "cluster_type": "CLUSTER_TYPE_OZON" });
        let (status, body) = self.execute("/v1/cluster/list", credentials, &request).await?;
        Self::require_success(status, &body)?;
        let parsed: WireClusterListResponse = serde_json::from_value(body)?;
        Ok(parsed
            .clusters
            .into_iter()
            .map(|cluster| ClusterInfo {
                id: cluster.id,
                name: cluster.name,
                warehouses: cluster
                    .logistic_clusters
                    .into_iter()
                    .flat_map(|lc| lc.warehouses)
                    .map(|w| ClusterWarehouse { warehouse_id: w.supply_warehouse_id, name: w.name })
                    .collect(),
            })
            .collect())
    }

    async fn search_drop_offs(&self, credentials: &Credentials, query: &str) -> Result<Vec<DropOffWarehouse>> {
        let request = json!({ "search": query, "limit": 50 });
        let (status, body) = self.execute("/v1/warehouse/fbo/list", credentials, &request).await?;
        Self::require_success(status, &body)?;
        let parsed: WireDropOffListResponse = serde_json::from_value(body)?;
        Ok(parsed
            .search
            .into_iter()
            .map(|w| DropOffWarehouse { warehouse_id: w.warehouse_id, name: w.name, address: w.address })
            .collect())
    }

    async fn resolve_offers_to_skus(&self, credentials: &Credentials, articles: &[String]) -> Result<Vec<SkuResolution>> {
        let request = json!({ "offer_id": articles });
        let (status, body) = self.execute("/v3/product/info/list", credentials, &request).await?;
        Self::require_success(status, &body)?;
        let parsed: WireProductInfoResponse = serde_json::from_value(body)?;
        Ok(parsed
            .items
            .into_iter()
            .map(|item| SkuResolution { article: item.offer_id, sku: item.sku })
            .collect())
    }
}
