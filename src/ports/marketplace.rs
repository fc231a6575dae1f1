//! The marketplace HTTP surface, expressed as a trait boundary.
//!
//! The engine only depends on this trait; wire format, auth headers, and
//! retry policy are an adapter concern (see [`crate::adapters::http_client`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{SupplyType, Timeslot};
use crate::error::Result;

/// Marketplace API credentials for one seller account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub api_key: String,
}

/// A line item as sent to `draft/create`: SKU must already be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftItem {
    pub sku: u64,
    pub quantity: u32,
}

/// Request to `POST /draft/create`.
#[derive(Debug, Clone)]
pub struct DraftCreateRequest {
    pub cluster_ids: Vec<String>,
    pub drop_off_point_warehouse_id: Option<String>,
    pub items: Vec<DraftItem>,
    pub supply_type: SupplyType,
}

/// Terminal/in-progress status of a draft computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    Calculating,
    Success,
    Failed,
    Expired,
}

/// Scoring state of a candidate warehouse within a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseState {
    FullAvailable,
    Draft,
    Disabled,
}

/// One candidate destination warehouse in a `draft/create/info` response.
#[derive(Debug, Clone)]
pub struct DraftWarehouse {
    pub warehouse_id: String,
    pub name: String,
    pub state: WarehouseState,
    pub total_rank: Option<i32>,
    pub total_score: Option<f64>,
}

/// Full `draft/create/info` response.
#[derive(Debug, Clone)]
pub struct DraftInfo {
    pub status: DraftStatus,
    pub code: Option<i32>,
    pub draft_id: Option<String>,
    pub warehouses: Vec<DraftWarehouse>,
    pub error_message: Option<String>,
}

/// Request to `POST /draft/timeslot/info`.
#[derive(Debug, Clone)]
pub struct TimeslotsRequest {
    pub draft_id: String,
    pub warehouse_ids: Vec<String>,
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
}

/// Flattened response to `POST /draft/timeslot/info`: the per-warehouse
/// timezone offset plus every slot across every day, already parsed to UTC.
#[derive(Debug, Clone)]
pub struct TimeslotsResponse {
    pub warehouse_timezone_offset_minutes: i32,
    pub slots: Vec<Timeslot>,
}

/// Request to `POST /draft/supply/create`.
#[derive(Debug, Clone)]
pub struct SupplyCreateRequest {
    pub draft_id: String,
    pub warehouse_id: String,
    pub timeslot: Timeslot,
}

/// State of an in-flight `create_supply` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyState {
    Pending,
    Success,
    Failed,
}

/// Full `draft/supply/create/status` response.
#[derive(Debug, Clone)]
pub struct SupplyStatus {
    pub state: SupplyState,
    pub order_ids: Vec<u64>,
    pub errors: Vec<String>,
}

/// Result of a single supply cancellation within `cancel_status`.
#[derive(Debug, Clone)]
pub struct SupplyCancelResult {
    pub supply_id: String,
    pub is_supply_cancelled: bool,
    pub error_reasons: Vec<String>,
}

/// Full `supply-order/cancel/status` response.
#[derive(Debug, Clone)]
pub struct CancelStatus {
    pub is_order_cancelled: bool,
    pub supplies: Vec<SupplyCancelResult>,
}

/// A destination warehouse reachable from a given cluster.
#[derive(Debug, Clone)]
pub struct ClusterWarehouse {
    pub warehouse_id: String,
    pub name: String,
}

/// A logistics cluster as returned by `cluster/list`.
#[derive(Debug, Clone)]
pub struct ClusterInfo {
    pub id: String,
    pub name: String,
    pub warehouses: Vec<ClusterWarehouse>,
}

/// A candidate drop-off warehouse as returned by `warehouse/fbo/list`.
#[derive(Debug, Clone)]
pub struct DropOffWarehouse {
    pub warehouse_id: String,
    pub name: String,
    pub address: Option<String>,
}

/// The outcome of resolving one article through `v3/product/info/list`.
#[derive(Debug, Clone)]
pub struct SkuResolution {
    pub article: String,
    pub sku: Option<u64>,
}

/// Typed operations the engine drives against the Ozon Seller API.
///
/// Implementations own auth headers, retry-on-429/5xx, and the HTTP 403
/// code=7 / HTTP 404 code=5 status contracts described in SPEC_FULL.md §6.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    /// Returns the `operation_id` of the newly created draft.
    async fn create_draft(
        &self,
        credentials: &Credentials,
        request: DraftCreateRequest,
    ) -> Result<String>;

    async fn draft_info(&self, credentials: &Credentials, operation_id: &str) -> Result<DraftInfo>;

    async fn draft_timeslots(
        &self,
        credentials: &Credentials,
        request: TimeslotsRequest,
    ) -> Result<TimeslotsResponse>;

    /// Returns the `operation_id` of the supply creation job.
    async fn create_supply(
        &self,
        credentials: &Credentials,
        request: SupplyCreateRequest,
    ) -> Result<String>;

    async fn supply_status(
        &self,
        credentials: &Credentials,
        operation_id: &str,
    ) -> Result<SupplyStatus>;

    /// Returns the `operation_id` of the cancellation job.
    async fn cancel_supply(&self, credentials: &Credentials, order_id: u64) -> Result<String>;

    async fn cancel_status(
        &self,
        credentials: &Credentials,
        operation_id: &str,
    ) -> Result<CancelStatus>;

    async fn list_clusters(
        &self,
        credentials: &Credentials,
        cluster_ids: &[String],
    ) -> Result<Vec<ClusterInfo>>;

    async fn search_drop_offs(
        &self,
        credentials: &Credentials,
        query: &str,
    ) -> Result<Vec<DropOffWarehouse>>;

    /// Resolves offer articles to SKUs, batched by the caller per
    /// `SupplyConfig::sku_resolve_batch_size`.
    async fn resolve_offers_to_skus(
        &self,
        credentials: &Credentials,
        articles: &[String],
    ) -> Result<Vec<SkuResolution>>;
}
