//! Scripted `MarketplaceClient` test double: canned responses popped in
//! FIFO order per operation, mirroring the reference harness's scripted
//! exchange stream.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::SupplyType;
use crate::error::{Error, Result};
use crate::ports::{
    CancelStatus, ClusterInfo, Credentials, DraftCreateRequest, DraftInfo, DropOffWarehouse,
    MarketplaceClient, SkuResolution, SupplyCreateRequest, SupplyStatus, TimeslotsRequest,
    TimeslotsResponse,
};

type Queue<T> = Mutex<VecDeque<Result<T>>>;

#[derive(Default)]
struct CallCounts {
    create_draft: u32,
    draft_info: u32,
    draft_timeslots: u32,
    create_supply: u32,
    supply_status: u32,
}

/// A `MarketplaceClient` driven entirely by pre-scripted responses. Each
/// `push_*` call enqueues one response; each matching trait method pops the
/// front of its queue. Calling a method with an empty queue panics - tests
/// must script every call they expect to happen.
#[derive(Default)]
pub struct ScriptedMarketplaceClient {
    create_draft: Queue<String>,
    draft_info: Queue<DraftInfo>,
    draft_timeslots: Queue<TimeslotsResponse>,
    create_supply: Queue<String>,
    supply_status: Queue<SupplyStatus>,
    cancel_supply: Queue<String>,
    cancel_status: Queue<CancelStatus>,
    list_clusters: Queue<Vec<ClusterInfo>>,
    search_drop_offs: Queue<Vec<DropOffWarehouse>>,
    sku_resolution: Queue<Vec<SkuResolution>>,
    calls: Mutex<CallCounts>,
    pub last_create_draft_request: Mutex<Option<DraftCreateRequest>>,
    pub last_timeslots_request: Mutex<Option<TimeslotsRequest>>,
    pub last_create_supply_request: Mutex<Option<SupplyCreateRequest>>,
}

impl ScriptedMarketplaceClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_create_draft(&self, response: Result<String>) {
        self.create_draft.lock().push_back(response);
    }

    pub fn push_draft_info(&self, response: DraftInfo) {
        self.draft_info.lock().push_back(Ok(response));
    }

    pub fn push_draft_timeslots(&self, response: TimeslotsResponse) {
        self.draft_timeslots.lock().push_back(Ok(response));
    }

    pub fn push_create_supply(&self, response: Result<String>) {
        self.create_supply.lock().push_back(response);
    }

    pub fn push_supply_status(&self, response: SupplyStatus) {
        self.supply_status.lock().push_back(Ok(response));
    }

    pub fn push_cancel_supply(&self, response: Result<String>) {
        self.cancel_supply.lock().push_back(response);
    }

    pub fn push_cancel_status(&self, response: CancelStatus) {
        self.cancel_status.lock().push_back(Ok(response));
    }

    pub fn push_list_clusters(&self, response: Vec<ClusterInfo>) {
        self.list_clusters.lock().push_back(Ok(response));
    }

    pub fn push_search_drop_offs(&self, response: Vec<DropOffWarehouse>) {
        self.search_drop_offs.lock().push_back(Ok(response));
    }

    pub fn push_sku_resolution(&self, response: Vec<SkuResolution>) {
        self.sku_resolution.lock().push_back(Ok(response));
    }

    #[must_use]
    pub fn create_draft_calls(&self) -> u32 {
        self.calls.lock().create_draft
    }

    #[must_use]
    pub fn draft_info_calls(&self) -> u32 {
        self.calls.lock().draft_info
    }

    #[must_use]
    pub fn draft_timeslots_calls(&self) -> u32 {
        self.calls.lock().draft_timeslots
    }

    #[must_use]
    pub fn create_supply_calls(&self) -> u32 {
        self.calls.lock().create_supply
    }
}

fn pop<T>(queue: &Queue<T>, what: &str) -> Result<T> {
    queue
        .lock()
        .pop_front()
        .unwrap_or_else(|| panic!("ScriptedMarketplaceClient: no scripted response for {what}"))
}

#[async_trait]
impl MarketplaceClient for ScriptedMarketplaceClient {
    async fn create_draft(
        &self,
        _credentials: &Credentials,
        request: DraftCreateRequest,
    ) -> Result<String> {
        self.calls.lock().create_draft += 1;
        *self.last_create_draft_request.lock() = Some(request);
        pop(&self.create_draft, "create_draft")
    }

    async fn draft_info(&self, _credentials: &Credentials, _operation_id: &str) -> Result<DraftInfo> {
        self.calls.lock().draft_info += 1;
        pop(&self.draft_info, "draft_info")
    }

    async fn draft_timeslots(
        &self,
        _credentials: &Credentials,
        request: TimeslotsRequest,
    ) -> Result<TimeslotsResponse> {
        self.calls.lock().draft_timeslots += 1;
        *self.last_timeslots_request.lock() = Some(request);
        pop(&self.draft_timeslots, "draft_timeslots")
    }

    async fn create_supply(
        &self,
        _credentials: &Credentials,
        request: SupplyCreateRequest,
    ) -> Result<String> {
        self.calls.lock().create_supply += 1;
        *self.last_create_supply_request.lock() = Some(request);
        pop(&self.create_supply, "create_supply")
    }

    async fn supply_status(&self, _credentials: &Credentials, _operation_id: &str) -> Result<SupplyStatus> {
        self.calls.lock().supply_status += 1;
        pop(&self.supply_status, "supply_status")
    }

    async fn cancel_supply(&self, _credentials: &Credentials, _order_id: u64) -> Result<String> {
        pop(&self.cancel_supply, "cancel_supply")
    }

    async fn cancel_status(&self, _credentials: &Credentials, _operation_id: &str) -> Result<CancelStatus> {
        pop(&self.cancel_status, "cancel_status")
    }

    async fn list_clusters(
        &self,
        _credentials: &Credentials,
        _cluster_ids: &[String],
    ) -> Result<Vec<ClusterInfo>> {
        pop(&self.list_clusters, "list_clusters")
    }

    async fn search_drop_offs(&self, _credentials: &Credentials, _query: &str) -> Result<Vec<DropOffWarehouse>> {
        pop(&self.search_drop_offs, "search_drop_offs")
    }

    async fn resolve_offers_to_skus(
        &self,
        _credentials: &Credentials,
        _articles: &[String],
    ) -> Result<Vec<SkuResolution>> {
        pop(&self.sku_resolution, "resolve_offers_to_skus")
    }
}

/// Build a `DraftCreateRequest` shorthand for tests that don't care about
/// most of its fields.
#[must_use]
pub fn direct_draft_request(cluster_id: &str) -> DraftCreateRequest {
    DraftCreateRequest {
        cluster_ids: vec![cluster_id.to_string()],
        drop_off_point_warehouse_id: None,
        items: Vec::new(),
        supply_type: SupplyType::Direct,
    }
}

pub fn credential_revoked_error() -> Error {
    Error::CredentialRevoked("api-key is deactivated".to_string())
}
