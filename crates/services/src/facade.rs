//! The `PumpGuard` entry point: one struct that owns the wiring and hands
//! out the per-domain services.

use std::sync::Arc;

use anyhow::Context as _;

use client::{Cache, Dispatcher, RetryPolicy, TtlCache};
use configs::AppConfig;
use store::http::{build_client, session_handle, AuthClient, HttpBlobStore, HttpStore};
use store::{AuthStore, BlobStore, TableStore};

use crate::activity::ActivityService;
use crate::activity_sink::TableActivityLogger;
use crate::auth::AuthService;
use crate::bulk::BulkService;
use crate::ctx::Ctx;
use crate::dashboard::DashboardService;
use crate::dealers::DealersService;
use crate::deposits::DepositsService;
use crate::expenses::ExpensesService;
use crate::inventory::InventoryService;
use crate::notifications::NotificationsService;
use crate::omcs::OmcsService;
use crate::prices::PricesService;
use crate::profiles::ProfilesService;
use crate::reports::ReportsService;
use crate::sales::SalesService;
use crate::settings::SettingsService;
use crate::shifts::ShiftsService;
use crate::stations::StationsService;
use crate::violations::ViolationsService;

pub struct PumpGuard {
    ctx: Arc<Ctx>,
}

impl PumpGuard {
    /// Wire up the real HTTP backend from configuration. One shared reqwest
    /// client and one shared session slot back all three stores.
    pub fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let client = build_client(config.connect_timeout(), config.request_timeout())
            .context("building the http client")?;
        let session = session_handle();
        let url = config.backend.url.clone();
        let key = config.backend.api_key.clone();
        let tables: Arc<dyn TableStore> =
            Arc::new(HttpStore::new(url.clone(), key.clone(), client.clone(), Arc::clone(&session)));
        let auth: Arc<dyn AuthStore> =
            Arc::new(AuthClient::new(url.clone(), key.clone(), client.clone(), Arc::clone(&session)));
        let blobs: Arc<dyn BlobStore> =
            Arc::new(HttpBlobStore::new(url, key, client, session));
        let cache: Arc<dyn Cache> = Arc::new(TtlCache::new());
        let retry = RetryPolicy::new(config.backoff_base(), config.backoff_max());
        Ok(Self::with_parts(tables, auth, blobs, cache, config.backend.photo_bucket.clone(), retry))
    }

    /// Wire up from injected collaborators. This is the seam the tests use
    /// with the in-memory stores.
    pub fn with_parts(
        tables: Arc<dyn TableStore>,
        auth: Arc<dyn AuthStore>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<dyn Cache>,
        photo_bucket: String,
        retry: RetryPolicy,
    ) -> Self {
        let activity = Arc::new(TableActivityLogger::new(Arc::clone(&tables)));
        let dispatcher =
            Dispatcher::new(Arc::clone(&auth), Arc::clone(&cache), activity, retry);
        let ctx = Arc::new(Ctx { tables, auth, blobs, cache, dispatcher, photo_bucket });
        Self { ctx }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.ctx))
    }

    pub fn stations(&self) -> StationsService {
        StationsService::new(Arc::clone(&self.ctx))
    }

    pub fn profiles(&self) -> ProfilesService {
        ProfilesService::new(Arc::clone(&self.ctx))
    }

    pub fn omcs(&self) -> OmcsService {
        OmcsService::new(Arc::clone(&self.ctx))
    }

    pub fn dealers(&self) -> DealersService {
        DealersService::new(Arc::clone(&self.ctx))
    }

    pub fn prices(&self) -> PricesService {
        PricesService::new(Arc::clone(&self.ctx))
    }

    pub fn sales(&self) -> SalesService {
        SalesService::new(Arc::clone(&self.ctx))
    }

    pub fn inventory(&self) -> InventoryService {
        InventoryService::new(Arc::clone(&self.ctx))
    }

    pub fn shifts(&self) -> ShiftsService {
        ShiftsService::new(Arc::clone(&self.ctx))
    }

    pub fn violations(&self) -> ViolationsService {
        ViolationsService::new(Arc::clone(&self.ctx))
    }

    pub fn notifications(&self) -> NotificationsService {
        NotificationsService::new(Arc::clone(&self.ctx))
    }

    pub fn expenses(&self) -> ExpensesService {
        ExpensesService::new(Arc::clone(&self.ctx))
    }

    pub fn deposits(&self) -> DepositsService {
        DepositsService::new(Arc::clone(&self.ctx))
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(Arc::clone(&self.ctx))
    }

    pub fn reports(&self) -> ReportsService {
        ReportsService::new(Arc::clone(&self.ctx))
    }

    pub fn settings(&self) -> SettingsService {
        SettingsService::new(Arc::clone(&self.ctx))
    }

    pub fn activity(&self) -> ActivityService {
        ActivityService::new(Arc::clone(&self.ctx))
    }

    pub fn bulk(&self) -> BulkService {
        BulkService::new(Arc::clone(&self.ctx))
    }
}
