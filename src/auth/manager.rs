//! Session lifecycle orchestration: load, validate, bump-or-refresh, persist.
//!
//! The policy worth getting exactly right lives here: cookies from today are
//! validated and returned without a write; cookies from an earlier day that
//! still validate are kept with their date bumped to today (avoiding an
//! unnecessary browser login); only actual validation failure or a missing
//! record triggers the expensive login path. Date comparison is calendar-date
//! equality only - no time-of-day.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{error, info, instrument, warn};

use super::login::LoginFlow;
use super::store::{CookieStore, SessionRecord};
use super::validator::SessionProbe;
use super::CookieMap;
use crate::api::RequestHeaders;

/// Orchestrates the cookie store, validation probe, and login flow into a
/// single "get active cookies" operation.
pub struct CookieManager {
    store: CookieStore,
    probe: Arc<dyn SessionProbe>,
    login: Arc<dyn LoginFlow>,
}

impl CookieManager {
    /// Creates a manager over the given store, probe, and login flow.
    #[must_use]
    pub fn new(store: CookieStore, probe: Arc<dyn SessionProbe>, login: Arc<dyn LoginFlow>) -> Self {
        Self {
            store,
            probe,
            login,
        }
    }

    /// Returns a currently-valid cookie set, refreshing via browser login
    /// when necessary. `None` means no usable session could be obtained.
    #[instrument(level = "info", skip_all)]
    pub async fn get_active_cookies(&self, base_headers: &RequestHeaders) -> Option<CookieMap> {
        let today = Local::now().date_naive();

        if let Some(record) = self.store.load() {
            if record.generated_date == today {
                info!(date = %record.generated_date, "found cookies from today; validating");
                if self.probe.is_session_valid(&record.cookies, base_headers).await {
                    info!("cookies are valid and fresh for today; skipping login");
                    return Some(record.cookies);
                }
                warn!("cookies from today are invalid; refreshing via browser login");
            } else {
                info!(
                    date = %record.generated_date,
                    today = %today,
                    "found cookies from an earlier day; validating"
                );
                if self.probe.is_session_valid(&record.cookies, base_headers).await {
                    info!("stale-dated cookies still valid; bumping record date");
                    self.persist(record.cookies.clone(), today);
                    return Some(record.cookies);
                }
                warn!("cookies from an earlier day are invalid; removing record and refreshing");
                self.store.clear();
            }
        } else {
            info!("no usable cookie record; attempting browser login");
        }

        let fresh = self.login.acquire_session().await?;
        self.persist(fresh.clone(), today);
        Some(fresh)
    }

    /// Persists a record dated `date`. A persistence failure is logged but
    /// does not invalidate the in-memory cookies for this run.
    fn persist(&self, cookies: CookieMap, date: NaiveDate) {
        let record = SessionRecord::new(cookies, date);
        if let Err(save_error) = self.store.save(&record) {
            error!(%save_error, "failed to persist session record");
        }
    }
}
