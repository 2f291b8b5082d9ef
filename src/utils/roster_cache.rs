use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use moka::future::Cache;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::google::sheets::SheetsClient;
use crate::model::attendance::{AttendanceTable, JoinedRecord};
use crate::model::staff::StaffTable;
use crate::utils::approver::join_approvers;
use crate::utils::table::{parse_attendance, parse_staff};

/// Both tables from one load of the upstream spreadsheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    pub attendance: AttendanceTable,
    pub staff: StaffTable,
}

impl Roster {
    pub fn joined(&self) -> Vec<JoinedRecord> {
        join_approvers(&self.attendance, &self.staff)
    }
}

/// Where rosters come from. The spreadsheet in production, fixed data in tests.
pub trait RosterSource: Send + Sync {
    fn load(&self) -> BoxFuture<'_, AppResult<Roster>>;
}

pub struct SheetsRosterSource {
    pub sheets: SheetsClient,
    pub attendance_sheet: String,
    pub staff_sheet: String,
}

impl RosterSource for SheetsRosterSource {
    fn load(&self) -> BoxFuture<'_, AppResult<Roster>> {
        Box::pin(async move {
            let attendance = self.sheets.read_all(&self.attendance_sheet).await?;
            let staff = self.sheets.read_all(&self.staff_sheet).await?;
            Ok(Roster {
                attendance: parse_attendance(&attendance)?,
                staff: parse_staff(&staff)?,
            })
        })
    }
}

/// Reuses a loaded roster for a fixed interval before going upstream again.
#[derive(Clone)]
pub struct RosterStore {
    source: Arc<dyn RosterSource>,
    cache: Cache<(), Arc<Roster>>,
}

impl RosterStore {
    pub fn new(source: Arc<dyn RosterSource>, ttl_secs: u64) -> Self {
        Self {
            source,
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
        }
    }

    pub async fn get(&self) -> AppResult<Arc<Roster>> {
        self.cache
            .try_get_with((), async {
                let roster = self.source.load().await?;
                info!(
                    attendance_rows = roster.attendance.records.len(),
                    staff_rows = roster.staff.records.len(),
                    "Roster loaded"
                );
                Ok::<_, AppError>(Arc::new(roster))
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "Roster load failed");
                match e.as_ref() {
                    AppError::UpstreamUnavailable(msg) => AppError::UpstreamUnavailable(msg.clone()),
                    other => AppError::UpstreamUnavailable(other.to_string()),
                }
            })
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::{FailingRoster, StaticRoster};
    use super::*;

    #[tokio::test]
    async fn load_is_reused_until_invalidated() {
        let source = Arc::new(StaticRoster::new(Roster::default()));
        let store = RosterStore::new(source.clone(), 300);

        store.get().await.unwrap();
        store.get().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        store.invalidate().await;
        store.get().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_failure_is_upstream_unavailable() {
        let store = RosterStore::new(Arc::new(FailingRoster), 300);
        match store.get().await {
            Err(AppError::UpstreamUnavailable(msg)) => assert!(msg.contains("sheet missing")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
