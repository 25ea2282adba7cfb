use std::sync::Arc;

use smartclinic_core::AppResult;
use smartclinic_domain::DateRange;
use tokio::sync::RwLock;
use tracing::warn;

use crate::session_ports::{Clock, KeyValueStore};

/// Durable-storage key of the range start.
pub const DASHBOARD_DATE_FROM_KEY: &str = "dashboard_date_from";
/// Durable-storage key of the range end.
pub const DASHBOARD_DATE_TO_KEY: &str = "dashboard_date_to";

/// Dashboard reporting window remembered across restarts.
pub struct DashboardPreferences {
    durable_storage: Arc<dyn KeyValueStore>,
    range: RwLock<DateRange>,
}

impl DashboardPreferences {
    /// Starts with the month-to-date range.
    #[must_use]
    pub fn new(durable_storage: Arc<dyn KeyValueStore>, clock: &dyn Clock) -> Self {
        Self {
            durable_storage,
            range: RwLock::new(DateRange::month_to_date(clock.now().date_naive())),
        }
    }

    /// Returns the current range.
    pub async fn date_range(&self) -> DateRange {
        *self.range.read().await
    }

    /// Adopts the persisted range when both bounds are present and valid.
    pub async fn load(&self) -> AppResult<DateRange> {
        let from = self.durable_storage.get(DASHBOARD_DATE_FROM_KEY).await?;
        let to = self.durable_storage.get(DASHBOARD_DATE_TO_KEY).await?;

        if let (Some(from), Some(to)) = (from, to) {
            match DateRange::parse(from.as_str(), to.as_str()) {
                Ok(range) => *self.range.write().await = range,
                Err(error) => warn!(error = %error, "ignoring saved dashboard range"),
            }
        }

        Ok(self.date_range().await)
    }

    /// Validates, stores and persists a new range.
    pub async fn set_date_range(&self, from: &str, to: &str) -> AppResult<DateRange> {
        let range = DateRange::parse(from, to)?;
        self.durable_storage
            .set(DASHBOARD_DATE_FROM_KEY, range.from_param())
            .await?;
        self.durable_storage
            .set(DASHBOARD_DATE_TO_KEY, range.to_param())
            .await?;
        *self.range.write().await = range;

        Ok(range)
    }
}
