use std::sync::Arc;

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::db::connector::{Connector, ReportConnection};
use crate::db::models::Report;
use crate::error::AppError;
use crate::types::ReportDate;

/// Per-request connection slot.
///
/// The slot starts empty and is filled by the first [`RequestScope::acquire`]. The handle is
/// closed by [`RequestScope::release`] or, if that never ran (client went away, handler
/// bailed out), when the last clone of the scope is dropped. Either path closes it once.
#[derive(Clone)]
pub struct RequestScope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    connector: Arc<dyn Connector>,
    slot: Mutex<Option<Box<dyn ReportConnection>>>,
}

impl RequestScope {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                connector,
                slot: Mutex::new(None),
            }),
        }
    }

    /// Returns this request's connection, opening it on first use.
    pub async fn acquire(&self) -> Result<MappedMutexGuard<'_, Box<dyn ReportConnection>>, AppError> {
        let slot = self.filled_slot().await?;
        MutexGuard::try_map(slot, |s| s.as_mut()).map_err(|_| AppError::ConnectionRefused)
    }

    pub async fn find_report(&self, date: &ReportDate) -> Result<Option<Report>, AppError> {
        let mut slot = self.filled_slot().await?;
        match slot.as_mut() {
            Some(conn) => conn.find_report(date).await,
            None => Err(AppError::ConnectionRefused),
        }
    }

    async fn filled_slot(
        &self,
    ) -> Result<MutexGuard<'_, Option<Box<dyn ReportConnection>>>, AppError> {
        let mut slot = self.inner.slot.lock().await;
        if slot.is_none() {
            *slot = Some(self.inner.connector.connect().await?);
        }
        Ok(slot)
    }

    #[cfg(test)]
    async fn is_acquired(&self) -> bool {
        self.inner.slot.lock().await.is_some()
    }

    pub async fn release(&self) {
        let conn = self.inner.slot.lock().await.take();
        if let Some(conn) = conn {
            conn.close().await;
            debug!("request connection released");
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        let Some(conn) = self.slot.get_mut().take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("request ended before release; closing connection in background");
                handle.spawn(conn.close());
            }
            Err(_) => warn!("no runtime available; dropping connection without close"),
        }
    }
}
