//! RAII guard for SCM sessions
//!
//! The guard owns an open session. [`SessionGuard::close`] is the normal way
//! out. If the guard is dropped while still holding the session (the run's
//! future was cancelled or panicked), the close is scheduled on the current
//! tokio runtime instead.

use cairn_client::{GatewayError, ScmSession};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct SessionGuard {
    run_id: Uuid,
    session: Option<Box<dyn ScmSession>>,
}

impl SessionGuard {
    pub fn new(run_id: Uuid, session: Box<dyn ScmSession>) -> Self {
        debug!(run_id = %run_id, "Session guard created");
        Self {
            run_id,
            session: Some(session),
        }
    }

    /// The guarded session, until it has been closed
    pub fn session(&self) -> Result<&dyn ScmSession, GatewayError> {
        self.session.as_deref().ok_or(GatewayError::SessionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    /// Closes the session; later calls do nothing
    pub async fn close(&mut self) -> Result<(), GatewayError> {
        match self.session.take() {
            Some(mut session) => {
                debug!(run_id = %self.run_id, "Closing SCM session");
                session.close().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        warn!(
            run_id = %self.run_id,
            "Session guard dropped with an open session - scheduling close"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let run_id = self.run_id;
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!(run_id = %run_id, error = %e, "Deferred session close failed");
                    }
                });
            }
            Err(_) => {
                warn!(run_id = %self.run_id, "No tokio runtime available, SCM session left open");
            }
        }
    }
}
