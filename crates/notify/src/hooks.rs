//! Host integration points.
//!
//! Both hooks run the pipeline inside a panic boundary: whatever goes wrong
//! while alerting is logged and swallowed, so the host's own error path
//! (the HTTP error response, the job runner's dead-set bookkeeping) is
//! never disturbed.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use alerter_core::{DeadJob, ErrorRecord};
use futures::FutureExt;

use crate::pipeline::Alerter;

impl Alerter {
    /// Report an error raised while handling a request and hand it back so
    /// the caller can propagate it unchanged:
    ///
    /// ```ignore
    /// match create_order(req).await {
    ///     Ok(order) => Ok(order),
    ///     Err(err) => Err(alerter.rescue_request("OrdersController", "create", err, None).await),
    /// }
    /// ```
    pub async fn rescue_request<E>(
        &self,
        handler: &str,
        action: &str,
        error: E,
        backtrace: Option<Vec<String>>,
    ) -> E
    where
        E: std::error::Error,
    {
        let outcome = AssertUnwindSafe(async {
            let record = ErrorRecord::from_request(
                handler,
                action,
                &error,
                backtrace,
                self.settings().max_error_length,
            );
            self.notify(&record).await
        })
        .catch_unwind()
        .await;

        if let Err(panic) = outcome {
            tracing::error!(
                handler,
                action,
                panic = %panic_message(&*panic),
                "request notify failed"
            );
        }
        error
    }

    /// Report a job that exhausted its retries. Frames stored on the job are
    /// rendered as the trace section. Never fails.
    pub async fn handle_death<E>(&self, job: &DeadJob, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let outcome = AssertUnwindSafe(async {
            let record = ErrorRecord::from_job(job, error, self.settings().max_error_length);
            self.notify(&record).await
        })
        .catch_unwind()
        .await;

        if let Err(panic) = outcome {
            tracing::error!(
                job_class = %job.class,
                jid = job.jid.as_deref().unwrap_or_default(),
                panic = %panic_message(&*panic),
                "death handler failed"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic>".to_string()
    }
}
