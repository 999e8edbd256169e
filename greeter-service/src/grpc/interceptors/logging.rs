//! Request/response logging stage

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;

use crate::grpc::context::CallContext;
use crate::grpc::middleware::{CallOutcome, Interceptor, Next, Payload};

/// Logs every call with caller, payloads, timing and failure details
///
/// Sits outermost so it observes the final result of the inner stages,
/// including rejections from the auth stage. Outcomes are returned as received.
/// A panic in an inner stage is logged and then resumed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn intercept(
        &self,
        context: CallContext,
        request: Box<dyn Payload>,
        next: Next<'_>,
    ) -> CallOutcome {
        let method = context.method().to_string();
        let request_id = context.request_id().to_string();

        tracing::info!(
            method = %method,
            request_id = %request_id,
            user = %context.identity_name(),
            request = %request.to_json(),
            "gRPC call started"
        );

        let started = Instant::now();
        let outcome = match AssertUnwindSafe(next.run(context, request))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                tracing::error!(
                    method = %method,
                    request_id = %request_id,
                    duration_ms = elapsed_ms(started),
                    error = %panic_message(panic.as_ref()),
                    "gRPC call failed with unhandled error"
                );
                std::panic::resume_unwind(panic);
            }
        };
        let duration_ms = elapsed_ms(started);

        match &outcome.result {
            Ok(response) => tracing::info!(
                method = %method,
                request_id = %request_id,
                user = %outcome.context.identity_name(),
                duration_ms,
                response = %response.to_json(),
                "gRPC call completed"
            ),
            Err(status) => tracing::error!(
                method = %method,
                request_id = %request_id,
                user = %outcome.context.identity_name(),
                duration_ms,
                code = ?status.code(),
                error = %status.message(),
                "gRPC call failed"
            ),
        }

        outcome
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
