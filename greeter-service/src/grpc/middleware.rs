//! Ordered interceptor pipeline
//!
//! A [`Pipeline`] is an explicit list of [`Interceptor`] stages, outermost
//! first. Each stage receives the call context, the type-erased request and a
//! [`Next`] handle for the rest of the chain. Calling [`Next::run`] forwards;
//! returning without calling it short-circuits the call.
//!
//! Every stage hands back a [`CallOutcome`] holding the result together with
//! the context as the inner stages left it, so identity bound by the auth
//! stage is visible to outer stages once the call completes.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tonic::Status;

use crate::auth::TokenValidator;
use crate::config::AuthConfig;
use crate::grpc::context::CallContext;
use crate::grpc::interceptors::{AuthInterceptor, LoggingInterceptor};

/// Boxed, sendable future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Endpoint<'a> =
    Box<dyn FnOnce(CallContext, Box<dyn Payload>) -> BoxFuture<'a, CallOutcome> + Send + 'a>;

/// Type-erased request or response flowing through the pipeline
pub trait Payload: Any + Send {
    /// JSON rendering for diagnostics
    fn to_json(&self) -> String;

    /// Recover the concrete value
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T> Payload for T
where
    T: Serialize + Any + Send,
{
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserializable: {}>", e))
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Result of running (part of) the pipeline
pub struct CallOutcome {
    /// Context as left by the innermost stage that ran
    pub context: CallContext,
    /// Response payload or the failure status
    pub result: Result<Box<dyn Payload>, Status>,
}

impl CallOutcome {
    /// Outcome for a call rejected or failed at `context`
    pub fn failed(context: CallContext, status: Status) -> Self {
        Self {
            context,
            result: Err(status),
        }
    }
}

impl std::fmt::Debug for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallOutcome")
            .field("context", &self.context)
            .field(
                "result",
                &self.result.as_ref().map(|payload| payload.to_json()),
            )
            .finish()
    }
}

/// One stage of the pipeline
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Handle the call, forwarding through `next` to continue the chain
    async fn intercept(
        &self,
        context: CallContext,
        request: Box<dyn Payload>,
        next: Next<'_>,
    ) -> CallOutcome;
}

/// The remainder of the pipeline after the current stage
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    endpoint: Endpoint<'a>,
}

impl<'a> Next<'a> {
    /// Forward the call to the next stage, or to the handler when none remain
    pub fn run(self, context: CallContext, request: Box<dyn Payload>) -> BoxFuture<'a, CallOutcome> {
        let Next { stages, endpoint } = self;
        match stages.split_first() {
            Some((stage, rest)) => stage.intercept(
                context,
                request,
                Next {
                    stages: rest,
                    endpoint,
                },
            ),
            None => endpoint(context, request),
        }
    }
}

/// Ordered interceptor chain wrapped around every call
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Arc<Vec<Arc<dyn Interceptor>>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Create an empty pipeline; calls go straight to the handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage inside the ones already added
    pub fn with<I: Interceptor + 'static>(mut self, stage: I) -> Self {
        Arc::make_mut(&mut self.stages).push(Arc::new(stage));
        self
    }

    /// Logging (outer) followed by authentication (inner)
    pub fn standard<V>(validator: V, auth: &AuthConfig) -> Self
    where
        V: TokenValidator + 'static,
    {
        Self::new()
            .with(LoggingInterceptor::new())
            .with(AuthInterceptor::new(validator, auth))
    }

    /// Stage names, outermost first
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run `handler` for `request` behind every stage
    pub async fn call<'a, Req, Resp, H, Fut>(
        &'a self,
        context: CallContext,
        request: Req,
        handler: H,
    ) -> Result<Resp, Status>
    where
        Req: Serialize + Send + 'static,
        Resp: Serialize + Send + 'static,
        H: FnOnce(CallContext, Req) -> Fut + Send + 'a,
        Fut: Future<Output = Result<Resp, Status>> + Send + 'a,
    {
        let endpoint: Endpoint<'a> = Box::new(
            move |context: CallContext, payload: Box<dyn Payload>| -> BoxFuture<'a, CallOutcome> {
                Box::pin(async move {
                    let request = match payload.into_any().downcast::<Req>() {
                        Ok(request) => *request,
                        Err(_) => {
                            return CallOutcome::failed(
                                context,
                                Status::internal("Unexpected request payload type"),
                            )
                        }
                    };
                    let result = handler(context.clone(), request).await;
                    CallOutcome {
                        context,
                        result: result.map(|response| Box::new(response) as Box<dyn Payload>),
                    }
                })
            },
        );

        let next = Next {
            stages: &self.stages[..],
            endpoint,
        };
        let outcome = next.run(context, Box::new(request)).await;

        outcome.result.and_then(|payload| {
            payload
                .into_any()
                .downcast::<Resp>()
                .map(|response| *response)
                .map_err(|_| Status::internal("Unexpected response payload type"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tonic::metadata::MetadataMap;

    #[derive(Debug, Serialize, PartialEq)]
    struct Echo {
        text: String,
    }

    /// Records the order stages run in
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn intercept(
            &self,
            context: CallContext,
            request: Box<dyn Payload>,
            next: Next<'_>,
        ) -> CallOutcome {
            self.log.lock().unwrap().push(format!("{} in", self.label));
            let outcome = next.run(context, request).await;
            self.log.lock().unwrap().push(format!("{} out", self.label));
            outcome
        }
    }

    /// Rejects every call without forwarding
    struct Gate;

    #[async_trait]
    impl Interceptor for Gate {
        fn name(&self) -> &'static str {
            "gate"
        }

        async fn intercept(
            &self,
            context: CallContext,
            _request: Box<dyn Payload>,
            _next: Next<'_>,
        ) -> CallOutcome {
            CallOutcome::failed(context, Status::permission_denied("closed"))
        }
    }

    fn context() -> CallContext {
        CallContext::new("/test.Echo/Say", MetadataMap::new())
    }

    #[tokio::test]
    async fn test_empty_pipeline_calls_handler() {
        let pipeline = Pipeline::new();
        let response = pipeline
            .call(context(), Echo { text: "hi".into() }, |_, req: Echo| async move {
                Ok(Echo {
                    text: req.text.to_uppercase(),
                })
            })
            .await
            .unwrap();
        assert_eq!(response.text, "HI");
    }

    #[tokio::test]
    async fn test_stages_run_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with(Recorder {
                label: "outer",
                log: log.clone(),
            })
            .with(Recorder {
                label: "inner",
                log: log.clone(),
            });
        assert_eq!(pipeline.stage_names(), vec!["outer", "inner"]);

        let handler_log = log.clone();
        pipeline
            .call(context(), Echo { text: "x".into() }, move |_, req: Echo| async move {
                handler_log.lock().unwrap().push("handler".to_string());
                Ok(req)
            })
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer in", "inner in", "handler", "inner out", "outer out"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let pipeline = Pipeline::new().with(Gate);

        let status = pipeline
            .call(context(), Echo { text: "x".into() }, move |_, req: Echo| async move {
                *flag.lock().unwrap() = true;
                Ok(req)
            })
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::PermissionDenied);
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn test_handler_status_propagates_unchanged() {
        let pipeline = Pipeline::new();
        let status = pipeline
            .call(context(), Echo { text: "x".into() }, |_, _req: Echo| async move {
                Err::<Echo, _>(Status::not_found("User 9 not found."))
            })
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert_eq!(status.message(), "User 9 not found.");
    }

    #[test]
    fn test_payload_renders_json() {
        let payload: Box<dyn Payload> = Box::new(Echo { text: "hi".into() });
        assert_eq!(payload.to_json(), r#"{"text":"hi"}"#);
        let echo = payload.into_any().downcast::<Echo>().unwrap();
        assert_eq!(echo.text, "hi");
    }
}
