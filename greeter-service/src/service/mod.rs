//! Greeter gRPC service
//!
//! [`GreeterService`] adapts the generated `greet.Greeter` trait to the
//! interceptor pipeline: every RPC gets a fresh [`CallContext`] and runs its
//! handler from [`GreetingHandlers`] behind the configured stages.

mod handlers;

use std::sync::Arc;

use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::grpc::{CallContext, Pipeline};
use crate::proto::greeter_server::{Greeter, GreeterServer};
use crate::proto::{
    GetGreeterRequest, GetManyGreetersRequest, GoodByeReply, GoodByeRequest, HelloReply,
    HelloRequest, UpdateGreeterRequest,
};
use crate::store::GreetingStore;

pub use handlers::{GreetingHandlers, ReplyStream, StreamProgress};

const SERVICE_NAME: &str = "greet.Greeter";

fn method_path(method: &str) -> String {
    format!("/{}/{}", SERVICE_NAME, method)
}

/// Greeter service implementation backed by a [`GreetingStore`]
pub struct GreeterService<S> {
    handlers: GreetingHandlers<S>,
    pipeline: Pipeline,
}

impl<S: GreetingStore> GreeterService<S> {
    pub fn new(store: Arc<S>, pipeline: Pipeline) -> Self {
        Self {
            handlers: GreetingHandlers::new(store),
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Wrap in the generated tonic server type
    pub fn into_server(self) -> GreeterServer<Self> {
        GreeterServer::new(self)
    }
}

#[tonic::async_trait]
impl<S: GreetingStore> Greeter for GreeterService<S> {
    async fn create_or_welcome(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let ctx = CallContext::from_request(method_path("CreateOrWelcome"), &request);
        let handlers = &self.handlers;
        self.pipeline
            .call(ctx, request.into_inner(), |ctx, req| {
                handlers.create_or_welcome(ctx, req)
            })
            .await
            .map(Response::new)
    }

    async fn get_by_id(
        &self,
        request: Request<GetGreeterRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let ctx = CallContext::from_request(method_path("GetById"), &request);
        let handlers = &self.handlers;
        self.pipeline
            .call(ctx, request.into_inner(), |ctx, req| handlers.get_by_id(ctx, req))
            .await
            .map(Response::new)
    }

    type GetManyStream = ReceiverStream<Result<HelloReply, Status>>;

    async fn get_many(
        &self,
        request: Request<GetManyGreetersRequest>,
    ) -> Result<Response<Self::GetManyStream>, Status> {
        let ctx = CallContext::from_request(method_path("GetMany"), &request);
        let handlers = &self.handlers;
        self.pipeline
            .call(ctx, request.into_inner(), |ctx, req| handlers.get_many(ctx, req))
            .await
            .map(|stream| Response::new(stream.into_inner()))
    }

    async fn update(
        &self,
        request: Request<UpdateGreeterRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let ctx = CallContext::from_request(method_path("Update"), &request);
        let handlers = &self.handlers;
        self.pipeline
            .call(ctx, request.into_inner(), |ctx, req| handlers.update(ctx, req))
            .await
            .map(Response::new)
    }

    async fn delete(
        &self,
        request: Request<GetGreeterRequest>,
    ) -> Result<Response<GoodByeReply>, Status> {
        let ctx = CallContext::from_request(method_path("Delete"), &request);
        let handlers = &self.handlers;
        self.pipeline
            .call(ctx, request.into_inner(), |ctx, req| handlers.delete(ctx, req))
            .await
            .map(Response::new)
    }

    async fn farewell(
        &self,
        request: Request<GoodByeRequest>,
    ) -> Result<Response<GoodByeReply>, Status> {
        let ctx = CallContext::from_request(method_path("Farewell"), &request);
        let handlers = &self.handlers;
        self.pipeline
            .call(ctx, request.into_inner(), |ctx, req| handlers.farewell(ctx, req))
            .await
            .map(Response::new)
    }
}
