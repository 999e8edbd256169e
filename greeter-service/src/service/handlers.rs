//! Greeting RPC handlers
//!
//! Handlers are plain async methods over a [`GreetingStore`]. They run behind
//! the interceptor pipeline but do not depend on the transport, so they can be
//! driven directly.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;

use crate::grpc::CallContext;
use crate::proto::{
    GetGreeterRequest, GetManyGreetersRequest, GoodByeReply, GoodByeRequest, HelloReply,
    HelloRequest, UpdateGreeterRequest,
};
use crate::store::{GreetingRecord, GreetingStore, NewGreeting};

/// How far a `GetMany` producer got before it finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProgress {
    /// Replies accepted by the channel
    pub sent: usize,
    /// Records never delivered because the receiver went away
    pub abandoned: usize,
}

/// Server stream of greeting replies produced by `GetMany`
pub struct ReplyStream {
    replies: ReceiverStream<Result<HelloReply, Status>>,
    producer: JoinHandle<StreamProgress>,
}

impl ReplyStream {
    /// The reply stream; the producer task keeps running detached
    pub fn into_inner(self) -> ReceiverStream<Result<HelloReply, Status>> {
        self.replies
    }

    /// The reply stream together with the producer task handle
    pub fn into_parts(
        self,
    ) -> (
        ReceiverStream<Result<HelloReply, Status>>,
        JoinHandle<StreamProgress>,
    ) {
        (self.replies, self.producer)
    }
}

impl Serialize for ReplyStream {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<server stream>")
    }
}

impl std::fmt::Debug for ReplyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReplyStream")
    }
}

/// Greeting operations over a record store
pub struct GreetingHandlers<S> {
    store: Arc<S>,
}

impl<S> Clone for GreetingHandlers<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: GreetingStore> GreetingHandlers<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record a greeting, welcoming back a known name
    ///
    /// A new record is inserted on every successful call. An existing record
    /// with the same name only changes the message text.
    pub async fn create_or_welcome(
        &self,
        ctx: CallContext,
        req: HelloRequest,
    ) -> Result<HelloReply, Status> {
        if req.name.is_empty() {
            return Err(Status::invalid_argument("Name is required"));
        }
        if req.age <= 0 {
            return Err(Status::invalid_argument("Age must be a positive integer"));
        }
        if req.city.is_empty() {
            return Err(Status::invalid_argument("City is required"));
        }

        let existing = self.store.find_by_name(&req.name).await.map_err(|e| {
            tracing::error!(request_id = %ctx.request_id(), error = %e, "Error looking up greeter by name");
            Status::internal("Failed to create Greeter.")
        })?;

        let message = match existing {
            Some(existing) => format!("Welcome back, {} from {}", existing.name, existing.city),
            None => format!("Hello {}, age {}, from {}", req.name, req.age, req.city),
        };

        let record = self
            .store
            .insert(NewGreeting {
                name: req.name.clone(),
                age: req.age,
                city: req.city.clone(),
                message: message.clone(),
            })
            .await
            .map_err(|e| {
                tracing::error!(request_id = %ctx.request_id(), error = %e, "Error saving greeter");
                Status::internal("Failed to create Greeter.")
            })?;

        tracing::info!(
            request_id = %ctx.request_id(),
            user = %ctx.identity_name(),
            id = record.id,
            "{}",
            message
        );

        Ok(HelloReply {
            message,
            name: req.name,
            age: req.age,
            city: req.city,
        })
    }

    pub async fn get_by_id(
        &self,
        ctx: CallContext,
        req: GetGreeterRequest,
    ) -> Result<HelloReply, Status> {
        match self.store.find_by_id(req.id).await {
            Ok(Some(record)) => Ok(HelloReply {
                message: record.message,
                name: record.name,
                age: record.age,
                city: record.city,
            }),
            Ok(None) => Err(Status::not_found(format!("User {} not found.", req.id))),
            Err(e) => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    id = req.id,
                    error = %e,
                    "Error retrieving Greeter"
                );
                Err(Status::internal("Failed to retrieve Greeter."))
            }
        }
    }

    /// Stream up to `count` records in store order
    ///
    /// Replies are sent one at a time through a single-slot channel. The
    /// producer stops as soon as the receiving side is gone.
    pub async fn get_many(
        &self,
        ctx: CallContext,
        req: GetManyGreetersRequest,
    ) -> Result<ReplyStream, Status> {
        let records = match usize::try_from(req.count) {
            Ok(limit) => self.store.scan(limit).await.map_err(|e| {
                tracing::error!(request_id = %ctx.request_id(), error = %e, "Error scanning greeters");
                Status::internal("Failed to retrieve Greeters.")
            })?,
            Err(_) => Vec::new(),
        };

        let (tx, rx) = mpsc::channel(1);
        let request_id = ctx.request_id().to_string();

        let producer = tokio::spawn(async move {
            let total = records.len();
            let mut sent = 0;
            for record in records {
                if tx.send(Ok(stream_reply(record))).await.is_err() {
                    let abandoned = total - sent;
                    tracing::debug!(
                        request_id = %request_id,
                        sent,
                        abandoned,
                        "Client disconnected, stopping stream"
                    );
                    return StreamProgress { sent, abandoned };
                }
                sent += 1;
            }
            StreamProgress { sent, abandoned: 0 }
        });

        Ok(ReplyStream {
            replies: ReceiverStream::new(rx),
            producer,
        })
    }

    /// Apply a partial update
    ///
    /// Empty strings and non-positive ages leave the stored value as is. The
    /// stored message is never changed.
    pub async fn update(
        &self,
        ctx: CallContext,
        req: UpdateGreeterRequest,
    ) -> Result<HelloReply, Status> {
        if req.id <= 0 {
            return Err(Status::invalid_argument("Invalid ID."));
        }

        let mut record = self
            .store
            .find_by_id(req.id)
            .await
            .map_err(|e| {
                tracing::error!(request_id = %ctx.request_id(), error = %e, "Error loading Greeter for update");
                Status::internal("Failed to update Greeter.")
            })?
            .ok_or_else(|| greeter_not_found(req.id))?;

        if !req.name.is_empty() {
            record.name = req.name;
        }
        if req.age > 0 {
            record.age = req.age;
        }
        if !req.city.is_empty() {
            record.city = req.city;
        }

        let record = self.store.update(&record).await.map_err(|e| {
            if e.is_not_found() {
                return greeter_not_found(req.id);
            }
            tracing::error!(request_id = %ctx.request_id(), error = %e, "Error updating Greeter in the store");
            Status::internal("Failed to update Greeter.")
        })?;

        Ok(HelloReply {
            message: format!("Greeter with ID {} updated successfully!", req.id),
            name: record.name,
            age: record.age,
            city: record.city,
        })
    }

    pub async fn delete(
        &self,
        ctx: CallContext,
        req: GetGreeterRequest,
    ) -> Result<GoodByeReply, Status> {
        if req.id <= 0 {
            return Err(Status::invalid_argument("Invalid ID."));
        }

        let delete_failed = |e: crate::store::StoreError| {
            tracing::error!(request_id = %ctx.request_id(), error = %e, "Error deleting Greeter from the store");
            Status::internal("Failed to delete Greeter.")
        };

        if self.store.find_by_id(req.id).await.map_err(delete_failed)?.is_none() {
            return Err(greeter_not_found(req.id));
        }
        if !self.store.delete(req.id).await.map_err(delete_failed)? {
            return Err(greeter_not_found(req.id));
        }

        Ok(GoodByeReply {
            message: format!("Greeter with ID {} has been deleted successfully!", req.id),
        })
    }

    pub async fn farewell(
        &self,
        _ctx: CallContext,
        req: GoodByeRequest,
    ) -> Result<GoodByeReply, Status> {
        Ok(GoodByeReply {
            message: format!("Goodbye, {}. See you next time!", req.name),
        })
    }
}

fn greeter_not_found(id: i32) -> Status {
    Status::not_found(format!("Greeter with ID {} not found.", id))
}

fn stream_reply(record: GreetingRecord) -> HelloReply {
    HelloReply {
        message: format!("Hello from {}!", record.name),
        name: record.name,
        age: record.age,
        city: record.city,
    }
}
