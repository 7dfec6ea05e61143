//! Single-writer engine thread.
//!
//! The store rewrites whole collections on every mutation, so interleaved
//! writers would lose updates. All operations are funnelled through one
//! dedicated thread that owns the [`AttendanceService`]; callers hold a
//! cheap, cloneable [`EngineHandle`].

use crate::events::Observer;
use crate::service::{AttendanceService, ServiceError, Verification};
use facemark_core::{AttendanceEntry, ImageSource};
use facemark_store::StoredReference;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

const REQUEST_QUEUE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("engine thread exited")]
    ChannelClosed,
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
}

type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

/// Messages sent from handles to the engine thread.
enum EngineRequest {
    Register {
        name: String,
        source: ImageSource,
        reply: Reply<()>,
    },
    Remove {
        name: String,
        reply: Reply<usize>,
    },
    Verify {
        source: ImageSource,
        reply: Reply<Verification>,
    },
    Records {
        reply: Reply<Vec<StoredReference>>,
    },
    History {
        reply: Reply<Vec<AttendanceEntry>>,
    },
    Subscribe {
        observer: Box<dyn Observer>,
        reply: Reply<()>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    async fn call<T>(
        &self,
        request: impl FnOnce(Reply<T>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(request(reply_tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }

    pub async fn register(&self, name: &str, source: ImageSource) -> Result<(), EngineError> {
        let name = name.to_string();
        self.call(|reply| EngineRequest::Register { name, source, reply })
            .await
    }

    pub async fn remove(&self, name: &str) -> Result<usize, EngineError> {
        let name = name.to_string();
        self.call(|reply| EngineRequest::Remove { name, reply }).await
    }

    pub async fn verify(&self, source: ImageSource) -> Result<Verification, EngineError> {
        self.call(|reply| EngineRequest::Verify { source, reply }).await
    }

    pub async fn records(&self) -> Result<Vec<StoredReference>, EngineError> {
        self.call(|reply| EngineRequest::Records { reply }).await
    }

    pub async fn history(&self) -> Result<Vec<AttendanceEntry>, EngineError> {
        self.call(|reply| EngineRequest::History { reply }).await
    }

    /// Register an observer; it runs on the engine thread.
    pub async fn subscribe(&self, observer: Box<dyn Observer>) -> Result<(), EngineError> {
        self.call(|reply| EngineRequest::Subscribe { observer, reply })
            .await
    }
}

/// Move `service` onto a dedicated OS thread and return a handle to it.
///
/// The thread exits once every handle has been dropped.
pub fn spawn_engine(service: AttendanceService) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(REQUEST_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("facemark-engine".into())
        .spawn(move || {
            let mut service = service;
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                handle(&mut service, req);
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}

fn handle(service: &mut AttendanceService, req: EngineRequest) {
    // A dropped reply receiver means the caller gave up; the work is done regardless.
    match req {
        EngineRequest::Register {
            name,
            source,
            reply,
        } => {
            let _ = reply.send(service.register(&name, source));
        }
        EngineRequest::Remove { name, reply } => {
            let _ = reply.send(service.remove(&name));
        }
        EngineRequest::Verify { source, reply } => {
            let _ = reply.send(service.verify(source));
        }
        EngineRequest::Records { reply } => {
            let _ = reply.send(service.records());
        }
        EngineRequest::History { reply } => {
            let _ = reply.send(service.history());
        }
        EngineRequest::Subscribe { observer, reply } => {
            service.subscribe(observer);
            let _ = reply.send(Ok(()));
        }
    }
}
