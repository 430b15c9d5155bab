//! Message-passing store adapter.
//!
//! For backends living in another context (another window, another process
//! shim, a host application), operations travel as request envelopes over a
//! channel and come back as response envelopes correlated by a generated
//! request id. Every round-trip is bounded by a caller-side timeout; a
//! request that never gets a response fails with a timeout error and its
//! pending state is discarded rather than waited on forever.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;

use uuid::Uuid;

use textmarker_engine::anchor::{AnchorPatch, HighlightAnchor};
use textmarker_engine::store::{HighlightStore, StorageError};

/// Default bound on one storage round-trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations carried by a request envelope.
#[derive(Debug, Clone)]
pub enum StoreOp {
    Load,
    Save(HighlightAnchor),
    Update { id: String, patch: AnchorPatch },
    Remove(String),
    Clear,
}

/// Request envelope: an operation plus the correlation id and the channel
/// the response must be sent on.
#[derive(Debug)]
pub struct StoreRequest {
    pub request_id: String,
    pub op: StoreOp,
    reply: Sender<StoreResponse>,
}

/// Successful payloads a response can carry.
#[derive(Debug, Clone)]
pub enum StoreReply {
    Anchors(Vec<HighlightAnchor>),
    Anchor(HighlightAnchor),
    Done,
}

/// Error payloads, kept structured so the caller can map them back onto
/// [`StorageError`] variants.
#[derive(Debug, Clone)]
pub enum StoreFault {
    NotFound(String),
    Validation(String),
    Other(String),
}

/// Response envelope. A populated `error` field rejects the operation.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub request_id: String,
    pub result: Option<StoreReply>,
    pub error: Option<StoreFault>,
}

/// Caller-side adapter: sends request envelopes and blocks on the reply
/// with a timeout.
#[derive(Debug, Clone)]
pub struct ChannelStore {
    outbound: Sender<StoreRequest>,
    timeout: Duration,
}

impl ChannelStore {
    pub fn new(outbound: Sender<StoreRequest>, timeout: Duration) -> Self {
        Self { outbound, timeout }
    }

    fn round_trip(&self, op: StoreOp) -> Result<StoreReply, StorageError> {
        let request_id = Uuid::new_v4().to_string();
        let (reply_tx, reply_rx) = channel();
        let request = StoreRequest {
            request_id: request_id.clone(),
            op,
            reply: reply_tx,
        };
        self.outbound
            .send(request)
            .map_err(|_| StorageError::Transport("storage endpoint disconnected".into()))?;

        let response = reply_rx
            .recv_timeout(self.timeout)
            .map_err(|_| StorageError::Timeout(self.timeout))?;

        if response.request_id != request_id {
            return Err(StorageError::Transport(format!(
                "response correlation mismatch: expected {request_id}, got {}",
                response.request_id
            )));
        }
        if let Some(fault) = response.error {
            return Err(match fault {
                StoreFault::NotFound(id) => StorageError::NotFound(id),
                // Save validates locally before sending, so a remote
                // validation fault means the two sides disagree.
                StoreFault::Validation(message) => {
                    StorageError::Transport(format!("remote validation failed: {message}"))
                }
                StoreFault::Other(message) => StorageError::Transport(message),
            });
        }
        response
            .result
            .ok_or_else(|| StorageError::Transport("empty response envelope".into()))
    }
}

impl HighlightStore for ChannelStore {
    fn load(&mut self) -> Result<Vec<HighlightAnchor>, StorageError> {
        match self.round_trip(StoreOp::Load)? {
            StoreReply::Anchors(anchors) => Ok(anchors),
            other => Err(StorageError::Transport(format!(
                "unexpected reply to load: {other:?}"
            ))),
        }
    }

    fn save(&mut self, anchor: &HighlightAnchor) -> Result<(), StorageError> {
        // Validate locally too: a malformed anchor should never reach the
        // wire.
        anchor.validate()?;
        self.round_trip(StoreOp::Save(anchor.clone())).map(|_| ())
    }

    fn update(&mut self, id: &str, patch: &AnchorPatch) -> Result<HighlightAnchor, StorageError> {
        match self.round_trip(StoreOp::Update {
            id: id.to_string(),
            patch: patch.clone(),
        })? {
            StoreReply::Anchor(anchor) => Ok(anchor),
            other => Err(StorageError::Transport(format!(
                "unexpected reply to update: {other:?}"
            ))),
        }
    }

    fn remove(&mut self, id: &str) -> Result<(), StorageError> {
        self.round_trip(StoreOp::Remove(id.to_string())).map(|_| ())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.round_trip(StoreOp::Clear).map(|_| ())
    }
}

/// Remote-side helper driving a backing store from request envelopes.
pub struct StoreServer<S: HighlightStore> {
    inbound: Receiver<StoreRequest>,
    backing: S,
}

impl<S: HighlightStore> StoreServer<S> {
    pub fn new(inbound: Receiver<StoreRequest>, backing: S) -> Self {
        Self { inbound, backing }
    }

    /// Serve requests until every [`ChannelStore`] clone is dropped.
    pub fn run(mut self) {
        while self.handle_next() {}
    }

    /// Serve one request. Returns false once the channel is disconnected.
    pub fn handle_next(&mut self) -> bool {
        let Ok(request) = self.inbound.recv() else {
            return false;
        };
        let response = self.respond(request.request_id.clone(), request.op);
        // The caller may have timed out and dropped its receiver; that is
        // its decision to make, not an error here.
        if request.reply.send(response).is_err() {
            log::debug!("storage reply dropped: caller gave up on the request");
        }
        true
    }

    fn respond(&mut self, request_id: String, op: StoreOp) -> StoreResponse {
        let outcome = match op {
            StoreOp::Load => self.backing.load().map(StoreReply::Anchors),
            StoreOp::Save(anchor) => self.backing.save(&anchor).map(|_| StoreReply::Done),
            StoreOp::Update { id, patch } => {
                self.backing.update(&id, &patch).map(StoreReply::Anchor)
            }
            StoreOp::Remove(id) => self.backing.remove(&id).map(|_| StoreReply::Done),
            StoreOp::Clear => self.backing.clear().map(|_| StoreReply::Done),
        };
        match outcome {
            Ok(reply) => StoreResponse {
                request_id,
                result: Some(reply),
                error: None,
            },
            Err(err) => StoreResponse {
                request_id,
                result: None,
                error: Some(match err {
                    StorageError::NotFound(id) => StoreFault::NotFound(id),
                    StorageError::Validation(err) => StoreFault::Validation(err.to_string()),
                    other => StoreFault::Other(other.to_string()),
                }),
            },
        }
    }
}

/// Wire a [`ChannelStore`] to a [`StoreServer`] over a fresh channel pair.
pub fn channel_store_pair<S: HighlightStore>(
    backing: S,
    timeout: Duration,
) -> (ChannelStore, StoreServer<S>) {
    let (tx, rx) = channel();
    (ChannelStore::new(tx, timeout), StoreServer::new(rx, backing))
}
