//! Allocation of genome ids and historical markers.
//!
//! A single ledger owns the counters and the memo maps. It lives on its own
//! thread and serves one request at a time, so parallel mutation jobs that
//! discover the same structure within a generation receive the same marker.

use std::collections::HashMap;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, trace};

use crate::error::{NeatError, Result};
use crate::gene::{Marker, Position};

/// Identity of a new node: its position, compared by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey([u64; 3]);

impl From<&Position> for NodeKey {
    fn from(position: &Position) -> Self {
        // -0.0 and 0.0 must map to the same key
        NodeKey([
            (position.x + 0.).to_bits(),
            (position.y + 0.).to_bits(),
            (position.z + 0.).to_bits(),
        ])
    }
}

/// Identity of a new connection: its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnKey {
    pub source: Marker,
    pub target: Marker,
}

impl ConnKey {
    pub fn new(source: Marker, target: Marker) -> ConnKey {
        ConnKey { source, target }
    }
}

enum Request {
    NextId(Sender<u64>),
    NextMarker(Sender<Marker>),
    Node(NodeKey, Sender<Marker>),
    Connection(ConnKey, Sender<Marker>),
    Reset(Sender<()>),
    Shutdown,
}

struct Ledger {
    next_id: u64,
    next_marker: Marker,
    nodes: HashMap<NodeKey, Marker>,
    connections: HashMap<ConnKey, Marker>,
}

impl Ledger {
    fn allocate(&mut self) -> Marker {
        let marker = self.next_marker;
        self.next_marker += 1;
        marker
    }

    fn serve(mut self, requests: Receiver<Request>) {
        // a failed reply only means the asking side gave up waiting
        for request in requests.iter() {
            match request {
                Request::NextId(reply) => {
                    let id = self.next_id;
                    self.next_id += 1;
                    let _ = reply.send(id);
                }
                Request::NextMarker(reply) => {
                    let marker = self.allocate();
                    trace!("allocated marker {}", marker);
                    let _ = reply.send(marker);
                }
                Request::Node(key, reply) => {
                    let marker = match self.nodes.get(&key) {
                        Some(marker) => *marker,
                        None => {
                            let marker = self.allocate();
                            trace!("allocated node marker {} for {:?}", marker, key);
                            self.nodes.insert(key, marker);
                            marker
                        }
                    };
                    let _ = reply.send(marker);
                }
                Request::Connection(key, reply) => {
                    let marker = match self.connections.get(&key) {
                        Some(marker) => *marker,
                        None => {
                            let marker = self.allocate();
                            trace!("allocated connection marker {} for {:?}", marker, key);
                            self.connections.insert(key, marker);
                            marker
                        }
                    };
                    let _ = reply.send(marker);
                }
                Request::Reset(reply) => {
                    debug!(
                        "clearing {} node and {} connection innovations",
                        self.nodes.len(),
                        self.connections.len()
                    );
                    self.nodes.clear();
                    self.connections.clear();
                    let _ = reply.send(());
                }
                Request::Shutdown => break,
            }
        }
        debug!("innovation ledger stopped at id {} marker {}", self.next_id, self.next_marker);
    }
}

/// Handle to the innovation ledger. Cheap to clone and safe to share across
/// worker threads.
#[derive(Debug, Clone)]
pub struct Innovation {
    requests: Sender<Request>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Request::NextId(_) => "NextId",
            Request::NextMarker(_) => "NextMarker",
            Request::Node(..) => "Node",
            Request::Connection(..) => "Connection",
            Request::Reset(_) => "Reset",
            Request::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl Innovation {
    fn ask<T>(&self, request: impl FnOnce(Sender<T>) -> Request) -> Result<T> {
        let (reply, response) = channel::bounded(1);
        self.requests.send(request(reply)).map_err(|_| NeatError::TrackerClosed)?;
        response.recv().map_err(|_| NeatError::TrackerClosed)
    }

    /// A fresh genome or species id.
    pub fn next_id(&self) -> Result<u64> {
        self.ask(Request::NextId)
    }

    /// A fresh marker, never memoised.
    pub fn next_marker(&self) -> Result<Marker> {
        self.ask(Request::NextMarker)
    }

    /// Marker for a node at the given position. Within a generation the same
    /// position always yields the same marker.
    pub fn bless_node_gene(&self, key: NodeKey) -> Result<Marker> {
        self.ask(|reply| Request::Node(key, reply))
    }

    /// Marker for a connection between two nodes. Within a generation the
    /// same endpoints always yield the same marker.
    pub fn bless_connection_gene(&self, key: ConnKey) -> Result<Marker> {
        self.ask(|reply| Request::Connection(key, reply))
    }

    /// Forget the innovations of the previous generation. Counters keep going.
    pub fn reset(&self) -> Result<()> {
        self.ask(Request::Reset)
    }
}

/// Owner of the ledger thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct InnovationTracker {
    innovation: Innovation,
    worker: Option<JoinHandle<()>>,
}

impl InnovationTracker {
    /// Start with id 0 and marker 0.
    pub fn new() -> InnovationTracker {
        InnovationTracker::resume(0, 0)
    }

    /// Start with the given counters, e.g. one past the largest id and marker
    /// of a restored population.
    pub fn resume(next_id: u64, next_marker: Marker) -> InnovationTracker {
        let (requests, inbox) = channel::unbounded();
        let ledger = Ledger { next_id, next_marker, nodes: HashMap::new(), connections: HashMap::new() };
        let worker = thread::Builder::new()
            .name("innovation".to_string())
            .spawn(move || ledger.serve(inbox));
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                // every request will fail with TrackerClosed
                log::error!("failed to start innovation ledger: {}", e);
                None
            }
        };
        debug!("innovation ledger started at id {} marker {}", next_id, next_marker);
        InnovationTracker { innovation: Innovation { requests }, worker }
    }

    pub fn handle(&self) -> Innovation {
        self.innovation.clone()
    }

    pub fn reset(&self) -> Result<()> {
        self.innovation.reset()
    }
}

impl Default for InnovationTracker {
    fn default() -> Self {
        InnovationTracker::new()
    }
}

impl Drop for InnovationTracker {
    fn drop(&mut self) {
        let _ = self.innovation.requests.send(Request::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
