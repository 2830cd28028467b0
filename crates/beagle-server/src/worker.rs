//! The worker pool.
//!
//! A fixed number of long-lived tasks consume queries from a shared
//! bounded queue. Closing the queue's send side releases every waiting
//! worker at shutdown; a worker finishes the query it holds before
//! exiting.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use beagle_resolver::Resolver;

use crate::handler::handle_query;
use crate::stats::ServerStats;

/// One received datagram, queued for a worker.
#[derive(Debug, Clone)]
pub struct QueryTask {
    /// The raw request bytes.
    pub data: Bytes,
    /// The client that sent it.
    pub src: SocketAddr,
}

/// Receiver half of the work queue, shared by all workers.
pub type TaskQueue = Arc<Mutex<mpsc::Receiver<QueryTask>>>;

/// Spawns `count` workers draining `queue`.
pub fn spawn_workers(
    count: usize,
    queue: TaskQueue,
    socket: Arc<UdpSocket>,
    resolver: Arc<Resolver>,
    stats: Arc<ServerStats>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let queue = queue.clone();
            let socket = socket.clone();
            let resolver = resolver.clone();
            let stats = stats.clone();

            tokio::spawn(async move {
                trace!(worker_id, "worker started");

                loop {
                    let task = {
                        let mut rx = queue.lock().await;
                        rx.recv().await
                    };

                    let Some(task) = task else {
                        // queue closed, shutdown in progress
                        break;
                    };

                    if let Err(err) = handle_query(&socket, &resolver, &stats, task).await {
                        debug!(worker_id, error = %err, "query handling failed");
                    }
                }

                trace!(worker_id, "worker stopped");
            })
        })
        .collect()
}
