//! TCP listener and the serving loops for both architectures.
//!
//! [`Server::bind`] stands up the listener; [`Server::run_leader_follower`]
//! and [`Server::run_pipeline`] then accept connections until a
//! [`ShutdownHandle`] stops the loop. Per-connection failures are contained
//! inside the architecture executors; the loop itself only gives up on
//! errors that mean the listener is gone.

use std::{
    io,
    net::{SocketAddr, TcpListener, TcpStream},
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use treeline_core::{
    Connection, Pipeline, PipelineError, PoolError, WorkerPool, run_pipelined, run_pooled,
};

/// Errors raised while standing up or running the server.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address the listener was asked to bind.
        addr: SocketAddr,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// Accepting a connection failed in a way that outlives one client.
    #[error("accept failed: {source}")]
    Accept {
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The worker pool could not start.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The pipeline could not start.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ServerError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> ServerErrorCode {
        match self {
            Self::Bind { .. } => ServerErrorCode::Bind,
            Self::Accept { .. } => ServerErrorCode::Accept,
            Self::Pool(_) => ServerErrorCode::Pool,
            Self::Pipeline(_) => ServerErrorCode::Pipeline,
        }
    }
}

/// Machine-readable error codes for [`ServerError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ServerErrorCode {
    /// Binding the listener failed.
    Bind,
    /// Accepting a connection failed in a way that outlives one client.
    Accept,
    /// The worker pool could not start.
    Pool,
    /// The pipeline could not start.
    Pipeline,
}

impl ServerErrorCode {
    /// Returns the symbolic identifier used on logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bind => "SERVER_BIND_FAILED",
            Self::Accept => "SERVER_ACCEPT_FAILED",
            Self::Pool => "SERVER_POOL_START_FAILED",
            Self::Pipeline => "SERVER_PIPELINE_START_FAILED",
        }
    }
}

/// A bound TCP listener, not yet serving.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
}

impl Server {
    /// Binds a listener on `addr`.
    ///
    /// Binding port 0 picks a free port; [`Server::local_addr`] reports the
    /// resolved address.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] when the address cannot be bound.
    pub fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;
        debug!(addr = %local_addr, "listener bound");
        Ok(Self {
            listener,
            local_addr,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the address the listener actually bound.
    #[must_use]
    #[rustfmt::skip]
    pub fn local_addr(&self) -> SocketAddr { self.local_addr }

    /// Returns a handle that can stop the serving loop from another thread.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: Arc::clone(&self.stop),
            addr: self.local_addr,
        }
    }

    /// Serves connections on a Leader-Follower worker pool until shutdown.
    ///
    /// Each accepted connection becomes one pool task owning the client's
    /// whole workflow, so the accept loop returns to `accept` immediately
    /// and up to `pool_size` clients are served in parallel. On shutdown
    /// the pool drains its queue before the call returns.
    ///
    /// # Errors
    /// Returns [`ServerError`] when the pool cannot start or accepting
    /// fails with a non-transient error.
    #[instrument(
        name = "server.leader_follower",
        err,
        skip(self),
        fields(addr = %self.local_addr, pool_size = pool_size.get()),
    )]
    pub fn run_leader_follower(self, pool_size: NonZeroUsize) -> Result<(), ServerError> {
        let pool = WorkerPool::new(pool_size)?;
        let result = self.accept_loop(|stream| dispatch_pooled(&pool, stream));
        pool.shutdown();
        info!(addr = %self.local_addr, "server stopped");
        result
    }

    /// Serves connections on the staged pipeline until shutdown.
    ///
    /// Each accepted connection gets a named waiter thread that threads the
    /// workflow through the shared stages and blocks on its completion
    /// barrier; the stages themselves are shared by every client. On
    /// shutdown the waiters are joined before the stages drain.
    ///
    /// # Errors
    /// Returns [`ServerError`] when the pipeline cannot start or accepting
    /// fails with a non-transient error.
    #[instrument(
        name = "server.pipeline",
        err,
        skip(self),
        fields(addr = %self.local_addr),
    )]
    pub fn run_pipeline(self) -> Result<(), ServerError> {
        let pipeline = Pipeline::new()?;
        let handles = pipeline.handles();
        let mut waiters: Vec<JoinHandle<()>> = Vec::new();
        let mut next_id: u64 = 0;

        let result = self.accept_loop(|stream| {
            waiters.retain(|waiter| !waiter.is_finished());
            let Some(connection) = split_stream(stream) else {
                return;
            };
            let name = format!("treeline-conn-{next_id}");
            next_id += 1;
            let handles = handles.clone();
            let spawned = std::thread::Builder::new().name(name).spawn(move || {
                let outcome = run_pipelined(&handles, connection);
                debug!(?outcome, "connection waiter finished");
            });
            match spawned {
                Ok(waiter) => waiters.push(waiter),
                Err(err) => warn!(error = %err, "failed to spawn connection waiter"),
            }
        });

        for waiter in waiters {
            if waiter.join().is_err() {
                error!("connection waiter terminated by panic");
            }
        }
        pipeline.shutdown();
        info!(addr = %self.local_addr, "server stopped");
        result
    }

    fn accept_loop(&self, mut serve: impl FnMut(TcpStream)) -> Result<(), ServerError> {
        for attempt in self.listener.incoming() {
            if self.stop.load(Ordering::SeqCst) {
                debug!(addr = %self.local_addr, "accept loop stopping");
                break;
            }
            match attempt {
                Ok(stream) => serve(stream),
                Err(err) if recoverable_accept_error(&err) => {
                    warn!(error = %err, "transient accept failure");
                }
                Err(source) => return Err(ServerError::Accept { source }),
            }
        }
        Ok(())
    }
}

/// Stops a running server from outside its accept loop.
///
/// Raising the stop flag alone is not enough: the loop may be parked in
/// `accept`. The handle therefore also opens one throwaway connection to
/// the listener, which wakes the loop so it can observe the flag.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Requests the serving loop to stop and wakes it.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        match TcpStream::connect(self.addr) {
            Ok(stream) => drop(stream),
            Err(err) => debug!(error = %err, "shutdown wake connection failed"),
        }
        info!(addr = %self.addr, "shutdown requested");
    }
}

fn dispatch_pooled(pool: &WorkerPool, stream: TcpStream) {
    if let Some(connection) = split_stream(stream) {
        run_pooled(pool, connection);
    }
}

fn split_stream(
    stream: TcpStream,
) -> Option<Connection<io::BufReader<TcpStream>, TcpStream>> {
    match Connection::from_stream(stream) {
        Ok(connection) => {
            debug!(peer = ?connection.peer(), "connection accepted");
            Some(connection)
        }
        Err(err) => {
            // The client is gone before we could serve it; drop and move on.
            warn!(error = %err, "failed to split accepted stream");
            None
        }
    }
}

fn recoverable_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
