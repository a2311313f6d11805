//! Line-oriented client session over a buffered transport.
//!
//! A [`Connection`] pairs a buffered reader with a writer (a split
//! [`TcpStream`] in production, in-memory buffers in tests). The three stage
//! functions [`build_graph`], [`build_mst`], and [`analyze`] each drive one
//! protocol phase; [`run_workflow`] chains them on the calling thread. Every
//! prompt is flushed without a trailing newline and every reply from the
//! client is one line.

use std::{
    io::{self, BufRead, BufReader, Write},
    net::{SocketAddr, TcpStream},
};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    graph::{Graph, GraphError, GraphErrorCode},
    mst::{MstAlgorithm, MstEngine},
};

/// Upper bound on the vertex count a single session may request.
///
/// The adjacency matrix grows quadratically with the vertex count, so an
/// unchecked request would let one client demand an arbitrarily large
/// allocation. Exceeding the bound aborts only the requesting session.
pub const MAX_VERTICES: usize = 1024;

/// Errors that abort a client session.
///
/// Each one is contained at the workflow boundary: the orchestrator logs
/// the stable code, the connection drops, and the serving thread moves on.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport failed while prompting or reading.
    #[error("transport error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },
    /// The client closed the connection before the workflow finished.
    #[error("client disconnected mid-workflow")]
    Disconnected,
    /// A reply that should have been a decimal integer was not.
    #[error("expected a decimal integer, got {input:?}")]
    MalformedInteger {
        /// The reply line as received (line terminator stripped).
        input: String,
    },
    /// An edge reply did not hold `from to weight`.
    #[error("expected `from to weight`, got {input:?}")]
    MalformedEdge {
        /// The reply line as received (line terminator stripped).
        input: String,
    },
    /// The requested vertex count exceeds the per-session limit.
    #[error("vertex count {requested} exceeds the session limit of {limit}")]
    VertexLimitExceeded {
        /// The vertex count the client asked for.
        requested: usize,
        /// The enforced limit ([`MAX_VERTICES`]).
        limit: usize,
    },
    /// The graph rejected an edge operation.
    #[error("graph rejected the request: {source}")]
    Graph {
        /// Underlying graph error.
        #[from]
        source: GraphError,
    },
}

impl SessionError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> SessionErrorCode {
        match self {
            Self::Io { .. } => SessionErrorCode::Io,
            Self::Disconnected => SessionErrorCode::Disconnected,
            Self::MalformedInteger { .. } => SessionErrorCode::MalformedInteger,
            Self::MalformedEdge { .. } => SessionErrorCode::MalformedEdge,
            Self::VertexLimitExceeded { .. } => SessionErrorCode::VertexLimitExceeded,
            Self::Graph { .. } => SessionErrorCode::GraphRejected,
        }
    }

    /// Returns the inner [`GraphErrorCode`] when the graph rejected an edge.
    #[must_use]
    pub const fn graph_code(&self) -> Option<GraphErrorCode> {
        match self {
            Self::Graph { source } => Some(source.code()),
            _ => None,
        }
    }
}

/// Machine-readable error codes for [`SessionError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SessionErrorCode {
    /// The transport failed while prompting or reading.
    Io,
    /// The client closed the connection before the workflow finished.
    Disconnected,
    /// A reply that should have been a decimal integer was not.
    MalformedInteger,
    /// An edge reply did not hold `from to weight`.
    MalformedEdge,
    /// The requested vertex count exceeds the per-session limit.
    VertexLimitExceeded,
    /// The graph rejected an edge operation.
    GraphRejected,
}

impl SessionErrorCode {
    /// Returns the symbolic identifier used on logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "SESSION_IO",
            Self::Disconnected => "SESSION_DISCONNECTED",
            Self::MalformedInteger => "SESSION_MALFORMED_INTEGER",
            Self::MalformedEdge => "SESSION_MALFORMED_EDGE",
            Self::VertexLimitExceeded => "SESSION_VERTEX_LIMIT_EXCEEDED",
            Self::GraphRejected => "SESSION_GRAPH_REJECTED",
        }
    }
}

/// One client's transport: a buffered reader half and a writer half.
pub struct Connection<R, W> {
    reader: R,
    writer: W,
    peer: Option<SocketAddr>,
}

impl Connection<BufReader<TcpStream>, TcpStream> {
    /// Splits a TCP stream into a buffered reader half and a writer half.
    ///
    /// The peer address is captured for logging when the socket can still
    /// report one.
    ///
    /// # Errors
    /// Returns the underlying error when the stream handle cannot be
    /// cloned.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let peer = stream.peer_addr().ok();
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: stream,
            peer,
        })
    }
}

impl<R: BufRead, W: Write> Connection<R, W> {
    /// Wraps an arbitrary reader/writer pair, with no peer address.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            peer: None,
        }
    }

    /// Returns the peer address, when known.
    #[must_use]
    #[rustfmt::skip]
    pub fn peer(&self) -> Option<SocketAddr> { self.peer }

    /// Consumes the connection and returns the transport halves.
    #[must_use]
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn prompt(&mut self, text: &str) -> Result<String, SessionError> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        self.read_trimmed_line()
    }

    fn prompt_usize(&mut self, text: &str) -> Result<usize, SessionError> {
        let reply = self.prompt(text)?;
        reply
            .trim()
            .parse()
            .map_err(|_| SessionError::MalformedInteger { input: reply })
    }

    fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_trimmed_line(&mut self) -> Result<String, SessionError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(SessionError::Disconnected);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

/// Runs the graph-creation phase: vertex count, edge count, then one
/// prompt/confirmation exchange per edge.
///
/// # Errors
/// Returns [`SessionError`] when the client disconnects, sends a malformed
/// reply, asks for more than [`MAX_VERTICES`] vertices, or names an edge
/// the graph rejects.
#[instrument(
    name = "session.build_graph",
    err,
    skip(connection),
    fields(peer = ?connection.peer()),
)]
pub fn build_graph<R: BufRead, W: Write>(
    connection: &mut Connection<R, W>,
) -> Result<Graph, SessionError> {
    let vertex_count =
        connection.prompt_usize("----------Graph creation----------\nEnter the number of vertices: ")?;
    if vertex_count > MAX_VERTICES {
        return Err(SessionError::VertexLimitExceeded {
            requested: vertex_count,
            limit: MAX_VERTICES,
        });
    }
    let mut graph = Graph::new(vertex_count);

    let edge_count = connection.prompt_usize("Enter the number of edges: ")?;
    for _ in 0..edge_count {
        let reply = connection.prompt("Enter an edge (from, to, weight): ")?;
        let (from, to, weight) = parse_edge(&reply)?;
        graph.add_edge(from, to, weight)?;
        connection.send_line(&format!(
            "Edge from {from} -> {to} with weight {weight} added successfully!"
        ))?;
    }

    connection.send_line("New graph created!")?;
    debug!(
        vertex_count,
        edge_count = graph.edge_count(),
        "graph phase finished"
    );
    Ok(graph)
}

/// Runs the MST-creation phase: reads the strategy token and builds the
/// engine over the finished graph.
///
/// Unrecognized tokens fall back to Prim; the fallback is policy, not an
/// error. The reply echoes the normalized strategy name.
///
/// # Errors
/// Returns [`SessionError`] when the client disconnects or the transport
/// fails.
#[instrument(
    name = "session.build_mst",
    err,
    skip(connection, graph),
    fields(peer = ?connection.peer()),
)]
pub fn build_mst<R: BufRead, W: Write>(
    connection: &mut Connection<R, W>,
    graph: &Graph,
) -> Result<MstEngine, SessionError> {
    let token =
        connection.prompt("----------MST creation----------\nEnter the algorithm of MST (prim or boruvka): ")?;
    let algorithm = MstAlgorithm::from_token(&token).unwrap_or_else(|| {
        debug!(
            token = token.trim(),
            "unrecognized algorithm token, falling back to prim"
        );
        MstAlgorithm::default()
    });

    let engine = MstEngine::build(graph, algorithm);
    connection.send_line(&format!("MST created using {algorithm} algorithm"))?;
    Ok(engine)
}

/// Runs the analytics phase and emits the report.
///
/// The report pins the example pair `0 -> 1`; graphs too small to contain
/// both endpoints report the unreachable sentinel for the distances.
///
/// # Errors
/// Returns [`SessionError`] when the transport fails mid-report.
#[instrument(
    name = "session.analyze",
    err,
    skip(connection, engine),
    fields(peer = ?connection.peer()),
)]
pub fn analyze<R: BufRead, W: Write>(
    connection: &mut Connection<R, W>,
    engine: &MstEngine,
) -> Result<(), SessionError> {
    let (longest, shortest) = if engine.vertex_count() < 2 {
        (-1, -1)
    } else {
        (engine.longest_distance(0, 1), engine.shortest_distance(0, 1))
    };

    connection.send_line("----------Analysis----------")?;
    connection.send_line(&format!("Total Weight: {}", engine.total_weight()))?;
    connection.send_line(&format!("Longest Distance (e.g. 0->1): {longest}"))?;
    connection.send_line(&format!("Shortest Distance (e.g. 0->1): {shortest}"))?;
    connection.send_line(&format!(
        "Average Edge Count: {:.2}",
        engine.average_edge_count()
    ))?;
    Ok(())
}

/// Runs all three protocol phases back to back on the calling thread.
///
/// # Errors
/// Propagates the first [`SessionError`] any phase raises.
pub fn run_workflow<R: BufRead, W: Write>(
    connection: &mut Connection<R, W>,
) -> Result<(), SessionError> {
    let graph = build_graph(connection)?;
    let engine = build_mst(connection, &graph)?;
    analyze(connection, &engine)
}

fn parse_edge(input: &str) -> Result<(usize, usize, i64), SessionError> {
    let mut tokens = input.split_whitespace();
    let (Some(from), Some(to), Some(weight)) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(SessionError::MalformedEdge {
            input: input.to_owned(),
        });
    };

    // Trailing tokens after the first three are ignored.
    let parsed = (
        from.parse::<usize>(),
        to.parse::<usize>(),
        weight.parse::<i64>(),
    );
    let (Ok(from), Ok(to), Ok(weight)) = parsed else {
        return Err(SessionError::MalformedEdge {
            input: input.to_owned(),
        });
    };
    Ok((from, to, weight))
}
