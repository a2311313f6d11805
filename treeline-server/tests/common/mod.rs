use std::{
    io::{Read, Write},
    net::{Shutdown, SocketAddr, TcpStream},
    num::NonZeroUsize,
    thread::JoinHandle,
    time::Duration,
};

use treeline_server::server::{Server, ServerError, ShutdownHandle};

const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Which serving loop a [`RunningServer`] drives.
pub enum ServerMode {
    LeaderFollower(NonZeroUsize),
    Pipeline,
}

/// A server bound to an ephemeral loopback port, serving on its own thread.
pub struct RunningServer {
    pub addr: SocketAddr,
    handle: ShutdownHandle,
    thread: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    pub fn start(mode: ServerMode) -> Self {
        let bind = "127.0.0.1:0".parse().expect("loopback address must parse");
        let server = Server::bind(bind).expect("server must bind");
        let addr = server.local_addr();
        let handle = server.shutdown_handle();
        let thread = std::thread::spawn(move || match mode {
            ServerMode::LeaderFollower(pool_size) => server.run_leader_follower(pool_size),
            ServerMode::Pipeline => server.run_pipeline(),
        });
        Self {
            addr,
            handle,
            thread,
        }
    }

    /// Stops the serving loop and propagates any serving error.
    pub fn stop(self) {
        self.handle.shutdown();
        self.thread
            .join()
            .expect("server thread must not panic")
            .expect("server must stop cleanly");
    }
}

/// Sends a whole client script, then reads the transcript until the server
/// closes the connection.
pub fn run_client(addr: SocketAddr, script: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("client must connect");
    stream
        .set_read_timeout(Some(CLIENT_READ_TIMEOUT))
        .expect("read timeout must apply");
    stream
        .write_all(script.as_bytes())
        .expect("script must send");
    stream
        .shutdown(Shutdown::Write)
        .expect("write half must close");

    let mut transcript = String::new();
    stream
        .read_to_string(&mut transcript)
        .expect("transcript must arrive");
    transcript
}
