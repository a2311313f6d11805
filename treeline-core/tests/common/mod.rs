use std::{
    io::{self, Cursor, Write},
    sync::{Arc, Mutex},
};

use treeline_core::Connection;

/// Writer half the test can still read after the connection consumed it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    #[must_use]
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("buffer lock must not poison").clone();
        String::from_utf8(bytes).expect("transcript must be valid UTF-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("buffer lock must not poison")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds the client-side input for one whole workflow.
#[must_use]
pub fn client_script(vertices: usize, edges: &[(usize, usize, i64)], algorithm: &str) -> String {
    let mut script = format!("{vertices}\n{}\n", edges.len());
    for (from, to, weight) in edges {
        script.push_str(&format!("{from} {to} {weight}\n"));
    }
    script.push_str(algorithm);
    script.push('\n');
    script
}

/// The worked four-vertex example: a cheap chain plus an expensive chord.
#[must_use]
pub fn chain_script(algorithm: &str) -> String {
    client_script(4, &[(0, 1, 1), (1, 2, 2), (2, 3, 3), (0, 3, 10)], algorithm)
}

/// Pairs a scripted reader with a shared transcript buffer.
#[must_use]
pub fn scripted(script: &str, buffer: &SharedBuffer) -> Connection<Cursor<Vec<u8>>, SharedBuffer> {
    Connection::new(Cursor::new(script.as_bytes().to_vec()), buffer.clone())
}
