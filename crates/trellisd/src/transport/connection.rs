//! Stream abstraction and bounded frame reading for reply connections.

use std::io::{self, Read, Write};
use std::net::TcpStream;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// One inbound frame may not exceed this many bytes, newline included.
pub(crate) const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Stream types the reply listener accepts.
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Splits a connection's byte stream into newline-delimited frames.
///
/// Bytes read past a delimiter stay buffered for the next call, so a
/// client may batch several frames into one write without losing any.
#[derive(Default)]
pub(crate) struct FrameReader {
    pending: Vec<u8>,
}

impl FrameReader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reads the next frame, retrying interrupted reads.
    ///
    /// Returns `None` on a clean end of stream with nothing buffered. A
    /// final unterminated frame before EOF is still delivered. A frame
    /// exceeding [`MAX_FRAME_BYTES`] is an `InvalidData` error; the
    /// caller drops the connection.
    pub(crate) fn read_frame(
        &mut self,
        stream: &mut ConnectionStream,
    ) -> io::Result<Option<Vec<u8>>> {
        let mut chunk = [0_u8; 4096];
        loop {
            if let Some(pos) = self.pending.iter().position(|byte| *byte == b'\n') {
                let mut frame: Vec<u8> = self.pending.drain(..=pos).collect();
                frame.pop();
                enforce_frame_limit(frame.len())?;
                return Ok(Some(frame));
            }
            enforce_frame_limit(self.pending.len())?;

            let bytes_read = loop {
                match stream.read(&mut chunk) {
                    Ok(read) => break read,
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                    Err(error) => return Err(error),
                }
            };

            if bytes_read == 0 {
                return Ok(if self.pending.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut self.pending))
                });
            }
            self.pending.extend_from_slice(&chunk[..bytes_read]);
        }
    }
}

fn enforce_frame_limit(size: usize) -> io::Result<()> {
    if size > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "frame exceeds maximum size",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use super::*;

    fn frames_over_tcp(payload: &'static [u8], reads: usize) -> Vec<io::Result<Option<Vec<u8>>>> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let writer = thread::spawn(move || {
            let mut client = TcpStream::connect(addr).expect("connect client");
            client.write_all(payload).expect("write payload");
        });
        let (stream, _) = listener.accept().expect("accept connection");
        let mut stream = ConnectionStream::Tcp(stream);
        let mut reader = FrameReader::new();
        let results = (0..reads)
            .map(|_| reader.read_frame(&mut stream))
            .collect();
        writer.join().expect("join writer");
        results
    }

    fn over_tcp(payload: &'static [u8]) -> io::Result<Option<Vec<u8>>> {
        frames_over_tcp(payload, 1)
            .pop()
            .expect("one read requested")
    }

    #[test]
    fn newline_terminates_a_frame() {
        let frame = over_tcp(b"{\"kind\":\"init\"}\n").expect("read frame");
        assert_eq!(frame.as_deref(), Some(b"{\"kind\":\"init\"}".as_slice()));
    }

    #[test]
    fn pipelined_frames_in_one_write_are_all_delivered() {
        let results = frames_over_tcp(b"{\"kind\":\"init\"}\n{\"kind\":\"op\"}\n", 3);
        let frames: Vec<Option<Vec<u8>>> = results
            .into_iter()
            .map(|result| result.expect("read frame"))
            .collect();
        assert_eq!(
            frames,
            vec![
                Some(b"{\"kind\":\"init\"}".to_vec()),
                Some(b"{\"kind\":\"op\"}".to_vec()),
                None,
            ]
        );
    }

    #[test]
    fn bytes_after_a_delimiter_are_kept_for_the_next_frame() {
        let results = frames_over_tcp(b"a\nb", 2);
        let frames: Vec<Option<Vec<u8>>> = results
            .into_iter()
            .map(|result| result.expect("read frame"))
            .collect();
        assert_eq!(frames, vec![Some(b"a".to_vec()), Some(b"b".to_vec())]);
    }

    #[test]
    fn eof_delivers_the_unterminated_tail() {
        let frame = over_tcp(b"{\"kind\":\"init\"}").expect("read frame");
        assert_eq!(frame.as_deref(), Some(b"{\"kind\":\"init\"}".as_slice()));
    }

    #[test]
    fn clean_eof_yields_no_frame() {
        let frame = over_tcp(b"").expect("read frame");
        assert!(frame.is_none());
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let payload: &'static [u8] = Box::leak(vec![b'x'; MAX_FRAME_BYTES + 16].into_boxed_slice());
        let error = over_tcp(payload).expect_err("oversized frame rejected");
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}
