//! Response body module
//!
//! Small in-memory bodies (error text) and files streamed from disk in
//! fixed-size chunks behind one `Body` type.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use http_body_util::Full;
use hyper::body::{Body, Bytes, Frame, SizeHint};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

/// Read size for streamed files
const CHUNK_SIZE: usize = 64 * 1024;

/// Body of every response the server produces
#[derive(Debug)]
pub enum ResponseBody {
    Empty,
    Full(Full<Bytes>),
    File(FileStream),
}

impl ResponseBody {
    pub const fn empty() -> Self {
        Self::Empty
    }

    pub fn text(text: impl Into<Bytes>) -> Self {
        Self::Full(Full::new(text.into()))
    }

    /// Stream exactly `len` bytes from `file`
    pub fn file(file: File, len: u64) -> Self {
        Self::File(FileStream::new(file, len))
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::Empty
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Empty => Poll::Ready(None),
            Self::Full(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::File(stream) => stream.poll_chunk(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Full(full) => full.is_end_stream(),
            Self::File(stream) => stream.remaining == 0,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Empty => SizeHint::with_exact(0),
            Self::Full(full) => full.size_hint(),
            Self::File(stream) => SizeHint::with_exact(stream.remaining),
        }
    }
}

/// Chunked reader over an open file
#[derive(Debug)]
pub struct FileStream {
    file: File,
    remaining: u64,
    buf: Vec<u8>,
}

impl FileStream {
    fn new(file: File, len: u64) -> Self {
        let cap = usize::try_from(len).map_or(CHUNK_SIZE, |len| len.min(CHUNK_SIZE));
        Self {
            file,
            remaining: len,
            buf: vec![0; cap],
        }
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<io::Result<Frame<Bytes>>>> {
        if self.remaining == 0 {
            return Poll::Ready(None);
        }

        let want = usize::try_from(self.remaining).map_or(self.buf.len(), |r| r.min(self.buf.len()));
        let mut read_buf = ReadBuf::new(&mut self.buf[..want]);
        match Pin::new(&mut self.file).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    // File shrank after Content-Length was sent
                    self.remaining = 0;
                    return Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "file truncated while streaming",
                    ))));
                }
                self.remaining -= filled.len() as u64;
                Poll::Ready(Some(Ok(Frame::data(Bytes::copy_from_slice(filled)))))
            }
        }
    }
}
