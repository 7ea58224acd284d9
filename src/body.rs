//! Definitions for the response body.
//!
//! Responses are either a single buffer (XML, listings, error messages) or
//! a stream of chunks read from the storage backend (GET). Buffered bodies
//! report their exact size, so the server can frame them without chunking.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream};
use http::header::HeaderMap;
use http_body::{Body as HttpBody, SizeHint};

/// Body is returned by the webdav handler, and implements both `Stream`
/// and `http_body::Body`.
///
/// A streamed body is produced while the client reads it. There is no way
/// to cancel it other than dropping the response.
pub struct Body {
    inner: Inner,
}

enum Inner {
    Empty,
    Full(Bytes),
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

impl Body {
    /// Return an empty body.
    pub fn empty() -> Body {
        Body { inner: Inner::Empty }
    }

    /// Create a body from a stream.
    pub fn stream(stream: impl Stream<Item = io::Result<Bytes>> + Send + 'static) -> Body {
        Body {
            inner: Inner::Stream(Box::pin(stream)),
        }
    }

    fn full(data: Bytes) -> Body {
        if data.is_empty() {
            return Body::empty();
        }
        Body {
            inner: Inner::Full(data),
        }
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Inner::Stream(stream) = &mut this.inner {
            return stream.as_mut().poll_next(cx);
        }
        match std::mem::replace(&mut this.inner, Inner::Empty) {
            Inner::Full(data) => Poll::Ready(Some(Ok(data))),
            _ => Poll::Ready(None),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Inner::Empty => (0, Some(0)),
            Inner::Full(_) => (1, Some(1)),
            Inner::Stream(stream) => stream.size_hint(),
        }
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        self.poll_next(cx)
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context,
    ) -> Poll<Result<Option<HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.inner, Inner::Empty)
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Inner::Empty => SizeHint::with_exact(0),
            Inner::Full(data) => SizeHint::with_exact(data.len() as u64),
            Inner::Stream(_) => SizeHint::default(),
        }
    }
}

impl From<String> for Body {
    fn from(t: String) -> Body {
        Body::full(Bytes::from(t))
    }
}

impl From<&str> for Body {
    fn from(t: &str) -> Body {
        Body::full(Bytes::copy_from_slice(t.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(t: Vec<u8>) -> Body {
        Body::full(Bytes::from(t))
    }
}

impl From<Bytes> for Body {
    fn from(t: Bytes) -> Body {
        Body::full(t)
    }
}
