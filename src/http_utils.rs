//! The CGI side of http: reading the request out of the environment and stdin, and writing
//! headers and responses back to stdout.

use http::{HeaderName, HeaderValue, Method};

use std::io::{ErrorKind, Read, Write};

use crate::{
    cookie::Cookie,
    error::Error,
    response::{IntoResponse, RawResponse},
};

/// Upper bound on the size of a POST body we are willing to read. There is no file upload
/// support, so 1 MiB is plenty for text data.
pub const MAX_CONTENT_LENGTH: usize = 1024 * 1024;

/// The request metavariables a CGI program gets from the web server.
#[derive(Debug, Clone, Default)]
pub struct CgiEnv {
    pub request_method: Option<String>,
    pub query_string: Option<String>,
    pub content_length: Option<String>,
    pub content_type: Option<String>,
    pub http_cookie: Option<String>,
}

fn var(name: &str) -> Option<String> {
    std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
}

impl CgiEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the metavariables from the process environment
    pub fn from_env() -> Self {
        Self {
            request_method: var("REQUEST_METHOD"),
            query_string: var("QUERY_STRING"),
            content_length: var("CONTENT_LENGTH"),
            content_type: var("CONTENT_TYPE"),
            http_cookie: var("HTTP_COOKIE"),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request_method = Some(method.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    pub fn content_length(mut self, length: impl Into<String>) -> Self {
        self.content_length = Some(length.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.http_cookie = Some(cookie.into());
        self
    }

    /// The request method. A missing method is treated as `GET`, and `None` is returned for
    /// something that isn't a valid method token.
    pub fn parse_method(&self) -> Option<Method> {
        match self.request_method.as_deref() {
            None | Some("") => Some(Method::GET),
            Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok(),
        }
    }

    /// The declared body length, or `None` if it is missing, malformed, zero or above `max`.
    pub fn parse_content_length(&self, max: usize) -> Option<usize> {
        let raw = self.content_length.as_deref()?;

        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let len = raw.parse::<usize>().ok()?;

        if len == 0 || len > max {
            return None;
        }

        Some(len)
    }
}

/// Fetches the raw form data for a request. `GET` reads the query string, `POST` reads exactly
/// `CONTENT_LENGTH` bytes from `input`. Anything that doesn't amount to usable data, including a
/// short read, gives `Ok(None)`.
pub fn read_form_data<R: Read>(
    env: &CgiEnv,
    input: &mut R,
    max: usize,
) -> Result<Option<Vec<u8>>, Error> {
    let Some(method) = env.parse_method() else {
        log::debug!("ignoring form data for unknown method {:?}", env.request_method);
        return Ok(None);
    };

    if method == Method::GET {
        return Ok(env
            .query_string
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(|q| q.as_bytes().to_vec()));
    }

    if method != Method::POST {
        return Ok(None);
    }

    let Some(len) = env.parse_content_length(max) else {
        log::debug!("rejecting content length {:?}", env.content_length);
        return Ok(None);
    };

    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0);

    match input.read_exact(&mut buf) {
        Ok(()) => Ok(Some(buf)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            log::debug!("short read of request body, expected {len} bytes");
            Ok(None)
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Writes the CGI header block for `response` into `buf`. A `Status` line is only emitted for
/// non `200` responses, the web server fills in the rest.
fn write_response_head_into_buf(
    buf: &mut Vec<u8>,
    response: &RawResponse,
) -> std::io::Result<()> {
    let status = response.status();

    if status != http::StatusCode::OK {
        write!(
            buf,
            "Status: {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )?;
    }

    for (key, value) in response.headers() {
        buf.extend_from_slice(key.as_str().as_bytes());

        write!(buf, ": ")?;

        buf.extend_from_slice(value.as_bytes());

        write!(buf, "\r\n")?;
    }

    write!(buf, "\r\n")?;

    Ok(())
}

/// The response stream of a CGI program. Headers may be added until the blank line that ends
/// them has been written.
pub struct Output<W: Write> {
    writer: W,
    headers_sent: bool,
}

impl<W: Write> Output<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            headers_sent: false,
        }
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Sends a single header line.
    pub fn send_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        if self.headers_sent {
            return Err(Error::HeadersSent);
        }

        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader)?;
        let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader)?;

        self.write_header(&name, &value)
    }

    fn write_header(&mut self, name: &HeaderName, value: &HeaderValue) -> Result<(), Error> {
        let mut line = Vec::with_capacity(name.as_str().len() + value.len() + 4);

        line.extend_from_slice(name.as_str().as_bytes());
        line.extend_from_slice(b": ");
        line.extend_from_slice(value.as_bytes());
        line.extend_from_slice(b"\r\n");

        self.writer.write_all(&line)?;

        Ok(())
    }

    pub fn add_cookie(&mut self, cookie: &Cookie) -> Result<(), Error> {
        if self.headers_sent {
            return Err(Error::HeadersSent);
        }

        let value =
            HeaderValue::from_str(&cookie.header_value()).map_err(|_| Error::InvalidHeader)?;

        self.write_header(&http::header::SET_COOKIE, &value)
    }

    /// Ends the header block with a `text/html` content type. Does nothing if headers were
    /// already sent.
    pub fn init_headers(&mut self) -> Result<(), Error> {
        if self.headers_sent {
            return Ok(());
        }

        self.writer.write_all(b"Content-Type: text/html\r\n\r\n")?;

        self.headers_sent = true;

        Ok(())
    }

    /// Sends a `Location` header and ends the header block. The url is not validated.
    pub fn redirect(&mut self, url: &str) -> Result<(), Error> {
        if self.headers_sent {
            log::warn!("cannot redirect to {url}, headers already sent");
            return Err(Error::HeadersSent);
        }

        let value = HeaderValue::from_str(url).map_err(|_| Error::InvalidHeader)?;

        self.write_header(&http::header::LOCATION, &value)?;
        self.writer.write_all(b"\r\n")?;

        self.headers_sent = true;

        Ok(())
    }

    /// Writes body bytes, sending the default headers first if nothing was sent yet.
    pub fn write_body(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.init_headers()?;

        self.writer.write_all(bytes)?;

        Ok(())
    }

    /// Writes a complete response: remaining headers, the blank line and the body.
    pub fn respond(&mut self, response: impl IntoResponse) -> Result<(), Error> {
        if self.headers_sent {
            return Err(Error::HeadersSent);
        }

        let response = response.response();

        let mut buf = Vec::new();

        write_response_head_into_buf(&mut buf, &response)?;

        buf.extend_from_slice(response.body());

        self.writer.write_all(&buf)?;

        self.headers_sent = true;

        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush()?;

        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
