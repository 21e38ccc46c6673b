//! Reading the `Cookie` request header and building `Set-Cookie` values.

#[cfg(feature = "date")]
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    formvars::FormVars,
    url_decoding::{decode, encode},
};

/// Parses a `Cookie` header (`HTTP_COOKIE`) into a list. Values are percent decoded.
pub fn parse_cookie_header(header: &str) -> FormVars {
    let mut cookies = FormVars::new();

    for unit in header.split(';') {
        let unit = unit.trim();

        let (name, value) = unit.split_once('=').unwrap_or((unit, ""));

        cookies.push(name.trim_end(), decode(value.trim_start()));
    }

    cookies
}

/// A cookie to send to the client.
#[derive(Debug, Clone)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: Option<i64>,
    #[cfg(feature = "date")]
    expires: Option<DateTime<Utc>>,
    path: Option<String>,
    domain: Option<String>,
    secure: bool,
}

impl Cookie {
    /// A session cookie, discarded by the browser when it closes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            #[cfg(feature = "date")]
            expires: None,
            path: None,
            domain: None,
            secure: false,
        }
    }

    /// An empty, already expired cookie that makes the browser drop `name`.
    pub fn removal(name: impl Into<String>) -> Self {
        let cookie = Cookie::new(name, "").max_age(0);

        #[cfg(feature = "date")]
        let cookie = match Utc.timestamp_opt(0, 0).single() {
            Some(epoch) => cookie.expires(epoch),
            None => cookie,
        };

        cookie
    }

    /// Lifetime in seconds
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[cfg(feature = "date")]
    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Renders the value of a `Set-Cookie` header. The cookie value is percent encoded so it can
    /// hold any bytes.
    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, encode(&self.value));

        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }

        self.push_expires(&mut out);

        if let Some(path) = &self.path {
            out.push_str(&format!("; Path={path}"));
        }

        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={domain}"));
        }

        if self.secure {
            out.push_str("; Secure");
        }

        out
    }

    #[cfg(feature = "date")]
    fn push_expires(&self, out: &mut String) {
        if let Some(expires) = self.expires {
            out.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
    }

    #[cfg(not(feature = "date"))]
    fn push_expires(&self, _out: &mut String) {}
}
