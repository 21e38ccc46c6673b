//! Helpers for writing CGI programs: decoding form data, reading and setting cookies, writing
//! headers, and keeping state between requests in file backed sessions.
//!
//! ```no_run
//! use burrow::{Config, RequestState};
//!
//! let mut state = RequestState::from_env(Config::new());
//!
//! state.process_form().unwrap();
//! state.session_start().unwrap();
//!
//! let visits = state.param_str("visits").unwrap_or("0").parse::<u32>().unwrap_or(0);
//!
//! state
//!     .write_body(format!("<p>Visit number {}</p>", visits + 1).as_bytes())
//!     .unwrap();
//! ```

pub mod context;
pub mod cookie;
pub mod error;
pub mod formvars;
pub mod http_utils;
pub mod response;
pub mod session;
pub mod url_decoding;

#[cfg(feature = "strings")]
pub mod strings;

pub use context::{Config, RequestState};
pub use cookie::Cookie;
pub use error::{Error, SessionError, Severity};
pub use formvars::{Entry, FormVars, Values};
pub use http_utils::{CgiEnv, Output};
pub use response::{Html, IntoResponse, Plain, RawResponse, Redirect};
pub use session::Session;

pub use http;
