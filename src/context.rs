use std::io::{self, Read, Write};

use crate::{
    cookie::{parse_cookie_header, Cookie},
    error::Error,
    formvars::{FormVars, Values},
    http_utils::{read_form_data, CgiEnv, Output, MAX_CONTENT_LENGTH},
    response::IntoResponse,
    session::{Session, DEFAULT_COOKIE_NAME, DEFAULT_SAVE_PATH},
    url_decoding::parse_into,
};

/// Settings applied when a `RequestState` is created.
#[derive(Debug, Clone)]
pub struct Config {
    max_content_length: usize,
    save_path: String,
    cookie_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_content_length: MAX_CONTENT_LENGTH,
            save_path: DEFAULT_SAVE_PATH.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest POST body that will be read
    pub fn max_content_length(mut self, len: usize) -> Self {
        self.max_content_length = len;
        self
    }

    /// Directory for session files, ending with a separator
    pub fn save_path(mut self, path: impl Into<String>) -> Self {
        self.save_path = path.into();
        self
    }

    /// Name of the session id cookie
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }
}

/// Everything belonging to the request being served: its environment, the input and output
/// streams, the decoded form data and cookies, and the session.
pub struct RequestState<R: Read = io::Stdin, W: Write = io::Stdout> {
    pub env: CgiEnv,
    input: R,
    pub output: Output<W>,
    form: FormVars,
    form_processed: bool,
    cookies: FormVars,
    session: Session,
    max_content_length: usize,
}

impl RequestState<io::Stdin, io::Stdout> {
    /// A request read from the process environment and stdin, answered on stdout.
    pub fn from_env(config: Config) -> Self {
        RequestState::new(CgiEnv::from_env(), io::stdin(), io::stdout(), config)
    }
}

impl<R: Read, W: Write> RequestState<R, W> {
    pub fn new(env: CgiEnv, input: R, output: W, config: Config) -> Self {
        let cookies = env
            .http_cookie
            .as_deref()
            .map(parse_cookie_header)
            .unwrap_or_default();

        let session = Session::with_config(config.save_path, config.cookie_name);

        Self {
            env,
            input,
            output: Output::new(output),
            form: FormVars::new(),
            form_processed: false,
            cookies,
            session,
            max_content_length: config.max_content_length,
        }
    }

    /// Decodes the query string or POST body into the form list. Only the first call does any
    /// work. Returns whether any form data was found.
    pub fn process_form(&mut self) -> Result<bool, Error> {
        if self.form_processed {
            return Ok(!self.form.is_empty());
        }

        self.form_processed = true;

        let Some(data) = read_form_data(&self.env, &mut self.input, self.max_content_length)?
        else {
            return Ok(false);
        };

        let added = parse_into(&mut self.form, data, b'=', b'&')?;

        Ok(added > 0)
    }

    /// First value of a form field. Empty values read as `None`.
    pub fn param(&self, name: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.form.get(name)
    }

    pub fn param_str(&self, name: impl AsRef<[u8]>) -> Option<&str> {
        self.form.get_str(name)
    }

    /// Every value sent for a repeated form field, such as a group of checkboxes.
    pub fn params<'a>(&'a self, name: &'a str) -> Values<'a> {
        self.form.get_all(name.as_bytes())
    }

    pub fn form(&self) -> &FormVars {
        &self.form
    }

    pub fn cookie_value(&self, name: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.cookies.get(name)
    }

    pub fn cookies(&self) -> &FormVars {
        &self.cookies
    }

    pub fn add_cookie(&mut self, cookie: &Cookie) -> Result<(), Error> {
        self.output.add_cookie(cookie)
    }

    pub fn send_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        self.output.send_header(name, value)
    }

    pub fn init_headers(&mut self) -> Result<(), Error> {
        self.output.init_headers()
    }

    pub fn redirect(&mut self, url: &str) -> Result<(), Error> {
        self.output.redirect(url)
    }

    pub fn write_body(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.output.write_body(bytes)
    }

    pub fn respond(&mut self, response: impl IntoResponse) -> Result<(), Error> {
        self.output.respond(response)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable access, mostly to change the save path or cookie name before starting.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn session_start(&mut self) -> Result<(), Error> {
        self.session.start(&self.cookies, &mut self.output)
    }

    pub fn session_register(&mut self, name: &str, value: impl AsRef<[u8]>) -> Result<(), Error> {
        self.session.register(name, value)
    }

    pub fn session_alter(&mut self, name: &str, value: impl AsRef<[u8]>) -> Result<(), Error> {
        self.session.alter(name, value)
    }

    pub fn session_unregister(&mut self, name: &str) -> Result<(), Error> {
        self.session.unregister(name)
    }

    pub fn session_destroy(&mut self) -> Result<(), Error> {
        self.session.destroy(&mut self.output)
    }

    /// End of request cleanup. Forgets form data, cookies and in-memory session variables, and
    /// flushes the output.
    pub fn end(&mut self) -> Result<(), Error> {
        self.form.clear();
        self.form_processed = false;
        self.cookies.clear();
        self.session.clear();

        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    type TestState = RequestState<Cursor<Vec<u8>>, Vec<u8>>;

    fn state(env: CgiEnv, body: &str) -> TestState {
        RequestState::new(
            env,
            Cursor::new(body.as_bytes().to_vec()),
            Vec::new(),
            Config::new(),
        )
    }

    #[test]
    fn no_data() {
        let mut state = state(CgiEnv::new(), "");

        assert!(!state.process_form().unwrap());
        assert!(state.form().is_empty());
    }

    #[test]
    fn query_string() {
        let mut state = state(CgiEnv::new().query("zero=0&one=test"), "");

        assert!(state.process_form().unwrap());

        assert_eq!(state.form().iter().next().unwrap().name(), b"zero");
        assert_eq!(state.param_str("zero"), Some("0"));
        assert_eq!(state.param_str("one"), Some("test"));
    }

    #[test]
    fn post_body() {
        let env = CgiEnv::new()
            .method("POST")
            .content_length("15")
            .query("ignored=1");

        let mut state = state(env, "zero=0&one=test");

        assert!(state.process_form().unwrap());
        assert_eq!(state.param_str("one"), Some("test"));
        assert!(state.param("ignored").is_none());
    }

    #[test]
    fn process_form_once() {
        let mut state = state(CgiEnv::new().query("a=1&b=2"), "");

        state.process_form().unwrap();
        state.process_form().unwrap();

        assert_eq!(state.form().len(), 2);
    }

    #[test]
    fn repeated_params() {
        let mut state = state(
            CgiEnv::new().query("zero=0&one=one&one=two&two=three&one=four&three=3"),
            "",
        );

        state.process_form().unwrap();

        let mut values = state.params("one");

        assert_eq!(values.next(), Some(&b"one"[..]));
        assert_eq!(values.next(), Some(&b"two"[..]));
        assert_eq!(values.next(), Some(&b"four"[..]));
        assert_eq!(values.next(), None);
        assert_eq!(values.next(), None);

        let restarted: Vec<&[u8]> = state.params("one").collect();
        assert_eq!(restarted.len(), 3);
    }

    #[test]
    fn cookies_from_env() {
        let state = state(CgiEnv::new().cookie("CGISID=abc; lang=en"), "");

        assert_eq!(state.cookie_value("lang"), Some(&b"en"[..]));
        assert_eq!(state.cookies().len(), 2);
    }

    #[test]
    fn session_through_state() {
        let dir = tempfile::tempdir().unwrap();

        let config = Config::new()
            .save_path(format!("{}/", dir.path().display()))
            .cookie_name("cgi_sess");

        let mut state: TestState =
            RequestState::new(CgiEnv::new(), Cursor::new(Vec::new()), Vec::new(), config);

        assert_eq!(state.session().cookie_name(), "cgi_sess");
        assert_eq!(
            state.session().save_path(),
            format!("{}/", dir.path().display())
        );

        state.session_start().unwrap();
        state.session_register("user", "alice").unwrap();
        state.session_alter("user", "bob").unwrap();

        assert_eq!(state.session().var_str("user"), Some("bob"));

        let id = state.session().id().unwrap().to_string();

        state.write_body(b"<p>hello</p>").unwrap();

        assert!(state.session_destroy().is_ok());
        assert!(!dir.path().join(format!("cgisess_{id}")).exists());

        let written = String::from_utf8(state.output.into_inner()).unwrap();

        assert!(written.starts_with(&format!("set-cookie: cgi_sess={id}\r\n")));
        assert!(written.ends_with("<p>hello</p>"));
    }

    #[test]
    fn end_clears_everything() {
        let mut state = state(CgiEnv::new().query("a=1").cookie("c=1"), "");

        state.process_form().unwrap();
        state.end().unwrap();

        assert!(state.form().is_empty());
        assert!(state.cookies().is_empty());
        assert!(state.session().vars().is_empty());
    }
}
