//! File backed sessions.
//!
//! Each session lives in a single file named `{save_path}cgisess_{id}` holding one line of
//! `name=value` records separated by `;`. Values are percent encoded on disk. The session id
//! travels in a cookie (`CGISID` by default).
//!
//! There is no locking. Two requests carrying the same id at the same time can overwrite each
//! other's changes, the last rewrite wins.

use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    cookie::Cookie,
    error::{Error, SessionError},
    formvars::{Entry, FormVars},
    http_utils::Output,
    url_decoding::{encode, parse_into},
};

/// Length of a session id
pub const SESSION_ID_LEN: usize = 45;

/// Characters a session id is made of
pub const SESSION_ID_ALPHABET: &[u8] =
    b"123456789abcdefghijlmnopqrstuvxzwyABCDEFGHIJLMOPQRSTUVXZYW";

pub const SESSION_FILE_PREFIX: &str = "cgisess_";

pub const DEFAULT_SAVE_PATH: &str = "/tmp/";

pub const DEFAULT_COOKIE_NAME: &str = "CGISID";

/// Whether `id` could have been produced by `generate_id`. Anything else must never reach the
/// filesystem.
pub fn is_valid_id(id: &[u8]) -> bool {
    id.len() == SESSION_ID_LEN && id.iter().all(|b| SESSION_ID_ALPHABET.contains(b))
}

/// Whether `name` can be stored as a session variable name. The record separators and control
/// characters would split the record when the file is read back.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.bytes().any(|b| b == b'=' || b == b';' || b.is_ascii_control())
}

/// Generates a new session id. The generator is seeded from the clock, which is fine for telling
/// sessions apart and nothing more.
pub fn generate_id() -> String {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().wrapping_mul(1_000_000).wrapping_add(d.subsec_nanos() as u64))
        .unwrap_or_default()
        ^ std::process::id() as u64;

    let mut rng = StdRng::seed_from_u64(seed);

    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_ALPHABET[rng.gen_range(0..SESSION_ID_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Started,
}

/// The session of the current request.
pub struct Session {
    save_path: String,
    cookie_name: String,
    state: State,
    id: Option<String>,
    vars: FormVars,
    // Set when the file holds more than the records in `vars`
    stale_file: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_SAVE_PATH, DEFAULT_COOKIE_NAME)
    }

    /// A session that is kept under `save_path` and identified by the cookie `cookie_name`.
    pub fn with_config(save_path: impl Into<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            save_path: save_path.into(),
            cookie_name: cookie_name.into(),
            state: State::Uninitialized,
            id: None,
            vars: FormVars::new(),
            stale_file: false,
        }
    }

    /// Directory session files are kept in. It must end with a path separator and is not created
    /// for you. Only allowed before `start`.
    pub fn set_save_path(&mut self, path: impl Into<String>) -> Result<(), Error> {
        if self.state == State::Started {
            return Err(SessionError::AlreadyStarted.into());
        }

        self.save_path = path.into();

        Ok(())
    }

    /// Name of the cookie carrying the session id. Only allowed before `start`.
    pub fn set_cookie_name(&mut self, name: impl Into<String>) -> Result<(), Error> {
        if self.state == State::Started {
            return Err(SessionError::AlreadyStarted.into());
        }

        self.cookie_name = name.into();

        Ok(())
    }

    pub fn save_path(&self) -> &str {
        &self.save_path
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == State::Started
    }

    /// The session id, once started
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn vars(&self) -> &FormVars {
        &self.vars
    }

    fn file_path(&self, id: &str) -> PathBuf {
        PathBuf::from(format!("{}{}{}", self.save_path, SESSION_FILE_PREFIX, id))
    }

    fn current_path(&self) -> Result<PathBuf, Error> {
        match (&self.state, &self.id) {
            (State::Started, Some(id)) => Ok(self.file_path(id)),
            _ => Err(SessionError::NotInitialized.into()),
        }
    }

    /// Starts the session, loading it from disk if `cookies` carries the id of an existing one
    /// and creating a new one otherwise. Must be called before any response header is closed,
    /// since a new session has to send its cookie.
    pub fn start<W: Write>(
        &mut self,
        cookies: &FormVars,
        output: &mut Output<W>,
    ) -> Result<(), Error> {
        if self.state == State::Started {
            return Err(SessionError::AlreadyStarted.into());
        }

        if output.headers_sent() {
            return Err(SessionError::HeadersSent.into());
        }

        let Some(id) = cookies.get(&self.cookie_name) else {
            return self.create(output);
        };

        if !is_valid_id(id) {
            log::warn!(
                "session cookie {} holds a malformed id, creating a new session",
                self.cookie_name
            );

            return self.create(output);
        }

        // Validated above, the id is plain ASCII
        let id = String::from_utf8_lossy(id).into_owned();
        let path = self.file_path(&id);

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("session cookie exists but its file does not, a new one was created");

                return self.create(output);
            }
            Err(e) => return Err(SessionError::OpenFile(e).into()),
        };

        let mut contents = Vec::new();

        file.read_to_end(&mut contents)
            .map_err(SessionError::OpenFile)?;

        let line = contents
            .split(|&b| b == b'\n')
            .next()
            .unwrap_or_default();

        let mut vars = FormVars::new();

        parse_into(&mut vars, line, b'=', b';')?;

        log::debug!("loaded session {id} with {} variables", vars.len());

        self.stale_file = line.len() != contents.len() || (vars.is_empty() && !line.is_empty());

        if self.stale_file {
            log::warn!("session file for {id} has content that will be dropped on the next write");
        }

        self.vars = vars;
        self.id = Some(id);
        self.state = State::Started;

        Ok(())
    }

    fn create<W: Write>(&mut self, output: &mut Output<W>) -> Result<(), Error> {
        let id = generate_id();
        let path = self.file_path(&id);

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;

            options.mode(0o600);
        }

        options.open(&path).map_err(SessionError::CreateFile)?;

        output.add_cookie(&Cookie::new(self.cookie_name.as_str(), id.as_str()))?;

        log::debug!("created session file {}", path.display());

        self.vars.clear();
        self.stale_file = false;
        self.id = Some(id);
        self.state = State::Started;

        Ok(())
    }

    /// Value of a session variable. Empty values read as `None`.
    pub fn var(&self, name: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.vars.get(name)
    }

    pub fn var_str(&self, name: impl AsRef<[u8]>) -> Option<&str> {
        self.vars.get_str(name)
    }

    /// Whether a variable named `name` is registered, ignoring case
    pub fn exists(&self, name: impl AsRef<[u8]>) -> bool {
        self.vars.contains(name)
    }

    /// Registers a new variable and appends it to the session file. Fails if it already exists,
    /// leaving the stored value alone.
    ///
    /// Names must be non-empty and free of `=`, `;` and control characters.
    pub fn register(&mut self, name: &str, value: impl AsRef<[u8]>) -> Result<(), Error> {
        let path = self.current_path()?;

        if !is_valid_name(name) {
            return Err(SessionError::InvalidName.into());
        }

        if self.exists(name) {
            return Err(SessionError::VarRegistered.into());
        }

        let value = value.as_ref();

        self.vars.try_reserve(1)?;

        if self.stale_file {
            self.vars
                .push_entry(Entry::from_parts(name.as_bytes().to_vec(), value.to_vec()));

            return self.rewrite(&path);
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(SessionError::OpenFile)?;

        let record = if self.vars.is_empty() {
            format!("{}={}", name, encode(value))
        } else {
            format!(";{}={}", name, encode(value))
        };

        file.write_all(record.as_bytes())
            .map_err(SessionError::OpenFile)?;

        self.vars
            .push_entry(Entry::from_parts(name.as_bytes().to_vec(), value.to_vec()));

        Ok(())
    }

    /// Changes the value of a registered variable and rewrites the session file.
    pub fn alter(&mut self, name: &str, value: impl AsRef<[u8]>) -> Result<(), Error> {
        let path = self.current_path()?;

        let Some(entry) = self.vars.get_mut(name) else {
            return Err(SessionError::VarNotRegistered.into());
        };

        entry.set_value(value.as_ref());

        self.rewrite(&path)
    }

    /// Removes a variable and rewrites the session file.
    pub fn unregister(&mut self, name: &str) -> Result<(), Error> {
        let path = self.current_path()?;

        if self.vars.remove(name).is_none() {
            return Err(SessionError::RemoveFromList.into());
        }

        self.rewrite(&path)
    }

    fn rewrite(&mut self, path: &Path) -> Result<(), Error> {
        let mut buf = Vec::new();

        for (i, entry) in self.vars.iter().enumerate() {
            if i > 0 {
                buf.push(b';');
            }

            buf.extend_from_slice(entry.name());
            buf.push(b'=');
            buf.extend_from_slice(encode(entry.value()).as_bytes());
        }

        fs::write(path, buf).map_err(SessionError::OpenFile)?;

        self.stale_file = false;

        Ok(())
    }

    /// Deletes the session file and forgets every variable. The id cookie is cleared too if
    /// headers can still be sent.
    pub fn destroy<W: Write>(&mut self, output: &mut Output<W>) -> Result<(), Error> {
        let path = self.current_path()?;

        fs::remove_file(&path).map_err(SessionError::Destroy)?;

        self.vars.clear();
        self.stale_file = false;
        self.id = None;
        self.state = State::Uninitialized;

        if output.headers_sent() {
            log::warn!("headers already sent, the session cookie could not be removed");
        } else {
            output.add_cookie(&Cookie::removal(self.cookie_name.as_str()))?;
        }

        Ok(())
    }

    /// Drops the in-memory variables without touching the file.
    pub(crate) fn clear(&mut self) {
        self.vars.clear();
        self.stale_file = self.state == State::Started;
    }
}
