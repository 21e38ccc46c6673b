use crate::response::{IntoResponse, RawResponse};

/// How bad a failure is for the calling program.
///
/// The library never terminates the process itself, the caller decides what to do with a
/// `Fatal` or `OutOfMemory` failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Fatal,
    OutOfMemory,
}

/// Failures of the session store.
#[derive(Debug)]
pub enum SessionError {
    NotInitialized,
    HeadersSent,
    AlreadyStarted,

    CreateFile(std::io::Error),
    Destroy(std::io::Error),
    OpenFile(std::io::Error),

    RemoveFromList,
    VarRegistered,
    VarNotRegistered,

    /// Names must be non-empty and free of the record separators `=` and `;`.
    InvalidName,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotInitialized => write!(f, "Session not initialized"),
            SessionError::HeadersSent => write!(f, "Headers already been sent"),
            SessionError::AlreadyStarted => write!(f, "Session already started"),

            SessionError::CreateFile(e) => write!(f, "Failed to create session file: {e}"),
            SessionError::Destroy(e) => write!(f, "Failed to destroy the session: {e}"),
            SessionError::OpenFile(e) => {
                write!(f, "Failed to open session file for manipulation: {e}")
            }

            SessionError::RemoveFromList => write!(f, "Failed to remove session value from list"),
            SessionError::VarRegistered => write!(f, "Session variable already registered"),
            SessionError::VarNotRegistered => write!(f, "Session variable not registered"),

            SessionError::InvalidName => write!(f, "Invalid session variable name"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::CreateFile(e) | SessionError::Destroy(e) | SessionError::OpenFile(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Session(SessionError),

    Io(std::io::Error),

    OutOfMemory,

    /// Response headers were already closed, nothing more can be added to them.
    HeadersSent,

    InvalidHeader,
}

impl Error {
    pub fn severity(&self) -> Severity {
        match self {
            Error::OutOfMemory => Severity::OutOfMemory,
            Error::Io(_) => Severity::Fatal,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Session(e) => write!(f, "{e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::HeadersSent => write!(f, "Headers already sent"),
            Error::InvalidHeader => write!(f, "Invalid header"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Session(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SessionError> for Error {
    fn from(value: SessionError) -> Self {
        Error::Session(value)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

impl IntoResponse for Error {
    fn response(self) -> RawResponse {
        match self {
            Error::Session(SessionError::NotInitialized) => 401u16,
            Error::Session(SessionError::VarNotRegistered) => 404u16,
            Error::Session(SessionError::VarRegistered) => 409u16,
            Error::Session(SessionError::InvalidName) => 400u16,
            Error::InvalidHeader => 400u16,

            Error::Session(_) => 500u16,
            Error::Io(_) => 500u16,
            Error::OutOfMemory => 500u16,
            Error::HeadersSent => 500u16,
        }
        .response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_kind() {
        assert_eq!(Error::OutOfMemory.severity(), Severity::OutOfMemory);
        assert_eq!(
            Error::from(SessionError::VarRegistered).severity(),
            Severity::Warning
        );
        assert_eq!(
            Error::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn maps_to_status() {
        let res = Error::from(SessionError::VarNotRegistered).response();

        assert_eq!(res.status(), 404);

        let res = Error::OutOfMemory.response();

        assert_eq!(res.status(), 500);
    }
}
