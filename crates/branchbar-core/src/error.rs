use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Command(message.into()))
    }

    pub fn invalid_ref_name(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRefName(name.into()))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io(kind) => write!(f, "io error: {kind}"),
            ErrorKind::NotARepository => write!(f, "not a git repository"),
            ErrorKind::InvalidRefName(name) => write!(f, "invalid branch name: {name:?}"),
            ErrorKind::Command(message) => write!(f, "{message}"),
            ErrorKind::Timeout(secs) => write!(f, "git command timed out after {secs}s"),
            ErrorKind::Unsupported(what) => write!(f, "{what}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(e.kind()))
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    Io(std::io::ErrorKind),
    NotARepository,
    /// Branch name rejected by lexical validation, before any external call.
    InvalidRefName(String),
    /// A git invocation exited nonzero; carries the captured diagnostic text.
    Command(String),
    /// A git invocation exceeded the wall-clock bound and was killed.
    Timeout(u64),
    Unsupported(&'static str),
}
