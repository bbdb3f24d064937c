use std::fmt::{self, Display, Formatter};

use failure::{Backtrace, Context, Fail};

/// What a store operation was doing when it failed.
#[derive(Clone, Debug, Eq, PartialEq, Fail)]
pub enum ErrorKind {
    #[fail(display = "Failed to initialize store: {}", _0)]
    StoreInit(String),
    #[fail(display = "Failed to open store: {}", _0)]
    Open(String),
    #[fail(display = "Failed to query store: {}", _0)]
    Query(String),
    #[fail(display = "Failed to decode package row: {}", _0)]
    RowDecode(String),
    #[fail(display = "Failed to write to store: {}", _0)]
    Write(String),
}

/// Error returned by every public store operation.
///
/// The kind names the operation, the cause (if any) is the engine's own error.
#[derive(Debug)]
pub struct StoreError {
    inner: Context<ErrorKind>,
}

impl StoreError {
    pub fn kind(&self) -> &ErrorKind {
        self.inner.get_context()
    }
}

impl Fail for StoreError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.inner)?;
        for cause in (&self.inner as &dyn Fail).iter_causes() {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for StoreError {
    fn from(kind: ErrorKind) -> StoreError {
        StoreError { inner: Context::new(kind) }
    }
}

impl From<Context<ErrorKind>> for StoreError {
    fn from(inner: Context<ErrorKind>) -> StoreError {
        StoreError { inner }
    }
}
