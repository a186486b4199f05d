//! Utilities for error handling

use std::{
    backtrace::{Backtrace, BacktraceStatus},
    fmt::Display,
};

use downcast_rs::{impl_downcast, DowncastSync};
use thiserror::Error;

/// The kinds of errors we have during rewriting.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inconsistent or invalid argument(s) passed to a library function.
    #[error("invalid argument")]
    InvalidArgument,
    /// The IR was found to be inconsistent or invalid during verification
    #[error("verification failed")]
    VerificationFailed,
    /// A rewrite pattern or a caller broke an invariant of the rewrite engine.
    #[error("rewrite contract violated")]
    ContractViolation,
}

/// An error object that can hold any [std::error::Error].
#[derive(Debug)]
pub struct Error {
    /// The kind of error this is
    pub kind: ErrorKind,
    /// The actual error object describing the error
    pub err: Box<dyn ErrorObj>,
    /// Details of how this error occurred
    pub backtrace: Backtrace,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rewrite error: {}.\n{}", self.kind, self.err)?;
        if self.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\nError backtrace:\n{}", self.backtrace)?;
        }
        Ok(())
    }
}

/// Any error that can be boxed into an [struct@Error] and later be downcast.
pub trait ErrorObj: std::error::Error + DowncastSync {}

impl<T: std::error::Error + Send + Sync + 'static> ErrorObj for T {}

impl_downcast!(ErrorObj);

impl std::error::Error for Error {}

/// Type alias for [std::result::Result] with the error type set to [struct@Error]
pub type Result<T> = std::result::Result<T, Error>;

#[doc(hidden)]
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

/// Specify [ErrorKind] and create [struct@Error] from any [std::error::Error] object.
/// To create [Result], use [create_err!](crate::create_err) instead.
/// The macro also accepts [format!] like arguments to create one-off errors.
#[macro_export]
macro_rules! create_error {
    ($kind: expr, $str: literal $($t:tt)*) => {
        $crate::create_error!($kind, $crate::result::StringError(format!($str $($t)*)))
    };
    ($kind: expr, $err: expr) => {
        $crate::result::Error {
            kind: $kind,
            err: Box::new($err),
            backtrace: std::backtrace::Backtrace::capture(),
        }
    };
}

/// Specify [ErrorKind] and create [Result] from any [std::error::Error] object.
/// To create [struct@Error], use [create_error!](crate::create_error) instead.
#[macro_export]
macro_rules! create_err {
    ($kind: expr, $($t:tt)*) => {
        Err($crate::create_error!($kind, $($t)*))
    };
}

/// Create [ErrorKind::VerificationFailed] [struct@Error] from any [std::error::Error] object.
/// ```rust
/// use thiserror::Error;
/// use ssa_rewrite::{verify_error, result::{ErrorKind, Error}};
///
/// #[derive(Error, Debug)]
/// #[error("sample error")]
/// pub struct SampleErr;
///
/// assert!(
///     matches!(
///         verify_error!(SampleErr),
///         Error {
///            kind: ErrorKind::VerificationFailed,
///            err,
///            ..
///         } if err.is::<SampleErr>()
/// ));
///
/// let res_msg: Error = verify_error!("Some formatted {}", 0);
/// assert_eq!(res_msg.err.to_string(), "Some formatted 0");
/// ```
#[macro_export]
macro_rules! verify_error {
    ($($t:tt)*) => {
        $crate::create_error!($crate::result::ErrorKind::VerificationFailed, $($t)*)
    }
}

/// Create [ErrorKind::VerificationFailed] [Result] from any [std::error::Error] object.
#[macro_export]
macro_rules! verify_err {
    ($($t:tt)*) => {
        $crate::create_err!($crate::result::ErrorKind::VerificationFailed, $($t)*)
    }
}

/// Create [ErrorKind::InvalidArgument] [struct@Error] from any [std::error::Error] object.
#[macro_export]
macro_rules! arg_error {
    ($($t:tt)*) => {
        $crate::create_error!($crate::result::ErrorKind::InvalidArgument, $($t)*)
    }
}

/// Create [ErrorKind::InvalidArgument] [Result] from any [std::error::Error] object.
#[macro_export]
macro_rules! arg_err {
    ($($t:tt)*) => {
        $crate::create_err!($crate::result::ErrorKind::InvalidArgument, $($t)*)
    }
}

/// Create [ErrorKind::ContractViolation] [struct@Error] from any [std::error::Error] object.
#[macro_export]
macro_rules! contract_error {
    ($($t:tt)*) => {
        $crate::create_error!($crate::result::ErrorKind::ContractViolation, $($t)*)
    }
}

/// Create [ErrorKind::ContractViolation] [Result] from any [std::error::Error] object.
/// ```rust
/// use ssa_rewrite::{contract_err, result::{Result, ErrorKind}};
///
/// let res: Result<()> = contract_err!("{} results expected", 2);
/// let err = res.unwrap_err();
/// assert_eq!(err.kind, ErrorKind::ContractViolation);
/// assert_eq!(err.err.to_string(), "2 results expected");
/// ```
#[macro_export]
macro_rules! contract_err {
    ($($t:tt)*) => {
        $crate::create_err!($crate::result::ErrorKind::ContractViolation, $($t)*)
    }
}
