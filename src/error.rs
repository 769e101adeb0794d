// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Error handling for the compliance engine. All policy failures carry a
//! PKCS#11 style `CK_RV` code so callers can report them to clients
//! verbatim; nested errors preserve the originating failure for tracing.

use std::error;
use std::fmt;

use crate::pkcs11::{CKR_GENERAL_ERROR, CK_RV};

/// The Result type used through the crate
pub type Result<T> = std::result::Result<T, Error>;

/// The Error type used through the crate
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    origin: Option<Box<dyn error::Error>>,
    errmsg: Option<String>,
    ckrv: CK_RV,
}

/// Coarse discriminant for [Error]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A Cryptoki-style error, see the ckrv Error field
    CkError,
    /// The attribute was not found, see errmsg
    AttributeNotFound,
    /// Other error, see origin
    Nested,
}

impl Error {
    /// Creates an error from a CK_RV code
    pub fn ck_rv(ckrv: CK_RV) -> Error {
        Error {
            kind: ErrorKind::CkError,
            origin: None,
            errmsg: None,
            ckrv: ckrv,
        }
    }

    /// Creates an error from a CK_RV code, preserving the underlying
    /// error that caused the failure
    pub fn ck_rv_from_error<E>(ckrv: CK_RV, error: E) -> Error
    where
        E: Into<Box<dyn error::Error>>,
    {
        Error {
            kind: ErrorKind::CkError,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: ckrv,
        }
    }

    /// Creates an error from a CK_RV code with an additional message
    pub fn ck_rv_with_errmsg(ckrv: CK_RV, errmsg: String) -> Error {
        Error {
            kind: ErrorKind::CkError,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: ckrv,
        }
    }

    /// Creates an attribute-not-found error
    pub fn not_found(errmsg: String) -> Error {
        Error {
            kind: ErrorKind::AttributeNotFound,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: CKR_GENERAL_ERROR,
        }
    }

    /// Wraps any other error type
    pub fn other_error<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error>>,
    {
        Error {
            kind: ErrorKind::Nested,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: CKR_GENERAL_ERROR,
        }
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error marks a missing attribute
    pub fn attr_not_found(&self) -> bool {
        self.kind == ErrorKind::AttributeNotFound
    }

    /// Returns the CK_RV code associated with the error
    pub fn rv(&self) -> CK_RV {
        self.ckrv
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::CkError => {
                if let Some(ref e) = self.errmsg {
                    write!(f, "{}", e)
                } else {
                    write!(f, "CK_RV(0x{:08x})", self.ckrv)
                }
            }
            ErrorKind::AttributeNotFound => write!(
                f,
                "attribute not found: {}",
                self.errmsg.as_deref().unwrap_or("")
            ),
            ErrorKind::Nested => match self.origin {
                Some(ref e) => e.fmt(f),
                None => write!(f, "nested error"),
            },
        }
    }
}

impl From<CK_RV> for Error {
    fn from(ckrv: CK_RV) -> Error {
        Error::ck_rv(ckrv)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::other_error(error)
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(error: std::num::TryFromIntError) -> Error {
        Error::other_error(error)
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(error: std::array::TryFromSliceError) -> Error {
        Error::other_error(error)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(error: std::convert::Infallible) -> Error {
        Error::other_error(error)
    }
}
