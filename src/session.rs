// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Session state handling. A [Session] carries the point-in-time
//! authentication and read/write state the compliance checks are
//! evaluated against, plus the active processing context consumed by
//! the multi-part step state machine. Callers serialize concurrent
//! requests against the same session before entering any check.

use crate::error::Result;
use crate::mechanism::ProcessingContext;
use crate::pkcs11::vendor::SKR_UNSPEC;
use crate::pkcs11::*;

/// A token session with its authentication state
#[derive(Debug)]
pub struct Session {
    state: CK_STATE,
    flags: CK_FLAGS,
    processing: Option<ProcessingContext>,
}

impl Session {
    /// Creates a new session for the given user type.
    ///
    /// A user type of SKR_UNSPEC creates a public session; SO sessions
    /// must be read/write.
    pub fn new(user_type: CK_USER_TYPE, flags: CK_FLAGS) -> Result<Session> {
        if flags & CKF_SERIAL_SESSION != CKF_SERIAL_SESSION {
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let rw = flags & CKF_RW_SESSION == CKF_RW_SESSION;

        Ok(Session {
            state: match user_type {
                SKR_UNSPEC => {
                    if rw {
                        CKS_RW_PUBLIC_SESSION
                    } else {
                        CKS_RO_PUBLIC_SESSION
                    }
                }
                CKU_USER => {
                    if rw {
                        CKS_RW_USER_FUNCTIONS
                    } else {
                        CKS_RO_USER_FUNCTIONS
                    }
                }
                CKU_SO => {
                    if rw {
                        CKS_RW_SO_FUNCTIONS
                    } else {
                        return Err(CKR_SESSION_READ_ONLY)?;
                    }
                }
                _ => return Err(CKR_USER_TYPE_INVALID)?,
            },
            flags: flags,
            processing: None,
        })
    }

    /// Returns the session state
    pub fn get_state(&self) -> CK_STATE {
        self.state
    }

    /// Returns the session flags
    pub fn get_flags(&self) -> CK_FLAGS {
        self.flags
    }

    /// Applies a login state change to the session.
    ///
    /// A user type of SKR_UNSPEC effects a "logout" to public.
    pub fn change_session_state(&mut self, user_type: CK_USER_TYPE) -> CK_RV {
        match self.state {
            CKS_RO_PUBLIC_SESSION => match user_type {
                SKR_UNSPEC => CKR_OK,
                CKU_USER => {
                    self.state = CKS_RO_USER_FUNCTIONS;
                    CKR_OK
                }
                CKU_SO => CKR_SESSION_READ_ONLY,
                _ => CKR_USER_TYPE_INVALID,
            },
            CKS_RW_PUBLIC_SESSION => match user_type {
                SKR_UNSPEC => CKR_OK,
                CKU_USER => {
                    self.state = CKS_RW_USER_FUNCTIONS;
                    CKR_OK
                }
                CKU_SO => {
                    self.state = CKS_RW_SO_FUNCTIONS;
                    CKR_OK
                }
                _ => CKR_USER_TYPE_INVALID,
            },
            CKS_RO_USER_FUNCTIONS => match user_type {
                SKR_UNSPEC => {
                    self.state = CKS_RO_PUBLIC_SESSION;
                    CKR_OK
                }
                CKU_USER => CKR_OK,
                CKU_SO => CKR_USER_ANOTHER_ALREADY_LOGGED_IN,
                _ => CKR_USER_TYPE_INVALID,
            },
            CKS_RW_USER_FUNCTIONS => match user_type {
                SKR_UNSPEC => {
                    self.state = CKS_RW_PUBLIC_SESSION;
                    CKR_OK
                }
                CKU_USER => CKR_OK,
                CKU_SO => CKR_USER_ANOTHER_ALREADY_LOGGED_IN,
                _ => CKR_USER_TYPE_INVALID,
            },
            CKS_RW_SO_FUNCTIONS => match user_type {
                SKR_UNSPEC => {
                    self.state = CKS_RW_PUBLIC_SESSION;
                    CKR_OK
                }
                CKU_USER => CKR_USER_ANOTHER_ALREADY_LOGGED_IN,
                CKU_SO => CKR_OK,
                _ => CKR_USER_TYPE_INVALID,
            },
            _ => CKR_GENERAL_ERROR,
        }
    }

    /// Returns whether the session allows writing to token objects
    pub fn is_writable(&self) -> bool {
        match self.state {
            CKS_RW_PUBLIC_SESSION => true,
            CKS_RW_USER_FUNCTIONS => true,
            CKS_RW_SO_FUNCTIONS => true,
            _ => false,
        }
    }

    /// Returns whether the given user type is authenticated on this
    /// session. SKR_UNSPEC matches any authenticated user.
    pub fn is_logged_in(&self, user_type: CK_USER_TYPE) -> bool {
        match user_type {
            CKU_SO => self.state == CKS_RW_SO_FUNCTIONS,
            CKU_USER => {
                self.state == CKS_RO_USER_FUNCTIONS
                    || self.state == CKS_RW_USER_FUNCTIONS
            }
            SKR_UNSPEC => match self.state {
                CKS_RO_USER_FUNCTIONS | CKS_RW_USER_FUNCTIONS
                | CKS_RW_SO_FUNCTIONS => true,
                _ => false,
            },
            _ => false,
        }
    }

    /// Returns the active processing context, if any
    pub fn processing(&self) -> Option<&ProcessingContext> {
        self.processing.as_ref()
    }

    /// Returns a mutable reference to the active processing context
    pub(crate) fn processing_mut(&mut self) -> Option<&mut ProcessingContext> {
        self.processing.as_mut()
    }

    /// Installs a new processing context
    pub(crate) fn set_processing(&mut self, ctx: ProcessingContext) {
        self.processing = Some(ctx);
    }

    /// Clears the processing context on terminal steps
    pub(crate) fn clear_processing(&mut self) {
        self.processing = None;
    }
}
