// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

#![warn(missing_docs)]

//! This is Sekris
//!
//! The attribute policy and compliance engine of a PKCS#11 style
//! software token. It builds complete, defaulted attribute lists from
//! client supplied templates and runs the cross checks that gate every
//! secret-creation and secret-use workflow: template against class
//! rules, candidate against token/session state, candidate against the
//! requested mechanism and processing step, and candidate against the
//! parent object it derives from.
//!
//! The engine performs no cryptography, owns no storage and carries no
//! wire protocol; it operates on borrowed attribute lists for the
//! duration of one request.

pub mod pkcs11;

pub mod attribute;
pub mod config;
pub mod error;
pub mod mechanism;
pub mod object;
pub mod policy;
pub mod session;

mod log;
mod misc;

pub use attribute::{parse_template, AttrType, Attribute};
pub use error::{Error, ErrorKind, Result};
pub use crate::log::sekris_log_init;
pub use mechanism::{
    check_mechanism_against_processing, check_pkcs11_mechanism_flags,
    mechanisms, ProcessingFunc, ProcessingStep,
};
pub use object::factory::{
    copy_object, create_attributes_from_template, modify_object,
    object_factories, CreationCase,
};
pub use object::key::key_size_bounds;
pub use object::Object;
pub use policy::{
    add_missing_attribute_id, attribute_is_exportable,
    check_access_attrs_against_token, check_created_attrs,
    check_created_attrs_against_parent_key,
    check_created_attrs_against_processing,
    check_created_attrs_against_token, check_object_destroyable,
    check_parent_attrs_against_processing, object_is_private,
};
pub use session::Session;

#[cfg(test)]
mod tests;
