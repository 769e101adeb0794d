// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! The fixed PKCS#11 style identifier vocabulary used by the compliance
//! engine: type aliases, object classes, attribute ids, key types,
//! mechanism ids, capability flags, session states and return values.
//!
//! The engine owns no FFI surface, so the vocabulary is written out by
//! hand instead of being generated from the Cryptoki headers. Values
//! match the published PKCS#11 v3.1 assignments.

mod interface;
pub use interface::*;

pub mod vendor;
