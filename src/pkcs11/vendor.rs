// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! PKCS#11 API Vendor extensions

use crate::pkcs11::*;

pub const SKR_VENDOR_OFFSET: CK_ULONG = CKA_VENDOR_DEFINED + 90221;

/* Errors */
/// Returned when the deployment policy configuration is malformed
pub const SKR_CONFIG_ERROR: CK_ULONG = SKR_VENDOR_OFFSET + 1;

/// Marker for "no user type specified" in session state queries
pub const SKR_UNSPEC: CK_ULONG = CK_UNAVAILABLE_INFORMATION;
