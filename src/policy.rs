// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! The compliance checks gating every secret-creation and secret-use
//! workflow: candidate attributes against token/session state, against
//! the requested processing function, against the parent object, and
//! the privacy/exportability predicates. Each check is a bounded,
//! read-only computation; failures abort the request and are reported
//! to the caller verbatim.

use crate::attribute::Attribute;
use crate::error::Result;
use crate::mechanism::{mechanisms, ProcessingFunc};
use crate::object::factory::{object_factories, OAFlags};
use crate::object::key::key_size_bounds;
use crate::object::Object;
use crate::pkcs11::vendor::SKR_UNSPEC;
use crate::pkcs11::*;
use crate::session::Session;

use log::debug;

/// Verifies that a new object's attributes are satisfiable by the
/// current session and token state: private objects need an
/// authenticated session, token objects need a read/write session and
/// the trusted mark can only be applied by the security officer.
pub fn check_created_attrs_against_token(
    session: &Session,
    obj: &Object,
) -> Result<()> {
    if obj.is_trusted() && !session.is_logged_in(CKU_SO) {
        debug!("CKA_TRUSTED requires an SO session");
        return Err(CKR_ATTRIBUTE_READ_ONLY)?;
    }
    if obj.is_private() && !session.is_logged_in(SKR_UNSPEC) {
        debug!("private object creation requires authentication");
        return Err(CKR_USER_NOT_LOGGED_IN)?;
    }
    if obj.is_token() && !session.is_writable() {
        debug!("token object creation requires a r/w session");
        return Err(CKR_SESSION_READ_ONLY)?;
    }
    Ok(())
}

/// Verifies that an existing object may be accessed in the current
/// session state. Covers the case where the authentication state
/// changed between creation and use.
pub fn check_access_attrs_against_token(
    session: &Session,
    obj: &Object,
) -> Result<()> {
    if obj.is_private() && !session.is_logged_in(SKR_UNSPEC) {
        debug!("private object access requires authentication");
        return Err(CKR_USER_NOT_LOGGED_IN)?;
    }
    Ok(())
}

/// Validates that a newly created object's attributes are consistent
/// with the processing function it is being created for.
pub fn check_created_attrs_against_processing(
    function: ProcessingFunc,
    obj: &Object,
) -> Result<()> {
    let class = obj.get_class();
    match function {
        ProcessingFunc::Generate => {
            if class != CKO_SECRET_KEY {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
            /* the value is produced later by the token */
            if obj.get_attr(CKA_VALUE).is_some() {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
            if !obj.is_local() {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        ProcessingFunc::GeneratePair => {
            if class != CKO_PUBLIC_KEY && class != CKO_PRIVATE_KEY {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
            if !obj.is_local() {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        ProcessingFunc::Import => {
            match class {
                CKO_DATA | CKO_CERTIFICATE | CKO_SECRET_KEY
                | CKO_PUBLIC_KEY | CKO_PRIVATE_KEY => (),
                _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
            }
            /* imported material existed in the clear outside the token */
            if obj.is_local()
                || obj.is_always_sensitive()
                || obj.is_never_extractable()
            {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        ProcessingFunc::Derive => {
            if class != CKO_SECRET_KEY {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
            if obj.is_local() {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        ProcessingFunc::Unwrap => {
            if class != CKO_SECRET_KEY && class != CKO_PRIVATE_KEY {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
            if obj.is_local()
                || obj.is_always_sensitive()
                || obj.is_never_extractable()
            {
                return Err(CKR_TEMPLATE_INCONSISTENT)?;
            }
        }
        _ => return Err(CKR_GENERAL_ERROR)?,
    }
    Ok(())
}

/// Validates that a parent object is authorized for the requested role
/// and can operate under the requested mechanism: the matching usage
/// attribute must be true, the mechanism must accept the parent's key
/// type and size, and the parent's allowed-mechanisms restriction, when
/// present, must list the mechanism.
pub fn check_parent_attrs_against_processing(
    mechanism_type: CK_MECHANISM_TYPE,
    function: ProcessingFunc,
    parent: &Object,
) -> Result<()> {
    let usage = match function.parent_usage_attr() {
        Some(u) => u,
        None => return Err(CKR_GENERAL_ERROR)?,
    };
    if !parent.get_attr_as_bool(usage).unwrap_or(false) {
        debug!("parent key not authorized for {:?}", function);
        return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
    }

    let entry = mechanisms().get(mechanism_type)?;

    if !entry.key_types().is_empty() {
        let kt = match parent.get_attr_as_ulong(CKA_KEY_TYPE) {
            Ok(kt) => kt,
            Err(_) => return Err(CKR_KEY_TYPE_INCONSISTENT)?,
        };
        if !entry.key_types().contains(&kt) {
            debug!(
                "key type {} not usable with mechanism 0x{:x}",
                kt, mechanism_type
            );
            return Err(CKR_KEY_TYPE_INCONSISTENT)?;
        }
    }

    if let Some(attr) = parent.get_attr(CKA_ALLOWED_MECHANISMS) {
        let allowed = attr.to_ulong_array()?;
        if !allowed.is_empty() && !allowed.contains(&mechanism_type) {
            debug!(
                "mechanism 0x{:x} not in the key allowed list",
                mechanism_type
            );
            return Err(CKR_MECHANISM_INVALID)?;
        }
    }

    if let Ok(size) = parent.key_size() {
        let (min, max) = entry.key_size_range();
        if max != 0 && (size < min || size > max) {
            return Err(CKR_KEY_SIZE_RANGE)?;
        }
    }

    Ok(())
}

/// Validates the inheritance-sensitive attributes of a new object
/// against the parent it was derived or unwrapped from.
pub fn check_created_attrs_against_parent_key(
    function: ProcessingFunc,
    parent: &Object,
    obj: &Object,
) -> Result<()> {
    match function {
        ProcessingFunc::Derive => {
            match parent.get_class() {
                CKO_SECRET_KEY | CKO_PRIVATE_KEY => (),
                _ => return Err(CKR_KEY_TYPE_INCONSISTENT)?,
            }
            if obj.get_class() != CKO_SECRET_KEY {
                return Err(CKR_KEY_TYPE_INCONSISTENT)?;
            }
        }
        ProcessingFunc::Unwrap => {
            match parent.get_class() {
                CKO_SECRET_KEY | CKO_PRIVATE_KEY => (),
                _ => return Err(CKR_KEY_TYPE_INCONSISTENT)?,
            }
            match obj.get_class() {
                CKO_SECRET_KEY | CKO_PRIVATE_KEY => (),
                _ => return Err(CKR_KEY_TYPE_INCONSISTENT)?,
            }
        }
        _ => return Err(CKR_GENERAL_ERROR)?,
    }

    /* a candidate cannot claim an unbroken lineage the parent broke */
    if obj.is_always_sensitive() && !parent.is_always_sensitive() {
        return Err(CKR_TEMPLATE_INCONSISTENT)?;
    }
    if obj.is_never_extractable() && !parent.is_never_extractable() {
        return Err(CKR_TEMPLATE_INCONSISTENT)?;
    }

    /* the new key size must sit inside the policy bounds of its type */
    if let Ok(size) = obj.key_size() {
        if let Ok(kt) = obj.get_attr_as_ulong(CKA_KEY_TYPE) {
            let (min, max) = key_size_bounds(kt, false)?;
            if size < min || size > max {
                return Err(CKR_KEY_SIZE_RANGE)?;
            }
        }
    }

    Ok(())
}

/// Symmetric compatibility check between two keys that interact
/// directly, such as a wrapping key and the key being wrapped or
/// unwrapped. Neither role may conflict with the other's restrictions.
pub fn check_created_attrs(key1: &Object, key2: &Object) -> Result<()> {
    for (wrapper, wrapped) in [(key1, key2), (key2, key1)] {
        let wraps = wrapper.get_attr_as_bool(CKA_WRAP).unwrap_or(false)
            || wrapper.get_attr_as_bool(CKA_UNWRAP).unwrap_or(false);
        if !wraps {
            continue;
        }
        if !wrapped.is_extractable() {
            debug!("key material is not extractable");
            return Err(CKR_KEY_UNEXTRACTABLE)?;
        }
        if wrapped.is_wrap_with_trusted() && !wrapper.is_trusted() {
            debug!("key requires a trusted wrapping key");
            return Err(CKR_KEY_NOT_WRAPPABLE)?;
        }
    }
    Ok(())
}

/// Returns whether the object requires authentication to be accessed
pub fn object_is_private(obj: &Object) -> bool {
    obj.is_private()
}

/// Decides whether a specific attribute's value may be disclosed to the
/// caller. Fails closed: attributes unknown to the object's class table
/// are never exportable, and sensitive attributes of sensitive or
/// non-extractable objects always report non-exportable regardless of
/// the caller's privilege.
pub fn attribute_is_exportable(
    req_attr: CK_ATTRIBUTE_TYPE,
    obj: &Object,
) -> bool {
    let factory = match object_factories().get_object_factory(obj) {
        Ok(f) => f,
        Err(_) => return false,
    };
    let attrs = factory.get_data().get_attributes();
    match attrs.iter().find(|a| a.get_type() == req_attr) {
        Some(oa) => {
            if oa.is(OAFlags::Sensitive) {
                !(obj.is_sensitive() || !obj.is_extractable())
            } else {
                true
            }
        }
        None => false,
    }
}

/// Verifies the object may be destroyed
pub fn check_object_destroyable(obj: &Object) -> Result<()> {
    if !obj.is_destroyable() {
        return Err(CKR_ACTION_PROHIBITED)?;
    }
    Ok(())
}

/// If the id attribute is present in exactly one of two related lists
/// (such as the halves of a key pair generated together) copies it into
/// the other so both carry a consistent identifier. A no-op when both
/// or neither carry one; both present and different is an error.
pub fn add_missing_attribute_id(
    attrs1: &mut Object,
    attrs2: &mut Object,
) -> Result<()> {
    let id1 = attrs1.get_attr(CKA_ID).map(|a| a.get_value().clone());
    let id2 = attrs2.get_attr(CKA_ID).map(|a| a.get_value().clone());
    match (id1, id2) {
        (Some(a), Some(b)) => {
            if a == b {
                Ok(())
            } else {
                Err(CKR_TEMPLATE_INCONSISTENT)?
            }
        }
        (Some(a), None) => attrs2.set_attr(Attribute::from_bytes(CKA_ID, a)),
        (None, Some(b)) => attrs1.set_attr(Attribute::from_bytes(CKA_ID, b)),
        (None, None) => Ok(()),
    }
}
