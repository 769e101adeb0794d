// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Workflow level tests exercising the documented creation and
//! processing check sequences end to end.

use super::*;
use crate::attribute::tests::{wire_attr, wire_bool, wire_num};
use crate::pkcs11::vendor::SKR_UNSPEC;
use crate::pkcs11::*;

fn ul(v: CK_ULONG) -> u64 {
    u64::try_from(v).unwrap()
}

fn user_session() -> Session {
    Session::new(CKU_USER, CKF_SERIAL_SESSION | CKF_RW_SESSION).unwrap()
}

fn secret_key_template(ktype: CK_KEY_TYPE) -> Vec<u8> {
    let mut t = Vec::new();
    t.extend(wire_num(CKA_CLASS, ul(CKO_SECRET_KEY)));
    t.extend(wire_num(CKA_KEY_TYPE, ul(ktype)));
    t
}

fn import_aes_key(extra: &[u8]) -> Object {
    let value = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_attr(CKA_VALUE, &value));
    t.extend_from_slice(extra);
    create_attributes_from_template(
        &t,
        CK_UNAVAILABLE_INFORMATION,
        CreationCase::FromClearData,
    )
    .unwrap()
}

#[test]
fn import_aes_key_fills_defaults() {
    /* template {class=secret-key, type=AES, value=<16 bytes>} */
    let obj = import_aes_key(&[]);

    assert_eq!(obj.get_class(), CKO_SECRET_KEY);
    assert_eq!(obj.get_attr_as_ulong(CKA_KEY_TYPE).unwrap(), CKK_AES);
    assert_eq!(obj.get_attr_as_bool(CKA_ENCRYPT).unwrap(), false);
    assert_eq!(obj.get_attr_as_bool(CKA_DECRYPT).unwrap(), false);
    assert_eq!(obj.get_attr_as_bool(CKA_EXTRACTABLE).unwrap(), true);
    assert_eq!(obj.get_attr_as_bool(CKA_SENSITIVE).unwrap(), true);
    assert_eq!(obj.get_attr_as_ulong(CKA_VALUE_LEN).unwrap(), 16);
    assert_eq!(obj.get_attr_as_bool(CKA_LOCAL).unwrap(), false);
    assert_eq!(obj.get_attr_as_bool(CKA_ALWAYS_SENSITIVE).unwrap(), false);
    assert_eq!(obj.get_attr_as_bool(CKA_NEVER_EXTRACTABLE).unwrap(), false);
    assert!(obj.get_attr(CKA_UNIQUE_ID).is_some());

    check_created_attrs_against_processing(ProcessingFunc::Import, &obj)
        .unwrap();
}

#[test]
fn attribute_lists_have_unique_ids() {
    let obj = import_aes_key(&[]);
    let attrs = obj.get_attributes();
    for (i, a) in attrs.iter().enumerate() {
        for b in &attrs[i + 1..] {
            assert_ne!(a.get_type(), b.get_type());
        }
    }
}

#[test]
fn resolver_defaults_are_idempotent() {
    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_attr(CKA_VALUE, &[0u8; 32]));
    t.extend(wire_bool(CKA_ENCRYPT, true));

    let one = create_attributes_from_template(
        &t,
        CK_UNAVAILABLE_INFORMATION,
        CreationCase::FromClearData,
    )
    .unwrap();
    let two = create_attributes_from_template(
        &t,
        CK_UNAVAILABLE_INFORMATION,
        CreationCase::FromClearData,
    )
    .unwrap();

    let attrs1 = one.get_attributes();
    let attrs2 = two.get_attributes();
    assert_eq!(attrs1.len(), attrs2.len());
    for (a, b) in attrs1.iter().zip(attrs2.iter()) {
        assert_eq!(a.get_type(), b.get_type());
        if a.get_type() == CKA_UNIQUE_ID {
            continue;
        }
        assert_eq!(a.get_value(), b.get_value());
    }
}

#[test]
fn generate_aes_key_below_minimum_size() {
    /* template {class=secret-key, type=AES, size=8} */
    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_num(CKA_VALUE_LEN, 8));
    let e = create_attributes_from_template(
        &t,
        CKM_AES_KEY_GEN,
        CreationCase::FromRandom(ProcessingFunc::Generate),
    )
    .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_SIZE_RANGE);
}

#[test]
fn generate_workflow_from_random() {
    let session = user_session();

    let mut t = Vec::new();
    /* class and key type default from the mechanism */
    t.extend(wire_num(CKA_VALUE_LEN, 32));
    t.extend(wire_bool(CKA_ENCRYPT, true));
    t.extend(wire_bool(CKA_DECRYPT, true));
    let obj = create_attributes_from_template(
        &t,
        CKM_AES_KEY_GEN,
        CreationCase::FromRandom(ProcessingFunc::Generate),
    )
    .unwrap();

    assert_eq!(obj.get_class(), CKO_SECRET_KEY);
    assert_eq!(obj.get_attr_as_ulong(CKA_KEY_TYPE).unwrap(), CKK_AES);
    assert_eq!(obj.get_attr_as_bool(CKA_LOCAL).unwrap(), true);
    assert_eq!(
        obj.get_attr_as_ulong(CKA_KEY_GEN_MECHANISM).unwrap(),
        CKM_AES_KEY_GEN
    );
    /* a generated sensitive key starts its lineage unbroken */
    assert_eq!(obj.get_attr_as_bool(CKA_ALWAYS_SENSITIVE).unwrap(), true);

    check_created_attrs_against_processing(ProcessingFunc::Generate, &obj)
        .unwrap();
    check_created_attrs_against_token(&session, &obj).unwrap();
}

#[test]
fn generate_rejects_value_in_template() {
    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_num(CKA_VALUE_LEN, 16));
    t.extend(wire_attr(CKA_VALUE, &[0u8; 16]));
    let e = create_attributes_from_template(
        &t,
        CKM_AES_KEY_GEN,
        CreationCase::FromRandom(ProcessingFunc::Generate),
    )
    .unwrap_err();
    assert_eq!(e.rv(), CKR_ATTRIBUTE_TYPE_INVALID);
}

#[test]
fn generate_requires_a_length() {
    let t = secret_key_template(CKK_GENERIC_SECRET);
    let e = create_attributes_from_template(
        &t,
        CKM_GENERIC_SECRET_KEY_GEN,
        CreationCase::FromRandom(ProcessingFunc::Generate),
    )
    .unwrap_err();
    assert_eq!(e.rv(), CKR_TEMPLATE_INCOMPLETE);
}

#[test]
fn parent_without_derive_authorization() {
    /* parent with derive=false, request derive */
    let parent = import_aes_key(&[]);
    for mech in [CKM_SP800_108_COUNTER_KDF, CKM_HKDF_DERIVE] {
        let e = check_parent_attrs_against_processing(
            mech,
            ProcessingFunc::Derive,
            &parent,
        )
        .unwrap_err();
        assert_eq!(e.rv(), CKR_KEY_FUNCTION_NOT_PERMITTED);
    }
}

#[test]
fn derive_workflow_checks_in_order() {
    let session = user_session();

    /* generic secret parent authorized for derivation */
    let mut t = secret_key_template(CKK_GENERIC_SECRET);
    t.extend(wire_attr(CKA_VALUE, &[0xccu8; 32]));
    t.extend(wire_bool(CKA_DERIVE, true));
    let parent = create_attributes_from_template(
        &t,
        CK_UNAVAILABLE_INFORMATION,
        CreationCase::FromClearData,
    )
    .unwrap();

    /* the new key template inherits type and size from the parent */
    let new = create_attributes_from_template(
        &[],
        CKM_HKDF_DERIVE,
        CreationCase::FromParent(ProcessingFunc::Derive, &parent),
    )
    .unwrap();
    assert_eq!(new.get_class(), CKO_SECRET_KEY);
    assert_eq!(
        new.get_attr_as_ulong(CKA_KEY_TYPE).unwrap(),
        CKK_GENERIC_SECRET
    );
    assert_eq!(new.get_attr_as_ulong(CKA_VALUE_LEN).unwrap(), 32);
    assert_eq!(new.get_attr_as_bool(CKA_LOCAL).unwrap(), false);

    /* the fixed check sequence for creation from a parent */
    check_created_attrs_against_token(&session, &parent).unwrap();
    check_parent_attrs_against_processing(
        CKM_HKDF_DERIVE,
        ProcessingFunc::Derive,
        &parent,
    )
    .unwrap();
    check_created_attrs_against_parent_key(
        ProcessingFunc::Derive,
        &parent,
        &new,
    )
    .unwrap();
    check_created_attrs_against_processing(ProcessingFunc::Derive, &new)
        .unwrap();
    check_created_attrs_against_token(&session, &new).unwrap();
}

#[test]
fn derived_key_keeps_parent_lineage() {
    let mut t = secret_key_template(CKK_GENERIC_SECRET);
    t.extend(wire_num(CKA_VALUE_LEN, 32));
    t.extend(wire_bool(CKA_DERIVE, true));
    t.extend(wire_bool(CKA_EXTRACTABLE, false));
    let parent = create_attributes_from_template(
        &t,
        CKM_GENERIC_SECRET_KEY_GEN,
        CreationCase::FromRandom(ProcessingFunc::Generate),
    )
    .unwrap();
    assert!(parent.is_always_sensitive());
    assert!(parent.is_never_extractable());

    let mut t = Vec::new();
    t.extend(wire_bool(CKA_EXTRACTABLE, false));
    let new = create_attributes_from_template(
        &t,
        CKM_HKDF_DERIVE,
        CreationCase::FromParent(ProcessingFunc::Derive, &parent),
    )
    .unwrap();
    assert!(new.is_always_sensitive());
    assert!(new.is_never_extractable());

    check_created_attrs_against_parent_key(
        ProcessingFunc::Derive,
        &parent,
        &new,
    )
    .unwrap();
}

#[test]
fn unwrap_workflow_and_wrapping_restrictions() {
    /* wrapping key authorized for unwrap */
    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_attr(CKA_VALUE, &[0xabu8; 16]));
    t.extend(wire_bool(CKA_UNWRAP, true));
    let wrapping = create_attributes_from_template(
        &t,
        CK_UNAVAILABLE_INFORMATION,
        CreationCase::FromClearData,
    )
    .unwrap();

    check_parent_attrs_against_processing(
        CKM_AES_KEY_WRAP,
        ProcessingFunc::Unwrap,
        &wrapping,
    )
    .unwrap();

    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_num(CKA_VALUE_LEN, 16));
    let unwrapped = create_attributes_from_template(
        &t,
        CKM_AES_KEY_WRAP,
        CreationCase::FromParent(ProcessingFunc::Unwrap, &wrapping),
    )
    .unwrap();
    /* unwrapped keys start with a broken lineage */
    assert!(!unwrapped.is_always_sensitive());
    assert!(!unwrapped.is_never_extractable());
    check_created_attrs_against_processing(
        ProcessingFunc::Unwrap,
        &unwrapped,
    )
    .unwrap();
    check_created_attrs_against_parent_key(
        ProcessingFunc::Unwrap,
        &wrapping,
        &unwrapped,
    )
    .unwrap();
    check_created_attrs(&wrapping, &unwrapped).unwrap();

    /* a non-extractable key cannot transit a wrap/unwrap boundary */
    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_num(CKA_VALUE_LEN, 16));
    t.extend(wire_bool(CKA_EXTRACTABLE, false));
    let locked = create_attributes_from_template(
        &t,
        CKM_AES_KEY_WRAP,
        CreationCase::FromParent(ProcessingFunc::Unwrap, &wrapping),
    )
    .unwrap();
    let e = check_created_attrs(&wrapping, &locked).unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_UNEXTRACTABLE);

    /* wrap-with-trusted keys need a trusted wrapping key */
    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_num(CKA_VALUE_LEN, 16));
    t.extend(wire_bool(CKA_WRAP_WITH_TRUSTED, true));
    let guarded = create_attributes_from_template(
        &t,
        CKM_AES_KEY_WRAP,
        CreationCase::FromParent(ProcessingFunc::Unwrap, &wrapping),
    )
    .unwrap();
    let e = check_created_attrs(&wrapping, &guarded).unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_NOT_WRAPPABLE);
}

#[test]
fn parent_key_type_must_match_mechanism() {
    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_attr(CKA_VALUE, &[0u8; 16]));
    t.extend(wire_bool(CKA_SIGN, true));
    let key = create_attributes_from_template(
        &t,
        CK_UNAVAILABLE_INFORMATION,
        CreationCase::FromClearData,
    )
    .unwrap();
    /* an AES key cannot drive an HMAC mechanism */
    let e = check_parent_attrs_against_processing(
        CKM_SHA256_HMAC,
        ProcessingFunc::Sign,
        &key,
    )
    .unwrap_err();
    assert_eq!(e.rv(), CKR_KEY_TYPE_INCONSISTENT);
}

#[test]
fn allowed_mechanisms_restriction() {
    let mut allowed = Vec::new();
    allowed.extend_from_slice(&ul(CKM_SHA256_HMAC).to_le_bytes());

    let mut t = secret_key_template(CKK_GENERIC_SECRET);
    t.extend(wire_attr(CKA_VALUE, &[0x42u8; 32]));
    t.extend(wire_bool(CKA_SIGN, true));
    t.extend(wire_attr(CKA_ALLOWED_MECHANISMS, &allowed));
    let key = create_attributes_from_template(
        &t,
        CK_UNAVAILABLE_INFORMATION,
        CreationCase::FromClearData,
    )
    .unwrap();

    check_parent_attrs_against_processing(
        CKM_SHA256_HMAC,
        ProcessingFunc::Sign,
        &key,
    )
    .unwrap();
    let e = check_parent_attrs_against_processing(
        CKM_SHA512_HMAC,
        ProcessingFunc::Sign,
        &key,
    )
    .unwrap_err();
    assert_eq!(e.rv(), CKR_MECHANISM_INVALID);
}

#[test]
fn token_state_checks_on_creation() {
    let public = Session::new(SKR_UNSPEC, CKF_SERIAL_SESSION).unwrap();
    let obj = import_aes_key(&[]);
    /* secret keys default to private */
    let e = check_created_attrs_against_token(&public, &obj).unwrap_err();
    assert_eq!(e.rv(), CKR_USER_NOT_LOGGED_IN);

    /* a token object cannot be created in a read-only session */
    let ro_user = Session::new(CKU_USER, CKF_SERIAL_SESSION).unwrap();
    let obj = import_aes_key(&wire_bool(CKA_TOKEN, true));
    let e = check_created_attrs_against_token(&ro_user, &obj).unwrap_err();
    assert_eq!(e.rv(), CKR_SESSION_READ_ONLY);

    let rw_user = user_session();
    check_created_attrs_against_token(&rw_user, &obj).unwrap();

    /* the trusted mark is reserved to the security officer */
    let obj = import_aes_key(&wire_bool(CKA_TRUSTED, true));
    let e = check_created_attrs_against_token(&rw_user, &obj).unwrap_err();
    assert_eq!(e.rv(), CKR_ATTRIBUTE_READ_ONLY);
    let so = Session::new(CKU_SO, CKF_SERIAL_SESSION | CKF_RW_SESSION)
        .unwrap();
    check_created_attrs_against_token(&so, &obj).unwrap();
}

#[test]
fn access_check_after_logout() {
    let mut session = user_session();
    let obj = import_aes_key(&[]);
    check_access_attrs_against_token(&session, &obj).unwrap();

    /* the authentication state changed between creation and use */
    assert_eq!(session.change_session_state(SKR_UNSPEC), CKR_OK);
    let e = check_access_attrs_against_token(&session, &obj).unwrap_err();
    assert_eq!(e.rv(), CKR_USER_NOT_LOGGED_IN);
}

#[test]
fn non_extractable_keys_never_export_their_value() {
    let obj = import_aes_key(&wire_bool(CKA_EXTRACTABLE, false));
    assert!(!attribute_is_exportable(CKA_VALUE, &obj));

    /* even a non sensitive object keeps the value locked when it is
     * not extractable */
    let mut t = wire_bool(CKA_EXTRACTABLE, false);
    t.extend(wire_bool(CKA_SENSITIVE, false));
    let obj = import_aes_key(&t);
    assert!(!attribute_is_exportable(CKA_VALUE, &obj));

    /* non sensitive and extractable keys may disclose it */
    let mut t = wire_bool(CKA_SENSITIVE, false);
    t.extend(wire_bool(CKA_EXTRACTABLE, true));
    let obj = import_aes_key(&t);
    assert!(attribute_is_exportable(CKA_VALUE, &obj));

    /* non sensitive attributes are always readable */
    assert!(attribute_is_exportable(CKA_ENCRYPT, &obj));

    /* attributes unknown to the class are never exportable */
    assert!(!attribute_is_exportable(CKA_MODULUS, &obj));
}

#[test]
fn private_predicate_follows_class_defaults() {
    let key = import_aes_key(&[]);
    assert!(object_is_private(&key));
    let key = import_aes_key(&wire_bool(CKA_PRIVATE, false));
    assert!(!object_is_private(&key));
}

#[test]
fn key_pair_id_propagation() {
    let mut t = Vec::new();
    t.extend(wire_num(CKA_CLASS, ul(CKO_PUBLIC_KEY)));
    t.extend(wire_num(CKA_MODULUS_BITS, 2048));
    t.extend(wire_attr(CKA_ID, &[7u8]));
    let mut pubkey = create_attributes_from_template(
        &t,
        CKM_RSA_PKCS_KEY_PAIR_GEN,
        CreationCase::FromRandom(ProcessingFunc::GeneratePair),
    )
    .unwrap();

    let mut t = Vec::new();
    t.extend(wire_num(CKA_CLASS, ul(CKO_PRIVATE_KEY)));
    let mut privkey = create_attributes_from_template(
        &t,
        CKM_RSA_PKCS_KEY_PAIR_GEN,
        CreationCase::FromRandom(ProcessingFunc::GeneratePair),
    )
    .unwrap();
    assert_eq!(
        privkey.get_attr_as_ulong(CKA_KEY_TYPE).unwrap(),
        CKK_RSA
    );
    assert!(privkey.get_attr(CKA_ID).is_none());

    check_created_attrs_against_processing(
        ProcessingFunc::GeneratePair,
        &pubkey,
    )
    .unwrap();
    check_created_attrs_against_processing(
        ProcessingFunc::GeneratePair,
        &privkey,
    )
    .unwrap();

    add_missing_attribute_id(&mut pubkey, &mut privkey).unwrap();
    assert_eq!(
        privkey.get_attr(CKA_ID).unwrap().get_value().as_slice(),
        &[7u8]
    );

    /* re-running is a no-op */
    add_missing_attribute_id(&mut pubkey, &mut privkey).unwrap();
    assert_eq!(
        pubkey.get_attr(CKA_ID).unwrap().get_value().as_slice(),
        &[7u8]
    );

    /* conflicting ids are an error */
    privkey
        .set_attr(Attribute::from_bytes(CKA_ID, vec![9u8]))
        .unwrap();
    let e = add_missing_attribute_id(&mut pubkey, &mut privkey).unwrap_err();
    assert_eq!(e.rv(), CKR_TEMPLATE_INCONSISTENT);
}

#[test]
fn destroy_is_gated_by_destroyable() {
    let obj = import_aes_key(&[]);
    check_object_destroyable(&obj).unwrap();
    let obj = import_aes_key(&wire_bool(CKA_DESTROYABLE, false));
    let e = check_object_destroyable(&obj).unwrap_err();
    assert_eq!(e.rv(), CKR_ACTION_PROHIBITED);
}

#[test]
fn modify_rules_on_keys() {
    let mut obj = import_aes_key(&[]);

    /* sensitive can only move from false to true */
    modify_object(&mut obj, &wire_bool(CKA_SENSITIVE, true)).unwrap();
    let e = modify_object(&mut obj, &wire_bool(CKA_SENSITIVE, false))
        .unwrap_err();
    assert_eq!(e.rv(), CKR_ATTRIBUTE_READ_ONLY);

    /* extractable can only move from true to false */
    modify_object(&mut obj, &wire_bool(CKA_EXTRACTABLE, false)).unwrap();
    let e = modify_object(&mut obj, &wire_bool(CKA_EXTRACTABLE, true))
        .unwrap_err();
    assert_eq!(e.rv(), CKR_ATTRIBUTE_READ_ONLY);

    /* the key value can never be replaced */
    let e = modify_object(&mut obj, &wire_attr(CKA_VALUE, &[0u8; 16]))
        .unwrap_err();
    assert_eq!(e.rv(), CKR_ATTRIBUTE_READ_ONLY);
}

#[test]
fn wrap_workflow_on_existing_key() {
    let mut session = user_session();

    let mut t = secret_key_template(CKK_AES);
    t.extend(wire_attr(CKA_VALUE, &[0x11u8; 32]));
    t.extend(wire_bool(CKA_WRAP, true));
    let wrapping = create_attributes_from_template(
        &t,
        CK_UNAVAILABLE_INFORMATION,
        CreationCase::FromClearData,
    )
    .unwrap();
    let payload = import_aes_key(&[]);

    /* use of an existing secret: state, parent role, key pairing,
     * mechanism and step */
    check_access_attrs_against_token(&session, &wrapping).unwrap();
    check_parent_attrs_against_processing(
        CKM_AES_KEY_WRAP,
        ProcessingFunc::Wrap,
        &wrapping,
    )
    .unwrap();
    check_created_attrs(&wrapping, &payload).unwrap();
    check_mechanism_against_processing(
        &mut session,
        CKM_AES_KEY_WRAP,
        ProcessingFunc::Wrap,
        ProcessingStep::Init,
    )
    .unwrap();
    check_mechanism_against_processing(
        &mut session,
        CKM_AES_KEY_WRAP,
        ProcessingFunc::Wrap,
        ProcessingStep::Oneshot,
    )
    .unwrap();
}
