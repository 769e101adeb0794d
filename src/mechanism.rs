// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Mechanism capability tables and the processing step state machine.
//! The table is an immutable process-wide constant describing, for each
//! mechanism, the supported processing functions, the legal operating
//! key types and sizes and whether the mechanism is restricted to
//! single-part processing.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::pkcs11::*;
use crate::session::Session;

use log::debug;
use once_cell::sync::Lazy;

/// The processing function categories a request can ask for
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ProcessingFunc {
    Digest,
    Generate,
    GeneratePair,
    Derive,
    Wrap,
    Unwrap,
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    SignRecover,
    VerifyRecover,
    Import,
    Copy,
    Modify,
    Destroy,
}

impl ProcessingFunc {
    /// Returns the mechanism capability flag a mechanism must carry to
    /// serve this function. Functions that are not mechanism driven
    /// return None.
    pub fn required_flag(&self) -> Option<CK_FLAGS> {
        match self {
            ProcessingFunc::Digest => Some(CKF_DIGEST),
            ProcessingFunc::Generate => Some(CKF_GENERATE),
            ProcessingFunc::GeneratePair => Some(CKF_GENERATE_KEY_PAIR),
            ProcessingFunc::Derive => Some(CKF_DERIVE),
            ProcessingFunc::Wrap => Some(CKF_WRAP),
            ProcessingFunc::Unwrap => Some(CKF_UNWRAP),
            ProcessingFunc::Encrypt => Some(CKF_ENCRYPT),
            ProcessingFunc::Decrypt => Some(CKF_DECRYPT),
            ProcessingFunc::Sign => Some(CKF_SIGN),
            ProcessingFunc::Verify => Some(CKF_VERIFY),
            ProcessingFunc::SignRecover => Some(CKF_SIGN_RECOVER),
            ProcessingFunc::VerifyRecover => Some(CKF_VERIFY_RECOVER),
            ProcessingFunc::Import
            | ProcessingFunc::Copy
            | ProcessingFunc::Modify
            | ProcessingFunc::Destroy => None,
        }
    }

    /// Returns the boolean attribute a parent object must carry as true
    /// to be used in the given role
    pub fn parent_usage_attr(&self) -> Option<CK_ATTRIBUTE_TYPE> {
        match self {
            ProcessingFunc::Derive => Some(CKA_DERIVE),
            ProcessingFunc::Wrap => Some(CKA_WRAP),
            ProcessingFunc::Unwrap => Some(CKA_UNWRAP),
            ProcessingFunc::Encrypt => Some(CKA_ENCRYPT),
            ProcessingFunc::Decrypt => Some(CKA_DECRYPT),
            ProcessingFunc::Sign => Some(CKA_SIGN),
            ProcessingFunc::Verify => Some(CKA_VERIFY),
            ProcessingFunc::SignRecover => Some(CKA_SIGN_RECOVER),
            ProcessingFunc::VerifyRecover => Some(CKA_VERIFY_RECOVER),
            _ => None,
        }
    }
}

/// The step of a processing operation
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ProcessingStep {
    /// Processing started, no data consumed yet
    Init,
    /// Single-call processing with all input available
    Oneshot,
    /// Multi-part processing, more input may follow
    Update,
    /// Multi-part processing concluding
    Final,
}

/// The active processing operation of a session
#[derive(Debug, Clone, Copy)]
pub struct ProcessingContext {
    /// The mechanism the operation was initialized with
    pub mech: CK_MECHANISM_TYPE,
    /// The processing function being performed
    pub func: ProcessingFunc,
    /// The current step of the operation
    pub step: ProcessingStep,
}

/// Static capability description of one mechanism
#[derive(Debug, Clone)]
pub struct MechEntry {
    /// Minimum operating key size, in the key type's native unit
    min_key: CK_ULONG,
    /// Maximum operating key size, in the key type's native unit
    max_key: CK_ULONG,
    /// Capability flags (CKF_ENCRYPT, CKF_GENERATE, ...)
    flags: CK_FLAGS,
    /// Whether the mechanism only supports one-shot processing
    single_part_only: bool,
    /// Object class defaulted for creation templates with no class
    default_class: Option<CK_OBJECT_CLASS>,
    /// Key type defaulted for creation templates with no key type
    default_key_type: Option<CK_KEY_TYPE>,
    /// Key types the mechanism can operate on
    key_types: &'static [CK_KEY_TYPE],
}

impl MechEntry {
    /// Returns the mechanism capability flags
    pub fn flags(&self) -> CK_FLAGS {
        self.flags
    }

    /// Returns the minimum and maximum operating key size
    pub fn key_size_range(&self) -> (CK_ULONG, CK_ULONG) {
        (self.min_key, self.max_key)
    }

    /// Returns whether the mechanism only supports one-shot processing
    pub fn is_single_part_only(&self) -> bool {
        self.single_part_only
    }

    /// Returns the default object class for creation templates
    pub fn default_class(&self) -> Option<CK_OBJECT_CLASS> {
        self.default_class
    }

    /// Returns the default key type for creation templates
    pub fn default_key_type(&self) -> Option<CK_KEY_TYPE> {
        self.default_key_type
    }

    /// Returns the key types the mechanism can operate on
    pub fn key_types(&self) -> &'static [CK_KEY_TYPE] {
        self.key_types
    }
}

/// The registry of known mechanisms
#[derive(Debug)]
pub struct Mechanisms {
    tree: BTreeMap<CK_MECHANISM_TYPE, MechEntry>,
}

macro_rules! mech_entry {
    ($tree:expr; $mech:expr; sizes $min:expr, $max:expr;
     flags $flags:expr; single $single:expr;
     defaults $dc:expr, $dk:expr; keys $keys:expr) => {
        $tree.insert(
            $mech,
            MechEntry {
                min_key: $min,
                max_key: $max,
                flags: $flags,
                single_part_only: $single,
                default_class: $dc,
                default_key_type: $dk,
                key_types: $keys,
            },
        );
    };
}

impl Mechanisms {
    /// Creates the registry with all the supported mechanisms
    pub fn new() -> Mechanisms {
        let mut t = BTreeMap::new();

        /* digests */
        for m in [CKM_SHA_1, CKM_SHA224, CKM_SHA256, CKM_SHA384, CKM_SHA512]
        {
            mech_entry!(t; m; sizes 0, 0; flags CKF_DIGEST; single false;
                defaults None, None; keys &[]);
        }

        /* key generation */
        mech_entry!(t; CKM_GENERIC_SECRET_KEY_GEN; sizes 1, 512;
            flags CKF_GENERATE; single true;
            defaults Some(CKO_SECRET_KEY), Some(CKK_GENERIC_SECRET);
            keys &[CKK_GENERIC_SECRET]);
        mech_entry!(t; CKM_AES_KEY_GEN; sizes 16, 32;
            flags CKF_GENERATE; single true;
            defaults Some(CKO_SECRET_KEY), Some(CKK_AES); keys &[CKK_AES]);
        mech_entry!(t; CKM_DES3_KEY_GEN; sizes 24, 24;
            flags CKF_GENERATE; single true;
            defaults Some(CKO_SECRET_KEY), Some(CKK_DES3); keys &[CKK_DES3]);

        /* AES ciphers */
        for m in [CKM_AES_ECB, CKM_AES_CBC, CKM_AES_CTR, CKM_AES_GCM] {
            mech_entry!(t; m; sizes 16, 32;
                flags CKF_ENCRYPT | CKF_DECRYPT; single false;
                defaults None, None; keys &[CKK_AES]);
        }
        mech_entry!(t; CKM_AES_CBC_PAD; sizes 16, 32;
            flags CKF_ENCRYPT | CKF_DECRYPT | CKF_WRAP | CKF_UNWRAP;
            single false; defaults None, None; keys &[CKK_AES]);
        mech_entry!(t; CKM_AES_CCM; sizes 16, 32;
            flags CKF_ENCRYPT | CKF_DECRYPT; single true;
            defaults None, None; keys &[CKK_AES]);
        mech_entry!(t; CKM_AES_KEY_WRAP; sizes 16, 32;
            flags CKF_WRAP | CKF_UNWRAP; single true;
            defaults None, None; keys &[CKK_AES]);

        /* AES based MACs */
        for m in [CKM_AES_MAC, CKM_AES_CMAC] {
            mech_entry!(t; m; sizes 16, 32;
                flags CKF_SIGN | CKF_VERIFY; single false;
                defaults None, None; keys &[CKK_AES]);
        }

        /* DES3 ciphers */
        for m in [CKM_DES3_ECB, CKM_DES3_CBC, CKM_DES3_CBC_PAD] {
            mech_entry!(t; m; sizes 24, 24;
                flags CKF_ENCRYPT | CKF_DECRYPT; single false;
                defaults None, None; keys &[CKK_DES3]);
        }

        /* HMACs */
        mech_entry!(t; CKM_SHA_1_HMAC; sizes 1, 512;
            flags CKF_SIGN | CKF_VERIFY; single false; defaults None, None;
            keys &[CKK_SHA_1_HMAC, CKK_GENERIC_SECRET]);
        mech_entry!(t; CKM_SHA224_HMAC; sizes 1, 512;
            flags CKF_SIGN | CKF_VERIFY; single false; defaults None, None;
            keys &[CKK_SHA224_HMAC, CKK_GENERIC_SECRET]);
        mech_entry!(t; CKM_SHA256_HMAC; sizes 1, 512;
            flags CKF_SIGN | CKF_VERIFY; single false; defaults None, None;
            keys &[CKK_SHA256_HMAC, CKK_GENERIC_SECRET]);
        mech_entry!(t; CKM_SHA384_HMAC; sizes 1, 512;
            flags CKF_SIGN | CKF_VERIFY; single false; defaults None, None;
            keys &[CKK_SHA384_HMAC, CKK_GENERIC_SECRET]);
        mech_entry!(t; CKM_SHA512_HMAC; sizes 1, 512;
            flags CKF_SIGN | CKF_VERIFY; single false; defaults None, None;
            keys &[CKK_SHA512_HMAC, CKK_GENERIC_SECRET]);

        /* key derivation */
        mech_entry!(t; CKM_HKDF_DERIVE; sizes 1, 512;
            flags CKF_DERIVE; single true;
            defaults Some(CKO_SECRET_KEY), Some(CKK_GENERIC_SECRET);
            keys &[CKK_GENERIC_SECRET, CKK_SHA_1_HMAC, CKK_SHA224_HMAC,
                   CKK_SHA256_HMAC, CKK_SHA384_HMAC, CKK_SHA512_HMAC]);
        mech_entry!(t; CKM_SP800_108_COUNTER_KDF; sizes 1, 512;
            flags CKF_DERIVE; single true;
            defaults Some(CKO_SECRET_KEY), Some(CKK_GENERIC_SECRET);
            keys &[CKK_AES, CKK_GENERIC_SECRET, CKK_SHA256_HMAC]);
        mech_entry!(t; CKM_ECDH1_DERIVE; sizes 224, 521;
            flags CKF_DERIVE; single true;
            defaults Some(CKO_SECRET_KEY), Some(CKK_GENERIC_SECRET);
            keys &[CKK_EC]);

        /* RSA */
        mech_entry!(t; CKM_RSA_PKCS_KEY_PAIR_GEN; sizes 1024, 8192;
            flags CKF_GENERATE_KEY_PAIR; single true;
            defaults None, Some(CKK_RSA); keys &[CKK_RSA]);
        mech_entry!(t; CKM_RSA_PKCS; sizes 1024, 8192;
            flags CKF_ENCRYPT | CKF_DECRYPT | CKF_SIGN | CKF_VERIFY
            | CKF_WRAP | CKF_UNWRAP; single true;
            defaults None, None; keys &[CKK_RSA]);
        mech_entry!(t; CKM_SHA256_RSA_PKCS; sizes 1024, 8192;
            flags CKF_SIGN | CKF_VERIFY; single false;
            defaults None, None; keys &[CKK_RSA]);

        /* EC */
        mech_entry!(t; CKM_EC_KEY_PAIR_GEN; sizes 224, 521;
            flags CKF_GENERATE_KEY_PAIR; single true;
            defaults None, Some(CKK_EC); keys &[CKK_EC]);
        mech_entry!(t; CKM_ECDSA; sizes 224, 521;
            flags CKF_SIGN | CKF_VERIFY; single true;
            defaults None, None; keys &[CKK_EC]);

        Mechanisms { tree: t }
    }

    /// Returns the number of registered mechanisms
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Lists the registered mechanism ids
    pub fn list(&self) -> Vec<CK_MECHANISM_TYPE> {
        self.tree.keys().cloned().collect()
    }

    /// Returns the entry for the given mechanism
    pub fn get(&self, typ: CK_MECHANISM_TYPE) -> Result<&MechEntry> {
        match self.tree.get(&typ) {
            Some(m) => Ok(m),
            None => Err(CKR_MECHANISM_INVALID)?,
        }
    }
}

/// The process-wide mechanism table, immutable after initialization
static MECHANISMS: Lazy<Mechanisms> = Lazy::new(|| Mechanisms::new());

/// Returns a reference to the process-wide mechanism table
pub fn mechanisms() -> &'static Mechanisms {
    &MECHANISMS
}

/// Returns whether a mechanism's static capability flags satisfy the
/// requested flag set. Unknown mechanisms satisfy nothing.
pub fn check_pkcs11_mechanism_flags(
    mechanism_type: CK_MECHANISM_TYPE,
    flags: CK_FLAGS,
) -> bool {
    match mechanisms().get(mechanism_type) {
        Ok(entry) => entry.flags() & flags == flags,
        Err(_) => false,
    }
}

/// Validates that the mechanism supports the requested processing
/// function and that the requested step is a legal transition from the
/// session's current processing context, advancing the context on
/// success. Oneshot and Final are terminal and clear the context.
pub fn check_mechanism_against_processing(
    session: &mut Session,
    mechanism_type: CK_MECHANISM_TYPE,
    function: ProcessingFunc,
    step: ProcessingStep,
) -> Result<()> {
    let entry = mechanisms().get(mechanism_type)?;
    let flag = match function.required_flag() {
        Some(f) => f,
        None => {
            debug!("function {:?} is not mechanism driven", function);
            return Err(CKR_MECHANISM_INVALID)?;
        }
    };
    if entry.flags() & flag != flag {
        debug!(
            "mechanism 0x{:x} does not support {:?}",
            mechanism_type, function
        );
        return Err(CKR_MECHANISM_INVALID)?;
    }

    match step {
        ProcessingStep::Init => {
            if session.processing().is_some() {
                return Err(CKR_OPERATION_ACTIVE)?;
            }
            session.set_processing(ProcessingContext {
                mech: mechanism_type,
                func: function,
                step: ProcessingStep::Init,
            });
        }
        ProcessingStep::Oneshot => {
            let valid = match session.processing() {
                Some(ctx) => {
                    ctx.mech == mechanism_type
                        && ctx.func == function
                        && ctx.step == ProcessingStep::Init
                }
                None => false,
            };
            if !valid {
                return Err(CKR_OPERATION_NOT_INITIALIZED)?;
            }
            session.clear_processing();
        }
        ProcessingStep::Update => {
            if entry.is_single_part_only() {
                return Err(CKR_MECHANISM_INVALID)?;
            }
            let valid = match session.processing() {
                Some(ctx) => {
                    ctx.mech == mechanism_type
                        && ctx.func == function
                        && (ctx.step == ProcessingStep::Init
                            || ctx.step == ProcessingStep::Update)
                }
                None => false,
            };
            if !valid {
                return Err(CKR_OPERATION_NOT_INITIALIZED)?;
            }
            if let Some(ctx) = session.processing_mut() {
                ctx.step = ProcessingStep::Update;
            }
        }
        ProcessingStep::Final => {
            if entry.is_single_part_only() {
                return Err(CKR_MECHANISM_INVALID)?;
            }
            /* a Final without at least one Update is always invalid */
            let valid = match session.processing() {
                Some(ctx) => {
                    ctx.mech == mechanism_type
                        && ctx.func == function
                        && ctx.step == ProcessingStep::Update
                }
                None => false,
            };
            if !valid {
                return Err(CKR_OPERATION_NOT_INITIALIZED)?;
            }
            session.clear_processing();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkcs11::vendor::SKR_UNSPEC;

    fn test_session() -> Session {
        Session::new(SKR_UNSPEC, CKF_SERIAL_SESSION).unwrap()
    }

    #[test]
    fn mechanism_flags_subset() {
        assert!(check_pkcs11_mechanism_flags(CKM_AES_CBC_PAD, CKF_ENCRYPT));
        assert!(check_pkcs11_mechanism_flags(
            CKM_AES_CBC_PAD,
            CKF_WRAP | CKF_UNWRAP
        ));
        assert!(!check_pkcs11_mechanism_flags(CKM_AES_CBC, CKF_WRAP));
        assert!(!check_pkcs11_mechanism_flags(CKM_SHA256, CKF_SIGN));
        /* unknown mechanisms satisfy nothing */
        assert!(!check_pkcs11_mechanism_flags(0xdeadbeef, CKF_DIGEST));
    }

    #[test]
    fn unknown_mechanism_is_rejected() {
        let mut s = test_session();
        let e = check_mechanism_against_processing(
            &mut s,
            0xdeadbeef,
            ProcessingFunc::Encrypt,
            ProcessingStep::Init,
        )
        .unwrap_err();
        assert_eq!(e.rv(), CKR_MECHANISM_INVALID);
    }

    #[test]
    fn function_not_supported_by_mechanism() {
        let mut s = test_session();
        let e = check_mechanism_against_processing(
            &mut s,
            CKM_SHA256,
            ProcessingFunc::Encrypt,
            ProcessingStep::Init,
        )
        .unwrap_err();
        assert_eq!(e.rv(), CKR_MECHANISM_INVALID);
        assert!(s.processing().is_none());
    }

    #[test]
    fn oneshot_sequence() {
        let mut s = test_session();
        check_mechanism_against_processing(
            &mut s,
            CKM_AES_CBC,
            ProcessingFunc::Encrypt,
            ProcessingStep::Init,
        )
        .unwrap();
        check_mechanism_against_processing(
            &mut s,
            CKM_AES_CBC,
            ProcessingFunc::Encrypt,
            ProcessingStep::Oneshot,
        )
        .unwrap();
        assert!(s.processing().is_none());

        /* a terminal step cannot be followed by anything */
        for step in [
            ProcessingStep::Oneshot,
            ProcessingStep::Update,
            ProcessingStep::Final,
        ] {
            let e = check_mechanism_against_processing(
                &mut s,
                CKM_AES_CBC,
                ProcessingFunc::Encrypt,
                step,
            )
            .unwrap_err();
            assert_eq!(e.rv(), CKR_OPERATION_NOT_INITIALIZED);
        }
    }

    #[test]
    fn multipart_sequence() {
        let mut s = test_session();
        check_mechanism_against_processing(
            &mut s,
            CKM_SHA256_HMAC,
            ProcessingFunc::Sign,
            ProcessingStep::Init,
        )
        .unwrap();
        /* Init -> Final directly is rejected */
        let e = check_mechanism_against_processing(
            &mut s,
            CKM_SHA256_HMAC,
            ProcessingFunc::Sign,
            ProcessingStep::Final,
        )
        .unwrap_err();
        assert_eq!(e.rv(), CKR_OPERATION_NOT_INITIALIZED);

        check_mechanism_against_processing(
            &mut s,
            CKM_SHA256_HMAC,
            ProcessingFunc::Sign,
            ProcessingStep::Update,
        )
        .unwrap();
        check_mechanism_against_processing(
            &mut s,
            CKM_SHA256_HMAC,
            ProcessingFunc::Sign,
            ProcessingStep::Update,
        )
        .unwrap();
        check_mechanism_against_processing(
            &mut s,
            CKM_SHA256_HMAC,
            ProcessingFunc::Sign,
            ProcessingStep::Final,
        )
        .unwrap();
        assert!(s.processing().is_none());
    }

    #[test]
    fn init_while_active_is_rejected() {
        let mut s = test_session();
        check_mechanism_against_processing(
            &mut s,
            CKM_AES_GCM,
            ProcessingFunc::Encrypt,
            ProcessingStep::Init,
        )
        .unwrap();
        let e = check_mechanism_against_processing(
            &mut s,
            CKM_AES_GCM,
            ProcessingFunc::Encrypt,
            ProcessingStep::Init,
        )
        .unwrap_err();
        assert_eq!(e.rv(), CKR_OPERATION_ACTIVE);
    }

    #[test]
    fn single_part_mechanism_rejects_multipart_steps() {
        let mut s = test_session();
        check_mechanism_against_processing(
            &mut s,
            CKM_AES_CCM,
            ProcessingFunc::Encrypt,
            ProcessingStep::Init,
        )
        .unwrap();
        let e = check_mechanism_against_processing(
            &mut s,
            CKM_AES_CCM,
            ProcessingFunc::Encrypt,
            ProcessingStep::Update,
        )
        .unwrap_err();
        assert_eq!(e.rv(), CKR_MECHANISM_INVALID);

        /* the one-shot path still works */
        check_mechanism_against_processing(
            &mut s,
            CKM_AES_CCM,
            ProcessingFunc::Encrypt,
            ProcessingStep::Oneshot,
        )
        .unwrap();
        assert!(s.processing().is_none());
    }

    #[test]
    fn mismatched_context_is_rejected() {
        let mut s = test_session();
        check_mechanism_against_processing(
            &mut s,
            CKM_AES_CBC,
            ProcessingFunc::Encrypt,
            ProcessingStep::Init,
        )
        .unwrap();
        /* same mechanism, different function */
        let e = check_mechanism_against_processing(
            &mut s,
            CKM_AES_CBC,
            ProcessingFunc::Decrypt,
            ProcessingStep::Oneshot,
        )
        .unwrap_err();
        assert_eq!(e.rv(), CKR_OPERATION_NOT_INITIALIZED);
    }
}
