// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Key object factories and the key-size policy table. The factories
//! encode the per class attribute compliance rules for secret, public
//! and private keys, the creation case handling (import, generation,
//! derivation, unwrapping) and the sensitivity lineage bookkeeping.

use crate::attribute::Attribute;
use crate::config;
use crate::error::Result;
use crate::mechanism::ProcessingFunc;
use crate::pkcs11::*;

use super::factory::{
    attr_element, CreationCase, OAFlags, ObjectFactory, ObjectFactoryData,
};
use super::Object;

use log::debug;

/// Key sizes in bytes accepted for AES keys
pub const AES_KEY_SIZES: &[CK_ULONG] = &[16, 24, 32];
/// Key sizes in bytes accepted for Triple DES keys
pub const DES3_KEY_SIZES: &[CK_ULONG] = &[24];

/// Returns the minimum and maximum key size accepted for the given key
/// type, expressed in the type's native unit: bytes for symmetric key
/// types, bits for RSA and EC keys. With bit_size_only the bounds are
/// always returned in bits.
///
/// This is a pure lookup on an immutable table; unsupported key types
/// fail with CKR_ATTRIBUTE_VALUE_INVALID.
pub fn key_size_bounds(
    key_type: CK_KEY_TYPE,
    bit_size_only: bool,
) -> Result<(CK_ULONG, CK_ULONG)> {
    let (min, max, in_bits) = match key_type {
        CKK_GENERIC_SECRET => (1, 512, false),
        CKK_AES => (16, 32, false),
        CKK_DES3 => (24, 24, false),
        CKK_SHA_1_HMAC | CKK_SHA224_HMAC | CKK_SHA256_HMAC
        | CKK_SHA384_HMAC | CKK_SHA512_HMAC => (1, 512, false),
        CKK_RSA => (1024, 8192, true),
        CKK_EC => (224, 521, true),
        _ => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
    };
    if bit_size_only && !in_bits {
        Ok((min * 8, max * 8))
    } else {
        Ok((min, max))
    }
}

/// Returns the key size bounds for the given key type after applying
/// the deployment configuration floors, which may raise the minimum but
/// never lower it. Bounds are in the type's native unit.
pub fn enforced_key_size_bounds(
    key_type: CK_KEY_TYPE,
) -> Result<(CK_ULONG, CK_ULONG)> {
    let (mut min, max) = key_size_bounds(key_type, false)?;
    if let Some(bits) = config::current().min_bits(key_type) {
        let floor = match key_type {
            CKK_RSA | CKK_EC => bits,
            _ => (bits + 7) / 8,
        };
        if floor > min {
            min = floor;
        }
    }
    Ok((min, max))
}

/// Common trait for factories of objects that are keys, providing the
/// attributes shared by all key classes
pub trait KeyFactory: ObjectFactory {
    /// Adds the key object attributes defined for all keys in the spec
    fn add_common_key_attrs(&mut self, private: bool) {
        self.add_common_storage_attrs(private);
        let attrs = self.get_data_mut().get_attributes_mut();
        attrs.push(attr_element!(
            CKA_KEY_TYPE; OAFlags::RequiredOnCreate | OAFlags::Unchangeable;
            Attribute::from_ulong; val CK_UNAVAILABLE_INFORMATION));
        attrs.push(attr_element!(
            CKA_ID; OAFlags::empty(); Attribute::from_bytes;
            val Vec::new()));
        attrs.push(attr_element!(
            CKA_START_DATE; OAFlags::Defval; Attribute::from_date_bytes;
            val Vec::new()));
        attrs.push(attr_element!(
            CKA_END_DATE; OAFlags::Defval; Attribute::from_date_bytes;
            val Vec::new()));
        attrs.push(attr_element!(
            CKA_DERIVE; OAFlags::Defval; Attribute::from_bool; val false));
        attrs.push(attr_element!(
            CKA_LOCAL; OAFlags::Defval | OAFlags::NeverSettable;
            Attribute::from_bool; val false));
        attrs.push(attr_element!(
            CKA_KEY_GEN_MECHANISM; OAFlags::Defval | OAFlags::NeverSettable;
            Attribute::from_ulong; val CK_UNAVAILABLE_INFORMATION));
        attrs.push(attr_element!(
            CKA_ALLOWED_MECHANISMS; OAFlags::empty();
            Attribute::from_ulong_array; val Vec::new()));
    }
}

/// Records the sensitivity lineage on a newly created key.
///
/// Imported and unwrapped keys existed in the clear outside the token
/// so the lineage always starts broken; generated keys start their own
/// lineage; derived keys continue the parent's.
fn set_key_lineage(
    obj: &mut Object,
    parent: Option<&Object>,
    broken: bool,
) -> Result<()> {
    let (always_sens, never_extr) = if broken {
        (false, false)
    } else {
        match parent {
            Some(p) => (
                p.is_always_sensitive() && obj.is_sensitive(),
                p.is_never_extractable() && !obj.is_extractable(),
            ),
            None => (obj.is_sensitive(), !obj.is_extractable()),
        }
    };
    obj.set_attr(Attribute::from_bool(CKA_ALWAYS_SENSITIVE, always_sens))?;
    obj.set_attr(Attribute::from_bool(CKA_NEVER_EXTRACTABLE, never_extr))?;
    Ok(())
}

/// Factory for objects of class CKO_SECRET_KEY.
///
/// One instance is registered per supported key type; types with a
/// discrete set of legal sizes (AES, DES3) carry it in `sizes`.
#[derive(Debug)]
pub struct SecretKeyFactory {
    ktype: CK_KEY_TYPE,
    sizes: Option<&'static [CK_ULONG]>,
    data: ObjectFactoryData,
}

impl SecretKeyFactory {
    /// Initializes a new SecretKeyFactory for the given key type
    pub fn new(
        ktype: CK_KEY_TYPE,
        sizes: Option<&'static [CK_ULONG]>,
    ) -> SecretKeyFactory {
        let mut factory = SecretKeyFactory {
            ktype: ktype,
            sizes: sizes,
            data: ObjectFactoryData::new(CKO_SECRET_KEY),
        };

        factory.add_common_key_attrs(true);

        let attributes = factory.data.get_attributes_mut();

        attributes.push(attr_element!(
            CKA_SENSITIVE; OAFlags::Defval | OAFlags::ChangeToTrue;
            Attribute::from_bool; val true));
        attributes.push(attr_element!(
            CKA_ENCRYPT; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_DECRYPT; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_SIGN; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_VERIFY; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_WRAP; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_UNWRAP; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_EXTRACTABLE; OAFlags::Defval | OAFlags::ChangeToFalse;
            Attribute::from_bool; val true));
        attributes.push(attr_element!(
            CKA_WRAP_WITH_TRUSTED; OAFlags::Defval | OAFlags::ChangeToTrue;
            Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_TRUSTED; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_ALWAYS_SENSITIVE; OAFlags::NeverSettable;
            Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_NEVER_EXTRACTABLE; OAFlags::NeverSettable;
            Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_CHECK_VALUE; OAFlags::Ignored; Attribute::from_ignore;
            val None));
        attributes.push(attr_element!(
            CKA_VALUE; OAFlags::Sensitive | OAFlags::RequiredOnCreate
            | OAFlags::SettableOnlyOnCreate | OAFlags::Unchangeable;
            Attribute::from_bytes; val Vec::new()));
        if ktype == CKK_DES3 {
            attributes.push(attr_element!(
                CKA_VALUE_LEN; OAFlags::Defval | OAFlags::Unchangeable;
                Attribute::from_ulong; val 24));
        } else {
            attributes.push(attr_element!(
                CKA_VALUE_LEN; OAFlags::RequiredOnGenerate
                | OAFlags::Unchangeable; Attribute::from_ulong; val 0));
        }

        factory.data.finalize();

        factory
    }

    /// Validates the candidate key size against the policy table and,
    /// when the raw value is present, keeps CKA_VALUE_LEN consistent
    /// with it.
    ///
    /// A candidate with no size information at all (a derivation
    /// template leaving the length to the mechanism) is accepted here
    /// and checked again when the value materializes.
    fn check_key_size(&self, obj: &mut Object) -> Result<()> {
        if let Some(a) = obj.get_attr(CKA_VALUE) {
            let vlen = CK_ULONG::try_from(a.get_value().len())?;
            match obj.get_attr(CKA_VALUE_LEN) {
                Some(l) => {
                    if l.to_ulong()? != vlen {
                        return Err(CKR_TEMPLATE_INCONSISTENT)?;
                    }
                }
                None => {
                    obj.set_attr(Attribute::from_ulong(CKA_VALUE_LEN, vlen))?
                }
            }
        }
        let size = match obj.get_attr(CKA_VALUE_LEN) {
            Some(a) => a.to_ulong()?,
            None => return Ok(()),
        };
        let (min, max) = enforced_key_size_bounds(self.ktype)?;
        if size < min || size > max {
            debug!(
                "key size {} outside [{}, {}] for type {}",
                size, min, max, self.ktype
            );
            return Err(CKR_KEY_SIZE_RANGE)?;
        }
        if let Some(sizes) = self.sizes {
            if !sizes.contains(&size) {
                return Err(CKR_KEY_SIZE_RANGE)?;
            }
        }
        Ok(())
    }
}

impl ObjectFactory for SecretKeyFactory {
    fn create(
        &self,
        case: CreationCase,
        template: &[Attribute],
    ) -> Result<Object> {
        let mut obj = match case {
            CreationCase::FromClearData => {
                let mut obj = self.internal_object_create(
                    template,
                    OAFlags::NeverSettable,
                    OAFlags::RequiredOnCreate,
                )?;
                set_key_lineage(&mut obj, None, true)?;
                obj
            }
            CreationCase::FromRandom(func) => {
                if func != ProcessingFunc::Generate {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                let mut obj = self.internal_object_create(
                    template,
                    OAFlags::SettableOnlyOnCreate | OAFlags::NeverSettable,
                    OAFlags::RequiredOnGenerate,
                )?;
                obj.set_attr(Attribute::from_bool(CKA_LOCAL, true))?;
                set_key_lineage(&mut obj, None, false)?;
                obj
            }
            CreationCase::FromParent(func, parent) => {
                let mut tmpl = template.to_vec();
                if func == ProcessingFunc::Derive
                    && parent.get_class() == CKO_SECRET_KEY
                    && !tmpl.iter().any(|a| a.get_type() == CKA_VALUE_LEN)
                {
                    /* the derived key size inherits from the parent */
                    if let Ok(sz) = parent.key_size() {
                        tmpl.push(Attribute::from_ulong(CKA_VALUE_LEN, sz));
                    }
                }
                let mut obj = self.internal_object_create(
                    &tmpl,
                    OAFlags::SettableOnlyOnCreate | OAFlags::NeverSettable,
                    OAFlags::AlwaysRequired,
                )?;
                match func {
                    ProcessingFunc::Derive => {
                        set_key_lineage(&mut obj, Some(parent), false)?
                    }
                    ProcessingFunc::Unwrap => {
                        set_key_lineage(&mut obj, None, true)?
                    }
                    _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
                }
                obj
            }
        };
        self.check_key_size(&mut obj)?;
        obj.generate_unique();
        obj.set_zeroize();
        Ok(obj)
    }

    fn get_data(&self) -> &ObjectFactoryData {
        &self.data
    }

    fn get_data_mut(&mut self) -> &mut ObjectFactoryData {
        &mut self.data
    }
}

impl KeyFactory for SecretKeyFactory {}

/// Factory for objects of class CKO_PUBLIC_KEY
#[derive(Debug)]
pub struct PubKeyFactory {
    ktype: CK_KEY_TYPE,
    data: ObjectFactoryData,
}

impl PubKeyFactory {
    /// Initializes a new PubKeyFactory for the given key type
    pub fn new(ktype: CK_KEY_TYPE) -> PubKeyFactory {
        let mut factory = PubKeyFactory {
            ktype: ktype,
            data: ObjectFactoryData::new(CKO_PUBLIC_KEY),
        };

        factory.add_common_key_attrs(false);

        let attributes = factory.data.get_attributes_mut();

        attributes.push(attr_element!(
            CKA_SUBJECT; OAFlags::Defval; Attribute::from_bytes;
            val Vec::new()));
        attributes.push(attr_element!(
            CKA_ENCRYPT; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_VERIFY; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_VERIFY_RECOVER; OAFlags::Defval; Attribute::from_bool;
            val false));
        attributes.push(attr_element!(
            CKA_WRAP; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_TRUSTED; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_PUBLIC_KEY_INFO; OAFlags::empty(); Attribute::from_bytes;
            val Vec::new()));
        match ktype {
            CKK_RSA => {
                attributes.push(attr_element!(
                    CKA_MODULUS; OAFlags::RequiredOnCreate
                    | OAFlags::SettableOnlyOnCreate | OAFlags::Unchangeable;
                    Attribute::from_bytes; val Vec::new()));
                attributes.push(attr_element!(
                    CKA_MODULUS_BITS; OAFlags::RequiredOnGenerate
                    | OAFlags::Unchangeable; Attribute::from_ulong; val 0));
                attributes.push(attr_element!(
                    CKA_PUBLIC_EXPONENT; OAFlags::Defval
                    | OAFlags::Unchangeable; Attribute::from_bytes;
                    val vec![0x01, 0x00, 0x01]));
            }
            CKK_EC => {
                attributes.push(attr_element!(
                    CKA_EC_PARAMS; OAFlags::RequiredOnCreate
                    | OAFlags::RequiredOnGenerate | OAFlags::Unchangeable;
                    Attribute::from_bytes; val Vec::new()));
                attributes.push(attr_element!(
                    CKA_EC_POINT; OAFlags::RequiredOnCreate
                    | OAFlags::SettableOnlyOnCreate | OAFlags::Unchangeable;
                    Attribute::from_bytes; val Vec::new()));
            }
            _ => (),
        }

        factory.data.finalize();

        factory
    }

    /// Validates the declared modulus size for RSA keys
    fn check_key_size(&self, obj: &mut Object) -> Result<()> {
        if self.ktype != CKK_RSA {
            return Ok(());
        }
        if obj.get_attr(CKA_MODULUS_BITS).is_none() {
            if let Some(m) = obj.get_attr(CKA_MODULUS) {
                let bits = CK_ULONG::try_from(m.get_value().len() * 8)?;
                obj.set_attr(Attribute::from_ulong(CKA_MODULUS_BITS, bits))?;
            }
        }
        let bits = match obj.get_attr(CKA_MODULUS_BITS) {
            Some(a) => a.to_ulong()?,
            None => return Ok(()),
        };
        let (min, max) = enforced_key_size_bounds(self.ktype)?;
        if bits < min || bits > max {
            return Err(CKR_KEY_SIZE_RANGE)?;
        }
        Ok(())
    }
}

impl ObjectFactory for PubKeyFactory {
    fn create(
        &self,
        case: CreationCase,
        template: &[Attribute],
    ) -> Result<Object> {
        let mut obj = match case {
            CreationCase::FromClearData => self.internal_object_create(
                template,
                OAFlags::NeverSettable,
                OAFlags::RequiredOnCreate,
            )?,
            CreationCase::FromRandom(func) => {
                if func != ProcessingFunc::GeneratePair {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                let mut obj = self.internal_object_create(
                    template,
                    OAFlags::SettableOnlyOnCreate | OAFlags::NeverSettable,
                    OAFlags::RequiredOnGenerate,
                )?;
                obj.set_attr(Attribute::from_bool(CKA_LOCAL, true))?;
                obj
            }
            CreationCase::FromParent(_, _) => {
                return Err(CKR_TEMPLATE_INCONSISTENT)?
            }
        };
        self.check_key_size(&mut obj)?;
        obj.generate_unique();
        Ok(obj)
    }

    fn get_data(&self) -> &ObjectFactoryData {
        &self.data
    }

    fn get_data_mut(&mut self) -> &mut ObjectFactoryData {
        &mut self.data
    }
}

impl KeyFactory for PubKeyFactory {}

/// Factory for objects of class CKO_PRIVATE_KEY
#[derive(Debug)]
pub struct PrivKeyFactory {
    data: ObjectFactoryData,
}

impl PrivKeyFactory {
    /// Initializes a new PrivKeyFactory for the given key type
    pub fn new(ktype: CK_KEY_TYPE) -> PrivKeyFactory {
        let mut factory = PrivKeyFactory {
            data: ObjectFactoryData::new(CKO_PRIVATE_KEY),
        };

        factory.add_common_key_attrs(true);

        let attributes = factory.data.get_attributes_mut();

        attributes.push(attr_element!(
            CKA_SUBJECT; OAFlags::Defval; Attribute::from_bytes;
            val Vec::new()));
        attributes.push(attr_element!(
            CKA_SENSITIVE; OAFlags::Defval | OAFlags::ChangeToTrue;
            Attribute::from_bool; val true));
        attributes.push(attr_element!(
            CKA_DECRYPT; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_SIGN; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_SIGN_RECOVER; OAFlags::Defval; Attribute::from_bool;
            val false));
        attributes.push(attr_element!(
            CKA_UNWRAP; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_EXTRACTABLE; OAFlags::Defval | OAFlags::ChangeToFalse;
            Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_ALWAYS_SENSITIVE; OAFlags::NeverSettable;
            Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_NEVER_EXTRACTABLE; OAFlags::NeverSettable;
            Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_WRAP_WITH_TRUSTED; OAFlags::Defval | OAFlags::ChangeToTrue;
            Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_ALWAYS_AUTHENTICATE; OAFlags::Defval; Attribute::from_bool;
            val false));
        attributes.push(attr_element!(
            CKA_PUBLIC_KEY_INFO; OAFlags::empty(); Attribute::from_bytes;
            val Vec::new()));
        match ktype {
            CKK_RSA => {
                attributes.push(attr_element!(
                    CKA_MODULUS; OAFlags::RequiredOnCreate
                    | OAFlags::SettableOnlyOnCreate | OAFlags::Unchangeable;
                    Attribute::from_bytes; val Vec::new()));
                attributes.push(attr_element!(
                    CKA_PUBLIC_EXPONENT; OAFlags::empty();
                    Attribute::from_bytes; val Vec::new()));
                attributes.push(attr_element!(
                    CKA_PRIVATE_EXPONENT; OAFlags::Sensitive
                    | OAFlags::RequiredOnCreate | OAFlags::SettableOnlyOnCreate
                    | OAFlags::Unchangeable; Attribute::from_bytes;
                    val Vec::new()));
            }
            CKK_EC => {
                attributes.push(attr_element!(
                    CKA_EC_PARAMS; OAFlags::RequiredOnCreate
                    | OAFlags::Unchangeable; Attribute::from_bytes;
                    val Vec::new()));
                attributes.push(attr_element!(
                    CKA_VALUE; OAFlags::Sensitive | OAFlags::RequiredOnCreate
                    | OAFlags::SettableOnlyOnCreate | OAFlags::Unchangeable;
                    Attribute::from_bytes; val Vec::new()));
            }
            _ => (),
        }

        factory.data.finalize();

        factory
    }
}

impl ObjectFactory for PrivKeyFactory {
    fn create(
        &self,
        case: CreationCase,
        template: &[Attribute],
    ) -> Result<Object> {
        let mut obj = match case {
            CreationCase::FromClearData => {
                let mut obj = self.internal_object_create(
                    template,
                    OAFlags::NeverSettable,
                    OAFlags::RequiredOnCreate,
                )?;
                set_key_lineage(&mut obj, None, true)?;
                obj
            }
            CreationCase::FromRandom(func) => {
                if func != ProcessingFunc::GeneratePair {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                let mut obj = self.internal_object_create(
                    template,
                    OAFlags::SettableOnlyOnCreate | OAFlags::NeverSettable,
                    OAFlags::RequiredOnGenerate,
                )?;
                obj.set_attr(Attribute::from_bool(CKA_LOCAL, true))?;
                set_key_lineage(&mut obj, None, false)?;
                obj
            }
            CreationCase::FromParent(func, _) => {
                if func != ProcessingFunc::Unwrap {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
                let mut obj = self.internal_object_create(
                    template,
                    OAFlags::SettableOnlyOnCreate | OAFlags::NeverSettable,
                    OAFlags::AlwaysRequired,
                )?;
                set_key_lineage(&mut obj, None, true)?;
                obj
            }
        };
        obj.generate_unique();
        obj.set_zeroize();
        Ok(obj)
    }

    fn get_data(&self) -> &ObjectFactoryData {
        &self.data
    }

    fn get_data_mut(&mut self) -> &mut ObjectFactoryData {
        &mut self.data
    }
}

impl KeyFactory for PrivKeyFactory {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_bounds_native_and_bits() {
        assert_eq!(key_size_bounds(CKK_AES, false).unwrap(), (16, 32));
        assert_eq!(key_size_bounds(CKK_AES, true).unwrap(), (128, 256));
        assert_eq!(key_size_bounds(CKK_DES3, false).unwrap(), (24, 24));
        assert_eq!(key_size_bounds(CKK_RSA, false).unwrap(), (1024, 8192));
        /* asymmetric sizes are already in bits */
        assert_eq!(key_size_bounds(CKK_RSA, true).unwrap(), (1024, 8192));
        assert_eq!(
            key_size_bounds(CKK_GENERIC_SECRET, true).unwrap(),
            (8, 4096)
        );
    }

    #[test]
    fn size_bounds_unknown_type() {
        let e = key_size_bounds(CK_UNAVAILABLE_INFORMATION, false)
            .unwrap_err();
        assert_eq!(e.rv(), CKR_ATTRIBUTE_VALUE_INVALID);
    }

    #[test]
    fn secret_key_size_checks() {
        let factory = SecretKeyFactory::new(CKK_AES, Some(AES_KEY_SIZES));

        let mut obj = Object::new(CKO_SECRET_KEY);
        obj.set_attr(Attribute::from_bytes(CKA_VALUE, vec![0u8; 16]))
            .unwrap();
        factory.check_key_size(&mut obj).unwrap();
        /* the value length was recorded */
        assert_eq!(obj.get_attr_as_ulong(CKA_VALUE_LEN).unwrap(), 16);

        /* 20 bytes is inside the min/max range but not a valid AES size */
        let mut obj = Object::new(CKO_SECRET_KEY);
        obj.set_attr(Attribute::from_bytes(CKA_VALUE, vec![0u8; 20]))
            .unwrap();
        let e = factory.check_key_size(&mut obj).unwrap_err();
        assert_eq!(e.rv(), CKR_KEY_SIZE_RANGE);

        /* mismatched declared length */
        let mut obj = Object::new(CKO_SECRET_KEY);
        obj.set_attr(Attribute::from_bytes(CKA_VALUE, vec![0u8; 16]))
            .unwrap();
        obj.set_attr(Attribute::from_ulong(CKA_VALUE_LEN, 32)).unwrap();
        let e = factory.check_key_size(&mut obj).unwrap_err();
        assert_eq!(e.rv(), CKR_TEMPLATE_INCONSISTENT);
    }

    #[test]
    fn lineage_rules() {
        let mut parent = Object::new(CKO_SECRET_KEY);
        parent
            .set_attr(Attribute::from_bool(CKA_ALWAYS_SENSITIVE, true))
            .unwrap();
        parent
            .set_attr(Attribute::from_bool(CKA_NEVER_EXTRACTABLE, true))
            .unwrap();

        /* derived sensitive non-extractable key continues the lineage */
        let mut obj = Object::new(CKO_SECRET_KEY);
        obj.set_attr(Attribute::from_bool(CKA_SENSITIVE, true)).unwrap();
        obj.set_attr(Attribute::from_bool(CKA_EXTRACTABLE, false))
            .unwrap();
        set_key_lineage(&mut obj, Some(&parent), false).unwrap();
        assert!(obj.is_always_sensitive());
        assert!(obj.is_never_extractable());

        /* an extractable derived key breaks never-extractable */
        let mut obj = Object::new(CKO_SECRET_KEY);
        obj.set_attr(Attribute::from_bool(CKA_SENSITIVE, true)).unwrap();
        obj.set_attr(Attribute::from_bool(CKA_EXTRACTABLE, true)).unwrap();
        set_key_lineage(&mut obj, Some(&parent), false).unwrap();
        assert!(obj.is_always_sensitive());
        assert!(!obj.is_never_extractable());

        /* unwrapped keys always start with a broken lineage */
        let mut obj = Object::new(CKO_SECRET_KEY);
        set_key_lineage(&mut obj, None, true).unwrap();
        assert!(!obj.is_always_sensitive());
        assert!(!obj.is_never_extractable());
    }
}
