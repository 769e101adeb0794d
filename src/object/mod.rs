// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! This module defines the core representation of token objects
//! (`Object`), which is the complete, typed attribute list describing
//! one stored object or one creation candidate. The associated factory
//! system (`ObjectFactory` trait, `ObjectFactories` registry) manages
//! object creation from client templates, default attribute resolution
//! and per class attribute compliance.

use std::fmt::Debug;

use crate::attribute::{AttrType, Attribute};
use crate::error::{Error, Result};
use crate::pkcs11::*;

use uuid::Uuid;

pub mod factory;
pub mod key;

pub use factory::{
    create_attributes_from_template, object_factories, CreationCase,
    ObjectFactories, ObjectFactory, OAFlags,
};

pub use key::key_size_bounds;

/// Helper macro that generates methods to check specific boolean
/// attributes on objects
macro_rules! create_bool_checker {
    (make $name:ident; from $id:expr; def $def:expr) => {
        #[doc = concat!("Returns the value of [", stringify!($id), "] as a boolean")]
        pub fn $name(&self) -> bool {
            for a in &self.attributes {
                if a.get_type() == $id {
                    return a.to_bool().unwrap_or($def);
                }
            }
            $def
        }
    };
}

/// Helper macro that generates methods to retrieve attributes
/// values of a specific type from objects
macro_rules! attr_as_type {
    (make $name:ident; with $r:ty; $atype:ident; via $conv:ident) => {
        #[doc = concat!("Returns the value of the attribute as a `", stringify!($r), "`")]
        pub fn $name(&self, t: CK_ULONG) -> Result<$r> {
            for attr in &self.attributes {
                if attr.get_type() == t {
                    if attr.get_attrtype() != AttrType::$atype {
                        return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
                    }
                    return attr.$conv();
                }
            }
            Err(Error::not_found(t.to_string()))
        }
    };
}

/// This is a generic container for all token objects, holding the
/// complete attribute list that describes one object or one creation
/// candidate. For key objects it is possible to set the zeroize feature
/// which will cause zeroization of every attribute when the object is
/// dropped.
#[derive(Debug, Clone)]
pub struct Object {
    /// All objects have a class so we keep it here in order to access it
    /// directly in some internal functions
    class: CK_OBJECT_CLASS,
    /// The object attributes as vector of [Attribute] values
    pub(crate) attributes: Vec<Attribute>,
    /// Flag to indicate if the object needs to be zeroized when it is
    /// drop()ed. Generally set to true for objects containing sensitive
    /// values like private or secret keys
    zeroize: bool,
}

impl Drop for Object {
    fn drop(&mut self) {
        if self.zeroize {
            for a in self.attributes.iter_mut() {
                a.zeroize()
            }
        }
    }
}

impl Object {
    /// Creates a new empty Object
    pub fn new(class: CK_OBJECT_CLASS) -> Object {
        Object {
            class: class,
            attributes: vec![Attribute::from_ulong(CKA_CLASS, class)],
            zeroize: false,
        }
    }

    /// Set zeroization for the whole object, this is done when
    /// the object is dropped via the Drop trait and memory is freed.
    pub fn set_zeroize(&mut self) {
        self.zeroize = true;
    }

    /// Generates the internal per object unique id
    /// This is generally called at object creation or import
    pub fn generate_unique(&mut self) {
        if !self
            .attributes
            .iter()
            .any(|r| r.get_type() == CKA_UNIQUE_ID)
        {
            let uuid = Uuid::new_v4().to_string();
            self.attributes
                .push(Attribute::from_string(CKA_UNIQUE_ID, uuid));
        }
    }

    /// Allow for a full copy of all attributes but regenerates the
    /// unique id
    pub fn blind_copy(&self) -> Result<Object> {
        let mut obj = Object::new(self.class);
        obj.generate_unique();
        for attr in &self.attributes {
            if attr.get_type() == CKA_UNIQUE_ID {
                continue;
            }
            obj.attributes.push(attr.clone());
        }
        Ok(obj)
    }

    /// Gets the object's class
    pub fn get_class(&self) -> CK_OBJECT_CLASS {
        self.class
    }

    create_bool_checker! {make is_token; from CKA_TOKEN; def false}
    create_bool_checker! {make is_private; from CKA_PRIVATE; def true}
    create_bool_checker! {make is_trusted; from CKA_TRUSTED; def false}
    create_bool_checker! {make is_local; from CKA_LOCAL; def false}
    create_bool_checker! {make is_always_sensitive; from CKA_ALWAYS_SENSITIVE; def false}
    create_bool_checker! {make is_never_extractable; from CKA_NEVER_EXTRACTABLE; def false}
    create_bool_checker! {make is_copyable; from CKA_COPYABLE; def true}
    create_bool_checker! {make is_modifiable; from CKA_MODIFIABLE; def true}
    create_bool_checker! {make is_destroyable; from CKA_DESTROYABLE; def false}
    create_bool_checker! {make is_wrap_with_trusted; from CKA_WRAP_WITH_TRUSTED; def false}

    /// Report if the object is sensitive with a sensible default
    pub fn is_sensitive(&self) -> bool {
        match self.class {
            CKO_PRIVATE_KEY | CKO_SECRET_KEY => {
                for a in &self.attributes {
                    if a.get_type() == CKA_SENSITIVE {
                        return a.to_bool().unwrap_or(true);
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Report if the object is extractable with a sensible default
    pub fn is_extractable(&self) -> bool {
        match self.class {
            CKO_PRIVATE_KEY | CKO_SECRET_KEY => {
                for a in &self.attributes {
                    if a.get_type() == CKA_EXTRACTABLE {
                        return a.to_bool().unwrap_or(false);
                    }
                }
                false
            }
            _ => true,
        }
    }

    /// Get an attribute from the object by attribute id
    pub fn get_attr(&self, ck_type: CK_ULONG) -> Option<&Attribute> {
        self.attributes.iter().find(|r| r.get_type() == ck_type)
    }

    /// Sets or Replaces an attribute on the object
    pub fn set_attr(&mut self, a: Attribute) -> Result<()> {
        let atype = a.get_type();
        if atype == CKA_CLASS {
            self.class = a.to_ulong()?;
        }
        match self.attributes.iter().position(|r| r.get_type() == atype) {
            Some(idx) => self.attributes[idx] = a,
            None => self.attributes.push(a),
        }
        Ok(())
    }

    /// Deletes an attribute from the object by attribute id
    pub fn del_attr(&mut self, ck_type: CK_ULONG) {
        self.attributes.retain(|a| a.get_type() != ck_type);
    }

    /// Gets a reference to the internal vector of object attributes
    pub fn get_attributes(&self) -> &Vec<Attribute> {
        return &self.attributes;
    }

    attr_as_type! {make get_attr_as_bool; with bool; BoolType; via to_bool}
    attr_as_type! {make get_attr_as_ulong; with CK_ULONG; NumType; via to_ulong}
    attr_as_type! {make get_attr_as_string; with String; StringType; via to_string}
    attr_as_type! {make get_attr_as_bytes; with &Vec<u8>; BytesType; via to_bytes}

    /// Returns the size of the key carried by this object, expressed in
    /// the native unit of its key type: bytes for symmetric key types,
    /// bits for RSA and EC keys.
    ///
    /// Returns a CKR_KEY_HANDLE_INVALID error when the object carries
    /// neither a value nor a length attribute.
    pub fn key_size(&self) -> Result<CK_ULONG> {
        match self.class {
            CKO_SECRET_KEY => {
                if let Some(a) = self.get_attr(CKA_VALUE) {
                    return Ok(CK_ULONG::try_from(a.get_value().len())?);
                }
                match self.get_attr(CKA_VALUE_LEN) {
                    Some(a) => Ok(a.to_ulong()?),
                    None => Err(CKR_KEY_HANDLE_INVALID)?,
                }
            }
            CKO_PUBLIC_KEY | CKO_PRIVATE_KEY => {
                match self.get_attr_as_ulong(CKA_KEY_TYPE)? {
                    CKK_RSA => {
                        if let Some(a) = self.get_attr(CKA_MODULUS_BITS) {
                            return Ok(a.to_ulong()?);
                        }
                        match self.get_attr(CKA_MODULUS) {
                            Some(a) => Ok(CK_ULONG::try_from(
                                a.get_value().len() * 8,
                            )?),
                            None => Err(CKR_KEY_HANDLE_INVALID)?,
                        }
                    }
                    _ => Err(CKR_KEY_HANDLE_INVALID)?,
                }
            }
            _ => Err(CKR_KEY_HANDLE_INVALID)?,
        }
    }
}
