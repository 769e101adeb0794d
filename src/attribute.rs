// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! This module provides helpers to manage object attributes with
//! conversion functions to safe Rust representations ([Attribute]) and
//! defines the mapping between attribute type identifiers and the data
//! type they represent as described in the [AttrType] enumeration. It
//! also decodes serialized client templates into typed attribute lists.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::misc::{zeromem, CK_ULONG_SIZE, WIRE_NUM_SIZE};
use crate::pkcs11::*;

/// List of attribute types we understand
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AttrType {
    BoolType,
    NumType,
    StringType,
    BytesType,
    UlongArrayType,
    DateType,
    DenyType,
    IgnoreType,
}

impl AttrType {
    /// Finds the attribute type from the attribute id
    pub fn attr_id_to_attrtype(id: CK_ULONG) -> Result<AttrType> {
        match Attrmap::search_by_id(id) {
            Some(a) => Ok(a.atype),
            None => Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
        }
    }
}

/// Struct to map an attribute id to a type and a printable name
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Attrmap<'a> {
    id: CK_ULONG,
    name: &'a str,
    atype: AttrType,
}

impl PartialOrd for Attrmap<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Attrmap<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Attrmap<'_> {
    /// Convenience function to efficiently search for a mapping by id
    fn search_by_id(id: CK_ULONG) -> Option<&'static Attrmap<'static>> {
        match &ATTRMAP.binary_search(&Attrmap {
            id: id,
            name: "",
            atype: AttrType::StringType,
        }) {
            Ok(i) => Some(&ATTRMAP[*i]),
            Err(_) => None,
        }
    }
}

/// Helper macro to populate the static attributes map
macro_rules! attrmap_element {
    ($id:expr; as $attrtype:ident) => {
        Attrmap {
            id: $id,
            name: stringify!($id),
            atype: AttrType::$attrtype,
        }
    };
}

/// The main attributes map, lists all known attributes.
/// Must be kept sorted by id, lookups use binary search.
static ATTRMAP: [Attrmap<'_>; 51] = [
    attrmap_element!(CKA_CLASS; as NumType),
    attrmap_element!(CKA_TOKEN; as BoolType),
    attrmap_element!(CKA_PRIVATE; as BoolType),
    attrmap_element!(CKA_LABEL; as StringType),
    attrmap_element!(CKA_UNIQUE_ID; as StringType),
    attrmap_element!(CKA_APPLICATION; as StringType),
    attrmap_element!(CKA_VALUE; as BytesType),
    attrmap_element!(CKA_OBJECT_ID; as BytesType),
    attrmap_element!(CKA_CERTIFICATE_TYPE; as NumType),
    attrmap_element!(CKA_ISSUER; as BytesType),
    attrmap_element!(CKA_SERIAL_NUMBER; as BytesType),
    attrmap_element!(CKA_TRUSTED; as BoolType),
    attrmap_element!(CKA_CERTIFICATE_CATEGORY; as NumType),
    attrmap_element!(CKA_CHECK_VALUE; as IgnoreType),
    attrmap_element!(CKA_KEY_TYPE; as NumType),
    attrmap_element!(CKA_SUBJECT; as BytesType),
    attrmap_element!(CKA_ID; as BytesType),
    attrmap_element!(CKA_SENSITIVE; as BoolType),
    attrmap_element!(CKA_ENCRYPT; as BoolType),
    attrmap_element!(CKA_DECRYPT; as BoolType),
    attrmap_element!(CKA_WRAP; as BoolType),
    attrmap_element!(CKA_UNWRAP; as BoolType),
    attrmap_element!(CKA_SIGN; as BoolType),
    attrmap_element!(CKA_SIGN_RECOVER; as BoolType),
    attrmap_element!(CKA_VERIFY; as BoolType),
    attrmap_element!(CKA_VERIFY_RECOVER; as BoolType),
    attrmap_element!(CKA_DERIVE; as BoolType),
    attrmap_element!(CKA_START_DATE; as DateType),
    attrmap_element!(CKA_END_DATE; as DateType),
    attrmap_element!(CKA_MODULUS; as BytesType),
    attrmap_element!(CKA_MODULUS_BITS; as NumType),
    attrmap_element!(CKA_PUBLIC_EXPONENT; as BytesType),
    attrmap_element!(CKA_PRIVATE_EXPONENT; as BytesType),
    attrmap_element!(CKA_PUBLIC_KEY_INFO; as BytesType),
    attrmap_element!(CKA_VALUE_LEN; as NumType),
    attrmap_element!(CKA_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_LOCAL; as BoolType),
    attrmap_element!(CKA_NEVER_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_ALWAYS_SENSITIVE; as BoolType),
    attrmap_element!(CKA_KEY_GEN_MECHANISM; as NumType),
    attrmap_element!(CKA_MODIFIABLE; as BoolType),
    attrmap_element!(CKA_COPYABLE; as BoolType),
    attrmap_element!(CKA_DESTROYABLE; as BoolType),
    attrmap_element!(CKA_EC_PARAMS; as BytesType),
    attrmap_element!(CKA_EC_POINT; as BytesType),
    attrmap_element!(CKA_ALWAYS_AUTHENTICATE; as BoolType),
    attrmap_element!(CKA_WRAP_WITH_TRUSTED; as BoolType),
    attrmap_element!(CKA_WRAP_TEMPLATE; as DenyType),
    attrmap_element!(CKA_UNWRAP_TEMPLATE; as DenyType),
    attrmap_element!(CKA_DERIVE_TEMPLATE; as DenyType),
    attrmap_element!(CKA_ALLOWED_MECHANISMS; as UlongArrayType),
];

/// A Rust native, typed attribute that holds the attribute value
#[derive(Debug, Clone)]
pub struct Attribute {
    ck_type: CK_ULONG,
    attrtype: AttrType,
    value: Vec<u8>,
}

impl Attribute {
    /// Returns the attribute 'type' which is the attribute ID
    pub fn get_type(&self) -> CK_ULONG {
        self.ck_type
    }

    /// Returns the internal attribute type
    pub fn get_attrtype(&self) -> AttrType {
        self.attrtype
    }

    /// Returns a reference to the internal value
    pub fn get_value(&self) -> &Vec<u8> {
        &self.value
    }

    /// Returns the name of the attribute as an allocated String
    pub fn name(&self) -> String {
        match Attrmap::search_by_id(self.ck_type) {
            Some(a) => a.name.to_string(),
            None => self.ck_type.to_string(),
        }
    }

    /// Returns the internal value as a boolean
    ///
    /// Returns a CKR_ATTRIBUTE_VALUE_INVALID error if the value is
    /// not a boolean
    pub fn to_bool(&self) -> Result<bool> {
        if self.attrtype != AttrType::BoolType {
            return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
        }
        if self.value.len() != 1 {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        Ok(self.value[0] != 0)
    }

    /// Returns the internal value as a CK_ULONG
    ///
    /// Returns a CKR_ATTRIBUTE_VALUE_INVALID error if the value is
    /// not a ulong
    pub fn to_ulong(&self) -> Result<CK_ULONG> {
        if self.attrtype != AttrType::NumType {
            return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
        }
        if self.value.len() != CK_ULONG_SIZE {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        Ok(CK_ULONG::from_ne_bytes(
            self.value.as_slice().try_into().unwrap(),
        ))
    }

    /// Returns the internal value as a String
    ///
    /// Returns a CKR_ATTRIBUTE_VALUE_INVALID error if the value is
    /// not parseable as a string
    pub fn to_string(&self) -> Result<String> {
        if self.attrtype != AttrType::StringType {
            return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
        }
        match std::str::from_utf8(&self.value) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        }
    }

    /// Returns a reference to the internal value wrapped in a Result
    pub fn to_bytes(&self) -> Result<&Vec<u8>> {
        if self.attrtype != AttrType::BytesType {
            return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
        }
        Ok(&self.value)
    }

    /// Returns the internal value as a vector of CK_ULONG values
    ///
    /// Returns a CKR_ATTRIBUTE_VALUE_INVALID error if the value is
    /// not parseable as an array
    pub fn to_ulong_array(&self) -> Result<Vec<CK_ULONG>> {
        if self.attrtype != AttrType::UlongArrayType {
            return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
        }
        if self.value.len() % CK_ULONG_SIZE != 0 {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        let vlen = self.value.len() / CK_ULONG_SIZE;
        let mut v = Vec::<CK_ULONG>::with_capacity(vlen);

        let mut idx = 0;
        while idx < self.value.len() {
            let elem = &self.value[idx..(idx + CK_ULONG_SIZE)];
            idx += CK_ULONG_SIZE;
            v.push(CK_ULONG::from_ne_bytes(elem.try_into()?));
        }
        Ok(v)
    }

    /// Returns the value as an allocated String containing a date
    ///
    /// Returns a CKR_ATTRIBUTE_VALUE_INVALID error if the value is
    /// not parseable as a date
    pub fn to_date_string(&self) -> Result<String> {
        if self.attrtype != AttrType::DateType {
            return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
        }
        if self.value.len() == 0 {
            return Ok(String::new()); /* empty default value */
        }
        if self.value.len() != 8 {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        let chars: [char; 10] = [
            char::from(self.value[0]),
            char::from(self.value[1]),
            char::from(self.value[2]),
            char::from(self.value[3]),
            '-',
            char::from(self.value[4]),
            char::from(self.value[5]),
            '-',
            char::from(self.value[6]),
            char::from(self.value[7]),
        ];
        Ok(chars.iter().collect())
    }

    /// Zeroizes the internal value
    pub fn zeroize(&mut self) {
        zeromem(self.value.as_mut_slice());
    }

    /// Constructs an attribute as a date type
    pub fn from_date_bytes(t: CK_ULONG, val: Vec<u8>) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::DateType,
            value: val,
        }
    }

    /// Constructs an attribute as an ignored type
    pub fn from_ignore(t: CK_ULONG, _val: Option<()>) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::IgnoreType,
            value: Vec::new(),
        }
    }

    /// Creates an attribute of type AttrType::BoolType from a bool
    ///
    /// Note: Does not verify that the attribute id type is correct
    pub fn from_bool(t: CK_ULONG, val: bool) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::BoolType,
            value: Vec::from(if val { &[1u8][..] } else { &[0u8][..] }),
        }
    }

    /// Creates an attribute of type AttrType::NumType from a CK_ULONG
    ///
    /// Note: Does not verify that the attribute id type is correct
    pub fn from_ulong(t: CK_ULONG, val: CK_ULONG) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::NumType,
            value: Vec::from(val.to_ne_bytes()),
        }
    }

    /// Creates an attribute of type AttrType::StringType from a String
    ///
    /// Note: Does not verify that the attribute id type is correct
    pub fn from_string(t: CK_ULONG, val: String) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::StringType,
            value: Vec::from(val.as_bytes()),
        }
    }

    /// Creates an attribute of type AttrType::BytesType from a `Vec<u8>`
    ///
    /// Note: Does not verify that the attribute id type is correct
    pub fn from_bytes(t: CK_ULONG, val: Vec<u8>) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::BytesType,
            value: val,
        }
    }

    /// Creates an attribute of type AttrType::UlongArrayType from a
    /// Vec of CK_ULONG
    ///
    /// Note: Does not verify that the attribute id type is correct
    pub fn from_ulong_array(t: CK_ULONG, val: Vec<CK_ULONG>) -> Attribute {
        let mut v = Vec::<u8>::with_capacity(val.len() * CK_ULONG_SIZE);
        for e in val.iter() {
            v.extend_from_slice(&e.to_ne_bytes());
        }
        Attribute {
            ck_type: t,
            attrtype: AttrType::UlongArrayType,
            value: v,
        }
    }

    /// Decodes a single wire value into a typed Attribute according to
    /// the expected value kind for the attribute id
    fn from_wire(id: CK_ULONG, val: &[u8]) -> Result<Attribute> {
        let atype = match Attrmap::search_by_id(id) {
            Some(a) => a.atype,
            None => return Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
        };
        match atype {
            AttrType::BoolType => {
                if val.len() != 1 {
                    return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
                }
                Ok(Attribute::from_bool(id, val[0] != 0))
            }
            AttrType::NumType => {
                if val.len() != WIRE_NUM_SIZE {
                    return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
                }
                let num = u64::from_le_bytes(val.try_into()?);
                Ok(Attribute::from_ulong(id, CK_ULONG::try_from(num)?))
            }
            AttrType::StringType => match std::str::from_utf8(val) {
                Ok(s) => Ok(Attribute::from_string(id, s.to_string())),
                Err(_) => Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
            },
            AttrType::BytesType => {
                Ok(Attribute::from_bytes(id, val.to_vec()))
            }
            AttrType::UlongArrayType => {
                if val.len() % WIRE_NUM_SIZE != 0 {
                    return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
                }
                let mut v = Vec::<CK_ULONG>::with_capacity(
                    val.len() / WIRE_NUM_SIZE,
                );
                for chunk in val.chunks_exact(WIRE_NUM_SIZE) {
                    let num = u64::from_le_bytes(chunk.try_into()?);
                    v.push(CK_ULONG::try_from(num)?);
                }
                Ok(Attribute::from_ulong_array(id, v))
            }
            AttrType::DateType => {
                if val.len() != 0 && val.len() != 8 {
                    return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
                }
                Ok(Attribute::from_date_bytes(id, val.to_vec()))
            }
            AttrType::DenyType => Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
            AttrType::IgnoreType => Ok(Attribute::from_ignore(id, None)),
        }
    }
}

/// Parses a serialized client template into a list of typed attributes.
///
/// The wire format is a sequence of records, each carrying the attribute
/// id as a 32 bit little endian integer, the value length as a 32 bit
/// little endian integer, and the raw value bytes. Numeric values are
/// carried as 64 bit little endian integers regardless of the platform
/// word size.
///
/// Truncated buffers and duplicated attribute ids are rejected with
/// CKR_TEMPLATE_INCONSISTENT, unknown ids with
/// CKR_ATTRIBUTE_TYPE_INVALID and malformed values with
/// CKR_ATTRIBUTE_VALUE_INVALID.
pub fn parse_template(template: &[u8]) -> Result<Vec<Attribute>> {
    let mut attrs = Vec::<Attribute>::new();
    let mut cursor: usize = 0;

    while cursor < template.len() {
        if template.len() - cursor < 8 {
            return Err(Error::ck_rv_with_errmsg(
                CKR_TEMPLATE_INCONSISTENT,
                "truncated attribute header".to_string(),
            ));
        }
        let id = u32::from_le_bytes(template[cursor..cursor + 4].try_into()?);
        let len = usize::try_from(u32::from_le_bytes(
            template[cursor + 4..cursor + 8].try_into()?,
        ))?;
        cursor += 8;
        if template.len() - cursor < len {
            return Err(Error::ck_rv_with_errmsg(
                CKR_TEMPLATE_INCONSISTENT,
                "truncated attribute value".to_string(),
            ));
        }
        let attr = Attribute::from_wire(
            CK_ULONG::from(id),
            &template[cursor..cursor + len],
        )?;
        cursor += len;

        if attrs.iter().any(|a| a.get_type() == attr.get_type()) {
            return Err(Error::ck_rv_with_errmsg(
                CKR_TEMPLATE_INCONSISTENT,
                format!("duplicate attribute {}", attr.name()),
            ));
        }
        attrs.push(attr);
    }
    Ok(attrs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Test helper that encodes one wire record
    pub(crate) fn wire_attr(id: CK_ULONG, val: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&u32::try_from(id).unwrap().to_le_bytes());
        v.extend_from_slice(&u32::try_from(val.len()).unwrap().to_le_bytes());
        v.extend_from_slice(val);
        v
    }

    /// Test helper that encodes a wire bool record
    pub(crate) fn wire_bool(id: CK_ULONG, val: bool) -> Vec<u8> {
        wire_attr(id, if val { &[1u8] } else { &[0u8] })
    }

    /// Test helper that encodes a wire num record
    pub(crate) fn wire_num(id: CK_ULONG, val: u64) -> Vec<u8> {
        wire_attr(id, &val.to_le_bytes())
    }

    #[test]
    fn check_order_of_attrmap() {
        let mut copy = ATTRMAP.clone();
        copy.sort();
        assert_eq!(ATTRMAP, copy);
    }

    #[test]
    fn parse_simple_template() {
        let mut t = Vec::new();
        t.extend(wire_num(CKA_CLASS, u64::try_from(CKO_SECRET_KEY).unwrap()));
        t.extend(wire_num(CKA_KEY_TYPE, u64::try_from(CKK_AES).unwrap()));
        t.extend(wire_bool(CKA_ENCRYPT, true));
        t.extend(wire_attr(CKA_VALUE, &[0u8; 16]));

        let attrs = parse_template(&t).unwrap();
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs[0].to_ulong().unwrap(), CKO_SECRET_KEY);
        assert_eq!(attrs[2].to_bool().unwrap(), true);
        assert_eq!(attrs[3].to_bytes().unwrap().len(), 16);
    }

    #[test]
    fn parse_rejects_duplicates() {
        let mut t = Vec::new();
        t.extend(wire_bool(CKA_ENCRYPT, true));
        t.extend(wire_bool(CKA_ENCRYPT, false));
        let e = parse_template(&t).unwrap_err();
        assert_eq!(e.rv(), CKR_TEMPLATE_INCONSISTENT);
    }

    #[test]
    fn parse_rejects_truncated() {
        let mut t = wire_attr(CKA_VALUE, &[0u8; 16]);
        t.truncate(t.len() - 1);
        let e = parse_template(&t).unwrap_err();
        assert_eq!(e.rv(), CKR_TEMPLATE_INCONSISTENT);
    }

    #[test]
    fn parse_rejects_unknown_and_denied() {
        let t = wire_bool(CKA_VENDOR_DEFINED + 99, true);
        let e = parse_template(&t).unwrap_err();
        assert_eq!(e.rv(), CKR_ATTRIBUTE_TYPE_INVALID);

        let t = wire_attr(CKA_WRAP_TEMPLATE, &[]);
        let e = parse_template(&t).unwrap_err();
        assert_eq!(e.rv(), CKR_ATTRIBUTE_TYPE_INVALID);
    }

    #[test]
    fn parse_rejects_malformed_bool() {
        let t = wire_attr(CKA_ENCRYPT, &[1u8, 0u8]);
        let e = parse_template(&t).unwrap_err();
        assert_eq!(e.rv(), CKR_ATTRIBUTE_VALUE_INVALID);
    }

    #[test]
    fn date_attribute_roundtrip() {
        let attrs =
            parse_template(&wire_attr(CKA_START_DATE, b"20250102")).unwrap();
        assert_eq!(attrs[0].to_date_string().unwrap(), "2025-01-02");
        let attrs = parse_template(&wire_attr(CKA_END_DATE, b"")).unwrap();
        assert_eq!(attrs[0].to_date_string().unwrap(), "");
    }
}
