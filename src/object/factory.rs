// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! The default & template resolver. Every object creation workflow
//! enters here: a serialized client template is parsed, merged with the
//! per class defaults and, for derivation and unwrapping, with values
//! inherited from the parent object, producing a complete and
//! internally consistent attribute list or failing the request.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::LazyLock;

use crate::attribute::{parse_template, AttrType, Attribute};
use crate::error::{Error, Result};
use crate::mechanism::{mechanisms, ProcessingFunc};
use crate::pkcs11::*;

use super::key::{
    PrivKeyFactory, PubKeyFactory, SecretKeyFactory, AES_KEY_SIZES,
    DES3_KEY_SIZES,
};
use super::Object;

use bitflags::bitflags;
use log::debug;

/// Helper to map missing-attribute errors to CKR_TEMPLATE_INCOMPLETE
pub fn incomplete(e: Error) -> Error {
    if e.attr_not_found() {
        Error::ck_rv(CKR_TEMPLATE_INCOMPLETE)
    } else {
        e
    }
}

bitflags! {
    /// A bitflag set that defines attribute properties and behaviors
    #[derive(Debug, Clone, Copy)]
    pub struct OAFlags: u32 {
        /// the attribute is ignored and not copied from a template
        const Ignored              = 0x00000001;

        /// The attribute is sensitive and will not be returned by a call
        /// unless specifically authorized (like a key secret value)
        const Sensitive            = 0x00000002;

        /// The attribute has a default value that can be set when it is
        /// required on object creation but not provided by a template
        const Defval               = 0x00000004;

        /// The attribute must be provided in the template on object
        /// creation or the operation will fail
        const RequiredOnCreate     = 0x00000008;

        /// The attribute must be provided in the template on key
        /// generation or the operation will fail
        const RequiredOnGenerate   = 0x00000010;

        /// The attribute is always required or the operation will fail,
        /// however combined with Defval it means it will be generated
        /// automatically when absent from the template and will not
        /// cause the operation to fail
        const AlwaysRequired       = 0x00000020;

        /// The attribute can only be set in a template for create
        /// (import) operations, if set for any other operation (copy,
        /// generate, wrap, derive) it will cause a failure
        const SettableOnlyOnCreate = 0x00000080;

        /// This attribute can never be set in a template, if set the
        /// operation will fail (they are only ever set by internal
        /// functions)
        const NeverSettable        = 0x00000100;

        /// The attribute cannot be changed once set (enforced from
        /// changing via the modify or copy operations)
        const Unchangeable         = 0x00000400;

        /// The attribute can only be changed from `True` to `False`
        const ChangeToFalse        = 0x00000C00;

        /// The attribute can only be changed from `False` to `True`
        const ChangeToTrue         = 0x00001400;

        /// The attribute can be changed only during a Copy Operation
        const ChangeOnCopy         = 0x00002400;
    }
}

/// This object is used to list the attributes that are allowed for
/// specific object types and also can define what if any their default
/// value is and what operations can be done on them by applications.
#[derive(Debug, Clone)]
pub struct ObjectAttr {
    /// The reference attribute, may contain a default value
    pub(crate) attribute: Attribute,
    /// The flags that define the attribute properties for the object
    /// class this ObjectAttr is applied to
    flags: OAFlags,
}

impl ObjectAttr {
    /// Creates a new ObjectAttr
    pub fn new(a: Attribute, f: OAFlags) -> ObjectAttr {
        ObjectAttr {
            attribute: a,
            flags: f,
        }
    }

    /// Gets the internal attribute id (type)
    pub fn get_type(&self) -> CK_ULONG {
        self.attribute.get_type()
    }

    /// Check if a specific flag is present on the ObjectAttr
    pub fn is(&self, val: OAFlags) -> bool {
        if val.is_empty() {
            return false;
        }
        self.flags.contains(val)
    }

    /// Check if any of the given flags is present on the ObjectAttr
    pub fn is_any(&self, val: OAFlags) -> bool {
        self.flags.intersects(val)
    }

    /// Checks if the ObjectAttr has a default value
    pub fn has_default(&self) -> bool {
        self.flags.contains(OAFlags::Defval)
    }
}

/// Helper to quickly instantiate an ObjectAttr element
#[macro_export]
macro_rules! attr_element {
    ($id:expr; $flags:expr; $from_type:expr; val $defval:expr) => {
        $crate::object::factory::ObjectAttr::new(
            $from_type($id, $defval),
            $flags,
        )
    };
}
pub use attr_element;

/// The explicit creation case driving the resolver, selected by the
/// caller. Each case carries the processing function that triggered the
/// creation and, for derivation and unwrapping, the parent object.
#[derive(Clone, Copy, Debug)]
pub enum CreationCase<'a> {
    /// The secret value will be produced locally from random data
    /// (generate and generate-pair operations)
    FromRandom(ProcessingFunc),
    /// The value is supplied verbatim by the client (import)
    FromClearData,
    /// The object is produced from a parent object (derive, unwrap)
    FromParent(ProcessingFunc, &'a Object),
}

/// Holds the attribute compliance table and the class of the objects
/// produced by one factory
#[derive(Debug)]
pub struct ObjectFactoryData {
    /// Class of the object created by the factory
    class: CK_OBJECT_CLASS,
    /// List of valid attributes and their properties for this factory
    attributes: Vec<ObjectAttr>,
    /// List of attributes considered sensitive
    sensitive: Vec<CK_ATTRIBUTE_TYPE>,
    /// Flag that indicates this factory data has been finalized and
    /// cannot be further modified
    finalized: bool,
}

impl ObjectFactoryData {
    /// Creates a new, empty factory data object
    pub fn new(class: CK_OBJECT_CLASS) -> ObjectFactoryData {
        ObjectFactoryData {
            class: class,
            attributes: Vec::new(),
            sensitive: Vec::new(),
            finalized: false,
        }
    }

    /// Return the class of the object created by the factory
    pub fn get_class(&self) -> CK_OBJECT_CLASS {
        self.class
    }

    /// Returns a reference to factory valid attributes and their
    /// properties
    pub fn get_attributes(&self) -> &Vec<ObjectAttr> {
        &self.attributes
    }

    /// Returns a mutable reference to factory valid attributes and
    /// their properties
    ///
    /// This method panics if it is called after the factory data has
    /// been finalized.
    pub fn get_attributes_mut(&mut self) -> &mut Vec<ObjectAttr> {
        if self.finalized {
            panic!("Attempted modification after finalization");
        }
        &mut self.attributes
    }

    /// Get the list of sensitive attributes
    ///
    /// Empty until the factory data is finalized
    pub fn get_sensitive(&self) -> &Vec<CK_ATTRIBUTE_TYPE> {
        &self.sensitive
    }

    /// Finalizes the factory data and populates the sensitive list
    pub fn finalize(&mut self) {
        for a in &self.attributes {
            if a.is(OAFlags::Sensitive) {
                self.sensitive.push(a.get_type());
            }
        }
        self.finalized = true;
    }
}

/// This trait is implemented by all object factories. A factory is
/// responsible for defining what the allowed attributes for its object
/// class are, and for resolving templates into complete attribute lists
/// for the creation cases the class supports.
pub trait ObjectFactory: Debug + Send + Sync {
    /// Resolves a parsed template into a complete object for the given
    /// creation case.
    ///
    /// The default implementation only supports creation from clear
    /// data, which is all non-key objects allow.
    fn create(
        &self,
        case: CreationCase,
        template: &[Attribute],
    ) -> Result<Object> {
        match case {
            CreationCase::FromClearData => {
                self.default_object_create(template)
            }
            _ => Err(CKR_TEMPLATE_INCONSISTENT)?,
        }
    }

    /// Adds the common object attributes defined in spec
    fn add_common_object_attrs(&mut self) {
        let attrs = self.get_data_mut().get_attributes_mut();
        attrs.push(attr_element!(
            CKA_CLASS; OAFlags::RequiredOnCreate;
            Attribute::from_ulong; val 0));
        attrs.push(attr_element!(
            CKA_UNIQUE_ID; OAFlags::NeverSettable | OAFlags::Unchangeable;
            Attribute::from_string; val String::new()));
    }

    /// Adds the storage object attributes defined in the spec
    fn add_common_storage_attrs(&mut self, private: bool) {
        self.add_common_object_attrs();
        let attrs = self.get_data_mut().get_attributes_mut();
        attrs.push(attr_element!(
            CKA_TOKEN; OAFlags::Defval | OAFlags::ChangeOnCopy;
            Attribute::from_bool; val false));
        attrs.push(attr_element!(
            CKA_PRIVATE; OAFlags::Defval | OAFlags::ChangeOnCopy;
            Attribute::from_bool; val private));
        attrs.push(attr_element!(
            CKA_MODIFIABLE; OAFlags::Defval | OAFlags::ChangeOnCopy;
            Attribute::from_bool; val true));
        attrs.push(attr_element!(
            CKA_LABEL; OAFlags::empty(); Attribute::from_string;
            val String::new()));
        attrs.push(attr_element!(
            CKA_COPYABLE; OAFlags::Defval | OAFlags::ChangeToFalse;
            Attribute::from_bool; val true));
        attrs.push(attr_element!(
            CKA_DESTROYABLE; OAFlags::Defval; Attribute::from_bool;
            val true));
    }

    /// This function implements the creation/import/derivation of any
    /// object type and encodes common rules to interpret the list of
    /// ObjectAttr for the object.
    ///
    /// The unacceptable_flags argument defines what attributes can't be
    /// set by the template for the calling creation case.
    ///
    /// The required_flags argument defines what attributes must be
    /// provided in the template by the calling creation case.
    ///
    /// This function should not be overridden by specialized factories.
    fn internal_object_create(
        &self,
        template: &[Attribute],
        unacceptable_flags: OAFlags,
        required_flags: OAFlags,
    ) -> Result<Object> {
        let data = self.get_data();
        let mut obj = Object::new(data.get_class());

        let attributes = data.get_attributes();
        for attr in template {
            match attributes.iter().find(|a| a.get_type() == attr.get_type())
            {
                Some(oa) => {
                    if oa.is_any(unacceptable_flags) {
                        debug!(
                            "attribute {} not acceptable for this operation",
                            attr.name()
                        );
                        return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
                    }
                    /* the class attribute is pre-populated on the new
                     * object, only check consistency here */
                    if attr.get_type() == CKA_CLASS {
                        if attr.to_ulong()? != obj.get_class() {
                            return Err(CKR_TEMPLATE_INCONSISTENT)?;
                        }
                        continue;
                    }
                    if !oa.is(OAFlags::Ignored) {
                        obj.attributes.push(attr.clone());
                    }
                }
                None => {
                    debug!("attribute {} invalid for class", attr.name());
                    return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
                }
            }
        }
        for oa in attributes {
            match obj.get_attr(oa.get_type()) {
                Some(_) => (),
                None => {
                    if oa.has_default() {
                        obj.attributes.push(oa.attribute.clone());
                    } else if oa.is(required_flags)
                        || oa.is(OAFlags::AlwaysRequired)
                    {
                        debug!(
                            "mandatory attribute {} missing",
                            oa.attribute.name()
                        );
                        return Err(CKR_TEMPLATE_INCOMPLETE)?;
                    }
                }
            }
        }
        Ok(obj)
    }

    /// Default object creation from clear data
    fn default_object_create(
        &self,
        template: &[Attribute],
    ) -> Result<Object> {
        let mut obj = self.internal_object_create(
            template,
            OAFlags::NeverSettable,
            OAFlags::RequiredOnCreate,
        )?;
        obj.generate_unique();
        Ok(obj)
    }

    /// Helper to copy objects that respects the semantics and
    /// restrictions defined in the PKCS#11 specification.
    fn default_copy(
        &self,
        origin: &Object,
        template: &[Attribute],
    ) -> Result<Object> {
        let attributes = self.get_data().get_attributes();
        for attr in template {
            match attributes.iter().find(|a| a.get_type() == attr.get_type())
            {
                Some(oa) => {
                    if oa.is(OAFlags::Unchangeable) {
                        if oa.is(OAFlags::ChangeToFalse | OAFlags::ChangeToTrue)
                        {
                            let val = match origin
                                .get_attr_as_bool(attr.get_type())
                            {
                                Ok(a) => a,
                                Err(_) => false,
                            };
                            if val && !oa.is(OAFlags::ChangeToFalse) {
                                return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                            }
                            if !val && !oa.is(OAFlags::ChangeToTrue) {
                                return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                            }
                        }
                        if !oa.is(OAFlags::ChangeOnCopy) {
                            return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                        }
                    }
                }
                None => return Err(CKR_TEMPLATE_INCONSISTENT)?,
            }
        }

        let mut obj = origin.blind_copy()?;
        for attr in template {
            obj.set_attr(attr.clone())?;
        }

        /* special attrs handling */
        match obj.get_attr_as_bool(CKA_EXTRACTABLE) {
            Ok(e) => {
                let mut val = !e;
                match origin.get_attr_as_bool(CKA_NEVER_EXTRACTABLE) {
                    Ok(ne) => val &= ne,
                    Err(_) => match origin.get_attr_as_bool(CKA_EXTRACTABLE) {
                        Ok(oe) => val &= !oe,
                        Err(_) => val = false,
                    },
                }
                obj.set_attr(Attribute::from_bool(
                    CKA_NEVER_EXTRACTABLE,
                    val,
                ))?;
            }
            Err(_) => (),
        }
        match obj.get_attr_as_bool(CKA_SENSITIVE) {
            Ok(b) => {
                let mut val = b;
                match origin.get_attr_as_bool(CKA_ALWAYS_SENSITIVE) {
                    Ok(ob) => val &= ob,
                    Err(_) => match origin.get_attr_as_bool(CKA_SENSITIVE) {
                        Ok(os) => val &= os,
                        Err(_) => val = false,
                    },
                }
                obj.set_attr(Attribute::from_bool(
                    CKA_ALWAYS_SENSITIVE,
                    val,
                ))?;
            }
            Err(_) => (),
        }

        Ok(obj)
    }

    /// Helper function to check if the attributes specified in the
    /// template can be modified according to the rules for the specific
    /// object class. If an attribute provided in the template cannot be
    /// changed an appropriate error is returned.
    fn check_set_attributes(&self, template: &[Attribute]) -> Result<()> {
        let attrs = self.get_data().get_attributes();
        for attr in template {
            match attrs.iter().find(|a| a.get_type() == attr.get_type()) {
                None => return Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
                Some(oa) => {
                    if oa.is(OAFlags::NeverSettable) {
                        return Err(CKR_ACTION_PROHIBITED)?;
                    }
                    if oa.is(OAFlags::Unchangeable) {
                        if oa.attribute.get_attrtype() == AttrType::BoolType {
                            let val = attr.to_bool()?;
                            if val {
                                if !oa.is(OAFlags::ChangeToTrue) {
                                    return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                                }
                            } else {
                                if !oa.is(OAFlags::ChangeToFalse) {
                                    return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                                }
                            }
                        } else {
                            return Err(CKR_ATTRIBUTE_READ_ONLY)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Helper function to change the attributes of an existing object.
    /// Performs the necessary checks required to permit object
    /// modification and returns an error if any check fails before any
    /// attribute is modified.
    fn set_object_attributes(
        &self,
        obj: &mut Object,
        template: &[Attribute],
    ) -> Result<()> {
        if !obj.is_modifiable() {
            return Err(CKR_ACTION_PROHIBITED)?;
        }

        /* first check that all attributes can be changed */
        self.check_set_attributes(template)?;

        /* if checks clear out, apply changes */
        for attr in template {
            obj.set_attr(attr.clone())?;
        }

        Ok(())
    }

    /// Helper method to get a reference to the ObjectFactoryData
    fn get_data(&self) -> &ObjectFactoryData;

    /// Helper method to get a mutable reference to the ObjectFactoryData
    fn get_data_mut(&mut self) -> &mut ObjectFactoryData;
}

/// This is a specialized factory for objects of class CKO_DATA
#[derive(Debug)]
struct DataFactory {
    data: ObjectFactoryData,
}

impl DataFactory {
    /// Initializes a new DataFactory object
    fn new() -> DataFactory {
        let mut factory: DataFactory = DataFactory {
            data: ObjectFactoryData::new(CKO_DATA),
        };

        factory.add_common_storage_attrs(false);

        let attributes = factory.data.get_attributes_mut();

        attributes.push(attr_element!(
            CKA_APPLICATION; OAFlags::Defval; Attribute::from_string;
            val String::new()));
        attributes.push(attr_element!(
            CKA_OBJECT_ID; OAFlags::empty(); Attribute::from_bytes;
            val Vec::new()));
        attributes.push(attr_element!(
            CKA_VALUE; OAFlags::Defval; Attribute::from_bytes;
            val Vec::new()));

        factory.data.finalize();

        factory
    }
}

impl ObjectFactory for DataFactory {
    fn get_data(&self) -> &ObjectFactoryData {
        &self.data
    }

    fn get_data_mut(&mut self) -> &mut ObjectFactoryData {
        &mut self.data
    }
}

/// This is a specialized factory for X.509 certificate objects
#[derive(Debug)]
struct X509Factory {
    data: ObjectFactoryData,
}

impl X509Factory {
    /// Initializes a new X509Factory object
    fn new() -> X509Factory {
        let mut factory: X509Factory = X509Factory {
            data: ObjectFactoryData::new(CKO_CERTIFICATE),
        };

        factory.add_common_storage_attrs(false);

        let attributes = factory.data.get_attributes_mut();

        attributes.push(attr_element!(
            CKA_CERTIFICATE_TYPE; OAFlags::AlwaysRequired | OAFlags::Defval
            | OAFlags::Unchangeable; Attribute::from_ulong; val CKC_X_509));
        attributes.push(attr_element!(
            CKA_CERTIFICATE_CATEGORY; OAFlags::Defval;
            Attribute::from_ulong; val 0));
        attributes.push(attr_element!(
            CKA_TRUSTED; OAFlags::Defval; Attribute::from_bool; val false));
        attributes.push(attr_element!(
            CKA_CHECK_VALUE; OAFlags::Ignored; Attribute::from_ignore;
            val None));
        attributes.push(attr_element!(
            CKA_SUBJECT; OAFlags::RequiredOnCreate | OAFlags::Unchangeable;
            Attribute::from_bytes; val Vec::new()));
        attributes.push(attr_element!(
            CKA_ISSUER; OAFlags::Defval; Attribute::from_bytes;
            val Vec::new()));
        attributes.push(attr_element!(
            CKA_SERIAL_NUMBER; OAFlags::Defval; Attribute::from_bytes;
            val Vec::new()));
        attributes.push(attr_element!(
            CKA_ID; OAFlags::empty(); Attribute::from_bytes;
            val Vec::new()));
        attributes.push(attr_element!(
            CKA_START_DATE; OAFlags::Defval; Attribute::from_date_bytes;
            val Vec::new()));
        attributes.push(attr_element!(
            CKA_END_DATE; OAFlags::Defval; Attribute::from_date_bytes;
            val Vec::new()));
        attributes.push(attr_element!(
            CKA_VALUE; OAFlags::RequiredOnCreate | OAFlags::Unchangeable;
            Attribute::from_bytes; val Vec::new()));
        attributes.push(attr_element!(
            CKA_PUBLIC_KEY_INFO; OAFlags::empty(); Attribute::from_bytes;
            val Vec::new()));

        factory.data.finalize();

        factory
    }
}

impl ObjectFactory for X509Factory {
    fn get_data(&self) -> &ObjectFactoryData {
        &self.data
    }

    fn get_data_mut(&mut self) -> &mut ObjectFactoryData {
        &mut self.data
    }
}

/// Structure that defines an Object Type
///
/// Holds a Class type and the underlying type.
///
/// For object classes that have no underlying type `type_` is set to 0.
#[derive(Debug, Eq, Hash, PartialEq)]
pub struct ObjectType {
    class: CK_ULONG,
    type_: CK_ULONG,
}

impl ObjectType {
    /// Initializes and returns a new ObjectType
    pub fn new(class: CK_ULONG, type_: CK_ULONG) -> ObjectType {
        ObjectType {
            class: class,
            type_: type_,
        }
    }
}

/// This structure holds all of the registered object factories for
/// the implemented object types.
///
/// It provides accessors to find and retrieve object factories.
#[derive(Debug)]
pub struct ObjectFactories {
    factories: HashMap<ObjectType, Box<dyn ObjectFactory>>,
}

impl ObjectFactories {
    /// Creates the registry with all the supported object factories
    pub fn new() -> ObjectFactories {
        let mut f = ObjectFactories {
            factories: HashMap::new(),
        };
        f.add_factory(
            ObjectType::new(CKO_DATA, 0),
            Box::new(DataFactory::new()),
        );
        f.add_factory(
            ObjectType::new(CKO_CERTIFICATE, CKC_X_509),
            Box::new(X509Factory::new()),
        );
        for kt in [
            CKK_GENERIC_SECRET,
            CKK_AES,
            CKK_DES3,
            CKK_SHA_1_HMAC,
            CKK_SHA224_HMAC,
            CKK_SHA256_HMAC,
            CKK_SHA384_HMAC,
            CKK_SHA512_HMAC,
        ] {
            let sizes = match kt {
                CKK_AES => Some(AES_KEY_SIZES),
                CKK_DES3 => Some(DES3_KEY_SIZES),
                _ => None,
            };
            f.add_factory(
                ObjectType::new(CKO_SECRET_KEY, kt),
                Box::new(SecretKeyFactory::new(kt, sizes)),
            );
        }
        for kt in [CKK_RSA, CKK_EC] {
            f.add_factory(
                ObjectType::new(CKO_PUBLIC_KEY, kt),
                Box::new(PubKeyFactory::new(kt)),
            );
            f.add_factory(
                ObjectType::new(CKO_PRIVATE_KEY, kt),
                Box::new(PrivKeyFactory::new(kt)),
            );
        }
        f
    }

    /// Adds a factory to the registry
    pub fn add_factory(
        &mut self,
        otype: ObjectType,
        factory: Box<dyn ObjectFactory>,
    ) {
        self.factories.insert(otype, factory);
    }

    /// Retrieves a factory for the specified object type from the
    /// registry
    pub fn get_factory(
        &self,
        otype: ObjectType,
    ) -> Result<&dyn ObjectFactory> {
        match self.factories.get(&otype) {
            Some(b) => Ok(b.as_ref()),
            None => Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        }
    }

    /// Returns the object factory associated to the specified object
    pub fn get_object_factory(
        &self,
        obj: &Object,
    ) -> Result<&dyn ObjectFactory> {
        let class = obj.get_attr_as_ulong(CKA_CLASS)?;
        let type_ = match class {
            CKO_CERTIFICATE => obj.get_attr_as_ulong(CKA_CERTIFICATE_TYPE)?,
            CKO_PUBLIC_KEY | CKO_PRIVATE_KEY | CKO_SECRET_KEY => {
                obj.get_attr_as_ulong(CKA_KEY_TYPE)?
            }
            _ => 0,
        };
        self.get_factory(ObjectType::new(class, type_))
    }
}

/// The process-wide factories registry, immutable after initialization
static FACTORIES: LazyLock<ObjectFactories> =
    LazyLock::new(|| ObjectFactories::new());

/// Returns a reference to the process-wide factories registry
pub fn object_factories() -> &'static ObjectFactories {
    &FACTORIES
}

/// Resolves the class and underlying type of the object described by a
/// template, consulting the mechanism defaults and the parent object
/// when the template is silent.
fn resolve_object_type(
    template: &[Attribute],
    mech: CK_MECHANISM_TYPE,
    case: &CreationCase,
) -> Result<(CK_OBJECT_CLASS, CK_ULONG)> {
    let mech_defaults = match case {
        CreationCase::FromClearData => None,
        _ => match mechanisms().get(mech) {
            Ok(m) => Some((m.default_class(), m.default_key_type())),
            Err(e) => return Err(e),
        },
    };

    let class = match template.iter().find(|a| a.get_type() == CKA_CLASS) {
        Some(a) => a.to_ulong()?,
        None => match mech_defaults {
            Some((Some(c), _)) => c,
            _ => return Err(CKR_TEMPLATE_INCOMPLETE)?,
        },
    };

    let type_ = match class {
        CKO_DATA => 0,
        CKO_CERTIFICATE => {
            match template
                .iter()
                .find(|a| a.get_type() == CKA_CERTIFICATE_TYPE)
            {
                Some(a) => a.to_ulong()?,
                None => return Err(CKR_TEMPLATE_INCOMPLETE)?,
            }
        }
        CKO_PUBLIC_KEY | CKO_PRIVATE_KEY | CKO_SECRET_KEY => {
            match template.iter().find(|a| a.get_type() == CKA_KEY_TYPE) {
                Some(a) => a.to_ulong()?,
                None => {
                    /* inheritance from a parent of the same class takes
                     * precedence over the mechanism default */
                    if let CreationCase::FromParent(_, parent) = case {
                        if parent.get_class() == class {
                            if let Ok(kt) =
                                parent.get_attr_as_ulong(CKA_KEY_TYPE)
                            {
                                return Ok((class, kt));
                            }
                        }
                    }
                    match mech_defaults {
                        Some((_, Some(kt))) => kt,
                        _ => return Err(CKR_TEMPLATE_INCOMPLETE)?,
                    }
                }
            }
        }
        _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
    };

    Ok((class, type_))
}

/// Entry point for every object creation workflow.
///
/// Parses the serialized client template, determines the applicable
/// object factory, merges defaults and parent-derived values and
/// returns a complete, exclusively owned attribute list.
///
/// The mechanism is consulted for class/key-type defaults and recorded
/// as the key generation mechanism; creation from clear data carries no
/// mechanism and callers pass CK_UNAVAILABLE_INFORMATION.
pub fn create_attributes_from_template(
    template: &[u8],
    mech: CK_MECHANISM_TYPE,
    case: CreationCase,
) -> Result<Object> {
    let mut attrs = parse_template(template)?;

    let (class, type_) = resolve_object_type(&attrs, mech, &case)?;

    /* make the resolved class/type part of the candidate list so the
     * factory table checks apply to them as well */
    if !attrs.iter().any(|a| a.get_type() == CKA_CLASS) {
        attrs.push(Attribute::from_ulong(CKA_CLASS, class));
    }
    match class {
        CKO_PUBLIC_KEY | CKO_PRIVATE_KEY | CKO_SECRET_KEY => {
            if !attrs.iter().any(|a| a.get_type() == CKA_KEY_TYPE) {
                attrs.push(Attribute::from_ulong(CKA_KEY_TYPE, type_));
            }
        }
        _ => (),
    }

    let factory =
        object_factories().get_factory(ObjectType::new(class, type_))?;

    let mut obj = factory.create(case, &attrs)?;

    if let CreationCase::FromRandom(_) = case {
        obj.set_attr(Attribute::from_ulong(CKA_KEY_GEN_MECHANISM, mech))?;
    }

    Ok(obj)
}

/// Copies an object applying the copy template, honoring the
/// per-attribute mutability rules of the object's class
pub fn copy_object(origin: &Object, template: &[u8]) -> Result<Object> {
    if !origin.is_copyable() {
        return Err(CKR_ACTION_PROHIBITED)?;
    }
    let attrs = parse_template(template)?;
    let factory = object_factories().get_object_factory(origin)?;
    factory.default_copy(origin, &attrs)
}

/// Modifies an object's attributes in place; either every change in the
/// template is applied or none is
pub fn modify_object(obj: &mut Object, template: &[u8]) -> Result<()> {
    let attrs = parse_template(template)?;
    let factory = object_factories().get_object_factory(obj)?;
    factory.set_object_attributes(obj, &attrs)
}
