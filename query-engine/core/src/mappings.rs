use schema::TypeRef;
use std::collections::HashMap;
use std::fmt;

/// Nominal identity of an interpreter mapping. Plan trees reference
/// target mappings by name; resolving a name to an actual interpreter is
/// the embedding runtime's concern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MappingRef {
    name: String,
}

impl MappingRef {
    pub fn new(name: impl Into<String>) -> Self {
        MappingRef { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for MappingRef {
    fn from(name: &str) -> Self {
        MappingRef::new(name)
    }
}

impl fmt::Display for MappingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// How the fields of one object type are handled.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldMapping {
    /// The field is served by another interpreter; selections of it are
    /// wrapped in a `Component` boundary during elaboration.
    Delegate { field: String, mapping: MappingRef },

    /// The field is owned by the enclosing interpreter's backend. The
    /// core treats it as opaque.
    Backend { field: String },
}

impl FieldMapping {
    pub fn field(&self) -> &str {
        match self {
            FieldMapping::Delegate { field, .. } => field,
            FieldMapping::Backend { field } => field,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectMapping {
    pub tpe: TypeRef,
    pub field_mappings: Vec<FieldMapping>,
}

impl ObjectMapping {
    pub fn new(tpe: impl Into<TypeRef>) -> Self {
        ObjectMapping {
            tpe: tpe.into(),
            field_mappings: Vec::new(),
        }
    }

    pub fn delegate(mut self, field: impl Into<String>, mapping: impl Into<MappingRef>) -> Self {
        self.field_mappings.push(FieldMapping::Delegate {
            field: field.into(),
            mapping: mapping.into(),
        });
        self
    }

    pub fn backend(mut self, field: impl Into<String>) -> Self {
        self.field_mappings
            .push(FieldMapping::Backend { field: field.into() });
        self
    }
}

/// Delegation lookup used by the component elaborator: which fields, on
/// which types, cross into another interpreter.
#[derive(Debug, Default)]
pub(crate) struct DelegationTable {
    delegates: HashMap<(TypeRef, String), MappingRef>,
}

impl DelegationTable {
    pub(crate) fn from_mappings(mappings: &[ObjectMapping]) -> Self {
        let mut delegates = HashMap::new();
        for mapping in mappings {
            for fm in &mapping.field_mappings {
                if let FieldMapping::Delegate { field, mapping: target } = fm {
                    delegates.insert((mapping.tpe.clone(), field.clone()), target.clone());
                }
            }
        }
        DelegationTable { delegates }
    }

    pub(crate) fn delegate_for(&self, tpe: &TypeRef, field: &str) -> Option<&MappingRef> {
        self.delegates.get(&(tpe.clone(), field.to_owned()))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }
}
