use crate::{
    EnumType, InterfaceType, NamedType, ObjectType, ScalarType, Schema, SchemaError, Type, TypeRef,
    UnionType,
};
use std::collections::HashMap;

/// Programmatic schema construction. The textual schema loader is an
/// external collaborator; tests and embedders assemble schemas here.
///
/// The five built-in scalars are pre-seeded.
pub struct SchemaBuilder {
    types: Vec<NamedType>,
    query_root: Option<String>,
    mutation_root: Option<String>,
    subscription_root: Option<String>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        let types = ["Int", "Float", "String", "Boolean", "ID"]
            .into_iter()
            .map(|name| NamedType::Scalar(ScalarType { name: name.to_owned() }))
            .collect();

        SchemaBuilder {
            types,
            query_root: None,
            mutation_root: None,
            subscription_root: None,
        }
    }

    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.types.push(NamedType::Scalar(ScalarType { name: name.into() }));
        self
    }

    pub fn enum_type(mut self, e: EnumType) -> Self {
        self.types.push(NamedType::Enum(e));
        self
    }

    pub fn object(mut self, o: ObjectType) -> Self {
        self.types.push(NamedType::Object(o));
        self
    }

    pub fn interface(mut self, i: InterfaceType) -> Self {
        self.types.push(NamedType::Interface(i));
        self
    }

    pub fn union(mut self, u: UnionType) -> Self {
        self.types.push(NamedType::Union(u));
        self
    }

    pub fn query_root(mut self, name: impl Into<String>) -> Self {
        self.query_root = Some(name.into());
        self
    }

    pub fn mutation_root(mut self, name: impl Into<String>) -> Self {
        self.mutation_root = Some(name.into());
        self
    }

    pub fn subscription_root(mut self, name: impl Into<String>) -> Self {
        self.subscription_root = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut index = HashMap::with_capacity(self.types.len());
        for (i, tpe) in self.types.iter().enumerate() {
            if index.insert(tpe.name().to_owned(), i).is_some() {
                return Err(SchemaError::DuplicateType(tpe.name().to_owned()));
            }
        }

        let defined = |tref: &TypeRef| -> Result<(), SchemaError> {
            if index.contains_key(tref.name()) {
                Ok(())
            } else {
                Err(SchemaError::UndefinedType(tref.name().to_owned()))
            }
        };
        let defined_in = |ty: &Type| defined(ty.underlying());

        for tpe in &self.types {
            match tpe {
                NamedType::Object(o) => {
                    for field in &o.fields {
                        defined_in(&field.ty)?;
                        for arg in &field.arguments {
                            defined_in(&arg.ty)?;
                        }
                    }
                    for interface in &o.interfaces {
                        defined(interface)?;
                    }
                }
                NamedType::Interface(i) => {
                    for field in &i.fields {
                        defined_in(&field.ty)?;
                        for arg in &field.arguments {
                            defined_in(&arg.ty)?;
                        }
                    }
                }
                NamedType::Union(u) => {
                    for member in &u.members {
                        defined(member)?;
                    }
                }
                NamedType::Scalar(_) | NamedType::Enum(_) => {}
            }
        }

        let root = |name: Option<String>| -> Result<Option<TypeRef>, SchemaError> {
            match name {
                None => Ok(None),
                Some(name) => {
                    let tref = TypeRef::new(&name);
                    defined(&tref)?;
                    Ok(Some(tref))
                }
            }
        };

        let query_root = root(self.query_root)?.ok_or(SchemaError::MissingQueryRoot)?;
        let mutation_root = root(self.mutation_root)?;
        let subscription_root = root(self.subscription_root)?;

        Ok(Schema {
            types: self.types,
            index,
            query_root,
            mutation_root,
            subscription_root,
        })
    }
}
