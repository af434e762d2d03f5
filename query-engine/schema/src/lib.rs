#![deny(rust_2018_idioms, unsafe_code)]

//! Schema façade for the query compiler.
//!
//! A [`Schema`] is an arena of named type descriptions plus an index; a
//! [`TypeRef`] is a symbolic reference into it, resolved lazily through
//! the façade so that mutually recursive types never form pointer cycles.
//! Equality of references is nominal.

mod builder;
mod introspection;

pub use builder::SchemaBuilder;
pub use introspection::introspection_schema;

use graph_value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type SchemaRef = Arc<Schema>;

pub const TYPENAME_FIELD: &str = "__typename";
pub const SCHEMA_FIELD: &str = "__schema";
pub const TYPE_FIELD: &str = "__type";

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("duplicate type name '{0}'")]
    DuplicateType(String),

    #[error("type '{0}' is referenced but not defined")]
    UndefinedType(String),

    #[error("schema has no query root")]
    MissingQueryRoot,
}

/// A symbolic, nominally-compared reference to a named schema type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef {
    name: String,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::new(name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The shape of a field or input type: a named reference optionally
/// wrapped in list and non-null markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Named(TypeRef),
    List(Box<Type>),
    NonNull(Box<Type>),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(TypeRef::new(name))
    }

    pub fn list(inner: Type) -> Self {
        Type::List(Box::new(inner))
    }

    pub fn non_null(inner: Type) -> Self {
        Type::NonNull(Box::new(inner))
    }

    /// The innermost named reference.
    pub fn underlying(&self) -> &TypeRef {
        match self {
            Type::Named(tref) => tref,
            Type::List(inner) | Type::NonNull(inner) => inner.underlying(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Type::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            Type::List(_) => true,
            Type::NonNull(inner) => inner.is_list(),
            Type::Named(_) => false,
        }
    }

    /// Strips one leading non-null marker, if present.
    pub fn nullable(&self) -> &Type {
        match self {
            Type::NonNull(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named(tref) => write!(f, "{tref}"),
            Type::List(inner) => write!(f, "[{inner}]"),
            Type::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        };
        f.write_str(s)
    }
}

/// A named argument declared on a schema field.
#[derive(Clone, Debug, PartialEq)]
pub struct InputValue {
    pub name: String,
    pub ty: Type,
    pub default: Option<Value>,
}

impl InputValue {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        InputValue {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub arguments: Vec<InputValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field {
            name: name.into(),
            ty,
            arguments: Vec::new(),
        }
    }

    pub fn argument(mut self, arg: InputValue) -> Self {
        self.arguments.push(arg);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub fields: Vec<Field>,
    pub interfaces: Vec<TypeRef>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectType {
            name: name.into(),
            fields: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn implements(mut self, interface: impl Into<TypeRef>) -> Self {
        self.interfaces.push(interface.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceType {
    pub name: String,
    pub fields: Vec<Field>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceType {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnionType {
    pub name: String,
    pub members: Vec<TypeRef>,
}

impl UnionType {
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = TypeRef>) -> Self {
        UnionType {
            name: name.into(),
            members: members.into_iter().collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = &'static str>) -> Self {
        EnumType {
            name: name.into(),
            values: values.into_iter().map(str::to_owned).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScalarType {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NamedType {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
}

impl NamedType {
    pub fn name(&self) -> &str {
        match self {
            NamedType::Scalar(t) => &t.name,
            NamedType::Enum(t) => &t.name,
            NamedType::Object(t) => &t.name,
            NamedType::Interface(t) => &t.name,
            NamedType::Union(t) => &t.name,
        }
    }

    fn fields(&self) -> Option<&[Field]> {
        match self {
            NamedType::Object(t) => Some(&t.fields),
            NamedType::Interface(t) => Some(&t.fields),
            _ => None,
        }
    }

    fn is_composite(&self) -> bool {
        matches!(
            self,
            NamedType::Object(_) | NamedType::Interface(_) | NamedType::Union(_)
        )
    }
}

/// An immutable schema: the arena of named types and the operation roots.
#[derive(Debug)]
pub struct Schema {
    pub(crate) types: Vec<NamedType>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) query_root: TypeRef,
    pub(crate) mutation_root: Option<TypeRef>,
    pub(crate) subscription_root: Option<TypeRef>,
}

impl Schema {
    /// Resolves a type name to a reference, if the type is defined.
    pub fn lookup_type(&self, name: &str) -> Option<TypeRef> {
        self.index.contains_key(name).then(|| TypeRef::new(name))
    }

    /// The full description behind a reference.
    pub fn type_def(&self, tpe: &TypeRef) -> Option<&NamedType> {
        self.index.get(tpe.name()).map(|&i| &self.types[i])
    }

    /// Looks up a field declaration on an object or interface type.
    /// `__typename` is answered on every composite type.
    pub fn field(&self, tpe: &TypeRef, field: &str) -> Option<Field> {
        let def = self.type_def(tpe)?;
        if field == TYPENAME_FIELD && def.is_composite() {
            return Some(Field::new(
                TYPENAME_FIELD,
                Type::non_null(Type::named("String")),
            ));
        }
        def.fields()?.iter().find(|f| f.name == field).cloned()
    }

    /// The declared result type of a field.
    pub fn field_type(&self, tpe: &TypeRef, field: &str) -> Option<Type> {
        self.field(tpe, field).map(|f| f.ty)
    }

    /// The declared arguments of a field.
    pub fn field_arguments(&self, tpe: &TypeRef, field: &str) -> Option<Vec<InputValue>> {
        self.field(tpe, field).map(|f| f.arguments)
    }

    /// Scalars and enums are leaves: they admit no subselection.
    pub fn is_leaf(&self, tpe: &TypeRef) -> bool {
        matches!(
            self.type_def(tpe),
            Some(NamedType::Scalar(_)) | Some(NamedType::Enum(_))
        )
    }

    /// The concrete object types a value of `tpe` can take at runtime.
    pub fn possible_types(&self, tpe: &TypeRef) -> Vec<TypeRef> {
        match self.type_def(tpe) {
            Some(NamedType::Object(o)) => vec![TypeRef::new(&o.name)],
            Some(NamedType::Union(u)) => u.members.clone(),
            Some(NamedType::Interface(i)) => self
                .types
                .iter()
                .filter_map(|t| match t {
                    NamedType::Object(o) if o.interfaces.iter().any(|x| x.name() == i.name) => {
                        Some(TypeRef::new(&o.name))
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True when a type refinement from `sup` to `sub` can produce values.
    pub fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        sub == sup || self.possible_types(sup).iter().any(|t| t == sub)
    }

    /// The root object type for an operation kind.
    pub fn root_operation(&self, kind: OperationKind) -> Option<TypeRef> {
        match kind {
            OperationKind::Query => Some(self.query_root.clone()),
            OperationKind::Mutation => self.mutation_root.clone(),
            OperationKind::Subscription => self.subscription_root.clone(),
        }
    }

    /// All named types in definition order.
    pub fn types(&self) -> &[NamedType] {
        &self.types
    }

    /// Checks an enum type for a given value name.
    pub fn has_enum_value(&self, tpe: &TypeRef, value: &str) -> bool {
        match self.type_def(tpe) {
            Some(NamedType::Enum(e)) => e.values.iter().any(|v| v == value),
            _ => false,
        }
    }
}
