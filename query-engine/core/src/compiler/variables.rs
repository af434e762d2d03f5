//! Phase 1: variable binding, and the input coercion rules shared with
//! select elaboration.

use crate::error::Problem;
use crate::query_ast::{transformers, Query, Select};
use crate::query_document::UntypedVarDef;
use crate::result::{ElabResult, Problems};
use bigdecimal::BigDecimal;
use graph_value::{Binding, Value, ValueObject};
use indexmap::IndexMap;
use schema::{NamedType, Schema, Type};

const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

/// Resolves every declared variable against the caller-supplied values,
/// coercing to the declared types and applying defaults, then
/// substitutes the resolved values for every variable use in the tree.
///
/// Failures here abort the pipeline: nothing downstream can be typed
/// against unresolved variables.
pub(crate) fn bind_variables(
    schema: &Schema,
    query: Query,
    var_defs: &[UntypedVarDef],
    provided: &ValueObject,
) -> ElabResult<Query> {
    let mut resolved: IndexMap<String, Value> = IndexMap::new();
    let mut problems = Problems::new();

    for def in var_defs {
        match resolve_variable(schema, def, provided) {
            Ok(value) => {
                resolved.insert(def.name.clone(), value);
            }
            Err(problem) => {
                if !problems.contains(&problem) {
                    problems.push(problem);
                }
            }
        }
    }

    if !problems.is_empty() {
        return ElabResult::Failure(problems);
    }

    substitute(query, &resolved)
}

fn resolve_variable(
    schema: &Schema,
    def: &UntypedVarDef,
    provided: &ValueObject,
) -> Result<Value, Problem> {
    let declared = def.ty.underlying();
    if schema.lookup_type(declared.name()).is_none() {
        return Err(Problem::UnknownType {
            name: declared.name().to_owned(),
        });
    }

    match provided.get(&def.name) {
        Some(value) => coerce(schema, value.clone(), &def.ty),
        None => match &def.default {
            Some(default) => coerce(schema, default.clone(), &def.ty),
            None if def.ty.is_non_null() => Err(Problem::MissingRequired {
                argument: def.name.clone(),
            }),
            None => Ok(Value::Null),
        },
    }
}

fn substitute(query: Query, resolved: &IndexMap<String, Value>) -> ElabResult<Query> {
    transformers::rewrite(query, &mut |node| match node {
        Query::Select(Select { name, args, child }) => args
            .into_iter()
            .map(|binding| {
                substitute_value(binding.value, resolved)
                    .map(|value| Binding::new(binding.name, value))
                    .into()
            })
            .collect::<ElabResult<Vec<_>>>()
            .map(|args| Query::Select(Select {
                name,
                args,
                child,
            })),
        Query::Skip { sense, cond, child } => substitute_value(cond, resolved)
            .map(|cond| Query::Skip { sense, cond, child })
            .into(),
        other => ElabResult::Success(other),
    })
}

fn substitute_value(
    value: Value,
    resolved: &IndexMap<String, Value>,
) -> Result<Value, Problem> {
    match value {
        Value::UntypedVariable(name) => {
            resolved
                .get(&name)
                .cloned()
                .ok_or(Problem::UnknownVariable { name })
        }
        Value::List(values) => values
            .into_iter()
            .map(|v| substitute_value(v, resolved))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Object(fields) => fields
            .into_iter()
            .map(|(k, v)| substitute_value(v, resolved).map(|v| (k, v)))
            .collect::<Result<_, _>>()
            .map(Value::Object),
        other => Ok(other),
    }
}

/// Coerces a literal against a declared input type, mapping the untyped
/// parse-time variants to their typed counterparts.
pub(crate) fn coerce(schema: &Schema, value: Value, ty: &Type) -> Result<Value, Problem> {
    match ty {
        Type::NonNull(inner) => match value {
            Value::Null | Value::Absent => Err(Problem::type_mismatch(ty, "Null")),
            value => coerce(schema, value, inner),
        },
        Type::List(inner) => match value {
            Value::Null => Ok(Value::Null),
            Value::List(values) => values
                .into_iter()
                .map(|v| coerce(schema, v, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            // A single value coerces to a singleton list.
            value => coerce(schema, value, inner).map(|v| Value::List(vec![v])),
        },
        Type::Named(tref) => {
            if value.is_null() {
                return Ok(Value::Null);
            }
            match schema.type_def(tref) {
                None => Err(Problem::UnknownType {
                    name: tref.name().to_owned(),
                }),
                Some(NamedType::Scalar(scalar)) => coerce_scalar(&scalar.name, value),
                Some(NamedType::Enum(_)) => {
                    let name = match value {
                        Value::UntypedEnum(name) | Value::Enum(name) | Value::String(name) => name,
                        other => {
                            return Err(Problem::type_mismatch(tref, other.type_name()));
                        }
                    };
                    if schema.has_enum_value(tref, &name) {
                        Ok(Value::Enum(name))
                    } else {
                        Err(Problem::type_mismatch(tref, format!("'{name}'")))
                    }
                }
                // Composite types are not input types.
                Some(_) => Err(Problem::type_mismatch(tref, value.type_name())),
            }
        }
    }
}

fn coerce_scalar(name: &str, value: Value) -> Result<Value, Problem> {
    match (name, value) {
        ("Int", value @ Value::Int(_)) => Ok(value),
        ("Float", Value::Int(i)) => Ok(Value::Float(BigDecimal::from(i))),
        ("Float", value @ Value::Float(_)) => Ok(value),
        ("String", value @ Value::String(_)) => Ok(value),
        ("Boolean", value @ Value::Boolean(_)) => Ok(value),
        ("ID", value @ Value::Id(_)) => Ok(value),
        ("ID", Value::String(s)) => Ok(Value::Id(s)),
        ("ID", Value::Int(i)) => Ok(Value::Id(i.to_string())),
        // Custom scalars accept any concrete literal.
        (name, value)
            if !BUILTIN_SCALARS.contains(&name)
                && !value.has_untyped()
                && !value.is_absent() =>
        {
            Ok(value)
        }
        (name, value) => Err(Problem::type_mismatch(name, value.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{EnumType, ObjectType, SchemaBuilder};

    fn test_schema() -> Schema {
        SchemaBuilder::new()
            .scalar("Date")
            .enum_type(EnumType::new("Episode", ["NEWHOPE", "EMPIRE", "JEDI"]))
            .object(ObjectType::new("Query"))
            .query_root("Query")
            .build()
            .unwrap()
    }

    #[test]
    fn scalar_coercions() {
        let schema = test_schema();

        assert_eq!(
            coerce(&schema, Value::Int(3), &Type::named("Float")).unwrap(),
            Value::Float(BigDecimal::from(3))
        );
        assert_eq!(
            coerce(&schema, Value::string("1000"), &Type::named("ID")).unwrap(),
            Value::id("1000")
        );
        assert_eq!(
            coerce(&schema, Value::Int(1000), &Type::named("ID")).unwrap(),
            Value::id("1000")
        );
        assert!(coerce(&schema, Value::Boolean(true), &Type::named("Int")).is_err());
    }

    #[test]
    fn enum_coercion_checks_membership() {
        let schema = test_schema();
        let episode = Type::named("Episode");

        assert_eq!(
            coerce(&schema, Value::UntypedEnum("JEDI".to_owned()), &episode).unwrap(),
            Value::Enum("JEDI".to_owned())
        );
        assert!(coerce(&schema, Value::UntypedEnum("CLONES".to_owned()), &episode).is_err());
    }

    #[test]
    fn null_against_non_null_is_rejected() {
        let schema = test_schema();
        let required = Type::non_null(Type::named("Int"));

        assert!(coerce(&schema, Value::Null, &required).is_err());
        assert_eq!(
            coerce(&schema, Value::Null, &Type::named("Int")).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn singleton_list_coercion() {
        let schema = test_schema();
        let ints = Type::list(Type::named("Int"));

        assert_eq!(
            coerce(&schema, Value::Int(1), &ints).unwrap(),
            Value::list([Value::Int(1)])
        );
    }

    #[test]
    fn custom_scalars_pass_through() {
        let schema = test_schema();
        assert_eq!(
            coerce(&schema, Value::string("2026-08-02"), &Type::named("Date")).unwrap(),
            Value::string("2026-08-02")
        );
    }

    #[test]
    fn binds_and_substitutes_variables() {
        let schema = test_schema();
        let query = Query::select(
            "field",
            vec![Binding::new("size", Value::UntypedVariable("size".to_owned()))],
            Query::Empty,
        );
        let defs = vec![UntypedVarDef::new(
            "size",
            Type::named("Int"),
            Some(Value::Int(64)),
        )];

        // Provided value wins over the default.
        let provided: ValueObject = [("size".to_owned(), Value::Int(128))].into_iter().collect();
        let bound = bind_variables(&schema, query.clone(), &defs, &provided);
        assert_eq!(
            bound,
            ElabResult::Success(Query::select(
                "field",
                vec![Binding::new("size", Value::Int(128))],
                Query::Empty,
            ))
        );

        // Unprovided falls back to the default.
        let bound = bind_variables(&schema, query, &defs, &ValueObject::new());
        assert_eq!(
            bound,
            ElabResult::Success(Query::select(
                "field",
                vec![Binding::new("size", Value::Int(64))],
                Query::Empty,
            ))
        );
    }

    #[test]
    fn unprovided_required_variable_fails() {
        let schema = test_schema();
        let defs = vec![UntypedVarDef::new(
            "id",
            Type::non_null(Type::named("ID")),
            None,
        )];

        let bound = bind_variables(&schema, Query::Empty, &defs, &ValueObject::new());
        assert_eq!(
            bound,
            ElabResult::Failure(vec![Problem::MissingRequired {
                argument: "id".to_owned()
            }])
        );
    }

    #[test]
    fn undeclared_variable_use_fails() {
        let schema = test_schema();
        let query = Query::select(
            "field",
            vec![Binding::new("id", Value::UntypedVariable("id".to_owned()))],
            Query::Empty,
        );

        let bound = bind_variables(&schema, query, &[], &ValueObject::new());
        assert_eq!(
            bound,
            ElabResult::Failure(vec![Problem::UnknownVariable {
                name: "id".to_owned()
            }])
        );
    }
}
