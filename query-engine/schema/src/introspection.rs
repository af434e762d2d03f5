use crate::{
    EnumType, Field, InputValue, ObjectType, SchemaBuilder, SchemaRef, Type,
};
use graph_value::Value;
use std::sync::{Arc, OnceLock};

/// The built-in meta-schema that introspection subtrees are elaborated
/// against once they have been hoisted under an `Introspect` node.
///
/// Its query root carries the two reserved root fields; everything below
/// is the standard introspection type system.
pub fn introspection_schema() -> &'static SchemaRef {
    static META: OnceLock<SchemaRef> = OnceLock::new();

    META.get_or_init(|| {
        let schema = SchemaBuilder::new()
            .enum_type(EnumType::new(
                "__TypeKind",
                [
                    "SCALAR",
                    "OBJECT",
                    "INTERFACE",
                    "UNION",
                    "ENUM",
                    "INPUT_OBJECT",
                    "LIST",
                    "NON_NULL",
                ],
            ))
            .enum_type(EnumType::new(
                "__DirectiveLocation",
                [
                    "QUERY",
                    "MUTATION",
                    "SUBSCRIPTION",
                    "FIELD",
                    "FRAGMENT_DEFINITION",
                    "FRAGMENT_SPREAD",
                    "INLINE_FRAGMENT",
                ],
            ))
            .object(
                ObjectType::new("__Schema")
                    .field(Field::new(
                        "types",
                        Type::non_null(Type::list(Type::non_null(Type::named("__Type")))),
                    ))
                    .field(Field::new("queryType", Type::non_null(Type::named("__Type"))))
                    .field(Field::new("mutationType", Type::named("__Type")))
                    .field(Field::new("subscriptionType", Type::named("__Type")))
                    .field(Field::new(
                        "directives",
                        Type::non_null(Type::list(Type::non_null(Type::named("__Directive")))),
                    )),
            )
            .object(
                ObjectType::new("__Type")
                    .field(Field::new("kind", Type::non_null(Type::named("__TypeKind"))))
                    .field(Field::new("name", Type::named("String")))
                    .field(Field::new("description", Type::named("String")))
                    .field(
                        Field::new("fields", Type::list(Type::non_null(Type::named("__Field"))))
                            .argument(
                                InputValue::new("includeDeprecated", Type::named("Boolean"))
                                    .with_default(Value::Boolean(false)),
                            ),
                    )
                    .field(Field::new(
                        "interfaces",
                        Type::list(Type::non_null(Type::named("__Type"))),
                    ))
                    .field(Field::new(
                        "possibleTypes",
                        Type::list(Type::non_null(Type::named("__Type"))),
                    ))
                    .field(
                        Field::new(
                            "enumValues",
                            Type::list(Type::non_null(Type::named("__EnumValue"))),
                        )
                        .argument(
                            InputValue::new("includeDeprecated", Type::named("Boolean"))
                                .with_default(Value::Boolean(false)),
                        ),
                    )
                    .field(Field::new(
                        "inputFields",
                        Type::list(Type::non_null(Type::named("__InputValue"))),
                    ))
                    .field(Field::new("ofType", Type::named("__Type"))),
            )
            .object(
                ObjectType::new("__Field")
                    .field(Field::new("name", Type::non_null(Type::named("String"))))
                    .field(Field::new("description", Type::named("String")))
                    .field(Field::new(
                        "args",
                        Type::non_null(Type::list(Type::non_null(Type::named("__InputValue")))),
                    ))
                    .field(Field::new("type", Type::non_null(Type::named("__Type"))))
                    .field(Field::new("isDeprecated", Type::non_null(Type::named("Boolean"))))
                    .field(Field::new("deprecationReason", Type::named("String"))),
            )
            .object(
                ObjectType::new("__InputValue")
                    .field(Field::new("name", Type::non_null(Type::named("String"))))
                    .field(Field::new("description", Type::named("String")))
                    .field(Field::new("type", Type::non_null(Type::named("__Type"))))
                    .field(Field::new("defaultValue", Type::named("String"))),
            )
            .object(
                ObjectType::new("__EnumValue")
                    .field(Field::new("name", Type::non_null(Type::named("String"))))
                    .field(Field::new("description", Type::named("String")))
                    .field(Field::new("isDeprecated", Type::non_null(Type::named("Boolean"))))
                    .field(Field::new("deprecationReason", Type::named("String"))),
            )
            .object(
                ObjectType::new("__Directive")
                    .field(Field::new("name", Type::non_null(Type::named("String"))))
                    .field(Field::new("description", Type::named("String")))
                    .field(Field::new(
                        "locations",
                        Type::non_null(Type::list(Type::non_null(Type::named(
                            "__DirectiveLocation",
                        )))),
                    ))
                    .field(Field::new(
                        "args",
                        Type::non_null(Type::list(Type::non_null(Type::named("__InputValue")))),
                    )),
            )
            .object(
                ObjectType::new("__Introspection")
                    .field(Field::new(
                        crate::SCHEMA_FIELD,
                        Type::non_null(Type::named("__Schema")),
                    ))
                    .field(
                        Field::new(crate::TYPE_FIELD, Type::named("__Type")).argument(
                            InputValue::new("name", Type::non_null(Type::named("String"))),
                        ),
                    ),
            )
            .query_root("__Introspection")
            .build()
            .expect("introspection meta-schema is well-formed");

        Arc::new(schema)
    })
}
