//! Text-to-plan tests: the full parse → convert → compile path.

use graph_value::{Binding, Value, ValueObject};
use query_core::{
    ComponentJoin, ElabResult, ObjectMapping, Operation, Predicate, Problem, Query, QueryCompiler,
    Select, SelectElaborator, Term,
};
use request_handlers::GraphQlHandler;
use schema::{
    Field, InputValue, InterfaceType, ObjectType, OperationKind, SchemaBuilder, SchemaRef, Type,
};
use std::sync::Arc;

fn character_schema() -> SchemaRef {
    Arc::new(
        SchemaBuilder::new()
            .interface(
                InterfaceType::new("Character")
                    .field(Field::new("id", Type::non_null(Type::named("ID"))))
                    .field(Field::new("name", Type::named("String"))),
            )
            .object(
                ObjectType::new("Human")
                    .field(Field::new("id", Type::non_null(Type::named("ID"))))
                    .field(Field::new("name", Type::named("String")))
                    .field(Field::new("homePlanet", Type::named("String")))
                    .implements("Character"),
            )
            .object(
                ObjectType::new("Droid")
                    .field(Field::new("id", Type::non_null(Type::named("ID"))))
                    .field(Field::new("name", Type::named("String")))
                    .field(Field::new("primaryFunction", Type::named("String")))
                    .implements("Character"),
            )
            .object(
                ObjectType::new("Query").field(
                    Field::new("character", Type::named("Character"))
                        .argument(InputValue::new("id", Type::non_null(Type::named("ID")))),
                ),
            )
            .query_root("Query")
            .build()
            .unwrap(),
    )
}

fn character_compiler() -> QueryCompiler {
    let elaborator = SelectElaborator::new().on("Query", |sel: Select| {
        if sel.name != "character" {
            return ElabResult::Success(Query::Select(sel));
        }
        let Some(id) = Binding::lookup(&sel.args, "id").cloned() else {
            return ElabResult::failure(Problem::MissingRequired {
                argument: "id".to_owned(),
            });
        };
        ElabResult::Success(Query::select(
            "character",
            Vec::new(),
            Query::unique(Query::filter(
                Predicate::eql(Term::path(["id"]), Term::Const(id)),
                *sel.child,
            )),
        ))
    });
    QueryCompiler::new(character_schema()).with_elaborator(elaborator)
}

fn user_schema() -> SchemaRef {
    Arc::new(
        SchemaBuilder::new()
            .object(
                ObjectType::new("User")
                    .field(Field::new("name", Type::named("String")))
                    .field(
                        Field::new("profilePic", Type::named("String"))
                            .argument(InputValue::new("size", Type::named("Int"))),
                    ),
            )
            .object(
                ObjectType::new("Query").field(
                    Field::new("user", Type::named("User"))
                        .argument(InputValue::new("id", Type::non_null(Type::named("Int")))),
                ),
            )
            .query_root("Query")
            .build()
            .unwrap(),
    )
}

fn user_compiler() -> QueryCompiler {
    QueryCompiler::new(user_schema())
}

fn compile(compiler: &QueryCompiler, source: &str) -> ElabResult<Operation> {
    GraphQlHandler::new(compiler).compile(source, ValueObject::new(), None)
}

fn compile_with(
    compiler: &QueryCompiler,
    source: &str,
    variables: ValueObject,
) -> ElabResult<Operation> {
    GraphQlHandler::new(compiler).compile(source, variables, None)
}

#[test]
fn simple_field_lookup() {
    let compiler = character_compiler();
    let compiled = compile(&compiler, r#"{ character(id: "1000") { name } }"#)
        .ok()
        .unwrap();

    assert_eq!(
        compiled.query,
        Query::select(
            "character",
            Vec::new(),
            Query::unique(Query::filter(
                Predicate::eql(Term::path(["id"]), Term::Const(Value::id("1000"))),
                Query::leaf("name"),
            )),
        )
    );
}

#[test]
fn alias_expansion_stays_distinct() {
    let compiler = user_compiler();
    let compiled = compile(
        &compiler,
        "{ user(id: 4) { smallPic: profilePic(size: 64) bigPic: profilePic(size: 1024) } }",
    )
    .ok()
    .unwrap();

    assert_eq!(
        compiled.query,
        Query::select(
            "user",
            vec![Binding::new("id", Value::Int(4))],
            Query::Group(vec![
                Query::rename(
                    "smallPic",
                    Query::select(
                        "profilePic",
                        vec![Binding::new("size", Value::Int(64))],
                        Query::Empty,
                    ),
                ),
                Query::rename(
                    "bigPic",
                    Query::select(
                        "profilePic",
                        vec![Binding::new("size", Value::Int(1024))],
                        Query::Empty,
                    ),
                ),
            ]),
        )
    );
}

#[test]
fn conflicting_arguments_without_aliases_fail() {
    let compiler = user_compiler();
    let result = compile(
        &compiler,
        "{ user(id: 4) { profilePic(size: 64) profilePic(size: 1024) } }",
    );

    assert_eq!(
        result,
        ElabResult::Failure(vec![Problem::AmbiguousMerge {
            field: "profilePic".to_owned(),
        }])
    );
}

#[test]
fn mutation_tagging() {
    let schema = Arc::new(
        SchemaBuilder::new()
            .interface(
                InterfaceType::new("Character")
                    .field(Field::new("id", Type::non_null(Type::named("ID"))))
                    .field(Field::new("name", Type::named("String"))),
            )
            .object(
                ObjectType::new("Human")
                    .field(Field::new("id", Type::non_null(Type::named("ID"))))
                    .field(Field::new("name", Type::named("String")))
                    .implements("Character"),
            )
            .object(
                ObjectType::new("CharacterUpdate")
                    .field(Field::new("character", Type::named("Character"))),
            )
            .object(ObjectType::new("Query").field(Field::new("character", Type::named("Character"))))
            .object(
                ObjectType::new("Mutation").field(
                    Field::new("update_character", Type::named("CharacterUpdate"))
                        .argument(InputValue::new("id", Type::non_null(Type::named("ID"))))
                        .argument(InputValue::new("name", Type::non_null(Type::named("String")))),
                ),
            )
            .query_root("Query")
            .mutation_root("Mutation")
            .build()
            .unwrap(),
    );
    let compiler = QueryCompiler::new(schema);

    let compiled = compile(
        &compiler,
        r#"mutation { update_character(id: "1000", name: "Luke") { character { name } } }"#,
    )
    .ok()
    .unwrap();

    assert_eq!(compiled.kind, OperationKind::Mutation);
    assert_eq!(compiled.root_type.name(), "Mutation");
    assert_eq!(
        compiled.query,
        Query::select(
            "update_character",
            vec![
                Binding::new("id", Value::id("1000")),
                Binding::new("name", Value::string("Luke")),
            ],
            Query::select("character", Vec::new(), Query::leaf("name")),
        )
    );
}

#[test]
fn leaf_subselection_error() {
    let compiler = character_compiler();
    let result = compile(&compiler, r#"{ character(id: "1000") { name { x } } }"#);

    assert_eq!(
        result,
        ElabResult::Failure(vec![Problem::LeafSubselection {
            field: "name".to_owned(),
            tpe: "Character".to_owned(),
        }])
    );
}

#[test]
fn component_boundaries() {
    let schema = Arc::new(
        SchemaBuilder::new()
            .object(ObjectType::new("ComponentB").field(Field::new("fieldb1", Type::named("String"))))
            .object(
                ObjectType::new("FieldA2")
                    .field(Field::new("componentb", Type::named("ComponentB"))),
            )
            .object(
                ObjectType::new("ComponentA")
                    .field(Field::new("fielda1", Type::named("String")))
                    .field(Field::new("fielda2", Type::named("FieldA2"))),
            )
            .object(ObjectType::new("Query").field(Field::new("componenta", Type::named("ComponentA"))))
            .query_root("Query")
            .build()
            .unwrap(),
    );
    let mappings = vec![
        ObjectMapping::new("Query").delegate("componenta", "MA"),
        ObjectMapping::new("FieldA2").delegate("componentb", "MB"),
    ];
    let compiler = QueryCompiler::new(schema).with_mappings(&mappings);

    let compiled = compile(
        &compiler,
        "{ componenta { fielda1 fielda2 { componentb { fieldb1 } } } }",
    )
    .ok()
    .unwrap();

    let expected = Query::wrap(
        "componenta",
        Query::component(
            "MA",
            ComponentJoin::trivial(),
            Query::select(
                "componenta",
                Vec::new(),
                Query::Group(vec![
                    Query::leaf("fielda1"),
                    Query::select(
                        "fielda2",
                        Vec::new(),
                        Query::wrap(
                            "componentb",
                            Query::component(
                                "MB",
                                ComponentJoin::trivial(),
                                Query::select("componentb", Vec::new(), Query::leaf("fieldb1")),
                            ),
                        ),
                    ),
                ]),
            ),
        ),
    );
    assert_eq!(compiled.query, expected);

    assert_eq!(
        compiled.query.render(),
        "<wrap: componenta <component: MA componenta { fielda1, fielda2 { \
         <wrap: componentb <component: MB componentb { fieldb1 }>> } }>>"
    );
}

#[test]
fn introspection_is_hoisted() {
    let compiler = character_compiler();
    let compiled = compile(&compiler, "{ __schema { queryType { name } } }")
        .ok()
        .unwrap();

    assert_eq!(
        compiled.query.render(),
        "<introspect: __schema { queryType { name } }>"
    );
}

#[test]
fn variables_bind_and_coerce() {
    let compiler = user_compiler();
    let variables: ValueObject = [("id".to_owned(), Value::Int(4))].into_iter().collect();

    let compiled = compile_with(
        &compiler,
        "query Q($id: Int!) { user(id: $id) { name } }",
        variables,
    )
    .ok()
    .unwrap();

    assert_eq!(
        compiled.query,
        Query::select(
            "user",
            vec![Binding::new("id", Value::Int(4))],
            Query::leaf("name"),
        )
    );
}

#[test]
fn missing_required_variable_fails() {
    let compiler = user_compiler();
    let result = compile(&compiler, "query Q($id: Int!) { user(id: $id) { name } }");

    assert_eq!(
        result,
        ElabResult::Failure(vec![Problem::MissingRequired {
            argument: "id".to_owned(),
        }])
    );
}

#[test]
fn variable_defaults_apply() {
    let compiler = user_compiler();
    let compiled = compile(
        &compiler,
        "query Q($size: Int = 64) { user(id: 4) { profilePic(size: $size) } }",
    )
    .ok()
    .unwrap();

    assert_eq!(
        compiled.query,
        Query::select(
            "user",
            vec![Binding::new("id", Value::Int(4))],
            Query::select(
                "profilePic",
                vec![Binding::new("size", Value::Int(64))],
                Query::Empty,
            ),
        )
    );
}

#[test]
fn skip_directive_with_variable_condition() {
    let compiler = user_compiler();
    let variables: ValueObject = [("hide".to_owned(), Value::Boolean(true))]
        .into_iter()
        .collect();

    let compiled = compile_with(
        &compiler,
        "query Q($hide: Boolean!) { user(id: 4) { name @skip(if: $hide) profilePic(size: 1) } }",
        variables,
    )
    .ok()
    .unwrap();

    assert_eq!(
        compiled.query,
        Query::select(
            "user",
            vec![Binding::new("id", Value::Int(4))],
            Query::Group(vec![
                Query::Skipped,
                Query::select(
                    "profilePic",
                    vec![Binding::new("size", Value::Int(1))],
                    Query::Empty,
                ),
            ]),
        )
    );
}

#[test]
fn include_directive_keeps_the_selection() {
    let compiler = user_compiler();
    let variables: ValueObject = [("show".to_owned(), Value::Boolean(true))]
        .into_iter()
        .collect();

    let compiled = compile_with(
        &compiler,
        "query Q($show: Boolean!) { user(id: 4) { name @include(if: $show) } }",
        variables,
    )
    .ok()
    .unwrap();

    assert_eq!(
        compiled.query,
        Query::select(
            "user",
            vec![Binding::new("id", Value::Int(4))],
            Query::leaf("name"),
        )
    );
}

#[test]
fn inline_fragments_narrow() {
    let compiler = character_compiler();
    let compiled = compile(
        &compiler,
        r#"{ character(id: "1000") { ... on Human { homePlanet } name } }"#,
    )
    .ok()
    .unwrap();

    assert_eq!(
        compiled.query,
        Query::select(
            "character",
            Vec::new(),
            Query::unique(Query::filter(
                Predicate::eql(Term::path(["id"]), Term::Const(Value::id("1000"))),
                Query::Group(vec![
                    Query::narrow("Human", Query::leaf("homePlanet")),
                    Query::leaf("name"),
                ]),
            )),
        )
    );
}

#[test]
fn named_fragments_resolve() {
    let compiler = user_compiler();
    let compiled = compile(
        &compiler,
        "query { user(id: 4) { ...Pic } } fragment Pic on User { name }",
    )
    .ok()
    .unwrap();

    assert_eq!(
        compiled.query,
        Query::select(
            "user",
            vec![Binding::new("id", Value::Int(4))],
            Query::narrow("User", Query::leaf("name")),
        )
    );
}

#[test]
fn unknown_fragments_fail() {
    let compiler = user_compiler();
    let result = compile(&compiler, "{ user(id: 4) { ...Nope } }");

    assert_eq!(
        result,
        ElabResult::Failure(vec![Problem::UnknownFragment {
            name: "Nope".to_owned(),
        }])
    );
}

#[test]
fn fragment_cycles_are_detected() {
    let compiler = user_compiler();
    let result = compile(
        &compiler,
        "query { user(id: 4) { ...A } } \
         fragment A on User { ...B } \
         fragment B on User { ...A }",
    );

    assert_eq!(
        result,
        ElabResult::Failure(vec![Problem::FragmentCycle {
            name: "A".to_owned(),
        }])
    );
}

#[test]
fn operation_selection_by_name() {
    let compiler = user_compiler();
    let source = "query A { user(id: 1) { name } } query B { user(id: 2) { name } }";

    let result = GraphQlHandler::new(&compiler).compile(source, ValueObject::new(), None);
    assert_eq!(result, ElabResult::Failure(vec![Problem::AmbiguousOperation]));

    let compiled = GraphQlHandler::new(&compiler)
        .compile(source, ValueObject::new(), Some("B"))
        .ok()
        .unwrap();
    assert_eq!(
        compiled.query,
        Query::select(
            "user",
            vec![Binding::new("id", Value::Int(2))],
            Query::leaf("name"),
        )
    );

    let missing = GraphQlHandler::new(&compiler).compile(source, ValueObject::new(), Some("C"));
    assert_eq!(
        missing,
        ElabResult::Failure(vec![Problem::UnknownOperation {
            name: "C".to_owned(),
        }])
    );
}

#[test]
fn documents_without_operations_fail() {
    let compiler = user_compiler();
    let result = compile(&compiler, "fragment F on User { name }");

    assert_eq!(result, ElabResult::Failure(vec![Problem::NoOperations]));
}

#[test]
fn parse_errors_carry_positions() {
    let compiler = user_compiler();
    let result = compile(&compiler, "{ user(id: 4) { name }");

    let problems = result.problems().to_vec();
    assert_eq!(problems.len(), 1);
    match &problems[0] {
        Problem::ParseError { line, column, .. } => {
            assert!(*line > 0);
            assert!(*column > 0);
        }
        other => panic!("expected a parse error, got {other}"),
    }
    assert!(problems[0].to_string().starts_with("Parse error at line"));
}
