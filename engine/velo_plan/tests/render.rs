//! End-to-end render tests: compile a template against a configured
//! engine, feed values through a render state, and assert on the exact
//! output text. Error cases assert on the compile or state error variant.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use velo_plan::{
    CompileError, Engine, EngineOptions, FieldData, FnDescriptor, FnImpl, FnError, FnRegistry,
    StateError, TypeId, TypeTag, Value,
};

fn render(engine: &Engine, template: &str, values: &[(&str, Value)]) -> String {
    let plan = engine.compile(template).unwrap();
    let mut state = plan.new_state();
    for (name, value) in values {
        state.set_value(name, value.clone()).unwrap();
    }
    plan.exec(&mut state);
    state.take_output()
}

#[test]
fn plain_text_passes_through_verbatim() {
    let engine = Engine::with_defaults();
    let out = render(&engine, "Hello, world! 100% plain.", &[]);
    assert_eq!(out, "Hello, world! 100% plain.");
}

#[test]
fn arithmetic_follows_precedence() {
    let engine = Engine::with_defaults();
    assert_eq!(render(&engine, "#set($v = 2 * 2 + 3)$v", &[]), "7");
    assert_eq!(render(&engine, "#set($v = 2 * (2 + 3))$v", &[]), "10");
}

#[test]
fn integer_division_truncates() {
    let engine = Engine::with_defaults();
    assert_eq!(render(&engine, "#set($v = 7 / 2)$v", &[]), "3");
}

#[test]
fn mixed_arithmetic_widens_to_float() {
    let engine = Engine::with_defaults();
    assert_eq!(render(&engine, "#set($v = 1 + 0.5)$v", &[]), "1.5");
    assert_eq!(render(&engine, "#set($v = 0.25 + 0.5)$v", &[]), "0.75");
}

#[test]
fn string_concatenation_and_equality() {
    let engine = Engine::with_defaults();
    let out = render(
        &engine,
        "#set($s = \"foo\" + \"bar\")#if($s == \"foobar\")eq:#end$s",
        &[],
    );
    assert_eq!(out, "eq:foobar");
}

#[test]
fn if_chain_picks_the_first_true_branch() {
    let engine = Engine::with_defaults();
    engine.define_variable("n", TypeId::INT);
    let plan = engine
        .compile("#if($n == 1)one#elseif($n == 2)two#else many#end")
        .unwrap();

    for (n, expected) in [(1, "one"), (2, "two"), (7, " many")] {
        let mut state = plan.new_state();
        state.set_value("n", Value::int(n)).unwrap();
        plan.exec(&mut state);
        assert_eq!(state.output(), expected, "n = {n}");
    }
}

#[test]
fn logical_operators_combine_conditions() {
    let engine = Engine::with_defaults();
    engine.define_variable("a", TypeId::INT);
    engine.define_variable("b", TypeId::STR);
    let plan = engine
        .compile("#if($a > 1 && $b != \"x\")ok#end#if($a > 10 || !($b == \"x\"))also#end")
        .unwrap();
    let mut state = plan.new_state();
    state.set_value("a", Value::int(5)).unwrap();
    state.set_value("b", Value::string("y")).unwrap();
    plan.exec(&mut state);
    assert_eq!(state.output(), "okalso");
}

#[test]
fn counting_for_loop() {
    let engine = Engine::with_defaults();
    let out = render(&engine, "#for($i = 0; $i < 3; $i = $i + 1)$i#end", &[]);
    assert_eq!(out, "012");
}

#[test]
fn foreach_binds_item_and_index() {
    let engine = Engine::with_defaults();
    let items = engine.types().list_of(TypeId::INT);
    engine.define_variable("items", items);
    let out = render(
        &engine,
        "#foreach($x, $i in $items)$i:$x;#end",
        &[("items", Value::list(vec![Value::int(10), Value::int(20)]))],
    );
    assert_eq!(out, "0:10;1:20;");
}

#[test]
fn foreach_over_an_unset_list_renders_nothing() {
    let engine = Engine::with_defaults();
    let items = engine.types().list_of(TypeId::STR);
    engine.define_variable("items", items);
    let out = render(&engine, "[#foreach($x in $items)$x#end]", &[]);
    assert_eq!(out, "[]");
}

#[test]
fn ranges_count_both_directions() {
    let engine = Engine::with_defaults();
    assert_eq!(render(&engine, "#foreach($i in [1...4])$i#end", &[]), "1234");
    assert_eq!(render(&engine, "#foreach($i in [4...1])$i#end", &[]), "4321");
    assert_eq!(render(&engine, "#foreach($i in [2...2])$i#end", &[]), "2");
}

#[test]
fn renders_agree_across_fresh_states() {
    let engine = Engine::with_defaults();
    let plan = engine.compile("$x#set($x = 5)-$x").unwrap();

    let mut first = plan.new_state();
    plan.exec(&mut first);
    let mut second = plan.new_state();
    plan.exec(&mut second);

    assert_eq!(first.output(), "0-5");
    assert_eq!(first.output(), second.output());
}

#[test]
fn reset_rewinds_output_but_keeps_values() {
    let engine = Engine::with_defaults();
    engine.define_variable("n", TypeId::INT);
    let plan = engine.compile("n=$n").unwrap();

    let mut state = plan.new_state();
    state.set_value("n", Value::int(9)).unwrap();
    plan.exec(&mut state);
    assert_eq!(state.output(), "n=9");

    state.reset();
    assert_eq!(state.output(), "");
    plan.exec(&mut state);
    assert_eq!(state.output(), "n=9");
}

#[test]
fn null_chains_read_as_the_final_zero() {
    let engine = Engine::with_defaults();
    let names = engine.names();
    let addr = engine.types().record(
        names.intern("Addr"),
        vec![FieldData::new(names.intern("City"), TypeId::STR)],
    );
    let user = engine.types().record(
        names.intern("User"),
        vec![
            FieldData::new(names.intern("Name"), TypeId::STR),
            FieldData::new(names.intern("Home"), addr),
            FieldData::new(names.intern("Age"), TypeId::INT),
        ],
    );
    engine.define_variable("user", user);

    let out = render(&engine, "[$user.Home.City][$user.Age]", &[]);
    assert_eq!(out, "[][0]");
}

#[test]
fn self_referential_records_resolve_past_the_expansion_cutoff() {
    let engine = Engine::with_defaults();
    let names = engine.names();
    let node = engine.types().reserve_record(names.intern("Node"));
    let next = engine.types().ref_of(node);
    engine
        .types()
        .define_record(
            node,
            vec![
                FieldData::new(names.intern("Value"), TypeId::INT),
                FieldData::new(names.intern("Next"), next),
            ],
        )
        .unwrap();
    engine.define_variable("node", node);

    let plan = engine.compile("$node.Next.Next.Value").unwrap();

    let mut state = plan.new_state();
    plan.exec(&mut state);
    assert_eq!(state.output(), "0");

    let third = Value::record(node, vec![Value::int(3), Value::Null]);
    let second = Value::record(node, vec![Value::int(2), third]);
    let first = Value::record(node, vec![Value::int(1), second]);
    state.reset();
    state.set_value("node", first).unwrap();
    plan.exec(&mut state);
    assert_eq!(state.output(), "3");
}

#[test]
fn list_indexing_reads_elements() {
    let engine = Engine::with_defaults();
    let items = engine.types().list_of(TypeId::INT);
    engine.define_variable("items", items);
    let out = render(
        &engine,
        "$items[1]",
        &[("items", Value::list(vec![Value::int(10), Value::int(20)]))],
    );
    assert_eq!(out, "20");
}

#[test]
#[should_panic(expected = "out of range")]
fn list_index_past_the_end_faults() {
    let engine = Engine::with_defaults();
    let items = engine.types().list_of(TypeId::INT);
    engine.define_variable("items", items);
    render(
        &engine,
        "$items[5]",
        &[("items", Value::list(vec![Value::int(10), Value::int(20)]))],
    );
}

#[test]
fn map_access_hits_and_misses() {
    let engine = Engine::with_defaults();
    let map = engine.types().map_of(TypeId::INT);
    engine.define_variable("m", map);
    let mut entries = FxHashMap::default();
    entries.insert("a".to_owned(), Value::int(7));
    let out = render(&engine, "$m[\"a\"]/$m[\"zz\"]", &[("m", Value::map(entries))]);
    assert_eq!(out, "7/0");
}

#[test]
fn unresolved_references_render_their_source_text() {
    let engine = Engine::with_defaults();
    assert_eq!(render(&engine, "-$nope-", &[]), "-$nope-");
    assert_eq!(render(&engine, "-$nope.x.y-", &[]), "-$nope.x.y-");
}

#[test]
fn deferred_reference_settles_against_a_later_assignment() {
    let engine = Engine::with_defaults();
    let out = render(&engine, "$greeting#set($greeting = \"hi\")/$greeting", &[]);
    // Defined by the time the plan renders, so the first read sees the
    // slot's zero, not the literal fallback.
    assert_eq!(out, "/hi");
}

#[test]
fn builtin_string_functions() {
    let engine = Engine::with_defaults();
    engine.define_variable("s", TypeId::STR);
    let values = [("s", Value::string("  Hej  "))];
    assert_eq!(
        render(&engine, "$s.Upper()|$s.Len()|$s.Trim()", &values),
        "  HEJ  |7|Hej"
    );
    assert_eq!(
        render(
            &engine,
            "#if($s.Contains(\"ej\"))y#end#if($s.Trim().StartsWith(\"He\"))es#end",
            &values
        ),
        "yes"
    );
    assert_eq!(
        render(&engine, "$s.Trim().Replace(\"ej\", \"i\")", &values),
        "Hi"
    );
}

#[test]
fn builtin_list_and_map_functions() {
    let engine = Engine::with_defaults();
    let items = engine.types().list_of(TypeId::INT);
    let map = engine.types().map_of(TypeId::INT);
    engine.define_variable("items", items);
    engine.define_variable("m", map);

    let mut entries = FxHashMap::default();
    entries.insert("a".to_owned(), Value::int(1));
    entries.insert("b".to_owned(), Value::int(2));
    let values = [
        (
            "items",
            Value::list(vec![Value::int(4), Value::int(5), Value::int(6)]),
        ),
        ("m", Value::map(entries)),
    ];

    assert_eq!(
        render(
            &engine,
            "$items.Size()|$items.First()|$items.Last()",
            &values
        ),
        "3|4|6"
    );
    assert_eq!(
        render(
            &engine,
            "$m.Size()#if($m.ContainsKey(\"a\"))+#end",
            &values
        ),
        "2+"
    );
}

#[test]
fn registered_function_runs_on_a_record_receiver() {
    let engine = Engine::with_defaults();
    let names = engine.names();
    let person = engine.types().record(
        names.intern("Person"),
        vec![FieldData::new(names.intern("Name"), TypeId::STR)],
    );
    engine.define_variable("person", person);
    engine.register_function(
        person,
        "Greet",
        FnDescriptor::new(
            vec![],
            TypeId::STR,
            FnImpl::Generic(Arc::new(|args| {
                let Some(Value::Record(rv)) = args.first() else {
                    return Err(FnError::new("expected a record receiver"));
                };
                Ok(Value::string(format!("Hello, {}!", rv.fields[0])))
            })),
        ),
    );

    let out = render(
        &engine,
        "$person.Greet()",
        &[("person", Value::record(person, vec![Value::string("Ada")]))],
    );
    assert_eq!(out, "Hello, Ada!");
}

#[test]
fn tag_functions_apply_to_every_list_type() {
    let engine = Engine::with_defaults();
    engine.register_tag_function(
        TypeTag::List,
        "Total",
        FnDescriptor::new(
            vec![],
            TypeId::INT,
            FnImpl::Generic(Arc::new(|args| {
                let Some(Value::List(items)) = args.first() else {
                    return Err(FnError::new("expected a list receiver"));
                };
                Ok(Value::int(items.iter().map(Value::coerce_int).sum()))
            })),
        ),
    );

    let nums = engine.types().list_of(TypeId::INT);
    engine.define_variable("nums", nums);

    let out = render(
        &engine,
        "$nums.Total()",
        &[(
            "nums",
            Value::list(vec![Value::int(2), Value::int(3), Value::int(5)]),
        )],
    );
    assert_eq!(out, "10");
}

#[test]
fn embedded_record_fields_resolve_as_top_level_names() {
    let engine = Engine::with_defaults();
    let names = engine.names();
    let config = engine.types().record(
        names.intern("Config"),
        vec![
            FieldData::new(names.intern("Host"), TypeId::STR),
            FieldData::new(names.intern("Port"), TypeId::INT),
        ],
    );
    engine.embed_variable(config).unwrap();

    let out = render(
        &engine,
        "$Host:$Port",
        &[(
            "Config",
            Value::record(config, vec![Value::string("example.com"), Value::int(8080)]),
        )],
    );
    assert_eq!(out, "example.com:8080");
}

#[test]
fn evaluate_renders_and_caches_sub_templates() {
    let engine = Engine::with_defaults();
    engine.define_variable("var1", TypeId::INT);
    engine.define_variable("var2", TypeId::INT);
    engine.define_variable("tpl", TypeId::STR);
    let plan = engine.compile("#evaluate($tpl)#evaluate($tpl)").unwrap();

    let mut state = plan.new_state();
    state.set_value("var1", Value::int(1000)).unwrap();
    state.set_value("var2", Value::int(13213)).unwrap();
    state
        .set_value("tpl", Value::string("Var1: $var1, Var2: $var2"))
        .unwrap();
    plan.exec(&mut state);

    assert_eq!(
        state.output(),
        "Var1: 1000, Var2: 13213Var1: 1000, Var2: 13213"
    );
    assert_eq!(plan.eval_cache_hits(), 1);
}

#[test]
fn evaluate_cache_survives_repeat_renders() {
    let engine = Engine::with_defaults();
    engine.define_variable("tpl", TypeId::STR);
    let plan = engine.compile("#evaluate($tpl)").unwrap();

    for round in 0..3 {
        let mut state = plan.new_state();
        state.set_value("tpl", Value::string("[$tpl]")).unwrap();
        plan.exec(&mut state);
        assert_eq!(state.output(), "[[$tpl]]", "round {round}");
    }
    assert_eq!(plan.eval_cache_hits(), 2);
}

#[test]
fn evaluate_cache_clears_at_the_ceiling() {
    let options = EngineOptions {
        eval_cache_ceiling: 2,
        ..EngineOptions::default()
    };
    let engine = Engine::new(options, FnRegistry::with_builtins());
    for name in ["a", "b", "c"] {
        engine.define_variable(name, TypeId::STR);
    }
    let plan = engine
        .compile("#evaluate($a)#evaluate($b)#evaluate($c)#evaluate($a)")
        .unwrap();

    let mut state = plan.new_state();
    state.set_value("a", Value::string("A")).unwrap();
    state.set_value("b", Value::string("B")).unwrap();
    state.set_value("c", Value::string("C")).unwrap();
    plan.exec(&mut state);

    assert_eq!(state.output(), "ABCA");
    // The third fragment tripped the ceiling, so the repeat of the first
    // had to recompile.
    assert_eq!(plan.eval_cache_hits(), 0);
}

#[test]
fn evaluate_failure_renders_nothing() {
    let engine = Engine::with_defaults();
    engine.define_variable("tpl", TypeId::STR);
    let plan = engine.compile("<#evaluate($tpl)>").unwrap();

    let mut state = plan.new_state();
    state
        .set_value("tpl", Value::string("#if(broken"))
        .unwrap();
    plan.exec(&mut state);
    assert_eq!(state.output(), "<>");
}

#[test]
fn html_escaping_covers_values_but_not_text_or_fallbacks() {
    let options = EngineOptions {
        html_escape: true,
        ..EngineOptions::default()
    };
    let engine = Engine::new(options, FnRegistry::with_builtins());
    engine.define_variable("v", TypeId::STR);
    let plan = engine.compile("<b>$v</b>$nope<i>").unwrap();

    let mut state = plan.new_state();
    state
        .set_value("v", Value::string("<script>alert()</script>"))
        .unwrap();
    plan.exec(&mut state);
    assert_eq!(
        state.output(),
        "<b>&lt;script&gt;alert()&lt;/script&gt;</b>$nope<i>"
    );
}

#[test]
fn state_pool_hands_states_back_rewound() {
    let engine = Engine::with_defaults();
    engine.define_variable("n", TypeId::INT);
    let plan = engine.compile("n=$n").unwrap();
    let pool = plan.state_pool(2);

    let mut state = pool.acquire();
    state.set_value("n", Value::int(9)).unwrap();
    plan.exec(&mut state);
    assert_eq!(state.output(), "n=9");
    pool.release(state);

    // Buffer comes back rewound; slot values persist until overwritten.
    let mut state = pool.acquire();
    assert_eq!(state.output(), "");
    plan.exec(&mut state);
    assert_eq!(state.output(), "n=9");
    pool.release(state);
}

#[test]
fn one_plan_renders_on_many_threads() {
    let engine = Engine::with_defaults();
    engine.define_variable("n", TypeId::INT);
    let plan = engine.compile("#set($sq = $n * $n)$n^2=$sq").unwrap();

    std::thread::scope(|scope| {
        for n in 0..4i64 {
            let plan = &plan;
            scope.spawn(move || {
                let mut state = plan.new_state();
                state.set_value("n", Value::int(n)).unwrap();
                plan.exec(&mut state);
                assert_eq!(state.output(), format!("{n}^2={}", n * n));
            });
        }
    });
}

#[test]
fn tiny_initial_buffer_still_renders_everything() {
    let options = EngineOptions {
        buffer_size: 1,
        ..EngineOptions::default()
    };
    let engine = Engine::new(options, FnRegistry::with_builtins());
    let out = render(&engine, "#foreach($i in [1...40])$i,#end", &[]);
    let expected: String = (1..=40).map(|i| format!("{i},")).collect();
    assert_eq!(out, expected);
}

#[test]
fn set_value_rejects_unknown_names_and_wrong_types() {
    let engine = Engine::with_defaults();
    engine.define_variable("n", TypeId::INT);
    let plan = engine.compile("$n").unwrap();
    let mut state = plan.new_state();

    assert_eq!(
        state.set_value("missing", Value::int(1)),
        Err(StateError::UnknownVariable {
            name: "missing".to_owned()
        })
    );
    assert_eq!(
        state.set_value("n", Value::string("nine")),
        Err(StateError::TypeMismatch {
            name: "n".to_owned(),
            expected: "int".to_owned(),
            found: "str".to_owned()
        })
    );
    state.set_value("n", Value::int(9)).unwrap();
}

mod compile_errors {
    use pretty_assertions::assert_eq;

    use super::*;

    fn compile_err(engine: &Engine, template: &str) -> CompileError {
        match engine.compile(template) {
            Err(err) => err,
            Ok(_) => panic!("expected {template:?} to fail"),
        }
    }

    #[test]
    fn reassignment_must_match_the_declared_type() {
        let engine = Engine::with_defaults();
        let err = compile_err(&engine, "#set($x = 1)#set($x = \"a\")");
        match err {
            CompileError::AssignTypeMismatch {
                name,
                expected,
                found,
            } => {
                assert_eq!(name, "x");
                assert_eq!(expected, "int");
                assert_eq!(found, "str");
            }
            other => panic!("expected AssignTypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn conditions_must_be_boolean() {
        let engine = Engine::with_defaults();
        let err = compile_err(&engine, "#if(1 + 1)x#end");
        assert!(matches!(err, CompileError::NonBoolCondition { ty } if ty == "int"));
    }

    #[test]
    fn unknown_field_on_a_declared_record() {
        let engine = Engine::with_defaults();
        let names = engine.names();
        let person = engine.types().record(
            names.intern("Person"),
            vec![FieldData::new(names.intern("Name"), TypeId::STR)],
        );
        engine.define_variable("person", person);
        let err = compile_err(&engine, "$person.Nope");
        assert!(matches!(err, CompileError::UnknownField { field, .. } if field == "Nope"));
    }

    #[test]
    fn undefined_function_names_the_receiver() {
        let engine = Engine::with_defaults();
        engine.define_variable("s", TypeId::STR);
        let err = compile_err(&engine, "$s.Nope()");
        match err {
            CompileError::UndefinedFunction { receiver, name } => {
                assert_eq!(receiver, "str");
                assert_eq!(name, "Nope");
            }
            other => panic!("expected UndefinedFunction, got {other:?}"),
        }
    }

    #[test]
    fn call_arity_is_checked() {
        let engine = Engine::with_defaults();
        engine.define_variable("s", TypeId::STR);
        let err = compile_err(&engine, "$s.Contains()");
        assert!(matches!(
            err,
            CompileError::WrongArgCount {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }

    #[test]
    fn call_argument_types_are_checked() {
        let engine = Engine::with_defaults();
        engine.define_variable("s", TypeId::STR);
        let err = compile_err(&engine, "$s.Contains(5)");
        match err {
            CompileError::ArgTypeMismatch {
                index,
                expected,
                found,
                ..
            } => {
                assert_eq!(index, 0);
                assert_eq!(expected, "str");
                assert_eq!(found, "int");
            }
            other => panic!("expected ArgTypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn operators_reject_mismatched_types() {
        let engine = Engine::with_defaults();
        let err = compile_err(&engine, "#set($x = true + 1)");
        assert_eq!(
            err.to_string(),
            "operator `+` not supported for bool and int"
        );
    }

    #[test]
    fn range_bounds_must_be_literal() {
        let engine = Engine::with_defaults();
        engine.define_variable("n", TypeId::INT);
        let err = compile_err(&engine, "#foreach($i in [1...$n])$i#end");
        assert!(matches!(err, CompileError::NonLiteralRangeBound));
    }

    #[test]
    fn foreach_requires_a_list() {
        let engine = Engine::with_defaults();
        engine.define_variable("s", TypeId::STR);
        let err = compile_err(&engine, "#foreach($c in $s)x#end");
        assert!(matches!(err, CompileError::NotASequence { ty } if ty == "str"));
    }

    #[test]
    fn evaluate_requires_a_string_argument() {
        let engine = Engine::with_defaults();
        let err = compile_err(&engine, "#evaluate(42)");
        assert!(matches!(err, CompileError::NotAString { ty } if ty == "int"));
    }

    #[test]
    fn assignment_targets_must_be_bare_variables() {
        let engine = Engine::with_defaults();
        let names = engine.names();
        let person = engine.types().record(
            names.intern("Person"),
            vec![FieldData::new(names.intern("Name"), TypeId::STR)],
        );
        engine.define_variable("person", person);
        let err = compile_err(&engine, "#set($person.Name = \"x\")");
        assert!(matches!(err, CompileError::UnsupportedAssignTarget));
    }

    #[test]
    fn colliding_embedded_fields_are_rejected() {
        let engine = Engine::with_defaults();
        let names = engine.names();
        let first = engine.types().record(
            names.intern("Primary"),
            vec![FieldData::new(names.intern("Host"), TypeId::STR)],
        );
        let second = engine.types().record(
            names.intern("Fallback"),
            vec![FieldData::new(names.intern("Host"), TypeId::STR)],
        );
        engine.embed_variable(first).unwrap();
        engine.embed_variable(second).unwrap();

        let err = compile_err(&engine, "x");
        assert!(matches!(err, CompileError::DuplicateSelector { path } if path == "Host"));
    }

    #[test]
    fn undefined_names_fail_outside_bare_output() {
        let engine = Engine::with_defaults();
        let err = compile_err(&engine, "#set($x = $nope + 1)");
        assert!(matches!(err, CompileError::UnresolvedSelector { path } if path == "nope"));
    }

    #[test]
    fn parse_errors_surface_through_compile() {
        let engine = Engine::with_defaults();
        let err = compile_err(&engine, "#if(true)unterminated");
        assert!(matches!(err, CompileError::Parse(_)));
    }
}
