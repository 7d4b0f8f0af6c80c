use lz_analysis::{analyze, AnalysisOptions};
use lz_core::ast::*;
use lz_core::error::ErrorCode;
use lz_interpret::value::{Adapter, FunctionKind};
use lz_interpret::{InterpreterOptions, LangException, Runtime, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

const UNIT: &str = "closures/main.lz";

fn runtime(vars: Vec<VarDef>) -> Runtime {
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new("lib", vars))
            .into_unit(UNIT),
    );
    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    Runtime::new(&units, Arc::new(analysis), InterpreterOptions::default()).expect("runtime")
}

fn evaluate(vars: Vec<VarDef>, name: &str) -> Result<Value, LangException> {
    runtime(vars).evaluate_var(UNIT, &["lib", name])
}

fn reference(path: &str) -> Expr {
    Expr::reference(path)
}

fn long(value: i64) -> Expr {
    Expr::long(value)
}

fn call(callee: &str, args: Vec<Expr>) -> Expr {
    Expr::call_positional(reference(callee), args)
}

fn params(names: &[&str]) -> Vec<Parameter> {
    names.iter().map(|name| Parameter::new(*name)).collect()
}

/// `(a, b, c) -> a * 100 + b * 10 + c`
fn digits() -> VarDef {
    VarDef::new(
        "digits",
        Expr::function(
            params(&["a", "b", "c"]),
            Expr::binary(
                BinaryOp::Plus,
                Expr::binary(
                    BinaryOp::Plus,
                    Expr::binary(BinaryOp::Mult, reference("a"), long(100)),
                    Expr::binary(BinaryOp::Mult, reference("b"), long(10)),
                ),
                reference("c"),
            ),
        ),
    )
}

/// `(a, b, c, d) -> a * 1000 + b * 100 + c * 10 + d`
fn four() -> VarDef {
    let term = |name: &str, weight: i64| Expr::binary(BinaryOp::Mult, reference(name), long(weight));
    VarDef::new(
        "four",
        Expr::function(
            params(&["a", "b", "c", "d"]),
            Expr::binary(
                BinaryOp::Plus,
                Expr::binary(
                    BinaryOp::Plus,
                    Expr::binary(BinaryOp::Plus, term("a", 1000), term("b", 100)),
                    term("c", 10),
                ),
                reference("d"),
            ),
        ),
    )
}

/// `(n) -> if n <= 1 then 1 else n * name(n - 1)`
fn factorial(name: &str) -> Expr {
    Expr::function(
        params(&["n"]),
        Expr::if_else(
            Expr::binary(BinaryOp::LessThanOrEqual, reference("n"), long(1)),
            long(1),
            Expr::binary(
                BinaryOp::Mult,
                reference("n"),
                call(name, vec![Expr::binary(BinaryOp::Minus, reference("n"), long(1))]),
            ),
        ),
    )
}

#[test]
fn functions_capture_enclosing_let_bindings() {
    let x = Expr::let_in(
        vec![
            VarDef::new("base", long(10)),
            VarDef::new(
                "add",
                Expr::function(
                    params(&["n"]),
                    Expr::binary(BinaryOp::Plus, reference("n"), reference("base")),
                ),
            ),
        ],
        call("add", vec![long(5)]),
    );
    assert_eq!(evaluate(vec![VarDef::new("x", x)], "x").unwrap(), Value::long(15));
}

#[test]
fn returned_closures_keep_their_arguments() {
    let adder = VarDef::new(
        "adder",
        Expr::function(
            params(&["a"]),
            Expr::function(
                params(&["b"]),
                Expr::binary(BinaryOp::Plus, reference("a"), reference("b")),
            ),
        ),
    );
    let x = VarDef::new(
        "x",
        Expr::let_in(
            vec![
                VarDef::new("inc", call("adder", vec![long(1)])),
                VarDef::new("ten", call("adder", vec![long(10)])),
            ],
            Expr::list(vec![call("inc", vec![long(1)]), call("ten", vec![long(1)])]),
        ),
    );
    assert_eq!(
        evaluate(vec![adder, x], "x").unwrap(),
        Value::list(vec![Value::long(2), Value::long(11)])
    );
}

#[test]
fn library_functions_recurse_through_their_own_var() {
    let vars = vec![
        VarDef::new("fact", factorial("fact")),
        VarDef::new("x", call("fact", vec![long(5)])),
    ];
    assert_eq!(evaluate(vars, "x").unwrap(), Value::long(120));
}

#[test]
fn let_bound_functions_recurse() {
    let x = Expr::let_in(
        vec![VarDef::new("fact", factorial("fact"))],
        call("fact", vec![long(4)]),
    );
    assert_eq!(evaluate(vec![VarDef::new("x", x)], "x").unwrap(), Value::long(24));
}

#[test]
fn mutually_recursive_functions_see_each_other() {
    // even(n) -> n == 0 || odd(n - 1), odd(n) -> n != 0 && even(n - 1)
    let step = |name: &str| call(name, vec![Expr::binary(BinaryOp::Minus, reference("n"), long(1))]);
    let vars = vec![
        VarDef::new(
            "even",
            Expr::function(
                params(&["n"]),
                Expr::binary(
                    BinaryOp::Or,
                    Expr::binary(BinaryOp::Equal, reference("n"), long(0)),
                    step("odd"),
                ),
            ),
        ),
        VarDef::new(
            "odd",
            Expr::function(
                params(&["n"]),
                Expr::binary(
                    BinaryOp::And,
                    Expr::binary(BinaryOp::NotEqual, reference("n"), long(0)),
                    step("even"),
                ),
            ),
        ),
        VarDef::new(
            "x",
            Expr::list(vec![call("even", vec![long(4)]), call("odd", vec![long(4)])]),
        ),
    ];
    assert_eq!(
        evaluate(vars, "x").unwrap(),
        Value::list(vec![Value::bool(true), Value::bool(false)])
    );
}

#[test]
fn forward_function_reference_resolves() {
    let vars = vec![
        VarDef::new("f", Expr::function(vec![], call("g", vec![]))),
        VarDef::new("g", Expr::function(vec![], long(1))),
        VarDef::new("x", call("f", vec![])),
    ];
    assert_eq!(evaluate(vars, "x").unwrap(), Value::long(1));
}

#[test]
fn let_scopes_are_fresh_on_every_call() {
    let vars = vec![
        VarDef::new(
            "double",
            Expr::function(
                params(&["n"]),
                Expr::let_in(
                    vec![VarDef::new(
                        "twice",
                        Expr::binary(BinaryOp::Mult, reference("n"), long(2)),
                    )],
                    reference("twice"),
                ),
            ),
        ),
        VarDef::new(
            "x",
            Expr::list(vec![call("double", vec![long(1)]), call("double", vec![long(2)])]),
        ),
    ];
    assert_eq!(
        evaluate(vars, "x").unwrap(),
        Value::list(vec![Value::long(2), Value::long(4)])
    );
}

#[test]
fn defaults_fill_missing_arguments() {
    let vars = vec![
        VarDef::new("base", long(100)),
        VarDef::new(
            "f",
            Expr::function(
                vec![
                    Parameter::new("a"),
                    Parameter::new("b").with_default(reference("base")),
                ],
                Expr::binary(BinaryOp::Plus, reference("a"), reference("b")),
            ),
        ),
        VarDef::new(
            "x",
            Expr::list(vec![
                call("f", vec![long(1)]),
                Expr::call(reference("f"), vec![Argument::named("a", long(2))]),
                Expr::call(
                    reference("f"),
                    vec![
                        Argument::Positional(long(3)),
                        Argument::named("b", long(4)),
                    ],
                ),
            ]),
        ),
    ];
    assert_eq!(
        evaluate(vars, "x").unwrap(),
        Value::list(vec![Value::long(101), Value::long(102), Value::long(7)])
    );
}

#[test]
fn typed_parameters_cast_their_arguments() {
    let vars = vec![
        VarDef::new(
            "f",
            Expr::function(vec![Parameter::typed(Type::Long, "n")], reference("n")),
        ),
        VarDef::new("x", call("f", vec![Expr::string("12")])),
    ];
    assert_eq!(evaluate(vars, "x").unwrap(), Value::long(12));
}

#[test]
fn splatted_arguments_bind_by_position_and_name() {
    let vars = vec![
        digits(),
        VarDef::new(
            "x",
            Expr::call(
                reference("digits"),
                vec![
                    Argument::Splat(Expr::list(vec![long(1), long(2)])),
                    Argument::Splat(Expr::dict(vec![(Expr::string("c"), long(3))])),
                ],
            ),
        ),
    ];
    assert_eq!(evaluate(vars, "x").unwrap(), Value::long(123));
}

#[test]
fn argument_errors() {
    let too_many = vec![
        digits(),
        VarDef::new("x", call("digits", vec![long(1), long(2), long(3), long(4)])),
    ];
    assert_eq!(
        evaluate(too_many, "x").unwrap_err().code,
        ErrorCode::UnexpectedArgument
    );

    let unknown_name = vec![
        digits(),
        VarDef::new(
            "x",
            Expr::call(reference("digits"), vec![Argument::named("d", long(1))]),
        ),
    ];
    assert_eq!(
        evaluate(unknown_name, "x").unwrap_err().code,
        ErrorCode::UnexpectedArgument
    );

    let not_a_function = vec![
        VarDef::new("n", long(1)),
        VarDef::new("x", call("n", vec![])),
    ];
    assert_eq!(
        evaluate(not_a_function, "x").unwrap_err().code,
        ErrorCode::CallingNonFunction
    );
}

#[test]
fn curried_functions_compose_with_the_original() {
    let vars = vec![
        digits(),
        VarDef::new(
            "x",
            Expr::list(vec![
                Expr::call_positional(
                    Expr::curry(reference("digits"), vec![("a", long(1))]),
                    vec![long(2), long(3)],
                ),
                Expr::call_positional(
                    Expr::curry(reference("digits"), vec![("b", long(2))]),
                    vec![long(1), long(3)],
                ),
                Expr::call_positional(
                    Expr::curry(
                        Expr::curry(reference("digits"), vec![("c", long(3))]),
                        vec![("a", long(1))],
                    ),
                    vec![long(2)],
                ),
                call("digits", vec![long(1), long(2), long(3)]),
            ]),
        ),
    ];
    let value = evaluate(vars, "x").unwrap();
    let expected = Value::long(123);
    assert_eq!(value, Value::list(vec![expected.clone(); 4]));
}

#[test]
fn curry_errors() {
    let undeclared = vec![
        digits(),
        VarDef::new("x", Expr::curry(reference("digits"), vec![("z", long(1))])),
    ];
    assert_eq!(
        evaluate(undeclared, "x").unwrap_err().code,
        ErrorCode::UnexpectedArgument
    );

    let not_a_function = vec![VarDef::new("x", Expr::curry(long(1), vec![("a", long(1))]))];
    assert_eq!(
        evaluate(not_a_function, "x").unwrap_err().code,
        ErrorCode::CannotCurry
    );
}

#[test]
fn curry_generic_arity_four() {
    let vars = vec![
        four(),
        VarDef::new("curried", Expr::curry(reference("four"), vec![("b", long(2))])),
        VarDef::new(
            "x",
            Expr::list(vec![
                Expr::call_positional(reference("curried"), vec![long(1), long(3), long(4)]),
                Expr::call(
                    reference("curried"),
                    vec![
                        Argument::Positional(long(1)),
                        Argument::named("d", long(4)),
                        Argument::named("c", long(3)),
                    ],
                ),
            ]),
        ),
    ];
    let runtime = runtime(vars);

    let curried = runtime.evaluate_var(UNIT, &["lib", "curried"]).unwrap();
    let function = curried.as_function().expect("function value");
    let FunctionKind::Curried(adapter) = &function.kind else {
        panic!("expected a curried function");
    };
    assert_eq!(adapter.adapter(), Adapter::Generic);
    assert_eq!(function.arity(), 3);

    assert_eq!(
        runtime.evaluate_var(UNIT, &["lib", "x"]).unwrap(),
        Value::list(vec![Value::long(1234), Value::long(1234)])
    );
}

#[test]
fn curried_values_are_callable_from_many_threads() {
    let vars = vec![
        digits(),
        four(),
        VarDef::new("small", Expr::curry(reference("digits"), vec![("b", long(2))])),
        VarDef::new("generic", Expr::curry(reference("four"), vec![("b", long(2))])),
    ];
    let runtime = runtime(vars);
    let small = runtime.evaluate_var(UNIT, &["lib", "small"]).unwrap();
    let generic = runtime.evaluate_var(UNIT, &["lib", "generic"]).unwrap();
    let small = small.as_function().expect("function value").clone();
    let generic = generic.as_function().expect("function value").clone();

    let contexts: Vec<_> = (0..8).map(|_| runtime.context()).collect();
    let results: Vec<(Vec<Value>, Vec<Value>)> = thread::scope(|scope| {
        let handles: Vec<_> = contexts
            .into_iter()
            .enumerate()
            .map(|(worker, mut ctx)| {
                let small = small.clone();
                let generic = generic.clone();
                scope.spawn(move || {
                    let digit = (worker % 10) as i64;
                    let mut smalls = Vec::new();
                    let mut generics = Vec::new();
                    for _ in 0..50 {
                        smalls.push(
                            small
                                .call(&[Value::long(digit), Value::long(3)], &mut ctx)
                                .unwrap(),
                        );
                        generics.push(
                            generic
                                .call(
                                    &[Value::long(digit), Value::long(3), Value::long(4)],
                                    &mut ctx,
                                )
                                .unwrap(),
                        );
                    }
                    (smalls, generics)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker"))
            .collect()
    });

    for (worker, (smalls, generics)) in results.into_iter().enumerate() {
        let digit = (worker % 10) as i64;
        assert!(smalls.iter().all(|v| *v == Value::long(digit * 100 + 23)));
        assert!(generics.iter().all(|v| *v == Value::long(digit * 1000 + 234)));
    }
}
