use lz_analysis::{analyze, AnalysisOptions};
use lz_core::ast::*;
use lz_interpret::{InterpreterOptions, Runtime, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const UNIT: &str = "match/main.lz";

fn match_value(subject: Expr, lines: Vec<MatchLine>) -> Value {
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new(
                "lib",
                vec![VarDef::new("x", Expr::match_on(subject, lines))],
            ))
            .into_unit(UNIT),
    );
    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    let runtime = Runtime::new(&units, Arc::new(analysis), InterpreterOptions::default())
        .expect("runtime");
    runtime.evaluate_var(UNIT, &["lib", "x"]).expect("evaluation")
}

fn long(value: i64) -> Expr {
    Expr::long(value)
}

fn longs(values: &[i64]) -> Expr {
    Expr::list(values.iter().copied().map(Expr::long).collect())
}

fn long_values(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::long).collect())
}

fn size_lines() -> Vec<MatchLine> {
    vec![
        MatchLine::new(Pattern::expr(long(0)), Expr::string("zero")),
        MatchLine::guarded(
            Pattern::capture("n"),
            Expr::binary(BinaryOp::LessThan, Expr::reference("n"), long(10)),
            Expr::string("medium"),
        ),
        MatchLine::new(Pattern::default_line(), Expr::string("large")),
    ]
}

#[test]
fn first_matching_line_with_passing_guard_wins() {
    assert_eq!(match_value(long(0), size_lines()), Value::string("zero"));
    assert_eq!(match_value(long(5), size_lines()), Value::string("medium"));
    assert_eq!(match_value(long(50), size_lines()), Value::string("large"));
}

#[test]
fn no_matching_line_gives_nil() {
    let lines = vec![MatchLine::new(Pattern::expr(long(1)), Expr::string("one"))];
    assert_eq!(match_value(long(2), lines), Value::Nil);
}

#[test]
fn function_patterns_act_as_predicates() {
    let is_big = Expr::function(
        vec![Parameter::new("v")],
        Expr::binary(BinaryOp::GreaterThan, Expr::reference("v"), long(3)),
    );
    let lines = vec![
        MatchLine::new(Pattern::expr(is_big), Expr::string("big")),
        MatchLine::new(Pattern::wildcard(), Expr::string("small")),
    ];
    assert_eq!(match_value(long(7), lines.clone()), Value::string("big"));
    assert_eq!(match_value(long(1), lines), Value::string("small"));
}

#[test]
fn data_type_patterns_capture_the_subject() {
    let lines = vec![
        MatchLine::new(
            Pattern::data_type(Type::String).capturing("s"),
            Expr::binary(BinaryOp::Concat, Expr::reference("s"), Expr::string("!")),
        ),
        MatchLine::new(Pattern::data_type(Type::Long), Expr::string("long")),
    ];
    assert_eq!(
        match_value(Expr::string("hi"), lines.clone()),
        Value::string("hi!")
    );
    assert_eq!(match_value(long(1), lines.clone()), Value::string("long"));
    assert_eq!(match_value(Expr::nil(), lines), Value::Nil);
}

#[test]
fn list_patterns_destructure() {
    let exact = vec![MatchLine::new(
        Pattern::list(vec![Pattern::capture("a"), Pattern::expr(long(2))]),
        Expr::reference("a"),
    )];
    assert_eq!(match_value(longs(&[1, 2]), exact.clone()), Value::long(1));
    assert_eq!(match_value(longs(&[1, 3]), exact.clone()), Value::Nil);
    assert_eq!(match_value(longs(&[1, 2, 3]), exact), Value::Nil);

    let head_tail = vec![MatchLine::new(
        Pattern::head_tail(vec![Pattern::capture("h")], Some("t")),
        Expr::list(vec![Expr::reference("h"), Expr::reference("t")]),
    )];
    assert_eq!(
        match_value(longs(&[1, 2, 3]), head_tail),
        Value::list(vec![Value::long(1), long_values(&[2, 3])])
    );

    let init_last = vec![MatchLine::new(
        Pattern::init_last(Some("i"), vec![Pattern::capture("l")]),
        Expr::list(vec![Expr::reference("i"), Expr::reference("l")]),
    )];
    assert_eq!(
        match_value(longs(&[1, 2, 3]), init_last),
        Value::list(vec![long_values(&[1, 2]), Value::long(3)])
    );

    let mid = vec![MatchLine::new(
        Pattern::mid_list(
            vec![Pattern::capture("a")],
            Some("m"),
            vec![Pattern::capture("z")],
        ),
        Expr::list(vec![
            Expr::reference("a"),
            Expr::reference("m"),
            Expr::reference("z"),
        ]),
    )];
    assert_eq!(
        match_value(longs(&[1, 2, 3, 4]), mid.clone()),
        Value::list(vec![Value::long(1), long_values(&[2, 3]), Value::long(4)])
    );
    assert_eq!(match_value(longs(&[1]), mid), Value::Nil);
}

#[test]
fn dict_patterns_destructure() {
    let subject = || {
        Expr::dict(vec![
            (Expr::string("name"), Expr::string("ada")),
            (Expr::string("year"), long(1815)),
        ])
    };

    let closed = vec![MatchLine::new(
        Pattern::dict(vec![("name", Pattern::capture("n"))]),
        Expr::reference("n"),
    )];
    assert_eq!(match_value(subject(), closed), Value::Nil);

    let open = vec![MatchLine::new(
        Pattern::open_dict(vec![("name", Pattern::capture("n"))], Some("rest")),
        Expr::list(vec![Expr::reference("n"), Expr::reference("rest")]),
    )];
    assert_eq!(
        match_value(subject(), open),
        Value::list(vec![
            Value::string("ada"),
            Value::dict([("year".to_string(), Value::long(1815))]),
        ])
    );
}

#[test]
fn pattern_expressions_see_the_enclosing_scope() {
    let x = Expr::let_in(
        vec![VarDef::new("limit", long(3))],
        Expr::match_on(
            long(3),
            vec![
                MatchLine::new(Pattern::expr(Expr::reference("limit")), Expr::string("at limit")),
                MatchLine::new(Pattern::default_line(), Expr::string("elsewhere")),
            ],
        ),
    );
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new("lib", vec![VarDef::new("x", x)]))
            .into_unit("match/scoped.lz"),
    );
    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    let runtime = Runtime::new(&units, Arc::new(analysis), InterpreterOptions::plain())
        .expect("runtime");
    assert_eq!(
        runtime.evaluate_var("match/scoped.lz", &["lib", "x"]).unwrap(),
        Value::string("at limit")
    );
}
