use lz_analysis::{analyze, Analysis, AnalysisOptions, ReferenceClass};
use lz_core::ast::*;
use pretty_assertions::assert_eq;

fn class_of(analysis: &Analysis, node: NodeId) -> Option<ReferenceClass> {
    analysis
        .reference(node)
        .and_then(|r| r.as_ref().ok())
        .map(|r| r.class)
}

#[test]
fn nested_functions_capture_only_what_they_use_from_outside() {
    let a = Parameter::new("a");
    let a_id = a.meta.id;
    let a_ref = Expr::reference("a");
    let a_ref_id = a_ref.meta.id;
    let b_ref = Expr::reference("b");
    let b_ref_id = b_ref.meta.id;
    let c_ref = Expr::reference("c");

    let inner = Expr::function(
        vec![Parameter::new("b")],
        Expr::binary(
            BinaryOp::Plus,
            Expr::binary(BinaryOp::Plus, a_ref, b_ref),
            c_ref,
        ),
    );
    let inner_id = inner.meta.id;
    let outer = Expr::function(vec![a], inner);
    let outer_id = outer.meta.id;

    let c = VarDef::new("c", Expr::long(10));
    let c_id = c.meta.id;
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new("lib", vec![c, VarDef::new("adder", outer)]))
            .into_unit("closures/nested.lz"),
    );

    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    let a_symbol = analysis.definition(a_id).expect("a declared");
    let c_symbol = analysis.definition(c_id).expect("c declared");

    assert_eq!(analysis.closed_over(inner_id), &[a_symbol, c_symbol]);
    assert_eq!(analysis.closed_over(outer_id), &[c_symbol]);
    assert_eq!(class_of(&analysis, a_ref_id), Some(ReferenceClass::Closure));
    assert_eq!(class_of(&analysis, b_ref_id), Some(ReferenceClass::SimpleLocal));
}

#[test]
fn parameter_defaults_belong_to_the_enclosing_scope() {
    let default_ref = Expr::reference("base");
    let default_ref_id = default_ref.meta.id;
    let function = Expr::function(
        vec![Parameter::new("n").with_default(default_ref)],
        Expr::reference("n"),
    );
    let function_id = function.meta.id;
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new(
                "lib",
                vec![
                    VarDef::new("base", Expr::long(1)),
                    VarDef::new("f", function),
                ],
            ))
            .into_unit("closures/defaults.lz"),
    );

    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    assert!(analysis.closed_over(function_id).is_empty());
    assert_eq!(
        class_of(&analysis, default_ref_id),
        Some(ReferenceClass::SimpleLocal)
    );
}

#[test]
fn references_one_block_out_are_parent_references() {
    let outer_ref = Expr::reference("x");
    let outer_ref_id = outer_ref.meta.id;
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new(
                "lib",
                vec![
                    VarDef::new("x", Expr::long(1)),
                    VarDef::new(
                        "y",
                        Expr::let_in(vec![VarDef::new("z", Expr::long(2))], outer_ref),
                    ),
                ],
            ))
            .into_unit("closures/parent.lz"),
    );

    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    assert_eq!(
        class_of(&analysis, outer_ref_id),
        Some(ReferenceClass::SimpleParent)
    );
}

#[test]
fn match_captures_are_local_to_their_clause() {
    let capture_ref = Expr::reference("head");
    let capture_ref_id = capture_ref.meta.id;
    let function = Expr::function(
        vec![Parameter::new("xs")],
        Expr::match_on(
            Expr::reference("xs"),
            vec![
                MatchLine::new(
                    Pattern::head_tail(vec![Pattern::capture("head")], Some("tail")),
                    capture_ref,
                ),
                MatchLine::new(Pattern::default_line(), Expr::nil()),
            ],
        ),
    );
    let function_id = function.meta.id;
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new("lib", vec![VarDef::new("first", function)]))
            .into_unit("closures/match.lz"),
    );

    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    assert!(analysis.closed_over(function_id).is_empty());
    assert_eq!(
        class_of(&analysis, capture_ref_id),
        Some(ReferenceClass::SimpleLocal)
    );
}
