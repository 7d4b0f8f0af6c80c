use lz_analysis::{analyze, AnalysisOptions, Inspection};
use lz_core::ast::*;
use lz_core::source_map::source_map;
use lz_core::span::Span;
use pretty_assertions::assert_eq;

// lib {
//   x = 1
//   y = x
// }
#[test]
fn inspect_finds_innermost_node() {
    let path = "inspect/positions.lz";
    let file = source_map().register(path, None);

    let literal = Expr::long(1).at(Span::lines(file, (2, 7), (2, 7)));
    let literal_id = literal.meta.id;
    let x = VarDef::new("x", literal).at(Span::lines(file, (2, 3), (2, 7)));
    let x_id = x.meta.id;
    let reference = Expr::reference("x").at(Span::lines(file, (3, 7), (3, 7)));
    let y = VarDef::new("y", reference).at(Span::lines(file, (3, 3), (3, 7)));

    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new("lib", vec![x, y]))
            .into_unit(path),
    );
    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    let x_symbol = analysis.definition(x_id).expect("x declared");

    assert_eq!(analysis.inspect(path, 3, 7), Some(Inspection::Symbol(x_symbol)));
    assert_eq!(analysis.inspect(path, 2, 3), Some(Inspection::Symbol(x_symbol)));
    assert_eq!(analysis.inspect(path, 2, 7), Some(Inspection::Node(literal_id)));

    let unit = analysis.unit(path).expect("unit");
    let members = analysis.arena.symbol(unit).members.expect("member scope");
    assert_eq!(analysis.inspect(path, 9, 1), Some(Inspection::Scope(members)));
}

#[test]
fn inspect_reports_scopes_of_scope_creating_nodes() {
    let path = "inspect/scopes.lz";
    let file = source_map().register(path, None);

    let mut body = Expr::let_in(
        vec![VarDef::new("a", Expr::long(1))],
        Expr::reference("a"),
    );
    body.meta.span = Span::lines(file, (1, 1), (4, 1));
    let let_id = body.meta.id;

    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new("lib", vec![VarDef::new("v", body)]))
            .into_unit(path),
    );
    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");

    assert_eq!(
        analysis.inspect(path, 2, 2),
        analysis.created_scope(let_id).map(Inspection::Scope)
    );
    assert_eq!(analysis.inspect("inspect/never_loaded.lz", 1, 1), None);
}
