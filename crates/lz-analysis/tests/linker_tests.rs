use lz_analysis::{analyze, AnalysisOptions, Linker, SymbolTarget};
use lz_core::ast::*;
use lz_core::error::ErrorCode;
use pretty_assertions::assert_eq;

fn provider(path: &str) -> Unit {
    Module::new()
        .library(Library::new(
            "impl",
            vec![
                VarDef::new("x", Expr::long(1)),
                VarDef::new("y", Expr::long(2)),
            ],
        ))
        .library(Library::exported(
            "api",
            vec![VarDef::new("z", Expr::long(3))],
        ))
        .export("impl.x", "x")
        .into_unit(path)
}

#[test]
fn name_import_follows_export_to_its_target() {
    let imported = Expr::reference("ax");
    let imported_id = imported.meta.id;
    let through_library = Expr::reference("api.z");
    let through_library_id = through_library.meta.id;

    let units = UnitSet::new()
        .with(provider("link/provider.lz"))
        .with(
            Module::new()
                .import(
                    Import::source("link/provider.lz")
                        .name("x", "ax")
                        .name("api", "api"),
                )
                .library(Library::new(
                    "lib",
                    vec![
                        VarDef::new("a", imported),
                        VarDef::new("b", through_library),
                    ],
                ))
                .into_unit("link/consumer.lz"),
        );

    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    let target = |node| {
        analysis
            .reference(node)
            .and_then(|r| r.as_ref().ok())
            .map(|r| r.target)
    };

    assert_eq!(
        target(imported_id),
        analysis.member("link/provider.lz", &["impl", "x"])
    );
    assert_eq!(
        target(through_library_id),
        analysis.member("link/provider.lz", &["api", "z"])
    );
}

#[test]
fn module_import_exposes_exports_only() {
    let units = UnitSet::new()
        .with(provider("link/private_provider.lz"))
        .with(
            Module::new()
                .import(Import::source("link/private_provider.lz").module("p"))
                .library(Library::new(
                    "lib",
                    vec![VarDef::new("a", Expr::reference("p.impl.y"))],
                ))
                .into_unit("link/private_consumer.lz"),
        );

    let err = analyze(&units, &AnalysisOptions::strict())
        .err()
        .expect("private library hidden");
    assert_eq!(err.code(), Some(ErrorCode::UnresolvedReference));
}

#[test]
fn missing_export_is_reported() {
    let units = UnitSet::new()
        .with(provider("link/missing_provider.lz"))
        .with(
            Module::new()
                .import(Import::source("link/missing_provider.lz").name("y", "y"))
                .into_unit("link/missing_consumer.lz"),
        );

    let err = analyze(&units, &AnalysisOptions::strict())
        .err()
        .expect("unexported name rejected");
    assert_eq!(err.code(), Some(ErrorCode::CannotFindExport));
}

#[test]
fn alias_cycles_report_the_chain() {
    let units = UnitSet::new().with(
        Module::new()
            .alias("b", "a")
            .alias("a", "b")
            .into_unit("link/cycle.lz"),
    );

    let err = analyze(&units, &AnalysisOptions::strict())
        .err()
        .expect("cycle rejected");
    assert_eq!(err.code(), Some(ErrorCode::CyclicReference));
    assert!(err.to_string().contains("a -> b -> a"), "{}", err);
}

#[test]
fn export_of_an_alias_links_transitively() {
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new("lib", vec![VarDef::new("v", Expr::long(1))]))
            .alias("lib.v", "short")
            .export("short", "value")
            .into_unit("link/transitive.lz"),
    );

    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    let module = analysis.unit("link/transitive.lz").expect("unit");
    let exports = analysis.arena.symbol(module).exports.expect("exports scope");
    let export = analysis
        .arena
        .scope(exports)
        .get("value")
        .expect("export declared");

    assert_eq!(
        analysis.arena.target_of(export),
        analysis.member("link/transitive.lz", &["lib", "v"])
    );
    assert_eq!(analysis.arena.symbol(export).target, SymbolTarget::Var);
}

#[test]
fn linking_twice_changes_nothing() {
    let units = UnitSet::new().with(
        Module::new()
            .library(Library::new("lib", vec![VarDef::new("v", Expr::long(1))]))
            .alias("lib.v", "short")
            .into_unit("link/idempotent.lz"),
    );

    let mut analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    let alias = analysis
        .member("link/idempotent.lz", &["short"])
        .expect("alias declared");
    let before = analysis.arena.symbol(alias).resolved;

    let units_table = analysis.units.clone();
    let mut linker = Linker::new(&mut analysis.arena, &units_table);
    linker.link(alias).expect("relink");
    linker.link(alias).expect("relink");

    assert!(before.is_some());
    assert_eq!(analysis.arena.symbol(alias).resolved, before);
}

#[test]
fn failed_import_leaves_other_modules_linked() {
    let good = Expr::reference("v");
    let good_id = good.meta.id;
    let units = UnitSet::new()
        .with(provider("link/recovery_provider.lz"))
        .with(
            Module::new()
                .import(Import::source("link/recovery_provider.lz").name("nope", "nope"))
                .into_unit("link/recovery_broken.lz"),
        )
        .with(
            Module::new()
                .import(Import::source("link/recovery_provider.lz").name("x", "x"))
                .library(Library::new("lib", vec![VarDef::new("v", Expr::long(1)), VarDef::new("w", good)]))
                .into_unit("link/recovery_fine.lz"),
        );

    let analysis = analyze(&units, &AnalysisOptions::recovering()).expect("partial analysis");
    let codes: Vec<ErrorCode> = analysis.errors.iter().map(|e| e.code).collect();
    assert_eq!(codes, vec![ErrorCode::CannotFindExport]);

    let fine_import = analysis
        .member("link/recovery_fine.lz", &["x"])
        .expect("import declared");
    assert_eq!(
        analysis.arena.target_of(fine_import),
        analysis.member("link/recovery_provider.lz", &["impl", "x"])
    );
    let broken_import = analysis
        .member("link/recovery_broken.lz", &["nope"])
        .expect("import declared");
    assert_eq!(analysis.arena.symbol(broken_import).resolved, None);
    assert!(matches!(analysis.reference(good_id), Some(Ok(_))));
}

#[test]
fn interactive_sections_see_module_members() {
    let reference = Expr::reference("lib.x");
    let reference_id = reference.meta.id;
    let units = UnitSet::new()
        .with(
            Module::new()
                .library(Library::new("lib", vec![VarDef::new("x", Expr::long(1))]))
                .into_unit("link/session_module.lz"),
        )
        .with(
            Interactive::new()
                .section("link/session_module.lz", vec![VarDef::new("y", reference)])
                .into_unit("link/session.lz"),
        );

    let analysis = analyze(&units, &AnalysisOptions::strict()).expect("analysis");
    let section = analysis
        .member("link/session.lz", &["link/session_module.lz"])
        .expect("section declared");
    let module = analysis.unit("link/session_module.lz");

    assert_eq!(analysis.sections.get(&section).copied(), module);
    assert_eq!(
        analysis
            .reference(reference_id)
            .and_then(|r| r.as_ref().ok())
            .map(|r| r.target),
        analysis.member("link/session_module.lz", &["lib", "x"])
    );
}

#[test]
fn section_for_unknown_module_fails() {
    let units = UnitSet::new().with(
        Interactive::new()
            .section("link/absent.lz", vec![VarDef::new("y", Expr::long(1))])
            .into_unit("link/orphan_session.lz"),
    );

    let err = analyze(&units, &AnalysisOptions::strict())
        .err()
        .expect("missing module rejected");
    assert_eq!(err.code(), Some(ErrorCode::UnresolvedReference));
}
