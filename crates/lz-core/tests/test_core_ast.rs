// Core syntax tree, span and diagnostics tests
// Focus: builder helpers, node ordering, unit sets, error codes and diagnostic rendering

use lz_core::ast::*;
use lz_core::diagnostics::{Diagnostic, DiagnosticDisplayOptions, DiagnosticManager};
use lz_core::error::{AnalysisError, Error, ErrorCode};
use lz_core::source_map::source_map;
use lz_core::span::Span;
use lz_core::Result;
use pretty_assertions::assert_eq;

// ===== BUILDERS =====

#[test]
fn test_reference_paths_split_on_dots() {
    let reference = Reference::local("lib.inner.x");
    assert_eq!(reference.path, vec!["lib", "inner", "x"]);
    assert!(!reference.is_simple());
    assert_eq!(reference.to_string(), "lib.inner.x");

    let global = Reference::anchored(Anchor::Global, "std");
    assert_eq!(global.to_string(), "$std");
}

#[test]
fn test_node_ids_are_unique() {
    let first = Expr::long(1);
    let second = Expr::long(1);
    assert_ne!(first.meta.id, second.meta.id);
    assert_eq!(first.kind, second.kind);
}

#[test]
fn test_pattern_captures_in_binding_order() {
    let pattern = Pattern::mid_list(
        vec![Pattern::capture("a")],
        Some("mid"),
        vec![Pattern::capture("z")],
    )
    .capturing("all");

    let names: Vec<&str> = pattern.captures().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "mid", "z", "all"]);
}

#[test]
fn test_unit_set_replaces_units_by_path() {
    let first = Module::new().into_unit("a.lz");
    let replacement = Module::new().global("a").into_unit("a.lz");
    let units = UnitSet::new().with(first).with(replacement);

    assert_eq!(units.len(), 1);
    let Some(unit) = units.get("a.lz") else {
        panic!("unit missing");
    };
    match &unit.kind {
        UnitKind::Module(module) => assert_eq!(module.global_name.as_deref(), Some("a")),
        UnitKind::Interactive(_) => panic!("expected module"),
    }
    assert_eq!(source_map().file_id("a.lz"), Some(unit.file));
}

#[test]
fn test_unit_dumps_as_json() -> Result<()> {
    let unit = Module::new()
        .library(Library::new("lib", vec![VarDef::new("x", Expr::long(1))]))
        .into_unit("json.lz");
    let json = dump_json(&unit)?;
    assert!(json.contains("\"path\": \"json.lz\""));
    Ok(())
}

#[test]
fn test_numeric_result_types() {
    assert_eq!(Type::numeric_result(Type::Long, Type::Long), Type::Long);
    assert_eq!(Type::numeric_result(Type::Long, Type::Double), Type::Double);
    assert_eq!(Type::numeric_result(Type::Double, Type::Decimal), Type::Decimal);
    assert_eq!(Type::numeric_result(Type::String, Type::Long), Type::Any);
    assert_eq!(Type::Decimal.to_string(), "decimal");
}

// ===== ERRORS & DIAGNOSTICS =====

#[test]
fn test_error_codes_render_screaming_snake() {
    let err = Error::analysis(ErrorCode::CannotFindExport, "no export y", Span::null());
    assert_eq!(err.code(), Some(ErrorCode::CannotFindExport));
    assert_eq!(err.to_string(), "CANNOT_FIND_EXPORT: no export y");
    assert!(ErrorCode::CyclicReference.is_analysis());
    assert!(!ErrorCode::CyclicEvaluation.is_analysis());
}

#[test]
fn test_plain_rendering_includes_code_and_location() {
    let file = source_map().register("diag.lz", None);
    let error = AnalysisError::new(ErrorCode::UnresolvedReference, "Cannot resolve y")
        .with_span(Span::lines(file, (2, 5), (2, 6)));
    let diagnostic = Diagnostic::from(&error);

    let lines = DiagnosticManager::render(
        &diagnostic,
        Some("analysis"),
        &DiagnosticDisplayOptions::plain(false),
    )
    .unwrap_or_default();

    assert_eq!(
        lines,
        vec![
            "[analysis] ERROR: Cannot resolve y (UNRESOLVED_REFERENCE)".to_string(),
            "   at diag.lz:2:5".to_string(),
        ]
    );
}

#[test]
fn test_info_hidden_unless_verbose() {
    let diagnostic: Diagnostic = Diagnostic::info("linked 3 units".to_string());
    let quiet = DiagnosticManager::render(&diagnostic, None, &DiagnosticDisplayOptions::plain(false));
    let verbose = DiagnosticManager::render(&diagnostic, None, &DiagnosticDisplayOptions::plain(true));
    assert!(quiet.is_none());
    assert_eq!(verbose.map(|lines| lines.len()), Some(1));
}

#[test]
fn test_manager_tracks_errors() {
    let manager = DiagnosticManager::new();
    manager.add_diagnostic(Diagnostic::warning("shadowed".to_string()));
    assert!(!manager.has_errors());
    manager.error(Diagnostic::error("broken".to_string()));
    assert!(manager.has_errors());
    assert_eq!(manager.get_diagnostics().len(), 2);
    manager.clear();
    assert!(manager.get_diagnostics().is_empty());
}

#[test]
fn test_logging_setup_is_idempotent() -> Result<()> {
    use lz_core::logging::{setup_logging, LogFormat, LogLevel};

    setup_logging(Some(LogLevel::Debug), LogFormat::Pretty)?;
    setup_logging(None, LogFormat::Json)?;
    Ok(())
}
