//! End-to-end tests through the public `parse`/`transform` API.

use tslower_parser::{json, parse, transform, CodegenOptions, ParserOptions, TransformOptions};

fn transform_ok(source: &str) -> String {
    let result = transform(source, TransformOptions::default());
    assert!(!result.log.has_errors(), "unexpected errors for {source:?}: {:?}", result.log);
    result.code.expect("code for a clean transform")
}

fn error_texts(source: &str) -> Vec<String> {
    let result = parse(source, ParserOptions::default());
    result.log.errors().map(|d| d.text.clone()).collect()
}

#[test]
fn type_annotations_are_erased() {
    assert_eq!(transform_ok("let x: T = v;"), "let x = v;\n");
    assert_eq!(
        transform_ok("function f<T>(a: T, b?: number): T[] { return [a]; }"),
        "function f(a, b) {\n  return [a];\n}\n"
    );
    assert_eq!(transform_ok("type A = string; interface B { x: A }"), "");
}

#[test]
fn type_arguments_versus_comparisons() {
    assert_eq!(transform_ok("f<number>(x);"), "f(x);\n");
    assert_eq!(transform_ok("a<b>c;"), "a < b > c;\n");
    assert_eq!(transform_ok("a < b > c;"), "a < b > c;\n");
}

#[test]
fn enum_values_fold() {
    let code = transform_ok("enum E { A, B, C = 3.3, D }");
    assert!(code.starts_with("var E;\n"), "{code}");
    for member in ["= 0] = \"A\"", "= 1] = \"B\"", "= 3.3] = \"C\"", "= 4.3] = \"D\""] {
        assert!(code.contains(member), "missing {member} in {code}");
    }
}

#[test]
fn string_enum_members_have_no_reverse_mapping() {
    let code = transform_ok("enum S { A = \"a\" }");
    assert!(code.contains("[\"A\"] = \"a\";"), "{code}");
    assert!(!code.contains("] = \"A\""), "{code}");
}

#[test]
fn namespace_merges_with_function() {
    let result = parse("function foo(){} namespace foo{0}", ParserOptions::default());
    assert!(!result.log.has_errors(), "{:?}", result.log);

    let code = transform_ok("function foo(){} namespace foo{0}");
    assert!(!code.contains("var foo"), "{code}");
}

#[test]
fn namespace_conflicts_with_let() {
    let errors = error_texts("let foo; namespace foo{0}");
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("already been declared"), "{errors:?}");
}

#[test]
fn merged_namespaces_share_one_variable() {
    let code = transform_ok("namespace N { export let a = 1 } namespace N { export let b = a }");
    assert_eq!(code.matches("var N").count(), 1, "{code}");
    assert!(code.contains("N.b = N.a"), "{code}");
}

#[test]
fn enum_between_namespaces_keeps_exports_visible() {
    let code = transform_ok("namespace A { export const x = 1 } enum A { Y } namespace A { f(x) }");
    assert_eq!(code.matches("var A").count(), 1, "{code}");
    assert!(code.contains("f(A.x)"), "{code}");
}

#[test]
fn arrow_with_misplaced_return_type_reports_once() {
    let result = parse("let x = (y: any): (y) => {};", ParserOptions::default());
    assert_eq!(result.log.errors().count(), 1, "{:?}", result.log);
}

#[test]
fn decorator_on_function_reports_context() {
    let errors = error_texts("@dec function foo(){}");
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("\"@dec\""), "{errors:?}");
    assert!(errors[0].contains("function"), "{errors:?}");
}

#[test]
fn errors_suppress_output() {
    let result = transform("let = ;", TransformOptions::default());
    assert!(result.code.is_none());
    assert!(result.log.has_errors());
}

#[test]
fn javascript_mode_rejects_types() {
    let options = TransformOptions::default().with_parser(ParserOptions::javascript());
    let result = transform("let x: number = 1;", options);
    assert!(result.code.is_none());
}

#[test]
fn minified_output() {
    let options = TransformOptions::default().with_codegen(CodegenOptions::default().with_minify(true));
    let result = transform("let a: number = 1; if (a) { f<T>(a); }", options);
    assert_eq!(result.code.as_deref(), Some("let a=1;if(a){f(a)}"));
}

#[test]
fn json_duplicate_key_and_trailing_comma() {
    let (value, log) = json::parse(r#"{"a": 1, "a": 2}"#, json::JsonOptions::default());
    assert!(value.is_some());
    let warnings: Vec<_> = log.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].notes.len(), 1);
    assert_eq!(warnings[0].notes[0].span.start, 1);

    let (_, log) = json::parse("[1,]", json::JsonOptions::default());
    assert_eq!(log.errors().count(), 1);

    let (value, log) = json::parse("[1,]", json::JsonOptions::relaxed());
    assert!(value.is_some());
    assert!(log.is_empty());
}
