use maroonlang::describe;

#[test]
fn markdown_lists_every_node() {
    let md = describe::to_markdown();
    for name in [
        "Program",
        "Namespace",
        "Fiber",
        "Function",
        "TypeDecl",
        "TypeDef",
        "Block",
        "Var",
        "StmtOrBlock",
        "MatchEnum",
        "Arm",
        "BlockPlaceholder",
        "TestCase",
        "RunFiber",
        "FiberShouldThrow",
    ] {
        assert!(md.contains(&format!("## {name}")), "missing node {name}");
    }
    assert!(md.contains("| `golden_output` | `Vec<String>` |"));
}

#[test]
fn rust_form_is_plausible_source() {
    let src = describe::to_rust();
    assert!(src.starts_with("use serde::{Deserialize, Serialize};"));
    assert!(src.contains("pub struct Program {"));
    assert!(src.contains("pub enum StmtOrBlock {"));
    assert!(src.contains("MatchEnum(MatchEnum),"));
    assert!(src.contains("Regular(RegularVar),"));
    assert!(src.contains("Struct(StructDef),"));
    assert!(src.contains("#[serde(rename = \"type\")]"));
    // Balanced braces is a cheap proxy for well-formedness.
    assert_eq!(
        src.matches('{').count(),
        src.matches('}').count()
    );
}

#[test]
fn emitters_are_pure() {
    assert_eq!(describe::to_markdown(), describe::to_markdown());
    assert_eq!(describe::to_rust(), describe::to_rust());
}
