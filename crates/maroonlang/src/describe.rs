//! Schema describers: a hand-maintained meta-model of the IR node kinds
//! with two pure emitters, a Markdown human form and a Rust source form.
//! Must be kept in sync with `ir.rs` by hand; `describe_smoke` guards the
//! node list.

pub struct Node {
    pub name: &'static str,
    pub doc: &'static str,
    pub kind: NodeKind,
}

pub enum NodeKind {
    Struct(&'static [Field]),
    Variant(&'static [&'static str]),
}

pub struct Field {
    /// The JSON field name (the Rust emitter renames `type`).
    pub name: &'static str,
    pub ty: &'static str,
}

pub fn schema_nodes() -> &'static [Node] {
    NODES
}

const LINE: Field = Field { name: "line", ty: "u32" };

static NODES: &[Node] = {
    use NodeKind::*;
    &[
        Node {
            name: "Program",
            doc: "Top-level: the source tag, the namespace map, and the ordered test list.",
            kind: Struct(&[
                Field { name: "src", ty: "Option<String>" },
                Field { name: "maroon", ty: "BTreeMap<String, Namespace>" },
                Field { name: "tests", ty: "Vec<TestCase>" },
            ]),
        },
        Node {
            name: "Namespace",
            doc: "Fibers plus the types they share; the `global` fiber is required.",
            kind: Struct(&[
                LINE,
                Field { name: "fibers", ty: "BTreeMap<String, Fiber>" },
                Field { name: "types", ty: "BTreeMap<String, TypeDecl>" },
            ]),
        },
        Node {
            name: "Fiber",
            doc: "A container of functions sharing a name-space.",
            kind: Struct(&[LINE, Field { name: "functions", ty: "BTreeMap<String, Function>" }]),
        },
        Node {
            name: "Function",
            doc: "Return type (absent = unit), argument type names, and a body block.",
            kind: Struct(&[
                LINE,
                Field { name: "ret", ty: "Option<String>" },
                Field { name: "args", ty: "Vec<String>" },
                Field { name: "body", ty: "Block" },
            ]),
        },
        Node {
            name: "TypeDecl",
            doc: "A named type declaration.",
            kind: Struct(&[LINE, Field { name: "def", ty: "TypeDef" }]),
        },
        Node {
            name: "TypeDef",
            doc: "Struct, enum, or derived optional.",
            kind: Variant(&["Struct", "Enum", "Optional"]),
        },
        Node {
            name: "StructDef",
            doc: "An ordered field list.",
            kind: Struct(&[Field { name: "fields", ty: "Vec<StructField>" }]),
        },
        Node {
            name: "StructField",
            doc: "",
            kind: Struct(&[Field { name: "name", ty: "String" }, Field { name: "type", ty: "String" }]),
        },
        Node {
            name: "EnumDef",
            doc: "An ordered case list.",
            kind: Struct(&[Field { name: "cases", ty: "Vec<EnumCase>" }]),
        },
        Node {
            name: "EnumCase",
            doc: "",
            kind: Struct(&[Field { name: "key", ty: "String" }, Field { name: "type", ty: "String" }]),
        },
        Node {
            name: "OptionalDef",
            doc: "Derived wrapper around an inner type; never user-written.",
            kind: Struct(&[Field { name: "type", ty: "String" }]),
        },
        Node {
            name: "Block",
            doc: "A lexical scope: owned vars plus the ordered code list.",
            kind: Struct(&[
                LINE,
                Field { name: "vars", ty: "Vec<Var>" },
                Field { name: "code", ty: "Vec<StmtOrBlock>" },
            ]),
        },
        Node {
            name: "Var",
            doc: "Regular local, bound argument, or match-arm capture alias.",
            kind: Variant(&["Regular", "Argument", "CaptureAlias"]),
        },
        Node {
            name: "RegularVar",
            doc: "",
            kind: Struct(&[
                LINE,
                Field { name: "name", ty: "String" },
                Field { name: "type", ty: "String" },
                Field { name: "init", ty: "String" },
            ]),
        },
        Node {
            name: "ArgumentVar",
            doc: "",
            kind: Struct(&[
                LINE,
                Field { name: "name", ty: "String" },
                Field { name: "type", ty: "String" },
            ]),
        },
        Node {
            name: "CaptureAliasVar",
            doc: "Aliases the payload of case `key` of the discriminant `src`.",
            kind: Struct(&[
                Field { name: "name", ty: "String" },
                Field { name: "key", ty: "String" },
                Field { name: "src", ty: "String" },
            ]),
        },
        Node {
            name: "StmtOrBlock",
            doc: "One item of a code list.",
            kind: Variant(&["Stmt", "If", "Block", "MatchEnum", "BlockPlaceholder"]),
        },
        Node {
            name: "Stmt",
            doc: "An opaque single unit of code, preserved verbatim.",
            kind: Struct(&[LINE, Field { name: "stmt", ty: "String" }]),
        },
        Node {
            name: "If",
            doc: "",
            kind: Struct(&[
                LINE,
                Field { name: "cond", ty: "String" },
                Field { name: "yes", ty: "Box<StmtOrBlock>" },
                Field { name: "no", ty: "Box<StmtOrBlock>" },
            ]),
        },
        Node {
            name: "MatchEnum",
            doc: "A pattern match over the enum-typed variable `var`.",
            kind: Struct(&[
                LINE,
                Field { name: "var", ty: "String" },
                Field { name: "arms", ty: "Vec<Arm>" },
            ]),
        },
        Node {
            name: "Arm",
            doc: "Absent `key` marks the default arm; `capture` requires `key`.",
            kind: Struct(&[
                LINE,
                Field { name: "key", ty: "Option<String>" },
                Field { name: "capture", ty: "Option<String>" },
                Field { name: "code", ty: "Block" },
            ]),
        },
        Node {
            name: "BlockPlaceholder",
            doc: "Transient construction marker; never present in finalized IR.",
            kind: Struct(&[LINE, Field { name: "idx", ty: "u32" }]),
        },
        Node {
            name: "TestCase",
            doc: "A declarative expectation about running one fiber.",
            kind: Variant(&["RunFiber", "FiberShouldThrow"]),
        },
        Node {
            name: "RunFiber",
            doc: "The fiber's transcript must equal `golden_output` verbatim.",
            kind: Struct(&[
                LINE,
                Field { name: "maroon", ty: "String" },
                Field { name: "fiber", ty: "String" },
                Field { name: "golden_output", ty: "Vec<String>" },
            ]),
        },
        Node {
            name: "FiberShouldThrow",
            doc: "The fiber must fail with exactly this error message.",
            kind: Struct(&[
                LINE,
                Field { name: "maroon", ty: "String" },
                Field { name: "fiber", ty: "String" },
                Field { name: "error", ty: "String" },
            ]),
        },
    ]
};

pub fn to_markdown() -> String {
    let mut out = String::from("# Maroon IR schema\n");
    for node in schema_nodes() {
        out.push_str("\n## ");
        out.push_str(node.name);
        out.push('\n');
        if !node.doc.is_empty() {
            out.push('\n');
            out.push_str(node.doc);
            out.push('\n');
        }
        match &node.kind {
            NodeKind::Struct(fields) => {
                out.push_str("\n| Field | Type |\n|---|---|\n");
                for f in *fields {
                    out.push_str("| `");
                    out.push_str(f.name);
                    out.push_str("` | `");
                    out.push_str(f.ty);
                    out.push_str("` |\n");
                }
            }
            NodeKind::Variant(cases) => {
                out.push_str("\nOne of:\n");
                for c in *cases {
                    out.push_str("- `");
                    out.push_str(c);
                    out.push_str("`\n");
                }
            }
        }
    }
    out
}

pub fn to_rust() -> String {
    let mut out = String::from(
        "use serde::{Deserialize, Serialize};\nuse std::collections::BTreeMap;\n",
    );
    for node in schema_nodes() {
        out.push('\n');
        if !node.doc.is_empty() {
            out.push_str("/// ");
            out.push_str(node.doc);
            out.push('\n');
        }
        out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        match &node.kind {
            NodeKind::Struct(fields) => {
                out.push_str("pub struct ");
                out.push_str(node.name);
                out.push_str(" {\n");
                for f in *fields {
                    if f.name == "type" {
                        out.push_str("    #[serde(rename = \"type\")]\n    pub ty: ");
                    } else {
                        out.push_str("    pub ");
                        out.push_str(f.name);
                        out.push_str(": ");
                    }
                    out.push_str(f.ty);
                    out.push_str(",\n");
                }
                out.push_str("}\n");
            }
            NodeKind::Variant(cases) => {
                out.push_str("pub enum ");
                out.push_str(node.name);
                out.push_str(" {\n");
                for c in *cases {
                    out.push_str("    ");
                    out.push_str(c);
                    out.push('(');
                    // Variant payload node names follow the variant names,
                    // except where the payload is a shared node.
                    let payload = match (node.name, *c) {
                        ("TypeDef", "Struct") => "StructDef".to_string(),
                        ("TypeDef", "Enum") => "EnumDef".to_string(),
                        ("TypeDef", "Optional") => "OptionalDef".to_string(),
                        ("Var", v) => format!("{v}Var"),
                        ("StmtOrBlock", v) => v.to_string(),
                        (_, v) => v.to_string(),
                    };
                    out.push_str(&payload);
                    out.push_str("),\n");
                }
                out.push_str("}\n");
            }
        }
    }
    out
}
