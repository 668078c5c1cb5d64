//! The source-to-source instrumentation pass.
//!
//! Parses a JS/TS module, finds every qualifying callable, and rewrites the
//! source so each body executes `__trackFn(file, name, line)` before anything
//! else. Rewriting is insertion-only: block bodies get the call after the
//! opening brace, and expression bodies are wrapped by a pair of insertions
//! around the original bytes. Insertions applied back to front never shift
//! each other, so callables nested inside expression bodies compose.
//!
//! Running the pass on its own output is a no-op: instrumented bodies are
//! recognized and skipped, and the runtime import is deduplicated.

use crate::errors::{InstrumentError, Result};
use crate::language::SourceLanguage;
use crate::naming::{naming_context, node_text, string_literal_value};
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// The tracking primitive injected into every instrumented body.
pub const TRACK_FN: &str = "__trackFn";
/// Module specifier the tracking primitive is imported from.
pub const DEFAULT_RUNTIME_MODULE: &str = "@dct/collector";

/// Directory names never instrumented: third-party trees, build output, and
/// the runtime's own packages.
const EXCLUDED_DIR_NAMES: &[&str] = &["node_modules", ".next", "dist", "@dct"];
/// Path fragments of the runtime's own sources.
const EXCLUDED_PATH_PATTERNS: &[&str] = &["collector/runtime"];

const CALLABLE_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

#[derive(Debug, Clone)]
pub struct PassConfig {
    pub runtime_module: String,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
        }
    }
}

/// The rewritten module plus how many bodies were touched. `instrumented`
/// of zero means the output is byte-identical to the input.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub code: String,
    pub instrumented: usize,
}

/// Aggregate result of instrumenting a directory tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSummary {
    pub files_scanned: usize,
    pub files_rewritten: usize,
    pub functions_instrumented: usize,
}

/// A callable found in the tree, shared between the pass and the census.
pub(crate) struct Callable<'t> {
    pub name: String,
    pub line: u32,
    pub end_line: u32,
    pub body: Node<'t>,
}

struct Edit {
    offset: usize,
    text: String,
}

/// True for paths the pass must never touch. Matching is per path segment,
/// so a root-level `dist/` is excluded while `lib/distance.ts` is not.
pub fn is_excluded_path(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    if normalized
        .split('/')
        .any(|segment| EXCLUDED_DIR_NAMES.contains(&segment))
    {
        return true;
    }
    EXCLUDED_PATH_PATTERNS
        .iter()
        .any(|pattern| normalized.contains(pattern))
}

/// Instrument one module. `display_path` is the path literal baked into the
/// tracking calls; exclusion is the caller's concern (`is_excluded_path`).
pub fn instrument_source(
    source: &str,
    display_path: &str,
    language: SourceLanguage,
    config: &PassConfig,
) -> Result<PassOutcome> {
    let mut parser = language.parser()?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| InstrumentError::Parse {
            path: PathBuf::from(display_path),
        })?;
    let root = tree.root_node();

    // A module that defines the primitive is the runtime itself; touching
    // it would make every tracked call track itself.
    if defines_tracking_primitive(root, source) {
        log::debug!("Skipping {display_path}: defines {TRACK_FN}");
        return Ok(PassOutcome {
            code: source.to_string(),
            instrumented: 0,
        });
    }

    let mut edits = Vec::new();
    let mut instrumented = 0;
    for callable in collect_callables(root, source) {
        if callable.name == TRACK_FN {
            continue;
        }
        if push_tracking_edits(&callable, display_path, source, &mut edits) {
            instrumented += 1;
        }
    }

    if instrumented > 0 && !has_runtime_import(root, source, &config.runtime_module) {
        edits.push(Edit {
            offset: import_insertion_offset(root, source),
            text: format!(
                "import {{ {TRACK_FN} }} from \"{}\";\n",
                config.runtime_module
            ),
        });
    }

    Ok(PassOutcome {
        code: apply_edits(source, edits),
        instrumented,
    })
}

/// Instrument every supported module under `root`, rewriting files in place
/// (or mirroring into `out` when given).
pub fn instrument_tree(
    root: &Path,
    out: Option<&Path>,
    config: &PassConfig,
) -> Result<TreeSummary> {
    let mut summary = TreeSummary::default();

    for entry in ignore::WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(language) = SourceLanguage::from_path(path) else {
            continue;
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        let display_path = relative.to_string_lossy().replace('\\', "/");
        if is_excluded_path(&display_path) {
            continue;
        }

        summary.files_scanned += 1;
        let source = std::fs::read_to_string(path)?;
        let outcome = instrument_source(&source, &display_path, language, config)?;

        let target = match out {
            Some(out_dir) => {
                let target = out_dir.join(relative);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                target
            }
            None => path.to_path_buf(),
        };

        if outcome.instrumented > 0 {
            summary.files_rewritten += 1;
            summary.functions_instrumented += outcome.instrumented;
            std::fs::write(&target, &outcome.code)?;
            log::debug!(
                "Instrumented {} functions in {display_path}",
                outcome.instrumented
            );
        } else if out.is_some() {
            // Mirror untouched files so the output tree is complete.
            std::fs::write(&target, &source)?;
        }
    }

    log::info!(
        "Instrumented {} functions across {} of {} files",
        summary.functions_instrumented,
        summary.files_rewritten,
        summary.files_scanned
    );
    Ok(summary)
}

pub(crate) fn collect_callables<'t>(root: Node<'t>, source: &str) -> Vec<Callable<'t>> {
    let mut callables = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if CALLABLE_KINDS.contains(&node.kind()) {
            // TS overload signatures and abstract members carry no body.
            if let Some(body) = node.child_by_field_name("body") {
                callables.push(Callable {
                    name: naming_context(node, source).resolve(),
                    line: node.start_position().row as u32 + 1,
                    end_line: node.end_position().row as u32 + 1,
                    body,
                });
            }
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    callables
}

/// Queue the insertions for one callable; true when it will be instrumented.
/// The original expression bytes stay in place, so insertions for callables
/// nested inside it keep valid offsets.
fn push_tracking_edits(
    callable: &Callable,
    display_path: &str,
    source: &str,
    edits: &mut Vec<Edit>,
) -> bool {
    let call = format!(
        "{TRACK_FN}({}, {}, {});",
        quote(display_path),
        quote(&callable.name),
        callable.line
    );

    if callable.body.kind() == "statement_block" {
        if starts_with_tracking_call(callable.body, source) {
            return false;
        }
        // Insert right after the opening brace.
        edits.push(Edit {
            offset: callable.body.start_byte() + 1,
            text: format!(" {call}"),
        });
    } else {
        // Expression-bodied arrow: wrap in a block that tracks, then
        // evaluates and returns the original expression.
        edits.push(Edit {
            offset: callable.body.start_byte(),
            text: format!("{{ {call} return ("),
        });
        edits.push(Edit {
            offset: callable.body.end_byte(),
            text: "); }".to_string(),
        });
    }
    true
}

fn starts_with_tracking_call(block: Node, source: &str) -> bool {
    let mut cursor = block.walk();
    for statement in block.named_children(&mut cursor) {
        if statement.kind() == "comment" {
            continue;
        }
        if statement.kind() != "expression_statement" {
            return false;
        }
        let Some(expr) = statement.named_child(0) else {
            return false;
        };
        return expr.kind() == "call_expression"
            && expr
                .child_by_field_name("function")
                .is_some_and(|callee| {
                    callee.kind() == "identifier" && node_text(callee, source) == TRACK_FN
                });
    }
    false
}

/// Does the module declare `__trackFn` at the top level, in any form?
pub(crate) fn defines_tracking_primitive(program: Node, source: &str) -> bool {
    let mut cursor = program.walk();
    for child in program.named_children(&mut cursor) {
        let node = if child.kind() == "export_statement" {
            child.child_by_field_name("declaration").unwrap_or(child)
        } else {
            child
        };
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if node
                    .child_by_field_name("name")
                    .is_some_and(|name| node_text(name, source) == TRACK_FN)
                {
                    return true;
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut decl_cursor = node.walk();
                for declarator in node.named_children(&mut decl_cursor) {
                    if declarator.kind() == "variable_declarator"
                        && declarator
                            .child_by_field_name("name")
                            .is_some_and(|name| node_text(name, source) == TRACK_FN)
                    {
                        return true;
                    }
                }
            }
            _ => {}
        }
    }
    false
}

fn has_runtime_import(program: Node, source: &str, runtime_module: &str) -> bool {
    let mut cursor = program.walk();
    program.named_children(&mut cursor).any(|child| {
        child.kind() == "import_statement"
            && child
                .child_by_field_name("source")
                .is_some_and(|src| string_literal_value(src, source) == runtime_module)
            && node_text(child, source).contains(TRACK_FN)
    })
}

/// Where the injected import goes: after the hashbang and any leading
/// directive prologue ("use client" and friends must stay first).
fn import_insertion_offset(program: Node, source: &str) -> usize {
    let mut cursor = program.walk();
    for child in program.named_children(&mut cursor) {
        match child.kind() {
            "hash_bang_line" | "comment" => continue,
            "expression_statement" => {
                if child.named_child(0).is_some_and(|e| e.kind() == "string") {
                    continue;
                }
                return child.start_byte();
            }
            _ => return child.start_byte(),
        }
    }
    source.len()
}

/// Apply insertions back to front. The sort is stable and callables are
/// collected outermost first, so when two wrappers close at the same offset
/// the inner one's closer ends up before the outer's.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.offset.cmp(&a.offset));
    let mut code = source.to_string();
    for edit in edits {
        code.insert_str(edit.offset, &edit.text);
    }
    code
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> PassOutcome {
        instrument_source(
            source,
            "lib/sample.ts",
            SourceLanguage::TypeScript,
            &PassConfig::default(),
        )
        .unwrap()
    }

    fn run_tsx(source: &str) -> PassOutcome {
        instrument_source(
            source,
            "components/sample.tsx",
            SourceLanguage::Tsx,
            &PassConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn instruments_function_declaration() {
        let outcome = run("function greet(name: string) {\n  return `hi ${name}`;\n}\n");
        assert_eq!(outcome.instrumented, 1);
        assert!(outcome.code.contains("__trackFn(\"lib/sample.ts\", \"greet\", 1);"));
        assert!(outcome.code.starts_with("import { __trackFn } from \"@dct/collector\";\n"));
    }

    #[test]
    fn tracking_call_is_first_statement() {
        let outcome = run("function f() {\n  const x = 1;\n  return x;\n}\n");
        let brace = outcome.code.find('{').unwrap();
        let call = outcome.code.find("__trackFn").unwrap();
        let statement = outcome.code.find("const x").unwrap();
        assert!(brace < call && call < statement);
    }

    #[test]
    fn rewrites_expression_bodied_arrow_to_block() {
        let outcome = run("const double = (n: number) => n * 2;\n");
        assert_eq!(outcome.instrumented, 1);
        assert!(
            outcome
                .code
                .contains("=> { __trackFn(\"lib/sample.ts\", \"double\", 1); return (n * 2); }")
        );
    }

    #[test]
    fn resolves_variable_and_property_names() {
        let outcome = run(concat!(
            "const fetchUser = async () => {\n  return null;\n};\n",
            "const api = {\n  list: function () {\n    return [];\n  },\n};\n",
        ));
        assert!(outcome.code.contains("\"fetchUser\", 1"));
        assert!(outcome.code.contains("\"list\", 5"));
    }

    #[test]
    fn resolves_class_members() {
        let outcome = run(concat!(
            "class UserService {\n",
            "  constructor() {\n    this.cache = new Map();\n  }\n",
            "  getUser(id: string) {\n    return this.cache.get(id);\n  }\n",
            "  handler = () => {\n    return 1;\n  };\n",
            "}\n",
        ));
        assert!(outcome.code.contains("\"UserService.constructor\", 2"));
        assert!(outcome.code.contains("\"UserService.getUser\", 5"));
        // Class field initializers name by the property alone.
        assert!(outcome.code.contains("\"handler\", 8"));
    }

    #[test]
    fn resolves_default_export_and_anonymous() {
        let outcome = run_tsx("export default function () {\n  return <div />;\n}\n");
        assert!(outcome.code.contains("\"default\", 1"));

        let outcome = run("[1, 2].map(function (n) {\n  return n;\n});\n");
        assert!(outcome.code.contains("\"anonymous\", 1"));
    }

    #[test]
    fn assignment_target_names_the_function() {
        let outcome = run("let handler;\nhandler = () => {\n  return 1;\n};\n");
        assert!(outcome.code.contains("\"handler\", 2"));
    }

    #[test]
    fn computed_method_key_falls_back() {
        let outcome = run("class C {\n  [Symbol.iterator]() {\n    return null;\n  }\n}\n");
        assert!(outcome.code.contains("\"C.method\", 2"));
    }

    #[test]
    fn instruments_callback_nested_in_expression_arrow() {
        let outcome = run("const g = (xs) => xs.filter((x) => x > 0);\n");
        assert_eq!(outcome.instrumented, 2);
        assert!(outcome.code.contains(concat!(
            "const g = (xs) => { __trackFn(\"lib/sample.ts\", \"g\", 1); ",
            "return (xs.filter((x) => { __trackFn(\"lib/sample.ts\", \"anonymous\", 1); ",
            "return (x > 0); })); };",
        )));

        let again = run(&outcome.code);
        assert_eq!(again.instrumented, 0);
        assert_eq!(again.code, outcome.code);
    }

    #[test]
    fn instruments_block_callback_nested_in_expression_arrow() {
        let outcome = run("const h = (xs) => xs.map(function (x) {\n  return x + 1;\n});\n");
        assert_eq!(outcome.instrumented, 2);
        assert!(outcome.code.contains(concat!(
            "const h = (xs) => { __trackFn(\"lib/sample.ts\", \"h\", 1); ",
            "return (xs.map(function (x) { __trackFn(\"lib/sample.ts\", \"anonymous\", 1);\n",
            "  return x + 1;\n})); };",
        )));

        let again = run(&outcome.code);
        assert_eq!(again.instrumented, 0);
        assert_eq!(again.code, outcome.code);
    }

    #[test]
    fn arrow_returning_arrow_nests_wrappers() {
        // Both bodies end on the same byte; the wrappers must still nest.
        let outcome = run("const add = (a) => (b) => a + b;\n");
        assert_eq!(outcome.instrumented, 2);
        assert!(outcome.code.contains(concat!(
            "const add = (a) => { __trackFn(\"lib/sample.ts\", \"add\", 1); ",
            "return ((b) => { __trackFn(\"lib/sample.ts\", \"anonymous\", 1); ",
            "return (a + b); }); };",
        )));

        let again = run(&outcome.code);
        assert_eq!(again.instrumented, 0);
        assert_eq!(again.code, outcome.code);
    }

    #[test]
    fn pass_is_idempotent() {
        let source = concat!(
            "const double = (n) => n * 2;\n",
            "function greet() {\n  return 1;\n}\n",
            "class C {\n  m() {\n    return 2;\n  }\n}\n",
        );
        let first = run(source);
        assert_eq!(first.instrumented, 3);

        let second = run(&first.code);
        assert_eq!(second.instrumented, 0);
        assert_eq!(second.code, first.code);
    }

    #[test]
    fn module_defining_the_primitive_is_untouched() {
        for source in [
            "export function __trackFn(file, name, line) {\n  count(file, name, line);\n}\n",
            "function __trackFn() {\n  return;\n}\nfunction other() {\n  return;\n}\n",
            "const __trackFn = () => {\n  return;\n};\n",
        ] {
            let outcome = run(source);
            assert_eq!(outcome.instrumented, 0);
            assert_eq!(outcome.code, source);
        }
    }

    #[test]
    fn existing_import_is_not_duplicated() {
        let source = concat!(
            "import { __trackFn } from \"@dct/collector\";\n",
            "function a() {\n  return 1;\n}\n",
            "function b() {\n  return 2;\n}\n",
        );
        let outcome = run(source);
        assert_eq!(outcome.instrumented, 2);
        assert_eq!(outcome.code.matches("import { __trackFn }").count(), 1);
    }

    #[test]
    fn directive_prologue_stays_first() {
        let outcome = run("\"use client\";\nexport function Page() {\n  return null;\n}\n");
        assert!(outcome.code.starts_with("\"use client\";\n"));
        assert!(outcome.code.contains("import { __trackFn }"));
    }

    #[test]
    fn excluded_paths() {
        assert!(is_excluded_path("node_modules/react/index.js"));
        assert!(is_excluded_path("app/.next/server/page.js"));
        assert!(is_excluded_path("packages/dist/bundle.js"));
        assert!(is_excluded_path("packages\\dist\\bundle.js"));
        assert!(is_excluded_path("@dct/collector/index.ts"));
        assert!(!is_excluded_path("app/page.tsx"));
        assert!(!is_excluded_path("lib/distance.ts"));
    }

    #[test]
    fn excluded_paths_match_top_level_directories() {
        assert!(is_excluded_path("dist/bundle.js"));
        assert!(is_excluded_path(".next/server/page.js"));
        assert!(is_excluded_path("node_modules/pkg/index.js"));
        assert!(!is_excluded_path("distribution/report.ts"));
    }

    #[test]
    fn getters_and_setters_are_instrumented() {
        let outcome = run(concat!(
            "class Box {\n",
            "  get value() {\n    return this._v;\n  }\n",
            "  set value(v) {\n    this._v = v;\n  }\n",
            "}\n",
        ));
        assert_eq!(outcome.instrumented, 2);
        assert!(outcome.code.contains("\"Box.value\", 2"));
        assert!(outcome.code.contains("\"Box.value\", 5"));
    }

    #[test]
    fn path_with_quotes_is_escaped() {
        let outcome = instrument_source(
            "function f() {\n  return 1;\n}\n",
            "lib/\"odd\".ts",
            SourceLanguage::TypeScript,
            &PassConfig::default(),
        )
        .unwrap();
        assert!(outcome.code.contains("__trackFn(\"lib/\\\"odd\\\".ts\""));
    }

    #[test]
    fn instrument_tree_rewrites_in_place() {
        let temp = tempfile::TempDir::new().unwrap();
        let lib = temp.path().join("lib");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join("a.ts"), "export function f() {\n  return 1;\n}\n").unwrap();
        std::fs::write(lib.join("styles.css"), "body {}\n").unwrap();

        let deps = temp.path().join("node_modules/pkg");
        std::fs::create_dir_all(&deps).unwrap();
        std::fs::write(deps.join("index.js"), "function x() {\n  return 1;\n}\n").unwrap();

        let summary = instrument_tree(temp.path(), None, &PassConfig::default()).unwrap();
        assert_eq!(summary.files_rewritten, 1);
        assert_eq!(summary.functions_instrumented, 1);

        let rewritten = std::fs::read_to_string(lib.join("a.ts")).unwrap();
        assert!(rewritten.contains("__trackFn(\"lib/a.ts\", \"f\", 1);"));

        let untouched = std::fs::read_to_string(deps.join("index.js")).unwrap();
        assert!(!untouched.contains("__trackFn"));
    }
}
