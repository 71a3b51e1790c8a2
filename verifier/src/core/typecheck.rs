//! Parser for `--pretty false` compiler diagnostics.
//!
//! Grammar, one diagnostic per physical line:
//! `<filePath>(<line>,<column>): error <code>: <message>`

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{TypecheckDiagnostic, TypecheckVerdict};

/// Diagnostic code for unresolved module imports.
pub const MODULE_NOT_FOUND_CODE: &str = "TS2307";

const TYPE_DECLARATIONS_CLAUSE: &str = " or its corresponding type declarations";

static DIAGNOSTIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+?)\((?P<line>\d+),(?P<column>\d+)\): error (?P<code>[A-Za-z]*\d+): (?P<message>.*)$")
        .unwrap()
});
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());

/// Parse every well-formed diagnostic line in `output`; other lines are skipped.
pub fn parse_typecheck_output(output: &str) -> TypecheckVerdict {
    TypecheckVerdict {
        diagnostics: output.lines().filter_map(parse_diagnostic_line).collect(),
    }
}

/// Parse a single line, returning `None` unless every field is present.
pub fn parse_diagnostic_line(line: &str) -> Option<TypecheckDiagnostic> {
    let caps = DIAGNOSTIC_RE.captures(line.trim_end_matches('\r'))?;
    let line_no = caps["line"].parse().ok()?;
    let column = caps["column"].parse().ok()?;
    let code = caps["code"].to_string();
    let message = caps["message"].to_string();
    let module = if code == MODULE_NOT_FOUND_CODE {
        extract_module(&message)
    } else {
        None
    };
    Some(TypecheckDiagnostic {
        file: caps["file"].to_string(),
        line: line_no,
        column,
        code,
        message,
        module,
    })
}

fn extract_module(message: &str) -> Option<String> {
    let trimmed = message.trim_end().trim_end_matches('.');
    let trimmed = trimmed
        .strip_suffix(TYPE_DECLARATIONS_CLAUSE)
        .unwrap_or(trimmed);
    QUOTED_RE
        .captures(trimmed)
        .map(|caps| caps[1].to_string())
}

/// Unique module specifiers from module-not-found diagnostics, in order.
pub fn missing_modules(diagnostics: &[TypecheckDiagnostic]) -> Vec<String> {
    let mut modules: Vec<String> = Vec::new();
    for module in diagnostics.iter().filter_map(|d| d.module.as_ref()) {
        if !modules.contains(module) {
            modules.push(module.clone());
        }
    }
    modules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_module_not_found() {
        let verdict = parse_typecheck_output("src/a.ts(10,5): error TS2307: Cannot find module 'x'");
        assert_eq!(verdict.diagnostics.len(), 1);
        let diag = &verdict.diagnostics[0];
        assert_eq!(diag.file, "src/a.ts");
        assert_eq!((diag.line, diag.column), (10, 5));
        assert_eq!(diag.code, "TS2307");
        assert_eq!(diag.module.as_deref(), Some("x"));
    }

    #[test]
    fn strips_type_declarations_clause() {
        let line = "src/b.ts(1,20): error TS2307: Cannot find module '@scope/pkg' or its corresponding type declarations.";
        let diag = parse_diagnostic_line(line).expect("diagnostic");
        assert_eq!(diag.module.as_deref(), Some("@scope/pkg"));
        assert!(diag.message.ends_with("type declarations."));
    }

    #[test]
    fn module_only_for_reserved_code() {
        let line = "src/c.ts(3,1): error TS2322: Type 'string' is not assignable to type 'number'.";
        let diag = parse_diagnostic_line(line).expect("diagnostic");
        assert_eq!(diag.module, None);
    }

    #[test]
    fn file_paths_with_spaces_and_absolute() {
        let output = "\
/home/me/My Project/src/index.ts(7,12): error TS2339: Property 'foo' does not exist.
C:\\work\\app dir\\main.ts(1,1): error TS1005: ';' expected.";
        let verdict = parse_typecheck_output(output);
        assert_eq!(verdict.diagnostics.len(), 2);
        assert_eq!(verdict.diagnostics[0].file, "/home/me/My Project/src/index.ts");
        assert_eq!(verdict.diagnostics[1].file, "C:\\work\\app dir\\main.ts");
    }

    #[test]
    fn codes_are_not_limited_to_ts_prefix() {
        let diag = parse_diagnostic_line("src/d.ts(4,9): error X1005: custom check failed.")
            .expect("diagnostic");
        assert_eq!(diag.code, "X1005");
        assert_eq!(diag.message, "custom check failed.");
        assert_eq!(diag.module, None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let output = "\
Found 2 errors.
src/a.ts(10): error TS2307: missing column
src/a.ts(x,1): error TS2307: bad line
src/a.ts(1,1): warning TS6133: unused
src/ok.ts(2,3): error TS2304: Cannot find name 'y'.
";
        let verdict = parse_typecheck_output(output);
        assert_eq!(verdict.diagnostics.len(), 1);
        assert_eq!(verdict.diagnostics[0].file, "src/ok.ts");
    }

    #[test]
    fn missing_modules_are_unique() {
        let output = "\
a.ts(1,1): error TS2307: Cannot find module 'x'
b.ts(1,1): error TS2307: Cannot find module 'x'
c.ts(1,1): error TS2307: Cannot find module \"y\"";
        let verdict = parse_typecheck_output(output);
        assert_eq!(missing_modules(&verdict.diagnostics), vec!["x", "y"]);
    }
}
