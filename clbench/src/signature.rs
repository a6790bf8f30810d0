//! Kernel parameter lists parsed from OpenCL C source.
//!
//! Arguments are bound positionally, so a binding list is checked against
//! the declared parameters before a kernel is built rather than failing (or
//! silently misbehaving) at enqueue time. Parsing works on the source text,
//! so shipped kernels can be checked without a device.
//!
//! Accepted declarations:
//!
//! ```text
//! decl   := ("__kernel" | "kernel") "void" NAME "(" params ")"
//! params := "void" | param ("," param)*
//! param  := qualifier* type "*"? NAME
//! ```
//!
//! `//` and `/* */` comments are dropped before the parameter list is split.
//! `__global`/`global` and `__local`/`local` pointers to `float` map to the
//! buffer kinds; `int`, `uint` (or `unsigned int`) and `float` by value map to
//! the scalar kinds; `const` is ignored. Anything else, including macros in
//! the parameter list, becomes [`ParamKind::Other`] and never matches a
//! binding.

use std::fmt;

use crate::error::{BenchError, Result};

/// Kind and element type of one kernel parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Uint,
    Float,
    GlobalF32,
    LocalF32,
    /// Anything this crate never binds, kept verbatim for error messages.
    Other(String),
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Int => f.write_str("int"),
            ParamKind::Uint => f.write_str("uint"),
            ParamKind::Float => f.write_str("float"),
            ParamKind::GlobalF32 => f.write_str("__global float*"),
            ParamKind::LocalF32 => f.write_str("__local float*"),
            ParamKind::Other(decl) => f.write_str(decl),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

/// Declared parameter list of one `__kernel` function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSignature {
    pub name: String,
    pub params: Vec<Param>,
}

impl KernelSignature {
    /// Finds `kernel_name` in `source` and parses its parameter list.
    pub fn parse(source: &str, kernel_name: &str) -> Result<Self> {
        let missing = || BenchError::CompileFailure {
            kernel: kernel_name.to_string(),
            log: format!("no `__kernel void {kernel_name}(...)` declaration in source"),
        };

        let open = find_declaration(source, kernel_name).ok_or_else(missing)?;
        let rest = strip_comments(&source[open + 1..]);
        let close = rest.find(')').ok_or_else(missing)?;
        let list = &rest[..close];

        let params = list
            .split(',')
            .map(str::trim)
            .filter(|decl| !decl.is_empty() && *decl != "void")
            .map(parse_param)
            .collect();

        Ok(Self {
            name: kernel_name.to_string(),
            params,
        })
    }

    pub fn kinds(&self) -> Vec<ParamKind> {
        self.params.iter().map(|p| p.kind.clone()).collect()
    }

    /// Compares a binding list, position by position, with the declaration.
    pub fn check(&self, bound: &[ParamKind]) -> Result<()> {
        for (position, param) in self.params.iter().enumerate() {
            match bound.get(position) {
                Some(kind) if *kind == param.kind => {}
                Some(kind) => {
                    return Err(self.mismatch(position, param.kind.to_string(), kind.to_string()))
                }
                None => {
                    return Err(self.mismatch(
                        position,
                        format!("{} `{}`", param.kind, param.name),
                        "nothing".into(),
                    ))
                }
            }
        }
        if let Some(extra) = bound.get(self.params.len()) {
            return Err(self.mismatch(self.params.len(), "nothing".into(), extra.to_string()));
        }
        Ok(())
    }

    fn mismatch(&self, position: usize, expected: String, found: String) -> BenchError {
        BenchError::ArgumentMismatch {
            kernel: self.name.clone(),
            position,
            expected,
            found,
        }
    }
}

/// Byte offset of the `(` opening the parameter list of `kernel_name`.
fn find_declaration(source: &str, kernel_name: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(found) = source[search_from..].find(kernel_name) {
        let at = search_from + found;
        search_from = at + kernel_name.len();

        let before = source[..at].trim_end();
        let after = source[search_from..].trim_start();
        let is_ident_end = source[search_from..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        if !is_ident_end || !after.starts_with('(') || !before.ends_with("void") {
            continue;
        }
        let qualifier = before[..before.len() - "void".len()].trim_end();
        if qualifier.ends_with("__kernel") || qualifier.ends_with("kernel") {
            return Some(search_from + source[search_from..].find('(')?);
        }
    }
    None
}

fn strip_comments(list: &str) -> String {
    let mut out = String::with_capacity(list.len());
    let mut rest = list;
    while let Some(start) = [rest.find("//"), rest.find("/*")].into_iter().flatten().min() {
        out.push_str(&rest[..start]);
        let comment = &rest[start..];
        rest = if comment.starts_with("//") {
            comment.find('\n').map_or("", |nl| &comment[nl..])
        } else {
            comment.find("*/").map_or("", |end| &comment[end + 2..])
        };
    }
    out.push_str(rest);
    out
}

fn parse_param(decl: &str) -> Param {
    let spaced = decl.replace('*', " * ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    let name = tokens
        .iter()
        .rev()
        .find(|t| **t != "*")
        .map(|t| t.to_string())
        .unwrap_or_default();

    let has = |word: &str| tokens.iter().any(|t| *t == word);
    let pointer = has("*");
    let global = has("__global") || has("global");
    let local = has("__local") || has("local");
    let float = has("float");

    let kind = match (pointer, global, local) {
        (true, true, false) if float => ParamKind::GlobalF32,
        (true, false, true) if float => ParamKind::LocalF32,
        (false, false, false) if has("float") => ParamKind::Float,
        (false, false, false) if has("uint") || (has("unsigned") && has("int")) => ParamKind::Uint,
        (false, false, false) if has("int") => ParamKind::Int,
        _ => ParamKind::Other(decl.split_whitespace().collect::<Vec<_>>().join(" ")),
    };

    Param { name, kind }
}
