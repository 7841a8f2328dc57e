//! Small GLSL front-end used by the headless context.
//!
//! This only understands enough of the language to catch the mistakes the headless context is meant
//! to report: unbalanced delimiters, a missing entry point, undeclared identifiers, and stage interfaces
//! that do not match at link time. Diagnostics follow the `0:<line>(<column>): error: ...` layout used
//! by Mesa.

use std::collections::{HashMap, HashSet};

use lazy_regex::{lazy_regex, Lazy, Regex};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub ty: String,
    pub name: String,
}

/// Global `in`, `out` and `uniform` declarations of a compiled stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInterface {
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
    pub uniforms: Vec<Variable>,
    /// Declared names that appear at least once outside of their declaration.
    pub referenced: HashSet<String>,
}

const TYPES: &[&str] = &[
    "void", "bool", "int", "uint", "float", "double", "vec2", "vec3", "vec4", "bvec2", "bvec3",
    "bvec4", "ivec2", "ivec3", "ivec4", "uvec2", "uvec3", "uvec4", "dvec2", "dvec3", "dvec4", "mat2",
    "mat3", "mat4", "mat2x2", "mat2x3", "mat2x4", "mat3x2", "mat3x3", "mat3x4", "mat4x2", "mat4x3",
    "mat4x4", "sampler1D", "sampler2D", "sampler3D", "samplerCube", "sampler2DShadow",
    "sampler2DArray", "isampler2D", "usampler2D",
];

const KEYWORDS: &[&str] = &[
    "attribute", "const", "uniform", "varying", "in", "out", "inout", "centroid", "flat", "smooth",
    "noperspective", "highp", "mediump", "lowp", "precision", "invariant", "struct", "if", "else",
    "for", "while", "do", "switch", "case", "default", "break", "continue", "return", "discard",
    "true", "false",
];

const QUALIFIERS: &[&str] = &[
    "centroid", "flat", "smooth", "noperspective", "highp", "mediump", "lowp", "invariant",
];

const BUILTIN_FUNCTIONS: &[&str] = &[
    "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "pow",
    "exp", "log", "exp2", "log2", "sqrt", "inversesqrt", "abs", "sign", "floor", "ceil", "trunc",
    "round", "fract", "mod", "min", "max", "clamp", "mix", "step", "smoothstep", "isnan", "isinf",
    "length", "distance", "dot", "cross", "normalize", "faceforward", "reflect", "refract",
    "matrixCompMult", "outerProduct", "transpose", "determinant", "inverse", "lessThan",
    "lessThanEqual", "greaterThan", "greaterThanEqual", "equal", "notEqual", "any", "all", "not",
    "texture", "textureLod", "textureOffset", "texelFetch", "textureSize", "texture2D",
    "textureCube", "dFdx", "dFdy", "fwidth",
];

#[derive(Debug, Copy, Clone)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

struct Scanner<'a> {
    code: &'a str,
    tokens: Vec<Token<'a>>,
    depth: Vec<u32>,
    types: HashSet<&'a str>,
}

impl<'a> Scanner<'a> {
    fn new(code: &'a str) -> Self {
        static IDENT_RE: Lazy<Regex> = lazy_regex!(r"\b[A-Za-z_][A-Za-z0-9_]*");
        let tokens: Vec<_> = IDENT_RE
            .find_iter(code)
            .map(|m| Token {
                text: m.as_str(),
                start: m.start(),
                end: m.end(),
            })
            .collect();
        let mut types: HashSet<&str> = TYPES.iter().copied().collect();
        for pair in tokens.windows(2) {
            if pair[0].text == "struct" && is_blank(&code[pair[0].end..pair[1].start]) {
                types.insert(pair[1].text);
            }
        }
        Self {
            code,
            tokens,
            depth: nesting(code),
            types,
        }
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.types.contains(name)
            || KEYWORDS.contains(&name)
            || BUILTIN_FUNCTIONS.contains(&name)
            || name.starts_with("gl_")
    }

    /// Whether only whitespace separates token `i` from token `i + 1`.
    fn adjacent(&self, i: usize) -> bool {
        match (self.tokens.get(i), self.tokens.get(i + 1)) {
            (Some(a), Some(b)) => is_blank(&self.code[a.end..b.start]),
            _ => false,
        }
    }

    fn declarations(&self) -> (HashSet<&'a str>, HashSet<usize>) {
        let mut names = HashSet::new();
        let mut sites = HashSet::new();
        for i in 0..self.tokens.len() {
            let ty = self.tokens[i];
            if !self.types.contains(ty.text) || !self.adjacent(i) {
                continue;
            }
            let name = self.tokens[i + 1];
            if self.is_reserved(name.text) {
                continue;
            }
            names.insert(name.text);
            sites.insert(name.start);
            for extra in self.continued_declarations(i + 1) {
                names.insert(extra.text);
                sites.insert(extra.start);
            }
        }
        (names, sites)
    }

    /// Names following the declaration at token `first` in a comma-separated list (`vec3 a, b;`).
    fn continued_declarations(&self, first: usize) -> Vec<Token<'a>> {
        let bytes = self.code.as_bytes();
        let mut pos = self.tokens[first].end;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'(') {
            return vec![];
        }
        let mut commas = vec![];
        let mut depth = 0u32;
        while pos < bytes.len() {
            match bytes[pos] {
                b'(' | b'[' => depth += 1,
                b')' | b']' if depth == 0 => break,
                b')' | b']' => depth -= 1,
                b';' | b'{' | b'}' => break,
                b',' if depth == 0 => commas.push(pos),
                _ => {}
            }
            pos += 1;
        }
        commas
            .into_iter()
            .filter_map(|comma| {
                let token = self.tokens.iter().find(|t| t.start > comma)?;
                (is_blank(&self.code[comma + 1..token.start]) && !self.is_reserved(token.text))
                    .then_some(*token)
            })
            .collect()
    }

    fn interface(&self) -> (Vec<Variable>, Vec<Variable>, Vec<Variable>, HashSet<&'a str>) {
        let (mut inputs, mut outputs, mut uniforms) = (vec![], vec![], vec![]);
        let mut blocks = HashSet::new();
        for (i, token) in self.tokens.iter().enumerate() {
            let list = match token.text {
                "in" => &mut inputs,
                "out" => &mut outputs,
                "uniform" => &mut uniforms,
                _ => continue,
            };
            if self.depth[token.start] != 0 {
                continue;
            }
            let mut j = i;
            while self.adjacent(j) && QUALIFIERS.contains(&self.tokens[j + 1].text) {
                j += 1;
            }
            if !self.adjacent(j) {
                continue;
            }
            let ty = self.tokens[j + 1];
            let rest = self.code[ty.end..].trim_start();
            if rest.starts_with('{') {
                blocks.insert(ty.text);
                let open = self.code.len() - rest.len();
                if let Some(instance) = self.block_instance(open) {
                    blocks.insert(instance.text);
                }
            } else if self.types.contains(ty.text) && self.adjacent(j + 1) {
                let names = std::iter::once(self.tokens[j + 2]).chain(self.continued_declarations(j + 2));
                list.extend(names.map(|name| Variable {
                    ty: ty.text.to_string(),
                    name: name.text.to_string(),
                }));
            }
        }
        (inputs, outputs, uniforms, blocks)
    }

    /// Instance name of the interface block opened at byte `open` (`out Block { ... } instance;`).
    fn block_instance(&self, open: usize) -> Option<Token<'a>> {
        let mut depth = 0u32;
        let close = self.code[open..].bytes().position(|b| {
            match b {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            depth == 0
        })? + open;
        let token = self.tokens.iter().find(|t| t.start > close)?;
        (is_blank(&self.code[close + 1..token.start]) && !self.is_reserved(token.text))
            .then_some(*token)
    }
}

pub fn compile(source: &str) -> Result<StageInterface, String> {
    let macros = defines(source);
    let code = strip(source);
    check_delimiters(&code)?;
    check_entry_point(&code)?;

    let scanner = Scanner::new(&code);
    let (mut declared, sites) = scanner.declarations();
    let (inputs, outputs, uniforms, blocks) = scanner.interface();
    declared.extend(blocks);
    declared.extend(macros);

    let mut referenced = HashSet::new();
    let mut errors = vec![];
    for token in &scanner.tokens {
        if scanner.is_reserved(token.text) || sites.contains(&token.start) || follows_dot(&code, token.start) {
            continue;
        }
        if declared.contains(token.text) {
            referenced.insert(token.text.to_string());
        } else {
            let (line, column) = position(&code, token.start);
            errors.push(format!("0:{}({}): error: `{}' undeclared", line, column, token.text));
        }
    }
    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }
    Ok(StageInterface {
        inputs,
        outputs,
        uniforms,
        referenced,
    })
}

/// Matches the vertex outputs against the fragment inputs and returns the active uniforms, sorted by
/// name. Uniforms that no stage references are inactive.
pub fn link(vertex: &StageInterface, fragment: &StageInterface) -> Result<Vec<Variable>, String> {
    let mut errors = vec![];
    for input in &fragment.inputs {
        match vertex.outputs.iter().find(|out| out.name == input.name) {
            None => errors.push(format!(
                "error: fragment shader input `{}' has no matching output in the previous stage",
                input.name
            )),
            Some(output) if output.ty != input.ty => errors.push(format!(
                "error: vertex shader output `{}' declared as type `{}', but fragment shader input declared as type `{}'",
                input.name, output.ty, input.ty
            )),
            Some(..) => {}
        }
    }

    let mut active: HashMap<&str, &Variable> = HashMap::new();
    for (stage, interface) in [("vertex", vertex), ("fragment", fragment)] {
        for uniform in &interface.uniforms {
            if let Some(existing) = active.get(uniform.name.as_str()) {
                if existing.ty != uniform.ty {
                    errors.push(format!(
                        "error: uniform `{}' declared as type `{}' and type `{}' in the {} shader",
                        uniform.name, existing.ty, uniform.ty, stage
                    ));
                }
                continue;
            }
            if interface.referenced.contains(&uniform.name) {
                active.insert(uniform.name.as_str(), uniform);
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }
    let mut active: Vec<_> = active.into_values().cloned().collect();
    active.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(active)
}

/// Names introduced by `#define`, object-like or function-like.
fn defines(source: &str) -> HashSet<&str> {
    static DEFINE_RE: Lazy<Regex> = lazy_regex!(r"(?m)^[ \t]*#[ \t]*define[ \t]+([A-Za-z_][A-Za-z0-9_]*)");
    DEFINE_RE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Blanks out comments, preprocessor directives and layout qualifiers, keeping byte offsets and line
/// breaks intact.
fn strip(source: &str) -> String {
    static COMMENT_RE: Lazy<Regex> = lazy_regex!(r"(?s)/\*.*?\*/|//[^\n]*");
    static DIRECTIVE_RE: Lazy<Regex> = lazy_regex!(r"(?m)^[ \t]*#[^\n]*");
    static LAYOUT_RE: Lazy<Regex> = lazy_regex!(r"\blayout\s*\([^)]*\)");

    let mut bytes = source.as_bytes().to_vec();
    for re in [&COMMENT_RE, &DIRECTIVE_RE, &LAYOUT_RE] {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        for m in re.find_iter(&text) {
            for b in &mut bytes[m.range()] {
                if *b != b'\n' {
                    *b = b' ';
                }
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn check_delimiters(code: &str) -> Result<(), String> {
    let mut stack = vec![];
    for (offset, b) in code.bytes().enumerate() {
        let expected = match b {
            b'(' | b'[' | b'{' => {
                stack.push(b);
                continue;
            }
            b')' => b'(',
            b']' => b'[',
            b'}' => b'{',
            _ => continue,
        };
        if stack.pop() != Some(expected) {
            let (line, column) = position(code, offset);
            return Err(format!(
                "0:{}({}): error: syntax error, unexpected '{}'",
                line, column, b as char
            ));
        }
    }
    if !stack.is_empty() {
        let (line, column) = position(code, code.len());
        return Err(format!(
            "0:{}({}): error: syntax error, unexpected end of file",
            line, column
        ));
    }
    Ok(())
}

fn check_entry_point(code: &str) -> Result<(), String> {
    static MAIN_RE: Lazy<Regex> = lazy_regex!(r"\bvoid\s+main\s*\(\s*(?:void\s*)?\)");
    if MAIN_RE.is_match(code) {
        Ok(())
    } else {
        let (line, _) = position(code, code.len());
        Err(format!("0:{}(1): error: function `main' is not defined", line))
    }
}

/// Brace and parenthesis nesting depth at every byte offset.
fn nesting(code: &str) -> Vec<u32> {
    let mut depth = 0u32;
    let mut result = Vec::with_capacity(code.len() + 1);
    for b in code.bytes() {
        if matches!(b, b')' | b'}') {
            depth = depth.saturating_sub(1);
        }
        result.push(depth);
        if matches!(b, b'(' | b'{') {
            depth += 1;
        }
    }
    result.push(depth);
    result
}

fn follows_dot(code: &str, offset: usize) -> bool {
    code[..offset].trim_end().ends_with('.')
}

fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_whitespace())
}

/// 1-based line and column of a byte offset.
fn position(code: &str, offset: usize) -> (usize, usize) {
    let before = &code.as_bytes()[..offset];
    let line = before.iter().filter(|b| **b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |p| p + 1);
    (line, offset - line_start + 1)
}
