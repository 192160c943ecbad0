//! GLSL source helpers: identifier checks, comment stripping and indentation.

const GLSL_TYPE_WORDS: &[&str] = &[
    "void", "bool", "int", "uint", "float", "double", "vec2", "vec3", "vec4", "ivec2", "ivec3",
    "ivec4", "uvec2", "uvec3", "uvec4", "bvec2", "bvec3", "bvec4", "mat2", "mat3", "mat4",
    "sampler", "sampler2D", "texture2D",
];

const GLSL_KEYWORDS: &[&str] = &[
    "attribute", "const", "uniform", "varying", "buffer", "shared", "layout", "centroid", "flat",
    "smooth", "break", "continue", "do", "for", "while", "switch", "case", "default", "if",
    "else", "in", "out", "inout", "true", "false", "invariant", "discard", "return", "struct",
    "precision", "highp", "mediump", "lowp",
];

pub fn is_glsl_type_word(word: &str) -> bool {
    GLSL_TYPE_WORDS.contains(&word)
}

/// True for a name that may be declared by user code: well-formed, not a
/// keyword or type, and outside the `gl_` namespace.
pub fn is_glsl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !(name.starts_with("gl_")
        || name.contains("__")
        || GLSL_KEYWORDS.contains(&name)
        || is_glsl_type_word(name))
}

/// Replace `//` and `/* */` comments with spaces, keeping line structure.
pub fn strip_glsl_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Punct(char),
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_alphanumeric() || c == '_' {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
            {
                i += 1;
            }
            tokens.push(Token::Word(&source[start..i]));
            continue;
        }
        if !c.is_ascii_whitespace() {
            tokens.push(Token::Punct(c));
        }
        i += 1;
    }
    tokens
}

/// Names declared by `source`: variables, parameters and functions introduced
/// after a built-in type word, including comma-separated declarators.
pub fn declared_identifiers(source: &str) -> Vec<String> {
    let stripped = strip_glsl_comments(source);
    let mut out: Vec<String> = Vec::new();

    let mut depth: i32 = 0;
    // Paren depth of the declaration currently being read, if any.
    let mut decl_depth: Option<i32> = None;
    let mut expect_name = false;

    for token in tokenize(&stripped) {
        match token {
            Token::Word(w) if is_glsl_type_word(w) => {
                decl_depth = Some(depth);
                expect_name = true;
            }
            Token::Word(w) => {
                if expect_name && !GLSL_KEYWORDS.contains(&w) {
                    out.push(w.to_string());
                }
                expect_name = false;
            }
            Token::Punct(p) => {
                expect_name = false;
                match p {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if decl_depth.is_some_and(|d| depth < d) {
                            decl_depth = None;
                        }
                    }
                    ',' if decl_depth == Some(depth) => expect_name = true,
                    ';' | '{' | '}' => decl_depth = None,
                    _ => {}
                }
            }
        }
    }

    out
}

/// Indent every non-empty line by `indent_levels` * 4 spaces.
pub fn indent_glsl_body(source: &str, indent_levels: usize) -> String {
    let indent = "    ".repeat(indent_levels);
    source
        .replace("\r\n", "\n")
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_checked() {
        assert!(is_glsl_identifier("uSpeed"));
        assert!(is_glsl_identifier("_private"));
        assert!(!is_glsl_identifier("2fast"));
        assert!(!is_glsl_identifier("gl_Position"));
        assert!(!is_glsl_identifier("a__b"));
        assert!(!is_glsl_identifier("vec3"));
        assert!(!is_glsl_identifier("uniform"));
        assert!(!is_glsl_identifier("u-speed"));
        assert!(!is_glsl_identifier(""));
    }

    #[test]
    fn comments_are_removed() {
        let src = "float a; // float b;\n/* vec2 c;\n */ vec3 d;";
        assert_eq!(declared_identifiers(src), ["a", "d"]);
    }

    #[test]
    fn declarations_are_found() {
        let src = r#"
void mainImage(out vec4 mainImage, in vec2 fragCoord) {
    float x = max(1.0, 2.0), y;
    vec4 c = textTexture(fragCoord / uResolution);
    for (int i = 0; i < 3; i++) { x += float(i); }
    mainImage = c;
}
"#;
        assert_eq!(
            declared_identifiers(src),
            ["mainImage", "mainImage", "fragCoord", "x", "y", "c", "i"]
        );
    }

    #[test]
    fn body_indentation_drops_trailing_space() {
        assert_eq!(indent_glsl_body("a;  \r\n\n b;", 1), "    a;\n\n     b;");
    }
}
