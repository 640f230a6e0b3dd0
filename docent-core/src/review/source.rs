//! Guidance embedded in source comments
//!
//! Each supported language declares its comment syntax and the file names
//! that describe a whole directory (`mod.rs`, `package-info.java`,
//! `__init__.py`, ...). Guidance in a descriptor file becomes a folder note;
//! anywhere else it becomes a file block carrying the full source.

use std::path::Path;

use crate::guidance::{dir_key, relative_path, ROOT_KEY};
use crate::Result;

use super::{
    format_directory_note, format_file_block, read_source, GuidanceBlock, Reviewer,
    GUIDANCE_MARKER,
};

/// Comment and literal syntax of a language
#[derive(Debug, Clone, Copy)]
pub struct CommentSyntax {
    /// Line comment prefixes, longest first
    pub line: &'static [&'static str],
    /// Block comment delimiters
    pub block: &'static [(&'static str, &'static str)],
    /// String delimiters, longest first, and whether the literal may span lines
    pub strings: &'static [(&'static str, bool)],
    /// Whether `'x'` is a character literal rather than a string delimiter
    pub char_literals: bool,
}

const C_STYLE: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: &[("/*", "*/")],
    strings: &[("\"\"\"", true), ("\"", false)],
    char_literals: true,
};

const JS_STYLE: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: &[("/*", "*/")],
    strings: &[("\"", false), ("'", false), ("`", true)],
    char_literals: false,
};

const HASH_STYLE: CommentSyntax = CommentSyntax {
    line: &["#"],
    block: &[],
    strings: &[("\"", true), ("'", true)],
    char_literals: false,
};

/// A language the source reviewer understands
#[derive(Debug)]
pub struct SourceLanguage {
    pub name: &'static str,
    /// Code fence tag used when embedding the source in a prompt
    pub fence: &'static str,
    pub extensions: &'static [&'static str],
    pub syntax: CommentSyntax,
    /// File names that describe their directory
    pub descriptors: &'static [&'static str],
}

/// Bundled languages
pub static LANGUAGES: &[SourceLanguage] = &[
    SourceLanguage {
        name: "rust",
        fence: "rust",
        extensions: &["rs"],
        syntax: CommentSyntax {
            line: &["///", "//!", "//"],
            block: &[("/*", "*/")],
            strings: &[("\"", true)],
            char_literals: true,
        },
        descriptors: &["mod.rs", "lib.rs"],
    },
    SourceLanguage {
        name: "java",
        fence: "java",
        extensions: &["java"],
        syntax: C_STYLE,
        descriptors: &["package-info.java"],
    },
    SourceLanguage {
        name: "kotlin",
        fence: "kotlin",
        extensions: &["kt", "kts"],
        syntax: C_STYLE,
        descriptors: &[],
    },
    SourceLanguage {
        name: "python",
        fence: "python",
        extensions: &["py"],
        syntax: CommentSyntax {
            line: &["#"],
            block: &[("\"\"\"", "\"\"\""), ("'''", "'''")],
            strings: &[("\"", false), ("'", false)],
            char_literals: false,
        },
        descriptors: &["__init__.py"],
    },
    SourceLanguage {
        name: "typescript",
        fence: "typescript",
        extensions: &["ts", "tsx"],
        syntax: JS_STYLE,
        descriptors: &["index.ts"],
    },
    SourceLanguage {
        name: "javascript",
        fence: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
        syntax: JS_STYLE,
        descriptors: &["index.js"],
    },
    SourceLanguage {
        name: "go",
        fence: "go",
        extensions: &["go"],
        syntax: CommentSyntax {
            line: &["//"],
            block: &[("/*", "*/")],
            strings: &[("\"", false), ("`", true)],
            char_literals: true,
        },
        descriptors: &["doc.go"],
    },
    SourceLanguage {
        name: "c",
        fence: "cpp",
        extensions: &["c", "h", "cc", "cpp", "cxx", "hpp"],
        syntax: C_STYLE,
        descriptors: &[],
    },
    SourceLanguage {
        name: "csharp",
        fence: "csharp",
        extensions: &["cs"],
        syntax: C_STYLE,
        descriptors: &[],
    },
    SourceLanguage {
        name: "shell",
        fence: "bash",
        extensions: &["sh", "bash"],
        syntax: HASH_STYLE,
        descriptors: &[],
    },
    SourceLanguage {
        name: "markup",
        fence: "html",
        extensions: &["html", "htm", "xml"],
        syntax: CommentSyntax {
            line: &[],
            block: &[("<!--", "-->")],
            strings: &[],
            char_literals: false,
        },
        descriptors: &[],
    },
];

/// Reviewer for guidance comments in one language
#[derive(Debug, Clone, Copy)]
pub struct SourceCommentReviewer {
    language: &'static SourceLanguage,
}

impl SourceCommentReviewer {
    pub fn new(language: &'static SourceLanguage) -> Self {
        Self { language }
    }

    pub fn language(&self) -> &'static SourceLanguage {
        self.language
    }

    fn is_descriptor(&self, file: &Path) -> bool {
        file.file_name()
            .map(|n| {
                let name = n.to_string_lossy();
                self.language.descriptors.iter().any(|d| *d == name)
            })
            .unwrap_or(false)
    }
}

impl Reviewer for SourceCommentReviewer {
    fn name(&self) -> &'static str {
        self.language.name
    }

    fn review(&self, root: &Path, file: &Path) -> Result<Option<GuidanceBlock>> {
        let content = read_source(file)?;
        if !content.contains(GUIDANCE_MARKER) {
            return Ok(None);
        }

        let pieces = extract_guidance(&content, &self.language.syntax);
        if pieces.is_empty() {
            return Ok(None);
        }
        let guidance = pieces.join("\n\n");

        if self.is_descriptor(file) {
            let folder = file
                .parent()
                .map(|p| dir_key(root, p))
                .unwrap_or_else(|| ROOT_KEY.to_string());
            return Ok(Some(GuidanceBlock::directory(
                file,
                format_directory_note(&folder, &guidance),
            )));
        }

        let rel = relative_path(root, file);
        Ok(Some(GuidanceBlock::file(
            file,
            format_file_block(&rel, &guidance, self.language.fence, &content),
        )))
    }
}

/// Collect guidance texts from comments, in source order
pub(crate) fn extract_guidance(content: &str, syntax: &CommentSyntax) -> Vec<String> {
    let comments = scan_comments(content, syntax);
    let mut found = Vec::new();

    let mut i = 0;
    while i < comments.len() {
        let comment = &comments[i];
        i += 1;
        let Some(idx) = comment.body.find(GUIDANCE_MARKER) else {
            continue;
        };
        let after = &comment.body[idx + GUIDANCE_MARKER.len()..];

        let Some(prefix) = comment.prefix else {
            let text = clean_block(after);
            if !text.is_empty() {
                found.push(text);
            }
            continue;
        };
        if !comment.body[..idx].trim().is_empty() {
            continue;
        }

        let mut text = vec![after.trim().to_string()];
        let mut line = comment.line;
        // Comment lines right below, in the same style, continue the guidance
        while let Some(next) = comments.get(i) {
            let continues = next.prefix == Some(prefix)
                && next.own_line
                && next.line == line + 1
                && !next.body.trim().is_empty()
                && !next.body.contains(GUIDANCE_MARKER);
            if !continues {
                break;
            }
            text.push(next.body.trim().to_string());
            line = next.line;
            i += 1;
        }

        let joined = text.join("\n").trim().to_string();
        if !joined.is_empty() {
            found.push(joined);
        }
    }
    found
}

/// One comment found in a source file
#[derive(Debug)]
struct Comment<'a> {
    /// Zero-based line the comment starts on
    line: usize,
    /// Line comment prefix; `None` for block comments
    prefix: Option<&'static str>,
    /// Text between the delimiters
    body: &'a str,
    /// Nothing but whitespace precedes the comment on its line
    own_line: bool,
}

/// Position in the source, with line tracking
struct Cursor {
    pos: usize,
    line: usize,
    line_start: usize,
}

impl Cursor {
    fn advance_to(&mut self, content: &str, to: usize) {
        for (i, c) in content[self.pos..to].char_indices() {
            if c == '\n' {
                self.line += 1;
                self.line_start = self.pos + i + 1;
            }
        }
        self.pos = to;
    }
}

/// Find every comment in one left-to-right pass, skipping string and
/// character literals
fn scan_comments<'a>(content: &'a str, syntax: &CommentSyntax) -> Vec<Comment<'a>> {
    let mut comments = Vec::new();
    let mut cursor = Cursor {
        pos: 0,
        line: 0,
        line_start: 0,
    };

    while cursor.pos < content.len() {
        let pos = cursor.pos;
        let rest = &content[pos..];

        if let Some((open, close)) = syntax.block.iter().find(|(open, _)| rest.starts_with(*open)) {
            let body_start = pos + open.len();
            let (body_end, next) = match content[body_start..].find(*close) {
                Some(len) => (body_start + len, body_start + len + close.len()),
                None => (content.len(), content.len()),
            };
            comments.push(Comment {
                line: cursor.line,
                prefix: None,
                body: &content[body_start..body_end],
                own_line: content[cursor.line_start..pos].trim().is_empty(),
            });
            cursor.advance_to(content, next);
            continue;
        }

        if let Some(prefix) = syntax.line.iter().find(|p| rest.starts_with(**p)) {
            let end = rest.find('\n').map(|n| pos + n).unwrap_or(content.len());
            comments.push(Comment {
                line: cursor.line,
                prefix: Some(*prefix),
                body: &content[pos + prefix.len()..end],
                own_line: content[cursor.line_start..pos].trim().is_empty(),
            });
            cursor.advance_to(content, end);
            continue;
        }

        if let Some((quote, multiline)) = syntax.strings.iter().find(|(q, _)| rest.starts_with(*q)) {
            let end = string_end(content, pos + quote.len(), quote, *multiline);
            cursor.advance_to(content, end);
            continue;
        }

        if syntax.char_literals && rest.starts_with('\'') {
            if let Some(len) = char_literal_len(rest) {
                cursor.advance_to(content, pos + len);
                continue;
            }
        }

        let step = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        cursor.advance_to(content, pos + step);
    }
    comments
}

/// Offset just past the literal whose body starts at `from`
///
/// Single-line literals end at the newline when unterminated.
fn string_end(content: &str, from: usize, quote: &str, multiline: bool) -> usize {
    let body = &content[from..];
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == '\n' && !multiline {
            return from + i;
        } else if body[i..].starts_with(quote) {
            return from + i + quote.len();
        }
    }
    content.len()
}

/// Length of the character literal at the start of `rest`, if it is one
///
/// A quote that does not close right away is a lifetime or label.
fn char_literal_len(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices().skip(1);
    match chars.next()? {
        (_, '\\') => rest
            .char_indices()
            .skip(3)
            .take(10)
            .find(|(_, c)| *c == '\'')
            .map(|(i, _)| i + 1),
        (_, '\n') | (_, '\'') => None,
        _ => match chars.next()? {
            (i, '\'') => Some(i + 1),
            _ => None,
        },
    }
}

/// Strip block decoration (`*` gutters) and surrounding blank lines
fn clean_block(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim_end_matches('*').trim())
        .collect();

    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map(|e| e + 1).unwrap_or(start);
    lines[start..end].join("\n")
}
