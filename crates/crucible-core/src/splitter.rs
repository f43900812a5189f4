//! Marker-based source splitting.
//!
//! Generated text carries file boundaries as standalone comment-style lines
//! ending in a source extension (`// greet.cpp`, `# utils/helpers.py`,
//! `**Main.java**`). The splitter runs a small state machine — one open file
//! at a time — over a pure per-line classifier, so the marker heuristic is
//! testable without touching disk.
//!
//! The splitter never fails: input with no recognizable marker degrades to a
//! single block under the language's default entry filename.

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// A parsed, named unit of source text extracted from generated output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileBlock {
    /// Relative path of the file within the workspace.
    pub filename: String,

    /// Lines strictly between this block's marker and the next.
    pub content: String,
}

/// Classification of a single input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// Opens a new file block with the given relative filename.
    Marker(String),

    /// Belongs to the currently open block (discarded if none is open).
    Content,

    /// Carries no source text: code fences and generation-report headers.
    Ignored,
}

/// Classify one raw input line.
pub fn classify_line(line: &str, language: Language) -> LineClass {
    let trimmed = line.trim();
    if is_fence(trimmed) || is_section_header(trimmed) {
        return LineClass::Ignored;
    }
    match marker_filename(trimmed, language) {
        Some(filename) => LineClass::Marker(filename),
        None => LineClass::Content,
    }
}

/// Split raw generated text into ordered file blocks.
///
/// Lines before the first marker are discarded. If no marker appears
/// anywhere, the entire cleaned input becomes one block named after the
/// language's default entry filename.
pub fn split_source(raw: &str, language: Language) -> Vec<FileBlock> {
    let mut blocks: Vec<FileBlock> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;
    let mut cleaned_lines: Vec<String> = Vec::new();

    for raw_line in raw.lines() {
        let line = raw_line.trim_end();
        match classify_line(line, language) {
            LineClass::Ignored => {}
            LineClass::Marker(filename) => {
                if let Some((name, lines)) = current.take() {
                    blocks.push(FileBlock {
                        filename: name,
                        content: lines.join("\n"),
                    });
                }
                current = Some((filename, Vec::new()));
            }
            LineClass::Content => {
                cleaned_lines.push(line.to_string());
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(line.to_string());
                }
            }
        }
    }

    if let Some((name, lines)) = current.take() {
        blocks.push(FileBlock {
            filename: name,
            content: lines.join("\n"),
        });
    }

    if blocks.is_empty() {
        blocks.push(FileBlock {
            filename: language.default_entry_filename().to_string(),
            content: cleaned_lines.join("\n").trim().to_string(),
        });
    }

    blocks
}

fn is_fence(trimmed: &str) -> bool {
    trimmed.starts_with("```")
}

fn is_section_header(trimmed: &str) -> bool {
    trimmed.len() > 6 && trimmed.starts_with("###") && trimmed.ends_with("###")
}

/// Extract the filename a marker line names, or `None` if the line is not
/// a marker for this language.
fn marker_filename(trimmed: &str, language: Language) -> Option<String> {
    let body = strip_marker_prefix(trimmed, language)?;
    let cleaned = clean_marker_body(body);
    if cleaned.is_empty() {
        return None;
    }
    if language
        .marker_extensions()
        .iter()
        .any(|ext| cleaned.ends_with(ext))
    {
        return Some(cleaned);
    }
    // Python generators often name files by bare path ("# src/app");
    // a path separator is enough, the extension is implied. Anything with
    // whitespace (shebangs, prose mentioning paths) is not filename-like.
    if language == Language::Python
        && (cleaned.contains('/') || cleaned.contains('\\'))
        && !cleaned.contains(char::is_whitespace)
    {
        return Some(format!("{cleaned}.py"));
    }
    None
}

/// Strip the leading comment token, or the surrounding bold delimiter.
fn strip_marker_prefix<'a>(trimmed: &'a str, language: Language) -> Option<&'a str> {
    for token in language.comment_tokens() {
        if let Some(rest) = trimmed.strip_prefix(token) {
            return Some(rest);
        }
    }
    if let Some(rest) = trimmed.strip_prefix("**") {
        let rest = rest.trim_end();
        return Some(rest.strip_suffix("**").unwrap_or(rest));
    }
    None
}

/// Cleaning rules, in order: leading ordinal prefix, trailing colon,
/// trailing parenthetical note.
fn clean_marker_body(body: &str) -> String {
    let s = body.trim();
    let s = s.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ');
    let s = s.trim_end();
    let s = s.strip_suffix(':').map(str::trim_end).unwrap_or(s);
    let s = match s.find('(') {
        Some(idx) => s[..idx].trim_end(),
        None => s,
    };
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_marker_line() {
        assert_eq!(
            classify_line("// greet.cpp", Language::Cpp),
            LineClass::Marker("greet.cpp".to_string())
        );
        assert_eq!(
            classify_line("# utils/helpers.py", Language::Python),
            LineClass::Marker("utils/helpers.py".to_string())
        );
        assert_eq!(
            classify_line("**Main.java**", Language::Java),
            LineClass::Marker("Main.java".to_string())
        );
    }

    #[test]
    fn test_classify_plain_comment_is_content() {
        assert_eq!(
            classify_line("// adds two numbers", Language::Cpp),
            LineClass::Content
        );
        assert_eq!(
            classify_line("# just a note", Language::Python),
            LineClass::Content
        );
    }

    #[test]
    fn test_classify_ignores_fences_and_headers() {
        assert_eq!(classify_line("```cpp", Language::Cpp), LineClass::Ignored);
        assert_eq!(classify_line("```", Language::Cpp), LineClass::Ignored);
        assert_eq!(
            classify_line("### Generated files ###", Language::Cpp),
            LineClass::Ignored
        );
    }

    #[test]
    fn test_marker_cleaning_ordinal_and_colon() {
        assert_eq!(
            classify_line("// 1. calculator.h:", Language::Cpp),
            LineClass::Marker("calculator.h".to_string())
        );
    }

    #[test]
    fn test_marker_cleaning_parenthetical() {
        assert_eq!(
            classify_line("# models/user.py (data model)", Language::Python),
            LineClass::Marker("models/user.py".to_string())
        );
    }

    #[test]
    fn test_python_path_without_extension_gets_py() {
        assert_eq!(
            classify_line("# src/app", Language::Python),
            LineClass::Marker("src/app.py".to_string())
        );
    }

    #[test]
    fn test_python_shebang_is_content() {
        assert_eq!(
            classify_line("#!/usr/bin/env python", Language::Python),
            LineClass::Content
        );
    }

    #[test]
    fn test_wrong_language_extension_is_content() {
        assert_eq!(
            classify_line("// main.py", Language::Cpp),
            LineClass::Content
        );
    }

    #[test]
    fn test_split_two_markers_two_blocks() {
        let raw = "// a.cpp\nint a;\nint b;\n// b.h\nint c;\n";
        let blocks = split_source(raw, Language::Cpp);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].filename, "a.cpp");
        assert_eq!(blocks[0].content, "int a;\nint b;");
        assert_eq!(blocks[1].filename, "b.h");
        assert_eq!(blocks[1].content, "int c;");
    }

    #[test]
    fn test_split_discards_preamble() {
        let raw = "Here is your program:\n// main.cpp\nint main(){}\n";
        let blocks = split_source(raw, Language::Cpp);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].filename, "main.cpp");
        assert_eq!(blocks[0].content, "int main(){}");
    }

    #[test]
    fn test_split_no_markers_falls_back_to_default_entry() {
        let raw = "```python\nprint('hello')\nprint('world')\n```\n";
        let blocks = split_source(raw, Language::Python);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].filename, "main.py");
        assert_eq!(blocks[0].content, "print('hello')\nprint('world')");
    }

    #[test]
    fn test_split_keeps_indentation() {
        let raw = "# main.py\ndef main():\n    print('x')\n";
        let blocks = split_source(raw, Language::Python);
        assert_eq!(blocks[0].content, "def main():\n    print('x')");
    }

    #[test]
    fn test_split_non_marker_comments_stay_in_block() {
        let raw = "// main.cpp\n// entry point\nint main(){}\n";
        let blocks = split_source(raw, Language::Cpp);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "// entry point\nint main(){}");
    }

    #[test]
    fn test_split_single_line_scenario() {
        let blocks = split_source("// greet.cpp\nint main(){return 0;}", Language::Cpp);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].filename, "greet.cpp");
        assert_eq!(blocks[0].content, "int main(){return 0;}");
    }

    #[test]
    fn test_file_block_serde_roundtrip() {
        let block = FileBlock {
            filename: "src/app.py".to_string(),
            content: "print('x')".to_string(),
        };
        let json = serde_json::to_string(&block).expect("serialize");
        let deserialized: FileBlock = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(block, deserialized);
    }
}
