//! Reads a Dockerfile into the ordered instruction stream the correlator
//! consumes. Only the parts needed to align instructions with layers are
//! handled: comments, the `escape` parser directive and line continuations.

use std::path::Path;

use thiserror::Error;

const DEFAULT_ESCAPE: char = '\\';

#[derive(Debug, Error)]
pub enum DockerfileError {
    #[error("failed to read Dockerfile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid instruction on line {line}: {text}")]
    InvalidInstruction { line: usize, text: String },

    #[error("unexpected end of file: line {line} ends with a line continuation")]
    DanglingContinuation { line: usize },

    #[error("invalid escape token '{value}' on line {line}: must be ` or \\")]
    InvalidEscape { line: usize, value: String },
}

/// One build instruction, in the order it appears in the Dockerfile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub index: usize,
    /// Upper-cased instruction keyword, e.g. `RUN`
    pub name: String,
    /// The full logical line as written, continuations joined
    pub original: String,
}

impl Instruction {
    pub fn new(index: usize, name: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            original: original.into(),
        }
    }

    /// Whether this instruction starts from a base image
    pub fn is_base_image_directive(&self) -> bool {
        self.name.eq_ignore_ascii_case("FROM")
    }
}

/// Build an instruction list from `"NAME rest"` strings, mostly for tests and callers
/// that already hold parsed lines.
pub fn instructions_from_lines<S: AsRef<str>>(lines: &[S]) -> Vec<Instruction> {
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let line = line.as_ref().trim();
            let name = line.split_whitespace().next().unwrap_or_default();
            Instruction::new(index, name.to_ascii_uppercase(), line)
        })
        .collect()
}

pub fn parse_file(path: &Path) -> Result<Vec<Instruction>, DockerfileError> {
    let content = std::fs::read_to_string(path).map_err(|source| DockerfileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&content)
}

/// Parse `# escape=` style directives; returns `None` once the line is not a directive.
fn parse_directive(line: &str) -> Option<(String, String)> {
    let body = line.strip_prefix('#')?.trim();
    let (key, value) = body.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((key.to_ascii_lowercase(), value.trim().to_string()))
}

pub fn parse_str(content: &str) -> Result<Vec<Instruction>, DockerfileError> {
    let mut escape = DEFAULT_ESCAPE;
    let mut in_directives = true;
    let mut instructions = Vec::new();

    // Pending logical line and the line number it started on
    let mut pending: Option<(usize, String)> = None;

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    for (number, raw) in content.lines().enumerate() {
        let line_number = number + 1;

        if in_directives {
            match parse_directive(raw) {
                Some((key, value)) => {
                    if key == "escape" {
                        escape = match value.as_str() {
                            "`" => '`',
                            "\\" => '\\',
                            _ => {
                                return Err(DockerfileError::InvalidEscape {
                                    line: line_number,
                                    value,
                                });
                            }
                        };
                    }
                    continue;
                }
                None => in_directives = false,
            }
        }

        let trimmed = raw.trim();

        // Comments and blank lines are dropped, even in the middle of a continuation
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (continues, piece) = match raw.trim_end().strip_suffix(escape) {
            Some(stripped) => (true, stripped),
            None => (false, raw.trim_end()),
        };

        let (start_line, mut logical) = match pending.take() {
            Some((start, text)) => (start, text),
            None => (line_number, String::new()),
        };
        if logical.is_empty() {
            logical.push_str(piece.trim_start());
        } else {
            logical.push_str(piece);
        }

        if continues {
            pending = Some((start_line, logical));
            continue;
        }

        let logical = logical.trim_end().to_string();
        let name = logical.split_whitespace().next().unwrap_or_default();
        if !name.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DockerfileError::InvalidInstruction {
                line: start_line,
                text: logical,
            });
        }

        instructions.push(Instruction::new(
            instructions.len(),
            name.to_ascii_uppercase(),
            logical.clone(),
        ));
    }

    if let Some((line, _)) = pending {
        return Err(DockerfileError::DanglingContinuation { line });
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_dockerfile() {
        let dockerfile = r#"
# syntax comment after blank line is just a comment
FROM mcr.microsoft.com/cbl-mariner/base/core:2.0
RUN tdnf install -y python3
copy app.py /app/
CMD ["python3", "/app/app.py"]
"#;
        let instructions = parse_str(dockerfile).unwrap();
        assert_eq!(instructions.len(), 4);
        assert_eq!(instructions[0].name, "FROM");
        assert!(instructions[0].is_base_image_directive());
        assert_eq!(instructions[2].name, "COPY");
        assert_eq!(instructions[2].original, "copy app.py /app/");
        assert_eq!(instructions[3].index, 3);
    }

    #[test]
    fn test_line_continuations_are_joined() {
        let dockerfile = "FROM alpine\nRUN apk add \\\n    curl \\\n    # a comment inside\n    jq\n";
        let instructions = parse_str(dockerfile).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].original, "RUN apk add     curl     jq");
    }

    #[test]
    fn test_escape_directive() {
        let dockerfile = "# escape=`\nFROM mcr.microsoft.com/windows/servercore\nRUN dir `\n  c:\\\n";
        let instructions = parse_str(dockerfile).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].original, "RUN dir   c:\\");
    }

    #[test]
    fn test_byte_order_mark_is_skipped() {
        let instructions = parse_str("\u{feff}FROM alpine\nRUN true\n").unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].name, "FROM");
        assert_eq!(instructions[0].original, "FROM alpine");

        let dockerfile = "\u{feff}# escape=`\nFROM alpine\nRUN echo `\n  done\n";
        let instructions = parse_str(dockerfile).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].original, "RUN echo   done");
    }

    #[test]
    fn test_backslash_escape_directive() {
        let instructions = parse_str("# escape=\\\nFROM alpine\nRUN a \\\n  b\n").unwrap();
        assert_eq!(instructions[1].original, "RUN a   b");
    }

    #[test]
    fn test_invalid_escape_directive() {
        let result = parse_str("# escape=!\nFROM alpine\n");
        assert!(matches!(
            result,
            Err(DockerfileError::InvalidEscape { line: 1, ref value }) if value == "!"
        ));
    }

    #[test]
    fn test_invalid_instruction() {
        let result = parse_str("FROM alpine\n--mount=type=cache RUN true\n");
        assert!(matches!(
            result,
            Err(DockerfileError::InvalidInstruction { line: 2, .. })
        ));
    }

    #[test]
    fn test_dangling_continuation() {
        let result = parse_str("FROM alpine\nRUN true \\\n");
        assert!(matches!(
            result,
            Err(DockerfileError::DanglingContinuation { line: 2 })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = parse_file(Path::new("/nonexistent/Dockerfile"));
        assert!(matches!(result, Err(DockerfileError::Io { .. })));
    }

    #[test]
    fn test_instructions_from_lines() {
        let instructions = instructions_from_lines(&["from base", "RUN a"]);
        assert_eq!(instructions[0].name, "FROM");
        assert_eq!(instructions[1].original, "RUN a");
        assert_eq!(instructions[1].index, 1);
    }
}
