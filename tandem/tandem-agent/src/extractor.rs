//! Code-block extraction, advisory validation and dialogue tidy-up.

use serde::{Deserialize, Serialize};
use std::fmt;
use tandem_core::{CodeKind, Intent};
use tracing::{debug, warn};

const FENCE: &str = "```";

const END_MARKERS: [&str; 7] = [
    "</s>",
    "<|endoftext|>",
    "<|im_end|>",
    "<|eot_id|>",
    "<|end|>",
    "[end of text]",
    "<eos>",
];

/// Advisory finding about extracted code. Never blocks a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum CodeIssue {
    UnbalancedBrackets { expected: Option<char>, found: Option<char>, line: usize },
    MixedIndentation { line: usize },
    IrregularIndent { line: usize, step: usize },
}

impl fmt::Display for CodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnbalancedBrackets { expected: Some(e), found: Some(c), line } => {
                write!(f, "line {}: expected '{}' but found '{}'", line, e, c)
            }
            Self::UnbalancedBrackets { expected: Some(e), found: None, line } => {
                write!(f, "line {}: unclosed bracket, expected '{}'", line, e)
            }
            Self::UnbalancedBrackets { found, line, .. } => {
                write!(f, "line {}: unexpected '{}'", line, found.unwrap_or('?'))
            }
            Self::MixedIndentation { line } => {
                write!(f, "line {}: tabs and spaces mixed in indentation", line)
            }
            Self::IrregularIndent { line, step } => {
                write!(f, "line {}: indentation is not a multiple of {}", line, step)
            }
        }
    }
}

/// A code block pulled out of model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCode {
    pub code: String,
    pub kind: CodeKind,
    /// Whether the code came from a fenced block
    pub fenced: bool,
    pub issues: Vec<CodeIssue>,
}

/// Model output split into prose and code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub prose: String,
    pub code: Option<ExtractedCode>,
}

/// Extract the first fenced block from `output`.
///
/// Without a fence the whole output counts as code only for `code_only`
/// requests. The kind comes from the fence tag, then the hint, then python.
/// Blank code yields `code: None`.
pub fn extract(output: &str, intent: Intent, language_hint: Option<CodeKind>) -> Extraction {
    let fallback_kind = language_hint.unwrap_or(CodeKind::Python);

    let (prose, body, tag, fenced) = match find_fenced(output) {
        Some(block) => (block.prose, block.body, block.tag, true),
        None if intent == Intent::CodeOnly => (String::new(), output.to_string(), None, false),
        None => {
            return Extraction {
                prose: tidy_dialogue(output),
                code: None,
            };
        }
    };

    let code = trim_code(&body);
    if code.is_empty() {
        debug!("No code produced");
        return Extraction {
            prose: tidy_dialogue(&prose),
            code: None,
        };
    }

    let kind = tag
        .as_deref()
        .and_then(CodeKind::from_tag)
        .unwrap_or(fallback_kind);
    let issues = validate(&code, kind);
    for issue in &issues {
        warn!("Advisory check on generated {} code: {}", kind, issue);
    }

    Extraction {
        prose: tidy_dialogue(&prose),
        code: Some(ExtractedCode {
            code,
            kind,
            fenced,
            issues,
        }),
    }
}

struct FencedBlock {
    prose: String,
    body: String,
    tag: Option<String>,
}

fn find_fenced(output: &str) -> Option<FencedBlock> {
    let open = output.find(FENCE)?;
    let after_open = &output[open + FENCE.len()..];

    let (tag, body_start) = match after_open.find('\n') {
        Some(nl) => {
            let tag_line = after_open[..nl].trim();
            // Inline block such as ```print(1)``` has no tag line
            if tag_line.contains(FENCE) {
                (None, 0)
            } else {
                let tag = tag_line.split_whitespace().next().map(str::to_string);
                (tag, nl + 1)
            }
        }
        None => (None, 0),
    };

    let body_region = &after_open[body_start..];
    let (body, rest) = match body_region.find(FENCE) {
        Some(close) => (&body_region[..close], &body_region[close + FENCE.len()..]),
        None => (body_region, ""),
    };

    let mut prose = output[..open].trim().to_string();
    let rest = rest.trim();
    if !rest.is_empty() {
        if !prose.is_empty() {
            prose.push('\n');
        }
        prose.push_str(rest);
    }

    Some(FencedBlock {
        prose,
        body: body.to_string(),
        tag: tag.filter(|t| !t.is_empty()),
    })
}

/// Drop leading blank lines and trailing whitespace, keeping indentation.
fn trim_code(body: &str) -> String {
    let trimmed_end = body.trim_end();
    let first_content = trimmed_end
        .lines()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(0);
    let code: Vec<&str> = trimmed_end.lines().skip(first_content).collect();
    code.join("\n")
}

/// Run the advisory checks for `kind`.
pub fn validate(code: &str, kind: CodeKind) -> Vec<CodeIssue> {
    let mut issues = Vec::new();

    if !matches!(kind, CodeKind::Html | CodeKind::Bash) {
        if let Some(issue) = check_brackets(code) {
            issues.push(issue);
        }
    }

    if let Some(issue) = check_mixed_indentation(code) {
        issues.push(issue);
    }

    if kind == CodeKind::Python {
        if let Some(issue) = check_indent_step(code) {
            issues.push(issue);
        }
    }

    issues
}

fn check_brackets(code: &str) -> Option<CodeIssue> {
    let mut stack: Vec<(char, usize)> = Vec::new();

    for (idx, line) in code.lines().enumerate() {
        let line_no = idx + 1;
        let mut quote: Option<char> = None;
        let mut escaped = false;

        for c in line.chars() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }

            match c {
                '"' | '\'' | '`' => quote = Some(c),
                '(' => stack.push((')', line_no)),
                '[' => stack.push((']', line_no)),
                '{' => stack.push(('}', line_no)),
                ')' | ']' | '}' => match stack.pop() {
                    Some((expected, _)) if expected == c => {}
                    Some((expected, _)) => {
                        return Some(CodeIssue::UnbalancedBrackets {
                            expected: Some(expected),
                            found: Some(c),
                            line: line_no,
                        });
                    }
                    None => {
                        return Some(CodeIssue::UnbalancedBrackets {
                            expected: None,
                            found: Some(c),
                            line: line_no,
                        });
                    }
                },
                _ => {}
            }
        }
    }

    stack.pop().map(|(expected, line)| CodeIssue::UnbalancedBrackets {
        expected: Some(expected),
        found: None,
        line,
    })
}

fn check_mixed_indentation(code: &str) -> Option<CodeIssue> {
    let mut seen_tab = false;
    let mut seen_space = false;

    for (idx, line) in code.lines().enumerate() {
        let indent: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
        if indent.is_empty() || line.trim().is_empty() {
            continue;
        }
        let has_tab = indent.contains('\t');
        let has_space = indent.contains(' ');

        seen_tab |= has_tab;
        seen_space |= has_space;
        if (has_tab && has_space) || (seen_tab && seen_space) {
            return Some(CodeIssue::MixedIndentation { line: idx + 1 });
        }
    }
    None
}

fn check_indent_step(code: &str) -> Option<CodeIssue> {
    let indents: Vec<(usize, usize)> = code
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('\t'))
        .map(|(idx, line)| (idx + 1, line.chars().take_while(|c| *c == ' ').count()))
        .filter(|(_, width)| *width > 0)
        .collect();

    let step = indents.iter().map(|(_, w)| *w).min()?;
    indents
        .iter()
        .find(|(_, width)| width % step != 0)
        .map(|(line, _)| CodeIssue::IrregularIndent { line: *line, step })
}

/// Clean dialogue output: trim, drop end-of-text markers and repeated lines.
pub fn tidy_dialogue(text: &str) -> String {
    let mut cleaned = text.to_string();
    for marker in END_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }

    let mut lines: Vec<&str> = Vec::new();
    for line in cleaned.lines() {
        let line = line.trim_end();
        if lines.last().map(|l| l.trim()) == Some(line.trim()) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}
