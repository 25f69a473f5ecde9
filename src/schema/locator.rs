//! Source locator for frontmatter text.
//!
//! The YAML parser discards positions once it builds a value tree, so the
//! locator indexes the raw frontmatter text on its own: one pass over the lines
//! tracks the indentation stack and records a span for every mapping key and
//! sequence item it sees. Lookups are then a map access.
//!
//! Block scalars (`|`, `>`) are skipped, single-line flow sequences and
//! mappings (`[a, b]`, `{x: 1}`) are indexed item by item. A path with no
//! corresponding text resolves to [`LocateError::NotFound`].

use super::path::FieldPath;
use crate::diagnostic::Span;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure to map a structural path to source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("no source text corresponds to '{0}'")]
    NotFound(FieldPath),
}

/// Maps structural paths to spans in frontmatter coordinates (line 1 is the
/// first frontmatter line).
#[derive(Debug, Clone, Default)]
pub struct SourceLocator {
    spans: BTreeMap<FieldPath, Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Unknown,
    Map,
    Seq,
}

#[derive(Debug)]
struct Container {
    path: FieldPath,
    /// Column (0-based) of the container's entries; `None` until the first
    /// child line is seen.
    indent: Option<usize>,
    /// Indentation of the line that opened the container.
    owner_indent: usize,
    kind: ContainerKind,
    next_index: usize,
}

impl Container {
    fn open(path: FieldPath, owner_indent: usize) -> Self {
        Self {
            path,
            indent: None,
            owner_indent,
            kind: ContainerKind::Unknown,
            next_index: 0,
        }
    }

    fn at(path: FieldPath, indent: usize, owner_indent: usize) -> Self {
        Self {
            indent: Some(indent),
            ..Self::open(path, owner_indent)
        }
    }
}

impl SourceLocator {
    /// Index `text` once.
    pub fn new(text: &str) -> Self {
        let mut locator = Self::default();
        locator.index(text);
        locator
    }

    /// Resolve `path` to the span of its key (or sequence item) in the text.
    pub fn locate(&self, path: &FieldPath) -> Result<Span, LocateError> {
        self.spans
            .get(path)
            .copied()
            .ok_or_else(|| LocateError::NotFound(path.clone()))
    }

    /// Number of indexed paths.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn record(&mut self, path: FieldPath, span: Span) {
        self.spans.entry(path).or_insert(span);
    }

    fn index(&mut self, text: &str) {
        let mut stack = vec![Container::at(FieldPath::root(), 0, 0)];
        let mut block_scalar_owner: Option<usize> = None;

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let content = raw.trim_start_matches(' ');
            let indent = raw.len() - content.len();
            let content = content.trim_end();

            if let Some(owner) = block_scalar_owner {
                if content.is_empty() || indent > owner {
                    continue;
                }
                block_scalar_owner = None;
            }
            if content.is_empty() || content.starts_with('#') || content == "---" {
                continue;
            }

            let seq_item = is_seq_item(content);

            // Settle a container opened by `key:` with an empty value.
            if let Some(top) = stack.last_mut()
                && top.indent.is_none()
            {
                if indent > top.owner_indent || (indent == top.owner_indent && seq_item) {
                    top.indent = Some(indent);
                } else {
                    stack.pop();
                }
            }

            while stack.len() > 1 {
                let Some(top) = stack.last() else { break };
                let top_indent = top.indent.unwrap_or(0);
                let leaves_seq = top_indent == indent && top.kind == ContainerKind::Seq && !seq_item;
                if top_indent > indent || leaves_seq {
                    stack.pop();
                } else {
                    break;
                }
            }

            // Continuation of a multi-line plain or quoted scalar.
            if let Some(top) = stack.last()
                && top.indent.is_some_and(|top_indent| indent > top_indent)
            {
                continue;
            }

            self.entry(&mut stack, line, indent, content, &mut block_scalar_owner);
        }
    }

    fn entry(
        &mut self,
        stack: &mut Vec<Container>,
        line: usize,
        indent: usize,
        content: &str,
        block_scalar_owner: &mut Option<usize>,
    ) {
        let Some(top) = stack.last_mut() else { return };
        let visible = strip_comment(content);
        let span = Span::on_line(line, indent + 1, indent + visible.chars().count());

        if is_seq_item(content) {
            top.kind = ContainerKind::Seq;
            let item_path = top.path.index(top.next_index);
            top.next_index += 1;
            self.record(item_path.clone(), span);

            let rest = &content[1..];
            let rest_trimmed = rest.trim_start();
            let rest_indent = indent + 1 + (rest.len() - rest_trimmed.len());
            let rest_visible = strip_comment(rest_trimmed);

            if rest_visible.is_empty() {
                stack.push(Container::open(item_path, indent));
            } else if is_seq_item(rest_visible) || split_key(rest_visible).is_some() {
                stack.push(Container::at(item_path, rest_indent, indent));
                self.entry(stack, line, rest_indent, rest_trimmed, block_scalar_owner);
            } else {
                self.flow_value(&item_path, line, rest_indent, rest_visible);
                if is_block_scalar(rest_visible) {
                    *block_scalar_owner = Some(indent);
                }
            }
            return;
        }

        let Some((key, value_offset)) = split_key(visible) else {
            return;
        };
        top.kind = ContainerKind::Map;
        let path = top.path.child(key);
        self.record(path.clone(), span);

        let value = visible[value_offset..].trim_start();
        let value_column = indent + visible.chars().count() - value.chars().count();
        if value.is_empty() {
            stack.push(Container::open(path, indent));
        } else if is_block_scalar(value) {
            *block_scalar_owner = Some(indent);
        } else {
            self.flow_value(&path, line, value_column, value);
        }
    }

    /// Index the items of a single-line flow collection starting at `column`.
    fn flow_value(&mut self, path: &FieldPath, line: usize, column: usize, value: &str) {
        let (is_seq, inner) = if let Some(inner) = value.strip_prefix('[') {
            (true, inner)
        } else if let Some(inner) = value.strip_prefix('{') {
            (false, inner)
        } else {
            return;
        };
        let Some(inner) = inner.strip_suffix(if is_seq { ']' } else { '}' }) else {
            return;
        };

        let mut index = 0;
        for (start, item) in split_flow_items(inner) {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lead = item.len() - item.trim_start().len();
            // +1 for the opening bracket.
            let item_column = column + 1 + inner[..start].chars().count() + lead;
            let span = Span::on_line(line, item_column + 1, item_column + trimmed.chars().count());
            if is_seq {
                self.record(path.index(index), span);
                index += 1;
            } else if let Some((key, _)) = split_key(trimmed) {
                self.record(path.child(key), span);
            }
        }
    }
}

fn is_seq_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

fn is_block_scalar(value: &str) -> bool {
    value.starts_with('|') || value.starts_with('>')
}

/// Remove a trailing `# comment` that is outside quotes.
fn strip_comment(content: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for (i, ch) in content.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '#' && (prev == ' ' || prev == '\t') => {
                return content[..i].trim_end();
            }
            None => {}
        }
        prev = ch;
    }
    content
}

/// Split `key: value` into the unquoted key and the byte offset just past the
/// colon. Returns `None` for lines that are not mapping entries.
fn split_key(content: &str) -> Option<(String, usize)> {
    let first = content.chars().next()?;
    if matches!(first, '[' | '{' | '#' | '&' | '*' | '!' | '|' | '>') || is_seq_item(content) {
        return None;
    }

    if first == '"' || first == '\'' {
        let close = content[1..].find(first)? + 1;
        let after = &content[close + 1..];
        let rest = after.strip_prefix(':')?;
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return None;
        }
        return Some((content[1..close].to_string(), close + 2));
    }

    let bytes = content.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            let key = content[..i].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some((key.to_string(), i + 1));
        }
        if b == b' ' && bytes.get(i + 1) == Some(&b'#') {
            return None;
        }
    }
    None
}

/// Split the inside of a flow collection on top-level commas, returning each
/// item with its byte offset.
fn split_flow_items(inner: &str) -> Vec<(usize, &str)> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in inner.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '[' | '{' => depth += 1,
                ']' | '}' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    items.push((start, &inner[start..i]));
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    items.push((start, &inner[start..]));
    items
}
