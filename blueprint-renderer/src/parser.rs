//! Template syntax parser.
//!
//! Splits template text into literal text and `{{ … }}` tags, then builds a
//! node tree. Supported tags:
//!
//! ```text
//! {{.Var}}  {{.}}  {{"literal"}}          interpolation
//! {{.Var | replace "-" "_" | lower}}      pipelines (see `funcs`)
//! {{if COND}} … {{else if COND}} … {{else}} … {{end}}
//! {{range .List}} … {{else}} … {{end}}
//! {{/* comment */}}
//! {{- …}} / {{… -}}                       trim whitespace before / after
//! ```
//!
//! `COND` uses the condition grammar from `blueprint_core::condition`.

use blueprint_core::Condition;

use crate::error::{syntax, RenderError};
use crate::funcs::PipeFunc;

// ---------------------------------------------------------------------------
// Node tree
// ---------------------------------------------------------------------------

/// A value reference inside a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Var(String),
    Dot,
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub func: PipeFunc,
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub head: Operand,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub condition: Condition,
    pub line: usize,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Action {
        pipeline: Pipeline,
        line: usize,
    },
    If {
        branches: Vec<Branch>,
        otherwise: Vec<Node>,
    },
    Range {
        operand: Operand,
        line: usize,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// Parse template text into a node list.
pub fn parse(src: &str) -> Result<Vec<Node>, RenderError> {
    let segments = split(src)?;
    let mut parser = Parser {
        segments,
        pos: 0,
        depth: 0,
    };
    let (nodes, terminator) = parser.parse_body()?;
    match terminator {
        None => Ok(nodes),
        Some(term) => Err(syntax(term.line, &term.snippet, "unexpected tag outside a block")),
    }
}

// ---------------------------------------------------------------------------
// 1. Segmenting: text vs. tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Tag(Tag),
}

#[derive(Debug, Clone)]
struct Tag {
    /// Text between the delimiters, trim markers removed.
    body: String,
    /// The full `{{ … }}` source, for error messages.
    raw: String,
    line: usize,
}

/// Line numbers for increasing byte offsets, counted incrementally.
struct LineCounter<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
}

impl LineCounter<'_> {
    fn at(&mut self, byte: usize) -> usize {
        self.line += self.src[self.offset..byte].matches('\n').count();
        self.offset = byte;
        self.line
    }
}

fn push_text(out: &mut Vec<Segment>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        out.push(Segment::Text(text.to_string()));
    }
}

/// Byte offset of the `}}` closing an action starting at `from`, skipping
/// over string literals.
fn find_close(src: &str, from: usize) -> Option<usize> {
    let rest = &src[from..];
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if rest[i..].starts_with("}}") {
            return Some(from + i);
        }
    }
    None
}

fn split(src: &str) -> Result<Vec<Segment>, RenderError> {
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut trim_next = false;
    let mut lines = LineCounter {
        src,
        offset: 0,
        line: 1,
    };

    while let Some(rel) = src[cursor..].find("{{") {
        let open = cursor + rel;
        let line = lines.at(open);
        let mut body_start = open + 2;
        let after = &src[body_start..];
        let trim_left = after.starts_with('-') && after[1..].starts_with(char::is_whitespace);
        if trim_left {
            body_start += 1;
        }
        push_text(&mut out, &src[cursor..open], trim_next, trim_left);

        let inner = &src[body_start..];
        let lead = inner.len() - inner.trim_start().len();
        if inner[lead..].starts_with("/*") {
            let comment_start = body_start + lead + 2;
            let Some(end_rel) = src[comment_start..].find("*/") else {
                return Err(syntax(line, &src[open..], "unclosed comment"));
            };
            let after_comment = comment_start + end_rel + 2;
            let tail = &src[after_comment..];
            let tail_trimmed = tail.trim_start();
            let skipped = tail.len() - tail_trimmed.len();
            let (trim_right, close_len) = if tail_trimmed.starts_with("-}}") && skipped > 0 {
                (true, 3)
            } else if tail_trimmed.starts_with("}}") {
                (false, 2)
            } else {
                return Err(syntax(line, &src[open..after_comment], "comment must end with */}}"));
            };
            trim_next = trim_right;
            cursor = after_comment + skipped + close_len;
            continue;
        }

        let Some(close) = find_close(src, body_start) else {
            let snippet: String = src[open..].lines().next().unwrap_or_default().to_string();
            return Err(syntax(line, &snippet, "unclosed action"));
        };
        let mut body = &src[body_start..close];
        let trim_right =
            body.ends_with('-') && body[..body.len() - 1].ends_with(char::is_whitespace);
        if trim_right {
            body = &body[..body.len() - 1];
        }
        out.push(Segment::Tag(Tag {
            body: body.to_string(),
            raw: src[open..close + 2].to_string(),
            line,
        }));
        trim_next = trim_right;
        cursor = close + 2;
    }

    push_text(&mut out, &src[cursor..], trim_next, false);
    Ok(out)
}

// ---------------------------------------------------------------------------
// 2. Words inside an action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Word {
    Bare(String),
    Str(String),
    Pipe,
}

fn words(tag: &Tag, body: &str) -> Result<Vec<Word>, RenderError> {
    let chars: Vec<char> = body.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '|' {
            out.push(Word::Pipe);
            i += 1;
        } else if c == '"' {
            let mut value = String::new();
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => return Err(syntax(tag.line, &tag.raw, "unterminated string literal")),
                    Some('"') => break,
                    Some('\\') => {
                        let escaped = match chars.get(j + 1) {
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some('"') => '"',
                            Some('\\') => '\\',
                            _ => return Err(syntax(tag.line, &tag.raw, "invalid escape sequence")),
                        };
                        value.push(escaped);
                        j += 2;
                    }
                    Some(ch) => {
                        value.push(*ch);
                        j += 1;
                    }
                }
            }
            out.push(Word::Str(value));
            i = j + 1;
        } else {
            let start = i;
            while i < chars.len()
                && !chars[i].is_whitespace()
                && chars[i] != '|'
                && chars[i] != '"'
            {
                i += 1;
            }
            out.push(Word::Bare(chars[start..i].iter().collect()));
        }
    }
    Ok(out)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn operand(tag: &Tag, word: &Word) -> Result<Operand, RenderError> {
    match word {
        Word::Str(s) => Ok(Operand::Literal(s.clone())),
        Word::Bare(s) if s == "." => Ok(Operand::Dot),
        Word::Bare(s) if s.starts_with('.') && is_identifier(&s[1..]) => {
            Ok(Operand::Var(s[1..].to_string()))
        }
        Word::Bare(s) => Err(syntax(
            tag.line,
            &tag.raw,
            format!("expected .VAR, . or a quoted string, found '{s}'"),
        )),
        Word::Pipe => Err(syntax(tag.line, &tag.raw, "unexpected '|'")),
    }
}

fn pipeline(tag: &Tag, body: &str) -> Result<Pipeline, RenderError> {
    let words = words(tag, body)?;
    let mut groups = words.split(|w| *w == Word::Pipe);

    let head = match groups.next() {
        Some([single]) => operand(tag, single)?,
        Some([]) | None => return Err(syntax(tag.line, &tag.raw, "empty action")),
        Some(_) => {
            return Err(syntax(
                tag.line,
                &tag.raw,
                "an action starts with a single value; use '|' to apply functions",
            ))
        }
    };

    let mut stages = Vec::new();
    for group in groups {
        let Some((Word::Bare(name), rest)) = group.split_first() else {
            return Err(syntax(tag.line, &tag.raw, "expected a function name after '|'"));
        };
        let func = PipeFunc::from_name(name)
            .ok_or_else(|| syntax(tag.line, &tag.raw, format!("unknown function '{name}'")))?;
        if rest.len() != func.arity() {
            return Err(syntax(
                tag.line,
                &tag.raw,
                format!("'{func}' takes {} argument(s), got {}", func.arity(), rest.len()),
            ));
        }
        let args = rest
            .iter()
            .map(|w| operand(tag, w))
            .collect::<Result<Vec<_>, _>>()?;
        stages.push(Stage { func, args });
    }
    Ok(Pipeline { head, stages })
}

// ---------------------------------------------------------------------------
// 3. Tag directives
// ---------------------------------------------------------------------------

enum Directive {
    If(Condition),
    ElseIf(Condition),
    Else,
    End,
    Range(Operand),
    Action(Pipeline),
}

fn split_keyword(body: &str) -> (&str, &str) {
    match body.find(char::is_whitespace) {
        Some(i) => (&body[..i], body[i..].trim_start()),
        None => (body, ""),
    }
}

fn condition(tag: &Tag, src: &str) -> Result<Condition, RenderError> {
    if src.trim().is_empty() {
        return Err(syntax(tag.line, &tag.raw, "missing condition"));
    }
    Condition::parse(src).map_err(|e| syntax(tag.line, &tag.raw, e.to_string()))
}

fn directive(tag: &Tag) -> Result<Directive, RenderError> {
    let body = tag.body.trim();
    let (keyword, rest) = split_keyword(body);
    match keyword {
        "if" => Ok(Directive::If(condition(tag, rest)?)),
        "else" if rest.is_empty() => Ok(Directive::Else),
        "else" => match split_keyword(rest) {
            ("if", cond) => Ok(Directive::ElseIf(condition(tag, cond)?)),
            _ => Err(syntax(tag.line, &tag.raw, "expected {{else}} or {{else if COND}}")),
        },
        "end" if rest.is_empty() => Ok(Directive::End),
        "end" => Err(syntax(tag.line, &tag.raw, "{{end}} takes no arguments")),
        "range" => {
            let words = words(tag, rest)?;
            match words.as_slice() {
                [single] => Ok(Directive::Range(operand(tag, single)?)),
                _ => Err(syntax(tag.line, &tag.raw, "range expects exactly one .VAR")),
            }
        }
        _ => Ok(Directive::Action(pipeline(tag, body)?)),
    }
}

// ---------------------------------------------------------------------------
// 4. Block structure
// ---------------------------------------------------------------------------

enum TermKind {
    Else,
    ElseIf(Condition),
    End,
}

struct Terminator {
    kind: TermKind,
    line: usize,
    snippet: String,
}

/// Deepest `if`/`range` nesting a template may use.
pub const MAX_NESTING: usize = 64;

struct Parser {
    segments: Vec<Segment>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Parse nodes until a block terminator (`else`, `else if`, `end`) or EOF.
    fn parse_body(&mut self) -> Result<(Vec<Node>, Option<Terminator>), RenderError> {
        let mut nodes = Vec::new();
        while self.pos < self.segments.len() {
            let segment = self.segments[self.pos].clone();
            self.pos += 1;
            let tag = match segment {
                Segment::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Segment::Tag(tag) => tag,
            };
            let terminator = |kind| Terminator {
                kind,
                line: tag.line,
                snippet: tag.raw.clone(),
            };
            match directive(&tag)? {
                Directive::Action(pipeline) => nodes.push(Node::Action {
                    pipeline,
                    line: tag.line,
                }),
                Directive::If(cond) => {
                    self.enter(&tag)?;
                    let node = self.parse_if(cond, &tag);
                    self.depth -= 1;
                    nodes.push(node?);
                }
                Directive::Range(op) => {
                    self.enter(&tag)?;
                    let node = self.parse_range(op, &tag);
                    self.depth -= 1;
                    nodes.push(node?);
                }
                Directive::Else => return Ok((nodes, Some(terminator(TermKind::Else)))),
                Directive::ElseIf(cond) => {
                    return Ok((nodes, Some(terminator(TermKind::ElseIf(cond)))))
                }
                Directive::End => return Ok((nodes, Some(terminator(TermKind::End)))),
            }
        }
        Ok((nodes, None))
    }

    fn enter(&mut self, open: &Tag) -> Result<(), RenderError> {
        if self.depth >= MAX_NESTING {
            return Err(syntax(
                open.line,
                &open.raw,
                format!("blocks nested deeper than {MAX_NESTING} levels"),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_if(&mut self, first: Condition, open: &Tag) -> Result<Node, RenderError> {
        let mut branches = Vec::new();
        let mut condition = first;
        let mut line = open.line;
        loop {
            let (body, term) = self.parse_body()?;
            branches.push(Branch {
                condition,
                line,
                body,
            });
            let Some(term) = term else {
                return Err(syntax(open.line, &open.raw, "unclosed {{if}}: missing {{end}}"));
            };
            match term.kind {
                TermKind::End => {
                    return Ok(Node::If {
                        branches,
                        otherwise: vec![],
                    })
                }
                TermKind::ElseIf(next) => {
                    condition = next;
                    line = term.line;
                }
                TermKind::Else => {
                    let otherwise = self.parse_closing_else(open, "if")?;
                    return Ok(Node::If {
                        branches,
                        otherwise,
                    });
                }
            }
        }
    }

    fn parse_range(&mut self, operand: Operand, open: &Tag) -> Result<Node, RenderError> {
        let (body, term) = self.parse_body()?;
        let Some(term) = term else {
            return Err(syntax(open.line, &open.raw, "unclosed {{range}}: missing {{end}}"));
        };
        let otherwise = match term.kind {
            TermKind::End => vec![],
            TermKind::Else => self.parse_closing_else(open, "range")?,
            TermKind::ElseIf(_) => {
                let message = "{{else if}} is not allowed in {{range}}";
                return Err(syntax(term.line, &term.snippet, message));
            }
        };
        Ok(Node::Range {
            operand,
            line: open.line,
            body,
            otherwise,
        })
    }

    /// Body of a final `{{else}}`, which must be closed by `{{end}}`.
    fn parse_closing_else(&mut self, open: &Tag, block: &str) -> Result<Vec<Node>, RenderError> {
        let (otherwise, term) = self.parse_body()?;
        match term {
            Some(Terminator {
                kind: TermKind::End,
                ..
            }) => Ok(otherwise),
            Some(other) => Err(syntax(
                other.line,
                &other.snippet,
                format!("expected {{{{end}}}} after {{{{else}}}} in {{{{{block}}}}}"),
            )),
            None => Err(syntax(
                open.line,
                &open.raw,
                format!("unclosed {{{{{block}}}}}: missing {{{{end}}}}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn plain_text_is_single_node() {
        assert_eq!(parse("hello world").unwrap(), vec![text("hello world")]);
    }

    #[test]
    fn interpolation_with_pipeline() {
        let nodes = parse(r#"name={{.Name | replace "-" "_" | upper}}"#).unwrap();
        assert_eq!(nodes.len(), 2);
        match &nodes[1] {
            Node::Action { pipeline, line } => {
                assert_eq!(*line, 1);
                assert_eq!(pipeline.head, Operand::Var("Name".into()));
                assert_eq!(pipeline.stages.len(), 2);
                assert_eq!(pipeline.stages[0].func, PipeFunc::Replace);
                assert_eq!(
                    pipeline.stages[0].args,
                    vec![Operand::Literal("-".into()), Operand::Literal("_".into())]
                );
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn if_else_if_else_chain() {
        let nodes =
            parse(r#"{{if eq(.A, 1)}}one{{else if eq(.A, 2)}}two{{else}}many{{end}}"#).unwrap();
        match &nodes[0] {
            Node::If {
                branches,
                otherwise,
            } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].body, vec![text("two")]);
                assert_eq!(otherwise, &vec![text("many")]);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(parse("a{{/* note }} */}}b").unwrap(), vec![text("a"), text("b")]);
    }

    #[test]
    fn trim_markers_remove_adjacent_whitespace() {
        let nodes = parse("a  \n  {{- .X -}}  \n b").unwrap();
        assert_eq!(nodes[0], text("a"));
        assert_eq!(nodes[2], text("b"));
    }

    #[test]
    fn braces_inside_string_literal_do_not_close() {
        let nodes = parse(r#"{{"}}"}}"#).unwrap();
        match &nodes[0] {
            Node::Action { pipeline, .. } => {
                assert_eq!(pipeline.head, Operand::Literal("}}".into()))
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_carry_line_and_snippet() {
        let err = parse("line one\nline two {{if eq(.A}}x{{end}}").unwrap_err();
        match err {
            RenderError::Syntax { line, snippet, .. } => {
                assert_eq!(line, 2);
                assert_eq!(snippet, "{{if eq(.A}}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn structural_errors() {
        for bad in [
            "{{if true}}unclosed",
            "{{end}}",
            "{{else}}",
            "{{range .L}}x",
            "{{.X",
            "{{.X | shout}}",
            "{{.X | replace \"a\"}}",
            "{{Name}}",
            "{{.A .B}}",
            "{{range .L}}{{else if true}}{{end}}",
            "{{if true}}{{else}}{{else}}{{end}}",
            "{{/* open comment",
            "{{}}",
        ] {
            let err = parse(bad).unwrap_err();
            assert!(matches!(err, RenderError::Syntax { .. }), "{bad}: {err:?}");
        }
    }

    #[test]
    fn block_nesting_is_bounded() {
        let nested = |n: usize| format!("{}x{}", "{{if true}}".repeat(n), "{{end}}".repeat(n));
        assert!(parse(&nested(MAX_NESTING)).is_ok());

        let err = parse(&nested(MAX_NESTING + 1)).unwrap_err();
        assert!(matches!(err, RenderError::Syntax { .. }), "{err:?}");

        let ranges = format!("{}{}", "{{range .L}}".repeat(50_000), "{{end}}".repeat(50_000));
        let err = parse(&ranges).unwrap_err();
        assert!(matches!(err, RenderError::Syntax { .. }), "{err:?}");
    }
}
