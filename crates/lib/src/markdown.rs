//! Markdown rendering for the terminal chat surface.
//!
//! Model replies arrive as markdown; the chat surface re-renders the
//! accumulated text on every increment, so rendering stays cheap and
//! allocation-only (no terminal state).

use pulldown_cmark::{Event, Options, Parser, Tag};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const RESET: &str = "\x1b[0m";

/// Render markdown to a styled terminal string (ANSI bold/italic, `•` bullets).
pub fn render(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut out = String::new();
    // Stack of open lists; Some(n) carries the next ordered-list index.
    let mut lists: Vec<Option<u64>> = Vec::new();
    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading(..) | Tag::Strong => out.push_str(BOLD),
                Tag::Emphasis => out.push_str(ITALIC),
                Tag::List(start) => lists.push(start),
                Tag::Item => {
                    for _ in 1..lists.len() {
                        out.push_str("  ");
                    }
                    match lists.last_mut() {
                        Some(Some(n)) => {
                            out.push_str(&format!("{}. ", n));
                            *n += 1;
                        }
                        _ => out.push_str("• "),
                    }
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                Tag::Heading(..) => {
                    out.push_str(RESET);
                    out.push_str("\n\n");
                }
                Tag::Paragraph => out.push_str("\n\n"),
                Tag::Strong | Tag::Emphasis => out.push_str(RESET),
                Tag::List(_) => {
                    lists.pop();
                    if lists.is_empty() {
                        out.push('\n');
                    }
                }
                Tag::Item => out.push('\n'),
                Tag::CodeBlock(_) => out.push('\n'),
                Tag::Link(_, dest, _) => {
                    out.push_str(" (");
                    out.push_str(&dest);
                    out.push(')');
                }
                _ => {}
            },
            Event::Text(text) => out.push_str(&text),
            Event::Code(code) => {
                out.push('`');
                out.push_str(&code);
                out.push('`');
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("───\n\n"),
            _ => {}
        }
    }
    out.trim_end().to_string()
}
