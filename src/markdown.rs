//! Issue body conversion between GitHub Markdown and the editor's HTML.
//!
//! Bodies travel as Markdown. They are rendered to HTML once when an editor
//! is loaded and converted back once when the form is submitted.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Link schemes allowed through to rendered pages. Scheme-less destinations
/// (relative paths, fragments) are always allowed.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Render Markdown to HTML. Raw HTML embedded in the Markdown is emitted as
/// escaped text, and link or image destinations with any other scheme than
/// http, https or mailto are replaced by `#`.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::Start(Tag::Link(kind, dest, title)) if !is_safe_destination(&dest) => {
            Event::Start(Tag::Link(kind, CowStr::Borrowed("#"), title))
        }
        Event::Start(Tag::Image(kind, dest, title)) if !is_safe_destination(&dest) => {
            Event::Start(Tag::Image(kind, CowStr::Borrowed("#"), title))
        }
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn is_safe_destination(dest: &str) -> bool {
    // Browsers ignore whitespace and control characters inside a scheme.
    let cleaned: String = dest
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    match cleaned.find([':', '/', '?', '#']) {
        Some(i) if cleaned[i..].starts_with(':') => {
            let scheme = cleaned[..i].to_ascii_lowercase();
            SAFE_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

/// Convert editor HTML back to Markdown.
///
/// Headings come out ATX style (`# Title`), emphasis as `_x_`, strong as
/// `**x**` and bullets as `- `. Unknown elements contribute their text.
pub fn to_markdown(html: &str) -> String {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
    tidy(&convert_children(&dom.document, Context::default()))
}

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    preformatted: bool,
    code: bool,
}

fn convert_children(node: &Handle, ctx: Context) -> String {
    let mut out = String::new();
    for child in node.children.borrow().iter() {
        let converted = convert_node(child, ctx);
        let line_start = out.is_empty() || out.ends_with('\n');
        let converted = if !ctx.preformatted && out.ends_with('\n') {
            converted.trim_start_matches(' ').to_string()
        } else {
            converted
        };
        if line_start && !ctx.preformatted && !ctx.code && is_text(child) {
            out.push_str(&escape_block_marker(&converted));
        } else {
            out.push_str(&converted);
        }
    }
    out
}

fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

fn convert_node(node: &Handle, ctx: Context) -> String {
    match &node.data {
        NodeData::Document => convert_children(node, ctx),
        NodeData::Text { contents } => {
            let text = contents.borrow();
            if ctx.preformatted {
                text.to_string()
            } else if ctx.code {
                collapse_whitespace(&text)
            } else {
                escape_inline(&collapse_whitespace(&text))
            }
        }
        NodeData::Element { name, .. } => convert_element(&name.local, node, ctx),
        _ => String::new(),
    }
}

fn convert_element(tag: &str, node: &Handle, ctx: Context) -> String {
    match tag {
        "head" | "script" | "style" | "title" | "template" => String::new(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            let text = single_line(&convert_children(node, ctx));
            block(&format!("{} {}", "#".repeat(level), text))
        }
        "p" | "div" | "section" | "article" => block(convert_children(node, ctx).trim()),
        "br" if ctx.preformatted => "\n".to_string(),
        "br" => "  \n".to_string(),
        "hr" => block("---"),
        "strong" | "b" => wrap_inline(&convert_children(node, ctx), "**"),
        "em" | "i" => wrap_inline(&convert_children(node, ctx), "_"),
        "s" | "del" | "strike" => wrap_inline(&convert_children(node, ctx), "~~"),
        "code" if ctx.preformatted => convert_children(node, ctx),
        "code" => inline_code(&convert_children(node, Context { code: true, ..ctx })),
        "pre" => {
            let language = code_language(node).unwrap_or_default();
            let code = convert_children(
                node,
                Context {
                    preformatted: true,
                    ..ctx
                },
            );
            block(&format!("```{}\n{}\n```", language, code.trim_end_matches('\n')))
        }
        "a" => {
            let text = convert_children(node, ctx);
            match attribute(node, "href").filter(|href| !href.is_empty()) {
                Some(href) => {
                    let dest = link_destination(&href);
                    match attribute(node, "title").filter(|t| !t.is_empty()) {
                        Some(title) => format!("[{}]({} \"{}\")", text.trim(), dest, title),
                        None => format!("[{}]({})", text.trim(), dest),
                    }
                }
                None => text,
            }
        }
        "img" => match attribute(node, "src").filter(|src| !src.is_empty()) {
            Some(src) => format!(
                "![{}]({})",
                attribute(node, "alt").unwrap_or_default(),
                link_destination(&src)
            ),
            None => String::new(),
        },
        "ul" => block(&convert_list(node, false, ctx)),
        "ol" => block(&convert_list(node, true, ctx)),
        "blockquote" => {
            let inner = tidy(&convert_children(node, ctx));
            let quoted: Vec<String> = inner
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect();
            block(&quoted.join("\n"))
        }
        _ => convert_children(node, ctx),
    }
}

fn convert_list(node: &Handle, ordered: bool, ctx: Context) -> String {
    let start = attribute(node, "start")
        .and_then(|start| start.parse::<usize>().ok())
        .unwrap_or(1);

    let mut items = Vec::new();
    for child in node.children.borrow().iter() {
        if tag_name(child) != Some("li") {
            continue;
        }
        let marker = if ordered {
            format!("{}. ", start + items.len())
        } else {
            "- ".to_string()
        };
        let indent = " ".repeat(marker.len());
        // Items stay tight: paragraph breaks inside an item become line breaks.
        let content = tidy(&convert_children(child, ctx)).replace("\n\n", "\n");
        let body: Vec<String> = content
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i == 0 || line.is_empty() {
                    line.to_string()
                } else {
                    format!("{indent}{line}")
                }
            })
            .collect();
        items.push(format!("{}{}", marker, body.join("\n")));
    }
    items.join("\n")
}

fn tag_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn attribute(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == key)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// `rust` for `<pre><code class="language-rust">`.
fn code_language(pre: &Handle) -> Option<String> {
    pre.children
        .borrow()
        .iter()
        .filter(|child| tag_name(child) == Some("code"))
        .find_map(|code| {
            attribute(code, "class")?
                .split_whitespace()
                .find_map(|class| class.strip_prefix("language-").map(str::to_string))
        })
}

fn block(content: &str) -> String {
    format!("\n\n{content}\n\n")
}

/// Move surrounding whitespace outside the delimiters; `** x **` is not
/// emphasis in CommonMark.
fn wrap_inline(content: &str, delimiter: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }
    let leading = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trailing = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{leading}{delimiter}{trimmed}{delimiter}{trailing}")
}

fn inline_code(code: &str) -> String {
    if code.contains('`') {
        format!("`` {code} ``")
    } else {
        format!("`{code}`")
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Destinations with whitespace or parentheses go in angle brackets.
fn link_destination(href: &str) -> String {
    if href.contains(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>')) {
        format!("<{}>", href.replace('<', "%3C").replace('>', "%3E"))
    } else {
        href.to_string()
    }
}

/// Escape a marker that would open a heading, quote, list or rule when the
/// text starts a line: `# x` becomes `\# x`, `1. x` becomes `1\. x`.
fn escape_block_marker(text: &str) -> String {
    let rest = text.trim_start_matches(' ');
    let indent = &text[..text.len() - rest.len()];

    if rest.starts_with(['#', '>', '-', '+', '=']) {
        return format!("{indent}\\{rest}");
    }

    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 && digits <= 9 {
        let after = &rest[digits..];
        if after.starts_with(['.', ')'])
            && (after.len() == 1 || after[1..].starts_with(char::is_whitespace))
        {
            return format!("{indent}{}\\{after}", &rest[..digits]);
        }
    }
    text.to_string()
}

fn escape_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '_' | '`' | '[' | ']') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Drop whitespace-only lines, collapse blank runs to one blank line and
/// trim the ends. Fenced code is copied verbatim.
fn tidy(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_blank = false;
    let mut in_fence = false;

    for line in raw.lines() {
        if in_fence {
            out.push('\n');
            out.push_str(line);
            if line.trim_start().starts_with("```") {
                in_fence = false;
            }
            continue;
        }
        if line.trim().is_empty() {
            pending_blank = true;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_blank { "\n\n" } else { "\n" });
        }
        pending_blank = false;
        out.push_str(line);
        if line.trim_start().starts_with("```") {
            in_fence = true;
        }
    }
    out
}
