//! Plain-text rendering for the terminal.
//!
//! Everything that came from the store is passed through
//! [`strip_control_chars`] before it is printed, and single-line fields are
//! cut to the terminal width.

use std::fmt::Write as _;

use crate::filter::Facet;
use crate::model::{BadgeTone, Entity, Post, Project, Tip};
use crate::page::{Page, PageState, PostDetail};
use crate::util::{indent, strip_control_chars, truncate_to_width};

const LOADING: &str = "Cargando...";
const BODY_INDENT: usize = 2;
const CODE_INDENT: usize = 4;

/// How one record is drawn in a list.
pub trait Card {
    fn card(&self, width: usize, opts: &RenderOptions) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Include tip snippets.
    pub show_code: bool,
}

/// Sanitized and cut to `width` columns.
fn line(text: &str, width: usize) -> String {
    let clean = strip_control_chars(text);
    let single = clean.replace(['\n', '\r'], " ");
    truncate_to_width(&single, width).into_owned()
}

fn body_line(text: &str, width: usize) -> String {
    indent(&line(text, width.saturating_sub(BODY_INDENT)), BODY_INDENT)
}

fn badge_marker(tone: BadgeTone) -> char {
    match tone {
        BadgeTone::Yellow => '~',
        BadgeTone::Green => '+',
        BadgeTone::Gray => '-',
    }
}

impl Card for Post {
    fn card(&self, width: usize, _opts: &RenderOptions) -> String {
        let read_time = self.read_time_label();
        let mut meta = vec![self.category.as_str()];
        if !self.date.is_empty() {
            meta.push(&self.date);
        }
        meta.push(&read_time);

        let mut out = line(&self.title, width);
        out.push('\n');
        out.push_str(&body_line(&meta.join(" · "), width));
        out.push('\n');
        out.push_str(&body_line(&self.description, width));
        out
    }
}

impl Card for Project {
    fn card(&self, width: usize, _opts: &RenderOptions) -> String {
        let status = if self.status.label().is_empty() {
            String::new()
        } else {
            format!(
                " [{} {}]",
                badge_marker(self.status.badge()),
                strip_control_chars(self.status.label())
            )
        };

        let mut out = line(&format!("{}{}", self.title, status), width);
        let _ = write!(out, "\n{}", body_line(&self.description, width));
        if !self.tags.is_empty() {
            let _ = write!(out, "\n{}", body_line(&self.tags.join(", "), width));
        }
        let mut links = Vec::new();
        if !self.link.is_empty() {
            links.push(self.link.clone());
        }
        if let Some(github) = &self.github_url {
            links.push(format!("GitHub: {github}"));
        }
        if !links.is_empty() {
            let _ = write!(out, "\n{}", body_line(&links.join("  "), width));
        }
        out
    }
}

impl Card for Tip {
    fn card(&self, width: usize, opts: &RenderOptions) -> String {
        let mut heading = self.title.clone();
        if !self.language.is_empty() {
            let _ = write!(heading, " ({})", self.language);
        }
        if !self.date.is_empty() {
            let _ = write!(heading, " · {}", self.date);
        }

        let mut out = line(&heading, width);
        let _ = write!(out, "\n{}", body_line(&self.description, width));
        if opts.show_code && !self.code.is_empty() {
            let code = self.formatted_code();
            // The snippet is labelled with the language it is highlighted as
            let label = format!("```{}", strip_control_chars(self.highlight_language()));
            let _ = write!(
                out,
                "\n\n{}\n{}",
                indent(&label, CODE_INDENT),
                indent(&strip_control_chars(&code), CODE_INDENT)
            );
        }
        out
    }
}

/// The page body: a loading line, the notice, or the filtered cards.
pub fn render_page<T: Entity + Card>(page: &Page<T>, width: usize, opts: &RenderOptions) -> String {
    if let PageState::Loading = page.state() {
        return LOADING.to_string();
    }
    if let Some(notice) = page.notice() {
        return notice.to_string();
    }

    let view = page.view();
    let mut out = String::new();
    for (i, item) in view.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&item.card(width, opts));
    }
    out
}

/// Option list for one facet selector.
pub fn render_facet(facet: Facet, options: &[String], width: usize) -> String {
    let mut out = format!("{facet}:");
    if options.is_empty() {
        out.push_str(" (sin opciones)");
    }
    for option in options {
        let _ = write!(out, "\n{}", body_line(option, width));
    }
    out
}

/// Full post view: header, meta, then every paragraph.
pub fn render_post_detail(detail: &PostDetail, width: usize) -> String {
    let post = match detail {
        PostDetail::Found(post) => post,
        other => return other.message().unwrap_or_default().to_string(),
    };

    let mut out = line(&post.title, width);
    let mut meta = Vec::new();
    if !post.author.is_empty() {
        meta.push(post.author.clone());
    }
    if !post.date.is_empty() {
        meta.push(post.date.clone());
    }
    meta.push(post.read_time_label());
    let _ = write!(out, "\n{}", line(&meta.join(" · "), width));
    let _ = write!(out, "\n{}", line(&post.category, width));

    for paragraph in post.paragraphs() {
        let _ = write!(out, "\n\n{}", strip_control_chars(paragraph));
    }
    out
}
