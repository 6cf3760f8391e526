//! Page navigation for multi-page output.

use std::collections::HashSet;
use std::fmt::Write as _;

use xd_document::{DocId, DocumentTree, relative_path};

use crate::links::output_file;

/// Prev / Up / Home / Next bar appended to a page.
///
/// Empty when the page has neither a previous nor a next page.
pub(crate) fn navigation_bar(tree: &DocumentTree, id: DocId) -> String {
    let next = tree.preorder_next(id);
    let prev = tree.preorder_prev(id);
    if next.is_none() && prev.is_none() {
        return String::new();
    }

    let up = tree.parent(id);
    let root = tree.root(id);
    let xref = |target: Option<DocId>, text: &str| {
        target.map_or_else(String::new, |target| {
            format!(
                "<<{}#,{text}>>",
                relative_path(output_file(tree, id), output_file(tree, target))
            )
        })
    };
    let home = if root == id {
        String::new()
    } else {
        format!(" +\n{}", xref(Some(root), "Home"))
    };

    format!(
        "ifdef::backend-html5[]\n\
         ++++\n\
         <div id=\"navigation\">\n\
         ++++\n\
         endif::[]\n\
         [frame=none, grid=none, cols=\"<.^,^.^,>.^\"]\n\
         |===\n\
         |{}\n\
         \n\
         |{}{home}\n\
         \n\
         |{}\n\
         |===\n\
         ifdef::backend-html5[]\n\
         ++++\n\
         </div>\n\
         ++++\n\
         endif::[]",
        xref(prev, "Prev"),
        xref(up, "Up"),
        xref(next, "Next"),
    )
}

/// HTML table of contents of the inclusion tree, as seen from page `id`.
///
/// Only the branches leading to the page are expanded.
pub(crate) fn multipage_toc(tree: &DocumentTree, id: DocId, side: &str) -> String {
    let mut breadcrumbs = HashSet::from([id]);
    let mut top = id;
    while let Some(parent) = tree.parent(top) {
        breadcrumbs.insert(parent);
        top = parent;
    }

    let style = if side == "left" {
        "left: 0; right: unset; border-right-width: 1px; border-left-width: 0px"
    } else {
        "left: unset; right: 0; border-right-width: 0px; border-left-width: 1px"
    };

    let mut out = String::new();
    let _ = writeln!(out, "<div id=\"toc\" class=\"toc2\" style=\"{style}\">");
    out.push_str("  <div id=\"toctitle\">\n");
    let _ = writeln!(
        out,
        "    <a href=\"{}\">{}</a>",
        html_link(tree, id, top),
        escape_html(tree.get(top).title())
    );
    out.push_str("  </div>\n");
    toc_level(tree, id, top, 1, &breadcrumbs, &mut out);
    out.push_str("</div>\n");
    out
}

fn toc_level(
    tree: &DocumentTree,
    current: DocId,
    id: DocId,
    level: usize,
    breadcrumbs: &HashSet<DocId>,
    out: &mut String,
) {
    let children: Vec<DocId> = tree
        .get(id)
        .children()
        .iter()
        .copied()
        .filter(|&c| tree.get(c).included_in() == Some(id))
        .collect();
    if children.is_empty() {
        return;
    }

    let indent = "  ".repeat(2 * level - 1);
    let _ = writeln!(out, "{indent}<ul class=\"sectlevel{level}\">");
    for child in children {
        let _ = writeln!(out, "{indent}  <li>");
        let _ = writeln!(
            out,
            "{indent}    <a href=\"{}\">{}</a>",
            html_link(tree, current, child),
            escape_html(tree.get(child).title())
        );
        if breadcrumbs.contains(&child) {
            toc_level(tree, current, child, level + 1, breadcrumbs, out);
        }
        let _ = writeln!(out, "{indent}  </li>");
    }
    let _ = writeln!(out, "{indent}</ul>");
}

/// Relative link to the HTML page produced for `target`.
fn html_link(tree: &DocumentTree, from: DocId, target: DocId) -> String {
    let path = relative_path(output_file(tree, from), output_file(tree, target));
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => format!("{}.html", &path[..name_start + dot]),
        _ => format!("{path}.html"),
    }
}

/// Escape HTML special characters.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
