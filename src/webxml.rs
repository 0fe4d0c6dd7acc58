//! Merging module servlets into a `web.xml` deployment descriptor.
//!
//! The merge is textual: new elements are spliced into the original document
//! at schema-ordered positions so comments, formatting and everything else
//! the author wrote survive untouched.

use crate::error::{PipelineError, Result};
use crate::util::xml::parse_document;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Elements a `<servlet>` may follow in a `web-app`
const SERVLET_ANCHORS: &[&str] = &[
    "icon",
    "display-name",
    "description",
    "distributable",
    "context-param",
    "filter",
    "filter-mapping",
    "listener",
    "servlet",
];

/// Elements a `<servlet-mapping>` may follow in a `web-app`
const MAPPING_ANCHORS: &[&str] = &[
    "icon",
    "display-name",
    "description",
    "distributable",
    "context-param",
    "filter",
    "filter-mapping",
    "listener",
    "servlet",
    "servlet-mapping",
];

/// How a module servlet path becomes a `url-pattern`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServletPathMode {
    /// `/<module output name><path>`
    #[default]
    ModulePrefixed,
    /// `<path>` unchanged
    AsIs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServletEntry {
    pub name: String,
    pub class: String,
    pub url_pattern: String,
}

impl ServletEntry {
    pub fn for_module(module_output_name: &str, path: &str, class: &str, mode: ServletPathMode) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let url_pattern = match mode {
            ServletPathMode::ModulePrefixed => format!("/{}{}", module_output_name, path),
            ServletPathMode::AsIs => path.clone(),
        };
        Self {
            // Class name immediately followed by the path, with no separator
            name: format!("{}{}", class, path),
            class: class.to_string(),
            url_pattern,
        }
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),

    #[error("root element is <{0}>, expected <web-app>")]
    NotWebApp(String),
}

/// Insert every entry whose `servlet-name` is not yet declared.
///
/// Returns the document unchanged when there is nothing to add.
pub fn merge_servlets(xml: &str, entries: &[ServletEntry]) -> Result<String, MergeError> {
    let doc = parse_document(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "web-app" {
        return Err(MergeError::NotWebApp(root.tag_name().name().to_string()));
    }

    let mut declared: HashSet<String> = root
        .children()
        .filter(|n| n.has_tag_name("servlet"))
        .filter_map(|n| n.children().find(|c| c.has_tag_name("servlet-name")))
        .filter_map(|n| n.text())
        .map(|t| t.trim().to_string())
        .collect();

    let new_entries: Vec<&ServletEntry> = entries
        .iter()
        .filter(|e| declared.insert(e.name.clone()))
        .collect();
    if new_entries.is_empty() {
        debug!("All servlets already declared");
        return Ok(xml.to_string());
    }

    let last_anchor = |names: &[&str]| {
        root.children()
            .filter(|n| n.is_element() && names.contains(&n.tag_name().name()))
            .last()
    };
    let servlet_anchor = last_anchor(SERVLET_ANCHORS);
    let mapping_anchor = last_anchor(MAPPING_ANCHORS);

    let indent = servlet_anchor
        .or_else(|| root.children().find(|n| n.is_element()))
        .map(|n| indentation_before(xml, n.range().start))
        .unwrap_or_else(|| "  ".to_string());
    let unit = if indent.contains('\t') { "\t" } else { "  " };

    let mut servlets = String::new();
    let mut mappings = String::new();
    for entry in &new_entries {
        let name = escape(&entry.name);
        servlets.push_str(&format!(
            "\n{i}<servlet>\n{i}{u}<servlet-name>{}</servlet-name>\n{i}{u}<servlet-class>{}</servlet-class>\n{i}</servlet>",
            name,
            escape(&entry.class),
            i = indent,
            u = unit
        ));
        mappings.push_str(&format!(
            "\n{i}<servlet-mapping>\n{i}{u}<servlet-name>{}</servlet-name>\n{i}{u}<url-pattern>{}</url-pattern>\n{i}</servlet-mapping>",
            name,
            escape(&entry.url_pattern),
            i = indent,
            u = unit
        ));
    }

    let root_range = root.range();
    let root_source = &xml[root_range.clone()];
    let merged = if root_source.ends_with("/>") && !root.has_children() {
        // <web-app .../> has no room for children: reopen it
        let open_end = root_range.start + root_source[..root_source.len() - 2].trim_end().len();
        format!(
            "{}>{}{}\n</{}>{}",
            &xml[..open_end],
            servlets,
            mappings,
            qualified_name(root_source),
            &xml[root_range.end..]
        )
    } else {
        let content_start = match root.first_child() {
            Some(child) => child.range().start,
            None => root_range.start + root_source.rfind("</").unwrap_or(root_source.len()),
        };
        let servlet_pos = servlet_anchor.map_or(content_start, |n| n.range().end);
        let mapping_pos = mapping_anchor.map_or(content_start, |n| n.range().end);
        let trailer = if root.has_children() { "" } else { "\n" };

        if mapping_pos <= servlet_pos {
            format!(
                "{}{}{}{}{}",
                &xml[..servlet_pos],
                servlets,
                mappings,
                trailer,
                &xml[servlet_pos..]
            )
        } else {
            format!(
                "{}{}{}{}{}",
                &xml[..servlet_pos],
                servlets,
                &xml[servlet_pos..mapping_pos],
                mappings,
                &xml[mapping_pos..]
            )
        }
    };

    info!(added = new_entries.len(), "Merged servlets into deployment descriptor");
    Ok(merged)
}

/// Merge into the `web.xml` at `source`, writing the result to `target`.
pub fn merge_file(source: &Path, target: &Path, entries: &[ServletEntry]) -> Result<usize> {
    let xml = fs::read_to_string(source).map_err(|e| PipelineError::template(source, e))?;
    let before = xml.len();
    let merged = merge_servlets(&xml, entries).map_err(|e| PipelineError::template(source, e))?;
    let changed = merged.len() != before;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::template(target, e))?;
    }
    if changed || source != target {
        fs::write(target, &merged).map_err(|e| PipelineError::template(target, e))?;
    }

    let declared = parse_document(&merged)
        .map(|doc| {
            doc.root_element()
                .children()
                .filter(|n| n.has_tag_name("servlet"))
                .count()
        })
        .map_err(|e| PipelineError::template(target, e))?;
    Ok(declared)
}

/// Whitespace between the previous newline and `offset`
fn indentation_before(xml: &str, offset: usize) -> String {
    let line_start = xml[..offset].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &xml[line_start..offset];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix.to_string()
    } else {
        String::new()
    }
}

fn qualified_name(start_tag: &str) -> &str {
    start_tag
        .trim_start_matches('<')
        .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .next()
        .unwrap_or("web-app")
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
