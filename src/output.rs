//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every object is its positional id and file name, with the public URL
//! next to it; the source file is secondary context on an indented
//! `Source:` line, relative to the source root. This reads as an inventory of
//! what was published while still letting users trace each entry back to a
//! file.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! photos (gallery, 2 objects)
//!     001 dawn.jpg → api/photos/1 [thumbnail]
//!         Source: photos/dawn.jpg
//!     002 dusk.jpg → api/photos/2 [thumbnail]
//!         Source: photos/dusk.jpg
//!
//! Static: 3 files
//! Generated 1 collection, 2 objects → /srv/site
//! ```
//!
//! ## Check
//!
//! ```text
//! photos (gallery, 2 sources)
//!     001 photos/dawn.jpg
//!     002 photos/dusk.jpg
//!
//! Config is valid
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::site::{CheckReport, CollectionReport, SiteReport};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 object`, `2 objects`.
fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// `path` relative to `root` when possible, otherwise as given.
fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Generate
// ============================================================================

fn format_collection(collection: &CollectionReport, from_dir: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, {})",
        collection.name,
        collection.plugin,
        count(collection.objects.len(), "object")
    )];

    for object in &collection.objects {
        let mut header = format!(
            "{}{} {}",
            indent(1),
            format_index(object.id as usize),
            object.filename
        );
        if let Some(url) = &object.url {
            header.push_str(&format!(" → {url}"));
        }
        if object.has_thumbnail {
            header.push_str(" [thumbnail]");
        }
        lines.push(header);
        lines.push(format!(
            "{}Source: {}",
            indent(2),
            display_relative(&object.source, from_dir)
        ));
    }
    lines
}

/// Format the result of a site build.
pub fn format_site_output(report: &SiteReport) -> Vec<String> {
    let mut lines = Vec::new();
    for collection in &report.collections {
        lines.extend(format_collection(collection, &report.from_dir));
        lines.push(String::new());
    }

    if report.static_files > 0 {
        lines.push(format!("Static: {}", count(report.static_files, "file")));
    }
    let objects: usize = report.collections.iter().map(|c| c.objects.len()).sum();
    lines.push(format!(
        "Generated {}, {} → {}",
        count(report.collections.len(), "collection"),
        count(objects, "object"),
        report.output_dir.display()
    ));
    lines
}

pub fn print_site_output(report: &SiteReport) {
    for line in format_site_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of `check`: each collection's sources, in order.
pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = Vec::new();
    for collection in &report.collections {
        lines.push(format!(
            "{} ({}, {})",
            collection.name,
            collection.plugin,
            count(collection.sources.len(), "source")
        ));
        for (i, source) in collection.sources.iter().enumerate() {
            lines.push(format!(
                "{}{} {}",
                indent(1),
                format_index(i + 1),
                display_relative(source, &report.from_dir)
            ));
        }
        lines.push(String::new());
    }
    lines.push("Config is valid".to_string());
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// `sha1sum`-style line: digest, two spaces, path.
pub fn format_fingerprint_line(digest: &str, path: &Path) -> String {
    format!("{}  {}", digest, path.display())
}
