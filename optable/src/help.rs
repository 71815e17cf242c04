//! Help text assembly.
//!
//! The ordering contract: ungrouped options first, under a top-level
//! `Options:` heading, sorted by `(sort_key, creation order)`; grouped
//! options follow, one block per group, blocks ordered by the group's
//! `(sort_key, creation order)`, members sorted like ungrouped options.
//! An empty registry renders as the empty string.

use std::fmt::Write;

use crate::opt::Group;
use crate::parser::{Descriptor, Parser};
use crate::registry::Parseable;

const COLUMN_CAP: usize = 26;

pub(crate) fn render<T: Parseable>(parser: &Parser<T>) -> String {
    let descriptors = parser.descriptors();
    if descriptors.is_empty() {
        return String::new();
    }

    let mut ungrouped: Vec<&Descriptor<T>> = Vec::new();
    let mut blocks: Vec<(Group, Vec<&Descriptor<T>>)> = Vec::new();
    for descriptor in descriptors {
        match &descriptor.group {
            None => ungrouped.push(descriptor),
            Some(group) => {
                match blocks.iter_mut().find(|(g, _)| g.order() == group.order()) {
                    Some((_, members)) => members.push(descriptor),
                    None => blocks.push((group.clone(), vec![descriptor])),
                }
            }
        }
    }
    ungrouped.sort_by_key(|descriptor| descriptor.sort);
    blocks.sort_by_key(|(group, _)| group.sort());
    for (_, members) in &mut blocks {
        members.sort_by_key(|descriptor| descriptor.sort);
    }

    let width = descriptors
        .iter()
        .map(|descriptor| invocation(descriptor).len())
        .max()
        .unwrap_or(0)
        .min(COLUMN_CAP);

    let mut out = String::new();
    if let Some(usage) = parser.config().usage_line() {
        let _ = writeln!(out, "Usage: {usage}");
        out.push('\n');
    }
    if let Some(description) = parser.config().description_text() {
        let _ = writeln!(out, "{description}");
        out.push('\n');
    }

    if !ungrouped.is_empty() {
        out.push_str("Options:\n");
        for descriptor in &ungrouped {
            push_line(&mut out, descriptor, width);
        }
    }
    for (group, members) in &blocks {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{}:", group.title());
        if let Some(description) = group.get_description() {
            let _ = writeln!(out, "  {description}");
        }
        for descriptor in members {
            push_line(&mut out, descriptor, width);
        }
    }
    out
}

fn invocation<T>(descriptor: &Descriptor<T>) -> String {
    let mut line = descriptor.names.join(", ");
    if let Some(metavar) = &descriptor.metavar {
        line.push(' ');
        line.push_str(metavar);
    }
    line
}

fn push_line<T>(out: &mut String, descriptor: &Descriptor<T>, width: usize) {
    let invocation = invocation(descriptor);
    match &descriptor.help {
        Some(help) if invocation.len() <= width => {
            let _ = writeln!(out, "  {invocation:width$}  {help}");
        }
        Some(help) => {
            let _ = writeln!(out, "  {invocation}");
            let _ = writeln!(out, "  {:width$}  {help}", "");
        }
        None => {
            let _ = writeln!(out, "  {invocation}");
        }
    }
}
