//! Serializable summaries of resolved registries.
//!
//! A [`RegistrySchema`] captures what a type's registry declares — names,
//! kinds, metavars, help, grouping, and the bound attribute or handler name —
//! without the bound closures, so it can round-trip through JSON for tooling
//! and diagnostics.
//!
//! # Examples
//!
//! ```
//! use optable::{Accessor, Declarations, DeclarationError, Opt, Parseable, schema_of};
//!
//! #[derive(Default)]
//! struct App {
//!     verbose: bool,
//! }
//!
//! impl Parseable for App {
//!     fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
//!         d.attribute(
//!             "verbose",
//!             Accessor::new(|app: &App| app.verbose, |app, v| app.verbose = v),
//!             [Opt::set(["-v", "--verbose"]).value(true).help("Print more").build()?],
//!         )
//!     }
//! }
//!
//! let schema = schema_of::<App>().unwrap();
//! assert_eq!(schema.options.len(), 1);
//! assert_eq!(schema.options[0].names, vec!["-v", "--verbose"]);
//! assert_eq!(schema.options[0].binding, "verbose");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DeclarationError;
use crate::opt::OptionKind;
use crate::registry::{Parseable, registry_of};

/// Summary of one declared option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSchema {
    /// Visible names, in declaration order.
    pub names: Vec<String>,
    /// The option's effect kind.
    pub kind: OptionKind,
    /// Whether the option consumes an argument string.
    pub takes_value: bool,
    /// Metavar for the argument, when one is taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    /// Help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Whether the option may occur more than once per parse.
    pub repeatable: bool,
    /// Relative display order.
    pub sort_key: i32,
    /// Title of the group the option renders under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// The attribute or handler name the option is bound to.
    pub binding: String,
}

/// Summary of one help-display group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSchema {
    /// The group's heading.
    pub title: String,
    /// Explanatory text under the heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relative display order among groups.
    pub sort_key: i32,
}

/// Summary of a type's resolved registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySchema {
    /// Declared options, in display order.
    pub options: Vec<OptionSchema>,
    /// Referenced groups, in display order.
    pub groups: Vec<GroupSchema>,
}

impl RegistrySchema {
    /// Serializes the schema as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds the registry summary for `T`.
pub fn schema_of<T: Parseable>() -> Result<RegistrySchema, DeclarationError> {
    let registry = registry_of::<T>()?;
    let entries = registry.entries();

    let mut picked: Vec<(u64, OptionSchema)> = Vec::new();
    let mut groups: Vec<((i32, u64), GroupSchema)> = Vec::new();
    for entry in entries.values() {
        let opt = &entry.opt;
        if picked.iter().any(|(id, _)| *id == opt.order()) {
            continue;
        }
        let names: Vec<String> = opt
            .names()
            .iter()
            .filter(|name| {
                entries
                    .get(*name)
                    .is_some_and(|owner| owner.opt.order() == opt.order())
            })
            .cloned()
            .collect();
        picked.push((
            opt.order(),
            OptionSchema {
                names,
                kind: opt.kind(),
                takes_value: opt.takes_value(),
                metavar: opt.metavar().map(str::to_string),
                help: opt.help().map(str::to_string),
                repeatable: opt.repeatable(),
                sort_key: opt.get_sort_key(),
                group: opt.get_group().map(|group| group.title().to_string()),
                binding: entry.binding.clone(),
            },
        ));
        if let Some(group) = opt.get_group() {
            if !groups.iter().any(|(key, _)| key.1 == group.order()) {
                groups.push((
                    group.sort(),
                    GroupSchema {
                        title: group.title().to_string(),
                        description: group.get_description().map(str::to_string),
                        sort_key: group.get_sort_key(),
                    },
                ));
            }
        }
    }

    picked.sort_by_key(|(id, schema)| (schema.sort_key, *id));
    groups.sort_by_key(|(key, _)| *key);
    Ok(RegistrySchema {
        options: picked.into_iter().map(|(_, schema)| schema).collect(),
        groups: groups.into_iter().map(|(_, schema)| schema).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Converter;
    use crate::opt::{Group, Opt};
    use crate::registry::{Accessor, Declarations};

    #[derive(Default)]
    struct Exported {
        threads: i64,
        db_url: String,
    }

    impl Parseable for Exported {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            let db = Group::new("Database Options").sort_key(10);
            d.attribute(
                "threads",
                Accessor::new(|e: &Exported| e.threads, |e, v| e.threads = v),
                [Opt::set(["-T", "--threads"]).converter(Converter::int()).build()?],
            )?;
            d.attribute(
                "db_url",
                Accessor::new(|e: &Exported| e.db_url.clone(), |e, v| e.db_url = v),
                [Opt::set(["--db"])
                    .converter(Converter::str())
                    .metavar("URL")
                    .group(&db)
                    .build()?],
            )
        }
    }

    #[test]
    fn test_schema_round_trips_through_json() {
        let schema = schema_of::<Exported>().unwrap();
        let json = schema.to_json_pretty().unwrap();
        let back: RegistrySchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }

    #[test]
    fn test_schema_captures_bindings_and_groups() {
        let schema = schema_of::<Exported>().unwrap();
        assert_eq!(schema.options.len(), 2);
        assert_eq!(schema.groups.len(), 1);
        assert_eq!(schema.groups[0].title, "Database Options");

        let threads = schema
            .options
            .iter()
            .find(|option| option.binding == "threads")
            .unwrap();
        assert_eq!(threads.names, vec!["-T", "--threads"]);
        assert_eq!(threads.metavar.as_deref(), Some("INT"));
        assert_eq!(threads.kind, OptionKind::Set);
    }
}
