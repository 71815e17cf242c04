//! Option and group value objects.
//!
//! An [`Opt`] is the immutable declaration of one command-line switch: its
//! names, effect kind, argument source (fixed value or converter), help
//! metadata, repeatability, and ordering keys. A [`Group`] is a help-display
//! heading that related options reference.
//!
//! Both carry a monotonically increasing creation counter used as a stable
//! tie-break wherever sort keys collide, and both are `Arc`-shared so clones
//! keep their identity.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::convert::Converter;
use crate::error::DeclarationError;
use crate::value::Value;

static NEXT_ORDER: AtomicU64 = AtomicU64::new(1);

fn next_order() -> u64 {
    NEXT_ORDER.fetch_add(1, Ordering::Relaxed)
}

/// The effect category of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    /// Overwrite the bound attribute with the resolved value.
    Set,
    /// Overwrite the bound attribute with `current + resolved`.
    Add,
    /// Append the resolved value to the bound list attribute.
    Append,
    /// Invoke a bound handler function.
    Handler,
}

#[derive(Debug)]
struct GroupInner {
    title: String,
    description: Option<String>,
    sort_key: i32,
    order: u64,
}

/// A heading under which related options are displayed in help output.
///
/// Groups with lower sort keys render first; groups sharing a sort key render
/// in creation order.
///
/// # Examples
///
/// ```
/// use optable::Group;
///
/// let db = Group::new("Database Options")
///     .description("Where and how to connect")
///     .sort_key(10);
/// assert_eq!(db.title(), "Database Options");
/// ```
#[derive(Debug, Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

impl Group {
    /// Creates a group with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Group {
            inner: Arc::new(GroupInner {
                title: title.into(),
                description: None,
                sort_key: 0,
                order: next_order(),
            }),
        }
    }

    /// Sets explanatory text shown under the heading.
    pub fn description(self, description: impl Into<String>) -> Self {
        self.map(|inner| inner.description = Some(description.into()))
    }

    /// Sets the relative display order among groups (lower renders first).
    pub fn sort_key(self, sort_key: i32) -> Self {
        self.map(|inner| inner.sort_key = sort_key)
    }

    /// The group's title.
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// The group's explanatory text, if any.
    pub fn get_description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// The group's sort key.
    pub fn get_sort_key(&self) -> i32 {
        self.inner.sort_key
    }

    pub(crate) fn order(&self) -> u64 {
        self.inner.order
    }

    pub(crate) fn sort(&self) -> (i32, u64) {
        (self.inner.sort_key, self.inner.order)
    }

    fn map(self, apply: impl FnOnce(&mut GroupInner)) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| GroupInner {
            title: shared.title.clone(),
            description: shared.description.clone(),
            sort_key: shared.sort_key,
            order: shared.order,
        });
        apply(&mut inner);
        Group {
            inner: Arc::new(inner),
        }
    }
}

/// How a recognized occurrence resolves its value.
#[derive(Debug, Clone)]
pub(crate) enum ArgSource {
    /// The option takes no argument; this value is used directly.
    Fixed(Value),
    /// The option consumes one argument string, converted on dispatch.
    Typed(Converter),
}

#[derive(Debug)]
struct OptInner {
    names: Vec<String>,
    kind: OptionKind,
    source: ArgSource,
    help: Option<String>,
    metavar: Option<String>,
    repeatable: bool,
    sort_key: i32,
    group: Option<Group>,
    order: u64,
}

/// The immutable declaration of one command-line option.
///
/// Built through [`OptBuilder`], which validates names and the
/// value/converter exclusivity rules.
///
/// # Examples
///
/// ```
/// use optable::{Converter, Opt};
///
/// let verbose = Opt::set(["-v", "--verbose"])
///     .value(true)
///     .help("Print more")
///     .build()
///     .unwrap();
/// assert!(!verbose.repeatable());
///
/// let lib = Opt::append(["-L"]).converter(Converter::str()).build().unwrap();
/// assert!(lib.repeatable());
/// assert_eq!(lib.metavar(), Some("STR"));
/// ```
#[derive(Debug, Clone)]
pub struct Opt {
    inner: Arc<OptInner>,
}

impl Opt {
    /// Starts a `Set`-kind option: overwrite the bound attribute.
    pub fn set<I>(names: I) -> OptBuilder
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        OptBuilder::new(OptionKind::Set, names)
    }

    /// Starts an `Add`-kind option: accumulate onto the bound attribute.
    pub fn add<I>(names: I) -> OptBuilder
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        OptBuilder::new(OptionKind::Add, names)
    }

    /// Starts an `Append`-kind option: push onto the bound list attribute.
    pub fn append<I>(names: I) -> OptBuilder
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        OptBuilder::new(OptionKind::Append, names)
    }

    /// Starts a `Handler`-kind option: invoke a bound function.
    pub fn handler<I>(names: I) -> OptBuilder
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        OptBuilder::new(OptionKind::Handler, names)
    }

    /// The declared names, in declaration order.
    pub fn names(&self) -> &[String] {
        &self.inner.names
    }

    /// The declared names joined by `/`, as used in error messages.
    pub fn label(&self) -> String {
        self.inner.names.join("/")
    }

    /// The option's effect kind.
    pub fn kind(&self) -> OptionKind {
        self.inner.kind
    }

    /// The help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.inner.help.as_deref()
    }

    /// The metavar shown for the option's argument, if it takes one.
    pub fn metavar(&self) -> Option<&str> {
        self.inner.metavar.as_deref()
    }

    /// Whether the option may occur more than once per parse call.
    pub fn repeatable(&self) -> bool {
        self.inner.repeatable
    }

    /// The option's sort key.
    pub fn get_sort_key(&self) -> i32 {
        self.inner.sort_key
    }

    /// The group this option renders under, if any.
    pub fn get_group(&self) -> Option<&Group> {
        self.inner.group.as_ref()
    }

    /// Whether the option consumes an argument string.
    pub fn takes_value(&self) -> bool {
        matches!(self.inner.source, ArgSource::Typed(_))
    }

    pub(crate) fn source(&self) -> &ArgSource {
        &self.inner.source
    }

    /// Creation-order identity; unique per built option.
    pub(crate) fn order(&self) -> u64 {
        self.inner.order
    }

    pub(crate) fn sort(&self) -> (i32, u64) {
        (self.inner.sort_key, self.inner.order)
    }
}

/// Builder for [`Opt`], started from one of the kind constructors.
///
/// Validation happens in [`build`](OptBuilder::build).
#[derive(Debug)]
pub struct OptBuilder {
    names: Vec<String>,
    kind: OptionKind,
    value: Option<Value>,
    converter: Option<Converter>,
    help: Option<String>,
    metavar: Option<String>,
    repeatable: Option<bool>,
    sort_key: i32,
    group: Option<Group>,
}

impl OptBuilder {
    fn new<I>(kind: OptionKind, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        OptBuilder {
            names: names.into_iter().map(Into::into).collect(),
            kind,
            value: None,
            converter: None,
            help: None,
            metavar: None,
            repeatable: None,
            sort_key: 0,
            group: None,
        }
    }

    /// Fixed value used when the option takes no argument.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Converter applied to the option's argument string.
    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Help text shown next to the option.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Placeholder shown for the argument in help output.
    ///
    /// Only valid together with a converter; defaults to the converter's
    /// type name, uppercased.
    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    /// Overrides the kind's default repeatability.
    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = Some(repeatable);
        self
    }

    /// Relative display order among options (lower renders first).
    pub fn sort_key(mut self, sort_key: i32) -> Self {
        self.sort_key = sort_key;
        self
    }

    /// Places the option under a help-display group.
    pub fn group(mut self, group: &Group) -> Self {
        self.group = Some(group.clone());
        self
    }

    /// Validates the declaration and freezes it into an [`Opt`].
    pub fn build(self) -> Result<Opt, DeclarationError> {
        if self.names.is_empty() {
            return Err(DeclarationError::NoNames);
        }
        for name in &self.names {
            if !valid_name(name) {
                return Err(DeclarationError::InvalidName(name.clone()));
            }
        }

        let source = match (self.value, self.converter) {
            (Some(value), None) => {
                if self.metavar.is_some() {
                    return Err(DeclarationError::MetavarWithoutConverter);
                }
                ArgSource::Fixed(value)
            }
            (None, Some(converter)) => ArgSource::Typed(converter),
            _ => return Err(DeclarationError::ValueOrConverter),
        };

        let metavar = match &source {
            ArgSource::Typed(converter) => Some(
                self.metavar
                    .unwrap_or_else(|| converter.type_name().to_uppercase()),
            ),
            ArgSource::Fixed(_) => None,
        };

        let repeatable = self.repeatable.unwrap_or(match self.kind {
            OptionKind::Set | OptionKind::Handler => false,
            OptionKind::Add | OptionKind::Append => true,
        });

        Ok(Opt {
            inner: Arc::new(OptInner {
                names: self.names,
                kind: self.kind,
                source,
                help: self.help,
                metavar,
                repeatable,
                sort_key: self.sort_key,
                group: self.group,
                order: next_order(),
            }),
        })
    }
}

/// A name is valid as exactly one `-` plus one non-dash character, or exactly
/// two `-` plus a word not itself starting with a dash.
fn valid_name(name: &str) -> bool {
    if let Some(word) = name.strip_prefix("--") {
        !word.is_empty() && !word.starts_with('-')
    } else if let Some(short) = name.strip_prefix('-') {
        short.chars().count() == 1 && !short.starts_with('-')
    } else {
        false
    }
}
