//! Parser compilation and the parse-dispatch engine.
//!
//! [`make_parser`] compiles a type's resolved registry into a set of
//! descriptors (one per distinct option, with visible names filtered through
//! the registry) and a name lookup table. [`Parser::parse`] then walks the
//! argument sequence, recognizing `-x`, `-xVALUE`, bundled shorts,
//! `--long`, and `--long=VALUE` forms, and dispatches each occurrence to its
//! bound action.
//!
//! Tokenization stops at the first non-option token unless interspersed
//! arguments are enabled; `--` always ends option recognition. The non-option
//! tokens are returned in their original relative order.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use crate::convert::ConvertError;
use crate::error::{DeclarationError, InvocationError};
use crate::opt::{ArgSource, Group};
use crate::registry::{Action, Entry, Parseable, Registry, registry_of};
use crate::value::Value;

/// Configuration passed through to parser construction and help rendering.
///
/// # Examples
///
/// ```
/// use optable::ParserConfig;
///
/// let config = ParserConfig::new()
///     .prog("greet")
///     .usage("%prog [options] NAME")
///     .allow_interspersed(true);
/// assert!(config.interspersed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    prog: Option<String>,
    usage: Option<String>,
    description: Option<String>,
    allow_interspersed: bool,
}

impl ParserConfig {
    /// Default configuration: no help strings, interspersed arguments off.
    pub fn new() -> Self {
        ParserConfig::default()
    }

    /// Program name; substituted for `%prog` in the usage string.
    pub fn prog(mut self, prog: impl Into<String>) -> Self {
        self.prog = Some(prog.into());
        self
    }

    /// Usage line rendered at the top of help output.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Description paragraph rendered under the usage line.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether options are recognized after positional arguments.
    pub fn allow_interspersed(mut self, allow: bool) -> Self {
        self.allow_interspersed = allow;
        self
    }

    /// The configured interspersed-arguments mode.
    pub fn interspersed(&self) -> bool {
        self.allow_interspersed
    }

    pub(crate) fn usage_line(&self) -> Option<String> {
        let usage = self.usage.as_ref()?;
        Some(match &self.prog {
            Some(prog) => usage.replace("%prog", prog),
            None => usage.clone(),
        })
    }

    pub(crate) fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// One compiled, parseable option: visible names plus the bound action.
pub(crate) struct Descriptor<T> {
    pub names: Vec<String>,
    pub label: String,
    pub nargs: usize,
    pub source: ArgSource,
    pub metavar: Option<String>,
    pub help: Option<String>,
    pub sort: (i32, u64),
    pub group: Option<Group>,
    pub repeatable: bool,
    pub id: u64,
    pub action: Action<T>,
}

impl<T: 'static> Descriptor<T> {
    /// Compiles a registry entry, filtering the option's names through the
    /// registry: a name is visible only when it is present in the filter and
    /// maps back to this same option. This is a membership filter, never a
    /// search.
    fn compile(
        entry: &Entry<T>,
        filter: &HashMap<String, Entry<T>>,
    ) -> Result<Self, DeclarationError> {
        let opt = &entry.opt;
        let names: Vec<String> = opt
            .names()
            .iter()
            .filter(|name| {
                filter
                    .get(*name)
                    .is_some_and(|owner| owner.opt.order() == opt.order())
            })
            .cloned()
            .collect();
        if names.is_empty() {
            return Err(DeclarationError::NoVisibleNames);
        }
        let label = names.join("/");
        Ok(Descriptor {
            names,
            label,
            nargs: usize::from(opt.takes_value()),
            source: opt.source().clone(),
            metavar: opt.metavar().map(str::to_string),
            help: opt.help().map(str::to_string),
            sort: opt.sort(),
            group: opt.get_group().cloned(),
            repeatable: opt.repeatable(),
            id: opt.order(),
            action: entry.action.clone(),
        })
    }
}

/// A compiled parser for one target type.
pub struct Parser<T> {
    descriptors: Vec<Descriptor<T>>,
    by_name: HashMap<String, usize>,
    config: ParserConfig,
}

/// Builds a parser for `T` from its resolved registry.
pub fn make_parser<T: Parseable>(config: ParserConfig) -> Result<Parser<T>, DeclarationError> {
    let registry = registry_of::<T>()?;
    Parser::compile(&registry, config)
}

impl<T: Parseable> Parser<T> {
    fn compile(registry: &Registry<T>, config: ParserConfig) -> Result<Self, DeclarationError> {
        let entries = registry.entries();
        let mut descriptors: Vec<Descriptor<T>> = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();
        for entry in entries.values() {
            if seen.insert(entry.opt.order()) {
                descriptors.push(Descriptor::compile(entry, entries)?);
            }
        }
        descriptors.sort_by_key(|descriptor| descriptor.sort);

        let mut by_name = HashMap::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            for name in &descriptor.names {
                by_name.insert(name.clone(), index);
            }
        }
        Ok(Parser {
            descriptors,
            by_name,
            config,
        })
    }

    /// Parses `args` (program name excluded), mutating `target` per the
    /// dispatch rules, and returns the non-option arguments.
    pub fn parse<I>(&self, target: &mut T, args: I) -> Result<Vec<String>, InvocationError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let run = ParseRun {
            parser: self,
            target,
            rest: args.into_iter().map(Into::into).collect(),
            positionals: Vec::new(),
            counts: HashMap::new(),
            interspersed: self.config.allow_interspersed,
        };
        run.run()
    }

    /// Renders help text for this parser's options.
    pub fn help(&self) -> String {
        crate::help::render(self)
    }

    /// The configuration this parser was built with.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub(crate) fn descriptors(&self) -> &[Descriptor<T>] {
        &self.descriptors
    }
}

/// Call-local parse state: the remaining tokens, collected positionals, and
/// per-option occurrence counts.
struct ParseRun<'p, T> {
    parser: &'p Parser<T>,
    target: &'p mut T,
    rest: VecDeque<String>,
    positionals: Vec<String>,
    counts: HashMap<u64, u32>,
    interspersed: bool,
}

impl<T: Parseable> ParseRun<'_, T> {
    fn run(mut self) -> Result<Vec<String>, InvocationError> {
        while let Some(token) = self.rest.pop_front() {
            if token == "--" {
                self.positionals.extend(self.rest.drain(..));
                break;
            } else if token.starts_with("--") {
                self.long_option(&token)?;
            } else if token.starts_with('-') && token.len() > 1 {
                self.short_group(&token)?;
            } else {
                self.positionals.push(token);
                if !self.interspersed {
                    self.positionals.extend(self.rest.drain(..));
                    break;
                }
            }
        }
        Ok(self.positionals)
    }

    fn long_option(&mut self, token: &str) -> Result<(), InvocationError> {
        let (name, attached) = match token.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (token.to_string(), None),
        };
        let index = self.lookup(&name)?;
        if self.parser.descriptors[index].nargs == 0 {
            if attached.is_some() {
                return Err(InvocationError::UnexpectedValue(name));
            }
            self.dispatch(index, &name, None)
        } else {
            let raw = match attached {
                Some(value) => value,
                None => self
                    .rest
                    .pop_front()
                    .ok_or_else(|| InvocationError::MissingArgument(name.clone()))?,
            };
            self.dispatch(index, &name, Some(raw))
        }
    }

    fn short_group(&mut self, token: &str) -> Result<(), InvocationError> {
        let flags: Vec<char> = token.chars().skip(1).collect();
        let mut position = 0;
        while position < flags.len() {
            let name = format!("-{}", flags[position]);
            let index = self.lookup(&name)?;
            if self.parser.descriptors[index].nargs == 0 {
                self.dispatch(index, &name, None)?;
                position += 1;
            } else {
                // The rest of the token, or the next token, is the argument.
                let attached: String = flags[position + 1..].iter().collect();
                let raw = if attached.is_empty() {
                    self.rest
                        .pop_front()
                        .ok_or_else(|| InvocationError::MissingArgument(name.clone()))?
                } else {
                    attached
                };
                self.dispatch(index, &name, Some(raw))?;
                break;
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<usize, InvocationError> {
        self.parser
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| InvocationError::NoSuchOption(name.to_string()))
    }

    fn dispatch(
        &mut self,
        index: usize,
        name_as_typed: &str,
        raw: Option<String>,
    ) -> Result<(), InvocationError> {
        let parser = self.parser;
        let descriptor = &parser.descriptors[index];
        trace!(option = name_as_typed, label = %descriptor.label, "Dispatching option");

        let value = match &descriptor.source {
            ArgSource::Fixed(value) => value.clone(),
            ArgSource::Typed(converter) => {
                let raw = raw.ok_or_else(|| {
                    InvocationError::MissingArgument(name_as_typed.to_string())
                })?;
                match converter.convert(&raw) {
                    Ok(value) => value,
                    Err(ConvertError::Invalid) => {
                        return Err(InvocationError::InvalidValue {
                            names: descriptor.label.clone(),
                            value: raw,
                            metavar: descriptor.metavar.clone().unwrap_or_default(),
                        });
                    }
                    Err(ConvertError::Other(source)) => {
                        return Err(InvocationError::Converter(source));
                    }
                }
            }
        };

        if !descriptor.repeatable {
            let count = self.counts.entry(descriptor.id).or_insert(0);
            *count += 1;
            if *count > 1 {
                return Err(InvocationError::Repeated(descriptor.label.clone()));
            }
        }

        match &descriptor.action {
            Action::Set(accessor) => accessor.set(self.target, value)?,
            Action::Add(accessor) => {
                let current = accessor.get(self.target);
                let combined = current.add(value)?;
                accessor.set(self.target, combined)?;
            }
            Action::Append(accessor) => {
                let mut current = accessor.get(self.target);
                current.push(value)?;
                accessor.set(self.target, current)?;
            }
            Action::Handle(handler) => {
                let mut invocation = Invocation {
                    name: name_as_typed,
                    value,
                    rest: &mut self.rest,
                    interspersed: &mut self.interspersed,
                };
                (**handler)(self.target, &mut invocation)?;
            }
        }
        Ok(())
    }
}

/// The in-progress parse state handed to option handlers.
pub struct Invocation<'a> {
    name: &'a str,
    value: Value,
    rest: &'a mut VecDeque<String>,
    interspersed: &'a mut bool,
}

impl Invocation<'_> {
    /// The option name as typed on the command line (e.g. `-z`).
    pub fn name(&self) -> &str {
        self.name
    }

    /// The resolved value (the converted argument, or the fixed value).
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The not-yet-parsed argument sequence.
    ///
    /// Handlers may mutate this in place (e.g. clear it to short-circuit the
    /// rest of the parse).
    pub fn rest(&mut self) -> &mut VecDeque<String> {
        self.rest
    }

    /// Toggles interspersed-argument recognition for the rest of the parse.
    pub fn set_interspersed(&mut self, allow: bool) {
        *self.interspersed = allow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Converter;
    use crate::error::DeclarationError;
    use crate::opt::Opt;
    use crate::registry::{Accessor, Declarations};

    #[derive(Default)]
    struct Wire {
        level: i64,
        tags: Vec<String>,
        dry_run: bool,
    }

    impl Parseable for Wire {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            d.attribute(
                "level",
                Accessor::new(|w: &Wire| w.level, |w, v| w.level = v),
                [Opt::set(["-l", "--level"]).converter(Converter::int()).build()?],
            )?;
            d.attribute(
                "tags",
                Accessor::new(|w: &Wire| w.tags.clone(), |w, v| w.tags = v),
                [Opt::append(["-t", "--tag"]).converter(Converter::str()).build()?],
            )?;
            d.attribute(
                "dry_run",
                Accessor::new(|w: &Wire| w.dry_run, |w, v| w.dry_run = v),
                [Opt::set(["-n", "--dry-run"]).value(true).build()?],
            )
        }
    }

    fn parser() -> Parser<Wire> {
        make_parser::<Wire>(ParserConfig::new()).unwrap()
    }

    #[test]
    fn test_long_equals_form() {
        let mut wire = Wire::default();
        let rest = parser().parse(&mut wire, ["--level=7"]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(wire.level, 7);
    }

    #[test]
    fn test_long_separate_argument() {
        let mut wire = Wire::default();
        parser().parse(&mut wire, ["--level", "3"]).unwrap();
        assert_eq!(wire.level, 3);
    }

    #[test]
    fn test_short_attached_argument() {
        let mut wire = Wire::default();
        parser().parse(&mut wire, ["-l9"]).unwrap();
        assert_eq!(wire.level, 9);
    }

    #[test]
    fn test_short_bundle_with_trailing_value_flag() {
        let mut wire = Wire::default();
        parser().parse(&mut wire, ["-nl4"]).unwrap();
        assert!(wire.dry_run);
        assert_eq!(wire.level, 4);
    }

    #[test]
    fn test_double_dash_ends_option_recognition() {
        let mut wire = Wire::default();
        let rest = parser().parse(&mut wire, ["-n", "--", "-l", "5"]).unwrap();
        assert_eq!(rest, vec!["-l", "5"]);
        assert_eq!(wire.level, 0);
    }

    #[test]
    fn test_missing_argument_is_reported() {
        let mut wire = Wire::default();
        let err = parser().parse(&mut wire, ["--level"]).unwrap_err();
        assert_eq!(err.to_string(), "--level option requires an argument");
    }

    #[test]
    fn test_equals_on_flag_option_is_rejected() {
        let mut wire = Wire::default();
        let err = parser().parse(&mut wire, ["--dry-run=yes"]).unwrap_err();
        assert_eq!(err.to_string(), "--dry-run option does not take a value");
    }

    #[test]
    fn test_unknown_option_is_reported() {
        let mut wire = Wire::default();
        let err = parser().parse(&mut wire, ["--bogus"]).unwrap_err();
        assert_eq!(err.to_string(), "no such option: --bogus");
    }

    #[test]
    fn test_append_accumulates_in_command_line_order() {
        let mut wire = Wire::default();
        parser()
            .parse(&mut wire, ["-tred", "--tag", "green", "--tag=blue"])
            .unwrap();
        assert_eq!(wire.tags, vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_lone_dash_is_positional() {
        let mut wire = Wire::default();
        let rest = parser().parse(&mut wire, ["-"]).unwrap();
        assert_eq!(rest, vec!["-"]);
    }
}
