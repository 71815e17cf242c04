//! Declarative command-line option tables with inheritance, rejection, and
//! dispatch.
//!
//! A type declares options as metadata bound to its fields or handler
//! functions by implementing [`Parseable`]. Declarations are inherited across
//! an explicit type hierarchy (with selective override and rejection),
//! resolved once per type into a cached [`Registry`], and compiled per parse
//! call into a parser that drives an argument sequence into field mutations
//! or handler invocations.
//!
//! - [`Opt`] — the immutable declaration of one option: names, effect kind
//!   (`Set`/`Add`/`Append`/`Handler`), fixed value or [`Converter`], help
//!   metadata, repeatability, and ordering keys.
//! - [`Group`] — a heading clustering related options in help output.
//! - [`Declarations`] — the per-type table: field and handler bindings,
//!   explicit bases, and rejection directives.
//! - [`parse`] / [`make_parser`] / [`get_help`] — the runtime entry points.
//! - [`schema_of`] — a serializable summary of a resolved registry.
//!
//! # Example
//!
//! ```
//! use optable::{
//!     Accessor, Converter, DeclarationError, Declarations, Opt, Parseable, parse,
//! };
//!
//! #[derive(Default)]
//! struct Build {
//!     verbose: bool,
//!     jobs: i64,
//! }
//!
//! impl Parseable for Build {
//!     fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
//!         d.attribute(
//!             "verbose",
//!             Accessor::new(|b: &Build| b.verbose, |b, v| b.verbose = v),
//!             [
//!                 Opt::set(["-v", "--verbose"]).value(true).help("Print more").build()?,
//!                 Opt::set(["-q", "--quiet"]).value(false).help("Print less").build()?,
//!             ],
//!         )?;
//!         d.attribute(
//!             "jobs",
//!             Accessor::new(|b: &Build| b.jobs, |b, v| b.jobs = v),
//!             [Opt::set(["-j", "--jobs"]).converter(Converter::int()).build()?],
//!         )
//!     }
//! }
//!
//! let mut build = Build::default();
//! let rest = parse(&mut build, ["-v", "-j", "4", "target"]).unwrap();
//! assert_eq!(rest, vec!["target"]);
//! assert!(build.verbose);
//! assert_eq!(build.jobs, 4);
//! ```
//!
//! # Inheritance
//!
//! A type lists its bases explicitly, projecting onto an embedded base value;
//! the base's registry entries are re-bound through the projection. Later
//! bases override earlier ones on name collision, rejection directives prune
//! the inherited portion, and local declarations win over whatever survives.
//! See [`Declarations::inherit`], [`Declarations::reject`], and
//! [`Declarations::reject_all`].

mod convert;
mod error;
mod help;
mod opt;
mod parser;
mod registry;
mod schema;
mod value;

pub use convert::{ConvertError, Converter};
pub use error::{DeclarationError, Error, InvocationError};
pub use opt::{Group, Opt, OptBuilder, OptionKind};
pub use parser::{Invocation, Parser, ParserConfig, make_parser};
pub use registry::{Accessor, Declarations, HandlerFn, Parseable, Registry, registry_of};
pub use schema::{GroupSchema, OptionSchema, RegistrySchema, schema_of};
pub use value::{FieldValue, Value, ValueError};

/// Parses `args` into `target` with the default configuration, returning the
/// non-option arguments.
///
/// `args` excludes the program name, like `std::env::args().skip(1)`.
pub fn parse<T, I>(target: &mut T, args: I) -> Result<Vec<String>, Error>
where
    T: Parseable,
    I: IntoIterator,
    I::Item: Into<String>,
{
    parse_with(target, args, ParserConfig::new())
}

/// Parses `args` into `target` with an explicit configuration.
pub fn parse_with<T, I>(target: &mut T, args: I, config: ParserConfig) -> Result<Vec<String>, Error>
where
    T: Parseable,
    I: IntoIterator,
    I::Item: Into<String>,
{
    let parser = make_parser::<T>(config)?;
    Ok(parser.parse(target, args)?)
}

/// Renders the help text for `T`'s options.
pub fn get_help<T: Parseable>(config: ParserConfig) -> Result<String, DeclarationError> {
    Ok(make_parser::<T>(config)?.help())
}
