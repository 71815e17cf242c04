//! Error types for declaration-time and parse-time failures.
//!
//! The two failure classes are kept as separate enums so callers can catch
//! command-line mistakes ([`InvocationError`]) without masking programming
//! mistakes ([`DeclarationError`]). The convenience entry points that can hit
//! either class return the combined [`Error`].

use thiserror::Error;

use crate::value::ValueError;

/// Errors raised while declaring options or compiling a registry into a
/// parser.
///
/// These indicate a programming mistake in a type's declarations and are
/// expected to surface from tests, never from end-user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// An option was built without any names.
    #[error("option must have at least one name")]
    NoNames,
    /// An option name is not a short (`-x`) or long (`--word`) form.
    #[error("invalid option name {0:?}: names must look like '-x' or '--word'")]
    InvalidName(String),
    /// An option was built with both a fixed value and a converter, or with
    /// neither.
    #[error("option must have a value or a converter, not both or neither")]
    ValueOrConverter,
    /// A metavar was supplied for an option without a converter.
    #[error("'metavar' is meaningless for options without a converter")]
    MetavarWithoutConverter,
    /// Name filtering left an option with no visible names.
    #[error("at least one option string must be supplied")]
    NoVisibleNames,
    /// A handler-kind option was attached to an attribute.
    #[error("handler option {names} cannot be bound to attribute {attribute}")]
    HandlerBoundToAttribute {
        /// The option's declared names, joined by `/`.
        names: String,
        /// The attribute the declaration tried to bind.
        attribute: String,
    },
    /// A non-handler option was bound to a handler function.
    #[error("option {names} is not handler-kind and cannot be bound to handler {handler}")]
    NotHandlerKind {
        /// The option's declared names, joined by `/`.
        names: String,
        /// The handler the declaration tried to bind.
        handler: String,
    },
}

/// Errors raised while parsing a command line.
///
/// Carries the human-readable message shown to end users; callers typically
/// print it together with the rendered help text.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The command line contains an option no declaration covers.
    #[error("no such option: {0}")]
    NoSuchOption(String),
    /// A non-repeatable option occurred more than once.
    #[error("{0} can only be used once")]
    Repeated(String),
    /// A typed option's argument failed format conversion.
    #[error("{names}: '{value}' is not a valid {metavar}")]
    InvalidValue {
        /// The option's visible names, joined by `/`.
        names: String,
        /// The offending argument string.
        value: String,
        /// The option's metavar.
        metavar: String,
    },
    /// A value-taking option appeared with no argument left to consume.
    #[error("{0} option requires an argument")]
    MissingArgument(String),
    /// A `--name=value` form was used on an option that takes no value.
    #[error("{0} option does not take a value")]
    UnexpectedValue(String),
    /// A dispatch action hit a value-type misuse (e.g. `Append` onto a
    /// non-list field).
    #[error(transparent)]
    Value(#[from] ValueError),
    /// A non-format converter failure, propagated unmodified.
    #[error(transparent)]
    Converter(Box<dyn std::error::Error + Send + Sync>),
    /// A free-form failure raised by an option handler.
    #[error("{0}")]
    Custom(String),
}

/// Either failure class, for entry points that can produce both.
#[derive(Debug, Error)]
pub enum Error {
    /// A declaration-time failure.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    /// A parse-time failure.
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}
