//! Per-type option registries: declarations, inheritance resolution, and the
//! guarded type-keyed cache.
//!
//! A type opts in by implementing [`Parseable`] and filling a
//! [`Declarations`] table: field bindings via [`Accessor`], handler bindings,
//! explicit base declarations in order, and rejection directives. The first
//! call to [`registry_of`] for a type resolves the table into a frozen
//! [`Registry`] and caches it under the type's `TypeId`; every later call
//! observes the same registry.
//!
//! # Examples
//!
//! ```
//! use optable::{Accessor, Declarations, DeclarationError, Opt, Parseable, registry_of};
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
//!             [Opt::set(["-v", "--verbose"]).value(true).build()?],
//!         )
//!     }
//! }
//!
//! let registry = registry_of::<App>().unwrap();
//! assert!(registry.contains("-v"));
//! assert!(registry.contains("--verbose"));
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, Mutex};

use tracing::debug;

use crate::error::{DeclarationError, InvocationError};
use crate::opt::{Opt, OptionKind};
use crate::parser::Invocation;
use crate::value::{FieldValue, Value, ValueError};

/// A get/set pair binding one field of the target type.
///
/// The closures translate between the field's concrete type and the dynamic
/// [`Value`] carried through dispatch; see
/// [`FieldValue`](crate::FieldValue) for the supported field types.
pub struct Accessor<T: ?Sized> {
    get: Arc<dyn Fn(&T) -> Value + Send + Sync>,
    set: Arc<dyn Fn(&mut T, Value) -> Result<(), ValueError> + Send + Sync>,
}

impl<T: ?Sized> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        Accessor {
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<T: 'static> Accessor<T> {
    /// Binds a field through a getter and a setter closure.
    ///
    /// The getter clones the current field value out (needed by `Add` and
    /// `Append` dispatch); the setter writes the resolved value back.
    pub fn new<V, G, S>(get: G, set: S) -> Self
    where
        V: FieldValue,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Accessor {
            get: Arc::new(move |target: &T| get(target).into_value()),
            set: Arc::new(move |target: &mut T, value| {
                set(target, V::from_value(value)?);
                Ok(())
            }),
        }
    }

    pub(crate) fn get(&self, target: &T) -> Value {
        (*self.get)(target)
    }

    pub(crate) fn set(&self, target: &mut T, value: Value) -> Result<(), ValueError> {
        (*self.set)(target, value)
    }

    /// Re-binds this accessor through a projection onto an embedding type.
    fn project<U: 'static>(&self, by_ref: fn(&U) -> &T, by_mut: fn(&mut U) -> &mut T) -> Accessor<U> {
        let get = self.get.clone();
        let set = self.set.clone();
        Accessor {
            get: Arc::new(move |outer: &U| (*get)(by_ref(outer))),
            set: Arc::new(move |outer: &mut U, value| (*set)(by_mut(outer), value)),
        }
    }
}

/// A bound handler function for `Handler`-kind options.
///
/// Receives the target and the in-progress [`Invocation`]: the option name as
/// typed, the resolved value, the mutable remaining-argument deque, and
/// parser-level settings. Handlers may mutate the deque in place to influence
/// subsequent tokenization.
pub type HandlerFn<T> =
    Arc<dyn Fn(&mut T, &mut Invocation<'_>) -> Result<(), InvocationError> + Send + Sync>;

/// The dispatch action bound to a registry entry.
///
/// Kind/target mismatches are rejected at declaration time, so the dispatcher
/// never sees an impossible pairing.
pub(crate) enum Action<T> {
    Set(Accessor<T>),
    Add(Accessor<T>),
    Append(Accessor<T>),
    Handle(HandlerFn<T>),
}

impl<T> Clone for Action<T> {
    fn clone(&self) -> Self {
        match self {
            Action::Set(a) => Action::Set(a.clone()),
            Action::Add(a) => Action::Add(a.clone()),
            Action::Append(a) => Action::Append(a.clone()),
            Action::Handle(f) => Action::Handle(f.clone()),
        }
    }
}

/// One resolved registry entry: the bound action plus the option that
/// declared it, under the attribute or handler name it was declared for.
pub(crate) struct Entry<T> {
    pub binding: String,
    pub action: Action<T>,
    pub opt: Opt,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Entry {
            binding: self.binding.clone(),
            action: self.action.clone(),
            opt: self.opt.clone(),
        }
    }
}

impl<T: 'static> Entry<T> {
    fn project<U: 'static>(&self, by_ref: fn(&U) -> &T, by_mut: fn(&mut U) -> &mut T) -> Entry<U> {
        let action = match &self.action {
            Action::Set(a) => Action::Set(a.project(by_ref, by_mut)),
            Action::Add(a) => Action::Add(a.project(by_ref, by_mut)),
            Action::Append(a) => Action::Append(a.project(by_ref, by_mut)),
            Action::Handle(f) => {
                let f = f.clone();
                Action::Handle(Arc::new(move |outer: &mut U, invocation: &mut Invocation<'_>| {
                    (*f)(by_mut(outer), invocation)
                }) as HandlerFn<U>)
            }
        };
        Entry {
            binding: self.binding.clone(),
            action,
            opt: self.opt.clone(),
        }
    }
}

/// A type whose options can be declared, resolved, and parsed.
pub trait Parseable: Sized + 'static {
    /// Fills the type's declaration table.
    ///
    /// Called once per process for this type, on first use; the resolved
    /// registry is cached afterwards.
    fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError>;
}

/// The declaration table a type fills inside [`Parseable::declare`].
///
/// Resolution order is fixed regardless of the order methods are called:
/// inherited entries merge first (in [`inherit`](Declarations::inherit) call
/// order, later bases overriding earlier on name collision), rejection
/// directives are applied to the inherited portion, then local declarations
/// override whatever survived.
pub struct Declarations<T> {
    inherited: HashMap<String, Entry<T>>,
    rejected: HashSet<String>,
    reject_all: bool,
    local: Vec<(String, Entry<T>)>,
}

impl<T: 'static> Declarations<T> {
    pub(crate) fn new() -> Self {
        Declarations {
            inherited: HashMap::new(),
            rejected: HashSet::new(),
            reject_all: false,
            local: Vec::new(),
        }
    }

    /// Declares a direct base whose options this type inherits.
    ///
    /// The base's resolved registry is re-bound through the given projection
    /// onto the embedded base value. Bases merge in the order `inherit` is
    /// called; a later base overrides an earlier one on name collision.
    pub fn inherit<B: Parseable>(
        &mut self,
        by_ref: fn(&T) -> &B,
        by_mut: fn(&mut T) -> &mut B,
    ) -> Result<(), DeclarationError> {
        let base = registry_of::<B>()?;
        for (name, entry) in &base.entries {
            self.inherited
                .insert(name.clone(), entry.project(by_ref, by_mut));
        }
        Ok(())
    }

    /// Rejects inheritance of the named options.
    ///
    /// Every name variation to exclude must be listed; rejecting `-v` does
    /// not also reject `--verbose`.
    pub fn reject<I>(&mut self, names: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.rejected.extend(names.into_iter().map(Into::into));
    }

    /// Rejects all inherited options, keeping only local declarations.
    pub fn reject_all(&mut self) {
        self.reject_all = true;
    }

    /// Attaches one or more options to a named attribute.
    ///
    /// Each option contributes one registry entry per declared name. The
    /// option's kind selects the dispatch action; `Handler`-kind options
    /// cannot be attached to attributes.
    pub fn attribute<I>(
        &mut self,
        name: &str,
        accessor: Accessor<T>,
        opts: I,
    ) -> Result<(), DeclarationError>
    where
        I: IntoIterator<Item = Opt>,
    {
        for opt in opts {
            let action = match opt.kind() {
                OptionKind::Set => Action::Set(accessor.clone()),
                OptionKind::Add => Action::Add(accessor.clone()),
                OptionKind::Append => Action::Append(accessor.clone()),
                OptionKind::Handler => {
                    return Err(DeclarationError::HandlerBoundToAttribute {
                        names: opt.label(),
                        attribute: name.to_string(),
                    });
                }
            };
            self.push_local(name, action, opt);
        }
        Ok(())
    }

    /// Binds a `Handler`-kind option to a named handler function.
    pub fn handler<F>(&mut self, name: &str, opt: Opt, handler: F) -> Result<(), DeclarationError>
    where
        F: Fn(&mut T, &mut Invocation<'_>) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        if opt.kind() != OptionKind::Handler {
            return Err(DeclarationError::NotHandlerKind {
                names: opt.label(),
                handler: name.to_string(),
            });
        }
        let handler: HandlerFn<T> = Arc::new(handler);
        self.push_local(name, Action::Handle(handler), opt);
        Ok(())
    }

    fn push_local(&mut self, binding: &str, action: Action<T>, opt: Opt) {
        for opt_name in opt.names().to_vec() {
            self.local.push((
                opt_name,
                Entry {
                    binding: binding.to_string(),
                    action: action.clone(),
                    opt: opt.clone(),
                },
            ));
        }
    }

    fn resolve(self) -> Registry<T> {
        let mut entries = if self.reject_all {
            HashMap::new()
        } else {
            let mut inherited = self.inherited;
            for name in &self.rejected {
                inherited.remove(name);
            }
            inherited
        };
        let inherited_count = entries.len();
        let local_count = self.local.len();
        for (name, entry) in self.local {
            entries.insert(name, entry);
        }
        debug!(
            target_type = type_name::<T>(),
            inherited = inherited_count,
            local = local_count,
            total = entries.len(),
            "Resolved option registry"
        );
        Registry { entries }
    }
}

/// A frozen per-type table mapping option names to their bound entries.
pub struct Registry<T> {
    entries: HashMap<String, Entry<T>>,
}

impl<T: 'static> Registry<T> {
    /// Whether `name` is recognized by this registry.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered option names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the registered option names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn entries(&self) -> &HashMap<String, Entry<T>> {
        &self.entries
    }
}

static REGISTRIES: LazyLock<Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Resolves (or fetches the cached) registry for `T`.
///
/// The first call runs `T::declare` and freezes the result; later calls
/// return the same `Arc`. Concurrent first-time calls may race to build, but
/// the first insertion wins and every caller observes one frozen registry.
pub fn registry_of<T: Parseable>() -> Result<Arc<Registry<T>>, DeclarationError> {
    let key = TypeId::of::<T>();
    {
        let cache = match REGISTRIES.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = cache.get(&key) {
            if let Ok(registry) = existing.clone().downcast::<Registry<T>>() {
                return Ok(registry);
            }
        }
    }

    // Built outside the lock: declarations of bases recurse into this cache.
    let mut declarations = Declarations::new();
    T::declare(&mut declarations)?;
    let built = Arc::new(declarations.resolve());

    let mut cache = match REGISTRIES.lock() {
        Ok(cache) => cache,
        Err(poisoned) => poisoned.into_inner(),
    };
    let stored = cache
        .entry(key)
        .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>);
    Ok(stored.clone().downcast::<Registry<T>>().unwrap_or(built))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Converter;

    #[derive(Default)]
    struct Base {
        verbose: bool,
        output: String,
    }

    impl Parseable for Base {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            d.attribute(
                "verbose",
                Accessor::new(|b: &Base| b.verbose, |b, v| b.verbose = v),
                [Opt::set(["-v", "--verbose"]).value(true).build()?],
            )?;
            d.attribute(
                "output",
                Accessor::new(|b: &Base| b.output.clone(), |b, v| b.output = v),
                [Opt::set(["-o", "--output"]).converter(Converter::str()).build()?],
            )
        }
    }

    #[derive(Default)]
    struct Child {
        base: Base,
        jobs: i64,
    }

    impl Parseable for Child {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            d.inherit(|c: &Child| &c.base, |c: &mut Child| &mut c.base)?;
            d.attribute(
                "jobs",
                Accessor::new(|c: &Child| c.jobs, |c, v| c.jobs = v),
                [Opt::set(["-j"]).converter(Converter::int()).build()?],
            )
        }
    }

    #[derive(Default)]
    struct Orphan {
        base: Base,
        quiet: bool,
    }

    impl Parseable for Orphan {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            d.inherit(|o: &Orphan| &o.base, |o: &mut Orphan| &mut o.base)?;
            d.reject_all();
            d.attribute(
                "quiet",
                Accessor::new(|o: &Orphan| o.quiet, |o, v| o.quiet = v),
                [Opt::set(["-q"]).value(true).build()?],
            )
        }
    }

    #[derive(Default)]
    struct Picky {
        base: Base,
    }

    impl Parseable for Picky {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            d.inherit(|p: &Picky| &p.base, |p: &mut Picky| &mut p.base)?;
            d.reject(["-v"]);
            Ok(())
        }
    }

    #[test]
    fn test_subtype_registry_includes_ancestors_plus_own() {
        let registry = registry_of::<Child>().unwrap();
        for name in ["-v", "--verbose", "-o", "--output", "-j"] {
            assert!(registry.contains(name), "{name}");
        }
        assert_eq!(registry.len(), 5);
        assert!(!registry.is_empty());

        let mut names: Vec<&str> = registry.names().collect();
        names.sort_unstable();
        assert_eq!(names, ["--output", "--verbose", "-j", "-o", "-v"]);
    }

    #[test]
    fn test_reject_all_keeps_only_local_declarations() {
        let registry = registry_of::<Orphan>().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("-q"));
        assert!(!registry.contains("-v"));
    }

    #[test]
    fn test_reject_removes_exactly_the_named_entries() {
        let registry = registry_of::<Picky>().unwrap();
        assert!(!registry.contains("-v"));
        assert!(registry.contains("--verbose"));
        assert!(registry.contains("-o"));
    }

    #[test]
    fn test_registry_is_cached() {
        let first = registry_of::<Child>().unwrap();
        let second = registry_of::<Child>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_local_declaration_overrides_inherited_name() {
        #[derive(Default)]
        struct Override {
            base: Base,
            loud: i64,
        }

        impl Parseable for Override {
            fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
                d.inherit(|o: &Override| &o.base, |o: &mut Override| &mut o.base)?;
                d.attribute(
                    "loud",
                    Accessor::new(|o: &Override| o.loud, |o, v| o.loud = v),
                    [Opt::set(["-v"]).converter(Converter::int()).build()?],
                )
            }
        }

        let registry = registry_of::<Override>().unwrap();
        let entries = registry.entries();
        assert_eq!(entries["-v"].binding, "loud");
        // The sibling name still routes to the inherited option.
        assert_eq!(entries["--verbose"].binding, "verbose");
    }

    #[test]
    fn test_later_base_wins_on_collision() {
        #[derive(Default)]
        struct OtherBase {
            verbose: bool,
        }

        impl Parseable for OtherBase {
            fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
                d.attribute(
                    "other_verbose",
                    Accessor::new(|b: &OtherBase| b.verbose, |b, v| b.verbose = v),
                    [Opt::set(["-v"]).value(true).build()?],
                )
            }
        }

        #[derive(Default)]
        struct Diamond {
            first: Base,
            second: OtherBase,
        }

        impl Parseable for Diamond {
            fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
                d.inherit(|t: &Diamond| &t.first, |t: &mut Diamond| &mut t.first)?;
                d.inherit(|t: &Diamond| &t.second, |t: &mut Diamond| &mut t.second)?;
                Ok(())
            }
        }

        let registry = registry_of::<Diamond>().unwrap();
        assert_eq!(registry.entries()["-v"].binding, "other_verbose");
    }

    #[test]
    fn test_handler_opt_cannot_bind_attribute() {
        let mut d = Declarations::<Base>::new();
        let opt = Opt::handler(["-z"]).converter(Converter::int()).build().unwrap();
        let err = d
            .attribute(
                "verbose",
                Accessor::new(|b: &Base| b.verbose, |b, v| b.verbose = v),
                [opt],
            )
            .unwrap_err();
        assert!(matches!(err, DeclarationError::HandlerBoundToAttribute { .. }));
    }

    #[test]
    fn test_non_handler_opt_cannot_bind_handler() {
        let mut d = Declarations::<Base>::new();
        let opt = Opt::set(["-x"]).value(true).build().unwrap();
        let err = d.handler("x", opt, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, DeclarationError::NotHandlerKind { .. }));
    }
}
