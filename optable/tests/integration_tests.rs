//! End-to-end parsing behavior across an inheriting type pair.

use optable::{
    Accessor, ConvertError, Converter, DeclarationError, Declarations, Error, InvocationError,
    Opt, Parseable, ParserConfig, Value, get_help, make_parser, parse, parse_with,
};

#[derive(Default)]
struct Foo {
    verbose: bool,
}

impl Parseable for Foo {
    fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
        d.attribute(
            "verbose",
            Accessor::new(|f: &Foo| f.verbose, |f, v| f.verbose = v),
            [
                Opt::set(["-v", "--verbose"]).value(true).help("Print more").build()?,
                Opt::set(["-q", "--quiet"]).value(false).help("Print less").build()?,
            ],
        )
    }
}

#[derive(Default)]
struct Bar {
    foo: Foo,
    libs: Vec<String>,
    debug: i64,
    zapped: Option<i64>,
}

impl Parseable for Bar {
    fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
        d.inherit(|b: &Bar| &b.foo, |b: &mut Bar| &mut b.foo)?;
        d.attribute(
            "libs",
            Accessor::new(|b: &Bar| b.libs.clone(), |b, v| b.libs = v),
            [Opt::append(["-L"])
                .converter(Converter::str())
                .sort_key(99)
                .help("Add a library")
                .build()?],
        )?;
        d.attribute(
            "debug",
            Accessor::new(|b: &Bar| b.debug, |b, v| b.debug = v),
            [Opt::add(["-d"]).converter(Converter::int()).help("Raise debug level").build()?],
        )?;
        d.handler(
            "zapify",
            Opt::handler(["-z"]).converter(Converter::int()).help("Zapify!").build()?,
            |bar, invocation| {
                match invocation.value() {
                    Value::Int(level) => bar.zapped = Some(*level),
                    other => {
                        return Err(InvocationError::Custom(format!(
                            "unexpected zap value: {other}"
                        )));
                    }
                }
                Ok(())
            },
        )
    }
}

fn invocation_message(err: Error) -> String {
    match err {
        Error::Invocation(inner) => inner.to_string(),
        Error::Declaration(inner) => panic!("expected invocation error, got: {inner}"),
    }
}

#[test]
fn empty_argv_leaves_target_untouched() {
    let mut foo = Foo::default();
    let rest = parse(&mut foo, Vec::<String>::new()).unwrap();
    assert!(rest.is_empty());
    assert!(!foo.verbose);
}

#[test]
fn option_before_positional_is_applied() {
    let mut foo = Foo::default();
    let rest = parse(&mut foo, ["-v", "q"]).unwrap();
    assert_eq!(rest, vec!["q"]);
    assert!(foo.verbose);
}

#[test]
fn parsing_stops_at_first_positional_by_default() {
    let mut foo = Foo::default();
    let rest = parse(&mut foo, ["xyz", "-v"]).unwrap();
    assert_eq!(rest, vec!["xyz", "-v"]);
    assert!(!foo.verbose);
}

#[test]
fn interspersed_mode_recognizes_trailing_options() {
    let mut foo = Foo::default();
    let config = ParserConfig::new().allow_interspersed(true);
    let rest = parse_with(&mut foo, ["xyz", "-v"], config).unwrap();
    assert_eq!(rest, vec!["xyz"]);
    assert!(foo.verbose);
}

#[test]
fn non_repeatable_option_rejects_second_occurrence() {
    let mut foo = Foo::default();
    let err = parse(&mut foo, ["-v", "-q", "-v"]).unwrap_err();
    let message = invocation_message(err);
    assert!(message.contains("-v/--verbose"), "{message}");
    assert!(message.contains("only be used once"), "{message}");
}

#[test]
fn quiet_overwrites_verbose() {
    let mut foo = Foo::default();
    parse(&mut foo, ["-v", "-q"]).unwrap();
    assert!(!foo.verbose);
}

#[test]
fn append_collects_values_in_command_line_order() {
    let mut bar = Bar::default();
    let rest = parse(&mut bar, ["-Labc", "-L", "xyz", "123"]).unwrap();
    assert_eq!(rest, vec!["123"]);
    assert_eq!(bar.libs, vec!["abc", "xyz"]);
}

#[test]
fn add_accumulates_numerically() {
    let mut bar = Bar::default();
    let rest = parse(&mut bar, ["-d23", "-d", "32", "321"]).unwrap();
    assert_eq!(rest, vec!["321"]);
    assert_eq!(bar.debug, 55);
}

#[test]
fn invalid_typed_argument_names_option_and_metavar() {
    let mut bar = Bar::default();
    let err = parse(&mut bar, ["-z", "foobly"]).unwrap_err();
    assert_eq!(invocation_message(err), "-z: 'foobly' is not a valid INT");
}

#[test]
fn handler_runs_and_inherited_options_still_apply() {
    let mut bar = Bar::default();
    let rest = parse(&mut bar, ["-z", "20", "-v", "xyz"]).unwrap();
    assert_eq!(rest, vec!["xyz"]);
    assert_eq!(bar.zapped, Some(20));
    assert!(bar.foo.verbose);
}

#[test]
fn unknown_option_is_an_invocation_error() {
    let mut bar = Bar::default();
    let err = parse(&mut bar, ["--nonsense"]).unwrap_err();
    assert_eq!(invocation_message(err), "no such option: --nonsense");
}

#[test]
fn handler_can_short_circuit_remaining_arguments() {
    #[derive(Default)]
    struct Halting {
        verbose: bool,
        halted: bool,
    }

    impl Parseable for Halting {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            d.attribute(
                "verbose",
                Accessor::new(|h: &Halting| h.verbose, |h, v| h.verbose = v),
                [Opt::set(["-v"]).value(true).build()?],
            )?;
            d.handler(
                "halt",
                Opt::handler(["--halt"]).value(true).build()?,
                |target, invocation| {
                    target.halted = true;
                    invocation.rest().clear();
                    Ok(())
                },
            )
        }
    }

    let mut halting = Halting::default();
    let rest = parse(&mut halting, ["--halt", "-v", "x"]).unwrap();
    assert!(rest.is_empty());
    assert!(halting.halted);
    assert!(!halting.verbose, "arguments after the handler must be dropped");
}

#[test]
fn handler_can_enable_interspersed_mid_parse() {
    #[derive(Default)]
    struct Loosening {
        verbose: bool,
    }

    impl Parseable for Loosening {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            d.attribute(
                "verbose",
                Accessor::new(|l: &Loosening| l.verbose, |l, v| l.verbose = v),
                [Opt::set(["-v"]).value(true).build()?],
            )?;
            d.handler(
                "loosen",
                Opt::handler(["--loosen"]).value(true).build()?,
                |_, invocation| {
                    invocation.set_interspersed(true);
                    Ok(())
                },
            )
        }
    }

    let mut loosening = Loosening::default();
    let rest = parse(&mut loosening, ["--loosen", "xyz", "-v"]).unwrap();
    assert_eq!(rest, vec!["xyz"]);
    assert!(loosening.verbose);
}

#[test]
fn converter_failures_other_than_format_propagate_unwrapped() {
    #[derive(Default)]
    struct Ported {
        port: i64,
    }

    impl Parseable for Ported {
        fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
            let port = Converter::new("port", |raw| {
                let port: i64 = raw.parse().map_err(|_| ConvertError::Invalid)?;
                if port > 65535 {
                    return Err(ConvertError::Other("port out of range".into()));
                }
                Ok(Value::Int(port))
            });
            d.attribute(
                "port",
                Accessor::new(|p: &Ported| p.port, |p, v| p.port = v),
                [Opt::set(["--port"]).converter(port).build()?],
            )
        }
    }

    let mut ported = Ported::default();
    let err = parse(&mut ported, ["--port", "70000"]).unwrap_err();
    match err {
        Error::Invocation(InvocationError::Converter(source)) => {
            assert_eq!(source.to_string(), "port out of range");
        }
        other => panic!("expected converter error, got: {other}"),
    }

    let err = parse(&mut ported, ["--port", "nope"]).unwrap_err();
    assert_eq!(
        invocation_message(err),
        "--port: 'nope' is not a valid PORT"
    );
}

#[test]
fn help_lists_inherited_and_local_options() {
    let parser = make_parser::<Bar>(ParserConfig::new()).unwrap();
    let help = parser.help();
    for needle in ["-v, --verbose", "-q, --quiet", "-d INT", "-z INT", "-L STR"] {
        assert!(help.contains(needle), "missing {needle:?} in:\n{help}");
    }
    // Sort key 99 pushes -L after the defaults.
    assert!(help.find("-d INT").unwrap() < help.find("-L STR").unwrap());

    let same = get_help::<Bar>(ParserConfig::new()).unwrap();
    assert_eq!(help, same);
}

#[test]
fn help_orders_equal_sort_keys_by_declaration() {
    // verbose and quiet share the default sort key; verbose is declared first.
    let help = get_help::<Foo>(ParserConfig::new()).unwrap();
    let verbose = help.find("-v, --verbose").unwrap();
    let quiet = help.find("-q, --quiet").unwrap();
    assert!(verbose < quiet, "{help}");
}
