//! Prints a configurable greeting.
//!
//! Exercises the optable declaration surface: `Set` and `Add` options,
//! grouped help, and handlers that short-circuit parsing.

use std::process::ExitCode;

use optable::{
    Accessor, Converter, DeclarationError, Declarations, Error, Group, Opt, Parseable,
    ParserConfig, get_help, parse_with, schema_of,
};

struct Greet {
    greeting: String,
    times: i64,
    shout: bool,
    show_help: bool,
    show_schema: bool,
}

impl Default for Greet {
    fn default() -> Self {
        Greet {
            greeting: "Hello".to_string(),
            times: 1,
            shout: false,
            show_help: false,
            show_schema: false,
        }
    }
}

impl Parseable for Greet {
    fn declare(d: &mut Declarations<Self>) -> Result<(), DeclarationError> {
        let formatting = Group::new("Formatting").sort_key(10);

        d.attribute(
            "greeting",
            Accessor::new(|g: &Greet| g.greeting.clone(), |g, v| g.greeting = v),
            [Opt::set(["-g", "--greeting"])
                .converter(Converter::str())
                .metavar("TEXT")
                .help("Greeting word to use")
                .group(&formatting)
                .build()?],
        )?;
        d.attribute(
            "shout",
            Accessor::new(|g: &Greet| g.shout, |g, v| g.shout = v),
            [Opt::set(["-S", "--shout"])
                .value(true)
                .help("Uppercase the whole line")
                .group(&formatting)
                .build()?],
        )?;
        d.attribute(
            "times",
            Accessor::new(|g: &Greet| g.times, |g, v| g.times = v),
            [Opt::add(["-a", "--again"])
                .value(1)
                .help("Greet one more time (repeatable)")
                .build()?],
        )?;
        d.handler(
            "help",
            Opt::handler(["-h", "--help"]).value(true).help("Show this help").build()?,
            |greet, invocation| {
                greet.show_help = true;
                invocation.rest().clear();
                Ok(())
            },
        )?;
        d.handler(
            "schema",
            Opt::handler(["--schema"])
                .value(true)
                .help("Dump the option schema as JSON")
                .build()?,
            |greet, invocation| {
                greet.show_schema = true;
                invocation.rest().clear();
                Ok(())
            },
        )
    }
}

fn config() -> ParserConfig {
    ParserConfig::new()
        .prog("greet")
        .usage("%prog [options] [NAME]")
        .description("Print a configurable greeting.")
}

fn main() -> ExitCode {
    let mut greet = Greet::default();
    let rest = match parse_with(&mut greet, std::env::args().skip(1), config()) {
        Ok(rest) => rest,
        Err(Error::Invocation(err)) => {
            eprintln!("greet: {err}");
            if let Ok(help) = get_help::<Greet>(config()) {
                eprintln!("\n{help}");
            }
            return ExitCode::from(2);
        }
        Err(Error::Declaration(err)) => {
            eprintln!("greet: internal error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if greet.show_help {
        match get_help::<Greet>(config()) {
            Ok(help) => println!("{help}"),
            Err(err) => {
                eprintln!("greet: internal error: {err}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }
    if greet.show_schema {
        let json = schema_of::<Greet>()
            .map_err(|err| err.to_string())
            .and_then(|schema| schema.to_json_pretty().map_err(|err| err.to_string()));
        match json {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("greet: internal error: {err}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let name = rest.first().map(String::as_str).unwrap_or("world");
    for _ in 0..greet.times.max(0) {
        let line = format!("{}, {}!", greet.greeting, name);
        if greet.shout {
            println!("{}", line.to_uppercase());
        } else {
            println!("{line}");
        }
    }
    ExitCode::SUCCESS
}
