//! Front-end driver: lex a JS/HTML/CSS file and dump its token stream.
//!
//! One line per token, `KIND [text]: position`, in the positions' debug
//! rendering, plus any non-fatal messages on stderr. Exit status 2 means
//! the input failed to lex.

use std::cell::RefCell;
use std::fs::File;
use std::process::ExitCode;
use std::rc::Rc;

use sieve_diagnostic::{ParseResult, SimpleMessageQueue};
use sieve_lexer::css::CssLexer;
use sieve_lexer::html::HtmlLexer;
use sieve_lexer::js::JsLexer;
use sieve_lexer_core::{BufferedCharProducer, CharProducer, TokenStream};
use sieve_position::{FilePosition, InputSource};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Language {
    Js,
    Html,
    Css,
}

impl Language {
    fn from_name(name: &str) -> Option<Language> {
        match name {
            "js" | "javascript" => Some(Language::Js),
            "html" | "htm" => Some(Language::Html),
            "css" => Some(Language::Css),
            _ => None,
        }
    }

    fn from_path(path: &str) -> Option<Language> {
        let ext = path.rsplit('.').next()?;
        Self::from_name(&ext.to_ascii_lowercase())
    }
}

struct Options {
    language: Language,
    path: String,
    quasiliteral: bool,
    as_xml: bool,
    substitutions: bool,
}

const USAGE: &str = "usage: sievec lex [--lang js|html|css] [--quasi] [--xml] \
                     [--substitutions] FILE";

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut args = args.iter();
    match args.next().map(String::as_str) {
        Some("lex") => {}
        _ => return Err(USAGE.to_owned()),
    }

    let mut language = None;
    let mut path = None;
    let mut quasiliteral = false;
    let mut as_xml = false;
    let mut substitutions = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--lang" => {
                let name = args.next().ok_or("--lang needs a value")?;
                language =
                    Some(Language::from_name(name).ok_or_else(|| {
                        format!("unknown language {name:?}")
                    })?);
            }
            "--quasi" => quasiliteral = true,
            "--xml" => as_xml = true,
            "--substitutions" => substitutions = true,
            _ if arg.starts_with("--") => return Err(format!("unknown flag {arg}")),
            _ if path.is_none() => path = Some(arg.clone()),
            _ => return Err(USAGE.to_owned()),
        }
    }

    let path = path.ok_or_else(|| USAGE.to_owned())?;
    let language = match language.or_else(|| Language::from_path(&path)) {
        Some(l) => l,
        None => return Err(format!("cannot infer a language for {path}; pass --lang")),
    };
    Ok(Options {
        language,
        path,
        quasiliteral,
        as_xml,
        substitutions,
    })
}

fn dump<T: std::fmt::Debug>(mut stream: impl TokenStream<T>) -> ParseResult<()> {
    while let Some(token) = stream.next()? {
        println!("{token}");
    }
    Ok(())
}

fn run(opts: &Options) -> Result<(), String> {
    let source = InputSource::new(opts.path.clone());
    let file = File::open(&opts.path).map_err(|e| format!("{}: {e}", opts.path))?;
    let pos = FilePosition::start_of_file(source);
    let producer =
        BufferedCharProducer::from_reader(file, &pos).map_err(|e| e.to_string())?;
    debug!(path = %opts.path, lang = ?opts.language, chars = producer.limit(), "lexing");

    let result = match opts.language {
        Language::Js => dump(JsLexer::with_options(
            Box::new(producer),
            opts.quasiliteral,
        )),
        Language::Html => dump(HtmlLexer::with_options(Box::new(producer), opts.as_xml)),
        Language::Css => {
            let messages = Rc::new(RefCell::new(SimpleMessageQueue::new()));
            let lexer = CssLexer::with_options(
                Box::new(producer),
                opts.substitutions,
                Box::new(Rc::clone(&messages)),
            );
            let result = dump(lexer);
            for message in messages.borrow().messages() {
                eprintln!("{message}");
            }
            result
        }
    };
    result.map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Ok(opts) => opts,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(1);
        }
    };
    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
    }
}
