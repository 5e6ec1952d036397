use std::{env, fs, process};

use mypl_core::{Error, Interpreter, Parser, TypeChecker, error_reporter::report, tokenize};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    // only when RUST_LOG is set; stderr keeps program output clean
    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--check] <file_path>", program);
    process::exit(1);
}

fn run(source: &str, check: bool) -> Result<(), Error> {
    let tokens = tokenize(source)?;
    let program = Parser::new(&tokens).parse()?;

    if check {
        TypeChecker::new().check(&program)?;
    }

    Interpreter::stdio().run(&program)
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("mypl");

    let (check, file_path) = match args.get(1..).unwrap_or(&[]) {
        [file] if file != "--check" => (false, file),
        [flag, file] if flag == "--check" => (true, file),
        _ => usage(program),
    };

    let source = match fs::read_to_string(file_path) {
        Ok(content) => content,
        Err(error) => {
            eprintln!("Error reading file '{}': {}", file_path, error);
            process::exit(1);
        }
    };

    if let Err(error) = run(&source, check) {
        report(file_path, &error, &source);
        process::exit(1);
    }
}
