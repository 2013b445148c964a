use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use grpl::interpreter::{
    cancel::CancelToken,
    command::CommandRegistry,
    formatter::{PrettyFormatter as PrettyExecFormatter, ValueFormatter},
    output::StdoutOutput,
    persist::ContextState,
    Context, Limits,
};
use grpl::session::{Session, SessionState};
use std::fs::{read_to_string, write};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{
    mpsc::{self, RecvTimeoutError},
    Arc,
};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(name = "grpl", version)]
pub struct CLArgs {
    #[clap(subcommand)]
    pub routine: GrplCommand,
}

#[derive(Debug, Subcommand)]
pub enum GrplCommand {
    Tokenize {
        path: PathBuf,
        #[clap(long = "format", value_enum, default_value = "basic")]
        format: TokenFormat,
    },
    Parse {
        path: PathBuf,
        #[clap(long = "format", value_enum, default_value = "source")]
        format: StatementFormat,
    },
    Run {
        path: PathBuf,
        #[clap(flatten)]
        engine: EngineArgs,
    },
    Repl {
        #[clap(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Debug, Args)]
pub struct EngineArgs {
    /// Maximum number of nested function calls and blocks.
    #[clap(long, default_value_t = Limits::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
    /// Cancel a submission that is still running after this many milliseconds.
    #[clap(long)]
    pub timeout_ms: Option<u64>,
    /// JSON file the interpreter state is restored from and saved to.
    #[clap(long)]
    pub state: Option<PathBuf>,
}

impl EngineArgs {
    fn limits(&self) -> Limits {
        Limits {
            max_depth: self.max_depth,
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    fn existing_state(&self) -> Option<&Path> {
        self.state.as_deref().filter(|path| path.exists())
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum TokenFormat {
    Debug,
    Basic,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum StatementFormat {
    Debug,
    Source,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match grpl_main() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

fn grpl_main() -> Result<ExitCode> {
    color_eyre::install()?;
    let args = CLArgs::parse();
    match args.routine {
        GrplCommand::Tokenize { path, format } => {
            let src = read_to_string(&path).wrap_err_with(|| format!("Failed to read {path:?}"))?;
            Ok(tokenize(&src, &format))
        }
        GrplCommand::Parse { path, format } => {
            let src = read_to_string(&path).wrap_err_with(|| format!("Failed to read {path:?}"))?;
            Ok(parse(&src, &path.to_string_lossy(), &format))
        }
        GrplCommand::Run { path, engine } => run(&path, &engine),
        GrplCommand::Repl { engine } => repl(&engine),
    }
}

fn tokenize(src: &str, format: &TokenFormat) -> ExitCode {
    use grpl::lexer::formatter::{BasicFormatter, DebugFormatter, ToFormatter, TokenFormatter};
    use grpl::lexer::{Lexer, TokenKind};

    let mut lexer = Lexer::new(src);
    let formatter: Box<dyn TokenFormatter + '_> = match format {
        TokenFormat::Debug => Box::new(ToFormatter::<DebugFormatter>::create_formatter(&lexer)),
        TokenFormat::Basic => Box::new(ToFormatter::<BasicFormatter>::create_formatter(&lexer)),
    };
    let mut succeeded = true;
    loop {
        match lexer.next_token() {
            Ok(token) => {
                println!("{}", formatter.format(&token));
                if matches!(token.kind, TokenKind::Eof) {
                    break;
                }
            }
            // The broken lexeme is consumed, so lexing resumes after it.
            Err(error) => {
                eprintln!("{}", formatter.format_lexical_error(&error));
                succeeded = false;
            }
        }
    }
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(65)
    }
}

fn parse(src: &str, path: &str, format: &StatementFormat) -> ExitCode {
    use grpl::parser::formatter::{DebugFormatter, ParserFormatter, PrettyFormatter};

    let formatter: Box<dyn ParserFormatter + '_> = match format {
        StatementFormat::Debug => Box::new(DebugFormatter),
        StatementFormat::Source => Box::new(PrettyFormatter::new(src, path)),
    };
    match grpl::parser::parse(src) {
        Ok(statements) => {
            println!("{}", formatter.format(&statements));
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{}", formatter.format_error(&error));
            ExitCode::from(65)
        }
    }
}

/// Runs `work`, cancelling `token` if it takes longer than `timeout`.
fn with_watchdog<T>(token: CancelToken, timeout: Option<Duration>, work: impl FnOnce() -> T) -> T {
    token.reset();
    let Some(timeout) = timeout else {
        return work();
    };

    let (done, finished) = mpsc::channel::<()>();
    let watchdog = std::thread::spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = finished.recv_timeout(timeout) {
            warn!(?timeout, "submission timed out, cancelling");
            token.cancel();
        }
    });
    let result = work();
    let _ = done.send(());
    let _ = watchdog.join();
    result
}

fn run(path: &Path, engine: &EngineArgs) -> Result<ExitCode> {
    use grpl::parser::formatter::{ParserFormatter, PrettyFormatter};

    let src = read_to_string(path).wrap_err_with(|| format!("Failed to read {path:?}"))?;
    let path_name = path.to_string_lossy();
    let commands = Arc::new(CommandRegistry::with_builtins());

    let context = match engine.existing_state() {
        Some(state_path) => {
            let state = ContextState::from_json(&read_to_string(state_path)?)?;
            Context::restore(state, commands)?
        }
        None => Context::new(commands),
    };
    let mut context = context.with_limits(engine.limits());

    let statements = match grpl::parser::parse(&src) {
        Ok(statements) => statements,
        Err(error) => {
            eprintln!(
                "{}",
                PrettyFormatter::new(&src, &path_name).format_error(&error)
            );
            return Ok(ExitCode::from(65));
        }
    };

    let result = with_watchdog(context.cancel_token(), engine.timeout(), || {
        context.exec(&statements, &mut StdoutOutput)
    });

    if let Some(state_path) = &engine.state {
        write(state_path, context.snapshot().to_json()?)
            .wrap_err_with(|| format!("Failed to save state to {state_path:?}"))?;
    }

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            eprintln!(
                "{}",
                PrettyExecFormatter::new(&src, &path_name).format_error(&error)
            );
            Ok(ExitCode::from(70))
        }
    }
}

fn repl(engine: &EngineArgs) -> Result<ExitCode> {
    let commands = Arc::new(CommandRegistry::with_builtins());
    let mut viewer = StdoutOutput;

    let mut session = match engine.existing_state() {
        Some(state_path) => {
            let state = SessionState::from_json(&read_to_string(state_path)?)?;
            let session = Session::restore(state, commands, engine.limits())?;
            session.attach(&mut viewer);
            session
        }
        None => Session::new(commands).with_limits(engine.limits()),
    }
    .with_echo(false);

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim_end_matches(['\n', '\r']);
        // Failures are already shown on the terminal by the session.
        let _ = with_watchdog(session.cancel_token(), engine.timeout(), || {
            session.on_input(input, &mut viewer)
        });
    }

    if let Some(state_path) = &engine.state {
        write(state_path, session.snapshot().to_json()?)
            .wrap_err_with(|| format!("Failed to save state to {state_path:?}"))?;
        info!(?state_path, "saved session");
    }
    Ok(ExitCode::SUCCESS)
}
