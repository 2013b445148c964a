//! A terminal session: one [`Context`] plus the transcript of everything
//! shown on its screen. This is the layer that turns engine failures into
//! the single diagnostic line a user sees.

use crate::interpreter::{
    cancel::CancelToken,
    command::CommandRegistry,
    formatter::{BasicFormatter as ExecFormatter, ValueFormatter},
    output::Output,
    persist::{ContextState, PersistError},
    submit, Context, EngineError, Limits,
};
use crate::parser::formatter::{BasicFormatter as SyntaxFormatter, ParserFormatter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Forwards output to the attached viewer while keeping the transcript in
/// sync with what the viewer shows.
struct Tee<'a, 'v> {
    transcript: &'a mut String,
    viewer: &'a mut (dyn Output + 'v),
}

impl<'a, 'v> Output for Tee<'a, 'v> {
    fn print(&mut self, text: &str) {
        self.transcript.push_str(text);
        self.viewer.print(text);
    }

    fn clear(&mut self) {
        self.transcript.clear();
        self.viewer.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub context: ContextState,
    pub transcript: String,
}

impl SessionState {
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug)]
pub struct Session {
    context: Context,
    transcript: String,
    echo: bool,
}

impl Session {
    pub fn new(commands: Arc<CommandRegistry>) -> Self {
        Self {
            context: Context::new(commands),
            transcript: String::new(),
            echo: true,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.context = self.context.with_limits(limits);
        self
    }

    /// Whether submitted input is echoed as `>input` before it runs.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.context.cancel_token()
    }

    /// Runs one line of user input. Failures are reported on the terminal as
    /// a single line and also returned to the caller; the session stays
    /// usable either way. Blank input is ignored.
    pub fn on_input(&mut self, input: &str, viewer: &mut dyn Output) -> Result<(), EngineError> {
        if input.trim().is_empty() {
            return Ok(());
        }

        let mut output = Tee {
            transcript: &mut self.transcript,
            viewer,
        };
        if self.echo {
            output.print(&format!(">{input}\n"));
        }

        let result = submit(input, &mut self.context, &mut output);
        if let Err(ref error) = result {
            let line = match error {
                EngineError::Syntax(e) => {
                    format!("Parse Error: {}", SyntaxFormatter::new(input).format_error(e))
                }
                EngineError::Exec(e) => {
                    format!("Error: {}", ExecFormatter::new(input).format_error(e))
                }
            };
            debug!(%error, "submission failed");
            output.print(&line);
            output.print("\n");
        }
        result
    }

    /// Replays the transcript to a newly attached viewer.
    pub fn attach(&self, viewer: &mut dyn Output) {
        viewer.clear();
        viewer.print(&self.transcript);
    }

    pub fn snapshot(&self) -> SessionState {
        SessionState {
            context: self.context.snapshot(),
            transcript: self.transcript.clone(),
        }
    }

    pub fn restore(
        state: SessionState,
        commands: Arc<CommandRegistry>,
        limits: Limits,
    ) -> Result<Self, PersistError> {
        let context = Context::restore(state.context, commands)?.with_limits(limits);
        info!(
            transcript = state.transcript.len(),
            "restored terminal session"
        );
        Ok(Self {
            context,
            transcript: state.transcript,
            echo: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::output::BufferedOutput;

    fn session() -> Session {
        Session::new(Arc::new(CommandRegistry::with_builtins()))
    }

    #[test]
    fn echoes_input_and_output() {
        let mut session = session();
        let mut viewer = BufferedOutput::new();
        session.on_input("1 2 + println", &mut viewer).unwrap();
        assert_eq!(session.transcript(), ">1 2 + println\n3\n");
        assert_eq!(viewer.data(), session.transcript());
    }

    #[test]
    fn errors_become_one_line() {
        let mut session = session();
        let mut viewer = BufferedOutput::new();
        assert!(session.on_input("frobnicate", &mut viewer).is_err());
        assert!(session.on_input("if", &mut viewer).is_err());
        assert_eq!(
            viewer.data(),
            ">frobnicate\nError: [1:1] Unknown command: frobnicate\n\
             >if\nParse Error: [1:3] Unexpected end of input, expected `then`.\n"
        );
    }

    #[test]
    fn errors_in_earlier_functions_point_at_the_call() {
        let mut session = session();
        let mut viewer = BufferedOutput::new();
        session
            .on_input("fun f 1 2 3 4 5 6 frob end", &mut viewer)
            .unwrap();
        assert!(session.on_input("!f", &mut viewer).is_err());
        assert!(session.on_input("clear_stack fun g frob end !g", &mut viewer).is_err());
        assert_eq!(
            session.transcript(),
            ">fun f 1 2 3 4 5 6 frob end
             >!f
Error: [1:1] Unknown command: frob
             >clear_stack fun g frob end !g
Error: [1:19] Unknown command: frob
"
        );
    }

    #[test]
    fn clear_resets_transcript() {
        let mut session = session();
        let mut viewer = BufferedOutput::new();
        session.on_input("\"hi\" println", &mut viewer).unwrap();
        session.on_input("clear", &mut viewer).unwrap();
        assert_eq!(session.transcript(), "");
        assert_eq!(viewer.clear_count(), 1);
    }
}
