use super::{builtins, output::Output, Context};
use crate::value::error::ExecErrorKind;
use compact_str::CompactString;
use std::{collections::HashMap, sync::Arc};

/// A named builtin operation that scripts invoke by writing its name.
pub trait Command: std::fmt::Debug + Send + Sync {
    fn get_name(&self) -> &str;
    fn execute(&self, context: &mut Context, output: &mut dyn Output)
        -> Result<(), ExecErrorKind>;
}

pub type CommandFn = fn(&mut Context, &mut dyn Output) -> Result<(), ExecErrorKind>;

/// A command backed by a plain function.
#[derive(Debug, Clone, Copy)]
pub struct NativeCommand {
    name: &'static str,
    run: CommandFn,
}

impl NativeCommand {
    pub const fn new(name: &'static str, run: CommandFn) -> Self {
        Self { name, run }
    }
}

impl Command for NativeCommand {
    fn get_name(&self) -> &str {
        self.name
    }

    fn execute(
        &self,
        context: &mut Context,
        output: &mut dyn Output,
    ) -> Result<(), ExecErrorKind> {
        (self.run)(context, output)
    }
}

/// Host owned table of commands. Never persisted: hosts rebuild it whenever
/// they restore a context.
#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: HashMap<CompactString, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for command in builtins::BUILTINS {
            registry.register(*command);
        }
        registry
    }

    /// Adds `command`, returning the command it replaced if the name was
    /// already taken.
    pub fn register(&mut self, command: impl Command + 'static) -> Option<Arc<dyn Command>> {
        let name = CompactString::from(command.get_name());
        self.commands.insert(name, Arc::new(command))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(|name| name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
