use std::io::Write;

/// The only way the engine produces user visible text. Hosts decide where
/// it ends up.
pub trait Output {
    fn print(&mut self, text: &str);
    fn clear(&mut self);
}

pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn print(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout leaves nothing to report to.
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn clear(&mut self) {
        self.print("\x1b[2J\x1b[H");
    }
}

#[derive(Debug, Default)]
pub struct BufferedOutput {
    buffer: String,
    clears: usize,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &str {
        &self.buffer
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }

    pub fn into_data(self) -> String {
        self.buffer
    }
}

impl Output for BufferedOutput {
    fn print(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.clears += 1;
    }
}
