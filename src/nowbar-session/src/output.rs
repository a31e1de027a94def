use std::io::{self, Write};

/// Destination of rendered lines. An empty line means nothing is playing.
pub trait OutputSink {
    fn emit(&mut self, line: &str) -> io::Result<()>;
}

/// Writes each line to stdout and flushes immediately.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()
    }
}

impl OutputSink for Vec<String> {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}
