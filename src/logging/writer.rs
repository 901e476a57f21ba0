use std::io::{self, Write};

use super::LogRecord;

/// Destination for encoded records. The record is passed along so that
/// writers which frame their output (GELF) can use its level and time.
pub trait LogWriter: Send {
    fn write_line(&mut self, record: &LogRecord, line: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

impl LogWriter for io::Stdout {
    fn write_line(&mut self, _record: &LogRecord, line: &str) -> io::Result<()> {
        let mut handle = self.lock();
        writeln!(handle, "{}", line)?;
        handle.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl LogWriter for Vec<u8> {
    fn write_line(&mut self, _record: &LogRecord, line: &str) -> io::Result<()> {
        writeln!(self, "{}", line)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
