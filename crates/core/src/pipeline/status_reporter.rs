use std::io::Write;

use crate::shared::error::TaggerError;

/// Machine-readable status channel consumed by the host application.
pub trait StatusReporter: Send {
    fn progress(&mut self, percent: u8) -> Result<(), TaggerError>;

    /// Final sorted identity list. Emitted at most once per run.
    fn results(&mut self, identities: &[String]) -> Result<(), TaggerError>;
}

/// Writes `PROGRESS:<n>` and `RESULTS:<json>` lines, flushing after each so
/// a reading host sees them immediately.
pub struct LineStatusReporter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> LineStatusReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) -> Result<(), TaggerError> {
        writeln!(self.out, "{line}").map_err(TaggerError::Status)?;
        self.out.flush().map_err(TaggerError::Status)
    }
}

impl<W: Write + Send> StatusReporter for LineStatusReporter<W> {
    fn progress(&mut self, percent: u8) -> Result<(), TaggerError> {
        self.write_line(&format!("PROGRESS:{}", percent.min(100)))
    }

    fn results(&mut self, identities: &[String]) -> Result<(), TaggerError> {
        let json = serde_json::to_string(identities)
            .map_err(|e| TaggerError::Status(std::io::Error::other(e)))?;
        self.write_line(&format!("RESULTS:{json}"))
    }
}

/// Discards all status output.
pub struct NullStatusReporter;

impl StatusReporter for NullStatusReporter {
    fn progress(&mut self, _percent: u8) -> Result<(), TaggerError> {
        Ok(())
    }

    fn results(&mut self, _identities: &[String]) -> Result<(), TaggerError> {
        Ok(())
    }
}
