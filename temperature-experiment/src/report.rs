use anyhow::Result;
use std::io::Write;

use crate::runner::{CaseOutcome, ExperimentCase, ExperimentObserver, ExperimentReport};

const BANNER: &str = "=========================================================";
const CASE_SEPARATOR_WIDTH: usize = 50;

/// Writes the experiment to the console as it runs, flushing after each step.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ExperimentObserver for ConsoleReporter<W> {
    fn started(&mut self) -> Result<()> {
        writeln!(self.out, "{}", BANNER)?;
        writeln!(self.out, "NIKE AI CONSULTANT - TEMPERATURE EXPERIMENT")?;
        writeln!(self.out, "{}\n", BANNER)?;
        self.out.flush()?;
        Ok(())
    }

    fn building_index(&mut self) -> Result<()> {
        writeln!(self.out, "Initializing Vector Store for experiment...")?;
        self.out.flush()?;
        Ok(())
    }

    fn ready(&mut self, query: &str) -> Result<()> {
        writeln!(self.out, "Test Query: '{}'\n", query)?;
        self.out.flush()?;
        Ok(())
    }

    fn case_started(&mut self, position: usize, case: &ExperimentCase) -> Result<()> {
        if position > 0 {
            writeln!(self.out, "\n{}\n", "=".repeat(CASE_SEPARATOR_WIDTH))?;
        }
        writeln!(self.out, "--- CASE {}: {} ---", case.label, case.sampling)?;
        self.out.flush()?;
        Ok(())
    }

    fn case_finished(&mut self, outcome: &CaseOutcome) -> Result<()> {
        match &outcome.outcome {
            Ok(result) => {
                writeln!(self.out, "\n[Generated Response]:")?;
                writeln!(self.out, "{}", result.result)?;
            }
            Err(message) => {
                writeln!(self.out, "Error in Case {}: {}", outcome.case.label, message)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn finished(&mut self, _report: &ExperimentReport) -> Result<()> {
        writeln!(self.out, "\n{}", BANNER)?;
        writeln!(self.out, "Experiment Complete. Check output for analysis.")?;
        self.out.flush()?;
        Ok(())
    }
}
