//! Outcome classification and console reporting.
//!
//! Output is streamed: each fixture prints its progress prefix before it runs
//! and its label as soon as it is classified, so a hanging program leaves the
//! offending fixture name on screen.

use std::io::{self, Write};

use termcolor::{Color, ColorSpec, WriteColor};

use crate::compare::DiffLine;

const RULE_WIDTH: usize = 30;

// =============================================================================
// OUTCOMES
// =============================================================================

/// Classification of one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    /// Output differs from the reference.
    Mismatch,
    /// Program exited cleanly but wrote nothing.
    EmptyOutput,
    /// Program exited non-zero. `None` means it was killed by a signal.
    Crash { code: Option<i32> },
    /// The checker itself could not run the fixture.
    Error { reason: String },
    Skip { reason: String },
}

/// Which counter an outcome lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Passed,
    Failed,
    Skipped,
}

impl Outcome {
    /// Counter this outcome is added to in the [`Summary`].
    pub fn tally(&self) -> Tally {
        match self {
            Outcome::Pass => Tally::Passed,
            Outcome::Skip { .. } => Tally::Skipped,
            Outcome::Mismatch
            | Outcome::EmptyOutput
            | Outcome::Crash { .. }
            | Outcome::Error { .. } => Tally::Failed,
        }
    }

    /// Console label printed after the progress prefix.
    pub fn label(&self) -> String {
        match self {
            Outcome::Pass => "PASS".to_string(),
            Outcome::Mismatch => "FAIL (Mismatch)".to_string(),
            Outcome::EmptyOutput => "FAIL (Empty Output)".to_string(),
            Outcome::Crash { code: Some(code) } => format!("CRASH (Exit: {code})"),
            Outcome::Crash { code: None } => "CRASH (Signal)".to_string(),
            Outcome::Error { reason } => format!("ERROR ({reason})"),
            Outcome::Skip { reason } => format!("SKIP ({reason})"),
        }
    }

    fn color(&self) -> Color {
        match self.tally() {
            Tally::Passed => Color::Green,
            Tally::Failed => Color::Red,
            Tally::Skipped => Color::Yellow,
        }
    }
}

/// Running totals for one battery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failed_names: Vec<String>,
}

impl Summary {
    /// Counts one classified fixture. Failed names are kept in run order.
    pub fn record(&mut self, name: &str, outcome: &Outcome) {
        match outcome.tally() {
            Tally::Passed => self.passed += 1,
            Tally::Skipped => self.skipped += 1,
            Tally::Failed => {
                self.failed += 1;
                self.failed_names.push(name.to_string());
            }
        }
    }

    /// Every discovered fixture, skipped ones included.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Percentage of executed fixtures that passed. Skipped fixtures are not
    /// counted; `None` when nothing was executed.
    pub fn pass_rate(&self) -> Option<f64> {
        let executed = self.passed + self.failed;
        if executed == 0 {
            return None;
        }
        Some(self.passed as f64 * 100.0 / executed as f64)
    }
}

/// `index` is 1-based. Truncates toward zero.
pub fn progress_percent(index: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    index * 100 / total
}

// =============================================================================
// CONSOLE
// =============================================================================

/// Writes the checker's console output to any color-capable sink.
pub struct Reporter<W: WriteColor> {
    out: W,
    label_width: usize,
}

impl<W: WriteColor> Reporter<W> {
    /// `label_width` pads fixture names so the labels line up.
    pub fn new(out: W, label_width: usize) -> Self {
        Self { out, label_width }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Bold `[*] Compiling <program>...` banner.
    pub fn compiling(&mut self, program: &str) -> io::Result<()> {
        self.out.set_color(ColorSpec::new().set_bold(true))?;
        write!(self.out, "[*] Compiling {program}...")?;
        self.out.reset()?;
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn compiled(&mut self) -> io::Result<()> {
        self.colored_line(Color::Green, "[OK] Compilation successful.")?;
        writeln!(self.out)
    }

    pub fn build_failed(&mut self) -> io::Result<()> {
        self.colored_line(Color::Red, "[!] Compilation failed!")
    }

    /// Printed instead of a summary when the directory has no command files.
    pub fn no_fixtures(&mut self, dir: &str) -> io::Result<()> {
        self.colored_line(Color::Red, &format!("[!] No tests found in folder: {dir}"))
    }

    /// Prints `[ 42%] Running name...` without a newline.
    pub fn case_started(&mut self, index: usize, total: usize, name: &str) -> io::Result<()> {
        write!(self.out, "[{:3}%] Running ", progress_percent(index, total))?;
        self.out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)))?;
        write!(self.out, "{name:<width$}", width = self.label_width)?;
        self.out.reset()?;
        write!(self.out, "... ")?;
        self.out.flush()
    }

    /// Completes the progress line with the colored outcome label.
    pub fn case_finished(&mut self, outcome: &Outcome) -> io::Result<()> {
        self.colored_line(outcome.color(), &outcome.label())
    }

    /// Expected lines are prefixed `-`, actual lines `+`.
    pub fn diff(&mut self, lines: &[DiffLine]) -> io::Result<()> {
        for line in lines {
            match line {
                DiffLine::Same(text) => {
                    self.out.reset()?;
                    writeln!(self.out, "    {text}")?;
                }
                DiffLine::Expected(text) => {
                    self.out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                    writeln!(self.out, "  - {text}")?;
                }
                DiffLine::Actual(text) => {
                    self.out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                    writeln!(self.out, "  + {text}")?;
                }
            }
        }
        self.out.reset()
    }

    /// Counts, pass rate, and the names of failed fixtures.
    pub fn summary(&mut self, summary: &Summary) -> io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.out)?;
        writeln!(self.out, "{rule}")?;
        writeln!(self.out, "SUMMARY")?;
        writeln!(self.out, "{rule}")?;
        self.colored_line(Color::Green, &format!("Passed:  {}", summary.passed))?;
        self.colored_line(Color::Red, &format!("Failed:  {}", summary.failed))?;
        self.colored_line(Color::Yellow, &format!("Skipped: {}", summary.skipped))?;
        writeln!(self.out, "Total tests:   {}", summary.total())?;
        let rate = match summary.pass_rate() {
            Some(rate) => format!("{rate:.2} % passed"),
            None => "N/A % passed".to_string(),
        };
        self.colored_line(Color::Magenta, &rate)?;
        writeln!(self.out, "{rule}")?;

        if summary.has_failures() {
            writeln!(self.out, "\nFailed tests:")?;
            for name in &summary.failed_names {
                writeln!(self.out, "  - {name}")?;
            }
        }
        self.out.flush()
    }

    fn colored_line(&mut self, color: Color, text: &str) -> io::Result<()> {
        self.out.set_color(ColorSpec::new().set_fg(Some(color)))?;
        write!(self.out, "{text}")?;
        self.out.reset()?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
