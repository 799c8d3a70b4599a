//! User-facing output and confirmation prompts.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use crate::{Error, Result};

/// Terminal front end shared by every command.
///
/// `print` is silenced by `quiet`; prompts are always shown unless
/// `assume_yes` answers them.
pub struct Ui {
    quiet: bool,
    assume_yes: bool,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Ui {
    /// A UI on the process's stdin and stdout.
    pub fn new(quiet: bool, assume_yes: bool) -> Self {
        Self::with_io(
            quiet,
            assume_yes,
            io::BufReader::new(io::stdin()),
            io::stdout(),
        )
    }

    pub fn with_io<R, W>(quiet: bool, assume_yes: bool, input: R, output: W) -> Self
    where
        R: BufRead + 'static,
        W: Write + 'static,
    {
        Self {
            quiet,
            assume_yes,
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn print(&mut self, message: impl Display) -> Result<()> {
        if !self.quiet {
            writeln!(self.output, "{message}")?;
        }
        Ok(())
    }

    /// Ask a yes/no question; any answer but yes cancels.
    pub fn confirm(&mut self, question: &str) -> Result<()> {
        if self.assume_yes {
            return Ok(());
        }

        write!(self.output, "{question} [y/N]: ")?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            // EOF reached (non-interactive environment)
            return Err(Error::UserCancelled(
                "non-interactive environment, use --assume-yes".to_string(),
            ));
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(()),
            _ => Err(Error::UserCancelled(question.to_string())),
        }
    }

    /// Print a heading followed by one indented line per item, then confirm.
    pub fn confirm_list<I, T>(&mut self, heading: &str, items: I, question: &str) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        let items = items.into_iter().map(|item| item.to_string()).collect();
        self.confirm_sections(&[(heading.to_string(), items)], question)
    }

    /// Like [`Ui::confirm_list`] with several headed lists; empty sections are skipped.
    pub fn confirm_sections(
        &mut self,
        sections: &[(String, Vec<String>)],
        question: &str,
    ) -> Result<()> {
        if self.assume_yes {
            return Ok(());
        }
        for (heading, items) in sections.iter().filter(|(_, items)| !items.is_empty()) {
            writeln!(self.output, "{heading}")?;
            for item in items {
                writeln!(self.output, "  {item}")?;
            }
        }
        self.confirm(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn scripted(quiet: bool, assume_yes: bool, input: &'static str) -> (Ui, Captured) {
        let out = Captured::default();
        (Ui::with_io(quiet, assume_yes, input.as_bytes(), out.clone()), out)
    }

    #[test]
    fn test_quiet_suppresses_print() {
        let (mut ui, out) = scripted(true, false, "");
        ui.print("hidden").unwrap();
        assert_eq!(out.text(), "");

        let (mut ui, out) = scripted(false, false, "");
        ui.print("shown").unwrap();
        assert_eq!(out.text(), "shown\n");
    }

    #[test]
    fn test_confirm_answers() {
        let (mut ui, out) = scripted(false, false, "y\n");
        ui.confirm("Run anyway?").unwrap();
        assert_eq!(out.text(), "Run anyway? [y/N]: ");

        let (mut ui, _) = scripted(false, false, "YES\n");
        ui.confirm("Run anyway?").unwrap();

        let (mut ui, _) = scripted(false, false, "n\n");
        assert!(ui.confirm("Run anyway?").unwrap_err().is_cancelled());

        let (mut ui, _) = scripted(false, false, "\n");
        assert!(ui.confirm("Run anyway?").unwrap_err().is_cancelled());
    }

    #[test]
    fn test_eof_cancels() {
        let (mut ui, _) = scripted(false, false, "");
        assert!(ui.confirm("Continue?").unwrap_err().is_cancelled());
    }

    #[test]
    fn test_assume_yes_skips_prompt() {
        let (mut ui, out) = scripted(true, true, "");
        ui.confirm_list("Runs to be removed:", ["a", "b"], "Continue?")
            .unwrap();
        assert_eq!(out.text(), "");
    }

    #[test]
    fn test_prompts_ignore_quiet() {
        let (mut ui, out) = scripted(true, false, "y\n");
        ui.confirm_list("Runs to be removed:", ["a/1", "a/2"], "Continue?")
            .unwrap();
        assert_eq!(
            out.text(),
            "Runs to be removed:\n  a/1\n  a/2\nContinue? [y/N]: "
        );
    }
}
