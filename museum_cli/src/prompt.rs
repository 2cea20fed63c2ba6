//! Line-oriented prompting on stdin.

use museum_core::{Error, Result};
use std::io::{self, BufRead, IsTerminal, Write};

pub struct Prompt<R> {
    input: R,
    /// Input is a terminal, so secrets can be read without echo
    terminal: bool,
}

impl Prompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        let stdin = io::stdin();
        Self {
            terminal: stdin.is_terminal(),
            input: stdin.lock(),
        }
    }
}

impl<R: BufRead> Prompt<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            terminal: false,
        }
    }

    /// Print `label` and read one trimmed line; None at end of input
    pub fn try_ask(&mut self, label: &str) -> Result<Option<String>> {
        print!("{}", label);
        io::stdout().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn ask(&mut self, label: &str) -> Result<String> {
        self.try_ask(label)?.ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ))
        })
    }

    /// Ask for a password; typing is hidden when reading from a terminal
    pub fn ask_secret(&mut self, label: &str) -> Result<String> {
        if self.terminal {
            return Ok(rpassword::prompt_password(label)?);
        }
        self.ask(label)
    }

    /// Ask for an optional value; a blank answer is None
    pub fn ask_optional(&mut self, label: &str) -> Result<Option<String>> {
        let answer = self.ask(label)?;
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }

    pub fn ask_id(&mut self, label: &str) -> Result<u64> {
        let answer = self.ask(label)?;
        answer
            .parse()
            .map_err(|_| Error::Validation(format!("'{}' is not a valid id", answer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers_are_trimmed_and_blank_is_none() {
        let mut prompt = Prompt::new("  Vase \n\n12\n".as_bytes());
        assert_eq!(prompt.ask("Name: ").unwrap(), "Vase");
        assert_eq!(prompt.ask_optional("Material: ").unwrap(), None);
        assert_eq!(prompt.ask_id("Id: ").unwrap(), 12);
        assert!(prompt.try_ask("More: ").unwrap().is_none());
        assert!(matches!(prompt.ask("More: "), Err(Error::Io(_))));
    }

    #[test]
    fn test_secret_from_piped_input() {
        let mut prompt = Prompt::new("s3cret \n".as_bytes());
        assert!(!prompt.terminal);
        assert_eq!(prompt.ask_secret("Password: ").unwrap(), "s3cret");
        assert!(matches!(prompt.ask_secret("Password: "), Err(Error::Io(_))));
    }

    #[test]
    fn test_bad_id_is_validation_error() {
        let mut prompt = Prompt::new("seven\n".as_bytes());
        assert!(matches!(prompt.ask_id("Id: "), Err(Error::Validation(_))));
    }
}
