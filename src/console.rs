//! Terminal prompts for the provisioning CLI.
//!
//! Generic over the reader and writer so the whole dialogue can be driven
//! from a byte buffer in tests.

use crate::locator::PortListing;
use crate::validation::{
    validate_date_of_birth, validate_name, validate_national_id, CitizenIdentity, Pin, Sex,
    ValidationError,
};
use std::io::{self, BufRead, Write};

pub const RULE: &str = "============================================================";

/// What the operator chose when no port was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortChoice {
    Manual(String),
    /// Agreed to enter a port, then left it blank.
    Empty,
    Declined,
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the writer, e.g. to inspect a test transcript.
    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, line: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.output, "{}", line.as_ref())
    }

    /// Print `label`, read one line and trim it. End of input is an error,
    /// so retry loops cannot spin forever on a closed stdin.
    pub fn prompt(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Ask until `parse` accepts the answer, printing `error` after each
    /// rejection (or the validation message if `error` is `None`).
    fn ask<T>(
        &mut self,
        label: &str,
        error: Option<&str>,
        parse: impl Fn(&str) -> Result<T, ValidationError>,
    ) -> io::Result<T> {
        loop {
            let answer = self.prompt(label)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => match error {
                    Some(message) => self.say(format!(" {message}"))?,
                    None => self.say(format!(" {e}"))?,
                },
            }
        }
    }

    /// Collect and validate the six identity fields.
    pub fn collect_identity(&mut self, current_year: i32) -> io::Result<CitizenIdentity> {
        self.say("")?;
        self.say(RULE)?;
        self.say(" Enter Complete Citizen Information")?;
        self.say(RULE)?;

        let first_name = self.ask(
            "First Name: ",
            Some("Invalid first name. Must contain at least 2 letters."),
            validate_name,
        )?;
        let last_name = self.ask(
            "Last Name: ",
            Some("Invalid last name. Must contain at least 2 letters."),
            validate_name,
        )?;
        let national_id = self.ask("National ID: ", None, validate_national_id)?;
        let date_of_birth = self.ask("Date of Birth (YYYY-MM-DD): ", None, |s| {
            validate_date_of_birth(s, current_year)
        })?;
        let sex = self.ask("Sex (M/F): ", None, Sex::parse)?;
        let pin = self.ask(
            "Device PIN (4-8 digits): ",
            Some("Invalid PIN. Must be 4-8 digits only."),
            Pin::parse,
        )?;

        Ok(CitizenIdentity::from_parts(
            first_name,
            last_name,
            date_of_birth,
            national_id,
            sex,
            pin,
        ))
    }

    /// Show the record with the PIN masked and ask to go ahead.
    pub fn confirm(&mut self, identity: &CitizenIdentity) -> io::Result<bool> {
        self.say("")?;
        self.say(" Review Information:")?;
        self.say(format!(
            "   Name: {} {}",
            identity.first_name(),
            identity.last_name()
        ))?;
        self.say(format!("   DOB: {}", identity.date_of_birth_text()))?;
        self.say(format!("   National ID: {}", identity.national_id()))?;
        self.say(format!("   Sex: {}", identity.sex()))?;
        self.say(format!("   PIN: {}", identity.pin().masked()))?;

        let answer = self.prompt("\nConfirm and program device? (yes/no): ")?;
        Ok(matches!(answer.to_lowercase().as_str(), "yes" | "y"))
    }

    /// List `ports` and offer manual entry. A blank answer counts as yes.
    pub fn choose_port(&mut self, ports: &[PortListing]) -> io::Result<PortChoice> {
        self.say(" ZK-Pass device not found automatically!")?;
        self.say("Please check:")?;
        self.say("  - Device is connected to computer")?;
        self.say("  - USB drivers are installed")?;
        self.say("")?;
        self.say(" Available ports:")?;
        for port in ports {
            self.say(format!("  - {} - {}", port.device, port.description))?;
        }

        let answer = self.prompt("\nEnter port manually? (yes/no): ")?;
        if !matches!(answer.to_lowercase().as_str(), "yes" | "y" | "") {
            return Ok(PortChoice::Declined);
        }
        let port = self.prompt("Enter serial port (e.g. COM3 or /dev/ttyUSB0): ")?;
        if port.is_empty() {
            Ok(PortChoice::Empty)
        } else {
            Ok(PortChoice::Manual(port))
        }
    }
}
