use std::env;

use anyhow::{Result, anyhow, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the viewer API (default).
    Serve,
    /// Paste the latest Drive export into the paste sheet.
    Import,
    /// Export a month from the portal and upload it to Drive.
    Scrape { month: Option<String> },
}

const HELP: &str = "\
usage: kintai_review [serve | import | scrape [--month YYYY-MM]]

  serve     run the attendance viewer API (default)
  import    paste the latest kintai_YYYY-MM export from Drive into the sheet
  scrape    export a month from the HR portal and upload it to Drive
            (defaults to the previous month)";

pub fn detect_command() -> Result<Command> {
    parse_args(env::args().skip(1))
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut args = args.into_iter();

    let command = match args.next().as_deref() {
        None | Some("serve") => Command::Serve,
        Some("import") => Command::Import,
        Some("scrape") => {
            let mut month = None;
            while let Some(a) = args.next() {
                match a.as_str() {
                    "--month" | "-m" => {
                        month = Some(args.next().ok_or_else(|| anyhow!("Missing value for --month"))?)
                    }
                    other => bail!("Unknown arg: {other}"),
                }
            }
            return Ok(Command::Scrape { month });
        }
        Some("-h" | "--help") => {
            eprintln!("{HELP}");
            std::process::exit(0);
        }
        Some(other) => bail!("Unknown command: {other}\n\n{HELP}"),
    };

    if let Some(extra) = args.next() {
        bail!("Unknown arg: {extra}");
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn serve_is_the_default() {
        assert_eq!(parse(&[]).unwrap(), Command::Serve);
        assert_eq!(parse(&["serve"]).unwrap(), Command::Serve);
    }

    #[test]
    fn scrape_takes_optional_month() {
        assert_eq!(parse(&["scrape"]).unwrap(), Command::Scrape { month: None });
        assert_eq!(
            parse(&["scrape", "--month", "2025-05"]).unwrap(),
            Command::Scrape {
                month: Some("2025-05".into())
            }
        );
        assert!(parse(&["scrape", "--month"]).is_err());
    }

    #[test]
    fn unknown_input_is_rejected() {
        assert!(parse(&["deploy"]).is_err());
        assert!(parse(&["import", "--force"]).is_err());
    }
}
