//! Command-line arguments for `termweb-dump`.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

pub const USAGE: &str = "\
usage: termweb-dump [options] [FILE]

Render FILE (or stdin when FILE is absent or `-`) and print the buffer,
followed by the numbered link and image lists.

options:
  -w, --width N      render width in columns (default: config `columns`)
  -p, --plain        treat the input as plain text (default for *.txt)
  -b, --base URL     resolve relative targets against URL
  -c, --config FILE  load render settings from a TOML file
  -h, --help         print this help";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    pub input: Option<PathBuf>,
    pub width: Option<usize>,
    pub plain: bool,
    pub base: Option<String>,
    pub config: Option<PathBuf>,
    pub help: bool,
}

impl Args {
    /// Parse arguments, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut out = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => out.help = true,
                "-p" | "--plain" => out.plain = true,
                "-w" | "--width" => {
                    let raw = value(&mut args, &arg)?;
                    let width: usize = raw
                        .parse()
                        .with_context(|| format!("invalid width: {raw}"))?;
                    out.width = Some(width);
                },
                "-b" | "--base" => out.base = Some(value(&mut args, &arg)?),
                "-c" | "--config" => out.config = Some(PathBuf::from(value(&mut args, &arg)?)),
                "-" => out.input = None,
                flag if flag.starts_with('-') => bail!("unknown option: {flag}\n\n{USAGE}"),
                path => {
                    if out.input.is_some() {
                        bail!("more than one input file given");
                    }
                    out.input = Some(PathBuf::from(path));
                },
            }
        }
        Ok(out)
    }

    /// Whether the input should be rendered as plain text.
    pub fn is_plain(&self) -> bool {
        self.plain
            || self
                .input
                .as_ref()
                .and_then(|p| p.extension())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{flag} needs a value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn all_options() {
        let args = parse(&[
            "--width", "60", "-p", "--base", "http://e.com/", "-c", "cfg.toml", "page.html",
        ])
        .unwrap();
        assert_eq!(args.width, Some(60));
        assert!(args.plain);
        assert_eq!(args.base.as_deref(), Some("http://e.com/"));
        assert_eq!(args.config, Some(PathBuf::from("cfg.toml")));
        assert_eq!(args.input, Some(PathBuf::from("page.html")));
    }

    #[test]
    fn stdin_dash() {
        assert_eq!(parse(&["-"]).unwrap().input, None);
    }

    #[test]
    fn errors() {
        assert!(parse(&["--width"]).is_err());
        assert!(parse(&["--width", "wide"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["a.html", "b.html"]).is_err());
    }

    #[test]
    fn plain_by_extension() {
        assert!(parse(&["notes.TXT"]).unwrap().is_plain());
        assert!(!parse(&["page.html"]).unwrap().is_plain());
        assert!(parse(&["--plain"]).unwrap().is_plain());
    }
}
