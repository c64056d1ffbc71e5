//! Command-line parsing.

use anyhow::{Context as _, Result, anyhow, bail};
use page_handler::ElementIdentifier;
use std::path::PathBuf;

pub const USAGE: &str = "Usage:\n  hitmap <SCENE.json> <ID|SELECTOR|XPATH> [--resolution <PX>] \
[--width <PX>] [--height <PX>] [--settings <FILE>] [--coords]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub scene: PathBuf,
    pub identifier: ElementIdentifier,
    /// Overrides the stored sampling resolution.
    pub resolution: Option<u32>,
    /// Override the scene's viewport width.
    pub width: Option<u32>,
    /// Override the scene's viewport height.
    pub height: Option<u32>,
    /// JSON settings file; defaults apply without one.
    pub settings: Option<PathBuf>,
    /// Print every coordinate of the hit region.
    pub list_coordinates: bool,
}

fn number(flag: &str, value: Option<String>) -> Result<u32> {
    let value = value.ok_or_else(|| anyhow!("{flag} needs a value"))?;
    value
        .parse()
        .with_context(|| format!("{flag} expects a number, got {value:?}"))
}

/// Parse arguments (without the program name).
///
/// # Errors
/// Fails on unknown flags, missing values and missing positionals.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliOptions> {
    let mut args = args.into_iter();
    let mut positionals = Vec::new();
    let mut resolution = None;
    let mut width = None;
    let mut height = None;
    let mut settings = None;
    let mut list_coordinates = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--resolution" => resolution = Some(number("--resolution", args.next())?),
            "--width" => width = Some(number("--width", args.next())?),
            "--height" => height = Some(number("--height", args.next())?),
            "--settings" => {
                let path = args.next().ok_or_else(|| anyhow!("--settings needs a value"))?;
                settings = Some(PathBuf::from(path));
            }
            "--coords" => list_coordinates = true,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            _ => positionals.push(arg),
        }
    }
    let mut positionals = positionals.into_iter();
    let scene = positionals
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("missing scene file"))?;
    let identifier = positionals
        .next()
        .map(|raw| ElementIdentifier::parse(&raw))
        .ok_or_else(|| anyhow!("missing element identifier"))?;
    if let Some(extra) = positionals.next() {
        bail!("unexpected argument {extra:?}");
    }
    Ok(CliOptions {
        scene,
        identifier,
        resolution,
        width,
        height,
        settings,
        list_coordinates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| (*arg).to_owned()).collect()
    }

    #[test]
    fn positionals_and_flags() -> Result<()> {
        let options = parse_args(args(&[
            "page.json",
            "--resolution",
            "25",
            "#main .cta",
            "--coords",
            "--width",
            "800",
        ]))?;
        assert_eq!(options.scene, PathBuf::from("page.json"));
        assert_eq!(
            options.identifier,
            ElementIdentifier::Selector("#main .cta".into())
        );
        assert_eq!(options.resolution, Some(25));
        assert_eq!(options.width, Some(800));
        assert_eq!(options.height, None);
        assert!(options.list_coordinates);
        assert_eq!(options.settings, None);
        Ok(())
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(parse_args(args(&["page.json"])).is_err());
        assert!(parse_args(args(&["page.json", "go", "--resolution"])).is_err());
        assert!(parse_args(args(&["page.json", "go", "--resolution", "fine"])).is_err());
        assert!(parse_args(args(&["page.json", "go", "--verbose"])).is_err());
        assert!(parse_args(args(&["page.json", "go", "extra"])).is_err());
    }
}
