use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use winit::dpi::LogicalSize;

pub const USAGE: &str =
    "usage: wander-viewer <renderlet.wasm> [--entry NAME] [--stride BYTES] [--pooled] [--title TEXT] [--size WxH]";

/// Viewer settings, from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub renderlet: PathBuf,
    /// Entry export; the runtime default when absent.
    pub entry: Option<String>,
    /// Bytes per vertex of the renderlet's geometry.
    pub stride: u32,
    /// Build through the staging pool and upload once per frame.
    pub pooled: bool,
}

impl ViewerConfig {
    pub fn new(renderlet: impl Into<PathBuf>) -> Self {
        Self {
            title: "wander".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            renderlet: renderlet.into(),
            entry: None,
            stride: 44,
            pooled: false,
        }
    }

    /// Parses arguments, without the program name.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let mut renderlet = None;
        let mut config = ViewerConfig::new(PathBuf::new());

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| args.next().with_context(|| format!("{flag} needs a value"));
            match arg.as_str() {
                "--entry" => config.entry = Some(value("--entry")?),
                "--stride" => {
                    let v = value("--stride")?;
                    config.stride = v.parse().with_context(|| format!("bad stride `{v}`"))?;
                    if config.stride == 0 {
                        bail!("stride must be non-zero");
                    }
                }
                "--pooled" => config.pooled = true,
                "--title" => config.title = value("--title")?,
                "--size" => config.initial_size = parse_size(&value("--size")?)?,
                flag if flag.starts_with("--") => bail!("unknown option `{flag}`\n{USAGE}"),
                path => {
                    if renderlet.replace(PathBuf::from(path)).is_some() {
                        bail!("more than one renderlet given\n{USAGE}");
                    }
                }
            }
        }

        config.renderlet = renderlet.with_context(|| format!("no renderlet given\n{USAGE}"))?;
        Ok(config)
    }
}

fn parse_size(text: &str) -> Result<LogicalSize<f64>> {
    let (w, h) = text
        .split_once('x')
        .with_context(|| format!("size `{text}` is not WxH"))?;
    let w: f64 = w.trim().parse().with_context(|| format!("bad width `{w}`"))?;
    let h: f64 = h.trim().parse().with_context(|| format!("bad height `{h}`"))?;
    Ok(LogicalSize::new(w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ViewerConfig> {
        ViewerConfig::from_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn path_only_uses_defaults() {
        let c = parse(&["house.wasm"]).unwrap();
        assert_eq!(c, ViewerConfig::new("house.wasm"));
        assert_eq!(c.stride, 44);
    }

    #[test]
    fn options_anywhere() {
        let c = parse(&["--pooled", "tree.wasm", "--entry", "Start", "--size", "640x480"]).unwrap();
        assert!(c.pooled);
        assert_eq!(c.entry.as_deref(), Some("Start"));
        assert_eq!(c.initial_size, LogicalSize::new(640.0, 480.0));
        assert_eq!(c.renderlet, PathBuf::from("tree.wasm"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.wasm", "b.wasm"]).is_err());
        assert!(parse(&["a.wasm", "--stride", "0"]).is_err());
        assert!(parse(&["a.wasm", "--entry"]).is_err());
        assert!(parse(&["a.wasm", "--size", "big"]).is_err());
        assert!(parse(&["a.wasm", "--fast"]).is_err());
    }
}
