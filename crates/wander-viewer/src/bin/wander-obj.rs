//! Headless OBJ exporter.
//!
//! Invokes a renderlet whose result is a length-prefixed OBJ+MTL text blob and
//! writes the two halves next to each other as `<name>.obj` and
//! `<name>.obj.mtl`.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use wander_engine::logging::{LoggingConfig, init_logging};
use wander_engine::pal::HeadlessPal;
use wander_engine::Runtime;

const USAGE: &str = "usage: wander-obj <renderlet.wasm> <name> [entry]";

const MTLLIB: &str = "mtllib";

/// Splits an exported blob at the first `mtllib` token. Text before the token
/// is the material library; the token and everything after it is geometry.
fn split_obj_mtl(text: &str) -> (&str, &str) {
    match text.find(MTLLIB) {
        Some(at) => (&text[at..], &text[..at]),
        None => ("", text),
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(name)) = (args.next(), args.next()) else {
        bail!("{USAGE}");
    };
    let path = PathBuf::from(path);
    let entry = args.next();

    let mut runtime = Runtime::new(HeadlessPal::new());
    let id = runtime
        .try_load_from_file(&path, entry.as_deref())
        .with_context(|| format!("failed to load {}", path.display()))?;

    let export = entry.unwrap_or_else(|| runtime.config().default_entry.clone());
    let offset = runtime
        .try_evaluate(id, &export)
        .with_context(|| format!("failed to evaluate `{export}`"))?;

    let prefix = runtime
        .read_memory(id, offset, 4)
        .context("result offset is outside renderlet memory")?;
    let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;

    let start = offset
        .checked_add(4)
        .context("result offset overflows renderlet memory")?;
    let bytes = runtime
        .read_memory(id, start, len)
        .context("result text is outside renderlet memory")?;
    let text = std::str::from_utf8(bytes).context("result text is not UTF-8")?;

    let (obj, mtl) = split_obj_mtl(text);
    let obj_path = format!("{name}.obj");
    let mtl_path = format!("{name}.obj.mtl");
    fs::write(&obj_path, obj).with_context(|| format!("failed to write {obj_path}"))?;
    fs::write(&mtl_path, mtl).with_context(|| format!("failed to write {mtl_path}"))?;

    log::info!("wrote {obj_path} ({} bytes) and {mtl_path} ({} bytes)", obj.len(), mtl.len());
    Ok(())
}
