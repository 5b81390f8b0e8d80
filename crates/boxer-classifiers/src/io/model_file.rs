//! JSON model documents.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::session::{ModelDocument, Session};

pub fn save_model<P: AsRef<Path>>(path: P, doc: &ModelDocument) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create model file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, doc)
        .with_context(|| format!("Failed to serialize model to {}", path.display()))?;
    writer.flush()?;
    log::info!("Saved model to {}", path.display());
    Ok(())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelDocument> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open model file: {}", path.display()))?;
    let doc: ModelDocument = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse model file: {}", path.display()))?;
    Ok(doc)
}

/// Load a model and rebuild a scoring session from it.
pub fn load_session<P: AsRef<Path>>(path: P) -> Result<Session> {
    let doc = load_model(&path)?;
    Ok(Session::import(doc)?)
}
