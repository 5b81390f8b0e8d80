//! Sparse example TSV reader.
//!
//! One example per line, three tab-separated columns:
//!
//! ```text
//! name<TAB>labels<TAB>features
//! doc1<TAB>topic:sports,region:east<TAB>ball:2 goal:1 @len:0.5
//! ```
//!
//! `labels` is a comma-separated list of `discr:class` (or a bare `class`
//! for a suite with a single discrimination); empty or `-` means
//! unlabelled. `features` is whitespace-separated `name:value`, a bare
//! `name` counts as value 1. An empty name is replaced by the session's
//! generated name. Lines starting with `#` are ignored.
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;

use crate::data_point::DataPoint;
use crate::session::{RawLabel, Session};

/// One parsed line, before any dictionary or suite lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExample {
    pub name: Option<String>,
    pub labels: Vec<RawLabel>,
    pub features: Vec<(String, f64)>,
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'));
    builder
}

/// Parse the label column.
pub fn parse_labels(field: &str) -> Result<Vec<RawLabel>> {
    let field = field.trim();
    if field.is_empty() || field == "-" {
        return Ok(Vec::new());
    }
    field
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.parse::<RawLabel>()
                .with_context(|| format!("Invalid label '{}'", s))
        })
        .collect()
}

/// Parse the feature column.
pub fn parse_features(field: &str) -> Result<Vec<(String, f64)>> {
    field
        .split_whitespace()
        .map(|token| match token.rsplit_once(':') {
            Some((name, value)) if !name.is_empty() => {
                let value = value
                    .parse::<f64>()
                    .with_context(|| format!("Invalid value in feature '{}'", token))?;
                Ok((name.to_string(), value))
            }
            Some(_) => Err(anyhow!("Feature '{}' has an empty name", token)),
            None => Ok((token.to_string(), 1.0)),
        })
        .collect()
}

fn parse_record(record: &StringRecord, line: u64) -> Result<RawExample> {
    if record.len() > 3 {
        return Err(anyhow!(
            "Expected at most 3 columns at line {}, found {}",
            line,
            record.len()
        ));
    }
    let name = record.get(0).map(str::trim).filter(|n| !n.is_empty());
    let labels = parse_labels(record.get(1).unwrap_or_default())
        .with_context(|| format!("Bad label column at line {}", line))?;
    let features = parse_features(record.get(2).unwrap_or_default())
        .with_context(|| format!("Bad feature column at line {}", line))?;
    Ok(RawExample {
        name: name.map(str::to_string),
        labels,
        features,
    })
}

/// Parse every example from `input`.
pub fn read_examples<R: Read>(input: R) -> Result<Vec<RawExample>> {
    let mut reader = reader_builder().from_reader(input);
    let mut examples = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read example row")?;
        let line = record.position().map_or(0, |p| p.line());
        examples.push(parse_record(&record, line)?);
    }
    Ok(examples)
}

/// Parse every example from the file at `path`.
pub fn read_examples_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawExample>> {
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open example file: {}", path.as_ref().display()))?;
    read_examples(file).with_context(|| format!("While reading {}", path.as_ref().display()))
}

/// Resolve parsed examples against `session`'s dictionary and suite.
///
/// In definitional mode new features, discriminations and classes may be
/// created; otherwise labels must refer to the existing schema.
pub fn to_points(session: &mut Session, examples: &[RawExample], definitional: bool) -> Result<Vec<DataPoint>> {
    let mut points = Vec::with_capacity(examples.len());
    for example in examples {
        let point = session
            .make_point(
                example.name.as_deref(),
                &example.features,
                &example.labels,
                definitional,
            )
            .with_context(|| {
                format!(
                    "Failed to build data point '{}'",
                    example.name.as_deref().unwrap_or("<unnamed>")
                )
            })?;
        points.push(point);
    }
    log::info!(
        "Loaded {} data point(s), dictionary now has {} feature(s)",
        points.len(),
        session.suite().dictionary().dimension()
    );
    Ok(points)
}

/// Read `path` and build its points against `session`.
pub fn read_points<P: AsRef<Path>>(session: &mut Session, path: P, definitional: bool) -> Result<Vec<DataPoint>> {
    let examples = read_examples_from_path(&path)?;
    to_points(session, &examples, definitional)
}
