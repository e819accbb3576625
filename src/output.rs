use crate::profile::EnergyProfile;
use crate::template::UmiTemplate;
use anyhow::anyhow;
use formatx::formatx;
use std::fmt::Debug;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Destination for generated artifacts, keyed by artifact name (the
/// template name, or the profile label for exported series).
pub trait Output: Debug {
    fn writer_for_artifact(&self, artifact_key: &str) -> anyhow::Result<impl Write>;
    /// Whether this output can be considered a no-op and therefore that any
    /// code that only writes to the output can be skipped.
    fn is_noop(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    /// `file_template` is a formatx template with one positional slot for
    /// the artifact key, e.g. `"{}.json"`.
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }
}

impl Output for FileOutput {
    fn writer_for_artifact(&self, artifact_key: &str) -> anyhow::Result<impl Write> {
        let file_name = formatx!(&self.file_template, artifact_key)
            .map_err(|error| anyhow!("invalid file name template: {error}"))?;
        Ok(BufWriter::new(File::create(
            self.directory_path.join(file_name),
        )?))
    }
}

impl Output for &FileOutput {
    fn writer_for_artifact(&self, artifact_key: &str) -> anyhow::Result<impl Write> {
        <FileOutput as Output>::writer_for_artifact(self, artifact_key)
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_artifact(&self, _artifact_key: &str) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Serializes the template under its own name.
pub fn write_template(output: &impl Output, template: &UmiTemplate) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    let mut writer = output.writer_for_artifact(&template.name)?;
    writer.write_all(template.to_json()?.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Exports the profile partitions as CSV under `artifact_key`.
pub fn write_profile(
    output: &impl Output,
    artifact_key: &str,
    profile: &EnergyProfile,
) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    profile.to_csv(output.writer_for_artifact(artifact_key)?)
}
