use anyhow::{anyhow, Context, Result};
use nuoca_core::Plugin;
use nuoca_protocol::{PluginConfig, Record};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Output plugin appending every record as a JSON line to `path`.
#[derive(Debug, Default)]
pub struct JsonLines {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl JsonLines {
    pub const NAME: &'static str = "JsonLines";
}

impl Plugin for JsonLines {
    fn startup(&mut self, config: &PluginConfig) -> Result<()> {
        let path = config
            .get("path")
            .and_then(|p| p.as_str())
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("missing required string setting 'path'"))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    fn store(&mut self, ts_values: &[Record]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("output file is not open"))?;
        for record in ts_values {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
