use anyhow::Result;
use nuoca_core::Plugin;
use nuoca_protocol::{PluginConfig, Record};
use std::io::{self, Write};

/// Output plugin writing every record as one JSON line to stderr.
///
/// stdout belongs to the protocol, so stderr is the only console stream a
/// plugin process may print to.
pub struct Printer<W: Write + Send = io::Stderr> {
    out: W,
    prefix: String,
}

impl Printer {
    pub const NAME: &'static str = "Printer";

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            prefix: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Plugin for Printer<W> {
    fn startup(&mut self, config: &PluginConfig) -> Result<()> {
        self.prefix = config
            .get("prefix")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(())
    }

    fn store(&mut self, ts_values: &[Record]) -> Result<()> {
        for record in ts_values {
            writeln!(self.out, "{}{}", self.prefix, serde_json::to_string(record)?)?;
        }
        self.out.flush()?;
        Ok(())
    }
}
