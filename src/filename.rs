//! Output filename construction.
//!
//! The configured base name (or the per-record name) is decorated with the
//! optional date, time, copy number, partition id and split number, then the
//! extension and any compression suffix:
//!
//! ```text
//! base[_yyyyMMdd][_HHmmss][_copy][_partition][_split].ext[.gz]
//! ```
//!
//! A custom `date_time_format` replaces the date and time parts and is
//! appended without a separator. Archive formats such as zip use their own
//! suffix in place of the extension; the extension is then used for the entry
//! inside the archive.

use crate::config::SinkConfig;
use crate::io::compression::CompressionProvider;
use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDateTime};
use std::fmt::Write as _;

/// Turns a base name into the final path of an output file.
pub trait FilenameResolver: Send + Sync {
    fn resolve(&self, base: &str, split_nr: u64) -> Result<String>;
}

/// Default [`FilenameResolver`] driven by [`SinkConfig`].
#[derive(Clone, Debug, Default)]
pub struct FilenameBuilder {
    pub extension: String,
    pub verbatim: bool,
    pub add_date: bool,
    pub add_time: bool,
    pub date_time_format: Option<String>,
    /// Copy number of the sink, when it goes into the name.
    pub copy_nr: Option<usize>,
    /// Partition id, when it goes into the name.
    pub partition_id: Option<String>,
    pub split_every: u64,
    pub archive_suffix: Option<String>,
    pub compression_suffix: Option<String>,
    /// Fixed clock; the local time is used when unset.
    pub now: Option<NaiveDateTime>,
}

impl FilenameBuilder {
    #[must_use]
    pub fn new(config: &SinkConfig, provider: &dyn CompressionProvider) -> Self {
        let suffix = provider.filename_suffix().map(str::to_string);
        let (archive_suffix, compression_suffix) = if provider.is_archive() {
            (suffix, None)
        } else {
            (None, suffix)
        };
        Self {
            extension: config.extension.clone(),
            verbatim: config.filename_verbatim,
            add_date: config.add_date,
            add_time: config.add_time,
            date_time_format: config.date_time_format.clone().filter(|f| !f.is_empty()),
            copy_nr: config.add_copy_nr.then_some(0),
            partition_id: None,
            split_every: config.split_every,
            archive_suffix,
            compression_suffix,
            now: None,
        }
    }

    /// Set the copy number; only used when the configuration asked for it.
    #[must_use]
    pub fn with_copy_nr(mut self, copy_nr: usize) -> Self {
        if self.copy_nr.is_some() {
            self.copy_nr = Some(copy_nr);
        }
        self
    }

    #[must_use]
    pub fn with_partition_id(mut self, partition_id: impl Into<String>) -> Self {
        self.partition_id = Some(partition_id.into());
        self
    }

    #[must_use]
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }
}

impl FilenameResolver for FilenameBuilder {
    fn resolve(&self, base: &str, split_nr: u64) -> Result<String> {
        if self.verbatim {
            return Ok(base.to_string());
        }
        let now = self.now.unwrap_or_else(|| Local::now().naive_local());
        let mut name = base.to_string();

        if let Some(pattern) = &self.date_time_format {
            write!(name, "{}", now.format(pattern))
                .map_err(|_| anyhow!("invalid date time format {pattern:?}"))?;
        } else {
            if self.add_date {
                write!(name, "_{}", now.format("%Y%m%d"))?;
            }
            if self.add_time {
                write!(name, "_{}", now.format("%H%M%S"))?;
            }
        }
        if let Some(copy_nr) = self.copy_nr {
            write!(name, "_{copy_nr}")?;
        }
        if let Some(partition) = &self.partition_id {
            write!(name, "_{partition}")?;
        }
        if self.split_every > 0 {
            write!(name, "_{split_nr}")?;
        }

        match &self.archive_suffix {
            Some(suffix) => name.push_str(suffix),
            None => {
                if !self.extension.is_empty() {
                    name.push('.');
                    name.push_str(&self.extension);
                }
                if let Some(suffix) = &self.compression_suffix {
                    name.push_str(suffix);
                }
            }
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::compression::provider_by_name;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap()
    }

    #[test]
    fn parts_follow_a_fixed_order() -> Result<()> {
        let config = SinkConfig {
            add_date: true,
            add_time: true,
            add_copy_nr: true,
            split_every: 10,
            ..SinkConfig::default()
        };
        let none = provider_by_name("None")?;
        let builder = FilenameBuilder::new(&config, none.as_ref())
            .with_copy_nr(2)
            .with_partition_id("P1")
            .at(noon());
        assert_eq!(builder.resolve("out/data", 3)?, "out/data_20240131_123005_2_P1_3.txt");
        Ok(())
    }

    #[test]
    fn custom_format_replaces_date_and_time() -> Result<()> {
        let config = SinkConfig {
            add_date: true,
            date_time_format: Some("%Y-%m".into()),
            extension: String::new(),
            ..SinkConfig::default()
        };
        let none = provider_by_name("None")?;
        let builder = FilenameBuilder::new(&config, none.as_ref()).at(noon());
        assert_eq!(builder.resolve("f", 0)?, "f2024-01");
        Ok(())
    }

    #[test]
    fn verbatim_names_are_untouched() -> Result<()> {
        let config = SinkConfig {
            filename_verbatim: true,
            split_every: 2,
            ..SinkConfig::default()
        };
        let none = provider_by_name("None")?;
        assert_eq!(FilenameBuilder::new(&config, none.as_ref()).resolve("f", 4)?, "f");
        Ok(())
    }

    #[cfg(all(feature = "compression-zip", feature = "compression-gzip"))]
    #[test]
    fn compression_suffixes() -> Result<()> {
        let config = SinkConfig::default();
        let zip = provider_by_name("Zip")?;
        let gz = provider_by_name("GZip")?;
        assert_eq!(FilenameBuilder::new(&config, zip.as_ref()).resolve("a", 0)?, "a.zip");
        assert_eq!(FilenameBuilder::new(&config, gz.as_ref()).resolve("a", 0)?, "a.txt.gz");
        Ok(())
    }
}
