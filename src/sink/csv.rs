//! CSV sink for depth frames

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{FrameSink, create_output_dir, timestamp_stem};
use crate::types::Frame;
use crate::{Result, StreamError};

/// Appends one row per depth frame to a single CSV file.
///
/// Row layout: `timestamp,[index,]d1,d2,...,dN,` with the index column
/// present only when the frame carries one. Every field is followed by a
/// comma, matching the files the acquisition software has always produced.
pub struct DepthCsvSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl DepthCsvSink {
    /// Open `<dir>/<file_name>.csv`, creating `dir` if needed.
    ///
    /// Without a file name the file is named after the current time.
    pub fn create(dir: &Path, file_name: Option<&str>) -> Result<Self> {
        create_output_dir(dir)?;

        let stem = match file_name {
            Some(name) => name.trim_end_matches(".csv").to_string(),
            None => timestamp_stem(
                SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64(),
            ),
        };
        let path = dir.join(format!("{}.csv", stem));

        let file = File::create(&path).map_err(|e| StreamError::file_error(path.clone(), e))?;
        Ok(Self { path, writer: Some(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_row(&mut self, frame: &Frame, timestamp: f64) -> std::io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(std::io::Error::other("csv sink already closed"));
        };
        let Some(depths) = frame.depth_values() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "csv sink received a raw frame",
            ));
        };

        write!(writer, "{},", timestamp_stem(timestamp))?;
        if let Some(index) = frame.sequence_index {
            write!(writer, "{},", index)?;
        }
        for depth in depths {
            write!(writer, "{},", depth)?;
        }
        writeln!(writer)
    }
}

impl FrameSink for DepthCsvSink {
    fn store(&mut self, frame: &Frame, timestamp: f64) -> Result<()> {
        self.write_row(frame, timestamp).map_err(|e| {
            StreamError::sink_failed_with_source(
                format!("writing row to {}", self.path.display()),
                Box::new(e),
            )
        })
    }

    fn close(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(mut writer) => {
                writer.flush().map_err(|e| StreamError::file_error(self.path.clone(), e))
            }
            None => Ok(()),
        }
    }
}

impl Drop for DepthCsvSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
