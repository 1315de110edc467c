//! Append-only log of raw beacon frames.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::telemetry::BeaconFrame;

pub trait FrameLog: Send {
    /// Appends the raw response that produced `frame`.
    fn record(&mut self, frame: &BeaconFrame, raw: &str) -> io::Result<()>;
}

/// One CSV file per session, named after the first frame logged.
pub struct CsvFrameLog {
    folder: PathBuf,
    file: Option<PathBuf>,
}

impl CsvFrameLog {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            file: None,
        }
    }

    /// `Beacon_Log_<YYYYMMDDHHMMSS>_<serial>.csv`
    pub fn file_name(frame: &BeaconFrame) -> String {
        let datetime: String = frame
            .datetime
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("Beacon_Log_{}_{}.csv", datetime, frame.device_serial)
    }

    #[cfg(test)]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

impl FrameLog for CsvFrameLog {
    fn record(&mut self, frame: &BeaconFrame, raw: &str) -> io::Result<()> {
        let path = match &self.file {
            Some(path) => path.clone(),
            None => {
                let path = self.folder.join(Self::file_name(frame));
                File::create(&path)?;
                log::info!("Logging beacon frames to {}", path.display());
                self.file = Some(path.clone());
                path
            }
        };

        let mut file = OpenOptions::new().append(true).open(&path)?;
        file.write_all(raw.as_bytes())
    }
}
