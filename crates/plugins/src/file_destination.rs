//! 파일 목적지
//!
//! `file` 옵션의 경로에 메시지를 한 줄씩 덧붙입니다. 파일이 없으면
//! `open`에서 생성합니다.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ironhook_contract::{Destination, Lifecycle, PluginError};
use ironhook_core::options::OptionLookup;

pub const CLASS: &str = "SimpleFile";

#[derive(Debug, Default)]
pub struct SimpleFileDestination {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    open_handles: Arc<AtomicUsize>,
}

impl SimpleFileDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 열려 있는 파일 핸들 수를 추적하는 카운터
    pub fn handle_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.open_handles)
    }

    fn path(&self) -> Result<&PathBuf, PluginError> {
        self.path
            .as_ref()
            .ok_or_else(|| PluginError::missing_option("file"))
    }
}

impl Lifecycle for SimpleFileDestination {
    fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
        let file = options.require("file")?;
        tracing::debug!(class = CLASS, file = %file, "init");
        self.path = Some(PathBuf::from(file));
        Ok(())
    }

    fn deinit(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(class = CLASS, error = %e, "close on deinit failed");
        }
    }
}

impl Destination for SimpleFileDestination {
    fn open(&mut self) -> Result<(), PluginError> {
        if self.is_opened() {
            self.close()?;
        }
        let path = self.path()?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::debug!(class = CLASS, file = %path.display(), "opened");
        self.writer = Some(BufWriter::new(file));
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), PluginError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
        writer.flush()?;
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.writer.is_some()
    }

    fn send(&mut self, payload: &str) -> Result<(), PluginError> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "destination file is not open")
        })?;
        writer.write_all(payload.as_bytes())?;
        if !payload.ends_with('\n') {
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    fn name_by_uniq_options(&self) -> String {
        CLASS.to_owned()
    }
}
