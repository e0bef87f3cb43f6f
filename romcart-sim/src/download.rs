// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! HTTP download engine.  A started transfer runs on its own thread; `poll`
//! collects the result and `finish` writes it to the SD card directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context, Result};
use bytes::Bytes;
use log::{debug, info, warn};
use romcart_core::error::{DownloadError, StorageError};
use romcart_core::hal::{DownloadEngine, DownloadStatus};

use crate::storage::host_path;

type Transfer = Result<Bytes, String>;

#[derive(Debug, Clone)]
struct Target {
    url: String,
    destination: String,
}

pub struct HttpDownloads {
    root: PathBuf,
    client: reqwest::blocking::Client,
    status: DownloadStatus,
    target: Option<Target>,
    transfer: Option<Receiver<Transfer>>,
    body: Option<Transfer>,
}

fn fetch(client: &reqwest::blocking::Client, url: &str) -> Transfer {
    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(|e| format!("Failed to download {}: {}", url, e))?;
    response
        .bytes()
        .map_err(|e| format!("Failed to read response: {}", e))
}

impl HttpDownloads {
    pub fn new(root: &Path) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("romcart-sim/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            root: root.to_path_buf(),
            client,
            status: DownloadStatus::Idle,
            target: None,
            transfer: None,
            body: None,
        })
    }

    fn store(&self, destination: &str, body: &Bytes) -> Result<(), StorageError> {
        let path = host_path(&self.root, destination);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Write(e.to_string()))?;
        }
        fs::write(&path, body).map_err(|e| StorageError::Write(e.to_string()))?;
        info!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }
}

impl DownloadEngine for HttpDownloads {
    fn set_target(&mut self, url: &str, destination: &str) {
        debug!("Download target {} -> {}", url, destination);
        self.target = Some(Target {
            url: url.to_string(),
            destination: destination.to_string(),
        });
    }

    fn start(&mut self) -> Result<(), DownloadError> {
        let target = self.target.clone().ok_or(DownloadError::NoTarget)?;
        if !(target.url.starts_with("http://") || target.url.starts_with("https://")) {
            return Err(DownloadError::InvalidUrl(target.url));
        }

        let (tx, rx) = mpsc::channel();
        let client = self.client.clone();
        thread::spawn(move || {
            // The receiver may be gone if the device reset mid-transfer
            let _ = tx.send(fetch(&client, &target.url));
        });

        self.body = None;
        self.transfer = Some(rx);
        self.status = DownloadStatus::InProgress;
        Ok(())
    }

    fn poll(&mut self) {
        let Some(transfer) = &self.transfer else {
            return;
        };
        let result = match transfer.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err("transfer ended without a result".to_string()),
        };
        self.transfer = None;
        self.body = Some(result);
        self.status = DownloadStatus::Completed;
    }

    fn status(&self) -> DownloadStatus {
        self.status
    }

    fn set_status(&mut self, status: DownloadStatus) {
        self.status = status;
    }

    fn finish(&mut self) -> Result<(), DownloadError> {
        let target = self.target.clone().ok_or(DownloadError::NoTarget)?;
        match self.body.take() {
            Some(Ok(body)) => Ok(self.store(&target.destination, &body)?),
            Some(Err(e)) => {
                warn!("{}", e);
                Err(DownloadError::Transfer(e))
            }
            None => Err(DownloadError::Transfer("nothing downloaded".to_string())),
        }
    }

    fn confirm(&mut self) -> Result<(), DownloadError> {
        self.target = None;
        Ok(())
    }
}
