// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Download orchestrator.
//!
//! Drives the download engine's status forward once per main loop
//! iteration:
//!
//! | Status     | Action                                           |
//! |------------|--------------------------------------------------|
//! | Requested  | schedule a start 3s out, move to NotStarted      |
//! | NotStarted | start once the scheduled time has passed         |
//! | InProgress | poll the engine                                  |
//! | Completed  | finish, confirm, move to Idle                    |
//!
//! A failed start is not retried until the download is requested again.

use log::{debug, info, warn};

use romcart_common::constants::{CATALOG_CACHE_FILENAME, DOWNLOAD_START_DELAY_MS};

use crate::error::DownloadError;
use crate::hal::{DownloadEngine, DownloadStatus};

/// What one [`DownloadOrchestrator::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStep {
    /// Nothing to do
    Idle,

    /// A request was scheduled to start at the given time
    Scheduled { start_at_ms: u64 },

    /// Waiting for the scheduled start time
    Waiting,

    Started,

    /// The engine refused to start.  Stays NotStarted until re-requested.
    StartFailed(DownloadError),

    Polled,

    /// A download completed and was committed
    Completed,

    /// A download completed but could not be committed
    Failed(DownloadError),
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOrchestrator {
    start_at_ms: Option<u64>,
}

impl DownloadOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// When a scheduled download will start, if one is scheduled
    pub fn start_at_ms(&self) -> Option<u64> {
        self.start_at_ms
    }

    /// Advances the engine by one step.
    pub fn step(&mut self, engine: &mut dyn DownloadEngine, now_ms: u64) -> DownloadStep {
        match engine.status() {
            DownloadStatus::Idle => DownloadStep::Idle,
            DownloadStatus::Requested => {
                let start_at_ms = now_ms + DOWNLOAD_START_DELAY_MS;
                self.start_at_ms = Some(start_at_ms);
                engine.set_status(DownloadStatus::NotStarted);
                debug!("Download scheduled for {}ms", start_at_ms);
                DownloadStep::Scheduled { start_at_ms }
            }
            DownloadStatus::NotStarted => match self.start_at_ms {
                Some(start_at_ms) if now_ms >= start_at_ms => {
                    self.start_at_ms = None;
                    match engine.start() {
                        Ok(()) => {
                            info!("Download started");
                            DownloadStep::Started
                        }
                        Err(e) => {
                            warn!("Error starting download: {}", e);
                            DownloadStep::StartFailed(e)
                        }
                    }
                }
                _ => DownloadStep::Waiting,
            },
            DownloadStatus::InProgress => {
                engine.poll();
                DownloadStep::Polled
            }
            DownloadStatus::Completed => {
                let result = engine.finish().and_then(|()| engine.confirm());
                engine.set_status(DownloadStatus::Idle);
                match result {
                    Ok(()) => {
                        info!("Download completed");
                        DownloadStep::Completed
                    }
                    Err(e) => {
                        warn!("Error completing download: {}", e);
                        DownloadStep::Failed(e)
                    }
                }
            }
        }
    }
}

/// Points the engine at `url` and marks the download as requested.  The
/// orchestrator starts it on a later step.
pub fn request_download(engine: &mut dyn DownloadEngine, url: &str, destination: &str) {
    info!("Download requested: {} -> {}", url, destination);
    engine.set_target(url, destination);
    engine.set_status(DownloadStatus::Requested);
}

/// Splits a URL into its scheme and host.
pub fn url_origin(url: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = url.trim().split_once("://")?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    if scheme.is_empty() || host.is_empty() {
        return None;
    }
    Some((scheme, host))
}

/// URL of a ROM image on the catalog's server: the catalog URL's scheme and
/// host with the percent-encoded filename as the path.
pub fn rom_download_url(catalog_url: &str, filename: &str) -> Result<String, DownloadError> {
    let (scheme, host) =
        url_origin(catalog_url).ok_or_else(|| DownloadError::InvalidUrl(catalog_url.to_string()))?;
    let path = filename
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok(format!("{}://{}/{}", scheme, host, path))
}

/// Where the remote catalog is downloaded to, and read from.
pub fn catalog_cache_path(roms_folder: &str) -> String {
    format!(
        "{}/{}",
        roms_folder.trim_end_matches('/'),
        CATALOG_CACHE_FILENAME
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ScriptedDownloads;

    fn requested() -> ScriptedDownloads {
        let mut engine = ScriptedDownloads::new();
        request_download(&mut engine, "http://host/a.rom", "/roms/a.rom");
        engine
    }

    #[test]
    fn requested_always_schedules() {
        let mut engine = requested();
        let mut orchestrator = DownloadOrchestrator::new();

        assert_eq!(
            orchestrator.step(&mut engine, 500),
            DownloadStep::Scheduled { start_at_ms: 3500 }
        );
        assert_eq!(engine.status(), DownloadStatus::NotStarted);
        assert_eq!(engine.starts(), 0);
    }

    #[test]
    fn never_starts_early() {
        let mut engine = requested();
        let mut orchestrator = DownloadOrchestrator::new();
        orchestrator.step(&mut engine, 0);

        for now in (0..DOWNLOAD_START_DELAY_MS).step_by(100) {
            assert_eq!(orchestrator.step(&mut engine, now), DownloadStep::Waiting);
        }
        assert_eq!(engine.starts(), 0);
        assert_eq!(
            orchestrator.step(&mut engine, DOWNLOAD_START_DELAY_MS),
            DownloadStep::Started
        );
        assert_eq!(engine.status(), DownloadStatus::InProgress);
    }

    #[test]
    fn repeated_requests_push_the_start_back() {
        let mut engine = requested();
        let mut orchestrator = DownloadOrchestrator::new();
        orchestrator.step(&mut engine, 0);
        orchestrator.step(&mut engine, 2000);

        request_download(&mut engine, "http://host/b.rom", "/roms/b.rom");
        orchestrator.step(&mut engine, 2500);
        assert_eq!(orchestrator.step(&mut engine, 3000), DownloadStep::Waiting);
        assert_eq!(orchestrator.step(&mut engine, 5500), DownloadStep::Started);
        assert_eq!(engine.starts(), 1);
    }

    #[test]
    fn start_failure_is_not_retried() {
        let mut engine = requested();
        engine.push_start(Err(DownloadError::NoNetwork));
        let mut orchestrator = DownloadOrchestrator::new();
        orchestrator.step(&mut engine, 0);

        assert_eq!(
            orchestrator.step(&mut engine, 3000),
            DownloadStep::StartFailed(DownloadError::NoNetwork)
        );
        assert_eq!(engine.status(), DownloadStatus::NotStarted);
        for now in [3100, 10_000, 100_000] {
            assert_eq!(orchestrator.step(&mut engine, now), DownloadStep::Waiting);
        }
        assert_eq!(engine.starts(), 1);
    }

    #[test]
    fn completion_happens_once() {
        let mut engine = requested().with_polls_to_complete(2);
        let mut orchestrator = DownloadOrchestrator::new();
        let mut completions = 0;
        for tick in 0..100 {
            if orchestrator.step(&mut engine, tick * 100) == DownloadStep::Completed {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(engine.status(), DownloadStatus::Idle);
        assert_eq!((engine.finishes(), engine.confirms()), (1, 1));
    }

    #[test]
    fn download_urls() {
        assert_eq!(
            url_origin("https://roms.example.com/catalog/roms.csv"),
            Some(("https", "roms.example.com"))
        );
        assert_eq!(url_origin("roms.example.com/roms.csv"), None);
        assert_eq!(url_origin("http:///roms.csv"), None);

        assert_eq!(
            rom_download_url("http://host:8080/x/roms.csv", "Space Game.rom").unwrap(),
            "http://host:8080/Space%20Game.rom"
        );
        assert!(matches!(
            rom_download_url("nonsense", "a.rom"),
            Err(DownloadError::InvalidUrl(_))
        ));
        assert_eq!(catalog_cache_path("/roms/"), "/roms/roms.csv");
    }
}
