//! Save and load of application state through the pipeline.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use gtvault_core::{config::GtvaultConfig, naming::export_filename, ErrorKind, StateSnapshot};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::ExportApi;
use crate::error::{TransferError, TransferResult};
use crate::file;
use crate::flow::LoadFlow;
use crate::merge::MergeStrategy;
use crate::status::{load_failure_message, save_failure_message, user_message, TransferStatus};

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct SavedExport {
    pub path: PathBuf,
    pub size: usize,
}

pub struct TransferClient<A> {
    api: A,
    file_base: String,
    file_extension: String,
    state_version: String,
    max_file_bytes: u64,
    status: watch::Sender<TransferStatus>,
}

impl<A: ExportApi> TransferClient<A> {
    pub fn new(api: A, config: &GtvaultConfig) -> Self {
        let (status, _) = watch::channel(TransferStatus::Idle);
        Self {
            api,
            file_base: config.transfer.file_base.clone(),
            file_extension: config.transfer.file_extension.clone(),
            state_version: config.transfer.state_version.clone(),
            max_file_bytes: file::max_export_size(config.limits.max_payload_bytes),
            status,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Follow save/load progress.
    pub fn subscribe(&self) -> watch::Receiver<TransferStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> TransferStatus {
        self.status.borrow().clone()
    }

    fn set_status(&self, status: TransferStatus) {
        self.status.send_replace(status);
    }

    /// Snapshot the given state, seal it, and write the export into `dir`.
    pub async fn save(
        &self,
        watch_list: Vec<String>,
        completed_lessons: Vec<String>,
        dir: &Path,
    ) -> TransferResult<SavedExport> {
        self.set_status(TransferStatus::Loading);

        match self.save_inner(watch_list, completed_lessons, dir).await {
            Ok(saved) => {
                info!(path = %saved.path.display(), size = saved.size, "state exported");
                self.set_status(TransferStatus::Success(format!(
                    "State saved to {}",
                    saved.path.display()
                )));
                Ok(saved)
            }
            Err(err) => {
                warn!(error = %err, "state export failed");
                self.set_status(TransferStatus::Error(save_failure_message(&err)));
                Err(err)
            }
        }
    }

    async fn save_inner(
        &self,
        watch_list: Vec<String>,
        completed_lessons: Vec<String>,
        dir: &Path,
    ) -> TransferResult<SavedExport> {
        let now = Utc::now();
        let snapshot =
            StateSnapshot::capture(watch_list, completed_lessons, &self.state_version, now);
        let data = serde_json::to_value(&snapshot)
            .map_err(|e| TransferError::Protocol(format!("snapshot encoding: {e}")))?;

        let envelope = self.api.encrypt(&data).await?;
        let filename = export_filename(&self.file_base, &self.file_extension, now);
        let path = file::write_export(dir, &filename, &envelope).await?;

        Ok(SavedExport {
            path,
            size: envelope.len(),
        })
    }

    /// Read, validate, and open an export, then start the load flow against
    /// `current`.
    ///
    /// The returned flow is `Done` when `current` was empty and
    /// `PendingDecision` otherwise; see [`TransferClient::resolve`].
    pub async fn load(&self, path: &Path, current: &StateSnapshot) -> TransferResult<LoadFlow> {
        self.set_status(TransferStatus::Loading);

        let result: TransferResult<LoadFlow> = async {
            let bytes =
                file::read_export(path, &self.file_extension, self.max_file_bytes).await?;
            self.open(Bytes::from(bytes), current).await
        }
        .await;

        self.finish_load(result)
    }

    /// Like [`TransferClient::load`] for bytes already in memory.
    pub async fn load_bytes(
        &self,
        name: &str,
        bytes: Bytes,
        current: &StateSnapshot,
    ) -> TransferResult<LoadFlow> {
        self.set_status(TransferStatus::Loading);

        let result: TransferResult<LoadFlow> = async {
            file::check_name(Path::new(name), &self.file_extension)?;
            file::check_size(bytes.len() as u64, self.max_file_bytes)?;
            self.open(bytes, current).await
        }
        .await;

        self.finish_load(result)
    }

    async fn open(&self, envelope: Bytes, current: &StateSnapshot) -> TransferResult<LoadFlow> {
        let data = self.api.decrypt(envelope).await?;
        let loaded: StateSnapshot = serde_json::from_value(data).map_err(|e| {
            warn!(error = %e, "decrypted export is not a state snapshot");
            TransferError::invalid_file(
                ErrorKind::MalformedData,
                user_message(ErrorKind::MalformedData),
            )
        })?;

        let flow = LoadFlow::Idle.receive(current.clone(), loaded, Utc::now())?;
        if matches!(flow, LoadFlow::Applying { .. }) {
            Ok(flow.commit()?)
        } else {
            Ok(flow)
        }
    }

    fn finish_load(&self, result: TransferResult<LoadFlow>) -> TransferResult<LoadFlow> {
        match result {
            Ok(flow) => {
                if flow.is_pending() {
                    info!("loaded export awaits merge decision");
                    self.set_status(TransferStatus::Idle);
                } else {
                    info!("loaded export applied");
                    self.set_status(TransferStatus::Success("State loaded".into()));
                }
                Ok(flow)
            }
            Err(err) => {
                warn!(error = %err, "state load failed");
                self.set_status(TransferStatus::Error(load_failure_message(&err)));
                Err(err)
            }
        }
    }

    /// Settle a pending flow: `Some(strategy)` applies, `None` cancels.
    pub fn resolve(
        &self,
        flow: LoadFlow,
        decision: Option<MergeStrategy>,
    ) -> TransferResult<LoadFlow> {
        let flow = match decision {
            Some(strategy) => flow.choose(strategy, Utc::now())?.commit()?,
            None => flow.cancel()?,
        };

        match &flow {
            LoadFlow::Done { .. } => {
                self.set_status(TransferStatus::Success("State loaded".into()))
            }
            _ => {
                info!("load cancelled");
                self.set_status(TransferStatus::Idle);
            }
        }
        Ok(flow)
    }
}
