use std::{path::PathBuf, time::Duration, time::SystemTime};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::{debug, info, trace};

use crate::supergraph::base::{LoadSupergraphError, ReloadSupergraphResult, SupergraphLoader};

pub struct SupergraphFileLoader {
    file_path: PathBuf,
    poll_interval: Option<Duration>,
    modified_time: RwLock<Option<SystemTime>>,
}

impl SupergraphFileLoader {
    pub fn new(
        file_path: impl Into<PathBuf>,
        poll_interval: Option<Duration>,
    ) -> Result<Self, LoadSupergraphError> {
        let file_path = file_path.into();
        debug!(
            file_path = %file_path.display(),
            "Creating supergraph source from a file",
        );

        if poll_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(LoadSupergraphError::InvalidConfiguration(
                "supergraph poll interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            file_path,
            poll_interval,
            modified_time: RwLock::new(None),
        })
    }

    async fn load_with_polling(&self) -> Result<ReloadSupergraphResult, LoadSupergraphError> {
        let file_metadata = fs::metadata(&self.file_path).await?;
        let current_time = file_metadata.modified()?;
        let mut modified_time = self.modified_time.write().await;

        match *modified_time {
            Some(previous) if current_time <= previous => Ok(ReloadSupergraphResult::Unchanged),
            _ => {
                let content = fs::read_to_string(&self.file_path).await?;
                *modified_time = Some(current_time);

                Ok(ReloadSupergraphResult::Changed { new_sdl: content })
            }
        }
    }

    async fn load_without_polling(&self) -> Result<ReloadSupergraphResult, LoadSupergraphError> {
        let content = fs::read_to_string(&self.file_path).await?;

        Ok(ReloadSupergraphResult::Changed { new_sdl: content })
    }
}

#[async_trait]
impl SupergraphLoader for SupergraphFileLoader {
    fn source_name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<ReloadSupergraphResult, LoadSupergraphError> {
        let result = if self.poll_interval.is_some() {
            debug!(
                file_path = %self.file_path.display(),
                "Loading supergraph from file (polling enabled)",
            );

            self.load_with_polling().await
        } else {
            debug!(
                file_path = %self.file_path.display(),
                "Loading supergraph from file (polling disabled)",
            );

            self.load_without_polling().await
        };

        if result.is_ok() {
            info!(
                file_path = %self.file_path.display(),
                "Supergraph successfully loaded from a local file"
            );
        }

        trace!(
            file_path = %self.file_path.display(),
            "Supergraph loaded from file, result: {:?}",
            result
        );

        result
    }

    fn reload_interval(&self) -> Option<Duration> {
        self.poll_interval
    }
}
