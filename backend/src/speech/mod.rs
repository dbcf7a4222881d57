pub mod command;

use async_trait::async_trait;
use shared::Vegetable;
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;

use crate::config::SpeechConfig;

pub use command::CommandSpeaker;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Failed to start speech engine `{binary}`: {source}")]
    Spawn { binary: String, source: io::Error },
    #[error("Speech engine `{binary}` failed: {source}")]
    Wait { binary: String, source: io::Error },
    #[error("Speech engine `{binary}` exited with {status}")]
    Exit { binary: String, status: ExitStatus },
}

/// Speaks short announcements. One instance is shared by every request.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Used when speech is switched off. Only logs what would have been said.
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        log::info!("Speech disabled, skipping announcement: {}", text);
        Ok(())
    }
}

pub fn announcement(label: Vegetable) -> String {
    format!("The object is {}", label)
}

pub fn from_config(config: &SpeechConfig) -> Arc<dyn Speaker> {
    if config.enabled {
        log::info!("Speech announcements use `{}`", config.binary);
        Arc::new(CommandSpeaker::new(config))
    } else {
        log::info!("Speech announcements disabled");
        Arc::new(SilentSpeaker)
    }
}
