use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::{SpeechError, Speaker};
use crate::config::SpeechConfig;

/// Speaks through a command-line engine such as `espeak-ng`.
///
/// Utterances never overlap: the whole announcement runs under one lock. The
/// lock also owns the running child process, so an utterance abandoned by a
/// cancelled request is still there for the next caller to kill before it
/// starts speaking.
pub struct CommandSpeaker {
    binary: String,
    voice: Option<String>,
    rate: Option<u32>,
    in_flight: Mutex<Option<Child>>,
}

impl CommandSpeaker {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            voice: config.voice.clone(),
            rate: config.rate,
            in_flight: Mutex::new(None),
        }
    }

    fn command(&self, text: &str) -> Command {
        let mut command = Command::new(&self.binary);
        if let Some(voice) = &self.voice {
            command.arg("-v").arg(voice);
        }
        if let Some(rate) = self.rate {
            command.arg("-s").arg(rate.to_string());
        }
        command
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let mut slot = self.in_flight.lock().await;

        if let Some(mut abandoned) = slot.take() {
            log::warn!("Interrupting unfinished announcement");
            if let Err(e) = abandoned.kill().await {
                log::warn!("Failed to stop previous announcement: {}", e);
            }
        }

        let child = self
            .command(text)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let status = slot
            .insert(child)
            .wait()
            .await
            .map_err(|source| SpeechError::Wait {
                binary: self.binary.clone(),
                source,
            })?;
        *slot = None;

        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Exit {
                binary: self.binary.clone(),
                status,
            })
        }
    }
}
