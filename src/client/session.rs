// Per-file status tracking for one batch of uploads

use std::time::Duration;

use tokio::time::sleep;

use crate::types::UploadStatus;

/// Pause between the last upload finishing and the thanks message.
pub const UPLOADING_WAIT_UNTIL_FINISHED: Duration = Duration::from_millis(1000);
/// How long the thanks message stays up before the picker returns.
pub const DISPLAY_THANKS_MESSAGE_DURATION: Duration = Duration::from_millis(5000);

/// What the guest currently sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Picking,
    Uploading,
    Thanks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatusTrack {
    pub name: String,
    pub status: UploadStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub wait_until_finished: Duration,
    pub thanks_duration: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            wait_until_finished: UPLOADING_WAIT_UNTIL_FINISHED,
            thanks_duration: DISPLAY_THANKS_MESSAGE_DURATION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadSession {
    phase: Phase,
    statuses: Vec<UploadStatusTrack>,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Picking,
            statuses: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn statuses(&self) -> &[UploadStatusTrack] {
        &self.statuses
    }

    /// Start a batch: every selected file is marked uploading up front.
    pub fn begin<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = names
            .into_iter()
            .map(|name| UploadStatusTrack {
                name: name.into(),
                status: UploadStatus::Uploading,
            })
            .collect();
        self.phase = Phase::Uploading;
    }

    /// Replace one entry's status. Returns false for an unknown index.
    pub fn update_file_status(&mut self, index: usize, status: UploadStatus) -> bool {
        match self.statuses.get_mut(index) {
            Some(track) => {
                track.status = status;
                true
            }
            None => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.statuses.iter().all(|t| t.status.is_finished())
    }

    pub fn succeeded(&self) -> usize {
        self.count(UploadStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(UploadStatus::Failure)
    }

    fn count(&self, status: UploadStatus) -> usize {
        self.statuses.iter().filter(|t| t.status == status).count()
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Thanks;
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Picking;
        self.statuses.clear();
    }

    /// Wait, show thanks, wait again, then return to the picker.
    pub async fn wind_down<F>(&mut self, timings: Timings, mut on_change: F)
    where
        F: FnMut(&UploadSession),
    {
        sleep(timings.wait_until_finished).await;
        self.finish();
        on_change(self);

        sleep(timings.thanks_duration).await;
        self.reset();
        on_change(self);
    }
}
