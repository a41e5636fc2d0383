//! In-process JobQueuePort backed by a multi-consumer channel.

use crate::domain::jobs::JobId;
use crate::error::{Error, Result};
use crate::ports::queue::JobQueuePort;
use async_channel::{Receiver, Sender};
use async_trait::async_trait;

#[derive(Clone)]
pub struct ChannelQueue {
    sender: Sender<JobId>,
    receiver: Receiver<JobId>,
}

impl ChannelQueue {
    pub fn unbounded() -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self { sender, receiver }
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl JobQueuePort for ChannelQueue {
    async fn enqueue_job(&self, job_id: JobId) -> Result<()> {
        self.sender
            .send(job_id)
            .await
            .map_err(|_| Error::internal("job queue is closed"))
    }

    async fn dequeue_job(&self) -> Option<JobId> {
        self.receiver.recv().await.ok()
    }

    fn close(&self) {
        self.sender.close();
    }
}
