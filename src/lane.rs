use libmsqueue::{parker::Parker, AllocError, MsQueue};

use crate::record::WorkItem;

/// A work queue together with the parker of the one consumer draining it.
#[derive(Debug, Default)]
pub struct WorkLane<P> {
    queue: MsQueue<WorkItem>,
    parker: P,
}

impl<P: Parker> WorkLane<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_new() -> Result<Self, AllocError<()>> {
        Ok(Self {
            queue: MsQueue::try_new()?,
            parker: P::default(),
        })
    }

    pub fn queue(&self) -> &MsQueue<WorkItem> {
        &self.queue
    }

    pub fn parker(&self) -> &P {
        &self.parker
    }
}
