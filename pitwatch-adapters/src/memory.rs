//! In-process broker backed by tokio primitives.
//!
//! This adapter implements the full delivery contract - durable-until-acked
//! queues, redelivery of unsettled messages, competing consumers - entirely
//! in memory. It exists so the ack discipline and the worker loop can be
//! exercised in tests and demos without a running broker; it is not a
//! production transport (nothing survives the process).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::{Broker, BrokerError, Delivery, Subscription};

/// An in-process broker. Cheap to clone; clones share the same queues.
#[derive(Debug, Default, Clone)]
pub struct MemoryBroker {
    queues: Arc<Mutex<HashMap<String, Arc<QueueState>>>>,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
}

impl QueueState {
    fn ready(&self) -> MutexGuard<'_, VecDeque<Vec<u8>>> {
        self.ready.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push_back(&self, payload: Vec<u8>) {
        self.ready().push_back(payload);
        self.notify.notify_one();
    }

    /// Requeue at the front so a redelivered message is seen before newer
    /// backlog, matching broker requeue behavior.
    fn push_front(&self, payload: Vec<u8>) {
        self.ready().push_front(payload);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Vec<u8>> {
        self.ready().pop_front()
    }
}

impl MemoryBroker {
    /// Create a broker with no queues declared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages ready in a queue, for tests and diagnostics.
    pub fn depth(&self, queue: &str) -> Option<usize> {
        let queues = self.queues.lock().unwrap_or_else(|p| p.into_inner());
        queues.get(queue).map(|q| q.ready().len())
    }

    fn get(&self, queue: &str) -> Result<Arc<QueueState>, BrokerError> {
        let queues = self.queues.lock().unwrap_or_else(|p| p.into_inner());
        queues
            .get(queue)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownQueue(queue.to_string()))
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let mut queues = self.queues.lock().unwrap_or_else(|p| p.into_inner());
        queues.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn reset_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let mut queues = self.queues.lock().unwrap_or_else(|p| p.into_inner());
        queues.insert(queue.to_string(), Arc::default());
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        self.get(queue)?.push_back(payload.to_vec());
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
        _consumer_tag: &str,
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        let state = self.get(queue)?;
        Ok(Box::new(MemorySubscription {
            name: queue.to_string(),
            queue: state,
            prefetch: Arc::new(Semaphore::new(1)),
            closed: false,
        }))
    }
}

#[derive(Debug)]
struct MemorySubscription {
    name: String,
    queue: Arc<QueueState>,
    /// One permit: at most one unacknowledged delivery per subscription.
    prefetch: Arc<Semaphore>,
    closed: bool,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Result<Option<Box<dyn Delivery>>, BrokerError> {
        if self.closed {
            return Ok(None);
        }
        // Prefetch = 1: wait until the outstanding delivery is settled
        // (acked, discarded, or dropped) before taking another message.
        let permit = Arc::clone(&self.prefetch)
            .acquire_owned()
            .await
            .map_err(|_| BrokerError::Consume {
                queue: self.name.clone(),
                reason: "subscription closed".to_string(),
            })?;
        loop {
            if self.closed {
                return Ok(None);
            }
            // Register for a wakeup before checking, so a push between the
            // check and the await is not lost.
            let notified = self.queue.notify.notified();
            if let Some(payload) = self.queue.pop() {
                return Ok(Some(Box::new(MemoryDelivery {
                    payload,
                    queue: Arc::clone(&self.queue),
                    settled: false,
                    _permit: permit,
                })));
            }
            notified.await;
        }
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.closed = true;
        Ok(())
    }
}

struct MemoryDelivery {
    payload: Vec<u8>,
    queue: Arc<QueueState>,
    settled: bool,
    /// Held until the delivery is settled or dropped; releasing it lets the
    /// owning subscription take its next message.
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl Delivery for MemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(mut self: Box<Self>) -> Result<(), BrokerError> {
        self.settled = true;
        Ok(())
    }

    async fn discard(mut self: Box<Self>) -> Result<(), BrokerError> {
        self.settled = true;
        Ok(())
    }
}

impl Drop for MemoryDelivery {
    fn drop(&mut self) {
        // Dropping without settling models a consumer crash: the message
        // goes back to the queue for another instance.
        if !self.settled {
            self.queue.push_front(std::mem::take(&mut self.payload));
        }
    }
}
