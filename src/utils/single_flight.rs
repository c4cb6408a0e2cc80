use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

struct Slot<T> {
    generation: u64,
    inflight: Option<Shared<BoxFuture<'static, T>>>,
}

/// Coalesces concurrent calls onto one in-flight future.
///
/// The first caller starts the work; callers arriving while it runs await the
/// same output. Once it resolves the slot is emptied, so a later call (for
/// example after a failure) starts fresh.
pub struct SingleFlight<T: Clone> {
    slot: Mutex<Slot<T>>,
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        SingleFlight {
            slot: Mutex::new(Slot {
                generation: 0,
                inflight: None,
            }),
        }
    }

    pub async fn run<F>(&self, make: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let (generation, shared) = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match &slot.inflight {
                Some(shared) => (slot.generation, shared.clone()),
                None => {
                    slot.generation += 1;
                    let shared = make().shared();
                    slot.inflight = Some(shared.clone());
                    (slot.generation, shared)
                }
            }
        };

        let output = shared.await;

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.generation == generation {
            slot.inflight = None;
        }
        output
    }

    pub fn is_inflight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .inflight
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::*;

    fn counted(calls: Arc<AtomicUsize>, result: Result<(), String>) -> BoxFuture<'static, Result<(), String>> {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            result
        }
        .boxed()
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_call() {
        let flight = Arc::new(SingleFlight::<Result<(), String>>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flight = flight.clone();
                let calls = calls.clone();
                tokio::spawn(async move { flight.run(|| counted(calls, Ok(()))).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flight.is_inflight());
    }

    #[tokio::test]
    async fn failure_clears_slot_so_next_call_retries() {
        let flight = SingleFlight::<Result<(), String>>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = flight
            .run(|| counted(calls.clone(), Err("bad credentials".to_string())))
            .await;
        assert_eq!(first, Err("bad credentials".to_string()));

        let second = flight.run(|| counted(calls.clone(), Ok(()))).await;
        assert_eq!(second, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
