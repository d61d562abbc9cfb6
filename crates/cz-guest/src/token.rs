//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Exclusive execution token guarding the guest interpreter."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
//! Permission to run guest code, held by at most one native thread at a time.
//!
//! The token owns the interpreter state. While nobody runs guest code the
//! state is *parked* inside the token; [`ExecutionToken::acquire`] resumes it
//! on the calling thread and the returned [`TokenGuard`] parks it again on
//! drop. Waiters are served strictly in arrival order.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Reasons an acquisition is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("execution token already held by the calling thread")]
    Reentrant,
    #[error("execution token was finalized")]
    Finalized,
}

struct TokenState<T> {
    parked: Option<T>,
    holder: Option<ThreadId>,
    next_ticket: u64,
    serving: u64,
    finalized: bool,
}

/// Exclusive, FIFO, non-reentrant runner permission wrapping a payload `T`.
pub struct ExecutionToken<T> {
    state: Mutex<TokenState<T>>,
    turn: Condvar,
}

impl<T> ExecutionToken<T> {
    /// Create a token with `payload` parked and nobody holding it.
    pub fn new(payload: T) -> Self {
        Self {
            state: Mutex::new(TokenState {
                parked: Some(payload),
                holder: None,
                next_ticket: 0,
                serving: 0,
                finalized: false,
            }),
            turn: Condvar::new(),
        }
    }

    /// Block until the calling thread is the exclusive runner.
    ///
    /// There is no timeout. A thread that already holds the token gets
    /// [`TokenError::Reentrant`] instead of deadlocking.
    pub fn acquire(&self) -> Result<TokenGuard<'_, T>, TokenError> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.finalized {
            return Err(TokenError::Finalized);
        }
        if state.holder == Some(me) {
            return Err(TokenError::Reentrant);
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;

        while !state.finalized && (state.serving != ticket || state.holder.is_some()) {
            self.turn.wait(&mut state);
        }
        if state.finalized {
            return Err(TokenError::Finalized);
        }

        state.serving += 1;
        state.holder = Some(me);
        let payload = state.parked.take();

        Ok(TokenGuard {
            token: self,
            payload,
            _not_send: PhantomData,
        })
    }

    /// Acquire, run `f` against the payload, release.
    pub fn enter<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, TokenError> {
        let mut guard = self.acquire()?;
        Ok(f(&mut guard))
    }

    /// Mark the token finalized and take the payload out of it.
    ///
    /// Blocks like [`acquire`](Self::acquire) so the payload is never taken
    /// from under a running thread.
    pub fn finalize(&self) -> Result<T, TokenError> {
        let mut guard = self.acquire()?;
        let payload = guard.payload.take();

        let mut state = self.state.lock();
        state.finalized = true;
        self.turn.notify_all();
        drop(state);
        drop(guard);

        payload.ok_or(TokenError::Finalized)
    }
}

/// Scoped runner permission. Dropping it parks the payload and hands the token
/// to the next waiter.
///
/// The guard is neither `Send` nor `Sync`: release always happens on the thread
/// that acquired.
pub struct TokenGuard<'a, T> {
    token: &'a ExecutionToken<T>,
    payload: Option<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for TokenGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.payload.as_ref() {
            Some(payload) => payload,
            None => unreachable!("token guard outlived its payload"),
        }
    }
}

impl<T> DerefMut for TokenGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.payload.as_mut() {
            Some(payload) => payload,
            None => unreachable!("token guard outlived its payload"),
        }
    }
}

impl<T> Drop for TokenGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.token.state.lock();
        if let Some(payload) = self.payload.take() {
            state.parked = Some(payload);
        }
        state.holder = None;
        self.token.turn.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Arc, Barrier};
    use std::time::Duration;

    #[test]
    fn nested_acquire_is_rejected() {
        let token = ExecutionToken::new(0_u32);
        let guard = token.acquire().unwrap();
        assert_eq!(token.acquire().err(), Some(TokenError::Reentrant));
        drop(guard);
        assert!(token.acquire().is_ok());
    }

    #[test]
    fn payload_changes_survive_release() {
        let token = ExecutionToken::new(Vec::<u32>::new());
        token.enter(|v| v.push(1)).unwrap();
        token.enter(|v| v.push(2)).unwrap();
        assert_eq!(token.finalize(), Ok(vec![1, 2]));
    }

    #[test]
    fn acquire_after_finalize_is_rejected() {
        let token = Arc::new(ExecutionToken::new(5_u8));
        assert_eq!(token.finalize(), Ok(5));
        assert_eq!(token.acquire().err(), Some(TokenError::Finalized));
        assert_eq!(token.finalize(), Err(TokenError::Finalized));
    }

    #[test]
    fn only_one_thread_runs_at_a_time() {
        let token = Arc::new(ExecutionToken::new(0_u64));
        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let token = token.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..1000 {
                        let mut guard = token.acquire().unwrap();
                        let seen = *guard;
                        thread::yield_now();
                        *guard = seen + 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(token.enter(|n| *n).unwrap(), 4000);
    }

    #[test]
    fn waiters_are_served_in_arrival_order() {
        let token = Arc::new(ExecutionToken::new(Vec::<usize>::new()));
        let guard = token.acquire().unwrap();
        let (queued_tx, queued_rx) = mpsc::channel();

        let mut handles = Vec::new();
        for id in 0..3 {
            let waiter = token.clone();
            let queued_tx = queued_tx.clone();
            handles.push(thread::spawn(move || {
                queued_tx.send(()).unwrap();
                waiter.enter(|order| order.push(id)).unwrap();
            }));
            queued_rx.recv().unwrap();
            // Let the waiter take its ticket before the next one arrives.
            while token.state.lock().next_ticket < id as u64 + 2 {
                thread::sleep(Duration::from_millis(1));
            }
        }

        drop(guard);
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(token.enter(|order| order.clone()).unwrap(), vec![0, 1, 2]);
    }
}
