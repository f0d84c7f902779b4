//! Unhandled rejection tracking.
//!
//! A rejected promise arms a watch according to the configured
//! [`RejectionPolicy`]. Running a rejection handler on the promise disarms
//! the watch on it and on every ancestor still holding one. A watch that
//! survives is reported to the configured handler.

use crate::config::{self, RejectionPolicy};
use crate::event_loop::{EventLoop, TimerId};
use crate::promise::Promise;
use crate::scheduler;
use crate::task_queue::Task;
use core_types::Value;
use tracing::warn;

/// Per-promise unhandled-rejection marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RejectionWatch {
    /// Nothing to report.
    Idle,
    /// A delayed report is armed on the event loop.
    Armed(TimerId),
    /// A report is queued on the run queue.
    Flagged,
}

pub(crate) fn add_unhandled_rejection(promise: &Promise, reason: Value) {
    match config::current_config().policy() {
        RejectionPolicy::Disabled => {}
        RejectionPolicy::Delayed(delay) => {
            let watched = promise.clone();
            let id = EventLoop::current().set_timeout(
                delay,
                Task::new(move || {
                    watched.replace_rejection_watch(RejectionWatch::Idle);
                    report(reason);
                    Ok(())
                }),
            );
            promise.replace_rejection_watch(RejectionWatch::Armed(id));
        }
        RejectionPolicy::NextFlush => {
            promise.replace_rejection_watch(RejectionWatch::Flagged);
            let watched = promise.clone();
            scheduler::schedule(move || {
                let watch = watched.replace_rejection_watch(RejectionWatch::Idle);
                if watch == RejectionWatch::Flagged {
                    report(reason);
                }
                Ok(())
            });
        }
    }
}

pub(crate) fn remove_unhandled_rejection(promise: &Promise) {
    let mut current = Some(promise.clone());
    while let Some(promise) = current {
        match promise.replace_rejection_watch(RejectionWatch::Idle) {
            RejectionWatch::Idle => break,
            RejectionWatch::Armed(id) => {
                EventLoop::current().clear_timeout(id);
            }
            RejectionWatch::Flagged => {}
        }
        current = promise.parent();
    }
}

fn report(reason: Value) {
    warn!(%reason, "unhandled promise rejection");
    config::handle_unhandled_rejection(reason);
}
