use std::fmt;
use std::rc::Rc;

use crate::Result;
use crate::page::Page;

pub type TimerId = i64;

pub(crate) enum TimerCallback {
    Once(Box<dyn FnOnce(&mut Page) -> Result<()>>),
    Repeat(Rc<dyn Fn(&mut Page) -> Result<()>>),
}

/// How a failing callback surfaces on the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    /// `setTimeout`/`setInterval` callback: failures become `error` events.
    Timer,
    /// Resumption of an awaited operation: failures become
    /// `unhandledrejection` events.
    Continuation,
}

pub(crate) struct ScheduledTask {
    pub(crate) id: TimerId,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) interval_ms: Option<i64>,
    pub(crate) kind: TaskKind,
    pub(crate) callback: TimerCallback,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("due_at", &self.due_at)
            .field("order", &self.order)
            .field("interval_ms", &self.interval_ms)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub order: i64,
    pub interval_ms: Option<i64>,
}

#[derive(Debug)]
pub(crate) struct SchedulerState {
    pub(crate) task_queue: Vec<ScheduledTask>,
    pub(crate) now_ms: i64,
    pub(crate) timer_step_limit: usize,
    next_timer_id: TimerId,
    next_task_order: i64,
    pub(crate) running_timer_id: Option<TimerId>,
    pub(crate) running_timer_canceled: bool,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            task_queue: Vec::new(),
            now_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
            running_timer_id: None,
            running_timer_canceled: false,
        }
    }
}

impl SchedulerState {
    pub(crate) fn allocate_timer_id(&mut self) -> TimerId {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    pub(crate) fn allocate_task_order(&mut self) -> i64 {
        let order = self.next_task_order;
        self.next_task_order += 1;
        order
    }

    pub(crate) fn push(
        &mut self,
        delay_ms: i64,
        interval_ms: Option<i64>,
        kind: TaskKind,
        callback: TimerCallback,
    ) -> TimerId {
        let id = self.allocate_timer_id();
        let due_at = self.now_ms.saturating_add(delay_ms.max(0));
        let order = self.allocate_task_order();
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            interval_ms,
            kind,
            callback,
        });
        id
    }

    /// Removes a queued task; returns how many entries were dropped and
    /// whether the currently running interval was canceled.
    pub(crate) fn cancel(&mut self, id: TimerId) -> (usize, bool) {
        let before = self.task_queue.len();
        self.task_queue.retain(|task| task.id != id);
        let removed = before - self.task_queue.len();
        let running_canceled = self.running_timer_id == Some(id);
        if running_canceled {
            self.running_timer_canceled = true;
        }
        (removed, running_canceled)
    }

    pub(crate) fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    pub(crate) fn pending(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                interval_ms: task.interval_ms,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }
}
