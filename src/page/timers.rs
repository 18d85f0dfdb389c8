use std::rc::Rc;

use super::Page;
use super::dispatch::UncaughtKind;
use crate::scheduler::{PendingTimer, ScheduledTask, TaskKind, TimerCallback, TimerId};
use crate::{Error, Result};

impl Page {
    pub fn set_timeout<F>(&mut self, delay_ms: i64, callback: F) -> TimerId
    where
        F: FnOnce(&mut Page) -> Result<()> + 'static,
    {
        let id = self.scheduler.push(
            delay_ms,
            None,
            TaskKind::Timer,
            TimerCallback::Once(Box::new(callback)),
        );
        self.trace_timer_line(format!("[timer] schedule timeout id={id} delay_ms={delay_ms}"));
        id
    }

    pub fn set_interval<F>(&mut self, interval_ms: i64, callback: F) -> TimerId
    where
        F: Fn(&mut Page) -> Result<()> + 'static,
    {
        let interval_ms = interval_ms.max(0);
        let id = self.scheduler.push(
            interval_ms,
            Some(interval_ms),
            TaskKind::Timer,
            TimerCallback::Repeat(Rc::new(callback)),
        );
        self.trace_timer_line(format!(
            "[timer] schedule interval id={id} interval_ms={interval_ms}"
        ));
        id
    }

    /// Resumes an awaited operation after `delay_ms`. A failing continuation
    /// surfaces as `unhandledrejection` rather than `error`.
    pub fn schedule_continuation<F>(&mut self, delay_ms: i64, callback: F) -> TimerId
    where
        F: FnOnce(&mut Page) -> Result<()> + 'static,
    {
        let id = self.scheduler.push(
            delay_ms,
            None,
            TaskKind::Continuation,
            TimerCallback::Once(Box::new(callback)),
        );
        self.trace_timer_line(format!(
            "[timer] schedule continuation id={id} delay_ms={delay_ms}"
        ));
        id
    }

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    pub fn clear_timer(&mut self, timer_id: TimerId) -> bool {
        let (removed, running_canceled) = self.scheduler.cancel(timer_id);
        let existed = removed > 0 || running_canceled;
        self.trace_timer_line(format!("[timer] clear id={timer_id} existed={existed}"));
        existed
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.scheduler.task_queue.len();
        self.scheduler.task_queue.clear();
        if self.scheduler.running_timer_id.is_some() {
            self.scheduler.running_timer_canceled = true;
        }
        self.trace_timer_line(format!("[timer] clear_all cleared={cleared}"));
        cleared
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending()
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Runtime(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.scheduler.timer_step_limit = max_steps;
        Ok(())
    }

    /// Moves the clock forward, running every task that falls due on the way
    /// at its own due time.
    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms;
        let target = from.saturating_add(delta_ms);
        let ran = self.run_timer_queue(Some(target))?;
        self.scheduler.now_ms = target;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={delta_ms} from={from} to={target} ran_due={ran}"
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let from = self.scheduler.now_ms;
        if target_ms < from {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={from})"
            )));
        }
        let ran = self.run_timer_queue(Some(target_ms))?;
        self.scheduler.now_ms = target_ms;
        self.trace_timer_line(format!(
            "[timer] advance_to from={from} to={target_ms} ran_due={ran}"
        ));
        Ok(())
    }

    /// Runs until the queue is empty, advancing the clock to each task.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.scheduler.now_ms;
        let ran = self.run_timer_queue(None)?;
        self.trace_timer_line(format!(
            "[timer] flush from={from} to={} ran={ran}",
            self.scheduler.now_ms
        ));
        Ok(())
    }

    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(next_idx) = self.scheduler.next_task_index(None) else {
            self.trace_timer_line("[timer] run_next none".into());
            return Ok(false);
        };
        let task = self.scheduler.task_queue.remove(next_idx);
        self.execute_timer_task(task)?;
        Ok(true)
    }

    /// Runs tasks already due at the current time without moving the clock.
    pub fn run_due_timers(&mut self) -> Result<usize> {
        let now = self.scheduler.now_ms;
        let ran = self.run_timer_queue(Some(now))?;
        self.trace_timer_line(format!("[timer] run_due now_ms={now} ran={ran}"));
        Ok(ran)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.scheduler.next_task_index(due_limit) {
            steps += 1;
            if steps > self.scheduler.timer_step_limit {
                return Err(self.timer_step_limit_error(steps, due_limit));
            }
            let task = self.scheduler.task_queue.remove(next_idx);
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(&self, steps: usize, due_limit: Option<i64>) -> Error {
        let due_limit_desc = due_limit.map_or_else(|| "none".into(), |value| value.to_string());
        let next_task_desc = self
            .scheduler
            .next_task_index(due_limit)
            .and_then(|idx| self.scheduler.task_queue.get(idx))
            .map_or_else(
                || "none".into(),
                |task| {
                    format!(
                        "id={},due_at={},interval_ms={}",
                        task.id,
                        task.due_at,
                        task.interval_ms
                            .map_or_else(|| "none".into(), |value| value.to_string())
                    )
                },
            );
        Error::Runtime(format!(
            "timer queue exceeded max steps (possible uncleared interval): limit={}, steps={steps}, now_ms={}, due_limit={due_limit_desc}, pending_tasks={}, next_task={next_task_desc}",
            self.scheduler.timer_step_limit,
            self.scheduler.now_ms,
            self.scheduler.task_queue.len(),
        ))
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        if task.due_at > self.scheduler.now_ms {
            self.scheduler.now_ms = task.due_at;
        }
        self.trace_timer_line(format!(
            "[timer] run id={} due_at={} kind={:?} now_ms={}",
            task.id, task.due_at, task.kind, self.scheduler.now_ms
        ));

        self.scheduler.running_timer_id = Some(task.id);
        self.scheduler.running_timer_canceled = false;
        let (outcome, repeat) = match task.callback {
            TimerCallback::Once(callback) => (callback(self), None),
            TimerCallback::Repeat(callback) => {
                let outcome = callback(self);
                (outcome, Some(callback))
            }
        };
        let canceled = self.scheduler.running_timer_canceled;
        self.scheduler.running_timer_id = None;
        self.scheduler.running_timer_canceled = false;

        if let (Some(interval_ms), Some(callback)) = (task.interval_ms, repeat) {
            if !canceled {
                let due_at = task.due_at.saturating_add(interval_ms.max(1));
                let order = self.scheduler.allocate_task_order();
                self.scheduler.task_queue.push(ScheduledTask {
                    id: task.id,
                    due_at,
                    order,
                    interval_ms: Some(interval_ms),
                    kind: task.kind,
                    callback: TimerCallback::Repeat(callback),
                });
                self.trace_timer_line(format!(
                    "[timer] requeue id={} due_at={due_at} interval_ms={interval_ms}",
                    task.id
                ));
            }
        }

        if let Err(err) = outcome {
            let kind = match task.kind {
                TaskKind::Timer => UncaughtKind::Error,
                TaskKind::Continuation => UncaughtKind::Rejection,
            };
            self.report_uncaught(kind, &err.to_string())?;
        }
        Ok(())
    }
}
