use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Duration;

use log::trace;

pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(10);
pub const DEFAULT_TOTAL_DURATION: Duration = Duration::from_millis(200);

/// Anything with a vertical scroll position.
pub trait ScrollSurface {
    fn scroll_offset(&self) -> f64;
    fn set_scroll_offset(&self, offset: f64);
}

/// Handle to a repeating task. Cancelling a task that already stopped itself
/// must be harmless.
pub trait TaskHandle {
    fn cancel(self);
}

/// Runs a callback repeatedly until it returns `Break` or its handle is cancelled.
pub trait Scheduler {
    type Handle: TaskHandle;

    fn every(&self, interval: Duration, task: Box<dyn FnMut() -> ControlFlow<()>>)
        -> Self::Handle;
}

/// One in-flight scroll: each tick closes `step / remaining` of the gap to
/// the target, so the last tick of the budget lands on it exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnimation {
    target: f64,
    step_ms: f64,
    remaining_ms: f64,
}

impl ScrollAnimation {
    pub fn new(target: f64, step: Duration, total: Duration) -> Self {
        Self {
            target,
            step_ms: step.as_micros() as f64 / 1000.0,
            remaining_ms: total.as_micros() as f64 / 1000.0,
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn remaining_ms(&self) -> f64 {
        self.remaining_ms
    }

    pub fn tick(&mut self, surface: &dyn ScrollSurface) -> ControlFlow<()> {
        if self.remaining_ms <= 0.0 {
            return ControlFlow::Break(());
        }

        let current = surface.scroll_offset();
        let distance = self.target - current;
        // Capped so a budget that is not a multiple of the step cannot overshoot.
        let fraction = (self.step_ms / self.remaining_ms).min(1.0);
        surface.set_scroll_offset(current + distance * fraction);
        self.remaining_ms -= self.step_ms;

        trace!(
            "scroll tick: {:.1} -> {:.1}, {:.0}ms left",
            current,
            self.target,
            self.remaining_ms
        );

        if self.remaining_ms <= 0.0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Eases a surface toward a target offset over a fixed time budget.
/// Arming again cancels the running animation and restarts the budget.
pub struct ScrollAnimator<S: Scheduler> {
    scheduler: S,
    step: Duration,
    total: Duration,
    current: Rc<RefCell<Option<ScrollAnimation>>>,
    handle: Option<S::Handle>,
}

impl<S: Scheduler> ScrollAnimator<S> {
    pub fn new(scheduler: S, step: Duration, total: Duration) -> Self {
        Self {
            scheduler,
            step: step.max(Duration::from_millis(1)),
            total,
            current: Rc::new(RefCell::new(None)),
            handle: None,
        }
    }

    pub fn arm(&mut self, surface: Rc<dyn ScrollSurface>, target: f64) {
        self.cancel();

        if self.total.is_zero() {
            surface.set_scroll_offset(target);
            return;
        }

        *self.current.borrow_mut() = Some(ScrollAnimation::new(target, self.step, self.total));

        let current = Rc::clone(&self.current);
        let handle = self.scheduler.every(
            self.step,
            Box::new(move || {
                let mut slot = current.borrow_mut();
                let flow = match slot.as_mut() {
                    Some(animation) => animation.tick(surface.as_ref()),
                    None => ControlFlow::Break(()),
                };
                if flow.is_break() {
                    *slot = None;
                }
                flow
            }),
        );
        self.handle = Some(handle);
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
        *self.current.borrow_mut() = None;
    }

    pub fn is_running(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn target(&self) -> Option<f64> {
        self.current.borrow().map(|animation| animation.target())
    }
}

impl<S: Scheduler> Drop for ScrollAnimator<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct ManualTask {
    id: u64,
    task: Box<dyn FnMut() -> ControlFlow<()>>,
}

#[derive(Default)]
struct ManualQueue {
    tasks: Vec<ManualTask>,
    cancelled: Vec<u64>,
}

/// Scheduler driven by explicit [`ManualScheduler::tick`] calls instead of a
/// clock, for headless hosts and tests. Intervals are ignored: one call fires
/// every live task once.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<ManualQueue>>,
    next_id: Rc<Cell<u64>>,
}

pub struct ManualHandle {
    id: u64,
    queue: Rc<RefCell<ManualQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire every live task once. Returns how many ran.
    pub fn tick(&self) -> usize {
        let tasks = std::mem::take(&mut self.queue.borrow_mut().tasks);
        let ran = tasks.len();

        let mut kept = Vec::with_capacity(tasks.len());
        for mut entry in tasks {
            if (entry.task)().is_continue() {
                kept.push(entry);
            }
        }

        let mut queue = self.queue.borrow_mut();
        let cancelled = std::mem::take(&mut queue.cancelled);
        kept.retain(|entry| !cancelled.contains(&entry.id));
        // Tasks scheduled during this tick go after the survivors.
        kept.append(&mut queue.tasks);
        queue.tasks = kept;

        ran
    }

    /// Keep ticking until nothing is scheduled or `limit` ticks ran.
    pub fn run_until_idle(&self, limit: usize) -> usize {
        let mut ticks = 0;
        while ticks < limit && self.pending() > 0 {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().tasks.len()
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn every(
        &self,
        _interval: Duration,
        task: Box<dyn FnMut() -> ControlFlow<()>>,
    ) -> Self::Handle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.queue.borrow_mut().tasks.push(ManualTask { id, task });
        ManualHandle {
            id,
            queue: Rc::clone(&self.queue),
        }
    }
}

impl TaskHandle for ManualHandle {
    fn cancel(self) {
        let mut queue = self.queue.borrow_mut();
        let before = queue.tasks.len();
        queue.tasks.retain(|entry| entry.id != self.id);
        if queue.tasks.len() == before {
            // Either already finished or currently being ticked.
            queue.cancelled.push(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Surface {
        offset: Cell<f64>,
    }

    impl ScrollSurface for Surface {
        fn scroll_offset(&self) -> f64 {
            self.offset.get()
        }

        fn set_scroll_offset(&self, offset: f64) {
            self.offset.set(offset);
        }
    }

    #[test]
    fn test_animation_converges_in_budget() {
        let surface = Surface::default();
        let mut animation = ScrollAnimation::new(100.0, DEFAULT_STEP_INTERVAL, DEFAULT_TOTAL_DURATION);

        for _ in 0..19 {
            assert!(animation.tick(&surface).is_continue());
        }
        assert!(animation.tick(&surface).is_break());
        assert!(animation.remaining_ms().abs() < 1e-9);
        assert!((surface.scroll_offset() - 100.0).abs() < 1e-9);

        // Terminal state: further ticks do nothing.
        surface.set_scroll_offset(42.0);
        assert!(animation.tick(&surface).is_break());
        assert_eq!(surface.scroll_offset(), 42.0);
    }

    #[test]
    fn test_animation_first_tick_fraction() {
        let surface = Surface::default();
        let mut animation = ScrollAnimation::new(100.0, DEFAULT_STEP_INTERVAL, DEFAULT_TOTAL_DURATION);
        animation.tick(&surface);
        assert!((surface.scroll_offset() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_animation_uneven_budget_does_not_overshoot() {
        let surface = Surface::default();
        let mut animation =
            ScrollAnimation::new(50.0, Duration::from_millis(10), Duration::from_millis(25));
        while animation.tick(&surface).is_continue() {}
        assert!((surface.scroll_offset() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_animator_self_cancels() {
        let scheduler = ManualScheduler::new();
        let surface = Rc::new(Surface::default());
        let mut animator =
            ScrollAnimator::new(scheduler.clone(), DEFAULT_STEP_INTERVAL, DEFAULT_TOTAL_DURATION);

        animator.arm(surface.clone(), 100.0);
        assert!(animator.is_running());
        assert_eq!(animator.target(), Some(100.0));

        for _ in 0..20 {
            scheduler.tick();
        }
        assert_eq!(scheduler.pending(), 0);
        assert!(!animator.is_running());
        assert!((surface.scroll_offset() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rearm_replaces_running_animation() {
        let scheduler = ManualScheduler::new();
        let surface = Rc::new(Surface::default());
        let mut animator =
            ScrollAnimator::new(scheduler.clone(), DEFAULT_STEP_INTERVAL, DEFAULT_TOTAL_DURATION);

        animator.arm(surface.clone(), 100.0);
        for _ in 0..5 {
            scheduler.tick();
        }
        animator.arm(surface.clone(), -40.0);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(animator.target(), Some(-40.0));

        assert_eq!(scheduler.run_until_idle(100), 20);
        assert!((surface.scroll_offset() + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_jumps() {
        let scheduler = ManualScheduler::new();
        let surface = Rc::new(Surface::default());
        let mut animator = ScrollAnimator::new(scheduler.clone(), DEFAULT_STEP_INTERVAL, Duration::ZERO);

        animator.arm(surface.clone(), 30.0);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(surface.scroll_offset(), 30.0);
    }

    #[test]
    fn test_cancel_after_finish_is_harmless() {
        let scheduler = ManualScheduler::new();
        let stop_now = scheduler.every(Duration::from_millis(1), Box::new(|| ControlFlow::Break(())));
        let keep = scheduler.every(Duration::from_millis(1), Box::new(|| ControlFlow::Continue(())));
        assert_eq!(scheduler.tick(), 2);
        assert_eq!(scheduler.pending(), 1);

        stop_now.cancel();
        assert_eq!(scheduler.pending(), 1);
        keep.cancel();
        assert_eq!(scheduler.pending(), 0);
    }
}
