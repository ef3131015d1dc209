use std::collections::VecDeque;
use std::time::Duration;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Wait(usize),
    Acquire(usize),
    Record(usize, u32),
    Uniforms(usize),
    Submit(usize),
    Present(usize, u32),
    Recreate,
}

/// Scripted backend that logs every call the scheduler makes
struct MockBackend {
    calls: Vec<Call>,
    acquires: VecDeque<AcquireOutcome>,
    presents: VecDeque<PresentOutcome>,
    image_count: usize,
    next_image: u32,
}

impl MockBackend {
    fn new(image_count: usize) -> Self {
        Self {
            calls: Vec::new(),
            acquires: VecDeque::new(),
            presents: VecDeque::new(),
            image_count,
            next_image: 0,
        }
    }

    fn script_acquire(mut self, outcome: AcquireOutcome) -> Self {
        self.acquires.push_back(outcome);
        self
    }

    fn script_present(mut self, outcome: PresentOutcome) -> Self {
        self.presents.push_back(outcome);
        self
    }

    fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|&&c| c == call).count()
    }

    fn position(&self, call: Call) -> Option<usize> {
        self.calls.iter().position(|&c| c == call)
    }
}

impl FrameBackend for MockBackend {
    type Error = ();

    fn wait_for_slot(&mut self, slot: usize) -> Result<(), ()> {
        self.calls.push(Call::Wait(slot));
        Ok(())
    }

    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome, ()> {
        self.calls.push(Call::Acquire(slot));
        if let Some(outcome) = self.acquires.pop_front() {
            return Ok(outcome);
        }
        // Round-robin like a FIFO swapchain
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count as u32;
        Ok(AcquireOutcome::Acquired { image_index, suboptimal: false })
    }

    fn record_commands(&mut self, slot: usize, image_index: u32) -> Result<(), ()> {
        self.calls.push(Call::Record(slot, image_index));
        Ok(())
    }

    fn update_uniforms(&mut self, slot: usize, _elapsed: Duration) -> Result<(), ()> {
        self.calls.push(Call::Uniforms(slot));
        Ok(())
    }

    fn submit(&mut self, slot: usize) -> Result<(), ()> {
        self.calls.push(Call::Submit(slot));
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome, ()> {
        self.calls.push(Call::Present(slot, image_index));
        Ok(self.presents.pop_front().unwrap_or(PresentOutcome::Presented))
    }

    fn recreate_swapchain(&mut self) -> Result<usize, ()> {
        self.calls.push(Call::Recreate);
        self.next_image = 0;
        Ok(self.image_count)
    }
}

#[test]
fn test_single_frame_call_order() {
    let mut backend = MockBackend::new(3);
    let mut scheduler = FrameScheduler::new(2, 3);

    let outcome = scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();

    assert_eq!(outcome, FrameOutcome::Presented);
    assert_eq!(
        backend.calls,
        vec![
            Call::Wait(0),
            Call::Acquire(0),
            Call::Record(0, 0),
            Call::Uniforms(0),
            Call::Submit(0),
            Call::Present(0, 0),
        ]
    );
    assert_eq!(scheduler.slot_state(0), FrameSlotState::Idle);
    assert_eq!(scheduler.frames_presented(), 1);
}

#[test]
fn test_slot_fence_waited_before_rerecording() {
    let mut backend = MockBackend::new(3);
    let mut scheduler = FrameScheduler::new(2, 3);

    for _ in 0..3 {
        scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();
    }

    // Third frame reuses slot 0; its fence wait must come after the first
    // submit and before the second recording of slot 0.
    let first_submit = backend.position(Call::Submit(0)).unwrap();
    let second_record = backend
        .calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Call::Record(0, _)))
        .nth(1)
        .map(|(i, _)| i)
        .unwrap();
    let wait_between = backend.calls[first_submit..second_record].contains(&Call::Wait(0));
    assert!(wait_between);
}

#[test]
fn test_frame_index_advances_modulo_slots() {
    let mut backend = MockBackend::new(3);
    let mut scheduler = FrameScheduler::new(2, 3);

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(scheduler.current_frame());
        scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();
    }

    assert_eq!(seen, vec![0, 1, 0, 1, 0]);
    assert_eq!(scheduler.current_frame(), 1);
}

#[test]
fn test_image_reused_by_other_slot_waits_on_owner() {
    // Images acquired 0, 1, 0 with two slots: frame 3 on slot 0 gets image 0
    // which slot 0 already owns, then frame 4 on slot 1 gets image 0 owned by slot 0.
    let mut backend = MockBackend::new(2)
        .script_acquire(AcquireOutcome::Acquired { image_index: 0, suboptimal: false })
        .script_acquire(AcquireOutcome::Acquired { image_index: 1, suboptimal: false })
        .script_acquire(AcquireOutcome::Acquired { image_index: 0, suboptimal: false })
        .script_acquire(AcquireOutcome::Acquired { image_index: 0, suboptimal: false });
    let mut scheduler = FrameScheduler::new(2, 2);

    for _ in 0..3 {
        scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();
    }
    assert_eq!(scheduler.images_in_flight().owner(0), Some(0));

    backend.calls.clear();
    scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();

    assert_eq!(
        &backend.calls[..4],
        &[Call::Wait(1), Call::Acquire(1), Call::Wait(0), Call::Record(1, 0)]
    );
    assert_eq!(scheduler.images_in_flight().owner(0), Some(1));
}

#[test]
fn test_image_owned_by_same_slot_needs_no_extra_wait() {
    let mut backend = MockBackend::new(1);
    let mut scheduler = FrameScheduler::new(1, 1);

    scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();
    scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();

    assert_eq!(backend.count(Call::Wait(0)), 2);
}

#[test]
fn test_out_of_date_acquire_skips_frame() {
    let mut backend = MockBackend::new(3).script_acquire(AcquireOutcome::OutOfDate);
    let mut scheduler = FrameScheduler::new(2, 3);

    let outcome = scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();

    assert_eq!(outcome, FrameOutcome::Skipped);
    assert_eq!(backend.calls, vec![Call::Wait(0), Call::Acquire(0), Call::Recreate]);
    assert_eq!(scheduler.current_frame(), 0);
    assert_eq!(scheduler.frames_presented(), 0);

    // The retry uses the same slot and succeeds
    let outcome = scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();
    assert_eq!(outcome, FrameOutcome::Presented);
    assert_eq!(backend.count(Call::Submit(0)), 1);
}

#[test]
fn test_suboptimal_acquire_still_presents_then_recreates() {
    let mut backend = MockBackend::new(3)
        .script_acquire(AcquireOutcome::Acquired { image_index: 2, suboptimal: true });
    let mut scheduler = FrameScheduler::new(2, 3);

    let outcome = scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();

    assert_eq!(outcome, FrameOutcome::Recreated);
    let present = backend.position(Call::Present(0, 2)).unwrap();
    let recreate = backend.position(Call::Recreate).unwrap();
    assert!(present < recreate);
    assert_eq!(scheduler.current_frame(), 1);
}

#[test]
fn test_present_out_of_date_or_suboptimal_recreates() {
    let mut backend = MockBackend::new(3)
        .script_present(PresentOutcome::OutOfDate)
        .script_present(PresentOutcome::Suboptimal)
        .script_present(PresentOutcome::Presented);
    let mut scheduler = FrameScheduler::new(2, 3);

    let outcomes: Vec<_> = (0..3)
        .map(|_| scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap())
        .collect();

    assert_eq!(
        outcomes,
        vec![FrameOutcome::Recreated, FrameOutcome::Recreated, FrameOutcome::Presented]
    );
    assert_eq!(backend.count(Call::Recreate), 2);
}

#[test]
fn test_repeated_resize_notifications_recreate_once() {
    let mut backend = MockBackend::new(3);
    let mut scheduler = FrameScheduler::new(2, 3);

    scheduler.notify_resized();
    scheduler.notify_resized();
    scheduler.notify_resized();
    assert!(scheduler.resize_pending());

    assert_eq!(scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap(), FrameOutcome::Recreated);
    assert_eq!(scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap(), FrameOutcome::Presented);

    assert_eq!(backend.count(Call::Recreate), 1);
    assert!(!scheduler.resize_pending());
    assert_eq!(scheduler.recreations(), 1);
}

#[test]
fn test_tracker_resized_after_recreation() {
    let mut backend = MockBackend::new(3);
    let mut scheduler = FrameScheduler::new(2, 2);
    assert_eq!(scheduler.images_in_flight().image_count(), 2);

    scheduler.draw_frame(&mut backend, Duration::ZERO).unwrap();
    scheduler.recreate_swapchain(&mut backend).unwrap();

    assert_eq!(scheduler.images_in_flight().image_count(), 3);
    assert!((0..3).all(|i| scheduler.images_in_flight().owner(i).is_none()));
}

#[test]
fn test_backend_error_propagates() {
    struct FailingSubmit;

    impl FrameBackend for FailingSubmit {
        type Error = &'static str;

        fn wait_for_slot(&mut self, _: usize) -> Result<(), Self::Error> {
            Ok(())
        }
        fn acquire_image(&mut self, _: usize) -> Result<AcquireOutcome, Self::Error> {
            Ok(AcquireOutcome::Acquired { image_index: 0, suboptimal: false })
        }
        fn record_commands(&mut self, _: usize, _: u32) -> Result<(), Self::Error> {
            Ok(())
        }
        fn update_uniforms(&mut self, _: usize, _: Duration) -> Result<(), Self::Error> {
            Ok(())
        }
        fn submit(&mut self, _: usize) -> Result<(), Self::Error> {
            Err("device lost")
        }
        fn present(&mut self, _: usize, _: u32) -> Result<PresentOutcome, Self::Error> {
            Ok(PresentOutcome::Presented)
        }
        fn recreate_swapchain(&mut self) -> Result<usize, Self::Error> {
            Ok(1)
        }
    }

    let mut scheduler = FrameScheduler::new(2, 1);
    let result = scheduler.draw_frame(&mut FailingSubmit, Duration::ZERO);
    assert_eq!(result, Err("device lost"));
    assert_eq!(scheduler.frames_presented(), 0);
}
