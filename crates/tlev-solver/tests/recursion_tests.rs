use super::*;

#[test]
fn test_enter_and_leave_track_depth() {
    let mut guard: RecursionGuard<u32> = RecursionGuard::new(4, 100);
    assert!(guard.enter(1).is_entered());
    assert!(guard.enter(2).is_entered());
    assert_eq!(guard.depth(), 2);
    assert!(guard.is_active(&1));
    guard.leave(2);
    guard.leave(1);
    assert_eq!(guard.depth(), 0);
    assert!(!guard.is_active(&1));
}

#[test]
fn test_same_pair_twice_is_a_cycle() {
    let mut guard: RecursionGuard<(u32, u32)> = RecursionGuard::new(10, 100);
    assert!(guard.enter((1, 2)).is_entered());
    let again = guard.enter((1, 2));
    assert!(again.is_cycle());
    assert!(!again.is_exceeded());
    assert!(guard.enter((2, 1)).is_entered());
    guard.leave((2, 1));
    guard.leave((1, 2));
}

#[test]
fn test_depth_cap() {
    let mut guard: RecursionGuard<u32> = RecursionGuard::new(2, 100);
    assert!(guard.enter(1).is_entered());
    assert!(guard.enter(2).is_entered());
    assert_eq!(guard.enter(3), RecursionResult::DepthExceeded);
    guard.leave(2);
    assert!(guard.enter(3).is_entered());
    guard.leave(3);
    guard.leave(1);
}

#[test]
fn test_step_budget_counts_every_attempt() {
    let mut guard: RecursionGuard<u32> = RecursionGuard::new(10, 3);
    for key in 0..3 {
        assert!(guard.enter(key).is_entered());
        guard.leave(key);
    }
    assert_eq!(guard.enter(99), RecursionResult::StepsExhausted);
    assert_eq!(guard.steps(), 4);
}

#[test]
fn test_scope_leaves_on_return() {
    let mut guard: RecursionGuard<u32> = RecursionGuard::new(10, 100);
    assert_eq!(guard.scope(7, || 42), Ok(42));
    assert_eq!(guard.depth(), 0);

    assert!(guard.enter(7).is_entered());
    assert_eq!(guard.scope(7, || 0), Err(RecursionResult::Cycle));
    guard.leave(7);
}

#[test]
fn test_profiles_read_shared_limits() {
    assert_eq!(
        RecursionProfile::SubtypeCheck.max_depth(),
        tlev_common::limits::MAX_SUBTYPE_DEPTH
    );
    assert_eq!(RecursionProfile::Instantiation.max_depth(), 128);
    let custom = RecursionProfile::Custom {
        max_depth: 3,
        max_steps: 9,
    };
    assert_eq!(custom.max_depth(), 3);
    assert_eq!(custom.max_steps(), 9);
}

#[test]
fn test_depth_counter_stops_at_cap() {
    let mut counter = DepthCounter::with_profile(RecursionProfile::Custom {
        max_depth: 2,
        max_steps: 0,
    });
    assert!(counter.enter());
    assert!(counter.enter());
    assert!(!counter.enter());
    assert_eq!(counter.depth(), 2);
    counter.leave();
    counter.leave();
    assert_eq!(counter.depth(), 0);
}
