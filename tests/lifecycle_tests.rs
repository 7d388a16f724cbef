//! Lifecycle transition table, exhaustively

use ltc_node::lifecycle::{Lifecycle, LifecycleEvent, SessionState};

const STATES: [SessionState; 4] = [
    SessionState::Uninitialized,
    SessionState::Initialized,
    SessionState::Running,
    SessionState::Stopped,
];

const EVENTS: [LifecycleEvent; 5] = [
    LifecycleEvent::Begin,
    LifecycleEvent::BeginFailed,
    LifecycleEvent::Run,
    LifecycleEvent::Stop,
    LifecycleEvent::TaskFailed,
];

/// Drive a fresh lifecycle into `state` through legal events.
fn reach(state: SessionState) -> Lifecycle {
    let mut lc = Lifecycle::new();
    let path: &[LifecycleEvent] = match state {
        SessionState::Uninitialized => &[],
        SessionState::Initialized => &[LifecycleEvent::Begin],
        SessionState::Running => &[LifecycleEvent::Begin, LifecycleEvent::Run],
        SessionState::Stopped => &[LifecycleEvent::Begin, LifecycleEvent::Run, LifecycleEvent::Stop],
    };
    for &event in path {
        lc.apply(event).unwrap();
    }
    assert_eq!(lc.state(), state);
    lc
}

fn expected(state: SessionState, event: LifecycleEvent) -> Option<SessionState> {
    use LifecycleEvent as E;
    use SessionState as S;

    match (state, event) {
        (_, E::Begin) => Some(S::Initialized),
        (_, E::BeginFailed) => Some(S::Uninitialized),
        (S::Initialized, E::Run) | (S::Stopped, E::Run) => Some(S::Running),
        (S::Running, E::Stop) => Some(S::Stopped),
        (S::Running, E::TaskFailed) => Some(S::Uninitialized),
        _ => None,
    }
}

#[test]
fn test_every_transition() {
    for state in STATES {
        for event in EVENTS {
            let mut lc = reach(state);
            assert_eq!(lc.allows(event), expected(state, event).is_some());

            match (lc.apply(event), expected(state, event)) {
                (Ok(next), Some(want)) => {
                    assert_eq!(next, want, "{:?} + {:?}", state, event);
                    assert_eq!(lc.state(), want);
                }
                (Err(err), None) => {
                    assert_eq!(err.code(), "L01");
                    assert_eq!(lc.state(), state, "rejected event changed state");
                }
                (got, want) => panic!("{:?} + {:?}: got {:?}, want {:?}", state, event, got, want),
            }
        }
    }
}

#[test]
fn test_only_uninitialized_has_no_engine() {
    for state in STATES {
        assert_eq!(state.has_engine(), state != SessionState::Uninitialized);
    }
}
