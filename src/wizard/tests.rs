//! Tests for the step-wizard engine.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Step, StepWizard, WizardError};

fn plain(title: &str) -> Step<String> {
    let title_owned = title.to_string();
    Step::new(title, move || title_owned.clone())
}

fn three_plain_steps() -> StepWizard<String> {
    StepWizard::new(vec![plain("one"), plain("two"), plain("three")])
}

#[test]
fn starts_at_first_step() {
    let wizard = three_plain_steps();
    assert_eq!(wizard.index(), 0);
    assert_eq!(wizard.step_count(), 3);
    assert_eq!(wizard.current().title(), "one");
    assert_eq!(wizard.current().render(), "one");
}

#[test]
fn single_step_wizard_is_terminal_immediately() {
    let wizard = StepWizard::new(vec![plain("only")]);
    assert_eq!(wizard.index(), 0);
    assert!(wizard.is_terminal());
}

#[test]
#[should_panic(expected = "at least one step")]
fn empty_step_list_panics() {
    let _ = StepWizard::<String>::new(vec![]);
}

#[test]
fn retreat_at_first_step_is_a_noop() {
    let wizard = three_plain_steps();
    wizard.retreat();
    assert_eq!(wizard.index(), 0);
    wizard.retreat();
    assert_eq!(wizard.index(), 0);
}

#[tokio::test]
async fn advance_walks_forward_and_parks_at_terminal() {
    let wizard = three_plain_steps();

    wizard.advance().await.unwrap();
    assert_eq!(wizard.index(), 1);
    wizard.advance().await.unwrap();
    assert_eq!(wizard.index(), 2);
    assert!(wizard.is_terminal());

    // Terminal advance is a no-op success, not an error.
    wizard.advance().await.unwrap();
    assert_eq!(wizard.index(), 2);
}

#[tokio::test]
async fn advance_then_retreat_round_trips() {
    let wizard = three_plain_steps();
    wizard.advance().await.unwrap();
    assert_eq!(wizard.index(), 1);
    wizard.retreat();
    assert_eq!(wizard.index(), 0);
}

#[tokio::test]
async fn closed_gate_blocks_advance_without_moving() {
    let open = Rc::new(Cell::new(false));
    let gate_open = open.clone();
    let wizard = StepWizard::new(vec![
        plain("one").gated(move || gate_open.get()),
        plain("two"),
    ]);

    assert!(!wizard.can_advance());
    let err = wizard.advance().await.unwrap_err();
    assert!(matches!(err, WizardError::GateBlocked(ref step) if step == "one"));
    assert_eq!(wizard.index(), 0);

    // Satisfying the gate unblocks the same wizard instance.
    open.set(true);
    assert!(wizard.can_advance());
    wizard.advance().await.unwrap();
    assert_eq!(wizard.index(), 1);
}

#[tokio::test]
async fn gate_is_checked_at_every_non_terminal_index() {
    let wizard = StepWizard::new(vec![
        plain("one").gated(|| false),
        plain("two").gated(|| false),
        plain("three"),
    ]);

    assert!(matches!(
        wizard.advance().await.unwrap_err(),
        WizardError::GateBlocked(_)
    ));
    assert_eq!(wizard.index(), 0);
}

#[tokio::test]
async fn pre_next_runs_before_the_cursor_moves() {
    let ran = Arc::new(AtomicBool::new(false));
    let hook_ran = ran.clone();
    let wizard = StepWizard::new(vec![
        plain("one").before_next(move || {
            let ran = hook_ran.clone();
            async move {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            }
        }),
        plain("two"),
    ]);

    wizard.advance().await.unwrap();
    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(wizard.index(), 1);
}

#[tokio::test]
async fn failing_pre_next_keeps_the_cursor_and_preserves_the_cause() {
    let wizard = StepWizard::new(vec![
        plain("one").before_next(|| async { Err(anyhow::anyhow!("device went away")) }),
        plain("two"),
    ]);

    let err = wizard.advance().await.unwrap_err();
    match err {
        WizardError::PreNextFailed { step, cause } => {
            assert_eq!(step, "one");
            assert_eq!(cause.to_string(), "device went away");
        }
        other => panic!("expected PreNextFailed, got {other:?}"),
    }
    assert_eq!(wizard.index(), 0);

    // The instance stays usable after the failure.
    assert!(wizard.can_advance());
}

#[tokio::test]
async fn pre_next_failure_does_not_consume_the_hook() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let hook_attempts = attempts.clone();
    let wizard = StepWizard::new(vec![
        plain("one").before_next(move || {
            let attempts = hook_attempts.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("first try fails");
                }
                Ok(())
            }
        }),
        plain("two"),
    ]);

    assert!(wizard.advance().await.is_err());
    assert_eq!(wizard.index(), 0);
    wizard.advance().await.unwrap();
    assert_eq!(wizard.index(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn overlapping_advance_fails_fast() {
    let wizard = StepWizard::new(vec![
        plain("one").before_next(|| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        }),
        plain("two"),
    ]);

    // join! polls in declaration order: the first advance enters its hook
    // and suspends, the second observes the in-flight flag.
    let (first, second) = tokio::join!(wizard.advance(), wizard.advance());

    first.unwrap();
    assert!(matches!(
        second.unwrap_err(),
        WizardError::AdvanceInProgress
    ));
    assert_eq!(wizard.index(), 1);
}

#[tokio::test]
async fn gate_blocked_still_reported_on_terminal_step() {
    let wizard = StepWizard::new(vec![plain("only").gated(|| false)]);
    assert!(matches!(
        wizard.advance().await.unwrap_err(),
        WizardError::GateBlocked(_)
    ));
    assert_eq!(wizard.index(), 0);
}

#[tokio::test]
async fn index_stays_in_bounds_under_mixed_navigation() {
    let wizard = three_plain_steps();
    for _ in 0..5 {
        wizard.advance().await.unwrap();
        assert!(wizard.index() < wizard.step_count());
    }
    for _ in 0..5 {
        wizard.retreat();
        assert!(wizard.index() < wizard.step_count());
    }
    assert_eq!(wizard.index(), 0);
}
