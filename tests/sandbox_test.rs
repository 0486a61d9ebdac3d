mod common;

use anyhow::Result;

use codebox::sandbox::RetryError;
use codebox::{FailureKind, ReadinessState, Sandbox, SandboxSettings};
use common::{ready_sandbox, sandbox, settings, ScriptedLauncher};

#[tokio::test]
async fn retry_replaces_a_failed_host() -> Result<()> {
    let launcher = ScriptedLauncher::new().failing_on(&[1]);
    let script = launcher.script();
    let sb = sandbox(&launcher);

    assert!(sb.ensure_ready().await.is_failed());
    let rejected = sb.run("print('x')").await;
    assert_eq!(rejected.failure, Some(FailureKind::NotReady));

    let mut states = sb.readiness().subscribe();
    let state = sb.retry().await?;
    assert_eq!(state, ReadinessState::Ready);
    assert_eq!(script.launches(), 2);
    assert!(states.has_changed()?);
    assert!(states.borrow_and_update().is_ready());

    let outcome = sb.run("print('x')").await;
    assert!(outcome.succeeded);
    assert_eq!(sb.history().len(), 1);
    Ok(())
}

#[tokio::test]
async fn retry_requires_a_failure() -> Result<()> {
    let launcher = ScriptedLauncher::new();
    let sb = sandbox(&launcher);
    assert_eq!(sb.retry().await, Err(RetryError::NotFailed(ReadinessState::Uninitialized)));

    sb.ensure_ready().await;
    assert_eq!(sb.retry().await, Err(RetryError::NotFailed(ReadinessState::Ready)));
    assert_eq!(launcher.script().launches(), 1);
    Ok(())
}

#[tokio::test]
async fn history_capacity_comes_from_settings() -> Result<()> {
    let launcher = ScriptedLauncher::new();
    let sb = Sandbox::new(
        std::sync::Arc::new(launcher.clone()),
        SandboxSettings { history_capacity: 3, ..settings() },
    );
    sb.ensure_ready().await;

    for n in 0..5 {
        sb.run(format!("print({})", n)).await;
    }
    let history = sb.history();
    assert_eq!(history.capacity(), 3);
    assert_eq!(history.len(), 3);
    assert_eq!(history.get(2).unwrap().code, "print(2)");
    Ok(())
}

#[tokio::test]
async fn history_survives_a_retry() -> Result<()> {
    let launcher = ScriptedLauncher::new().failing_on(&[2]);
    let sb = ready_sandbox(&launcher).await;

    sb.run("print('before')").await;
    let crashed = sb.run("crash").await;
    assert_eq!(crashed.failure, Some(FailureKind::Crashed));
    assert!(sb.state().is_failed());

    assert!(sb.retry().await?.is_ready());
    sb.run("print('after')").await;

    let codes: Vec<_> = sb.history().iter().map(|o| o.code.clone()).collect();
    assert_eq!(codes, vec!["print('after')", "crash", "print('before')"]);
    Ok(())
}
