//! Unit tests for run bookkeeping under concurrent apply and failed generation.

#[path = "../support/mod.rs"]
mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use flows_api::models::{ApplyStatus, FlowDraft, RunState};
use flows_api::routes::AppState;
use flows_api::services::RunError;
use support::{FakeCatalog, FakeGenerator, products, test_state};

fn title_draft() -> FlowDraft {
    FlowDraft {
        title: Some("Titles".to_string()),
        source_fields: vec!["Product Title".to_string()],
        destinations: vec!["Product Title".to_string()],
        prompt: "Write a title.".to_string(),
        ..Default::default()
    }
}

async fn generated_run(state: &AppState, count: usize) -> i64 {
    let flow = state.flows.create_flow(title_draft()).await.unwrap();
    let run = state.runs.create_run(&flow.id, products(count)).await.unwrap();
    let run = state.runs.generate(run.run_id).await.unwrap();
    assert_eq!(run.state, RunState::Completed);
    run.run_id
}

#[tokio::test]
async fn test_single_and_bulk_apply_update_each_product_once() {
    let catalog = Arc::new(FakeCatalog::default().with_update_delay(Duration::from_millis(100)));
    let state = test_state(catalog.clone(), Arc::new(FakeGenerator::new("New title")));
    let run_id = generated_run(&state, 2).await;

    let (single, bulk) = tokio::join!(
        state.runs.apply_product(run_id, "1"),
        state.runs.apply_all(run_id)
    );
    bulk.unwrap();
    match single {
        Ok(product) => assert_eq!(product.status, ApplyStatus::Applied),
        Err(e) => assert!(matches!(e, RunError::AlreadyApplied(_)), "{e}"),
    }

    let updated: Vec<String> = catalog.updates().into_iter().map(|u| u.id).collect();
    assert_eq!(updated.len(), 2);
    assert_eq!(updated.iter().collect::<HashSet<_>>().len(), 2);

    let run = state.runs.get_run(run_id).await.unwrap();
    assert!(run.products.iter().all(|p| p.status == ApplyStatus::Applied));
}

#[tokio::test]
async fn test_repeated_single_apply_sends_one_mutation() {
    let catalog = Arc::new(FakeCatalog::default().with_update_delay(Duration::from_millis(100)));
    let state = test_state(catalog.clone(), Arc::new(FakeGenerator::new("New title")));
    let run_id = generated_run(&state, 1).await;

    let (first, second) = tokio::join!(
        state.runs.apply_product(run_id, "1"),
        state.runs.apply_product(run_id, "1")
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|o| matches!(o, Err(RunError::AlreadyApplied(id)) if id == "1"))
    );
    assert_eq!(catalog.updates().len(), 1);
}

#[tokio::test]
async fn test_crashed_generation_does_not_leave_run_running() {
    let state = test_state(
        Arc::new(FakeCatalog::default()),
        Arc::new(FakeGenerator::new("ok").panicking("2")),
    );
    let flow = state.flows.create_flow(title_draft()).await.unwrap();
    let run = state.runs.create_run(&flow.id, products(2)).await.unwrap();

    let err = state.runs.generate(run.run_id).await.unwrap_err();
    assert!(matches!(err, RunError::Task(_)), "{err}");

    let stored = state.runs.get_run(run.run_id).await.unwrap();
    assert_eq!(stored.state, RunState::Completed);
    assert!(state.runs.apply_all(run.run_id).await.is_ok());

    // A retry is accepted instead of being rejected as busy
    let err = state.runs.generate(run.run_id).await.unwrap_err();
    assert!(matches!(err, RunError::Task(_)), "{err}");
}
