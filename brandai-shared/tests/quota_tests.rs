/// Integration tests for quota enforcement
///
/// Covers plan limits, concurrent consumption, downgrades, period rollover and
/// refunds of generations that never completed.

mod common;

use brandai_shared::engine::ConsumeResult;
use brandai_shared::error::EngineError;
use brandai_shared::models::plan::{BillingCycle, Limit, ResourceKind};
use chrono::Duration;
use common::{FailingGenerator, StalledGenerator, TestContext};
use futures::future::join_all;
use std::sync::Arc;

/// Signs up, lets the trial lapse and returns a fresh token on the free plan
async fn free_account(ctx: &TestContext, email: &str) -> String {
    ctx.signup(email).await;
    ctx.clock.advance(Duration::days(14));
    ctx.login(email, false).await.token
}

async fn used(ctx: &TestContext, token: &str, kind: ResourceKind) -> u32 {
    ctx.engine.usage(token).await.unwrap().usage[&kind].used
}

#[tokio::test]
async fn test_free_plan_logo_limit() {
    let ctx = TestContext::new();
    let token = free_account(&ctx, "a@x.com").await;

    for expected_remaining in (0..15).rev() {
        let outcome = ctx
            .engine
            .consume_resource(&token, ResourceKind::LogoGeneration)
            .await
            .unwrap();
        assert_eq!(outcome.remaining, Some(expected_remaining));
    }

    let rejected = ctx
        .engine
        .consume_resource(&token, ResourceKind::LogoGeneration)
        .await;
    assert!(matches!(rejected, Err(EngineError::QuotaExceeded(_))));

    let result = ConsumeResult::from(rejected);
    assert!(!result.allowed);
    assert_eq!(result.remaining, Some(0));
    assert_eq!(
        result.error.as_deref(),
        Some("You have used all 15 logo generations included in your plan this period")
    );

    // Other kinds are counted separately
    assert!(ctx
        .engine
        .consume_resource(&token, ResourceKind::Download)
        .await
        .is_ok());
    assert_eq!(used(&ctx, &token, ResourceKind::LogoGeneration).await, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_goes_to_exactly_one_caller() {
    let ctx = TestContext::new();
    let token = free_account(&ctx, "a@x.com").await;

    for _ in 0..14 {
        ctx.engine
            .consume_resource(&token, ResourceKind::LogoGeneration)
            .await
            .unwrap();
    }

    let handles = (0..8).map(|_| {
        let engine = Arc::clone(&ctx.engine);
        let token = token.clone();
        tokio::spawn(async move {
            engine
                .consume_resource(&token, ResourceKind::LogoGeneration)
                .await
        })
    });

    let allowed = join_all(handles)
        .await
        .into_iter()
        .filter(|result| matches!(result, Ok(Ok(_))))
        .count();

    assert_eq!(allowed, 1);
    assert_eq!(used(&ctx, &token, ResourceKind::LogoGeneration).await, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consumers_never_exceed_limit() {
    let ctx = TestContext::new();
    let token = free_account(&ctx, "a@x.com").await;

    let handles = (0..50).map(|_| {
        let engine = Arc::clone(&ctx.engine);
        let token = token.clone();
        tokio::spawn(async move {
            engine
                .consume_resource(&token, ResourceKind::BrandAsset)
                .await
                .is_ok()
        })
    });

    let allowed = join_all(handles)
        .await
        .into_iter()
        .filter(|result| matches!(result, Ok(true)))
        .count();

    assert_eq!(allowed, 10);

    let account = ctx.engine.account(&token).await.unwrap();
    let counter = ctx
        .engine
        .ledger()
        .counter(account.id, ResourceKind::BrandAsset)
        .unwrap();
    assert_eq!(counter.count, 10);
}

#[tokio::test]
async fn test_downgrade_applies_new_limit_immediately() {
    let ctx = TestContext::new();
    let token = ctx.signup("a@x.com").await.token;

    ctx.engine
        .upgrade_plan(&token, "professional", BillingCycle::Monthly, "pm_card_visa")
        .await
        .unwrap();

    for _ in 0..120 {
        ctx.engine
            .consume_resource(&token, ResourceKind::LogoGeneration)
            .await
            .unwrap();
    }

    ctx.engine
        .upgrade_plan(&token, "starter", BillingCycle::Monthly, "")
        .await
        .unwrap();

    let usage = ctx.engine.usage(&token).await.unwrap();
    let logos = usage.usage[&ResourceKind::LogoGeneration];
    assert_eq!(logos.limit, Limit::Bounded(100));
    assert_eq!(logos.used, 100);

    assert!(matches!(
        ctx.engine
            .consume_resource(&token, ResourceKind::LogoGeneration)
            .await,
        Err(EngineError::QuotaExceeded(_))
    ));
}

#[tokio::test]
async fn test_usage_rolls_over_with_period() {
    let ctx = TestContext::new();
    let token = ctx.signup("a@x.com").await.token;

    ctx.engine
        .upgrade_plan(&token, "starter", BillingCycle::Monthly, "pm_card_visa")
        .await
        .unwrap();

    for _ in 0..100 {
        ctx.engine
            .consume_resource(&token, ResourceKind::LogoGeneration)
            .await
            .unwrap();
    }
    let report = ctx.engine.usage(&token).await.unwrap();
    assert_eq!(report.period_start, ctx.now());

    // Jan 15 to Feb 15: the next window opens
    ctx.clock.advance(Duration::days(31));
    let token = ctx.login("a@x.com", false).await.token;

    assert_eq!(used(&ctx, &token, ResourceKind::LogoGeneration).await, 0);
    let outcome = ctx
        .engine
        .consume_resource(&token, ResourceKind::LogoGeneration)
        .await
        .unwrap();
    assert_eq!(outcome.remaining, Some(99));

    let report = ctx.engine.usage(&token).await.unwrap();
    assert_eq!(report.period_start, ctx.now());
    assert_eq!(report.period_end, ctx.now() + Duration::days(29));
}

#[tokio::test]
async fn test_unlimited_plan_reports_no_remaining() {
    let ctx = TestContext::new();
    let token = ctx.signup("a@x.com").await.token;

    ctx.engine
        .upgrade_plan(&token, "agency", BillingCycle::Monthly, "pm_card_visa")
        .await
        .unwrap();

    let outcome = ctx
        .engine
        .consume_resource(&token, ResourceKind::Project)
        .await
        .unwrap();
    assert_eq!(outcome.remaining, None);
    assert_eq!(outcome.used, 1);
}

#[tokio::test]
async fn test_generate_charges_one_unit() {
    let ctx = TestContext::new();
    let token = ctx.signup("a@x.com").await.token;

    let asset = ctx
        .engine
        .generate(&token, ResourceKind::LogoGeneration, "a red fox")
        .await
        .unwrap();

    assert!(asset.url.starts_with("https://"));
    assert_eq!(used(&ctx, &token, ResourceKind::LogoGeneration).await, 1);
}

#[tokio::test]
async fn test_generate_rejects_empty_prompt_without_charge() {
    let ctx = TestContext::new();
    let token = ctx.signup("a@x.com").await.token;

    assert!(matches!(
        ctx.engine
            .generate(&token, ResourceKind::LogoGeneration, "   ")
            .await,
        Err(EngineError::Validation { .. })
    ));
    assert_eq!(used(&ctx, &token, ResourceKind::LogoGeneration).await, 0);
}

#[tokio::test]
async fn test_generate_refunds_on_failure() {
    let ctx = TestContext::with_generator(Arc::new(FailingGenerator));
    let token = ctx.signup("a@x.com").await.token;

    let err = ctx
        .engine
        .generate(&token, ResourceKind::BrandAsset, "a red fox")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::GenerationFailed(_)));
    assert_eq!(used(&ctx, &token, ResourceKind::BrandAsset).await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_generate_refunds_on_timeout() {
    let ctx = TestContext::with_generator(Arc::new(StalledGenerator));
    let token = ctx.signup("a@x.com").await.token;

    let err = ctx
        .engine
        .generate(&token, ResourceKind::LogoGeneration, "a red fox")
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::CollaboratorTimeout("generator"));
    assert_eq!(used(&ctx, &token, ResourceKind::LogoGeneration).await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_generate_refunds_when_cancelled() {
    let ctx = TestContext::with_generator(Arc::new(StalledGenerator));
    let token = ctx.signup("a@x.com").await.token;

    let cancelled = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        ctx.engine
            .generate(&token, ResourceKind::LogoGeneration, "a red fox"),
    )
    .await;

    assert!(cancelled.is_err());
    assert_eq!(used(&ctx, &token, ResourceKind::LogoGeneration).await, 0);
}

#[tokio::test]
async fn test_generate_blocked_at_limit() {
    let ctx = TestContext::new();
    let token = free_account(&ctx, "a@x.com").await;

    for _ in 0..5 {
        ctx.engine
            .consume_resource(&token, ResourceKind::Project)
            .await
            .unwrap();
    }

    assert!(matches!(
        ctx.engine
            .generate(&token, ResourceKind::Project, "landing page")
            .await,
        Err(EngineError::QuotaExceeded(_))
    ));
}
