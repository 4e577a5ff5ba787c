mod common;

use std::collections::BTreeSet;

use common::{
    fast_config, registry, service, storage, EngineCall, Harness, MockEngine, MockPlatform,
    MockProbe, ProbeMode,
};
use monodeploy::{
    deploy::{DeployEvent, PublishState},
    manifest::{DependencyReference, ManifestModel, ServiceEntry, StorageEntry},
    MonodeployError,
};
use tokio_util::sync::CancellationToken;

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_deploy_inventory_with_storage() -> anyhow::Result<()> {
    let harness = Harness::healthy();
    let mut orchestrator = harness.orchestrator(
        registry(
            vec![service("inventory", &["inventory-db"])],
            vec![storage("inventory-db")],
        ),
        fast_config(),
    );
    let mut events = orchestrator.subscribe();

    let model = ManifestModel::default()
        .with_service(
            "inventory",
            ServiceEntry::builder()
                .dependencies(BTreeSet::from(["inventory-db".to_string()]))
                .build(),
        )
        .with_storage(
            "inventory-db",
            StorageEntry::builder().storage_type("mongov1").build(),
        );

    let mut published = Vec::new();
    let mut logs = Vec::new();
    let report = orchestrator
        .deploy(
            &model,
            CancellationToken::new(),
            |name| published.push(name.to_string()),
            |message| logs.push(message.to_string()),
        )
        .await?;

    assert_eq!(harness.engine.builds(), vec!["inventory".to_string()]);
    assert_eq!(harness.engine.uploads(), vec!["inventory".to_string()]);
    assert!(harness.engine.calls().contains(&EngineCall::Run("inventory".to_string())));
    assert_eq!(orchestrator.state_of("inventory"), Some(PublishState::Published));
    assert_eq!(orchestrator.state_of("inventory-db"), Some(PublishState::Published));
    assert_eq!(published, vec!["inventory".to_string()]);
    assert!(logs.iter().any(|m| m.contains("inventory: building image")));

    let submitted = harness.platform.last_submitted().unwrap();
    assert_eq!(submitted.get_manifest().len(), 1);
    let inventory = submitted.find_service("inventory").unwrap();
    assert_eq!(
        inventory.get_dependencies(),
        &vec![DependencyReference {
            id: "inventory-db".to_string(),
            storage_type: "mongov1".to_string(),
        }]
    );
    assert_eq!(
        inventory.get_image_id().as_deref(),
        Some(harness.engine.image_id("inventory").as_str())
    );
    assert_eq!(inventory.get_image_cpu_arch().as_deref(), Some("amd64"));
    assert!(*submitted.find_storage("inventory-db").unwrap().get_enabled());

    assert_eq!(report.get_published().len(), 2);
    assert_eq!(report.get_uploaded(), &vec!["inventory".to_string()]);
    assert_eq!(report.get_manifest_digest(), &submitted.digest()?);

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(received.first(), Some(&DeployEvent::BeforeDeploy { total: 2 }));
    assert_eq!(received.last(), Some(&DeployEvent::DeploySucceeded { count: 2 }));

    let inventory_states: Vec<_> = received
        .iter()
        .filter_map(|e| match e {
            DeployEvent::ServiceStateChanged { name, state } if name == "inventory" => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(
        inventory_states,
        vec![
            PublishState::InProgress,
            PublishState::Verifying,
            PublishState::Published
        ]
    );
    assert!(received.iter().any(|e| matches!(
        e,
        DeployEvent::ServiceProgress { name, progress } if name == "inventory" && *progress == 1.0
    )));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_deploy_stops_at_first_build_failure() -> anyhow::Result<()> {
    let harness = Harness::new(
        MockPlatform::default(),
        MockEngine::failing_build("billing"),
        MockProbe::new(ProbeMode::Healthy),
    );
    let mut orchestrator = harness.orchestrator(
        registry(
            vec![
                service("accounts", &[]),
                service("billing", &[]),
                service("catalog", &[]),
            ],
            vec![],
        ),
        fast_config(),
    );
    let mut events = orchestrator.subscribe();

    let model = ManifestModel::default();
    let err = orchestrator
        .deploy(&model, CancellationToken::new(), |_| {}, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, MonodeployError::BuildFailed { ref service, .. } if service == "billing"));
    assert_eq!(
        harness.engine.builds(),
        vec!["accounts".to_string(), "billing".to_string()]
    );
    assert_eq!(orchestrator.state_of("accounts"), Some(PublishState::Published));
    assert_eq!(orchestrator.state_of("billing"), Some(PublishState::Failed));
    assert_eq!(orchestrator.state_of("catalog"), Some(PublishState::NotStarted));
    assert!(harness.platform.last_submitted().is_none());

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert!(matches!(
        last,
        Some(DeployEvent::DeployFailed { ref message }) if message.contains("billing")
    ));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_redeploy_without_changes_uploads_nothing() -> anyhow::Result<()> {
    let harness = Harness::healthy();
    let mut orchestrator = harness.orchestrator(
        registry(
            vec![service("inventory", &["inventory-db"]), service("billing", &[])],
            vec![storage("inventory-db")],
        ),
        fast_config(),
    );

    let model = ManifestModel::default();
    let first = orchestrator
        .deploy(&model, CancellationToken::new(), |_| {}, |_| {})
        .await?;
    assert_eq!(first.get_uploaded().len(), 2);
    assert!(orchestrator
        .states()
        .values()
        .all(|s| *s == PublishState::Published));

    let second = orchestrator
        .deploy(&model, CancellationToken::new(), |_| {}, |_| {})
        .await?;
    assert!(second.get_uploaded().is_empty());
    assert_eq!(second.get_skipped_uploads().len(), 2);
    assert_eq!(harness.engine.uploads().len(), 2);
    assert!(orchestrator
        .states()
        .values()
        .all(|s| *s == PublishState::Published));

    harness.engine.bump("billing");
    let third = orchestrator
        .deploy(&model, CancellationToken::new(), |_| {}, |_| {})
        .await?;
    assert_eq!(third.get_uploaded(), &vec!["billing".to_string()]);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_fresh_orchestrator_skips_images_the_platform_runs() -> anyhow::Result<()> {
    let harness = Harness::healthy();
    let model = ManifestModel::default();

    let mut first = harness.orchestrator(registry(vec![service("inventory", &[])], vec![]), fast_config());
    first
        .deploy(&model, CancellationToken::new(), |_| {}, |_| {})
        .await?;

    let mut second = harness.orchestrator(registry(vec![service("inventory", &[])], vec![]), fast_config());
    let report = second
        .deploy(&model, CancellationToken::new(), |_| {}, |_| {})
        .await?;

    assert_eq!(report.get_skipped_uploads(), &vec!["inventory".to_string()]);
    assert_eq!(harness.engine.uploads().len(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_services_sharing_an_image_are_each_uploaded() -> anyhow::Result<()> {
    let harness = Harness::new(
        MockPlatform::default(),
        MockEngine::sharing_image("sha256:shared"),
        MockProbe::new(ProbeMode::Healthy),
    );
    let mut orchestrator = harness.orchestrator(
        registry(vec![service("alpha", &[]), service("beta", &[])], vec![]),
        fast_config(),
    );

    let model = ManifestModel::default();
    let report = orchestrator
        .deploy(&model, CancellationToken::new(), |_| {}, |_| {})
        .await?;

    assert_eq!(
        report.get_uploaded(),
        &vec!["alpha".to_string(), "beta".to_string()]
    );
    assert!(report.get_skipped_uploads().is_empty());
    assert!(harness
        .engine
        .calls()
        .contains(&EngineCall::Upload("beta".to_string(), "sha256:shared".to_string())));

    // Both services now run the shared image on the platform.
    let again = orchestrator
        .deploy(&model, CancellationToken::new(), |_| {}, |_| {})
        .await?;
    assert!(again.get_uploaded().is_empty());
    assert_eq!(harness.engine.uploads().len(), 2);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_failed_precondition_clears_previous_states() -> anyhow::Result<()> {
    let harness = Harness::healthy();
    let mut orchestrator = harness.orchestrator(
        registry(
            vec![service("inventory", &["inventory-db"])],
            vec![storage("inventory-db")],
        ),
        fast_config(),
    );

    orchestrator
        .deploy(&ManifestModel::default(), CancellationToken::new(), |_| {}, |_| {})
        .await?;
    assert_eq!(orchestrator.state_of("inventory"), Some(PublishState::Published));

    let archived = ManifestModel::default().with_storage(
        "inventory-db",
        StorageEntry::builder()
            .storage_type("mongov1")
            .archived(true)
            .build(),
    );
    let err = orchestrator
        .deploy(&archived, CancellationToken::new(), |_| {}, |_| {})
        .await
        .unwrap_err();

    assert!(err.is_precondition());
    assert!(orchestrator.states().is_empty());
    assert_eq!(orchestrator.state_of("inventory"), None);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_unsupported_architecture_fails_like_a_build() -> anyhow::Result<()> {
    let harness = Harness::new(
        MockPlatform::default(),
        MockEngine::with_platform("linux/s390x"),
        MockProbe::new(ProbeMode::Healthy),
    );
    let mut orchestrator =
        harness.orchestrator(registry(vec![service("inventory", &[])], vec![]), fast_config());

    let err = orchestrator
        .deploy(&ManifestModel::default(), CancellationToken::new(), |_| {}, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MonodeployError::UnsupportedArchitecture { ref arch, .. } if arch == "s390x"
    ));
    assert_eq!(orchestrator.state_of("inventory"), Some(PublishState::Failed));
    assert!(harness.engine.uploads().is_empty());
    assert!(!harness
        .engine
        .calls()
        .contains(&EngineCall::Run("inventory".to_string())));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_upload_failure_marks_service_failed() -> anyhow::Result<()> {
    let harness = Harness::new(
        MockPlatform::default(),
        MockEngine::failing_upload("inventory"),
        MockProbe::new(ProbeMode::Healthy),
    );
    let mut orchestrator = harness.orchestrator(
        registry(vec![service("inventory", &[]), service("search", &[])], vec![]),
        fast_config(),
    );

    let err = orchestrator
        .deploy(&ManifestModel::default(), CancellationToken::new(), |_| {}, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, MonodeployError::UploadFailed { .. }));
    assert_eq!(orchestrator.state_of("inventory"), Some(PublishState::Failed));
    assert_eq!(orchestrator.state_of("search"), Some(PublishState::NotStarted));
    assert!(harness.platform.last_submitted().is_none());

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_submission_failure_keeps_published_services() -> anyhow::Result<()> {
    let platform = MockPlatform {
        fail_submit: true,
        ..Default::default()
    };
    let harness = Harness::new(platform, MockEngine::new(), MockProbe::new(ProbeMode::Healthy));
    let mut orchestrator =
        harness.orchestrator(registry(vec![service("inventory", &[])], vec![]), fast_config());
    let mut events = orchestrator.subscribe();

    let err = orchestrator
        .deploy(&ManifestModel::default(), CancellationToken::new(), |_| {}, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, MonodeployError::ManifestSubmission(_)));
    assert_eq!(orchestrator.state_of("inventory"), Some(PublishState::Published));
    assert_eq!(harness.engine.builds().len(), 1);

    let mut failed = false;
    while let Ok(event) = events.try_recv() {
        failed |= matches!(event, DeployEvent::DeployFailed { .. });
    }
    assert!(failed);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_cancelled_deploy_builds_nothing() -> anyhow::Result<()> {
    let harness = Harness::healthy();
    let mut orchestrator =
        harness.orchestrator(registry(vec![service("inventory", &[])], vec![]), fast_config());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator
        .deploy(&ManifestModel::default(), cancel, |_| {}, |_| {})
        .await
        .unwrap_err();

    assert!(err.is_cancellation());
    assert!(harness.engine.builds().is_empty());
    assert_eq!(orchestrator.state_of("inventory"), Some(PublishState::NotStarted));

    Ok(())
}
