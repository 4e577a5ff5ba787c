#![allow(dead_code)]

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use monodeploy::{
    config::{CpuArch, DeployConfig},
    deploy::Orchestrator,
    descriptor::{
        CollectingHintSink, DescriptorRegistry, Discovery, ServiceDescriptor, StorageDescriptor,
    },
    manifest::{ImageDetails, RemoteManifest, WireManifest},
    platform::{BuildOptions, ContainerEngine, HealthProbe, HealthStatus, PlatformApi},
    MonodeployError, MonodeployResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A platform that remembers the last submitted manifest and reports it back on fetch.
#[derive(Default)]
pub struct MockPlatform {
    pub remote: Mutex<RemoteManifest>,
    pub submitted: Mutex<Vec<WireManifest>>,
    pub fail_submit: bool,
}

/// A call made to the [`MockEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Stop(String),
    StopGenerator(String),
    Build(String),
    ConnectionStrings(String),
    Run(String),
    Upload(String, String),
}

/// A container engine that records every call.
///
/// Image ids are derived from the service name and its current revision, so rebuilding an
/// unchanged service yields the same id.
pub struct MockEngine {
    pub calls: Mutex<Vec<EngineCall>>,
    pub revisions: Mutex<BTreeMap<String, u32>>,
    pub fail_build: BTreeSet<String>,
    pub fail_upload: BTreeSet<String>,
    pub platform: String,
    pub shared_image: Option<String>,
}

/// How the [`MockProbe`] answers.
#[derive(Debug, Clone, Copy)]
pub enum ProbeMode {
    Healthy,
    HealthyAfter(usize),
    Unhealthy,
    TransportErrorThenHealthy(usize),
    TransportError,
}

/// A health probe with scripted answers.
pub struct MockProbe {
    pub mode: ProbeMode,
    pub polls: AtomicUsize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MockPlatform {
    pub fn with_remote(remote: RemoteManifest) -> Self {
        Self {
            remote: Mutex::new(remote),
            ..Default::default()
        }
    }

    pub fn last_submitted(&self) -> Option<WireManifest> {
        self.submitted.lock().unwrap().last().cloned()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            revisions: Mutex::new(BTreeMap::new()),
            fail_build: BTreeSet::new(),
            fail_upload: BTreeSet::new(),
            platform: CpuArch::Amd64.platform().to_string(),
            shared_image: None,
        }
    }

    pub fn failing_build(service: &str) -> Self {
        let mut engine = Self::new();
        engine.fail_build.insert(service.to_string());
        engine
    }

    pub fn failing_upload(service: &str) -> Self {
        let mut engine = Self::new();
        engine.fail_upload.insert(service.to_string());
        engine
    }

    pub fn with_platform(platform: &str) -> Self {
        let mut engine = Self::new();
        engine.platform = platform.to_string();
        engine
    }

    /// Every service builds to the same image id.
    pub fn sharing_image(image_id: &str) -> Self {
        let mut engine = Self::new();
        engine.shared_image = Some(image_id.to_string());
        engine
    }

    pub fn image_id(&self, service: &str) -> String {
        if let Some(shared) = &self.shared_image {
            return shared.clone();
        }
        let revision = self
            .revisions
            .lock()
            .unwrap()
            .get(service)
            .copied()
            .unwrap_or(1);
        format!("sha256:{service}-r{revision}")
    }

    pub fn bump(&self, service: &str) {
        *self
            .revisions
            .lock()
            .unwrap()
            .entry(service.to_string())
            .or_insert(1) += 1;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn builds(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Build(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Upload(name, _) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn stops(&self, service: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::Stop(name) if name == service))
            .count()
    }

    /// Counts the stops issued after the local instance of `service` was started.
    pub fn stops_after_run(&self, service: &str) -> usize {
        let calls = self.calls();
        let Some(run) = calls
            .iter()
            .position(|c| matches!(c, EngineCall::Run(name) if name == service))
        else {
            return 0;
        };
        calls[run..]
            .iter()
            .filter(|c| matches!(c, EngineCall::Stop(name) if name == service))
            .count()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MockProbe {
    pub fn new(mode: ProbeMode) -> Self {
        Self {
            mode,
            polls: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl PlatformApi for MockPlatform {
    async fn fetch_remote_manifest(&self) -> MonodeployResult<RemoteManifest> {
        Ok(self.remote.lock().unwrap().clone())
    }

    async fn submit_manifest(&self, manifest: &WireManifest) -> MonodeployResult<()> {
        if self.fail_submit {
            return Err(MonodeployError::ManifestSubmission(
                "503 Service Unavailable".to_string(),
            ));
        }

        self.submitted.lock().unwrap().push(manifest.clone());
        *self.remote.lock().unwrap() = manifest.clone().into_remote();
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContainerEngine for MockEngine {
    async fn build_image(
        &self,
        service: &ServiceDescriptor,
        _architectures: &[CpuArch],
        _options: &BuildOptions,
    ) -> MonodeployResult<ImageDetails> {
        let name = service.get_name();
        self.record(EngineCall::Build(name.clone()));

        if self.fail_build.contains(name) {
            return Err(MonodeployError::BuildFailed {
                service: name.clone(),
                reason: "compilation error".to_string(),
            });
        }

        Ok(ImageDetails::new(self.image_id(name), self.platform.clone()))
    }

    async fn stop_instance(&self, service: &ServiceDescriptor) -> MonodeployResult<()> {
        self.record(EngineCall::Stop(service.get_name().clone()));
        Ok(())
    }

    async fn stop_client_generator(&self, service: &ServiceDescriptor) -> MonodeployResult<()> {
        self.record(EngineCall::StopGenerator(service.get_name().clone()));
        Ok(())
    }

    async fn run_instance_locally(
        &self,
        service: &ServiceDescriptor,
        _connections: &BTreeMap<String, String>,
    ) -> MonodeployResult<()> {
        self.record(EngineCall::Run(service.get_name().clone()));
        Ok(())
    }

    async fn upload_image(
        &self,
        service: &ServiceDescriptor,
        image_id: &str,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> MonodeployResult<()> {
        let name = service.get_name();
        self.record(EngineCall::Upload(name.clone(), image_id.to_string()));

        if self.fail_upload.contains(name) {
            return Err(MonodeployError::UploadFailed {
                service: name.clone(),
                reason: "connection reset".to_string(),
            });
        }

        on_progress(0.5);
        on_progress(1.0);
        Ok(())
    }

    async fn connection_strings(
        &self,
        service: &ServiceDescriptor,
    ) -> MonodeployResult<BTreeMap<String, String>> {
        self.record(EngineCall::ConnectionStrings(service.get_name().clone()));
        Ok(service
            .get_dependencies()
            .iter()
            .map(|storage| (storage.clone(), format!("mongodb://127.0.0.1:27017/{storage}")))
            .collect())
    }
}

#[async_trait::async_trait]
impl HealthProbe for MockProbe {
    async fn query_health(&self, _service: &ServiceDescriptor) -> MonodeployResult<HealthStatus> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.mode {
            ProbeMode::Healthy => Ok(HealthStatus::Healthy),
            ProbeMode::HealthyAfter(n) if poll > n => Ok(HealthStatus::Healthy),
            ProbeMode::HealthyAfter(_) | ProbeMode::Unhealthy => Ok(HealthStatus::Unhealthy),
            ProbeMode::TransportErrorThenHealthy(n) if poll > n => Ok(HealthStatus::Healthy),
            ProbeMode::TransportErrorThenHealthy(_) | ProbeMode::TransportError => {
                Err(MonodeployError::custom(anyhow::anyhow!("connection refused")))
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Settings with millisecond health polling.
pub fn fast_config() -> DeployConfig {
    DeployConfig::builder()
        .health_check_interval(Duration::from_millis(5))
        .health_check_timeout(Duration::from_millis(100))
        .build()
}

pub fn service(name: &str, dependencies: &[&str]) -> ServiceDescriptor {
    ServiceDescriptor::builder()
        .name(name)
        .dependencies(
            dependencies
                .iter()
                .map(|d| d.to_string())
                .collect::<BTreeSet<_>>(),
        )
        .build_context(format!("services/{name}"))
        .build()
}

pub fn storage(name: &str) -> StorageDescriptor {
    StorageDescriptor::builder().name(name).build()
}

pub fn registry(services: Vec<ServiceDescriptor>, storages: Vec<StorageDescriptor>) -> DescriptorRegistry {
    let discovery = Discovery {
        services,
        storages,
        hints: vec![],
    };
    DescriptorRegistry::from_discovery(discovery, &CollectingHintSink::default())
}

pub struct Harness {
    pub platform: Arc<MockPlatform>,
    pub engine: Arc<MockEngine>,
    pub probe: Arc<MockProbe>,
}

impl Harness {
    pub fn new(platform: MockPlatform, engine: MockEngine, probe: MockProbe) -> Self {
        Self {
            platform: Arc::new(platform),
            engine: Arc::new(engine),
            probe: Arc::new(probe),
        }
    }

    pub fn healthy() -> Self {
        Self::new(
            MockPlatform::default(),
            MockEngine::new(),
            MockProbe::new(ProbeMode::Healthy),
        )
    }

    pub fn orchestrator(&self, registry: DescriptorRegistry, config: DeployConfig) -> Orchestrator {
        Orchestrator::new(
            registry,
            self.platform.clone(),
            self.engine.clone(),
            self.probe.clone(),
            config,
        )
    }
}
