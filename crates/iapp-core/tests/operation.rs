use std::collections::VecDeque;
use std::error::Error;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use iapp_api::{
    ClusterDevice, DeviceList, FailoverState, OperationEvent, ServiceIdentity, ServiceTemplate,
    SyncStatus,
};
use iapp_client::{ClientError, ClusterApi, RemoteOutcome, ServiceApi};
use iapp_core::*;

// Mock implementations

#[derive(Clone, Copy)]
enum Reply {
    Ok,
    NotFound,
    Failed,
}

impl Reply {
    fn outcome(self, message: &str) -> RemoteOutcome {
        match self {
            Reply::Ok => RemoteOutcome::Ok,
            Reply::NotFound => RemoteOutcome::NotFound(message.to_string()),
            Reply::Failed => RemoteOutcome::Failed(ClientError::Remote(message.to_string())),
        }
    }
}

struct MockService {
    identity: ServiceIdentity,
    create_reply: Reply,
    poll_reply: Reply,
    delete_reply: Reply,
    create_calls: AtomicU32,
    poll_calls: AtomicU32,
    delete_calls: AtomicU32,
    // Poll count observed when create was called
    create_seen_at_poll: AtomicU32,
}

impl MockService {
    fn new(create_reply: Reply, poll_reply: Reply) -> Self {
        Self {
            identity: ServiceIdentity::new("tenant1", "service1"),
            create_reply,
            poll_reply,
            delete_reply: Reply::Ok,
            create_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            delete_calls: AtomicU32::new(0),
            create_seen_at_poll: AtomicU32::new(u32::MAX),
        }
    }

    fn creates(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn polls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceApi for MockService {
    fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    async fn create(&self, _template: &ServiceTemplate) -> RemoteOutcome {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_seen_at_poll
            .store(self.poll_calls.load(Ordering::SeqCst), Ordering::SeqCst);
        self.create_reply.outcome("create rejected")
    }

    async fn poll(&self) -> RemoteOutcome {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        match self.poll_reply {
            Reply::NotFound => self.poll_reply.outcome("pending"),
            other => other.outcome("deployment failed"),
        }
    }

    async fn delete(&self) -> RemoteOutcome {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.delete_reply.outcome("Cannot delete service 'service1'")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Step {
    Devices,
    Save,
    SyncToGroup,
    Status,
}

struct MockCluster {
    devices: DeviceList,
    // Step that answers with the given HTTP status instead of succeeding
    fail_at: Option<(Step, u16)>,
    statuses: Mutex<VecDeque<&'static str>>,
    device_calls: AtomicU32,
    status_calls: AtomicU32,
    // (command, ip) pairs in call order
    commands: Mutex<Vec<(String, String)>>,
}

impl MockCluster {
    fn new(devices: Vec<ClusterDevice>, statuses: &[&'static str]) -> Self {
        Self {
            devices: DeviceList { items: devices },
            fail_at: None,
            statuses: Mutex::new(statuses.iter().copied().collect()),
            device_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            commands: Mutex::new(Vec::new()),
        }
    }

    fn failing_at(mut self, step: Step, status: u16) -> Self {
        self.fail_at = Some((step, status));
        self
    }

    fn check(&self, step: Step) -> Result<(), ClientError> {
        match self.fail_at {
            Some((failing, status)) if failing == step => {
                Err(ClientError::UnexpectedStatus { status })
            }
            _ => Ok(()),
        }
    }

    fn commands(&self) -> Vec<(String, String)> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn devices(&self, _ip: &str) -> Result<DeviceList, ClientError> {
        self.device_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Step::Devices)?;
        Ok(self.devices.clone())
    }

    async fn save_config(&self, ip: &str) -> Result<(), ClientError> {
        self.commands
            .lock()
            .unwrap()
            .push(("save".to_string(), ip.to_string()));
        self.check(Step::Save)
    }

    async fn sync_to_group(&self, ip: &str, group: &str) -> Result<(), ClientError> {
        self.commands
            .lock()
            .unwrap()
            .push((format!("sync {group}"), ip.to_string()));
        self.check(Step::SyncToGroup)
    }

    async fn sync_status(&self, _ip: &str) -> Result<SyncStatus, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Step::Status)?;
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.pop_front().unwrap_or("In Sync")
        } else {
            statuses.front().copied().unwrap_or("In Sync")
        };
        Ok(SyncStatus {
            status: status.to_string(),
            summary: format!("summary for {status}"),
        })
    }
}

fn device(ip: &str, state: FailoverState, is_self: bool) -> ClusterDevice {
    ClusterDevice {
        management_ip: Some(ip.to_string()),
        failover_state: state,
        self_device: is_self,
    }
}

fn active_pair() -> Vec<ClusterDevice> {
    vec![
        device("10.0.0.4", FailoverState::Active, true),
        device("10.0.0.5", FailoverState::Standby, false),
    ]
}

fn template() -> ServiceTemplate {
    ServiceTemplate::new("template1")
}

const RETRY: Duration = Duration::from_secs(10);

fn sync(cluster: &Arc<MockCluster>) -> ClusterSync {
    ClusterSync::new(
        cluster.clone(),
        "10.0.0.4",
        "dg1",
        SyncPolicy::unbounded(Duration::from_millis(1)),
    )
}

fn operation(service: &Arc<MockService>) -> ServiceOperation {
    ServiceOperation::new(service.clone(), RETRY)
}

#[tokio::test]
async fn test_create_completes_and_syncs_once() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::Ok));
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));

    let outcome = operation(&service)
        .create(0, &template(), &sync(&cluster))
        .await
        .unwrap();

    assert_eq!(outcome, OperationOutcome::Completed);
    assert_eq!(service.creates(), 1);
    assert_eq!(service.polls(), 1);
    assert_eq!(cluster.device_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        cluster.commands(),
        vec![
            ("save".to_string(), "10.0.0.4".to_string()),
            ("sync dg1".to_string(), "10.0.0.4".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_create_submitted_before_first_poll() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::NotFound));
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));

    operation(&service)
        .create(0, &template(), &sync(&cluster))
        .await
        .unwrap();

    assert_eq!(service.creates(), 1);
    assert_eq!(service.create_seen_at_poll.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_retry_attempts_never_create() {
    for attempt in [1, 2, 7, 100] {
        let service = Arc::new(MockService::new(Reply::Ok, Reply::NotFound));
        let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));

        operation(&service)
            .create(attempt, &template(), &sync(&cluster))
            .await
            .unwrap();

        assert_eq!(service.creates(), 0, "attempt {attempt}");
        assert_eq!(service.polls(), 1);
    }
}

#[tokio::test]
async fn test_create_failure_is_fatal() {
    let service = Arc::new(MockService::new(Reply::Failed, Reply::Ok));
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));

    let err = operation(&service)
        .create(0, &template(), &sync(&cluster))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed creating service 'service1' for template 'template1'"
    );
    assert_eq!(err.source().unwrap().to_string(), "create rejected");
    assert_eq!(service.polls(), 0);
}

#[tokio::test]
async fn test_not_found_defers_with_interval() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::NotFound));
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));
    let operation = operation(&service);
    let sync = sync(&cluster);

    let first = operation.create(0, &template(), &sync).await.unwrap();
    match first {
        OperationOutcome::Deferred {
            retry_after,
            message,
        } => {
            assert_eq!(retry_after, RETRY);
            assert!(message.contains("service1"));
            assert!(message.contains("pending"));
        }
        OperationOutcome::Completed => panic!("expected deferral"),
    }

    let second = operation.create(1, &template(), &sync).await.unwrap();
    assert!(!second.is_completed());
    assert_eq!(service.creates(), 1);
    assert_eq!(service.polls(), 2);
    assert_eq!(cluster.device_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_poll_failure_is_fatal() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::Failed));
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));

    let err = operation(&service)
        .create(0, &template(), &sync(&cluster))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed creating service 'service1'");
    assert!(matches!(err, OperationError::Poll { .. }));
    assert_eq!(cluster.device_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_template_name() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::Ok));
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));

    let err = operation(&service)
        .create(0, &ServiceTemplate::new(""), &sync(&cluster))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(err.to_string(), "Template name is required");
    assert_eq!(service.creates(), 0);
    assert_eq!(service.polls(), 0);
}

#[tokio::test]
async fn test_missing_tenant_name() {
    let mut service = MockService::new(Reply::Ok, Reply::Ok);
    service.identity = ServiceIdentity::new("", "service1");
    let service = Arc::new(service);
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));

    let err = operation(&service)
        .create(0, &template(), &sync(&cluster))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Tenant name is required");
    assert_eq!(service.creates(), 0);
    assert_eq!(cluster.device_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_standby_device_redirects_to_active() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::Ok));
    let cluster = Arc::new(MockCluster::new(
        vec![
            device("10.0.0.4", FailoverState::Standby, true),
            device("10.0.0.5", FailoverState::Active, false),
        ],
        &["In Sync"],
    ));

    operation(&service)
        .create(0, &template(), &sync(&cluster))
        .await
        .unwrap();

    for (_, ip) in cluster.commands() {
        assert_eq!(ip, "10.0.0.5");
    }
    assert_eq!(cluster.commands().len(), 2);
}

#[tokio::test]
async fn test_no_active_device_is_fatal() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::Ok));
    let cluster = Arc::new(MockCluster::new(
        vec![device("10.0.0.5", FailoverState::Active, false)],
        &["In Sync"],
    ));

    let err = operation(&service)
        .create(0, &template(), &sync(&cluster))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Cannot find an active device");
    assert!(cluster.commands().is_empty());
}

#[tokio::test]
async fn test_in_sync_on_first_check_does_not_wait() {
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));
    let sync = ClusterSync::new(
        cluster.clone(),
        "10.0.0.4",
        "dg1",
        SyncPolicy::unbounded(Duration::from_secs(3600)),
    );

    tokio::time::timeout(Duration::from_secs(5), sync.run())
        .await
        .expect("sync waited despite being in sync")
        .unwrap();

    assert_eq!(cluster.status_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_waits_until_in_sync() {
    let cluster = Arc::new(MockCluster::new(
        active_pair(),
        &["Changes Pending", "Syncing", "In Sync"],
    ));
    let sync = ClusterSync::new(
        cluster.clone(),
        "10.0.0.4",
        "dg1",
        SyncPolicy::unbounded(Duration::from_millis(1)),
    );

    sync.run().await.unwrap();

    assert_eq!(cluster.status_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_sync_check_cap() {
    let cluster = Arc::new(MockCluster::new(active_pair(), &["Changes Pending"]));
    let sync = ClusterSync::new(
        cluster.clone(),
        "10.0.0.4",
        "dg1",
        SyncPolicy {
            retry_interval: Duration::from_millis(1),
            max_attempts: Some(3),
        },
    );

    let err = sync.run().await.unwrap_err();

    assert!(matches!(err, OperationError::NotConverged { attempts: 3, .. }));
    assert_eq!(cluster.status_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_delete() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::Ok));

    ServiceOperation::new(service.clone(), RETRY)
        .delete()
        .await
        .unwrap();

    assert_eq!(service.delete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delete_failure() {
    let mut service = MockService::new(Reply::Ok, Reply::Ok);
    service.delete_reply = Reply::Failed;
    let service = Arc::new(service);

    let err = ServiceOperation::new(service, RETRY)
        .delete()
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed deleting service 'service1'");
    assert_eq!(
        err.source().unwrap().to_string(),
        "Cannot delete service 'service1'"
    );
}

#[tokio::test]
async fn test_events_are_published() {
    let (tx, mut rx) = broadcast::channel(16);
    let service = Arc::new(MockService::new(Reply::Ok, Reply::Ok));
    let cluster = Arc::new(MockCluster::new(active_pair(), &["In Sync"]));
    let sync = ClusterSync::new(
        cluster.clone(),
        "10.0.0.4",
        "dg1",
        SyncPolicy::unbounded(Duration::from_millis(1)),
    )
    .with_events(tx.clone());

    ServiceOperation::new(service, RETRY)
        .with_events(tx)
        .create(0, &template(), &sync)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(matches!(events[0], OperationEvent::ServiceRequested { .. }));
    assert!(matches!(events[1], OperationEvent::ServiceCreated { .. }));
    assert!(matches!(
        events.last(),
        Some(OperationEvent::SyncCompleted { .. })
    ));
}

#[tokio::test]
async fn test_cluster_failure_stops_remaining_steps() {
    // (failing step, commands issued, status checks made)
    let cases = [
        (Step::Devices, 0, 0),
        (Step::Save, 1, 0),
        (Step::SyncToGroup, 2, 0),
        (Step::Status, 2, 1),
    ];

    for (step, commands, checks) in cases {
        let service = Arc::new(MockService::new(Reply::Ok, Reply::Ok));
        let cluster = Arc::new(
            MockCluster::new(active_pair(), &["In Sync"]).failing_at(step, 401),
        );

        let err = operation(&service)
            .create(0, &template(), &sync(&cluster))
            .await
            .unwrap_err();

        match &err {
            OperationError::Sync { group, ip, source } => {
                assert_eq!(group, "dg1", "{step:?}");
                assert_eq!(ip, "10.0.0.4", "{step:?}");
                assert!(
                    matches!(source, ClientError::UnexpectedStatus { status: 401 }),
                    "{step:?}: {source:?}"
                );
            }
            other => panic!("{step:?}: expected sync error, got {other:?}"),
        }
        assert_eq!(err.client_error().and_then(ClientError::status), Some(401));
        assert_eq!(cluster.commands().len(), commands, "{step:?}");
        assert_eq!(cluster.status_calls.load(Ordering::SeqCst), checks, "{step:?}");
    }
}

#[tokio::test]
async fn test_failed_save_sends_no_sync_command() {
    let service = Arc::new(MockService::new(Reply::Ok, Reply::Ok));
    let cluster = Arc::new(
        MockCluster::new(active_pair(), &["In Sync"]).failing_at(Step::Save, 500),
    );

    let err = operation(&service)
        .create(0, &template(), &sync(&cluster))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed syncing device group 'dg1' on 10.0.0.4");
    assert_eq!(
        err.source().unwrap().to_string(),
        "An unexpected HTTP response code = 500 has been received"
    );
    assert_eq!(
        cluster.commands(),
        vec![("save".to_string(), "10.0.0.4".to_string())]
    );
}

#[tokio::test]
async fn test_status_events_only_on_change() {
    let (tx, mut rx) = broadcast::channel(16);
    let cluster = Arc::new(MockCluster::new(
        active_pair(),
        &["Changes Pending", "Changes Pending", "Syncing", "In Sync"],
    ));

    sync(&cluster).with_events(tx).run().await.unwrap();

    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let OperationEvent::SyncStatusChanged { status, .. } = event {
            statuses.push(status);
        }
    }

    assert_eq!(cluster.status_calls.load(Ordering::SeqCst), 4);
    assert_eq!(statuses, vec!["Changes Pending", "Syncing", "In Sync"]);
}
