use hiring_workflow::workflows::hiring::{
    Application, ApplicationId, ApplicationRepository, Clock, HiringService, Job, JobId,
    JobRepository, NotificationEvent, Notifier, NotifyError, RepositoryError, Role,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub(crate) type ApiService =
    HiringService<InMemoryJobRepository, InMemoryApplicationRepository, InMemoryNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wires the hiring service to process-local storage and an in-memory outbox.
pub(crate) fn in_memory_service(clock: Arc<dyn Clock>) -> (Arc<ApiService>, Arc<InMemoryNotifier>) {
    let notifier = Arc::new(InMemoryNotifier::default());
    let service = HiringService::with_clock(
        Arc::new(InMemoryJobRepository::default()),
        Arc::new(InMemoryApplicationRepository::default()),
        notifier.clone(),
        clock,
    );
    (Arc::new(service), notifier)
}

fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    store: &str,
) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} lock poisoned")))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryJobRepository {
    records: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl JobRepository for InMemoryJobRepository {
    fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut guard = lock(&self.records, "job store")?;
        if guard.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn load(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = lock(&self.records, "job store")?;
        Ok(guard.get(id).cloned())
    }

    fn save(&self, job: Job, expected_version: u64) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "job store")?;
        let found = guard
            .get(&job.id)
            .map(|current| current.version)
            .ok_or(RepositoryError::NotFound)?;
        if found != expected_version {
            return Err(RepositoryError::Stale {
                expected: expected_version,
                found,
            });
        }
        guard.insert(job.id.clone(), job);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Job>, RepositoryError> {
        let guard = lock(&self.records, "job store")?;
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = lock(&self.records, "application store")?;
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn load(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = lock(&self.records, "application store")?;
        Ok(guard.get(id).cloned())
    }

    fn save(&self, application: Application, expected_version: u64) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "application store")?;
        let found = guard
            .get(&application.id)
            .map(|current| current.version)
            .ok_or(RepositoryError::NotFound)?;
        if found != expected_version {
            return Err(RepositoryError::Stale {
                expected: expected_version,
                found,
            });
        }
        guard.insert(application.id.clone(), application);
        Ok(())
    }

    fn list_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        let guard = lock(&self.records, "application store")?;
        Ok(guard
            .values()
            .filter(|application| &application.job_id == job_id)
            .cloned()
            .collect())
    }
}

/// Outbox standing in for e-mail delivery; every event is logged and kept.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    events: Arc<Mutex<Vec<(Role, NotificationEvent)>>>,
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, recipient: Role, event: NotificationEvent) -> Result<(), NotifyError> {
        info!(recipient = recipient.as_str(), event = ?event, "notification queued");
        self.events
            .lock()
            .map_err(|_| NotifyError::Transport("outbox lock poisoned".to_string()))?
            .push((recipient, event));
        Ok(())
    }
}

impl InMemoryNotifier {
    pub(crate) fn events(&self) -> Vec<(Role, NotificationEvent)> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
