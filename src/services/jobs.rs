//! 백그라운드 생성 작업 레지스트리.
//!
//! 프로젝트 생성 요청은 프로젝트 ID를 먼저 응답하고 나머지 파이프라인을
//! 백그라운드 태스크로 계속 실행합니다. 그 태스크의 결과를 여기에 기록해 두면
//! 클라이언트가 `GET /projects/{id}/status`로 완료/실패를 확인할 수 있습니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::models::Version;

/// 끝난 작업의 상태를 보관하는 기간
const FINISHED_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Succeeded { version_id: String },
    /// `message`는 클라이언트에 그대로 노출되므로 `AppError::public_message`만 담습니다.
    Failed { message: String },
}

struct JobEntry {
    status: JobStatus,
    finished_at: Option<Instant>,
}

#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<String, JobEntry>>>,
    finished_ttl: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_ttl(FINISHED_TTL)
    }
}

impl JobRegistry {
    pub fn with_ttl(finished_ttl: Duration) -> Self {
        Self {
            jobs: Arc::default(),
            finished_ttl,
        }
    }

    /// 작업을 `Running`으로 등록하고 실행합니다. 끝나면 결과로 상태를 바꿉니다.
    pub fn spawn<F>(&self, project_id: &str, work: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<Version, AppError>> + Send + 'static,
    {
        self.set(project_id, JobStatus::Running);

        let registry = self.clone();
        let project_id = project_id.to_string();
        tokio::spawn(async move {
            let status = match work.await {
                Ok(version) => JobStatus::Succeeded {
                    version_id: version.id,
                },
                Err(e) => {
                    tracing::warn!(project_id = %project_id, error = %e, "generation job failed");
                    JobStatus::Failed {
                        message: e.public_message(),
                    }
                }
            };
            registry.set(&project_id, status);
        })
    }

    pub fn status(&self, project_id: &str) -> Option<JobStatus> {
        let ttl = self.finished_ttl;
        self.lock()
            .get(project_id)
            .filter(|entry| !entry.is_expired(ttl))
            .map(|entry| entry.status.clone())
    }

    pub fn forget(&self, project_id: &str) {
        self.lock().remove(project_id);
    }

    fn set(&self, project_id: &str, status: JobStatus) {
        let finished_at = match status {
            JobStatus::Running => None,
            _ => Some(Instant::now()),
        };

        let ttl = self.finished_ttl;
        let mut jobs = self.lock();
        jobs.retain(|_, entry| !entry.is_expired(ttl));
        jobs.insert(
            project_id.to_string(),
            JobEntry {
                status,
                finished_at,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, JobEntry>> {
        // 다른 스레드가 패닉했더라도 상태 맵 자체는 일관적이므로 그대로 사용합니다.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl JobEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.finished_at
            .is_some_and(|finished_at| finished_at.elapsed() >= ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(id: &str) -> Version {
        Version {
            id: id.to_string(),
            project_id: "p1".to_string(),
            version_number: 1,
            code: "<html></html>".to_string(),
            description: "Initial version".to_string(),
            timestamp: "2025-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn records_success() {
        let jobs = JobRegistry::default();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let handle = jobs.spawn("p1", async move {
            let _ = rx.await;
            Ok(version("v1"))
        });
        assert_eq!(jobs.status("p1"), Some(JobStatus::Running));

        tx.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(
            jobs.status("p1"),
            Some(JobStatus::Succeeded {
                version_id: "v1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn records_failure_and_forgets() {
        let jobs = JobRegistry::default();

        jobs.spawn("p1", async { Err(AppError::GenerationFailure("empty".to_string())) })
            .await
            .unwrap();
        assert!(matches!(jobs.status("p1"), Some(JobStatus::Failed { .. })));

        jobs.forget("p1");
        assert_eq!(jobs.status("p1"), None);
    }

    #[tokio::test]
    async fn failure_message_hides_internal_details() {
        let jobs = JobRegistry::default();

        jobs.spawn("p1", async {
            Err(AppError::Internal("disk full at /var/lib/wizardry".to_string()))
        })
        .await
        .unwrap();

        assert_eq!(
            jobs.status("p1"),
            Some(JobStatus::Failed {
                message: "An internal error occurred".to_string()
            })
        );
    }

    #[tokio::test]
    async fn finished_jobs_expire_but_running_ones_stay() {
        let jobs = JobRegistry::with_ttl(Duration::ZERO);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        jobs.spawn("done", async { Ok(version("v1")) }).await.unwrap();
        assert_eq!(jobs.status("done"), None);

        let running = jobs.spawn("running", async move {
            let _ = rx.await;
            Ok(version("v2"))
        });
        // 새 작업을 등록할 때 만료된 항목이 정리됩니다.
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs.status("running"), Some(JobStatus::Running));

        tx.send(()).unwrap();
        running.await.unwrap();
    }
}
