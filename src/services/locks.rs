//! 프로젝트별 변경 잠금.
//!
//! 같은 프로젝트에 대한 생성/수정/롤백/저장이 서로 끼어들면
//! `current_code`와 `current_version_id`가 어긋날 수 있으므로 한 번에 하나만 실행합니다.
//! 이미 작업 중이면 기다리지 않고 `Conflict`를 반환합니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::AppError;

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Clone, Default)]
pub struct ProjectLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// 잡고 있는 동안 해당 프로젝트의 다른 변경을 막습니다.
/// 놓을 때 아무도 기다리지 않으면 맵에서 항목을 지웁니다.
pub struct ProjectGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: ProjectLocks,
    project_id: String,
}

impl ProjectLocks {
    pub fn try_acquire(&self, project_id: &str) -> Result<ProjectGuard, AppError> {
        let lock = self
            .map()
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        let guard = lock.try_lock_owned().map_err(|_| {
            AppError::Conflict("Another change to this project is still in progress".to_string())
        })?;

        Ok(ProjectGuard {
            guard: Some(guard),
            locks: self.clone(),
            project_id: project_id.to_string(),
        })
    }

    /// 맵만 참조하는 항목(잡은 사람도, 잡으려는 사람도 없음)을 지웁니다.
    /// 다른 호출자의 clone은 맵 잠금 안에서만 생기므로 여기서 세는 값이 정확합니다.
    fn prune(&self, project_id: &str) {
        let mut locks = self.map();
        if locks
            .get(project_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(project_id);
        }
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(|p| p.into_inner())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

impl Drop for ProjectGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.prune(&self.project_id);
    }
}
