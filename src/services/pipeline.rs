//! # 생성/수정 파이프라인 (오케스트레이터)
//!
//! 사용자 지시 하나를 새 코드 버전으로 바꾸는 과정을 명시적인 상태 기계로 표현합니다.
//!
//! ```text
//! Idle → CreditChecked → Debited → UserLogged → Enhanced → EnhanceLogged
//!      → GeneratingLogged → Generated → Persisted → Done
//! ```
//!
//! 상태 전이마다 핸들러가 하나씩 있고(`step`), 각 단계는 다음 단계로 넘어가기 전에
//! 대화 기록에 항목을 남깁니다. 그래서 중간에 멈추더라도 어디까지 진행됐는지
//! 대화 기록만 보고 알 수 있습니다.
//!
//! 크레딧 차감(`Debited`) 이후 어느 단계에서든 실패하면 크레딧을 한 번 환불하고,
//! 모델이 빈 결과를 준 경우(`GenerationFailure`)에는 실패 메시지를 기록합니다.
//! 자동 재시도는 하지 않으며, 이미 기록된 중간 진행 내용도 되돌리지 않습니다.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::{Project, Role, Version};
use crate::services::completion::CompletionClient;
use crate::services::enhance::{enhance_prompt, PromptMode};
use crate::services::generate::generate_code;

/// 생성 또는 수정 한 번에 드는 크레딧
pub const GENERATION_COST: i64 = 5;

pub const FAILURE_MESSAGE: &str = "Unable to generate the code, Please try again";

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    CreditChecked,
    Debited,
    UserLogged,
    Enhanced(String),
    EnhanceLogged(String),
    GeneratingLogged(String),
    Generated(String),
    Persisted(Version),
    Done(Version),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::CreditChecked => "credit_checked",
            PipelineState::Debited => "debited",
            PipelineState::UserLogged => "user_logged",
            PipelineState::Enhanced(_) => "enhanced",
            PipelineState::EnhanceLogged(_) => "enhance_logged",
            PipelineState::GeneratingLogged(_) => "generating_logged",
            PipelineState::Generated(_) => "generated",
            PipelineState::Persisted(_) => "persisted",
            PipelineState::Done(_) => "done",
        }
    }
}

pub struct Pipeline {
    pool: SqlitePool,
    completion: Arc<dyn CompletionClient>,
    user_id: String,
    prompt: String,
    mode: PromptMode,
    /// 생성 모드에서는 프로젝트 행보다 먼저 정해 두어 잠금을 미리 잡을 수 있게 합니다.
    project_id: String,
    /// 생성 모드에서는 `UserLogged` 단계에서 채워집니다.
    project: Option<Project>,
    /// 환불 대상 여부. 환불은 실패당 한 번만 합니다.
    debited: bool,
}

impl Pipeline {
    pub fn creation(
        pool: SqlitePool,
        completion: Arc<dyn CompletionClient>,
        user_id: &str,
        prompt: &str,
    ) -> Self {
        Self {
            pool,
            completion,
            user_id: user_id.to_string(),
            prompt: prompt.to_string(),
            mode: PromptMode::Creation,
            project_id: uuid::Uuid::now_v7().to_string(),
            project: None,
            debited: false,
        }
    }

    /// `project`는 호출 전에 요청자 소유임이 확인되어 있어야 합니다.
    pub fn revision(
        pool: SqlitePool,
        completion: Arc<dyn CompletionClient>,
        user_id: &str,
        project: Project,
        prompt: &str,
    ) -> Self {
        Self {
            pool,
            completion,
            user_id: user_id.to_string(),
            prompt: prompt.to_string(),
            mode: PromptMode::Revision,
            project_id: project.id.clone(),
            project: Some(project),
            debited: false,
        }
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    /// 대상 프로젝트 ID. 생성 모드에서도 `start` 전에 알 수 있습니다.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// 크레딧 확인부터 사용자 메시지 기록까지. 생성 모드에서는 여기서 프로젝트가 만들어집니다.
    pub async fn start(&mut self) -> Result<Project, AppError> {
        self.drive(PipelineState::Idle, |s| matches!(s, PipelineState::UserLogged))
            .await?;

        match self.project.clone() {
            Some(project) => Ok(project),
            None => {
                let error = AppError::Internal("pipeline has no project after start".to_string());
                Err(self.recover(error).await)
            }
        }
    }

    /// 프롬프트 보강부터 완료 메시지까지. `start` 이후에 호출합니다.
    pub async fn finish(&mut self) -> Result<Version, AppError> {
        match self.drive(PipelineState::UserLogged, |_| false).await? {
            PipelineState::Done(version) => Ok(version),
            other => Err(AppError::Internal(format!(
                "pipeline stopped in state {}",
                other.name()
            ))),
        }
    }

    pub async fn run(&mut self) -> Result<Version, AppError> {
        self.start().await?;
        self.finish().await
    }

    async fn drive(
        &mut self,
        mut state: PipelineState,
        stop: fn(&PipelineState) -> bool,
    ) -> Result<PipelineState, AppError> {
        loop {
            if stop(&state) || matches!(state, PipelineState::Done(_)) {
                return Ok(state);
            }

            let from = state.name();
            state = match self.step(state).await {
                Ok(next) => next,
                Err(e) => return Err(self.recover(e).await),
            };
            tracing::debug!(
                user_id = %self.user_id,
                project_id = self.project.as_ref().map(|p| p.id.as_str()).unwrap_or("-"),
                from,
                to = state.name(),
                "pipeline transition"
            );
        }
    }

    /// 상태 하나를 진행합니다. 실패 시 환불 처리는 하지 않으며 `drive`가 담당합니다.
    pub async fn step(&mut self, state: PipelineState) -> Result<PipelineState, AppError> {
        match state {
            PipelineState::Idle => self.check_credits().await,
            PipelineState::CreditChecked => self.debit().await,
            PipelineState::Debited => self.log_user_prompt().await,
            PipelineState::UserLogged => self.enhance().await,
            PipelineState::Enhanced(prompt) => self.log_enhancement(prompt).await,
            PipelineState::EnhanceLogged(prompt) => self.log_generating(prompt).await,
            PipelineState::GeneratingLogged(prompt) => self.generate(prompt).await,
            PipelineState::Generated(code) => self.persist(code).await,
            PipelineState::Persisted(version) => self.log_done(version).await,
            PipelineState::Done(version) => Ok(PipelineState::Done(version)),
        }
    }

    async fn check_credits(&mut self) -> Result<PipelineState, AppError> {
        let credits = db::get_credits(&self.pool, &self.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

        if credits < GENERATION_COST {
            return Err(AppError::InsufficientCredits);
        }
        Ok(PipelineState::CreditChecked)
    }

    async fn debit(&mut self) -> Result<PipelineState, AppError> {
        // 조건부 차감이라 확인 이후 다른 요청이 잔액을 써 버렸다면 여기서 다시 거부됩니다.
        db::debit_credits(&self.pool, &self.user_id, GENERATION_COST).await?;
        self.debited = true;
        Ok(PipelineState::Debited)
    }

    async fn log_user_prompt(&mut self) -> Result<PipelineState, AppError> {
        if let Some(project) = &self.project {
            db::append_message(&self.pool, &project.id, Role::User, &self.prompt).await?;
            return Ok(PipelineState::UserLogged);
        }

        let mut tx = self.pool.begin().await?;
        let name = Project::name_from_prompt(&self.prompt);
        let project =
            db::create_project(&mut *tx, &self.project_id, &self.user_id, &name, &self.prompt)
                .await?;
        db::increment_total_creation(&mut *tx, &self.user_id).await?;
        db::append_message(&mut *tx, &project.id, Role::User, &self.prompt).await?;
        tx.commit().await?;

        tracing::info!(user_id = %self.user_id, project_id = %project.id, "project created");
        self.project = Some(project);
        Ok(PipelineState::UserLogged)
    }

    async fn enhance(&mut self) -> Result<PipelineState, AppError> {
        let enhanced = enhance_prompt(self.completion.as_ref(), &self.prompt, self.mode).await?;
        Ok(PipelineState::Enhanced(enhanced))
    }

    async fn log_enhancement(&mut self, prompt: String) -> Result<PipelineState, AppError> {
        let message = format!("I have enhanced your prompt to \"{}\"", prompt);
        self.log_assistant(&message).await?;
        Ok(PipelineState::EnhanceLogged(prompt))
    }

    async fn log_generating(&mut self, prompt: String) -> Result<PipelineState, AppError> {
        let message = match self.mode {
            PromptMode::Creation => "Generating your website with the enhanced prompt...",
            PromptMode::Revision => "Now making changes to your website...",
        };
        self.log_assistant(message).await?;
        Ok(PipelineState::GeneratingLogged(prompt))
    }

    async fn generate(&mut self, prompt: String) -> Result<PipelineState, AppError> {
        // 현재 코드가 없는 프로젝트(첫 생성이 실패한 경우 등)는 새 문서를 생성합니다.
        let current_code = match self.mode {
            PromptMode::Creation => None,
            PromptMode::Revision => self
                .project
                .as_ref()
                .and_then(|p| p.current_code.as_deref())
                .filter(|code| !code.is_empty()),
        };

        let code = generate_code(self.completion.as_ref(), &prompt, current_code).await?;
        Ok(PipelineState::Generated(code))
    }

    async fn persist(&mut self, code: String) -> Result<PipelineState, AppError> {
        let description = match self.mode {
            PromptMode::Creation => "Initial version",
            PromptMode::Revision => "Changes made",
        };

        let project_id = self.project_id.clone();
        let version = db::commit_version(&self.pool, &project_id, &code, description).await?;

        if let Some(project) = self.project.as_mut() {
            project.current_code = Some(version.code.clone());
            project.current_version_id = Some(version.id.clone());
        }
        tracing::info!(
            project_id = %project_id,
            version_id = %version.id,
            version_number = version.version_number,
            "version persisted"
        );
        Ok(PipelineState::Persisted(version))
    }

    async fn log_done(&mut self, version: Version) -> Result<PipelineState, AppError> {
        let message = match self.mode {
            PromptMode::Creation => {
                "Your website has been generated successfully! You can preview it and request any changes."
            }
            PromptMode::Revision => "I've made the changes to your website. You can now preview it.",
        };
        self.log_assistant(message).await?;
        Ok(PipelineState::Done(version))
    }

    /// 실패 분기: 환불 → (생성 실패라면) 실패 메시지 기록.
    async fn recover(&mut self, error: AppError) -> AppError {
        if !self.debited {
            return error;
        }
        self.debited = false;

        if let Err(refund_err) =
            db::credit_credits(&self.pool, &self.user_id, GENERATION_COST).await
        {
            tracing::error!(user_id = %self.user_id, error = %refund_err, "credit refund failed");
        }

        match (&self.project, error.is_generation_failure()) {
            (Some(project), true) => {
                tracing::warn!(project_id = %project.id, error = %error, "generation failed, credits refunded");
                if let Err(log_err) =
                    db::append_message(&self.pool, &project.id, Role::Assistant, FAILURE_MESSAGE)
                        .await
                {
                    tracing::error!(project_id = %project.id, error = %log_err, "failed to record failure message");
                }
            }
            _ => {
                tracing::error!(
                    user_id = %self.user_id,
                    project_id = self.project.as_ref().map(|p| p.id.as_str()).unwrap_or("-"),
                    error = %error,
                    "pipeline failed, credits refunded"
                );
            }
        }

        error
    }

    async fn log_assistant(&self, content: &str) -> Result<(), AppError> {
        db::append_message(&self.pool, &self.project_id, Role::Assistant, content).await?;
        Ok(())
    }
}
