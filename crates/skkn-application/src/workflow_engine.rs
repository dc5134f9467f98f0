//! WorkflowEngine - drives a report from the input form to completion.
//!
//! All mutable session state lives behind one `std::sync::Mutex`. The lock
//! is only taken inside synchronous sections and never across an `.await`,
//! so the in-flight stream is the single writer to the document while it
//! runs. Every mutation publishes a [`ChangeNotice`] for the autosave task.

use crate::retry_coordinator::{RetryCoordinator, RetryDecision};
use crate::state::{ChangeNotice, EngineState, Operation};
use skkn_core::banner::ErrorBanner;
use skkn_core::config::{GenerationConfig, ReviewPolicy};
use skkn_core::document::Document;
use skkn_core::error::{Result, SkknError};
use skkn_core::export::{self, DocumentExporter, ExportMetadata, ExportRequest};
use skkn_core::key_pool::KeyPool;
use skkn_core::llm::{ChatMessage, LlmClient};
use skkn_core::locator::{self, LocatedSolution};
use skkn_core::machine::{PromptContext, StepAction, StepMachine, prompts};
use skkn_core::session::{SessionData, SnapshotState, SnapshotUserInfo, timestamp_now};
use skkn_core::solutions::SolutionContent;
use skkn_core::step::{Flow, GenerationStep, INPUT_STEP, OUTLINE_STEP, StepIndex, StepInfo};
use skkn_core::storage::CredentialStore;
use skkn_core::user_info::UserInfo;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Collaborators injected into the engine.
pub struct EngineServices {
    pub llm: Arc<dyn LlmClient>,
    pub key_pool: Arc<dyn KeyPool>,
    pub credentials: Arc<dyn CredentialStore>,
    pub exporter: Arc<dyn DocumentExporter>,
}

struct Inner {
    state: EngineState,
    machine: StepMachine,
    /// Key adopted by rotation or a manual change. Falls back to the pool.
    api_key: Option<String>,
    model: String,
    failed: Option<Operation>,
    cancel: Option<CancellationToken>,
    revision: u64,
}

/// Where streamed chunks go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamTarget {
    Block(StepIndex),
    RevisionDraft,
    Appendix,
    Discard,
}

pub struct WorkflowEngine {
    inner: Mutex<Inner>,
    changes: watch::Sender<ChangeNotice>,
    llm: Arc<dyn LlmClient>,
    credentials: Arc<dyn CredentialStore>,
    exporter: Arc<dyn DocumentExporter>,
    retry: RetryCoordinator,
    config: GenerationConfig,
}

fn ensure_idle(inner: &Inner) -> Result<()> {
    if inner.state.is_streaming {
        Err(SkknError::Busy)
    } else {
        Ok(())
    }
}

/// Clears everything produced by a previous run, keeping the user info.
fn reset_progress(state: &mut EngineState) {
    state.messages.clear();
    state.document.clear();
    state.solutions = Default::default();
    state.appendix_document.clear();
    state.awaiting_approval = None;
    state.revision_draft.clear();
    state.error = None;
}

/// Best match for solution `n`: its own block first, then the whole report.
fn locate(document: &Document, n: u8) -> LocatedSolution {
    let own_block = GenerationStep::solution(n)
        .and_then(|step| document.block(step.index()))
        .map(|block| block.content.as_str())
        .unwrap_or_default();
    let located = locator::locate_solution(own_block, n);
    if located.is_found() {
        return located;
    }
    locator::locate_solution(&document.render(), n)
}

fn main_body_complete(flow: &Flow, step: StepIndex) -> bool {
    flow.is_completed(step) || (!flow.is_custom() && step >= GenerationStep::PartFiveSix.index())
}

fn export_request(info: &UserInfo, markdown: String, filename: String) -> ExportRequest {
    ExportRequest {
        markdown,
        filename,
        header_fields: info.template().and_then(|template| template.header_fields),
        metadata: Some(ExportMetadata {
            topic: info.topic.clone(),
            school: info.school.clone(),
            location: info.location.clone(),
            subject: info.subject.clone(),
        }),
    }
}

impl WorkflowEngine {
    pub fn new(services: EngineServices, config: GenerationConfig) -> Self {
        let machine = StepMachine::new(Flow::resolve(&UserInfo::default()));
        let (changes, _) = watch::channel(ChangeNotice::default());
        let retry = RetryCoordinator::new(services.key_pool, services.credentials.clone());
        Self {
            inner: Mutex::new(Inner {
                state: EngineState::default(),
                machine,
                api_key: None,
                model: config.model.clone(),
                failed: None,
                cancel: None,
                revision: 0,
            }),
            changes,
            llm: services.llm,
            credentials: services.credentials,
            exporter: services.exporter,
            retry,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        f(&self.lock())
    }

    /// Applies `f` under the lock and publishes a change notice.
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let (result, notice) = {
            let mut inner = self.lock();
            let result = f(&mut inner);
            inner.revision += 1;
            let notice = ChangeNotice {
                revision: inner.revision,
                step: inner.state.step,
                is_streaming: inner.state.is_streaming,
            };
            (result, notice)
        };
        self.changes.send_replace(notice);
        result
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub fn state(&self) -> EngineState {
        self.read(|inner| inner.state.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<ChangeNotice> {
        self.changes.subscribe()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn flow(&self) -> Flow {
        self.read(|inner| inner.machine.flow().clone())
    }

    /// Progress sidebar entries for the current flow.
    pub fn visible_steps(&self) -> Vec<StepInfo> {
        self.read(|inner| inner.machine.flow().visible_steps())
    }

    pub fn is_completed(&self) -> bool {
        self.read(|inner| inner.machine.flow().is_completed(inner.state.step))
    }

    pub fn model(&self) -> String {
        self.read(|inner| inner.model.clone())
    }

    pub fn active_key(&self) -> Option<String> {
        self.read(|inner| inner.api_key.clone())
            .or_else(|| self.retry.active_key())
    }

    pub fn reference_documents(&self) -> String {
        self.read(|inner| inner.state.user_info.reference_documents.clone())
    }

    fn require_key(&self) -> Result<String> {
        self.active_key().ok_or_else(|| {
            SkknError::config("Chưa có API key. Vui lòng nhập API key trước khi bắt đầu.")
        })
    }

    // ============================================================================
    // Form and outline
    // ============================================================================

    /// Replaces the user info. Only allowed before generation starts.
    pub fn set_user_info(&self, info: UserInfo) -> Result<()> {
        self.update(|inner| {
            ensure_idle(inner)?;
            if inner.state.has_started() {
                return Err(SkknError::invalid_state(
                    "Thông tin chỉ được thay đổi trước khi bắt đầu viết SKKN",
                ));
            }
            inner.machine = StepMachine::new(Flow::resolve(&info));
            inner.state.user_info = info;
            Ok(())
        })
    }

    /// Streams a fresh outline from the user info.
    pub async fn start_generation(&self) -> Result<()> {
        self.run(Operation::StartOutline).await
    }

    /// Uses an outline the user wrote instead of generating one.
    pub fn submit_manual_outline(&self, outline: &str) -> Result<()> {
        let key = self.require_key()?;
        let model = self.update(|inner| {
            ensure_idle(inner)?;
            inner.machine = StepMachine::new(Flow::resolve(&inner.state.user_info));
            reset_progress(&mut inner.state);
            inner.state.document = Document::from_outline(outline);
            inner.state.step = OUTLINE_STEP;
            inner.failed = None;
            Ok::<_, SkknError>(inner.model.clone())
        })?;
        self.llm.initialize(&key, &model);
        tracing::info!("[Workflow] Manual outline accepted ({} chars)", outline.chars().count());
        Ok(())
    }

    /// Replaces the outline text. Only possible on the outline step.
    pub fn edit_outline(&self, outline: &str) -> Result<()> {
        self.update(|inner| {
            ensure_idle(inner)?;
            if inner.state.step != OUTLINE_STEP {
                return Err(SkknError::invalid_state(
                    "Chỉ có thể sửa dàn ý ở bước Lập Dàn Ý",
                ));
            }
            inner.state.document.replace_with_outline(outline);
            Ok(())
        })
    }

    pub fn set_outline_feedback(&self, feedback: &str) {
        self.update(|inner| inner.state.outline_feedback = feedback.to_string());
    }

    /// Rewrites the outline from the stored feedback.
    pub async fn regenerate_outline(&self) -> Result<()> {
        self.run(Operation::RegenerateOutline).await
    }

    // ============================================================================
    // Step machine
    // ============================================================================

    /// Runs the transition out of the current step and returns the new step.
    ///
    /// With [`ReviewPolicy::AutoApprove`] a review step is passed through on
    /// the way to the next solution.
    pub async fn advance(&self) -> Result<StepIndex> {
        self.run(Operation::Advance).await?;
        Ok(self.read(|inner| inner.state.step))
    }

    pub fn approve_solution(&self, number: u8) -> Result<()> {
        self.update(|inner| {
            let solution = inner
                .state
                .solutions
                .get_mut(number)
                .ok_or_else(|| SkknError::not_found("solution", number.to_string()))?;
            solution.is_approved = true;
            if inner.state.awaiting_approval == Some(number) {
                inner.state.awaiting_approval = None;
            }
            tracing::info!("[Workflow] Solution {} approved", number);
            Ok(())
        })
    }

    /// Rewrites solution `number` following the user's feedback.
    pub async fn revise_solution(
        &self,
        number: u8,
        feedback: &str,
        reference: Option<&str>,
    ) -> Result<()> {
        self.run(Operation::ReviseSolution {
            number,
            feedback: feedback.to_string(),
            reference: reference.map(str::to_string),
        })
        .await
    }

    pub async fn generate_appendix(&self) -> Result<()> {
        self.run(Operation::Appendix).await
    }

    /// Moves back to an earlier step so generation can resume from there.
    ///
    /// Later blocks stay visible until the next step is regenerated.
    pub fn jump_to_step(&self, step: StepIndex) -> Result<()> {
        self.update(|inner| {
            ensure_idle(inner)?;
            if step >= inner.state.step {
                return Err(SkknError::invalid_state(format!(
                    "Chỉ có thể quay lại bước trước bước hiện tại ({})",
                    inner.state.step
                )));
            }
            tracing::info!("[Workflow] Jump from step {} to {}", inner.state.step, step);
            inner.state.step = step;
            inner.state.awaiting_approval = None;
            inner.state.error = None;
            inner.failed = None;
            Ok(())
        })
    }

    /// Aborts the in-flight stream. Returns false when nothing is streaming.
    pub fn cancel(&self) -> bool {
        match self.read(|inner| inner.cancel.clone()) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    // ============================================================================
    // Errors and keys
    // ============================================================================

    /// Retries the failed operation with the next key, resetting the pool
    /// when every key has failed.
    pub async fn retry_with_rotation(&self) -> Result<()> {
        let operation = self.read(|inner| {
            ensure_idle(inner)?;
            inner
                .failed
                .clone()
                .ok_or_else(|| SkknError::invalid_state("Không có thao tác nào để thử lại"))
        })?;
        let key = self
            .retry
            .manual_rotation()
            .ok_or_else(|| SkknError::config("Chưa cấu hình API key nào"))?;

        self.retry.persist_key(&key).await;
        self.update(|inner| {
            inner.api_key = Some(key.clone());
            inner.state.error = None;
            inner.failed = None;
        });
        self.reinitialize_client(&key);
        tokio::time::sleep(self.config.manual_retry_delay()).await;
        self.run(operation).await
    }

    pub fn dismiss_error(&self) {
        self.update(|inner| {
            inner.state.error = None;
            inner.failed = None;
        });
    }

    /// Switches key and model, remembering both for the next run.
    pub async fn change_api_key(&self, api_key: &str, model: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SkknError::config("API key không được để trống"));
        }
        self.read(ensure_idle)?;
        self.credentials.save_api_key(api_key).await?;
        self.credentials.save_model(model).await?;

        let reinitialize = self.update(|inner| {
            inner.api_key = Some(api_key.to_string());
            inner.model = model.to_string();
            let had_error = inner.state.error.take().is_some();
            had_error || inner.state.has_started()
        });
        if reinitialize {
            self.reinitialize_client(api_key);
        }
        tracing::info!("[Workflow] API key changed, model {}", model);
        Ok(())
    }

    /// Re-initializes the client, carrying the chat history over.
    fn reinitialize_client(&self, api_key: &str) {
        let history = self.llm.history();
        self.llm.initialize(api_key, &self.model());
        self.llm.set_history(history);
    }

    async fn adopt_key(&self, api_key: &str) {
        self.retry.persist_key(api_key).await;
        self.update(|inner| {
            inner.api_key = Some(api_key.to_string());
            inner.state.error = None;
        });
        self.reinitialize_client(api_key);
    }

    fn surface(&self, err: SkknError, operation: Operation) -> SkknError {
        tracing::error!("[Workflow] {} failed: {}", operation.name(), err);
        let banner = ErrorBanner::from_error(&err);
        self.update(|inner| {
            inner.state.error = Some(banner);
            inner.failed = Some(operation);
        });
        err
    }

    /// Executes `operation` with at most one automatic retry.
    ///
    /// Only generation failures reach the retry coordinator. Busy, invalid
    /// state and cancellation are returned as they are.
    async fn run(&self, operation: Operation) -> Result<()> {
        let key = self.active_key();
        let err = match self.execute(&operation).await {
            Ok(()) => return Ok(()),
            Err(err) if !err.is_generation() => return Err(err),
            Err(err) => err,
        };

        match self.retry.on_failure(&err, key.as_deref()) {
            RetryDecision::Retry { new_key, message } => {
                self.adopt_key(&new_key).await;
                self.update(|inner| {
                    inner
                        .state
                        .messages
                        .push(ChatMessage::model(format!("🔄 {message}. Đang thử lại...")));
                });
                tokio::time::sleep(self.config.retry_delay()).await;
                match self.execute(&operation).await {
                    Ok(()) => Ok(()),
                    Err(second) if second.is_generation() => Err(self.surface(second, operation)),
                    Err(other) => Err(other),
                }
            }
            RetryDecision::Surface => Err(self.surface(err, operation)),
        }
    }

    async fn execute(&self, operation: &Operation) -> Result<()> {
        match operation {
            Operation::StartOutline => self.generate_outline().await,
            Operation::RegenerateOutline => self.regenerate_outline_once().await,
            Operation::Advance => self.step_forward().await,
            Operation::ReviseSolution {
                number,
                feedback,
                reference,
            } => self.revise_once(*number, feedback, reference.as_deref()).await,
            Operation::Appendix => self.appendix_once().await,
        }
    }

    async fn generate_outline(&self) -> Result<()> {
        let key = self.require_key()?;
        let prompt = self.update(|inner| {
            ensure_idle(inner)?;
            inner.machine = StepMachine::new(Flow::resolve(&inner.state.user_info));
            reset_progress(&mut inner.state);
            inner.state.step = OUTLINE_STEP;
            prompts::outline_prompt(&PromptContext::new(
                &inner.state.user_info,
                &inner.state.document,
            ))
        })?;
        let model = self.model();
        self.llm.initialize(&key, &model);
        tracing::info!("[Workflow] Generating outline with {}", model);
        self.stream(&prompt, StreamTarget::Block(OUTLINE_STEP)).await?;
        Ok(())
    }

    async fn regenerate_outline_once(&self) -> Result<()> {
        let (prompt, previous) = self.update(|inner| {
            ensure_idle(inner)?;
            if inner.state.step != OUTLINE_STEP {
                return Err(SkknError::invalid_state(
                    "Chỉ có thể tạo lại dàn ý ở bước Lập Dàn Ý",
                ));
            }
            let feedback = inner.state.outline_feedback.trim().to_string();
            if feedback.is_empty() {
                return Err(SkknError::invalid_state("Vui lòng nhập góp ý để tạo lại dàn ý"));
            }
            let ctx = PromptContext::new(&inner.state.user_info, &inner.state.document);
            let prompt = prompts::outline_revision_prompt(&ctx, &feedback)?;
            Ok((prompt, inner.state.document.clone()))
        })?;

        match self.stream(&prompt, StreamTarget::Block(OUTLINE_STEP)).await {
            Ok(_) => {
                self.update(|inner| inner.state.outline_feedback.clear());
                Ok(())
            }
            Err(err) => {
                self.update(|inner| inner.state.document = previous);
                Err(err)
            }
        }
    }

    async fn step_forward(&self) -> Result<()> {
        loop {
            let transition = self.read(|inner| {
                ensure_idle(inner)?;
                if let Some(n) = inner.state.awaiting_approval {
                    return Err(SkknError::invalid_state(format!(
                        "Giải pháp {n} đang chờ duyệt"
                    )));
                }
                let step = inner.state.step;
                if step == INPUT_STEP {
                    return Err(SkknError::invalid_state("Chưa bắt đầu tạo SKKN"));
                }
                let ctx = PromptContext::new(&inner.state.user_info, &inner.state.document);
                inner.machine.next(step, &ctx)?.ok_or_else(|| {
                    SkknError::invalid_state(format!("Không còn bước nào sau bước {step}"))
                })
            })?;

            let next_step = transition.next_step;
            let status = match transition.action {
                StepAction::Generate { prompt } => {
                    tracing::info!("[Workflow] Generating step {} -> {}", transition.from, next_step);
                    self.stream(&prompt, StreamTarget::Block(next_step)).await?;
                    self.update(|inner| inner.state.step = next_step);
                    return Ok(());
                }
                StepAction::Transient { status } => status,
            };

            if self.config.acknowledge_transient_steps {
                self.stream(&status, StreamTarget::Discard).await?;
            }

            let auto_approve = self.config.review_policy == ReviewPolicy::AutoApprove;
            let reviewed = self.update(|inner| {
                inner.state.messages.push(ChatMessage::model(status));
                inner.state.step = next_step;
                let n = inner.machine.flow().review_number(next_step)?;

                let located = locate(&inner.state.document, n);
                if !located.is_found() {
                    tracing::warn!("[Workflow] Could not locate solution {} in the document", n);
                }
                let approved = auto_approve && located.is_found();
                inner
                    .state
                    .solutions
                    .set(n, SolutionContent::located(located.content, approved));
                if !auto_approve {
                    inner.state.awaiting_approval = Some(n);
                }
                Some(n)
            });

            match reviewed {
                Some(n) if auto_approve => {
                    tracing::debug!("[Workflow] Solution {} auto-approved, continuing", n);
                    tokio::time::sleep(self.config.review_continue_delay()).await;
                }
                _ => return Ok(()),
            }
        }
    }

    async fn revise_once(&self, number: u8, feedback: &str, reference: Option<&str>) -> Result<()> {
        let prompt = self.read(|inner| {
            ensure_idle(inner)?;
            if feedback.trim().is_empty() {
                return Err(SkknError::invalid_state("Vui lòng nhập yêu cầu chỉnh sửa"));
            }
            let current = inner
                .state
                .solutions
                .get(number)
                .ok_or_else(|| SkknError::not_found("solution", number.to_string()))?;
            let ctx = PromptContext::new(&inner.state.user_info, &inner.state.document);
            prompts::revision_prompt(&ctx, number, &current.content, feedback, reference)
        })?;

        let revised = self.stream(&prompt, StreamTarget::RevisionDraft).await?;
        self.update(|inner| {
            if let Some(solution) = inner.state.solutions.get_mut(number) {
                solution.revise(revised.trim());
            }
            inner.state.revision_draft.clear();
        });
        tracing::info!("[Workflow] Solution {} revised", number);
        Ok(())
    }

    async fn appendix_once(&self) -> Result<()> {
        let prompt = self.read(|inner| {
            ensure_idle(inner)?;
            if !main_body_complete(inner.machine.flow(), inner.state.step) {
                return Err(SkknError::invalid_state(
                    "Cần hoàn thành nội dung chính trước khi tạo phụ lục",
                ));
            }
            prompts::appendix_prompt(&PromptContext::new(
                &inner.state.user_info,
                &inner.state.document,
            ))
        })?;
        self.stream(&prompt, StreamTarget::Appendix).await?;
        tracing::info!("[Workflow] Appendix generated");
        Ok(())
    }

    /// Streams `prompt` into `target` and returns the full reply.
    async fn stream(&self, prompt: &str, target: StreamTarget) -> Result<String> {
        let cancel = CancellationToken::new();
        self.update(|inner| {
            ensure_idle(inner)?;
            inner.state.is_streaming = true;
            inner.state.error = None;
            inner.state.streaming_step = match target {
                StreamTarget::Block(step) => Some(step),
                _ => None,
            };
            match target {
                StreamTarget::Block(step) => inner.state.document.begin_block(step),
                StreamTarget::RevisionDraft => inner.state.revision_draft.clear(),
                StreamTarget::Appendix => inner.state.appendix_document.clear(),
                StreamTarget::Discard => {}
            }
            inner.cancel = Some(cancel.clone());
            Ok::<_, SkknError>(())
        })?;

        let mut reply = String::new();
        let result = {
            let mut on_chunk = |chunk: &str| {
                reply.push_str(chunk);
                if target == StreamTarget::Discard {
                    return;
                }
                self.update(|inner| match target {
                    StreamTarget::Block(step) => inner.state.document.append_chunk(step, chunk),
                    StreamTarget::RevisionDraft => inner.state.revision_draft.push_str(chunk),
                    StreamTarget::Appendix => inner.state.appendix_document.push_str(chunk),
                    StreamTarget::Discard => {}
                });
            };
            self.llm.send_stream(prompt, &mut on_chunk, &cancel).await
        };

        self.update(|inner| {
            inner.state.is_streaming = false;
            inner.state.streaming_step = None;
            inner.cancel = None;
        });

        match result {
            Ok(()) => Ok(reply),
            Err(err) if err.cancelled => {
                tracing::info!("[Workflow] Stream cancelled");
                Err(err.into())
            }
            Err(err) => {
                tracing::warn!("[Workflow] Stream failed: {}", err);
                Err(err.into())
            }
        }
    }

    // ============================================================================
    // Export
    // ============================================================================

    pub async fn export_document(&self) -> Result<String> {
        let request = self.read(|inner| {
            let info = &inner.state.user_info;
            if inner.state.document.is_empty() {
                return Err(SkknError::invalid_state("Chưa có nội dung để xuất"));
            }
            Ok(export_request(
                info,
                inner.state.document.render(),
                export::document_filename(&info.topic),
            ))
        })?;
        self.export(request).await
    }

    pub async fn export_solution(&self, number: u8) -> Result<String> {
        let request = self.read(|inner| {
            let info = &inner.state.user_info;
            let solution = inner
                .state
                .solutions
                .get(number)
                .ok_or_else(|| SkknError::not_found("solution", number.to_string()))?;
            Ok::<_, SkknError>(export_request(
                info,
                solution.content.clone(),
                export::solution_filename(&info.topic, number),
            ))
        })?;
        self.export(request).await
    }

    pub async fn export_appendix(&self) -> Result<String> {
        let request = self.read(|inner| {
            let info = &inner.state.user_info;
            if inner.state.appendix_document.trim().is_empty() {
                return Err(SkknError::invalid_state("Chưa có phụ lục để xuất"));
            }
            Ok(export_request(
                info,
                inner.state.appendix_document.clone(),
                export::appendix_filename(&info.topic),
            ))
        })?;
        self.export(request).await
    }

    async fn export(&self, request: ExportRequest) -> Result<String> {
        let filename = request.filename.clone();
        match self.exporter.export(request).await {
            Ok(location) => {
                tracing::info!("[Workflow] Exported {}", filename);
                Ok(location)
            }
            Err(err) => {
                tracing::error!("[Workflow] Export of {} failed: {}", filename, err);
                Err(err)
            }
        }
    }

    // ============================================================================
    // Snapshot
    // ============================================================================

    /// Captures the session for persistence. Reference documents are left out.
    pub fn snapshot(&self) -> SessionData {
        let chat_history = self.llm.history();
        self.read(|inner| {
            let state = &inner.state;
            SessionData {
                user_info: SnapshotUserInfo::from_user_info(&state.user_info),
                state: SnapshotState {
                    step: state.step,
                    messages: state.messages.clone(),
                    full_document: state.document.render(),
                    document_blocks: state.document.blocks().to_vec(),
                },
                solutions_state: state.solutions.clone(),
                appendix_document: state.appendix_document.clone(),
                outline_feedback: state.outline_feedback.clone(),
                chat_history,
                saved_at: timestamp_now(),
            }
        })
    }

    /// Reinstates a saved session.
    ///
    /// `reference_documents` is the text recovered from the volatile store.
    /// It is only used when the snapshot had reference documents; when it is
    /// absent, reference documents already loaded are kept.
    pub fn restore_from(&self, data: SessionData, reference_documents: Option<String>) -> Result<()> {
        let SessionData {
            user_info,
            state,
            solutions_state,
            appendix_document,
            outline_feedback,
            chat_history,
            ..
        } = data;
        let document = state.document();
        let has_reference_documents = user_info.has_reference_documents;
        let mut info = user_info.info;
        let human_gated = self.config.review_policy == ReviewPolicy::HumanGated;

        let model = self.update(|inner| {
            ensure_idle(inner)?;
            let loaded = std::mem::take(&mut inner.state.user_info.reference_documents);
            info.reference_documents = if has_reference_documents {
                reference_documents
                    .filter(|text| !text.is_empty())
                    .unwrap_or(loaded)
            } else {
                String::new()
            };
            inner.machine = StepMachine::new(Flow::resolve(&info));

            let awaiting_approval = inner
                .machine
                .flow()
                .review_number(state.step)
                .filter(|n| human_gated && solutions_state.get(*n).is_some_and(|s| !s.is_approved));
            inner.state = EngineState {
                user_info: info,
                step: state.step,
                messages: state.messages,
                document,
                solutions: solutions_state,
                appendix_document,
                outline_feedback,
                awaiting_approval,
                ..Default::default()
            };
            inner.failed = None;
            inner.cancel = None;
            Ok::<_, SkknError>(inner.model.clone())
        })?;

        // initialize() clears the history, so it is replayed on both sides.
        self.llm.set_history(chat_history.clone());
        match self.active_key() {
            Some(key) => self.llm.initialize(&key, &model),
            None => tracing::warn!("[Workflow] Restored without an API key"),
        }
        self.llm.set_history(chat_history);
        tracing::info!("[Workflow] Session restored at step {}", self.read(|inner| inner.state.step));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCredentials, MockKeyPool, MockLlm, RecordingExporter};
    use skkn_core::error::{ErrorClass, LlmError};
    use skkn_core::template::{SkknSection, SkknTemplate};
    use std::collections::BTreeMap;

    struct Harness {
        engine: Arc<WorkflowEngine>,
        llm: Arc<MockLlm>,
        pool: Arc<MockKeyPool>,
        credentials: Arc<MemoryCredentials>,
        exporter: Arc<RecordingExporter>,
    }

    fn quick_config(policy: ReviewPolicy) -> GenerationConfig {
        GenerationConfig {
            review_policy: policy,
            retry_delay_ms: 0,
            manual_retry_delay_ms: 0,
            review_continue_delay_ms: 0,
            ..Default::default()
        }
    }

    fn harness_with(keys: &[&str], config: GenerationConfig) -> Harness {
        let llm = Arc::new(MockLlm::default());
        let pool = Arc::new(MockKeyPool::new(keys));
        let credentials = Arc::new(MemoryCredentials::default());
        let exporter = Arc::new(RecordingExporter::default());
        let engine = WorkflowEngine::new(
            EngineServices {
                llm: llm.clone(),
                key_pool: pool.clone(),
                credentials: credentials.clone(),
                exporter: exporter.clone(),
            },
            config,
        );
        Harness {
            engine: Arc::new(engine),
            llm,
            pool,
            credentials,
            exporter,
        }
    }

    fn harness(policy: ReviewPolicy) -> Harness {
        harness_with(&["key-a", "key-b", "key-c"], quick_config(policy))
    }

    fn user_info() -> UserInfo {
        UserInfo {
            topic: "Nâng cao kỹ năng đọc hiểu".to_string(),
            subject: "Ngữ văn".to_string(),
            school: "THCS Hòa Bình".to_string(),
            num_solutions: 3,
            page_limit: Some(30),
            ..Default::default()
        }
    }

    fn detailed_solution(n: u8) -> String {
        format!(
            "━━━━━━━━━━━━━━━━━━━━━\n📋 GIẢI PHÁP {n}: Tổ chức đọc hiểu theo nhóm\n━━━━━━━━━━━━━━━━━━━━━\n\n1. MỤC TIÊU\n{}\n\n✅ KẾT THÚC GIẢI PHÁP {n}",
            "Học sinh rèn luyện kỹ năng đọc hiểu văn bản. ".repeat(30)
        )
    }

    fn started(policy: ReviewPolicy) -> Harness {
        let h = harness(policy);
        h.engine.set_user_info(user_info()).unwrap();
        h.engine.submit_manual_outline("DÀN Ý SKKN").unwrap();
        h
    }

    #[tokio::test]
    async fn test_manual_outline_requires_key() {
        let h = harness_with(&[], quick_config(ReviewPolicy::AutoApprove));
        let err = h.engine.submit_manual_outline("dàn ý").unwrap_err();
        assert!(matches!(err, SkknError::Config(_)));
        assert_eq!(h.engine.state().step, INPUT_STEP);
    }

    #[tokio::test]
    async fn test_start_generation_streams_outline() {
        let h = harness(ReviewPolicy::AutoApprove);
        h.engine.set_user_info(user_info()).unwrap();
        h.llm.push_chunks(&["DÀN Ý ", "CHI TIẾT"]);

        h.engine.start_generation().await.unwrap();

        let state = h.engine.state();
        assert_eq!(state.step, OUTLINE_STEP);
        assert_eq!(state.document.outline(), "DÀN Ý CHI TIẾT");
        assert!(!state.is_streaming);
        assert_eq!(h.llm.inits(), vec![("key-a".to_string(), "gemini-2.5-flash".to_string())]);
        assert!(h.llm.prompts()[0].contains("Nâng cao kỹ năng đọc hiểu"));
    }

    #[tokio::test]
    async fn test_standard_flow_visits_the_full_chain() {
        let h = started(ReviewPolicy::HumanGated);
        let mut visited = vec![h.engine.state().step];

        while !h.engine.is_completed() {
            let step = h.engine.advance().await.unwrap();
            visited.push(step);
            if let Some(n) = h.engine.state().awaiting_approval {
                h.engine.approve_solution(n).unwrap();
            }
        }

        assert_eq!(visited, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 14, 16]);
        // PART_I_II, PART_III, three solutions and PART_V_VI.
        assert_eq!(h.llm.calls(), 6);
        let state = h.engine.state();
        assert_eq!(state.document.blocks().len(), 7);
        assert_eq!(state.solutions.approved_count(), 3);
        assert!(state.solutions.get(4).is_none());
        assert!(h.engine.advance().await.unwrap_err().is_invalid_state());
    }

    #[tokio::test]
    async fn test_transient_step_leaves_document_untouched() {
        let h = started(ReviewPolicy::HumanGated);
        for _ in 0..3 {
            h.engine.advance().await.unwrap();
        }
        assert_eq!(h.engine.state().step, 4);
        let before = h.engine.state().full_document();

        assert_eq!(h.engine.advance().await.unwrap(), 5);
        let state = h.engine.state();
        assert_eq!(state.full_document(), before);
        assert_eq!(state.awaiting_approval, Some(1));
        assert_eq!(
            state.messages.last().map(|m| m.text.clone()),
            Some(prompts::solution_done_status(1))
        );
        assert!(h.engine.advance().await.unwrap_err().is_invalid_state());
    }

    #[tokio::test]
    async fn test_auto_approve_continues_to_next_solution() {
        let h = started(ReviewPolicy::AutoApprove);
        h.llm.push_reply("PHẦN I & II");
        h.llm.push_reply("PHẦN III");
        h.llm.push_reply(&detailed_solution(1));
        for _ in 0..3 {
            h.engine.advance().await.unwrap();
        }

        assert_eq!(h.engine.advance().await.unwrap(), 6);

        let state = h.engine.state();
        let first = state.solutions.get(1).unwrap();
        assert!(first.is_approved);
        assert!(first.content.contains("1. MỤC TIÊU"));
        assert!(state.awaiting_approval.is_none());
        assert_eq!(h.llm.calls(), 4);
    }

    #[tokio::test]
    async fn test_unlocatable_solution_gets_placeholder() {
        let h = started(ReviewPolicy::HumanGated);
        for _ in 0..4 {
            h.engine.advance().await.unwrap();
        }
        let solution = h.engine.state().solutions.get(1).cloned().unwrap();
        assert_eq!(solution.content, locator::not_found_placeholder(1));
        assert!(!solution.is_approved);
    }

    #[tokio::test]
    async fn test_quota_failure_retries_exactly_once() {
        let h = started(ReviewPolicy::AutoApprove);
        h.llm.push_failure(LlmError::http(429, "RESOURCE_EXHAUSTED: quota"));
        h.llm.push_failure(LlmError::http(429, "RESOURCE_EXHAUSTED: quota"));

        let err = h.engine.advance().await.unwrap_err();

        assert_eq!(err.generation_class(), Some(ErrorClass::QuotaExceeded));
        assert_eq!(h.llm.calls(), 2);
        assert_eq!(h.pool.marked(), vec!["key-a".to_string()]);
        let state = h.engine.state();
        assert_eq!(state.step, OUTLINE_STEP);
        assert!(!state.is_streaming);
        assert_eq!(state.error.as_ref().map(|e| e.class), Some(ErrorClass::QuotaExceeded));
        assert_eq!(h.credentials.stored().api_key.as_deref(), Some("key-b"));
        assert!(h.llm.inits().iter().any(|(key, _)| key == "key-b"));
    }

    #[tokio::test]
    async fn test_unclassified_failure_is_not_retried() {
        let h = started(ReviewPolicy::AutoApprove);
        h.llm.push_failure(LlmError::http(500, "backend error"));

        assert!(h.engine.advance().await.unwrap_err().is_generation());
        assert_eq!(h.llm.calls(), 1);
        assert!(h.pool.marked().is_empty());
        assert!(h.engine.state().error.is_some());
    }

    #[tokio::test]
    async fn test_manual_retry_reruns_failed_step() {
        let h = started(ReviewPolicy::AutoApprove);
        h.llm.push_failure(LlmError::http(500, "backend error"));
        h.engine.advance().await.unwrap_err();

        h.engine.retry_with_rotation().await.unwrap();

        let state = h.engine.state();
        assert_eq!(state.step, 2);
        assert!(state.error.is_none());
        assert_eq!(h.engine.active_key().as_deref(), Some("key-b"));
        assert!(h.engine.retry_with_rotation().await.unwrap_err().is_invalid_state());
    }

    #[tokio::test]
    async fn test_cancel_keeps_step_and_partial_block() {
        let h = started(ReviewPolicy::AutoApprove);
        h.llm.push_wait_for_cancel();

        let engine = h.engine.clone();
        let task = tokio::spawn(async move { engine.advance().await });
        while !h.engine.state().is_streaming {
            tokio::task::yield_now().await;
        }
        assert!(matches!(h.engine.start_generation().await, Err(SkknError::Busy)));
        assert!(h.engine.cancel());

        let result = task.await.unwrap();
        assert!(matches!(result, Err(SkknError::Cancelled)));
        let state = h.engine.state();
        assert_eq!(state.step, OUTLINE_STEP);
        assert!(!state.is_streaming);
        assert!(state.error.is_none());
        assert_eq!(state.document.block(2).map(|b| b.content.as_str()), Some("một phần"));
        assert!(!h.engine.cancel());
    }

    #[tokio::test]
    async fn test_back_jump_discards_later_blocks_on_regeneration() {
        let h = started(ReviewPolicy::AutoApprove);
        h.llm.push_reply("PHẦN I & II cũ");
        h.llm.push_reply("PHẦN III cũ");
        h.engine.advance().await.unwrap();
        h.engine.advance().await.unwrap();

        assert!(h.engine.jump_to_step(3).unwrap_err().is_invalid_state());
        h.engine.jump_to_step(OUTLINE_STEP).unwrap();
        h.llm.push_reply("PHẦN I & II mới");
        assert_eq!(h.engine.advance().await.unwrap(), 2);

        let document = h.engine.state().full_document();
        assert!(document.contains("PHẦN I & II mới"));
        assert!(!document.contains("cũ"));
        assert_eq!(h.engine.state().document.blocks().len(), 2);
    }

    #[tokio::test]
    async fn test_regenerate_outline_uses_feedback() {
        let h = started(ReviewPolicy::AutoApprove);
        assert!(h.engine.regenerate_outline().await.unwrap_err().is_invalid_state());

        h.engine.set_outline_feedback("Thêm giải pháp về công nghệ");
        h.llm.push_reply("DÀN Ý MỚI");
        h.engine.regenerate_outline().await.unwrap();

        let state = h.engine.state();
        assert_eq!(state.full_document(), "DÀN Ý MỚI");
        assert!(state.outline_feedback.is_empty());
        assert!(h.llm.prompts()[0].contains("Thêm giải pháp về công nghệ"));
    }

    #[tokio::test]
    async fn test_failed_outline_regeneration_keeps_previous_outline() {
        let h = started(ReviewPolicy::AutoApprove);
        h.engine.set_outline_feedback("ngắn gọn hơn");
        h.llm.push_failure(LlmError::http(500, "backend error"));

        h.engine.regenerate_outline().await.unwrap_err();

        let state = h.engine.state();
        assert_eq!(state.full_document(), "DÀN Ý SKKN");
        assert_eq!(state.outline_feedback, "ngắn gọn hơn");
    }

    #[tokio::test]
    async fn test_edit_outline_only_on_outline_step() {
        let h = started(ReviewPolicy::AutoApprove);
        h.engine.edit_outline("DÀN Ý ĐÃ SỬA").unwrap();
        assert_eq!(h.engine.state().full_document(), "DÀN Ý ĐÃ SỬA");

        h.engine.advance().await.unwrap();
        assert!(h.engine.edit_outline("x").unwrap_err().is_invalid_state());
        assert!(h.engine.set_user_info(user_info()).unwrap_err().is_invalid_state());
    }

    #[tokio::test]
    async fn test_revise_solution_keeps_history_and_approval() {
        let h = started(ReviewPolicy::HumanGated);
        for _ in 0..4 {
            h.engine.advance().await.unwrap();
        }
        h.engine.approve_solution(1).unwrap();
        let original = h.engine.state().solutions.get(1).unwrap().content.clone();
        let document = h.engine.state().full_document();

        h.llm.push_reply("  GIẢI PHÁP 1 ĐÃ SỬA  ");
        h.engine
            .revise_solution(1, "Thêm ví dụ minh họa", Some("tài liệu tham khảo"))
            .await
            .unwrap();

        let state = h.engine.state();
        let solution = state.solutions.get(1).unwrap();
        assert_eq!(solution.content, "GIẢI PHÁP 1 ĐÃ SỬA");
        assert_eq!(solution.revision_history, vec![original]);
        assert!(solution.is_approved);
        assert_eq!(state.full_document(), document);
        assert!(state.revision_draft.is_empty());
        assert!(
            h.engine
                .revise_solution(2, "x", None)
                .await
                .unwrap_err()
                .to_string()
                .contains("solution")
        );
    }

    #[tokio::test]
    async fn test_appendix_needs_finished_body() {
        let h = started(ReviewPolicy::AutoApprove);
        assert!(h.engine.generate_appendix().await.unwrap_err().is_invalid_state());

        while !h.engine.is_completed() {
            h.engine.advance().await.unwrap();
        }
        let document = h.engine.state().full_document();
        h.llm.push_reply("PHỤ LỤC 1");
        h.engine.generate_appendix().await.unwrap();

        let state = h.engine.state();
        assert_eq!(state.appendix_document, "PHỤ LỤC 1");
        assert_eq!(state.full_document(), document);
        assert_eq!(state.step, GenerationStep::Completed.index());
    }

    #[tokio::test]
    async fn test_custom_template_flow() {
        let h = harness(ReviewPolicy::AutoApprove);
        let template = SkknTemplate {
            name: "Mẫu Sở GD".to_string(),
            sections: vec![
                SkknSection::new("1", 1, "Mở đầu"),
                SkknSection::new("2", 1, "Kết luận"),
            ],
            header_fields: Some(BTreeMap::from([(
                "tenSangKien".to_string(),
                "Tên sáng kiến".to_string(),
            )])),
            ..Default::default()
        };
        let mut info = user_info();
        info.apply_template(&template).unwrap();
        h.engine.set_user_info(info).unwrap();
        h.engine.submit_manual_outline("DÀN Ý").unwrap();

        assert_eq!(h.engine.advance().await.unwrap(), 2);
        assert_eq!(h.engine.advance().await.unwrap(), 3);
        let before = h.engine.state().full_document();
        assert_eq!(h.engine.advance().await.unwrap(), 5);
        assert!(h.engine.is_completed());
        assert_eq!(h.engine.state().full_document(), before);
        assert_eq!(h.llm.calls(), 2);

        h.engine.export_document().await.unwrap();
        let request = &h.exporter.requests()[0];
        assert_eq!(request.filename, "SKKN_Nâng_cao_kỹ_năng_đọc_hiểu.docx");
        assert!(request.header_fields.as_ref().unwrap().contains_key("tenSangKien"));
        assert_eq!(request.metadata.as_ref().unwrap().school, "THCS Hòa Bình");
    }

    #[tokio::test]
    async fn test_exports_need_content() {
        let h = harness(ReviewPolicy::AutoApprove);
        assert!(h.engine.export_document().await.unwrap_err().is_invalid_state());
        assert!(h.engine.export_appendix().await.unwrap_err().is_invalid_state());
        assert!(matches!(
            h.engine.export_solution(1).await,
            Err(SkknError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_snapshot_restore_round_trip() {
        let h = harness(ReviewPolicy::HumanGated);
        h.engine
            .set_user_info(UserInfo {
                reference_documents: "tài liệu rất dài".to_string(),
                ..user_info()
            })
            .unwrap();
        h.engine.submit_manual_outline("DÀN Ý SKKN").unwrap();
        for _ in 0..4 {
            h.engine.advance().await.unwrap();
        }
        h.llm.push_failure(LlmError::http(500, "backend error"));
        h.engine.approve_solution(1).unwrap();
        h.engine.advance().await.unwrap_err();
        assert!(h.engine.state().error.is_some());

        let saved = h.engine.state();
        let json = h.engine.snapshot().to_json().unwrap();

        let other = harness(ReviewPolicy::HumanGated);
        let data = SessionData::from_json(&json).unwrap();
        other
            .engine
            .restore_from(data, Some("tài liệu rất dài".to_string()))
            .unwrap();

        let restored = other.engine.state();
        assert_eq!(restored.step, saved.step);
        assert_eq!(restored.full_document(), saved.full_document());
        assert_eq!(restored.document, saved.document);
        assert_eq!(restored.solutions, saved.solutions);
        assert!(!restored.is_streaming);
        assert!(restored.error.is_none());
        assert_eq!(other.engine.reference_documents(), "tài liệu rất dài");
        assert_eq!(other.llm.history(), h.llm.history());
        assert_eq!(other.llm.inits().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_at_unapproved_review_waits_for_approval() {
        let h = started(ReviewPolicy::HumanGated);
        for _ in 0..4 {
            h.engine.advance().await.unwrap();
        }
        let data = h.engine.snapshot();

        let other = harness(ReviewPolicy::HumanGated);
        other.engine.restore_from(data, None).unwrap();
        assert_eq!(other.engine.state().awaiting_approval, Some(1));
    }

    #[tokio::test]
    async fn test_change_api_key_clears_error_and_persists() {
        let h = started(ReviewPolicy::AutoApprove);
        h.llm.push_failure(LlmError::http(500, "backend error"));
        h.engine.advance().await.unwrap_err();

        h.engine.change_api_key(" key-new ", "gemini-2.5-pro").await.unwrap();

        assert!(h.engine.state().error.is_none());
        assert_eq!(h.engine.active_key().as_deref(), Some("key-new"));
        assert_eq!(h.engine.model(), "gemini-2.5-pro");
        assert_eq!(h.credentials.stored().model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(
            h.llm.inits().last(),
            Some(&("key-new".to_string(), "gemini-2.5-pro".to_string()))
        );
        assert!(h.engine.change_api_key("  ", "m").await.is_err());
    }

    #[tokio::test]
    async fn test_change_api_key_rejected_while_streaming() {
        let h = started(ReviewPolicy::AutoApprove);
        h.llm.push_wait_for_cancel();

        let engine = h.engine.clone();
        let task = tokio::spawn(async move { engine.advance().await });
        while !h.engine.state().is_streaming {
            tokio::task::yield_now().await;
        }
        let inits = h.llm.inits().len();
        let result = h.engine.change_api_key("key-new", "gemini-2.5-pro").await;
        assert!(matches!(result, Err(SkknError::Busy)));
        assert_eq!(h.llm.inits().len(), inits);
        assert!(h.credentials.stored().api_key.is_none());

        assert!(h.engine.cancel());
        assert!(matches!(task.await.unwrap(), Err(SkknError::Cancelled)));
        h.engine.change_api_key("key-new", "gemini-2.5-pro").await.unwrap();
        assert_eq!(h.engine.active_key().as_deref(), Some("key-new"));
    }

    #[tokio::test]
    async fn test_restore_ignores_stale_reference_documents() {
        let h = started(ReviewPolicy::AutoApprove);
        let data = h.engine.snapshot();
        assert!(!data.user_info.has_reference_documents);

        let other = harness(ReviewPolicy::AutoApprove);
        other
            .engine
            .restore_from(data, Some("tài liệu của phiên cũ".to_string()))
            .unwrap();
        assert!(other.engine.reference_documents().is_empty());
    }

    #[tokio::test]
    async fn test_acknowledged_transient_step_discards_reply() {
        let config = GenerationConfig {
            acknowledge_transient_steps: true,
            ..quick_config(ReviewPolicy::HumanGated)
        };
        let h = harness_with(&["key-a"], config);
        h.engine.set_user_info(user_info()).unwrap();
        h.engine.submit_manual_outline("DÀN Ý").unwrap();
        for _ in 0..3 {
            h.engine.advance().await.unwrap();
        }
        let before = h.engine.state().full_document();

        h.llm.push_reply("Đã hiểu");
        assert_eq!(h.engine.advance().await.unwrap(), 5);
        assert_eq!(h.engine.state().full_document(), before);
        assert_eq!(h.llm.calls(), 4);
        assert_eq!(h.llm.prompts()[3], prompts::solution_done_status(1));
    }
}
