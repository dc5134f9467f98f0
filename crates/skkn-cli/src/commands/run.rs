use super::context::{Settings, build_controller};
use super::prompt;
use anyhow::{Context, Result, bail};
use clap::Args;
use skkn_application::{SessionController, WorkflowEngine};
use skkn_core::banner::ErrorBanner;
use skkn_core::config::ReviewPolicy;
use skkn_core::template::SkknTemplate;
use skkn_core::user_info::UserInfo;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args)]
pub struct RunArgs {
    /// User info JSON, with the field names of the session snapshot
    #[arg(long)]
    pub info: Option<PathBuf>,
    /// Template JSON extracted from a school's report form
    #[arg(long)]
    pub template: Option<PathBuf>,
    /// Resume the saved session without asking
    #[arg(long, conflicts_with = "discard")]
    pub restore: bool,
    /// Drop the saved session without asking
    #[arg(long)]
    pub discard: bool,
    #[arg(long)]
    pub model: Option<String>,
    /// Also write the appendix once the report is complete
    #[arg(long)]
    pub appendix: bool,
    /// Stop at every solution review and ask for approval
    #[arg(long)]
    pub review: bool,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let mut settings = Settings::load()?;
    if args.review {
        settings.config.generation.review_policy = ReviewPolicy::HumanGated;
    }
    let controller = build_controller(&settings, args.model.as_deref()).await?;
    let engine = controller.engine().clone();
    spawn_cancel_on_ctrl_c(engine.clone());

    let restored = resume_or_discard(&controller, &args).await?;
    if !restored {
        let Some(info_path) = args.info.as_deref() else {
            bail!("--info is required when no saved session is resumed");
        };
        let info = load_user_info(info_path, args.template.as_deref())?;
        engine.set_user_info(info)?;
    }

    controller.start_autosave();
    let outcome = drive(&engine, &args, restored).await;
    controller.stop_autosave();
    if engine.state().has_started() {
        if let Err(err) = controller.save_now().await {
            tracing::warn!("[Run] Final save failed: {}", err);
        }
    }
    outcome
}

async fn drive(engine: &WorkflowEngine, args: &RunArgs, restored: bool) -> Result<()> {
    if !restored {
        println!("Đang lập dàn ý...");
        settle(engine, engine.start_generation().await).await?;
        print_progress(engine);
    }

    while !engine.is_completed() {
        if let Some(number) = engine.state().awaiting_approval {
            review_solution(engine, number).await?;
            continue;
        }
        let result = engine.advance().await.map(|_| ());
        settle(engine, result).await?;
        print_progress(engine);
    }

    if args.appendix {
        println!("Đang viết phụ lục...");
        settle(engine, engine.generate_appendix().await).await?;
    }

    let location = engine.export_document().await?;
    println!("Đã xuất SKKN: {location}");
    if args.appendix {
        let location = engine.export_appendix().await?;
        println!("Đã xuất phụ lục: {location}");
    }
    Ok(())
}

/// Applies `--restore`/`--discard`, or asks. Returns whether a session was restored.
async fn resume_or_discard(controller: &SessionController, args: &RunArgs) -> Result<bool> {
    let Some(pending) = controller.pending_restore().await else {
        return Ok(false);
    };

    let restore = if args.restore {
        true
    } else if args.discard {
        false
    } else {
        let question = format!(
            "Có phiên làm việc đang dở (đề tài \"{}\", bước {}, lưu lúc {}). Tiếp tục?",
            pending.user_info.info.topic,
            pending.step(),
            pending.saved_at
        );
        prompt::confirm(&question).await?
    };

    if restore {
        controller.apply_restore(pending).await?;
        println!("Đã khôi phục phiên làm việc.");
    } else {
        controller.discard().await?;
        println!("Đã xoá phiên làm việc cũ.");
    }
    Ok(restore)
}

fn load_user_info(path: &Path, template: Option<&Path>) -> Result<UserInfo> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut info: UserInfo = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if let Some(template_path) = template {
        let raw = std::fs::read_to_string(template_path)
            .with_context(|| format!("Failed to read {}", template_path.display()))?;
        let template = SkknTemplate::from_json(&raw)?;
        if !template.has_sections() {
            tracing::warn!("[Run] Template has no sections, using the standard structure");
        }
        info.apply_template(&template)?;
    }
    Ok(info)
}

/// Asks until solution `number` is approved, revising it on feedback.
async fn review_solution(engine: &WorkflowEngine, number: u8) -> Result<()> {
    let state = engine.state();
    if let Some(solution) = state.solutions.get(number) {
        println!("\n--- Giải pháp {number} ---\n{}\n", solution.content);
    }

    let answer = prompt::ask(&format!(
        "Duyệt giải pháp {number}? Enter để duyệt, hoặc nhập góp ý để viết lại:"
    ))
    .await?;
    if answer.is_empty() || answer.eq_ignore_ascii_case("y") {
        engine.approve_solution(number)?;
        println!("✓ Đã duyệt giải pháp {number}");
        return Ok(());
    }

    println!("Đang viết lại giải pháp {number}...");
    let result = engine.revise_solution(number, &answer, None).await;
    settle(engine, result).await
}

/// Turns a failed operation into a retry prompt while the user keeps saying yes.
async fn settle(engine: &WorkflowEngine, result: skkn_core::Result<()>) -> Result<()> {
    let mut result = result;
    loop {
        let err = match result {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        if err.is_cancelled() {
            bail!("Đã dừng tạo nội dung. Tiến trình đã lưu, chạy lại với --restore để tiếp tục.");
        }
        let Some(banner) = engine.state().error else {
            return Err(err.into());
        };
        print_banner(&banner);
        if !prompt::confirm("Thử lại với API key kế tiếp?").await? {
            return Err(err.into());
        }
        result = engine.retry_with_rotation().await;
    }
}

fn print_banner(banner: &ErrorBanner) {
    eprintln!("\n✗ {}", banner.title);
    eprintln!("  {}", banner.message);
    for suggestion in &banner.suggestions {
        eprintln!("  - {suggestion}");
    }
}

fn print_progress(engine: &WorkflowEngine) {
    let step = engine.state().step;
    if let Some(info) = engine.flow().step_info(step) {
        println!("✓ {} ({})", info.label, info.description);
    }
}

/// The first Ctrl-C cancels the running stream. With nothing streaming it exits.
fn spawn_cancel_on_ctrl_c(engine: Arc<WorkflowEngine>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !engine.cancel() {
                std::process::exit(130);
            }
        }
    });
}
