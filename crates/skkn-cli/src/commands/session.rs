use super::context::{self, Settings};
use anyhow::Result;
use skkn_core::session::SessionData;
use skkn_core::step::Flow;
use skkn_core::storage::{SESSION_REF_DOCS_KEY, SnapshotStore, VolatileStore};

pub async fn status() -> Result<()> {
    let store = context::snapshot_store()?;
    let Some(raw) = store.load().await? else {
        println!("Không có phiên làm việc đã lưu.");
        return Ok(());
    };

    let data = match SessionData::from_json(&raw) {
        Ok(data) => data,
        Err(err) => {
            println!("Phiên đã lưu bị hỏng ({err}). Chạy `skkn session clear` để xoá.");
            return Ok(());
        }
    };

    print!("{}", describe(&data));
    Ok(())
}

pub async fn clear() -> Result<()> {
    let settings = Settings::load()?;
    context::snapshot_store()?.clear().await?;
    context::volatile_store(&settings)
        .remove(SESSION_REF_DOCS_KEY)
        .await?;
    println!("Đã xoá phiên làm việc đã lưu.");
    Ok(())
}

fn describe(data: &SessionData) -> String {
    let step = data.step();
    let flow = Flow::resolve(&data.user_info.info);
    let label = flow
        .step_info(step)
        .map(|info| info.label)
        .unwrap_or_else(|| "?".to_string());
    let solutions = match flow {
        Flow::Standard { solutions } => solutions,
        Flow::Custom { .. } => 0,
    };

    let mut out = String::new();
    out.push_str(&format!("Đề tài:     {}\n", data.user_info.info.topic));
    out.push_str(&format!("Bước:       {step} ({label})\n"));
    out.push_str(&format!("Lưu lúc:    {}\n", data.saved_at));
    out.push_str(&format!(
        "Độ dài:     {} ký tự\n",
        data.state.full_document.chars().count()
    ));
    if solutions > 0 {
        out.push_str(&format!(
            "Giải pháp:  {}/{} đã duyệt\n",
            data.solutions_state.approved_count(),
            solutions
        ));
    }
    if !data.appendix_document.is_empty() {
        out.push_str("Phụ lục:    đã có\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use skkn_core::session::{SnapshotState, SnapshotUserInfo};
    use skkn_core::solutions::SolutionContent;
    use skkn_core::user_info::UserInfo;

    #[test]
    fn test_describe_standard_session() {
        let mut data = SessionData {
            user_info: SnapshotUserInfo::from_user_info(&UserInfo {
                topic: "Đọc hiểu văn bản".to_string(),
                ..Default::default()
            }),
            state: SnapshotState {
                step: 4,
                full_document: "Dàn ý".to_string(),
                ..Default::default()
            },
            solutions_state: Default::default(),
            appendix_document: String::new(),
            outline_feedback: String::new(),
            chat_history: Vec::new(),
            saved_at: "2026-10-14T08:00:00.000Z".to_string(),
        };
        data.solutions_state.set(1, SolutionContent::located("GP1", true));

        let text = describe(&data);
        assert!(text.contains("Đề tài:     Đọc hiểu văn bản"));
        assert!(text.contains("Độ dài:     5 ký tự"));
        assert!(text.contains("Giải pháp:  1/3 đã duyệt"));
        assert!(!text.contains("Phụ lục"));
    }
}
