//! 终端进度渲染 (Terminal Progress)
//!
//! 基于 `indicatif` 将检索事件渲染为状态条与详情拉取进度条。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::core::event::{EventReceiver, SearchEvent};

/// 全局 TUI 容器
static MULTI: OnceLock<MultiProgress> = OnceLock::new();

/// 获取全局进度容器实例
pub fn get_multi() -> &'static MultiProgress {
    MULTI.get_or_init(MultiProgress::new)
}

/// TUI 状态容器
#[derive(Default)]
pub struct UiState {
    /// 检索状态条
    main_bar: Option<ProgressBar>,
    /// 详情拉取进度条
    entry_bar: Option<ProgressBar>,
}

static STATE: OnceLock<Arc<RwLock<UiState>>> = OnceLock::new();

fn get_state() -> &'static Arc<RwLock<UiState>> {
    STATE.get_or_init(|| Arc::new(RwLock::new(UiState::default())))
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
}

/// 进度协调器
pub struct Ui;

impl Ui {
    /// 启动事件监听循环，发送端全部关闭后结束
    pub fn run(receiver: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv_async().await {
                Self::handle_event(event);
            }
            Self::finish();
        })
    }

    fn main_bar(ui: &mut UiState) -> &ProgressBar {
        ui.main_bar.get_or_insert_with(|| {
            let bar = get_multi().add(ProgressBar::new_spinner());
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        })
    }

    fn handle_event(event: SearchEvent) {
        let mut ui = get_state().write();

        match event {
            SearchEvent::SearchStarted { query } => {
                let shown = if query.is_empty() { "<all>" } else { query.as_str() };
                Self::main_bar(&mut ui).set_message(format!("🔎 {}", truncate_string(shown, 40)));
            }
            SearchEvent::SeedLoaded { count } => {
                Self::main_bar(&mut ui).set_message(format!("📋 排序列表 {} 条", count));
            }
            SearchEvent::TermResolved { term, count } => {
                Self::main_bar(&mut ui).set_message(format!("✔ {} → {}", truncate_string(&term, 30), count));
            }
            SearchEvent::TermFailed { term, .. } => {
                Self::main_bar(&mut ui).set_message(format!("⚠️ {} → 0", truncate_string(&term, 30)));
            }
            SearchEvent::ResultComposed { total } => {
                Self::main_bar(&mut ui).set_message(format!("🧮 共 {} 条结果", total));
            }
            SearchEvent::ShardConfigRefreshed { cases } => {
                Self::main_bar(&mut ui).set_message(format!("🌐 CDN 分片表 {} 项", cases));
            }
            SearchEvent::EntriesRequested { total } => {
                if let Some(old) = ui.entry_bar.take() {
                    old.finish_and_clear();
                }
                let bar = get_multi().add(ProgressBar::new(total as u64));
                bar.set_style(bar_style());
                ui.entry_bar = Some(bar);
            }
            SearchEvent::EntryFetched { current, title, .. } => {
                if let Some(ref bar) = ui.entry_bar {
                    bar.set_position(current as u64);
                    bar.set_message(truncate_string(&title, 30));
                }
            }
            SearchEvent::EntrySkipped { id, .. } => {
                if let Some(ref bar) = ui.entry_bar {
                    bar.set_message(format!("⏭ #{}", id));
                }
            }
            SearchEvent::SearchCompleted { returned, has_more } => {
                if let Some(ref bar) = ui.entry_bar {
                    bar.finish_and_clear();
                }
                let more = if has_more { "，还有更多" } else { "" };
                Self::main_bar(&mut ui).set_message(format!("✅ 返回 {} 条{}", returned, more));
            }
            SearchEvent::SearchFailed { error } => {
                Self::main_bar(&mut ui).abandon_with_message(format!("❌ FAILED: {}", error));
            }
        }
    }

    fn finish() {
        let mut ui = get_state().write();
        if let Some(bar) = ui.entry_bar.take() {
            bar.finish_and_clear();
        }
        if let Some(bar) = ui.main_bar.take()
            && !bar.is_finished()
        {
            bar.finish();
        }
    }
}

/// 按字符数截断
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
