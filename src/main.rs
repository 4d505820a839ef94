//! 应用程序入口 (Application Entrypoint)
//!
//! 负责 CLI 指令解析、日志初始化、依赖注入及取消信号处理。

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

use gallery_index::core::config::AppConfig;
use gallery_index::core::event::{Events, create_event_channel};
use gallery_index::engine::GalleryCatalog;
use gallery_index::interfaces::{Catalog, RangeSource};
use gallery_index::network::{HttpRangeSource, HttpService, Session};
use gallery_index::search::filters::{GalleryType, SearchFilters, SortBy, TextFilterKind};
use gallery_index::ui::{Ui, get_multi};

/// 进度条感知的日志写入器
///
/// 确保日志输出不会破坏终端进度条的渲染布局。
struct IndicatifWriter;

impl io::Write for IndicatifWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let _ = get_multi().println(s.trim_end());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for IndicatifWriter {
    type Writer = IndicatifWriter;

    fn make_writer(&self) -> Self::Writer {
        IndicatifWriter
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 配置文件路径 (默认 `config.toml`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 覆盖检索语言
    #[arg(short, long, global = true)]
    language: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 年度热门列表
    Popular {
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// 最新上架列表
    Latest {
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// 组合检索
    Search(SearchArgs),
    /// 单个画廊详情与章节
    Gallery { id: u32 },
    /// 画廊图片页
    Pages {
        id: u32,
        /// 额外拉取首张图片以验证 CDN 地址
        #[arg(long)]
        verify: bool,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// 检索文本 (`-` 前缀排除，`ns:value` 限定命名空间)
    #[arg(allow_hyphen_values = true)]
    query: Vec<String>,
    #[arg(short, long, default_value_t = 1)]
    page: usize,
    /// 要浏览的页数，复用第一页计算的结果集
    #[arg(long, default_value_t = 1)]
    pages: usize,
    #[arg(short, long, default_value = "date-added")]
    sort: SortBy,
    /// 排除的画廊类型
    #[arg(long = "exclude-type")]
    exclude_types: Vec<GalleryType>,
    #[arg(long)]
    tags: Option<String>,
    #[arg(long)]
    male_tags: Option<String>,
    #[arg(long)]
    female_tags: Option<String>,
    #[arg(long)]
    artists: Option<String>,
    #[arg(long)]
    groups: Option<String>,
    #[arg(long)]
    series: Option<String>,
    #[arg(long)]
    characters: Option<String>,
}

impl SearchArgs {
    fn filters(&self) -> SearchFilters {
        let mut filters = SearchFilters::default().with_sort(self.sort);
        for kind in &self.exclude_types {
            filters = filters.without_type(*kind);
        }

        let text = [
            (TextFilterKind::Tags, &self.tags),
            (TextFilterKind::MaleTags, &self.male_tags),
            (TextFilterKind::FemaleTags, &self.female_tags),
            (TextFilterKind::Artists, &self.artists),
            (TextFilterKind::Groups, &self.groups),
            (TextFilterKind::Series, &self.series),
            (TextFilterKind::Characters, &self.characters),
        ];
        for (kind, values) in text {
            if let Some(values) = values {
                filters = filters.with_text(kind, values.as_str());
            }
        }
        filters
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(IndicatifWriter)
        .with_target(false)
        .with_ansi(true)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(language) = cli.language {
        config.language = language;
    }
    let config = Arc::new(config);

    let session = Arc::new(Session::from_config(&config));
    let http = HttpService::new(&config, session)?;
    let source = Arc::new(HttpRangeSource::new(http));

    // 信号处理：Ctrl-C 取消进行中的检索
    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    let (event_sender, event_receiver) = create_event_channel();
    let ui_handle = Ui::run(event_receiver);

    // 作用域结束时释放发送端，UI 循环随之退出
    {
        let catalog = GalleryCatalog::new(
            source.clone() as Arc<dyn RangeSource>,
            config.clone(),
            Events::new(Some(event_sender)),
            cancel,
        );

        match cli.command {
            Commands::Popular { page } => {
                let result = catalog.popular(page).await?;
                for entry in &result.entries {
                    print_json(entry)?;
                }
                tracing::info!("has_more = {}", result.has_more);
            }
            Commands::Latest { page } => {
                let result = catalog.latest(page).await?;
                for entry in &result.entries {
                    print_json(entry)?;
                }
                tracing::info!("has_more = {}", result.has_more);
            }
            Commands::Search(args) => {
                let query = args.query.join(" ");
                let filters = args.filters();
                for page in args.page..args.page + args.pages.max(1) {
                    let result = catalog.search(page, &query, &filters).await?;
                    for entry in &result.entries {
                        print_json(entry)?;
                    }
                    if !result.has_more {
                        break;
                    }
                }
            }
            Commands::Gallery { id } => {
                print_json(&catalog.details(id).await?)?;
                for chapter in catalog.chapters(id).await? {
                    print_json(&chapter)?;
                }
            }
            Commands::Pages { id, verify } => {
                let pages = catalog.pages(id).await?;
                for page in &pages {
                    print_json(page)?;
                }
                if verify && let Some(first) = pages.first() {
                    let bytes = source.fetch_image(first).await?;
                    tracing::info!("首张图片 {} 字节: {}", bytes.len(), first.image_url);
                }
            }
        }

        tracing::info!("{} 执行完成", catalog.id());
    }

    let _ = ui_handle.await;
    Ok(())
}
