//! 事件系统定义
//!
//! 用于检索引擎与 UI 之间的完全解耦通信

use flume::{Receiver, Sender};

/// 检索事件类型
#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// 检索开始
    SearchStarted { query: String },

    /// 种子集合 (排序列表) 已加载
    SeedLoaded { count: usize },

    /// 单个检索词解析完成
    TermResolved { term: String, count: usize },

    /// 单个检索词解析失败 (已降级为空集)
    TermFailed { term: String, error: String },

    /// 集合组合完成
    ResultComposed { total: usize },

    /// 开始拉取条目详情
    EntriesRequested { total: usize },

    /// 条目详情拉取进度
    EntryFetched { current: usize, total: usize, title: String },

    /// 条目详情拉取失败 (已跳过)
    EntrySkipped { id: u32, error: String },

    /// CDN 分片配置已刷新
    ShardConfigRefreshed { cases: usize },

    /// 检索完成
    SearchCompleted { returned: usize, has_more: bool },

    /// 检索失败
    SearchFailed { error: String },
}

/// 事件发送器
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<SearchEvent>,
}

impl EventSender {
    pub fn new(tx: Sender<SearchEvent>) -> Self {
        Self { tx }
    }

    /// 发送事件
    pub fn emit(&self, event: SearchEvent) {
        let _ = self.tx.send(event);
    }
}

/// 事件接收器
pub struct EventReceiver {
    rx: Receiver<SearchEvent>,
}

impl EventReceiver {
    pub fn new(rx: Receiver<SearchEvent>) -> Self {
        Self { rx }
    }

    /// 非阻塞接收事件
    pub fn try_recv(&self) -> Option<SearchEvent> {
        self.rx.try_recv().ok()
    }

    /// 异步接收事件
    pub async fn recv_async(&self) -> Option<SearchEvent> {
        self.rx.recv_async().await.ok()
    }
}

/// 创建事件通道
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = flume::unbounded();
    (EventSender::new(tx), EventReceiver::new(rx))
}

/// 可选事件出口，未挂载发送器时静默丢弃
#[derive(Clone, Default)]
pub struct Events(Option<EventSender>);

impl Events {
    pub fn new(sender: Option<EventSender>) -> Self {
        Self(sender)
    }

    pub fn emit(&self, event: SearchEvent) {
        if let Some(ref sender) = self.0 {
            sender.emit(event);
        }
    }
}
