//! 刷新协调器
//!
//! 单个 tokio 任务独占位置存储库的全部写操作。图钉意图和网络请求的完成结果
//! 都以消息的形式送入该任务，按到达顺序逐条处理。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::common::MapLocation;
use crate::database::{LocationEntity, LocationRepository};
use crate::error::{CoordinatorError, FetchError, SearchError};
use crate::search::PhotoSource;

mod worker;

use worker::Coordinator;

/// 协调器发出的通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// 网络活动指示开关
    NetworkActivity(bool),
    /// 该位置的图片集合发生变化，需要重新渲染
    PhotoGridChanged(MapLocation),
}

/// 协调器当前状态
#[derive(Debug, Clone, Default, Serialize)]
pub struct Status {
    pub network_active: bool,
    pub selected: Option<MapLocation>,
    /// 当前刷新轮次编号
    pub cycle: u64,
    /// 当前轮次尚未完成的下载数
    pub outstanding: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CoordinatorOptions {
    /// 同一轮次内同时进行的下载数上限，None 表示不限制
    pub max_concurrent_fetches: Option<usize>,
}

pub(crate) type Reply<T> = oneshot::Sender<Result<T, CoordinatorError>>;

pub(crate) enum Message {
    PlacePin {
        location: MapLocation,
        reply: Reply<LocationEntity>,
    },
    SelectPin {
        location: MapLocation,
        reply: Reply<LocationEntity>,
    },
    RemovePin {
        location: MapLocation,
        reply: Reply<()>,
    },
    Refresh {
        reply: Reply<u64>,
    },
    SearchCompleted {
        cycle: u64,
        target: MapLocation,
        result: Result<Vec<String>, SearchError>,
    },
    FetchCompleted {
        cycle: u64,
        target: MapLocation,
        position: usize,
        result: Result<Vec<u8>, FetchError>,
    },
}

/// 协调器句柄，可在多个 handler 之间克隆共享
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::UnboundedSender<Message>,
    notifications: broadcast::Sender<Notification>,
    status: watch::Receiver<Status>,
}

/// 启动协调器任务
pub fn spawn(
    repository: LocationRepository,
    source: Arc<dyn PhotoSource>,
    options: CoordinatorOptions,
) -> CoordinatorHandle {
    let (sender, receiver) = mpsc::unbounded_channel();
    let (notifications, _) = broadcast::channel(64);
    let (status_tx, status) = watch::channel(Status::default());

    let coordinator = Coordinator::new(
        repository,
        source,
        sender.downgrade(),
        notifications.clone(),
        status_tx,
        options,
    );
    tokio::spawn(coordinator.run(receiver));

    CoordinatorHandle {
        sender,
        notifications,
        status,
    }
}

impl CoordinatorHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Message,
    ) -> Result<T, CoordinatorError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .map_err(|_| CoordinatorError::Closed)?;
        response.await.map_err(|_| CoordinatorError::Closed)?
    }

    /// 放置图钉：坐标已有位置时复用，随后选中并开始一轮刷新
    pub async fn place_pin(
        &self,
        location: MapLocation,
    ) -> Result<LocationEntity, CoordinatorError> {
        self.request(|reply| Message::PlacePin { location, reply })
            .await
    }

    /// 选中已有图钉，不触发下载
    pub async fn select_pin(
        &self,
        location: MapLocation,
    ) -> Result<LocationEntity, CoordinatorError> {
        self.request(|reply| Message::SelectPin { location, reply })
            .await
    }

    pub async fn remove_pin(&self, location: MapLocation) -> Result<(), CoordinatorError> {
        self.request(|reply| Message::RemovePin { location, reply })
            .await
    }

    /// 为当前选中的图钉开始新一轮刷新，返回轮次编号
    pub async fn refresh(&self) -> Result<u64, CoordinatorError> {
        self.request(|reply| Message::Refresh { reply }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// 等待网络活动结束
    pub async fn wait_until_idle(&self) -> Result<Status, CoordinatorError> {
        let mut status = self.status.clone();
        let idle = status
            .wait_for(|s| !s.network_active)
            .await
            .map_err(|_| CoordinatorError::Closed)?;
        Ok(idle.clone())
    }
}
