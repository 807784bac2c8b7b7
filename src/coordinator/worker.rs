use std::sync::Arc;

use tokio::sync::{Semaphore, broadcast, mpsc, watch};
use tokio::task::AbortHandle;

use super::{CoordinatorOptions, Message, Notification, Reply, Status};
use crate::common::MapLocation;
use crate::database::{LocationEntity, LocationRepository};
use crate::error::{CoordinatorError, FetchError, RepositoryError, SearchError};
use crate::search::PhotoSource;

pub(crate) struct Coordinator {
    repository: LocationRepository,
    source: Arc<dyn PhotoSource>,
    // 弱引用，所有句柄释放后任务即可退出
    sender: mpsc::WeakUnboundedSender<Message>,
    notifications: broadcast::Sender<Notification>,
    status: watch::Sender<Status>,
    fetch_limit: Option<Arc<Semaphore>>,
    selected: Option<MapLocation>,
    cycle: u64,
    outstanding: usize,
    network_active: bool,
    in_flight: Vec<AbortHandle>,
}

impl Coordinator {
    pub(crate) fn new(
        repository: LocationRepository,
        source: Arc<dyn PhotoSource>,
        sender: mpsc::WeakUnboundedSender<Message>,
        notifications: broadcast::Sender<Notification>,
        status: watch::Sender<Status>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            repository,
            source,
            sender,
            notifications,
            status,
            fetch_limit: options
                .max_concurrent_fetches
                .map(|limit| Arc::new(Semaphore::new(limit))),
            selected: None,
            cycle: 0,
            outstanding: 0,
            network_active: false,
            in_flight: Vec::new(),
        }
    }

    pub(crate) async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Message>) {
        tracing::info!("Refresh coordinator started");
        while let Some(message) = receiver.recv().await {
            self.handle(message).await;
        }
        self.supersede();
        tracing::info!("Refresh coordinator stopped");
    }

    pub(crate) async fn handle(&mut self, message: Message) {
        match message {
            Message::PlacePin { location, reply } => {
                let result = self.place_pin(location).await;
                self.respond(reply, result);
            }
            Message::SelectPin { location, reply } => {
                let result = self.select_pin(location).await;
                self.respond(reply, result);
            }
            Message::RemovePin { location, reply } => {
                let result = self.remove_pin(location).await;
                self.respond(reply, result);
            }
            Message::Refresh { reply } => {
                let result = self.refresh().await;
                self.respond(reply, result);
            }
            Message::SearchCompleted {
                cycle,
                target,
                result,
            } => self.on_search_completed(cycle, target, result).await,
            Message::FetchCompleted {
                cycle,
                target,
                position,
                result,
            } => {
                self.on_fetch_completed(cycle, target, position, result)
                    .await
            }
        }
        self.publish_status();
    }

    async fn place_pin(
        &mut self,
        target: MapLocation,
    ) -> Result<LocationEntity, CoordinatorError> {
        // 同一坐标只保留一条位置记录
        let location = match self
            .repository
            .find_location(target.latitude, target.longitude)
            .await?
        {
            Some(existing) => existing,
            None => {
                self.repository
                    .create_location(target.latitude, target.longitude)
                    .await?
            }
        };

        tracing::info!("Pin placed at {}", target);
        self.selected = Some(target);
        self.start_cycle(&location).await;
        Ok(location)
    }

    async fn select_pin(
        &mut self,
        target: MapLocation,
    ) -> Result<LocationEntity, CoordinatorError> {
        let location = self.resolve(target).await?;

        if self.selected != Some(target) {
            tracing::info!("Pin selected at {}", target);
            // 切换位置后，上一个位置未完成的下载全部作废；
            // 轮次号同时前进，切回原位置时旧消息也不会被当作当前轮次
            self.supersede();
            self.cycle += 1;
            self.set_network_active(false);
            self.selected = Some(target);
        }
        self.notify(Notification::PhotoGridChanged(target));
        Ok(location)
    }

    async fn remove_pin(&mut self, target: MapLocation) -> Result<(), CoordinatorError> {
        let location = self.resolve(target).await?;
        self.repository.delete_location(&location).await?;
        tracing::info!("Pin removed at {}", target);

        if self.selected == Some(target) {
            self.supersede();
            self.cycle += 1;
            self.set_network_active(false);
            self.selected = None;
        }
        Ok(())
    }

    async fn refresh(&mut self) -> Result<u64, CoordinatorError> {
        let Some(target) = self.selected else {
            tracing::warn!("Refresh requested with no pin selected");
            return Err(CoordinatorError::NoSelection);
        };

        let location = self.resolve(target).await?;
        Ok(self.start_cycle(&location).await)
    }

    async fn resolve(&self, target: MapLocation) -> Result<LocationEntity, CoordinatorError> {
        self.repository
            .find_location(target.latitude, target.longitude)
            .await?
            .ok_or(CoordinatorError::UnknownPin(target))
    }

    /// 开始新一轮刷新：作废旧轮次、清空图片、发起搜索
    async fn start_cycle(&mut self, location: &LocationEntity) -> u64 {
        self.supersede();
        self.cycle += 1;
        let cycle = self.cycle;
        let target = location.coordinate();

        match self.repository.clear_photos(location).await {
            Ok(removed) => {
                tracing::debug!(
                    "Cycle {}: cleared {} photos at {}",
                    cycle,
                    removed,
                    target
                );
                self.notify(Notification::PhotoGridChanged(target));
            }
            Err(e) => {
                tracing::error!(
                    "Cycle {}: failed to clear photos at {}: {}",
                    cycle,
                    target,
                    e
                );
                self.set_network_active(false);
                return cycle;
            }
        }

        let Some(sender) = self.sender.upgrade() else {
            tracing::warn!(
                "Cycle {}: coordinator is shutting down, skipping search",
                cycle
            );
            self.set_network_active(false);
            return cycle;
        };

        self.set_network_active(true);
        let source = self.source.clone();
        let task = tokio::spawn(async move {
            let result = source.search(target).await;
            let _ = sender.send(Message::SearchCompleted {
                cycle,
                target,
                result,
            });
        });
        self.in_flight.push(task.abort_handle());

        tracing::info!("Cycle {}: searching photos near {}", cycle, target);
        cycle
    }

    fn is_current(&self, cycle: u64, target: MapLocation) -> bool {
        cycle == self.cycle && self.selected == Some(target)
    }

    async fn on_search_completed(
        &mut self,
        cycle: u64,
        target: MapLocation,
        result: Result<Vec<String>, SearchError>,
    ) {
        if !self.is_current(cycle, target) {
            tracing::debug!("Discarding search result of superseded cycle {}", cycle);
            return;
        }

        let urls = match result {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!(
                    "Cycle {}: photo search near {} failed: {}",
                    cycle,
                    target,
                    e
                );
                self.finish_cycle();
                return;
            }
        };

        let location = match self.resolve(target).await {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!("Cycle {}: {}", cycle, e);
                self.finish_cycle();
                return;
            }
        };

        if urls.is_empty() {
            tracing::info!("Cycle {}: no photos near {}", cycle, target);
            self.finish_cycle();
            return;
        }

        // 先落库占位图片，再发起下载
        if let Err(e) = self
            .repository
            .create_placeholders_for(&location, &urls)
            .await
        {
            tracing::error!("Cycle {}: failed to create placeholders: {}", cycle, e);
            self.finish_cycle();
            return;
        }
        self.notify(Notification::PhotoGridChanged(target));

        let Some(sender) = self.sender.upgrade() else {
            self.finish_cycle();
            return;
        };

        self.outstanding = urls.len();
        for (position, url) in urls.into_iter().enumerate() {
            let source = self.source.clone();
            let sender = sender.clone();
            let limit = self.fetch_limit.clone();
            let task = tokio::spawn(async move {
                let _permit = match limit {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let result = source.fetch_image(&url).await;
                let _ = sender.send(Message::FetchCompleted {
                    cycle,
                    target,
                    position,
                    result,
                });
            });
            self.in_flight.push(task.abort_handle());
        }

        tracing::info!("Cycle {}: fetching {} photos", cycle, self.outstanding);
    }

    async fn on_fetch_completed(
        &mut self,
        cycle: u64,
        target: MapLocation,
        position: usize,
        result: Result<Vec<u8>, FetchError>,
    ) {
        if !self.is_current(cycle, target) {
            tracing::debug!(
                "Discarding photo {} of superseded cycle {}",
                position,
                cycle
            );
            return;
        }

        self.outstanding = self.outstanding.saturating_sub(1);

        match result {
            Ok(bytes) => match self.write_image(target, position, &bytes).await {
                Ok(()) => {
                    tracing::debug!(
                        "Cycle {}: stored photo {} ({} bytes)",
                        cycle,
                        position,
                        bytes.len()
                    );
                    self.notify(Notification::PhotoGridChanged(target));
                }
                Err(CoordinatorError::Repository(RepositoryError::StaleWrite { position })) => {
                    tracing::warn!(
                        "Cycle {}: skipping stale write into slot {}",
                        cycle,
                        position
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Cycle {}: failed to store photo {}: {}",
                        cycle,
                        position,
                        e
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Cycle {}: photo {} download failed: {}",
                    cycle,
                    position,
                    e
                );
            }
        }

        if self.outstanding == 0 {
            tracing::info!("Cycle {}: refresh settled", cycle);
            self.finish_cycle();
        }
    }

    async fn write_image(
        &self,
        target: MapLocation,
        position: usize,
        bytes: &[u8],
    ) -> Result<(), CoordinatorError> {
        let location = self.resolve(target).await?;
        self.repository
            .set_photo_image(&location, position, bytes)
            .await?;
        Ok(())
    }

    /// 作废当前轮次尚未完成的请求
    fn supersede(&mut self) {
        for task in self.in_flight.drain(..) {
            task.abort();
        }
        self.outstanding = 0;
    }

    fn finish_cycle(&mut self) {
        self.in_flight.clear();
        self.outstanding = 0;
        self.set_network_active(false);
    }

    fn set_network_active(&mut self, active: bool) {
        if self.network_active != active {
            self.network_active = active;
            self.notify(Notification::NetworkActivity(active));
        }
    }

    fn notify(&self, notification: Notification) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.notifications.send(notification);
    }

    /// 先发布状态再回复，调用方拿到回复时状态已经是最新的
    fn respond<T>(&self, reply: Reply<T>, result: Result<T, CoordinatorError>) {
        if let Err(e) = &result {
            tracing::warn!("Intent failed: {}", e);
        }
        self.publish_status();
        let _ = reply.send(result);
    }

    fn publish_status(&self) {
        self.status.send_replace(Status {
            network_active: self.network_active,
            selected: self.selected,
            cycle: self.cycle,
            outstanding: self.outstanding,
        });
    }
}
