//! The in-game survey thumbnail widget
//!
//! A thumbnail owns two records, a status badge and an active-survey count. Each
//! record is published through a `watch` channel and has exactly one writer: the
//! load routine currently running for it. Load routines race a per-widget
//! cancellation token, so nothing is published once the widget is disposed.

use crate::api::{ApiHandler, HandlerOptions, ServiceClient};
use crate::config::{DEFAULT_DISPLAY_NAME, DEFAULT_SRC_ICON};
use crate::errors::{Result, ThumbnailError};
use crate::model::{
    parse_active_survey_count, parse_service_status, Context, TackableMeasure, TackableStatus,
};
use crate::render::{ThumbnailProps, ThumbnailRenderer, DEFAULT_COST};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

pub const SURVEY_METADATA_PATH: &str = "active/survey_metadata";
pub const SERVICE_STATUS_PATH: &str = "service/status";

/// Values bound by the hosting console before initialization
#[derive(Clone, Debug, PartialEq)]
pub struct ThumbnailInputs {
    pub context: Context,
    pub display_name: String,
    pub src_icon: String,
}

impl ThumbnailInputs {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            src_icon: DEFAULT_SRC_ICON.to_string(),
        }
    }
}

/// Capabilities shared by every gem thumbnail
#[async_trait]
pub trait GemThumbnail: Send {
    /// Snapshot handed to the presentational shell
    fn props(&self) -> ThumbnailProps;

    /// Lifecycle hook: bind the service client and start loading
    fn load(&mut self, client: Arc<dyn ServiceClient>) -> Result<()>;

    /// Wait for in-flight loads to finish
    async fn settle(&mut self);

    /// Stop in-flight loads; late responses are dropped
    fn dispose(&mut self);

    fn render(&self, renderer: &mut dyn ThumbnailRenderer) -> Result<()> {
        renderer.render(&self.props())
    }
}

pub struct InGameSurveyThumbnail {
    id: Uuid,
    inputs: ThumbnailInputs,
    state: Arc<watch::Sender<TackableStatus>>,
    metric: Arc<watch::Sender<TackableMeasure>>,
    api: Option<Arc<dyn ServiceClient>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl InGameSurveyThumbnail {
    pub fn new(inputs: ThumbnailInputs) -> Self {
        let (state, _) = watch::channel(TackableStatus::loading());
        let (metric, _) = watch::channel(TackableMeasure::loading());

        Self {
            id: Uuid::new_v4(),
            inputs,
            state: Arc::new(state),
            metric: Arc::new(metric),
            api: None,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn inputs(&self) -> &ThumbnailInputs {
        &self.inputs
    }

    /// Build the API handler from the bound context and start both loads.
    ///
    /// Must be called from within a Tokio runtime. The handler is created once;
    /// a second call fails with [`ThumbnailError::AlreadyInitialized`].
    pub fn init(&mut self, options: HandlerOptions) -> Result<()> {
        if self.api.is_some() {
            return Err(ThumbnailError::AlreadyInitialized);
        }

        let handler = ApiHandler::new(
            self.inputs.context.service_url.clone(),
            self.inputs.context.identifier.clone(),
            options,
        )?;

        self.init_with_client(Arc::new(handler))
    }

    /// Same as [`init`](Self::init) with a caller supplied client
    pub fn init_with_client(&mut self, client: Arc<dyn ServiceClient>) -> Result<()> {
        if self.api.is_some() {
            return Err(ThumbnailError::AlreadyInitialized);
        }

        info!(
            widget = %self.id,
            identifier = %self.inputs.context.identifier,
            "Initializing {} thumbnail", self.inputs.display_name
        );

        self.api = Some(client);
        self.report()?;
        self.assign()?;
        Ok(())
    }

    /// Cancel current loads, reset both records and fetch again with the same handler
    #[instrument(skip(self), fields(widget = %self.id))]
    pub async fn reload(&mut self) -> Result<()> {
        if self.api.is_none() {
            return Err(ThumbnailError::NotInitialized);
        }

        self.cancel.cancel();
        self.settle().await;
        self.cancel = CancellationToken::new();

        self.report()?;
        self.assign()?;
        Ok(())
    }

    /// Start loading the active survey count
    fn report(&mut self) -> Result<()> {
        let api = self.api.clone().ok_or(ThumbnailError::NotInitialized)?;
        self.metric.send_replace(TackableMeasure::loading());

        let metric = Arc::clone(&self.metric);
        let token = self.cancel.clone();
        let span = info_span!("report", widget = %self.id);

        self.tasks.push(tokio::spawn(
            async move {
                tokio::select! {
                    _ = token.cancelled() => debug!("metric load cancelled"),
                    measure = load_metric(api.as_ref()) => {
                        if token.is_cancelled() {
                            debug!("discarding late metric response");
                        } else {
                            metric.send_replace(measure);
                        }
                    }
                }
            }
            .instrument(span),
        ));
        Ok(())
    }

    /// Start loading the service status badge
    fn assign(&mut self) -> Result<()> {
        let api = self.api.clone().ok_or(ThumbnailError::NotInitialized)?;
        self.state.send_replace(TackableStatus::loading());

        let state = Arc::clone(&self.state);
        let token = self.cancel.clone();
        let span = info_span!("assign", widget = %self.id);

        self.tasks.push(tokio::spawn(
            async move {
                tokio::select! {
                    _ = token.cancelled() => debug!("status load cancelled"),
                    status = load_status(api.as_ref()) => {
                        if token.is_cancelled() {
                            debug!("discarding late status response");
                        } else {
                            state.send_replace(status);
                        }
                    }
                }
            }
            .instrument(span),
        ));
        Ok(())
    }

    pub fn state(&self) -> TackableStatus {
        self.state.borrow().clone()
    }

    pub fn metric(&self) -> TackableMeasure {
        self.metric.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TackableStatus> {
        self.state.subscribe()
    }

    pub fn subscribe_metric(&self) -> watch::Receiver<TackableMeasure> {
        self.metric.subscribe()
    }

    /// True once neither record shows its loading placeholder
    pub fn is_settled(&self) -> bool {
        !self.state.borrow().is_loading() && !self.metric.borrow().is_loading()
    }

    pub async fn settle(&mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        for result in join_all(tasks).await {
            if let Err(e) = result {
                warn!(widget = %self.id, "Load routine did not complete: {}", e);
            }
        }
    }

    pub fn dispose(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!(widget = %self.id, "Disposing thumbnail");
            self.cancel.cancel();
        }
    }

    pub fn props(&self) -> ThumbnailProps {
        ThumbnailProps {
            title: self.inputs.display_name.clone(),
            cost: DEFAULT_COST.to_string(),
            src_icon: self.inputs.src_icon.clone(),
            metric: self.metric(),
            state: self.state(),
        }
    }
}

impl Drop for InGameSurveyThumbnail {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl GemThumbnail for InGameSurveyThumbnail {
    fn props(&self) -> ThumbnailProps {
        InGameSurveyThumbnail::props(self)
    }

    fn load(&mut self, client: Arc<dyn ServiceClient>) -> Result<()> {
        self.init_with_client(client)
    }

    async fn settle(&mut self) {
        InGameSurveyThumbnail::settle(self).await
    }

    fn dispose(&mut self) {
        InGameSurveyThumbnail::dispose(self)
    }
}

/// Fetch the active survey count; any failure yields the `Offline` measure
pub async fn load_metric(client: &dyn ServiceClient) -> TackableMeasure {
    let count = match client.get(SURVEY_METADATA_PATH).await {
        Ok(body) => parse_active_survey_count(&body),
        Err(e) => Err(e),
    };

    match count {
        Ok(n) => TackableMeasure::count(n),
        Err(e) => {
            warn!(error_kind = e.kind(), "Active survey count unavailable: {}", e);
            TackableMeasure::offline()
        }
    }
}

/// Fetch the service status; any failure yields the `Offline` badge
pub async fn load_status(client: &dyn ServiceClient) -> TackableStatus {
    let status = match client.get(SERVICE_STATUS_PATH).await {
        Ok(body) => parse_service_status(&body),
        Err(e) => Err(e),
    };

    match status {
        Ok(status) => TackableStatus::from_service_status(&status),
        Err(e) => {
            warn!(error_kind = e.kind(), "Service status unavailable: {}", e);
            TackableStatus::offline()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MeasureValue, StyleType};
    use crate::render::TextRenderer;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[derive(Clone)]
    enum Reply {
        Body(&'static str),
        Fail(u16),
    }

    /// Canned replies per path, optionally held back until permits are added
    struct StubClient {
        replies: Mutex<HashMap<&'static str, Reply>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl StubClient {
        fn new(metadata: Reply, status: Reply) -> Self {
            let mut replies = HashMap::new();
            replies.insert(SURVEY_METADATA_PATH, metadata);
            replies.insert(SERVICE_STATUS_PATH, status);
            Self {
                replies: Mutex::new(replies),
                gate: None,
            }
        }

        fn gated(metadata: Reply, status: Reply) -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            let mut client = Self::new(metadata, status);
            client.gate = Some(Arc::clone(&gate));
            (client, gate)
        }

        fn set(&self, path: &'static str, reply: Reply) {
            self.replies.lock().unwrap().insert(path, reply);
        }
    }

    #[async_trait]
    impl ServiceClient for StubClient {
        async fn get(&self, path: &str) -> Result<String> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }

            let reply = self.replies.lock().unwrap().get(path).cloned();
            match reply {
                Some(Reply::Body(body)) => Ok(body.to_string()),
                Some(Reply::Fail(status)) => Err(ThumbnailError::Status {
                    path: path.to_string(),
                    status,
                }),
                None => Err(ThumbnailError::Status {
                    path: path.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn widget() -> InGameSurveyThumbnail {
        InGameSurveyThumbnail::new(ThumbnailInputs::new(Context {
            service_url: "http://localhost:9".to_string(),
            identifier: "CloudGemInGameSurvey".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_records_exist_before_init() {
        let widget = widget();
        assert_eq!(widget.state(), TackableStatus::loading());
        assert_eq!(widget.metric(), TackableMeasure::loading());
        assert!(!widget.is_settled());

        let props = widget.props();
        assert_eq!(props.title, "In Game Survey");
        assert_eq!(props.cost, "Low");
        assert_eq!(props.src_icon, DEFAULT_SRC_ICON);
    }

    #[tokio::test]
    async fn test_placeholders_until_responses_arrive() {
        let (client, gate) = StubClient::gated(
            Reply::Body(r#"{"result":{"metadata_list":[1,2,3]}}"#),
            Reply::Body(r#"{"result":{"status":"online"}}"#),
        );

        let mut widget = widget();
        widget.init_with_client(Arc::new(client)).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(widget.state().label, "Loading");
        assert_eq!(widget.state().style_type, StyleType::Loading);
        assert_eq!(widget.metric().value, MeasureValue::Text("Loading...".to_string()));

        gate.add_permits(2);
        widget.settle().await;

        assert!(widget.is_settled());
        assert_eq!(widget.state(), TackableStatus::online());
        assert_eq!(widget.metric(), TackableMeasure::count(3));
    }

    #[tokio::test]
    async fn test_non_online_status_is_offline() {
        let client = StubClient::new(
            Reply::Body(r#"{"result":{"metadata_list":[]}}"#),
            Reply::Body(r#"{"result":{"status":"offline"}}"#),
        );

        let mut widget = widget();
        widget.init_with_client(Arc::new(client)).unwrap();
        widget.settle().await;

        assert_eq!(widget.state(), TackableStatus::offline());
        assert_eq!(widget.metric(), TackableMeasure::count(0));
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_offline() {
        let client = StubClient::new(Reply::Fail(500), Reply::Body("not json"));

        let mut widget = widget();
        widget.init_with_client(Arc::new(client)).unwrap();
        widget.settle().await;

        let state = widget.state();
        assert_eq!(state.label, "Offline");
        assert_eq!(state.style_type, StyleType::Offline);

        let metric = widget.metric();
        assert_eq!(metric.name, "Active Survey(s)");
        assert_eq!(metric.value, MeasureValue::Text("Offline".to_string()));
    }

    #[tokio::test]
    async fn test_dispose_discards_late_responses() {
        let (client, gate) = StubClient::gated(
            Reply::Body(r#"{"result":{"metadata_list":[1]}}"#),
            Reply::Body(r#"{"result":{"status":"online"}}"#),
        );

        let mut widget = widget();
        let mut state_rx = widget.subscribe_state();
        widget.init_with_client(Arc::new(client)).unwrap();
        state_rx.borrow_and_update();

        widget.dispose();
        gate.add_permits(2);
        widget.settle().await;

        assert!(!state_rx.has_changed().unwrap());
        assert!(widget.state().is_loading());
        assert!(widget.metric().is_loading());
    }

    #[tokio::test]
    async fn test_drop_cancels_loads() {
        let (client, gate) = StubClient::gated(
            Reply::Body(r#"{"result":{"metadata_list":[1]}}"#),
            Reply::Body(r#"{"result":{"status":"online"}}"#),
        );

        let mut widget = widget();
        let metric_rx = widget.subscribe_metric();
        widget.init_with_client(Arc::new(client)).unwrap();
        drop(widget);

        gate.add_permits(2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(metric_rx.borrow().is_loading());
    }

    #[tokio::test]
    async fn test_reload_fetches_again() {
        let client = Arc::new(StubClient::new(
            Reply::Body(r#"{"result":{"metadata_list":[1]}}"#),
            Reply::Fail(503),
        ));

        let mut widget = widget();
        widget.init_with_client(client.clone()).unwrap();
        widget.settle().await;
        assert_eq!(widget.metric(), TackableMeasure::count(1));
        assert_eq!(widget.state(), TackableStatus::offline());

        client.set(SURVEY_METADATA_PATH, Reply::Body(r#"{"result":{"metadata_list":[1,2]}}"#));
        client.set(SERVICE_STATUS_PATH, Reply::Body(r#"{"result":{"status":"online"}}"#));

        widget.reload().await.unwrap();
        widget.settle().await;
        assert_eq!(widget.metric(), TackableMeasure::count(2));
        assert_eq!(widget.state(), TackableStatus::online());
    }

    #[tokio::test]
    async fn test_lifecycle_errors() {
        let mut widget = widget();
        assert!(matches!(widget.reload().await, Err(ThumbnailError::NotInitialized)));

        let client = Arc::new(StubClient::new(Reply::Fail(500), Reply::Fail(500)));
        widget.init_with_client(client.clone()).unwrap();
        assert!(matches!(
            widget.init_with_client(client),
            Err(ThumbnailError::AlreadyInitialized)
        ));
        assert!(matches!(
            widget.init(HandlerOptions::default()),
            Err(ThumbnailError::AlreadyInitialized)
        ));
        widget.settle().await;
    }

    #[tokio::test]
    async fn test_render_through_trait_object() {
        let client = StubClient::new(
            Reply::Body(r#"{"result":{"metadata_list":["a","b"]}}"#),
            Reply::Body(r#"{"result":{"status":"online"}}"#),
        );

        let mut thumbnail: Box<dyn GemThumbnail> = Box::new(widget());
        thumbnail.load(Arc::new(client)).unwrap();
        thumbnail.settle().await;

        let mut renderer = TextRenderer::new(Vec::new());
        thumbnail.render(&mut renderer).unwrap();

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.contains("In Game Survey [Online]"));
        assert!(text.contains("Active Survey(s): 2"));
    }
}
