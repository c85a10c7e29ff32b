use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use chemrag_core::{Conversation, Message, QueryDispatcher};

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Sources,
    Input,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation (history + pending query); only mutated through its store operations
    pub conversation: Conversation,
    pub dispatcher: QueryDispatcher,
    pub base_url: String,
    pub query_task: Option<JoinHandle<Message>>,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Sources pane
    pub sources_state: ListState,

    // Transient footer message (e.g. failure to open a link)
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sources_area: Option<Rect>,
}

impl App {
    pub fn new(dispatcher: QueryDispatcher, base_url: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            conversation: Conversation::new(),
            dispatcher,
            base_url: base_url.into(),
            query_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            sources_state: ListState::default(),

            status: None,

            animation_frame: 0,

            chat_area: None,
            sources_area: None,
        }
    }

    /// Input is disabled while a query is in flight.
    pub fn input_enabled(&self) -> bool {
        !self.conversation.is_in_flight()
    }

    /// Send the typed text. Blank input or an in-flight query makes this a no-op.
    pub fn submit_query(&mut self) {
        let Some(submission) = self.conversation.submit() else {
            return;
        };
        info!(turns = submission.history.len(), "submitting query");

        let dispatcher = self.dispatcher.clone();
        self.query_task = Some(tokio::spawn(async move {
            dispatcher.send(&submission.query, &submission.history).await
        }));

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();
    }

    /// Settle the in-flight query once its task has finished.
    ///
    /// A task that panicked or was aborted still settles, with the fallback reply.
    pub async fn poll_query(&mut self) {
        if !self.query_task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }
        let Some(task) = self.query_task.take() else {
            return;
        };

        let reply = match task.await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "query task did not complete");
                Message::fallback()
            }
        };
        self.conversation.settle(reply);
        self.scroll_chat_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_in_flight() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Rows the chat transcript occupies at the current wrap width.
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        // Count the same lines the chat pane draws
        let total_lines = self
            .conversation
            .messages()
            .iter()
            .flat_map(ui::message_lines)
            .map(|line| line.width().div_ceil(wrap_width).max(1))
            .fold(0usize, usize::saturating_add);

        let total_lines = if self.conversation.is_in_flight() {
            total_lines.saturating_add(2) // "Bot" + "Thinking..."
        } else {
            total_lines
        };
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.chat_scroll = self.chat_line_count().saturating_sub(visible_height);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max = self.chat_line_count().saturating_sub(self.chat_height.max(1));
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    // Sources pane navigation
    pub fn source_count(&self) -> usize {
        self.conversation.all_sources().len()
    }

    pub fn sources_nav_down(&mut self) {
        let len = self.source_count();
        if len > 0 {
            let i = self.sources_state.selected().map_or(0, |i| (i + 1).min(len - 1));
            self.sources_state.select(Some(i));
        }
    }

    pub fn sources_nav_up(&mut self) {
        if self.source_count() > 0 {
            let i = self.sources_state.selected().unwrap_or(0);
            self.sources_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn selected_source(&self) -> Option<String> {
        let sources = self.conversation.all_sources();
        self.sources_state
            .selected()
            .and_then(|i| sources.get(i))
            .map(|s| s.to_string())
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Input => FocusPane::Chat,
            FocusPane::Chat if self.source_count() > 0 => {
                if self.sources_state.selected().is_none() {
                    self.sources_state.select(Some(0));
                }
                FocusPane::Sources
            }
            FocusPane::Chat | FocusPane::Sources => FocusPane::Input,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chemrag_core::{AskBackend, AskRequest, AskResponse, RequestError, Role, FALLBACK_ANSWER};
    use std::time::Duration;
    use tokio::sync::Notify;
    use std::sync::Arc;

    /// Answers once `release` is notified, so tests can observe the pending state.
    struct GatedBackend {
        release: Arc<Notify>,
        fail: bool,
    }

    #[async_trait]
    impl AskBackend for GatedBackend {
        async fn ask(&self, request: &AskRequest) -> Result<AskResponse, RequestError> {
            self.release.notified().await;
            if self.fail {
                return Err(RequestError::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: String::new(),
                });
            }
            Ok(AskResponse {
                answer: format!("re: {}", request.query),
                sources: vec!["https://a".to_string(), "https://b".to_string()],
            })
        }
    }

    fn gated_app(fail: bool) -> (App, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        let backend = GatedBackend {
            release: release.clone(),
            fail,
        };
        (App::new(QueryDispatcher::new(backend), "http://test"), release)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.conversation.pending_mut().insert_char(c);
        }
    }

    async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.poll_query().await;
            if !app.conversation.is_in_flight() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("query never settled");
    }

    #[tokio::test]
    async fn test_submit_disables_input_until_settled() {
        let (mut app, release) = gated_app(false);
        type_text(&mut app, " benzene ring ");
        app.submit_query();

        assert!(!app.input_enabled());
        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.conversation.messages()[0].content, "benzene ring");

        // Still pending: polling must not settle anything
        app.poll_query().await;
        assert!(!app.input_enabled());

        release.notify_one();
        settle(&mut app).await;

        assert!(app.input_enabled());
        assert!(app.query_task.is_none());
        let reply = &app.conversation.messages()[1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "re: benzene ring");
        assert_eq!(reply.sources, vec!["https://a".to_string(), "https://b".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_reenables_input_with_fallback() {
        let (mut app, release) = gated_app(true);
        type_text(&mut app, "q");
        app.submit_query();
        release.notify_one();
        settle(&mut app).await;

        assert!(app.input_enabled());
        assert_eq!(app.conversation.len(), 2);
        assert_eq!(app.conversation.messages()[1].content, FALLBACK_ANSWER);
        assert!(app.conversation.messages()[1].sources.is_empty());
    }

    #[tokio::test]
    async fn test_blank_submit_spawns_nothing() {
        let (mut app, _release) = gated_app(false);
        type_text(&mut app, "   ");
        app.submit_query();

        assert!(app.query_task.is_none());
        assert!(app.conversation.is_empty());
        assert!(app.input_enabled());
    }

    #[tokio::test]
    async fn test_second_submit_while_pending_is_ignored() {
        let (mut app, release) = gated_app(false);
        type_text(&mut app, "one");
        app.submit_query();
        type_text(&mut app, "two");
        app.submit_query();

        assert_eq!(app.conversation.len(), 1);
        release.notify_one();
        settle(&mut app).await;
        assert_eq!(app.conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_aborted_task_settles_with_fallback() {
        let (mut app, _release) = gated_app(false);
        type_text(&mut app, "q");
        app.submit_query();
        app.query_task.as_ref().unwrap().abort();
        settle(&mut app).await;

        assert_eq!(app.conversation.messages()[1].content, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_sources_navigation_and_focus() {
        let (mut app, _release) = gated_app(false);
        app.conversation.append_user("q");
        app.conversation
            .append_assistant("a", vec!["https://a".into(), "https://b".into()]);

        assert_eq!(app.focus, FocusPane::Input);
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Chat);
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Sources);
        assert_eq!(app.selected_source().as_deref(), Some("https://a"));

        app.sources_nav_down();
        app.sources_nav_down();
        assert_eq!(app.selected_source().as_deref(), Some("https://b"));
        app.sources_nav_up();
        assert_eq!(app.selected_source().as_deref(), Some("https://a"));

        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Input);
    }

    #[tokio::test]
    async fn test_focus_skips_sources_when_none() {
        let (mut app, _release) = gated_app(false);
        app.cycle_focus();
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Input);
    }

    #[tokio::test]
    async fn test_scroll_to_bottom_counts_wrapped_lines() {
        let (mut app, _release) = gated_app(false);
        app.chat_width = 10;
        app.chat_height = 4;
        app.conversation.append_user("q");
        app.conversation.append_assistant("x".repeat(25), vec!["https://a".into()]);

        // user: 1 + 1 + 1, bot: 1 + 3 + 1 ("Sources:") + 1 + 1
        assert_eq!(app.chat_line_count(), 10);
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, 6);

        app.scroll_chat_down(10);
        assert_eq!(app.chat_scroll, 6);
        app.scroll_chat_up(100);
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn test_line_count_matches_rendered_lines() {
        let (mut app, _release) = gated_app(false);
        app.chat_width = 10;

        // Markers are not drawn; a trailing newline is an extra row
        app.conversation.append_assistant("**ab**\n", Vec::new());
        assert_eq!(app.chat_line_count(), 4);

        // An empty answer still draws one content row
        app.conversation.append_assistant("", Vec::new());
        assert_eq!(app.chat_line_count(), 7);

        // Exactly one row's worth of text does not spill onto a second row
        app.conversation.append_user(&"x".repeat(10));
        assert_eq!(app.chat_line_count(), 10);
    }

    #[tokio::test]
    async fn test_huge_transcript_does_not_overflow() {
        let (mut app, _release) = gated_app(false);
        app.chat_width = 20;
        app.chat_height = 10;
        for _ in 0..4 {
            app.conversation.append_assistant("x".repeat(400_000), Vec::new());
        }

        assert_eq!(app.chat_line_count(), u16::MAX);
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 10);
        app.scroll_chat_down(u16::MAX);
        assert_eq!(app.chat_scroll, u16::MAX - 10);
    }
}
