use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::comment::CommentNode;
use crate::comment_tree::CommentTree;
use crate::config::{Config, ThemeKind};
use crate::feed::{LinkPreview, PostFeed};
use crate::markup;
use crate::presenter::{CommentListPresenter, RenderSurface, RowChange};
use crate::source::{CommentRecord, ContentSource, Post, PostPage, PostType};
use crate::theme::Theme;

pub const CONNECTION_ERROR: &str = "Error connecting to Hacker News";
const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    Posts,
    Comments,
}

/// Requests from the UI to the network task.
#[derive(Debug)]
pub enum Action {
    LoadPosts {
        generation: u64,
        post_type: PostType,
    },
    LoadMorePosts {
        generation: u64,
        post_type: PostType,
        cursor: String,
    },
    LoadComments {
        generation: u64,
        post_id: String,
    },
}

/// Results coming back to the UI.
#[derive(Debug)]
pub enum NetworkEvent {
    PostsLoaded {
        generation: u64,
        page: PostPage,
    },
    MorePostsLoaded {
        generation: u64,
        page: PostPage,
    },
    CommentsLoaded {
        generation: u64,
        records: Vec<CommentRecord>,
    },
    ThemeUpdate(Theme),
    Failed {
        generation: u64,
        message: String,
    },
}

#[derive(Debug)]
pub struct Toast {
    pub message: String,
    shown_at: Instant,
}

impl Toast {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.shown_at.elapsed() >= TOAST_DURATION
    }
}

/// Selection and scrolling of the comment list. Told about row changes by the
/// presenter, it keeps the cursor on the activated row.
#[derive(Debug, Default)]
pub struct CommentsView {
    pub selected: usize,
    pub scroll: u16,
    pub redraws: usize,
}

impl RenderSurface for CommentsView {
    fn rows_changed(&mut self, change: RowChange) {
        self.selected = change.start.min(change.row_count.saturating_sub(1));
        self.redraws += 1;
    }
}

pub struct CommentsScreen {
    pub post: Post,
    /// `None` until the thread has been fetched.
    pub presenter: Option<CommentListPresenter>,
    pub view: CommentsView,
    generation: u64,
}

pub struct App {
    pub state: AppState,
    pub feed: PostFeed,
    pub post_list_state: ListState,
    /// Post rows on screen during the last draw.
    pub posts_window: Range<usize>,
    pub comments: Option<CommentsScreen>,
    pub theme: Theme,
    pub indent_unit: u16,
    pub show_preview: bool,
    pub toast: Option<Toast>,
    pub ticks: u64,
    /// Shared by post and comment fetches so a result can only ever match
    /// the request that produced it.
    generation: u64,
    feed_generation: u64,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    pub fn new(config: &Config, action_tx: mpsc::UnboundedSender<Action>) -> Self {
        Self {
            state: AppState::Posts,
            feed: PostFeed::new(config.post_type),
            post_list_state: ListState::default(),
            posts_window: 0..0,
            comments: None,
            theme: config.theme(),
            indent_unit: config.indent_unit,
            show_preview: false,
            toast: None,
            ticks: 0,
            generation: 0,
            feed_generation: 0,
            action_tx,
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn load_posts(&mut self) {
        self.feed_generation = self.next_generation();
        self.feed.begin_refresh();
        self.send(Action::LoadPosts {
            generation: self.feed_generation,
            post_type: self.feed.post_type(),
        });
    }

    fn switch_post_type(&mut self, post_type: PostType) {
        tracing::info!(%post_type, "switching post type");
        self.feed.switch_post_type(post_type);
        self.post_list_state = ListState::default();
        self.posts_window = 0..0;
        self.load_posts();
    }

    fn open_comments(&mut self) {
        let Some(post) = self.feed.selected_post().cloned() else {
            return;
        };
        tracing::info!(post_id = %post.id, comments = post.comment_count, "opening comments");
        let generation = self.next_generation();
        self.send(Action::LoadComments {
            generation,
            post_id: post.id.clone(),
        });
        self.comments = Some(CommentsScreen {
            post,
            presenter: None,
            view: CommentsView::default(),
            generation,
        });
        self.feed.clear_peek();
        self.state = AppState::Comments;
    }

    fn close_comments(&mut self) {
        self.comments = None;
        self.state = AppState::Posts;
    }

    /// Applies a finished fetch. Results for a list or thread that has since
    /// been replaced are dropped.
    pub fn on_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::PostsLoaded { generation, page } => {
                if generation == self.feed_generation {
                    self.feed.finish_refresh(page);
                    self.post_list_state.select(Some(0));
                }
            }
            NetworkEvent::MorePostsLoaded { generation, page } => {
                if generation == self.feed_generation {
                    self.feed.finish_load_more(page);
                }
            }
            NetworkEvent::CommentsLoaded {
                generation,
                records,
            } => {
                let Some(screen) = self
                    .comments
                    .as_mut()
                    .filter(|screen| screen.generation == generation)
                else {
                    tracing::debug!(generation, "dropping stale comments");
                    return;
                };
                let count = records.len();
                match CommentTree::from_nodes(records.into_iter().map(CommentNode::from)) {
                    Ok(tree) => {
                        tracing::info!(post_id = %screen.post.id, count, "loaded comments");
                        screen.presenter = Some(CommentListPresenter::new(tree));
                    }
                    Err(err) => {
                        tracing::error!(%err, "malformed comment thread");
                        screen.presenter = Some(CommentListPresenter::new(CommentTree::new()));
                        self.toast = Some(Toast::new(CONNECTION_ERROR));
                    }
                }
            }
            NetworkEvent::ThemeUpdate(theme) => {
                tracing::info!("theme reloaded");
                self.theme = theme;
            }
            NetworkEvent::Failed {
                generation,
                message,
            } => {
                tracing::error!(generation, %message, "fetch failed");
                let mut current = false;
                if generation == self.feed_generation {
                    self.feed.fail();
                    current = true;
                }
                if let Some(screen) = self
                    .comments
                    .as_mut()
                    .filter(|screen| screen.generation == generation)
                {
                    if screen.presenter.is_none() {
                        screen.presenter = Some(CommentListPresenter::new(CommentTree::new()));
                    }
                    current = true;
                }
                if current {
                    self.toast = Some(Toast::new(CONNECTION_ERROR));
                }
            }
        }
    }

    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if self.toast.as_ref().is_some_and(Toast::expired) {
            self.toast = None;
        }
        for row in self.posts_window.clone() {
            if let Some(cursor) = self.feed.on_row_displayed(row) {
                self.send(Action::LoadMorePosts {
                    generation: self.feed_generation,
                    post_type: self.feed.post_type(),
                    cursor,
                });
            }
        }
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        match self.state {
            AppState::Posts => match key {
                KeyCode::Char('q') => return true,
                KeyCode::Char('j') | KeyCode::Down => {
                    self.feed.select_next();
                    self.post_list_state.select(Some(self.feed.selected));
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.feed.select_prev();
                    self.post_list_state.select(Some(self.feed.selected));
                }
                KeyCode::Enter => self.open_comments(),
                KeyCode::Char('p') => {
                    self.show_preview = !self.show_preview;
                    if !self.show_preview {
                        self.feed.clear_peek();
                    }
                }
                KeyCode::Char('o') => {
                    if let Some(post) = self.feed.selected_post() {
                        let url = post.url.clone().unwrap_or_else(|| post.item_url());
                        self.open_link(&url);
                    }
                }
                KeyCode::Char('r') => self.load_posts(),
                KeyCode::Tab => self.switch_post_type(self.feed.post_type().next()),
                KeyCode::BackTab => self.switch_post_type(self.feed.post_type().prev()),
                _ => {}
            },
            AppState::Comments => match key {
                KeyCode::Char('q') => return true,
                KeyCode::Esc | KeyCode::Backspace => self.close_comments(),
                KeyCode::Char('j') | KeyCode::Down => self.move_comment_selection(1),
                KeyCode::Char('k') | KeyCode::Up => self.move_comment_selection(-1),
                KeyCode::Enter | KeyCode::Char(' ') => self.activate_selected_comment(),
                KeyCode::Char('o') => {
                    if let Some(url) = self.selected_comment_link() {
                        self.open_link(&url);
                    }
                }
                KeyCode::Char('O') => {
                    if let Some(screen) = &self.comments {
                        let url = screen.post.url.clone().unwrap_or_else(|| screen.post.item_url());
                        self.open_link(&url);
                    }
                }
                _ => {}
            },
        }
        false
    }

    /// Preview of the selected post's link, when the preview panel is open.
    pub fn preview(&mut self) -> Option<LinkPreview> {
        if !self.show_preview {
            return None;
        }
        self.feed.peek(self.feed.selected)
    }

    fn move_comment_selection(&mut self, delta: isize) {
        let Some(screen) = self.comments.as_mut() else {
            return;
        };
        let rows = screen.presenter.as_ref().map_or(0, |p| p.row_count());
        if rows == 0 {
            return;
        }
        let selected = screen.view.selected.saturating_add_signed(delta);
        screen.view.selected = selected.min(rows - 1);
    }

    fn activate_selected_comment(&mut self) {
        let Some(screen) = self.comments.as_mut() else {
            return;
        };
        let Some(presenter) = screen.presenter.as_mut() else {
            return;
        };
        if presenter.row_count() == 0 {
            return;
        }
        if let Err(err) = presenter.handle_row_activated(screen.view.selected, &mut screen.view) {
            tracing::error!(%err, "comment activation failed");
        }
    }

    fn selected_comment_link(&self) -> Option<String> {
        let screen = self.comments.as_ref()?;
        let node = screen.presenter.as_ref()?.row_at(screen.view.selected).ok()?;
        markup::links(node.text()).into_iter().next()
    }

    fn open_link(&mut self, url: &str) {
        tracing::info!(%url, "opening link");
        if let Err(err) = open::that(url) {
            tracing::warn!(%url, %err, "could not open link");
            self.toast = Some(Toast::new("Could not open link"));
        }
    }

    fn send(&self, action: Action) {
        if self.action_tx.send(action).is_err() {
            tracing::error!("network task is gone");
        }
    }
}

pub async fn run_network_loop(
    source: Arc<dyn ContentSource>,
    mut action_rx: mpsc::UnboundedReceiver<Action>,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
) {
    while let Some(action) = action_rx.recv().await {
        let source = source.clone();
        let event_tx = event_tx.clone();

        tokio::spawn(async move {
            let event = match action {
                Action::LoadPosts {
                    generation,
                    post_type,
                } => match source.posts(post_type, None).await {
                    Ok(page) => NetworkEvent::PostsLoaded { generation, page },
                    Err(err) => NetworkEvent::Failed {
                        generation,
                        message: err.to_string(),
                    },
                },
                Action::LoadMorePosts {
                    generation,
                    post_type,
                    cursor,
                } => match source.posts(post_type, Some(&cursor)).await {
                    Ok(page) => NetworkEvent::MorePostsLoaded { generation, page },
                    Err(err) => NetworkEvent::Failed {
                        generation,
                        message: err.to_string(),
                    },
                },
                Action::LoadComments {
                    generation,
                    post_id,
                } => match source.comments(&post_id).await {
                    Ok(records) => NetworkEvent::CommentsLoaded {
                        generation,
                        records,
                    },
                    Err(err) => NetworkEvent::Failed {
                        generation,
                        message: err.to_string(),
                    },
                },
            };
            let _ = event_tx.send(event);
        });
    }
}

/// Polls the config file and pushes theme changes to the UI. A theme kind
/// given on the command line wins over the file.
pub async fn run_config_watcher(
    path: PathBuf,
    theme_override: Option<ThemeKind>,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
) {
    let load_theme = || {
        let mut config = Config::load(&path);
        if let Some(kind) = theme_override {
            config.theme = kind;
        }
        config.theme()
    };
    let mut last_theme = load_theme();
    let mut interval = tokio::time::interval(Duration::from_secs(1));

    loop {
        interval.tick().await;
        let theme = load_theme();
        if theme != last_theme {
            last_theme = theme;
            if event_tx.send(NetworkEvent::ThemeUpdate(theme)).is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::Visibility;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            title: format!("Post {id}"),
            url: None,
            author: "pg".to_string(),
            points: 1,
            comment_count: 2,
            date_created_string: "now".to_string(),
        }
    }

    fn record(id: u64, level: usize) -> CommentRecord {
        CommentRecord {
            id: id.into(),
            level,
            author_username: "u".to_string(),
            date_created_string: "now".to_string(),
            text: "<p>hi</p>".to_string(),
        }
    }

    fn test_app() -> (App, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(&Config::default(), tx), rx)
    }

    fn loaded_app(posts: usize, next: Option<&str>) -> (App, mpsc::UnboundedReceiver<Action>) {
        let (mut app, mut rx) = test_app();
        app.load_posts();
        let Some(Action::LoadPosts { generation, .. }) = rx.try_recv().ok() else {
            panic!("expected a posts request");
        };
        app.on_network_event(NetworkEvent::PostsLoaded {
            generation,
            page: PostPage {
                posts: (0..posts).map(|i| post(&i.to_string())).collect(),
                next_page: next.map(str::to_string),
            },
        });
        (app, rx)
    }

    #[test]
    fn test_stale_posts_are_dropped() {
        let (mut app, _rx) = test_app();
        app.load_posts();
        app.load_posts();
        app.on_network_event(NetworkEvent::PostsLoaded {
            generation: 1,
            page: PostPage {
                posts: vec![post("old")],
                next_page: None,
            },
        });
        assert!(app.feed.posts().is_empty());
        assert!(app.feed.is_loading());
    }

    #[test]
    fn test_failure_shows_toast() {
        let (mut app, _rx) = test_app();
        app.load_posts();
        app.on_network_event(NetworkEvent::Failed {
            generation: 1,
            message: "timeout".to_string(),
        });
        assert!(!app.feed.is_loading());
        assert_eq!(app.toast.as_ref().unwrap().message, CONNECTION_ERROR);
    }

    #[test]
    fn test_stale_failure_is_silent() {
        let (mut app, mut rx) = loaded_app(3, None);
        app.handle_key(KeyCode::Enter);
        let Some(Action::LoadComments { generation, .. }) = rx.try_recv().ok() else {
            panic!("expected a comments request");
        };
        app.handle_key(KeyCode::Esc);
        assert_eq!(app.state, AppState::Posts);

        app.on_network_event(NetworkEvent::Failed {
            generation,
            message: "timeout".to_string(),
        });
        assert!(app.toast.is_none());

        app.handle_key(KeyCode::Tab);
        assert!(matches!(rx.try_recv(), Ok(Action::LoadPosts { .. })));
        // The feed the app started with.
        app.on_network_event(NetworkEvent::Failed {
            generation: 1,
            message: "timeout".to_string(),
        });
        assert!(app.toast.is_none());
        assert!(app.feed.is_loading());
    }

    #[test]
    fn test_displayed_trigger_row_requests_next_page() {
        let (mut app, mut rx) = loaded_app(30, Some("1"));
        app.posts_window = 20..26;
        app.on_tick();
        match rx.try_recv() {
            Ok(Action::LoadMorePosts { cursor, .. }) => assert_eq!(cursor, "1"),
            other => panic!("unexpected {other:?}"),
        }
        app.on_tick();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_comments_toggle_through_keys() {
        let (mut app, mut rx) = loaded_app(3, None);
        app.handle_key(KeyCode::Char('j'));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.state, AppState::Comments);

        let Ok(Action::LoadComments { generation, post_id }) = rx.try_recv() else {
            panic!("expected a comments request");
        };
        assert_eq!(post_id, "1");
        app.on_network_event(NetworkEvent::CommentsLoaded {
            generation,
            records: vec![record(1, 0), record(2, 1), record(3, 0)],
        });

        app.handle_key(KeyCode::Enter);
        let screen = app.comments.as_ref().unwrap();
        let presenter = screen.presenter.as_ref().unwrap();
        assert_eq!(presenter.row_count(), 2);
        assert_eq!(presenter.row_at(0).unwrap().visibility(), Visibility::Compact);
        assert_eq!(screen.view.redraws, 1);

        app.handle_key(KeyCode::Char('j'));
        app.handle_key(KeyCode::Char('j'));
        assert_eq!(app.comments.as_ref().unwrap().view.selected, 1);

        app.handle_key(KeyCode::Esc);
        assert_eq!(app.state, AppState::Posts);
        assert_eq!(app.feed.selected, 1);
    }

    #[test]
    fn test_malformed_thread_shows_toast() {
        let (mut app, mut rx) = loaded_app(1, None);
        app.handle_key(KeyCode::Enter);
        let Ok(Action::LoadComments { generation, .. }) = rx.try_recv() else {
            panic!("expected a comments request");
        };
        app.on_network_event(NetworkEvent::CommentsLoaded {
            generation,
            records: vec![record(1, 0), record(2, 3)],
        });
        let screen = app.comments.as_ref().unwrap();
        assert_eq!(screen.presenter.as_ref().unwrap().row_count(), 0);
        assert!(app.toast.is_some());
    }

    #[test]
    fn test_preview_requires_panel_and_url() {
        let (mut app, _rx) = loaded_app(2, None);
        assert_eq!(app.preview(), None);
        app.handle_key(KeyCode::Char('p'));
        assert_eq!(app.preview(), None);

        let (mut app, _rx) = test_app();
        let mut linked = post("7");
        linked.url = Some("https://example.com/x".to_string());
        app.feed.finish_refresh(PostPage {
            posts: vec![linked],
            next_page: None,
        });
        app.handle_key(KeyCode::Char('p'));
        assert_eq!(app.preview().unwrap().action_title, "View 2 comments");
    }

    #[tokio::test]
    async fn test_network_loop_round_trip() {
        use crate::source::MemorySource;

        let source = Arc::new(
            MemorySource::new(vec![PostPage {
                posts: vec![post("1")],
                next_page: Some("1".to_string()),
            }])
            .with_comments("1", vec![record(10, 0)]),
        );
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_network_loop(source, action_rx, event_tx));

        action_tx
            .send(Action::LoadPosts {
                generation: 4,
                post_type: PostType::News,
            })
            .unwrap();
        match event_rx.recv().await {
            Some(NetworkEvent::PostsLoaded { generation, page }) => {
                assert_eq!(generation, 4);
                assert_eq!(page.posts.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }

        action_tx
            .send(Action::LoadMorePosts {
                generation: 4,
                post_type: PostType::News,
                cursor: "1".to_string(),
            })
            .unwrap();
        assert!(matches!(
            event_rx.recv().await,
            Some(NetworkEvent::Failed { generation: 4, .. })
        ));
    }
}
