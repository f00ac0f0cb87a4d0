use crate::source::{Post, PostPage, PostType};

/// Loading of the next page starts when the row this far from the end of the
/// list is displayed.
pub const LOAD_MORE_DISTANCE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyState {
    Loading,
    NoPosts,
}

impl EmptyState {
    pub fn title(self) -> &'static str {
        match self {
            EmptyState::Loading => "Loading",
            EmptyState::NoPosts => "No posts",
        }
    }

    pub fn shows_spinner(self) -> bool {
        matches!(self, EmptyState::Loading)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkPreview {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub action_title: String,
}

/// State of the post list screen: what is loaded, where the next page starts
/// and what is selected.
#[derive(Debug, Default)]
pub struct PostFeed {
    posts: Option<Vec<Post>>,
    next_page: Option<String>,
    post_type: PostType,
    pub selected: usize,
    loading: bool,
    peeked: Option<usize>,
}

impl PostFeed {
    pub fn new(post_type: PostType) -> Self {
        Self {
            post_type,
            ..Default::default()
        }
    }

    pub fn posts(&self) -> &[Post] {
        self.posts.as_deref().unwrap_or_default()
    }

    pub fn post_type(&self) -> PostType {
        self.post_type
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.posts().get(self.selected)
    }

    /// Starts a pull-to-refresh. Posts already shown stay until the new page
    /// arrives.
    pub fn begin_refresh(&mut self) {
        self.loading = true;
    }

    pub fn finish_refresh(&mut self, page: PostPage) {
        tracing::info!(
            post_type = %self.post_type,
            posts = page.posts.len(),
            more = page.next_page.is_some(),
            "loaded posts"
        );
        self.posts = Some(page.posts);
        self.next_page = page.next_page;
        self.selected = 0;
        self.peeked = None;
        self.loading = false;
    }

    /// Called for every row as it comes on screen. Returns the cursor to fetch
    /// when that row is the trigger row. The cursor is taken, so the same page
    /// is never requested twice; a failed fetch ends pagination.
    pub fn on_row_displayed(&mut self, row: usize) -> Option<String> {
        let len = self.posts.as_ref()?.len();
        if len < LOAD_MORE_DISTANCE || row != len - LOAD_MORE_DISTANCE {
            return None;
        }
        let cursor = self.next_page.take()?;
        tracing::debug!(row, %cursor, "loading more posts");
        Some(cursor)
    }

    pub fn finish_load_more(&mut self, page: PostPage) {
        tracing::info!(posts = page.posts.len(), more = page.next_page.is_some(), "appended posts");
        self.posts.get_or_insert_with(Vec::new).extend(page.posts);
        self.next_page = page.next_page;
    }

    pub fn fail(&mut self) {
        self.loading = false;
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        match &self.posts {
            None => Some(EmptyState::Loading),
            Some(posts) if posts.is_empty() => Some(EmptyState::NoPosts),
            Some(_) => None,
        }
    }

    pub fn switch_post_type(&mut self, post_type: PostType) {
        *self = Self::new(post_type);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.posts().len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Link preview of the post at `row`, when it links to a web page.
    pub fn peek(&mut self, row: usize) -> Option<LinkPreview> {
        let post = self.posts().get(row)?;
        let url = post.url.as_deref().filter(|u| verify_link(u))?;
        let preview = LinkPreview {
            title: post.title.clone(),
            url: url.to_string(),
            domain: domain(url).to_string(),
            action_title: preview_action_title(post),
        };
        self.peeked = Some(row);
        Some(preview)
    }

    pub fn peeked(&self) -> Option<&Post> {
        self.posts().get(self.peeked?)
    }

    pub fn clear_peek(&mut self) {
        self.peeked = None;
    }
}

pub fn preview_action_title(post: &Post) -> String {
    if post.comment_count > 0 {
        format!("View {} comments", post.comment_count)
    } else {
        "View comments".to_string()
    }
}

/// Only web links can be previewed or opened.
pub fn verify_link(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && !domain(url).is_empty()
}

/// Host part of a URL, without a leading `www.`.
pub fn domain(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host)
}
