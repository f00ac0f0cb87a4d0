use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::comment::CommentId;
use crate::error::{Error, Result};

const API_BASE: &str = "https://hn.algolia.com/api/v1";
const ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PostType {
    #[default]
    News,
    Newest,
    Ask,
    Show,
    Jobs,
}

impl PostType {
    pub const ALL: [PostType; 5] = [
        PostType::News,
        PostType::Newest,
        PostType::Ask,
        PostType::Show,
        PostType::Jobs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PostType::News => "news",
            PostType::Newest => "newest",
            PostType::Ask => "ask",
            PostType::Show => "show",
            PostType::Jobs => "jobs",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PostType::News => "Top",
            PostType::Newest => "New",
            PostType::Ask => "Ask HN",
            PostType::Show => "Show HN",
            PostType::Jobs => "Jobs",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn search_tags(self) -> &'static str {
        match self {
            PostType::News => "front_page",
            PostType::Newest => "story",
            PostType::Ask => "ask_hn",
            PostType::Show => "show_hn",
            PostType::Jobs => "job",
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            PostType::Newest | PostType::Jobs => "search_by_date",
            _ => "search",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown post type `{s}`"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub author: String,
    pub points: u32,
    pub comment_count: u32,
    pub date_created_string: String,
}

impl Post {
    /// The discussion page, used when the post has no link of its own.
    pub fn item_url(&self) -> String {
        format!("{ITEM_URL}{}", self.id)
    }
}

/// One page of posts plus the cursor to the next one, `None` on the last page.
#[derive(Clone, Debug, Default)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub next_page: Option<String>,
}

/// A comment as delivered by the content source, already in thread order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentRecord {
    pub id: CommentId,
    pub level: usize,
    pub author_username: String,
    pub date_created_string: String,
    pub text: String,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn posts(&self, post_type: PostType, cursor: Option<&str>) -> Result<PostPage>;

    async fn comments(&self, post_id: &str) -> Result<Vec<CommentRecord>>;
}

pub struct HackerNewsService {
    client: reqwest::Client,
    base: String,
    page_size: usize,
}

impl HackerNewsService {
    pub fn new(page_size: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hackers/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base: API_BASE.to_string(),
            page_size,
        }
    }
}

#[async_trait]
impl ContentSource for HackerNewsService {
    async fn posts(&self, post_type: PostType, cursor: Option<&str>) -> Result<PostPage> {
        let page = cursor.unwrap_or("0");
        let hits_per_page = self.page_size.to_string();
        let params = [
            ("tags", post_type.search_tags()),
            ("page", page),
            ("hitsPerPage", hits_per_page.as_str()),
        ];
        let url = format!("{}/{}", self.base, post_type.endpoint());
        tracing::debug!(%url, %post_type, page, "fetching posts");

        let resp: SearchResponse = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.into_page(Utc::now()))
    }

    async fn comments(&self, post_id: &str) -> Result<Vec<CommentRecord>> {
        let url = format!("{}/items/{}", self.base, post_id);
        tracing::debug!(%url, "fetching comments");

        let item: Item = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(flatten_comments(&item.children, Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<Hit>,
    page: usize,
    #[serde(rename = "nbPages")]
    nb_pages: usize,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    author: Option<String>,
    points: Option<u32>,
    num_comments: Option<u32>,
    created_at_i: Option<i64>,
}

impl SearchResponse {
    fn into_page(self, now: DateTime<Utc>) -> PostPage {
        let next_page = (self.page + 1 < self.nb_pages).then(|| (self.page + 1).to_string());
        let posts = self
            .hits
            .into_iter()
            .filter_map(|hit| {
                let title = hit.title.filter(|t| !t.is_empty())?;
                Some(Post {
                    id: hit.object_id,
                    title,
                    url: hit.url.filter(|u| !u.is_empty()),
                    author: hit.author.unwrap_or_default(),
                    points: hit.points.unwrap_or(0),
                    comment_count: hit.num_comments.unwrap_or(0),
                    date_created_string: hit
                        .created_at_i
                        .map(|ts| time_ago(ts, now))
                        .unwrap_or_default(),
                })
            })
            .collect();
        PostPage { posts, next_page }
    }
}

#[derive(Debug, Deserialize)]
struct Item {
    id: u64,
    author: Option<String>,
    text: Option<String>,
    created_at_i: Option<i64>,
    #[serde(default)]
    children: Vec<Item>,
}

impl Item {
    fn is_deleted(&self) -> bool {
        self.author.is_none() && self.text.as_deref().is_none_or(str::is_empty)
    }
}

/// Flattens a reply tree into thread order. Deleted comments without replies
/// are dropped; deleted ones with replies stay as placeholders so the replies
/// keep their parent.
fn flatten_comments(children: &[Item], now: DateTime<Utc>) -> Vec<CommentRecord> {
    fn walk(items: &[Item], level: usize, now: DateTime<Utc>, out: &mut Vec<CommentRecord>) {
        for item in items {
            if item.is_deleted() && item.children.is_empty() {
                continue;
            }
            out.push(CommentRecord {
                id: CommentId::from(item.id),
                level,
                author_username: item
                    .author
                    .clone()
                    .unwrap_or_else(|| "[deleted]".to_string()),
                date_created_string: item
                    .created_at_i
                    .map(|ts| time_ago(ts, now))
                    .unwrap_or_default(),
                text: item.text.clone().unwrap_or_default(),
            });
            walk(&item.children, level + 1, now, out);
        }
    }

    let mut out = Vec::new();
    walk(children, 0, now, &mut out);
    out
}

/// "just now", "5 minutes ago", "1 hour ago", "3 days ago".
pub fn time_ago(timestamp: i64, now: DateTime<Utc>) -> String {
    let Some(then) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
        return String::new();
    };
    let elapsed = now.signed_duration_since(then);

    let (amount, unit) = if elapsed.num_days() >= 365 {
        (elapsed.num_days() / 365, "year")
    } else if elapsed.num_days() >= 30 {
        (elapsed.num_days() / 30, "month")
    } else if elapsed.num_days() >= 1 {
        (elapsed.num_days(), "day")
    } else if elapsed.num_hours() >= 1 {
        (elapsed.num_hours(), "hour")
    } else if elapsed.num_minutes() >= 1 {
        (elapsed.num_minutes(), "minute")
    } else {
        return "just now".to_string();
    };

    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural} ago")
}

/// A content source serving fixed data, for tests and offline use.
#[derive(Default)]
pub struct MemorySource {
    pages: Vec<PostPage>,
    comments: Vec<(String, Vec<CommentRecord>)>,
    requests: Mutex<Vec<Option<String>>>,
}

impl MemorySource {
    /// `pages[i]` is served for cursor `i`, the first one for no cursor.
    pub fn new(pages: Vec<PostPage>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn with_comments(mut self, post_id: impl Into<String>, records: Vec<CommentRecord>) -> Self {
        self.comments.push((post_id.into(), records));
        self
    }

    /// Cursors of every post request made so far.
    pub fn requests(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn posts(&self, _post_type: PostType, cursor: Option<&str>) -> Result<PostPage> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(cursor.map(str::to_string));
        }
        let index = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| Error::Decode(format!("bad cursor `{c}`")))?,
            None => 0,
        };
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Decode(format!("no page {index}")))
    }

    async fn comments(&self, post_id: &str) -> Result<Vec<CommentRecord>> {
        self.comments
            .iter()
            .find(|(id, _)| id == post_id)
            .map(|(_, records)| records.clone())
            .ok_or_else(|| Error::Decode(format!("no item {post_id}")))
    }
}
