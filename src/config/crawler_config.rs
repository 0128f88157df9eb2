use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Configuration for the announcement-list crawler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Directory URL of the announcement list, ending in `/`.
    pub base_url: String,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub max_pages: usize,
    pub delay_between_requests_ms: u64,
    pub timeout_seconds: u64,
    pub selectors: NoticeSelectors,
    pub keywords: KeywordConfig,
}

/// CSS selectors for the announcement list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeSelectors {
    pub container: String,
    pub item: String,
    pub title: String,
    pub date: String,
}

/// Keyword heuristics for notice titles and attachment names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Every one of these must appear in the title.
    pub required: Vec<String>,
    /// At least one of these must appear in the title.
    pub target: Vec<String>,
    /// None of these may appear in the title.
    pub exclude: Vec<String>,
    /// Attachments for students; when any exist only these are downloaded.
    pub student_files: Vec<String>,
    /// Attachments for invigilators and staff, skipped otherwise.
    pub staff_files: Vec<String>,
}

impl CrawlerConfig {
    /// Page 1 is `list.htm`, later pages are `list<N>.htm`.
    pub fn list_page_url(&self, page: usize) -> String {
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };

        if page <= 1 {
            format!("{}list.htm", base)
        } else {
            format!("{}list{}.htm", base, page)
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jwc.njupt.edu.cn/1594/".to_string(),
            referer: Some("https://jwc.njupt.edu.cn/".to_string()),
            user_agent: None,
            max_pages: 1,
            delay_between_requests_ms: 1000,
            timeout_seconds: 30,
            selectors: NoticeSelectors::default(),
            keywords: KeywordConfig::default(),
        }
    }
}

impl Default for NoticeSelectors {
    fn default() -> Self {
        Self {
            container: "div.col_news_con".to_string(),
            item: "li.news".to_string(),
            title: "span.news_title".to_string(),
            date: "span.news_meta".to_string(),
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            required: strings(&["学年", "学期"]),
            target: strings(&["考试安排表", "期末考试", "课程结束考试"]),
            exclude: strings(&[
                "阶段性", "补考", "清欠", "分级", "补学", "换证", "重修", "选拔", "竞赛", "发车", "监考",
            ]),
            student_files: strings(&["学生"]),
            staff_files: strings(&["监考", "教师", "巡考", "教务员"]),
        }
    }
}
