use anyhow::{Result, anyhow};
use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;
use wreq::Client;
use wreq_util::Emulation;

use crate::config::crawler_config::{KeywordConfig, NoticeSelectors};
use crate::config::CrawlerConfig;
use crate::models::SourceMetadata;
use crate::storage::{AttachmentStore, StoreOutcome};

/// One entry of the announcement list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub link: String,
    pub date: String,
}

/// A spreadsheet linked from a notice's detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// What a crawl changed on disk.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub notice: Option<Notice>,
    pub stored: Vec<(String, StoreOutcome)>,
    pub failed: Vec<String>,
    pub removed: Vec<String>,
}

/// Keyword heuristics for picking the exam-schedule notice and its student attachments.
pub struct NoticeFilter {
    keywords: KeywordConfig,
}

impl NoticeFilter {
    pub fn new(keywords: KeywordConfig) -> Self {
        NoticeFilter { keywords }
    }

    pub fn is_schedule_title(&self, title: &str) -> bool {
        if self.keywords.exclude.iter().any(|kw| title.contains(kw.as_str())) {
            return false;
        }
        if !self.keywords.required.iter().all(|kw| title.contains(kw.as_str())) {
            return false;
        }
        self.keywords.target.iter().any(|kw| title.contains(kw.as_str()))
    }

    /// Student versions when any exist, otherwise everything not meant for staff.
    pub fn select_attachments(&self, candidates: Vec<Attachment>) -> Vec<Attachment> {
        let is_student = |a: &Attachment| {
            self.keywords
                .student_files
                .iter()
                .any(|kw| a.name.contains(kw.as_str()))
        };

        if candidates.iter().any(is_student) {
            return candidates.into_iter().filter(is_student).collect();
        }

        candidates
            .into_iter()
            .filter(|a| !self.keywords.staff_files.iter().any(|kw| a.name.contains(kw.as_str())))
            .collect()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid selector '{}': {}", selector, e))
}

fn element_text(element: &ElementRef) -> String {
    element.text().map(str::trim).collect::<String>()
}

fn resolve_link(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base).map_err(|e| anyhow!("Invalid page URL {}: {}", base, e))?;
    let url = base
        .join(href)
        .map_err(|e| anyhow!("Invalid link {}: {}", href, e))?;
    Ok(url.to_string())
}

/// Strips characters that are not allowed in file names.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_spreadsheet_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".xls") || lower.ends_with(".xlsx")
}

/// Notices listed on one announcement page.
pub fn extract_notices(html: &str, page_url: &str, selectors: &NoticeSelectors) -> Result<Vec<Notice>> {
    let document = Html::parse_document(html);
    let container_selector = parse_selector(&selectors.container)?;
    let item_selector = parse_selector(&selectors.item)?;
    let title_selector = parse_selector(&selectors.title)?;
    let date_selector = parse_selector(&selectors.date)?;
    let anchor_selector = parse_selector("a")?;

    let Some(container) = document.select(&container_selector).next() else {
        warn!("Notice list container '{}' not found on {}", selectors.container, page_url);
        return Ok(Vec::new());
    };

    let mut notices = Vec::new();
    for item in container.select(&item_selector) {
        let anchor = item
            .select(&title_selector)
            .next()
            .and_then(|span| span.select(&anchor_selector).next())
            .or_else(|| item.select(&anchor_selector).next());
        let Some(anchor) = anchor else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        let title = anchor
            .value()
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| element_text(&anchor));

        let link = match resolve_link(page_url, href) {
            Ok(link) => link,
            Err(e) => {
                warn!("Skipping notice '{}': {}", title, e);
                continue;
            }
        };

        let date = item
            .select(&date_selector)
            .next()
            .map(|d| element_text(&d))
            .unwrap_or_default();

        notices.push(Notice { title, link, date });
    }

    Ok(notices)
}

/// Spreadsheet links on a notice's detail page, first occurrence of each name kept.
pub fn extract_attachments(html: &str, page_url: &str) -> Result<Vec<Attachment>> {
    let document = Html::parse_document(html);
    let anchor_selector = parse_selector("a")?;
    let mut seen = HashSet::new();
    let mut attachments = Vec::new();

    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !is_spreadsheet_name(href) {
            continue;
        }

        let text = element_text(&anchor);
        let raw_name = if is_spreadsheet_name(&text) {
            text
        } else {
            href.rsplit('/').next().unwrap_or(href).to_string()
        };
        let name = sanitize_file_name(&raw_name);
        if name.is_empty() || !seen.insert(name.clone()) {
            continue;
        }

        match resolve_link(page_url, href) {
            Ok(url) => attachments.push(Attachment { name, url }),
            Err(e) => warn!("Skipping attachment {}: {}", name, e),
        }
    }

    Ok(attachments)
}

/// Finds the newest exam-schedule notice and downloads its spreadsheets.
pub struct NoticeCrawler {
    client: Client,
    config: CrawlerConfig,
    filter: NoticeFilter,
}

impl NoticeCrawler {
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .emulation(Emulation::Firefox136)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let filter = NoticeFilter::new(config.keywords.clone());

        Ok(NoticeCrawler {
            client,
            config,
            filter,
        })
    }

    /// Scans up to `max_pages` list pages; the first matching title wins.
    pub async fn find_latest_notice(&self) -> Result<Option<Notice>> {
        for page in 1..=self.config.max_pages.max(1) {
            let url = self.config.list_page_url(page);
            info!("Scanning notice list page {}: {}", page, url);

            let html = self.fetch_text(&url).await?;
            let notices = extract_notices(&html, &url, &self.config.selectors)?;
            if notices.is_empty() {
                info!("No notices on page {}, stopping", page);
                break;
            }

            for notice in notices {
                if self.filter.is_schedule_title(&notice.title) {
                    info!("Matched notice: {} ({})", notice.title, notice.link);
                    return Ok(Some(notice));
                }
                debug!("Skipped notice: {}", notice.title);
            }

            if page < self.config.max_pages {
                self.polite_delay().await;
            }
        }

        Ok(None)
    }

    pub async fn list_attachments(&self, notice: &Notice) -> Result<Vec<Attachment>> {
        let html = self.fetch_text(&notice.link).await?;
        let candidates = extract_attachments(&html, &notice.link)?;
        info!("Found {} spreadsheet attachments", candidates.len());
        Ok(self.filter.select_attachments(candidates))
    }

    /// Downloads the selected attachments into `store`, replacing files only when
    /// their content changed, then records provenance at `metadata_path`.
    pub async fn sync(&self, store: &AttachmentStore, metadata_path: &Path) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        let Some(notice) = self.find_latest_notice().await? else {
            warn!("No exam schedule notice found");
            return Ok(report);
        };

        let attachments = self.list_attachments(&notice).await?;
        if attachments.is_empty() {
            warn!("Notice '{}' has no matching spreadsheet attachments", notice.title);
            report.notice = Some(notice);
            return Ok(report);
        }

        for attachment in &attachments {
            match self.download(attachment).await {
                Ok(bytes) => match store.store(&attachment.name, &bytes) {
                    Ok(outcome) => report.stored.push((attachment.name.clone(), outcome)),
                    Err(e) => {
                        error!("Failed to store {}: {:#}", attachment.name, e);
                        report.failed.push(attachment.name.clone());
                    }
                },
                Err(e) => {
                    error!("Failed to download {}: {}", attachment.name, e);
                    report.failed.push(attachment.name.clone());
                }
            }
            self.polite_delay().await;
        }

        if !report.stored.is_empty() {
            // Failed downloads keep their previous copy.
            let selected: Vec<String> = attachments.iter().map(|a| a.name.clone()).collect();
            report.removed = store.remove_stale(&selected)?;

            let names: Vec<String> = report.stored.iter().map(|(name, _)| name.clone()).collect();

            let metadata = SourceMetadata {
                source_url: notice.link.clone(),
                source_title: notice.title.clone(),
                downloaded_files: names,
                updated_at: Local::now().to_rfc3339(),
            };
            store.write_metadata(metadata_path, &metadata)?;
        }

        report.notice = Some(notice);
        Ok(report)
    }

    async fn download(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        info!("Downloading {}", attachment.name);
        let response = self.request(&attachment.url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| anyhow!("Network error: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response text: {}", e))?;
        debug!("Fetched {} characters from {}", html.len(), url);
        Ok(html)
    }

    fn request(&self, url: &str) -> wreq::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(referer) = &self.config.referer {
            request = request.header("Referer", referer.as_str());
        }
        if let Some(user_agent) = &self.config.user_agent {
            request = request.header("User-Agent", user_agent.as_str());
        }
        request
    }

    async fn polite_delay(&self) {
        let delay = Duration::from_millis(
            self.config.delay_between_requests_ms + (rand::random::<u64>() % 500),
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_HTML: &str = r#"
        <html><body>
        <div class="col_news_con"><ul>
          <li class="news n1 clearfix">
            <span class="news_title"><a href="/2025/1201/c1594a1/page.htm" title="关于2025-2026学年第一学期补考安排的通知">补考</a></span>
            <span class="news_meta">2025-12-01</span>
          </li>
          <li class="news n2 clearfix">
            <span class="news_title"><a href="/2025/1128/c1594a2/page.htm">2025-2026学年第一学期期末考试安排表</a></span>
            <span class="news_meta">2025-11-28</span>
          </li>
          <li class="news n3 clearfix">
            <span class="news_title"><a href="page3.htm" title="2025-2026学年第一学期课程结束考试安排表(第二批)"></a></span>
          </li>
        </ul></div>
        </body></html>
    "#;

    fn filter() -> NoticeFilter {
        NoticeFilter::new(KeywordConfig::default())
    }

    fn attachment(name: &str) -> Attachment {
        Attachment {
            name: name.to_string(),
            url: format!("https://jwc.njupt.edu.cn/files/{}", name),
        }
    }

    #[test]
    fn test_title_filter() {
        let filter = filter();
        assert!(filter.is_schedule_title("2025-2026学年第一学期期末考试安排表"));
        assert!(filter.is_schedule_title("2025-2026学年第二学期课程结束考试安排"));
        assert!(!filter.is_schedule_title("2025-2026学年第一学期补考安排表"));
        assert!(!filter.is_schedule_title("期末考试安排表"));
        assert!(!filter.is_schedule_title("2025-2026学年第一学期监考安排表"));
        assert!(!filter.is_schedule_title("2025-2026学年第一学期选课通知"));
    }

    #[test]
    fn test_extract_notices() {
        let page = "https://jwc.njupt.edu.cn/1594/list.htm";
        let notices = extract_notices(LIST_HTML, page, &NoticeSelectors::default()).unwrap();

        assert_eq!(notices.len(), 3);
        assert_eq!(notices[0].title, "关于2025-2026学年第一学期补考安排的通知");
        assert_eq!(notices[1].title, "2025-2026学年第一学期期末考试安排表");
        assert_eq!(notices[1].link, "https://jwc.njupt.edu.cn/2025/1128/c1594a2/page.htm");
        assert_eq!(notices[1].date, "2025-11-28");
        assert_eq!(notices[2].link, "https://jwc.njupt.edu.cn/1594/page3.htm");
        assert_eq!(notices[2].date, "");

        let first_match = notices.iter().find(|n| filter().is_schedule_title(&n.title)).unwrap();
        assert_eq!(first_match.date, "2025-11-28");
    }

    #[test]
    fn test_missing_container() {
        let notices = extract_notices("<html><body><ul></ul></body></html>", "https://a.b/list.htm", &NoticeSelectors::default()).unwrap();
        assert!(notices.is_empty());
    }

    #[test]
    fn test_extract_attachments() {
        let html = r#"
            <div class="wp_articlecontent">
              <a href="/_upload/article/files/ab/cd/学生考试安排.xlsx">学生考试安排.xlsx</a>
              <a href="/_upload/article/files/ab/cd/f2.XLS">点击下载监考安排</a>
              <a href="/_upload/article/files/ab/cd/notice.pdf">通知.pdf</a>
              <a href="/_upload/article/files/ab/cd/学生考试安排.xlsx">学生考试安排.xlsx</a>
              <a href="/x/y.xlsx">考试:安排?表.xlsx</a>
            </div>
        "#;
        let page = "https://jwc.njupt.edu.cn/2025/1128/c1594a2/page.htm";
        let attachments = extract_attachments(html, page).unwrap();

        let names: Vec<_> = attachments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["学生考试安排.xlsx", "f2.XLS", "考试安排表.xlsx"]);
        assert_eq!(attachments[2].url, "https://jwc.njupt.edu.cn/x/y.xlsx");
    }

    #[test]
    fn test_select_student_files() {
        let selected = filter().select_attachments(vec![
            attachment("学生考试安排.xlsx"),
            attachment("监考安排.xlsx"),
            attachment("学生补充名单.xls"),
        ]);
        let names: Vec<_> = selected.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["学生考试安排.xlsx", "学生补充名单.xls"]);
    }

    #[test]
    fn test_select_non_staff_files() {
        let selected = filter().select_attachments(vec![
            attachment("期末考试安排.xlsx"),
            attachment("监考教师安排.xlsx"),
            attachment("教务员联系表.xlsx"),
        ]);
        assert_eq!(selected, vec![attachment("期末考试安排.xlsx")]);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a/b\\c*d?e:f\"g<h>i|j.xlsx"), "abcdefghij.xlsx");
        assert_eq!(sanitize_file_name(" 学生.xlsx "), "学生.xlsx");
    }
}
