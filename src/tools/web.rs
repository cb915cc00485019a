//! Generic web tools: search and page fetch.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::Tool;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; RedditScout/0.1)";
const MAX_FETCH_CHARS: usize = 20_000;

/// Web search over DuckDuckGo's HTML endpoint (no API key needed).
pub struct WebSearch;

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "search_tool"
    }

    fn description(&self) -> &str {
        "Search the web. Returns titles, snippets and URLs of the top results. Use when the answer needs information that no other tool provides."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "search_query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results (default: 5)"
                }
            },
            "required": ["search_query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["search_query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'search_query' argument"))?;
        let max_results = args["max_results"].as_u64().unwrap_or(5) as usize;

        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let html = client.get(&url).send().await?.text().await?;

        let results = extract_ddg_results(&html, max_results);
        if results.is_empty() {
            Ok(format!("No results found for: {}", query))
        } else {
            Ok(results.join("\n\n"))
        }
    }
}

fn ddg_result_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?s)class="result__a"[^>]*>(?P<title>.*?)</a>.*?class="result__url"[^>]*>(?P<url>.*?)</a>.*?class="result__snippet"[^>]*>(?P<snippet>.*?)</a>"#,
        )
        .expect("valid regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"))
}

/// One pattern per element so an opening tag only closes on its own end tag.
fn non_text_res() -> &'static [Regex; 3] {
    static RES: OnceLock<[Regex; 3]> = OnceLock::new();
    RES.get_or_init(|| {
        ["script", "style", "noscript"].map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>", tag = tag))
                .expect("valid regex")
        })
    })
}

fn extract_ddg_results(html: &str, max_results: usize) -> Vec<String> {
    ddg_result_re()
        .captures_iter(html)
        .take(max_results)
        .map(|c| {
            format!(
                "**{}**\n{}\nURL: {}",
                strip_tags(&c["title"]),
                strip_tags(&c["snippet"]),
                strip_tags(&c["url"])
            )
        })
        .collect()
}

fn strip_tags(fragment: &str) -> String {
    let text = tag_re().replace_all(fragment, " ");
    html_decode(&text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();
    for re in non_text_res() {
        text = re.replace_all(&text, " ").into_owned();
    }
    strip_tags(&text)
}

fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!(
            "{}... [content truncated, showing first {} chars]",
            &s[..cut],
            max
        ),
        None => s,
    }
}

/// Fetch a URL and return its readable text.
pub struct WebFetch;

#[async_trait]
impl Tool for WebFetch {
    fn name(&self) -> &str {
        "web_fetch_tool"
    }

    fn description(&self) -> &str {
        "Fetch the content of an http(s) URL and return its text. HTML pages are reduced to readable text."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let raw = args["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'url' argument"))?;
        let url = url::Url::parse(raw)?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Unsupported URL scheme: {}", url.scheme());
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/html"));
        let body = response.text().await?;

        let text = if is_html { html_to_text(&body) } else { body };
        Ok(truncate_chars(text, MAX_FETCH_CHARS))
    }
}
