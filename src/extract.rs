// src/extract.rs
//! Page reader for the listing site.
//!
//! All knowledge of the site's markup lives here: selectors, label scanning
//! and the "Easily apply" marker. Everything works on an HTML snapshot so the
//! rest of the engine only ever sees typed values.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

const QUICK_APPLY_MARKER: &str = "easily apply";

const TITLE_SELECTORS: [&str; 3] = [".jobTitle", "h2.jobTitle span", "[data-testid='jobTitle']"];
const COMPANY_SELECTORS: [&str; 2] = [".companyName", "[data-testid='company-name']"];
const CARD_LOCATION_SELECTORS: [&str; 2] = [".companyLocation", "[data-testid='text-location']"];

const SALARY_SELECTORS: [&str; 3] = [
    ".salary-snippet",
    "[data-testid='salary-snippet']",
    "#salaryInfoAndJobType span",
];

const DETAIL_LOCATION_SELECTORS: [&str; 4] = [
    ".jobsearch-JobInfoHeader-subtitle div",
    ".jobsearch-DesktopStickyContainer-subtitle div",
    "[data-testid='inlineHeader-companyLocation']",
    ".companyLocation",
];

const CAPTCHA_SELECTORS: [&str; 3] = [
    "iframe[src*='captcha']",
    "#challenge-form",
    "[class*='captcha']",
];

/// A posting found on a search-results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCandidate {
    pub id: String,
    pub link: String,
    pub title: String,
    pub company: String,
    pub location: String,
}

/// Eligibility signals read from a job detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetails {
    pub salary_text: Option<String>,
    pub job_type_text: Option<String>,
    pub location: Option<String>,
}

/// Quick-apply postings on a results page, first occurrence of each id only.
pub fn parse_search_results(html: &str, base_url: &Url) -> Vec<JobCandidate> {
    let document = Html::parse_document(html);
    let Ok(anchor_selector) = Selector::parse("a[data-jk]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for anchor in document.select(&anchor_selector) {
        let Some(id) = anchor
            .value()
            .attr("data-jk")
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            continue;
        };

        let card = result_card(anchor);
        if !is_quick_apply(anchor) && !is_quick_apply(card) {
            continue;
        }
        if !seen.insert(id.to_string()) {
            continue;
        }

        let link = anchor
            .value()
            .attr("href")
            .and_then(|href| base_url.join(href).ok())
            .or_else(|| base_url.join(&format!("/viewjob?jk={}", id)).ok())
            .map(|url| url.to_string())
            .unwrap_or_default();

        let title = find_text_within(anchor, &TITLE_SELECTORS)
            .or_else(|| find_text_within(card, &TITLE_SELECTORS))
            .or_else(|| first_text_line(anchor))
            .unwrap_or_default();

        jobs.push(JobCandidate {
            id: id.to_string(),
            link,
            title,
            company: find_text_within(card, &COMPANY_SELECTORS).unwrap_or_default(),
            location: find_text_within(card, &CARD_LOCATION_SELECTORS).unwrap_or_default(),
        });
    }

    debug!("Extracted {} quick-apply candidates", jobs.len());
    jobs
}

pub fn parse_job_details(html: &str) -> JobDetails {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let job_type_text = labelled_value(&document, "job type").or_else(|| {
        warn!("Job Type label not found, falling back to page text");
        body_text(&document)
    });

    JobDetails {
        salary_text: find_text_within(root, &SALARY_SELECTORS),
        job_type_text,
        location: find_text_within(root, &DETAIL_LOCATION_SELECTORS),
    }
}

pub fn looks_like_captcha(html: &str) -> bool {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let has_widget = CAPTCHA_SELECTORS.iter().any(|sel| {
        Selector::parse(sel)
            .map(|selector| root.select(&selector).next().is_some())
            .unwrap_or(false)
    });
    has_widget
        || body_text(&document)
            .map(|text| text.to_lowercase().contains("verify you are human"))
            .unwrap_or(false)
}

/// A visible sign-in link means the session is not authenticated.
pub fn has_sign_in_link(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(links) = Selector::parse("a") else {
        return false;
    };
    document.select(&links).any(|link| {
        let href = link.value().attr("href").unwrap_or_default().to_lowercase();
        let text = clean_text(&link.text().collect::<Vec<_>>().join(" ")).to_lowercase();
        href.contains("account/login") || text == "sign in"
    })
}

/// Nearest enclosing result card, or the anchor itself.
fn result_card(anchor: ElementRef<'_>) -> ElementRef<'_> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(6)
        .find(|el| {
            let value = el.value();
            value.name() == "li"
                || value
                    .classes()
                    .any(|class| class == "result" || class == "job_seen_beacon" || class == "cardOutline")
        })
        .unwrap_or(anchor)
}

fn is_quick_apply(el: ElementRef<'_>) -> bool {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
        .to_lowercase()
        .contains(QUICK_APPLY_MARKER)
}

/// Text of the element following the first element whose own text names `label`.
fn labelled_value(document: &Html, label: &str) -> Option<String> {
    let all = Selector::parse("*").ok()?;
    document
        .select(&all)
        .filter(|el| {
            own_text(*el).to_lowercase().contains(label)
        })
        .find_map(|el| {
            el.next_siblings()
                .filter_map(ElementRef::wrap)
                .next()
                .map(|sibling| clean_text(&sibling.text().collect::<Vec<_>>().join(" ")))
                .filter(|text| !text.is_empty())
        })
}

fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn body_text(document: &Html) -> Option<String> {
    let body = Selector::parse("body").ok()?;
    document
        .select(&body)
        .next()
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}

fn first_text_line(el: ElementRef<'_>) -> Option<String> {
    el.text()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn find_text_within(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = scope.select(&selector).next() {
                let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
