//! HTML fragments for the list and detail views.
//!
//! Every user-supplied text field goes through [`escape_html`] and every
//! attribute value through [`escape_attr`]. The rendered markdown body is the
//! only content interpolated as-is.
use chrono::{DateTime, Datelike, FixedOffset, Utc};

use crate::config::Site;
use crate::escape::{escape_attr, escape_html};
use crate::markdown;
use crate::model::{iso_timestamp, Statement, SyncMetadata};
use crate::route::RouteCodec;

/// A fragment plus whether it represents the requested content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub ok: bool,
}

impl Rendered {
    fn ok(html: String) -> Self {
        Self { html, ok: true }
    }

    fn failed(html: String) -> Self {
        Self { html, ok: false }
    }
}

/// Formats statements for readers in one time zone, linking through one route codec.
#[derive(Debug, Clone)]
pub struct Presenter {
    offset: FixedOffset,
    routes: RouteCodec,
}

impl Presenter {
    pub fn new(offset: FixedOffset, routes: RouteCodec) -> Self {
        Self { offset, routes }
    }

    pub fn from_config(site: &Site) -> Self {
        Self::new(site.utc_offset(), RouteCodec::from_config(site))
    }

    pub fn routes(&self) -> &RouteCodec {
        &self.routes
    }

    /// `2026년 1월 12일`, in the presenter's offset.
    pub fn format_date(&self, date: DateTime<Utc>) -> String {
        let local = date.with_timezone(&self.offset);
        format!("{}년 {}월 {}일", local.year(), local.month(), local.day())
    }

    pub fn card(&self, statement: &Statement) -> String {
        let slug = escape_attr(statement.slug());
        let title = escape_html(statement.title());
        let date = self.format_date(statement.date());
        let href = escape_attr(&self.routes.encode(Some(statement.slug())));
        format!(
            concat!(
                "<article class=\"card statement-card\" data-statement-slug=\"{slug}\" aria-labelledby=\"statement-title-{slug}\">",
                "<header class=\"statement-header\">",
                "<h3 class=\"statement-title\" id=\"statement-title-{slug}\">",
                "<a href=\"{href}\" class=\"statement-link\" aria-label=\"{title_attr} - 상세 보기\">{title}</a>",
                "</h3>",
                "<time class=\"statement-date\" datetime=\"{iso}\" aria-label=\"성명 날짜: {date}\">{date}</time>",
                "</header>",
                "<div class=\"statement-summary\" aria-label=\"성명 요약\"><p>{summary}</p></div>",
                "</article>"
            ),
            slug = slug,
            href = href,
            title_attr = escape_attr(statement.title()),
            title = title,
            iso = iso_timestamp(statement.date()),
            date = date,
            summary = escape_html(statement.summary()),
        )
    }

    /// Cards in the given order, or the empty notice when there are none.
    pub fn list(&self, statements: &[Statement]) -> String {
        if statements.is_empty() {
            return self.empty_notice();
        }
        statements.iter().map(|s| self.card(s)).collect()
    }

    pub fn detail(&self, statement: &Statement) -> String {
        let slug = escape_attr(statement.slug());
        let date = self.format_date(statement.date());

        let category = statement
            .category()
            .map(|c| {
                format!(
                    "<span class=\"statement-category\" aria-label=\"카테고리: {}\">{}</span>",
                    escape_attr(c),
                    escape_html(c)
                )
            })
            .unwrap_or_default();

        let summary = Some(statement.summary())
            .filter(|s| !s.is_empty())
            .map(|s| {
                format!(
                    "<p class=\"statement-detail-summary\" aria-label=\"성명 요약\">{}</p>",
                    escape_html(s)
                )
            })
            .unwrap_or_default();

        let image = statement
            .image()
            .map(|src| {
                let alt = escape_attr(&format!("{} 성명 이미지", statement.title()));
                format!(
                    "<div class=\"statement-image\" role=\"img\" aria-label=\"{alt}\"><img src=\"{}\" alt=\"{alt}\" loading=\"lazy\"></div>",
                    escape_attr(src)
                )
            })
            .unwrap_or_default();

        format!(
            concat!(
                "<article class=\"card statement-detail\" data-statement-slug=\"{slug}\" aria-labelledby=\"detail-title-{slug}\">",
                "<header class=\"statement-detail-header\">",
                "<div class=\"statement-detail-meta\" aria-label=\"성명 메타 정보\">",
                "{category}",
                "<time class=\"statement-detail-date\" datetime=\"{iso}\" aria-label=\"성명 날짜: {date}\">{date}</time>",
                "</div>",
                "<h1 class=\"statement-detail-title\" id=\"detail-title-{slug}\">{title}</h1>",
                "{summary}",
                "</header>",
                "{image}",
                "<div class=\"statement-detail-body\" aria-label=\"성명 본문\">{body}</div>",
                "{attachments}",
                "<footer class=\"statement-detail-footer\" aria-label=\"성명 상세 페이지 푸터\">",
                "{back}",
                "</footer>",
                "</article>"
            ),
            slug = slug,
            category = category,
            iso = iso_timestamp(statement.date()),
            date = date,
            title = escape_html(statement.title()),
            summary = summary,
            image = image,
            body = markdown::render_body(Some(statement.body())),
            attachments = attachments(statement.attachments()),
            back = self.back_link(),
        )
    }

    pub fn empty_notice(&self) -> String {
        concat!(
            "<div class=\"card content\" role=\"status\" aria-live=\"polite\" aria-label=\"성명 목록이 비어있음\">",
            "<p>아직 등록된 성명이 없습니다.</p>",
            "<p class=\"small\">곧 새로운 성명을 공유할 예정입니다.</p>",
            "</div>"
        )
        .to_string()
    }

    pub fn loading_notice(&self) -> String {
        concat!(
            "<div class=\"card content\" role=\"status\" aria-live=\"polite\" aria-label=\"성명 목록 로딩 중\">",
            "<p>성명 목록을 불러오는 중...</p>",
            "</div>"
        )
        .to_string()
    }

    /// List failure notice, optionally naming when data was last known good.
    pub fn error_notice(&self, message: Option<&str>, last_updated: Option<DateTime<Utc>>) -> String {
        let message = non_blank(message)
            .map(|m| format!("<p class=\"small\">{}</p>", escape_html(m)))
            .unwrap_or_default();
        let last_updated = last_updated
            .map(|d| format!("<p class=\"small\">마지막 업데이트: {}</p>", self.format_date(d)))
            .unwrap_or_default();
        format!(
            concat!(
                "<div class=\"card content\" role=\"alert\" aria-live=\"assertive\" aria-label=\"오류 발생\">",
                "<p>성명 목록을 불러오는 중 오류가 발생했습니다.</p>",
                "{}{}",
                "<p class=\"small\">잠시 후 다시 시도해주세요.</p>",
                "</div>"
            ),
            message, last_updated
        )
    }

    pub fn detail_error_notice(&self, message: Option<&str>) -> String {
        let message = non_blank(message)
            .map(|m| format!("<p class=\"small\">{}</p>", escape_html(m)))
            .unwrap_or_default();
        format!(
            concat!(
                "<div class=\"card content\" role=\"alert\" aria-live=\"assertive\" aria-label=\"오류 발생\">",
                "<p>성명 상세 내용을 불러오는 중 오류가 발생했습니다.</p>",
                "{}{}",
                "</div>"
            ),
            message,
            self.back_link()
        )
    }

    pub fn not_found_notice(&self) -> String {
        format!(
            "<div class=\"card content\"><p>성명을 찾을 수 없습니다.</p>{}</div>",
            self.back_link()
        )
    }

    pub fn not_available_notice(&self) -> String {
        format!(
            "<div class=\"card content\"><p>이 성명은 공개되지 않았습니다.</p>{}</div>",
            self.back_link()
        )
    }

    /// Detail view for a resolved statement, if any.
    pub fn render_detail(&self, statement: Option<&Statement>) -> Rendered {
        match statement {
            None => Rendered::failed(self.not_found_notice()),
            Some(s) if !s.published() => Rendered::failed(self.not_available_notice()),
            Some(s) => Rendered::ok(self.detail(s)),
        }
    }

    /// List view. An empty collection is only a failure when the last sync
    /// degraded and said why.
    pub fn render_collection(&self, statements: &[Statement], metadata: Option<&SyncMetadata>) -> Rendered {
        if !statements.is_empty() {
            return Rendered::ok(self.list(statements));
        }
        match metadata.filter(|m| m.is_degraded()) {
            Some(meta) => Rendered::failed(
                self.error_notice(meta.error_message.as_deref(), meta.last_updated),
            ),
            None => Rendered::ok(self.empty_notice()),
        }
    }

    fn back_link(&self) -> String {
        format!(
            "<a href=\"{}\" class=\"btn\" aria-label=\"성명 목록으로 돌아가기\">목록으로 돌아가기</a>",
            escape_attr(self.routes.list_url())
        )
    }
}

fn attachments(urls: &[String]) -> String {
    if urls.is_empty() {
        return String::new();
    }
    let items: String = urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            format!(
                "<li><a href=\"{}\">첨부파일 {}</a></li>",
                escape_attr(url),
                i + 1
            )
        })
        .collect();
    format!(
        "<ul class=\"statement-attachments\" aria-label=\"첨부파일\">{}</ul>",
        items
    )
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|m| !m.trim().is_empty())
}
