use serde_json::{json, Value};
use tempfile::tempdir;

use statement_press::config::{self, Config};
use statement_press::site::{self, FRAGMENTS_FILE, INDEX_FILE, STYLE_FILE};

fn config() -> Config {
    serde_yaml::from_str(config::example()).unwrap()
}

fn payload() -> Value {
    json!({
        "_metadata": {
            "lastUpdated": "2026-01-15T03:00:00.000Z",
            "syncStatus": "success",
            "errorMessage": null,
            "statementsCount": 3,
            "version": "1.0"
        },
        "statements": [
            {
                "title": "오래된 성명",
                "date": "2026-01-10",
                "slug": "old",
                "body": "자세한 내용은 [보도자료](https://press.example.com/1)를 보세요."
            },
            {
                "title": "새 성명 <긴급>",
                "date": "2026-01-14T09:00:00+09:00",
                "slug": "2026-01-new",
                "summary": "요약 & 설명",
                "body": "<p>이미 HTML인 본문 <a href=\"https://other.example.net/x\">외부</a></p>"
            },
            { "title": "비공개", "date": "2026-01-12", "slug": "draft", "published": false },
            { "summary": "제목 없음" }
        ]
    })
}

#[test]
fn build_site_assembles_all_fragments() {
    let bundle = site::build_site(payload(), &config()).unwrap();
    let f = &bundle.fragments;

    assert!(f.list_ok);
    let new_pos = f.list.find("data-statement-slug=\"2026-01-new\"").unwrap();
    let old_pos = f.list.find("data-statement-slug=\"old\"").unwrap();
    assert!(new_pos < old_pos, "newest first");
    assert!(f.list.contains("새 성명 &lt;긴급&gt;"));
    assert!(f.list.contains("요약 &amp; 설명"));
    assert!(!f.list.contains("draft"));

    assert_eq!(f.details.len(), 2);
    let new = &f.details["2026-01-new"];
    assert!(new.ok);
    assert_eq!(new.url, "./poli-statements.html?statement=2026-01-new");
    assert_eq!(new.title, "성명 상세 - 2026-01-new");
    // Raw HTML bodies still get their external links marked.
    assert!(new.html.contains(
        "<a href=\"https://other.example.net/x\" target=\"_blank\" rel=\"noopener noreferrer\" aria-label=\"외부, 새 창에서 열림\">외부</a>"
    ));

    let old = &f.details["old"];
    assert!(old.html.contains(
        "<a href=\"https://press.example.com/1\" target=\"_blank\" rel=\"noopener noreferrer\">보도자료</a>"
    ));
    assert!(old.html.contains("2026년 1월 10일"));

    assert!(f.not_found.contains("성명을 찾을 수 없습니다."));
    assert!(f.empty.contains("아직 등록된 성명이 없습니다."));
    assert!(f.loading.contains("불러오는 중"));
    assert!(f.error.contains("마지막 업데이트: 2026년 1월 15일"));

    assert!(bundle.index_html.contains("<title>성명공유</title>"));
    assert!(bundle.index_html.contains(&f.list));
}

#[test]
fn failed_sync_with_no_statements_renders_error_list() {
    let payload = json!({
        "_metadata": {
            "lastUpdated": "2026-01-15T03:00:00.000Z",
            "syncStatus": "error",
            "errorMessage": "notion error 401 Unauthorized",
            "statementsCount": 0,
            "version": "1.0"
        },
        "statements": []
    });
    let bundle = site::build_site(payload, &config()).unwrap();
    assert!(!bundle.fragments.list_ok);
    assert!(bundle.fragments.list.contains("notion error 401 Unauthorized"));
    assert!(bundle.fragments.details.is_empty());
}

#[test]
fn empty_collection_by_design_is_not_an_error() {
    let bundle = site::build_site(json!([]), &config()).unwrap();
    assert!(bundle.fragments.list_ok);
    assert_eq!(bundle.fragments.list, bundle.fragments.empty);
}

#[tokio::test]
async fn write_site_emits_fragments_index_and_style() {
    let td = tempdir().unwrap();
    let out = td.path().join("site");

    let bundle = site::build_site(payload(), &config()).unwrap();
    let written = site::write_site(&bundle, &out).await.unwrap();
    assert_eq!(
        written,
        vec![out.join(FRAGMENTS_FILE), out.join(INDEX_FILE), out.join(STYLE_FILE)]
    );

    let fragments: Value =
        serde_json::from_str(&std::fs::read_to_string(out.join(FRAGMENTS_FILE)).unwrap()).unwrap();
    for key in ["list", "listOk", "empty", "loading", "error", "notFound", "details", "metadata"] {
        assert!(fragments.get(key).is_some(), "missing {key}");
    }
    assert_eq!(fragments["details"]["old"]["state"], json!({ "slug": "old", "page": "detail" }));
    assert!(std::fs::read_to_string(out.join(STYLE_FILE)).unwrap().contains(".statement-title"));
}

#[tokio::test]
async fn missing_payload_exports_empty_site() {
    let td = tempdir().unwrap();
    let payload = site::load_payload(&td.path().join("absent.json")).await.unwrap();
    assert_eq!(payload, json!([]));

    std::fs::write(td.path().join("bad.json"), "not json").unwrap();
    assert!(site::load_payload(&td.path().join("bad.json")).await.is_err());
}
