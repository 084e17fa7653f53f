//! End-to-end pipeline tests
//!
//! Exercise the full parse → localize → match → translate → merge pipeline
//! through [`SyncEngine`] with mock collaborators. Unit tests for each stage
//! live with their modules; these cover the stages composed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ai::{LocatorMode, MockLocator, MockTranslator, TranslateMode};
use crate::config::SyncConfig;
use crate::localize::ChangeKind;
use crate::matcher::MatchMethod;
use crate::run::{DocumentInput, DocumentOutcome, SyncEngine};

fn engine_with(
    config: SyncConfig,
    locator: LocatorMode,
    translator: TranslateMode,
) -> SyncEngine {
    SyncEngine::new(
        Arc::new(config),
        Arc::new(MockLocator::new(locator)),
        Arc::new(MockTranslator::new(translator)),
        "English",
        "Chinese",
    )
}

fn doc(path: &str, old: &str, new: &str, target: &str, patch: &str) -> DocumentInput {
    DocumentInput {
        path: path.to_string(),
        old_source: old.to_string(),
        new_source: new.to_string(),
        target: target.to_string(),
        patch: patch.to_string(),
    }
}

// ========== Mixed-Edit Pipeline Tests ==========

#[tokio::test]
async fn test_modify_add_and_remove_in_one_document() {
    let old = "# Guide\n\nIntro.\n\n## Setup\n\nRun `make`.\n\n## Usage\n\nUse it.\n\n\
               ## Removed\n\nGone soon.\n";
    let new = "# Guide\n\nIntro.\n\n## Setup\n\nRun `make install`.\n\n## Usage\n\nUse it.\n\n\
               ## Tips\n\nBe careful.\n";
    let target = "# Guide\n\n引言。\n\n## Setup\n\n运行 `make`。\n\n## Usage\n\n使用。\n\n\
                  ## Removed\n\n将删除。\n";
    let patch = "@@ -7,1 +7,1 @@\n-Run `make`.\n+Run `make install`.\n\
                 @@ -13,3 +13,3 @@\n-## Removed\n-\n-Gone soon.\n+## Tips\n+\n+Be careful.\n";

    let engine = engine_with(
        SyncConfig::default(),
        LocatorMode::NoMatch,
        TranslateMode::NoOp,
    );
    let report = engine.sync_document(&doc("guide.md", old, new, target, patch)).await;
    assert_eq!(report.outcome, DocumentOutcome::Updated);
    let out = report.new_target.unwrap();

    // The modified section carries the new content.
    assert!(out.contains("Run `make install`."));
    // Untouched sections survive byte for byte.
    assert!(out.contains("\n引言。\n"));
    assert!(out.contains("## Usage\n\n使用。\n"));
    // The removed section is gone, heading and body.
    assert!(!out.contains("Removed"));
    assert!(!out.contains("将删除"));
    // The added section lands after its preceding sibling's counterpart.
    let pos_usage = out.find("## Usage").unwrap();
    let pos_tips = out.find("## Tips").unwrap();
    assert!(pos_usage < pos_tips);
    assert!(out.contains("Be careful."));

    assert_eq!(report.sections.len(), 3);
    let by_kind = |kind: ChangeKind| report.sections.iter().find(|s| s.kind == kind).unwrap();
    assert_eq!(by_kind(ChangeKind::ContentModified).method, MatchMethod::Direct);
    assert_eq!(by_kind(ChangeKind::SectionRemoved).method, MatchMethod::Direct);
    assert_eq!(by_kind(ChangeKind::SectionAdded).method, MatchMethod::None);
}

#[tokio::test]
async fn test_code_fence_content_is_not_mistaken_for_structure() {
    // The fenced block contains a line that looks like a heading; it must
    // neither create a section nor be disturbed by an edit elsewhere.
    let old = "# Doc\n\n## Code\n\n```\n# not a heading\nline\n```\n\n## Prose\n\nold text\n";
    let new = "# Doc\n\n## Code\n\n```\n# not a heading\nline\n```\n\n## Prose\n\nnew text\n";
    let target = "# Doc\n\n## Code\n\n```\n# not a heading\nline\n```\n\n## Prose\n\n旧文\n";
    let patch = "@@ -12,1 +12,1 @@\n-old text\n+new text\n";

    let engine = engine_with(
        SyncConfig::default(),
        LocatorMode::NoMatch,
        TranslateMode::NoOp,
    );
    let report = engine.sync_document(&doc("doc.md", old, new, target, patch)).await;
    assert_eq!(report.outcome, DocumentOutcome::Updated);
    assert_eq!(report.sections.len(), 1);
    assert_eq!(report.sections[0].source_path, vec!["Doc".to_string(), "Prose".to_string()]);
    let out = report.new_target.unwrap();
    assert!(out.contains("```\n# not a heading\nline\n```\n"));
    assert!(out.contains("new text"));
}

// ========== Matching Layer Tests ==========

#[tokio::test]
async fn test_system_identifier_match_survives_translated_ancestors() {
    let old = "# Variables\n\n## `tidb_mem_quota`\n\nOld description.\n";
    let new = "# Variables\n\n## `tidb_mem_quota`\n\nNew description.\n";
    let target = "# 系统变量\n\n## `tidb_mem_quota`\n\n描述。\n";
    let patch = "@@ -5,1 +5,1 @@\n-Old description.\n+New description.\n";

    let engine = engine_with(
        SyncConfig::default(),
        LocatorMode::NoMatch,
        TranslateMode::NoOp,
    );
    let report = engine.sync_document(&doc("vars.md", old, new, target, patch)).await;
    assert_eq!(report.outcome, DocumentOutcome::Updated);
    assert_eq!(report.sections[0].method, MatchMethod::SystemIdentifier);
    let out = report.new_target.unwrap();
    // Body replaced, identifier heading untouched.
    assert!(out.contains("## `tidb_mem_quota`\n"));
    assert!(out.contains("New description."));
    assert!(out.contains("# 系统变量\n"));
}

#[tokio::test]
async fn test_fuzzy_rename_accepted_and_title_rewritten() {
    let old = "# Reference\n\n## Connection Limits\n\nDetails.\n";
    let new = "# Reference\n\n## Connection Ceilings\n\nDetails.\n";
    let target = "# 参考\n\n## 连接限制\n\n详情。\n";
    let patch = "@@ -3,1 +3,1 @@\n-## Connection Limits\n+## Connection Ceilings\n";

    let mut map = HashMap::new();
    map.insert(
        "Reference > Connection Ceilings".to_string(),
        (vec!["参考".to_string(), "连接限制".to_string()], 0.78),
    );
    let mut translations = HashMap::new();
    translations.insert(
        ("Connection Ceilings".to_string(), "Chinese".to_string()),
        "连接上限".to_string(),
    );
    let engine = engine_with(
        SyncConfig::default(),
        LocatorMode::Mappings(map),
        TranslateMode::Mappings(translations),
    );
    let report = engine.sync_document(&doc("ref.md", old, new, target, patch)).await;
    assert_eq!(report.outcome, DocumentOutcome::Updated);
    let fuzzy = report
        .sections
        .iter()
        .find(|s| s.method == MatchMethod::AiFuzzy)
        .unwrap();
    assert!((fuzzy.confidence - 0.78).abs() < 1e-6);
    let out = report.new_target.unwrap();
    assert!(out.contains("## 连接上限\n"));
    assert!(!out.contains("## 连接限制\n"));
}

#[tokio::test]
async fn test_fuzzy_match_below_threshold_leaves_target_untouched() {
    let old = "# Reference\n\n## Limits\n\nOld details.\n";
    let new = "# Reference\n\n## Limits\n\nNew details.\n";
    let target = "# 参考\n\n## 限制\n\n详情。\n";
    let patch = "@@ -5,1 +5,1 @@\n-Old details.\n+New details.\n";

    let mut map = HashMap::new();
    map.insert(
        "Reference > Limits".to_string(),
        (vec!["参考".to_string(), "限制".to_string()], 0.4),
    );
    let engine = engine_with(
        SyncConfig::default(),
        LocatorMode::Mappings(map),
        TranslateMode::NoOp,
    );
    let report = engine.sync_document(&doc("ref.md", old, new, target, patch)).await;
    // The only change could not be matched confidently; nothing is applied.
    assert_eq!(report.outcome, DocumentOutcome::Unchanged);
    assert!(report.new_target.is_none());
    assert_eq!(report.sections[0].method, MatchMethod::None);
    assert!(!report.sections[0].applied);
}

// ========== Budget and Truncation Tests ==========

#[tokio::test]
async fn test_oversized_section_truncated_before_ai_call() {
    let big = "content line\n".repeat(160);
    let old = "# Overview\n\nsmall\n";
    let new = format!("# Overview\n\n{}", big);
    let target = "# 概览\n\n内容。\n";
    let patch = "@@ -3,1 +3,1 @@\n-small\n+changed\n";

    let config = SyncConfig {
        max_batch_bytes: 256,
        ..SyncConfig::default()
    };
    let engine = engine_with(config, LocatorMode::FirstCandidate(0.9), TranslateMode::NoOp);
    let report = engine.sync_document(&doc("overview.md", old, &new, target, patch)).await;
    assert_eq!(report.outcome, DocumentOutcome::Updated);
    assert_eq!(report.sections.len(), 1);
    assert!(report.sections[0].truncated);
    assert_eq!(report.sections[0].method, MatchMethod::AiFuzzy);
    // The applied edit still carries the full body, not the truncated window.
    let out = report.new_target.unwrap();
    assert!(out.contains(&big));
}

// ========== Run Isolation Tests ==========

#[tokio::test]
async fn test_one_failing_document_does_not_block_others() {
    // Document 1 is a pure removal, which needs no translation at all.
    let removal = doc(
        "removal.md",
        "# A\n\n## B\n\nb\n",
        "# A\n\n",
        "# A\n\n## B\n\n乙\n",
        "@@ -3,3 +2,0 @@\n-## B\n-\n-b\n",
    );
    // Document 2 hits the whole-document fallback, whose translation fails.
    let broken = doc(
        "broken.md",
        "# C\n\nbody\n",
        "# C\n\nbody\n",
        "# 丙\n\n内容\n",
        "@@ -100,1 +100,1 @@\n-x\n+y\n",
    );
    let engine = engine_with(
        SyncConfig::default(),
        LocatorMode::NoMatch,
        TranslateMode::Error("provider down".to_string()),
    );
    let report = engine.sync_all(vec![removal, broken]).await;
    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.updated(), 1);
    assert_eq!(report.failed(), 1);

    let removal_report = report.documents.iter().find(|d| d.path == "removal.md").unwrap();
    assert_eq!(removal_report.outcome, DocumentOutcome::Updated);
    assert!(!removal_report.new_target.as_ref().unwrap().contains("## B"));

    let broken_report = report.documents.iter().find(|d| d.path == "broken.md").unwrap();
    assert!(matches!(broken_report.outcome, DocumentOutcome::Failed { .. }));
    assert!(broken_report.new_target.is_none());
}

#[tokio::test]
async fn test_report_serializes_for_downstream_tooling() {
    let engine = engine_with(
        SyncConfig::default(),
        LocatorMode::NoMatch,
        TranslateMode::NoOp,
    );
    let report = engine
        .sync_document(&doc(
            "guide.md",
            "# A\n\nold\n",
            "# A\n\nnew\n",
            "# A\n\n旧\n",
            "@@ -3,1 +3,1 @@\n-old\n+new\n",
        ))
        .await;
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["path"], "guide.md");
    assert_eq!(json["outcome"]["outcome"], "updated");
    assert_eq!(json["sections"][0]["method"], "direct");
    assert_eq!(json["sections"][0]["kind"], "content-modified");
    // The rewritten text itself never leaks into the serialized report.
    assert!(json.get("new_target").is_none());
}
