use std::fs;
use std::sync::Arc;

use clap::{Arg, Command};
use docsync::ai::{
    ChatCompletionProvider, LocatorMode, MockLocator, MockTranslator, SectionLocator, TranslateMode,
    Translator,
};
use docsync::config::SyncConfig;
use docsync::run::{DocumentInput, DocumentOutcome, SyncEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("docsync")
        .version("0.1.0")
        .about("Section-level synchronization of translated Markdown documents")
        .arg(
            Arg::new("old")
                .help("Source document before the change")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("new")
                .help("Source document after the change")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("target")
                .help("Current translated document")
                .required(true)
                .index(3),
        )
        .arg(
            Arg::new("patch")
                .help("Unified diff between the old and new source")
                .required(true)
                .index(4),
        )
        .arg(
            Arg::new("doc-path")
                .long("doc-path")
                .help("Repository-relative document path used for special/skip decisions (default: the target file name)"),
        )
        .arg(
            Arg::new("source-lang")
                .long("source")
                .short('s')
                .help("Source language name (default: English)")
                .default_value("English"),
        )
        .arg(
            Arg::new("target-lang")
                .long("target")
                .short('t')
                .help("Target language name (default: Chinese)")
                .default_value("Chinese"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use mock collaborators instead of the chat-completion API")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .short('r')
                .help("Print the JSON run report to stderr")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Show per-section matching decisions")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    let old_file = matches.get_one::<String>("old").unwrap();
    let new_file = matches.get_one::<String>("new").unwrap();
    let target_file = matches.get_one::<String>("target").unwrap();
    let patch_file = matches.get_one::<String>("patch").unwrap();
    let doc_path = matches
        .get_one::<String>("doc-path")
        .cloned()
        .unwrap_or_else(|| {
            target_file
                .rsplit('/')
                .next()
                .unwrap_or(target_file)
                .to_string()
        });
    let source_lang = matches.get_one::<String>("source-lang").unwrap();
    let target_lang = matches.get_one::<String>("target-lang").unwrap();

    let document = DocumentInput {
        path: doc_path,
        old_source: fs::read_to_string(old_file)?,
        new_source: fs::read_to_string(new_file)?,
        target: fs::read_to_string(target_file)?,
        patch: fs::read_to_string(patch_file)?,
    };

    let (locator, translator): (Arc<dyn SectionLocator>, Arc<dyn Translator>) =
        if matches.get_flag("mock") {
            (
                Arc::new(MockLocator::new(LocatorMode::FirstCandidate(0.9))),
                Arc::new(MockTranslator::new(TranslateMode::Suffix)),
            )
        } else {
            if std::env::var("DOCSYNC_API_KEY").is_err() {
                eprintln!("❌ DOCSYNC_API_KEY environment variable not set");
                eprintln!("   Set it with: export DOCSYNC_API_KEY=your_api_key");
                eprintln!("   Or use --mock to run without the API");
                return Err("Missing API key".into());
            }
            let provider = Arc::new(ChatCompletionProvider::from_env()?);
            (provider.clone(), provider)
        };

    let engine = SyncEngine::new(
        Arc::new(SyncConfig::default()),
        locator,
        translator,
        source_lang.clone(),
        target_lang.clone(),
    );

    let report = engine.sync_document(&document).await;

    if matches.get_flag("report") {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }

    match &report.outcome {
        DocumentOutcome::Updated => {
            if let Some(new_target) = &report.new_target {
                print!("{}", new_target);
            }
            Ok(())
        }
        DocumentOutcome::Unchanged => {
            eprintln!("✅ Target already in sync, nothing to apply");
            Ok(())
        }
        DocumentOutcome::Skipped => {
            eprintln!("⏭️  Document is on the skip list");
            Ok(())
        }
        DocumentOutcome::SourceTooLarge => {
            eprintln!("⚠️  Changed content exceeds the source size gate; review manually");
            Ok(())
        }
        DocumentOutcome::Failed { reason } => {
            eprintln!("❌ Synchronization failed: {}", reason);
            Err(reason.clone().into())
        }
    }
}
