//! End-to-end pipeline tests against a scripted chat backend.
//!
//! Slide decks are built in memory with `zip::ZipWriter`; no network access
//! and no pdfium library are needed.

use async_trait::async_trait;
use deck_coach::pipeline::pptx;
use deck_coach::present::{NO_FACT_CHECK, NO_QUESTIONS, NO_SCRIPT, NO_STRENGTHS, NO_WEAKNESSES};
use deck_coach::prompts::{ANALYSIS_PREAMBLE, PROJECT_HEADER};
use deck_coach::{
    review, AnalysisClient, AnalysisConfig, AnalysisError, ChatBackend, ChatReply, ChatRequest,
    DeckCoachError, ExtractError, ReviewProgressCallback, Stage, Submission, Tone,
    UploadedDocument,
};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zip::write::FileOptions;
use zip::ZipWriter;

// ── Scripted backend ─────────────────────────────────────────────────────────

/// Answers JSON-mode requests with `analysis`, everything else with `caption`
/// (`None` makes caption requests fail).
struct ScriptedBackend {
    analysis: Result<String, AnalysisError>,
    caption: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    fn replying(analysis: &str) -> Arc<Self> {
        Arc::new(Self {
            analysis: Ok(analysis.to_string()),
            caption: Some("a bar chart".to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn analysis_requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.json_mode)
            .cloned()
            .collect()
    }

    fn caption_requests(&self) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| !r.json_mode).count()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        let content = if request.json_mode {
            self.analysis.clone()?
        } else {
            self.caption.clone().ok_or(AnalysisError::RateLimited {
                backend: "scripted".into(),
            })?
        };
        Ok(ChatReply {
            content,
            ..Default::default()
        })
    }
}

fn setup(backend: Arc<ScriptedBackend>) -> (AnalysisClient, AnalysisConfig) {
    let config = AnalysisConfig::builder()
        .backend(backend as Arc<dyn ChatBackend>)
        .build()
        .unwrap();
    let client = AnalysisClient::from_config(&config).unwrap();
    (client, config)
}

const SCENARIO_REPLY: &str = r#"{"strengths":["clear goal"],"weaknesses":[],"fact_check":[],"storytelling_script":{"introduction":"...","main_part":"...","conclusion":"..."},"tricky_questions":["Why a robot?"]}"#;

// ── PPTX fixtures ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Slide {
    texts: Vec<&'static str>,
    images: Vec<Vec<u8>>,
}

fn png_of_len(len: usize) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.resize(len, 0);
    bytes
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Build a deck whose slides appear in `order` (1-based slide numbers).
fn build_pptx_ordered(slides: &[Slide], order: &[usize]) -> Vec<u8> {
    const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
    const REL_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    const REL_IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default();
    let mut put = |name: &str, bytes: &[u8]| {
        zip.start_file(name, opts).unwrap();
        zip.write_all(bytes).unwrap();
    };

    put(
        "[Content_Types].xml",
        br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
    );

    let ids: String = order
        .iter()
        .enumerate()
        .map(|(i, n)| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, n + 10))
        .collect();
    put(
        "ppt/presentation.xml",
        format!(r#"<?xml version="1.0"?><p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#)
            .as_bytes(),
    );

    let mut rels = format!(r#"<?xml version="1.0"?><Relationships xmlns="{REL_NS}">"#);
    rels.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#);
    for n in 1..=slides.len() {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{REL_SLIDE}" Target="slides/slide{n}.xml"/>"#,
            n + 10
        ));
    }
    rels.push_str("</Relationships>");
    put("ppt/_rels/presentation.xml.rels", rels.as_bytes());

    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        let mut shapes = String::new();
        for text in &slide.texts {
            shapes.push_str(&format!(
                r#"<p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                escape(text)
            ));
        }
        let mut slide_rels = format!(r#"<?xml version="1.0"?><Relationships xmlns="{REL_NS}">"#);
        for (j, image) in slide.images.iter().enumerate() {
            let media = format!("ppt/media/image{n}_{j}.png");
            shapes.push_str(&format!(
                r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="Picture"/></p:nvPicPr><p:blipFill><a:blip r:embed="rIdImg{j}"/></p:blipFill></p:pic>"#,
                j + 4
            ));
            slide_rels.push_str(&format!(
                r#"<Relationship Id="rIdImg{j}" Type="{REL_IMAGE}" Target="../media/image{n}_{j}.png"/>"#
            ));
            put(&media, image);
        }
        slide_rels.push_str("</Relationships>");

        put(
            &format!("ppt/slides/slide{n}.xml"),
            format!(r#"<?xml version="1.0"?><p:sld {NS}><p:cSld><p:spTree>{shapes}</p:spTree></p:cSld></p:sld>"#)
                .as_bytes(),
        );
        put(
            &format!("ppt/slides/_rels/slide{n}.xml.rels"),
            slide_rels.as_bytes(),
        );
    }

    zip.finish().unwrap().into_inner()
}

fn build_pptx(slides: &[Slide]) -> Vec<u8> {
    let order: Vec<usize> = (1..=slides.len()).collect();
    build_pptx_ordered(slides, &order)
}

/// Copy of `deck` without the named archive entries.
fn drop_parts(deck: &[u8], names: &[&str]) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(deck)).unwrap();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        if names.contains(&file.name()) {
            continue;
        }
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut bytes).unwrap();
        zip.start_file(file.name(), FileOptions::default()).unwrap();
        zip.write_all(&bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

// ── End-to-end ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn notes_only_formal_scenario() {
    let backend = ScriptedBackend::replying(SCENARIO_REPLY);
    let (client, config) = setup(Arc::clone(&backend));

    let submission =
        Submission::new(None, "Our robot picks up objects.").with_tone(Tone::Formal);
    let output = review(&submission, &client, &config).await.unwrap();

    // One analysis call, no captions, whole prompt in one user turn.
    let sent = backend.analysis_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(backend.caption_requests(), 0);
    let prompt = &sent[0].messages[0].text;
    assert_eq!(prompt, &output.prompt);
    assert!(prompt.contains("Our robot picks up objects."));
    assert!(prompt.starts_with(ANALYSIS_PREAMBLE));
    assert!(prompt.contains(&format!("{PROJECT_HEADER}\nOur robot picks up objects.")));
    assert!(prompt.contains("formal TED style"));

    let md = output.report.to_markdown();
    assert_eq!(md.matches("- ✅ ").count(), 1);
    assert!(md.contains("- ✅ clear goal"));
    assert!(md.contains(NO_WEAKNESSES));
    assert!(md.contains(NO_FACT_CHECK));
    assert!(!md.contains(NO_SCRIPT));
    for part in ["### Introduction", "### Main part", "### Conclusion"] {
        assert!(md.contains(part), "missing {part}");
    }
    assert!(md.contains("## Speech script (Formal)"));
    assert!(md.contains("1. Why a robot?"));
    assert!(!md.contains("2. "));
    assert!(output.warnings.is_empty());
    assert_eq!(output.stats.tone, Tone::Formal);
}

#[tokio::test]
async fn deck_text_and_captions_reach_the_prompt() {
    let deck = build_pptx(&[
        Slide {
            texts: vec!["Octopus", "Deep-sea R&D"],
            images: vec![png_of_len(2_000)],
        },
        Slide {
            texts: vec!["Results"],
            images: vec![png_of_len(3_000)],
        },
    ]);
    let backend = ScriptedBackend::replying(SCENARIO_REPLY);
    let (client, config) = setup(Arc::clone(&backend));

    let submission = Submission::new(
        Some(UploadedDocument::from_bytes("talk.PPTX", deck)),
        "My notes",
    );
    let output = review(&submission, &client, &config).await.unwrap();

    assert_eq!(backend.caption_requests(), 2);
    assert_eq!(output.captions, "Image #1: a bar chart\nImage #2: a bar chart");
    assert!(output.prompt.contains(
        "Image #1: a bar chart\nImage #2: a bar chart\n\nOctopus\nDeep-sea R&D\nResults\n\nMy notes"
    ));
    assert_eq!(output.stats.extraction.images_found, 2);
    assert_eq!(output.stats.extraction.images_captioned, 2);
    assert_eq!(output.stats.tone, Tone::Inspiring);
}

#[tokio::test]
async fn failed_captions_become_placeholders() {
    let deck = build_pptx(&[Slide {
        texts: vec!["Only slide"],
        images: vec![png_of_len(100), png_of_len(100)],
    }]);
    let backend = Arc::new(ScriptedBackend {
        analysis: Ok(SCENARIO_REPLY.to_string()),
        caption: None,
        requests: Mutex::new(Vec::new()),
    });
    let (client, config) = setup(Arc::clone(&backend));

    let submission = Submission::new(Some(UploadedDocument::from_bytes("d.pptx", deck)), "");
    let output = review(&submission, &client, &config).await.unwrap();
    assert_eq!(
        output.captions,
        "Image #1: processing failed\nImage #2: processing failed"
    );
    assert!(output.report.to_markdown().contains("clear goal"));
}

#[tokio::test]
async fn captions_can_be_disabled() {
    let deck = build_pptx(&[Slide {
        texts: vec!["Text"],
        images: vec![png_of_len(100)],
    }]);
    let backend = ScriptedBackend::replying(SCENARIO_REPLY);
    let config = AnalysisConfig::builder()
        .backend(Arc::clone(&backend) as Arc<dyn ChatBackend>)
        .caption_images(false)
        .build()
        .unwrap();
    let client = AnalysisClient::from_config(&config).unwrap();

    let submission = Submission::new(Some(UploadedDocument::from_bytes("d.pptx", deck)), "");
    let output = review(&submission, &client, &config).await.unwrap();
    assert_eq!(backend.caption_requests(), 0);
    assert!(output.captions.is_empty());
    assert!(!output.prompt.contains("Image #1"));
}

#[tokio::test]
async fn garbage_upload_degrades_to_notes() {
    let backend = ScriptedBackend::replying(SCENARIO_REPLY);
    let (client, config) = setup(Arc::clone(&backend));

    let submission = Submission::new(
        Some(UploadedDocument::from_bytes("deck.pptx", b"not a zip".to_vec())),
        "Fallback notes",
    );
    let output = review(&submission, &client, &config).await.unwrap();
    assert_eq!(output.warnings.len(), 1);
    assert!(matches!(output.warnings[0], ExtractError::Archive(_)));
    assert!(output.prompt.contains("Fallback notes"));
}

#[tokio::test]
async fn unsupported_upload_without_notes_is_nothing_to_analyze() {
    let backend = ScriptedBackend::replying(SCENARIO_REPLY);
    let (client, config) = setup(Arc::clone(&backend));

    let submission = Submission::new(
        Some(UploadedDocument::from_bytes("speech.docx", b"PK".to_vec())),
        "   ",
    );
    let err = review(&submission, &client, &config).await.unwrap_err();
    assert!(matches!(err, DeckCoachError::NothingToAnalyze));
    assert!(backend.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn analysis_failure_is_an_error() {
    let backend = Arc::new(ScriptedBackend {
        analysis: Err(AnalysisError::Auth {
            backend: "scripted".into(),
            detail: "bad key".into(),
        }),
        caption: None,
        requests: Mutex::new(Vec::new()),
    });
    let (client, config) = setup(backend);

    let err = review(&Submission::new(None, "text"), &client, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckCoachError::Analysis(AnalysisError::Auth { .. })));
    assert!(err.to_string().contains("try again later"));
}

#[tokio::test]
async fn invalid_json_reply_is_a_decode_error() {
    let backend = ScriptedBackend::replying("Sorry, I can't do that.");
    let (client, config) = setup(backend);
    let err = review(&Submission::new(None, "text"), &client, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckCoachError::Analysis(AnalysisError::Decode { .. })));
}

#[tokio::test]
async fn missing_keys_render_placeholders() {
    let backend =
        ScriptedBackend::replying("```json\n{\"weaknesses\": [\"No budget: add one\"]}\n```");
    let (client, config) = setup(backend);

    let output = review(&Submission::new(None, "text"), &client, &config)
        .await
        .unwrap();
    let md = output.report.to_markdown();
    for placeholder in [NO_STRENGTHS, NO_FACT_CHECK, NO_SCRIPT, NO_QUESTIONS] {
        assert!(md.contains(placeholder), "missing {placeholder:?}");
    }
    assert!(md.contains("- ⚠️ No budget: add one"));
    assert!(!md.contains(NO_WEAKNESSES));
}

#[tokio::test]
async fn long_document_text_is_truncated_but_notes_are_not() {
    let deck = build_pptx(&[Slide {
        texts: vec!["abcdefghijklmnopqrstuvwxyz"],
        images: vec![],
    }]);
    let backend = ScriptedBackend::replying(SCENARIO_REPLY);
    let config = AnalysisConfig::builder()
        .backend(Arc::clone(&backend) as Arc<dyn ChatBackend>)
        .text_char_limit(10)
        .build()
        .unwrap();
    let client = AnalysisClient::from_config(&config).unwrap();

    let notes = "n".repeat(40);
    let submission =
        Submission::new(Some(UploadedDocument::from_bytes("d.pptx", deck)), notes.clone());
    let output = review(&submission, &client, &config).await.unwrap();
    assert!(output
        .prompt
        .contains("abcdefghij\n... (text truncated to speed up processing)\n\nnnnn"));
    assert!(output.prompt.contains(&notes));
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ReviewProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start {stage}"));
    }

    fn on_stage_complete(&self, stage: Stage, _elapsed: Duration) {
        self.events.lock().unwrap().push(format!("done {stage}"));
    }

    fn on_caption_complete(&self, index: usize, total: usize, ok: bool) {
        self.events
            .lock()
            .unwrap()
            .push(format!("caption {index}/{total} {ok}"));
    }
}

#[tokio::test]
async fn progress_reports_each_stage_in_order() {
    let deck = build_pptx(&[Slide {
        texts: vec!["t"],
        images: vec![png_of_len(100)],
    }]);
    let backend = ScriptedBackend::replying(SCENARIO_REPLY);
    let recorder = Arc::new(Recorder::default());
    let config = AnalysisConfig::builder()
        .backend(backend as Arc<dyn ChatBackend>)
        .progress_callback(Arc::clone(&recorder) as Arc<dyn ReviewProgressCallback>)
        .build()
        .unwrap();
    let client = AnalysisClient::from_config(&config).unwrap();

    let submission = Submission::new(Some(UploadedDocument::from_bytes("d.pptx", deck)), "");
    review(&submission, &client, &config).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start extraction",
            "done extraction",
            "start captioning",
            "caption 1/1 true",
            "done captioning",
            "start analysis",
            "done analysis",
        ]
    );
}

// ── Slide-deck extraction ────────────────────────────────────────────────────

#[test]
fn image_caps_are_enforced() {
    let mut slides: Vec<Slide> = Vec::new();
    // Slide 1: one image over the size cap, one just under it.
    slides.push(Slide {
        texts: vec!["big"],
        images: vec![png_of_len(500_000), png_of_len(499_999)],
    });
    for _ in 2..=8 {
        slides.push(Slide {
            texts: vec!["s"],
            images: vec![png_of_len(1_000)],
        });
    }
    let deck = build_pptx(&slides);

    let images = pptx::extract_images(&deck).unwrap();
    assert_eq!(images.len(), 3);
    assert_eq!(images[0].bytes.len(), 499_999);
    assert!(images.iter().all(|img| img.bytes.len() < 500_000));
    assert!(images.iter().all(|img| img.mime_type == "image/png"));
}

#[test]
fn only_first_six_slides_are_scanned_for_images() {
    let mut slides: Vec<Slide> = (0..6).map(|_| Slide::default()).collect();
    slides.push(Slide {
        texts: vec!["late"],
        images: vec![png_of_len(100)],
    });
    let deck = build_pptx(&slides);
    assert!(pptx::extract_images(&deck).unwrap().is_empty());
    assert_eq!(pptx::extract_text(&deck).unwrap(), "late");
}

#[test]
fn non_raster_media_is_skipped() {
    // EMF header.
    let emf = vec![0x01, 0x00, 0x00, 0x00, 0x6C, 0x00, 0x00, 0x00];
    let deck = build_pptx(&[Slide {
        texts: vec![],
        images: vec![emf, png_of_len(64)],
    }]);
    let images = pptx::extract_images(&deck).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].bytes.len(), 64);
}

#[test]
fn text_follows_presentation_slide_order() {
    let deck = build_pptx_ordered(
        &[
            Slide {
                texts: vec!["second in deck"],
                images: vec![],
            },
            Slide {
                texts: vec!["first in deck"],
                images: vec![],
            },
        ],
        &[2, 1],
    );
    assert_eq!(
        pptx::extract_text(&deck).unwrap(),
        "first in deck\nsecond in deck"
    );
}

#[test]
fn image_window_follows_presentation_slide_order() {
    let deck = build_pptx_ordered(
        &[
            Slide {
                texts: vec![],
                images: vec![png_of_len(20)],
            },
            Slide {
                texts: vec![],
                images: vec![png_of_len(10)],
            },
        ],
        &[2, 1],
    );
    let sizes: Vec<usize> = pptx::extract_images(&deck)
        .unwrap()
        .iter()
        .map(|img| img.bytes.len())
        .collect();
    assert_eq!(sizes, vec![10, 20]);
}

#[test]
fn missing_slide_part_skips_only_that_slide() {
    let deck = build_pptx(&[
        Slide {
            texts: vec!["kept one"],
            images: vec![png_of_len(30)],
        },
        Slide {
            texts: vec!["lost"],
            images: vec![png_of_len(40)],
        },
        Slide {
            texts: vec!["kept two"],
            images: vec![png_of_len(50)],
        },
    ]);
    let deck = drop_parts(&deck, &["ppt/slides/slide2.xml"]);

    assert_eq!(pptx::extract_text(&deck).unwrap(), "kept one\nkept two");
    let sizes: Vec<usize> = pptx::extract_images(&deck)
        .unwrap()
        .iter()
        .map(|img| img.bytes.len())
        .collect();
    assert_eq!(sizes, vec![30, 50]);
}

#[test]
fn missing_slide_rels_skips_only_that_slides_pictures() {
    let deck = build_pptx(&[
        Slide {
            texts: vec!["one"],
            images: vec![png_of_len(30)],
        },
        Slide {
            texts: vec!["two"],
            images: vec![png_of_len(40)],
        },
    ]);
    let deck = drop_parts(&deck, &["ppt/slides/_rels/slide1.xml.rels"]);

    assert_eq!(pptx::extract_text(&deck).unwrap(), "one\ntwo");
    let images = pptx::extract_images(&deck).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].bytes.len(), 40);
}
