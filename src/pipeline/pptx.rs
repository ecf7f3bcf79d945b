//! Slide-deck (PPTX) extraction.
//!
//! A `.pptx` file is a ZIP archive of OOXML parts. Slide order comes from
//! `ppt/presentation.xml` (`p:sldIdLst`) resolved through
//! `ppt/_rels/presentation.xml.rels`; when the list is missing the slide
//! relationships are ordered by their slide number instead.
//!
//! Text is every `a:t` inside an `a:r` run, one line per run. Pictures are
//! `p:pic` elements whose `a:blip r:embed` id resolves, through the slide's
//! own `_rels` part, to a file under `ppt/media/`.

use crate::error::ExtractError;
use crate::pipeline::encode::sniff_raster_mime;
use crate::pipeline::extract::ExtractedImage;
use crate::pipeline::{IMAGE_SCAN_PAGES, MAX_IMAGES, MAX_IMAGE_BYTES};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use tracing::{debug, warn};
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Extract the text of every run on every slide, joined with `\n`.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let slides = slide_order(&mut archive)?;

    let mut runs: Vec<String> = Vec::new();
    for slide_path in &slides {
        match read_part_string(&mut archive, slide_path) {
            Ok(xml) => runs.extend(slide_runs(&xml, slide_path)),
            Err(e) => warn!("Skipping slide: {}", e),
        }
    }

    debug!("PPTX: {} slides, {} text runs", slides.len(), runs.len());
    Ok(runs.join("\n"))
}

/// Extract up to [`MAX_IMAGES`] pictures from the first [`IMAGE_SCAN_PAGES`] slides.
///
/// Pictures of [`MAX_IMAGE_BYTES`] or more, and media that is not a raster
/// image, are skipped.
pub fn extract_images(bytes: &[u8]) -> Result<Vec<ExtractedImage>, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let slides = slide_order(&mut archive)?;
    let mut images = Vec::new();

    'slides: for slide_path in slides.iter().take(IMAGE_SCAN_PAGES) {
        let embeds = match read_part_string(&mut archive, slide_path) {
            Ok(xml) => picture_embeds(&xml),
            Err(e) => {
                warn!("Skipping slide pictures: {}", e);
                continue;
            }
        };
        if embeds.is_empty() {
            continue;
        }

        let rels_path = rels_path_for(slide_path);
        let rels = match read_part_string(&mut archive, &rels_path)
            .and_then(|xml| parse_relationships(&xml, &rels_path))
        {
            Ok(rels) => rels,
            Err(e) => {
                warn!("Skipping slide pictures: {}", e);
                continue;
            }
        };
        let targets: HashMap<String, String> = rels
            .into_iter()
            .filter(|r| !r.external)
            .map(|r| (r.id, resolve_part_path(slide_path, &r.target)))
            .collect();

        for rid in embeds {
            let Some(media_path) = targets.get(&rid) else {
                debug!("{}: picture {} has no relationship", slide_path, rid);
                continue;
            };
            if let Some(image) = read_image(&mut archive, media_path) {
                images.push(image);
                if images.len() >= MAX_IMAGES {
                    break 'slides;
                }
            }
        }
    }

    debug!("PPTX: {} images extracted", images.len());
    Ok(images)
}

fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, ExtractError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Archive(e.to_string()))
}

/// Read one media part, applying the size cap and the raster check.
fn read_image<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Option<ExtractedImage> {
    let mut file = match archive.by_name(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Media part '{}' unreadable: {}", path, e);
            return None;
        }
    };
    if file.size() >= MAX_IMAGE_BYTES as u64 {
        debug!("Skipping '{}': {} bytes", path, file.size());
        return None;
    }

    let mut bytes = Vec::with_capacity(file.size() as usize);
    if let Err(e) = file.read_to_end(&mut bytes) {
        debug!("Media part '{}' unreadable: {}", path, e);
        return None;
    }
    if bytes.len() >= MAX_IMAGE_BYTES {
        return None;
    }

    match sniff_raster_mime(&bytes) {
        Some(mime_type) => Some(ExtractedImage { bytes, mime_type }),
        None => {
            debug!("Skipping '{}': not a raster image", path);
            None
        }
    }
}

// ── Slide order ─────────────────────────────────────────────────────────────

/// Relationship entry from a `_rels/*.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

impl Relationship {
    fn is_slide(&self) -> bool {
        self.rel_type.ends_with("/slide")
    }
}

/// Ordered archive paths of every slide in the deck.
fn slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>, ExtractError> {
    let rels_xml = read_part_string(archive, PRESENTATION_RELS)?;
    let slide_rels: Vec<Relationship> = parse_relationships(&rels_xml, PRESENTATION_RELS)?
        .into_iter()
        .filter(|r| r.is_slide() && !r.external)
        .collect();

    let listed = read_part_string(archive, PRESENTATION_PART)
        .ok()
        .map(|xml| slide_id_list(&xml))
        .unwrap_or_default();

    if !listed.is_empty() {
        let by_id: HashMap<&str, &Relationship> =
            slide_rels.iter().map(|r| (r.id.as_str(), r)).collect();
        let ordered: Vec<String> = listed
            .iter()
            .filter_map(|rid| by_id.get(rid.as_str()))
            .map(|r| resolve_part_path(PRESENTATION_PART, &r.target))
            .collect();
        if !ordered.is_empty() {
            return Ok(ordered);
        }
    }

    // No usable sldIdLst: order by the number in the target name.
    let mut slides: Vec<(String, Option<usize>)> = slide_rels
        .iter()
        .map(|r| {
            (
                resolve_part_path(PRESENTATION_PART, &r.target),
                extract_slide_number(&r.target),
            )
        })
        .collect();
    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });
    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

/// The `r:id` of every `p:sldId` in `presentation.xml`, in deck order.
fn slide_id_list(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                if let Some(id) = attr_value(e, b"id", true) {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("presentation.xml: {}", e);
                break;
            }
            _ => {}
        }
    }
    ids
}

fn parse_relationships(xml: &str, part: &str) -> Result<Vec<Relationship>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                rels.push(Relationship {
                    id: attr_value(e, b"Id", false).unwrap_or_default(),
                    rel_type: attr_value(e, b"Type", false).unwrap_or_default(),
                    target: attr_value(e, b"Target", false).unwrap_or_default(),
                    external: attr_value(e, b"TargetMode", false).as_deref() == Some("External"),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Xml {
                    part: part.to_string(),
                    detail: e.to_string(),
                })
            }
            _ => {}
        }
    }
    Ok(rels)
}

// ── Slide content ───────────────────────────────────────────────────────────

/// Text of each non-empty `a:r` run in document order.
fn slide_runs(xml: &str, part: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut runs = Vec::new();
    let mut in_run = false;
    let mut in_text = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"r" => {
                    in_run = true;
                    current.clear();
                }
                b"t" if in_run => in_text = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => match e.unescape() {
                Ok(text) => current.push_str(&text),
                Err(err) => debug!("{}: bad text escape: {}", part, err),
            },
            Ok(Event::CData(ref e)) if in_text => {
                current.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"r" if in_run => {
                    in_run = false;
                    if !current.is_empty() {
                        runs.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                // Keep the runs read so far; the rest of this slide is lost.
                warn!("{}: XML error, keeping {} runs: {}", part, runs.len(), e);
                break;
            }
            _ => {}
        }
    }
    runs
}

/// Relationship ids of the `a:blip` images inside `p:pic` shapes.
fn picture_embeds(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut pic_depth = 0usize;
    let mut embeds = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"pic" => pic_depth += 1,
                    b"blip" if pic_depth > 0 => embeds.extend(attr_value(e, b"embed", true)),
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) if pic_depth > 0 => {
                if local_name(e.name().as_ref()) == b"blip" {
                    embeds.extend(attr_value(e, b"embed", true));
                }
            }
            Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"pic" => {
                pic_depth = pic_depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("picture scan stopped: {}", e);
                break;
            }
            _ => {}
        }
    }
    embeds
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Read a text part from the ZIP archive.
fn read_part_string<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<String, ExtractError> {
    let mut file = archive.by_name(path).map_err(|e| ExtractError::MissingPart {
        part: path.to_string(),
        detail: e.to_string(),
    })?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| ExtractError::MissingPart {
            part: path.to_string(),
            detail: e.to_string(),
        })?;

    Ok(content)
}

/// Read an attribute by name. With `prefixed`, only a namespaced key whose
/// local name is `key` matches (`r:id` for `id`, never a bare `id`).
fn attr_value(e: &BytesStart<'_>, key: &[u8], prefixed: bool) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        let k = attr.key.as_ref();
        let matches = if prefixed {
            k.contains(&b':') && local_name(k) == key
        } else {
            k == key
        };
        matches.then(|| String::from_utf8_lossy(&attr.value).to_string())
    })
}

/// `ppt/slides/slide3.xml` → `ppt/slides/_rels/slide3.xml.rels`.
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_part_path(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml");
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
