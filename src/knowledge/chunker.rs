//! Heading-scoped markdown chunking for knowledge documents.
//!
//! Documents may open with a YAML front-matter block declaring their system id
//! and intents; that metadata is authoritative when present. The keyword
//! matcher below stays as an import-time fallback for documents that never got
//! tagged.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::rag::types::{ChunkKind, RagChunk};
use crate::types::{Intent, SystemId};
use crate::utilities::text::normalize;

/// Heading markers recognized by the chunker (levels 2-4).
static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{2,4})\s+(.+?)\s*$").unwrap());

/// Keyword table for the system-id fallback. Checked in order; spirit comes
/// before tarot because spirit headings also contain "ไพ่".
static SYSTEM_KEYWORDS: &[(SystemId, &[&str])] = &[
    (SystemId::SpiritTh, &["spirit", "จิตวิญญาณ", "ไพ่จิต"]),
    (SystemId::TarotTh, &["ไพ่", "tarot", "ทาโรต์", "ยิปซี"]),
    (
        SystemId::ThaiAstrology,
        &["โหราศาสตร์", "ราศี", "astrology", "horoscope", "zodiac"],
    ),
    (
        SystemId::NumerologyTh,
        &["เลขศาสตร์", "numerology", "ตัวเลข", "เบอร์มงคล"],
    ),
];

/// Intent inference patterns, matched against normalized title + body.
static INTENT_PATTERNS: Lazy<Vec<(Intent, Regex)>> = Lazy::new(|| {
    vec![
        (Intent::Work, Regex::new(r"การงาน|อาชีพ|career|work|job").unwrap()),
        (Intent::Love, Regex::new(r"ความรัก|คู่รัก|แฟน|love|relationship").unwrap()),
        (Intent::Money, Regex::new(r"การเงิน|เงิน|ทรัพย์|โชคลาภ|money|finance").unwrap()),
        (Intent::Matching, Regex::new(r"สมพงศ์|เนื้อคู่|ดูดวงคู่|match|compatib").unwrap()),
        (
            Intent::Timing,
            Regex::new(r"ฤกษ์|ช่วงเวลา|รายวัน|รายสัปดาห์|รายเดือน|daily|weekly|timing").unwrap(),
        ),
    ]
});

/// Metadata declared in a document's YAML front matter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentMeta {
    /// Owning subsystem in wire form (e.g. `tarot_th`).
    pub system_id: Option<String>,
    /// Intents this whole document addresses.
    #[serde(default)]
    pub intents: Vec<String>,
    /// Document title used for preamble chunks.
    pub title: Option<String>,
}

impl DocumentMeta {
    fn parsed_system_id(&self, source: &str) -> Option<SystemId> {
        let raw = self.system_id.as_deref()?;
        let parsed = SystemId::parse(raw);
        if parsed.is_none() {
            tracing::warn!(source, system_id = raw, "unknown system_id in front matter, ignoring");
        }
        parsed
    }

    fn parsed_intents(&self, source: &str) -> Vec<Intent> {
        self.intents
            .iter()
            .filter_map(|raw| {
                let parsed = Intent::parse(raw);
                if parsed.is_none() {
                    tracing::warn!(source, intent = %raw, "unknown intent in front matter, ignoring");
                }
                parsed
            })
            .collect()
    }
}

/// Split YAML front matter off a raw document.
///
/// Returns the parsed metadata (default when absent or malformed) and the
/// remaining markdown body.
pub fn split_front_matter(raw: &str) -> (DocumentMeta, &str) {
    let Some(rest) = raw.strip_prefix("---") else {
        return (DocumentMeta::default(), raw);
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (DocumentMeta::default(), raw);
    };

    for fence in ["\n---\n", "\n---\r\n"] {
        if let Some(end) = rest.find(fence) {
            let yaml = &rest[..end];
            let body = &rest[end + fence.len()..];
            let meta = match serde_yaml::from_str::<DocumentMeta>(yaml) {
                Ok(meta) => meta,
                Err(err) => {
                    tracing::warn!(error = %err, "malformed front matter, falling back to keyword inference");
                    DocumentMeta::default()
                }
            };
            return (meta, body);
        }
    }

    (DocumentMeta::default(), raw)
}

/// Infer a system id from the heading path by keyword search.
pub fn infer_system_id(heading_path: &[String]) -> Option<SystemId> {
    let haystack = normalize(&heading_path.join(" "));
    for (system_id, keywords) in SYSTEM_KEYWORDS {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return Some(*system_id);
        }
    }
    None
}

/// Infer intents from a chunk's title and body text.
pub fn infer_intents(title: &str, body: &str) -> Vec<Intent> {
    let haystack = normalize(&format!("{} {}", title, body));
    let mut intents: Vec<Intent> = INTENT_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(&haystack))
        .map(|(intent, _)| *intent)
        .collect();
    intents.sort();
    intents.dedup();
    intents
}

/// Split a markdown document into heading-scoped chunks.
///
/// Headings at levels 2-4 open a new chunk. The heading-path stack is indexed
/// by `level - 2`: a heading at level L replaces the entry at that index and
/// truncates deeper entries. Buffered body lines flush when the next heading
/// is seen or at end of file; buffers that are empty after trimming are
/// dropped. Identical input always yields an identical chunk list.
pub fn chunk_markdown(raw: &str, source: &str, kind: ChunkKind) -> Vec<RagChunk> {
    let (meta, body) = split_front_matter(raw);
    let doc_title = meta.title.clone().unwrap_or_else(|| source.to_string());
    let doc_system_id = meta.parsed_system_id(source);
    let doc_intents = meta.parsed_intents(source);

    let mut chunks = Vec::new();
    let mut heading_path: Vec<String> = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut index = 0usize;

    let mut flush = |heading_path: &[String], buffer: &mut Vec<&str>, index: &mut usize| {
        let text = buffer.join("\n").trim().to_string();
        buffer.clear();
        if text.is_empty() {
            return;
        }

        let title = heading_path.last().cloned().unwrap_or_else(|| doc_title.clone());
        let system_id = doc_system_id.or_else(|| infer_system_id(heading_path));
        let mut intents = doc_intents.clone();
        intents.extend(infer_intents(&title, &text));
        intents.sort();
        intents.dedup();

        chunks.push(RagChunk {
            id: RagChunk::make_id(kind, source, *index),
            kind,
            system_id,
            intents,
            title,
            heading_path: heading_path.to_vec(),
            text,
            source: source.to_string(),
        });
        *index += 1;
    };

    for line in body.lines() {
        if let Some(caps) = HEADING_RE.captures(line) {
            flush(&heading_path, &mut buffer, &mut index);
            let level = caps[1].len();
            let title = caps[2].to_string();
            heading_path.truncate(level - 2);
            heading_path.push(title);
        } else {
            buffer.push(line);
        }
    }
    flush(&heading_path, &mut buffer, &mut index);

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
## ไพ่ The Fool\nไพ่แห่งการเริ่มต้นใหม่และอิสรภาพ\n\n### ความหมายด้านความรัก\nเปิดใจรับความรักครั้งใหม่\n\n### ความหมายด้านการงาน\nถึงเวลาเริ่มโปรเจกต์ที่ฝันไว้\n\n## ไพ่ The Magician\nไพ่แห่งการลงมือทำ\n";

    #[test]
    fn test_heading_scoped_chunking() {
        let chunks = chunk_markdown(DOC, "tarot-cards", ChunkKind::Kb);
        assert_eq!(chunks.len(), 4);

        assert_eq!(chunks[0].title, "ไพ่ The Fool");
        assert_eq!(chunks[0].heading_path, vec!["ไพ่ The Fool"]);
        assert_eq!(chunks[1].title, "ความหมายด้านความรัก");
        assert_eq!(
            chunks[1].heading_path,
            vec!["ไพ่ The Fool", "ความหมายด้านความรัก"]
        );

        // A new level-2 heading truncates the deeper path entries.
        assert_eq!(chunks[3].heading_path, vec!["ไพ่ The Magician"]);
    }

    #[test]
    fn test_chunk_ids_are_deterministic() {
        let first = chunk_markdown(DOC, "tarot-cards", ChunkKind::Kb);
        let second = chunk_markdown(DOC, "tarot-cards", ChunkKind::Kb);
        assert_eq!(first, second);
        assert_eq!(first[0].id, "kb:tarot-cards:0");
        assert_eq!(first[3].id, "kb:tarot-cards:3");
    }

    #[test]
    fn test_empty_sections_are_dropped() {
        let doc = "## ว่างเปล่า\n\n\n## มีเนื้อหา\nข้อความ\n";
        let chunks = chunk_markdown(doc, "doc", ChunkKind::Kb);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].title, "มีเนื้อหา");
    }

    #[test]
    fn test_preamble_uses_document_title() {
        let doc = "---\ntitle: คู่มือไพ่\nsystem_id: tarot_th\n---\nบทนำของเอกสาร\n\n## หัวข้อแรก\nเนื้อหา\n";
        let chunks = chunk_markdown(doc, "guide", ChunkKind::Kb);
        assert_eq!(chunks[0].title, "คู่มือไพ่");
        assert!(chunks[0].heading_path.is_empty());
        assert_eq!(chunks[0].system_id, Some(SystemId::TarotTh));
    }

    #[test]
    fn test_front_matter_overrides_keyword_inference() {
        // Heading says astrology; front matter pins numerology and wins.
        let doc = "---\nsystem_id: numerology_th\nintents: [money]\n---\n## โหราศาสตร์ไทย\nเนื้อหาเรื่องเลข\n";
        let chunks = chunk_markdown(doc, "numbers", ChunkKind::Kb);
        assert_eq!(chunks[0].system_id, Some(SystemId::NumerologyTh));
        assert!(chunks[0].intents.contains(&Intent::Money));
    }

    #[test]
    fn test_keyword_fallback_classifies_thai_astrology() {
        let doc = "## โหราศาสตร์ไทย\nดวงราศี aries ช่วง daily และคำทำนายประจำวัน\n";
        let chunks = chunk_markdown(doc, "astro", ChunkKind::Kb);
        assert_eq!(chunks[0].system_id, Some(SystemId::ThaiAstrology));
    }

    #[test]
    fn test_spirit_keyword_wins_over_tarot() {
        let doc = "## ไพ่จิตวิญญาณ\nความหมายของไพ่ประจำวิญญาณ\n";
        let chunks = chunk_markdown(doc, "spirit", ChunkKind::Kb);
        assert_eq!(chunks[0].system_id, Some(SystemId::SpiritTh));
    }

    #[test]
    fn test_intent_inference_is_sorted_and_deduplicated() {
        let chunks = chunk_markdown(DOC, "tarot-cards", ChunkKind::Kb);
        // "ความหมายด้านความรัก" chunk carries the love intent.
        assert_eq!(chunks[1].intents, vec![Intent::Love]);
        assert_eq!(chunks[2].intents, vec![Intent::Work]);
    }

    #[test]
    fn test_malformed_front_matter_falls_back() {
        let doc = "---\nsystem_id: [broken\n---\n## ไพ่ The Sun\nไพ่แห่งความสำเร็จ\n";
        let chunks = chunk_markdown(doc, "doc", ChunkKind::Kb);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].system_id, Some(SystemId::TarotTh));
    }
}
