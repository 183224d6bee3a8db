use eyre::{Result, bail, eyre};
use log::debug;
use regex::Regex;
use serde::Deserialize;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// One entry of the caption-track manifest embedded in the watch page.
#[derive(Debug, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
}

/// Fetch and flatten the English caption transcript for a video.
///
/// Any failure in the chain (fetch, manifest lookup, track selection, XML
/// parse) comes back as an error; callers are expected to collapse them all
/// into a single "no captions" outcome and keep the cause in the logs.
pub async fn fetch_transcript(client: &reqwest::Client, base_url: &str, video_id: &str) -> Result<String> {
    let watch_url = format!("{}/watch?v={video_id}", base_url.trim_end_matches('/'));
    debug!("Fetching watch page: {watch_url}");

    let page_html = client
        .get(&watch_url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let tracks = find_caption_tracks(&page_html)?;
    let track = select_english_track(&tracks)
        .ok_or_else(|| eyre!("no English caption track for video {video_id}"))?;
    debug!("Using caption track: lang={}", track.language_code);

    let caption_xml = client
        .get(&track.base_url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    flatten_caption_xml(&caption_xml)
}

/// Locate the caption-track manifest YouTube embeds in the watch page.
/// Best-effort pattern match over the raw HTML; the page format is not ours.
fn find_caption_tracks(html: &str) -> Result<Vec<CaptionTrack>> {
    let re = Regex::new(r#""captionTracks":\s*(\[.*?\])"#)?;
    let caps = re
        .captures(html)
        .ok_or_else(|| eyre!("no caption track manifest in watch page"))?;

    let tracks: Vec<CaptionTrack> = serde_json::from_str(&caps[1])?;
    if tracks.is_empty() {
        bail!("caption track manifest is empty");
    }
    Ok(tracks)
}

fn select_english_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code == "en" || t.language_code.starts_with("en-"))
}

/// Flatten a caption document into a single space-joined transcript string.
fn flatten_caption_xml(xml: &str) -> Result<String> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut fragments: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => in_text = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => in_text = false,
            Ok(Event::Text(ref e)) if in_text => {
                let raw = e.unescape().unwrap_or_default().to_string();
                let text = html_escape::decode_html_entities(&raw).to_string();
                let text = text.trim();
                if !text.is_empty() {
                    fragments.push(text.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(fragments.join(" "))
}
